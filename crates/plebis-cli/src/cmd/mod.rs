//! Subcommands

pub mod harvest;
pub mod init;
pub mod reindex;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use url::Url;

use crate::config::Config;

/// Print a key-value table on stderr
pub fn print_table(title: &str, rows: &[(&str, String)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(title).fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}

/// Hide the password part of a connection URL
fn redact_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };
    if url.password().is_some() && url.set_password(Some("***")).is_ok() {
        url.to_string()
    } else {
        raw.to_string()
    }
}

pub fn show_config(config: &Config) {
    let w = &config.workers;
    let s = &config.search;
    print_table(
        "Setting",
        &[
            ("Source URL", config.source.base_url.clone()),
            ("Delay", format!("{}ms", config.source.delay_ms)),
            (
                "HTTP timeouts",
                format!(
                    "{}s connect, {}s request",
                    config.source.connect_timeout_secs, config.source.request_timeout_secs
                ),
            ),
            ("Store URL", redact_url(&config.store.url)),
            ("Store connections", config.store.max_connections.to_string()),
            ("Search host", redact_url(&s.host)),
            (
                "Search index",
                match s.doc_type() {
                    Some(t) => format!("{}/{t}", s.index),
                    None => s.index.clone(),
                },
            ),
            (
                "Index flush",
                format!("every {}ms, max {} ops", s.flush_interval_ms, s.max_batch),
            ),
            ("Index queue", s.queue_capacity.to_string()),
            ("Workers", w.count.to_string()),
            ("ID range", format!("{}..{}", w.start, w.end)),
            (
                "Restarts",
                format!(
                    "max {} in a row, each within {}s",
                    w.max_restarts, w.restart_window_secs
                ),
            ),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_password() {
        assert_eq!(
            redact_url("postgres://plebis:secret@db:5432/plebiscite"),
            "postgres://plebis:***@db:5432/plebiscite"
        );
    }

    #[test]
    fn leaves_urls_without_password() {
        assert_eq!(
            redact_url("postgres://localhost:5432/plebiscite"),
            "postgres://localhost:5432/plebiscite"
        );
        assert_eq!(redact_url("postgres://user@db/x"), "postgres://user@db/x");
        assert_eq!(redact_url("not a url"), "not a url");
    }

    #[test]
    fn redacts_password_containing_at_sign() {
        let shown = redact_url("postgres://u:p@ss@db:5432/x");
        assert_eq!(shown, "postgres://u:***@db:5432/x");
        assert!(!shown.contains("ss"));
    }
}
