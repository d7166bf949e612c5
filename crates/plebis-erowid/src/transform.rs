//! Experience page → [`Report`]

use chrono::NaiveDate;
use plebis_core::ExternalId;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::TransformError;
use crate::report::{ErowidAttributes, Report, ReportMeta, SubstanceInfo, Tag};

/// Turns a decoded page into a structured report.
pub trait Transformer: Send + Sync {
    fn transform(&self, id: ExternalId, html: &str) -> Result<Report, TransformError>;
}

/// Erowid experience page layout
pub struct HtmlTransformer {
    title: Selector,
    substance: Selector,
    author: Selector,
    dose_row: Selector,
    dose_time: Selector,
    dose_amount: Selector,
    dose_method: Selector,
    dose_substance: Selector,
    dose_form: Selector,
    body_weight: Selector,
    report: Selector,
    exp_year: Selector,
    exp_id: Selector,
    gender: Selector,
    age: Selector,
    published: Selector,
    views: Selector,
    topics: Selector,
}

fn sel(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

impl Default for HtmlTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlTransformer {
    pub fn new() -> Self {
        Self {
            title: sel("div.title"),
            substance: sel("div.substance"),
            author: sel("div.author"),
            dose_row: sel("table.dosechart tr"),
            dose_time: sel("td.dosechart-time"),
            dose_amount: sel("td.dosechart-amount"),
            dose_method: sel("td.dosechart-method"),
            dose_substance: sel("td.dosechart-substance"),
            dose_form: sel("td.dosechart-form"),
            body_weight: sel("table.bodyweight td.bodyweight-amount"),
            report: sel("div.report-text-surround"),
            exp_year: sel("td.footdata-expyear"),
            exp_id: sel("td.footdata-expid"),
            gender: sel("td.footdata-gender"),
            age: sel("td.footdata-ageofexp"),
            published: sel("td.footdata-pubdate"),
            views: sel("td.footdata-numviews"),
            topics: sel("td.footdata-topic-list"),
        }
    }

    fn first_text(&self, doc: &Html, selector: &Selector) -> Option<String> {
        doc.select(selector).next().and_then(|el| non_empty(text_of(el)))
    }

    /// Text after the `Label:` prefix of a foot data cell
    fn foot_value(&self, doc: &Html, selector: &Selector) -> Option<String> {
        let cell = self.first_text(doc, selector)?;
        let value = cell.split_once(':').map_or(cell.as_str(), |(_, v)| v);
        non_empty(value.trim().to_string())
    }

    fn dose_chart(&self, doc: &Html) -> Vec<SubstanceInfo> {
        let cell = |row: ElementRef<'_>, s: &Selector| {
            row.select(s).next().and_then(|el| non_empty(text_of(el)))
        };
        doc.select(&self.dose_row)
            .filter_map(|row| {
                Some(SubstanceInfo {
                    substance: cell(row, &self.dose_substance)?,
                    time: cell(row, &self.dose_time),
                    amount: cell(row, &self.dose_amount),
                    method: cell(row, &self.dose_method),
                    form: cell(row, &self.dose_form),
                })
            })
            .collect()
    }
}

impl Transformer for HtmlTransformer {
    fn transform(&self, id: ExternalId, html: &str) -> Result<Report, TransformError> {
        let doc = Html::parse_document(html);

        let title = self
            .first_text(&doc, &self.title)
            .ok_or_else(|| TransformError::NotAReport("missing title".to_string()))?;

        let page_id = self
            .foot_value(&doc, &self.exp_id)
            .and_then(|v| v.parse::<ExternalId>().ok());
        if let Some(page_id) = page_id.filter(|p| *p != id) {
            log::warn!("Report {id}: page carries ExpID {page_id}, keeping {id}");
        }

        let report = doc
            .select(&self.report)
            .next()
            .map(report_text)
            .unwrap_or_default();
        let hidden = report.is_empty();

        let author = self.first_text(&doc, &self.author).map(|a| {
            a.strip_prefix("by ")
                .map_or(a.clone(), |rest| rest.trim().to_string())
        });

        let erowid_attributes = self
            .first_text(&doc, &self.topics)
            .map(|t| parse_topics(&t))
            .unwrap_or_default();

        let meta = ReportMeta {
            erowid_id: id,
            reviewed: true,
            available: true,
            published: self
                .foot_value(&doc, &self.published)
                .and_then(|d| NaiveDate::parse_from_str(&d, "%b %d, %Y").ok()),
            exp_year: self
                .foot_value(&doc, &self.exp_year)
                .and_then(|y| y.parse().ok()),
            gender: self.foot_value(&doc, &self.gender),
            age: self.foot_value(&doc, &self.age).and_then(|a| a.parse().ok()),
            views: self
                .foot_value(&doc, &self.views)
                .and_then(|v| v.replace(',', "").parse().ok()),
            erowid_attributes,
        };

        Ok(Report {
            meta,
            title,
            author,
            substance: self.first_text(&doc, &self.substance),
            substance_info: self.dose_chart(&doc),
            body_weight: self.first_text(&doc, &self.body_weight),
            report,
            hidden,
        })
    }
}

/// All text of an element with whitespace runs collapsed
fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

/// Narrative text of the report container; embedded tables are skipped.
fn report_text(surround: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(surround, &mut raw);

    let mut out: Vec<String> = Vec::new();
    for line in raw.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        // at most one blank line between paragraphs
        if line.is_empty() && out.last().is_none_or(String::is_empty) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(String::is_empty) {
        out.pop();
    }
    out.join("\n")
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => match e.name() {
                "table" | "script" | "style" => {}
                "br" => out.push('\n'),
                name => {
                    let block = matches!(name, "p" | "div");
                    if block {
                        out.push('\n');
                    }
                    if let Some(inner) = ElementRef::wrap(child) {
                        collect_text(inner, out);
                    }
                    if block {
                        out.push('\n');
                    }
                }
            },
            _ => {}
        }
    }
}

/// `"Name (12)"` → tag; the ID is the last parenthesised number.
fn parse_tag(item: &str) -> Option<Tag> {
    let (name, id) = item.trim().strip_suffix(')')?.rsplit_once('(')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(Tag {
        id: id.trim().parse().ok()?,
        name: name.to_string(),
    })
}

fn parse_tags(segment: &str) -> Vec<Tag> {
    segment.split(", ").filter_map(parse_tag).collect()
}

/// Topic list: `substances : categories : attributes`.
///
/// With two segments the first is categories; a lone segment is categories.
fn parse_topics(list: &str) -> ErowidAttributes {
    let segments: Vec<&str> = list.split(" : ").collect();
    let (categories, attributes) = match segments.len() {
        0 => return ErowidAttributes::default(),
        1 | 2 => (segments[0], &segments[1..]),
        _ => (segments[1], &segments[2..]),
    };
    ErowidAttributes {
        categories: parse_tags(categories),
        attributes: attributes.iter().flat_map(|s| parse_tags(s)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VISIBLE: &str = include_str!("../tests/fixtures/visible.html");
    const HIDDEN: &str = include_str!("../tests/fixtures/hidden.html");

    #[test]
    fn visible_page_fields() {
        let report = HtmlTransformer::new().transform(6, VISIBLE).unwrap();
        assert!(!report.is_hidden());
        assert_eq!(report.title, "A Quiet Afternoon");
        assert_eq!(report.author.as_deref(), Some("morningsky"));
        assert_eq!(report.substance.as_deref(), Some("LSD"));
        assert_eq!(report.body_weight.as_deref(), Some("150 lb"));

        let meta = &report.meta;
        assert_eq!(meta.erowid_id, 6);
        assert!(meta.reviewed && meta.available);
        assert_eq!(meta.exp_year, Some(1999));
        assert_eq!(meta.gender.as_deref(), Some("Male"));
        assert_eq!(meta.age, Some(21));
        assert_eq!(meta.views, Some(12_345));
        assert_eq!(meta.published, NaiveDate::from_ymd_opt(2000, 6, 16));
    }

    #[test]
    fn dose_chart_rows() {
        let report = HtmlTransformer::new().transform(6, VISIBLE).unwrap();
        assert_eq!(report.substance_info.len(), 2);
        let first = &report.substance_info[0];
        assert_eq!(first.time.as_deref(), Some("T+ 0:00"));
        assert_eq!(first.amount.as_deref(), Some("1 hit"));
        assert_eq!(first.method.as_deref(), Some("oral"));
        assert_eq!(first.substance, "LSD");
        assert_eq!(first.form.as_deref(), Some("(blotter / tab)"));
        // &nbsp; only
        assert_eq!(report.substance_info[1].amount, None);
    }

    #[test]
    fn report_text_excludes_tables() {
        let report = HtmlTransformer::new().transform(6, VISIBLE).unwrap();
        assert!(report.report.starts_with("I took the tab around noon."));
        assert!(report.report.contains("The walls started breathing after an hour."));
        assert!(report.report.contains("Café music"));
        assert!(!report.report.contains("BODY WEIGHT"));
        assert!(!report.report.contains("ExpID"));
        assert!(!report.report.contains("\n\n\n"));
    }

    #[test]
    fn topic_list() {
        let report = HtmlTransformer::new().transform(6, VISIBLE).unwrap();
        let attrs = &report.meta.erowid_attributes;
        assert_eq!(
            attrs.categories,
            vec![
                Tag { id: 4, name: "Glowing Experiences".into() },
                Tag { id: 2, name: "First Times".into() },
            ]
        );
        assert_eq!(
            attrs.attributes,
            vec![Tag { id: 17, name: "Small Group (2-9)".into() }]
        );
    }

    #[test]
    fn page_without_text_is_hidden() {
        let report = HtmlTransformer::new().transform(7, HIDDEN).unwrap();
        assert!(report.is_hidden());
        assert_eq!(report.meta.exp_year, Some(2004));
    }

    #[test]
    fn page_without_title_is_rejected() {
        let err = HtmlTransformer::new()
            .transform(8, "<html><body><p>Server busy</p></body></html>")
            .unwrap_err();
        assert_eq!(err, TransformError::NotAReport("missing title".into()));
    }

    #[test]
    fn caller_id_wins_over_page_id() {
        let report = HtmlTransformer::new().transform(60, VISIBLE).unwrap();
        assert_eq!(report.erowid_id(), 60);
    }

    #[test]
    fn topics_segment_layouts() {
        let two = parse_topics("General (1) : Alone (16)");
        assert_eq!(two.categories.len(), 1);
        assert_eq!(two.attributes[0].id, 16);

        let one = parse_topics("General (1), Bad Trips (6)");
        assert_eq!(one.categories.len(), 2);
        assert!(one.attributes.is_empty());

        assert!(parse_topics("").categories.is_empty());
    }

    #[test]
    fn malformed_tags_skipped() {
        assert_eq!(parse_tag("no id"), None);
        assert_eq!(parse_tag("(3)"), None);
        assert_eq!(parse_tag("Word (x)"), None);
    }
}
