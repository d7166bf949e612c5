//! Restart-on-failure supervision for long-running worker loops.
//!
//! A loop that returns `Err` or panics is reported and started again from
//! scratch. Restarts are rate-limited: a streak of incarnations that each
//! die within the window retires the loop instead of spinning on a
//! systemic fault.

use std::any::Any;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// How often a failing loop may be restarted.
#[derive(Debug, Clone)]
pub struct RestartPolicy {
    /// Consecutive short-lived failures tolerated before giving up
    pub max_restarts: u32,
    /// An incarnation that survives longer than this ends the streak
    pub window: Duration,
    /// Pause before each restart
    pub delay: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_restarts: 100,
            window: Duration::from_secs(60),
            delay: Duration::from_secs(1),
        }
    }
}

/// Outcome of one supervised loop.
#[derive(Debug, Default, Clone)]
pub struct SupervisorReport {
    pub restarts: u32,
    /// Restart budget exhausted; the loop was not completed
    pub gave_up: bool,
    pub last_error: Option<String>,
}

/// Run `make()` to completion, restarting it after every failure.
///
/// Each incarnation runs as its own tokio task so panics are contained.
/// Returns once an incarnation finishes with `Ok(())`, or when the
/// restart budget of `policy` is exceeded.
pub async fn supervise<F, Fut>(
    label: &str,
    policy: &RestartPolicy,
    mut make: F,
) -> SupervisorReport
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let mut report = SupervisorReport::default();
    let mut streak: u32 = 0;

    loop {
        let started = Instant::now();
        let failure = match tokio::spawn(make()).await {
            Ok(Ok(())) => return report,
            Ok(Err(e)) => format!("{e:#}"),
            Err(e) if e.is_panic() => format!("panic: {}", panic_message(e.into_panic())),
            Err(e) => {
                log::warn!("{label}: cancelled: {e}");
                return report;
            }
        };

        if started.elapsed() > policy.window {
            streak = 0;
        }
        streak += 1;

        // checked before the backoff so the restart delay cannot hide the streak
        if streak > policy.max_restarts {
            log::error!(
                "{label}: {streak} consecutive failures, each within {:?}, giving up: {failure}",
                policy.window
            );
            report.gave_up = true;
            report.last_error = Some(failure);
            return report;
        }

        report.restarts += 1;
        log::error!("{label}: loop failed, restarting (#{}): {failure}", report.restarts);
        report.last_error = Some(failure);
        tokio::time::sleep(policy.delay).await;
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
