//! Process-wide monitoring: log subscriber setup and the invocation deadline watchdog.

use std::env;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tracing::{Instrument, Span, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FORMAT_ENV: &str = "IMGPACK_LOG_FORMAT";

/// Install the global subscriber. Call once, before the runtime loop starts.
///
/// The host captures stdout, so logs go there without ANSI colors or local
/// timestamps. `IMGPACK_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json_requested(env::var(LOG_FORMAT_ENV).ok().as_deref()) {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_ansi(false).without_time())
            .init();
    }
}

fn json_requested(raw: Option<&str>) -> bool {
    raw.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}

/// Logs a warning shortly before the host kills the invocation.
///
/// Aborted on drop, so it only fires while the invocation is still running.
pub struct DeadlineWatchdog {
    task: JoinHandle<()>,
}

impl DeadlineWatchdog {
    /// Arm against `deadline_ms` (milliseconds since the Unix epoch).
    ///
    /// Returns `None` when the deadline has already passed. The warning is
    /// attached to the current span.
    pub fn arm(deadline_ms: u64, margin: Duration) -> Option<Self> {
        let deadline = UNIX_EPOCH + Duration::from_millis(deadline_ms);
        let delay = warning_delay(deadline, SystemTime::now(), margin)?;
        let remaining = margin.min(deadline.duration_since(SystemTime::now()).unwrap_or_default());

        let task = tokio::spawn(
            async move {
                tokio::time::sleep(delay).await;
                warn!(
                    remaining_ms = remaining.as_millis() as u64,
                    "Invocation is about to reach its deadline"
                );
            }
            .instrument(Span::current()),
        );
        Some(Self { task })
    }
}

impl Drop for DeadlineWatchdog {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Time to sleep before warning. `None` if the deadline is already behind us.
fn warning_delay(deadline: SystemTime, now: SystemTime, margin: Duration) -> Option<Duration> {
    let remaining = deadline.duration_since(now).ok()?;
    Some(remaining.saturating_sub(margin))
}
