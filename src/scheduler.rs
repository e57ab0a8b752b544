//! Twice-daily trigger for the pipeline.
//!
//! Fires [`Pipeline::run_full_check`] at 00:00 and 12:00 local time in the
//! configured timezone. The next fire time is recomputed after every run,
//! so DST shifts in the target timezone are picked up automatically.

use crate::notify::Notifier;
use crate::pipeline::Pipeline;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

/// Local hours at which a full check fires.
const CHECK_HOURS: [u32; 2] = [0, 12];

/// Next scheduled check strictly after `after`: the earliest of today's or
/// tomorrow's 00:00/12:00 in `tz`. Times made ambiguous or skipped by a DST
/// transition resolve to the earliest valid instant.
pub fn next_check_time(after: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local_date = after.with_timezone(&tz).date_naive();

    for day_offset in 0..=1 {
        let date = local_date + ChronoDuration::days(day_offset);
        for hour in CHECK_HOURS {
            let candidate = tz
                .with_ymd_and_hms(date.year(), date.month(), date.day(), hour, 0, 0)
                .earliest();
            if let Some(candidate) = candidate {
                let candidate = candidate.with_timezone(&Utc);
                if candidate > after {
                    return candidate;
                }
            }
        }
    }

    // Unreachable for real timezones (a whole day cannot be skipped), but
    // fall back to one day out rather than panicking.
    after + ChronoDuration::days(1)
}

/// Runs the schedule loop forever. Intended to be spawned as a task.
pub async fn run_schedule<N: Notifier + 'static>(pipeline: Arc<Pipeline<N>>, tz: Tz) {
    loop {
        let now = Utc::now();
        let next = next_check_time(now, tz);
        let wait = (next - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        tracing::info!(
            next = %next.with_timezone(&tz),
            wait_secs = wait.as_secs(),
            "Next feed check scheduled"
        );

        tokio::time::sleep(wait).await;
        pipeline.run_full_check().await;
    }
}
