//! Daily Scheduling
//!
//! Fires an action once a day at a fixed local wall-clock time until
//! cancelled. Missed fire times (the process was down) are not caught up.

use std::future::Future;

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use tokio_util::sync::CancellationToken;

/// Days looked ahead before giving up on resolving a local time.
const LOOKAHEAD_DAYS: usize = 3;

/// A fixed time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    at: NaiveTime,
}

impl DailyTrigger {
    /// Fire every day at `at`.
    #[must_use]
    pub const fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    /// Time of day this trigger fires at.
    #[must_use]
    pub const fn at(&self) -> NaiveTime {
        self.at
    }

    /// First fire time strictly after `now`, in `now`'s time zone.
    ///
    /// A fire time that falls into a DST gap moves one hour later.
    #[must_use]
    pub fn next_fire<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let mut day = now.date_naive();

        for _ in 0..LOOKAHEAD_DAYS {
            if let Some(fire) = resolve(&tz, day.and_time(self.at))
                && fire > *now
            {
                return fire;
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }

        now.clone() + TimeDelta::days(1)
    }
}

fn resolve<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&local).earliest().or_else(|| {
        tz.from_local_datetime(&(local + TimeDelta::hours(1)))
            .earliest()
    })
}

/// Run `action` every day at `trigger` local time until `cancel` fires.
///
/// Cancellation interrupts the wait, never a running action.
pub async fn run_daily<F, Fut>(
    name: &'static str,
    trigger: DailyTrigger,
    cancel: CancellationToken,
    mut action: F,
) where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = ()> + Send,
{
    loop {
        let now = Local::now();
        let next = trigger.next_fire(&now);
        let wait = (next - now).to_std().unwrap_or_default();

        tracing::info!(
            trigger = name,
            next = %next.format("%Y-%m-%d %H:%M:%S %:z"),
            wait_secs = wait.as_secs(),
            "Next dispatch scheduled"
        );

        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!(trigger = name, "Schedule stopped");
                return;
            }
            () = tokio::time::sleep(wait) => {}
        }

        tracing::debug!(trigger = name, "Trigger fired");
        action().await;
    }
}
