use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Cancellable countdown source measured against the wall clock.
///
/// The spawned task only wakes the receiver; `next_tick` reports how many
/// whole periods have elapsed since the previous report, measured from the
/// start instant. A caller that polls late therefore catches up in one step
/// instead of losing time. After `cancel` (or drop) nothing more is returned,
/// even a wake-up already buffered.
#[derive(Debug)]
pub struct CountdownTimer {
    ticks: mpsc::Receiver<()>,
    task: JoinHandle<()>,
    started: Instant,
    period: Duration,
    reported: u32,
    cancelled: bool,
}

impl CountdownTimer {
    /// Spawn the ticking task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime or if `period` is zero.
    #[must_use]
    pub fn start(period: Duration) -> Self {
        let started = Instant::now();
        let (tx, ticks) = mpsc::channel(4);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(started + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });
        Self {
            ticks,
            task,
            started,
            period,
            reported: 0,
            cancelled: false,
        }
    }

    /// Wait until at least one more whole period has elapsed and return how
    /// many elapsed since the last call. Returns `None` once cancelled.
    pub async fn next_tick(&mut self) -> Option<u32> {
        loop {
            if self.cancelled {
                return None;
            }
            self.ticks.recv().await?;
            let elapsed = self.elapsed_periods();
            if elapsed > self.reported {
                let delta = elapsed - self.reported;
                self.reported = elapsed;
                return Some(delta);
            }
        }
    }

    /// Whole periods since `start`, independent of how often ticks were read.
    #[must_use]
    pub fn elapsed_periods(&self) -> u32 {
        let elapsed = Instant::now().saturating_duration_since(self.started);
        let periods = elapsed.as_nanos() / self.period.as_nanos().max(1);
        u32::try_from(periods).unwrap_or(u32::MAX)
    }

    /// Stop ticking. Idempotent.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.task.abort();
        self.ticks.close();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let started = Instant::now();
        let mut timer = CountdownTimer::start(Duration::from_secs(1));

        assert_eq!(timer.next_tick().await, Some(1));
        assert_eq!(timer.next_tick().await, Some(1));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn late_reader_catches_up_in_one_step() {
        let mut timer = CountdownTimer::start(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(timer.next_tick().await, Some(20));
        // buffered wake-ups from the backlog carry no extra time
        assert_eq!(timer.next_tick().await, Some(1));
        assert_eq!(timer.elapsed_periods(), 21);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_delivers_nothing() {
        let mut timer = CountdownTimer::start(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(3)).await;

        timer.cancel();
        assert!(timer.is_cancelled());
        assert!(timer.next_tick().await.is_none());
        timer.cancel();
    }
}
