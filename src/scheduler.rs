use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// A repeating tokio task. The first tick fires one `period` after spawning.
/// Dropping the handle aborts the task, so replacing a task cancels the old one.
#[derive(Debug)]
pub struct PeriodicTask {
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// `tick` returns `false` to stop the task, e.g. once its owner is gone.
    pub fn spawn<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !tick() {
                    break;
                }
            }
        });
        Self { handle }
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The dashboard's two timers: data refresh and carousel rotation.
#[derive(Debug, Default)]
pub struct Scheduler {
    refresh: Option<PeriodicTask>,
    rotation: Option<PeriodicTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm_refresh<F>(&mut self, period: Duration, tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.refresh = Some(PeriodicTask::spawn(period, tick));
        log::debug!("[scheduler] refresh armed every {}s", period.as_secs());
    }

    pub fn arm_rotation<F>(&mut self, period: Duration, tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.rotation = Some(PeriodicTask::spawn(period, tick));
        log::debug!("[scheduler] rotation armed every {}s", period.as_secs());
    }

    pub fn disarm_refresh(&mut self) {
        if self.refresh.take().is_some() {
            log::debug!("[scheduler] refresh disarmed");
        }
    }

    pub fn disarm_rotation(&mut self) {
        if self.rotation.take().is_some() {
            log::debug!("[scheduler] rotation disarmed");
        }
    }

    pub fn disarm_all(&mut self) {
        self.disarm_refresh();
        self.disarm_rotation();
    }

    #[cfg(test)]
    pub fn is_refresh_armed(&self) -> bool {
        self.refresh
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    #[cfg(test)]
    pub fn is_rotation_armed(&self) -> bool {
        self.rotation
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}
