use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Running,
    Paused,
    Cancelled,
}

/// Cancellable repeating timer driving the main-round countdown.
///
/// The callback runs once per `period` while running. Returning
/// `ControlFlow::Break` stops the task. Resuming after a pause restarts the
/// period, so a paused second is never counted.
#[derive(Debug)]
pub struct RoundTimer {
    control: watch::Sender<TimerState>,
    handle: JoinHandle<()>,
}

impl RoundTimer {
    /// Spawn the timer on the current tokio runtime.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let (control, mut state) = watch::channel(TimerState::Running);

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let current = *state.borrow_and_update();
                match current {
                    TimerState::Cancelled => break,
                    TimerState::Paused => {
                        if state.changed().await.is_err() {
                            break;
                        }
                        interval.reset();
                    }
                    TimerState::Running => {
                        tokio::select! {
                            _ = interval.tick() => {
                                if on_tick().is_break() {
                                    break;
                                }
                            }
                            changed = state.changed() => {
                                if changed.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            tracing::debug!("round timer stopped");
        });

        Self { control, handle }
    }

    /// One tick per second.
    pub fn every_second<F>(on_tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        Self::spawn(Duration::from_secs(1), on_tick)
    }

    pub fn pause(&self) {
        self.control.send_if_modified(|state| {
            if *state == TimerState::Running {
                *state = TimerState::Paused;
                true
            } else {
                false
            }
        });
    }

    pub fn resume(&self) {
        self.control.send_if_modified(|state| {
            if *state == TimerState::Paused {
                *state = TimerState::Running;
                true
            } else {
                false
            }
        });
    }

    pub fn cancel(&self) {
        self.control.send_replace(TimerState::Cancelled);
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.control.borrow() == TimerState::Paused
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RoundTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
