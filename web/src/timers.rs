use gloo::timers::callback::{Interval, Timeout};
use unlockwall_core::{HideToken, Millis, TimerEvent, Timers};
use yew::Callback;

/// [`Timers`] backed by browser intervals. Dropping a handle cancels it, so every cancel is idempotent.
pub(crate) struct BrowserTimers {
    callback: Callback<TimerEvent>,
    countdown: Option<Interval>,
    hide: Option<Timeout>,
}

impl BrowserTimers {
    pub(crate) fn new(callback: Callback<TimerEvent>) -> Self {
        Self {
            callback,
            countdown: None,
            hide: None,
        }
    }
}

impl Timers for BrowserTimers {
    fn start_countdown(&mut self, period_ms: Millis) {
        let callback = self.callback.clone();
        self.countdown = Some(Interval::new(period_ms, move || {
            callback.emit(TimerEvent::CountdownTick)
        }));
    }

    fn cancel_countdown(&mut self) {
        if let Some(interval) = self.countdown.take() {
            interval.cancel();
        }
    }

    fn schedule_hide(&mut self, token: HideToken, delay_ms: Millis) {
        let callback = self.callback.clone();
        self.hide = Some(Timeout::new(delay_ms, move || {
            callback.emit(TimerEvent::HideMismatch(token))
        }));
    }

    fn cancel_hide(&mut self) {
        if let Some(timeout) = self.hide.take() {
            timeout.cancel();
        }
    }
}
