use crate::*;

/// Scheduled events consumed by [`SessionController::on_timer`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    CountdownTick,
    HideMismatch(HideToken),
}

/// Timer seam of the session controller. Every cancel must be a no-op when nothing is scheduled.
pub trait Timers {
    /// Starts a repeating countdown tick, replacing any running one.
    fn start_countdown(&mut self, period_ms: Millis);
    fn cancel_countdown(&mut self);
    /// Schedules a single mismatch hide, replacing any pending one.
    fn schedule_hide(&mut self, token: HideToken, delay_ms: Millis);
    fn cancel_hide(&mut self);
}

/// Deterministic [`Timers`] implementation driven by explicit time advances.
#[derive(Clone, Debug, Default)]
pub struct SimClock {
    now_ms: u64,
    countdown: Option<(u64, Millis)>,
    hide: Option<(u64, HideToken)>,
    countdown_starts: u32,
    countdown_cancels: u32,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn is_countdown_running(&self) -> bool {
        self.countdown.is_some()
    }

    pub fn pending_hide(&self) -> Option<HideToken> {
        self.hide.map(|(_, token)| token)
    }

    pub fn countdown_starts(&self) -> u32 {
        self.countdown_starts
    }

    /// Cancels that actually stopped a running countdown; cancelling an idle one does not count.
    pub fn countdown_cancels(&self) -> u32 {
        self.countdown_cancels
    }

    /// Pops the earliest event due at or before `deadline_ms`, moving the clock to its due time.
    ///
    /// When a tick and a hide fall due at the same instant the tick fires first, so a timeout wins the race.
    pub fn pop_due(&mut self, deadline_ms: u64) -> Option<TimerEvent> {
        let tick = self.countdown.map(|(at, _)| (at, TimerEvent::CountdownTick));
        let hide = self
            .hide
            .map(|(at, token)| (at, TimerEvent::HideMismatch(token)));
        let (at, event) = match (tick, hide) {
            (Some(tick), Some(hide)) if hide.0 < tick.0 => hide,
            (Some(tick), _) => tick,
            (None, hide) => hide?,
        };
        if at > deadline_ms {
            return None;
        }

        self.now_ms = self.now_ms.max(at);
        match event {
            TimerEvent::CountdownTick => {
                if let Some((next, period)) = self.countdown.as_mut() {
                    *next += u64::from(*period);
                }
            }
            TimerEvent::HideMismatch(_) => self.hide = None,
        }
        Some(event)
    }

    /// Moves the clock forward without firing anything; used after draining [`SimClock::pop_due`].
    pub fn settle(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }
}

impl Timers for SimClock {
    fn start_countdown(&mut self, period_ms: Millis) {
        let period_ms = period_ms.max(1);
        self.countdown = Some((self.now_ms + u64::from(period_ms), period_ms));
        self.countdown_starts += 1;
    }

    fn cancel_countdown(&mut self) {
        if self.countdown.take().is_some() {
            self.countdown_cancels += 1;
        }
    }

    fn schedule_hide(&mut self, token: HideToken, delay_ms: Millis) {
        self.hide = Some((self.now_ms + u64::from(delay_ms), token));
    }

    fn cancel_hide(&mut self) {
        self.hide = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(clock: &mut SimClock, until: u64) -> Vec<(u64, TimerEvent)> {
        let mut fired = Vec::new();
        while let Some(event) = clock.pop_due(until) {
            fired.push((clock.now_ms(), event));
        }
        clock.settle(until);
        fired
    }

    #[test]
    fn countdown_repeats_every_period() {
        let mut clock = SimClock::new();
        clock.start_countdown(1000);

        let fired = drain(&mut clock, 3500);

        assert_eq!(
            fired,
            vec![
                (1000, TimerEvent::CountdownTick),
                (2000, TimerEvent::CountdownTick),
                (3000, TimerEvent::CountdownTick),
            ]
        );
        assert_eq!(clock.now_ms(), 3500);
    }

    #[test]
    fn hide_fires_once() {
        let mut clock = SimClock::new();
        let token = HideToken(3);
        clock.schedule_hide(token, 500);

        assert!(drain(&mut clock, 499).is_empty());
        assert_eq!(
            drain(&mut clock, 2000),
            vec![(500, TimerEvent::HideMismatch(token))]
        );
        assert_eq!(clock.pending_hide(), None);
    }

    #[test]
    fn tick_fires_before_hide_at_same_instant() {
        let mut clock = SimClock::new();
        clock.start_countdown(1000);
        clock.settle(500);
        clock.schedule_hide(HideToken(0), 500);

        let fired = drain(&mut clock, 1000);

        assert_eq!(
            fired,
            vec![
                (1000, TimerEvent::CountdownTick),
                (1000, TimerEvent::HideMismatch(HideToken(0))),
            ]
        );
    }

    #[test]
    fn cancels_are_idempotent() {
        let mut clock = SimClock::new();
        clock.cancel_countdown();
        clock.cancel_hide();
        assert_eq!(clock.countdown_cancels(), 0);

        clock.start_countdown(1000);
        clock.cancel_countdown();
        clock.cancel_countdown();
        assert_eq!(clock.countdown_cancels(), 1);
        assert!(drain(&mut clock, 10_000).is_empty());
    }
}
