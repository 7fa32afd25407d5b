//! Two-party completion gate.
//!
//! A prediction attempt only settles once both the request and the
//! minimum-display timer have finished. [`SettleGate`] records each side as
//! it completes and releases the outcome only when the second one arrives,
//! whichever order they come in.

#[derive(Debug)]
pub struct SettleGate<T> {
    outcome: Option<T>,
    floor_elapsed: bool,
    released: bool,
}

impl<T> Default for SettleGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SettleGate<T> {
    pub fn new() -> Self {
        Self { outcome: None, floor_elapsed: false, released: false }
    }

    /// True once the request side has been recorded, also after release.
    pub fn outcome_seen(&self) -> bool {
        self.outcome.is_some() || self.released
    }

    pub fn is_floor_elapsed(&self) -> bool {
        self.floor_elapsed
    }

    /// Record the request side. A second outcome is ignored.
    pub fn record_outcome(&mut self, outcome: T) {
        if !self.outcome_seen() {
            self.outcome = Some(outcome);
        }
    }

    /// Record the timer side.
    pub fn record_floor(&mut self) {
        self.floor_elapsed = true;
    }

    /// Yields the outcome exactly once, after both sides have been recorded.
    pub fn take_ready(&mut self) -> Option<T> {
        if !self.floor_elapsed {
            return None;
        }

        let outcome = self.outcome.take()?;
        self.released = true;
        Some(outcome)
    }
}
