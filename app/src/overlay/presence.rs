//! Background presence indicator
//!
//! One shared "N overlays active" indicator, raised with the first live
//! instance and lowered when the last one goes away.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Whatever shows the user that overlays are running (tray icon, notification)
pub trait PresenceIndicator: Send {
    fn raise(&mut self, count: usize);
    fn update(&mut self, count: usize);
    fn lower(&mut self);
}

/// Indicator that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresence;

impl PresenceIndicator for LogPresence {
    fn raise(&mut self, count: usize) {
        tracing::info!(count, "Overlays active");
    }

    fn update(&mut self, count: usize) {
        tracing::debug!(count, "Overlay count changed");
    }

    fn lower(&mut self) {
        tracing::info!("No overlays active");
    }
}

struct PresenceState {
    active: bool,
    count: usize,
    indicator: Box<dyn PresenceIndicator>,
}

/// Shared presence flag plus the indicator it drives
#[derive(Clone)]
pub struct Presence {
    state: Arc<Mutex<PresenceState>>,
}

impl fmt::Debug for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Presence")
            .field("active", &state.active)
            .field("count", &state.count)
            .finish_non_exhaustive()
    }
}

impl Default for Presence {
    fn default() -> Self {
        Self::new(LogPresence)
    }
}

impl Presence {
    pub fn new(indicator: impl PresenceIndicator + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(PresenceState {
                active: false,
                count: 0,
                indicator: Box::new(indicator),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, PresenceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_active(&self) -> bool {
        self.state().active
    }

    /// Live instance count the indicator last showed
    pub fn count(&self) -> usize {
        self.state().count
    }

    /// Bring the indicator in line with the number of live instances
    pub(crate) fn sync(&self, count: usize) {
        let mut state = self.state();
        match (state.active, count) {
            (false, 0) => {}
            (true, 0) => {
                state.active = false;
                state.indicator.lower();
            }
            (false, n) => {
                state.active = true;
                state.indicator.raise(n);
            }
            (true, n) if n != state.count => state.indicator.update(n),
            (true, _) => {}
        }
        state.count = count;
    }
}
