//! Presentation-side optimistic toggles.
//!
//! A toggle is flipped locally as soon as the viewer taps it, then settled
//! with the server's answer or rolled back. The caches never see the
//! speculative value; callers patch their own view models from [`OptimisticToggle::view`].

use crate::models::ToggleState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimisticState {
    Pending,
    Confirmed,
    Reverted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct OptimisticToggle {
    original: ToggleState,
    current: ToggleState,
    state: OptimisticState,
}

impl OptimisticToggle {
    /// Starts a toggle from the currently displayed state and flips it.
    pub fn begin(active: bool, count: u32) -> Self {
        let original = ToggleState { active, count };
        let current = ToggleState {
            active: !active,
            count: if active {
                count.saturating_sub(1)
            } else {
                count.saturating_add(1)
            },
        };
        Self {
            original,
            current,
            state: OptimisticState::Pending,
        }
    }

    pub fn view(&self) -> ToggleState {
        self.current
    }

    pub fn original(&self) -> ToggleState {
        self.original
    }

    pub fn state(&self) -> OptimisticState {
        self.state
    }

    pub fn confirm(mut self, server: ToggleState) -> Self {
        self.current = server;
        self.state = OptimisticState::Confirmed;
        self
    }

    pub fn revert(mut self) -> Self {
        self.current = self.original;
        self.state = OptimisticState::Reverted;
        self
    }

    pub fn settle<E>(self, result: &Result<ToggleState, E>) -> Self {
        match result {
            Ok(server) => self.confirm(*server),
            Err(_) => self.revert(),
        }
    }
}
