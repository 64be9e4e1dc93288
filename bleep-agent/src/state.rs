use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::AgentError;

/// A single pairing's progress, per device.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PairingState {
    Idle,
    Requested,
    WaitingForInput,
    Confirming,
    Bonding,
    Complete,
    Failed,
    Cancelled,
}

impl PairingState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Cancelled)
    }

    fn allowed_next(self) -> &'static [PairingState] {
        use PairingState::*;
        match self {
            Idle => &[Requested, Cancelled],
            Requested => &[WaitingForInput, Confirming, Bonding, Cancelled, Failed],
            WaitingForInput => &[Confirming, Bonding, Cancelled, Failed],
            Confirming => &[Bonding, Cancelled, Failed],
            Bonding => &[Complete, Failed, Cancelled],
            Complete | Failed | Cancelled => &[],
        }
    }

    fn transition(self, next: PairingState) -> Result<PairingState, AgentError> {
        if self.allowed_next().contains(&next) {
            Ok(next)
        } else {
            Err(AgentError::InvalidTransition { from: self, to: next })
        }
    }
}

/// Type of the callback fired when a device's pairing session reaches a
/// terminal state.
pub type TerminalCallback = dyn Fn(&str, PairingState) + Send + Sync;

/// Tracks one [`PairingState`] per device address, validating every
/// transition and firing a callback when a session reaches a terminal
/// state. Sessions are forgotten once terminal so a later pairing attempt
/// against the same device starts from `Idle` again.
pub struct SessionTracker {
    states: Mutex<HashMap<String, PairingState>>,
    on_terminal: Option<Arc<TerminalCallback>>,
}

impl SessionTracker {
    pub fn new(on_terminal: Option<Arc<TerminalCallback>>) -> Self {
        Self { states: Mutex::new(HashMap::new()), on_terminal }
    }

    pub fn state_of(&self, device: &str) -> PairingState {
        *self.states.lock().expect("session tracker mutex poisoned").get(device).unwrap_or(&PairingState::Idle)
    }

    pub fn advance(&self, device: &str, next: PairingState) -> Result<PairingState, AgentError> {
        let mut guard = self.states.lock().expect("session tracker mutex poisoned");
        let current = *guard.get(device).unwrap_or(&PairingState::Idle);
        let new_state = current.transition(next)?;
        if new_state.is_terminal() {
            guard.remove(device);
        } else {
            guard.insert(device.to_owned(), new_state);
        }
        drop(guard);
        if new_state.is_terminal() {
            if let Some(callback) = &self.on_terminal {
                callback(device, new_state);
            }
        }
        Ok(new_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_to_requested_is_allowed() {
        let tracker = SessionTracker::new(None);
        assert_eq!(tracker.advance("aa:bb", PairingState::Requested).unwrap(), PairingState::Requested);
    }

    #[test]
    fn skipping_straight_to_complete_is_rejected() {
        let tracker = SessionTracker::new(None);
        assert!(tracker.advance("aa:bb", PairingState::Complete).is_err());
    }

    #[test]
    fn terminal_state_fires_callback_and_resets_session() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        let tracker = SessionTracker::new(Some(Arc::new(move |device: &str, state| {
            *seen_clone.lock().unwrap() = Some((device.to_owned(), state));
        })));
        tracker.advance("aa:bb", PairingState::Requested).unwrap();
        tracker.advance("aa:bb", PairingState::Bonding).unwrap();
        tracker.advance("aa:bb", PairingState::Complete).unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(("aa:bb".to_owned(), PairingState::Complete)));
        assert_eq!(tracker.state_of("aa:bb"), PairingState::Idle);
    }

    #[test]
    fn cancel_is_allowed_from_any_nonterminal_state() {
        let tracker = SessionTracker::new(None);
        tracker.advance("aa:bb", PairingState::Requested).unwrap();
        tracker.advance("aa:bb", PairingState::WaitingForInput).unwrap();
        assert_eq!(tracker.advance("aa:bb", PairingState::Cancelled).unwrap(), PairingState::Cancelled);
    }
}
