//! `none → active → terminated` state machine for a judge context (§4.2).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContextPhase {
    /// No judge context has been started for this loop.
    #[default]
    None,
    /// A judge context is live and mapped to a contextId.
    Active,
    /// The context has been torn down; no resurrection.
    Terminated,
}

/// Events driving a [`ContextPhase`] transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    Started,
    Terminated,
}

impl ContextPhase {
    /// Attempt a phase transition driven by `event`.
    ///
    /// ```text
    ///   None    --Started----> Active
    ///   Active  --Terminated-> Terminated
    ///   None    --Terminated-> Terminated   (idempotent terminate-before-start)
    /// ```
    ///
    /// All other combinations are invalid; `Terminated` never resurrects.
    pub fn transition(&self, event: PhaseEvent) -> Result<ContextPhase, String> {
        match (self, event) {
            (ContextPhase::None, PhaseEvent::Started) => Ok(ContextPhase::Active),
            (ContextPhase::Active, PhaseEvent::Terminated) => Ok(ContextPhase::Terminated),
            (ContextPhase::None, PhaseEvent::Terminated) => Ok(ContextPhase::Terminated),
            (current, event) => Err(format!(
                "invalid context phase transition: {current:?} + {event:?}"
            )),
        }
    }
}

impl std::fmt::Display for ContextPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextPhase::None => write!(f, "none"),
            ContextPhase::Active => write!(f, "active"),
            ContextPhase::Terminated => write!(f, "terminated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_started_becomes_active() {
        assert_eq!(
            ContextPhase::None.transition(PhaseEvent::Started),
            Ok(ContextPhase::Active)
        );
    }

    #[test]
    fn active_terminated_becomes_terminated() {
        assert_eq!(
            ContextPhase::Active.transition(PhaseEvent::Terminated),
            Ok(ContextPhase::Terminated)
        );
    }

    #[test]
    fn terminate_before_start_is_idempotent() {
        assert_eq!(
            ContextPhase::None.transition(PhaseEvent::Terminated),
            Ok(ContextPhase::Terminated)
        );
    }

    #[test]
    fn terminated_never_resurrects() {
        assert!(ContextPhase::Terminated
            .transition(PhaseEvent::Started)
            .is_err());
    }

    #[test]
    fn active_cannot_restart() {
        assert!(ContextPhase::Active.transition(PhaseEvent::Started).is_err());
    }
}
