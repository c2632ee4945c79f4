//! Submission gating and unsaved-change tracking.
//!
//! Both are pure reads over a [`Session`]; callers hold whatever lock guards
//! the session while asking.

use crate::error::{Result, RosterError};
use crate::session::Session;

pub struct CompletionGate;

impl CompletionGate {
    pub fn can_submit(session: &Session) -> bool {
        session.counts().unmarked == 0
    }

    pub fn validate(session: &Session) -> Result<()> {
        match session.counts().unmarked {
            0 => Ok(()),
            remaining => Err(RosterError::Incomplete { remaining }),
        }
    }
}

pub struct DirtyTracker;

impl DirtyTracker {
    pub fn is_dirty(session: &Session) -> bool {
        session.is_dirty()
    }

    /// Navigation guard: a dirty session may only be dropped once the
    /// operator has confirmed.
    pub fn check_discard(session: &Session, confirmed: bool) -> Result<()> {
        if session.is_dirty() && !confirmed {
            Err(RosterError::UnsavedChanges)
        } else {
            Ok(())
        }
    }
}
