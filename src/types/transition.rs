//! Transition durations.

use serde::{Deserialize, Serialize};

/// Fade duration in seconds forwarded to children with a command.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, PartialOrd)]
#[serde(transparent)]
pub struct Transition {
    pub(crate) seconds: f64,
}

impl Transition {
    /// Returns None for negative or non-finite durations.
    ///
    /// ```
    /// use relative_light_group::Transition;
    ///
    /// assert!(Transition::create(0.0).is_some());
    /// assert!(Transition::create(1.5).is_some());
    /// assert!(Transition::create(-1.0).is_none());
    /// ```
    pub fn create(seconds: f64) -> Option<Self> {
        if seconds.is_finite() && seconds >= 0.0 {
            Some(Transition { seconds })
        } else {
            None
        }
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }
}
