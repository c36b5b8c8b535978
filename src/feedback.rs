//! Advisory feedback fired after a successful flag toggle.
//!
//! Implementations must not fail; nothing in the control flow depends on them.

use mockall::automock;
use tracing::debug;

#[automock]
pub trait Feedback {
    fn rumble_click(&self);
    fn settings_sound(&self);
}

/// Discards all feedback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFeedback;

impl Feedback for NoFeedback {
    fn rumble_click(&self) {}
    fn settings_sound(&self) {}
}

/// Logs feedback requests, for hosts without haptics or audio.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFeedback;

impl Feedback for TracingFeedback {
    fn rumble_click(&self) {
        debug!("feedback: rumble click");
    }

    fn settings_sound(&self) {
        debug!("feedback: settings sound");
    }
}
