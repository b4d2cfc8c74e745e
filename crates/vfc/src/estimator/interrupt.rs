use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Cooperative stop request, polled at the top of every EM iteration.
///
/// A triggered interrupt ends the loop with
/// [`StopReason::Cancelled`](super::StopReason::Cancelled) and the last
/// consistent snapshot; it is not an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interrupt<'a> {
    flag: Option<&'a AtomicBool>,
    deadline: Option<Instant>,
}

impl<'a> Interrupt<'a> {
    /// Never triggers.
    pub fn none() -> Self {
        Self::default()
    }

    /// Trigger once `flag` is set to `true` (e.g. from another thread).
    pub fn with_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.flag = Some(flag);
        self
    }

    /// Trigger once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn is_triggered(&self) -> bool {
        if self.flag.is_some_and(|f| f.load(Ordering::SeqCst)) {
            return true;
        }
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
