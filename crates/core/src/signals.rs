// IrqLab - Interrupt Injection Sandbox
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::sync::atomic::{AtomicBool, Ordering};

/// Represents a digital signal level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigitalLevel {
    #[default]
    Low,
    High,
}

impl From<bool> for DigitalLevel {
    fn from(b: bool) -> Self {
        if b {
            DigitalLevel::High
        } else {
            DigitalLevel::Low
        }
    }
}

impl From<DigitalLevel> for bool {
    fn from(level: DigitalLevel) -> Self {
        match level {
            DigitalLevel::High => true,
            DigitalLevel::Low => false,
        }
    }
}

/// Shared flag bridging interrupt context back to normal context.
///
/// The handler stores with `Release`; the polling loop loads with `Acquire`.
/// A load that observes `true` therefore also observes every write the
/// handler made before setting the flag, so readers see either the
/// pre-handler or the post-handler state, never a torn intermediate one.
///
/// The controller never clears this flag on its own. Only explicit
/// application logic re-arms it.
#[derive(Debug, Default)]
pub struct CompletionSignal {
    processed: AtomicBool,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called from interrupt context when the service routine has finished.
    pub fn mark_processed(&self) {
        self.processed.store(true, Ordering::Release);
    }

    pub fn is_processed(&self) -> bool {
        self.processed.load(Ordering::Acquire)
    }

    /// Clear the flag for the next trigger.
    pub fn rearm(&self) {
        self.processed.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_digital_level_conversions() {
        assert_eq!(DigitalLevel::from(true), DigitalLevel::High);
        assert_eq!(DigitalLevel::from(false), DigitalLevel::Low);
        assert_eq!(DigitalLevel::default(), DigitalLevel::Low);

        let b: bool = DigitalLevel::High.into();
        assert!(b);
    }

    #[test]
    fn test_completion_signal_lifecycle() {
        let signal = CompletionSignal::new();
        assert!(!signal.is_processed());
        signal.mark_processed();
        assert!(signal.is_processed());
        signal.rearm();
        assert!(!signal.is_processed());
    }

    #[test]
    fn test_completion_signal_cross_thread_visibility() {
        let signal = Arc::new(CompletionSignal::new());
        let writer = signal.clone();
        let t = std::thread::spawn(move || {
            writer.mark_processed();
        });
        t.join().unwrap();
        assert!(signal.is_processed());
    }
}
