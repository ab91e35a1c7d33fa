// IrqLab - Interrupt Injection Sandbox
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! In-memory stand-ins for the board peripherals the demos drive: a push
//! button, LEDs and the delay source. They keep the loop drivers free of any
//! global hardware state.

use crate::signals::DigitalLevel;
use crate::{Clock, OutputSink, TriggerSource};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Push button that replays a pre-scripted press pattern, one entry per poll.
/// An exhausted script reads as released.
#[derive(Debug, Default)]
pub struct ScriptedButton {
    script: Vec<bool>,
    cursor: AtomicUsize,
}

impl ScriptedButton {
    pub fn new(script: Vec<bool>) -> Self {
        Self {
            script,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Build a script of `total` polls that reads as pressed exactly at the
    /// given iteration indices.
    pub fn pressed_at(iterations: &[u64], total: u64) -> Self {
        let mut script = vec![false; total as usize];
        for &i in iterations {
            if let Some(entry) = script.get_mut(i as usize) {
                *entry = true;
            }
        }
        Self::new(script)
    }
}

impl TriggerSource for ScriptedButton {
    fn read(&self) -> bool {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.script.get(i).copied().unwrap_or(false)
    }
}

/// Output pin that retains the last written level, observable from tests and
/// from interrupt-context handlers alike.
#[derive(Debug, Default)]
pub struct VirtualLed {
    label: String,
    lit: AtomicBool,
}

impl VirtualLed {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            lit: AtomicBool::new(false),
        }
    }

    pub fn level(&self) -> DigitalLevel {
        self.lit.load(Ordering::Acquire).into()
    }

    pub fn is_lit(&self) -> bool {
        self.lit.load(Ordering::Acquire)
    }
}

impl OutputSink for VirtualLed {
    fn write(&self, level: DigitalLevel) {
        self.lit.store(level.into(), Ordering::Release);
        tracing::trace!(led = %self.label, ?level, "led write");
    }
}

/// Clock that really sleeps the calling thread.
#[derive(Debug, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn delay(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Clock for tests: records every requested delay and never sleeps.
#[derive(Debug, Default)]
pub struct ManualClock {
    delays: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay_count(&self) -> usize {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn total_delay(&self) -> Duration {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .sum()
    }
}

impl Clock for ManualClock {
    fn delay(&self, duration: Duration) {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}
