// IrqLab - Interrupt Injection Sandbox
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{IrqResult, LineId, LoopObserver};
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters collected while a loop driver runs.
#[derive(Debug, Default)]
pub struct LoopMetrics {
    iterations: AtomicU64,
    injections: AtomicU64,
    dispatched: AtomicU64,
    rejected: AtomicU64,
    completions: AtomicU64,
}

impl LoopMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::SeqCst)
    }

    pub fn injections(&self) -> u64 {
        self.injections.load(Ordering::SeqCst)
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::SeqCst)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::SeqCst)
    }

    pub fn completions(&self) -> u64 {
        self.completions.load(Ordering::SeqCst)
    }
}

impl LoopObserver for LoopMetrics {
    fn on_iteration(&self, _iteration: u64) {
        self.iterations.fetch_add(1, Ordering::SeqCst);
    }

    fn on_injection(&self, _line: LineId, outcome: &IrqResult<()>) {
        self.injections.fetch_add(1, Ordering::SeqCst);
        if outcome.is_ok() {
            self.dispatched.fetch_add(1, Ordering::SeqCst);
        } else {
            self.rejected.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_completion(&self, _iteration: u64) {
        self.completions.fetch_add(1, Ordering::SeqCst);
    }
}
