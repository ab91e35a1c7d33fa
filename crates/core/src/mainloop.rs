// IrqLab - Interrupt Injection Sandbox
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::board::{ScriptedButton, WallClock};
use crate::controller::IrqController;
use crate::signals::{CompletionSignal, DigitalLevel};
use crate::{Clock, IrqError, LineId, LoopObserver, OutputSink, TriggerSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cloneable stop handle for a running loop driver.
///
/// The original firmware loop never terminates; this handle is the
/// cancellation hook that lets a harness (or a signal handler) stop the loop
/// from outside.
#[derive(Debug, Clone, Default)]
pub struct LoopControl {
    stop: Arc<AtomicBool>,
}

impl LoopControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

/// Outcome summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct LoopReport {
    pub iterations: u64,
    pub injections_attempted: u64,
    pub injections_dispatched: u64,
    pub injections_ignored: u64,
    pub completions_observed: u64,
}

/// The normal-context polling loop.
///
/// Per iteration: poll the trigger source, inject the configured line on a
/// positive read, perform the timed background work (the heartbeat LED blink
/// standing in for the original's busy-wait delay), then observe the
/// completion signal and re-arm it if configured to. Single-threaded and
/// cooperative; no lock shared with the controller is held across the delay.
pub struct MainLoop<T: TriggerSource, C: Clock> {
    controller: Arc<IrqController>,
    line: LineId,
    trigger: T,
    clock: C,
    tick: Duration,
    done: Arc<CompletionSignal>,
    heartbeat: Option<Arc<dyn OutputSink>>,
    auto_rearm: bool,
    control: LoopControl,
    observers: Vec<Arc<dyn LoopObserver>>,
}

impl<T: TriggerSource, C: Clock> MainLoop<T, C> {
    pub fn new(
        controller: Arc<IrqController>,
        line: LineId,
        trigger: T,
        clock: C,
        done: Arc<CompletionSignal>,
    ) -> Self {
        Self {
            controller,
            line,
            trigger,
            clock,
            tick: Duration::from_millis(250),
            done,
            heartbeat: None,
            auto_rearm: true,
            control: LoopControl::new(),
            observers: Vec::new(),
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Output blinked once per iteration as the background timed work.
    pub fn with_heartbeat(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.heartbeat = Some(sink);
        self
    }

    /// Whether the loop clears the completion signal after observing it.
    /// Defaults to true so each trigger can be signalled anew.
    pub fn with_auto_rearm(mut self, auto_rearm: bool) -> Self {
        self.auto_rearm = auto_rearm;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn LoopObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Stop handle usable from another thread or from an observer.
    pub fn control(&self) -> LoopControl {
        self.control.clone()
    }

    /// Drive the loop for at most `max_iterations` (forever if `None`), or
    /// until the stop handle fires.
    pub fn run(&mut self, max_iterations: Option<u64>) -> LoopReport {
        let mut report = LoopReport::default();
        for observer in &self.observers {
            observer.on_loop_start();
        }

        loop {
            if self.control.is_stopped() {
                tracing::info!("loop stopped by control handle");
                break;
            }
            if let Some(max) = max_iterations {
                if report.iterations >= max {
                    break;
                }
            }
            let iteration = report.iterations;
            for observer in &self.observers {
                observer.on_iteration(iteration);
            }

            if self.trigger.read() {
                report.injections_attempted += 1;
                let outcome = self.controller.inject(self.line);
                for observer in &self.observers {
                    observer.on_injection(self.line, &outcome);
                }
                match &outcome {
                    Ok(()) => {
                        report.injections_dispatched += 1;
                        tracing::info!(line = self.line, iteration, "trigger dispatched");
                    }
                    Err(e @ (IrqError::LineDisabled(_) | IrqError::LineBusy(_))) => {
                        // Benign: the trigger is dropped, matching hardware
                        // that ignores masked or already-pending lines.
                        report.injections_ignored += 1;
                        tracing::debug!(line = self.line, iteration, error = %e, "injection dropped");
                    }
                    Err(e) => {
                        tracing::warn!(line = self.line, iteration, error = %e, "injection failed");
                    }
                }
            }

            // Background timed work: one heartbeat blink per iteration.
            if let Some(heartbeat) = &self.heartbeat {
                heartbeat.write(DigitalLevel::Low);
            }
            self.clock.delay(self.tick);
            if let Some(heartbeat) = &self.heartbeat {
                heartbeat.write(DigitalLevel::High);
            }

            if self.done.is_processed() {
                report.completions_observed += 1;
                for observer in &self.observers {
                    observer.on_completion(iteration);
                }
                if self.auto_rearm {
                    self.done.rearm();
                }
            }

            report.iterations += 1;
        }

        for observer in &self.observers {
            observer.on_loop_stop();
        }
        report
    }
}

impl MainLoop<ScriptedButton, WallClock> {
    /// Build the interrupt demo loop exactly as a scenario manifest
    /// describes it: scripted button presses, wall-clock delays.
    pub fn from_scenario(
        scenario: &irqlab_config::InterruptScenario,
        controller: Arc<IrqController>,
        done: Arc<CompletionSignal>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(scenario.tick_ms > 0, "scenario tick_ms must be non-zero");
        anyhow::ensure!(scenario.iterations > 0, "scenario iterations must be non-zero");
        anyhow::ensure!(
            scenario.iterations <= 1_000_000,
            "scripted scenarios are bounded to 1M iterations"
        );

        let trigger = ScriptedButton::pressed_at(&scenario.presses, scenario.iterations);
        Ok(
            Self::new(controller, scenario.line, trigger, WallClock, done)
                .with_tick(Duration::from_millis(scenario.tick_ms))
                .with_auto_rearm(scenario.auto_rearm),
        )
    }
}
