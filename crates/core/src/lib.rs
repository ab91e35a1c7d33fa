// IrqLab - Interrupt Injection Sandbox
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod board;
pub mod controller;
pub mod mainloop;
pub mod metrics;
pub mod sensor;
pub mod signals;

use std::sync::Arc;
use std::time::Duration;

use signals::DigitalLevel;

/// Identifier of a logical interrupt line, unique within one controller.
pub type LineId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IrqError {
    #[error("interrupt line {0} is not registered")]
    UnknownLine(LineId),
    #[error("interrupt line {0} already has a handler bound")]
    AlreadyRegistered(LineId),
    #[error("interrupt line {0} is disabled, injection ignored")]
    LineDisabled(LineId),
    #[error("interrupt line {0} is already dispatching")]
    LineBusy(LineId),
}

pub type IrqResult<T> = Result<T, IrqError>;

/// Trait for anything that can be polled from normal context to decide
/// whether a trigger condition holds (a push button in the demos).
///
/// `read` is side-effect-free from the caller's point of view and may be
/// called any number of times; consecutive reads only reflect the current
/// external state.
pub trait TriggerSource: Send {
    fn read(&self) -> bool;
}

/// Fire-and-forget output driven from either execution context (an LED in
/// the demos). No return value is observed by the core.
pub trait OutputSink: Send + Sync {
    fn write(&self, level: DigitalLevel);
}

/// Service routine bound to an interrupt line.
///
/// Handlers execute in interrupt context: they must be short, must not call
/// back into controller configuration (`register`/`enable`/`disable`), and
/// their only sanctioned channel back to normal context is a
/// [`signals::CompletionSignal`]. Handlers are assumed infallible; a handler
/// that never returns is undefined in this model.
pub trait IrqHandler: Send + Sync {
    fn handle(&self);
}

impl<F> IrqHandler for F
where
    F: Fn() + Send + Sync,
{
    fn handle(&self) {
        self()
    }
}

/// Delay provider injected into the loop drivers so tests can run without
/// wall-clock time.
pub trait Clock: Send {
    fn delay(&self, duration: Duration);
}

impl<T: Clock + Send + Sync + ?Sized> Clock for Arc<T> {
    fn delay(&self, duration: Duration) {
        (**self).delay(duration)
    }
}

/// Trait for observing loop events in a modular way.
pub trait LoopObserver: std::fmt::Debug + Send + Sync {
    fn on_loop_start(&self) {}
    fn on_loop_stop(&self) {}
    fn on_iteration(&self, _iteration: u64) {}
    fn on_injection(&self, _line: LineId, _outcome: &IrqResult<()>) {}
    fn on_completion(&self, _iteration: u64) {}
}
