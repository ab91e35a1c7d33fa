// IrqLab - Interrupt Injection Sandbox
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{IrqError, IrqHandler, IrqResult, LineId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};

/// Registration state of one interrupt line.
///
/// Lines move through `Unregistered -> Registered(Disabled) ->
/// Registered(Enabled) <-> Registered(Disabled)`. Dispatch never changes this
/// state; it only holds the `dispatch` token for the duration of the handler
/// call.
struct LineSlot {
    enabled: AtomicBool,
    /// Held while the line's handler executes. Guarantees at-most-one
    /// in-flight invocation per line.
    dispatch: Mutex<()>,
    handler: Arc<dyn IrqHandler>,
}

impl fmt::Debug for LineSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineSlot")
            .field("enabled", &self.enabled.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Software interrupt controller.
///
/// Owns the registration table and the enable state per line, and models the
/// hardware's trap into interrupt context as a synchronous call: `inject`
/// invokes the bound handler before returning. The controller itself holds no
/// peripheral state; invoking the handler is the only externally visible
/// effect of an injection.
#[derive(Debug, Default)]
pub struct IrqController {
    lines: Mutex<HashMap<LineId, Arc<LineSlot>>>,
    ignored_injections: AtomicU64,
    dispatched: AtomicU64,
}

impl IrqController {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, line: LineId) -> Option<Arc<LineSlot>> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&line)
            .cloned()
    }

    /// Bind a handler to a line. One handler per line; a second registration
    /// fails and leaves the original binding intact. Newly registered lines
    /// start disabled.
    pub fn register(&self, line: LineId, handler: Arc<dyn IrqHandler>) -> IrqResult<()> {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.contains_key(&line) {
            return Err(IrqError::AlreadyRegistered(line));
        }
        lines.insert(
            line,
            Arc::new(LineSlot {
                enabled: AtomicBool::new(false),
                dispatch: Mutex::new(()),
                handler,
            }),
        );
        tracing::debug!(line, "handler registered");
        Ok(())
    }

    /// Allow injections on the line to reach its handler.
    pub fn enable(&self, line: LineId) -> IrqResult<()> {
        let slot = self.slot(line).ok_or(IrqError::UnknownLine(line))?;
        slot.enabled.store(true, Ordering::Release);
        tracing::debug!(line, "line enabled");
        Ok(())
    }

    /// Stop injections from reaching the handler. Does not unregister it.
    pub fn disable(&self, line: LineId) -> IrqResult<()> {
        let slot = self.slot(line).ok_or(IrqError::UnknownLine(line))?;
        slot.enabled.store(false, Ordering::Release);
        tracing::debug!(line, "line disabled");
        Ok(())
    }

    pub fn is_enabled(&self, line: LineId) -> IrqResult<bool> {
        let slot = self.slot(line).ok_or(IrqError::UnknownLine(line))?;
        Ok(slot.enabled.load(Ordering::Acquire))
    }

    /// Synthetically trigger a line as if the underlying condition occurred.
    ///
    /// Unknown lines fail with `UnknownLine` and have no side effect.
    /// Disabled lines never reach the handler; like the hardware, the
    /// injection is benign, counted in [`ignored_injections`] and reported as
    /// `LineDisabled` so callers can log it. A second injection while the
    /// line's handler is mid-flight fails with `LineBusy` instead of
    /// re-entering the handler (single-core, non-nested interrupt model).
    ///
    /// [`ignored_injections`]: IrqController::ignored_injections
    pub fn inject(&self, line: LineId) -> IrqResult<()> {
        let slot = self.slot(line).ok_or(IrqError::UnknownLine(line))?;

        if !slot.enabled.load(Ordering::Acquire) {
            self.ignored_injections.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(line, "injection ignored, line disabled");
            return Err(IrqError::LineDisabled(line));
        }

        let _dispatching = match slot.dispatch.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(IrqError::LineBusy(line)),
            // A handler that panicked mid-flight does not retire the line.
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        tracing::trace!(line, "dispatching");
        slot.handler.handle();
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of injections dropped because the target line was disabled.
    pub fn ignored_injections(&self) -> u64 {
        self.ignored_injections.load(Ordering::Relaxed)
    }

    /// Number of handler invocations that ran to completion.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> serde_json::Value {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        let mut per_line: Vec<(LineId, bool)> = lines
            .iter()
            .map(|(id, slot)| (*id, slot.enabled.load(Ordering::Relaxed)))
            .collect();
        per_line.sort_by_key(|(id, _)| *id);

        serde_json::json!({
            "lines": per_line
                .iter()
                .map(|(id, enabled)| serde_json::json!({ "line": id, "enabled": enabled }))
                .collect::<Vec<_>>(),
            "dispatched": self.dispatched(),
            "ignored_injections": self.ignored_injections(),
        })
    }
}
