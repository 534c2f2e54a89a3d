//! The explicit, thread-local call stack.
//!
//! Frames are entered with [`enter`] and left when the returned
//! [`FrameGuard`] drops. A guard cannot leave its thread, and each thread's
//! stack starts with a root frame that is never popped.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use dysco_types::{FrameId, Namespace};
use tracing::warn;

use crate::error::{ScopeError, ScopeResult};
use crate::frame::{FrameKind, FrameStorage};

thread_local! {
    static CALL_STACK: RefCell<Vec<Arc<FrameStorage>>> =
        RefCell::new(vec![Arc::new(FrameStorage::new(FrameKind::Root, Some("root".into())))]);
}

/// Keeps one frame on the current thread's stack.
///
/// Dropping the guard pops the frame and releases every scope the frame
/// owns. Use [`FrameGuard::exit`] to learn whether frames were left out of
/// order.
#[must_use = "the frame is popped as soon as the guard is dropped"]
#[derive(Debug)]
pub struct FrameGuard {
    frame: FrameId,
    active: bool,
    _not_send: PhantomData<*const ()>,
}

impl FrameGuard {
    /// Id of the frame this guard keeps alive.
    pub fn id(&self) -> FrameId {
        self.frame
    }

    /// Pop the frame now.
    ///
    /// The frame is removed even when it is not innermost; that case is
    /// reported as [`ScopeError::ExitOutOfOrder`].
    pub fn exit(mut self) -> ScopeResult<()> {
        self.active = false;
        remove_frame(self.frame)
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        match remove_frame(self.frame) {
            Ok(()) | Err(ScopeError::FrameNotActive(_)) => {}
            Err(e) => warn!(error = %e, "frame dropped out of order"),
        }
    }
}

/// Enter a new frame on the current thread.
pub fn enter() -> FrameGuard {
    push(FrameKind::Call, None)
}

/// Enter a new frame carrying a label for diagnostics.
pub fn enter_named(label: impl Into<String>) -> FrameGuard {
    push(FrameKind::Call, Some(label.into()))
}

/// Enter a frame that chain walks in `namespace` skip over.
///
/// Accessor layers wrapping a dynamic scope use this so their own frames do
/// not become scopes of that handle.
pub fn enter_hidden_from(namespace: Namespace) -> FrameGuard {
    push(FrameKind::HiddenFrom(namespace), None)
}

/// Run `f` inside a freshly entered frame.
pub fn with_frame<R>(f: impl FnOnce() -> R) -> R {
    let _frame = enter();
    f()
}

/// The current thread's frames, innermost first.
pub fn snapshot() -> Vec<Arc<FrameStorage>> {
    CALL_STACK.with(|stack| stack.borrow().iter().rev().cloned().collect())
}

/// The innermost frame on the current thread.
pub fn current_frame() -> Arc<FrameStorage> {
    // The root frame has no guard, so the stack is never empty.
    CALL_STACK.with(|stack| {
        let stack = stack.borrow();
        Arc::clone(&stack[stack.len() - 1])
    })
}

/// Number of frames on the current thread, root included.
pub fn depth() -> usize {
    CALL_STACK.with(|stack| stack.borrow().len())
}

fn push(kind: FrameKind, label: Option<String>) -> FrameGuard {
    let frame = Arc::new(FrameStorage::new(kind, label));
    let id = frame.id();
    CALL_STACK.with(|stack| stack.borrow_mut().push(frame));
    FrameGuard {
        frame: id,
        active: true,
        _not_send: PhantomData,
    }
}

fn remove_frame(id: FrameId) -> ScopeResult<()> {
    // The removed frame is dropped only after the stack borrow ends, since
    // dropping it releases its scopes.
    let removed = CALL_STACK
        .try_with(|stack| {
            let mut stack = stack.borrow_mut();
            let innermost = stack.last()?.id();
            let position = stack.iter().rposition(|frame| frame.id() == id)?;
            Some((stack.remove(position), innermost))
        })
        .ok()
        .flatten();

    match removed {
        Some((frame, innermost)) => {
            drop(frame);
            if innermost == id {
                Ok(())
            } else {
                Err(ScopeError::ExitOutOfOrder {
                    frame: id,
                    innermost,
                })
            }
        }
        None => Err(ScopeError::FrameNotActive(id)),
    }
}
