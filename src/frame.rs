//! Thread-local stack of call-site source paths.
//!
//! Callers announce where their code lives by entering a frame before
//! calling into the store; [`crate::CallerResolver`] walks this stack
//! innermost-first. The [`callsite!`](crate::callsite) macro captures the
//! current source file without spelling out the path.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

thread_local! {
    static FRAMES: RefCell<Vec<PathBuf>> = RefCell::new(Vec::new());
}

/// Records `path` as the innermost call-site frame of the current thread
/// until the returned guard drops.
pub fn enter(path: impl AsRef<Path>) -> FrameGuard {
    FRAMES.with(|frames| frames.borrow_mut().push(path.as_ref().to_path_buf()));
    FrameGuard {
        _not_send: PhantomData,
    }
}

/// Pops its frame when dropped. `!Send`, the frame stack is per thread.
pub struct FrameGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        FRAMES.with(|frames| {
            frames.borrow_mut().pop();
        });
    }
}

/// Innermost-first snapshot of the calling thread's frames.
pub(crate) fn snapshot() -> Vec<PathBuf> {
    FRAMES.with(|frames| frames.borrow().iter().rev().cloned().collect())
}

/// Captures the current source file as a call-site frame.
///
/// Expands to [`frame::enter(file!())`](enter); bind the guard to keep
/// the frame alive for the duration of the calls it covers.
#[macro_export]
macro_rules! callsite {
    () => {
        $crate::frame::enter(::std::path::Path::new(file!()))
    };
}
