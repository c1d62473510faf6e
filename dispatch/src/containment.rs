//! Panic containment at the boundary.
//!
//! Every dispatch entry point runs its body through [`contain`] (or
//! [`catch`] for entry points with their own status space). A panic in a
//! capability implementation becomes an error value for that one call; it
//! never unwinds into the native engine.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{BridgeError, BridgeResult};

/// Run `f`, turning a panic into `Err(message)`.
///
/// The panic is logged at `error` level together with a backtrace.
pub fn catch<T>(op: &'static str, f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        let backtrace = Backtrace::force_capture();
        log::error!("panic in {}: {}\n{}", op, message, backtrace);
        message
    })
}

/// Run a dispatch body, turning a panic into `BridgeError::Panic`.
pub fn contain<T>(op: &'static str, f: impl FnOnce() -> BridgeResult<T>) -> BridgeResult<T> {
    match catch(op, f) {
        Ok(result) => result,
        Err(message) => Err(BridgeError::Panic { op, message }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
