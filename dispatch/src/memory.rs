//! Boundary memory helpers with explicit ownership.
//!
//! Inputs from the native engine arrive as `(ptr, len)` pairs and are only
//! borrowed for the duration of one call. Variable-length outputs are
//! `OwnedBuffer`s whose ownership moves to the engine through
//! [`OwnedBuffer::into_raw_parts`] and comes back exactly once through
//! [`OwnedBuffer::from_raw_parts`] (the `host_buffer_free` entry point).
//!
//! Every live `OwnedBuffer`, including ones currently held by the engine,
//! is counted in [`outstanding_buffers`].

use std::mem::{self, ManuallyDrop};
use std::ptr;
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{BridgeError, BridgeResult};

static OUTSTANDING: AtomicUsize = AtomicUsize::new(0);

/// Number of boundary buffers allocated and not yet released.
pub fn outstanding_buffers() -> usize {
    OUTSTANDING.load(Ordering::SeqCst)
}

/// Borrow `len` elements starting at `ptr`.
///
/// A zero length yields an empty slice whatever `ptr` is. A negative
/// length, a null pointer with a non-zero length, or a misaligned pointer
/// is `InvalidArgument`.
///
/// # Safety
///
/// If the checks pass, `ptr` must point to `len` initialised elements that
/// stay valid and unmodified for `'a`.
pub unsafe fn borrow_slice<'a, T>(ptr: *const T, len: i32) -> BridgeResult<&'a [T]> {
    if len < 0 {
        return Err(BridgeError::invalid_argument(format!("negative length {}", len)));
    }
    if len == 0 {
        return Ok(Default::default());
    }
    if ptr.is_null() {
        return Err(BridgeError::invalid_argument("null pointer with non-zero length"));
    }
    if (ptr as usize) % mem::align_of::<T>() != 0 {
        return Err(BridgeError::invalid_argument("misaligned pointer"));
    }
    Ok(slice::from_raw_parts(ptr, len as usize))
}

/// Borrow an input byte buffer. See [`borrow_slice`].
///
/// # Safety
///
/// Same contract as [`borrow_slice`].
pub unsafe fn borrow_bytes<'a>(ptr: *const u8, len: i32) -> BridgeResult<&'a [u8]> {
    borrow_slice(ptr, len)
}

/// Borrow a caller-owned output buffer of `len` bytes.
///
/// # Safety
///
/// If the checks pass, `ptr` must point to `len` writable bytes not
/// aliased elsewhere for `'a`.
pub unsafe fn borrow_output<'a>(ptr: *mut u8, len: i32) -> BridgeResult<&'a mut [u8]> {
    if len < 0 {
        return Err(BridgeError::invalid_argument(format!("negative length {}", len)));
    }
    if len == 0 {
        return Ok(Default::default());
    }
    if ptr.is_null() {
        return Err(BridgeError::invalid_argument("null output buffer"));
    }
    Ok(slice::from_raw_parts_mut(ptr, len as usize))
}

/// Resolve an out-parameter. Null or misaligned is `InvalidArgument`.
///
/// # Safety
///
/// If the checks pass, `ptr` must be valid for writes of one `T` for `'a`.
pub unsafe fn out_param<'a, T>(ptr: *mut T) -> BridgeResult<&'a mut T> {
    if ptr.is_null() {
        return Err(BridgeError::invalid_argument("null out-parameter"));
    }
    if (ptr as usize) % mem::align_of::<T>() != 0 {
        return Err(BridgeError::invalid_argument("misaligned out-parameter"));
    }
    Ok(&mut *ptr)
}

/// A heap buffer handed across the boundary.
#[derive(PartialEq, Eq)]
pub struct OwnedBuffer {
    data: Box<[u8]>,
}

impl OwnedBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        OUTSTANDING.fetch_add(1, Ordering::SeqCst);
        Self {
            data: data.into_boxed_slice(),
        }
    }

    /// Allocate a buffer holding a copy of `data`.
    pub fn copy_from(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Give up ownership. The allocation stays counted as outstanding until
    /// it is rebuilt with [`from_raw_parts`](Self::from_raw_parts) and dropped.
    pub fn into_raw_parts(self) -> (*mut u8, usize) {
        let mut this = ManuallyDrop::new(self);
        let data = mem::take(&mut this.data);
        let len = data.len();
        (Box::into_raw(data) as *mut u8, len)
    }

    /// Take back a buffer released with [`into_raw_parts`](Self::into_raw_parts).
    ///
    /// # Safety
    ///
    /// `(ptr, len)` must come from one `into_raw_parts` call and must not
    /// have been reclaimed already.
    pub unsafe fn from_raw_parts(ptr: *mut u8, len: usize) -> Self {
        Self {
            data: Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)),
        }
    }
}

impl Drop for OwnedBuffer {
    fn drop(&mut self) {
        OUTSTANDING.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for OwnedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedBuffer").field("len", &self.len()).finish()
    }
}
