//! `extern "C"` entry points called by the native engine.
//!
//! The host installs a [`Bridge`] with [`install`] before starting the
//! engine and keeps the returned [`InstallGuard`] alive for as long as the
//! engine may call back. With no bridge installed, handle-taking entry
//! points return `InvalidHandle` and reservation entry points return
//! `NotImplemented`.
//!
//! Each entry point resolves the handle, validates every raw pointer, then
//! delegates to the safe `Bridge` method. The whole body runs under
//! [`contain`], so no panic unwinds into the caller.
//!
//! Buffers returned through `*mut *mut u8` out-parameters are owned by the
//! caller and must be released exactly once with [`host_buffer_free`] (block
//! data) or [`host_destroy_reservation_message`] (reservation diagnostics).

use std::ptr;
use std::sync::Arc;

use parking_lot::RwLock;

use extbridge_primitives::{ReservationStatus, StatusCode};

use crate::bridge::Bridge;
use crate::containment::contain;
use crate::error::{BridgeError, BridgeResult};
use crate::memory::{borrow_bytes, borrow_output, borrow_slice, out_param, OwnedBuffer};
use crate::reservation::{ReservationError, ReservationResult};

static INSTALLED: RwLock<Option<Arc<Bridge>>> = parking_lot::const_rwlock(None);

/// Keeps a bridge installed. Dropping it uninstalls the bridge, unless a
/// different one has been installed since.
#[must_use = "the bridge is uninstalled when the guard is dropped"]
#[derive(Debug)]
pub struct InstallGuard {
    bridge: Arc<Bridge>,
}

impl InstallGuard {
    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.bridge
    }
}

impl Drop for InstallGuard {
    fn drop(&mut self) {
        let mut slot = INSTALLED.write();
        if slot.as_ref().is_some_and(|b| Arc::ptr_eq(b, &self.bridge)) {
            *slot = None;
            log::debug!("bridge uninstalled");
        }
    }
}

/// Make `bridge` the target of every entry point in this module.
pub fn install(bridge: Arc<Bridge>) -> InstallGuard {
    let previous = INSTALLED.write().replace(bridge.clone());
    if previous.is_some() {
        log::warn!("replacing an installed bridge");
    }
    log::debug!("bridge installed");
    InstallGuard { bridge }
}

/// The currently installed bridge, if any.
pub fn installed() -> Option<Arc<Bridge>> {
    INSTALLED.read().clone()
}

fn resolve(handle: u64) -> BridgeResult<Arc<Bridge>> {
    let bridge = installed().ok_or(BridgeError::InvalidHandle(handle))?;
    bridge.ensure_handle(handle)?;
    Ok(bridge)
}

fn status(result: BridgeResult<()>) -> i32 {
    match result {
        Ok(()) => StatusCode::Success.as_i32(),
        Err(e) => e.status().as_i32(),
    }
}

/// # Safety
///
/// `out` must be null or valid for a 32-byte write.
#[no_mangle]
pub unsafe extern "C" fn host_extern_get_chain_randomness(
    handle: u64,
    epoch: i64,
    out: *mut [u8; 32],
) -> i32 {
    status(contain("host_extern_get_chain_randomness", || {
        let bridge = resolve(handle)?;
        let out = out_param(out)?;
        *out = bridge.get_chain_randomness(handle, epoch)?;
        Ok(())
    }))
}

/// # Safety
///
/// `out` must be null or valid for a 32-byte write.
#[no_mangle]
pub unsafe extern "C" fn host_extern_get_beacon_randomness(
    handle: u64,
    epoch: i64,
    out: *mut [u8; 32],
) -> i32 {
    status(contain("host_extern_get_beacon_randomness", || {
        let bridge = resolve(handle)?;
        let out = out_param(out)?;
        *out = bridge.get_beacon_randomness(handle, epoch)?;
        Ok(())
    }))
}

/// Verify a consensus fault.
///
/// `fault` and `gas_used` are written whenever verification itself ran,
/// including when the fault target cannot be resolved (`Io`). `miner_id`
/// and `epoch` are written only for a resolved fault.
///
/// # Safety
///
/// Each `(ptr, len)` input must describe readable memory; each out-pointer
/// must be null or valid for one write.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn host_extern_verify_consensus_fault(
    handle: u64,
    h1: *const u8,
    h1_len: i32,
    h2: *const u8,
    h2_len: i32,
    extra: *const u8,
    extra_len: i32,
    miner_id: *mut u64,
    epoch: *mut i64,
    fault: *mut i64,
    gas_used: *mut i64,
) -> i32 {
    status(contain("host_extern_verify_consensus_fault", || {
        let bridge = resolve(handle)?;
        let h1 = borrow_bytes(h1, h1_len)?;
        let h2 = borrow_bytes(h2, h2_len)?;
        let extra = borrow_bytes(extra, extra_len)?;
        let miner_id = out_param(miner_id)?;
        let epoch = out_param(epoch)?;
        let fault = out_param(fault)?;
        let gas_used = out_param(gas_used)?;

        match bridge.verify_consensus_fault(handle, h1, h2, extra) {
            Ok(report) => {
                *fault = report.fault_type;
                *gas_used = report.gas_used;
                if report.fault_type != 0 {
                    *miner_id = report.miner_id;
                    *epoch = report.epoch;
                }
                Ok(())
            }
            Err(BridgeError::UnresolvedTarget { report, source }) => {
                *fault = report.fault_type;
                *gas_used = report.gas_used;
                Err(BridgeError::UnresolvedTarget { report, source })
            }
            Err(e) => Err(e),
        }
    }))
}

/// Copy the tipset CID at `epoch` into `out` (capacity `out_len`).
///
/// # Safety
///
/// `out` must be valid for `out_len` byte writes.
#[no_mangle]
pub unsafe extern "C" fn host_extern_get_tipset_cid(
    handle: u64,
    epoch: i64,
    out: *mut u8,
    out_len: i32,
) -> i32 {
    status(contain("host_extern_get_tipset_cid", || {
        let bridge = resolve(handle)?;
        let out = borrow_output(out, out_len)?;
        bridge.get_tipset_cid(handle, epoch, out)?;
        Ok(())
    }))
}

/// Fetch a block. On success `*block` and `*block_len` describe a buffer
/// the caller must release with [`host_buffer_free`].
///
/// # Safety
///
/// `key` must describe `key_len` readable bytes; `block` and `block_len`
/// must be valid for one write each.
#[no_mangle]
pub unsafe extern "C" fn host_blockstore_get(
    handle: u64,
    key: *const u8,
    key_len: i32,
    block: *mut *mut u8,
    block_len: *mut i32,
) -> i32 {
    status(contain("host_blockstore_get", || {
        let bridge = resolve(handle)?;
        let key = borrow_bytes(key, key_len)?;
        let block = out_param(block)?;
        let block_len = out_param(block_len)?;

        let buf = bridge.blockstore_get(handle, key)?;
        let len = i32::try_from(buf.len()).map_err(|_| {
            BridgeError::invalid_argument(format!("block of {} bytes cannot be returned", buf.len()))
        })?;
        let (data, _) = buf.into_raw_parts();
        *block = data;
        *block_len = len;
        Ok(())
    }))
}

/// # Safety
///
/// `key` and `data` must describe readable memory of the given lengths.
#[no_mangle]
pub unsafe extern "C" fn host_blockstore_put(
    handle: u64,
    key: *const u8,
    key_len: i32,
    data: *const u8,
    data_len: i32,
) -> i32 {
    status(contain("host_blockstore_put", || {
        let bridge = resolve(handle)?;
        let key = borrow_bytes(key, key_len)?;
        let data = borrow_bytes(data, data_len)?;
        bridge.blockstore_put(handle, key, data)
    }))
}

/// Store a batch. `lengths[i]` is the byte length of record `i` in `buf`;
/// each record is a binary CID followed by the block payload.
///
/// # Safety
///
/// `lengths` must describe `lengths_len` readable, aligned `i32`s and `buf`
/// `buf_len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn host_blockstore_put_many(
    handle: u64,
    lengths: *const i32,
    lengths_len: i32,
    buf: *const u8,
    buf_len: i32,
) -> i32 {
    status(contain("host_blockstore_put_many", || {
        let bridge = resolve(handle)?;
        let lengths = borrow_slice(lengths, lengths_len)?;
        let buf = borrow_bytes(buf, buf_len)?;
        bridge.blockstore_put_many(handle, lengths, buf)
    }))
}

/// Returns `1` if the block exists, `0` if not, a negative status on error.
///
/// # Safety
///
/// `key` must describe `key_len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn host_blockstore_has(handle: u64, key: *const u8, key_len: i32) -> i32 {
    let result = contain("host_blockstore_has", || {
        let bridge = resolve(handle)?;
        let key = borrow_bytes(key, key_len)?;
        bridge.blockstore_has(handle, key)
    });
    match result {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(e) => e.status().as_i32(),
    }
}

/// Release a buffer returned by [`host_blockstore_get`]. Null is a no-op.
///
/// # Safety
///
/// `(ptr, len)` must be exactly as returned and not already released.
#[no_mangle]
pub unsafe extern "C" fn host_buffer_free(ptr: *mut u8, len: i32) {
    release(ptr, len);
}

unsafe fn release(ptr: *mut u8, len: i32) {
    if ptr.is_null() {
        return;
    }
    if len < 0 {
        log::warn!("release of buffer with negative length {}; leaking it", len);
        return;
    }
    drop(OwnedBuffer::from_raw_parts(ptr, len as usize));
}

// ── Reservations ──

/// Diagnostics longer than this are truncated.
const MAX_MESSAGE_LEN: usize = 4096;

/// Hand a diagnostic to the caller. Each non-null out-parameter is cleared
/// first; the message is only handed out when both are present.
unsafe fn report(
    result: ReservationResult<()>,
    msg: *mut *mut u8,
    msg_len: *mut i32,
) -> i32 {
    if !msg.is_null() {
        *msg = ptr::null_mut();
    }
    if !msg_len.is_null() {
        *msg_len = 0;
    }
    let (status, message) = match result {
        Ok(()) => return ReservationStatus::Ok.as_i32(),
        Err(e) => (e.status, e.message),
    };
    if !msg.is_null() && !msg_len.is_null() {
        let (data, len) = OwnedBuffer::new(truncate_message(message)).into_raw_parts();
        *msg = data;
        *msg_len = len as i32;
    }
    status.as_i32()
}

/// Cut `text` to at most `MAX_MESSAGE_LEN` bytes on a char boundary.
fn truncate_message(mut text: String) -> Vec<u8> {
    if text.len() > MAX_MESSAGE_LEN {
        let mut end = MAX_MESSAGE_LEN;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text.into_bytes()
}

fn no_bridge() -> ReservationError {
    ReservationError::new(ReservationStatus::NotImplemented, "no bridge installed")
}

/// Open a reservation session from an encoded plan.
///
/// An empty plan returns `Ok` without entering reservation mode. On
/// failure `*msg`/`*msg_len` receive a diagnostic the caller releases with
/// [`host_destroy_reservation_message`]. Either may be null to discard the
/// message.
///
/// # Safety
///
/// `plan` must describe `plan_len` readable bytes; `msg` and `msg_len`
/// must be null or valid for one write each.
#[no_mangle]
pub unsafe extern "C" fn host_begin_reservations(
    plan: *const u8,
    plan_len: i32,
    msg: *mut *mut u8,
    msg_len: *mut i32,
) -> i32 {
    // Empty plans are a no-op even without an installed bridge.
    if plan_len == 0 {
        return report(Ok(()), msg, msg_len);
    }
    let result = installed().ok_or_else(no_bridge).and_then(|bridge| {
        let plan = borrow_bytes(plan, plan_len).map_err(|e| {
            ReservationError::new(ReservationStatus::InvariantViolation, e.to_string())
        })?;
        bridge.begin_reservations(plan)
    });
    report(result, msg, msg_len)
}

/// Close the current reservation session.
///
/// # Safety
///
/// `msg` and `msg_len` must be null or valid for one write each.
#[no_mangle]
pub unsafe extern "C" fn host_end_reservations(msg: *mut *mut u8, msg_len: *mut i32) -> i32 {
    let result = installed()
        .ok_or_else(no_bridge)
        .and_then(|bridge| bridge.end_reservations());
    report(result, msg, msg_len)
}

/// Release a reservation diagnostic. Null is a no-op.
///
/// # Safety
///
/// `(ptr, len)` must be exactly as returned and not already released.
#[no_mangle]
pub unsafe extern "C" fn host_destroy_reservation_message(ptr: *mut u8, len: i32) {
    release(ptr, len);
}
