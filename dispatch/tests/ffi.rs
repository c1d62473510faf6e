//! `extern "C"` surface integration tests.
//!
//! Call the entry points exactly as the native engine would: raw pointers,
//! i32 lengths, out-parameters, and explicit buffer release. The installed
//! bridge and the outstanding-buffer counter are process-wide, so every
//! test here runs under `SERIAL`.

mod common;

use std::ptr;
use std::sync::Arc;

use parking_lot::Mutex;

use extbridge_dispatch::ffi::*;
use extbridge_dispatch::{install, outstanding_buffers, Bridge, BridgeConfig, Registry};
use extbridge_hostapi::{CallContext, MemExterns};
use extbridge_primitives::{
    encode_put_many, Address, ConsensusFault, ConsensusFaultType, Protocol, ReservationStatus,
    StatusCode,
};

use common::*;

static SERIAL: Mutex<()> = parking_lot::const_mutex(());

const SUCCESS: i32 = 0;

fn code(status: StatusCode) -> i32 {
    status.as_i32()
}

fn get(handle: u64, key: &[u8]) -> (i32, *mut u8, i32) {
    let mut data: *mut u8 = ptr::null_mut();
    let mut len: i32 = -1;
    let rc = unsafe {
        host_blockstore_get(handle, key.as_ptr(), key.len() as i32, &mut data, &mut len)
    };
    (rc, data, len)
}

fn put(handle: u64, key: &[u8], data: &[u8]) -> i32 {
    unsafe {
        host_blockstore_put(
            handle,
            key.as_ptr(),
            key.len() as i32,
            data.as_ptr(),
            data.len() as i32,
        )
    }
}

fn has(handle: u64, key: &[u8]) -> i32 {
    unsafe { host_blockstore_has(handle, key.as_ptr(), key.len() as i32) }
}

// ── Test: nothing installed ──

#[test]
fn test_no_bridge_installed() {
    let _serial = SERIAL.lock();
    init_logging();
    let key = key_of(b"k");

    assert_eq!(has(0, &key), code(StatusCode::InvalidHandle));
    assert_eq!(put(0, &key, b"v"), code(StatusCode::InvalidHandle));
    let mut out = [0u8; 32];
    let rc = unsafe { host_extern_get_chain_randomness(0, 1, &mut out) };
    assert_eq!(rc, code(StatusCode::InvalidHandle));

    let mut msg: *mut u8 = ptr::null_mut();
    let mut msg_len: i32 = 0;
    let rc = unsafe { host_end_reservations(&mut msg, &mut msg_len) };
    assert_eq!(rc, ReservationStatus::NotImplemented.as_i32());
    unsafe { host_destroy_reservation_message(msg, msg_len) };
}

// ── Test: scenario through raw pointers, with buffer accounting ──

#[test]
fn test_scenario_and_buffer_ownership() {
    let _serial = SERIAL.lock();
    let (bridge, _, handle) = mem_bridge();
    let _guard = install(bridge);
    let baseline = outstanding_buffers();

    let key_x = key_of(b"hello");
    assert_eq!(has(handle, &key_x), 0);
    assert_eq!(put(handle, &key_x, b"hello"), SUCCESS);
    assert_eq!(has(handle, &key_x), 1);

    let (rc, data, len) = get(handle, &key_x);
    assert_eq!(rc, SUCCESS);
    assert_eq!(len, 5);
    assert_eq!(outstanding_buffers(), baseline + 1);
    let block = unsafe { std::slice::from_raw_parts(data, len as usize) }.to_vec();
    unsafe { host_buffer_free(data, len) };
    assert_eq!(block, b"hello");
    assert_eq!(outstanding_buffers(), baseline);

    // A miss allocates nothing and leaves the out-parameters alone.
    let (rc, data, len) = get(handle, &key_of(b"unknown"));
    assert_eq!(rc, code(StatusCode::NotFound));
    assert!(data.is_null());
    assert_eq!(len, -1);
    assert_eq!(outstanding_buffers(), baseline);

    // Null release is a no-op.
    unsafe { host_buffer_free(ptr::null_mut(), 0) };
    assert_eq!(outstanding_buffers(), baseline);
}

// ── Test: many gets, all released ──

#[test]
fn test_no_leak_across_many_gets() {
    let _serial = SERIAL.lock();
    let (bridge, externs, handle) = mem_bridge();
    let _guard = install(bridge);
    let baseline = outstanding_buffers();

    let keys: Vec<Vec<u8>> = (0u8..16)
        .map(|i| {
            let data = vec![i; 64];
            externs.store().insert(cid_of(&data), data.clone());
            key_of(&data)
        })
        .collect();

    let held: Vec<(*mut u8, i32)> = keys
        .iter()
        .map(|k| {
            let (rc, data, len) = get(handle, k);
            assert_eq!(rc, SUCCESS);
            (data, len)
        })
        .collect();
    assert_eq!(outstanding_buffers(), baseline + keys.len());

    for (data, len) in held {
        unsafe { host_buffer_free(data, len) };
    }
    assert_eq!(outstanding_buffers(), baseline);
}

// ── Test: pointer validation ──

#[test]
fn test_invalid_pointers_are_invalid_argument() {
    let _serial = SERIAL.lock();
    let (bridge, externs, handle) = mem_bridge();
    let _guard = install(bridge);
    let key = key_of(b"k");

    // Null key with non-zero length.
    let rc = unsafe { host_blockstore_put(handle, ptr::null(), 10, b"v".as_ptr(), 1) };
    assert_eq!(rc, code(StatusCode::InvalidArgument));

    // Negative data length.
    let rc = unsafe { host_blockstore_put(handle, key.as_ptr(), key.len() as i32, b"v".as_ptr(), -1) };
    assert_eq!(rc, code(StatusCode::InvalidArgument));

    // Null out-parameters.
    let rc = unsafe {
        host_blockstore_get(handle, key.as_ptr(), key.len() as i32, ptr::null_mut(), ptr::null_mut())
    };
    assert_eq!(rc, code(StatusCode::InvalidArgument));
    let rc = unsafe { host_extern_get_beacon_randomness(handle, 1, ptr::null_mut()) };
    assert_eq!(rc, code(StatusCode::InvalidArgument));

    // Negative lengths array size.
    let rc = unsafe { host_blockstore_put_many(handle, ptr::null(), -3, ptr::null(), 0) };
    assert_eq!(rc, code(StatusCode::InvalidArgument));

    assert!(externs.store().is_empty());

    // Handle resolution comes before pointer checks.
    let rc = unsafe { host_blockstore_put(handle + 1, ptr::null(), 10, ptr::null(), 10) };
    assert_eq!(rc, code(StatusCode::InvalidHandle));
}

// ── Test: put-many through the C surface ──

#[test]
fn test_put_many_wire_format() {
    let _serial = SERIAL.lock();
    let (bridge, externs, handle) = mem_bridge();
    let _guard = install(bridge);

    let blocks = vec![
        (cid_of(b"alpha"), b"alpha".to_vec()),
        (cid_of(b"beta"), b"beta".to_vec()),
    ];
    let (lengths, buf) = encode_put_many(&blocks).unwrap();
    let rc = unsafe {
        host_blockstore_put_many(
            handle,
            lengths.as_ptr(),
            lengths.len() as i32,
            buf.as_ptr(),
            buf.len() as i32,
        )
    };
    assert_eq!(rc, SUCCESS);
    assert_eq!(externs.store().len(), 2);

    // A declared length past the end of the buffer.
    let rc = unsafe {
        host_blockstore_put_many(handle, [1_000i32].as_ptr(), 1, buf.as_ptr(), buf.len() as i32)
    };
    assert_eq!(rc, code(StatusCode::InvalidArgument));
}

// ── Test: randomness and tipset ──

#[test]
fn test_randomness_and_tipset() {
    let _serial = SERIAL.lock();
    let (bridge, externs, handle) = mem_bridge();
    let _guard = install(bridge.clone());

    let mut out = [0u8; 32];
    let rc = unsafe { host_extern_get_chain_randomness(handle, 7, &mut out) };
    assert_eq!(rc, SUCCESS);
    assert_eq!(out, bridge.get_chain_randomness(handle, 7).unwrap());

    let cid = cid_of(b"tipset");
    externs.set_tipset(7, cid);
    let expected = cid.to_bytes();

    let mut buf = [0u8; 100];
    let rc = unsafe { host_extern_get_tipset_cid(handle, 7, buf.as_mut_ptr(), buf.len() as i32) };
    assert_eq!(rc, SUCCESS);
    assert_eq!(&buf[..expected.len()], expected.as_slice());

    let mut small = [0u8; 8];
    let rc = unsafe { host_extern_get_tipset_cid(handle, 7, small.as_mut_ptr(), small.len() as i32) };
    assert_eq!(rc, code(StatusCode::InvalidArgument));
}

// ── Test: consensus fault out-parameters ──

#[test]
fn test_consensus_fault_outputs() {
    let _serial = SERIAL.lock();
    let (bridge, externs, handle) = mem_bridge();
    let _guard = install(bridge);

    let verify = |miner: &mut u64, epoch: &mut i64, fault: &mut i64, gas: &mut i64| unsafe {
        host_extern_verify_consensus_fault(
            handle,
            b"h1".as_ptr(),
            2,
            b"h2".as_ptr(),
            2,
            ptr::null(),
            0,
            miner,
            epoch,
            fault,
            gas,
        )
    };

    externs.set_fault_verdict(
        Some(ConsensusFault {
            target: Address::new_id(1_001),
            epoch: 55,
            fault_type: ConsensusFaultType::ParentGrinding,
        }),
        12,
    );
    let (mut miner, mut epoch, mut fault, mut gas) = (0u64, 0i64, -1i64, -1i64);
    assert_eq!(verify(&mut miner, &mut epoch, &mut fault, &mut gas), SUCCESS);
    assert_eq!((miner, epoch, fault, gas), (1_001, 55, 2, 12));

    // Unresolvable target: fault and gas are still reported.
    externs.set_fault_verdict(
        Some(ConsensusFault {
            target: Address::new_opaque(Protocol::Bls, vec![1; 48]).unwrap(),
            epoch: 56,
            fault_type: ConsensusFaultType::DoubleForkMining,
        }),
        19,
    );
    let (mut miner, mut epoch, mut fault, mut gas) = (0u64, 0i64, -1i64, -1i64);
    assert_eq!(verify(&mut miner, &mut epoch, &mut fault, &mut gas), code(StatusCode::Io));
    assert_eq!((fault, gas), (1, 19));
    assert_eq!((miner, epoch), (0, 0));
}

// ── Test: panics stop at the boundary ──

#[test]
fn test_panic_returns_status() {
    let _serial = SERIAL.lock();
    init_logging();
    let registry = Arc::new(Registry::new());
    let bad = registry.register(CallContext::new(), Arc::new(PanickingExterns));
    let good = registry.register(CallContext::new(), Arc::new(MemExterns::new(HEAD)));
    let _guard = install(Arc::new(Bridge::new(registry, BridgeConfig::default())));
    let baseline = outstanding_buffers();

    let key = key_of(b"k");
    let (rc, data, _) = get(bad, &key);
    assert_eq!(rc, code(StatusCode::Panic));
    assert!(data.is_null());
    assert_eq!(put(bad, &key, b"v"), code(StatusCode::Panic));
    assert_eq!(outstanding_buffers(), baseline);

    assert_eq!(put(good, &key, b"v"), SUCCESS);
    assert_eq!(has(good, &key), 1);
}

// ── Test: reservation messages ──

#[test]
fn test_reservation_messages() {
    let _serial = SERIAL.lock();
    let bridge = reserving_bridge(funded_balances(), BridgeConfig::default());
    let _guard = install(bridge);
    let baseline = outstanding_buffers();

    let (mut msg, mut msg_len): (*mut u8, i32) = (ptr::null_mut(), 0);
    let rc = unsafe { host_end_reservations(&mut msg, &mut msg_len) };
    assert_eq!(rc, ReservationStatus::SessionClosed.as_i32());
    assert!(!msg.is_null());
    assert_eq!(outstanding_buffers(), baseline + 1);
    let text = unsafe { std::slice::from_raw_parts(msg, msg_len as usize) };
    assert!(!String::from_utf8_lossy(text).is_empty());
    unsafe { host_destroy_reservation_message(msg, msg_len) };
    assert_eq!(outstanding_buffers(), baseline);

    let encoded = plan(&[(100, 3)]);
    let rc = unsafe {
        host_begin_reservations(encoded.as_ptr(), encoded.len() as i32, &mut msg, &mut msg_len)
    };
    assert_eq!(rc, ReservationStatus::Ok.as_i32());
    assert!(msg.is_null());
    assert_eq!(msg_len, 0);

    // Second begin fails; discard the message by passing null.
    let rc = unsafe {
        host_begin_reservations(
            encoded.as_ptr(),
            encoded.len() as i32,
            ptr::null_mut(),
            ptr::null_mut(),
        )
    };
    assert_eq!(rc, ReservationStatus::SessionOpen.as_i32());
    assert_eq!(outstanding_buffers(), baseline);

    // Null plan with a length is an accounting violation.
    let rc = unsafe { host_begin_reservations(ptr::null(), 8, ptr::null_mut(), ptr::null_mut()) };
    assert_eq!(rc, ReservationStatus::InvariantViolation.as_i32());
}

// ── Test: empty plan with nothing installed ──

#[test]
fn test_empty_plan_without_bridge() {
    let _serial = SERIAL.lock();
    init_logging();
    let (mut msg, mut msg_len): (*mut u8, i32) = (ptr::null_mut(), 0);
    let rc = unsafe { host_begin_reservations(ptr::null(), 0, &mut msg, &mut msg_len) };
    assert_eq!(rc, ReservationStatus::Ok.as_i32());
    assert!(msg.is_null());
    assert_eq!(msg_len, 0);

    let encoded = plan(&[(100, 1)]);
    let rc = unsafe {
        host_begin_reservations(encoded.as_ptr(), encoded.len() as i32, &mut msg, &mut msg_len)
    };
    assert_eq!(rc, ReservationStatus::NotImplemented.as_i32());
    unsafe { host_destroy_reservation_message(msg, msg_len) };
}

// ── Test: message out-parameters cleared one by one ──

#[test]
fn test_single_message_out_param_is_cleared() {
    let _serial = SERIAL.lock();
    let bridge = reserving_bridge(funded_balances(), BridgeConfig::default());
    let _guard = install(bridge);
    let baseline = outstanding_buffers();

    // Only the length is supplied; it is cleared and nothing is allocated.
    let mut msg_len: i32 = 77;
    let rc = unsafe { host_end_reservations(ptr::null_mut(), &mut msg_len) };
    assert_eq!(rc, ReservationStatus::SessionClosed.as_i32());
    assert_eq!(msg_len, 0);

    // Only the pointer is supplied.
    let mut stale = [0u8; 1];
    let mut msg: *mut u8 = stale.as_mut_ptr();
    let rc = unsafe { host_end_reservations(&mut msg, ptr::null_mut()) };
    assert_eq!(rc, ReservationStatus::SessionClosed.as_i32());
    assert!(msg.is_null());

    assert_eq!(outstanding_buffers(), baseline);
}

// ── Test: install guard lifetime ──

#[test]
fn test_install_guard_uninstalls() {
    let _serial = SERIAL.lock();
    let (bridge, _, handle) = mem_bridge();
    let key = key_of(b"k");
    {
        let guard = install(bridge.clone());
        assert!(Arc::ptr_eq(guard.bridge(), &bridge));
        assert_eq!(has(handle, &key), 0);
    }
    assert!(installed().is_none());
    assert_eq!(has(handle, &key), code(StatusCode::InvalidHandle));
}
