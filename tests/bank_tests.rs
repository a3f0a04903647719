//! Behaviour of a single bank driven directly, without a registry.
//!
//! These tests use a mock transport and need no hardware.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use spi_shift_gpio::{BusError, Error, ShiftRegisterBank, TransferParams, Transport};

// Records every byte written. Fails writes while `fail` is set, and flags
// any write that starts while another is still in flight.
#[derive(Clone, Default)]
struct MockBus {
    writes: Arc<Mutex<Vec<u8>>>,
    fail: Arc<AtomicBool>,
    in_flight: Arc<AtomicBool>,
    overlaps: Arc<AtomicUsize>,
}

impl MockBus {
    fn written(&self) -> Vec<u8> {
        self.writes.lock().unwrap().clone()
    }
}

impl Transport for MockBus {
    fn configure(&mut self, _params: &TransferParams) -> Result<(), BusError> {
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        thread::yield_now();
        self.writes.lock().unwrap().extend_from_slice(bytes);
        self.in_flight.store(false, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            Err(BusError::NotResponding)
        } else {
            Ok(())
        }
    }
}

fn new_bank(bus: &MockBus) -> ShiftRegisterBank<MockBus> {
    ShiftRegisterBank::new("test", 12, 8, bus.clone()).expect("valid bank")
}

#[test]
fn test_set_line_scenario() {
    let bus = MockBus::default();
    let bank = new_bank(&bus);
    assert_eq!(bank.base(), 12);
    assert_eq!(bank.line_count(), 8);
    assert_eq!(bank.state(), 0x00);

    bank.set_line(0, true).unwrap();
    bank.set_line(4, true).unwrap();
    bank.set_line(0, false).unwrap();

    assert_eq!(bus.written(), vec![0x01, 0x11, 0x10]);
    assert_eq!(bank.state(), 0x10);
}

#[test]
fn test_one_transfer_per_call_even_without_change() {
    let bus = MockBus::default();
    let bank = new_bank(&bus);
    bank.set_line(2, true).unwrap();
    bank.set_line(2, true).unwrap();
    assert_eq!(bus.written(), vec![0x04, 0x04]);
}

#[test]
fn test_state_follows_call_history() {
    let bus = MockBus::default();
    let bank = new_bank(&bus);

    // Small LCG so the sequence is deterministic.
    let mut seed: u32 = 0x1234_5678;
    let mut expected: u8 = 0;
    for k in 0..200 {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let offset = (seed >> 16) % 8;
        let value = (seed >> 8) & 1 == 1;
        if value {
            expected |= 1 << offset;
        } else {
            expected &= !(1 << offset);
        }
        bank.set_line(offset, value).unwrap();
        assert_eq!(bus.written()[k], expected, "call {} (offset {})", k, offset);
    }
    assert_eq!(bank.state(), expected);
}

#[test]
fn test_out_of_range_offset_makes_no_transfer() {
    let bus = MockBus::default();
    let bank = new_bank(&bus);

    for offset in [8, 9, 31, u32::MAX] {
        match bank.set_line(offset, true) {
            Err(Error::LineOutOfRange {
                offset: o,
                line_count: 8,
            }) => assert_eq!(o, offset),
            other => panic!("expected LineOutOfRange, got {:?}", other),
        }
    }
    assert!(bus.written().is_empty());
    assert_eq!(bank.state(), 0x00);
}

#[test]
fn test_narrow_bank_limits_offsets() {
    let bus = MockBus::default();
    let bank = ShiftRegisterBank::new("narrow", 40, 4, bus.clone()).unwrap();
    bank.set_line(3, true).unwrap();
    assert!(matches!(
        bank.set_line(4, true),
        Err(Error::LineOutOfRange { .. })
    ));
    assert_eq!(bus.written(), vec![0x08]);
}

#[test]
fn test_transfer_failure_keeps_new_state() {
    let bus = MockBus::default();
    let bank = new_bank(&bus);
    bank.set_line(0, true).unwrap();

    bus.fail.store(true, Ordering::SeqCst);
    match bank.set_line(3, true) {
        Err(Error::Transfer(BusError::NotResponding)) => {}
        other => panic!("expected Transfer error, got {:?}", other),
    }
    // No rollback: bit 3 stays set even though the device may not have it.
    assert_eq!(bank.state(), 0x09);
    assert_eq!(bus.written(), vec![0x01, 0x09]);

    // The lock was released on the failure path.
    bus.fail.store(false, Ordering::SeqCst);
    bank.set_line(1, true).unwrap();
    assert_eq!(bus.written().last(), Some(&0x0B));
}

#[test]
fn test_concurrent_different_offsets_no_lost_update() {
    for _ in 0..50 {
        let bus = MockBus::default();
        let bank = Arc::new(new_bank(&bus));
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [1u32, 6]
            .into_iter()
            .map(|offset| {
                let bank = bank.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    bank.set_line(offset, true).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let written = bus.written();
        assert_eq!(written.len(), 2);
        // Either serial order yields 0x42 as the final byte.
        assert_eq!(*written.last().unwrap(), 0x42);
        assert!(written[0] == 0x02 || written[0] == 0x40);
        assert_eq!(bank.state(), 0x42);
    }
}

#[test]
fn test_transfers_never_overlap() {
    let bus = MockBus::default();
    let bank = Arc::new(new_bank(&bus));
    let rounds = 200;

    let handles: Vec<_> = (0..8u32)
        .map(|offset| {
            let bank = bank.clone();
            thread::spawn(move || {
                for i in 0..rounds {
                    bank.set_line(offset, i % 2 == 0).unwrap();
                }
                // Finish high on even offsets, low on odd ones.
                bank.set_line(offset, offset % 2 == 0).unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(bus.overlaps.load(Ordering::SeqCst), 0);
    let written = bus.written();
    assert_eq!(written.len(), 8 * (rounds + 1));
    assert_eq!(bank.state(), 0x55);
    assert_eq!(*written.last().unwrap(), 0x55);
}
