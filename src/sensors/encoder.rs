//! Wheel encoder pulse counters.
//!
//! Each wheel has a single edge channel (A) plus a static direction level
//! (B).  An ISR fires on every rising edge of A and moves the wheel's
//! counter one step up or down depending on B.  The odometry task drains
//! all four counters at once.
//!
//! The counters are `AtomicI32` so the ISR never takes a lock.  The drain
//! masks interrupts for its four swaps, so no edge can land between
//! reading wheel 1 and resetting wheel 4.  On target the critical section
//! comes from esp-idf-hal and restores the previous interrupt state on
//! exit.  The host has no interrupts to mask, so there `on_edge` enters
//! the same critical section and a drain on another thread sees edges
//! whole or not at all.

use core::sync::atomic::{AtomicI32, Ordering};

use crate::motors::WHEEL_COUNT;

/// Four signed pulse counters, one per wheel.
pub struct EncoderBank {
    counts: [AtomicI32; WHEEL_COUNT],
}

impl EncoderBank {
    pub const fn new() -> Self {
        Self {
            counts: [
                AtomicI32::new(0),
                AtomicI32::new(0),
                AtomicI32::new(0),
                AtomicI32::new(0),
            ],
        }
    }

    /// Record one edge on `wheel` (zero-based).
    ///
    /// ISR context on target: bounded, lock-free, never blocks.  `forward`
    /// is the level of the wheel's direction channel at the edge.
    pub fn on_edge(&self, wheel: usize, forward: bool) {
        let Some(counter) = self.counts.get(wheel) else {
            return;
        };
        let step = if forward { 1 } else { -1 };

        #[cfg(target_os = "espidf")]
        {
            counter.fetch_add(step, Ordering::Relaxed);
        }

        #[cfg(not(target_os = "espidf"))]
        {
            critical_section::with(|_| counter.fetch_add(step, Ordering::Relaxed));
        }
    }

    /// Read all four counters and reset them to zero as one step.
    ///
    /// Interrupts are masked only for the four swaps; the mask in force
    /// before the call is restored afterwards.
    pub fn drain_and_reset(&self) -> [i32; WHEEL_COUNT] {
        critical_section::with(|_| {
            [
                self.counts[0].swap(0, Ordering::Relaxed),
                self.counts[1].swap(0, Ordering::Relaxed),
                self.counts[2].swap(0, Ordering::Relaxed),
                self.counts[3].swap(0, Ordering::Relaxed),
            ]
        })
    }

    /// Instantaneous count for diagnostics.  Does not reset.
    pub fn count(&self, wheel: usize) -> i32 {
        self.counts
            .get(wheel)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }
}

impl Default for EncoderBank {
    fn default() -> Self {
        Self::new()
    }
}

/// The board's encoder bank.  `static` because ESP-IDF GPIO ISR
/// callbacks cannot capture state.
pub static ENCODERS: EncoderBank = EncoderBank::new();

/// Entry point for the per-wheel GPIO ISRs.
pub fn encoder_isr_handler(wheel: usize, direction_high: bool) {
    ENCODERS.on_edge(wheel, direction_high);
}
