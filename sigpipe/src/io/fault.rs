//! Sticky runtime fault flags.
//!
//! Interrupt handlers cannot return errors, so they record faults here with
//! a single atomic `fetch_or`. The cooperative context reads the flags on its
//! next `tick()` and decides what to do.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

/// A snapshot of raised fault bits.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Faults(u8);

impl Faults {
    /// No faults.
    pub const NONE: Faults = Faults(0);
    /// The timer fired while the previous timer handler was still running.
    pub const TIMER_OVERRUN: Faults = Faults(1 << 0);
    /// A block callback arrived while the previous one was still running.
    pub const ACQUISITION_OVERRUN: Faults = Faults(1 << 1);
    /// A delivered block length differed from the configured block size.
    pub const ACQUISITION_DESYNC: Faults = Faults(1 << 2);

    /// Raw bit pattern.
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `other` is set in `self`.
    pub const fn contains(self, other: Faults) -> bool {
        self.0 & other.0 == other.0
    }

    /// Bits set in `self` but not in `other`.
    pub const fn difference(self, other: Faults) -> Faults {
        Faults(self.0 & !other.0)
    }

    pub const fn union(self, other: Faults) -> Faults {
        Faults(self.0 | other.0)
    }
}

impl fmt::Debug for Faults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Faults(NONE)");
        }
        let mut set = f.debug_set();
        if self.contains(Faults::TIMER_OVERRUN) {
            set.entry(&"TIMER_OVERRUN");
        }
        if self.contains(Faults::ACQUISITION_OVERRUN) {
            set.entry(&"ACQUISITION_OVERRUN");
        }
        if self.contains(Faults::ACQUISITION_DESYNC) {
            set.entry(&"ACQUISITION_DESYNC");
        }
        set.finish()
    }
}

/// Atomic, sticky fault register shared between an interrupt handler and
/// the cooperative context.
pub struct FaultFlags {
    bits: AtomicU8,
}

impl FaultFlags {
    pub const fn new() -> Self {
        FaultFlags {
            bits: AtomicU8::new(0),
        }
    }

    /// Raise `faults`. ISR-safe: a single `fetch_or`.
    #[inline]
    pub fn raise(&self, faults: Faults) {
        self.bits.fetch_or(faults.0, Ordering::Release);
    }

    /// Current flags without clearing them.
    pub fn get(&self) -> Faults {
        Faults(self.bits.load(Ordering::Acquire))
    }

    /// Clear every flag, returning what was set.
    pub fn clear(&self) -> Faults {
        Faults(self.bits.swap(0, Ordering::AcqRel))
    }
}

impl Default for FaultFlags {
    fn default() -> Self {
        Self::new()
    }
}
