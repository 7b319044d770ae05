//! Lock-free single-producer single-consumer (SPSC) sample ring.
//!
//! Carries raw ADC codes from the DMA block-completion interrupt to the
//! cooperative loop. The producer never blocks and never fails: when the
//! consumer falls behind, the **oldest** unread samples are overwritten and
//! counted (see [`SampleRing::overflow_count`]).
//!
//! # Safety Contract
//!
//! - Only ONE context may call [`push()`](SampleRing::push) (the producer,
//!   i.e. the acquisition interrupt).
//! - Only ONE context may call [`pop()`](SampleRing::pop) (the consumer,
//!   i.e. the cooperative loop).
//!
//! Violating the contract cannot cause undefined behaviour (every slot is an
//! atomic), but it does corrupt cursors and counters.
//!
//! # Cursor discipline
//!
//! Both cursors are free-running sample counts; the slot index is
//! `cursor & (C - 1)`, which stays correct across `usize` wraparound because
//! `C` is a power of two. `write` is advanced only by the producer, `read`
//! only by the consumer. Because the producer may lap the consumer, it
//! publishes `reserve` (the end of the write in progress) *before* touching
//! any slot; after copying, the consumer re-checks `reserve` and discards any
//! copied position the producer may have overwritten underneath it.

use core::sync::atomic::{fence, AtomicU16, AtomicUsize, Ordering};

/// Lock-free SPSC ring of `u16` samples with a drop-oldest overflow policy.
///
/// # Type Parameters
///
/// - `C`: Capacity in samples. Must be a power of two. All `C` slots are
///   usable.
pub struct SampleRing<const C: usize> {
    slots: [AtomicU16; C],
    /// Samples ever committed by the producer.
    write: AtomicUsize,
    /// End of the producer's in-progress write; `write <= reserve`.
    reserve: AtomicUsize,
    /// Samples ever consumed or discarded by the consumer.
    read: AtomicUsize,
    /// Overflowed samples already settled by the consumer.
    dropped: AtomicUsize,
}

impl<const C: usize> SampleRing<C> {
    const MASK: usize = C - 1;

    /// Create an empty ring.
    ///
    /// # Panics
    ///
    /// Compile-time assertion: `C` must be a non-zero power of two.
    #[allow(clippy::declare_interior_mut_const)]
    pub const fn new() -> Self {
        assert!(C.is_power_of_two(), "sample ring capacity must be a power of two");

        const EMPTY: AtomicU16 = AtomicU16::new(0);
        SampleRing {
            slots: [EMPTY; C],
            write: AtomicUsize::new(0),
            reserve: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Capacity in samples.
    pub const fn capacity(&self) -> usize {
        C
    }

    /// Append `samples` (producer side).
    ///
    /// Never blocks and never rejects data. Unread samples that no longer
    /// fit are overwritten oldest-first; a block longer than `C` keeps only
    /// its newest `C` samples. Bounded time: at most `C` slot stores.
    pub fn push(&self, samples: &[u16]) {
        if samples.is_empty() {
            return;
        }
        let start = self.write.load(Ordering::Relaxed);
        let end = start.wrapping_add(samples.len());
        let skip = samples.len().saturating_sub(C);

        self.reserve.store(end, Ordering::Relaxed);
        // Pairs with the consumer's acquire fence: a consumer that observes
        // any of the slot stores below also observes the new `reserve`.
        fence(Ordering::Release);

        for (offset, &sample) in samples.iter().enumerate().skip(skip) {
            self.slots[start.wrapping_add(offset) & Self::MASK].store(sample, Ordering::Relaxed);
        }

        self.write.store(end, Ordering::Release);
    }

    /// Copy up to `dst.len()` of the oldest unread samples into `dst`
    /// (consumer side).
    ///
    /// Returns the number of samples written to the front of `dst`; `0` if
    /// the ring is empty. Never blocks; callers poll.
    pub fn pop(&self, dst: &mut [u16]) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let mut read = self.read.load(Ordering::Relaxed);
        let mut lost = 0;

        // The producer lapped us: everything older than `write - C` is gone.
        let pending = write.wrapping_sub(read);
        if pending > C {
            lost = pending - C;
            read = write.wrapping_sub(C);
        }

        let count = write.wrapping_sub(read).min(dst.len());
        for (i, out) in dst[..count].iter_mut().enumerate() {
            *out = self.slots[read.wrapping_add(i) & Self::MASK].load(Ordering::Relaxed);
        }

        fence(Ordering::Acquire);
        let reserve = self.reserve.load(Ordering::Relaxed);

        // Positions below `reserve - C` may have been rewritten while we copied.
        let oldest_intact = reserve.wrapping_sub(C);
        let torn = (oldest_intact.wrapping_sub(read) as isize).clamp(0, count as isize) as usize;
        if torn > 0 {
            dst.copy_within(torn..count, 0);
            lost += torn;
        }

        if lost > 0 {
            self.dropped.fetch_add(lost, Ordering::Relaxed);
        }
        self.read.store(read.wrapping_add(count), Ordering::Release);
        count - torn
    }

    /// Number of unread samples, always in `0..=C`.
    pub fn len(&self) -> usize {
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        write.wrapping_sub(read).min(C)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total samples lost to overflow since creation.
    ///
    /// Includes samples already overwritten but not yet noticed by the
    /// consumer. Exact from the consumer context; a best-effort snapshot
    /// elsewhere.
    pub fn overflow_count(&self) -> usize {
        let settled = self.dropped.load(Ordering::Relaxed);
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        settled.wrapping_add(write.wrapping_sub(read).saturating_sub(C))
    }

    /// Total samples ever pushed.
    pub fn pushed(&self) -> usize {
        self.write.load(Ordering::Acquire)
    }
}

impl<const C: usize> Default for SampleRing<C> {
    fn default() -> Self {
        Self::new()
    }
}
