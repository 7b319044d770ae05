//! Producer and consumer on separate threads, standing in for the DMA
//! interrupt and the cooperative loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use sigpipe::io::SampleRing;

/// Push `blocks` ascending blocks of `block` samples from one thread while
/// another drains `batch` at a time. Total pushes stay below `u16::MAX` so
/// every delivered value is unique.
fn run<const C: usize>(block: usize, batch: usize, blocks: usize) {
    let pushed = block * blocks;
    assert!(pushed <= u16::MAX as usize);

    let ring: SampleRing<C> = SampleRing::new();
    let done = AtomicBool::new(false);

    let received = thread::scope(|s| {
        s.spawn(|| {
            let mut next = 0u16;
            let mut buf = vec![0u16; block];
            for n in 0..blocks {
                for (i, slot) in buf.iter_mut().enumerate() {
                    *slot = next + i as u16;
                }
                ring.push(&buf);
                next += block as u16;
                if n % 64 == 0 {
                    thread::yield_now();
                }
            }
            done.store(true, Ordering::Release);
        });

        let consumer = s.spawn(|| {
            let mut received = Vec::with_capacity(pushed);
            let mut dst = vec![0u16; batch];
            while !done.load(Ordering::Acquire) || !ring.is_empty() {
                assert!(ring.len() <= C);
                let got = ring.pop(&mut dst);
                assert!(got <= batch);
                received.extend_from_slice(&dst[..got]);
            }
            received
        });

        consumer.join().unwrap()
    });

    assert_eq!(ring.pushed(), pushed);
    assert_eq!(received.len() + ring.overflow_count(), pushed);
    assert!(
        received.windows(2).all(|w| w[0] < w[1]),
        "samples delivered out of order, stale or duplicated"
    );
    assert_eq!(received.last().copied(), Some((pushed - 1) as u16));
}

#[test]
fn concurrent_push_pop_never_delivers_stale_samples() {
    run::<256>(48, 64, 1_000);
}

#[test]
fn lapped_mid_copy_with_blocks_larger_than_ring() {
    // Every push laps the consumer; most pops race an overwrite.
    for _ in 0..50 {
        run::<8>(13, 3, 5_000);
    }
}

#[test]
fn lapped_mid_copy_with_small_blocks() {
    for _ in 0..50 {
        run::<16>(5, 7, 13_000);
    }
}

#[test]
fn single_sample_drains_against_full_ring() {
    for _ in 0..20 {
        run::<4>(4, 1, 16_000);
    }
}
