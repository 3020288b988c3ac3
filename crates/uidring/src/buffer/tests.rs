use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::scope;

use crate::bits::BitsAllocator;
use crate::buffer::{
    BufferPaddingExecutor, BufferedUidProvider, DiscardPutBufferHandler, ErrorTakeBufferHandler,
    RingBuffer, SecondBatchProvider,
};
use crate::Error;

fn ring(buffer_size: usize, padding_factor: u32) -> RingBuffer {
    RingBuffer::new(
        buffer_size,
        padding_factor,
        Box::new(DiscardPutBufferHandler),
        Box::new(ErrorTakeBufferHandler),
    )
}

fn fill(ring: &RingBuffer, first_uid: i64) {
    let mut uid = first_uid;
    while ring.put(uid) {
        uid += 1;
    }
}

#[test]
fn put_accepts_exactly_buffer_size_entries() {
    let ring = ring(16, 50);
    for uid in 0..16 {
        assert!(ring.put(uid), "slot {uid} should be puttable");
    }
    assert!(!ring.put(16), "17th put must be refused");
    assert_eq!(ring.tail(), 15);
    assert_eq!(ring.cursor(), -1);
}

#[test]
fn first_take_consumes_slot_zero() {
    let ring = ring(16, 50);
    fill(&ring, 100);

    assert_eq!(ring.take().unwrap(), 100);
    assert_eq!(ring.cursor(), 0);

    // Once the start sentinel is gone the ring tops out at buffer_size - 1
    // outstanding slots: one take is not yet room, two takes are.
    assert!(!ring.put(200));
    assert_eq!(ring.take().unwrap(), 101);
    assert!(ring.put(200));
    assert_eq!(ring.tail(), 16);
}

#[test]
fn empty_ring_rejects_take() {
    let ring = ring(16, 50);
    assert_eq!(ring.take(), Err(Error::NoAvailable));
}

#[test]
fn threshold_crossing_fires_the_trigger() {
    // buffer_size=16, factor=50 -> threshold 8.
    let ring = Arc::new(ring(16, 50));
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    ring.set_padding_trigger(Box::new(move || {
        counter.fetch_add(1, Ordering::Relaxed);
    }));

    fill(&ring, 0);
    for _ in 0..8 {
        ring.take().unwrap();
    }
    assert_eq!(fired.load(Ordering::Relaxed), 0, "8 takes stay above P");

    ring.take().unwrap();
    assert_eq!(fired.load(Ordering::Relaxed), 1, "9th take crosses P");
}

#[test]
fn sequences_stay_valid_across_laps() {
    let ring = ring(4, 25);
    fill(&ring, 0);

    let mut seen = Vec::new();
    seen.push(ring.take().unwrap());
    seen.push(ring.take().unwrap());
    assert!(ring.put(4), "two frees leave room for one put");
    assert!(!ring.put(5), "three outstanding is this ring's limit");
    for _ in 0..3 {
        seen.push(ring.take().unwrap());
        assert!(ring.cursor() <= ring.tail());
        assert!(ring.tail() - ring.cursor() <= 3);
    }

    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    assert_eq!(ring.take(), Err(Error::NoAvailable));
    // Full 64-bit sequences survive the lap: cursor and tail keep counting
    // past the ring size instead of wrapping.
    assert_eq!(ring.tail(), 4);
    assert_eq!(ring.cursor(), 4);
}

#[test]
fn concurrent_takes_return_distinct_uids() {
    const THREADS: usize = 8;
    const TAKES_PER_THREAD: usize = 128;

    let ring = Arc::new(ring(1024, 50));
    fill(&ring, 0);

    let seen = Mutex::new(HashSet::with_capacity(1024));
    scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                let mut local = Vec::with_capacity(TAKES_PER_THREAD);
                for _ in 0..TAKES_PER_THREAD {
                    local.push(ring.take().unwrap());
                }
                let mut seen = seen.lock().unwrap();
                for uid in local {
                    assert!(seen.insert(uid), "duplicate uid {uid}");
                }
            });
        }
    });

    assert_eq!(seen.lock().unwrap().len(), THREADS * TAKES_PER_THREAD);
    assert_eq!(ring.take(), Err(Error::NoAvailable));
}

#[test]
fn cursors_and_flags_are_cache_line_padded() {
    use core::mem::{align_of, size_of};
    use core::sync::atomic::{AtomicI64, AtomicU8};
    use crossbeam_utils::CachePadded;

    assert!(size_of::<CachePadded<AtomicI64>>() > size_of::<AtomicI64>());
    assert!(size_of::<CachePadded<AtomicU8>>() > size_of::<AtomicU8>());
    assert!(align_of::<CachePadded<AtomicU8>>() >= 32);
}

#[test]
fn display_reports_cursors() {
    let ring = ring(16, 50);
    assert_eq!(
        ring.to_string(),
        "ring buffer [buffer_size=16, tail=-1, cursor=-1, padding_threshold=8]"
    );
}

#[test]
fn provider_emits_one_full_second_in_order() {
    let allocator = BitsAllocator::new(45, 15, 3).unwrap();
    let provider = SecondBatchProvider::new(allocator, 0, 3);

    let batch = provider.provide(1001).unwrap();
    assert_eq!(batch.len(), 8);
    assert_eq!(batch[0], allocator.allocate(1001, 3, 0));
    assert!(batch.windows(2).all(|pair| pair[1] == pair[0] + 1));

    // Recycled buffers come back out of the pool.
    provider.recycle(batch);
    let batch = provider.provide(1002).unwrap();
    assert_eq!(batch[0], allocator.allocate(1002, 3, 0));
}

#[test]
fn provider_rejects_exhausted_seconds() {
    // 5 timestamp bits: deltas past 31 no longer fit.
    let allocator = BitsAllocator::new(5, 50, 8).unwrap();
    let provider = SecondBatchProvider::new(allocator, 0, 1);

    assert!(provider.provide(31).is_ok());
    assert_eq!(
        provider.provide(32),
        Err(Error::TimestampExhausted { now: 32 })
    );
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

#[test]
fn executor_fills_an_empty_ring() {
    let rt = runtime();
    let _guard = rt.enter();

    let allocator = BitsAllocator::new(45, 15, 3).unwrap();
    let ring = Arc::new(ring(16, 50));
    let provider = SecondBatchProvider::new(allocator, 0, 3);
    let executor =
        BufferPaddingExecutor::new(Arc::clone(&ring), Box::new(provider), None, 1000).unwrap();

    executor.padding_buffer();

    // Two whole batches of 8 land before the third batch is refused.
    assert_eq!(ring.tail(), 15);
    assert_eq!(ring.cursor(), -1);
    assert!(ring.tail() - ring.cursor() >= 16 - 1 - allocator.max_sequence());
    assert_eq!(ring.take().unwrap(), allocator.allocate(1001, 3, 0));
}

#[test]
fn executor_last_second_never_decreases() {
    let rt = runtime();
    let _guard = rt.enter();

    let allocator = BitsAllocator::new(45, 15, 3).unwrap();
    let ring = Arc::new(ring(16, 50));
    let provider = SecondBatchProvider::new(allocator, 0, 3);
    let executor =
        BufferPaddingExecutor::new(Arc::clone(&ring), Box::new(provider), None, 1000).unwrap();

    let mut previous = executor.last_second();
    assert_eq!(previous, 1000);
    for _ in 0..4 {
        executor.padding_buffer();
        let current = executor.last_second();
        assert!(current >= previous, "last_second must be non-decreasing");
        previous = current;
    }
}

#[test]
fn executor_stops_when_the_provider_is_exhausted() {
    let rt = runtime();
    let _guard = rt.enter();

    // One batch of 256 fits the timestamp field; the next second does not.
    let allocator = BitsAllocator::new(5, 50, 8).unwrap();
    let ring = Arc::new(ring(512, 50));
    let provider = SecondBatchProvider::new(allocator, 0, 1);
    let executor =
        BufferPaddingExecutor::new(Arc::clone(&ring), Box::new(provider), None, 30).unwrap();

    executor.padding_buffer();

    assert_eq!(ring.tail(), 255);
    assert_eq!(ring.take().unwrap(), allocator.allocate(31, 1, 0));

    // The refill terminated cleanly: the gate is free for the next run, which
    // again stops on the exhausted provider rather than spinning.
    executor.padding_buffer();
    assert_eq!(ring.tail(), 255);
}

/// Provider that hands out tagged batches and records recycles, for
/// exercising the executor loop without bit packing in the way.
struct CountingProvider {
    batch_len: usize,
    recycled: AtomicUsize,
}

impl BufferedUidProvider for CountingProvider {
    fn provide(&self, moment_in_second: i64) -> crate::Result<Vec<i64>> {
        let base = moment_in_second * self.batch_len as i64;
        Ok((0..self.batch_len as i64).map(|seq| base + seq).collect())
    }

    fn recycle(&self, _batch: Vec<i64>) {
        self.recycled.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn executor_recycles_every_provided_batch() {
    let rt = runtime();
    let _guard = rt.enter();

    let ring = Arc::new(ring(16, 50));
    let provider = Arc::new(CountingProvider {
        batch_len: 8,
        recycled: AtomicUsize::new(0),
    });

    struct Shared(Arc<CountingProvider>);
    impl BufferedUidProvider for Shared {
        fn provide(&self, moment_in_second: i64) -> crate::Result<Vec<i64>> {
            self.0.provide(moment_in_second)
        }
        fn recycle(&self, batch: Vec<i64>) {
            self.0.recycle(batch);
        }
    }

    let executor = BufferPaddingExecutor::new(
        Arc::clone(&ring),
        Box::new(Shared(Arc::clone(&provider))),
        None,
        0,
    )
    .unwrap();

    executor.padding_buffer();

    // Batches for seconds 1..=3: two filled, the third refused mid-batch.
    // All three buffers must come back.
    assert_eq!(provider.recycled.load(Ordering::Relaxed), 3);
}
