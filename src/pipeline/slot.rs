//! Keep-only-latest frame slot between the camera and the analyzer

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam::utils::CachePadded;
use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;
use tokio::sync::Notify;
use tracing::trace;

use crate::capture::Frame;

/// Frame hand-off with "keep only latest" backpressure.
///
/// The producer never blocks: when the ring is full the oldest pending frame
/// is overwritten and released. The consumer gets the next frame only once
/// the frame it holds has been released, so at most one frame is in flight.
#[derive(Clone)]
pub struct LatestFrameSlot {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,
    ready: Notify,
    stats: CachePadded<Stats>,
}

struct State {
    ring: HeapRb<Frame>,
    in_flight: bool,
    closed: bool,
}

#[derive(Default)]
struct Stats {
    frames_pushed: AtomicU64,
    frames_delivered: AtomicU64,
    frames_dropped: AtomicU64,
}

/// Counters snapshot: (pushed, delivered, dropped)
pub type SlotStats = (u64, u64, u64);

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish_flight(&self) {
        self.lock().in_flight = false;
        self.ready.notify_one();
    }
}

impl LatestFrameSlot {
    pub fn new(depth: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    ring: HeapRb::new(depth.max(1)),
                    in_flight: false,
                    closed: false,
                }),
                ready: Notify::new(),
                stats: CachePadded::new(Stats::default()),
            }),
        }
    }

    /// Producer: offer a frame, overwriting the oldest pending one if full
    pub fn push(&self, frame: Frame) {
        let overwritten = {
            let mut state = self.shared.lock();
            state.ring.push_overwrite(frame)
        };
        self.shared.stats.frames_pushed.fetch_add(1, Ordering::Relaxed);

        if let Some(stale) = overwritten {
            trace!(sequence = stale.sequence(), "Dropping stale frame");
            self.shared.stats.frames_dropped.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("frames_dropped").increment(1);
            stale.release();
        }
        self.shared.ready.notify_one();
    }

    /// Consumer: wait for the next frame. `None` once closed and drained.
    pub async fn next(&self) -> Option<Frame> {
        loop {
            let notified = self.shared.ready.notified();
            {
                let mut state = self.shared.lock();
                if !state.in_flight {
                    if let Some(frame) = state.ring.try_pop() {
                        state.in_flight = true;
                        drop(state);
                        self.shared
                            .stats
                            .frames_delivered
                            .fetch_add(1, Ordering::Relaxed);
                        let shared = self.shared.clone();
                        return Some(frame.with_release(move |_| shared.finish_flight()));
                    }
                }
                if state.closed && state.ring.is_empty() {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Stop accepting new frames; pending frames are still delivered
    pub fn close(&self) {
        self.shared.lock().closed = true;
        self.shared.ready.notify_one();
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.shared.lock().ring.occupied_len()
    }

    pub fn stats(&self) -> SlotStats {
        let stats = &self.shared.stats;
        (
            stats.frames_pushed.load(Ordering::Relaxed),
            stats.frames_delivered.load(Ordering::Relaxed),
            stats.frames_dropped.load(Ordering::Relaxed),
        )
    }
}
