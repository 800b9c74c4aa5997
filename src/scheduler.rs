// src/scheduler.rs
//
// Deferred-task primitive bridging control-thread requests into the
// audio thread.
//
// One pair (Scheduler, SchedPoll) is bound to one owner. The control side
// prepares a payload and marks the task pending; the audio thread polls
// once per block and realizes at most one run per pending flag.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Pending flag lives in the top bit, the payload in the rest of the word.
const PENDING: u64 = 1 << 63;
const PAYLOAD_MASK: u64 = !PENDING;

/// A payload that can travel through the scheduler slot.
///
/// The encoded word must fit in 63 bits.
pub trait SchedPayload: Copy + Send + 'static {
    fn into_word(self) -> u64;
    fn from_word(word: u64) -> Self;
}

impl SchedPayload for () {
    #[inline]
    fn into_word(self) -> u64 {
        0
    }

    #[inline]
    fn from_word(_word: u64) -> Self {}
}

/// Work realized on the audio thread when a scheduled run is due.
///
/// Implementations must not allocate, block or perform lookups into
/// control-owned data. Everything they need arrives in the payload.
pub trait SchedTask {
    type Payload: SchedPayload;

    fn realize(&mut self, payload: Self::Payload);
}

struct SchedSlot {
    word: AtomicU64,
}

/// Control-side handle. Cheap to clone, safe to call from any
/// non-real-time thread.
pub struct Scheduler<T> {
    slot: Arc<SchedSlot>,
    _payload: PhantomData<fn(T)>,
}

/// Audio-thread handle. Exactly one exists per task.
pub struct SchedPoll<T> {
    slot: Arc<SchedSlot>,
    _payload: PhantomData<fn() -> T>,
}

/// Create a linked scheduler / poll pair for one owner.
pub fn sched_pair<T: SchedPayload>() -> (Scheduler<T>, SchedPoll<T>) {
    let slot = Arc::new(SchedSlot {
        word: AtomicU64::new(0),
    });

    let scheduler = Scheduler {
        slot: Arc::clone(&slot),
        _payload: PhantomData,
    };
    let poll = SchedPoll {
        slot,
        _payload: PhantomData,
    };

    (scheduler, poll)
}

impl<T: SchedPayload> Scheduler<T> {
    /// Mark the task pending, keeping the last prepared payload.
    ///
    /// Calling this while already pending does nothing more.
    #[inline]
    pub fn schedule(&self) {
        self.slot.word.fetch_or(PENDING, Ordering::Release);
    }

    /// Publish a payload and mark the task pending in one store.
    ///
    /// A newer payload replaces an unrealized older one.
    #[inline]
    pub fn schedule_with(&self, payload: T) {
        let word = payload.into_word();
        debug_assert_eq!(word & PENDING, 0, "scheduler payload exceeds 63 bits");
        self.slot
            .word
            .store(PENDING | (word & PAYLOAD_MASK), Ordering::Release);
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.slot.word.load(Ordering::Acquire) & PENDING != 0
    }
}

impl<T> Clone for Scheduler<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            _payload: PhantomData,
        }
    }
}

impl<T: SchedPayload> SchedPoll<T> {
    /// Take the pending run, if any.
    ///
    /// Audio-thread-safe: one relaxed load when idle, one atomic RMW when
    /// a run is due. Clears the pending flag as part of taking it.
    #[inline]
    pub fn poll(&self) -> Option<T> {
        if self.slot.word.load(Ordering::Relaxed) & PENDING == 0 {
            return None;
        }

        let prev = self.slot.word.fetch_and(PAYLOAD_MASK, Ordering::AcqRel);
        if prev & PENDING == 0 {
            return None;
        }
        Some(T::from_word(prev & PAYLOAD_MASK))
    }

    /// Poll and, if due, realize the task. Returns whether it ran.
    #[inline]
    pub fn run<S>(&self, task: &mut S) -> bool
    where
        S: SchedTask<Payload = T> + ?Sized,
    {
        match self.poll() {
            Some(payload) => {
                task.realize(payload);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[derive(Copy, Clone, Debug, PartialEq)]
    struct Value(u32);

    impl SchedPayload for Value {
        fn into_word(self) -> u64 {
            self.0 as u64
        }

        fn from_word(word: u64) -> Self {
            Value(word as u32)
        }
    }

    #[derive(Default)]
    struct Recorder {
        runs: Vec<u32>,
    }

    impl SchedTask for Recorder {
        type Payload = Value;

        fn realize(&mut self, payload: Value) {
            self.runs.push(payload.0);
        }
    }

    #[test]
    fn idle_poll_does_nothing() {
        let (_sched, poll) = sched_pair::<()>();
        assert_eq!(poll.poll(), None);
    }

    #[test]
    fn two_schedules_realize_once() {
        let (sched, poll) = sched_pair::<()>();
        sched.schedule();
        sched.schedule();
        assert!(sched.is_pending());

        assert_eq!(poll.poll(), Some(()));
        assert_eq!(poll.poll(), None);
        assert!(!sched.is_pending());
    }

    #[test]
    fn latest_payload_wins() {
        let (sched, poll) = sched_pair::<Value>();
        let mut recorder = Recorder::default();

        sched.schedule_with(Value(1));
        sched.schedule_with(Value(2));
        assert!(poll.run(&mut recorder));
        assert!(!poll.run(&mut recorder));

        assert_eq!(recorder.runs, vec![2]);
    }

    #[test]
    fn plain_schedule_reuses_last_payload() {
        let (sched, poll) = sched_pair::<Value>();
        sched.schedule_with(Value(7));
        assert_eq!(poll.poll(), Some(Value(7)));

        sched.schedule();
        assert_eq!(poll.poll(), Some(Value(7)));
    }

    #[test]
    fn cloned_schedulers_share_one_slot() {
        let (sched, poll) = sched_pair::<Value>();
        let other = sched.clone();
        sched.schedule_with(Value(3));
        other.schedule_with(Value(4));
        assert_eq!(poll.poll(), Some(Value(4)));
        assert_eq!(poll.poll(), None);
    }

    #[test]
    fn no_request_is_lost_across_threads() {
        let (sched, poll) = sched_pair::<Value>();

        let producer = thread::spawn(move || {
            for i in 1..=1000 {
                sched.schedule_with(Value(i));
            }
        });

        let mut last_seen = 0;
        while !producer.is_finished() {
            if let Some(Value(v)) = poll.poll() {
                assert!(v > last_seen, "realized a stale payload");
                last_seen = v;
            }
        }
        producer.join().unwrap();

        // Unrealized payloads are superseded, the final one is never lost.
        if let Some(Value(v)) = poll.poll() {
            assert!(v >= last_seen);
            last_seen = v;
        }
        assert_eq!(last_seen, 1000);
        assert_eq!(poll.poll(), None);
    }
}
