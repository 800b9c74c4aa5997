// src/notify.rs
//
// Coalescing "state changed" signal from the audio thread to a
// non-real-time observer.
//
// The transport is a channel with a queue depth of one. A full slot means
// a signal is outstanding, so bursts of changes collapse into one wake.
// The observer re-reads whatever it cares about; the signal carries no
// payload.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Signaling half, owned by the audio thread.
pub struct Notifier {
    tx: Sender<()>,
}

/// Observing half, owned by a control thread.
pub struct NotifyObserver {
    rx: Receiver<()>,
}

/// Create a linked notifier / observer pair.
pub fn notify_channel() -> (Notifier, NotifyObserver) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (Notifier { tx }, NotifyObserver { rx })
}

impl Notifier {
    /// Raise the signal unless one is already outstanding.
    ///
    /// Returns `true` if this call emitted a new signal. A closed observer
    /// means the signal is lost, which is never an error here.
    #[inline]
    pub fn notify(&self) -> bool {
        // A successful send wakes a receiver parked in `wait`, which briefly
        // takes the channel's waker mutex. That can happen at most once per
        // outstanding signal; a `Full` slot returns without touching it.
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) | Err(TrySendError::Disconnected(())) => false,
        }
    }

    #[inline]
    pub fn is_outstanding(&self) -> bool {
        self.tx.is_full()
    }
}

impl NotifyObserver {
    pub fn is_outstanding(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Acknowledge an outstanding signal. No-op if none is outstanding.
    ///
    /// Returns `true` if a signal was cleared.
    pub fn consume(&self) -> bool {
        self.rx.try_recv().is_ok()
    }

    /// Block until signaled or until `timeout` elapses, acknowledging the
    /// signal on wake.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.rx.recv_timeout(timeout).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn bursts_coalesce_into_one_signal() {
        let (notifier, observer) = notify_channel();

        assert!(notifier.notify());
        assert!(!notifier.notify());
        assert!(!notifier.notify());
        assert!(observer.is_outstanding());

        assert!(observer.consume());
        assert!(!observer.is_outstanding());
        assert!(!observer.consume());

        assert!(notifier.notify());
        assert!(observer.consume());
        assert!(!observer.consume());
    }

    #[test]
    fn consume_without_signal_is_noop() {
        let (notifier, observer) = notify_channel();
        assert!(!observer.consume());
        assert!(!notifier.is_outstanding());
    }

    #[test]
    fn dropped_observer_loses_signal_silently() {
        let (notifier, observer) = notify_channel();
        drop(observer);
        assert!(!notifier.notify());
    }

    #[test]
    fn wait_wakes_across_threads() {
        let (notifier, observer) = notify_channel();

        let waiter = thread::spawn(move || observer.wait(Duration::from_secs(5)));
        assert!(notifier.notify());

        assert!(waiter.join().unwrap());
        assert!(!notifier.is_outstanding());
    }

    #[test]
    fn wait_times_out_without_signal() {
        let (_notifier, observer) = notify_channel();
        assert!(!observer.wait(Duration::from_millis(10)));
    }
}
