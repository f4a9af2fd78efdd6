//! Periodic cleanup of expired locks and ephemeral nodes.
//!
//! The cleaner is best-effort garbage collection: lazy status evaluation on
//! reads means clients never observe a lock past its TTL even when the
//! sweeper falls behind.

use crossbeam::channel::{bounded, RecvTimeoutError, Sender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

/// A registry the cleaner can drive time-based transitions on.
pub trait ExpirySweep: Send + Sync {
    /// Run one cleanup pass: delete lapsed entries and apply whatever
    /// hand-off the registry's semantics require.
    fn sweep(&self);
}

/// Single-threaded periodic sweeper over an [`ExpirySweep`] target.
///
/// The duty cycle is a timed wait on the stop channel rather than a bare
/// sleep, so `stop()` takes effect within one receive call instead of one
/// full interval.
pub struct ExpiryCleaner {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl ExpiryCleaner {
    /// Launch the sweeper thread; it sweeps `target` every `cleanup_interval`
    /// until stopped or dropped.
    pub fn start(target: Arc<dyn ExpirySweep>, cleanup_interval: Duration) -> Self {
        debug!(?cleanup_interval, "starting expiry cleaner");
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = std::thread::spawn(move || loop {
            match stop_rx.recv_timeout(cleanup_interval) {
                Err(RecvTimeoutError::Timeout) => {
                    debug!("running expiry sweep");
                    target.sweep();
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Request termination and join the sweeper thread.
    pub fn stop(&mut self) {
        debug!("stopping expiry cleaner");
        match self.stop_tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) | Err(TrySendError::Disconnected(())) => {}
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ExpiryCleaner {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSweep {
        ticks: AtomicUsize,
    }

    impl ExpirySweep for CountingSweep {
        fn sweep(&self) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_cleaner_ticks_and_stops() {
        let target = Arc::new(CountingSweep::default());
        let mut cleaner = ExpiryCleaner::start(
            Arc::clone(&target) as Arc<dyn ExpirySweep>,
            Duration::from_millis(20),
        );
        std::thread::sleep(Duration::from_millis(90));
        cleaner.stop();
        let ticks = target.ticks.load(Ordering::SeqCst);
        assert!(ticks >= 2, "expected at least two sweeps, saw {}", ticks);
        // No more ticks after stop.
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(target.ticks.load(Ordering::SeqCst), ticks);
    }

    #[test]
    fn test_stop_is_idempotent_and_prompt() {
        let target = Arc::new(CountingSweep::default());
        let mut cleaner = ExpiryCleaner::start(
            Arc::clone(&target) as Arc<dyn ExpirySweep>,
            Duration::from_secs(3600),
        );
        // Stopping mid-interval must not wait the interval out.
        cleaner.stop();
        cleaner.stop();
        assert_eq!(target.ticks.load(Ordering::SeqCst), 0);
    }
}
