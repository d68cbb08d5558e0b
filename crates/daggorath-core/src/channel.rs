//! Audio channel completion signals.
//!
//! The mixer calls [`ChannelNotifier::notify`] from its own thread when a
//! clip finishes. Game code that must know "this sound is over" calls
//! [`ChannelSync::wait_for_channel`]. Completions are counted per channel,
//! so a signal raised before anyone waits is not lost, and several signals
//! raised together satisfy several waits.
//!
//! Blocking waits are only allowed where the host can afford them, and they
//! always carry a timeout. Non-blocking waits check the count once.

use std::sync::Arc;
use std::time::{Duration, Instant};

use daggorath_types::ChannelId;
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::warn;

use crate::config::HostConfig;

/// Errors from channel synchronization.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The channel id is not one of the configured channels.
    #[error("audio channel {channel} out of range (have {count})")]
    OutOfRange {
        /// The channel that was addressed.
        channel: ChannelId,
        /// Number of configured channels.
        count: usize,
    },
}

/// Whether a wait may block the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Wait on the completion signal, up to the configured timeout.
    Blocking,
    /// Check once and return.
    NonBlocking,
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A completion was consumed.
    Completed,
    /// Non-blocking check found no completion.
    Pending,
    /// The timeout elapsed first.
    TimedOut,
    /// The pump asked to stop waiting.
    Abandoned,
}

#[derive(Debug)]
struct Shared {
    completions: Mutex<Vec<u32>>,
    signal: Condvar,
}

/// Raises completion signals. Cheap to clone and safe to send to the mixer
/// thread.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    shared: Arc<Shared>,
}

impl ChannelNotifier {
    /// Record that the clip on `channel` finished and wake any waiter.
    ///
    /// Out-of-range channels are ignored.
    pub fn notify(&self, channel: ChannelId) {
        let mut completions = self.shared.completions.lock();
        if let Some(count) = completions.get_mut(channel.index()) {
            *count = count.saturating_add(1);
            drop(completions);
            self.shared.signal.notify_all();
        }
    }
}

/// Per-channel completion counters with bounded waits.
#[derive(Debug, Clone)]
pub struct ChannelSync {
    shared: Arc<Shared>,
    channel_count: usize,
    timeout: Duration,
    poll: Duration,
}

impl ChannelSync {
    /// Create counters for `channel_count` channels.
    ///
    /// A zero poll interval is raised to one millisecond.
    pub fn new(channel_count: usize, timeout: Duration, poll: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                completions: Mutex::new(vec![0; channel_count]),
                signal: Condvar::new(),
            }),
            channel_count,
            timeout,
            poll: poll.max(Duration::from_millis(1)),
        }
    }

    /// Build from the host section of the configuration.
    pub fn from_config(host: &HostConfig) -> Self {
        Self::new(
            host.channel_count,
            Duration::from_millis(host.channel_wait_timeout_ms),
            Duration::from_millis(host.channel_poll_ms),
        )
    }

    /// A handle for the mixer's completion callback.
    pub fn notifier(&self) -> ChannelNotifier {
        ChannelNotifier {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Number of configured channels.
    pub const fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Completions recorded on `channel` and not yet consumed.
    pub fn pending(&self, channel: ChannelId) -> u32 {
        self.shared
            .completions
            .lock()
            .get(channel.index())
            .copied()
            .unwrap_or(0)
    }

    /// Forget stale completions on `channel`, typically just before a new
    /// clip starts on it.
    pub fn clear(&self, channel: ChannelId) {
        if let Some(count) = self.shared.completions.lock().get_mut(channel.index()) {
            *count = 0;
        }
    }

    /// Wait for a completion on `channel`.
    ///
    /// In [`WaitMode::Blocking`] the wait wakes every poll interval to call
    /// `pump`; returning `false` from `pump` abandons the wait. The wait gives
    /// up after the configured timeout. In [`WaitMode::NonBlocking`] the
    /// count is checked once and `pump` is not called.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::OutOfRange`] if `channel` is not configured.
    pub fn wait_for_channel<F>(
        &self,
        channel: ChannelId,
        mut pump: F,
        mode: WaitMode,
    ) -> Result<WaitOutcome, ChannelError>
    where
        F: FnMut() -> bool,
    {
        let index = channel.index();
        if index >= self.channel_count {
            return Err(ChannelError::OutOfRange {
                channel,
                count: self.channel_count,
            });
        }

        let mut completions = self.shared.completions.lock();
        if take_one(&mut completions, index) {
            return Ok(WaitOutcome::Completed);
        }
        if mode == WaitMode::NonBlocking {
            return Ok(WaitOutcome::Pending);
        }

        let deadline = Instant::now().checked_add(self.timeout);
        loop {
            let now = Instant::now();
            let remaining = deadline.map_or(self.poll, |d| d.saturating_duration_since(now));
            if remaining.is_zero() {
                warn!(channel = %channel, timeout_ms = self.timeout.as_millis(), "Channel wait timed out");
                return Ok(WaitOutcome::TimedOut);
            }
            let _ = self
                .shared
                .signal
                .wait_for(&mut completions, remaining.min(self.poll));
            if take_one(&mut completions, index) {
                return Ok(WaitOutcome::Completed);
            }
            let keep_waiting = MutexGuard::unlocked(&mut completions, &mut pump);
            if !keep_waiting {
                return Ok(WaitOutcome::Abandoned);
            }
            if take_one(&mut completions, index) {
                return Ok(WaitOutcome::Completed);
            }
        }
    }
}

fn take_one(completions: &mut [u32], index: usize) -> bool {
    match completions.get_mut(index) {
        Some(count) if *count > 0 => {
            *count = count.saturating_sub(1);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::thread;

    fn sync() -> ChannelSync {
        ChannelSync::new(4, Duration::from_millis(200), Duration::from_millis(5))
    }

    #[test]
    fn non_blocking_checks_once() {
        let sync = sync();
        let mut pumped = 0;
        let outcome = sync
            .wait_for_channel(
                ChannelId(1),
                || {
                    pumped += 1;
                    true
                },
                WaitMode::NonBlocking,
            )
            .unwrap();
        assert_eq!(outcome, WaitOutcome::Pending);
        assert_eq!(pumped, 0);
    }

    #[test]
    fn completion_before_wait_is_kept() {
        let sync = sync();
        sync.notifier().notify(ChannelId(2));
        let outcome = sync
            .wait_for_channel(ChannelId(2), || true, WaitMode::NonBlocking)
            .unwrap();
        assert_eq!(outcome, WaitOutcome::Completed);
        assert_eq!(sync.pending(ChannelId(2)), 0);
    }

    #[test]
    fn coalesced_completions_satisfy_several_waits() {
        let sync = sync();
        let notifier = sync.notifier();
        notifier.notify(ChannelId(0));
        notifier.notify(ChannelId(0));
        assert_eq!(sync.pending(ChannelId(0)), 2);
        for _ in 0..2 {
            assert_eq!(
                sync.wait_for_channel(ChannelId(0), || true, WaitMode::NonBlocking)
                    .unwrap(),
                WaitOutcome::Completed
            );
        }
        sync.clear(ChannelId(0));
        assert_eq!(sync.pending(ChannelId(0)), 0);
    }

    #[test]
    fn blocking_wait_times_out_and_pumps() {
        let sync = sync();
        let mut pumped = 0;
        let outcome = sync
            .wait_for_channel(
                ChannelId(3),
                || {
                    pumped += 1;
                    true
                },
                WaitMode::Blocking,
            )
            .unwrap();
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(pumped > 0);
    }

    #[test]
    fn pump_can_abandon_the_wait() {
        let sync = sync();
        let outcome = sync
            .wait_for_channel(ChannelId(1), || false, WaitMode::Blocking)
            .unwrap();
        assert_eq!(outcome, WaitOutcome::Abandoned);
    }

    #[test]
    fn blocking_wait_wakes_on_notify_from_another_thread() {
        let sync = ChannelSync::new(2, Duration::from_secs(5), Duration::from_millis(5));
        let notifier = sync.notifier();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            notifier.notify(ChannelId(1));
        });
        let outcome = sync
            .wait_for_channel(ChannelId(1), || true, WaitMode::Blocking)
            .unwrap();
        handle.join().unwrap();
        assert_eq!(outcome, WaitOutcome::Completed);
    }

    #[test]
    fn out_of_range_channel_is_rejected() {
        let sync = sync();
        let err = sync
            .wait_for_channel(ChannelId(9), || true, WaitMode::NonBlocking)
            .unwrap_err();
        assert!(matches!(err, ChannelError::OutOfRange { count: 4, .. }));
        sync.notifier().notify(ChannelId(9));
    }
}
