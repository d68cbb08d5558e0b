//! Headless mixer.
//!
//! Tracks which clip each channel is playing and for how long, and raises
//! the same completion signal a sound card callback would when a one-shot
//! clip runs out. A background task reaps finished voices so the signal
//! arrives from another thread, exactly as it would with real audio.

use std::sync::Arc;
use std::time::{Duration, Instant};

use daggorath_core::channel::ChannelNotifier;
use daggorath_presentation::{Audio, AudioError};
use daggorath_types::{ChannelId, Clip, LoopCount, VOLUME_MAX};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Playing time of one pass through `clip`.
pub const fn clip_duration(clip: Clip) -> Duration {
    match clip {
        Clip::Buzz => Duration::from_millis(700),
        Clip::Kaboom => Duration::from_millis(1_500),
        Clip::HeartSlow => Duration::from_millis(220),
        Clip::HeartFast => Duration::from_millis(150),
    }
}

#[derive(Debug, Clone, Copy)]
struct Voice {
    clip: Clip,
    loops: LoopCount,
    started: Instant,
}

#[derive(Debug)]
struct MixerState {
    voices: Vec<Option<Voice>>,
    volumes: Vec<u8>,
}

/// Shared handle to the mixer. Clones address the same channels.
#[derive(Debug, Clone)]
pub struct HeadlessMixer {
    state: Arc<Mutex<MixerState>>,
    notifier: ChannelNotifier,
}

impl HeadlessMixer {
    /// A mixer with `channel_count` silent channels at full volume.
    pub fn new(channel_count: usize, notifier: ChannelNotifier) -> Self {
        Self {
            state: Arc::new(Mutex::new(MixerState {
                voices: vec![None; channel_count],
                volumes: vec![VOLUME_MAX; channel_count],
            })),
            notifier,
        }
    }

    /// Reap finished voices every `period` on the tokio runtime.
    pub fn spawn_reaper(&self, period: Duration) -> JoinHandle<()> {
        let mixer = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                mixer.reap(Instant::now());
            }
        })
    }

    /// Stop every one-shot voice whose clip has run out by `now` and signal
    /// its channel. Returns how many voices finished.
    pub fn reap(&self, now: Instant) -> usize {
        let mut finished = Vec::new();
        {
            let mut state = self.state.lock();
            for (index, slot) in state.voices.iter_mut().enumerate() {
                let done = slot.is_some_and(|voice| {
                    voice.loops == LoopCount::Once
                        && now.saturating_duration_since(voice.started) >= clip_duration(voice.clip)
                });
                if done {
                    *slot = None;
                    finished.push(index);
                }
            }
        }
        for index in &finished {
            if let Ok(raw) = u8::try_from(*index) {
                let channel = ChannelId(raw);
                trace!(channel = %channel, "Clip finished");
                self.notifier.notify(channel);
            }
        }
        finished.len()
    }

    /// Clip currently on `channel`.
    pub fn playing(&self, channel: ChannelId) -> Option<Clip> {
        self.state
            .lock()
            .voices
            .get(channel.index())
            .copied()
            .flatten()
            .map(|voice| voice.clip)
    }

    /// Volume of `channel`.
    #[cfg(test)]
    pub fn volume(&self, channel: ChannelId) -> Option<u8> {
        self.state.lock().volumes.get(channel.index()).copied()
    }
}

impl Audio for HeadlessMixer {
    fn play_on_channel(
        &mut self,
        channel: ChannelId,
        clip: Clip,
        loops: LoopCount,
    ) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        let slot = state
            .voices
            .get_mut(channel.index())
            .ok_or(AudioError::ChannelUnavailable { channel })?;
        *slot = Some(Voice {
            clip,
            loops,
            started: Instant::now(),
        });
        debug!(channel = %channel, clip = ?clip, loops = ?loops, "Clip started");
        Ok(())
    }

    fn set_channel_volume(&mut self, channel: ChannelId, level: u8) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        let volume = state
            .volumes
            .get_mut(channel.index())
            .ok_or(AudioError::ChannelUnavailable { channel })?;
        *volume = level.min(VOLUME_MAX);
        Ok(())
    }

    fn set_master_volume(&mut self, level: u8) {
        let level = level.min(VOLUME_MAX);
        self.state.lock().volumes.fill(level);
        debug!(level, "Master volume set");
    }

    fn stop_channel(&mut self, channel: ChannelId) {
        if let Some(slot) = self.state.lock().voices.get_mut(channel.index()) {
            *slot = None;
        }
    }

    fn is_channel_playing(&self, channel: ChannelId) -> bool {
        self.playing(channel).is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use daggorath_core::channel::{ChannelSync, WaitMode, WaitOutcome};

    use super::*;

    fn mixer() -> (HeadlessMixer, ChannelSync) {
        let sync = ChannelSync::new(2, Duration::from_millis(50), Duration::from_millis(5));
        (HeadlessMixer::new(2, sync.notifier()), sync)
    }

    #[test]
    fn one_shot_clip_signals_its_channel() {
        let (mut mixer, sync) = mixer();
        mixer
            .play_on_channel(ChannelId(1), Clip::Kaboom, LoopCount::Once)
            .unwrap();
        assert_eq!(mixer.reap(Instant::now()), 0);
        assert!(mixer.is_channel_playing(ChannelId(1)));

        let later = Instant::now().checked_add(clip_duration(Clip::Kaboom)).unwrap();
        assert_eq!(mixer.reap(later), 1);
        assert!(!mixer.is_channel_playing(ChannelId(1)));
        let outcome = sync
            .wait_for_channel(ChannelId(1), || true, WaitMode::NonBlocking)
            .unwrap();
        assert_eq!(outcome, WaitOutcome::Completed);
    }

    #[test]
    fn looping_clip_is_never_reaped() {
        let (mut mixer, _sync) = mixer();
        mixer
            .play_on_channel(ChannelId(0), Clip::Buzz, LoopCount::Forever)
            .unwrap();
        let later = Instant::now().checked_add(Duration::from_secs(60)).unwrap();
        assert_eq!(mixer.reap(later), 0);
        mixer.stop_channel(ChannelId(0));
        assert_eq!(mixer.playing(ChannelId(0)), None);
    }

    #[test]
    fn unknown_channel_is_unavailable() {
        let (mut mixer, _sync) = mixer();
        let err = mixer
            .play_on_channel(ChannelId(7), Clip::Buzz, LoopCount::Once)
            .unwrap_err();
        assert!(matches!(err, AudioError::ChannelUnavailable { .. }));
        assert!(mixer.set_channel_volume(ChannelId(7), 10).is_err());
    }

    #[test]
    fn master_volume_is_clamped() {
        let (mut mixer, _sync) = mixer();
        mixer.set_master_volume(200);
        assert_eq!(mixer.volume(ChannelId(0)), Some(VOLUME_MAX));
    }
}
