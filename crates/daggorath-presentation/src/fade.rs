//! The fade sub-machine shared by the intro, intermission, death and
//! victory sequences.
//!
//! Phases run buzz-in, crash, message, crash-2, buzz-out for the begin and
//! middle variants, and buzz-in, crash, wait-for-key for death and victory.
//! The buzz phases move an 8-bit counter by 2 every `buzz_step_ms` and scale
//! the fade channel's volume from it; redraws happen at the render interval
//! independently of that cadence.
//!
//! # Key handling
//!
//! - Begin: a key in any phase ends the sequence with `interrupted = true`.
//! - Middle: keys are ignored.
//! - Death and victory: a key ends the wait-for-key phase.

use daggorath_core::channel::WaitMode;
use daggorath_core::config::PresentationConfig;
use daggorath_types::{ChannelId, Clip, FadePhase, FadeVariant, LoopCount, Message, Region};
use tracing::{debug, warn};

use crate::collaborators::{Frame, GameContext, degrade, present};
use crate::pump::InputPump;

/// Counter value at the start of buzz-in; the wizard is invisible.
pub const FADE_START: u8 = 32;

/// Counter change per buzz step.
const FADE_STEP: u8 = 2;

/// Set in the counter once buzz-in has wrapped below zero.
const FADE_WRAPPED: u8 = 0x80;

/// Result of one fade update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeStatus {
    /// Still running.
    Running,
    /// Finished this frame or earlier.
    Done {
        /// True when a key cut the sequence short.
        interrupted: bool,
    },
}

/// State of one running fade sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fade {
    variant: FadeVariant,
    phase: FadePhase,
    counter: u8,
    channel: ChannelId,
    step_at: u64,
    phase_started: u64,
    next_draw: u64,
    interrupted: bool,
}

impl Fade {
    /// Start `variant` at `now`: show its message, drain pending input, and
    /// start the buzz loop silently on `channel`.
    pub fn start(
        variant: FadeVariant,
        now: u64,
        channel: ChannelId,
        ctx: &mut GameContext<'_>,
        pump: &mut InputPump,
    ) -> Self {
        ctx.view.clear_region(Region::Primary);
        if matches!(variant, FadeVariant::Death | FadeVariant::Victory) {
            // A faint may have left the screen dark.
            ctx.view.set_light_level(ctx.game.base_light_level());
        }
        if variant == FadeVariant::Begin {
            ctx.view.show_message(Message::Copyright);
        } else {
            ctx.view.clear_region(Region::Status);
        }
        ctx.view.show_message(variant.message());

        let _ = pump.poll(ctx);

        degrade(ctx.audio.set_channel_volume(channel, 0), "mute fade channel");
        degrade(
            ctx.audio.play_on_channel(channel, Clip::Buzz, LoopCount::Forever),
            "start buzz",
        );
        debug!(variant = ?variant, "Fade started");

        Self {
            variant,
            phase: FadePhase::BuzzIn,
            counter: FADE_START,
            channel,
            step_at: now,
            phase_started: now,
            next_draw: now,
            interrupted: false,
        }
    }

    /// Which sequence is running.
    pub const fn variant(&self) -> FadeVariant {
        self.variant
    }

    /// Current sub-phase.
    pub const fn phase(&self) -> FadePhase {
        self.phase
    }

    /// Current fade counter.
    pub const fn counter(&self) -> u8 {
        self.counter
    }

    /// Whether a key cut the sequence short.
    pub const fn interrupted(&self) -> bool {
        self.interrupted
    }

    /// Advance the sequence by one render tick.
    ///
    /// `autoplay` lets the wait-for-key phase continue on its own after
    /// `demo_hold_ms`.
    pub fn update(
        &mut self,
        now: u64,
        ctx: &mut GameContext<'_>,
        pump: &mut InputPump,
        config: &PresentationConfig,
        autoplay: bool,
    ) -> FadeStatus {
        if self.phase == FadePhase::Done {
            return self.done();
        }

        let draw = now >= self.next_draw;
        if draw {
            self.next_draw = now.saturating_add(config.render_interval_ms);
        }
        let step_due = matches!(self.phase, FadePhase::BuzzIn | FadePhase::BuzzOut)
            && now >= self.step_at.saturating_add(config.buzz_step_ms);
        if step_due {
            self.step_at = now;
        }

        let key = pump.any_key(ctx);
        if key && self.key_ends_phase() {
            if self.phase == FadePhase::WaitKey {
                ctx.view.clear_region(Region::Primary);
                return self.finish(false);
            }
            ctx.audio.stop_channel(self.channel);
            ctx.view.clear_region(Region::Primary);
            debug!(variant = ?self.variant, phase = ?self.phase, "Fade interrupted by key");
            return self.finish(true);
        }

        match self.phase {
            FadePhase::BuzzIn => {
                if self.counter & FADE_WRAPPED == 0 {
                    self.set_buzz_volume(ctx);
                    if draw {
                        self.draw(ctx);
                    }
                    if step_due {
                        self.counter = self.counter.wrapping_sub(FADE_STEP);
                    }
                } else {
                    self.counter = 0;
                    ctx.audio.stop_channel(self.channel);
                    degrade(
                        ctx.audio
                            .set_channel_volume(self.channel, ctx.settings.volume),
                        "restore fade volume",
                    );
                    self.play_crash(ctx);
                    self.enter(FadePhase::Crash, now);
                }
            }
            FadePhase::Crash => {
                if draw {
                    self.draw(ctx);
                }
                if self.sound_finished(now, ctx, pump, config) {
                    if self.variant.has_message() {
                        self.enter(FadePhase::Message, now);
                    } else {
                        self.enter(FadePhase::WaitKey, now);
                    }
                }
            }
            FadePhase::Message => {
                if draw {
                    self.draw(ctx);
                }
                if now >= self.phase_started.saturating_add(config.message_pause_ms) {
                    self.play_crash(ctx);
                    self.enter(FadePhase::Crash2, now);
                }
            }
            FadePhase::Crash2 => {
                if draw {
                    self.draw(ctx);
                }
                if self.sound_finished(now, ctx, pump, config) {
                    degrade(
                        ctx.audio.set_channel_volume(self.channel, 0),
                        "mute fade channel",
                    );
                    degrade(
                        ctx.audio
                            .play_on_channel(self.channel, Clip::Buzz, LoopCount::Forever),
                        "start buzz",
                    );
                    self.counter = 0;
                    self.step_at = now;
                    self.enter(FadePhase::BuzzOut, now);
                }
            }
            FadePhase::BuzzOut => {
                if self.counter <= FADE_START {
                    self.set_buzz_volume(ctx);
                    if draw {
                        self.draw(ctx);
                    }
                    if step_due {
                        self.counter = self.counter.saturating_add(FADE_STEP);
                    }
                } else {
                    ctx.audio.stop_channel(self.channel);
                    ctx.view.clear_region(Region::Primary);
                    let _ = pump.poll(ctx);
                    return self.finish(false);
                }
            }
            FadePhase::WaitKey => {
                if draw {
                    self.draw(ctx);
                }
                if autoplay && now >= self.phase_started.saturating_add(config.demo_hold_ms) {
                    ctx.view.clear_region(Region::Primary);
                    return self.finish(false);
                }
            }
            FadePhase::Done => return self.done(),
        }
        FadeStatus::Running
    }

    fn key_ends_phase(&self) -> bool {
        match self.phase {
            FadePhase::WaitKey => true,
            FadePhase::Message | FadePhase::BuzzOut => self.variant.key_skips_tail(),
            FadePhase::Done => false,
            FadePhase::BuzzIn | FadePhase::Crash | FadePhase::Crash2 => {
                self.variant == FadeVariant::Begin
            }
        }
    }

    fn enter(&mut self, phase: FadePhase, now: u64) {
        debug!(variant = ?self.variant, from = ?self.phase, to = ?phase, "Fade phase change");
        self.phase = phase;
        self.phase_started = now;
    }

    const fn finish(&mut self, interrupted: bool) -> FadeStatus {
        self.interrupted = interrupted;
        self.phase = FadePhase::Done;
        self.done()
    }

    const fn done(&self) -> FadeStatus {
        FadeStatus::Done {
            interrupted: self.interrupted,
        }
    }

    fn draw(&self, ctx: &mut GameContext<'_>) {
        present(
            ctx.view,
            &Frame::Wizard {
                variant: self.variant,
                fade: self.counter,
                show_message: matches!(self.phase, FadePhase::Message | FadePhase::WaitKey),
            },
        );
    }

    fn set_buzz_volume(&self, ctx: &mut GameContext<'_>) {
        let level = buzz_volume(self.counter, ctx.settings.volume);
        degrade(
            ctx.audio.set_channel_volume(self.channel, level),
            "ramp buzz volume",
        );
    }

    fn play_crash(&self, ctx: &mut GameContext<'_>) {
        if let Some(sync) = ctx.channels {
            sync.clear(self.channel);
        }
        degrade(
            ctx.audio
                .play_on_channel(self.channel, Clip::Kaboom, LoopCount::Once),
            "play crash",
        );
    }

    /// Whether the crash clip is over. Blocks on the channel signal only
    /// when the host allows it; otherwise polls the mixer and gives up after
    /// `crash_timeout_ms`.
    fn sound_finished(
        &self,
        now: u64,
        ctx: &mut GameContext<'_>,
        pump: &mut InputPump,
        config: &PresentationConfig,
    ) -> bool {
        if !ctx.audio.is_channel_playing(self.channel) {
            return true;
        }
        if let Some(sync) = ctx.channels.filter(|_| ctx.scheduler.can_block()) {
            let outcome = sync.wait_for_channel(
                self.channel,
                || {
                    let _ = pump.poll(ctx);
                    !pump.quit_requested()
                },
                WaitMode::Blocking,
            );
            match outcome {
                Ok(outcome) => {
                    debug!(channel = %self.channel, outcome = ?outcome, "Crash wait finished");
                    return true;
                }
                Err(err) => warn!(error = %err, "Channel wait failed, polling instead"),
            }
        }
        if now >= self.phase_started.saturating_add(config.crash_timeout_ms) {
            warn!(
                channel = %self.channel,
                timeout_ms = config.crash_timeout_ms,
                "Crash sound still playing, moving on"
            );
            ctx.audio.stop_channel(self.channel);
            return true;
        }
        false
    }
}

/// Buzz volume for fade counter `counter` at master volume `master`:
/// silent at 32, full at 0.
pub fn buzz_volume(counter: u8, master: u8) -> u8 {
    let steps = u16::from(FADE_START.saturating_sub(counter) / 2);
    let level = steps.saturating_mul(u16::from(master)) / 16;
    u8::try_from(level).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buzz_volume_ramps_from_silent_to_master() {
        assert_eq!(buzz_volume(32, 128), 0);
        assert_eq!(buzz_volume(16, 128), 64);
        assert_eq!(buzz_volume(0, 128), 128);
        assert_eq!(buzz_volume(0, 64), 64);
        assert_eq!(buzz_volume(0, 0), 0);
    }

    #[test]
    fn buzz_in_wraps_out_of_range_after_seventeen_steps() {
        let mut counter = FADE_START;
        let mut steps = 0;
        while counter & FADE_WRAPPED == 0 {
            counter = counter.wrapping_sub(FADE_STEP);
            steps += 1;
        }
        assert_eq!(steps, 17);
        assert_eq!(counter, 254);
    }
}
