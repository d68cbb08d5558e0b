//! The presentation state machine.
//!
//! [`Presentation::update_state`] is called once per rendered frame. It
//! applies queued gameplay requests, advances whatever sequence the current
//! mode is running, and reports whether gameplay (the scheduler) should run
//! this frame. Nothing in here waits: every sequence keeps its own deadlines
//! and is resumed on the next call.

use daggorath_core::config::{GameConfig, PresentationConfig};
use daggorath_types::{
    ChannelId, FadeVariant, GameMode, Key, Message, MoveDirection, PostFadeAction, Region,
    Request, TurnDirection,
};
use tracing::{debug, info, warn};

use crate::animation::{AnimationStatus, LightRamp, MoveAnimation, RampKind, TurnAnimation};
use crate::collaborators::{Frame, GameContext, PersistError, present};
use crate::fade::{Fade, FadeStatus};
use crate::menu::{Handoff, MenuOutcome, MenuSession};
use crate::pump::{InputPump, KeyBatch};

/// A one-shot signal for the host, taken with [`Presentation::take_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The death sequence finished; the host should restart.
    DeathComplete,
    /// The victory sequence finished; the host should restart.
    VictoryComplete,
    /// The player picked NEW GAME from the menu.
    NewGame,
}

/// Flags that decide how a finished round continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionFlags {
    /// The demo is playing itself.
    pub autoplay: bool,
    /// A finished demo round starts another demo round.
    pub demo_restart: bool,
    /// The round is over: the player won, or asked for a new game.
    pub has_won: bool,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            autoplay: true,
            demo_restart: true,
            has_won: false,
        }
    }
}

impl SessionFlags {
    /// The player has pressed a key during the demo and wants to play.
    pub const fn demo_interrupted(&self) -> bool {
        self.autoplay && !self.demo_restart
    }
}

/// Mode plus the data that only exists while the mode is active.
#[derive(Debug)]
enum ModeState {
    Init,
    FadeIntro(Fade),
    PrepareWait { until: u64 },
    DemoMapWait { until: u64 },
    Playing,
    DeathFade(Fade),
    WinFade(Fade),
    IntermissionFade { fade: Fade, post_action: PostFadeAction },
    Menu(Box<MenuSession>),
    RestartWait { until: u64 },
    Turn(TurnAnimation),
    Move(MoveAnimation),
    Faint(LightRamp),
    Recover(LightRamp),
}

/// The presentation layer of one game session.
#[derive(Debug)]
pub struct Presentation {
    config: PresentationConfig,
    fade_channel: ChannelId,
    state: ModeState,
    session: SessionFlags,
    pump: InputPump,
    keys: KeyBatch,
    event: Option<SessionEvent>,
}

impl Presentation {
    /// A presentation in [`GameMode::Init`]; the first update starts the
    /// title sequence.
    pub fn new(config: &GameConfig) -> Self {
        Self {
            config: config.presentation.clone(),
            fade_channel: ChannelId(config.presentation.fade_channel),
            state: ModeState::Init,
            session: SessionFlags::default(),
            pump: InputPump::default(),
            keys: KeyBatch::new(),
            event: None,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> GameMode {
        match &self.state {
            ModeState::Init => GameMode::Init,
            ModeState::FadeIntro(_) => GameMode::FadeIntro,
            ModeState::PrepareWait { .. } => GameMode::PrepareWait,
            ModeState::DemoMapWait { .. } => GameMode::DemoMapWait,
            ModeState::Playing => GameMode::Playing,
            ModeState::DeathFade(_) => GameMode::DeathFade,
            ModeState::WinFade(_) => GameMode::WinFade,
            ModeState::IntermissionFade { .. } => GameMode::IntermissionFade,
            ModeState::Menu(menu) => menu.mode(),
            ModeState::RestartWait { .. } => GameMode::RestartWait,
            ModeState::Turn(_) => GameMode::TurnAnimation,
            ModeState::Move(_) => GameMode::MoveAnimation,
            ModeState::Faint(_) => GameMode::FaintAnimation,
            ModeState::Recover(_) => GameMode::RecoverAnimation,
        }
    }

    /// The running fade, in any of the fade modes.
    pub const fn fade(&self) -> Option<&Fade> {
        match &self.state {
            ModeState::FadeIntro(fade)
            | ModeState::DeathFade(fade)
            | ModeState::WinFade(fade)
            | ModeState::IntermissionFade { fade, .. } => Some(fade),
            _ => None,
        }
    }

    /// The open menu, in any of the menu modes.
    pub fn menu(&self) -> Option<&MenuSession> {
        match &self.state {
            ModeState::Menu(menu) => Some(menu),
            _ => None,
        }
    }

    /// A dialog result waiting to be applied by the menu.
    pub fn pending_handoff(&self) -> Option<&Handoff> {
        self.menu().and_then(MenuSession::pending_handoff)
    }

    /// Session flags.
    pub const fn session(&self) -> &SessionFlags {
        &self.session
    }

    /// Session flags, for the host's restart logic.
    pub const fn session_mut(&mut self) -> &mut SessionFlags {
        &mut self.session
    }

    /// Take the pending host signal, if any.
    pub const fn take_event(&mut self) -> Option<SessionEvent> {
        self.event.take()
    }

    /// Keys pressed while playing, for the command parser.
    pub fn take_keys(&mut self) -> KeyBatch {
        std::mem::take(&mut self.keys)
    }

    /// Whether the host has asked to quit.
    pub const fn quit_requested(&self) -> bool {
        self.pump.quit_requested()
    }

    /// End the demo at the next opportunity and hand control to the player.
    pub fn stop_demo(&mut self) {
        if self.session.autoplay {
            info!("Demo stopped by player");
        }
        self.session.has_won = true;
        self.session.demo_restart = false;
    }

    // -----------------------------------------------------------------------
    // Per-frame update
    // -----------------------------------------------------------------------

    /// Advance the current mode by one frame.
    ///
    /// Returns true when gameplay should run this frame: while playing, and
    /// on the frame a death or victory sequence completes (see
    /// [`Presentation::take_event`]).
    pub fn update_state(&mut self, now: u64, ctx: &mut GameContext<'_>) -> bool {
        self.apply_requests(now, ctx);

        match &mut self.state {
            ModeState::Init => {
                self.start_session(now, ctx);
                false
            }
            ModeState::FadeIntro(fade) => {
                let status = fade.update(now, ctx, &mut self.pump, &self.config, false);
                if let FadeStatus::Done { interrupted } = status {
                    self.finish_intro(interrupted, now, ctx);
                }
                false
            }
            ModeState::PrepareWait { until } => {
                let until = *until;
                let _ = self.pump.poll(ctx);
                if now >= until {
                    ctx.game.new_level();
                    if self.session.autoplay {
                        present(ctx.view, &Frame::Map);
                        self.state = ModeState::DemoMapWait {
                            until: now.saturating_add(self.config.demo_map_pause_ms),
                        };
                    } else {
                        self.enter_play(ctx);
                    }
                }
                false
            }
            ModeState::DemoMapWait { until } => {
                let until = *until;
                let keys = self.pump.poll(ctx);
                if !keys.is_empty() {
                    self.stop_demo();
                }
                if now >= until {
                    self.enter_play(ctx);
                }
                false
            }
            ModeState::RestartWait { until } => {
                let until = *until;
                let _ = self.pump.poll(ctx);
                if now >= until {
                    ctx.game.new_level();
                    self.enter_play(ctx);
                }
                false
            }
            ModeState::Playing => {
                let keys = self.pump.poll(ctx);
                if self.session.autoplay && !keys.is_empty() {
                    self.stop_demo();
                } else {
                    self.keys.extend(keys);
                }
                true
            }
            ModeState::DeathFade(fade) => {
                let status = fade.update(now, ctx, &mut self.pump, &self.config, self.session.autoplay);
                if matches!(status, FadeStatus::Done { .. }) {
                    self.event = Some(SessionEvent::DeathComplete);
                    return true;
                }
                false
            }
            ModeState::WinFade(fade) => {
                let status = fade.update(now, ctx, &mut self.pump, &self.config, self.session.autoplay);
                if matches!(status, FadeStatus::Done { .. }) {
                    self.session.has_won = true;
                    self.event = Some(SessionEvent::VictoryComplete);
                    return true;
                }
                false
            }
            ModeState::IntermissionFade { fade, post_action } => {
                let post_action = *post_action;
                let status = fade.update(now, ctx, &mut self.pump, &self.config, false);
                if matches!(status, FadeStatus::Done { .. }) {
                    return self.finish_intermission(post_action, now, ctx);
                }
                false
            }
            ModeState::Menu(menu) => {
                let keys = self.pump.poll(ctx);
                match menu.update(now, &keys, ctx, &self.config) {
                    MenuOutcome::Open => false,
                    MenuOutcome::Close => {
                        let unread = menu.take_unread();
                        self.keys.extend(unread);
                        self.close_menu(ctx)
                    }
                    MenuOutcome::Load(name) => match self.load_game(&name, ctx) {
                        Ok(()) => {
                            ctx.scheduler.pause(false);
                            info!("Menu closed");
                            true
                        }
                        Err(err) => {
                            warn!(name = %name, error = %err, "Failed to load saved game");
                            false
                        }
                    },
                    MenuOutcome::NewGame => {
                        if !self.session.autoplay {
                            self.session.has_won = true;
                            self.session.demo_restart = false;
                        }
                        self.event = Some(SessionEvent::NewGame);
                        self.close_menu(ctx)
                    }
                }
            }
            ModeState::Turn(anim) => {
                let abort = animation_abort(&mut self.pump, &mut self.session, ctx);
                match anim.update(now, abort, ctx) {
                    AnimationStatus::Running => false,
                    AnimationStatus::Finished | AnimationStatus::Aborted => {
                        self.state = ModeState::Playing;
                        true
                    }
                }
            }
            ModeState::Move(anim) => {
                let abort = animation_abort(&mut self.pump, &mut self.session, ctx);
                let status = anim.update(now, abort, ctx);
                if status == AnimationStatus::Running {
                    // A step can make the player faint.
                    self.apply_requests(now, ctx);
                    return false;
                }
                self.state = ModeState::Playing;
                true
            }
            ModeState::Faint(ramp) => {
                // Nothing typed while fainted reaches gameplay.
                let _ = self.pump.poll(ctx);
                if ramp.update(now, ctx) != AnimationStatus::Finished {
                    return false;
                }
                let target = ramp.target();
                ctx.view.set_light_level(target);
                ctx.game.clear_input_buffer();
                self.after_light_ramp(now, ctx)
            }
            ModeState::Recover(ramp) => {
                let _ = self.pump.poll(ctx);
                if ramp.update(now, ctx) != AnimationStatus::Finished {
                    return false;
                }
                ctx.view.set_light_level(ramp.target());
                ctx.game.clear_faint();
                ctx.game.prompt();
                self.after_light_ramp(now, ctx)
            }
        }
    }

    fn apply_requests(&mut self, now: u64, ctx: &mut GameContext<'_>) {
        while let Some(request) = ctx.game.take_request() {
            debug!(request = ?request, mode = ?self.mode(), "Applying request");
            match request {
                Request::DeathFade => self.request_death_fade(now, ctx),
                Request::VictoryFade => self.request_victory_fade(now, ctx),
                Request::IntermissionFade { post_action } => {
                    self.request_intermission_fade(post_action, now, ctx);
                }
                Request::Menu => self.request_menu(now, ctx),
                Request::Turn { direction } => self.request_turn_animation(direction, now, ctx),
                Request::Move { direction } => self.request_move_animation(direction, now, ctx),
                Request::Faint => self.request_faint_animation(now, ctx),
                Request::Recover => self.request_recover_animation(now, ctx),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Start the death sequence.
    pub fn request_death_fade(&mut self, now: u64, ctx: &mut GameContext<'_>) {
        let fade = self.start_fade(FadeVariant::Death, now, ctx);
        self.state = ModeState::DeathFade(fade);
    }

    /// Start the victory sequence.
    pub fn request_victory_fade(&mut self, now: u64, ctx: &mut GameContext<'_>) {
        let fade = self.start_fade(FadeVariant::Victory, now, ctx);
        self.state = ModeState::WinFade(fade);
    }

    /// Start the intermission sequence; `post_action` runs when it ends.
    pub fn request_intermission_fade(
        &mut self,
        post_action: PostFadeAction,
        now: u64,
        ctx: &mut GameContext<'_>,
    ) {
        let fade = self.start_fade(FadeVariant::Middle, now, ctx);
        self.state = ModeState::IntermissionFade { fade, post_action };
    }

    /// Open the option menu and pause the scheduler.
    pub fn request_menu(&mut self, now: u64, ctx: &mut GameContext<'_>) {
        ctx.scheduler.pause(true);
        self.state = ModeState::Menu(Box::new(MenuSession::new(now)));
        info!("Menu opened");
    }

    /// Animate a turn using the configured per-frame delay.
    pub fn request_turn_animation(
        &mut self,
        direction: TurnDirection,
        now: u64,
        ctx: &mut GameContext<'_>,
    ) {
        let frame_ms = u64::from(ctx.settings.turn_delay_ms);
        let anim = TurnAnimation::start(direction, now, frame_ms, ctx);
        self.state = ModeState::Turn(anim);
    }

    /// Animate a step. Side steps are not animated and leave the mode alone.
    pub fn request_move_animation(
        &mut self,
        direction: MoveDirection,
        now: u64,
        ctx: &mut GameContext<'_>,
    ) {
        let delay = u64::from(ctx.settings.move_delay_ms);
        match MoveAnimation::start(direction, now, delay, ctx) {
            Some(anim) => self.state = ModeState::Move(anim),
            None => debug!(direction = ?direction, "Step is not animated"),
        }
    }

    /// Dim the screen as the player faints.
    pub fn request_faint_animation(&mut self, now: u64, ctx: &mut GameContext<'_>) {
        let ramp = LightRamp::start(
            RampKind::Faint,
            now,
            self.config.light_step_ms,
            self.config.light_step_limit,
            ctx,
        );
        self.state = ModeState::Faint(ramp);
    }

    /// Brighten the screen as the player recovers.
    pub fn request_recover_animation(&mut self, now: u64, ctx: &mut GameContext<'_>) {
        let ramp = LightRamp::start(
            RampKind::Recover,
            now,
            self.config.light_step_ms,
            self.config.light_step_limit,
            ctx,
        );
        self.state = ModeState::Recover(ramp);
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Start a session from the title sequence: fresh game state, baseline
    /// tasks, and the begin fade.
    pub fn start_session(&mut self, now: u64, ctx: &mut GameContext<'_>) {
        info!(autoplay = self.session.autoplay, "Session starting");
        ctx.game.reset();
        ctx.scheduler.install_baseline();
        ctx.view.clear_region(Region::Status);
        ctx.view.clear_region(Region::Primary);
        let fade = self.start_fade(FadeVariant::Begin, now, ctx);
        self.state = ModeState::FadeIntro(fade);
    }

    /// Start a new player game after a pause showing the title.
    pub fn restart(&mut self, now: u64, ctx: &mut GameContext<'_>) {
        info!("Game restarting");
        ctx.game.reset();
        ctx.scheduler.install_baseline();
        self.session.has_won = false;
        ctx.game.set_initial_objects(false);
        ctx.view.show_message(Message::Prepare);
        ctx.view.show_message(Message::Copyright);
        present(ctx.view, &Frame::Title);
        self.state = ModeState::RestartWait {
            until: now.saturating_add(self.config.restart_pause_ms),
        };
    }

    /// Continue after a round ends: another demo round, or a player game.
    pub fn finish_round(&mut self, now: u64, ctx: &mut GameContext<'_>) {
        if self.session.autoplay && self.session.demo_restart {
            self.session.has_won = false;
            self.start_session(now, ctx);
        } else {
            self.session.autoplay = false;
            self.restart(now, ctx);
        }
    }

    /// Restore a saved game and resume play.
    ///
    /// # Errors
    ///
    /// Returns the store's [`PersistError`] if the game cannot be loaded;
    /// the mode is unchanged in that case.
    pub fn load_game(&mut self, name: &str, ctx: &mut GameContext<'_>) -> Result<(), PersistError> {
        ctx.saves.load_game(name)?;
        info!(name = %name, "Saved game loaded");
        self.session.autoplay = false;
        self.enter_play(ctx);
        present(ctx.view, &Frame::Dungeon);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn start_fade(&mut self, variant: FadeVariant, now: u64, ctx: &mut GameContext<'_>) -> Fade {
        Fade::start(variant, now, self.fade_channel, ctx, &mut self.pump)
    }

    fn finish_intro(&mut self, interrupted: bool, now: u64, ctx: &mut GameContext<'_>) {
        let autoplay = !interrupted;
        self.session.autoplay = autoplay;
        info!(autoplay, "Title sequence finished");
        ctx.game.set_initial_objects(autoplay);
        ctx.view.show_message(Message::Prepare);
        present(ctx.view, &Frame::Title);
        self.state = ModeState::PrepareWait {
            until: now.saturating_add(self.config.prepare_pause_ms),
        };
    }

    fn finish_intermission(
        &mut self,
        post_action: PostFadeAction,
        now: u64,
        ctx: &mut GameContext<'_>,
    ) -> bool {
        debug!(post_action = ?post_action, "Intermission finished");
        match post_action {
            PostFadeAction::Restart => {
                self.restart(now, ctx);
                false
            }
            PostFadeAction::Victory => {
                self.request_victory_fade(now, ctx);
                false
            }
            PostFadeAction::Level3Setup => {
                ctx.game.level_transition(post_action);
                ctx.game.init_view();
                self.state = ModeState::Playing;
                true
            }
            PostFadeAction::None => {
                self.state = ModeState::Playing;
                true
            }
        }
    }

    fn enter_play(&mut self, ctx: &mut GameContext<'_>) {
        ctx.game.init_view();
        ctx.game.prompt();
        self.state = ModeState::Playing;
    }

    fn close_menu(&mut self, ctx: &mut GameContext<'_>) -> bool {
        ctx.scheduler.pause(false);
        self.state = ModeState::Playing;
        info!("Menu closed");
        true
    }

    fn after_light_ramp(&mut self, now: u64, ctx: &mut GameContext<'_>) -> bool {
        if ctx.game.is_lethal() {
            let _ = self.pump.poll(ctx);
            ctx.view.clear_region(Region::Status);
            ctx.view.clear_region(Region::Primary);
            warn!("Player did not survive");
            self.request_death_fade(now, ctx);
            return false;
        }
        self.state = ModeState::Playing;
        true
    }
}

/// Drain input during an animation and decide whether it must stop.
///
/// Any key ends the demo; escape cancels the animation itself.
fn animation_abort(
    pump: &mut InputPump,
    session: &mut SessionFlags,
    ctx: &mut GameContext<'_>,
) -> bool {
    let keys = pump.poll(ctx);
    if session.autoplay && !keys.is_empty() {
        session.has_won = true;
        session.demo_restart = false;
    }
    if keys.contains(&Key::Escape) {
        ctx.scheduler.request_cancel();
    }
    session.demo_interrupted() || ctx.scheduler.take_cancel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_starts_in_autoplay() {
        let flags = SessionFlags::default();
        assert!(flags.autoplay);
        assert!(flags.demo_restart);
        assert!(!flags.has_won);
        assert!(!flags.demo_interrupted());
    }

    #[test]
    fn stop_demo_marks_round_over() {
        let mut p = Presentation::new(&GameConfig::default());
        p.stop_demo();
        assert!(p.session().has_won);
        assert!(p.session().demo_interrupted());
        assert_eq!(p.mode(), GameMode::Init);
    }
}
