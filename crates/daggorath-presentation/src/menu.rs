//! The option menu and its list, scrollbar and text entry dialogs.
//!
//! Dialogs never block. Opening one records what its result is for (a
//! [`HandoffTarget`]); when the dialog completes, its result is parked as a
//! [`Handoff`] and applied on the next menu tick, exactly once.

use daggorath_core::config::PresentationConfig;
use daggorath_types::{
    CHEAT_LABELS, GAMEPLAY_MOD_LABELS, GameMode, GraphicsMode, Key, MenuCursor, MenuItem,
    Settings, TIMING_LIST, TimingSetting, VOLUME_MAX, VOLUME_RANGE, ValueRange, column_len,
    toggle_label,
};
use tracing::{debug, info, warn};

use crate::collaborators::{Frame, GameContext, present};
use crate::pump::KeyBatch;

/// Highest scrollbar thumb position.
pub const SCROLLBAR_MAX: u8 = 31;

const BACK: &str = "BACK";

// ---------------------------------------------------------------------------
// Dialogs
// ---------------------------------------------------------------------------

/// Value a completed dialog hands back to the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogResult {
    /// Row picked from a list; `None` when the list was escaped.
    Choice(Option<usize>),
    /// Value picked on a scrollbar.
    Value(i32),
    /// Text typed into an entry field; empty when escaped.
    Text(String),
}

/// A vertical list with a wrapping highlight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDialog {
    title: String,
    items: Vec<String>,
    selected: usize,
}

impl ListDialog {
    /// Build a list with the first row highlighted.
    pub fn new(title: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            title: title.into(),
            items,
            selected: 0,
        }
    }

    /// Highlighted row.
    pub const fn selected(&self) -> usize {
        self.selected
    }

    /// Rows of the list.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Feed one key; returns the result once the list is done.
    pub fn handle(&mut self, key: Key) -> Option<DialogResult> {
        let len = self.items.len();
        match key {
            Key::Escape => Some(DialogResult::Choice(None)),
            k if k.is_confirm() && len > 0 => Some(DialogResult::Choice(Some(self.selected))),
            Key::Up if len > 0 => {
                self.selected = self.selected.checked_sub(1).unwrap_or(len.saturating_sub(1));
                None
            }
            Key::Down if len > 0 => {
                let next = self.selected.saturating_add(1);
                self.selected = if next >= len { 0 } else { next };
                None
            }
            _ => None,
        }
    }
}

/// A horizontal bar mapping 32 thumb positions onto a value range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollbarDialog {
    title: String,
    range: ValueRange,
    position: u8,
    original: u8,
    prior: i32,
}

impl ScrollbarDialog {
    /// Build a scrollbar showing `current`. Returns `None` for an empty
    /// or inverted range.
    pub fn new(title: impl Into<String>, range: ValueRange, current: i32) -> Option<Self> {
        if range.span() <= 0 {
            return None;
        }
        let position = position_for(range, current);
        Some(Self {
            title: title.into(),
            range,
            position,
            original: position,
            prior: current,
        })
    }

    /// Thumb position, `0..=31`.
    pub const fn position(&self) -> u8 {
        self.position
    }

    /// Feed one key; returns the picked value once the bar is done.
    ///
    /// Confirming without moving the thumb, or escaping, returns the value
    /// the dialog opened with rather than the thumb's rounded value.
    pub fn handle(&mut self, key: Key) -> Option<DialogResult> {
        match key {
            Key::Left => {
                self.position = self.position.saturating_sub(1);
                None
            }
            Key::Right => {
                self.position = self.position.saturating_add(1).min(SCROLLBAR_MAX);
                None
            }
            Key::Escape => Some(DialogResult::Value(self.prior)),
            k if k.is_confirm() => {
                let value = if self.position == self.original {
                    self.prior
                } else {
                    value_at(self.range, self.position)
                };
                Some(DialogResult::Value(value))
            }
            _ => None,
        }
    }
}

/// Thumb position closest to `value`.
pub fn position_for(range: ValueRange, value: i32) -> u8 {
    let span = i64::from(range.span());
    let offset = i64::from(value.clamp(range.min, range.max.max(range.min)))
        .saturating_sub(i64::from(range.min));
    let scaled = offset
        .saturating_mul(i64::from(SCROLLBAR_MAX) * 2)
        .saturating_add(span);
    let position = scaled.checked_div(span.saturating_mul(2)).unwrap_or(0);
    u8::try_from(position.clamp(0, i64::from(SCROLLBAR_MAX))).unwrap_or(0)
}

/// Value at thumb `position`, rounded to nearest and clamped to `range`.
pub fn value_at(range: ValueRange, position: u8) -> i32 {
    let span = i64::from(range.span());
    let scaled = i64::from(position.min(SCROLLBAR_MAX))
        .saturating_mul(span)
        .saturating_mul(2)
        .saturating_add(i64::from(SCROLLBAR_MAX));
    let offset = scaled / (i64::from(SCROLLBAR_MAX) * 2);
    let value = i64::from(range.min).saturating_add(offset);
    i32::try_from(value.clamp(i64::from(range.min), i64::from(range.max))).unwrap_or(range.min)
}

/// A single-line upper-case text entry field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDialog {
    title: String,
    text: String,
    max_len: usize,
}

impl TextDialog {
    /// Build an empty field accepting up to `max_len` characters.
    pub fn new(title: impl Into<String>, max_len: usize) -> Self {
        Self {
            title: title.into(),
            text: String::new(),
            max_len,
        }
    }

    /// Text typed so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Feed one key; returns the text once the field is done.
    pub fn handle(&mut self, key: Key) -> Option<DialogResult> {
        match key {
            Key::Return => Some(DialogResult::Text(std::mem::take(&mut self.text))),
            Key::Escape => {
                self.text.clear();
                Some(DialogResult::Text(String::new()))
            }
            Key::Backspace | Key::Left => {
                self.text.pop();
                None
            }
            Key::Space => {
                self.push(' ');
                None
            }
            Key::Char(c) => {
                self.push(c.to_ascii_uppercase());
                None
            }
            _ => None,
        }
    }

    fn push(&mut self, c: char) {
        if self.text.chars().count() < self.max_len {
            self.text.push(c);
        }
    }
}

/// An open sub-dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    /// Pick a row.
    List(ListDialog),
    /// Pick a value.
    Scrollbar(ScrollbarDialog),
    /// Type a name.
    Text(TextDialog),
}

impl Dialog {
    fn handle(&mut self, key: Key) -> Option<DialogResult> {
        match self {
            Self::List(d) => d.handle(key),
            Self::Scrollbar(d) => d.handle(key),
            Self::Text(d) => d.handle(key),
        }
    }

    const fn mode(&self) -> GameMode {
        match self {
            Self::List(_) => GameMode::MenuList,
            Self::Scrollbar(_) => GameMode::MenuScrollbar,
            Self::Text(_) => GameMode::MenuStringInput,
        }
    }

    fn draw(&self, ctx: &mut GameContext<'_>) {
        let frame = match self {
            Self::List(d) => Frame::List {
                title: &d.title,
                items: &d.items,
                selected: d.selected,
            },
            Self::Scrollbar(d) => Frame::Scrollbar {
                title: &d.title,
                position: d.position,
            },
            Self::Text(d) => Frame::TextInput {
                title: &d.title,
                text: &d.text,
            },
        };
        present(ctx.view, &frame);
    }
}

// ---------------------------------------------------------------------------
// Handoff
// ---------------------------------------------------------------------------

/// What a dialog's result will be applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffTarget {
    /// A menu entry's own dialog.
    Item(MenuItem),
    /// A timing value picked from the game timing list.
    Timing(TimingSetting),
    /// The saved game names offered for loading, in list order.
    Load(Vec<String>),
    /// The saved game names offered for deletion, in list order.
    Delete(Vec<String>),
    /// The name for a new saved game.
    SaveName,
}

/// A completed dialog result awaiting application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    /// What the result applies to.
    pub target: HandoffTarget,
    /// The result.
    pub result: DialogResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenDialog {
    target: HandoffTarget,
    dialog: Dialog,
}

// ---------------------------------------------------------------------------
// Menu session
// ---------------------------------------------------------------------------

/// What the menu wants after a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuOutcome {
    /// Stay in the menu.
    Open,
    /// Close the menu and resume play.
    Close,
    /// The player asked for a new game; close the menu.
    NewGame,
    /// Load the named save and resume play with it.
    Load(String),
}

/// State of an open option menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSession {
    cursor: MenuCursor,
    next_draw: u64,
    dialog: Option<OpenDialog>,
    handoff: Option<Handoff>,
    unread: KeyBatch,
}

impl MenuSession {
    /// A menu with the cursor on the first entry, drawn on its first tick.
    pub fn new(now: u64) -> Self {
        Self {
            cursor: MenuCursor::default(),
            next_draw: now,
            dialog: None,
            handoff: None,
            unread: KeyBatch::new(),
        }
    }

    /// Highlighted entry.
    pub const fn cursor(&self) -> MenuCursor {
        self.cursor
    }

    /// Menu mode for the dialog that is showing.
    pub fn mode(&self) -> GameMode {
        self.dialog
            .as_ref()
            .map_or(GameMode::Menu, |open| open.dialog.mode())
    }

    /// The open dialog, if any.
    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref().map(|open| &open.dialog)
    }

    /// A result waiting for the next tick.
    pub const fn pending_handoff(&self) -> Option<&Handoff> {
        self.handoff.as_ref()
    }

    /// Keys that arrived after the menu stopped reading, oldest first.
    ///
    /// Keys behind a completed dialog are replayed on the next tick; keys
    /// behind a closing choice are left for whoever takes them here.
    pub fn take_unread(&mut self) -> KeyBatch {
        std::mem::take(&mut self.unread)
    }

    /// Run one menu tick: apply a parked result, process unread keys and
    /// then `keys`, and redraw when the render interval allows.
    pub fn update(
        &mut self,
        now: u64,
        keys: &[Key],
        ctx: &mut GameContext<'_>,
        config: &PresentationConfig,
    ) -> MenuOutcome {
        if let Some(handoff) = self.handoff.take() {
            let outcome = self.apply(handoff, ctx);
            if outcome != MenuOutcome::Open {
                return outcome;
            }
            self.next_draw = now;
        }

        let mut queued = std::mem::take(&mut self.unread);
        queued.extend_from_slice(keys);
        let mut rest = queued.into_iter();
        let mut outcome = MenuOutcome::Open;
        for key in rest.by_ref() {
            if let Some(open) = self.dialog.as_mut() {
                self.next_draw = now;
                if let Some(result) = open.dialog.handle(key) {
                    if let Some(done) = self.dialog.take() {
                        debug!(target = ?done.target, result = ?result, "Dialog completed");
                        self.handoff = Some(Handoff {
                            target: done.target,
                            result,
                        });
                    }
                    // The menu is redrawn under the closed dialog.
                    break;
                }
                continue;
            }
            outcome = match key {
                Key::Escape => MenuOutcome::Close,
                k if k.is_confirm() => self.select(ctx, config),
                other => {
                    self.cursor = move_cursor(self.cursor, other);
                    MenuOutcome::Open
                }
            };
            if outcome != MenuOutcome::Open {
                break;
            }
            self.next_draw = now;
        }
        self.unread = rest.collect();
        if outcome != MenuOutcome::Open {
            return outcome;
        }

        if now >= self.next_draw {
            self.next_draw = now.saturating_add(config.render_interval_ms);
            self.draw(ctx);
        }
        MenuOutcome::Open
    }

    fn draw(&self, ctx: &mut GameContext<'_>) {
        match &self.dialog {
            Some(open) => open.dialog.draw(ctx),
            None => present(
                ctx.view,
                &Frame::Menu {
                    cursor: self.cursor,
                },
            ),
        }
    }

    fn open(&mut self, target: HandoffTarget, dialog: Dialog) {
        debug!(target = ?target, mode = ?dialog.mode(), "Dialog opened");
        self.dialog = Some(OpenDialog { target, dialog });
    }

    fn open_list(&mut self, item: MenuItem, items: Vec<String>) {
        self.open(
            HandoffTarget::Item(item),
            Dialog::List(ListDialog::new(item.label(), items)),
        );
    }

    fn open_scrollbar(&mut self, target: HandoffTarget, title: &str, range: ValueRange, current: i32) {
        match ScrollbarDialog::new(title, range, current) {
            Some(bar) => self.open(target, Dialog::Scrollbar(bar)),
            None => warn!(title, min = range.min, max = range.max, "Scrollbar range is empty"),
        }
    }

    /// Act on the entry under the cursor.
    fn select(&mut self, ctx: &mut GameContext<'_>, config: &PresentationConfig) -> MenuOutcome {
        let Some(item) = self.cursor.item() else {
            return MenuOutcome::Open;
        };
        debug!(item = ?item, "Menu entry selected");
        match item {
            MenuItem::NewGame => return MenuOutcome::NewGame,
            MenuItem::Return => return MenuOutcome::Close,
            MenuItem::LoadGame | MenuItem::DeleteSave => {
                let names = list_saves(ctx, config.max_listed_saves);
                let rows = if names.is_empty() {
                    vec!["NO SAVED GAMES FOUND".to_owned(), BACK.to_owned()]
                } else {
                    names.iter().cloned().chain([BACK.to_owned()]).collect()
                };
                let target = if item == MenuItem::LoadGame {
                    HandoffTarget::Load(names)
                } else {
                    HandoffTarget::Delete(names)
                };
                self.open(target, Dialog::List(ListDialog::new(item.label(), rows)));
            }
            MenuItem::SaveGame => self.open(
                HandoffTarget::SaveName,
                Dialog::Text(TextDialog::new("ENTER SAVE NAME", config.save_name_max_len)),
            ),
            MenuItem::Graphics => self.open_list(
                item,
                ["NORMAL GRAPHICS", "HIRES GRAPHICS", "VECTOR GRAPHICS"]
                    .map(str::to_owned)
                    .to_vec(),
            ),
            MenuItem::SoundMode => {
                self.open_list(item, ["STEREO", "MONO"].map(str::to_owned).to_vec());
            }
            MenuItem::Volume => self.open_scrollbar(
                HandoffTarget::Item(item),
                "VOLUME LEVEL",
                VOLUME_RANGE,
                i32::from(ctx.settings.volume),
            ),
            MenuItem::GameTiming => {
                self.open_list(item, TIMING_LIST.map(str::to_owned).to_vec());
            }
            MenuItem::GameplayMods => {
                let flags = ctx.settings.mods.flags();
                self.open_list(item, toggle_rows(&flags, &GAMEPLAY_MOD_LABELS));
            }
            MenuItem::Cheats => {
                let flags = ctx.settings.cheats.flags();
                self.open_list(item, toggle_rows(&flags, &CHEAT_LABELS));
            }
            MenuItem::SaveOptions => {
                if let Err(err) = ctx.saves.save_options(ctx.settings) {
                    warn!(error = %err, "Failed to save options");
                } else {
                    info!("Options saved");
                }
                return MenuOutcome::Close;
            }
            MenuItem::Defaults => {
                let previous = std::mem::take(ctx.settings);
                apply_side_effects(&previous, ctx);
                info!("Settings restored to defaults");
                return MenuOutcome::Close;
            }
            MenuItem::BuildInfo => self.open_list(
                item,
                vec![
                    format!("DAGGORATH {}", env!("CARGO_PKG_VERSION")),
                    BACK.to_owned(),
                ],
            ),
        }
        MenuOutcome::Open
    }

    /// Apply a completed dialog's result.
    fn apply(&mut self, handoff: Handoff, ctx: &mut GameContext<'_>) -> MenuOutcome {
        let Handoff { target, result } = handoff;
        match (target, result) {
            (HandoffTarget::Item(MenuItem::Graphics), DialogResult::Choice(Some(row))) => {
                if let Some(mode) = GraphicsMode::from_choice(row) {
                    ctx.settings.graphics = mode;
                    info!(graphics = ?mode, "Graphics mode changed");
                    return MenuOutcome::Close;
                }
            }
            (HandoffTarget::Item(MenuItem::SoundMode), DialogResult::Choice(Some(row))) => {
                match row {
                    0 => ctx.settings.stereo = true,
                    1 => ctx.settings.stereo = false,
                    _ => {}
                }
            }
            (HandoffTarget::Item(MenuItem::Volume), DialogResult::Value(value)) => {
                let volume = u8::try_from(value.clamp(0, i32::from(VOLUME_MAX))).unwrap_or(VOLUME_MAX);
                ctx.settings.volume = volume;
                ctx.audio.set_master_volume(volume);
            }
            (HandoffTarget::Item(MenuItem::GameTiming), DialogResult::Choice(Some(row))) => {
                if let Some(setting) = TimingSetting::from_choice(row) {
                    let current = timing_value(ctx.settings, setting);
                    self.open_scrollbar(
                        HandoffTarget::Timing(setting),
                        setting.label(),
                        setting.range(),
                        current,
                    );
                }
            }
            (HandoffTarget::Timing(setting), DialogResult::Value(value)) => {
                apply_timing(setting, value, ctx);
            }
            (HandoffTarget::Item(MenuItem::GameplayMods), DialogResult::Choice(Some(row))) => {
                if ctx.settings.mods.toggle(row) {
                    debug!(row, "Gameplay modification toggled");
                }
            }
            (HandoffTarget::Item(MenuItem::Cheats), DialogResult::Choice(Some(row))) => {
                if ctx.settings.cheats.toggle(row) {
                    debug!(row, "Cheat toggled");
                }
            }
            (HandoffTarget::Load(names), DialogResult::Choice(Some(row))) => {
                if let Some(name) = names.get(row) {
                    return MenuOutcome::Load(name.clone());
                }
            }
            (HandoffTarget::Delete(names), DialogResult::Choice(Some(row))) => {
                if let Some(name) = names.get(row) {
                    match ctx.saves.delete_save(name) {
                        Ok(()) => info!(name = %name, "Saved game deleted"),
                        Err(err) => warn!(name = %name, error = %err, "Failed to delete saved game"),
                    }
                }
            }
            (HandoffTarget::SaveName, DialogResult::Text(name)) => {
                let name = name.trim();
                if !name.is_empty() {
                    match ctx.saves.save_game(name) {
                        Ok(()) => {
                            info!(name = %name, "Game saved");
                            return MenuOutcome::Close;
                        }
                        Err(err) => warn!(name = %name, error = %err, "Failed to save game"),
                    }
                }
            }
            _ => {}
        }
        MenuOutcome::Open
    }
}

/// Cursor after pressing `key` in the menu grid. Rows and columns wrap;
/// changing column returns to its first row.
pub fn move_cursor(cursor: MenuCursor, key: Key) -> MenuCursor {
    let columns = daggorath_types::MENU_COLUMNS.len();
    let rows = column_len(cursor.column);
    match key {
        Key::Up if rows > 0 => MenuCursor {
            row: cursor.row.checked_sub(1).unwrap_or(rows.saturating_sub(1)),
            ..cursor
        },
        Key::Down if rows > 0 => {
            let next = cursor.row.saturating_add(1);
            MenuCursor {
                row: if next >= rows { 0 } else { next },
                ..cursor
            }
        }
        Key::Left => MenuCursor {
            column: cursor.column.checked_sub(1).unwrap_or(columns.saturating_sub(1)),
            row: 0,
        },
        Key::Right => {
            let next = cursor.column.saturating_add(1);
            MenuCursor {
                column: if next >= columns { 0 } else { next },
                row: 0,
            }
        }
        _ => cursor,
    }
}

fn toggle_rows(flags: &[bool], labels: &[&str]) -> Vec<String> {
    flags
        .iter()
        .zip(labels)
        .map(|(on, label)| toggle_label(*on, label))
        .chain([BACK.to_owned()])
        .collect()
}

fn list_saves(ctx: &GameContext<'_>, max: usize) -> Vec<String> {
    match ctx.saves.list_saves() {
        Ok(mut names) => {
            names.truncate(max);
            names
        }
        Err(err) => {
            warn!(error = %err, "Failed to list saved games");
            Vec::new()
        }
    }
}

fn timing_value(settings: &Settings, setting: TimingSetting) -> i32 {
    let as_i32 = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);
    match setting {
        TimingSetting::CreatureSpeed => settings.creature_speed,
        TimingSetting::TurnDelay => as_i32(settings.turn_delay_ms),
        TimingSetting::MoveDelay => as_i32(settings.move_delay_ms),
        TimingSetting::CreatureRegen => as_i32(settings.creature_regen_minutes),
    }
}

fn apply_timing(setting: TimingSetting, value: i32, ctx: &mut GameContext<'_>) {
    let unsigned = u32::try_from(value).unwrap_or(0);
    match setting {
        TimingSetting::CreatureSpeed => {
            if ctx.settings.creature_speed != value {
                ctx.settings.creature_speed = value;
                ctx.game.update_creature_speed(value);
            }
        }
        TimingSetting::TurnDelay => ctx.settings.turn_delay_ms = unsigned,
        TimingSetting::MoveDelay => ctx.settings.move_delay_ms = unsigned,
        TimingSetting::CreatureRegen => {
            if ctx.settings.creature_regen_minutes != unsigned {
                ctx.settings.creature_regen_minutes = unsigned;
                if let Err(err) = ctx.scheduler.update_creature_regen(unsigned) {
                    warn!(error = %err, minutes = unsigned, "Failed to reschedule creature regeneration");
                }
            }
        }
    }
    info!(setting = ?setting, value, "Timing changed");
}

/// Push whatever changed between `previous` and the current settings to the
/// systems that cache them.
fn apply_side_effects(previous: &Settings, ctx: &mut GameContext<'_>) {
    if previous.volume != ctx.settings.volume {
        ctx.audio.set_master_volume(ctx.settings.volume);
    }
    if previous.creature_speed != ctx.settings.creature_speed {
        ctx.game.update_creature_speed(ctx.settings.creature_speed);
    }
    if previous.creature_regen_minutes != ctx.settings.creature_regen_minutes {
        let minutes = ctx.settings.creature_regen_minutes;
        if let Err(err) = ctx.scheduler.update_creature_regen(minutes) {
            warn!(error = %err, minutes, "Failed to reschedule creature regeneration");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use daggorath_types::settings::TURN_DELAY_RANGE;

    use super::*;

    fn cursor(column: usize, row: usize) -> MenuCursor {
        MenuCursor { column, row }
    }

    #[test]
    fn rows_wrap_within_a_column() {
        assert_eq!(move_cursor(cursor(0, 0), Key::Up), cursor(0, 4));
        assert_eq!(move_cursor(cursor(0, 4), Key::Down), cursor(0, 0));
        assert_eq!(move_cursor(cursor(1, 8), Key::Down), cursor(1, 0));
        assert_eq!(move_cursor(cursor(1, 3), Key::Char('x')), cursor(1, 3));
    }

    #[test]
    fn columns_wrap_and_reset_the_row() {
        assert_eq!(move_cursor(cursor(0, 3), Key::Right), cursor(1, 0));
        assert_eq!(move_cursor(cursor(1, 2), Key::Right), cursor(0, 0));
        assert_eq!(move_cursor(cursor(0, 2), Key::Left), cursor(1, 0));
    }

    #[test]
    fn list_wraps_and_reports_choice_or_escape() {
        let mut list = ListDialog::new("T", vec!["A".into(), "B".into(), "C".into()]);
        assert_eq!(list.handle(Key::Up), None);
        assert_eq!(list.selected(), 2);
        assert_eq!(list.handle(Key::Down), None);
        assert_eq!(list.selected(), 0);
        list.handle(Key::Down);
        assert_eq!(list.handle(Key::Return), Some(DialogResult::Choice(Some(1))));
        assert_eq!(list.handle(Key::Escape), Some(DialogResult::Choice(None)));
    }

    #[test]
    fn scrollbar_positions_round_to_nearest() {
        assert_eq!(position_for(VOLUME_RANGE, 0), 0);
        assert_eq!(position_for(VOLUME_RANGE, 128), 31);
        assert_eq!(position_for(TURN_DELAY_RANGE, 37), 11);
        assert_eq!(value_at(VOLUME_RANGE, 31), 128);
        assert_eq!(value_at(VOLUME_RANGE, 15), 62);
        assert_eq!(value_at(TURN_DELAY_RANGE, 11), 35);
        assert_eq!(position_for(TURN_DELAY_RANGE, 500), 31);
    }

    #[test]
    fn scrollbar_returns_prior_value_unless_moved() {
        let mut bar = ScrollbarDialog::new("TURN DELAY", TURN_DELAY_RANGE, 37).unwrap();
        assert_eq!(bar.handle(Key::Return), Some(DialogResult::Value(37)));

        bar.handle(Key::Right);
        bar.handle(Key::Right);
        assert_eq!(bar.position(), 13);
        assert_eq!(bar.handle(Key::Escape), Some(DialogResult::Value(37)));
        assert_eq!(bar.handle(Key::Return), Some(DialogResult::Value(42)));
    }

    #[test]
    fn scrollbar_clamps_thumb() {
        let mut bar = ScrollbarDialog::new("V", VOLUME_RANGE, 128).unwrap();
        bar.handle(Key::Right);
        assert_eq!(bar.position(), 31);
        let mut bar = ScrollbarDialog::new("V", VOLUME_RANGE, 0).unwrap();
        bar.handle(Key::Left);
        assert_eq!(bar.position(), 0);
    }

    #[test]
    fn empty_range_opens_no_scrollbar() {
        assert!(ScrollbarDialog::new("X", ValueRange::new(5, 5), 5).is_none());
        assert!(ScrollbarDialog::new("X", ValueRange::new(9, 1), 5).is_none());
    }

    #[test]
    fn text_entry_edits_and_caps_length() {
        let mut text = TextDialog::new("NAME", 3);
        for key in [Key::Char('a'), Key::Modifier, Key::Up, Key::Space, Key::Char('b'), Key::Char('c')] {
            assert_eq!(text.handle(key), None);
        }
        assert_eq!(text.text(), "A B");
        text.handle(Key::Backspace);
        text.handle(Key::Left);
        assert_eq!(text.text(), "A");
        assert_eq!(text.handle(Key::Return), Some(DialogResult::Text("A".into())));
    }

    #[test]
    fn text_escape_clears() {
        let mut text = TextDialog::new("NAME", 15);
        text.handle(Key::Char('q'));
        assert_eq!(text.handle(Key::Escape), Some(DialogResult::Text(String::new())));
        assert_eq!(text.text(), "");
    }

    #[test]
    fn toggle_rows_end_with_back() {
        let rows = toggle_rows(&[true, false], &["ONE", "TWO"]);
        assert_eq!(rows, vec!["[ON]  ONE", "[OFF] TWO", "BACK"]);
    }
}
