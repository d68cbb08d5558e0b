//! A view that renders to the log instead of a window.
//!
//! Each presented frame becomes one structured `tracing` event, and a frame
//! identical to the previous one is only counted. That keeps the output
//! readable at sixty frames per second while the fades and sweeps are still
//! visible line by line.

use daggorath_presentation::{Frame, View};
use daggorath_types::{Message, Region};
use tracing::{debug, info, trace};

/// Text of a canned message.
pub const fn message_text(message: Message) -> &'static str {
    match message {
        Message::Copyright => "COPYRIGHT 1982 DYNAMICRO",
        Message::Welcome => "I DARE YE ENTER... ...THE DUNGEONS OF DAGGORATH!",
        Message::Prepare => "PREPARE!",
        Message::Enough => "ENOUGH! I TIRE OF THIS PLAY... PREPARE TO MEET THY DOOM!",
        Message::Death => "YET ANOTHER DOES NOT RETURN...",
        Message::Winner => "BEHOLD! DESTINY AWAITS THE HAND OF A NEW WIZARD...",
    }
}

/// One-line description of a frame, used as the log payload.
pub fn describe(frame: &Frame<'_>) -> String {
    match *frame {
        Frame::Wizard {
            variant,
            fade,
            show_message,
        } => format!("wizard {variant:?} fade={fade} message={show_message}"),
        Frame::Title => "title".to_owned(),
        Frame::Map => "map".to_owned(),
        Frame::Dungeon => "dungeon".to_owned(),
        Frame::TurnSweep { x } => format!("sweep x={x}"),
        Frame::Menu { cursor } => format!("menu {}:{}", cursor.column, cursor.row),
        Frame::List {
            title,
            items,
            selected,
        } => {
            let row = items.get(selected).map_or("", String::as_str);
            format!("list {title:?} [{selected}] {row}")
        }
        Frame::Scrollbar { title, position } => format!("scrollbar {title:?} {position}/31"),
        Frame::TextInput { title, text } => format!("text {title:?} {text:?}"),
    }
}

/// Log-backed [`View`].
#[derive(Debug, Default)]
pub struct TracingView {
    light: u8,
    drawn: Option<String>,
    last_presented: Option<String>,
    repeats: u64,
    presented: u64,
}

impl TracingView {
    /// A view at the given starting light level.
    pub const fn new(light: u8) -> Self {
        Self {
            light,
            drawn: None,
            last_presented: None,
            repeats: 0,
            presented: 0,
        }
    }

    /// Frames presented so far.
    pub const fn presented(&self) -> u64 {
        self.presented
    }

    /// Description of the last frame shown.
    pub fn last_presented(&self) -> Option<&str> {
        self.last_presented.as_deref()
    }
}

impl View for TracingView {
    fn draw_frame(&mut self, frame: &Frame<'_>) {
        self.drawn = Some(describe(frame));
    }

    fn clear_region(&mut self, region: Region) {
        trace!(region = ?region, "Region cleared");
    }

    fn show_message(&mut self, message: Message) {
        info!(message = message_text(message), "Message");
    }

    fn set_light_level(&mut self, level: u8) {
        self.light = level;
    }

    fn light_level(&self) -> u8 {
        self.light
    }

    fn present_swap(&mut self) {
        self.presented = self.presented.saturating_add(1);
        let Some(frame) = self.drawn.take() else {
            return;
        };
        if self.last_presented.as_ref() == Some(&frame) {
            self.repeats = self.repeats.saturating_add(1);
            return;
        }
        debug!(frame = %frame, light = self.light, repeats = self.repeats, "Frame");
        self.repeats = 0;
        self.last_presented = Some(frame);
    }
}

#[cfg(test)]
mod tests {
    use daggorath_types::FadeVariant;

    use super::*;

    #[test]
    fn repeated_frames_are_folded() {
        let mut view = TracingView::new(5);
        for _ in 0..3 {
            view.draw_frame(&Frame::Title);
            view.present_swap();
        }
        view.draw_frame(&Frame::Dungeon);
        view.present_swap();
        assert_eq!(view.presented(), 4);
        assert_eq!(view.last_presented(), Some("dungeon"));
    }

    #[test]
    fn wizard_description_names_the_fade() {
        let text = describe(&Frame::Wizard {
            variant: FadeVariant::Death,
            fade: 12,
            show_message: false,
        });
        assert_eq!(text, "wizard Death fade=12 message=false");
    }
}
