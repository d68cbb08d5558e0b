//! Event pumping shared by every handler that reads input.

use daggorath_types::{EventKind, Key};
use smallvec::SmallVec;

use crate::collaborators::GameContext;

/// Keys pressed since the previous poll, in arrival order.
pub type KeyBatch = SmallVec<[Key; 8]>;

/// Drains the input collaborator, keeping the host responsive.
///
/// Quit requests are latched; expose events re-present the last frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputPump {
    quit: bool,
}

impl InputPump {
    /// Drain pending events and return the keys pressed.
    pub fn poll(&mut self, ctx: &mut GameContext<'_>) -> KeyBatch {
        let mut keys = KeyBatch::new();
        for event in ctx.input.poll_events() {
            match event.kind {
                EventKind::KeyDown => keys.push(event.key),
                EventKind::KeyUp => {}
                EventKind::Quit => self.quit = true,
                EventKind::Expose => ctx.view.present_swap(),
            }
        }
        keys
    }

    /// Drain pending events, reporting only whether any key went down.
    pub fn any_key(&mut self, ctx: &mut GameContext<'_>) -> bool {
        !self.poll(ctx).is_empty()
    }

    /// Whether a quit event has been seen.
    pub const fn quit_requested(&self) -> bool {
        self.quit
    }
}
