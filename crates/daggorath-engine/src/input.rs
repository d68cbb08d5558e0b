//! Console input.
//!
//! A tokio task reads standard input line by line and turns each line into
//! key events; the frame loop drains them without waiting. An empty line is
//! Return. Words from [`named_key`] press that key; anything else is typed
//! character by character, so `t l` followed by an empty line enters the
//! command `TL`. End of input, `q` and `quit` ask the host to stop.

use daggorath_presentation::InputSource;
use daggorath_types::{EventBatch, InputEvent, Key};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Key pressed by a whole word on the console, if any.
pub fn named_key(word: &str) -> Option<Key> {
    let key = match word.to_ascii_lowercase().as_str() {
        "enter" | "ret" => Key::Return,
        "space" => Key::Space,
        "esc" | "escape" => Key::Escape,
        "up" => Key::Up,
        "down" => Key::Down,
        "left" => Key::Left,
        "right" => Key::Right,
        "bs" | "back" => Key::Backspace,
        _ => return None,
    };
    Some(key)
}

/// Events produced by one console line.
pub fn parse_line(line: &str) -> EventBatch {
    let mut events = EventBatch::new();
    let trimmed = line.trim();
    if trimmed.is_empty() {
        events.push(InputEvent::key_down(Key::Return));
        return events;
    }
    if trimmed.eq_ignore_ascii_case("q") || trimmed.eq_ignore_ascii_case("quit") {
        events.push(InputEvent::quit());
        return events;
    }
    for word in trimmed.split_whitespace() {
        match named_key(word) {
            Some(key) => events.push(InputEvent::key_down(key)),
            None => events.extend(word.chars().map(|c| InputEvent::key_down(Key::Char(c)))),
        }
    }
    events
}

/// [`InputSource`] fed by a channel of events.
#[derive(Debug)]
pub struct ConsoleInput {
    events: mpsc::UnboundedReceiver<InputEvent>,
}

impl ConsoleInput {
    /// Start reading standard input on the tokio runtime.
    pub fn spawn_stdin() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(read_stdin(tx));
        Self::from_receiver(rx)
    }

    /// Wrap an existing event channel.
    pub const fn from_receiver(events: mpsc::UnboundedReceiver<InputEvent>) -> Self {
        Self { events }
    }
}

impl InputSource for ConsoleInput {
    fn poll_events(&mut self) -> EventBatch {
        let mut batch = EventBatch::new();
        while let Ok(event) = self.events.try_recv() {
            batch.push(event);
        }
        batch
    }
}

async fn read_stdin(tx: mpsc::UnboundedSender<InputEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                debug!(line = %line, "Console input");
                for event in parse_line(&line) {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
            }
            Ok(None) => {
                debug!("Console input closed");
                let _ = tx.send(InputEvent::quit());
                return;
            }
            Err(e) => {
                warn!(error = %e, "Console read failed, stopping input");
                let _ = tx.send(InputEvent::quit());
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use daggorath_types::EventKind;

    use super::*;

    fn keys(line: &str) -> Vec<Key> {
        parse_line(line).iter().filter_map(InputEvent::pressed).collect()
    }

    #[test]
    fn empty_line_is_return() {
        assert_eq!(keys("   "), vec![Key::Return]);
    }

    #[test]
    fn words_and_characters_mix() {
        assert_eq!(
            keys("esc t l"),
            vec![Key::Escape, Key::Char('t'), Key::Char('l')]
        );
        assert_eq!(keys("DOWN down"), vec![Key::Down, Key::Down]);
    }

    #[test]
    fn quit_word_is_a_quit_event() {
        let events = parse_line("quit");
        assert_eq!(events.len(), 1);
        assert!(events.iter().all(|e| e.kind == EventKind::Quit));
    }

    #[test]
    fn poll_drains_what_arrived() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut input = ConsoleInput::from_receiver(rx);
        assert!(input.poll_events().is_empty());
        for event in parse_line("m") {
            tx.send(event).ok();
        }
        tx.send(InputEvent::key_down(Key::Return)).ok();
        let batch = input.poll_events();
        assert_eq!(batch.len(), 2);
        assert!(input.poll_events().is_empty());
    }
}
