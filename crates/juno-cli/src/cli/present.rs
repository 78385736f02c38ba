//! Terminal presenter for conversation events.
//!
//! A [`Presenter`] subscribes to an [`EventBus`] and renders what the
//! conversation publishes: styled streaming text on stdout, or one JSON
//! object per event with `--json`. Styled output is driven by the
//! accumulated `stream.update` text, so a presenter that lags behind the
//! bus still prints every character exactly once.

use std::io::Write;

use console::style;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::warn;

use juno_core::event::{BusObserver, EventBus};
use juno_types::event::ShellEvent;

const BUS_CAPACITY: usize = 1024;

/// How events are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Styled,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json { OutputMode::Json } else { OutputMode::Styled }
    }
}

/// Background task rendering one conversation turn.
pub struct Presenter {
    handle: JoinHandle<()>,
}

impl Presenter {
    /// Start rendering. Pass the returned observer to the conversation and
    /// drop it when the turn is over, then await [`finish`](Self::finish).
    pub fn start(mode: OutputMode) -> (BusObserver, Presenter) {
        let bus = EventBus::new(BUS_CAPACITY);
        let mut rx = bus.subscribe();

        let handle = tokio::spawn(async move {
            let mut screen = Screen::new(mode);
            loop {
                match rx.recv().await {
                    Ok(event) => screen.show(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "presenter fell behind the event bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            screen.close();
        });

        (BusObserver::new(bus), Presenter { handle })
    }

    /// Wait until every published event has been rendered.
    pub async fn finish(self) {
        if let Err(err) = self.handle.await {
            warn!(error = %err, "presenter task failed");
        }
    }
}

/// Rendering state for one turn.
struct Screen {
    mode: OutputMode,
    /// Characters of the current response already printed.
    printed: usize,
}

impl Screen {
    fn new(mode: OutputMode) -> Self {
        Self { mode, printed: 0 }
    }

    fn show(&mut self, event: &ShellEvent) {
        match self.mode {
            OutputMode::Json => {
                if let Ok(line) = serde_json::to_string(event) {
                    println!("{line}");
                }
            }
            OutputMode::Styled => self.show_styled(event),
        }
    }

    fn show_styled(&mut self, event: &ShellEvent) {
        match event {
            ShellEvent::StreamStart => self.printed = 0,
            ShellEvent::StreamUpdate(text) => self.print_unseen(text),
            ShellEvent::StreamEnd(text) => {
                self.print_unseen(text);
                self.close();
            }
            ShellEvent::FunctionCall(description) => {
                self.close();
                eprintln!("  {} {}", style("⚙").cyan(), style(description).dim());
            }
            ShellEvent::Error(message) => {
                self.close();
                eprintln!("  {} {message}", style("!").yellow().bold());
            }
            ShellEvent::Chunk(_) => {}
        }
    }

    fn print_unseen(&mut self, text: &str) {
        let (fresh, total) = unseen(text, self.printed);
        if !fresh.is_empty() {
            print!("{fresh}");
            let _ = std::io::stdout().flush();
        }
        self.printed = total;
    }

    /// Terminate a partially printed response with a newline.
    fn close(&mut self) {
        if self.mode == OutputMode::Styled && self.printed > 0 {
            println!();
            self.printed = 0;
        }
    }
}

/// The part of `text` after the first `printed` characters, and the
/// character count of `text`.
fn unseen(text: &str, printed: usize) -> (&str, usize) {
    let total = text.chars().count();
    let start = text
        .char_indices()
        .nth(printed)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    (&text[start..], total.max(printed))
}

/// Separator printed between conversation turns.
pub fn print_turn_separator(mode: OutputMode) {
    if mode == OutputMode::Styled {
        println!("{}", style("---").dim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use juno_core::conversation::ConversationObserver;

    #[test]
    fn test_unseen_suffix() {
        assert_eq!(unseen("Hello", 0), ("Hello", 5));
        assert_eq!(unseen("Hello", 3), ("lo", 5));
        assert_eq!(unseen("Hello", 5), ("", 5));
        assert_eq!(unseen("héllo 😀", 2), ("llo 😀", 7));
        assert_eq!(unseen("Hi", 4), ("", 4));
    }

    #[test]
    fn test_styled_screen_tracks_printed_characters() {
        let mut screen = Screen::new(OutputMode::Styled);
        screen.show(&ShellEvent::StreamStart);
        screen.show(&ShellEvent::StreamUpdate("He".to_string()));
        assert_eq!(screen.printed, 2);
        screen.show(&ShellEvent::StreamUpdate("Hello".to_string()));
        assert_eq!(screen.printed, 5);
        screen.show(&ShellEvent::StreamEnd("Hello".to_string()));
        assert_eq!(screen.printed, 0);
    }

    #[tokio::test]
    async fn test_presenter_drains_after_observer_drop() {
        let (observer, presenter) = Presenter::start(OutputMode::Json);
        observer.on_start();
        observer.on_chunk("x");
        observer.on_end("x");
        drop(observer);
        tokio::time::timeout(std::time::Duration::from_secs(5), presenter.finish())
            .await
            .unwrap();
    }
}
