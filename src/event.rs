use crate::types::Event;
use std::io::{self, BufRead};
use std::thread;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Reads user commands from stdin, one per line.
///
/// Blocking reads run on a detached thread so that a pending read never keeps
/// the runtime alive on quit.
pub struct EventHandler {
    rx: UnboundedReceiver<Event>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let event = match line {
                    Ok(line) => Event::Line(line),
                    Err(e) => return Self::send(&tx, Event::Error(e.to_string())),
                };
                // The receiver is gone once the app has quit
                if tx.send(event).is_err() {
                    return;
                }
            }
            Self::send(&tx, Event::Eof);
        });
        Self { rx }
    }
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
    fn send(tx: &UnboundedSender<Event>, event: Event) {
        if let Err(e) = tx.send(event) {
            log::debug!("failed to send event: {e}");
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}
