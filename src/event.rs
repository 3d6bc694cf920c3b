use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh and background revalidation
  Tick,
  /// A store refresh finished (successfully or not)
  Refreshed,
}

/// Event handler merging terminal input, a tick timer and messages from
/// background fetch tasks.
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    let input_tx = tx.clone();
    tokio::spawn(async move {
      let mut reader = EventStream::new();
      let mut ticker = tokio::time::interval(tick_rate);

      loop {
        let event = tokio::select! {
          _ = ticker.tick() => Event::Tick,
          next = reader.next() => match next {
            Some(Ok(CrosstermEvent::Key(key))) if key.kind == KeyEventKind::Press => Event::Key(key),
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => break,
          },
        };

        if input_tx.send(event).is_err() {
          break;
        }
      }
    });

    Self { tx, rx }
  }

  /// Sender for background tasks
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
