//! Application events.
//!
//! Controllers report what happened on an unbounded channel; the CLI prints
//! the stream and tests assert on it. Sending never blocks and a missing or
//! closed receiver is not an error.

use crate::catalog::Grid;
use crate::notify::NoticeKind;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A page fragment was committed to the container.
    PageLoaded { page: String },
    /// A page fragment could not be fetched; the error panel is showing.
    PageFailed { page: String, reason: String },
    /// A navigation finished after a newer one started and was discarded.
    NavigationSuperseded { page: String },
    CatalogRendered { grid: Grid, count: usize },
    FilterApplied { category: String, shown: usize },
    /// An element with the reveal trigger class became visible.
    ElementRevealed { id: Option<String> },
    CountdownExpired,
    MenuToggled { open: bool },
    ModalOpened { product: String },
    ModalClosed,
    CartUpdated { count: u32 },
    Notification { message: String, kind: NoticeKind },
}

/// Optional sender half of the event channel.
#[derive(Debug, Clone, Default)]
pub struct Events(Option<UnboundedSender<AppEvent>>);

impl Events {
    /// A connected sender and the receiver that drains it.
    pub fn channel() -> (Self, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self(Some(tx)), rx)
    }

    /// Events that go nowhere.
    pub fn disabled() -> Self {
        Self(None)
    }

    pub fn emit(&self, event: AppEvent) {
        if let Some(tx) = &self.0 {
            let _ = tx.send(event);
        }
    }
}
