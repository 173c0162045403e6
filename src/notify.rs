//! Toast notifications.
//!
//! A toast is appended to the body, stays up for the configured duration,
//! then fades and is removed.

use crate::dom::{Dom, NodeId};
use crate::events::{AppEvent, Events};
use crate::views;
use std::time::Duration;
use tracing::debug;

/// Fade-out applied before a toast leaves the document.
const FADE_OUT: Duration = Duration::from_millis(300);
const TOAST_CLASS: &str = "toast";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

impl NoticeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }

    /// Background utility class of the toast.
    pub fn class(self) -> &'static str {
        match self {
            Self::Success => "bg-green-500",
            Self::Error => "bg-red-500",
            Self::Info => "bg-blue-500",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notifier {
    dom: Dom,
    duration: Duration,
    events: Events,
}

impl Notifier {
    pub fn new(dom: Dom, duration: Duration, events: Events) -> Self {
        Self {
            dom,
            duration,
            events,
        }
    }

    /// Show `message` and schedule its removal. Outside a tokio runtime the
    /// toast stays until [`Notifier::dismiss`] is called.
    pub fn show(&self, message: &str, kind: NoticeKind) -> Option<NodeId> {
        let markup = views::toast(message, kind).into_string();
        let toast = self.dom.write(|doc| {
            let body = doc.body();
            doc.append_html(body, &markup).into_iter().next()
        })?;
        debug!(kind = kind.as_str(), message, "toast shown");
        self.events.emit(AppEvent::Notification {
            message: message.to_string(),
            kind,
        });

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let notifier = self.clone();
            let visible_for = self.duration;
            handle.spawn(async move {
                tokio::time::sleep(visible_for).await;
                notifier.dom.write(|doc| doc.set_style(toast, "opacity", "0"));
                tokio::time::sleep(FADE_OUT).await;
                notifier.dismiss(toast);
            });
        }
        Some(toast)
    }

    pub fn dismiss(&self, toast: NodeId) {
        self.dom.write(|doc| doc.remove(toast));
    }

    /// Messages of the toasts currently on screen, oldest first.
    pub fn visible(&self) -> Vec<String> {
        self.dom.read(|doc| {
            doc.by_class(TOAST_CLASS)
                .into_iter()
                .map(|t| doc.text_content(t))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> (Notifier, tokio::sync::mpsc::UnboundedReceiver<AppEvent>) {
        let (events, rx) = Events::channel();
        (
            Notifier::new(Dom::default(), Duration::from_millis(3000), events),
            rx,
        )
    }

    #[test]
    fn show_without_runtime_keeps_toast() {
        let (notifier, mut rx) = notifier();
        let toast = notifier.show("Salvo!", NoticeKind::Success).unwrap();
        assert_eq!(notifier.visible(), vec!["Salvo!"]);
        assert!(matches!(
            rx.try_recv().unwrap(),
            AppEvent::Notification { kind: NoticeKind::Success, .. }
        ));
        notifier.dismiss(toast);
        assert!(notifier.visible().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn toast_is_removed_after_duration_and_fade() {
        let (notifier, _rx) = notifier();
        notifier.show("Oi", NoticeKind::Info);

        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(notifier.visible(), vec!["Oi"]);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(notifier.visible().is_empty());
    }
}
