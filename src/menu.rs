//! Mobile navigation menu.
//!
//! A toggle button (`#mobile-menu-button`) opens and closes a panel
//! (`#mobile-menu`). The panel closes by itself when the viewport grows to
//! desktop width, when one of its links is followed, or when the user
//! clicks anywhere outside both the button and the panel.

use crate::dom::{Dom, NodeId};
use crate::events::{AppEvent, Events};
use crate::views;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

pub const BUTTON_ID: &str = "mobile-menu-button";
pub const PANEL_ID: &str = "mobile-menu";
const HIDDEN_CLASS: &str = "hidden";
const SHOW_CLASS: &str = "show";

#[derive(Debug)]
pub struct MobileMenu {
    dom: Dom,
    desktop_breakpoint: u32,
    events: Events,
    open: AtomicBool,
}

impl MobileMenu {
    pub fn new(dom: Dom, desktop_breakpoint: u32, events: Events) -> Self {
        Self {
            dom,
            desktop_breakpoint,
            events,
            open: AtomicBool::new(false),
        }
    }

    fn hooks(&self) -> Option<(NodeId, NodeId)> {
        self.dom
            .read(|doc| Some((doc.by_id(BUTTON_ID)?, doc.by_id(PANEL_ID)?)))
    }

    /// True when both the button and the panel are in the document.
    pub fn is_bound(&self) -> bool {
        self.hooks().is_some()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn toggle(&self) -> bool {
        if self.is_open() {
            self.close();
        } else {
            self.open();
        }
        self.is_open()
    }

    pub fn open(&self) {
        self.set_open(true);
    }

    pub fn close(&self) {
        self.set_open(false);
    }

    fn set_open(&self, open: bool) {
        let Some((button, panel)) = self.hooks() else {
            debug!("mobile menu hooks missing");
            return;
        };
        let icon = views::menu_icon(open).into_string();
        self.dom.write(|doc| {
            doc.toggle_class(panel, HIDDEN_CLASS, !open);
            doc.toggle_class(panel, SHOW_CLASS, open);
            doc.set_attr(button, "aria-expanded", if open { "true" } else { "false" });
            doc.set_inner_html(button, &icon);
        });
        if self.open.swap(open, Ordering::SeqCst) != open {
            self.events.emit(AppEvent::MenuToggled { open });
        }
    }

    /// Close when the viewport reaches desktop width.
    pub fn on_resize(&self, width: u32) {
        if width >= self.desktop_breakpoint && self.is_open() {
            self.close();
        }
    }

    pub fn on_link_activated(&self) {
        if self.is_open() {
            self.close();
        }
    }

    /// A click landed on `target`; close when it is outside the menu.
    pub fn on_pointer(&self, target: NodeId) {
        if !self.is_open() {
            return;
        }
        let Some((button, panel)) = self.hooks() else {
            return;
        };
        let outside = self
            .dom
            .read(|doc| !doc.contains(button, target) && !doc.contains(panel, target));
        if outside {
            self.close();
        }
    }

    /// True when `target` is a link inside the panel.
    pub fn is_panel_link(&self, target: NodeId) -> bool {
        let Some((_, panel)) = self.hooks() else {
            return false;
        };
        self.dom.read(|doc| {
            doc.closest(target, |el| el.tag == "a")
                .is_some_and(|link| doc.contains(panel, link))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHELL: &str = r##"
        <button id="mobile-menu-button"><i data-lucide="menu"></i></button>
        <div id="mobile-menu" class="hidden"><a id="link" href="#produtos">Produtos</a></div>
        <p id="outside">text</p>
    "##;

    fn menu() -> (MobileMenu, Dom) {
        let dom = Dom::from_shell(SHELL);
        (MobileMenu::new(dom.clone(), 768, Events::disabled()), dom)
    }

    fn node(dom: &Dom, id: &str) -> NodeId {
        dom.read(|doc| doc.by_id(id).unwrap())
    }

    #[test]
    fn toggle_swaps_panel_and_icon() {
        let (menu, dom) = menu();
        assert!(menu.toggle());
        let (button, panel) = (node(&dom, BUTTON_ID), node(&dom, PANEL_ID));
        dom.read(|doc| {
            assert!(!doc.has_class(panel, "hidden"));
            assert!(doc.has_class(panel, "show"));
            assert!(doc.inner_html(button).contains("data-lucide=\"x\""));
        });
        assert!(!menu.toggle());
        dom.read(|doc| {
            assert!(doc.has_class(panel, "hidden"));
            assert!(doc.inner_html(button).contains("data-lucide=\"menu\""));
        });
    }

    #[test]
    fn resize_to_desktop_closes() {
        let (menu, _dom) = menu();
        menu.open();
        menu.on_resize(500);
        assert!(menu.is_open());
        menu.on_resize(768);
        assert!(!menu.is_open());
    }

    #[test]
    fn outside_click_closes_but_inside_does_not() {
        let (menu, dom) = menu();
        menu.open();
        menu.on_pointer(node(&dom, "link"));
        assert!(menu.is_open());
        menu.on_pointer(node(&dom, "outside"));
        assert!(!menu.is_open());
    }

    #[test]
    fn panel_links_are_recognised() {
        let (menu, dom) = menu();
        assert!(menu.is_panel_link(node(&dom, "link")));
        assert!(!menu.is_panel_link(node(&dom, "outside")));
        menu.open();
        menu.on_link_activated();
        assert!(!menu.is_open());
    }

    #[test]
    fn missing_hooks_are_a_no_op() {
        let menu = MobileMenu::new(Dom::default(), 768, Events::disabled());
        assert!(!menu.is_bound());
        menu.open();
        assert!(!menu.is_open());
    }
}
