//! Scroll-triggered reveal animations.
//!
//! Elements carrying the trigger class start hidden (by stylesheet) and get
//! the visible class the first time they intersect the viewport. A reveal
//! is one-shot: the visible class is never removed and a revealed element
//! is never observed again.
//!
//! ## Intersection
//!
//! The viewport is `[scroll_y, scroll_y + height - root_margin_bottom]`.
//! An element intersects when the fraction of its height inside that band
//! is at least `threshold`. Elements without a layout box never intersect.
//!
//! ## Fallback
//!
//! Hosts that cannot report geometry set `reveal.observer = false`; every
//! discovered element is then revealed on a staggered timer.

use crate::config::RevealConfig;
use crate::dom::{Document, Dom, NodeId};
use crate::events::{AppEvent, Events};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

const DELAY_ATTR: &str = "data-animation-delay";
const NAVBAR_ID: &str = "header";
const SCROLLED_CLASS: &str = "scrolled";
/// Scroll offset past which the navbar is marked scrolled.
const SCROLLED_AFTER: f64 = 50.0;
/// Scroll offset past which scrolling down hides the navbar.
const HIDE_AFTER: f64 = 100.0;

/// True when `node` passes the intersection test for the current viewport.
pub fn intersects(doc: &Document, node: NodeId, config: &RevealConfig) -> bool {
    let Some(rect) = doc.rect(node) else {
        return false;
    };
    let top = doc.viewport.scroll_y;
    let bottom = top + doc.viewport.height - config.root_margin_bottom;
    if bottom <= top {
        return false;
    }
    if rect.height <= 0.0 {
        return rect.top >= top && rect.top <= bottom;
    }
    let overlap = (rect.top + rect.height).min(bottom) - rect.top.max(top);
    overlap >= 0.0 && overlap / rect.height >= config.threshold
}

/// Mark `node` visible. Returns false when it already was (or is gone).
fn animate(doc: &mut Document, node: NodeId, config: &RevealConfig) -> bool {
    if !doc.exists(node) || doc.has_class(node, &config.visible_class) {
        return false;
    }
    doc.add_class(node, &config.visible_class);
    if let Some(delay) = doc
        .attr(node, DELAY_ATTR)
        .and_then(|d| d.trim().parse::<u64>().ok())
    {
        doc.set_style(node, "transition-delay", &format!("{delay}ms"));
    }
    true
}

fn element_id(doc: &Document, node: NodeId) -> Option<String> {
    doc.element(node)?.id().map(str::to_string)
}

/// Outcome of a discovery pass.
#[derive(Debug, Default)]
pub struct RevealPass {
    /// Elements left under observation.
    pub observed: usize,
    /// Elements revealed immediately because they were already on screen.
    pub revealed: Vec<NodeId>,
    /// Staggered fallback task, when the host has no observer.
    pub fallback: Option<JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct NavbarState {
    last_scroll_y: f64,
}

#[derive(Debug)]
pub struct RevealAnimator {
    dom: Dom,
    config: RevealConfig,
    events: Events,
    observed: Mutex<Vec<NodeId>>,
    navbar: Mutex<NavbarState>,
}

impl RevealAnimator {
    pub fn new(dom: Dom, config: RevealConfig, events: Events) -> Self {
        Self {
            dom,
            config,
            events,
            observed: Mutex::new(Vec::new()),
            navbar: Mutex::new(NavbarState::default()),
        }
    }

    fn observed(&self) -> std::sync::MutexGuard<'_, Vec<NodeId>> {
        self.observed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn announce(&self, revealed: &[NodeId]) {
        if revealed.is_empty() {
            return;
        }
        let ids: Vec<Option<String>> = self
            .dom
            .read(|doc| revealed.iter().map(|n| element_id(doc, *n)).collect());
        for id in ids {
            self.events.emit(AppEvent::ElementRevealed { id });
        }
    }

    /// Drop every observation and rediscover trigger elements, then reveal
    /// the ones already on screen.
    pub fn refresh(&self) -> RevealPass {
        let discovered: Vec<NodeId> = self.dom.read(|doc| {
            doc.by_class(&self.config.trigger_class)
                .into_iter()
                .filter(|n| !doc.has_class(*n, &self.config.visible_class))
                .collect()
        });

        if !self.config.observer {
            self.observed().clear();
            let count = discovered.len();
            let delay = Duration::from_millis(self.config.stagger_ms);
            debug!(count, "no observer, revealing on a timer");
            return RevealPass {
                observed: 0,
                revealed: Vec::new(),
                fallback: self.stagger(discovered, delay),
            };
        }

        *self.observed() = discovered;
        let revealed = self.evaluate();
        let observed = self.observed().len();
        debug!(observed, revealed = revealed.len(), "reveal refresh");
        RevealPass {
            observed,
            revealed,
            fallback: None,
        }
    }

    /// Test every observed element against the viewport; reveal and stop
    /// observing the ones that intersect.
    pub fn evaluate(&self) -> Vec<NodeId> {
        let revealed = {
            let mut observed = self.observed();
            self.dom.write(|doc| {
                let mut revealed = Vec::new();
                observed.retain(|node| {
                    if !doc.exists(*node) {
                        return false;
                    }
                    if !intersects(doc, *node, &self.config) {
                        return true;
                    }
                    if animate(doc, *node, &self.config) {
                        revealed.push(*node);
                    }
                    false
                });
                revealed
            })
        };
        self.announce(&revealed);
        revealed
    }

    /// The host reports that `node` entered the viewport.
    pub fn on_intersect(&self, node: NodeId) -> bool {
        {
            let mut observed = self.observed();
            let Some(pos) = observed.iter().position(|n| *n == node) else {
                return false;
            };
            observed.remove(pos);
        }
        let revealed = self.dom.write(|doc| animate(doc, node, &self.config));
        if revealed {
            self.announce(&[node]);
        }
        revealed
    }

    /// Scroll the viewport, update the navbar and reveal what came into view.
    pub fn on_scroll(&self, y: f64) -> Vec<NodeId> {
        let y = y.max(0.0);
        let last = {
            let mut navbar = self.navbar.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut navbar.last_scroll_y, y)
        };
        self.dom.write(|doc| {
            doc.scroll_to(y);
            if let Some(header) = doc.by_id(NAVBAR_ID) {
                doc.toggle_class(header, SCROLLED_CLASS, y > SCROLLED_AFTER);
                let transform = if y > last && y > HIDE_AFTER {
                    "translateY(-100%)"
                } else {
                    "translateY(0)"
                };
                doc.set_style(header, "transform", transform);
            }
        });
        self.evaluate()
    }

    /// Put `node` under observation unless it was already revealed.
    pub fn add_element(&self, node: NodeId) -> bool {
        let eligible = self.dom.write(|doc| {
            if !doc.exists(node) || doc.has_class(node, &self.config.visible_class) {
                return false;
            }
            doc.add_class(node, &self.config.trigger_class);
            true
        });
        if eligible {
            let mut observed = self.observed();
            if !observed.contains(&node) {
                observed.push(node);
            }
        }
        eligible
    }

    pub fn remove_element(&self, node: NodeId) {
        self.observed().retain(|n| *n != node);
    }

    pub fn is_observed(&self, node: NodeId) -> bool {
        self.observed().contains(&node)
    }

    /// Reveal `nodes` one after another, `delay` apart, on a background
    /// task. Without a runtime they are revealed at once.
    pub fn stagger(&self, nodes: Vec<NodeId>, delay: Duration) -> Option<JoinHandle<()>> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            let revealed: Vec<NodeId> = self.dom.write(|doc| {
                nodes
                    .into_iter()
                    .filter(|n| animate(doc, *n, &self.config))
                    .collect()
            });
            self.announce(&revealed);
            return None;
        };

        let dom = self.dom.clone();
        let config = self.config.clone();
        let events = self.events.clone();
        Some(handle.spawn(async move {
            for (index, node) in nodes.into_iter().enumerate() {
                if index > 0 {
                    tokio::time::sleep(delay).await;
                }
                let id = dom.write(|doc| {
                    animate(doc, node, &config).then(|| element_id(doc, node))
                });
                if let Some(id) = id {
                    events.emit(AppEvent::ElementRevealed { id });
                }
            }
        }))
    }
}
