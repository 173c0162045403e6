//! Product detail modal and cart counter.
//!
//! The modal lives in the shell (`#product-modal`, injected at boot). It is
//! filled from the [`ModalPayload`] a "view details" control carries, so
//! opening it never needs the feed again.

use crate::catalog::{CARD_CLASS, format_price};
use crate::config::CurrencyConfig;
use crate::dom::{Document, Dom, NodeId};
use crate::events::{AppEvent, Events};
use crate::notify::{NoticeKind, Notifier};
use crate::types::{ModalPayload, PayloadError};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error};

pub const MODAL_ID: &str = "product-modal";
pub const CLOSE_ID: &str = "close-modal";
pub const DECREASE_ID: &str = "decrease-qty";
pub const INCREASE_ID: &str = "increase-qty";
pub const ADD_TO_CART_ID: &str = "add-to-cart-modal";
pub const VIEW_BUTTON_CLASS: &str = "btn-view-product";
pub const PAYLOAD_ATTR: &str = "data-product";
const QUANTITY_ID: &str = "product-quantity";
const CART_CLASS: &str = "shopping-cart";
const HIDDEN_CLASS: &str = "hidden";
const FADED_CLASS: &str = "opacity-0";
const NO_DESCRIPTION: &str = "Descrição não disponível.";

/// Add `quantity` to the header cart counter. Returns the new count, or
/// `None` when the page has no counter.
pub fn bump_cart(doc: &mut Document, quantity: u32) -> Option<u32> {
    let cart = doc.by_class(CART_CLASS).into_iter().next()?;
    let counter = doc.by_tag_in(cart, "span").into_iter().next()?;
    let current: u32 = doc.text_content(counter).trim().parse().unwrap_or(0);
    let count = current.saturating_add(quantity);
    doc.set_text(counter, &count.to_string());
    Some(count)
}

#[derive(Debug)]
struct ModalState {
    current: Option<ModalPayload>,
    quantity: u32,
}

#[derive(Debug)]
pub struct ProductModal {
    dom: Dom,
    currency: CurrencyConfig,
    notifier: Notifier,
    events: Events,
    state: Mutex<ModalState>,
}

impl ProductModal {
    pub fn new(dom: Dom, currency: CurrencyConfig, notifier: Notifier, events: Events) -> Self {
        Self {
            dom,
            currency,
            notifier,
            events,
            state: Mutex::new(ModalState {
                current: None,
                quantity: 1,
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ModalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True when the modal markup is in the document.
    pub fn is_bound(&self) -> bool {
        self.dom.read(|doc| doc.by_id(MODAL_ID).is_some())
    }

    pub fn is_open(&self) -> bool {
        self.state().current.is_some()
    }

    pub fn quantity(&self) -> u32 {
        self.state().quantity
    }

    pub fn current(&self) -> Option<ModalPayload> {
        self.state().current.clone()
    }

    /// Parse a `data-product` value and open the modal with it. A payload
    /// that does not parse is logged and the modal stays closed.
    pub fn open_from_attr(&self, raw: &str) -> Result<(), PayloadError> {
        match ModalPayload::parse(raw) {
            Ok(payload) => {
                self.open(payload);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "could not read product data");
                Err(e)
            }
        }
    }

    /// Delegated click on a "view details" control.
    pub fn click_view_details(&self, target: NodeId) -> bool {
        let raw = self.dom.read(|doc| {
            let button = doc.closest_with_class(target, VIEW_BUTTON_CLASS)?;
            doc.attr(button, PAYLOAD_ATTR).map(str::to_string)
        });
        match raw {
            Some(raw) => self.open_from_attr(&raw).is_ok(),
            None => false,
        }
    }

    pub fn open(&self, payload: ModalPayload) -> bool {
        let price = format_price(payload.price, &self.currency);
        let old_price = payload
            .original_price
            .map(|p| format_price(p, &self.currency));
        let opened = self.dom.write(|doc| {
            let Some(modal) = doc.by_id(MODAL_ID) else {
                return false;
            };
            if let Some(image) = doc.by_id("modal-product-image") {
                doc.set_attr(image, "src", &payload.image);
                doc.set_attr(image, "alt", &payload.name);
            }
            if let Some(name) = doc.by_id("modal-product-name") {
                doc.set_text(name, &payload.name);
            }
            if let Some(node) = doc.by_id("modal-product-price") {
                doc.set_text(node, &price);
            }
            if let Some(node) = doc.by_id("modal-product-old-price") {
                match &old_price {
                    Some(old) => {
                        doc.set_text(node, old);
                        doc.remove_class(node, HIDDEN_CLASS);
                    }
                    None => doc.add_class(node, HIDDEN_CLASS),
                }
            }
            if let Some(node) = doc.by_id("modal-product-discount") {
                match payload.discount {
                    Some(pct) => {
                        doc.set_text(node, &format!("-{pct}%"));
                        doc.remove_class(node, HIDDEN_CLASS);
                    }
                    None => doc.add_class(node, HIDDEN_CLASS),
                }
            }
            if let Some(node) = doc.by_id("modal-product-description") {
                let text = if payload.description.trim().is_empty() {
                    NO_DESCRIPTION
                } else {
                    payload.description.as_str()
                };
                doc.set_text(node, text);
            }
            if let Some(node) = doc.by_id(QUANTITY_ID) {
                doc.set_text(node, "1");
            }
            doc.remove_class(modal, HIDDEN_CLASS);
            doc.remove_class(modal, FADED_CLASS);
            let body = doc.body();
            doc.set_style(body, "overflow", "hidden");
            true
        });
        if !opened {
            debug!("product modal is not in the document");
            return false;
        }

        let product = payload.name.clone();
        {
            let mut state = self.state();
            state.current = Some(payload);
            state.quantity = 1;
        }
        self.events.emit(AppEvent::ModalOpened { product });
        true
    }

    pub fn close(&self) {
        let was_open = {
            let mut state = self.state();
            state.quantity = 1;
            state.current.take().is_some()
        };
        self.dom.write(|doc| {
            if let Some(modal) = doc.by_id(MODAL_ID) {
                doc.add_class(modal, FADED_CLASS);
                doc.add_class(modal, HIDDEN_CLASS);
            }
            if let Some(node) = doc.by_id(QUANTITY_ID) {
                doc.set_text(node, "1");
            }
            let body = doc.body();
            doc.set_style(body, "overflow", "");
        });
        if was_open {
            self.events.emit(AppEvent::ModalClosed);
        }
    }

    fn set_quantity(&self, quantity: u32) -> u32 {
        self.state().quantity = quantity;
        self.dom.write(|doc| {
            if let Some(node) = doc.by_id(QUANTITY_ID) {
                doc.set_text(node, &quantity.to_string());
            }
        });
        quantity
    }

    pub fn increase(&self) -> u32 {
        let next = self.quantity().saturating_add(1);
        self.set_quantity(next)
    }

    /// Never goes below one.
    pub fn decrease(&self) -> u32 {
        let next = self.quantity().saturating_sub(1).max(1);
        self.set_quantity(next)
    }

    /// Add the open product to the cart with the chosen quantity, then
    /// close. Returns the new cart count.
    pub fn add_to_cart(&self) -> Option<u32> {
        let (name, quantity) = {
            let state = self.state();
            (state.current.as_ref()?.name.clone(), state.quantity)
        };
        let count = self.dom.write(|doc| bump_cart(doc, quantity));
        if let Some(count) = count {
            self.events.emit(AppEvent::CartUpdated { count });
        }
        self.notifier.show(
            &format!("{quantity}x {name} adicionado ao carrinho!"),
            NoticeKind::Success,
        );
        self.close();
        count
    }

    /// The quick "add" control on a card adds one unit.
    pub fn add_card_to_cart(&self, target: NodeId) -> Option<u32> {
        let (name, count) = self.dom.write(|doc| {
            let card = doc.closest_with_class(target, CARD_CLASS)?;
            let title = doc.by_tag_in(card, "h3").into_iter().next()?;
            let name = doc.text_content(title);
            Some((name, bump_cart(doc, 1)))
        })?;
        if let Some(count) = count {
            self.events.emit(AppEvent::CartUpdated { count });
        }
        self.notifier
            .show(&format!("{name} adicionado ao carrinho!"), NoticeKind::Success);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MODAL_MARKUP;
    use crate::types::ProductId;
    use std::time::Duration;

    fn modal() -> (ProductModal, Dom) {
        let shell = format!(
            r#"<div class="shopping-cart"><span>0</span></div>{MODAL_MARKUP}"#
        );
        let dom = Dom::from_shell(&shell);
        let notifier = Notifier::new(dom.clone(), Duration::from_secs(3), Events::disabled());
        (
            ProductModal::new(dom.clone(), CurrencyConfig::default(), notifier, Events::disabled()),
            dom,
        )
    }

    fn payload() -> ModalPayload {
        ModalPayload {
            id: ProductId::Number(1),
            name: "Relógio \"Clássico\"".to_string(),
            price: 19990,
            original_price: Some(24990),
            discount: Some(20),
            image: "r.jpg".to_string(),
            images: vec!["r.jpg".to_string()],
            description: String::new(),
            stock: 2,
            category: "relogios".to_string(),
            tags: vec![],
        }
    }

    fn text(dom: &Dom, id: &str) -> String {
        dom.read(|doc| doc.text_content(doc.by_id(id).unwrap()))
    }

    #[test]
    fn open_fills_fields_and_locks_scroll() {
        let (modal, dom) = modal();
        assert!(modal.open(payload()));
        assert_eq!(text(&dom, "modal-product-name"), "Relógio \"Clássico\"");
        assert_eq!(text(&dom, "modal-product-price"), "R$\u{a0}199,90");
        assert_eq!(text(&dom, "modal-product-old-price"), "R$\u{a0}249,90");
        assert_eq!(text(&dom, "modal-product-discount"), "-20%");
        assert_eq!(text(&dom, "modal-product-description"), NO_DESCRIPTION);
        dom.read(|doc| {
            let m = doc.by_id(MODAL_ID).unwrap();
            assert!(!doc.has_class(m, "hidden"));
            assert_eq!(doc.style(doc.body(), "overflow"), Some("hidden"));
        });
    }

    #[test]
    fn malformed_attribute_does_not_open() {
        let (modal, _dom) = modal();
        assert!(modal.open_from_attr("{not json").is_err());
        assert!(!modal.is_open());
    }

    #[test]
    fn quantity_never_drops_below_one() {
        let (modal, dom) = modal();
        modal.open(payload());
        assert_eq!(modal.decrease(), 1);
        assert_eq!(modal.increase(), 2);
        assert_eq!(modal.increase(), 3);
        assert_eq!(modal.decrease(), 2);
        assert_eq!(text(&dom, "product-quantity"), "2");
    }

    #[tokio::test]
    async fn add_to_cart_counts_quantity_and_closes() {
        let (modal, dom) = modal();
        modal.open(payload());
        modal.increase();
        assert_eq!(modal.add_to_cart(), Some(2));
        assert!(!modal.is_open());
        assert_eq!(modal.quantity(), 1);
        assert!(modal.notifier.visible()[0].starts_with("2x Relógio"));
        dom.read(|doc| {
            assert!(doc.has_class(doc.by_id(MODAL_ID).unwrap(), "hidden"));
            assert_eq!(doc.style(doc.body(), "overflow"), None);
        });
    }

    #[test]
    fn add_to_cart_without_open_product_does_nothing() {
        let (modal, _dom) = modal();
        assert_eq!(modal.add_to_cart(), None);
    }

    #[test]
    fn cart_counter_stops_at_its_ceiling() {
        let mut doc = Document::from_shell(&format!(
            r#"<div class="shopping-cart"><span>{}</span></div>"#,
            u32::MAX - 1
        ));
        assert_eq!(bump_cart(&mut doc, 5), Some(u32::MAX));
        assert_eq!(bump_cart(&mut doc, 1), Some(u32::MAX));
    }

    #[test]
    fn unreadable_counter_starts_from_zero() {
        let mut doc = Document::from_shell(r#"<div class="shopping-cart"><span>n/a</span></div>"#);
        assert_eq!(bump_cart(&mut doc, 2), Some(2));
    }
}
