//! Markup produced by the controllers.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Every interpolation is escaped, which is what lets the catalog embed a
//! JSON payload in an attribute without any manual quoting: the document
//! parser decodes the entities again when the markup is injected.

use crate::catalog::{Badge, ProductCard};
use crate::notify::NoticeKind;
use maud::{Markup, html};

/// Attribute naming the page a retry control reloads.
pub const RETRY_ATTR: &str = "data-retry";
/// Attribute naming the catalog grid a retry control re-renders.
pub const CATALOG_RETRY_ATTR: &str = "data-catalog-retry";

/// Shown in the page container while a page fragment is in flight.
pub fn loading_placeholder() -> Markup {
    html! {
        div.page-loading role="status" aria-live="polite" {
            div.spinner {}
            p { "Carregando..." }
        }
    }
}

/// Shown in the page container when a page fragment cannot be fetched.
pub fn error_panel(page_id: &str) -> Markup {
    html! {
        div.page-error role="alert" {
            h2 { "Erro ao carregar página" }
            p {
                "Não foi possível carregar o conteúdo. "
                "Verifique sua conexão e tente novamente."
            }
            button id="retry-load" type="button" data-retry=(page_id) { "Tentar novamente" }
        }
    }
}

fn badge(badge: &Badge) -> Markup {
    match badge {
        Badge::New => html! { span.badge.badge-new { "NOVO" } },
        Badge::Discount(pct) => html! { span.badge.badge-discount { "-" (pct) "%" } },
    }
}

/// One catalog card. The "view details" control carries the modal payload.
pub fn product_card(card: &ProductCard) -> Markup {
    html! {
        div.product-card.scroll-animate
            data-category=(card.category)
            data-product-id=(card.id)
            data-animation-delay=(card.delay_ms)
        {
            div.product-image {
                img src=(card.image) alt=(card.name) loading="lazy";
                @if let Some(b) = &card.badge {
                    (badge(b))
                }
            }
            div.product-info {
                h3.product-name { (card.name) }
                @if !card.category.is_empty() {
                    p.product-category { (card.category) }
                }
                div.product-price {
                    span.price-current { (card.price) }
                    @if let Some(original) = &card.original_price {
                        span.price-original { (original) }
                    }
                }
                div.product-actions {
                    button.btn-view-product type="button" data-product=(card.payload_json) {
                        "Ver Detalhes"
                    }
                    button.btn-add-to-cart type="button" data-action="add-to-cart" {
                        "Adicionar"
                    }
                }
            }
        }
    }
}

pub fn product_cards(cards: &[ProductCard]) -> Markup {
    html! {
        @for card in cards {
            (product_card(card))
        }
    }
}

/// Replaces the countdown once the offer is over.
pub fn countdown_expired() -> Markup {
    html! {
        div.countdown-expired {
            p.countdown-expired-title { "Oferta Encerrada!" }
            p { "Fique atento às próximas promoções." }
        }
    }
}

/// Icon shown inside the mobile menu toggle.
pub fn menu_icon(open: bool) -> Markup {
    let name = if open { "x" } else { "menu" };
    html! {
        i data-lucide=(name) class="w-6 h-6" {}
    }
}

pub fn toast(message: &str, kind: NoticeKind) -> Markup {
    html! {
        div class={ "toast " (kind.class()) } role="alert" data-kind=(kind.as_str()) {
            (message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn error_panel_names_the_page_to_retry() {
        let doc = Document::from_shell(&error_panel("sobre").into_string());
        let retry = doc.by_id("retry-load").unwrap();
        assert_eq!(doc.attr(retry, RETRY_ATTR), Some("sobre"));
    }

    #[test]
    fn loading_placeholder_is_a_status() {
        let html = loading_placeholder().into_string();
        assert!(html.contains("role=\"status\""));
        assert!(html.contains("Carregando"));
    }

    #[test]
    fn menu_icon_switches_glyph() {
        assert!(menu_icon(true).into_string().contains("data-lucide=\"x\""));
        assert!(menu_icon(false).into_string().contains("data-lucide=\"menu\""));
    }

    #[test]
    fn toast_escapes_message() {
        let html = toast("<b>oi</b>", NoticeKind::Error).into_string();
        assert!(html.contains("&lt;b&gt;oi&lt;/b&gt;"));
        assert!(html.contains("bg-red-500"));
    }

    #[test]
    fn expired_panel_text() {
        let doc = Document::from_shell(&countdown_expired().into_string());
        assert!(doc.text_content(doc.body()).contains("Oferta Encerrada!"));
    }
}
