//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Output leads with what a visitor would recognise (page, product name,
//! price) and puts paths and identifiers on indented context lines below.
//!
//! # Output Format
//!
//! ## Navigate
//!
//! ```text
//! Page produtos (#produtos): loaded
//!     Heading: Produtos
//!     Active nav: Produtos
//!     Cards: 2 of 5 shown
//!     Cart: 0
//! ```
//!
//! ## Catalog
//!
//! ```text
//! 001 Relógio Clássico  R$ 199,90 (was R$ 249,90) [new]
//!     Category: relogios
//!     Image: assets/images/relogio-classico.jpg
//!
//! 5 products
//! ```
//!
//! ## Check
//!
//! ```text
//! Pages
//!     ok    pages/home.html
//!     FAIL  pages/sobre.html (HTTP 404)
//! Product feed
//!     ok    data/products.json (5 products)
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::app::{AssetRole, PageSummary, SiteCheck};
use crate::catalog::{Badge, ProductCard};
use crate::events::AppEvent;
use crate::router::PageLoad;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn badge_label(badge: Badge) -> String {
    match badge {
        Badge::New => "new".to_string(),
        Badge::Discount(pct) => format!("-{pct}%"),
    }
}

fn page_status(load: &PageLoad) -> (&str, &'static str) {
    match load {
        PageLoad::Loaded { page } => (page, "loaded"),
        PageLoad::Failed { page } => (page, "failed"),
        PageLoad::Superseded { page } => (page, "superseded"),
        PageLoad::NoContainer => ("?", "no content container"),
    }
}

// ============================================================================
// Navigate output
// ============================================================================

/// Format the result of a navigation and what the page now shows.
pub fn format_page_summary(load: &PageLoad, summary: &PageSummary) -> Vec<String> {
    let (requested, status) = page_status(load);
    let mut lines = vec![format!("Page {requested} (#{}): {status}", summary.hash)];
    if summary.page.as_deref() != Some(requested) {
        let showing = summary.page.as_deref().unwrap_or("nothing");
        lines.push(format!("{}Showing: {showing}", indent(1)));
    }
    if let Some(heading) = &summary.heading {
        lines.push(format!("{}Heading: {heading}", indent(1)));
    }
    if !summary.active_nav.is_empty() {
        lines.push(format!(
            "{}Active nav: {}",
            indent(1),
            summary.active_nav.join(", ")
        ));
    }
    if summary.cards_total > 0 {
        lines.push(format!(
            "{}Cards: {} of {} shown",
            indent(1),
            summary.cards_displayed,
            summary.cards_total
        ));
    }
    if let Some(count) = summary.cart_count {
        lines.push(format!("{}Cart: {count}", indent(1)));
    }
    if let Some(countdown) = &summary.countdown {
        lines.push(format!("{}Offer ends in: {countdown}", indent(1)));
    }
    for toast in &summary.toasts {
        lines.push(format!("{}Toast: {toast}", indent(1)));
    }
    lines
}

pub fn print_page_summary(load: &PageLoad, summary: &PageSummary) {
    for line in format_page_summary(load, summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Catalog output
// ============================================================================

/// Format one entry per card, then a total.
pub fn format_cards(cards: &[ProductCard]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, card) in cards.iter().enumerate() {
        let mut header = format!("{} {}  {}", format_index(i + 1), card.name, card.price);
        if let Some(original) = &card.original_price {
            header.push_str(&format!(" (was {original})"));
        }
        if let Some(badge) = card.badge {
            header.push_str(&format!(" [{}]", badge_label(badge)));
        }
        lines.push(header);
        if !card.category.is_empty() {
            lines.push(format!("{}Category: {}", indent(1), card.category));
        }
        lines.push(format!("{}Image: {}", indent(1), card.image));
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    let noun = if cards.len() == 1 { "product" } else { "products" };
    lines.push(format!("{} {noun}", cards.len()));
    lines
}

pub fn print_cards(cards: &[ProductCard]) {
    for line in format_cards(cards) {
        println!("{}", line);
    }
}

// ============================================================================
// Check output
// ============================================================================

/// Format a site check grouped by asset role.
pub fn format_site_check(check: &SiteCheck) -> Vec<String> {
    let mut lines = Vec::new();
    let groups = [
        (AssetRole::Page, "Pages"),
        (AssetRole::ShellComponent, "Shell components"),
        (AssetRole::HomeSection, "Home sections"),
        (AssetRole::Feed, "Product feed"),
    ];
    for (role, title) in groups {
        let assets: Vec<_> = check.assets.iter().filter(|a| a.role == role).collect();
        if assets.is_empty() {
            continue;
        }
        lines.push(title.to_string());
        for asset in assets {
            let line = match (&asset.problem, role) {
                (Some(problem), _) => format!("FAIL  {} ({problem})", asset.path),
                (None, AssetRole::Feed) => {
                    format!("ok    {} ({} products)", asset.path, check.products)
                }
                (None, _) => format!("ok    {}", asset.path),
            };
            lines.push(format!("{}{line}", indent(1)));
        }
    }
    if !check.without_image.is_empty() {
        lines.push("Using placeholder image".to_string());
        for name in &check.without_image {
            lines.push(format!("{}{name}", indent(1)));
        }
    }
    lines
}

pub fn print_site_check(check: &SiteCheck) {
    for line in format_site_check(check) {
        println!("{}", line);
    }
}

// ============================================================================
// Event stream
// ============================================================================

/// One line per event, for `--verbose` runs.
pub fn format_event(event: &AppEvent) -> String {
    match event {
        AppEvent::PageLoaded { page } => format!("page loaded: {page}"),
        AppEvent::PageFailed { page, reason } => format!("page failed: {page} ({reason})"),
        AppEvent::NavigationSuperseded { page } => format!("navigation superseded: {page}"),
        AppEvent::CatalogRendered { grid, count } => {
            format!("catalog rendered: {} ({count} cards)", grid.as_str())
        }
        AppEvent::FilterApplied { category, shown } => {
            format!("filter applied: {category} ({shown} shown)")
        }
        AppEvent::ElementRevealed { id } => {
            format!("revealed: {}", id.as_deref().unwrap_or("(anonymous)"))
        }
        AppEvent::CountdownExpired => "countdown expired".to_string(),
        AppEvent::MenuToggled { open } => {
            format!("menu {}", if *open { "opened" } else { "closed" })
        }
        AppEvent::ModalOpened { product } => format!("modal opened: {product}"),
        AppEvent::ModalClosed => "modal closed".to_string(),
        AppEvent::CartUpdated { count } => format!("cart: {count}"),
        AppEvent::Notification { message, kind } => {
            format!("toast [{}]: {message}", kind.as_str())
        }
    }
}
