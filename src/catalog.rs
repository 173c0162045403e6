//! Product catalog rendering.
//!
//! Fetches the JSON feed, turns each [`Product`] into a [`ProductCard`] and
//! renders the cards into one of two grids: the featured grid on the home
//! page and the full grid on the products page. Category filtering works on
//! the rendered cards, fading mismatches out before removing them from
//! layout.
//!
//! ## Grid hooks
//!
//! Each grid is three elements looked up by id: the grid itself, a loading
//! indicator and an error panel. A page without the grid is simply not a
//! catalog page; rendering is a no-op there.
//!
//! ## Stale results
//!
//! The grid node is resolved before the feed request and written after it.
//! If the router swapped the page in between, that node no longer exists
//! and the result is dropped.

use crate::assets::{AssetSource, FragmentLoader, LoadError};
use crate::config::{CurrencyConfig, SiteConfig};
use crate::dom::{Document, Dom, NodeId};
use crate::events::{AppEvent, Events};
use crate::types::{ModalPayload, Product};
use crate::views;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, error, info};

/// Attribute carrying a filter control's category.
pub const FILTER_ATTR: &str = "data-filter";
/// Category value that matches every card.
pub const FILTER_ALL: &str = "all";
pub const CARD_CLASS: &str = "product-card";
const ACTIVE_FILTER_CLASS: &str = "active";
const HIDDEN_CLASS: &str = "hidden";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("product feed is not valid JSON: {0}")]
    Feed(#[from] serde_json::Error),
}

/// The feed is either a bare list or an object wrapping one.
#[derive(Deserialize)]
#[serde(untagged)]
enum Feed {
    List(Vec<Product>),
    Wrapped { products: Vec<Product> },
}

/// Parse feed text into products, in feed order.
pub fn parse_feed(text: &str) -> Result<Vec<Product>, serde_json::Error> {
    Ok(match serde_json::from_str(text)? {
        Feed::List(products) | Feed::Wrapped { products } => products,
    })
}

// ============================================================================
// Formatting
// ============================================================================

/// Format a minor-unit amount, e.g. 19990 → `R$ 199,90` (with a no-break
/// space after the symbol).
pub fn format_price(minor: u64, currency: &CurrencyConfig) -> String {
    let units = (minor / 100).to_string();
    let cents = minor % 100;

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push_str(&currency.thousands_separator);
        }
        grouped.push(digit);
    }

    format!(
        "{}\u{a0}{grouped}{}{cents:02}",
        currency.symbol, currency.decimal_separator
    )
}

/// Corner badge of a card. "New" wins over a discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    New,
    Discount(u32),
}

impl Badge {
    pub fn for_product(product: &Product) -> Option<Self> {
        if product.is_new {
            Some(Self::New)
        } else {
            product.discount.filter(|d| *d > 0).map(Self::Discount)
        }
    }
}

/// Everything a card shows, already formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCard {
    pub id: String,
    pub name: String,
    pub category: String,
    pub image: String,
    pub price: String,
    pub original_price: Option<String>,
    pub badge: Option<Badge>,
    /// Reveal delay, staggered by position in the grid.
    pub delay_ms: u64,
    pub payload: ModalPayload,
    /// `payload` serialized for the `data-product` attribute.
    pub payload_json: String,
}

impl ProductCard {
    pub fn new(
        product: &Product,
        index: usize,
        config: &SiteConfig,
    ) -> Result<Self, serde_json::Error> {
        let payload = ModalPayload::from_product(product, &config.site.placeholder_image);
        let payload_json = serde_json::to_string(&payload)?;
        Ok(Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            category: product.category.clone(),
            image: payload.image.clone(),
            price: format_price(product.price, &config.currency),
            original_price: product
                .original_price
                .map(|p| format_price(p, &config.currency)),
            badge: Badge::for_product(product),
            delay_ms: index as u64 * config.reveal.stagger_ms,
            payload,
            payload_json,
        })
    }
}

/// Build cards for `products`, staggering delays by position.
pub fn build_cards(
    products: &[&Product],
    config: &SiteConfig,
) -> Result<Vec<ProductCard>, serde_json::Error> {
    products
        .iter()
        .enumerate()
        .map(|(i, p)| ProductCard::new(p, i, config))
        .collect()
}

// ============================================================================
// Grids
// ============================================================================

/// The two catalog grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grid {
    /// Featured products on the home page.
    Featured,
    /// Every product on the products page.
    All,
}

impl Grid {
    pub fn grid_id(self) -> &'static str {
        match self {
            Self::Featured => "featured-products",
            Self::All => "products-grid",
        }
    }

    pub fn loading_id(self) -> &'static str {
        match self {
            Self::Featured => "featured-loading",
            Self::All => "products-loading",
        }
    }

    pub fn error_id(self) -> &'static str {
        match self {
            Self::Featured => "featured-error",
            Self::All => "products-error",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::All => "all",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "featured" => Some(Self::Featured),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GridState {
    Loading,
    Error,
    Content,
}

fn show_state(doc: &mut Document, grid: Grid, state: GridState) {
    let pairs = [
        (grid.loading_id(), state == GridState::Loading),
        (grid.error_id(), state == GridState::Error),
        (grid.grid_id(), state == GridState::Content),
    ];
    for (id, visible) in pairs {
        if let Some(node) = doc.by_id(id) {
            doc.toggle_class(node, HIDDEN_CLASS, !visible);
        }
    }
}

/// Result of rendering a grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// `count` cards were rendered.
    Rendered { count: usize },
    /// The current page has no such grid.
    NoGrid,
    /// The feed could not be loaded; the error panel is showing.
    Failed,
    /// The page changed while the feed was in flight.
    Stale,
}

/// Result of a category filter pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// The pass finished; `shown` cards match the category.
    Applied { shown: usize, hidden: usize },
    /// A newer filter started before the fade finished.
    Superseded,
}

/// Renders the catalog grids and applies category filters.
#[derive(Debug)]
pub struct Catalog<S> {
    loader: FragmentLoader<S>,
    dom: Dom,
    config: Arc<SiteConfig>,
    events: Events,
    filter_generation: AtomicU64,
}

impl<S: AssetSource> Catalog<S> {
    pub fn new(
        loader: FragmentLoader<S>,
        dom: Dom,
        config: Arc<SiteConfig>,
        events: Events,
    ) -> Self {
        Self {
            loader,
            dom,
            config,
            events,
            filter_generation: AtomicU64::new(0),
        }
    }

    /// Fetch and parse the feed without touching the document.
    pub async fn fetch_products(&self) -> Result<Vec<Product>, CatalogError> {
        let text = self.loader.fetch_text(&self.config.site.products_feed).await?;
        let products = parse_feed(&text)?;
        debug!(count = products.len(), "product feed loaded");
        Ok(products)
    }

    /// Fetch the feed for the grid at `node`. On failure the error panel is
    /// shown, unless the grid was swapped away while the feed was in flight.
    async fn load_products(&self, grid: Grid, node: NodeId) -> Result<Vec<Product>, RenderOutcome> {
        match self.fetch_products().await {
            Ok(products) => Ok(products),
            Err(e) => {
                error!(grid = grid.as_str(), error = %e, "failed to load products");
                if self.dom.read(|doc| doc.exists(node)) {
                    self.dom.write(|doc| show_state(doc, grid, GridState::Error));
                    Err(RenderOutcome::Failed)
                } else {
                    Err(RenderOutcome::Stale)
                }
            }
        }
    }

    /// Render products flagged as featured into the home grid.
    pub async fn render_featured(&self) -> RenderOutcome {
        self.render(Grid::Featured).await
    }

    /// Render every product into the products grid.
    pub async fn render_all(&self) -> RenderOutcome {
        self.render(Grid::All).await
    }

    pub async fn render(&self, grid: Grid) -> RenderOutcome {
        let Some(node) = self.dom.write(|doc| {
            let node = doc.by_id(grid.grid_id())?;
            show_state(doc, grid, GridState::Loading);
            Some(node)
        }) else {
            debug!(grid = grid.as_str(), "no grid on this page");
            return RenderOutcome::NoGrid;
        };

        let products = match self.load_products(grid, node).await {
            Ok(products) => products,
            Err(outcome) => return outcome,
        };

        let selected: Vec<&Product> = match grid {
            Grid::Featured => products.iter().filter(|p| p.featured).collect(),
            Grid::All => products.iter().collect(),
        };
        let cards = match build_cards(&selected, &self.config) {
            Ok(cards) => cards,
            Err(e) => {
                error!(grid = grid.as_str(), error = %e, "failed to encode product payload");
                self.dom.write(|doc| show_state(doc, grid, GridState::Error));
                return RenderOutcome::Failed;
            }
        };
        let markup = views::product_cards(&cards).into_string();

        let written = self.dom.write(|doc| {
            if !doc.set_inner_html(node, &markup) {
                return false;
            }
            show_state(doc, grid, GridState::Content);
            true
        });
        if !written {
            debug!(grid = grid.as_str(), "page changed while the feed was in flight");
            return RenderOutcome::Stale;
        }

        info!(grid = grid.as_str(), count = cards.len(), "catalog rendered");
        self.events.emit(AppEvent::CatalogRendered {
            grid,
            count: cards.len(),
        });
        RenderOutcome::Rendered { count: cards.len() }
    }

    /// Mark the "all" filter control active. Returns the number of filter
    /// controls found.
    pub fn wire_filters(&self) -> usize {
        self.dom.write(|doc| {
            let controls = doc.with_attr(FILTER_ATTR);
            for control in &controls {
                let is_all = doc.attr(*control, FILTER_ATTR) == Some(FILTER_ALL);
                doc.toggle_class(*control, ACTIVE_FILTER_CLASS, is_all);
            }
            controls.len()
        })
    }

    /// Show only cards of `category` (`"all"` shows everything).
    ///
    /// Matching cards are shown at once; mismatches fade out and leave
    /// layout after the transition. A newer call supersedes an older one
    /// still waiting on its fade.
    pub async fn apply_filter(&self, category: &str) -> FilterOutcome {
        let generation = self.filter_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let hiding: Vec<NodeId> = self.dom.write(|doc| {
            for control in doc.with_attr(FILTER_ATTR) {
                let active = doc.attr(control, FILTER_ATTR) == Some(category);
                doc.toggle_class(control, ACTIVE_FILTER_CLASS, active);
            }

            let mut hiding = Vec::new();
            for card in doc.by_class(CARD_CLASS) {
                let matches = category == FILTER_ALL
                    || doc.attr(card, "data-category") == Some(category);
                if matches {
                    doc.set_style(card, "display", "");
                    doc.set_style(card, "opacity", "1");
                    doc.set_style(card, "transform", "scale(1)");
                } else {
                    doc.set_style(card, "opacity", "0");
                    doc.set_style(card, "transform", "scale(0.8)");
                    hiding.push(card);
                }
            }
            hiding
        });

        tokio::time::sleep(self.config.timing.filter_transition()).await;

        if self.filter_generation.load(Ordering::SeqCst) != generation {
            return FilterOutcome::Superseded;
        }

        let (shown, hidden) = self.dom.write(|doc| {
            for card in &hiding {
                doc.set_style(*card, "display", "none");
            }
            let total = doc.by_class(CARD_CLASS).len();
            (total.saturating_sub(hiding.len()), hiding.len())
        });
        info!(category, shown, "filter applied");
        self.events.emit(AppEvent::FilterApplied {
            category: category.to_string(),
            shown,
        });
        FilterOutcome::Applied { shown, hidden }
    }

    /// Cards currently taking part in layout.
    pub fn displayed_cards(&self) -> usize {
        self.dom.read(|doc| {
            doc.by_class(CARD_CLASS)
                .into_iter()
                .filter(|card| doc.style(*card, "display") != Some("none"))
                .count()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemorySource;
    use crate::test_helpers::{FEED, catalog_for};

    #[test]
    fn price_formatting() {
        let currency = CurrencyConfig::default();
        assert_eq!(format_price(19990, &currency), "R$\u{a0}199,90");
        assert_eq!(format_price(5, &currency), "R$\u{a0}0,05");
        assert_eq!(format_price(123456789, &currency), "R$\u{a0}1.234.567,89");
        assert_eq!(format_price(100000, &currency), "R$\u{a0}1.000,00");
    }

    #[test]
    fn feed_accepts_list_or_wrapper() {
        assert_eq!(parse_feed(FEED).unwrap().len(), 5);
        let wrapped = format!("{{\"products\": {FEED}}}");
        assert_eq!(parse_feed(&wrapped).unwrap().len(), 5);
        assert!(parse_feed("{\"items\": []}").is_err());
    }

    #[test]
    fn badge_prefers_new_over_discount() {
        let products = parse_feed(FEED).unwrap();
        let new_and_discounted = products.iter().find(|p| p.is_new && p.has_discount()).unwrap();
        assert_eq!(Badge::for_product(new_and_discounted), Some(Badge::New));
        let discounted = products.iter().find(|p| !p.is_new && p.has_discount()).unwrap();
        assert!(matches!(Badge::for_product(discounted), Some(Badge::Discount(_))));
    }

    #[test]
    fn cards_stagger_delays() {
        let products = parse_feed(FEED).unwrap();
        let refs: Vec<&Product> = products.iter().collect();
        let cards = build_cards(&refs, &SiteConfig::default()).unwrap();
        let delays: Vec<u64> = cards.iter().map(|c| c.delay_ms).collect();
        assert_eq!(delays, vec![0, 100, 200, 300, 400]);
    }

    #[test]
    fn card_without_image_uses_placeholder() {
        let products = parse_feed(r#"[{"id": 1, "name": "Sem foto", "price": 100}]"#).unwrap();
        let config = SiteConfig::default();
        let card = ProductCard::new(&products[0], 0, &config).unwrap();
        assert_eq!(card.image, config.site.placeholder_image);
        assert_eq!(card.payload.images, vec![config.site.placeholder_image.clone()]);
    }

    #[tokio::test]
    async fn render_all_fills_grid() {
        let (catalog, dom) = catalog_for(MemorySource::new().with("data/products.json", FEED));
        assert_eq!(catalog.render_all().await, RenderOutcome::Rendered { count: 5 });
        dom.read(|doc| {
            assert_eq!(doc.by_class(CARD_CLASS).len(), 5);
            let loading = doc.by_id("products-loading").unwrap();
            assert!(doc.has_class(loading, "hidden"));
        });
    }

    #[tokio::test]
    async fn render_featured_without_grid_is_a_no_op() {
        let (catalog, _dom) = catalog_for(MemorySource::new().with("data/products.json", FEED));
        assert_eq!(catalog.render_featured().await, RenderOutcome::NoGrid);
        assert!(catalog.loader.source().fetch_log().is_empty());
    }

    #[tokio::test]
    async fn feed_failure_shows_error_panel() {
        let source = MemorySource::new();
        source.set_status("data/products.json", 500);
        let (catalog, dom) = catalog_for(source);
        assert_eq!(catalog.render_all().await, RenderOutcome::Failed);
        dom.read(|doc| {
            let error = doc.by_id("products-error").unwrap();
            let grid = doc.by_id("products-grid").unwrap();
            assert!(!doc.has_class(error, "hidden"));
            assert!(doc.has_class(grid, "hidden"));
        });
    }

    #[tokio::test]
    async fn malformed_feed_is_a_failure() {
        let (catalog, _dom) = catalog_for(MemorySource::new().with("data/products.json", "[{"));
        assert_eq!(catalog.render_all().await, RenderOutcome::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn filter_hides_other_categories() {
        let (catalog, dom) = catalog_for(MemorySource::new().with("data/products.json", FEED));
        catalog.render_all().await;
        assert_eq!(catalog.wire_filters(), 3);

        let outcome = catalog.apply_filter("relogios").await;
        assert_eq!(outcome, FilterOutcome::Applied { shown: 2, hidden: 3 });
        assert_eq!(catalog.displayed_cards(), 2);
        dom.read(|doc| {
            let active: Vec<_> = doc
                .with_attr(FILTER_ATTR)
                .into_iter()
                .filter(|n| doc.has_class(*n, "active"))
                .collect();
            assert_eq!(active.len(), 1);
            assert_eq!(doc.attr(active[0], FILTER_ATTR), Some("relogios"));
        });

        catalog.apply_filter(FILTER_ALL).await;
        assert_eq!(catalog.displayed_cards(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_filter_supersedes_pending_fade() {
        let (catalog, _dom) = catalog_for(MemorySource::new().with("data/products.json", FEED));
        catalog.render_all().await;

        let (first, second) = tokio::join!(catalog.apply_filter("relogios"), async {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            catalog.apply_filter(FILTER_ALL).await
        });
        assert_eq!(first, FilterOutcome::Superseded);
        assert!(matches!(second, FilterOutcome::Applied { shown: 5, .. }));
        assert_eq!(catalog.displayed_cards(), 5);
    }
}
