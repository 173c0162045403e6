//! Shared test utilities for the lumio unit tests.
//!
//! Everything here is built from the storefront under `fixtures/site/`, so
//! unit tests and the integration suite in `tests/` exercise the same
//! markup and the same product feed.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let app = app_for(site_source());
//! app.boot().await;
//! assert_eq!(app.router().current_page().as_deref(), Some("home"));
//! ```

use std::sync::Arc;

use crate::app::{App, AppOptions};
use crate::assets::{FragmentLoader, MemorySource};
use crate::catalog::Catalog;
use crate::config::SiteConfig;
use crate::countdown::{Clock, ManualClock};
use crate::dom::Dom;
use crate::events::Events;

// =========================================================================
// Fixture files
// =========================================================================

/// The product feed: five products, two of them in `relogios`.
pub const FEED: &str = include_str!("../fixtures/site/data/products.json");

/// Markup of the product detail modal component.
pub const MODAL_MARKUP: &str = include_str!("../fixtures/site/components/product-modal.html");

pub const SHELL: &str = include_str!("../fixtures/site/index.html");

const SITE_FILES: &[(&str, &str)] = &[
    ("data/products.json", FEED),
    ("components/product-modal.html", MODAL_MARKUP),
    (
        "components/header.html",
        include_str!("../fixtures/site/components/header.html"),
    ),
    (
        "components/footer.html",
        include_str!("../fixtures/site/components/footer.html"),
    ),
    (
        "components/hero.html",
        include_str!("../fixtures/site/components/hero.html"),
    ),
    (
        "components/categories.html",
        include_str!("../fixtures/site/components/categories.html"),
    ),
    (
        "components/products.html",
        include_str!("../fixtures/site/components/products.html"),
    ),
    (
        "components/offers.html",
        include_str!("../fixtures/site/components/offers.html"),
    ),
    (
        "components/newsletter.html",
        include_str!("../fixtures/site/components/newsletter.html"),
    ),
    (
        "pages/home.html",
        include_str!("../fixtures/site/pages/home.html"),
    ),
    (
        "pages/produtos.html",
        include_str!("../fixtures/site/pages/produtos.html"),
    ),
    (
        "pages/sobre.html",
        include_str!("../fixtures/site/pages/sobre.html"),
    ),
    (
        "pages/contato.html",
        include_str!("../fixtures/site/pages/contato.html"),
    ),
];

/// An in-memory copy of the whole fixture site.
pub fn site_source() -> MemorySource {
    let source = MemorySource::new();
    for (path, body) in SITE_FILES {
        source.insert(path, *body);
    }
    source
}

// =========================================================================
// Component builders
// =========================================================================

/// A catalog over `source`, bound to a bare products page: the products
/// grid with its loading and error panels and three filter controls, but
/// no featured grid.
pub fn catalog_for(source: MemorySource) -> (Catalog<MemorySource>, Dom) {
    let dom = Dom::from_shell(
        r#"
        <div class="filters">
            <button data-filter="all">Todos</button>
            <button data-filter="relogios">Relógios</button>
            <button data-filter="perfumes">Perfumes</button>
        </div>
        <div id="products-loading">Carregando...</div>
        <div id="products-error" class="hidden"></div>
        <div id="products-grid" class="hidden"></div>
    "#,
    );
    let config = Arc::new(SiteConfig::default());
    let loader = FragmentLoader::new(Arc::new(source), dom.clone(), config.timing.fragment_pause());
    (
        Catalog::new(loader, dom.clone(), config, Events::disabled()),
        dom,
    )
}

/// An app over `source` with the fixture shell, default config and the
/// clock frozen at zero.
pub fn app_for(source: MemorySource) -> App<MemorySource> {
    app_with(source, AppOptions {
        clock: Arc::new(ManualClock::new(0)) as Arc<dyn Clock>,
        ..AppOptions::default()
    })
}

pub fn app_with(source: MemorySource, options: AppOptions) -> App<MemorySource> {
    App::with_options(SiteConfig::default(), Arc::new(source), SHELL, options)
}
