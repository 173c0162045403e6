//! Hash router.
//!
//! Maps the URL hash to a page id through the route table, fetches
//! `pages/<id>.html` into the content container and runs the page's setup:
//!
//! | Page | Setup |
//! |------|-------|
//! | home | load the home sections one after another, then the featured grid |
//! | `produtos` | render every product and wire the category filters |
//! | `contato` | wire the contact form |
//!
//! After every successful load the viewport scrolls to the top and the
//! reveal animator rediscovers trigger elements in the new content.
//!
//! ## Superseded navigations
//!
//! Every load takes a generation number. After each await the load checks
//! that it is still the newest one and quietly stops otherwise, so a slow
//! response can never overwrite the page a later navigation committed.
//!
//! ## Failures
//!
//! A page that cannot be fetched (transport error or non-2xx status) shows
//! the error panel with a retry control and leaves the current page as it
//! was. A failing home section is logged and skipped.

use crate::assets::{AssetSource, Fragment, FragmentLoader};
use crate::catalog::Catalog;
use crate::config::SiteConfig;
use crate::dom::Document;
use crate::dom::Dom;
use crate::events::{AppEvent, Events};
use crate::forms::Forms;
use crate::history::{History, strip_hash};
use crate::modal::ProductModal;
use crate::reveal::RevealAnimator;
use crate::views;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// Attribute naming the route a navigation control points at.
pub const ROUTE_ATTR: &str = "data-route";
pub const ACTIVE_LINK_CLASS: &str = "text-indigo-600";
pub const INACTIVE_LINK_CLASS: &str = "text-gray-600";
pub const PRODUCTS_PAGE: &str = "produtos";
pub const CONTACT_PAGE: &str = "contato";

// ============================================================================
// Route table
// ============================================================================

/// Route key → page id. The home key and the empty key always resolve to
/// the home page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: BTreeMap<String, String>,
    home_page: String,
}

impl RouteTable {
    pub fn new(routes: BTreeMap<String, String>, home_page: &str) -> Self {
        let mut routes = routes;
        routes
            .entry(String::new())
            .or_insert_with(|| home_page.to_string());
        routes
            .entry(home_page.to_string())
            .or_insert_with(|| home_page.to_string());
        Self {
            routes,
            home_page: home_page.to_string(),
        }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(config.routes.clone(), &config.site.home_page)
    }

    pub fn home_page(&self) -> &str {
        &self.home_page
    }

    /// Page id of a known route key (`#` prefix allowed).
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.routes.get(strip_hash(key)).map(String::as_str)
    }

    /// Page id for any hash; unknown values resolve to home.
    pub fn resolve(&self, hash: &str) -> &str {
        self.lookup(hash).unwrap_or(&self.home_page)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Distinct page ids, sorted.
    pub fn pages(&self) -> Vec<&str> {
        let mut pages: Vec<&str> = self.routes.values().map(String::as_str).collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }
}

/// Mark every navigation control whose route equals `page_id` active and
/// every other one inactive.
pub fn update_active_navigation(doc: &mut Document, page_id: &str) {
    for link in doc.with_attr(ROUTE_ATTR) {
        let active = doc.attr(link, ROUTE_ATTR) == Some(page_id);
        doc.toggle_class(link, ACTIVE_LINK_CLASS, active);
        doc.toggle_class(link, INACTIVE_LINK_CLASS, !active);
        if active {
            doc.set_attr(link, "aria-current", "page");
        } else {
            doc.remove_attr(link, "aria-current");
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// How a page load ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLoad {
    Loaded { page: String },
    /// The fragment could not be fetched; the error panel is showing.
    Failed { page: String },
    /// A newer navigation started before this one finished.
    Superseded { page: String },
    /// The shell has no content container.
    NoContainer,
}

impl PageLoad {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// Controllers the router runs page setup on.
#[derive(Debug)]
pub struct PageServices<S> {
    pub catalog: Arc<Catalog<S>>,
    pub reveal: Arc<RevealAnimator>,
    pub modal: Arc<ProductModal>,
    pub forms: Arc<Forms>,
}

#[derive(Debug)]
pub struct Router<S> {
    routes: RouteTable,
    config: Arc<SiteConfig>,
    dom: Dom,
    loader: FragmentLoader<S>,
    services: PageServices<S>,
    events: Events,
    history: Mutex<History>,
    current_page: Mutex<Option<String>>,
    generation: AtomicU64,
}

impl<S: AssetSource> Router<S> {
    pub fn new(
        config: Arc<SiteConfig>,
        dom: Dom,
        loader: FragmentLoader<S>,
        services: PageServices<S>,
        events: Events,
        initial_hash: &str,
    ) -> Self {
        Self {
            routes: RouteTable::from_config(&config),
            config,
            dom,
            loader,
            services,
            events,
            history: Mutex::new(History::new(initial_hash)),
            current_page: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    fn history(&self) -> std::sync::MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Page id of the last successfully loaded page.
    pub fn current_page(&self) -> Option<String> {
        self.current_page
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn current_hash(&self) -> String {
        self.history().current_hash().to_string()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Push `route_key` onto the history and load its page. Unknown keys
    /// are logged and replaced by the home route.
    pub async fn navigate_to(&self, route_key: &str) -> PageLoad {
        let key = strip_hash(route_key);
        let key = if self.routes.lookup(key).is_some() {
            key
        } else {
            warn!(route = key, "unknown route, going home");
            self.routes.home_page()
        };
        let page = self.routes.resolve(key).to_string();
        self.history().push(key);
        self.load_page(&page).await
    }

    /// Resolve the current hash and load its page (initial load and
    /// `popstate`).
    pub async fn handle_route_change(&self) -> PageLoad {
        let hash = self.current_hash();
        let page = self.routes.resolve(&hash).to_string();
        self.load_page(&page).await
    }

    /// History back. `None` at the oldest entry.
    pub async fn back(&self) -> Option<PageLoad> {
        let moved = self.history().back().is_some();
        if !moved {
            return None;
        }
        Some(self.handle_route_change().await)
    }

    /// History forward. `None` at the newest entry.
    pub async fn forward(&self) -> Option<PageLoad> {
        let moved = self.history().forward().is_some();
        if !moved {
            return None;
        }
        Some(self.handle_route_change().await)
    }

    /// Load `page_id` into the content container and run its setup.
    pub async fn load_page(&self, page_id: &str) -> PageLoad {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let container_id = self.config.site.container_id.as_str();
        let loading = views::loading_placeholder().into_string();

        let Some(container) = self.dom.write(|doc| {
            let container = doc.by_id(container_id)?;
            doc.set_inner_html(container, &loading);
            Some(container)
        }) else {
            error!(container = container_id, "content container not found");
            return PageLoad::NoContainer;
        };

        info!(page = page_id, "loading page");
        let result = self
            .loader
            .fetch_text(&self.config.site.page_path(page_id))
            .await;
        if !self.is_current(generation) {
            return self.superseded(page_id);
        }

        let html = match result {
            Ok(html) => html,
            Err(e) => {
                error!(page = page_id, error = %e, "failed to load page");
                let panel = views::error_panel(page_id).into_string();
                self.dom.write(|doc| doc.set_inner_html(container, &panel));
                self.events.emit(AppEvent::PageFailed {
                    page: page_id.to_string(),
                    reason: e.to_string(),
                });
                return PageLoad::Failed {
                    page: page_id.to_string(),
                };
            }
        };

        self.dom.write(|doc| {
            doc.set_inner_html(container, &html);
            update_active_navigation(doc, page_id);
        });
        *self
            .current_page
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(page_id.to_string());

        if !self.setup_page(page_id, generation).await {
            return self.superseded(page_id);
        }

        if !self.services.modal.is_bound() {
            debug!("product modal not in the document");
        }
        self.dom.write(Document::scroll_to_top);
        self.services.reveal.refresh();

        info!(page = page_id, "page loaded");
        self.events.emit(AppEvent::PageLoaded {
            page: page_id.to_string(),
        });
        PageLoad::Loaded {
            page: page_id.to_string(),
        }
    }

    fn superseded(&self, page_id: &str) -> PageLoad {
        debug!(page = page_id, "navigation superseded");
        self.events.emit(AppEvent::NavigationSuperseded {
            page: page_id.to_string(),
        });
        PageLoad::Superseded {
            page: page_id.to_string(),
        }
    }

    /// Page-specific setup. Returns false when a newer navigation took over.
    async fn setup_page(&self, page_id: &str, generation: u64) -> bool {
        if page_id == self.routes.home_page() {
            let fragments: Vec<Fragment> = self
                .config
                .site
                .home_sections
                .iter()
                .map(|name| {
                    let (target, path) = self.config.site.section_fragment(name);
                    Fragment::new(&target, path)
                })
                .collect();
            let outcome = self
                .loader
                .load_sequence_while(&fragments, || self.is_current(generation))
                .await;
            if outcome.interrupted {
                return false;
            }
            debug!(
                loaded = outcome.loaded.len(),
                failed = outcome.failed.len(),
                "home sections loaded"
            );
            self.services.catalog.render_featured().await;
        } else if page_id == PRODUCTS_PAGE {
            self.services.catalog.render_all().await;
            if self.is_current(generation) {
                self.services.catalog.wire_filters();
            }
        } else if page_id == CONTACT_PAGE {
            self.services.forms.bind_contact();
        }
        self.is_current(generation)
    }
}
