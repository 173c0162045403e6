//! Application context.
//!
//! [`App`] owns the document and every controller, and is the only thing a
//! host talks to. Host input arrives as explicit commands: a click on a
//! node, a resize, a scroll, a key press, a form submission. Clicks are
//! dispatched the way delegated listeners on the document would handle
//! them, by looking at what the clicked node (or its nearest ancestor)
//! carries.
//!
//! ## Boot
//!
//! 1. Shell components load one after another into their placeholders.
//! 2. The initial route (from the starting hash) is loaded.
//! 3. The countdown starts if the loaded page carries its hooks.
//!
//! The menu and modal bind lazily: they look their hooks up whenever they
//! are used and do nothing when the hooks are missing.

use crate::assets::{AssetSource, Fragment, FragmentLoader};
use crate::catalog::{
    CARD_CLASS, Catalog, FILTER_ATTR, FilterOutcome, Grid, RenderOutcome, parse_feed,
};
use crate::config::SiteConfig;
use crate::countdown::{Clock, Countdown, SystemClock};
use crate::debounce::Debouncer;
use crate::dom::{Document, Dom, NodeId};
use crate::events::Events;
use crate::forms::{ContactFields, Forms, SubmitOutcome};
use crate::menu::{self, MobileMenu};
use crate::modal::{self, ProductModal};
use crate::notify::Notifier;
use crate::reveal::RevealAnimator;
use crate::router::{ACTIVE_LINK_CLASS, PageLoad, PageServices, ROUTE_ATTR, Router};
use crate::views::{CATALOG_RETRY_ATTR, RETRY_ATTR};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const MOBILE_CLASS: &str = "is-mobile";
const CART_CLASS: &str = "shopping-cart";

/// Snapshot of what the visitor would see, for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    pub page: Option<String>,
    pub hash: String,
    /// Text of the first `h1` inside the content container.
    pub heading: Option<String>,
    /// Labels of the highlighted navigation links, without duplicates.
    pub active_nav: Vec<String>,
    pub cards_total: usize,
    pub cards_displayed: usize,
    pub cart_count: Option<u32>,
    /// Remaining offer time, when the countdown is on the page.
    pub countdown: Option<String>,
    pub toasts: Vec<String>,
}

/// What a site asset is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRole {
    Page,
    ShellComponent,
    HomeSection,
    Feed,
}

impl AssetRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::ShellComponent => "shell component",
            Self::HomeSection => "home section",
            Self::Feed => "product feed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetCheck {
    pub role: AssetRole,
    pub path: String,
    /// `None` when the asset is present and usable.
    pub problem: Option<String>,
}

/// Result of checking a site directory against its config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteCheck {
    pub assets: Vec<AssetCheck>,
    pub products: usize,
    /// Names of products that will show the placeholder image.
    pub without_image: Vec<String>,
}

impl SiteCheck {
    pub fn problems(&self) -> impl Iterator<Item = &AssetCheck> {
        self.assets.iter().filter(|a| a.problem.is_some())
    }

    pub fn is_ok(&self) -> bool {
        self.problems().next().is_none()
    }
}

/// Fetch every asset the config refers to: one page per route, the shell
/// components, the home sections and the product feed.
pub async fn check_site<S: AssetSource>(config: &SiteConfig, source: &S) -> SiteCheck {
    let site = &config.site;
    let mut wanted: Vec<(AssetRole, String)> = Vec::new();
    let mut pages: Vec<&str> = config.routes.values().map(String::as_str).collect();
    pages.push(site.home_page.as_str());
    pages.sort_unstable();
    pages.dedup();
    wanted.extend(pages.into_iter().map(|p| (AssetRole::Page, site.page_path(p))));
    wanted.extend(
        site.shell_components
            .iter()
            .map(|name| (AssetRole::ShellComponent, site.section_fragment(name).1)),
    );
    wanted.extend(
        site.home_sections
            .iter()
            .map(|name| (AssetRole::HomeSection, site.section_fragment(name).1)),
    );
    wanted.push((AssetRole::Feed, site.products_feed.clone()));

    let mut check = SiteCheck::default();
    for (role, path) in wanted {
        let problem = match source.fetch(&path).await {
            Ok(response) if !response.ok() => Some(format!("HTTP {}", response.status)),
            Ok(response) if role == AssetRole::Feed => match parse_feed(&response.body) {
                Ok(products) => {
                    check.products = products.len();
                    check.without_image = products
                        .iter()
                        .filter(|p| p.primary_image().is_none())
                        .map(|p| p.name.clone())
                        .collect();
                    None
                }
                Err(e) => Some(format!("malformed feed: {e}")),
            },
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        };
        check.assets.push(AssetCheck {
            role,
            path,
            problem,
        });
    }
    check
}

/// Construction options beyond config, source and shell.
#[derive(Clone)]
pub struct AppOptions {
    pub events: Events,
    pub clock: Arc<dyn Clock>,
    /// Hash the session starts on (the address bar at page load).
    pub initial_hash: String,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            events: Events::disabled(),
            clock: Arc::new(SystemClock),
            initial_hash: String::new(),
        }
    }
}

/// What a click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Navigated(PageLoad),
    Retried(PageLoad),
    Filtered(FilterOutcome),
    CatalogRetried(RenderOutcome),
    ModalOpened(bool),
    ModalClosed,
    Quantity(u32),
    CartUpdated(Option<u32>),
    MenuToggled(bool),
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClickAction {
    CloseModal,
    Increase,
    Decrease,
    AddToCartFromModal,
    ToggleMenu,
    Route(String),
    Filter(String),
    ViewProduct,
    AddCardToCart,
    Retry(String),
    CatalogRetry(Grid),
    None,
}

fn classify(doc: &Document, target: NodeId) -> ClickAction {
    let within_id = |id: &str| doc.by_id(id).is_some_and(|node| doc.contains(node, target));
    let attr_of = |name: &str| {
        doc.closest_with_attr(target, name)
            .and_then(|node| doc.attr(node, name))
            .map(str::to_string)
    };

    if within_id(modal::CLOSE_ID) {
        return ClickAction::CloseModal;
    }
    if within_id(modal::INCREASE_ID) {
        return ClickAction::Increase;
    }
    if within_id(modal::DECREASE_ID) {
        return ClickAction::Decrease;
    }
    if within_id(modal::ADD_TO_CART_ID) {
        return ClickAction::AddToCartFromModal;
    }
    if within_id(menu::BUTTON_ID) {
        return ClickAction::ToggleMenu;
    }
    if let Some(route) = attr_of(ROUTE_ATTR) {
        return ClickAction::Route(route);
    }
    if let Some(category) = attr_of(FILTER_ATTR) {
        return ClickAction::Filter(category);
    }
    if doc.closest_with_class(target, modal::VIEW_BUTTON_CLASS).is_some() {
        return ClickAction::ViewProduct;
    }
    if doc
        .closest_with_attr(target, "data-action")
        .is_some_and(|node| doc.attr(node, "data-action") == Some("add-to-cart"))
    {
        return ClickAction::AddCardToCart;
    }
    if let Some(page) = attr_of(RETRY_ATTR) {
        return ClickAction::Retry(page);
    }
    if let Some(grid) = attr_of(CATALOG_RETRY_ATTR).and_then(|g| Grid::parse(&g)) {
        return ClickAction::CatalogRetry(grid);
    }
    // A click on the modal backdrop itself (not its content) closes it.
    if doc.by_id(modal::MODAL_ID) == Some(target) {
        return ClickAction::CloseModal;
    }
    ClickAction::None
}

/// The storefront, headless.
pub struct App<S> {
    config: Arc<SiteConfig>,
    dom: Dom,
    events: Events,
    loader: FragmentLoader<S>,
    router: Router<S>,
    catalog: Arc<Catalog<S>>,
    reveal: Arc<RevealAnimator>,
    modal: Arc<ProductModal>,
    forms: Arc<Forms>,
    notifier: Notifier,
    menu: Arc<MobileMenu>,
    countdown: Arc<Countdown>,
    resize: Debouncer,
}

impl<S: AssetSource + 'static> App<S> {
    pub fn new(config: SiteConfig, source: S, shell: &str) -> Self {
        Self::with_options(config, Arc::new(source), shell, AppOptions::default())
    }

    pub fn with_options(
        config: SiteConfig,
        source: Arc<S>,
        shell: &str,
        options: AppOptions,
    ) -> Self {
        let config = Arc::new(config);
        let dom = Dom::from_shell(shell);
        let events = options.events;
        let loader = FragmentLoader::new(source, dom.clone(), config.timing.fragment_pause());

        let notifier = Notifier::new(dom.clone(), config.timing.toast_duration(), events.clone());
        let catalog = Arc::new(Catalog::new(
            loader.clone(),
            dom.clone(),
            Arc::clone(&config),
            events.clone(),
        ));
        let reveal = Arc::new(RevealAnimator::new(
            dom.clone(),
            config.reveal.clone(),
            events.clone(),
        ));
        let modal = Arc::new(ProductModal::new(
            dom.clone(),
            config.currency.clone(),
            notifier.clone(),
            events.clone(),
        ));
        let forms = Arc::new(Forms::new(
            dom.clone(),
            notifier.clone(),
            config.timing.clone(),
        ));
        let menu = Arc::new(MobileMenu::new(
            dom.clone(),
            config.menu.desktop_breakpoint,
            events.clone(),
        ));
        let deadline = config.countdown.deadline_ms.unwrap_or_else(|| {
            Countdown::deadline_in_days(options.clock.as_ref(), config.countdown.duration_days)
        });
        let countdown = Countdown::new(dom.clone(), options.clock, deadline, events.clone());

        let router = Router::new(
            Arc::clone(&config),
            dom.clone(),
            loader.clone(),
            PageServices {
                catalog: Arc::clone(&catalog),
                reveal: Arc::clone(&reveal),
                modal: Arc::clone(&modal),
                forms: Arc::clone(&forms),
            },
            events.clone(),
            &options.initial_hash,
        );

        Self {
            resize: Debouncer::new(config.timing.resize_debounce()),
            config,
            dom,
            events,
            loader,
            router,
            catalog,
            reveal,
            modal,
            forms,
            notifier,
            menu,
            countdown,
        }
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn events(&self) -> &Events {
        &self.events
    }

    pub fn loader(&self) -> &FragmentLoader<S> {
        &self.loader
    }

    pub fn router(&self) -> &Router<S> {
        &self.router
    }

    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    pub fn reveal(&self) -> &RevealAnimator {
        &self.reveal
    }

    pub fn modal(&self) -> &ProductModal {
        &self.modal
    }

    pub fn forms(&self) -> &Forms {
        &self.forms
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn menu(&self) -> &MobileMenu {
        &self.menu
    }

    pub fn countdown(&self) -> &Arc<Countdown> {
        &self.countdown
    }

    pub fn summary(&self) -> PageSummary {
        let container_id = self.config.site.container_id.as_str();
        let mut summary = self.dom.read(|doc| {
            let heading = doc
                .by_id(container_id)
                .and_then(|c| doc.by_tag_in(c, "h1").into_iter().next())
                .map(|h| doc.text_content(h).trim().to_string());
            let mut active_nav: Vec<String> = Vec::new();
            for link in doc.by_class(ACTIVE_LINK_CLASS) {
                if doc.attr(link, ROUTE_ATTR).is_none() {
                    continue;
                }
                let label = doc.text_content(link).trim().to_string();
                if !label.is_empty() && !active_nav.contains(&label) {
                    active_nav.push(label);
                }
            }
            let cart_count = doc
                .by_class(CART_CLASS)
                .into_iter()
                .next()
                .and_then(|cart| doc.by_tag_in(cart, "span").into_iter().next())
                .and_then(|span| doc.text_content(span).trim().parse().ok());
            PageSummary {
                heading,
                active_nav,
                cards_total: doc.by_class(CARD_CLASS).len(),
                cart_count,
                ..PageSummary::default()
            }
        });
        summary.page = self.router.current_page();
        summary.hash = self.router.current_hash();
        summary.cards_displayed = self.catalog.displayed_cards();
        summary.countdown = if self.countdown.is_bound() {
            Some(match self.countdown.remaining() {
                Some(units) => units.to_string(),
                None => "expired".to_string(),
            })
        } else {
            None
        };
        summary.toasts = self.notifier.visible();
        summary
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Load the shell components, then the initial route.
    pub async fn boot(&self) -> PageLoad {
        let fragments: Vec<Fragment> = self
            .config
            .site
            .shell_components
            .iter()
            .map(|name| {
                let (target, path) = self.config.site.section_fragment(name);
                Fragment::new(&target, path)
            })
            .collect();
        let outcome = self.loader.load_sequence(&fragments).await;
        info!(
            loaded = outcome.loaded.len(),
            failed = outcome.failed.len(),
            "shell components loaded"
        );
        if !self.modal.is_bound() {
            debug!("product modal unavailable");
        }
        if !self.menu.is_bound() {
            debug!("mobile menu unavailable");
        }

        let page = self.router.handle_route_change().await;
        self.after_page();
        page
    }

    /// Start the countdown when the page just loaded carries its hooks.
    fn after_page(&self) {
        if self.countdown.is_bound() && !self.countdown.is_running() {
            self.countdown.start();
        }
    }

    pub async fn navigate(&self, route_key: &str) -> PageLoad {
        let page = self.router.navigate_to(route_key).await;
        self.after_page();
        page
    }

    pub async fn back(&self) -> Option<PageLoad> {
        let page = self.router.back().await;
        self.after_page();
        page
    }

    pub async fn forward(&self) -> Option<PageLoad> {
        let page = self.router.forward().await;
        self.after_page();
        page
    }

    // ---------------------------------------------------------------------
    // Host input
    // ---------------------------------------------------------------------

    /// Dispatch a click on `target`.
    pub async fn click(&self, target: NodeId) -> ClickOutcome {
        self.menu.on_pointer(target);
        if self.menu.is_panel_link(target) {
            self.menu.on_link_activated();
        }

        let action = self.dom.read(|doc| classify(doc, target));
        debug!(?action, "click");
        match action {
            ClickAction::CloseModal => {
                self.modal.close();
                ClickOutcome::ModalClosed
            }
            ClickAction::Increase => ClickOutcome::Quantity(self.modal.increase()),
            ClickAction::Decrease => ClickOutcome::Quantity(self.modal.decrease()),
            ClickAction::AddToCartFromModal => ClickOutcome::CartUpdated(self.modal.add_to_cart()),
            ClickAction::ToggleMenu => ClickOutcome::MenuToggled(self.menu.toggle()),
            ClickAction::Route(key) => ClickOutcome::Navigated(self.navigate(&key).await),
            ClickAction::Filter(category) => {
                ClickOutcome::Filtered(self.catalog.apply_filter(&category).await)
            }
            ClickAction::ViewProduct => {
                ClickOutcome::ModalOpened(self.modal.click_view_details(target))
            }
            ClickAction::AddCardToCart => {
                ClickOutcome::CartUpdated(self.modal.add_card_to_cart(target))
            }
            ClickAction::Retry(page) => {
                let page = self.router.load_page(&page).await;
                self.after_page();
                ClickOutcome::Retried(page)
            }
            ClickAction::CatalogRetry(grid) => {
                let outcome = self.catalog.render(grid).await;
                if matches!(outcome, RenderOutcome::Rendered { .. }) {
                    self.reveal.refresh();
                }
                ClickOutcome::CatalogRetried(outcome)
            }
            ClickAction::None => ClickOutcome::Ignored,
        }
    }

    /// Click the first element with id `id`. `None` when there is none.
    pub async fn click_id(&self, id: &str) -> Option<ClickOutcome> {
        let target = self.dom.read(|doc| doc.by_id(id))?;
        Some(self.click(target).await)
    }

    /// The viewport width changed. Layout-dependent handling is debounced;
    /// only the last width of a burst is acted on. Without a runtime the
    /// handling runs at once and there is no task to await.
    pub fn resize(&self, width: u32) -> Option<JoinHandle<bool>> {
        self.dom.write(|doc| doc.viewport.width = f64::from(width));
        let dom = self.dom.clone();
        let menu = Arc::clone(&self.menu);
        let breakpoint = self.config.menu.desktop_breakpoint;
        self.resize.call(move || {
            let mobile = width < breakpoint;
            dom.write(|doc| {
                let body = doc.body();
                doc.toggle_class(body, MOBILE_CLASS, mobile);
            });
            menu.on_resize(width);
        })
    }

    pub fn key_escape(&self) {
        if self.menu.is_open() {
            self.menu.close();
        }
    }

    pub fn scroll(&self, y: f64) -> Vec<NodeId> {
        self.reveal.on_scroll(y)
    }

    /// The host reports that `node` entered the viewport.
    pub fn intersect(&self, node: NodeId) -> bool {
        self.reveal.on_intersect(node)
    }

    pub async fn submit_contact(&self, fields: &ContactFields) -> SubmitOutcome {
        self.forms.submit_contact(fields).await
    }

    pub async fn submit_newsletter(&self, email: &str) -> SubmitOutcome {
        self.forms.submit_newsletter(email).await
    }
}
