//! Site configuration module.
//!
//! Handles loading, validating, and merging `lumio.toml`. Stock defaults are
//! the base layer; a user file overrides only the keys it names.
//!
//! ## Config File Location
//!
//! `lumio.toml` lives in the site root, next to the fragment directories:
//!
//! ```text
//! site/
//! ├── lumio.toml               # Optional, overrides stock defaults
//! ├── index.html               # Shell markup (placeholders, nav, body)
//! ├── pages/                   # One fragment per route
//! │   ├── home.html
//! │   └── produtos.html
//! ├── components/              # Sub-fragments (header, hero, footer, ...)
//! └── data/products.json       # Product feed
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! [site]
//! container_id = "main-content"
//! products_feed = "data/products.json"
//!
//! [routes]
//! "" = "home"
//! home = "home"
//! produtos = "produtos"
//!
//! [reveal]
//! threshold = 0.1
//! root_margin_bottom = 50.0
//!
//! [timing]
//! resize_debounce_ms = 250
//!
//! [currency]
//! symbol = "R$"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Name of the config file looked up in the site root.
pub const CONFIG_FILENAME: &str = "lumio.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `lumio.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Asset layout and DOM hook names.
    pub site: SiteSection,
    /// Route key → page identifier.
    #[serde(default = "default_routes")]
    pub routes: BTreeMap<String, String>,
    /// Scroll-reveal observer settings.
    pub reveal: RevealConfig,
    /// Offer countdown settings.
    pub countdown: CountdownConfig,
    /// Mobile menu settings.
    pub menu: MenuConfig,
    /// Delays, debounce windows and transition lengths.
    pub timing: TimingConfig,
    /// Price formatting.
    pub currency: CurrencyConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site: SiteSection::default(),
            routes: default_routes(),
            reveal: RevealConfig::default(),
            countdown: CountdownConfig::default(),
            menu: MenuConfig::default(),
            timing: TimingConfig::default(),
            currency: CurrencyConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.reveal.threshold) {
            return Err(ConfigError::Validation(
                "reveal.threshold must be between 0 and 1".into(),
            ));
        }
        if self.reveal.root_margin_bottom < 0.0 {
            return Err(ConfigError::Validation(
                "reveal.root_margin_bottom must not be negative".into(),
            ));
        }
        if self.site.home_page.is_empty() {
            return Err(ConfigError::Validation(
                "site.home_page must not be empty".into(),
            ));
        }
        for (key, page) in &self.routes {
            if !is_safe_page_id(page) {
                return Err(ConfigError::Validation(format!(
                    "routes.{key:?} maps to an invalid page id {page:?}"
                )));
            }
        }
        for name in self.site.shell_components.iter().chain(&self.site.home_sections) {
            if !is_safe_page_id(name) {
                return Err(ConfigError::Validation(format!(
                    "invalid section name {name:?}"
                )));
            }
        }
        if self.menu.desktop_breakpoint == 0 {
            return Err(ConfigError::Validation(
                "menu.desktop_breakpoint must be non-zero".into(),
            ));
        }
        if self.currency.symbol.is_empty() {
            return Err(ConfigError::Validation(
                "currency.symbol must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Page ids become path segments (`pages/<id>.html`), so they may not
/// escape the pages directory.
fn is_safe_page_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn default_routes() -> BTreeMap<String, String> {
    [
        ("", "home"),
        ("home", "home"),
        ("produtos", "produtos"),
        ("sobre", "sobre"),
        ("contato", "contato"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Asset layout and the element ids the controllers bind to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSection {
    /// Page identifier every unknown route falls back to.
    pub home_page: String,
    /// Id of the element whose contents the router swaps.
    pub container_id: String,
    /// Directory holding one fragment per page.
    pub pages_dir: String,
    /// Directory holding shell and section fragments.
    pub components_dir: String,
    /// Path of the JSON product feed.
    pub products_feed: String,
    /// Image used when a product declares no image at all.
    pub placeholder_image: String,
    /// Shell fragments loaded once at boot, each into `<name>-placeholder`.
    pub shell_components: Vec<String>,
    /// Home page sections loaded in order after the home fragment, each
    /// into `<name>-placeholder`.
    pub home_sections: Vec<String>,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            home_page: "home".to_string(),
            container_id: "main-content".to_string(),
            pages_dir: "pages".to_string(),
            components_dir: "components".to_string(),
            products_feed: "data/products.json".to_string(),
            placeholder_image: "assets/images/placeholder.svg".to_string(),
            shell_components: ["header", "product-modal", "footer"]
                .map(String::from)
                .to_vec(),
            home_sections: ["hero", "categories", "products", "offers", "newsletter"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl SiteSection {
    pub fn page_path(&self, page_id: &str) -> String {
        format!("{}/{page_id}.html", self.pages_dir)
    }

    pub fn component_path(&self, file: &str) -> String {
        format!("{}/{file}", self.components_dir)
    }

    /// `(placeholder id, fragment path)` for a named section.
    pub fn section_fragment(&self, name: &str) -> (String, String) {
        (
            format!("{name}-placeholder"),
            self.component_path(&format!("{name}.html")),
        )
    }
}

/// Scroll-reveal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RevealConfig {
    /// Fraction of an element that must be inside the viewport (0-1).
    pub threshold: f64,
    /// Pixels trimmed off the bottom of the viewport before testing.
    pub root_margin_bottom: f64,
    /// Class that marks an element for reveal.
    pub trigger_class: String,
    /// Class added once the element is revealed.
    pub visible_class: String,
    /// Delay between consecutive reveals in the timed fallback.
    pub stagger_ms: u64,
    /// Whether the host can report viewport intersection at all.
    /// When false every trigger element is revealed on a staggered timer.
    pub observer: bool,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            root_margin_bottom: 50.0,
            trigger_class: "scroll-animate".to_string(),
            visible_class: "visible".to_string(),
            stagger_ms: 100,
            observer: true,
        }
    }
}

/// Offer countdown settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CountdownConfig {
    /// Deadline relative to startup, used when `deadline_ms` is absent.
    pub duration_days: u32,
    /// Absolute deadline in milliseconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<i64>,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            duration_days: 3,
            deadline_ms: None,
        }
    }
}

/// Mobile menu settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MenuConfig {
    /// Viewport width at and above which the menu is force-closed.
    pub desktop_breakpoint: u32,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            desktop_breakpoint: 768,
        }
    }
}

/// Delays, debounce windows and transition lengths, all in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    pub resize_debounce_ms: u64,
    /// Pause between sequential fragment loads.
    pub fragment_pause_ms: u64,
    /// Simulated network delay of the contact form.
    pub contact_delay_ms: u64,
    /// Simulated network delay of the newsletter form.
    pub newsletter_delay_ms: u64,
    /// How long a toast stays on screen.
    pub toast_duration_ms: u64,
    /// Fade-out length before filtered cards are removed from layout.
    pub filter_transition_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            resize_debounce_ms: 250,
            fragment_pause_ms: 50,
            contact_delay_ms: 2000,
            newsletter_delay_ms: 1500,
            toast_duration_ms: 3000,
            filter_transition_ms: 300,
        }
    }
}

impl TimingConfig {
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn fragment_pause(&self) -> Duration {
        Duration::from_millis(self.fragment_pause_ms)
    }

    pub fn contact_delay(&self) -> Duration {
        Duration::from_millis(self.contact_delay_ms)
    }

    pub fn newsletter_delay(&self) -> Duration {
        Duration::from_millis(self.newsletter_delay_ms)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }

    pub fn filter_transition(&self) -> Duration {
        Duration::from_millis(self.filter_transition_ms)
    }
}

/// Currency formatting for prices stored in minor units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CurrencyConfig {
    pub symbol: String,
    pub decimal_separator: String,
    pub thousands_separator: String,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            symbol: "R$".to_string(),
            decimal_separator: ",".to_string(),
            thousands_separator: ".".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// The base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults do not serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `lumio.toml` from the site root, falling back to stock defaults.
pub fn load_config(site_root: &Path) -> Result<SiteConfig, ConfigError> {
    load_config_file(&site_root.join(CONFIG_FILENAME))
}

/// Load an explicit config file path, falling back to stock defaults when it
/// does not exist.
pub fn load_config_file(config_path: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(load_raw_config(config_path)?)
}

/// Returns a fully-commented stock `lumio.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Lumio Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Site layout
# ---------------------------------------------------------------------------
[site]
# Page every unknown route falls back to.
home_page = "home"
# Element whose contents the router replaces on navigation.
container_id = "main-content"
# Fragment directories, relative to the site root.
pages_dir = "pages"
components_dir = "components"
# Product feed (a JSON list of products).
products_feed = "data/products.json"
# Shown when a product has no image field at all.
placeholder_image = "assets/images/placeholder.svg"
# Loaded once at boot into <name>-placeholder.
shell_components = ["header", "product-modal", "footer"]
# Loaded in order after the home page, each into <name>-placeholder.
home_sections = ["hero", "categories", "products", "offers", "newsletter"]

# ---------------------------------------------------------------------------
# Routes: URL hash -> page id (pages/<id>.html)
# ---------------------------------------------------------------------------
[routes]
"" = "home"
home = "home"
produtos = "produtos"
sobre = "sobre"
contato = "contato"

# ---------------------------------------------------------------------------
# Scroll reveal
# ---------------------------------------------------------------------------
[reveal]
# Fraction of the element that must be on screen.
threshold = 0.1
# Pixels trimmed from the bottom of the viewport before testing.
root_margin_bottom = 50.0
trigger_class = "scroll-animate"
visible_class = "visible"
# Delay between reveals when the host cannot observe intersection.
stagger_ms = 100
observer = true

# ---------------------------------------------------------------------------
# Offer countdown
# ---------------------------------------------------------------------------
[countdown]
duration_days = 3
# Absolute deadline (ms since epoch) overrides duration_days.
# deadline_ms = 1767225600000

# ---------------------------------------------------------------------------
# Mobile menu
# ---------------------------------------------------------------------------
[menu]
desktop_breakpoint = 768

# ---------------------------------------------------------------------------
# Timing (milliseconds)
# ---------------------------------------------------------------------------
[timing]
resize_debounce_ms = 250
fragment_pause_ms = 50
contact_delay_ms = 2000
newsletter_delay_ms = 1500
toast_duration_ms = 3000
filter_transition_ms = 300

# ---------------------------------------------------------------------------
# Currency (prices in the feed are integer minor units)
# ---------------------------------------------------------------------------
[currency]
symbol = "R$"
decimal_separator = ","
thousands_separator = "."
"##
}
