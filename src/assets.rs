//! Asset fetching and fragment injection.
//!
//! Everything the storefront shows arrives as a static asset: page fragments
//! (`pages/<id>.html`), section fragments (`components/<name>.html`) and the
//! product feed. [`AssetSource`] is the seam between controllers and the
//! transport; [`DirSource`] serves a site directory from disk and
//! [`MemorySource`] serves an in-memory map with scriptable failures for
//! tests.
//!
//! A non-2xx status is a successful *transport* carrying a failed
//! *response*, exactly like `fetch()`: callers decide what a 404 means.
//!
//! [`FragmentLoader`] fetches a fragment and injects it, verbatim, into the
//! element with the requested id. Sequences of fragments load strictly one
//! after another because later fragments are allowed to target placeholders
//! that earlier fragments introduced.

use crate::dom::Dom;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// A fetched asset: status code plus body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    pub status: u16,
    pub body: String,
}

impl AssetResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(404, "")
    }

    /// True for 2xx statuses.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("transport failure fetching {path}: {message}")]
    Transport { path: String, message: String },
}

/// Source of static site assets, addressed by relative path.
pub trait AssetSource: Send + Sync {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<AssetResponse, FetchError>> + Send;
}

// ============================================================================
// Directory-backed source
// ============================================================================

/// Serves files below a site root.
///
/// Missing files answer 404; paths that would escape the root answer 403.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_contained(path: &str) -> bool {
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

impl AssetSource for DirSource {
    async fn fetch(&self, path: &str) -> Result<AssetResponse, FetchError> {
        if !is_contained(path) {
            warn!(path, "refusing to serve a path outside the site root");
            return Ok(AssetResponse::new(403, ""));
        }
        let full = self.root.join(path);
        match tokio::fs::read_to_string(&full).await {
            Ok(body) => Ok(AssetResponse::new(200, body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AssetResponse::not_found()),
            Err(source) => Err(FetchError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }
}

// ============================================================================
// In-memory source
// ============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    bodies: HashMap<String, String>,
    statuses: HashMap<String, u16>,
    failures: HashSet<String>,
    delays: HashMap<String, Duration>,
    log: Vec<String>,
}

/// In-memory asset map with scriptable statuses, transport failures and
/// per-path latency. Every fetch is recorded in order.
#[derive(Debug, Default)]
pub struct MemorySource {
    state: Mutex<MemoryState>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builder form of [`MemorySource::insert`].
    pub fn with(self, path: &str, body: impl Into<String>) -> Self {
        self.insert(path, body);
        self
    }

    pub fn insert(&self, path: &str, body: impl Into<String>) {
        self.state().bodies.insert(path.to_string(), body.into());
    }

    /// Answer `status` for `path` regardless of its body.
    pub fn set_status(&self, path: &str, status: u16) {
        self.state().statuses.insert(path.to_string(), status);
    }

    pub fn clear_status(&self, path: &str) {
        self.state().statuses.remove(path);
    }

    /// Fail the transport for `path` (the `fetch()` rejection case).
    pub fn set_failure(&self, path: &str) {
        self.state().failures.insert(path.to_string());
    }

    /// Delay every response for `path` by `delay`.
    pub fn set_delay(&self, path: &str, delay: Duration) {
        self.state().delays.insert(path.to_string(), delay);
    }

    /// Paths fetched so far, in request order.
    pub fn fetch_log(&self) -> Vec<String> {
        self.state().log.clone()
    }
}

impl AssetSource for MemorySource {
    async fn fetch(&self, path: &str) -> Result<AssetResponse, FetchError> {
        let delay = {
            let mut state = self.state();
            state.log.push(path.to_string());
            state.delays.get(path).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        if state.failures.contains(path) {
            return Err(FetchError::Transport {
                path: path.to_string(),
                message: "connection refused".to_string(),
            });
        }
        let body = state.bodies.get(path).cloned();
        let response = match (state.statuses.get(path), body) {
            (Some(status), body) => AssetResponse::new(*status, body.unwrap_or_default()),
            (None, Some(body)) => AssetResponse::new(200, body),
            (None, None) => AssetResponse::not_found(),
        };
        Ok(response)
    }
}

// ============================================================================
// Fragment loader
// ============================================================================

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("no element with id {0:?}")]
    MissingTarget(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{path} answered HTTP {status}")]
    Status { path: String, status: u16 },
}

/// A fragment file and the id of the placeholder it fills.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub target: String,
    pub path: String,
}

impl Fragment {
    pub fn new(target: &str, path: impl Into<String>) -> Self {
        Self {
            target: target.to_string(),
            path: path.into(),
        }
    }
}

/// Per-fragment results of a sequential load, in load order.
#[derive(Debug, Default)]
pub struct SequenceOutcome {
    pub loaded: Vec<String>,
    pub failed: Vec<String>,
    /// True when the guard stopped the sequence before its end.
    pub interrupted: bool,
}

/// Fetches fragments and injects them into placeholders.
#[derive(Debug)]
pub struct FragmentLoader<S> {
    source: Arc<S>,
    dom: Dom,
    pause: Duration,
}

impl<S> Clone for FragmentLoader<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            dom: self.dom.clone(),
            pause: self.pause,
        }
    }
}

impl<S: AssetSource> FragmentLoader<S> {
    pub fn new(source: Arc<S>, dom: Dom, pause: Duration) -> Self {
        Self { source, dom, pause }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Fetch `path` and return its body, treating non-2xx as an error.
    pub async fn fetch_text(&self, path: &str) -> Result<String, LoadError> {
        let response = self.source.fetch(path).await?;
        if !response.ok() {
            return Err(LoadError::Status {
                path: path.to_string(),
                status: response.status,
            });
        }
        Ok(response.body)
    }

    /// Fetch `path` and inject it into the element with id `target`.
    ///
    /// The target is resolved before the fetch (nothing is requested for a
    /// missing placeholder). Injection goes to that same node; if it was
    /// replaced while the request was in flight, the body is dropped.
    pub async fn load(&self, target: &str, path: &str) -> Result<(), LoadError> {
        let Some(node) = self.dom.read(|doc| doc.by_id(target)) else {
            return Err(LoadError::MissingTarget(target.to_string()));
        };
        let body = self.fetch_text(path).await?;
        let injected = self.dom.write(|doc| doc.set_inner_html(node, &body));
        if !injected {
            return Err(LoadError::MissingTarget(target.to_string()));
        }
        debug!(target, path, "fragment injected");
        Ok(())
    }

    /// Load `fragments` one after another. Failures are logged and skipped.
    pub async fn load_sequence(&self, fragments: &[Fragment]) -> SequenceOutcome {
        self.load_sequence_while(fragments, || true).await
    }

    /// Like [`FragmentLoader::load_sequence`], but stops as soon as
    /// `proceed` returns false (checked before every fragment and after
    /// every await).
    pub async fn load_sequence_while(
        &self,
        fragments: &[Fragment],
        proceed: impl Fn() -> bool,
    ) -> SequenceOutcome {
        let mut outcome = SequenceOutcome::default();
        for fragment in fragments {
            if !proceed() {
                outcome.interrupted = true;
                return outcome;
            }
            match self.load(&fragment.target, &fragment.path).await {
                Ok(()) => outcome.loaded.push(fragment.path.clone()),
                Err(e) => {
                    error!(path = %fragment.path, error = %e, "fragment load failed");
                    outcome.failed.push(fragment.path.clone());
                }
            }
            if !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
        }
        if !proceed() {
            outcome.interrupted = true;
        }
        outcome
    }
}
