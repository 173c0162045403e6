//! Fixture site helpers shared by the integration tests.

#![allow(dead_code)]

use lumio::app::{App, AppOptions};
use lumio::assets::MemorySource;
use lumio::config::SiteConfig;
use lumio::countdown::{Clock, ManualClock};
use lumio::events::{AppEvent, Events};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

pub fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site")
}

pub fn shell() -> String {
    std::fs::read_to_string(fixture_root().join("index.html")).unwrap()
}

/// Every fixture file, keyed by its path relative to the site root.
pub fn site_source() -> MemorySource {
    let source = MemorySource::new();
    let root = fixture_root();
    add_dir(&source, &root, &root);
    source
}

fn add_dir(source: &MemorySource, root: &Path, dir: &Path) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            add_dir(source, root, &path);
        } else {
            let rel = path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            source.insert(&rel, std::fs::read_to_string(&path).unwrap());
        }
    }
}

/// Copy the fixture site to a temp directory tests may mutate.
pub fn setup_site() -> TempDir {
    let tmp = TempDir::new().unwrap();
    copy_dir_recursive(&fixture_root(), tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

pub struct Harness {
    pub app: App<MemorySource>,
    pub source: Arc<MemorySource>,
    pub clock: Arc<ManualClock>,
    pub events: UnboundedReceiver<AppEvent>,
}

impl Harness {
    pub fn new(initial_hash: &str) -> Self {
        Self::with(SiteConfig::default(), site_source(), initial_hash)
    }

    pub fn with(config: SiteConfig, source: MemorySource, initial_hash: &str) -> Self {
        let source = Arc::new(source);
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let (events, rx) = Events::channel();
        let options = AppOptions {
            events,
            clock: Arc::clone(&clock) as Arc<dyn Clock>,
            initial_hash: initial_hash.to_string(),
        };
        let app = App::with_options(config, Arc::clone(&source), &shell(), options);
        Self {
            app,
            source,
            clock,
            events: rx,
        }
    }

    /// Events emitted so far, draining the channel.
    pub fn drain(&mut self) -> Vec<AppEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    pub fn text_of(&self, id: &str) -> String {
        self.app
            .dom()
            .read(|doc| doc.by_id(id).map(|n| doc.text_content(n)).unwrap_or_default())
    }

    pub fn exists(&self, id: &str) -> bool {
        self.app.dom().read(|doc| doc.by_id(id).is_some())
    }
}
