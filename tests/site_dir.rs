//! The fixture site served from disk.

mod common;

use common::setup_site;
use lumio::app::{App, AssetRole, check_site};
use lumio::assets::DirSource;
use lumio::config::{self, SiteConfig};
use lumio::router::PageLoad;
use std::sync::Arc;

#[tokio::test]
async fn fixture_site_passes_the_check() {
    let site = setup_site();
    let check = check_site(&SiteConfig::default(), &DirSource::new(site.path())).await;
    assert!(check.is_ok(), "problems: {:?}", check.problems().collect::<Vec<_>>());
    assert_eq!(check.products, 5);
    assert_eq!(check.without_image, vec!["Bolsa de Couro"]);
}

#[tokio::test]
async fn check_reports_missing_pages_and_bad_feeds() {
    let site = setup_site();
    std::fs::remove_file(site.path().join("pages/sobre.html")).unwrap();
    std::fs::write(site.path().join("data/products.json"), "{\"items\": []}").unwrap();

    let check = check_site(&SiteConfig::default(), &DirSource::new(site.path())).await;
    let problems: Vec<_> = check.problems().map(|a| (a.role, a.path.as_str())).collect();
    assert_eq!(
        problems,
        vec![
            (AssetRole::Page, "pages/sobre.html"),
            (AssetRole::Feed, "data/products.json"),
        ]
    );
}

#[tokio::test]
async fn site_config_overrides_routes() {
    let site = setup_site();
    std::fs::write(
        site.path().join(config::CONFIG_FILENAME),
        "[routes]\nquem-somos = \"sobre\"\n",
    )
    .unwrap();
    let site_config = config::load_config(site.path()).unwrap();
    assert_eq!(
        site_config.routes.get("quem-somos").map(String::as_str),
        Some("sobre")
    );

    let shell = std::fs::read_to_string(site.path().join("index.html")).unwrap();
    let app = App::with_options(
        site_config,
        Arc::new(DirSource::new(site.path())),
        &shell,
        Default::default(),
    );
    app.boot().await;
    assert_eq!(
        app.navigate("#quem-somos").await,
        PageLoad::Loaded {
            page: "sobre".to_string()
        }
    );
    app.countdown().stop();
}
