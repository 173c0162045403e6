//! Routing scenarios against the fixture site.

mod common;

use common::{Harness, site_source};
use lumio::app::ClickOutcome;
use lumio::config::SiteConfig;
use lumio::events::AppEvent;
use lumio::router::PageLoad;
use std::time::Duration;

fn loaded(page: &str) -> PageLoad {
    PageLoad::Loaded {
        page: page.to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn boot_loads_shell_then_home_sections_in_order() {
    let h = Harness::new("");
    assert_eq!(h.app.boot().await, loaded("home"));
    assert_eq!(
        h.source.fetch_log(),
        vec![
            "components/header.html",
            "components/product-modal.html",
            "components/footer.html",
            "pages/home.html",
            "components/hero.html",
            "components/categories.html",
            "components/products.html",
            "components/offers.html",
            "components/newsletter.html",
            "data/products.json",
        ]
    );
    assert!(h.app.menu().is_bound());
    assert!(h.app.modal().is_bound());
    assert_eq!(h.app.router().current_page().as_deref(), Some("home"));
    // Three featured products in the feed.
    assert_eq!(h.app.summary().cards_total, 3);
}

#[tokio::test(start_paused = true)]
async fn initial_hash_selects_the_first_page() {
    let h = Harness::new("#produtos");
    assert_eq!(h.app.boot().await, loaded("produtos"));
    assert!(h.exists("products-grid"));
    assert!(!h.exists("hero"));
}

#[tokio::test(start_paused = true)]
async fn unknown_route_goes_home() {
    let h = Harness::new("");
    h.app.boot().await;
    h.app.navigate("produtos").await;

    assert_eq!(h.app.navigate("nao-existe").await, loaded("home"));
    assert_eq!(h.app.router().current_hash(), "home");
    assert!(h.exists("hero"));
}

#[tokio::test(start_paused = true)]
async fn route_links_navigate_and_mark_active_navigation() {
    let h = Harness::new("");
    h.app.boot().await;

    let outcome = h.app.click_id("nav-produtos").await;
    assert_eq!(outcome, Some(ClickOutcome::Navigated(loaded("produtos"))));

    let summary = h.app.summary();
    assert_eq!(summary.heading.as_deref(), Some("Produtos"));
    assert_eq!(summary.active_nav, vec!["Produtos"]);
    h.app.dom().read(|doc| {
        let home = doc.by_id("nav-home").unwrap();
        assert!(doc.has_class(home, "text-gray-600"));
        assert!(!doc.has_class(home, "text-indigo-600"));
    });
}

#[tokio::test(start_paused = true)]
async fn missing_page_shows_error_and_keeps_current_page() {
    let mut h = Harness::new("");
    h.app.boot().await;
    h.app.navigate("produtos").await;
    h.drain();

    h.source.set_status("pages/sobre.html", 404);
    assert_eq!(
        h.app.navigate("sobre").await,
        PageLoad::Failed {
            page: "sobre".to_string()
        }
    );
    assert_eq!(h.app.router().current_page().as_deref(), Some("produtos"));
    assert!(h.exists("retry-load"));
    assert!(
        h.drain()
            .iter()
            .any(|e| matches!(e, AppEvent::PageFailed { page, .. } if page == "sobre"))
    );

    h.source.clear_status("pages/sobre.html");
    assert_eq!(
        h.app.click_id("retry-load").await,
        Some(ClickOutcome::Retried(loaded("sobre")))
    );
    assert_eq!(h.app.router().current_page().as_deref(), Some("sobre"));
    assert_eq!(h.app.summary().heading.as_deref(), Some("Sobre a Lumio"));
}

#[tokio::test(start_paused = true)]
async fn newer_navigation_supersedes_a_slow_one() {
    let h = Harness::new("");
    h.app.boot().await;
    h.source
        .set_delay("pages/produtos.html", Duration::from_millis(500));

    let (slow, fast) = tokio::join!(h.app.navigate("produtos"), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.app.navigate("contato").await
    });

    assert_eq!(
        slow,
        PageLoad::Superseded {
            page: "produtos".to_string()
        }
    );
    assert_eq!(fast, loaded("contato"));
    assert_eq!(h.app.router().current_page().as_deref(), Some("contato"));
    assert!(!h.exists("products-grid"));
    assert!(h.app.forms().contact_bound());
}

#[tokio::test(start_paused = true)]
async fn back_and_forward_walk_the_hash_history() {
    let h = Harness::new("");
    h.app.boot().await;
    h.app.navigate("produtos").await;
    h.app.navigate("contato").await;

    assert_eq!(h.app.back().await, Some(loaded("produtos")));
    assert_eq!(h.app.back().await, Some(loaded("home")));
    assert_eq!(h.app.back().await, None);
    assert_eq!(h.app.forward().await, Some(loaded("produtos")));
    assert_eq!(h.app.forward().await, Some(loaded("contato")));
    assert_eq!(h.app.forward().await, None);
}

#[tokio::test(start_paused = true)]
async fn failed_home_section_is_skipped() {
    let source = site_source();
    source.set_status("components/categories.html", 500);
    let h = Harness::with(SiteConfig::default(), source, "");

    assert_eq!(h.app.boot().await, loaded("home"));
    assert!(!h.exists("categories"));
    assert!(h.exists("hero"));
    assert!(h.exists("newsletter"));
    assert_eq!(h.app.summary().cards_total, 3);
}

#[tokio::test(start_paused = true)]
async fn missing_container_is_reported() {
    let config = SiteConfig {
        site: lumio::config::SiteSection {
            container_id: "nao-existe".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    let h = Harness::with(config, site_source(), "");
    assert_eq!(h.app.boot().await, PageLoad::NoContainer);
    assert_eq!(h.app.router().current_page(), None);
}
