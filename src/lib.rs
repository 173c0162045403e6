//! # Lumio
//!
//! The client-side behaviour of a small storefront, without a browser. A
//! hash router swaps page fragments into a shell, the product catalog renders
//! cards from a JSON feed, and a handful of controllers (reveal animations,
//! an offer countdown, the mobile menu, the product modal, toasts, forms)
//! drive the markup the way their in-page scripts would.
//!
//! Everything works against an in-memory [`dom::Document`] and an
//! [`assets::AssetSource`], so the same code runs in unit tests, in the CLI
//! against a site directory, and behind any other host that can forward
//! clicks, scrolls and resizes.
//!
//! # Architecture: One Document, Many Controllers
//!
//! ```text
//! host input ──► App ──► Router ──► FragmentLoader ──► AssetSource
//!                 │        │
//!                 │        └─► page setup: Catalog · Forms · RevealAnimator
//!                 │
//!                 └─► Menu · Modal · Countdown · Notifier · Debouncer
//!                              │
//!                              ▼
//!                     Dom (shared Document)
//! ```
//!
//! Controllers never hold references to nodes across page swaps. They look
//! their hooks up by id when they act and quietly do nothing when the hooks
//! are absent, so a controller built at boot keeps working whichever page
//! is showing.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`app`] | Application context: owns the document and the controllers, dispatches host input |
//! | [`router`] | Hash routes → page fragments, active navigation, per-page setup |
//! | [`assets`] | Asset sources (directory, in-memory) and the fragment loader |
//! | [`catalog`] | Product feed parsing, price formatting, card building, grids and filters |
//! | [`views`] | Maud templates: cards, loading and error panels, toasts |
//! | [`types`] | Feed records (`Product`) and the modal payload carried in markup |
//! | [`modal`] | Product detail modal, quantity selector and cart counter |
//! | [`reveal`] | Scroll reveal: one-shot visibility classes with staggered delays |
//! | [`countdown`] | Offer countdown with an injectable clock |
//! | [`menu`] | Mobile menu open/close rules |
//! | [`forms`] | Contact and newsletter forms with simulated delivery |
//! | [`notify`] | Toast notifications |
//! | [`debounce`] | Trailing-edge debouncer used for resize handling |
//! | [`history`] | Hash history stack (back/forward) |
//! | [`events`] | Observable application events |
//! | [`dom`] | The in-memory element tree and its markup parser |
//! | [`config`] | `lumio.toml` loading, validation and merging over stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Newest Navigation Wins
//!
//! Every page load takes a generation number. After each await the loader
//! checks that its generation is still the latest; if not, it leaves the
//! document alone. Fragment injection goes to the node resolved before the
//! request, and node ids are never reused, so a response that arrives after
//! its placeholder was swapped away is dropped instead of landing on the
//! next page.
//!
//! ## The Modal Reads Markup, Not the Feed
//!
//! Each "view details" control carries a JSON [`types::ModalPayload`] in its
//! `data-product` attribute. The catalog writes it with `serde_json` and
//! Maud escapes it into the attribute; the modal parses it back. Opening a
//! product therefore never refetches the feed, and quotes or apostrophes
//! in names survive the trip.
//!
//! ## Maud for Every Generated Fragment
//!
//! Cards, panels and toasts are [Maud](https://maud.lambda.xyz/) templates.
//! Interpolation is escaped by default, which is what makes the payload
//! attribute safe without hand-written escaping.
//!
//! ## Time Is Injectable
//!
//! Delays (fragment pauses, filter fades, form delivery, toast lifetimes,
//! debouncing) go through `tokio::time`, and the countdown reads a
//! [`countdown::Clock`]. Tests run on a paused runtime with a manual clock
//! and never sleep for real.

pub mod app;
pub mod assets;
pub mod catalog;
pub mod config;
pub mod countdown;
pub mod debounce;
pub mod dom;
pub mod events;
pub mod forms;
pub mod history;
pub mod menu;
pub mod modal;
pub mod notify;
pub mod output;
pub mod reveal;
pub mod router;
pub mod types;
pub mod views;

#[cfg(test)]
pub(crate) mod test_helpers;
