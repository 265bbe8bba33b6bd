//! # Asset Pipeline
//!
//! A static-site asset pipeline: copies HTML pages, compiles Sass into
//! prefixed and minified CSS, optimizes images, moves fonts and favicons,
//! renames `src/ht.access` to `build/.htaccess`, and runs a live-reload
//! development server.
//!
//! # Architecture: Path Table + Task Graph
//!
//! The crate's own logic is small. A declarative path table maps each asset
//! category to source globs and a destination; a fixed task graph composes
//! the per-category transforms. Every real conversion is delegated to a
//! library:
//!
//! ```text
//! pages, favicon, fonts, htaccess   byte copy (tokio::fs)
//! styles                            grass → lightningcss
//! images                            image (PNG / JPEG / GIF re-encode)
//! watch                             notify + notify-debouncer-mini
//! server                            axum + tower-http ServeDir + WebSocket
//! ```
//!
//! Entry points live in the [`registry`]:
//!
//! ```text
//! build    = sequence(clean, parallel(pages, styles, images, favicon, fonts, htaccess))
//! default  = sequence(settled(parallel(...assets)), parallel(watch, server))
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `pipeline.toml` loading, stock defaults, merge, validation |
//! | [`sources`] | Glob expansion with glob-base mirroring, watcher matching |
//! | [`transform`] | The [`Transform`](transform::Transform) contract and the asset transforms |
//! | [`imaging`] | Image optimizer backend trait, `image`-crate backend, keep-smaller rule |
//! | [`clean`] | Removes the output root |
//! | [`task`] | Sequence / parallel / settled composition and run reports |
//! | [`registry`] | Named entry points built from a loaded config |
//! | [`watch`] | Re-runs a category's transform when its sources change |
//! | [`server`] | Static dev server with live reload |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Thread, Many Tasks
//!
//! Orchestration runs on a tokio current-thread runtime. `parallel` polls
//! its children together with `join_all`, so they interleave at file IO.
//! Codec work (Sass compile, image encode) is handed to `spawn_blocking`
//! so a large image never stalls the dev server.
//!
//! ## Immutable Config
//!
//! Config is loaded and validated once, then shared read-only behind an
//! `Arc` inside [`transform::Context`]. Watch re-runs clone the context, not
//! the config.
//!
//! ## Output Never Grows
//!
//! An image whose re-encode is not smaller is written unchanged. Encoders are
//! deterministic, so repeated builds are byte-identical.

pub mod clean;
pub mod config;
pub mod imaging;
pub mod output;
pub mod registry;
pub mod server;
pub mod sources;
pub mod task;
pub mod transform;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
