//! # FilterHub
//!
//! Core of a photo-filter app: pick a photo, preview it under a fixed
//! catalog of filters, publish the result with a caption, and browse what
//! everyone else has published.
//!
//! # Architecture
//!
//! ```text
//! catalog   fixed list of filters and their display names
//! imaging   filter engine seam + pure-Rust effects, decode/encode
//! session   one editing pass: selected preview + parallel thumbnail fan-out
//! net       blocking HTTP seam (reqwest in production, mock in tests)
//! feed      GET + forgiving JSON parse + last-fetch-wins post list
//! publish   multipart/form-data upload of image + caption
//! ```
//!
//! Two seams keep the logic testable without pixels or sockets:
//! [`imaging::ImageEngine`] for filters and [`net::HttpClient`] for the
//! service. Both have a production implementation in this crate and a
//! recording mock under `#[cfg(test)]`.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`catalog`] | The 17 filters, raw identifiers, display identifiers |
//! | [`imaging`] | `ImageEngine`/`Transform` traits, [`imaging::RustEngine`], apply/encode/decode |
//! | [`session`] | [`session::EditSession`], [`session::fan_out`], cancellation |
//! | [`net`] | [`net::HttpClient`], [`net::ReqwestClient`], [`net::NetworkError`] |
//! | [`feed`] | [`feed::Post`], [`feed::fetch_feed`], [`feed::fetch_image`], [`feed::FeedState`] |
//! | [`publish`] | Multipart body construction and [`publish::publish`] |
//! | [`config`] | `config.toml` loading, validation, merging over stock defaults |
//! | [`output`] | CLI output formatting for every command |
//!
//! # Concurrency
//!
//! Thumbnail fan-out runs every non-identity filter on the global rayon pool
//! and merges each result into a mutex-guarded map as it lands. Completion
//! is reported exactly once, after every filter has been attempted. Ending
//! a session stops results from being merged; work already running is
//! allowed to finish.
//!
//! Feed fetches are tagged with a ticket. Only the most recently started
//! fetch may replace the displayed list.

pub mod catalog;
pub mod config;
pub mod feed;
pub mod imaging;
pub mod net;
pub mod output;
pub mod publish;
pub mod session;
