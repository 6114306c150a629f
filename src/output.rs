//! CLI output formatting for every command.
//!
//! # Entity Display Contract
//!
//! Each entity (filter, post, thumbnail) is shown as a header line led by a
//! 3-digit positional index, with secondary context on indented lines:
//!
//! ```text
//! 003 Noir
//!     Name: CIPhotoEffectNoir
//! ```
//!
//! ## Filters
//!
//! ```text
//! Filters
//! 001 NoFilters (identity)
//! 002 GaussianBlur
//!     Name: CIGaussianBlur
//! ```
//!
//! ## Feed
//!
//! ```text
//! Feed (2 posts)
//! 001 #17 sunset at the pier
//!     Image: https://…/a.jpg
//! ```
//!
//! ## Thumbnails
//!
//! ```text
//! SepiaTone: ok
//! TwirlDistortion: failed (Filter CITwirlDistortion produced no output)
//! Thumbnails: 16 of 17 (1 failed)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::catalog::{Filter, FilterDescriptor};
use crate::feed::{FeedUpdate, Post};
use crate::publish::PublishOutcome;
use crate::session::{FanOutEvent, FanOutReport};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// First line of a caption, truncated for single-line display.
fn caption_line(text: &str) -> String {
    let first = text.lines().next().unwrap_or_default().trim();
    if first.is_empty() {
        "(no description)".to_string()
    } else {
        truncate_desc(first, 60)
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// filters
// ============================================================================

/// Format the filter catalog in display order.
pub fn format_filter_catalog(descriptors: &[FilterDescriptor]) -> Vec<String> {
    let mut lines = vec!["Filters".to_string()];
    for (i, d) in descriptors.iter().enumerate() {
        if d.filter.is_identity() {
            lines.push(format!("{} {} (identity)", format_index(i + 1), d.display));
            continue;
        }
        lines.push(format!("{} {}", format_index(i + 1), d.display));
        lines.push(format!("{}Name: {}", indent(1), d.raw));
    }
    lines
}

pub fn print_filter_catalog(descriptors: &[FilterDescriptor]) {
    for line in format_filter_catalog(descriptors) {
        println!("{}", line);
    }
}

// ============================================================================
// feed
// ============================================================================

/// Format the displayed post list.
///
/// `saved[i]` is the file row `i`'s image was written to. Pass an empty
/// slice when images were not downloaded.
pub fn format_feed(posts: &[Post], saved: &[&Path]) -> Vec<String> {
    let mut lines = vec![format!("Feed ({})", plural(posts.len(), "post", "posts"))];
    for (i, post) in posts.iter().enumerate() {
        lines.push(format!(
            "{} #{} {}",
            format_index(i + 1),
            post.id,
            caption_line(&post.description)
        ));
        lines.push(format!("{}Image: {}", indent(1), post.image_url));
        if let Some(path) = saved.get(i) {
            lines.push(format!("{}Saved: {}", indent(1), path.display()));
        }
    }
    lines
}

pub fn print_feed(posts: &[Post], saved: &[&Path]) {
    for line in format_feed(posts, saved) {
        println!("{}", line);
    }
}

/// One-line summary of what a refresh did.
pub fn format_feed_update(update: FeedUpdate) -> String {
    match update {
        FeedUpdate::Replaced(n) => format!("Feed updated: {}", plural(n, "post", "posts")),
        FeedUpdate::Unchanged => "Feed unchanged".to_string(),
        FeedUpdate::Stale => "Feed result discarded (newer fetch in flight)".to_string(),
    }
}

// ============================================================================
// thumbnails
// ============================================================================

/// Format a single fan-out event for display.
///
/// Called from the printer thread as events arrive from the rayon workers.
pub fn format_fan_out_event(event: &FanOutEvent) -> Vec<String> {
    match event {
        FanOutEvent::Filtered {
            filter,
            error: None,
        } => vec![format!("{}: ok", filter.display_identifier())],
        FanOutEvent::Filtered {
            filter,
            error: Some(e),
        } => vec![format!("{}: failed ({})", filter.display_identifier(), e)],
        FanOutEvent::Complete(report) => format_fan_out_report(report),
    }
}

/// Summary lines for a finished fan-out.
pub fn format_fan_out_report(report: &FanOutReport) -> Vec<String> {
    let mut summary = format!(
        "Thumbnails: {} of {}",
        report.populated,
        report.populated + report.failed.len()
    );
    if !report.failed.is_empty() {
        summary.push_str(&format!(" ({} failed)", report.failed.len()));
    }
    if report.cancelled {
        summary.push_str(" [cancelled]");
    }
    vec![summary]
}

/// Format the list of thumbnail files written to disk.
pub fn format_saved_thumbnails(saved: &[(Filter, &Path)]) -> Vec<String> {
    let mut lines = Vec::new();
    for (filter, path) in saved {
        lines.push(format!(
            "{} {}",
            format_index(filter.index() + 1),
            filter.display_identifier()
        ));
        lines.push(format!("{}Saved: {}", indent(1), path.display()));
    }
    lines
}

pub fn print_saved_thumbnails(saved: &[(Filter, &Path)]) {
    for line in format_saved_thumbnails(saved) {
        println!("{}", line);
    }
}

// ============================================================================
// apply / publish
// ============================================================================

/// Format the result of applying one filter to a file.
pub fn format_apply_result(filter: Filter, dims: (u32, u32), output: &Path) -> Vec<String> {
    vec![
        format!("{} ({}x{})", filter.display_identifier(), dims.0, dims.1),
        format!("{}Saved: {}", indent(1), output.display()),
    ]
}

pub fn print_apply_result(filter: Filter, dims: (u32, u32), output: &Path) {
    for line in format_apply_result(filter, dims, output) {
        println!("{}", line);
    }
}

/// Format the outcome of a publish attempt.
pub fn format_publish_outcome(
    outcome: PublishOutcome,
    url: &str,
    description: Option<&str>,
) -> Vec<String> {
    match outcome {
        PublishOutcome::Published => {
            let mut lines = vec![format!("Published → {}", url)];
            if let Some(desc) = description {
                lines.push(format!("{}Description: {}", indent(1), caption_line(desc)));
            }
            lines
        }
        PublishOutcome::Skipped => vec!["Nothing to publish: no image selected".to_string()],
    }
}

pub fn print_publish_outcome(outcome: PublishOutcome, url: &str, description: Option<&str>) {
    for line in format_publish_outcome(outcome, url, description) {
        println!("{}", line);
    }
}
