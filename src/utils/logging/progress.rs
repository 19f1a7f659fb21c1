//! Progress reporting for long-running scrapes, using the indicatif crate.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Style for the listing-page progress bar
pub const PAGE_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} pages {msg}";

/// Create a progress bar over listing pages
///
/// Returns a hidden bar when `visible` is false, so callers never branch on it.
#[must_use]
pub fn create_page_progress_bar(pages: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::with_draw_target(Some(pages), ProgressDrawTarget::hidden());
    }

    let pb = ProgressBar::new(pages);
    match ProgressStyle::default_bar().template(PAGE_TEMPLATE) {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(e) => log::debug!("Progress template rejected: {e}"),
    }
    pb
}

/// Finish a progress bar with a completion message
pub fn finish_progress_bar(pb: &ProgressBar, message: Option<&str>) {
    if let Some(msg) = message {
        pb.finish_with_message(msg.to_string());
    } else {
        pb.finish();
    }
}
