//! Quality-to-format-selector mapping (spec.md §4.4.3), bundled verbatim
//! with the implementation as the spec requires.

use yta_models::Quality;

/// The downloader's format-selector string for a given quality key.
pub fn format_selector(quality: Quality) -> &'static str {
    match quality {
        Quality::Best => "bestvideo+bestaudio/best",
        Quality::P1080 => "bestvideo[height<=1080]+bestaudio/best[height<=1080]",
        Quality::P720 => "bestvideo[height<=720]+bestaudio/best[height<=720]",
        Quality::P480 => "bestvideo[height<=480]+bestaudio/best[height<=480]",
        Quality::P360 => "bestvideo[height<=360]+bestaudio/best[height<=360]",
        Quality::Audio => "bestaudio/best",
    }
}
