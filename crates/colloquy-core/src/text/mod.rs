//! The text-normalization/markup pipeline.
//!
//! Pure string transformations only; every function returns a new string
//! and leaves its input untouched. The pipeline survives round trips
//! through terminal color codes, reflow, and markdown-like structural
//! tokens (lists, headers, code-block placeholders).

mod ansi;
mod reflow;
mod tags;

pub use ansi::{ansi_to_tag, correct_ansi, strip_colors, tag_to_ansi};
pub use reflow::{encode_linebreaks, reflow, restore_linebreaks, REFLOW_EMPTY};
pub use tags::{add_tags, hide_tags, strip_speaker_name};

use regex::Regex;
use std::sync::LazyLock;

/// Round-trip token standing in for a real line break.
pub const LINEBREAK_TOKEN: &str = "<lb>";
/// Token standing in for a tab / deep indentation run.
pub const TAB_TOKEN: &str = "<t>";

/// Structural markers that open a new segment when reflowing text that
/// arrived without real newlines: sentence-final breaks, numbered items,
/// table rows and rules, list bullets, headers, and protected
/// code-block placeholders.
pub(crate) static SPLIT_FLAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:\.\n|\d+\.\s|\|[-.].*|\|\s{1,2}[0-9 ]{1,2}\s{1,2}\|.*|[+|]----[+].*|-\s|#+\s.+|<code_block_\d+>)",
    )
    .expect("split-flag pattern compiles")
});

/// Pattern matching a protected code-block placeholder.
pub(crate) static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<code_block_\d+>").expect("placeholder pattern compiles"));

/// First code-block placeholder surviving in `text`, if any. Used to
/// detect substitution failures before text leaves the pipeline.
pub(crate) fn placeholder_leak(text: &str) -> Option<String> {
    PLACEHOLDER.find(text).map(|m| m.as_str().to_string())
}

/// Split `text` at every match of `pattern`, keeping the matched markers
/// as their own segments (the way `re.split` with a capture group does).
pub(crate) fn split_keep<'t>(pattern: &Regex, text: &'t str) -> Vec<&'t str> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in pattern.find_iter(text) {
        if m.start() > last {
            out.push(&text[last..m.start()]);
        }
        out.push(m.as_str());
        last = m.end();
    }
    if last < text.len() {
        out.push(&text[last..]);
    }
    out
}
