//! Structure-preserving reflow and the round-trip line-break encoding.

use regex::Regex;
use std::sync::LazyLock;

use super::{split_keep, LINEBREAK_TOKEN, SPLIT_FLAGS, TAB_TOKEN};

/// Sentinel returned by [`reflow`] for empty input.
pub const REFLOW_EMPTY: &str = "None";

/// Rejoin a numbered-item marker that got split onto its own line with
/// the text that follows it.
static NUMBERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d*\.)(\s*\n)").expect("marker pattern compiles"));

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n|\r|\n").expect("break pattern compiles"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

/// Bare list markers that belong to the segment after them.
static BARE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:-|\d+\.)$").expect("bare marker pattern compiles"));

static LB_BEFORE_NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<lb>\s*(\d+\.\s)").expect("lb pattern compiles"));
static LB_BEFORE_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<lb>\s*(-\s*)").expect("lb pattern compiles"));
static LB_AROUND_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<lb>\s*(<code_block_\d+>)\s*<lb>\s*").expect("lb pattern compiles")
});
static DOUBLED_ITEM_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n(\n\d+\.\s|\n-\s|\n<code_block_\d+>)").expect("lb pattern compiles")
});
static LB_AT_LINE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n<lb>\s*").expect("lb pattern compiles"));
static LB_REMAINING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*<lb>\s*").expect("lb pattern compiles"));

/// Word-wrap `text`, preserving structure.
///
/// When the input carries no real newlines it is first split at
/// structural markers (list items, headers, table rows, code-block
/// placeholders) so each structural unit lands on its own line. Each
/// resulting segment is word-wrapped to `width`; indentation runs become
/// `<t>` tokens and come back as two spaces; runs of five or more
/// spaces collapse to one. Existing real newline layout is left intact.
///
/// Empty input yields [`REFLOW_EMPTY`]; text already shorter than one
/// line is not split.
pub fn reflow(text: &str, width: usize) -> String {
    if text.trim().is_empty() {
        return REFLOW_EMPTY.to_string();
    }
    let mut text = text.to_string();
    if !text.trim_matches('\n').contains('\n') {
        text = split_keep(&SPLIT_FLAGS, &text).join("\n");
        text = NUMBERED_MARKER.replace_all(&text, "$1 ").into_owned();
    }
    let segments = segment_lines(&text);
    let wrapped: Vec<String> = segments
        .iter()
        .map(|segment| {
            wrap(segment, width)
                .join("\n")
                .replace("     ", " ")
                .replace(TAB_TOKEN, "  ")
        })
        .collect();
    wrapped.join("\n").trim().to_string()
}

/// Split on real line breaks, tokenizing indentation first so wrapping
/// cannot eat it. Blank segments are dropped.
fn segment_lines(text: &str) -> Vec<String> {
    let tokenized = text
        .replace('\t', TAB_TOKEN)
        .replace("    ", TAB_TOKEN)
        .replace("   ", TAB_TOKEN);
    LINE_BREAKS
        .split(&tokenized)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Greedy word wrap. Words longer than `width` are hard-split so no
/// output line exceeds the requested width.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        for piece in hard_split(word, width) {
            if current.is_empty() {
                current = piece.to_string();
            } else if current.chars().count() + 1 + piece.chars().count() <= width {
                current.push(' ');
                current.push_str(piece);
            } else {
                lines.push(std::mem::take(&mut current));
                current = piece.to_string();
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn hard_split(word: &str, width: usize) -> Vec<&str> {
    if word.chars().count() <= width {
        return vec![word];
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in word.char_indices() {
        if count == width {
            pieces.push(&word[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    pieces.push(&word[start..]);
    pieces
}

/// Split into trimmed, whitespace-normalized segments at real breaks and
/// structural markers. Continuation fragments are merged: a lone `.`
/// joins the previous segment, a bare list marker joins the following
/// one.
pub fn encode_linebreaks(text: &str) -> Vec<String> {
    let mut raw = Vec::new();
    for line in LINE_BREAKS.split(text) {
        for piece in split_keep(&SPLIT_FLAGS, line) {
            let normalized = WHITESPACE_RUN.replace_all(piece.trim(), " ").into_owned();
            if !normalized.is_empty() {
                raw.push(normalized);
            }
        }
    }

    let mut segments: Vec<String> = Vec::with_capacity(raw.len());
    let mut pending_marker: Option<String> = None;
    for segment in raw {
        if segment == "." {
            match segments.last_mut() {
                Some(prev) => prev.push('.'),
                None => segments.push(segment),
            }
            continue;
        }
        if BARE_MARKER.is_match(&segment) {
            pending_marker = Some(segment);
            continue;
        }
        match pending_marker.take() {
            Some(marker) => segments.push(format!("{marker} {segment}")),
            None => segments.push(segment),
        }
    }
    if let Some(marker) = pending_marker {
        segments.push(marker);
    }
    segments
}

/// Reconstruct line breaks from `<lb>` tokens: a break is restored
/// before numbered/bulleted items and around code-block placeholders;
/// every remaining token collapses to a single space.
pub fn restore_linebreaks(text: &str) -> String {
    let mut out = LB_BEFORE_NUMBERED.replace_all(text, "\n$1").into_owned();
    out = LB_BEFORE_BULLET.replace_all(&out, "\n$1").into_owned();
    out = LB_AROUND_CODE.replace_all(&out, "\n$1\n").into_owned();
    out = DOUBLED_ITEM_BREAK.replace_all(&out, "$1").into_owned();
    out = LB_AT_LINE_START.replace_all(&out, "\n").into_owned();
    LB_REMAINING.replace_all(&out, " ").into_owned()
}
