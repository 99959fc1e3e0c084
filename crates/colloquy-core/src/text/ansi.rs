//! ANSI escape repair, removal, and the lossy tag round trip.

use regex::Regex;
use std::sync::LazyLock;

use colloquy_types::palette::{Color, RESET, STYLE_RESET};

/// Fixed repair table for mis-encoded box-drawing/markup sequences
/// (UTF-8 bytes decoded as Latin-1 upstream). Longest entries first so a
/// shorter prefix never shadows a longer sequence.
const ANSI_REPAIRS: [(&str, &str); 3] = [
    ("\u{00e2}\u{2013}\u{00bc}", "\u{25bc}"), // "â–¼" -> "▼"
    ("\u{00e2}\u{2013}\u{201c}", "\u{2013}"), // "â–“" -> "–"
    ("\u{00e2}\u{2013}", "\u{2013}"),         // "â–"  -> "–"
];

static ANSI_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("ansi pattern compiles"));

static ANSI_SINGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[\d+m").expect("ansi single pattern compiles"));

/// Repair mis-encoded escape/box-drawing sequences and normalize doubled
/// backslashes to forward slashes. Idempotent: repaired output contains
/// none of the table's left-hand sequences.
pub fn correct_ansi(text: &str) -> String {
    let mut out = text.to_string();
    for (broken, fixed) in ANSI_REPAIRS {
        out = out.replace(broken, fixed);
    }
    out.replace("\\\\", "/")
}

/// Remove all ANSI color/style sequences.
pub fn strip_colors(text: &str) -> String {
    ANSI_COLOR.replace_all(text, "").into_owned()
}

/// Convert terminal color escapes into bracketed pseudo-tags, tracking a
/// single active color: `\x1b[32mhi\x1b[39m` becomes `<green>hi</green>`.
///
/// The conversion is lossy (nested styles collapse to the innermost
/// color) and tolerant: a reset without an open span, an unknown code, or
/// a span left open at end of input must not corrupt anything that
/// follows -- trailing open spans are flushed, not dropped.
pub fn ansi_to_tag(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut active: Option<Color> = None;
    let mut buffer = String::new();

    let flush = |out: &mut String, active: &mut Option<Color>, buffer: &mut String| {
        if buffer.is_empty() && active.is_none() {
            return;
        }
        match active.take() {
            Some(color) => {
                out.push_str(&format!("<{color}>{buffer}</{color}>"));
            }
            None => out.push_str(buffer),
        }
        buffer.clear();
    };

    for part in super::split_keep(&ANSI_SINGLE, text) {
        if !ANSI_SINGLE.is_match(part) {
            buffer.push_str(part);
            continue;
        }
        if part == RESET || part == STYLE_RESET {
            flush(&mut out, &mut active, &mut buffer);
        } else if let Some(color) = Color::from_code(part) {
            if active != Some(color) {
                flush(&mut out, &mut active, &mut buffer);
                active = Some(color);
            }
        }
        // unknown codes (styles, 256-color) are dropped: lossy by contract
    }
    flush(&mut out, &mut active, &mut buffer);
    out
}

/// Inverse of [`ansi_to_tag`]: replace `<color>`/`</color>` pseudo-tags
/// with the raw escape code and a foreground reset. Lossy round trip --
/// a full-style reset comes back as a plain foreground reset.
pub fn tag_to_ansi(text: &str) -> String {
    let mut out = text.to_string();
    for color in Color::all() {
        out = out.replace(&format!("<{color}>"), color.code());
        out = out.replace(&format!("</{color}>"), RESET);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_types::palette::{GREEN, YELLOW};

    #[test]
    fn test_correct_ansi_repairs_mojibake() {
        assert_eq!(correct_ansi("a\u{00e2}\u{2013}\u{00bc}b"), "a\u{25bc}b");
    }

    #[test]
    fn test_correct_ansi_idempotent() {
        let samples = [
            "plain",
            "a\u{00e2}\u{2013}\u{00bc}b",
            "path\\\\to\\\\file",
            "\u{00e2}\u{2013}\u{201c}",
        ];
        for s in samples {
            let once = correct_ansi(s);
            assert_eq!(correct_ansi(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_correct_ansi_normalizes_backslashes() {
        assert_eq!(correct_ansi("C:\\\\Users\\\\me"), "C:/Users/me");
    }

    #[test]
    fn test_strip_colors() {
        let colored = format!("{GREEN}alice:{RESET} hi");
        assert_eq!(strip_colors(&colored), "alice: hi");
    }

    #[test]
    fn test_ansi_to_tag_single_span() {
        let text = format!("{GREEN}hello{RESET} world");
        assert_eq!(ansi_to_tag(&text), "<green>hello</green> world");
    }

    #[test]
    fn test_ansi_to_tag_color_switch_flushes_span() {
        let text = format!("{GREEN}go{YELLOW}slow{RESET}");
        assert_eq!(ansi_to_tag(&text), "<green>go</green><yellow>slow</yellow>");
    }

    #[test]
    fn test_ansi_to_tag_unterminated_span_is_flushed() {
        let text = format!("{GREEN}dangling");
        assert_eq!(ansi_to_tag(&text), "<green>dangling</green>");
    }

    #[test]
    fn test_ansi_to_tag_stray_reset_is_harmless() {
        let text = format!("plain{RESET} still {GREEN}green{RESET}");
        assert_eq!(ansi_to_tag(&text), "plain still <green>green</green>");
    }

    #[test]
    fn test_tag_roundtrip_is_lossy_but_stable() {
        let original = format!("{GREEN}hello{RESET} world");
        let tagged = ansi_to_tag(&original);
        let back = tag_to_ansi(&tagged);
        assert_eq!(back, original);
        // second trip reproduces the first
        assert_eq!(ansi_to_tag(&back), tagged);
    }
}
