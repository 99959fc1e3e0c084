//! Tag redaction/reveal and speaker-name stripping.

use regex::Regex;

use colloquy_types::palette::{RESET, STYLE_RESET};
use colloquy_types::tag::{builtin_tags, tag_spec, TagSpec};

/// Placeholder protecting an `@name` addressing token while the plain
/// name is stripped from the front of the text.
const ADDR_TOKEN: &str = "<addr_match>";

/// Wrap `text` in its tag's start/end markers plus color.
///
/// Only instructs units are tagged; everything else passes through. With
/// tags disabled a generic prose prefix is used instead of markers. An
/// unset tag defaults to `instructs`; unknown tags get the
/// `<{tag}_info>` fallback pair.
pub fn add_tags(text: &str, tag: Option<&str>, is_instructs: bool, use_tags: bool) -> String {
    if !is_instructs {
        return text.to_string();
    }
    let tag = tag.filter(|t| !t.is_empty()).unwrap_or("instructs");
    if !use_tags {
        return format!("Here are some infos about the {tag}:\n {text}\n");
    }
    let spec = tag_spec(tag).unwrap_or_else(|| TagSpec::fallback(tag));
    format!(
        "{color}{start}{RESET}{STYLE_RESET}\n{text}\n{color}{end}{RESET}{STYLE_RESET}",
        color = spec.color,
        start = spec.start,
        end = spec.end,
    )
}

/// Redact every known tag span according to `verbosity`:
/// 0 removes the span, 1 leaves a colored inline `start...end`, and 2 or
/// higher leaves a newline-padded `start...end` block. Spans match
/// non-greedily across multiple lines.
pub fn hide_tags(text: &str, verbosity: u8) -> String {
    let mut out = text.to_string();
    for (_, spec) in builtin_tags() {
        let replacement = match verbosity {
            0 => String::new(),
            1 => format!("{}{}...{}{RESET}", spec.color, spec.start, spec.end),
            _ => format!("\n{}{}...{}{RESET}\n", spec.color, spec.start, spec.end),
        };
        let pattern = format!(
            "(?s){}.*?{}",
            regex::escape(&spec.start),
            regex::escape(&spec.end)
        );
        let re = Regex::new(&pattern).expect("tag span pattern compiles");
        out = re.replace_all(&out, replacement.as_str()).into_owned();
    }
    out
}

/// Strip a leading self-announcement of `name` (plain or colorized, with
/// optional `:` and surrounding punctuation) from the front of `text`.
///
/// An `@name` addressing token at the same position is deliberately
/// preserved: it is substituted away before stripping and restored
/// afterwards.
pub fn strip_speaker_name(text: &str, name: &str) -> String {
    let escaped = regex::escape(&name.to_lowercase());
    let mut out = text.to_string();

    let addr_re = Regex::new(&format!(r"(?i)(\W*)(@{escaped}:?)\s*"))
        .expect("address pattern compiles");
    let addressed = addr_re
        .captures(&out)
        .map(|c| (c[0].to_string(), c[2].to_string()));
    if let Some((whole, _)) = &addressed {
        out = out.replace(whole.as_str(), ADDR_TOKEN);
    }

    // colorized announcements carry escape codes between punctuation and
    // the name, so the boundary class accepts ANSI sequences too
    let name_re = Regex::new(&format!(
        r"(?i)^(?:\x1b\[[0-9;]*m|\W)*{escaped}(?:\x1b\[[0-9;]*m|\W)*"
    ))
    .expect("name pattern compiles");
    loop {
        let replaced = name_re.replace(&out, "").into_owned();
        if replaced == out {
            break;
        }
        out = replaced;
    }

    if let Some((_, token)) = addressed {
        let restored = format!("{} ", token.trim());
        out = out.replace(ADDR_TOKEN, &restored);
        // the leading '<' may have been consumed by the strip above
        out = out.replace("addr_match>", &restored);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_types::palette::{CYAN, GREEN};

    #[test]
    fn test_add_tags_passthrough_for_plain_text() {
        assert_eq!(add_tags("body", Some("chat"), false, true), "body");
    }

    #[test]
    fn test_add_tags_wraps_known_tag() {
        let out = add_tags("do this", Some("instructs"), true, true);
        assert!(out.contains("<INST>"));
        assert!(out.contains("</INST>"));
        assert!(out.contains(CYAN));
        assert!(out.contains("do this"));
    }

    #[test]
    fn test_add_tags_generic_prefix_when_disabled() {
        let out = add_tags("facts", Some("project"), true, false);
        assert!(out.starts_with("Here are some infos about the project:"));
        assert!(!out.contains("<project_info>"));
    }

    #[test]
    fn test_add_tags_unknown_tag_fallback() {
        let out = add_tags("x", Some("kernel"), true, true);
        assert!(out.contains("<kernel_info>"));
        assert!(out.contains("</kernel_info>"));
    }

    #[test]
    fn test_hide_tags_verbosity_zero_removes_span() {
        let text = "keep <chat_info>secret\nstuff</chat_info> this";
        let out = hide_tags(text, 0);
        assert!(!out.contains("secret"));
        assert!(out.contains("keep"));
        assert!(out.contains("this"));
    }

    #[test]
    fn test_hide_tags_matches_across_lines_non_greedily() {
        let text = "<chat_info>a</chat_info> mid <chat_info>b</chat_info>";
        let out = hide_tags(text, 0);
        assert!(out.contains("mid"), "greedy match swallowed text: {out:?}");
    }

    #[test]
    fn test_hide_tags_visibility_is_monotone() {
        let text = "pre <INST>span one\nspan two</INST> post";
        let v0 = hide_tags(text, 0).len();
        let v1 = hide_tags(text, 1).len();
        let v2 = hide_tags(text, 2).len();
        assert!(v0 <= v1, "v0={v0} v1={v1}");
        assert!(v1 <= v2, "v1={v1} v2={v2}");
    }

    #[test]
    fn test_strip_speaker_name_removes_plain_prefix() {
        assert_eq!(strip_speaker_name("alice: hi", "alice"), "hi");
    }

    #[test]
    fn test_strip_speaker_name_preserves_addressing() {
        assert_eq!(strip_speaker_name("@alice: hi", "alice"), "@alice: hi");
    }

    #[test]
    fn test_strip_speaker_name_removes_colorized_prefix() {
        let text = format!("{GREEN}alice:{RESET} hi");
        assert_eq!(strip_speaker_name(&text, "alice"), "hi");
    }

    #[test]
    fn test_strip_speaker_name_ignores_other_names() {
        assert_eq!(strip_speaker_name("bob: hi", "alice"), "bob: hi");
    }
}
