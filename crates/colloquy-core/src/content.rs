//! Content units: a body paired with optional instructions, with fenced
//! code blocks quarantined away from the reflow pipeline.
//!
//! Code fences are extracted at construction and parked in a placeholder
//! table so reflow can never mangle them; render re-substitutes them, and
//! a placeholder without a table entry fails loudly.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use colloquy_types::config::{INNER_WIDTH, TABLE_WIDTH};
use colloquy_types::error::TextError;
use colloquy_types::palette::{BLUE, CYAN, RESET};

use crate::text;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(\w*)(.*?)```").expect("fence pattern compiles"));

/// How a content unit is rendered for display or transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Decolorized and reflowed -- what the backend sees.
    Plain,
    /// Color escapes converted to bracketed pseudo-tags.
    Colored,
    /// Reflowed with color escapes intact -- what the terminal shows.
    Pretty,
}

/// One quarantined fenced code block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: String,
    /// Body reflowed to the inner width with ` \` continuation markers
    /// and comment-prefix preservation, so wrapped code stays
    /// recoverable.
    pub body: String,
}

/// Rendered projection of a content unit.
#[derive(Debug, Clone, Default)]
pub struct ContentParts {
    pub instructs: Option<String>,
    pub code_blocks: BTreeMap<String, String>,
    pub text: Option<String>,
}

/// A body plus optional instructions, with protected code blocks.
///
/// `text = None` is legal only transiently while interactive input is
/// being solicited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    pub text: Option<String>,
    pub instructs: Option<String>,
    pub tag: Option<String>,
    code_blocks: BTreeMap<String, CodeBlock>,
}

impl Content {
    /// Build a unit from raw text and optional instructions. Both fields
    /// go through ANSI repair and code-block extraction; instructions
    /// default their tag to `general`.
    pub fn new(text: Option<&str>, instructs: Option<&str>, tag: Option<&str>) -> Self {
        let mut unit = Self {
            tag: tag.map(str::to_string),
            ..Self::default()
        };
        if let Some(text) = text {
            unit.text = Some(unit.quarantine_code(&text::correct_ansi(text)));
        }
        if let Some(instructs) = instructs {
            unit.instructs = Some(unit.quarantine_code(&text::correct_ansi(instructs)));
            if unit.tag.is_none() {
                unit.tag = Some("general".to_string());
            }
        }
        unit
    }

    /// Unit with only a body.
    pub fn from_text(text: &str) -> Self {
        Self::new(Some(text), None, None)
    }

    /// Whether this unit carries instructions (and is therefore tagged
    /// when rendered).
    pub fn is_instructs(&self) -> bool {
        self.instructs.as_deref().is_some_and(|i| !i.is_empty())
    }

    /// Replace the body after soliciting interactive input.
    pub fn set_text(&mut self, text: &str) {
        self.text = Some(self.quarantine_code(&text::correct_ansi(text)));
    }

    /// The quarantined code blocks, keyed by placeholder.
    pub fn code_blocks(&self) -> &BTreeMap<String, CodeBlock> {
        &self.code_blocks
    }

    /// Extract fenced code blocks, wrap their lines recoverably, and
    /// substitute `<code_block_N>` placeholders into the text. Keys are
    /// unique and monotonically indexed per unit.
    fn quarantine_code(&mut self, text: &str) -> String {
        let mut out = text.to_string();
        let matches: Vec<(String, String)> = CODE_FENCE
            .captures_iter(text)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .collect();
        for (language, code) in matches {
            let key = format!("<code_block_{}>", self.code_blocks.len());
            let fenced = format!("```{language}{code}```");
            out = out.replacen(&fenced, &key, 1);
            self.code_blocks.insert(
                key,
                CodeBlock {
                    body: wrap_code(&code),
                    language,
                },
            );
        }
        out
    }

    /// Render one field through the transform pipeline.
    fn render_field(field: &str, mode: RenderMode) -> String {
        match mode {
            RenderMode::Plain => text::reflow(&text::strip_colors(field), TABLE_WIDTH),
            RenderMode::Colored => text::ansi_to_tag(field),
            RenderMode::Pretty => text::reflow(field, TABLE_WIDTH),
        }
    }

    /// Rendered projection of all three fields. Instructions are tag
    /// wrapped; code blocks keep their placeholder keys. Empty fields are
    /// dropped rather than rendered as the reflow sentinel.
    pub fn to_parts(&self, mode: RenderMode, use_tags: bool) -> ContentParts {
        ContentParts {
            instructs: self
                .instructs
                .as_deref()
                .filter(|i| !i.trim().is_empty())
                .map(|instructs| {
                    text::add_tags(
                        &Self::render_field(instructs, mode),
                        self.tag.as_deref(),
                        self.is_instructs(),
                        use_tags,
                    )
                }),
            code_blocks: self
                .code_blocks
                .iter()
                .map(|(key, block)| (key.clone(), render_code(block, mode)))
                .collect(),
            text: self
                .text
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .map(|t| Self::render_field(t, mode)),
        }
    }

    /// Final single-string rendering with every code placeholder
    /// re-substituted. Zero placeholders may leak; a placeholder with no
    /// table entry is an invariant violation and fails loudly.
    pub fn render(&self, mode: RenderMode, use_tags: bool) -> Result<String, TextError> {
        let parts = self.to_parts(mode, use_tags);
        let mut fields = Vec::new();
        for field in [parts.instructs, parts.text].into_iter().flatten() {
            let mut field = field;
            for (key, rendered) in &parts.code_blocks {
                field = field.replace(key.as_str(), rendered);
            }
            if let Some(leak) = crate::text::placeholder_leak(&field) {
                return Err(TextError::UnresolvedPlaceholder(leak));
            }
            fields.push(field);
        }
        Ok(format!(" {}\n", fields.join("\n")))
    }
}

/// Wrap each code line to the inner width. Continuation pieces get a
/// trailing ` \` on the line before them and inherit the first piece's
/// leading space/comment prefix, so unwrapping is mechanical.
fn wrap_code(code: &str) -> String {
    static PREFIX: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[ #]*").expect("prefix pattern compiles"));
    let mut wrapped_lines = Vec::new();
    for line in code.split('\n') {
        let mut pieces = wrap_preserving(line, INNER_WIDTH);
        if pieces.len() > 1 {
            let prefix = PREFIX
                .find(&pieces[0])
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let last = pieces.len() - 1;
            for (i, piece) in pieces.iter_mut().enumerate() {
                if i < last {
                    piece.push_str(" \\");
                }
                if i > 0 && !piece.starts_with(&prefix) {
                    *piece = format!("{prefix}{piece}");
                }
            }
        }
        wrapped_lines.push(pieces.join("\n"));
    }
    wrapped_lines.join("\n")
}

/// Word wrap that keeps the line's leading indentation on the first
/// piece instead of eating it.
fn wrap_preserving(line: &str, width: usize) -> Vec<String> {
    if line.chars().count() <= width {
        return vec![line.to_string()];
    }
    let indent_len = line.len() - line.trim_start().len();
    let indent = &line[..indent_len];
    let mut pieces = Vec::new();
    let mut current = indent.to_string();
    for word in line.trim_start().split(' ') {
        if current.trim_end().is_empty() || current.chars().count() + 1 + word.chars().count() <= width
        {
            if !current.is_empty() && !current.ends_with(' ') && !current.trim_end().is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        } else {
            pieces.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    if pieces.is_empty() {
        pieces.push(String::new());
    }
    pieces
}

fn render_code(block: &CodeBlock, mode: RenderMode) -> String {
    match mode {
        RenderMode::Plain => format!("{}\n{}", block.language, block.body),
        RenderMode::Colored | RenderMode::Pretty => format!(
            "{BLUE}{}{RESET}\n{CYAN}{}{RESET}",
            block.language, block.body
        ),
    }
}
