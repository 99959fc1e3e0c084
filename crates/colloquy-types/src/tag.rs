//! The tag markup table.
//!
//! Named tags map to a `(start, end, color)` marker triple used to wrap
//! instructional/contextual spans in rendered text. Markers nest
//! non-overlappingly within one rendered unit. Unknown tags get a
//! `<{name}_info>` fallback pair in DIM.

use crate::palette::{BLUE, CYAN, DIM};

/// One named tag: start/end delimiters plus the ANSI color used when
/// rendering them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpec {
    pub start: String,
    pub end: String,
    pub color: &'static str,
}

impl TagSpec {
    fn new(start: &str, end: &str, color: &'static str) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
            color,
        }
    }

    /// Fallback spec for a tag name with no table entry.
    pub fn fallback(name: &str) -> Self {
        Self {
            start: format!("<{name}_info>"),
            end: format!("</{name}_info>"),
            color: DIM,
        }
    }
}

/// Built-in tag table, in stable iteration order.
pub fn builtin_tags() -> Vec<(&'static str, TagSpec)> {
    vec![
        ("general", TagSpec::new("<general_info>", "</general_info>", BLUE)),
        ("chat", TagSpec::new("<chat_info>", "</chat_info>", BLUE)),
        ("expert", TagSpec::new("<expert_info>", "</expert_info>", BLUE)),
        ("instructs", TagSpec::new("<INST>", "</INST>", CYAN)),
        ("system", TagSpec::new("<system_info>", "</system_info>", CYAN)),
        ("project", TagSpec::new("<project_info>", "</project_info>", BLUE)),
        ("network", TagSpec::new("<network_info>", "</network_info>", CYAN)),
        ("docker", TagSpec::new("<docker_info>", "</docker_info>", CYAN)),
    ]
}

/// Look up a tag by name; `None` for unknown tags (callers decide whether
/// to use [`TagSpec::fallback`]).
pub fn tag_spec(name: &str) -> Option<TagSpec> {
    builtin_tags()
        .into_iter()
        .find(|(n, _)| *n == name)
        .map(|(_, spec)| spec)
}
