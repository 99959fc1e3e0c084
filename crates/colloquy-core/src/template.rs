//! Template resolution and rendering.
//!
//! The lookup side is a port (`TemplateSource`); the directory-walking
//! implementation lives in the infra crate. Rendering is plain `{{ key }}`
//! substitution over a merged context, followed by info injection at the
//! `<< infos >>` marker.

use std::collections::BTreeMap;

use colloquy_types::error::TemplateError;

/// Marker replaced by collected system/context info after rendering.
pub const INFO_MARKER: &str = "<< infos >>";

/// Placeholder in an entry-point template where the resolved
/// sub-template body is inlined.
const BODY_KEY: &str = "body";

/// A resolved template pair: the directory entry point plus the named
/// sub-template, either of which may be absent.
#[derive(Debug, Clone, Default)]
pub struct ResolvedTemplate {
    pub entry: Option<String>,
    pub sub: Option<String>,
}

/// Lookup port for template text, keyed by consumer type and template
/// name. Object-safe; sources are shared as `Arc<dyn TemplateSource>`.
pub trait TemplateSource: Send + Sync {
    fn resolve(&self, consumer: &str, name: &str) -> Result<ResolvedTemplate, TemplateError>;
}

/// Resolve and render a template for `consumer`.
///
/// The entry point renders first with the sub-template inlined at
/// `{{ body }}`; when the named template IS the entry point the body slot
/// renders empty instead of recursing. Context keys substitute as
/// `{{ key }}` (spaced or not). Unknown keys are left for the content
/// pipeline to flag downstream.
pub fn render(
    source: &dyn TemplateSource,
    consumer: &str,
    name: &str,
    context: &BTreeMap<String, String>,
) -> Result<String, TemplateError> {
    let resolved = source.resolve(consumer, name)?;
    let (entry, sub) = (resolved.entry, resolved.sub);

    let mut text = match (&entry, &sub) {
        (Some(entry), Some(sub)) if entry == sub => {
            // the name resolved to the entry point itself
            substitute(entry, BODY_KEY, "")
        }
        (Some(entry), Some(sub)) => substitute(entry, BODY_KEY, sub),
        (Some(entry), None) => substitute(entry, BODY_KEY, ""),
        (None, Some(sub)) => sub.clone(),
        (None, None) => {
            return Err(TemplateError::NotFound {
                consumer: consumer.to_string(),
                name: name.to_string(),
            });
        }
    };

    for (key, value) in context {
        text = substitute(&text, key, value);
    }
    Ok(text)
}

fn substitute(text: &str, key: &str, value: &str) -> String {
    text.replace(&format!("{{{{ {key} }}}}"), value)
        .replace(&format!("{{{{{key}}}}}"), value)
}

/// Replace the `<< infos >>` marker with the collected info text.
/// Multiple markers collapse to the last occurrence; a template without
/// the marker gets the info appended at the end.
pub fn inject_infos(text: &str, infos: &str) -> String {
    let occurrences = text.matches(INFO_MARKER).count();
    match occurrences {
        0 => format!("{text}\n{infos}"),
        1 => text.replace(INFO_MARKER, infos),
        n => text
            .replacen(INFO_MARKER, "", n - 1)
            .replace(INFO_MARKER, infos),
    }
}
