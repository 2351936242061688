use std::collections::BTreeMap;

use tracing::debug;

use super::language::{classify, LanguageTag};

/// A captured code fragment with its best-guess language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFragment {
    content: String,
    language: LanguageTag,
}

impl TextFragment {
    /// Trim and classify `raw`. Returns `None` when nothing is left after trimming.
    pub fn new(raw: &str) -> Option<Self> {
        let content = raw.trim();
        if content.is_empty() {
            return None;
        }
        Some(TextFragment {
            content: content.to_string(),
            language: classify(content),
        })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn language(&self) -> LanguageTag {
        self.language
    }

    pub fn fenced(&self) -> String {
        fence(self.language, &self.content)
    }
}

pub(crate) fn fence(language: LanguageTag, code: &str) -> String {
    format!("```{}\n{}\n```", language.fence_label(), code)
}

/// Normalize, filter and classify raw captures, keeping discovery order.
/// Duplicates are kept: consumers work by position, not content.
pub fn collect_fragments<S: AsRef<str>>(raw_texts: &[S]) -> Vec<TextFragment> {
    let fragments: Vec<TextFragment> = raw_texts
        .iter()
        .filter_map(|raw| TextFragment::new(raw.as_ref()))
        .collect();

    let mut per_language: BTreeMap<&str, usize> = BTreeMap::new();
    for f in &fragments {
        *per_language.entry(f.language.as_str()).or_default() += 1;
    }
    debug!(
        raw = raw_texts.len(),
        kept = fragments.len(),
        languages = ?per_language,
        "collected code fragments"
    );

    fragments
}

// ── Tests ──
