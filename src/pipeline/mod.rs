pub mod assemble;
pub mod fragments;
pub mod language;
pub mod sections;

use serde::{Deserialize, Serialize};

use assemble::{AssemblyStats, Labels};

/// Everything captured from a rendered page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInput {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "bodyText")]
    pub body_text: String,
    #[serde(default)]
    pub fragments: Vec<String>,
    /// Source address, kept for the archive only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PipelineInput {
    pub fn from_page_parts(
        title: impl Into<String>,
        body_text: impl Into<String>,
        fragments: Vec<String>,
    ) -> Self {
        PipelineInput {
            title: title.into(),
            body_text: body_text.into(),
            fragments,
            url: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub title: String,
    pub markdown: String,
    pub section_count: usize,
    pub fragment_count: usize,
    pub stats: AssemblyStats,
}

/// Pipeline: fragments and sections are derived independently, then merged.
pub fn render(input: &PipelineInput, labels: &Labels) -> RenderedDocument {
    let title = match input.title.trim() {
        "" => labels.default_title.clone(),
        t => t.to_string(),
    };
    let fragments = fragments::collect_fragments(&input.fragments);
    let sections = sections::detect_sections(&input.body_text);
    let assembled = assemble::assemble(&title, &input.body_text, &fragments, &sections, labels);

    RenderedDocument {
        title,
        markdown: assembled.markdown,
        section_count: sections.len(),
        fragment_count: fragments.len(),
        stats: assembled.stats,
    }
}

// ── Tests ──
