use std::sync::LazyLock;

use regex::Regex;

use super::assemble::anchor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// "1. Title", "2 Title"
    Numbered,
    /// "Capitalized label:"
    Label,
    /// "OVERVIEW"
    AllCaps,
}

/// Heading patterns in priority order. A line takes the first kind that matches.
static SECTION_PATTERNS: LazyLock<Vec<(Regex, SectionKind)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"^[0-9]+[.\s]+[A-ZÄÖÜ][\w\s\-–:]+$").unwrap(),
            SectionKind::Numbered,
        ),
        (Regex::new(r"^[A-ZÄÖÜ][\w\s\-–]+:$").unwrap(), SectionKind::Label),
        (Regex::new(r"^[A-ZÄÖÜ]{2,}$").unwrap(), SectionKind::AllCaps),
    ]
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMarker {
    pub line_index: usize,
    pub heading_text: String,
    pub kind: SectionKind,
}

impl SectionMarker {
    /// Heading text as rendered, trailing colons removed.
    pub fn title(&self) -> &str {
        self.heading_text.trim_end_matches(':')
    }

    pub fn anchor(&self) -> String {
        anchor(self.title())
    }
}

fn match_heading(line: &str) -> Option<SectionKind> {
    SECTION_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(line))
        .map(|(_, kind)| *kind)
}

/// Scan `text` line by line and return every heading-like line in document order.
pub fn detect_sections(text: &str) -> Vec<SectionMarker> {
    text.split('\n')
        .enumerate()
        .filter_map(|(line_index, raw)| {
            let line = raw.trim();
            if line.is_empty() {
                return None;
            }
            match_heading(line).map(|kind| SectionMarker {
                line_index,
                heading_text: line.to_string(),
                kind,
            })
        })
        .collect()
}

// ── Tests ──
