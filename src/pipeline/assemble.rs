use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::fragments::{fence, TextFragment};
use super::language::classify;
use super::sections::SectionMarker;

static EXCESS_BLANKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{4,}").unwrap());

/// Prose line that stands in for a folded code block on the page.
pub const PLACEHOLDER_MARKER: &str = "click to open code";
/// Fewer detected sections than this is treated as noise: no table of contents.
pub const TOC_MIN_SECTIONS: usize = 3;

const CODE_RUN_KEYWORDS: &[&str] = &["def ", "import ", "class "];
const SUMMARY_WINDOW: usize = 10;
const SUMMARY_MIN_CHARS: usize = 20;
const SUMMARY_MAX_LINES: usize = 3;

/// Fixed prose written around the generated content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub intro: String,
    pub toc_heading: String,
    pub missing_code: String,
    pub default_title: String,
}

impl Default for Labels {
    fn default() -> Self {
        Labels {
            intro: "Hier findest du das vollständige Proof-of-Concept als Markdown-Dokument mit korrekt eingerücktem Code:".to_string(),
            toc_heading: "Inhaltsverzeichnis".to_string(),
            missing_code: "`Kein Code gefunden`".to_string(),
            default_title: "Extrahierter Inhalt".to_string(),
        }
    }
}

/// What happened to the fragment pool and the in-prose code runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    /// Fragments placed at a placeholder.
    pub inlined: usize,
    /// Fragments no placeholder asked for, appended after the body.
    pub appended: usize,
    /// Placeholders left without a fragment.
    pub missing: usize,
    /// In-prose code runs rendered as fenced blocks.
    pub code_runs: usize,
    /// In-prose code runs cut off by the end of the text.
    pub dropped_runs: usize,
}

#[derive(Debug, Clone)]
pub struct Assembled {
    pub markdown: String,
    pub stats: AssemblyStats,
}

/// Pass-1 output. Placeholders stay typed until pass 2 so prose can never
/// be mistaken for one.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BodyLine {
    Text(String),
    Placeholder,
}

/// Build the final markdown document.
///
/// Every fragment ends up in the output exactly once: either at a placeholder
/// (in pool order) or appended after the body (also in pool order).
pub fn assemble(
    title: &str,
    body_text: &str,
    fragments: &[TextFragment],
    sections: &[SectionMarker],
    labels: &Labels,
) -> Assembled {
    let mut stats = AssemblyStats::default();

    let rewritten = rewrite_structure(body_text, sections, &mut stats);
    let (body, consumed) = resolve_placeholders(rewritten, fragments, labels, &mut stats);

    let mut md = String::new();
    md.push_str(&labels.intro);
    md.push_str("\n\n---\n\n");
    md.push_str(&format!("# {}\n\n", title));

    let summary = summarize(body_text);
    if !summary.is_empty() {
        md.push_str(&summary);
        md.push_str("\n\n");
    }
    md.push_str("---\n\n");

    if sections.len() >= TOC_MIN_SECTIONS {
        md.push_str(&table_of_contents(sections, &labels.toc_heading));
        md.push_str("\n---\n\n");
    }

    md.push_str(&body.join("\n"));

    for fragment in &fragments[consumed..] {
        md.push_str("\n\n");
        md.push_str(&fragment.fenced());
        stats.appended += 1;
    }

    md.push_str("\n\n---");

    debug!(
        sections = sections.len(),
        fragments = fragments.len(),
        inlined = stats.inlined,
        appended = stats.appended,
        missing = stats.missing,
        code_runs = stats.code_runs,
        "assembled document"
    );

    Assembled {
        markdown: normalize_blank_lines(&md),
        stats,
    }
}

/// Pass 1: headings, placeholders and in-prose code runs.
fn rewrite_structure(
    body_text: &str,
    sections: &[SectionMarker],
    stats: &mut AssemblyStats,
) -> Vec<BodyLine> {
    let by_line: HashMap<usize, &SectionMarker> =
        sections.iter().map(|s| (s.line_index, s)).collect();

    let mut out = Vec::new();
    let mut run: Option<Vec<&str>> = None;

    for (i, line) in body_text.split('\n').enumerate() {
        if let Some(section) = by_line.get(&i) {
            out.push(BodyLine::Text(format!("## {}", section.title())));
            out.push(BodyLine::Text(String::new()));
            continue;
        }

        if line.to_lowercase().contains(PLACEHOLDER_MARKER) {
            out.push(BodyLine::Placeholder);
            continue;
        }

        if let Some(mut buf) = run.take() {
            if line.trim().is_empty() {
                let code = buf.join("\n");
                out.push(BodyLine::Text(fence(classify(&code), &code)));
                out.push(BodyLine::Text(String::new()));
                stats.code_runs += 1;
            } else {
                buf.push(line);
                run = Some(buf);
            }
            continue;
        }

        if starts_code_run(line) {
            run = Some(vec![line]);
            continue;
        }

        out.push(BodyLine::Text(line.to_string()));
    }

    // A run needs a closing blank line; one cut off by end of text is not emitted.
    if let Some(buf) = run {
        warn!(lines = buf.len(), "dropping unterminated code run at end of text");
        stats.dropped_runs += 1;
    }

    out
}

fn starts_code_run(line: &str) -> bool {
    let trimmed = line.trim();
    CODE_RUN_KEYWORDS.iter().any(|kw| trimmed.starts_with(kw))
}

/// Pass 2: fill placeholders from the front of the pool. Returns the rendered
/// lines and how many fragments were consumed.
fn resolve_placeholders(
    lines: Vec<BodyLine>,
    fragments: &[TextFragment],
    labels: &Labels,
    stats: &mut AssemblyStats,
) -> (Vec<String>, usize) {
    let mut cursor = 0;
    let mut out = Vec::with_capacity(lines.len());

    for line in lines {
        match line {
            BodyLine::Text(text) => out.push(text),
            BodyLine::Placeholder => match fragments.get(cursor) {
                Some(fragment) => {
                    out.push(fragment.fenced());
                    out.push(String::new());
                    cursor += 1;
                    stats.inlined += 1;
                }
                None => {
                    out.push(labels.missing_code.clone());
                    stats.missing += 1;
                }
            },
        }
    }

    (out, cursor)
}

/// First few substantial lines near the top of the page, joined into one paragraph.
fn summarize(body_text: &str) -> String {
    body_text
        .split('\n')
        .take(SUMMARY_WINDOW)
        .map(str::trim)
        .filter(|line| line.chars().count() > SUMMARY_MIN_CHARS)
        .take(SUMMARY_MAX_LINES)
        .collect::<Vec<_>>()
        .join(" ")
}

fn table_of_contents(sections: &[SectionMarker], heading: &str) -> String {
    let mut toc = format!("## {}\n\n", heading);
    for (idx, section) in sections.iter().enumerate() {
        toc.push_str(&format!(
            "{}. [{}](#{})\n",
            idx + 1,
            section.title(),
            section.anchor()
        ));
    }
    toc
}

/// Link anchor for a heading: lower-cased, spaces to hyphens, anything
/// outside `[a-z0-9-]` removed. Equal headings produce equal anchors.
pub fn anchor(heading: &str) -> String {
    heading
        .to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Collapse every run of four or more newlines to three (two blank lines).
pub fn normalize_blank_lines(text: &str) -> String {
    EXCESS_BLANKS_RE.replace_all(text, "\n\n\n").into_owned()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fragments::collect_fragments;
    use crate::pipeline::language::LanguageTag;
    use crate::pipeline::sections::detect_sections;

    fn build(body: &str, raw_fragments: &[&str]) -> Assembled {
        let fragments = collect_fragments(raw_fragments);
        let sections = detect_sections(body);
        assemble("Titel", body, &fragments, &sections, &Labels::default())
    }

    fn fence_count(md: &str) -> usize {
        md.lines().filter(|l| l.starts_with("```")).count() / 2
    }

    #[test]
    fn in_prose_python_run() {
        let doc = build("def foo():\n    return 1\n\nEnde.", &[]);
        assert!(doc
            .markdown
            .contains("```python\ndef foo():\n    return 1\n```\n\nEnde."));
        assert_eq!(doc.stats.code_runs, 1);
        // run lines are not repeated as prose
        assert_eq!(doc.markdown.matches("return 1").count(), 1);
    }

    #[test]
    fn placeholder_takes_fragment() {
        let doc = build("Intro\nclick to open code\nOutro", &["SELECT * FROM t"]);
        assert!(doc.markdown.contains("```sql\nSELECT * FROM t\n```"));
        assert_eq!(fence_count(&doc.markdown), 1);
        assert_eq!(doc.stats.inlined, 1);
        assert_eq!(doc.stats.appended, 0);
        assert!(!doc.markdown.contains("click to open code"));
    }

    #[test]
    fn placeholder_marker_is_case_insensitive() {
        let doc = build("Click To Open Code >", &["x = 1"]);
        assert_eq!(doc.stats.inlined, 1);
    }

    #[test]
    fn empty_pool_gives_missing_marker() {
        let doc = build("Text\nclick to open code\nMore", &[]);
        assert!(doc.markdown.contains("`Kein Code gefunden`"));
        assert_eq!(doc.stats.missing, 1);
        assert_eq!(fence_count(&doc.markdown), 0);
    }

    #[test]
    fn toc_with_four_all_caps_headings() {
        let body = "INSTALLATION\ntext a\nKONFIGURATION\ntext b\nBETRIEB\ntext c\nFAQ\ntext d";
        let doc = build(body, &[]);
        let md = &doc.markdown;
        assert!(md.contains("## Inhaltsverzeichnis"));
        assert!(md.contains("1. [INSTALLATION](#installation)\n"));
        assert!(md.contains("2. [KONFIGURATION](#konfiguration)\n"));
        assert!(md.contains("3. [BETRIEB](#betrieb)\n"));
        assert!(md.contains("4. [FAQ](#faq)\n"));
        assert!(md.contains("## FAQ\n\ntext d"));
    }

    #[test]
    fn no_toc_with_two_sections() {
        let body = "SETUP\nfoo\nUsage:\nbar";
        let doc = build(body, &[]);
        assert!(!doc.markdown.contains("Inhaltsverzeichnis"));
        assert!(doc.markdown.contains("## SETUP\n"));
        assert!(doc.markdown.contains("## Usage\n"));
        assert!(!doc.markdown.contains("Usage:"));
    }

    #[test]
    fn leftover_fragments_appended_in_order() {
        let doc = build(
            "one\nclick to open code\ntwo",
            &["const a = 1;", "SELECT 1", "#include <x>"],
        );
        let md = &doc.markdown;
        let a = md.find("const a = 1;").unwrap();
        let b = md.find("SELECT 1").unwrap();
        let c = md.find("#include <x>").unwrap();
        assert!(a < b && b < c);
        assert!(a < md.find("two").unwrap());
        assert!(b > md.find("two").unwrap());
        assert_eq!(doc.stats.inlined, 1);
        assert_eq!(doc.stats.appended, 2);
        assert_eq!(fence_count(md), 3);
        assert!(md.ends_with("```cpp\n#include <x>\n```\n\n---"));
    }

    #[test]
    fn every_fragment_appears_once() {
        let raw = ["a1 = 1", "b2 = 2", "c3 = 3", "d4 = 4"];
        for placeholders in 0..6 {
            let body = vec!["click to open code"; placeholders].join("\nprose\n");
            let doc = build(&body, &raw);
            for r in raw {
                assert_eq!(doc.markdown.matches(r).count(), 1, "{} with {}", r, placeholders);
            }
            assert_eq!(doc.stats.inlined + doc.stats.appended, raw.len());
            assert_eq!(doc.stats.missing, placeholders.saturating_sub(raw.len()));
        }
    }

    #[test]
    fn unterminated_run_is_dropped() {
        let doc = build("Vorher\nimport os\nprint(os.name)", &[]);
        assert!(!doc.markdown.contains("import os"));
        assert!(!doc.markdown.contains("print(os.name)"));
        assert!(doc.markdown.contains("Vorher"));
        assert_eq!(doc.stats.dropped_runs, 1);
        assert_eq!(doc.stats.code_runs, 0);
    }

    #[test]
    fn placeholder_inside_code_run_still_resolves() {
        let doc = build("class Foo:\nclick to open code\n    pass\n\nend", &["SELECT 2"]);
        assert_eq!(doc.stats.inlined, 1);
        assert!(doc.markdown.contains("```python\nclass Foo:\n    pass\n```"));
    }

    #[test]
    fn placeholder_token_text_is_plain_prose() {
        let doc = build("<<<CODE_BLOCK_PLACEHOLDER>>>", &["SELECT 3"]);
        assert!(doc.markdown.contains("<<<CODE_BLOCK_PLACEHOLDER>>>"));
        assert_eq!(doc.stats.inlined, 0);
        assert_eq!(doc.stats.appended, 1);
    }

    #[test]
    fn summary_uses_long_lines_from_top() {
        let body = "short\nThis line is definitely long enough.\nAnd this second one is long too.\nx\nThird line that also qualifies here.\nFourth long line should be left out.";
        let doc = build(body, &[]);
        assert!(doc.markdown.contains(
            "# Titel\n\nThis line is definitely long enough. And this second one is long too. Third line that also qualifies here.\n\n---"
        ));
    }

    #[test]
    fn summary_only_looks_at_first_ten_lines() {
        let body = format!("{}A very long line that comes far too late.", "x\n".repeat(10));
        let doc = build(&body, &[]);
        assert!(doc.markdown.contains("# Titel\n\n---"));
    }

    #[test]
    fn empty_input_is_minimal_document() {
        let doc = build("", &[]);
        let md = &doc.markdown;
        assert!(md.starts_with("Hier findest du"));
        assert!(md.contains("# Titel\n\n---\n\n"));
        assert!(md.ends_with("\n\n---"));
        assert_eq!(fence_count(md), 0);
    }

    #[test]
    fn anchors() {
        assert_eq!(anchor("Docker Compose Setup"), "docker-compose-setup");
        assert_eq!(anchor("Über uns"), "ber-uns");
        assert_eq!(anchor("1. Intro (v2)"), "1-intro-v2");
    }

    #[test]
    fn duplicate_headings_share_anchor() {
        let body = "SETUP\na\nSETUP\nb\nSETUP\nc";
        let doc = build(body, &[]);
        assert_eq!(doc.markdown.matches("(#setup)").count(), 3);
    }

    #[test]
    fn blank_line_normalization() {
        assert_eq!(normalize_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
        assert_eq!(normalize_blank_lines("a\n\n\nb"), "a\n\n\nb");
        let once = normalize_blank_lines("x\n\n\n\n\ny\n\n\n\n\n\n\n\nz");
        assert_eq!(normalize_blank_lines(&once), once);
    }

    #[test]
    fn output_has_no_long_blank_runs() {
        let doc = build("a\n\n\n\n\n\n\nb", &[]);
        assert!(!doc.markdown.contains("\n\n\n\n"));
    }

    #[test]
    fn unknown_language_gets_bare_fence() {
        let doc = build("click to open code", &["just words"]);
        assert!(doc.markdown.contains("```\njust words\n```"));
        assert_eq!(collect_fragments(&["just words"])[0].language(), LanguageTag::Unknown);
    }
}
