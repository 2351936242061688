use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageTag {
    Javascript,
    Python,
    Html,
    Css,
    Sql,
    Yaml,
    Cpp,
    Java,
    Unknown,
}

impl LanguageTag {
    pub const ALL: [LanguageTag; 9] = [
        LanguageTag::Javascript,
        LanguageTag::Python,
        LanguageTag::Html,
        LanguageTag::Css,
        LanguageTag::Sql,
        LanguageTag::Yaml,
        LanguageTag::Cpp,
        LanguageTag::Java,
        LanguageTag::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageTag::Javascript => "javascript",
            LanguageTag::Python => "python",
            LanguageTag::Html => "html",
            LanguageTag::Css => "css",
            LanguageTag::Sql => "sql",
            LanguageTag::Yaml => "yaml",
            LanguageTag::Cpp => "cpp",
            LanguageTag::Java => "java",
            LanguageTag::Unknown => "unknown",
        }
    }

    /// Info string written after the opening fence. `Unknown` gets a bare fence.
    pub fn fence_label(&self) -> &'static str {
        match self {
            LanguageTag::Unknown => "",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LanguageTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown language tag: {}", s))
    }
}

/// Ordered (pattern, tag) table. First match wins, so order is part of the contract.
static RULES: LazyLock<Vec<(Regex, LanguageTag)>> = LazyLock::new(|| {
    [
        (
            r"function\s+\w+\s*\(|var\s+\w+\s*=|const\s+\w+\s*=|import\s+.*\s+from|export",
            LanguageTag::Javascript,
        ),
        (r"def\s+\w+\s*\(|import\s+\w+|class\s+\w+:|if\s+.*:", LanguageTag::Python),
        (r"<html|<body|<div|<script|<!DOCTYPE|<head", LanguageTag::Html),
        (r"body\s*\{|margin:|padding:|font-family:|@media", LanguageTag::Css),
        (r"SELECT|INSERT INTO|UPDATE|DELETE FROM|CREATE TABLE", LanguageTag::Sql),
        (
            r"version:|services:|image:|volumes:|environment:|restart:",
            LanguageTag::Yaml,
        ),
        (r"#include|int\s+main|void\s+\w+\s*\(|printf|cout", LanguageTag::Cpp),
        (r"public\s+class|private\s+void|protected|@Override", LanguageTag::Java),
    ]
    .into_iter()
    .map(|(pattern, tag)| (Regex::new(&format!("(?i){}", pattern)).unwrap(), tag))
    .collect()
});

/// Best-guess language of a code fragment. Never fails: no match is `Unknown`.
pub fn classify(text: &str) -> LanguageTag {
    RULES
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, tag)| *tag)
        .unwrap_or(LanguageTag::Unknown)
}

// ── Tests ──
