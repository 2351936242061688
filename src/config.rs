use std::path::PathBuf;

use ::config::{Config, Environment};
use serde::Deserialize;

use crate::pipeline::assemble::Labels;

const DB_PATH: &str = "data/pagedoc.sqlite";

/// Runtime settings, read from `PAGEDOC_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: PathBuf,
    pub intro: String,
    pub toc_heading: String,
    pub missing_code: String,
    pub default_title: String,
}

impl Default for Settings {
    fn default() -> Self {
        let labels = Labels::default();
        Settings {
            db_path: PathBuf::from(DB_PATH),
            intro: labels.intro,
            toc_heading: labels.toc_heading,
            missing_code: labels.missing_code,
            default_title: labels.default_title,
        }
    }
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_config(
            Config::builder()
                .add_source(Environment::with_prefix("PAGEDOC"))
                .build()?,
        )
    }

    fn from_config(cfg: Config) -> anyhow::Result<Self> {
        Ok(cfg.try_deserialize()?)
    }

    pub fn labels(&self) -> Labels {
        Labels {
            intro: self.intro.clone(),
            toc_heading: self.toc_heading.clone(),
            missing_code: self.missing_code.clone(),
            default_title: self.default_title.clone(),
        }
    }
}

// ── Tests ──
