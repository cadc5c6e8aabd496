use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE_NAME: &str = "jupyter-lite.json";

/// The `jupyter-lite.json` file written next to the notebooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteManifest {
    #[serde(rename = "jupyter-lite-schema-version")]
    pub schema_version: u32,

    #[serde(rename = "jupyter-config-data")]
    pub config_data: LiteConfigData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiteConfigData {
    /// Browser storage the notebooks are kept in
    pub contents_storage_name: String,
}

impl LiteManifest {
    pub fn for_language(language: &str) -> Self {
        Self {
            schema_version: 0,
            config_data: LiteConfigData {
                contents_storage_name: format!("rss-{}", language),
            },
        }
    }

    /// Writes the manifest into `output_dir` and returns its path.
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(MANIFEST_FILE_NAME);
        let mut contents =
            serde_json::to_string_pretty(self).context("Failed to serialize manifest")?;
        contents.push('\n');
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
