use crate::myst::{Extension, ParseOptions};
use crate::notebook::{KernelSpec, NotebookFormat};
use crate::urls::url_path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the book configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "_config.yml";

/// Directory name that is always excluded from conversion.
pub const BUILD_DIR_NAME: &str = "_build";

/// The parts of a Jupyter Book `_config.yml` this tool reads.
///
/// Unknown keys are ignored.
///
/// # Example
///
/// ```yaml
/// repository:
///   path_to_book: book
/// html:
///   baseurl: https://example.org/course/
/// exclude_patterns: [drafts/**, README.md]
/// parse:
///   myst_enable_extensions: [colon_fence, dollarmath]
/// jupyterlite:
///   remove_remove: false
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BookConfig {
    pub repository: RepositoryConfig,
    pub html: HtmlConfig,
    pub exclude_patterns: Vec<String>,
    pub parse: ParseConfig,
    pub jupyterlite: LiteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Book source directory
    pub path_to_book: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HtmlConfig {
    pub baseurl: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ParseConfig {
    pub myst_enable_extensions: Option<Vec<String>>,
}

/// The `jupyterlite` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiteConfig {
    /// Extension of the source pages to convert
    pub in_nb_ext: String,

    /// Extension of the written notebooks
    pub out_nb_ext: String,

    /// Text notebook format of the source pages
    pub in_nb_fmt: String,

    /// Whether cells tagged with `remove_tag` are dropped
    pub remove_remove: bool,

    pub remove_tag: String,

    pub kernel_name: String,

    pub kernel_display_name: String,

    /// Kernel language; names the browser storage in `jupyter-lite.json`
    pub language: String,
}

impl Default for LiteConfig {
    fn default() -> Self {
        Self {
            in_nb_ext: ".md".to_string(),
            out_nb_ext: ".ipynb".to_string(),
            in_nb_fmt: "myst".to_string(),
            remove_remove: true,
            remove_tag: "remove-cell".to_string(),
            kernel_name: "python".to_string(),
            kernel_display_name: "Python (Pyodide)".to_string(),
            language: "python".to_string(),
        }
    }
}

impl LiteConfig {
    /// Validate the configuration before any file is touched
    pub fn validate(&self) -> Result<()> {
        for (key, ext) in [("in_nb_ext", &self.in_nb_ext), ("out_nb_ext", &self.out_nb_ext)] {
            if !ext.starts_with('.') || ext.len() < 2 {
                anyhow::bail!("{} must be an extension with a leading dot: '{}'", key, ext);
            }
            if ext[1..].contains(['/', '\\']) {
                anyhow::bail!("{} cannot contain path separators: '{}'", key, ext);
            }
        }

        if self.in_nb_fmt != "myst" {
            anyhow::bail!(
                "Unsupported notebook format '{}' (only 'myst' is supported)",
                self.in_nb_fmt
            );
        }

        if self.remove_tag.is_empty() {
            anyhow::bail!("remove_tag cannot be empty");
        }

        if self.kernel_name.is_empty() {
            anyhow::bail!("kernel_name cannot be empty");
        }

        if self.language.is_empty()
            || !self
                .language
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            anyhow::bail!(
                "language may only contain ASCII letters, digits, '_' and '-': '{}'",
                self.language
            );
        }

        Ok(())
    }

    pub fn notebook_format(&self) -> NotebookFormat {
        NotebookFormat::new(&self.in_nb_fmt, &self.in_nb_ext)
    }

    pub fn kernel_spec(&self) -> KernelSpec {
        KernelSpec::new(&self.kernel_name, &self.kernel_display_name)
    }
}

/// Settings for one conversion run, resolved from a [`BookConfig`].
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub input_dir: PathBuf,
    /// URL path of the rendered book, no trailing `/`
    pub base_path: String,
    /// Always ends with `_build`
    pub exclude_patterns: Vec<String>,
    pub parse_options: ParseOptions,
    pub lite: LiteConfig,
}

impl ProcessConfig {
    /// Reads `_config.yml` from `config_dir`.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let book: BookConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Self::from_book_config(book, config_dir)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Resolves `book`; `config_dir` is the book root when
    /// `repository.path_to_book` is unset.
    pub fn from_book_config(book: BookConfig, config_dir: &Path) -> Result<Self> {
        book.jupyterlite
            .validate()
            .context("Invalid jupyterlite configuration")?;

        let input_dir = book
            .repository
            .path_to_book
            .unwrap_or_else(|| config_dir.to_path_buf());

        let mut exclude_patterns = book.exclude_patterns;
        exclude_patterns.push(BUILD_DIR_NAME.to_string());

        let parse_options = match book.parse.myst_enable_extensions {
            Some(names) => ParseOptions::with_extensions(parse_extensions(&names)),
            None => ParseOptions::default(),
        };

        let base_path = url_path(&book.html.baseurl)
            .with_context(|| format!("Invalid html.baseurl '{}'", book.html.baseurl))?;

        Ok(Self {
            input_dir,
            base_path,
            exclude_patterns,
            parse_options,
            lite: book.jupyterlite,
        })
    }
}

fn parse_extensions(names: &[String]) -> Vec<Extension> {
    names
        .iter()
        .filter_map(|name| match name.parse::<Extension>() {
            Ok(ext) => Some(ext),
            Err(e) => {
                log::warn!("Ignoring {}", e);
                None
            }
        })
        .collect()
}
