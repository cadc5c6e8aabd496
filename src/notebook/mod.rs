//! In-memory notebook model and the codecs that read and write it.

mod ipynb;
mod myst;

pub use ipynb::{to_ipynb_string, write_ipynb};
pub use myst::{read, NotebookFormat};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Markdown,
    Code,
    Raw,
}

/// One notebook cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub cell_type: CellType,
    pub source: String,
    pub metadata: Map<String, Value>,
}

impl Cell {
    pub fn new(cell_type: CellType, source: impl Into<String>) -> Self {
        Self {
            cell_type,
            source: source.into(),
            metadata: Map::new(),
        }
    }

    pub fn markdown(source: impl Into<String>) -> Self {
        Self::new(CellType::Markdown, source)
    }

    pub fn code(source: impl Into<String>) -> Self {
        Self::new(CellType::Code, source)
    }

    pub fn with_tags<'t>(mut self, tags: impl IntoIterator<Item = &'t str>) -> Self {
        let tags = tags
            .into_iter()
            .map(|t| Value::String(t.to_string()))
            .collect();
        self.metadata.insert("tags".to_string(), Value::Array(tags));
        self
    }

    /// Tags from `metadata.tags`; non-string entries are ignored.
    pub fn tags(&self) -> Vec<&str> {
        match self.metadata.get("tags") {
            Some(Value::Array(tags)) => tags.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().contains(&tag)
    }
}

/// Runtime a notebook should be opened with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelSpec {
    pub name: String,
    pub display_name: String,
}

impl KernelSpec {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
        }
    }
}

/// An ordered list of cells plus notebook-level metadata.
///
/// Transformations return new notebooks instead of editing one in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Notebook {
    pub cells: Vec<Cell>,
    pub metadata: Map<String, Value>,
    pub nbformat: u32,
    pub nbformat_minor: u32,
}

impl Notebook {
    pub fn new(cells: Vec<Cell>, metadata: Map<String, Value>) -> Self {
        Self {
            cells,
            metadata,
            nbformat: 4,
            nbformat_minor: 4,
        }
    }

    /// Copy of this notebook with `metadata.kernelspec` set to `kernel`.
    pub fn with_kernelspec(&self, kernel: &KernelSpec) -> Notebook {
        let mut notebook = self.clone();
        notebook.metadata.insert(
            "kernelspec".to_string(),
            serde_json::json!({
                "name": kernel.name,
                "display_name": kernel.display_name,
            }),
        );
        notebook
    }

    pub fn kernelspec(&self) -> Option<KernelSpec> {
        self.metadata
            .get("kernelspec")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_ignore_non_strings() {
        let mut cell = Cell::code("x = 1");
        cell.metadata.insert(
            "tags".to_string(),
            serde_json::json!(["remove-cell", 3, "hide-input"]),
        );
        assert_eq!(cell.tags(), vec!["remove-cell", "hide-input"]);
        assert!(cell.has_tag("hide-input"));
        assert!(!cell.has_tag("remove-input"));
    }

    #[test]
    fn test_with_kernelspec_leaves_original_untouched() {
        let notebook = Notebook::new(vec![Cell::markdown("# Title")], Map::new());
        let kernel = KernelSpec::new("python", "Python (Pyodide)");
        let updated = notebook.with_kernelspec(&kernel);

        assert!(notebook.kernelspec().is_none());
        assert_eq!(updated.kernelspec(), Some(kernel));
        assert_eq!(updated.cells, notebook.cells);
    }
}
