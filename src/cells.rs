use crate::notebook::{Cell, CellType, Notebook};
use regex::Regex;

const LABEL_PATTERN: &str = r"(?m)^\s*\(\s*\S+\s*\)=\s*\n";

/// What a transform decided for one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellOutcome {
    Keep(Cell),
    Drop,
}

/// A cell-level transformation.
pub trait CellTransform: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, cell: Cell) -> CellOutcome;
}

/// Removes `(label)=` target lines from markdown cells.
pub struct LabelStripper {
    pattern: Regex,
}

impl LabelStripper {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(LABEL_PATTERN).expect("label pattern is valid"),
        }
    }
}

impl Default for LabelStripper {
    fn default() -> Self {
        Self::new()
    }
}

impl CellTransform for LabelStripper {
    fn name(&self) -> &str {
        "strip-labels"
    }

    fn apply(&self, mut cell: Cell) -> CellOutcome {
        if cell.cell_type == CellType::Markdown {
            cell.source = self.pattern.replace_all(&cell.source, "").into_owned();
        }
        CellOutcome::Keep(cell)
    }
}

/// Drops every cell tagged with `tag`.
pub struct TagRemover {
    tag: String,
}

impl TagRemover {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

impl CellTransform for TagRemover {
    fn name(&self) -> &str {
        "remove-tagged"
    }

    fn apply(&self, cell: Cell) -> CellOutcome {
        if cell.has_tag(&self.tag) {
            CellOutcome::Drop
        } else {
            CellOutcome::Keep(cell)
        }
    }
}

/// Ordered list of cell transforms.
///
/// Each cell goes through the transforms in order; the first
/// [`CellOutcome::Drop`] removes it and skips the remaining transforms.
#[derive(Default)]
pub struct CellPipeline {
    transforms: Vec<Box<dyn CellTransform>>,
}

impl CellPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, transform: impl CellTransform + 'static) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    fn apply(&self, cell: Cell) -> Option<Cell> {
        let mut cell = cell;
        for transform in &self.transforms {
            match transform.apply(cell) {
                CellOutcome::Keep(kept) => cell = kept,
                CellOutcome::Drop => {
                    log::debug!("Cell dropped by {}", transform.name());
                    return None;
                }
            }
        }
        Some(cell)
    }

    pub fn run(&self, notebook: &Notebook) -> Notebook {
        let cells = notebook
            .cells
            .iter()
            .cloned()
            .filter_map(|cell| self.apply(cell))
            .collect();

        Notebook {
            cells,
            ..notebook.clone()
        }
    }
}
