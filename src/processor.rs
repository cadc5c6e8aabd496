use crate::cells::{CellPipeline, LabelStripper, TagRemover};
use crate::config::ProcessConfig;
use crate::conversion::{convert_tasks, ConversionResult};
use crate::document::Document;
use crate::error::TransformError;
use crate::manifest::LiteManifest;
use crate::notebook::{self, KernelSpec, Notebook, NotebookFormat};
use crate::pipeline::TextPipeline;
use crate::reporting::{print_conversion_statistics, report_conversion_errors, warn_conversion_errors};
use crate::task_collector::collect_conversion_tasks;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Converts the pages of a MyST book into JupyterLite notebooks.
///
/// # Overview
///
/// Every page goes through the same steps:
///
/// 1. the text passes of [`TextPipeline`]: exercise and solution markers,
///    solution collapsing, admonition fences
/// 2. reading the result as a MyST notebook
/// 3. the cell transforms: label stripping, then removal of cells tagged
///    `jupyterlite.remove_tag` when `jupyterlite.remove_remove` is set
/// 4. setting the Pyodide kernelspec
///
/// [`NotebookProcessor::run`] does this for every page of the book in
/// parallel and then writes `jupyter-lite.json`.
///
/// # Example
///
/// ```no_run
/// use lite_notebooks::{NotebookProcessor, ProcessConfig};
/// use std::path::Path;
///
/// let config = ProcessConfig::load(Path::new("."))?;
/// let summary = NotebookProcessor::new(config).run(Path::new("_build/lite"))?;
/// println!("{} notebook(s)", summary.converted.len());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct NotebookProcessor {
    config: ProcessConfig,
    text: TextPipeline,
    cells: CellPipeline,
    format: NotebookFormat,
    kernel: KernelSpec,
    jobs: usize,
    keep_going: bool,
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Written notebooks, in conversion order
    pub converted: Vec<PathBuf>,
    /// Source pages that failed; only non-empty with `keep_going`
    pub failed: Vec<String>,
    pub manifest_path: PathBuf,
}

impl NotebookProcessor {
    pub fn new(config: ProcessConfig) -> Self {
        let mut cells = CellPipeline::new().with(LabelStripper::new());
        if config.lite.remove_remove {
            cells = cells.with(TagRemover::new(&config.lite.remove_tag));
        }

        Self {
            text: TextPipeline::new(config.parse_options.clone()),
            cells,
            format: config.lite.notebook_format(),
            kernel: config.lite.kernel_spec(),
            jobs: num_cpus::get(),
            keep_going: false,
            config,
        }
    }

    /// Number of pages converted at once. 0 keeps the default (one per CPU).
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        if jobs > 0 {
            self.jobs = jobs;
        }
        self
    }

    /// Keep converting after a page fails, and still write the manifest.
    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Converts one page's text into a notebook.
    pub fn convert(&self, doc: &Document, page_url: Option<&str>) -> Result<Notebook, TransformError> {
        let text = self.text.run(doc, page_url)?;
        let notebook = notebook::read(text.text(), &self.format, doc.name())?;
        let notebook = self.cells.run(&notebook);
        Ok(notebook.with_kernelspec(&self.kernel))
    }

    /// Converts the page at `input` and writes the notebook to `output`.
    ///
    /// Returns the number of cells written. Nothing is written on error.
    pub fn convert_file(&self, input: &Path, output: &Path, page_url: Option<&str>) -> Result<usize> {
        let text = std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        let doc = Document::new(input.display().to_string(), text);

        let notebook = self.convert(&doc, page_url)?;
        notebook::write_ipynb(&notebook, output)?;

        log::debug!(
            "Wrote {} ({} cell(s))",
            output.display(),
            notebook.cells.len()
        );
        Ok(notebook.cells.len())
    }

    /// Converts every page of the book into `output_dir`.
    ///
    /// # Errors
    ///
    /// Fails when the book cannot be listed, and, unless `keep_going` is set,
    /// when any page fails to convert. All failures are logged first. The
    /// manifest is only written by successful runs.
    pub fn run(&self, output_dir: &Path) -> Result<RunSummary> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        let tasks = collect_conversion_tasks(&self.config, output_dir)?;
        log::info!(
            "Converting {} page(s) from {} with {} job(s)",
            tasks.len(),
            self.config.input_dir.display(),
            self.jobs
        );

        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .context("Failed to build conversion thread pool")?;
        let (results, parallel_duration) = convert_tasks(tasks, self, &thread_pool);

        let failed_results: Vec<&ConversionResult> =
            results.iter().filter(|r| !r.success()).collect();
        if !failed_results.is_empty() {
            if self.keep_going {
                warn_conversion_errors(&failed_results);
            } else {
                report_conversion_errors(&failed_results)?;
            }
        }

        print_conversion_statistics(&results, parallel_duration);

        let manifest_path = LiteManifest::for_language(&self.config.lite.language).write(output_dir)?;
        log::info!("Wrote {}", manifest_path.display());

        Ok(RunSummary {
            converted: results
                .iter()
                .filter(|r| r.success())
                .map(|r| r.output_path().to_path_buf())
                .collect(),
            failed: failed_results
                .iter()
                .map(|r| r.rel_path().to_string())
                .collect(),
            manifest_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BookConfig;
    use crate::notebook::CellType;

    const PAGE: &str = "\
---
kernelspec:
  name: python3
  display_name: Python 3
---

(sec-intro)=
# Intro

:::{tip} Try it
Run the cell.
:::

```{code-cell} ipython3
:tags: [remove-cell]
import hidden
```

```{code-cell} ipython3
print('hi')
```
";

    fn processor(yaml: &str) -> NotebookProcessor {
        let book: BookConfig = serde_yaml::from_str(yaml).unwrap();
        NotebookProcessor::new(ProcessConfig::from_book_config(book, Path::new(".")).unwrap())
    }

    #[test]
    fn test_convert_page() {
        let nb = processor("{}")
            .convert(&Document::new("intro.md", PAGE), None)
            .unwrap();

        assert_eq!(nb.cells.len(), 2);
        assert_eq!(nb.cells[0].cell_type, CellType::Markdown);
        assert_eq!(
            nb.cells[0].source,
            "# Intro\n\n**Start of tip: Try it**\nRun the cell.\n**End of tip**"
        );
        assert_eq!(nb.cells[1].source, "print('hi')");
        assert_eq!(
            nb.kernelspec(),
            Some(KernelSpec::new("python", "Python (Pyodide)"))
        );
    }

    #[test]
    fn test_remove_remove_disabled_keeps_tagged_cells() {
        let nb = processor("jupyterlite:\n  remove_remove: false\n")
            .convert(&Document::new("intro.md", PAGE), None)
            .unwrap();
        assert_eq!(nb.cells.len(), 3);
        assert!(nb.cells[1].has_tag("remove-cell"));
    }

    #[test]
    fn test_convert_file_writes_nothing_on_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("bad.md");
        let output = dir.path().join("out/bad.ipynb");
        std::fs::write(&input, ":::{note}\nnever closed\n").unwrap();

        let err = processor("{}")
            .convert_file(&input, &output, None)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<TransformError>(),
            Some(TransformError::Structural { line: 1, .. })
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_with_jobs_ignores_zero() {
        let p = processor("{}").with_jobs(3);
        assert_eq!(p.jobs, 3);
        assert_eq!(p.with_jobs(0).jobs, 3);
    }
}
