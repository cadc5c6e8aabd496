use crate::processor::NotebookProcessor;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// One source page to convert into a notebook.
///
/// A task carries everything needed to convert the page on any worker
/// thread without shared state.
#[derive(Debug, Clone)]
pub struct ConversionTask {
    rel_path: String,
    input_path: PathBuf,
    output_path: PathBuf,
    page_url: String,
}

impl ConversionTask {
    pub fn new(rel_path: String, input_path: PathBuf, output_path: PathBuf, page_url: String) -> Self {
        Self {
            rel_path,
            input_path,
            output_path,
            page_url,
        }
    }

    pub fn rel_path(&self) -> &str {
        &self.rel_path
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    /// Converts the page and consumes the task.
    pub fn convert(self, processor: &NotebookProcessor) -> ConversionResult {
        log::info!("Processing {}", self.rel_path);

        let start = Instant::now();
        let outcome = processor.convert_file(
            &self.input_path,
            &self.output_path,
            Some(self.page_url.as_str()),
        );
        let duration = start.elapsed();

        let (cells, error_message) = match outcome {
            Ok(cells) => (cells, None),
            Err(e) => (0, Some(format!("{:#}", e))),
        };

        ConversionResult {
            rel_path: self.rel_path,
            output_path: self.output_path,
            duration,
            cells,
            error_message,
        }
    }
}

/// Outcome of converting one page, successful or not.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    rel_path: String,
    output_path: PathBuf,
    duration: Duration,
    cells: usize,
    error_message: Option<String>,
}

impl ConversionResult {
    pub fn success(&self) -> bool {
        self.error_message.is_none()
    }

    pub fn rel_path(&self) -> &str {
        &self.rel_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Cells in the written notebook; 0 for failures.
    pub fn cells(&self) -> usize {
        self.cells
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

/// Converts all tasks in parallel on `thread_pool`.
///
/// Results keep the order of `tasks`. Returns them with the wall-clock time
/// of the whole batch.
pub fn convert_tasks(
    tasks: Vec<ConversionTask>,
    processor: &NotebookProcessor,
    thread_pool: &rayon::ThreadPool,
) -> (Vec<ConversionResult>, Duration) {
    let parallel_start = Instant::now();
    let results: Vec<ConversionResult> = thread_pool.install(|| {
        tasks
            .into_par_iter()
            .map(|task| task.convert(processor))
            .collect()
    });

    (results, parallel_start.elapsed())
}
