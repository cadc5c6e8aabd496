use crate::config::ProcessConfig;
use crate::conversion::ConversionTask;
use crate::discovery::{find_matching_files, ExcludeMatcher};
use crate::urls::page_url;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Whether `rel_path` ends in `ext` (given with its leading dot).
fn has_extension(rel_path: &str, ext: &str) -> bool {
    Path::new(rel_path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ext.strip_prefix('.') == Some(e))
}

/// Output location of `rel_path`: mirrored under `output_dir` with its
/// extension replaced by `out_ext`.
pub fn output_path_for(output_dir: &Path, rel_path: &str, out_ext: &str) -> PathBuf {
    output_dir
        .join(rel_path)
        .with_extension(out_ext.trim_start_matches('.'))
}

/// Collects one conversion task per source page in the book.
///
/// Walks the input directory, skips excluded paths and files with another
/// extension, and computes each page's output path and URL.
///
/// # Errors
///
/// Returns an error if:
/// - the input directory cannot be read
/// - an exclude pattern is invalid
pub fn collect_conversion_tasks(config: &ProcessConfig, output_dir: &Path) -> Result<Vec<ConversionTask>> {
    let matcher = ExcludeMatcher::new(config.exclude_patterns.as_slice())?;
    let files = find_matching_files(&config.input_dir, &matcher).with_context(|| {
        format!(
            "Failed to list source pages in {}",
            config.input_dir.display()
        )
    })?;

    let mut tasks = Vec::new();
    for rel_path in files {
        if !has_extension(&rel_path, &config.lite.in_nb_ext) {
            continue;
        }

        let output_path = output_path_for(output_dir, &rel_path, &config.lite.out_nb_ext);
        log::debug!("Collected {} -> {}", rel_path, output_path.display());
        tasks.push(ConversionTask::new(
            rel_path.clone(),
            config.input_dir.join(&rel_path),
            output_path,
            page_url(&config.base_path, &rel_path),
        ));
    }

    log::debug!("Collected {} page(s) from {}", tasks.len(), config.input_dir.display());
    Ok(tasks)
}
