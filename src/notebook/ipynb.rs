use super::{CellType, Notebook};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Splits cell source into the line list used by the `.ipynb` format.
///
/// Every line keeps its newline except the last one.
fn split_source(source: &str) -> Vec<String> {
    source.split_inclusive('\n').map(str::to_string).collect()
}

fn to_value(notebook: &Notebook) -> Value {
    let cells: Vec<Value> = notebook
        .cells
        .iter()
        .map(|cell| {
            let mut value = json!({
                "cell_type": cell.cell_type,
                "metadata": cell.metadata,
                "source": split_source(&cell.source),
            });
            if cell.cell_type == CellType::Code {
                value["execution_count"] = Value::Null;
                value["outputs"] = json!([]);
            }
            value
        })
        .collect();

    json!({
        "cells": cells,
        "metadata": notebook.metadata,
        "nbformat": notebook.nbformat,
        "nbformat_minor": notebook.nbformat_minor,
    })
}

/// Serializes `notebook` the way Jupyter does: one-space indent, trailing newline.
pub fn to_ipynb_string(notebook: &Notebook) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    to_value(notebook)
        .serialize(&mut serializer)
        .context("Failed to serialize notebook")?;
    buf.push(b'\n');
    String::from_utf8(buf).context("Serialized notebook is not valid UTF-8")
}

/// Writes `notebook` to `path`.
///
/// The JSON goes to a temporary file in the destination directory first and
/// is renamed into place, so a failed write never leaves a truncated notebook.
pub fn write_ipynb(notebook: &Notebook, path: &Path) -> Result<()> {
    let contents = to_ipynb_string(notebook)?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(contents.as_bytes())
        .context("Failed to write notebook contents")?;
    file.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}
