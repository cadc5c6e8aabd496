use super::{Cell, CellType, Notebook};
use crate::error::TransformError;
use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use regex::Regex;
use serde_json::{Map, Value};
use std::ops::Range;

static CELL_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+\+\+\s*(?P<meta>\{.*\})?\s*$").unwrap());
static CELL_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:(?P<key>[A-Za-z0-9_][\w-]*):\s*(?P<value>.*?)\s*$").unwrap());

/// Source dialect and file extension of a text notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookFormat {
    pub format_name: String,
    pub extension: String,
}

impl NotebookFormat {
    pub fn new(format_name: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            format_name: format_name.into(),
            extension: extension.into(),
        }
    }

    pub fn myst() -> Self {
        Self::new("myst", ".md")
    }
}

/// Reads a text notebook.
///
/// Only MyST Markdown notebooks are understood:
///
/// - YAML front matter becomes notebook metadata
/// - top-level ```` ```{code-cell} ```` and ```` ```{raw-cell} ```` fences
///   become code and raw cells; their leading options become cell metadata
/// - everything else becomes markdown cells, split on `+++` lines
pub fn read(text: &str, format: &NotebookFormat, document: &str) -> Result<Notebook, TransformError> {
    if format.format_name != "myst" {
        return Err(notebook_error(
            document,
            format!(
                "unsupported notebook format '{}' for '{}' files",
                format.format_name, format.extension
            ),
        ));
    }

    let (metadata, body) = split_front_matter(text, document)?;
    let mut cells = Vec::new();
    let mut cursor = 0;

    for block in find_cell_blocks(body) {
        push_markdown_cells(&body[cursor..block.range.start], &mut cells, document)?;
        cursor = block.range.end;
        cells.push(block.into_cell(document)?);
    }
    push_markdown_cells(&body[cursor..], &mut cells, document)?;

    Ok(Notebook::new(cells, metadata))
}

fn notebook_error(document: &str, message: impl Into<String>) -> TransformError {
    TransformError::Notebook {
        document: document.to_string(),
        message: message.into(),
    }
}

/// Splits off a leading `---` YAML block and returns it as metadata.
fn split_front_matter<'t>(
    text: &'t str,
    document: &str,
) -> Result<(Map<String, Value>, &'t str), TransformError> {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return Ok((Map::new(), text));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            let metadata = parse_yaml_mapping(yaml)
                .map_err(|e| notebook_error(document, format!("invalid front matter: {}", e)))?;
            return Ok((metadata, body));
        }
        offset += line.len();
    }

    Ok((Map::new(), text))
}

fn parse_yaml_mapping(yaml: &str) -> Result<Map<String, Value>, String> {
    if yaml.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_yaml::from_str::<Value>(yaml).map_err(|e| e.to_string())? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(format!("expected a mapping, found {}", other)),
    }
}

/// A top-level `{code-cell}` or `{raw-cell}` fence.
struct CellBlock {
    cell_type: CellType,
    /// Byte range of the whole fence, through the end of its closing line.
    range: Range<usize>,
    content: String,
}

impl CellBlock {
    fn into_cell(self, document: &str) -> Result<Cell, TransformError> {
        let (metadata, source) = split_cell_options(&self.content)
            .map_err(|e| notebook_error(document, format!("invalid cell options: {}", e)))?;
        Ok(Cell {
            cell_type: self.cell_type,
            source,
            metadata,
        })
    }
}

fn cell_directive(info: &str) -> Option<CellType> {
    let name = info.trim().strip_prefix('{')?.split('}').next()?.trim();
    match name {
        "code-cell" => Some(CellType::Code),
        "raw-cell" => Some(CellType::Raw),
        _ => None,
    }
}

fn find_cell_blocks(body: &str) -> Vec<CellBlock> {
    let mut blocks = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<CellBlock> = None;

    for (event, range) in Parser::new(body).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                if depth == 0 {
                    current = cell_directive(&info).map(|cell_type| CellBlock {
                        cell_type,
                        range: range.start..line_end(body, range.end),
                        content: String::new(),
                    });
                }
                depth += 1;
            }
            Event::Start(_) => depth += 1,
            Event::End(TagEnd::CodeBlock) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    blocks.extend(current.take());
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Text(text) => {
                if let Some(block) = current.as_mut() {
                    block.content.push_str(&text);
                }
            }
            _ => {}
        }
    }

    blocks
}

/// Moves `pos` forward to just past the next newline, unless it already
/// sits at the start of a line.
fn line_end(text: &str, pos: usize) -> usize {
    if pos == 0 || text[..pos].ends_with('\n') {
        return pos;
    }
    text[pos..].find('\n').map_or(text.len(), |i| pos + i + 1)
}

/// Separates cell options (`---` YAML block or `:key: value` lines) from the
/// cell source.
fn split_cell_options(content: &str) -> Result<(Map<String, Value>, String), String> {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let mut metadata = Map::new();
    let mut body_start = 0;

    if lines.first().map(|l| l.trim_end()) == Some("---") {
        if let Some(close) = (1..lines.len()).find(|&i| lines[i].trim_end() == "---") {
            metadata = parse_yaml_mapping(&lines[1..close].concat())?;
            body_start = close + 1;
        }
    } else {
        while let Some(caps) = lines
            .get(body_start)
            .and_then(|line| CELL_OPTION.captures(line.trim_end()))
        {
            let value = serde_yaml::from_str::<Value>(&caps["value"])
                .unwrap_or_else(|_| Value::String(caps["value"].to_string()));
            metadata.insert(caps["key"].to_string(), value);
            body_start += 1;
        }
    }

    if body_start > 0 {
        while lines
            .get(body_start)
            .is_some_and(|line| line.trim().is_empty())
        {
            body_start += 1;
        }
    }

    let source = lines[body_start.min(lines.len())..].concat();
    let source = source.strip_suffix('\n').unwrap_or(&source).to_string();
    Ok((metadata, source))
}

/// Splits markdown text on `+++` separators into cells.
fn push_markdown_cells(
    text: &str,
    cells: &mut Vec<Cell>,
    document: &str,
) -> Result<(), TransformError> {
    let mut pending: Vec<&str> = Vec::new();
    let mut metadata = Map::new();

    for line in text.lines() {
        if let Some(caps) = CELL_SEPARATOR.captures(line) {
            push_markdown_cell(&pending, std::mem::take(&mut metadata), cells);
            pending.clear();
            if let Some(meta) = caps.name("meta") {
                metadata = match serde_json::from_str::<Value>(meta.as_str()) {
                    Ok(Value::Object(map)) => map,
                    _ => {
                        return Err(notebook_error(
                            document,
                            format!("invalid cell metadata after '+++': {}", meta.as_str()),
                        ))
                    }
                };
            }
        } else {
            pending.push(line);
        }
    }
    push_markdown_cell(&pending, metadata, cells);
    Ok(())
}

fn push_markdown_cell(lines: &[&str], metadata: Map<String, Value>, cells: &mut Vec<Cell>) {
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    if let (Some(first), Some(last)) = (first, last) {
        cells.push(Cell {
            cell_type: CellType::Markdown,
            source: lines[first..=last].join("\n"),
            metadata,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read_myst(text: &str) -> Notebook {
        read(text, &NotebookFormat::myst(), "nb.md").unwrap()
    }

    #[test]
    fn test_front_matter_becomes_metadata() {
        let text = "---\njupytext:\n  formats: md:myst\nkernelspec:\n  name: python3\n---\n\n# Title\n";
        let nb = read_myst(text);
        assert_eq!(nb.metadata["kernelspec"]["name"], "python3");
        assert_eq!(nb.cells.len(), 1);
        assert_eq!(nb.cells[0].source, "# Title");
    }

    #[test]
    fn test_code_cells_split_markdown() {
        let text = "Intro\n\n```{code-cell} ipython3\nx = 1\nx\n```\n\nOutro\n";
        let nb = read_myst(text);
        let types: Vec<_> = nb.cells.iter().map(|c| c.cell_type).collect();
        assert_eq!(
            types,
            vec![CellType::Markdown, CellType::Code, CellType::Markdown]
        );
        assert_eq!(nb.cells[1].source, "x = 1\nx");
        assert_eq!(nb.cells[2].source, "Outro");
    }

    #[test]
    fn test_short_cell_options() {
        let text = "```{code-cell}\n:tags: [remove-cell]\n\nimport os\n```\n";
        let nb = read_myst(text);
        assert_eq!(nb.cells.len(), 1);
        assert!(nb.cells[0].has_tag("remove-cell"));
        assert_eq!(nb.cells[0].source, "import os");
    }

    #[test]
    fn test_yaml_cell_options() {
        let text = "```{code-cell}\n---\ntags: [hide-input]\nscrolled: true\n---\nprint(1)\n```\n";
        let nb = read_myst(text);
        assert_eq!(nb.cells[0].metadata["scrolled"], json!(true));
        assert!(nb.cells[0].has_tag("hide-input"));
        assert_eq!(nb.cells[0].source, "print(1)");
    }

    #[test]
    fn test_block_breaks_split_markdown_cells() {
        let text = "One\n\n+++ {\"tags\": [\"remove-cell\"]}\n\nTwo\n\n+++\n\nThree\n";
        let nb = read_myst(text);
        let sources: Vec<_> = nb.cells.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["One", "Two", "Three"]);
        assert!(nb.cells[1].has_tag("remove-cell"));
        assert!(nb.cells[2].metadata.is_empty());
    }

    #[test]
    fn test_plain_code_fences_stay_in_markdown() {
        let text = "Example:\n\n```python\nx = 1\n```\n";
        let nb = read_myst(text);
        assert_eq!(nb.cells.len(), 1);
        assert_eq!(nb.cells[0].source, "Example:\n\n```python\nx = 1\n```");
    }

    #[test]
    fn test_raw_cells() {
        let nb = read_myst("```{raw-cell}\n<b>raw</b>\n```\n");
        assert_eq!(nb.cells[0].cell_type, CellType::Raw);
        assert_eq!(nb.cells[0].source, "<b>raw</b>");
    }

    #[test]
    fn test_unsupported_format() {
        let err = read("x", &NotebookFormat::new("rmarkdown", ".Rmd"), "nb.Rmd").unwrap_err();
        assert!(matches!(err, TransformError::Notebook { .. }));
    }

    #[test]
    fn test_invalid_front_matter() {
        let err = read("---\n: [\n---\n", &NotebookFormat::myst(), "nb.md").unwrap_err();
        assert!(matches!(err, TransformError::Notebook { .. }));
    }
}
