use super::{
    DocTree, Diagnostic, Extension, NodeId, NodeKind, ParseOptions, Severity, StructuralParser,
};
use crate::error::TransformError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum depth of nested directive bodies.
const MAX_NESTING_DEPTH: usize = 64;

/// Indentation, in columns, at which a line starts an indented code block.
const CODE_INDENT: usize = 4;

/// Directives whose bodies are literal text rather than nested markup.
const LITERAL_DIRECTIVES: &[&str] = &[
    "code",
    "code-block",
    "code-cell",
    "csv-table",
    "literalinclude",
    "math",
    "mermaid",
    "raw",
    "raw-cell",
    "sourcecode",
];

static FENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?P<fence>:{3,}|`{3,}|~{3,})(?P<info>.*)$").unwrap());
static FENCE_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?P<fence>:{3,}|`{3,}|~{3,})\s*$").unwrap());
static DIRECTIVE_INFO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\{\s*(?P<name>[^\s{}]+)\s*\}").unwrap());
static OPTION_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*:[^:\s][^:]*:(\s|$)").unwrap());
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ {0,3}#{1,6}(\s|$)").unwrap());
static TARGET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\(\s*\S+\s*\)=\s*$").unwrap());
static BLOCK_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ {0,3}\+\+\+").unwrap());
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ {0,3}%").unwrap());
static THEMATIC_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}(?:(?:\*\s*){3,}|(?:-\s*){3,}|(?:_\s*){3,})$").unwrap());
static AMS_BEGIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\\begin\{(?P<env>[^}]+)\}").unwrap());

/// Block-level MyST parser.
///
/// Fences follow the markdown-it rule: an opening fence runs to the first
/// later line made only of the same character repeated at least as often,
/// or to the end of the enclosing block when there is none. Directive bodies
/// are parsed again, so nested directives of any fence style become child
/// nodes. Inline markup is not interpreted.
#[derive(Debug, Clone, Copy, Default)]
pub struct MystParser;

impl MystParser {
    pub fn new() -> Self {
        Self
    }
}

impl StructuralParser for MystParser {
    fn parse(
        &self,
        text: &str,
        source_name: &str,
        options: &ParseOptions,
    ) -> Result<DocTree, TransformError> {
        let lines: Vec<&str> = text.lines().collect();
        let mut builder = TreeBuilder {
            lines: &lines,
            options,
            tree: DocTree::default(),
        };

        let body_start = builder.front_matter();
        builder.blocks(body_start, lines.len(), None, 0);
        let tree = builder.tree;

        for diagnostic in tree.diagnostics() {
            if diagnostic.severity >= options.report_level {
                log::warn!(
                    "{}:{}: ({}) {}",
                    source_name,
                    diagnostic.line,
                    diagnostic.severity,
                    diagnostic.message
                );
            }
        }

        if let Some(fatal) = tree
            .diagnostics()
            .iter()
            .find(|d| d.severity >= options.halt_level)
        {
            return Err(TransformError::Parse {
                document: source_name.to_string(),
                line: fatal.line,
                message: fatal.message.clone(),
            });
        }

        log::debug!("Parsed {} into {} block node(s)", source_name, tree.len());
        Ok(tree)
    }
}

/// Leading whitespace of `line` in columns, with tab stops every 4.
fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += 4 - width % 4,
            _ => break,
        }
    }
    width
}

/// An opening fence line.
struct Fence<'a> {
    marker: char,
    len: usize,
    info: &'a str,
}

struct TreeBuilder<'a> {
    lines: &'a [&'a str],
    options: &'a ParseOptions,
    tree: DocTree,
}

impl<'a> TreeBuilder<'a> {
    /// Adds the YAML front matter node and returns the first body line.
    fn front_matter(&mut self) -> usize {
        if self.lines.first().map(|l| l.trim_end()) != Some("---") {
            return 0;
        }
        match (1..self.lines.len()).find(|&i| self.lines[i].trim_end() == "---") {
            Some(close) => {
                self.tree.push(NodeKind::FrontMatter, 1, close + 1, None);
                close + 1
            }
            None => 0,
        }
    }

    /// Parses lines `start..end` into children of `parent`.
    fn blocks(&mut self, start: usize, end: usize, parent: Option<NodeId>, depth: usize) {
        let mut i = start;
        while i < end {
            let line = self.lines[i];

            if line.trim().is_empty() {
                i += 1;
            } else if indent_width(line) >= CODE_INDENT {
                i = self.indented_code(i, end, parent);
            } else if let Some(fence) = self.open_fence(line) {
                i = self.fenced(i, end, fence, parent, depth);
            } else if self.options.enabled(Extension::DollarMath)
                && line.trim_start().starts_with("$$")
            {
                i = self.display_math(i, end, parent);
            } else if let Some(env) = self.ams_environment(line) {
                i = self.literal_until(i, end, parent, |l| l.contains(&format!("\\end{{{}}}", env)));
            } else if HEADING.is_match(line) {
                self.leaf(NodeKind::Heading, i, parent);
                i += 1;
            } else if TARGET.is_match(line) {
                self.leaf(NodeKind::Target, i, parent);
                i += 1;
            } else if BLOCK_BREAK.is_match(line) {
                self.leaf(NodeKind::BlockBreak, i, parent);
                i += 1;
            } else if COMMENT.is_match(line) {
                self.leaf(NodeKind::Comment, i, parent);
                i += 1;
            } else if THEMATIC_BREAK.is_match(line) {
                self.leaf(NodeKind::ThematicBreak, i, parent);
                i += 1;
            } else {
                i = self.paragraph(i, end, parent);
            }
        }
    }

    fn leaf(&mut self, kind: NodeKind, index: usize, parent: Option<NodeId>) {
        self.tree.push(kind, index + 1, index + 1, parent);
    }

    fn open_fence<'l>(&self, line: &'l str) -> Option<Fence<'l>> {
        if indent_width(line) >= CODE_INDENT {
            return None;
        }
        let caps = FENCE_OPEN.captures(line)?;
        let fence = caps.name("fence")?.as_str();
        let info = caps.name("info")?.as_str();
        let marker = fence.chars().next()?;

        match marker {
            ':' if !self.options.enabled(Extension::ColonFence) => None,
            // CommonMark: backtick fence info strings may not contain backticks.
            '`' if info.contains('`') => None,
            _ => Some(Fence {
                marker,
                len: fence.len(),
                info,
            }),
        }
    }

    fn closes(&self, line: &str, fence: &Fence<'_>) -> bool {
        if indent_width(line) >= CODE_INDENT {
            return false;
        }
        FENCE_CLOSE
            .captures(line)
            .and_then(|caps| caps.name("fence"))
            .is_some_and(|m| {
                m.as_str().starts_with(fence.marker) && m.as_str().len() >= fence.len
            })
    }

    /// Handles a fenced block opening at `index`; returns the next line to parse.
    fn fenced(
        &mut self,
        index: usize,
        end: usize,
        fence: Fence<'_>,
        parent: Option<NodeId>,
        depth: usize,
    ) -> usize {
        let close = (index + 1..end).find(|&j| self.closes(self.lines[j], &fence));
        let body_end = close.unwrap_or(end);
        let last = close.unwrap_or(end - 1);

        if close.is_none() {
            self.tree.report(Diagnostic {
                severity: Severity::Warning,
                line: index + 1,
                message: format!(
                    "fence '{}' is never closed",
                    fence.marker.to_string().repeat(fence.len)
                ),
            });
        }

        let directive = DIRECTIVE_INFO
            .captures(fence.info)
            .and_then(|caps| caps.name("name"))
            .map(|m| m.as_str());

        match directive {
            Some(name) if !LITERAL_DIRECTIVES.contains(&name) => {
                let id = self
                    .tree
                    .push(NodeKind::directive(name), index + 1, last + 1, parent);
                if depth + 1 > MAX_NESTING_DEPTH {
                    self.tree.report(Diagnostic {
                        severity: Severity::Severe,
                        line: index + 1,
                        message: format!(
                            "directive nesting exceeds {} levels",
                            MAX_NESTING_DEPTH
                        ),
                    });
                } else {
                    let body_start = self.skip_options(index + 1, body_end);
                    self.blocks(body_start, body_end, Some(id), depth + 1);
                }
            }
            Some(name) => {
                self.tree.push(
                    NodeKind::Directive(name.to_string()),
                    index + 1,
                    last + 1,
                    parent,
                );
            }
            None => {
                self.tree
                    .push(NodeKind::CodeBlock, index + 1, last + 1, parent);
            }
        }

        last + 1
    }

    /// Skips directive options: a `---` YAML block or `:key: value` lines.
    fn skip_options(&self, start: usize, end: usize) -> usize {
        if start < end && self.lines[start].trim() == "---" {
            if let Some(close) = (start + 1..end).find(|&j| self.lines[j].trim() == "---") {
                return close + 1;
            }
            return start;
        }
        let mut i = start;
        while i < end && OPTION_LINE.is_match(self.lines[i]) {
            i += 1;
        }
        i
    }

    fn display_math(&mut self, index: usize, end: usize, parent: Option<NodeId>) -> usize {
        let opening = self.lines[index].trim();
        if opening.len() > 2 && opening.ends_with("$$") {
            self.leaf(NodeKind::Math, index, parent);
            return index + 1;
        }
        self.literal_until(index, end, parent, |l| l.trim_end().ends_with("$$"))
    }

    fn ams_environment(&self, line: &str) -> Option<String> {
        if !self.options.enabled(Extension::AmsMath) {
            return None;
        }
        AMS_BEGIN
            .captures(line)
            .and_then(|caps| caps.name("env"))
            .map(|m| m.as_str().to_string())
    }

    /// Literal math block from `index` to the first later line accepted by `closes`.
    fn literal_until(
        &mut self,
        index: usize,
        end: usize,
        parent: Option<NodeId>,
        closes: impl Fn(&str) -> bool,
    ) -> usize {
        let last = match (index + 1..end).find(|&j| closes(self.lines[j])) {
            Some(close) => close,
            None => {
                self.tree.report(Diagnostic {
                    severity: Severity::Warning,
                    line: index + 1,
                    message: "math block is never closed".to_string(),
                });
                end - 1
            }
        };
        self.tree.push(NodeKind::Math, index + 1, last + 1, parent);
        last + 1
    }

    /// Indented code block from `index`; blank lines inside it are kept,
    /// trailing ones are not.
    fn indented_code(&mut self, index: usize, end: usize, parent: Option<NodeId>) -> usize {
        let mut last = index;
        let mut next = index + 1;
        while next < end {
            let line = self.lines[next];
            if line.trim().is_empty() {
                next += 1;
                continue;
            }
            if indent_width(line) < CODE_INDENT {
                break;
            }
            last = next;
            next += 1;
        }
        self.tree.push(NodeKind::CodeBlock, index + 1, last + 1, parent);
        last + 1
    }

    fn paragraph(&mut self, index: usize, end: usize, parent: Option<NodeId>) -> usize {
        let mut next = index + 1;
        while next < end {
            let line = self.lines[next];
            if line.trim().is_empty() || self.interrupts(line) {
                break;
            }
            next += 1;
        }
        self.tree.push(NodeKind::Paragraph, index + 1, next, parent);
        next
    }

    fn interrupts(&self, line: &str) -> bool {
        self.open_fence(line).is_some()
            || HEADING.is_match(line)
            || TARGET.is_match(line)
            || BLOCK_BREAK.is_match(line)
            || (self.options.enabled(Extension::DollarMath)
                && line.trim_start().starts_with("$$"))
    }
}
