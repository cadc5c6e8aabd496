use crate::document::Document;
use crate::error::TransformError;
use crate::myst::{MystParser, ParseOptions, StructuralParser};
use regex::Regex;

const END_FENCE_PATTERN: &str = r"^\s*(?::{3,}|`{3,}|~{3,})\s*$";

const HEADER_PATTERN: &str =
    r"^\s*(?::{3,}|`{3,}|~{3,})\s*\{\s*(?P<ad_type>[^\s}]+)\s*\}\s*(?P<ad_title>.*?)\s*$";

/// Inclusive 0-indexed line range of one admonition block.
///
/// `start_line` holds the opening fence and header, `end_line` the closing
/// fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub start_line: usize,
    pub end_line: usize,
}

/// Type and title parsed from an admonition's opening line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmonitionHeader {
    pub kind: String,
    pub title: String,
}

impl AdmonitionHeader {
    pub fn start_marker(&self) -> String {
        if self.title.is_empty() {
            format!("**Start of {}**", self.kind)
        } else {
            format!("**Start of {}: {}**", self.kind, self.title)
        }
    }

    pub fn end_marker(&self) -> String {
        format!("**End of {}**", self.kind)
    }
}

/// Finds the line span of every admonition in a document.
pub struct AdmonitionLocator<P = MystParser> {
    parser: P,
    options: ParseOptions,
    end_fence: Regex,
}

impl AdmonitionLocator<MystParser> {
    pub fn new(options: ParseOptions) -> Self {
        Self::with_parser(MystParser::new(), options)
    }
}

impl<P: StructuralParser> AdmonitionLocator<P> {
    pub fn with_parser(parser: P, options: ParseOptions) -> Self {
        Self {
            parser,
            options,
            end_fence: Regex::new(END_FENCE_PATTERN).expect("end fence pattern is valid"),
        }
    }

    /// Returns one span per admonition, in document order.
    ///
    /// The closing fence is searched backwards from the line before the next
    /// node that follows the admonition (or from the end of the document),
    /// never past the node's own last line.
    ///
    /// # Errors
    ///
    /// - [`TransformError::Parse`] if the parser refuses the document
    /// - [`TransformError::Structural`] if no closing fence lies in the range
    pub fn locate(&self, doc: &Document) -> Result<Vec<BlockSpan>, TransformError> {
        let tree = self.parser.parse(doc.text(), doc.name(), &self.options)?;
        let lines = doc.lines();
        let Some(last_index) = lines.len().checked_sub(1) else {
            return Ok(Vec::new());
        };

        let mut spans = Vec::new();
        for (id, node) in tree.admonitions() {
            let start_line = node.line - 1;

            let following_bound = tree
                .following(id)
                .map_or(last_index, |next| tree.node(next).line.saturating_sub(2));
            let upper = following_bound
                .min(node.end_line.saturating_sub(1))
                .min(last_index);

            let end_line = (start_line + 1..=upper)
                .rev()
                .find(|&i| self.end_fence.is_match(lines[i]))
                .ok_or_else(|| TransformError::Structural {
                    document: doc.name().to_string(),
                    line: node.line,
                })?;

            log::trace!(
                "{}: admonition lines {}..={}",
                doc.name(),
                start_line,
                end_line
            );
            spans.push(BlockSpan {
                start_line,
                end_line,
            });
        }

        Ok(spans)
    }
}

/// Turns admonition fences into bold start/end lines.
pub struct AdmonitionRewriter {
    header: Regex,
}

impl AdmonitionRewriter {
    pub fn new() -> Self {
        Self {
            header: Regex::new(HEADER_PATTERN).expect("admonition header pattern is valid"),
        }
    }

    pub fn parse_header(&self, line: &str) -> Option<AdmonitionHeader> {
        let caps = self.header.captures(line)?;
        Some(AdmonitionHeader {
            kind: caps["ad_type"].to_string(),
            title: caps["ad_title"].to_string(),
        })
    }

    /// Rewrites the first and last line of every span.
    ///
    /// Headers are matched against the unmodified document, and each line is
    /// replaced by exactly one line, so all spans stay valid while rewriting.
    pub fn rewrite(&self, doc: &Document, spans: &[BlockSpan]) -> Result<Document, TransformError> {
        if spans.is_empty() {
            return Ok(doc.clone());
        }

        let snapshot = doc.lines();
        let mut lines: Vec<String> = snapshot.iter().map(|l| l.to_string()).collect();

        for span in spans {
            let opening = snapshot[span.start_line];
            let header =
                self.parse_header(opening)
                    .ok_or_else(|| TransformError::HeaderMatch {
                        document: doc.name().to_string(),
                        line: span.start_line + 1,
                        text: opening.to_string(),
                    })?;
            lines[span.start_line] = header.start_marker();
            lines[span.end_line] = header.end_marker();
        }

        let mut text = lines.join("\n");
        if doc.text().ends_with('\n') {
            text.push('\n');
        }
        Ok(doc.with_text(text))
    }
}

impl Default for AdmonitionRewriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::myst::{DocTree, NodeKind};

    fn locate(text: &str) -> Result<Vec<BlockSpan>, TransformError> {
        AdmonitionLocator::new(ParseOptions::default()).locate(&Document::new("t.md", text))
    }

    fn span(start_line: usize, end_line: usize) -> BlockSpan {
        BlockSpan {
            start_line,
            end_line,
        }
    }

    #[test]
    fn test_locate_titled_note() {
        let spans = locate(":::{note} Example Title\nbody\n:::").unwrap();
        assert_eq!(spans, vec![span(0, 2)]);
    }

    #[test]
    fn test_rewrite_titled_note() {
        let doc = Document::new("t.md", ":::{note} Example Title\nbody\n:::");
        let out = AdmonitionRewriter::new()
            .rewrite(&doc, &[span(0, 2)])
            .unwrap();
        assert_eq!(
            out.text(),
            "**Start of note: Example Title**\nbody\n**End of note**"
        );
    }

    #[test]
    fn test_untitled_warning_has_no_colon() {
        let doc = Document::new("t.md", ":::{warning}\nbody\n:::\n");
        let spans = locate(doc.text()).unwrap();
        let out = AdmonitionRewriter::new().rewrite(&doc, &spans).unwrap();
        assert_eq!(out.text(), "**Start of warning**\nbody\n**End of warning**\n");
    }

    #[test]
    fn test_nested_admonitions_get_their_own_fences() {
        let text = "::::{note} Outer\n:::{tip}\ninner\n:::\n::::\n\nafter\n";
        let spans = locate(text).unwrap();
        assert_eq!(spans, vec![span(0, 4), span(1, 3)]);

        let doc = Document::new("t.md", text);
        let out = AdmonitionRewriter::new().rewrite(&doc, &spans).unwrap();
        assert_eq!(
            out.text(),
            "**Start of note: Outer**\n**Start of tip**\ninner\n**End of tip**\n**End of note**\n\nafter\n"
        );
    }

    #[test]
    fn test_body_with_code_fence_is_untouched() {
        let text = "```{hint}\nSee:\n\n~~~python\nprint(1)\n~~~\n```\n";
        let doc = Document::new("t.md", text);
        let spans = locate(text).unwrap();
        assert_eq!(spans, vec![span(0, 6)]);
        let out = AdmonitionRewriter::new().rewrite(&doc, &spans).unwrap();
        assert_eq!(
            out.text(),
            "**Start of hint**\nSee:\n\n~~~python\nprint(1)\n~~~\n**End of hint**\n"
        );
    }

    #[test]
    fn test_non_admonition_directives_are_ignored() {
        let spans = locate("```{figure} img.png\ncaption\n```\n").unwrap();
        assert!(spans.is_empty());
    }

    #[test]
    fn test_missing_closing_fence_is_structural_error() {
        let err = locate("Intro\n\n:::{note}\nbody\n").unwrap_err();
        assert_eq!(
            err,
            TransformError::Structural {
                document: "t.md".into(),
                line: 3,
            }
        );
    }

    #[test]
    fn test_header_mismatch_is_reported() {
        let doc = Document::new("t.md", "plain line\nbody\n:::\n");
        let err = AdmonitionRewriter::new()
            .rewrite(&doc, &[span(0, 2)])
            .unwrap_err();
        assert!(matches!(err, TransformError::HeaderMatch { line: 1, .. }));
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let locator = AdmonitionLocator::new(ParseOptions::default());
        let rewriter = AdmonitionRewriter::new();
        let doc = Document::new("t.md", ":::{note} T\nbody\n:::\n");
        let once = rewriter.rewrite(&doc, &locator.locate(&doc).unwrap()).unwrap();
        let twice = rewriter.rewrite(&once, &locator.locate(&once).unwrap()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_header_title_is_trimmed() {
        let header = AdmonitionRewriter::new()
            .parse_header("  ::: { tip }   Be careful  ")
            .unwrap();
        assert_eq!(
            header,
            AdmonitionHeader {
                kind: "tip".into(),
                title: "Be careful".into(),
            }
        );
    }

    /// Parser stub that reports one admonition and a following node.
    struct FixedParser;

    impl StructuralParser for FixedParser {
        fn parse(
            &self,
            _text: &str,
            _source_name: &str,
            _options: &ParseOptions,
        ) -> Result<DocTree, TransformError> {
            let mut tree = DocTree::default();
            tree.push(NodeKind::directive("note"), 2, 8, None);
            tree.push(NodeKind::Paragraph, 6, 6, None);
            Ok(tree)
        }
    }

    #[test]
    fn test_search_is_bounded_by_following_node() {
        let text = "x\n:::{note}\na\n:::\n\nnext\n:::\n";
        let locator = AdmonitionLocator::with_parser(FixedParser, ParseOptions::default());
        let spans = locator.locate(&Document::new("t.md", text)).unwrap();
        assert_eq!(spans, vec![span(1, 3)]);
    }
}
