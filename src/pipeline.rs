use crate::admonitions::{AdmonitionLocator, AdmonitionRewriter};
use crate::document::Document;
use crate::error::TransformError;
use crate::markers::MarkerRewriter;
use crate::myst::{MystParser, ParseOptions, StructuralParser};
use crate::solutions::SolutionCollapser;

/// The text passes, in the order they have to run.
///
/// 1. exercise/solution delimiters become inline markers
/// 2. marked solutions collapse into a link to the rendered page
/// 3. admonition fences become bold start/end lines
///
/// Each pass takes a [`Document`] and returns a new one.
pub struct TextPipeline<P = MystParser> {
    markers: MarkerRewriter,
    solutions: SolutionCollapser,
    locator: AdmonitionLocator<P>,
    rewriter: AdmonitionRewriter,
}

impl TextPipeline<MystParser> {
    pub fn new(options: ParseOptions) -> Self {
        Self::with_parser(MystParser::new(), options)
    }
}

impl<P: StructuralParser> TextPipeline<P> {
    pub fn with_parser(parser: P, options: ParseOptions) -> Self {
        Self {
            markers: MarkerRewriter::new(),
            solutions: SolutionCollapser::new(),
            locator: AdmonitionLocator::with_parser(parser, options),
            rewriter: AdmonitionRewriter::new(),
        }
    }

    /// Runs every pass over `doc`. `page_url` is the rendered page that
    /// collapsed solutions link to.
    pub fn run(&self, doc: &Document, page_url: Option<&str>) -> Result<Document, TransformError> {
        let marked = self.markers.rewrite(doc);
        let collapsed = self.solutions.collapse(&marked, page_url);
        let spans = self.locator.locate(&collapsed)?;
        log::debug!("{}: {} admonition(s)", doc.name(), spans.len());
        self.rewriter.rewrite(&collapsed, &spans)
    }
}
