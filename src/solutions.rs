use crate::document::Document;
use regex::{NoExpand, Regex};

const SOLUTION_PATTERN: &str = r"(?s)\n?<!--\sstart-solution\s-->\n.*?<!--\send-solution\s-->\n?";

const LINK_TEXT: &str = "corresponding page";

/// Collapses marked solution regions into a pointer to the rendered page.
///
/// Works on the `<!-- start-solution -->` / `<!-- end-solution -->` comments
/// emitted by [`MarkerRewriter`](crate::MarkerRewriter), so it has to run
/// after it. Only balanced pairs are replaced; a start marker without an end
/// stays in the text.
pub struct SolutionCollapser {
    pattern: Regex,
}

impl SolutionCollapser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(SOLUTION_PATTERN).expect("solution pattern is valid"),
        }
    }

    pub fn collapse(&self, doc: &Document, page_url: Option<&str>) -> Document {
        doc.with_text(self.collapse_text(doc.text(), page_url))
    }

    pub fn collapse_text(&self, text: &str, page_url: Option<&str>) -> String {
        let replacement = format!("\n**See the {} for solution**\n\n", page_link(page_url));
        self.pattern
            .replace_all(text, NoExpand(&replacement))
            .into_owned()
    }
}

impl Default for SolutionCollapser {
    fn default() -> Self {
        Self::new()
    }
}

fn page_link(page_url: Option<&str>) -> String {
    match page_url {
        Some(url) if !url.is_empty() => format!("[{}]({})", LINK_TEXT, url),
        _ => LINK_TEXT.to_string(),
    }
}
