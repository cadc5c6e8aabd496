use crate::document::Document;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// Opening line of an exercise/solution delimiter group.
const MARKER_HEADER: &str = r"
    (?P<newlines>\n*)
    \s*(?P<fence>:{3,}|`{3,}|~{3,})\s*
    \{\s*
    (?P<kind>exercise|solution)-
    (?P<role>start|end)
    \s*\}
";

/// Rest of the group up to the closing fence, which is appended per fence
/// since `regex` has no backreferences.
const MARKER_BODY: &str = r"
    \s*
    (?P<suffix>\S+)?\s*
    \n
    (?P<attrs>\s*:\S+:\s*\S+\s*\n)*
    \n*
    \s*
";

/// Pattern of a whole group, anchored at its start, whose closing fence
/// repeats `fence` exactly.
fn group_pattern(fence: &str) -> String {
    format!(
        r"(?x)\A{}{}(?P<close>{})\s*\n",
        MARKER_HEADER,
        MARKER_BODY,
        regex::escape(fence)
    )
}

/// Whether a marker opens or closes an exercise or a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Exercise,
    Solution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerRole {
    Start,
    End,
}

/// One recognised delimiter group.
///
/// The suffix and the attribute lines are kept for logging only; they never
/// reach the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub role: MarkerRole,
    pub suffix: Option<String>,
    pub attributes: Vec<String>,
    /// Blank lines matched before the opening fence.
    pub leading_newlines: usize,
}

impl Marker {
    fn from_captures(text: &str, caps: &Captures<'_>) -> Self {
        let kind = match &caps["kind"] {
            "exercise" => MarkerKind::Exercise,
            _ => MarkerKind::Solution,
        };
        let role = match &caps["role"] {
            "start" => MarkerRole::Start,
            _ => MarkerRole::End,
        };

        // A repeated group only captures its last repetition, so the attribute
        // lines are re-read from the text between the header and the close.
        let attributes = match (caps.name("attrs"), caps.name("close")) {
            (Some(_), Some(close)) => {
                let header_end = caps
                    .name("suffix")
                    .or_else(|| caps.name("role"))
                    .map_or(close.start(), |m| m.end());
                text[header_end..close.start()]
                    .lines()
                    .skip(1)
                    .map(str::trim)
                    .filter(|line| line.starts_with(':'))
                    .map(str::to_string)
                    .collect()
            }
            _ => Vec::new(),
        };

        Self {
            kind,
            role,
            suffix: caps.name("suffix").map(|m| m.as_str().to_string()),
            attributes,
            leading_newlines: caps["newlines"].len(),
        }
    }

    /// Text that replaces the whole delimiter group.
    pub fn replacement(&self) -> String {
        let role = match self.role {
            MarkerRole::Start => "start",
            MarkerRole::End => "end",
        };
        match self.kind {
            MarkerKind::Exercise => {
                let heading = match self.role {
                    MarkerRole::Start => "Start",
                    MarkerRole::End => "End",
                };
                format!(
                    "{}**{} of exercise**\n\n",
                    "\n".repeat(self.leading_newlines),
                    heading
                )
            }
            MarkerKind::Solution => format!("\n<!-- {}-solution -->\n", role),
        }
    }
}

/// Rewrites exercise and solution delimiters into canonical inline markers.
///
/// Exercises become bold `Start of exercise` / `End of exercise` lines.
/// Solutions become `<!-- start-solution -->` / `<!-- end-solution -->`
/// comments, which [`SolutionCollapser`](crate::SolutionCollapser) consumes.
/// This pass must run before every other text pass.
pub struct MarkerRewriter {
    header: Regex,
}

impl MarkerRewriter {
    pub fn new() -> Self {
        Self {
            header: Regex::new(&format!("(?x){}", MARKER_HEADER))
                .expect("marker pattern is valid"),
        }
    }

    pub fn rewrite(&self, doc: &Document) -> Document {
        doc.with_text(self.rewrite_text(doc.text()))
    }

    /// Replaces every marker group in `text`.
    ///
    /// Each candidate start found by the header pattern is matched against
    /// the group pattern for its own fence. When that fails, scanning resumes
    /// one character later.
    pub fn rewrite_text(&self, text: &str) -> String {
        let mut groups: HashMap<String, Regex> = HashMap::new();
        let mut out = String::with_capacity(text.len());
        let mut copied = 0;
        let mut pos = 0;

        while pos <= text.len() {
            let Some(header) = self.header.captures_at(text, pos) else {
                break;
            };
            let start = header.get(0).map_or(pos, |m| m.start());
            let group = groups
                .entry(header["fence"].to_string())
                .or_insert_with_key(|fence| {
                    Regex::new(&group_pattern(fence)).expect("marker pattern is valid")
                });

            let rest = &text[start..];
            let Some(caps) = group.captures(rest) else {
                pos = start + rest.chars().next().map_or(1, char::len_utf8);
                continue;
            };
            let end = start + caps.get(0).map_or(0, |m| m.end());

            let marker = Marker::from_captures(rest, &caps);
            log::debug!(
                "Rewriting {:?} {:?} marker (suffix: {:?}, {} attribute line(s))",
                marker.kind,
                marker.role,
                marker.suffix,
                marker.attributes.len()
            );

            out.push_str(&text[copied..start]);
            out.push_str(&marker.replacement());
            copied = end;
            pos = end;
        }

        out.push_str(&text[copied..]);
        out
    }
}

impl Default for MarkerRewriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(text: &str) -> String {
        MarkerRewriter::new().rewrite_text(text)
    }

    #[test]
    fn test_exercise_markers_keep_leading_blank_lines() {
        let text = "Intro\n\n```{exercise-start}\n:label: ex-1\n```\n\nDo it.\n\n```{exercise-end}\n```\n";
        assert_eq!(
            rewrite(text),
            "Intro\n\n**Start of exercise**\n\nDo it.\n\n**End of exercise**\n\n"
        );
    }

    #[test]
    fn test_exercise_suffix_and_attributes_are_dropped() {
        let text = "\n:::{exercise-start} my-suffix\n:label: ex-2\n:class: dropdown\n:::\nBody\n";
        let out = rewrite(text);
        assert_eq!(out, "\n**Start of exercise**\n\nBody\n");
        assert!(!out.contains("my-suffix"));
        assert!(!out.contains(":label:"));
    }

    #[test]
    fn test_solution_markers_become_comments() {
        let text = "Q\n\n```{solution-start} ex-1\n```\n\nAnswer\n\n```{solution-end}\n```\n";
        assert_eq!(
            rewrite(text),
            "Q\n<!-- start-solution -->\nAnswer\n<!-- end-solution -->\n"
        );
    }

    #[test]
    fn test_mismatched_closing_fence_is_not_a_marker() {
        let text = "\n```{exercise-start}\n~~~\nBody\n";
        assert_eq!(rewrite(text), text);
    }

    #[test]
    fn test_long_colon_fence_before_code_block() {
        // `::::` also reads as an attribute line; the group must still close
        // on it rather than on the later backtick fence.
        let text = "Intro\n\n::::{solution-start}\n::::\n\n```\ncode\n```\n\n::::{solution-end}\n::::\n\nAfter\n";
        assert_eq!(
            rewrite(text),
            "Intro\n<!-- start-solution -->\n```\ncode\n```\n<!-- end-solution -->\nAfter\n"
        );
    }

    #[test]
    fn test_attribute_lines_before_long_colon_fence() {
        let text = "\n::::{exercise-start}\n:label: ex-3\n::::\n\n```\nx\n```\n";
        assert_eq!(rewrite(text), "\n**Start of exercise**\n\n```\nx\n```\n");
    }

    #[test]
    fn test_tilde_fences_are_recognised() {
        let text = "\n~~~{exercise-end}\n~~~\n";
        assert_eq!(rewrite(text), "\n**End of exercise**\n\n");
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let text = "A\n\n```{exercise-start}\n```\n\nB\n\n```{solution-start}\n```\n\nC\n\n```{solution-end}\n```\n\n```{exercise-end}\n```\n";
        let once = rewrite(text);
        assert_eq!(rewrite(&once), once);
    }

    #[test]
    fn test_other_directives_untouched() {
        let text = "```{note}\nnot a marker\n```\n";
        assert_eq!(rewrite(text), text);
    }

    #[test]
    fn test_marker_attributes_are_collected() {
        let text = "\n```{exercise-start}\n:label: ex-1\n:class: hard\n```\n";
        let caps = Regex::new(&group_pattern("```")).unwrap().captures(text).unwrap();
        let marker = Marker::from_captures(text, &caps);
        assert_eq!(marker.kind, MarkerKind::Exercise);
        assert_eq!(marker.role, MarkerRole::Start);
        assert_eq!(marker.attributes, vec![":label: ex-1", ":class: hard"]);
        assert_eq!(marker.leading_newlines, 1);
    }
}
