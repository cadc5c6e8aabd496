//! Block-level structural parse of MyST Markdown.
//!
//! The admonition passes only need to know where blocks begin and how they
//! nest. [`StructuralParser`] is that narrow interface; [`MystParser`] is the
//! implementation used by the command line tool.

mod parser;
mod tree;

pub use parser::MystParser;
pub use tree::{DocTree, NodeId, NodeKind, ParseNode};

use crate::error::TransformError;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Builds a [`DocTree`] from document text.
pub trait StructuralParser {
    fn parse(
        &self,
        text: &str,
        source_name: &str,
        options: &ParseOptions,
    ) -> Result<DocTree, TransformError>;
}

/// MyST syntax extensions.
///
/// Only `colon_fence`, `dollarmath` and `amsmath` change block structure; the
/// rest are inline syntax and are accepted so that a book's configuration can
/// be passed through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Extension {
    AmsMath,
    AttrsInline,
    ColonFence,
    Deflist,
    DollarMath,
    Fieldlist,
    HtmlAdmonition,
    HtmlImage,
    Linkify,
    Replacements,
    Smartquotes,
    Strikethrough,
    Substitution,
    Tasklist,
}

impl Extension {
    pub const ALL: [Extension; 14] = [
        Extension::AmsMath,
        Extension::AttrsInline,
        Extension::ColonFence,
        Extension::Deflist,
        Extension::DollarMath,
        Extension::Fieldlist,
        Extension::HtmlAdmonition,
        Extension::HtmlImage,
        Extension::Linkify,
        Extension::Replacements,
        Extension::Smartquotes,
        Extension::Strikethrough,
        Extension::Substitution,
        Extension::Tasklist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Extension::AmsMath => "amsmath",
            Extension::AttrsInline => "attrs_inline",
            Extension::ColonFence => "colon_fence",
            Extension::Deflist => "deflist",
            Extension::DollarMath => "dollarmath",
            Extension::Fieldlist => "fieldlist",
            Extension::HtmlAdmonition => "html_admonition",
            Extension::HtmlImage => "html_image",
            Extension::Linkify => "linkify",
            Extension::Replacements => "replacements",
            Extension::Smartquotes => "smartquotes",
            Extension::Strikethrough => "strikethrough",
            Extension::Substitution => "substitution",
            Extension::Tasklist => "tasklist",
        }
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Extension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Extension::ALL
            .iter()
            .find(|ext| ext.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown MyST extension '{}'", s))
    }
}

/// Diagnostic severity, ordered like docutils reporter levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info = 1,
    Warning = 2,
    Error = 3,
    Severe = 4,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Severe => "SEVERE",
        };
        f.write_str(name)
    }
}

/// A message produced while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// 1-indexed source line
    pub line: usize,
    pub message: String,
}

/// Parser configuration.
///
/// Diagnostics at or above `report_level` are logged; the first diagnostic at
/// or above `halt_level` turns into [`TransformError::Parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub extensions: BTreeSet<Extension>,
    pub report_level: Severity,
    pub halt_level: Severity,
}

impl ParseOptions {
    pub fn with_extensions(extensions: impl IntoIterator<Item = Extension>) -> Self {
        Self {
            extensions: extensions.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn enabled(&self, extension: Extension) -> bool {
        self.extensions.contains(&extension)
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            extensions: Extension::ALL.into_iter().collect(),
            report_level: Severity::Severe,
            halt_level: Severity::Severe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_names_round_trip() {
        for ext in Extension::ALL {
            assert_eq!(ext.as_str().parse::<Extension>(), Ok(ext));
        }
        assert!("mermaid".parse::<Extension>().is_err());
    }

    #[test]
    fn test_default_options_enable_everything() {
        let options = ParseOptions::default();
        assert!(options.enabled(Extension::ColonFence));
        assert_eq!(options.extensions.len(), Extension::ALL.len());
        assert_eq!(options.halt_level, Severity::Severe);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Error < Severity::Severe);
    }
}
