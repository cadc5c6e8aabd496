use thiserror::Error;

/// Errors raised while transforming a single source document.
///
/// Every variant is fatal for the document it names. The batch driver decides
/// whether the remaining documents are still processed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The structural parser reported a diagnostic at or above the halt level.
    #[error("{document}:{line}: parse error: {message}")]
    Parse {
        document: String,
        /// 1-indexed source line
        line: usize,
        message: String,
    },

    /// An admonition has no closing fence between its header and its bound.
    #[error("{document}:{line}: could not find closing fence for admonition")]
    Structural {
        document: String,
        /// 1-indexed line of the admonition header
        line: usize,
    },

    /// A located span does not start with an admonition header.
    #[error("{document}:{line}: cannot match admonition header in {text:?}")]
    HeaderMatch {
        document: String,
        /// 1-indexed source line
        line: usize,
        text: String,
    },

    /// The rewritten text could not be read as a notebook.
    #[error("{document}: notebook error: {message}")]
    Notebook { document: String, message: String },
}

impl TransformError {
    /// Short name of the error kind, used in failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            TransformError::Parse { .. } => "parse",
            TransformError::Structural { .. } => "structure",
            TransformError::HeaderMatch { .. } => "header",
            TransformError::Notebook { .. } => "notebook",
        }
    }
}
