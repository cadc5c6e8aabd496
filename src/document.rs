/// A source document flowing through the text passes.
///
/// Documents are never edited in place; every pass returns a new value so the
/// output of each stage can be inspected on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    name: String,
    text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Name used in diagnostics, usually the path relative to the book root.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// 0-indexed lines without their terminators.
    pub fn lines(&self) -> Vec<&str> {
        self.text.lines().collect()
    }

    /// New document with the same name and different text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            name: self.name.clone(),
            text: text.into(),
        }
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
