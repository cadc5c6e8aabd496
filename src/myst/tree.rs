use super::Diagnostic;

/// Index of a node inside its [`DocTree`].
pub type NodeId = usize;

/// Admonition directives; docutils models each of them as an admonition node.
const ADMONITIONS: &[&str] = &[
    "admonition",
    "attention",
    "caution",
    "danger",
    "error",
    "hint",
    "important",
    "note",
    "seealso",
    "tip",
    "warning",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    FrontMatter,
    Heading,
    Paragraph,
    /// `(label)=` cross-reference target
    Target,
    /// `+++` block break
    BlockBreak,
    /// `%` comment line
    Comment,
    ThematicBreak,
    CodeBlock,
    Math,
    Admonition(String),
    /// Any other `{name}` directive
    Directive(String),
}

impl NodeKind {
    /// Kind for a `{name}` directive fence.
    pub fn directive(name: &str) -> Self {
        if ADMONITIONS.contains(&name) {
            NodeKind::Admonition(name.to_string())
        } else {
            NodeKind::Directive(name.to_string())
        }
    }

    pub fn is_admonition(&self) -> bool {
        matches!(self, NodeKind::Admonition(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNode {
    pub kind: NodeKind,
    /// 1-indexed line on which the node begins.
    pub line: usize,
    /// 1-indexed last line covered by the node, closing fence included.
    pub end_line: usize,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Parse result: nodes stored in document order (depth-first pre-order).
#[derive(Debug, Clone, Default)]
pub struct DocTree {
    nodes: Vec<ParseNode>,
    roots: Vec<NodeId>,
    diagnostics: Vec<Diagnostic>,
}

impl DocTree {
    /// Appends a node. Parents must be pushed before their children.
    pub(crate) fn push(
        &mut self,
        kind: NodeKind,
        line: usize,
        end_line: usize,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(ParseNode {
            kind,
            line,
            end_line,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn node(&self, id: NodeId) -> &ParseNode {
        &self.nodes[id]
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Depth-first traversal in document order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ParseNode)> {
        self.nodes.iter().enumerate()
    }

    pub fn admonitions(&self) -> impl Iterator<Item = (NodeId, &ParseNode)> {
        self.iter().filter(|(_, node)| node.kind.is_admonition())
    }

    /// First node after `id` that is not one of its descendants: the next
    /// sibling, or else the next sibling of the closest ancestor that has one.
    pub fn following(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let parent = self.nodes[current].parent;
            let siblings = match parent {
                Some(p) => &self.nodes[p].children,
                None => &self.roots,
            };
            let position = siblings.iter().position(|&s| s == current)?;
            if let Some(&next) = siblings.get(position + 1) {
                return Some(next);
            }
            current = parent?;
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DocTree {
        // 0 note
        //   1 paragraph
        //   2 tip
        //     3 paragraph
        // 4 paragraph
        let mut tree = DocTree::default();
        let note = tree.push(NodeKind::directive("note"), 1, 7, None);
        tree.push(NodeKind::Paragraph, 2, 2, Some(note));
        let tip = tree.push(NodeKind::directive("tip"), 3, 6, Some(note));
        tree.push(NodeKind::Paragraph, 4, 4, Some(tip));
        tree.push(NodeKind::Paragraph, 9, 9, None);
        tree
    }

    #[test]
    fn test_following_prefers_siblings() {
        let tree = sample();
        assert_eq!(tree.following(1), Some(2));
        assert_eq!(tree.following(0), Some(4));
    }

    #[test]
    fn test_following_ascends_to_ancestors() {
        let tree = sample();
        assert_eq!(tree.following(3), Some(4));
        assert_eq!(tree.following(2), Some(4));
        assert_eq!(tree.following(4), None);
    }

    #[test]
    fn test_admonitions_in_document_order() {
        let tree = sample();
        let found: Vec<_> = tree.admonitions().map(|(id, _)| id).collect();
        assert_eq!(found, vec![0, 2]);
    }

    #[test]
    fn test_directive_classification() {
        assert!(NodeKind::directive("warning").is_admonition());
        assert!(!NodeKind::directive("figure").is_admonition());
    }
}
