/// Direction of a search relative to its base element.
///
/// Only [`TreeScope::native`] scopes map onto a single `FindFirst`/`FindAll`
/// call; the others are rendered as walker loops over a `TreeWalker`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeScope {
    Element,
    Parent,
    Children,
    ChildrenOrSelf,
    Descendants,
    /// Descendants plus the element itself.
    Subtree,
    Ancestors,
    AncestorsOrSelf,
    Following,
    FollowingSibling,
    Preceding,
    PrecedingSibling,
}

impl TreeScope {
    /// `[TreeScope]::<Member>` for scopes the UI Automation API searches natively.
    pub fn native(self) -> Option<&'static str> {
        match self {
            Self::Element => Some("[TreeScope]::Element"),
            Self::Children => Some("[TreeScope]::Children"),
            Self::Descendants => Some("[TreeScope]::Descendants"),
            Self::Subtree => Some("[TreeScope]::Subtree"),
            _ => None,
        }
    }

    /// Scopes whose results are emitted nearest-first rather than in document order.
    pub fn is_reverse(self) -> bool {
        matches!(self, Self::Parent | Self::Ancestors | Self::AncestorsOrSelf | Self::Preceding | Self::PrecedingSibling)
    }
}
