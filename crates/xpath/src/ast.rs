//! Expression tree for XPath 1.0 selectors.
//!
//! The tree is immutable once built. Abbreviated syntax is expanded by the
//! parser (`//`, `.`, `..`, `@`), so consumers only ever see full steps.

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    /// The operator with its operands swapped (`a < b` is `b > a`).
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        Self { prefix: None, local: local.into() }
    }
}

impl std::fmt::Display for QName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    FunctionCall {
        name: QName,
        args: Vec<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Comparison {
        left: Box<Expr>,
        op: ComparisonOp,
        right: Box<Expr>,
    },
    Negate(Box<Expr>),
    Union {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `/a/b`, `//a`, `a/b`
    LocationPath(LocationPath),
    /// `(expr)/a/b`: a filter expression followed by steps.
    Path {
        filter: Box<Expr>,
        steps: Vec<Step>,
    },
    /// `(expr)[p1][p2]`
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Child,
    Descendant,
    Attribute,
    SelfAxis,
    DescendantOrSelf,
    FollowingSibling,
    Following,
    Namespace,
    Parent,
    Ancestor,
    PrecedingSibling,
    Preceding,
    AncestorOrSelf,
}

impl Axis {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Child => "child",
            Self::Descendant => "descendant",
            Self::Attribute => "attribute",
            Self::SelfAxis => "self",
            Self::DescendantOrSelf => "descendant-or-self",
            Self::FollowingSibling => "following-sibling",
            Self::Following => "following",
            Self::Namespace => "namespace",
            Self::Parent => "parent",
            Self::Ancestor => "ancestor",
            Self::PrecedingSibling => "preceding-sibling",
            Self::Preceding => "preceding",
            Self::AncestorOrSelf => "ancestor-or-self",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Self::Child,
            "descendant" => Self::Descendant,
            "attribute" => Self::Attribute,
            "self" => Self::SelfAxis,
            "descendant-or-self" => Self::DescendantOrSelf,
            "following-sibling" => Self::FollowingSibling,
            "following" => Self::Following,
            "namespace" => Self::Namespace,
            "parent" => Self::Parent,
            "ancestor" => Self::Ancestor,
            "preceding-sibling" => Self::PrecedingSibling,
            "preceding" => Self::Preceding,
            "ancestor-or-self" => Self::AncestorOrSelf,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    pub fn new(axis: Axis, test: NodeTest) -> Self {
        Self { axis, test, predicates: Vec::new() }
    }

    /// `descendant-or-self::node()`, the expansion of `//`.
    pub fn descendant_or_self_node() -> Self {
        Self::new(Axis::DescendantOrSelf, NodeTest::Kind(KindTest::AnyKind))
    }

    #[must_use]
    pub fn with_predicates(mut self, predicates: Vec<Expr>) -> Self {
        self.predicates = predicates;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    Name(NameTest),
    Kind(KindTest),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NameTest {
    QName(QName),
    Wildcard(WildcardName),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WildcardName {
    /// `*`
    Any,
    /// `prefix:*`
    Prefix(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum KindTest {
    /// `node()`
    AnyKind,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}
