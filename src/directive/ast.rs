//! Syntax tree for legacy-dialect directive scripts

pub use crate::error::Span;

/// Directive with its source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// `foreach ($list as $item)` or `foreach ($list as $key => $item)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeachClause {
    pub list: String,
    pub key: Option<String>,
    pub item: String,
}

/// `$var = $this->_component['name']`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBinding {
    pub variable: String,
    pub component: String,
}

/// What a rule writes on its targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Replace the text content (`|innerText` or no action)
    Text,
    /// Set the named attribute
    Attribute(String),
}

impl Action {
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "" | "innerText" => Action::Text,
            other => Action::Attribute(other.to_string()),
        }
    }
}

/// `selector[|action] = expression`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleLine {
    pub selector: String,
    pub action: Action,
    pub expr: String,
}

/// One line of the directive region
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `@name = selector`
    Alias { name: String, selector: String },
    /// A `|before` line; `declares_foreach` when it also mentions `foreach`
    LoopStart {
        anchor: String,
        declares_foreach: bool,
        clause: Option<ForeachClause>,
    },
    /// An `|after` line
    LoopEnd { anchor: String },
    ContextBinding(ContextBinding),
    Rule(RuleLine),
    /// Blank lines, comments, and anything else the engine does not act on
    Verbatim,
}
