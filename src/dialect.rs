//! Template dialect detection

/// Attribute-name prefix that marks a component root
pub const COMPONENT_MARKER: &str = "data-v-component-";

/// Render strategy for a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Attribute-driven stamping of `data-v-component-*` roots
    ComponentLoop,
    /// Directive lines followed by a markup skeleton
    RuleScript,
}

impl Dialect {
    /// Pick the dialect from raw template text
    ///
    /// The check is textual: a marker mentioned inside a comment or an attribute value still
    /// selects the component dialect.
    pub fn choose(text: &str) -> Self {
        if text.contains(COMPONENT_MARKER) {
            Dialect::ComponentLoop
        } else {
            Dialect::RuleScript
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::ComponentLoop => write!(f, "component-loop"),
            Dialect::RuleScript => write!(f, "rule-script"),
        }
    }
}
