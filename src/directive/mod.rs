//! Directive scripts of the legacy template dialect
//!
//! A legacy template is a block of directive lines followed by markup. Everything before the
//! first `<` is the directive region; everything from it onward is the skeleton.

pub mod ast;
mod grammar;
pub mod lexer;

use std::collections::HashMap;

use crate::dom::{Selector, SelectorError};
use crate::error::{Diagnostic, DiagnosticKind};

pub use ast::*;
pub use grammar::parse_index;

/// Mapping from `@name` tokens to selector text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an alias; a later definition of the same name wins
    pub fn insert(&mut self, name: impl Into<String>, selector: impl Into<String>) {
        self.aliases.insert(name.into(), selector.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// Resolve a selector token: the aliased selector for a defined alias, otherwise the
    /// token itself
    pub fn resolve<'a>(&'a self, token: &'a str) -> &'a str {
        let token = token.trim();
        self.get(token).unwrap_or(token)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// The first loop of a script, with everything needed to expand it
#[derive(Debug, Clone, PartialEq)]
pub struct LoopPlan<'s> {
    pub anchor: &'s str,
    pub clause: Option<&'s ForeachClause>,
    pub binding: Option<&'s ContextBinding>,
    pub body: Vec<&'s RuleLine>,
    pub terminated: bool,
}

impl LoopPlan<'_> {
    /// Resolve a rule's selector for one stamped item
    ///
    /// The selector applies to the item and its descendants. `@item .name`, the loop's own
    /// anchor token followed by more selector text, is read as that text scoped to the item.
    /// Anything else, the anchor token alone included, is resolved through the alias table
    /// as a whole token.
    pub fn rule_selector(
        &self,
        rule: &RuleLine,
        aliases: &AliasTable,
    ) -> Result<Selector, SelectorError> {
        let selector = rule.selector.trim();
        if !self.anchor.is_empty() {
            if let Some(rest) = selector
                .strip_prefix(self.anchor)
                .filter(|rest| rest.starts_with(char::is_whitespace))
            {
                return Selector::parse(rest);
            }
        }
        Selector::parse(aliases.resolve(selector))
    }
}

/// A parsed legacy template
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub directives: Vec<Spanned<Directive>>,
    pub skeleton: String,
    parse_diagnostics: Vec<Diagnostic>,
}

impl Script {
    /// Split a template into directives and skeleton
    pub fn parse(source: &str) -> Self {
        let (region, skeleton) = match source.find('<') {
            Some(start) => source.split_at(start),
            None => (source, ""),
        };

        let mut directives = Vec::new();
        let mut parse_diagnostics = Vec::new();
        let mut offset = 0;
        for raw_line in region.split_inclusive('\n') {
            let line = raw_line.trim_end_matches(['\n', '\r']);
            let directive = classify(line, offset, &mut parse_diagnostics);
            directives.push(Spanned::new(directive, offset..offset + line.len()));
            offset += raw_line.len();
        }

        Self {
            directives,
            skeleton: skeleton.to_string(),
            parse_diagnostics,
        }
    }

    /// Aliases defined anywhere in the directive region
    pub fn aliases(&self) -> AliasTable {
        let mut table = AliasTable::new();
        for directive in &self.directives {
            if let Directive::Alias { name, selector } = &directive.node {
                table.insert(name.as_str(), selector.as_str());
            }
        }
        table
    }

    /// The first loop declaration, if any
    pub fn loop_plan(&self) -> Option<LoopPlan<'_>> {
        let start = self.loop_declarations().next()?;
        let Directive::LoopStart { anchor, clause, .. } = &self.directives[start].node else {
            return None;
        };

        let end = self.directives[start + 1..]
            .iter()
            .position(|d| matches!(d.node, Directive::LoopEnd { .. }))
            .map(|i| start + 1 + i);

        let body = self.directives[start + 1..end.unwrap_or(self.directives.len())]
            .iter()
            .filter_map(|d| match &d.node {
                Directive::Rule(rule) => Some(rule),
                _ => None,
            })
            .collect();

        let binding = self.directives.iter().find_map(|d| match &d.node {
            Directive::ContextBinding(binding) => Some(binding),
            _ => None,
        });

        Some(LoopPlan {
            anchor: anchor.as_str(),
            clause: clause.as_ref(),
            binding,
            body,
            terminated: end.is_some(),
        })
    }

    fn loop_declarations(&self) -> impl Iterator<Item = usize> + '_ {
        self.directives.iter().enumerate().filter_map(|(i, d)| {
            matches!(
                d.node,
                Directive::LoopStart {
                    declares_foreach: true,
                    ..
                }
            )
            .then_some(i)
        })
    }

    /// Static findings about the script; none of them affect rendering
    pub fn check(&self) -> Vec<Diagnostic> {
        let mut diagnostics = self.parse_diagnostics.clone();
        let aliases = self.aliases();

        for directive in &self.directives {
            let anchor = match &directive.node {
                Directive::LoopStart { anchor, .. } | Directive::LoopEnd { anchor } => anchor,
                _ => continue,
            };
            if anchor.starts_with('@') && aliases.get(anchor).is_none() {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UndefinedAlias,
                    format!("'{}' is not defined by any '@name = selector' line", anchor),
                    directive.span.clone(),
                ));
            }
        }

        for extra in self.loop_declarations().skip(1) {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::IgnoredLoop,
                "only the first foreach loop is expanded",
                self.directives[extra].span.clone(),
            ));
        }

        let Some(plan) = self.loop_plan() else {
            return diagnostics;
        };
        let Some(start) = self.loop_declarations().next() else {
            return diagnostics;
        };
        let loop_span = self.directives[start].span.clone();

        if plan.binding.is_none() {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::MissingContextBinding,
                "no `$var = $this->_component['name']` line; the loop renders no items",
                loop_span.clone(),
            ));
        }
        if !plan.terminated {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnterminatedLoop,
                "no `|after` line; the loop body runs to the end of the directives",
                loop_span.clone(),
            ));
        }
        if let Err(err) = Selector::parse(aliases.resolve(plan.anchor)) {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::InvalidSelector,
                format!("loop anchor: {}", err),
                loop_span,
            ));
        }

        for directive in &self.directives[start + 1..] {
            match &directive.node {
                Directive::LoopEnd { .. } => break,
                Directive::Rule(rule) => {
                    if let Err(err) = plan.rule_selector(rule, &aliases) {
                        diagnostics.push(Diagnostic::new(
                            DiagnosticKind::InvalidSelector,
                            err.to_string(),
                            directive.span.clone(),
                        ));
                    }
                }
                _ => {}
            }
        }

        diagnostics.sort_by_key(|d| d.span.start);
        diagnostics
    }
}

fn classify(line: &str, offset: usize, diagnostics: &mut Vec<Diagnostic>) -> Directive {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with("//") {
        return Directive::Verbatim;
    }
    let base = offset + (line.len() - line.trim_start().len());

    if trimmed.contains("_component") {
        if let Some(binding) = grammar::find_context_binding(trimmed) {
            return Directive::ContextBinding(binding);
        }
    }

    if trimmed.contains("|before") {
        let anchor = trimmed.split('|').next().unwrap_or_default().trim().to_string();
        let declares_foreach = trimmed.contains("foreach");
        let clause = if declares_foreach {
            match grammar::parse_foreach(trimmed) {
                Ok(Some(clause)) => Some(clause),
                Ok(None) => {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::MalformedForeach,
                        "line mentions foreach but has no `foreach (...)` clause",
                        base..base + trimmed.len(),
                    ));
                    None
                }
                Err(errors) => {
                    diagnostics.extend(errors.into_iter().map(|err| {
                        let err = err.offset(base);
                        Diagnostic::new(DiagnosticKind::MalformedForeach, err.describe(), err.span)
                    }));
                    None
                }
            }
        } else {
            None
        };
        return Directive::LoopStart {
            anchor,
            declares_foreach,
            clause,
        };
    }

    if trimmed.contains("|after") {
        let anchor = trimmed.split('|').next().unwrap_or_default().trim().to_string();
        return Directive::LoopEnd { anchor };
    }

    let Some(eq) = find_top_level(trimmed, '=') else {
        return Directive::Verbatim;
    };
    let left = trimmed[..eq].trim();
    let right = trimmed[eq + 1..].trim();
    if left.is_empty() || left.starts_with('$') {
        return Directive::Verbatim;
    }

    if is_alias_name(left) {
        if right.is_empty() {
            return Directive::Verbatim;
        }
        return Directive::Alias {
            name: left.to_string(),
            selector: right.to_string(),
        };
    }

    let (selector, action) = match find_top_level(left, '|') {
        Some(bar) => (left[..bar].trim(), Action::from_name(&left[bar + 1..])),
        None => (left, Action::Text),
    };
    if selector.is_empty() {
        return Directive::Verbatim;
    }
    Directive::Rule(RuleLine {
        selector: selector.to_string(),
        action,
        expr: right.to_string(),
    })
}

/// `@` followed by one or more name characters
fn is_alias_name(token: &str) -> bool {
    token
        .strip_prefix('@')
        .is_some_and(|name| {
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}

/// Byte index of the first `needle` outside brackets, parentheses and quotes
fn find_top_level(text: &str, needle: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth = depth.saturating_sub(1),
            (None, c) if c == needle && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CATEGORY_LIST: &str = "\
@cat = [data-v-cat]
@cat|before = foreach ($categories as $cat) {
$categories = $this->_component['contentcategories'];
@cat [data-v-cat-name] = $cat['name']
@cat|href = $cat['url']
@cat|after = }
<ul><li data-v-cat><a data-v-cat-name>x</a></li></ul>";

    #[test]
    fn test_skeleton_starts_at_first_angle_bracket() {
        let script = Script::parse("@a = .x\n  <div class=\"x\"></div>");
        assert_eq!(script.skeleton, "<div class=\"x\"></div>");
        assert_eq!(script.directives.len(), 2);
    }

    #[test]
    fn test_no_markup_means_empty_skeleton() {
        let script = Script::parse("@a = .x\n@b = .y\n");
        assert_eq!(script.skeleton, "");
        assert_eq!(script.aliases().len(), 2);
    }

    #[test]
    fn test_classifies_lines() {
        let script = Script::parse(CATEGORY_LIST);
        let kinds: Vec<_> = script.directives.iter().map(|d| &d.node).collect();
        assert!(matches!(kinds[0], Directive::Alias { name, selector } if name == "@cat" && selector == "[data-v-cat]"));
        assert!(matches!(kinds[1], Directive::LoopStart { anchor, declares_foreach: true, clause: Some(_) } if anchor == "@cat"));
        assert!(matches!(kinds[2], Directive::ContextBinding(b) if b.component == "contentcategories"));
        assert_eq!(
            kinds[3],
            &Directive::Rule(RuleLine {
                selector: "@cat [data-v-cat-name]".to_string(),
                action: Action::Text,
                expr: "$cat['name']".to_string(),
            })
        );
        assert_eq!(
            kinds[4],
            &Directive::Rule(RuleLine {
                selector: "@cat".to_string(),
                action: Action::Attribute("href".to_string()),
                expr: "$cat['url']".to_string(),
            })
        );
        assert!(matches!(kinds[5], Directive::LoopEnd { anchor } if anchor == "@cat"));
    }

    #[test]
    fn test_rule_split_respects_brackets() {
        let script = Script::parse("a[lang|=en]|title = $x['t']\n<p></p>");
        assert_eq!(
            script.directives[0].node,
            Directive::Rule(RuleLine {
                selector: "a[lang|=en]".to_string(),
                action: Action::Attribute("title".to_string()),
                expr: "$x['t']".to_string(),
            })
        );
    }

    #[test]
    fn test_inner_text_action_is_text() {
        let script = Script::parse(".name|innerText = $p['name']\n<p></p>");
        assert!(matches!(
            &script.directives[0].node,
            Directive::Rule(RuleLine { action: Action::Text, .. })
        ));
    }

    #[test]
    fn test_variable_assignments_are_verbatim() {
        let script = Script::parse("$total = 0;\n// note = x\n<p></p>");
        assert_eq!(script.directives[0].node, Directive::Verbatim);
        assert_eq!(script.directives[1].node, Directive::Verbatim);
    }

    #[test]
    fn test_loop_plan_body_stops_at_after() {
        let script = Script::parse(
            ".items|before = foreach ($products as $p)\n\
             .name = $p['name']\n\
             .items|after = end\n\
             .price = $p['price']\n\
             $products = $this->_component['products']\n<ul></ul>",
        );
        let plan = script.loop_plan().unwrap();
        assert_eq!(plan.anchor, ".items");
        assert_eq!(plan.clause.unwrap().item, "p");
        assert_eq!(plan.binding.unwrap().component, "products");
        assert_eq!(plan.body.len(), 1);
        assert_eq!(plan.body[0].selector, ".name");
        assert!(plan.terminated);
    }

    #[test]
    fn test_loop_plan_without_after_runs_to_end() {
        let script = Script::parse(
            ".items|before = foreach ($products as $p)\n.name = $p['name']\n.price = $p['price']\n",
        );
        let plan = script.loop_plan().unwrap();
        assert_eq!(plan.body.len(), 2);
        assert!(!plan.terminated);
    }

    #[test]
    fn test_before_without_foreach_is_not_a_loop() {
        let script = Script::parse(".items|before = <?php if ($x) ?>");
        assert!(script.loop_plan().is_none());
    }

    #[test]
    fn test_rule_selector_scoping() {
        let script = Script::parse(CATEGORY_LIST);
        let plan = script.loop_plan().unwrap();
        let aliases = script.aliases();
        let name_rule = plan.body[0];
        let href_rule = plan.body[1];
        assert_eq!(
            plan.rule_selector(name_rule, &aliases).unwrap().as_str(),
            "[data-v-cat-name]"
        );
        assert_eq!(
            plan.rule_selector(href_rule, &aliases).unwrap().as_str(),
            aliases.resolve(plan.anchor)
        );
    }

    #[test]
    fn test_alias_resolution_is_whole_token() {
        let mut aliases = AliasTable::new();
        aliases.insert("@p", ".product");
        assert_eq!(aliases.resolve(" @p "), ".product");
        assert_eq!(aliases.resolve("@p .name"), "@p .name");
        assert_eq!(aliases.resolve(".other"), ".other");
    }

    #[test]
    fn test_check_clean_script() {
        assert_eq!(Script::parse(CATEGORY_LIST).check(), vec![]);
    }

    #[test]
    fn test_check_reports_problems() {
        let source = "\
@item|before = foreach ($list)
.name = $x['name']
.b|before = foreach ($a as $b)
<p></p>";
        let kinds: Vec<_> = Script::parse(source)
            .check()
            .into_iter()
            .map(|d| d.kind)
            .collect();
        assert!(kinds.contains(&DiagnosticKind::MalformedForeach));
        assert!(kinds.contains(&DiagnosticKind::UndefinedAlias));
        assert!(kinds.contains(&DiagnosticKind::IgnoredLoop));
        assert!(kinds.contains(&DiagnosticKind::MissingContextBinding));
        assert!(kinds.contains(&DiagnosticKind::UnterminatedLoop));
    }

    #[test]
    fn test_malformed_foreach_span_points_into_template() {
        let source = "@a = .x\n.x|before = foreach ($list)\n<p></p>";
        let diagnostics = Script::parse(source).check();
        let malformed = diagnostics
            .iter()
            .find(|d| d.kind == DiagnosticKind::MalformedForeach)
            .unwrap();
        assert_eq!(&source[malformed.span.clone()], ")");
    }
}
