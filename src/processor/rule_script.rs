//! Loop expansion for the legacy directive dialect

use std::iter;

use serde_json::Value;
use tracing::{debug, Level};

use crate::directive::{
    parse_index, Action, AliasTable, ForeachClause, LoopPlan, RuleLine, Script,
};
use crate::dom::{Document, DomError, MarkupMode, NodeId, Selector};
use crate::processor::{is_truthy, value_text};
use crate::registry::ComponentDataRegistry;

/// Renders templates of the rule-script dialect
pub struct RuleScriptProcessor<'r> {
    registry: &'r ComponentDataRegistry,
}

impl<'r> RuleScriptProcessor<'r> {
    pub fn new(registry: &'r ComponentDataRegistry) -> Self {
        Self { registry }
    }

    /// Expand the script's loop into its skeleton and serialize the result as HTML
    pub fn render(&self, source: &str) -> Result<String, DomError> {
        let script = Script::parse(source);
        if tracing::enabled!(Level::DEBUG) {
            for diagnostic in script.check() {
                debug!(
                    kind = %diagnostic.kind,
                    span = ?diagnostic.span,
                    "{}",
                    diagnostic.message
                );
            }
        }

        let mut doc = Document::parse(&script.skeleton, MarkupMode::Html)?;
        match script.loop_plan() {
            Some(plan) => self.expand(&mut doc, &plan, &script.aliases()),
            None => debug!("no loop declaration; skeleton rendered as is"),
        }
        doc.serialize()
    }

    fn expand(&self, doc: &mut Document, plan: &LoopPlan<'_>, aliases: &AliasTable) {
        let anchor = aliases.resolve(plan.anchor);
        let selector = match Selector::parse(anchor) {
            Ok(selector) => selector,
            Err(err) => {
                debug!(anchor, error = %err, "loop anchor is not a valid selector");
                return;
            }
        };
        let Some(site) = doc.select_first(doc.root(), &selector) else {
            debug!(anchor, "loop anchor matches nothing");
            return;
        };
        let Some(container) = doc.parent(site) else {
            return;
        };

        let stamp = doc.deep_clone(site);
        doc.clear_children(container);

        let Some(clause) = plan.clause else {
            debug!(anchor, "loop declaration has no usable foreach clause");
            return;
        };

        let context = plan
            .binding
            .and_then(|binding| self.registry.get(&binding.component))
            .and_then(|records| records.first());
        let Some(items) = context
            .and_then(|record| record.get(&clause.list))
            .and_then(Value::as_array)
        else {
            debug!(
                anchor,
                list = %clause.list,
                component = plan.binding.map(|b| b.component.as_str()),
                "loop list is missing or not an array; no items rendered"
            );
            return;
        };

        debug!(anchor, items = items.len(), rules = plan.body.len(), "expanding loop");
        for item in items {
            let clone = doc.deep_clone(stamp);
            for rule in &plan.body {
                apply_rule(doc, clone, rule, item, clause, plan, aliases);
            }
            doc.append(container, clone);
        }
    }
}

/// Value bound by a rule expression for one item
///
/// Only `$<item>['field']` is evaluated, and only a truthy field binds; every other
/// expression, and a falsy or absent field, binds the expression text itself.
pub fn evaluate(expr: &str, item_alias: &str, item: &Value) -> String {
    match parse_index(expr) {
        Some((variable, field)) if variable == item_alias => match item.get(&field) {
            Some(value) if is_truthy(value) => value_text(value),
            _ => expr.to_string(),
        },
        _ => expr.to_string(),
    }
}

fn apply_rule(
    doc: &mut Document,
    clone: NodeId,
    rule: &RuleLine,
    item: &Value,
    clause: &ForeachClause,
    plan: &LoopPlan<'_>,
    aliases: &AliasTable,
) {
    let selector = match plan.rule_selector(rule, aliases) {
        Ok(selector) => selector,
        Err(err) => {
            debug!(selector = %rule.selector, error = %err, "rule skipped");
            return;
        }
    };
    let targets: Vec<NodeId> = iter::once(clone)
        .chain(doc.descendants(clone))
        .filter(|&id| selector.matches(doc, id))
        .collect();

    let value = evaluate(&rule.expr, &clause.item, item);
    for target in targets {
        match &rule.action {
            Action::Text if doc.is_void(target) => {}
            Action::Text => doc.set_text(target, value.as_str()),
            Action::Attribute(name) => doc.set_attr(target, name, value.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Record;
    use serde_json::json;

    fn registry(name: &str, value: Value) -> ComponentDataRegistry {
        let mut registry = ComponentDataRegistry::new();
        let records: Vec<Record> = serde_json::from_value(value).unwrap();
        registry.set(name, records);
        registry
    }

    fn body(html: &str) -> &str {
        let start = html.find("<body>").map(|i| i + "<body>".len()).unwrap_or(0);
        let end = html.rfind("</body>").unwrap_or(html.len());
        &html[start..end]
    }

    #[test]
    fn test_evaluate() {
        let item = json!({"name": "Widget", "stock": 0});
        assert_eq!(evaluate("$p['name']", "p", &item), "Widget");
        assert_eq!(evaluate("$p['stock']", "p", &item), "$p['stock']");
        assert_eq!(evaluate("$p['missing']", "p", &item), "$p['missing']");
        assert_eq!(evaluate("$q['name']", "p", &item), "$q['name']");
        assert_eq!(evaluate("Buy now", "p", &item), "Buy now");
    }

    #[test]
    fn test_expands_items_in_order() {
        let registry = registry(
            "cart",
            json!([{"products": [{"name": "A"}, {"name": "B"}]}]),
        );
        let source = "\
.item|before = foreach ($products as $p)
$x = $this->_component['cart']
.name = $p['name']
.item|after = end
<ul><li class=\"item\"><span class=\"name\">x</span></li><li class=\"item\">y</li></ul>";
        let out = RuleScriptProcessor::new(&registry).render(source).unwrap();
        assert_eq!(
            body(&out),
            "<ul><li class=\"item\"><span class=\"name\">A</span></li>\
             <li class=\"item\"><span class=\"name\">B</span></li></ul>"
        );
    }

    #[test]
    fn test_attribute_action_and_self_match() {
        let registry = registry("menu", json!([{"links": [{"url": "/a"}]}]));
        let source = "\
@link = a.nav
@link|before = foreach ($links as $l)
$m = $this->_component['menu']
a.nav|href = $l['url']
@link|after = end
<nav><a class=\"nav\" href=\"#\">Home</a></nav>";
        let out = RuleScriptProcessor::new(&registry).render(source).unwrap();
        assert_eq!(body(&out), "<nav><a class=\"nav\" href=\"/a\">Home</a></nav>");
    }

    #[test]
    fn test_anchor_scoped_rules() {
        let registry = registry("menu", json!([{"links": [{"url": "/a", "label": "A"}]}]));
        let source = "\
@link = [data-v-link]
@link|before = foreach ($links as $i => $l)
$m = $this->_component['menu']
@link|href = $l['url']
@link span = $l['label']
@link|after = end
<p><a data-v-link><span>x</span></a></p>";
        let out = RuleScriptProcessor::new(&registry).render(source).unwrap();
        assert_eq!(
            body(&out),
            "<p><a data-v-link=\"\" href=\"/a\"><span>A</span></a></p>"
        );
    }

    #[test]
    fn test_missing_list_renders_zero_items() {
        let registry = registry("cart", json!([{"products": "not a list"}]));
        let source = "\
.item|before = foreach ($products as $p)
$x = $this->_component['cart']
<ul><li class=\"item\">x</li></ul>";
        let out = RuleScriptProcessor::new(&registry).render(source).unwrap();
        assert_eq!(body(&out), "<ul></ul>");
    }

    #[test]
    fn test_malformed_foreach_still_clears_container() {
        let registry = registry("cart", json!([{"products": [{"name": "A"}]}]));
        let source = "\
.item|before = foreach ($products)
$x = $this->_component['cart']
<ul><li class=\"item\">x</li></ul>";
        let out = RuleScriptProcessor::new(&registry).render(source).unwrap();
        assert_eq!(body(&out), "<ul></ul>");
    }

    #[test]
    fn test_no_loop_returns_skeleton() {
        let registry = ComponentDataRegistry::new();
        let out = RuleScriptProcessor::new(&registry)
            .render("@a = .x\n<p class=\"x\">keep</p>")
            .unwrap();
        assert_eq!(body(&out), "<p class=\"x\">keep</p>");
    }

    #[test]
    fn test_anchor_rule_reaches_nested_matches() {
        let registry = registry("menu", json!([{"links": [{"url": "/a"}]}]));
        let source = "\
@link = .link
@link|before = foreach ($links as $l)
$m = $this->_component['menu']
@link|data-href = $l['url']
@link|after = end
<ul><li class=\"link\"><a class=\"link\">x</a></li></ul>";
        let out = RuleScriptProcessor::new(&registry).render(source).unwrap();
        assert_eq!(
            body(&out),
            "<ul><li class=\"link\" data-href=\"/a\"><a class=\"link\" data-href=\"/a\">x</a></li></ul>"
        );
    }
}
