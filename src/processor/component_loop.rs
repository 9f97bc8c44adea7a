//! Attribute-driven stamping of component roots
//!
//! A component root carries `data-v-component-<kind>="<name>"`. Inside it, the first element
//! tagged `data-v-<singular>` is the stamp; it is cloned once per record and its
//! `data-v-<singular>-<field>` attributes receive the record's values.

use std::iter;

use serde_json::Value;
use tracing::debug;

use crate::dialect::COMPONENT_MARKER;
use crate::dom::{data_key, Document, DomError, MarkupMode, NodeId};
use crate::processor::value_text;
use crate::registry::{ComponentDataRegistry, Record};

/// Marker that switches a bound element from text to a CDATA section
const CDATA_FILTER: &str = "data-filter-cdata";

/// Kind and name read from a component root's marker attribute
#[derive(Debug, Clone, PartialEq, Eq)]
struct ComponentRef {
    kind: String,
    name: String,
}

impl ComponentRef {
    fn of(doc: &Document, id: NodeId) -> Option<Self> {
        let (attr, value) = doc
            .element(id)?
            .attrs()
            .find(|(name, _)| name.starts_with(COMPONENT_MARKER))?;
        let kind = data_key(attr)?.strip_prefix("vComponent")?.to_lowercase();
        if kind.is_empty() {
            return None;
        }
        Some(Self {
            kind,
            name: value.trim().to_string(),
        })
    }

    fn singular(&self) -> &str {
        self.kind.strip_suffix('s').unwrap_or(&self.kind)
    }
}

/// Renders templates of the component-loop dialect
pub struct ComponentLoopProcessor<'r> {
    registry: &'r ComponentDataRegistry,
}

impl<'r> ComponentLoopProcessor<'r> {
    pub fn new(registry: &'r ComponentDataRegistry) -> Self {
        Self { registry }
    }

    /// Parse, stamp every component root, and serialize in `mode`
    pub fn render(&self, source: &str, mode: MarkupMode) -> Result<String, DomError> {
        let mut doc = Document::parse(source, mode)?;
        self.process(&mut doc);
        doc.serialize()
    }

    /// Stamp every component root of `doc` in place
    pub fn process(&self, doc: &mut Document) {
        let roots: Vec<(NodeId, ComponentRef)> = doc
            .elements()
            .into_iter()
            .filter_map(|id| ComponentRef::of(doc, id).map(|component| (id, component)))
            .collect();

        for (root, component) in roots {
            self.stamp_component(doc, root, &component);
        }
    }

    fn stamp_component(&self, doc: &mut Document, root: NodeId, component: &ComponentRef) {
        let Some((singular, matches)) = stamp_sites(doc, root, component.singular()) else {
            debug!(kind = %component.kind, "component has no stamp element; left untouched");
            return;
        };

        let stamp = doc.deep_clone(matches[0]);
        for &site in &matches {
            doc.detach(site);
        }

        let records = self.records(component);
        debug!(
            kind = %component.kind,
            name = %component.name,
            singular = %singular,
            records = records.len(),
            "stamping component"
        );

        let field_prefix = format!("data-v-{}-", singular);
        for record in records {
            let clone = doc.deep_clone(stamp);
            bind_record(doc, clone, &field_prefix, record);
            doc.append(root, clone);
        }
    }

    fn records(&self, component: &ComponentRef) -> &'r [Record] {
        let registry = self.registry;
        Some(component.name.as_str())
            .filter(|name| !name.is_empty())
            .and_then(|name| registry.get(name))
            .or_else(|| registry.get(&component.kind))
            .unwrap_or_default()
    }
}

/// The singular token in use and the elements carrying `data-v-<singular>`
///
/// Falls back to a `data-v-<x>s` wrapper that contains `data-v-<x>` elements when the
/// singular derived from the component kind has no matches.
fn stamp_sites(doc: &Document, root: NodeId, singular: &str) -> Option<(String, Vec<NodeId>)> {
    let matches = tagged(doc, root, &format!("data-v-{}", singular));
    if !matches.is_empty() {
        return Some((singular.to_string(), matches));
    }

    let fallback = wrapper_singular(doc, root)?;
    let matches = tagged(doc, root, &format!("data-v-{}", fallback));
    (!matches.is_empty()).then_some((fallback, matches))
}

fn tagged(doc: &Document, scope: NodeId, attr: &str) -> Vec<NodeId> {
    doc.descendants(scope)
        .into_iter()
        .filter(|&id| doc.element(id).is_some_and(|el| el.attr(attr).is_some()))
        .collect()
}

fn wrapper_singular(doc: &Document, root: NodeId) -> Option<String> {
    doc.descendants(root).into_iter().find_map(|id| {
        doc.element(id)?.attrs().find_map(|(name, _)| {
            let plural = name.strip_prefix("data-v-")?;
            if plural.starts_with("component-") {
                return None;
            }
            let singular = plural.strip_suffix('s').filter(|s| !s.is_empty())?;
            let inner = format!("data-v-{}", singular);
            (!tagged(doc, id, &inner).is_empty()).then(|| singular.to_string())
        })
    })
}

/// Look up a bound field: the attribute suffix as written, its camel-cased form, then the
/// attribute value as a key
fn lookup<'a>(record: &'a Record, field: &str, attr_value: &str) -> Option<&'a Value> {
    record
        .get(field)
        .or_else(|| data_key(&format!("data-{}", field)).and_then(|camel| record.get(&camel)))
        .or_else(|| {
            let key = attr_value.trim();
            (!key.is_empty()).then(|| record.get(key)).flatten()
        })
}

/// Attribute of a link or image that also receives a URL-like field
fn link_attribute(tag: &str, field: &str) -> Option<&'static str> {
    let field = field.to_ascii_lowercase();
    let url_like = field.contains("url") || matches!(field.as_str(), "href" | "src" | "link");
    match tag {
        "a" if url_like => Some("href"),
        "img" if url_like || field.starts_with("image") || field.starts_with("img") => Some("src"),
        _ => None,
    }
}

fn bind_record(doc: &mut Document, clone: NodeId, field_prefix: &str, record: &Record) {
    let nodes: Vec<NodeId> = iter::once(clone).chain(doc.descendants(clone)).collect();
    for node in nodes {
        let Some(el) = doc.element(node) else {
            continue;
        };
        let cdata = el.attr(CDATA_FILTER).is_some();
        let tag = el.name().to_ascii_lowercase();
        let values: Vec<(String, String)> = el
            .attrs()
            .filter_map(|(name, value)| {
                let field = name.strip_prefix(field_prefix)?;
                lookup(record, field, value).map(|v| (field.to_string(), value_text(v)))
            })
            .collect();

        for (field, text) in values {
            if let Some(target) = link_attribute(&tag, &field) {
                doc.set_attr(node, target, &text);
            }
            if doc.is_void(node) {
                continue;
            }
            if cdata {
                doc.set_cdata(node, &text);
            } else {
                doc.set_text(node, &text);
            }
        }
    }
}
