//! Mutable markup tree shared by both template dialects
//!
//! The tree is a `scraper` document: HTML is parsed and serialized by `html5ever` through
//! `scraper`, XML is read and written with `quick-xml`. Selector queries go through
//! `scraper::Selector`. Detached nodes stay in the underlying `ego_tree` arena and are simply
//! unreachable from the root.

pub mod selector;
mod xml;

pub use ego_tree::NodeId;
pub use selector::{Selector, SelectorError};

use html5ever::{Attribute, LocalName, Namespace, QualName};
use scraper::node::{Comment, Element, Text};
use scraper::{ElementRef, Html, Node};
use thiserror::Error;

/// Errors raised while reading or writing markup
#[derive(Debug, Error)]
pub enum DomError {
    /// The XML reader rejected the template
    #[error("malformed XML at byte {position}: {source}")]
    Xml {
        position: u64,
        source: quick_xml::Error,
    },

    /// The XML writer failed
    #[error("failed to write XML: {0}")]
    Write(#[source] quick_xml::Error),
}

/// Serialization flavour of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupMode {
    Html,
    Xml,
}

/// HTML elements whose children the serializer never writes
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param",
    "source", "track", "wbr",
];

/// A CDATA section is kept in the tree as a comment holding `[CDATA[...]]`, the node HTML
/// readers produce for `<![CDATA[...]]>`. The XML writer turns it back into a section.
const CDATA_OPEN: &str = "[CDATA[";
const CDATA_CLOSE: &str = "]]";

/// Content of a comment that stands for a CDATA section
pub(crate) fn cdata_content(comment: &str) -> Option<&str> {
    comment.strip_prefix(CDATA_OPEN)?.strip_suffix(CDATA_CLOSE)
}

/// A parsed template document
#[derive(Debug)]
pub struct Document {
    html: Html,
    mode: MarkupMode,
}

impl Document {
    /// Parse markup text
    ///
    /// HTML goes through the full `html5ever` tree builder, so fragments gain the implied
    /// `html`/`head`/`body` wrappers. XML must be well formed apart from valueless
    /// attributes, which read as empty.
    pub fn parse(source: &str, mode: MarkupMode) -> Result<Self, DomError> {
        let html = match mode {
            MarkupMode::Html => Html::parse_document(source),
            MarkupMode::Xml => xml::parse(source)?,
        };
        Ok(Self { html, mode })
    }

    pub fn mode(&self) -> MarkupMode {
        self.mode
    }

    pub fn root(&self) -> NodeId {
        self.html.tree.root().id()
    }

    pub(crate) fn html(&self) -> &Html {
        &self.html
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.html.tree.get(id)?.value().as_element()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.html.tree.get(id)?.parent().map(|parent| parent.id())
    }

    /// Whether `id` is a void HTML element (`img`, `input`, ...)
    pub fn is_void(&self, id: NodeId) -> bool {
        self.mode == MarkupMode::Html
            && self
                .element(id)
                .is_some_and(|el| VOID_ELEMENTS.contains(&el.name().to_ascii_lowercase().as_str()))
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        if let Some(mut parent) = self.html.tree.get_mut(parent) {
            parent.append_id(child);
        }
    }

    /// Remove a node (and its subtree) from its parent
    pub fn detach(&mut self, id: NodeId) {
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.detach();
        }
    }

    /// Detach every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        let children: Vec<NodeId> = match self.html.tree.get(id) {
            Some(node) => node.children().map(|child| child.id()).collect(),
            None => return,
        };
        for child in children {
            self.detach(child);
        }
    }

    /// Copy a subtree; the copy is detached
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let Some(node) = self.html.tree.get(id) else {
            return id;
        };
        let value = node.value().clone();
        let children: Vec<NodeId> = node.children().map(|child| child.id()).collect();

        let copy = self.html.tree.orphan(value).id();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.append(copy, child_copy);
        }
        copy
    }

    /// All descendants of `id` in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        match self.html.tree.get(id) {
            Some(node) => node.descendants().skip(1).map(|n| n.id()).collect(),
            None => Vec::new(),
        }
    }

    /// All element nodes reachable from the root, in document order
    pub fn elements(&self) -> Vec<NodeId> {
        self.html
            .tree
            .root()
            .descendants()
            .filter(|node| node.value().is_element())
            .map(|node| node.id())
            .collect()
    }

    /// Concatenated text of a subtree
    pub fn text_content(&self, id: NodeId) -> String {
        let Some(node) = self.html.tree.get(id) else {
            return String::new();
        };
        node.descendants()
            .filter_map(|n| n.value().as_text().map(|text| &**text))
            .collect()
    }

    /// Replace the children of `id` with a single text node
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.replace_children_with(id, Node::Text(Text { text: text.into() }));
    }

    /// Replace the children of `id` with a single CDATA section
    pub fn set_cdata(&mut self, id: NodeId, text: &str) {
        let comment = format!("{}{}{}", CDATA_OPEN, text, CDATA_CLOSE);
        self.replace_children_with(
            id,
            Node::Comment(Comment {
                comment: comment.as_str().into(),
            }),
        );
    }

    fn replace_children_with(&mut self, id: NodeId, value: Node) {
        self.clear_children(id);
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.append(value);
        }
    }

    /// Set an attribute on an element, replacing an existing value in place
    ///
    /// A no-op for other node kinds.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(mut node) = self.html.tree.get_mut(id) else {
            return;
        };
        let Node::Element(element) = node.value() else {
            return;
        };

        let mut attrs: Vec<Attribute> = element
            .attrs()
            .map(|(name, value)| attribute(name, value))
            .collect();
        match attrs.iter_mut().find(|attr| &*attr.name.local == name) {
            Some(existing) => existing.value = value.into(),
            None => attrs.push(attribute(name, value)),
        }
        *element = Element::new(element.name.clone(), attrs);
    }

    /// Elements below `scope` matching `selector`, in document order
    pub fn select(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&id| selector.matches(self, id))
            .collect()
    }

    /// First element below `scope` matching `selector`
    pub fn select_first(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&id| selector.matches(self, id))
    }

    /// Serialize the whole document using its markup mode
    pub fn serialize(&self) -> Result<String, DomError> {
        match self.mode {
            MarkupMode::Html => Ok(self.html.html()),
            MarkupMode::Xml => xml::write(&self.html, self.root()),
        }
    }

    /// Serialize a single element subtree, the element itself included
    pub fn serialize_node(&self, id: NodeId) -> Result<String, DomError> {
        match self.mode {
            MarkupMode::Html => Ok(self
                .html
                .tree
                .get(id)
                .and_then(ElementRef::wrap)
                .map(|el| el.html())
                .unwrap_or_default()),
            MarkupMode::Xml => xml::write(&self.html, id),
        }
    }
}

/// Qualified name without a namespace, as XML templates and rebuilt attributes use
pub(crate) fn plain_name(local: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(local))
}

pub(crate) fn attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: plain_name(name),
        value: value.into(),
    }
}

/// Convert a `data-*` attribute name into its camel-cased data key
///
/// `data-v-component-content-categories` becomes `vComponentContentCategories`; only a hyphen
/// followed by an ASCII lowercase letter folds. Returns `None` for non-`data-` attributes.
pub fn data_key(attr_name: &str) -> Option<String> {
    let rest = attr_name.strip_prefix("data-")?;
    let mut key = String::with_capacity(rest.len());
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('-', Some(next)) if next.is_ascii_lowercase() => {
                key.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => key.push(c),
        }
    }
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(source: &str) -> Document {
        Document::parse(source, MarkupMode::Html).expect("html parses")
    }

    fn first(doc: &Document, selector: &str) -> NodeId {
        doc.select_first(doc.root(), &Selector::parse(selector).unwrap())
            .unwrap()
    }

    #[test]
    fn test_data_key_camel_cases_segments() {
        assert_eq!(
            data_key("data-v-component-content-categories").as_deref(),
            Some("vComponentContentCategories")
        );
        assert_eq!(data_key("data-filter-cdata").as_deref(), Some("filterCdata"));
        assert_eq!(data_key("data-v-cat-manufacturer_id").as_deref(), Some("vCatManufacturer_id"));
        assert_eq!(data_key("href"), None);
    }

    #[test]
    fn test_data_key_keeps_hyphen_before_digit() {
        assert_eq!(data_key("data-col-2").as_deref(), Some("col-2"));
    }

    #[test]
    fn test_html_parse_wraps_fragment() {
        let doc = html("<p>hi</p>");
        assert_eq!(
            doc.serialize().unwrap(),
            "<html><head></head><body><p>hi</p></body></html>"
        );
    }

    #[test]
    fn test_deep_clone_is_detached_copy() {
        let mut doc = html(r#"<ul><li class="a"><b>x</b></li></ul>"#);
        let li = first(&doc, "li");
        let copy = doc.deep_clone(li);
        assert_eq!(doc.parent(copy), None);
        assert_eq!(doc.serialize_node(copy).unwrap(), r#"<li class="a"><b>x</b></li>"#);

        doc.set_text(copy, "changed");
        assert_eq!(doc.text_content(li), "x");
        assert_eq!(doc.text_content(copy), "changed");
    }

    #[test]
    fn test_detach_and_append_move_nodes() {
        let mut doc = html(r#"<div id="a"><span>1</span></div><div id="b"></div>"#);
        let span = first(&doc, "span");
        let b = first(&doc, "#b");
        doc.append(b, span);
        assert!(doc
            .serialize()
            .unwrap()
            .contains(r#"<div id="a"></div><div id="b"><span>1</span></div>"#));
    }

    #[test]
    fn test_set_attr_replaces_existing() {
        let mut doc = html(r##"<a href="#" class="nav">x</a>"##);
        let a = first(&doc, "a");
        doc.set_attr(a, "href", "/e");
        doc.set_attr(a, "title", "E");
        assert_eq!(
            doc.serialize_node(a).unwrap(),
            r#"<a href="/e" class="nav" title="E">x</a>"#
        );
        // rebuilt elements still match selectors
        assert_eq!(first(&doc, "a.nav[title=E]"), a);
    }

    #[test]
    fn test_void_elements() {
        let doc = html(r#"<img src="x"><span></span>"#);
        assert!(doc.is_void(first(&doc, "img")));
        assert!(!doc.is_void(first(&doc, "span")));
    }

    #[test]
    fn test_cdata_in_html_is_a_comment() {
        let mut doc = html("<p>x</p>");
        let p = first(&doc, "p");
        doc.set_cdata(p, "A & B");
        assert_eq!(doc.serialize_node(p).unwrap(), "<p><!--[CDATA[A & B]]--></p>");
    }

    #[test]
    fn test_xml_cdata_round_trip() {
        let doc = Document::parse("<rss><title><![CDATA[A & B]]></title></rss>", MarkupMode::Xml)
            .unwrap();
        assert_eq!(
            doc.serialize().unwrap(),
            "<rss><title><![CDATA[A & B]]></title></rss>"
        );
    }
}
