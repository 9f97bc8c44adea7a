//! XML templates: `quick-xml` events into a `scraper` tree and back out

use ego_tree::{NodeId, NodeRef};
use html5ever::Attribute;
use quick_xml::errors::IllFormedError;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesCData, BytesPI, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use scraper::node::{Comment, Doctype, Element, ProcessingInstruction, Text};
use scraper::{Html, Node};

use super::{attribute, cdata_content, plain_name, DomError, CDATA_CLOSE, CDATA_OPEN};

/// What one reader event does to the tree
enum Step {
    Open(Node, String),
    Close,
    Leaf(Node),
    Done,
}

pub(super) fn parse(source: &str) -> Result<Html, DomError> {
    let mut html = Html::new_document();
    let root = html.tree.root().id();

    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(false);

    let mut open: Vec<(NodeId, String)> = Vec::new();
    loop {
        let event = reader.read_event().map_err(|source| DomError::Xml {
            position: reader.error_position(),
            source,
        })?;
        let step = step(event).map_err(|source| DomError::Xml {
            position: reader.buffer_position(),
            source,
        })?;

        let parent = open.last().map(|(id, _)| *id).unwrap_or(root);
        match step {
            Step::Open(node, name) => {
                if let Some(id) = append(&mut html, parent, node) {
                    open.push((id, name));
                }
            }
            Step::Close => {
                open.pop();
            }
            Step::Leaf(node) => {
                append(&mut html, parent, node);
            }
            Step::Done => break,
        }
    }

    if let Some((_, name)) = open.pop() {
        return Err(DomError::Xml {
            position: reader.buffer_position(),
            source: IllFormedError::MissingEndTag(name).into(),
        });
    }
    Ok(html)
}

fn append(html: &mut Html, parent: NodeId, node: Node) -> Option<NodeId> {
    let mut parent = html.tree.get_mut(parent)?;
    Some(parent.append(node).id())
}

fn step(event: Event<'_>) -> Result<Step, quick_xml::Error> {
    let step = match event {
        Event::Start(start) => {
            let name = utf8(start.name().as_ref())?.to_string();
            Step::Open(Node::Element(element(&start)?), name)
        }
        Event::Empty(start) => Step::Leaf(Node::Element(element(&start)?)),
        Event::End(_) => Step::Close,
        Event::Text(text) => Step::Leaf(Node::Text(Text {
            text: text.unescape()?.into_owned().into(),
        })),
        Event::CData(cdata) => {
            let comment = format!("{}{}{}", CDATA_OPEN, utf8(&cdata)?, CDATA_CLOSE);
            Step::Leaf(Node::Comment(Comment {
                comment: comment.as_str().into(),
            }))
        }
        Event::Comment(comment) => Step::Leaf(Node::Comment(Comment {
            comment: utf8(&comment)?.into(),
        })),
        Event::Decl(decl) => Step::Leaf(processing_instruction(utf8(&decl)?)),
        Event::PI(pi) => Step::Leaf(processing_instruction(utf8(&pi)?)),
        Event::DocType(doctype) => Step::Leaf(Node::Doctype(Doctype {
            name: utf8(&doctype)?.trim().into(),
            public_id: "".into(),
            system_id: "".into(),
        })),
        Event::Eof => Step::Done,
    };
    Ok(step)
}

/// Element with its attributes; valueless attributes (`<item data-v-product>`) read as empty
fn element(start: &BytesStart<'_>) -> Result<Element, quick_xml::Error> {
    let mut attrs: Vec<Attribute> = Vec::new();
    for attr in start.html_attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        attrs.push(attribute(utf8(attr.key.as_ref())?, &value));
    }
    Ok(Element::new(plain_name(utf8(start.name().as_ref())?), attrs))
}

fn processing_instruction(content: &str) -> Node {
    let content = content.trim();
    let (target, data) = content
        .split_once(char::is_whitespace)
        .unwrap_or((content, ""));
    Node::ProcessingInstruction(ProcessingInstruction {
        target: target.into(),
        data: data.trim().into(),
    })
}

fn utf8(bytes: &[u8]) -> Result<&str, quick_xml::Error> {
    Ok(std::str::from_utf8(bytes)?)
}

/// Serialize the subtree at `id`; a document node writes only its children
pub(super) fn write(html: &Html, id: NodeId) -> Result<String, DomError> {
    let mut writer = Writer::new(Vec::new());
    if let Some(node) = html.tree.get(id) {
        write_node(&mut writer, node).map_err(DomError::Write)?;
    }
    String::from_utf8(writer.into_inner()).map_err(|err| DomError::Write(err.into()))
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: NodeRef<'_, Node>) -> Result<(), quick_xml::Error> {
    match node.value() {
        Node::Element(element) => {
            let mut start = BytesStart::new(element.name());
            for (name, value) in element.attrs() {
                start.push_attribute((name, value));
            }
            if !node.has_children() {
                return writer.write_event(Event::Empty(start));
            }
            writer.write_event(Event::Start(start.borrow()))?;
            for child in node.children() {
                write_node(writer, child)?;
            }
            writer.write_event(Event::End(start.to_end()))
        }
        Node::Text(text) => {
            writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(&text.text))))
        }
        Node::Comment(comment) => match cdata_content(&comment.comment) {
            Some(content) => {
                for section in cdata_sections(content) {
                    writer.write_event(Event::CData(BytesCData::new(section)))?;
                }
                Ok(())
            }
            None => writer.write_event(Event::Comment(BytesText::from_escaped(&*comment.comment))),
        },
        Node::ProcessingInstruction(pi) => {
            let target: &str = &pi.target;
            let data: &str = &pi.data;
            let content = if data.is_empty() {
                target.to_string()
            } else {
                format!("{} {}", target, data)
            };
            writer.write_event(Event::PI(BytesPI::new(content)))
        }
        Node::Doctype(doctype) => {
            writer.write_event(Event::DocType(BytesText::from_escaped(&*doctype.name)))
        }
        _ => {
            for child in node.children() {
                write_node(writer, child)?;
            }
            Ok(())
        }
    }
}

/// Split CDATA content so no section contains `]]>`: `a]]>b` becomes `a]]` and `>b`
fn cdata_sections(content: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut rest = content;
    while let Some(end) = rest.find("]]>") {
        sections.push(&rest[..end + 2]);
        rest = &rest[end + 2..];
    }
    sections.push(rest);
    sections
}
