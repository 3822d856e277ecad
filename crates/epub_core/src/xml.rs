//! Small typed XML tree serialized through a single escaping writer.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

use crate::sanitize::is_xml_forbidden;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("xml write failed: {0}")]
    Write(String),
    #[error("xml output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Escaped on output; characters XML forbids are dropped.
    Text(String),
    /// Already well-formed markup, written verbatim.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = XmlElement>) -> Self {
        self.children
            .extend(children.into_iter().map(XmlNode::Element));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn raw(mut self, markup: impl Into<String>) -> Self {
        self.children.push(XmlNode::Raw(markup.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub doctype: Option<String>,
    pub root: XmlElement,
}

impl XmlDocument {
    pub fn new(root: XmlElement) -> Self {
        Self {
            doctype: None,
            root,
        }
    }

    /// Doctype body, e.g. `html` for `<!DOCTYPE html>`.
    pub fn with_doctype(mut self, doctype: impl Into<String>) -> Self {
        self.doctype = Some(doctype.into());
        self
    }

    pub fn to_xml(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new(Vec::new());
        write_event(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)),
        )?;
        writer.get_mut().push(b'\n');
        if let Some(doctype) = &self.doctype {
            write_event(
                &mut writer,
                Event::DocType(BytesText::from_escaped(doctype.as_str())),
            )?;
            writer.get_mut().push(b'\n');
        }
        write_element(&mut writer, &self.root)?;
        Ok(String::from_utf8(writer.into_inner())?)
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), XmlError> {
    let attrs: Vec<(&str, String)> = element
        .attrs
        .iter()
        .map(|(key, value)| (key.as_str(), xml_chars(value)))
        .collect();
    let start = BytesStart::new(element.name.as_str())
        .with_attributes(attrs.iter().map(|(key, value)| (*key, value.as_str())));
    if element.children.is_empty() {
        return write_event(writer, Event::Empty(start));
    }
    write_event(writer, Event::Start(start))?;
    for child in &element.children {
        match child {
            XmlNode::Element(inner) => write_element(writer, inner)?,
            XmlNode::Text(text) => {
                write_event(writer, Event::Text(BytesText::new(&xml_chars(text))))?
            }
            XmlNode::Raw(markup) => {
                write_event(writer, Event::Text(BytesText::from_escaped(markup.as_str())))?
            }
        }
    }
    write_event(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

fn xml_chars(text: &str) -> String {
    text.chars().filter(|c| !is_xml_forbidden(*c)).collect()
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), XmlError> {
    writer
        .write_event(event)
        .map_err(|err| XmlError::Write(err.to_string()))
}
