//! A minimal XML element tree.
//!
//! The reader walks a document twice, so the event stream from
//! `quick_xml` is first collected into owned [`Element`]s. Only element
//! names, attributes and nesting are kept; text, comments and processing
//! instructions are ignored.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::StorageError;

/// One XML element with its attributes in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Value of attribute `name`, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, StorageError> {
        let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            element.attrs.push((key, value));
        }
        Ok(element)
    }
}

/// Parses `text` and returns its document element.
pub fn parse(text: &str) -> Result<Element, StorageError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut document: Option<Element> = None;

    loop {
        let finished = match reader.read_event()? {
            Event::Start(start) => {
                stack.push(Element::from_start(&start)?);
                None
            }
            Event::Empty(start) => Some(Element::from_start(&start)?),
            Event::End(_) => match stack.pop() {
                Some(element) => Some(element),
                None => {
                    return Err(StorageError::Malformed {
                        reason: "unbalanced end tag".to_string(),
                    })
                }
            },
            Event::Eof => break,
            _ => None,
        };

        if let Some(element) = finished {
            match stack.last_mut() {
                Some(parent) => parent.children.push(element),
                None if document.is_none() => document = Some(element),
                None => {
                    return Err(StorageError::Malformed {
                        reason: "more than one document element".to_string(),
                    })
                }
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(StorageError::Malformed {
            reason: format!("element <{}> is never closed", open.name),
        });
    }
    document.ok_or_else(|| StorageError::Malformed {
        reason: "document is empty".to_string(),
    })
}
