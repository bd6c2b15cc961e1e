//! Tolerant HTML tree parser
//!
//! Drives a quick-xml event reader with end-name checking disabled and keeps
//! its own open-element stack, so the usual HTML liberties parse:
//! - void elements (`<br>`, `<img>`, ...) never wait for an end tag
//! - an end tag closes every element opened after its match
//! - stray end tags are ignored
//! - a new `<p>`/`<li>`/`<td>`... implicitly closes an open sibling of the same kind

use crate::config::PreprocessorConfig;
use crate::document::{Attribute, DocumentTree, DomNode, ElementNode};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use tracing::warn;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

// Tags that implicitly close an open element of the listed kinds
const IMPLICIT_CLOSE: &[(&str, &[&str])] = &[
    ("p", &["p"]),
    ("li", &["li"]),
    ("option", &["option"]),
    ("tr", &["tr", "td", "th"]),
    ("td", &["td", "th"]),
    ("th", &["td", "th"]),
];

fn html_entity(name: &str) -> Option<&'static str> {
    match name {
        "nbsp" => Some("\u{a0}"),
        "copy" => Some("©"),
        "reg" => Some("®"),
        "trade" => Some("™"),
        "hellip" => Some("…"),
        "mdash" => Some("—"),
        "ndash" => Some("–"),
        "laquo" => Some("«"),
        "raquo" => Some("»"),
        "lsquo" => Some("‘"),
        "rsquo" => Some("’"),
        "ldquo" => Some("“"),
        "rdquo" => Some("”"),
        "bull" => Some("•"),
        "middot" => Some("·"),
        "euro" => Some("€"),
        "pound" => Some("£"),
        "yen" => Some("¥"),
        "cent" => Some("¢"),
        "times" => Some("×"),
        "deg" => Some("°"),
        _ => None,
    }
}

fn decode_text(text: &BytesText) -> String {
    match text.unescape_with(html_entity) {
        Ok(decoded) => decoded.into_owned(),
        // Bare ampersands and unknown entities: keep the raw text
        Err(_) => String::from_utf8_lossy(text).into_owned(),
    }
}

fn element_from_start(start: &BytesStart) -> ElementNode {
    let tag = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
    let attributes = start
        .html_attributes()
        .filter_map(|attr| match attr {
            Ok(attr) => {
                let name = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
                let value = attr
                    .unescape_value_with(html_entity)
                    .map(Cow::into_owned)
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                Some(Attribute { name, value })
            }
            Err(e) => {
                warn!(tag = %tag, error = %e, "Skipping malformed attribute");
                None
            }
        })
        .collect();

    ElementNode {
        tag,
        attributes,
        children: Vec::new(),
    }
}

struct TreeBuilder<'c> {
    config: &'c PreprocessorConfig,
    open: Vec<ElementNode>,
    top_level: Vec<DomNode>,
    // (tag, nesting) while inside a stripped subtree
    skipping: Option<(String, usize)>,
}

impl<'c> TreeBuilder<'c> {
    fn new(config: &'c PreprocessorConfig) -> Self {
        Self {
            config,
            open: Vec::new(),
            top_level: Vec::new(),
            skipping: None,
        }
    }

    fn append(&mut self, node: DomNode) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.top_level.push(node),
        }
    }

    fn close_top(&mut self) {
        if let Some(element) = self.open.pop() {
            self.append(DomNode::Element(element));
        }
    }

    fn is_stripped(&self, tag: &str) -> bool {
        self.config.strip_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    fn start(&mut self, element: ElementNode) {
        if let Some((tag, depth)) = &mut self.skipping {
            if *tag == element.tag {
                *depth += 1;
            }
            return;
        }
        if self.is_stripped(&element.tag) {
            self.skipping = Some((element.tag.clone(), 1));
            return;
        }
        if let Some((_, closes)) = IMPLICIT_CLOSE.iter().find(|(t, _)| *t == element.tag) {
            if self
                .open
                .last()
                .is_some_and(|top| closes.contains(&top.tag.as_str()))
            {
                self.close_top();
            }
        }
        if VOID_ELEMENTS.contains(&element.tag.as_str()) {
            self.append(DomNode::Element(element));
        } else {
            self.open.push(element);
        }
    }

    fn empty(&mut self, element: ElementNode) {
        if self.skipping.is_some() || self.is_stripped(&element.tag) {
            return;
        }
        self.append(DomNode::Element(element));
    }

    fn end(&mut self, tag: &str) {
        if let Some((skip_tag, depth)) = &mut self.skipping {
            if skip_tag == tag {
                *depth -= 1;
                if *depth == 0 {
                    self.skipping = None;
                }
            }
            return;
        }
        // Stray end tags (no open match) are ignored
        if let Some(position) = self.open.iter().rposition(|el| el.tag == tag) {
            while self.open.len() > position {
                self.close_top();
            }
        }
    }

    fn text(&mut self, text: String) {
        if self.skipping.is_none() && !text.trim().is_empty() {
            self.append(DomNode::Text(text));
        }
    }

    fn comment(&mut self, text: String) {
        if self.skipping.is_none() && self.config.keep_comments {
            self.append(DomNode::Comment(text.trim().to_string()));
        }
    }

    fn finish(mut self) -> DocumentTree {
        while !self.open.is_empty() {
            self.close_top();
        }
        DocumentTree::new(self.top_level)
    }
}

/// Parse HTML markup into a document tree.
///
/// Never fails: tokenizer errors end the parse early with a warning, and the
/// elements read so far are closed and returned.
pub fn parse_html(markup: &str, config: &PreprocessorConfig) -> DocumentTree {
    let mut reader = Reader::from_str(markup);
    reader.trim_text(true);
    reader.check_end_names(false);

    let mut builder = TreeBuilder::new(config);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => builder.start(element_from_start(&e)),
            Ok(Event::Empty(e)) => builder.empty(element_from_start(&e)),
            Ok(Event::End(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                builder.end(&tag);
            }
            Ok(Event::Text(e)) => builder.text(decode_text(&e)),
            Ok(Event::CData(e)) => {
                builder.text(String::from_utf8_lossy(&e.into_inner()).into_owned())
            }
            Ok(Event::Comment(e)) => {
                builder.comment(String::from_utf8_lossy(&e).into_owned())
            }
            Ok(Event::Eof) => break,
            // Declarations, processing instructions and doctypes carry no content
            Ok(_) => {}
            Err(e) => {
                warn!(
                    position = reader.buffer_position(),
                    error = %e,
                    "Markup tokenizer stopped early"
                );
                break;
            }
        }
    }

    builder.finish()
}
