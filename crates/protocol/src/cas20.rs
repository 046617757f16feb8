//! CAS 2.0 XML responses.
//!
//! Every document is self-contained: an XML declaration followed by a
//! `cas:serviceResponse` root declaring the `cas` namespace.
//!
//! ## Attribute release
//!
//! With `send_attributes` on and at least one attribute present, the success
//! document carries a `cas:attributes` block:
//! - each name has `:` replaced by `_`; names still illegal as element names are
//!   dropped with a warning (the rest of the document is unaffected)
//! - a multi-valued attribute yields one element per value, in order
//! - values are base64-encoded when `base64_encode_attributes` is on
//! - when `base64_indicator_attribute` is set, one more element with that name
//!   and literal value `true`/`false` is appended

use std::borrow::Cow;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;
use tracing::warn;

use casserver_core::{Attributes, ErrorCode};

use crate::xml_name::{element_name_for_attribute, is_valid_element_name};

pub const CAS_NAMESPACE: &str = "http://www.yale.edu/tp/cas";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("XML rendering failed: {0}")]
    Xml(String),
}

/// Attribute release options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cas20Config {
    pub send_attributes: bool,
    pub base64_encode_attributes: bool,
    pub base64_indicator_attribute: Option<String>,
}

/// CAS 2.0 responder.
#[derive(Debug, Clone, Default)]
pub struct Cas20 {
    config: Cas20Config,
}

impl Cas20 {
    pub fn new(config: Cas20Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Cas20Config {
        &self.config
    }

    /// `cas:authenticationSuccess` for `/serviceValidate`.
    pub fn render_validate_success(
        &self,
        username: &str,
        attributes: &Attributes,
        proxy_granting_ticket_iou: Option<&str>,
    ) -> Result<String, ProtocolError> {
        self.render_proxy_validate_success(username, attributes, proxy_granting_ticket_iou, &[])
    }

    /// `cas:authenticationSuccess` for `/proxyValidate`, listing the proxy chain
    /// (most recent first) when it is not empty.
    pub fn render_proxy_validate_success(
        &self,
        username: &str,
        attributes: &Attributes,
        proxy_granting_ticket_iou: Option<&str>,
        proxies: &[String],
    ) -> Result<String, ProtocolError> {
        let mut doc = XmlDocument::new()?;
        doc.start("cas:authenticationSuccess", &[])?;
        doc.text_element("cas:user", username)?;

        if let Some(iou) = proxy_granting_ticket_iou {
            doc.text_element("cas:proxyGrantingTicket", iou)?;
        }

        if self.config.send_attributes && !attributes.is_empty() {
            self.write_attributes(&mut doc, attributes)?;
        }

        if !proxies.is_empty() {
            doc.start("cas:proxies", &[])?;
            for proxy in proxies {
                doc.text_element("cas:proxy", proxy)?;
            }
            doc.end("cas:proxies")?;
        }

        doc.end("cas:authenticationSuccess")?;
        doc.finish()
    }

    /// `cas:authenticationFailure code="…"`.
    pub fn render_validate_failure(&self, code: ErrorCode, explanation: &str) -> Result<String, ProtocolError> {
        render_failure("cas:authenticationFailure", code, explanation)
    }

    /// `cas:proxySuccess` carrying the new proxy ticket.
    pub fn render_proxy_success(&self, proxy_ticket_id: &str) -> Result<String, ProtocolError> {
        let mut doc = XmlDocument::new()?;
        doc.start("cas:proxySuccess", &[])?;
        doc.text_element("cas:proxyTicket", proxy_ticket_id)?;
        doc.end("cas:proxySuccess")?;
        doc.finish()
    }

    /// `cas:proxyFailure code="…"`.
    pub fn render_proxy_failure(&self, code: ErrorCode, explanation: &str) -> Result<String, ProtocolError> {
        render_failure("cas:proxyFailure", code, explanation)
    }

    fn write_attributes(&self, doc: &mut XmlDocument, attributes: &Attributes) -> Result<(), ProtocolError> {
        doc.start("cas:attributes", &[])?;

        for (name, values) in attributes {
            let element = match element_name_for_attribute(name) {
                Ok(element) => element,
                Err(e) => {
                    warn!(attribute = %e.attribute, element = %e.element, "invalid XML element name; attribute not released");
                    continue;
                }
            };
            let tag = format!("cas:{element}");
            for value in values {
                doc.text_element(&tag, &self.encode_value(value))?;
            }
        }

        if let Some(indicator) = &self.config.base64_indicator_attribute {
            if is_valid_element_name(indicator) {
                let flag = if self.config.base64_encode_attributes { "true" } else { "false" };
                doc.text_element(&format!("cas:{indicator}"), flag)?;
            } else {
                warn!(attribute = %indicator, "invalid base64 indicator attribute name; not released");
            }
        }

        doc.end("cas:attributes")
    }

    fn encode_value(&self, value: &str) -> String {
        if self.config.base64_encode_attributes {
            BASE64.encode(value)
        } else {
            value.to_string()
        }
    }
}

fn render_failure(element: &str, code: ErrorCode, explanation: &str) -> Result<String, ProtocolError> {
    let mut doc = XmlDocument::new()?;
    doc.start(element, &[("code", code.as_str())])?;
    doc.text(explanation)?;
    doc.end(element)?;
    doc.finish()
}

/// Drop characters XML 1.0 cannot carry, even escaped: C0 controls other than
/// tab, LF and CR, and the noncharacters U+FFFE / U+FFFF.
fn strip_non_xml_chars(text: &str) -> Cow<'_, str> {
    fn allowed(c: char) -> bool {
        !matches!(c, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}')
    }

    if text.chars().all(allowed) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| allowed(c)).collect())
    }
}

/// Thin event writer for one `cas:serviceResponse` document.
struct XmlDocument {
    writer: Writer<Vec<u8>>,
}

impl XmlDocument {
    fn new() -> Result<Self, ProtocolError> {
        let mut doc = Self {
            writer: Writer::new(Vec::new()),
        };
        doc.emit(Event::Decl(BytesDecl::new("1.0", None, None)))?;
        doc.start("cas:serviceResponse", &[("xmlns:cas", CAS_NAMESPACE)])?;
        Ok(doc)
    }

    fn emit(&mut self, event: Event<'_>) -> Result<(), ProtocolError> {
        self.writer
            .write_event(event)
            .map_err(|e| ProtocolError::Xml(e.to_string()))
    }

    fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), ProtocolError> {
        let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.emit(Event::Start(start))
    }

    fn text(&mut self, text: &str) -> Result<(), ProtocolError> {
        let text = strip_non_xml_chars(text);
        self.emit(Event::Text(BytesText::from_escaped(partial_escape(&*text))))
    }

    fn end(&mut self, name: &str) -> Result<(), ProtocolError> {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<(), ProtocolError> {
        self.start(name, &[])?;
        self.text(text)?;
        self.end(name)
    }

    fn finish(mut self) -> Result<String, ProtocolError> {
        self.end("cas:serviceResponse")?;
        String::from_utf8(self.writer.into_inner()).map_err(|e| ProtocolError::Xml(e.to_string()))
    }
}
