//! Attribute name → XML element name mapping.
//!
//! Released attributes become `cas:<name>` elements, and not every attribute
//! name is a legal element name. Names are repaired only for the most common
//! offender (`:` in URN-style names becomes `_`); anything still illegal is
//! rejected and the attribute is dropped from the response.

use thiserror::Error;

/// An attribute whose name cannot be emitted as an element. Non-fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("attribute '{attribute}' cannot be rendered as element '{element}'")]
pub struct AttributeNameError {
    pub attribute: String,
    pub element: String,
}

/// Map an attribute name to the local element name used under `cas:`.
pub fn element_name_for_attribute(attribute: &str) -> Result<String, AttributeNameError> {
    let element = attribute.replace(':', "_");
    if is_valid_element_name(&element) {
        Ok(element)
    } else {
        Err(AttributeNameError {
            attribute: attribute.to_string(),
            element,
        })
    }
}

/// Letters or `_` first; then letters, digits, `-`, `_`, `.`.
///
/// Both positions are also held to the XML 1.0 `NameStartChar` / `NameChar`
/// ranges, which exclude some alphabetic code points (combining marks such as
/// U+0345 cannot start a name).
pub fn is_valid_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && is_xml_name_start_char(first)
        && chars.all(|c| (c.is_alphanumeric() || matches!(c, '-' | '_' | '.')) && is_xml_name_char(c))
}

fn is_xml_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

fn is_xml_name_char(c: char) -> bool {
    is_xml_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colons_become_underscores() {
        assert_eq!(
            element_name_for_attribute("urn:oid:0.9.2342.19200300.100.1.1").unwrap(),
            "urn_oid_0.9.2342.19200300.100.1.1"
        );
    }

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(element_name_for_attribute("lastName").unwrap(), "lastName");
        assert_eq!(element_name_for_attribute("_private-x.y").unwrap(), "_private-x.y");
        assert_eq!(element_name_for_attribute("nom_de_famille").unwrap(), "nom_de_famille");
    }

    #[test]
    fn illegal_names_are_rejected() {
        for name in [
            "",
            "1stName",
            "-name",
            ".name",
            "given name",
            "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/givenname",
            "a/b",
            "a<b",
        ] {
            assert!(element_name_for_attribute(name).is_err(), "{name:?}");
        }
    }

    #[test]
    fn xml_name_start_rules_apply() {
        assert!(!is_valid_element_name("\u{345}x"));
        assert!(is_valid_element_name("x\u{345}"));
        assert!(is_valid_element_name("émile"));
        assert!(is_valid_element_name("名前"));
        assert!(!is_valid_element_name("x\u{D7}y"));
    }

    #[test]
    fn error_reports_both_names() {
        let err = element_name_for_attribute("urn:x/y").unwrap_err();
        assert_eq!(err.attribute, "urn:x/y");
        assert_eq!(err.element, "urn_x/y");
    }
}
