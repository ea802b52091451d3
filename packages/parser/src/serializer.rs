use crate::error::ParseResult;
use crate::reference::ReferenceData;
use std::fmt::Write;

/// Serializer produces markup for newly created elements
///
/// Existing nodes are never re-serialized: edits copy their source text
/// verbatim so formatting survives cut, paste and move.
pub struct Serializer<'r> {
    reference: &'r ReferenceData,
}

impl<'r> Serializer<'r> {
    pub fn new(reference: &'r ReferenceData) -> Self {
        Self { reference }
    }

    /// `<name a="b">` for the given attributes, in order
    pub fn open_tag(&self, name: &str, attributes: &[(String, String)]) -> String {
        let mut output = String::new();
        output.push('<');
        output.push_str(name);
        for (key, value) in attributes {
            output.push(' ');
            output.push_str(key);
            if !value.is_empty() || self.keeps_empty_value(name, key) {
                let _ = write!(output, "=\"{}\"", escape_attribute(value));
            }
        }
        output.push('>');
        output
    }

    pub fn close_tag(&self, name: &str) -> String {
        format!("</{}>", name)
    }

    /// Markup for a fresh element with its default attributes and content
    pub fn element(&self, name: &str) -> ParseResult<String> {
        let (attributes, content, void) = match self.reference.get(name) {
            Some(reference) => (
                reference.default_attributes()?,
                reference.default_content.as_str(),
                reference.void,
            ),
            None => (vec![], "", false),
        };

        let mut output = self.open_tag(name, &attributes);
        if !void {
            output.push_str(content);
            output.push_str(&self.close_tag(name));
        }
        Ok(output)
    }

    /// Empty values written explicitly in the reference table stay explicit
    fn keeps_empty_value(&self, name: &str, key: &str) -> bool {
        self.reference
            .get(name)
            .map(|r| r.attributes.contains(&format!("{}=", key)))
            .unwrap_or(false)
    }
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
