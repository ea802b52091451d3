//! # Element Reference Data
//!
//! Per-element metadata consulted by the action engine: which children an
//! element accepts, the attributes and content a newly added element starts
//! with, and whether the element is void.

use crate::error::{ParseError, ParseResult};
use crate::lexer::parse_attribute_string;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use trellis_common::{COMMENT_NODE_NAME, ROOT_NODE_NAME, TEXT_NODE_NAME};

/// Allowed children of an element
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentModel {
    #[default]
    Any,
    None,
    /// Tag names, `#text`, or `@category` entries
    Only(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementReference {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub content: ContentModel,
    /// Default attributes as a well-formed `name="value"` string
    #[serde(default)]
    pub attributes: String,
    #[serde(default)]
    pub default_content: String,
    #[serde(default)]
    pub void: bool,
}

impl ElementReference {
    fn new(categories: &[&str], content: ContentModel) -> Self {
        Self {
            categories: categories.iter().map(|c| c.to_string()).collect(),
            content,
            ..Default::default()
        }
    }

    fn with_attributes(mut self, attributes: &str) -> Self {
        self.attributes = attributes.to_string();
        self
    }

    fn with_content(mut self, content: &str) -> Self {
        self.default_content = content.to_string();
        self
    }

    fn void(mut self) -> Self {
        self.void = true;
        self.content = ContentModel::None;
        self
    }

    /// Parsed default attributes.
    ///
    /// Strings are validated when the table is loaded, so this only fails
    /// for tables built by hand.
    pub fn default_attributes(&self) -> ParseResult<Vec<(String, String)>> {
        parse_attribute_string(&self.attributes)
    }
}

fn only(items: &[&str]) -> ContentModel {
    ContentModel::Only(items.iter().map(|i| i.to_string()).collect())
}

/// Element table keyed by tag name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferenceData {
    pub elements: HashMap<String, ElementReference>,
}

impl ReferenceData {
    /// Load a table from JSON, validating every attribute string
    pub fn from_json(source: &str) -> ParseResult<Self> {
        let data: ReferenceData = serde_json::from_str(source)?;
        data.validate()?;
        Ok(data)
    }

    pub fn validate(&self) -> ParseResult<()> {
        for (name, element) in &self.elements {
            parse_attribute_string(&element.attributes).map_err(|e| {
                ParseError::ReferenceData(format!("attributes of <{}>: {}", name, e))
            })?;
            if element.void && !element.default_content.is_empty() {
                return Err(ParseError::ReferenceData(format!(
                    "void element <{}> cannot have default content",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Built-in HTML table
    pub fn html() -> Self {
        let flow = ["flow"];
        let phrasing = ["flow", "phrasing"];
        let phrasing_content = only(&["@phrasing", TEXT_NODE_NAME]);

        let mut elements = HashMap::new();
        let mut add = |name: &str, reference: ElementReference| {
            elements.insert(name.to_string(), reference);
        };

        add("html", ElementReference::new(&[], only(&["head", "body"])));
        add("head", ElementReference::new(&[], only(&["title", "meta", "link", "style", "script"])));
        add("body", ElementReference::new(&[], ContentModel::Any));
        add("title", ElementReference::new(&[], only(&[TEXT_NODE_NAME])).with_content("Title"));
        add("meta", ElementReference::new(&[], ContentModel::None).void());
        add("link", ElementReference::new(&[], ContentModel::None).with_attributes(r#"rel="stylesheet" href="""#).void());
        add("style", ElementReference::new(&[], only(&[TEXT_NODE_NAME])));
        add("script", ElementReference::new(&["flow", "phrasing"], only(&[TEXT_NODE_NAME])));

        for name in ["div", "section", "article", "header", "footer", "nav", "main", "aside", "li", "td", "th", "form"] {
            add(name, ElementReference::new(&flow, ContentModel::Any));
        }
        add("ul", ElementReference::new(&flow, only(&["li"])));
        add("ol", ElementReference::new(&flow, only(&["li"])));
        add("table", ElementReference::new(&flow, only(&["thead", "tbody", "tr"])));
        add("thead", ElementReference::new(&[], only(&["tr"])));
        add("tbody", ElementReference::new(&[], only(&["tr"])));
        add("tr", ElementReference::new(&[], only(&["td", "th"])));

        add("p", ElementReference::new(&flow, phrasing_content.clone()).with_content("Paragraph"));
        for (name, content) in [("h1", "Heading 1"), ("h2", "Heading 2"), ("h3", "Heading 3")] {
            add(
                name,
                ElementReference::new(&["flow", "heading"], phrasing_content.clone()).with_content(content),
            );
        }
        for name in ["span", "strong", "em", "label"] {
            add(name, ElementReference::new(&phrasing, phrasing_content.clone()));
        }
        add(
            "a",
            ElementReference::new(&phrasing, ContentModel::Any)
                .with_attributes(r##"href="#""##)
                .with_content("Link"),
        );
        add(
            "button",
            ElementReference::new(&["flow", "phrasing", "interactive"], phrasing_content)
                .with_attributes(r#"type="button""#)
                .with_content("Button"),
        );

        add("br", ElementReference::new(&phrasing, ContentModel::None).void());
        add("hr", ElementReference::new(&flow, ContentModel::None).void());
        add(
            "img",
            ElementReference::new(&phrasing, ContentModel::None)
                .with_attributes(r#"src="" alt="""#)
                .void(),
        );
        add(
            "input",
            ElementReference::new(&["flow", "phrasing", "interactive"], ContentModel::None)
                .with_attributes(r#"type="text""#)
                .void(),
        );

        Self { elements }
    }

    pub fn get(&self, name: &str) -> Option<&ElementReference> {
        self.elements.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.elements.contains_key(name)
    }

    pub fn is_void(&self, name: &str) -> bool {
        self.elements.get(name).map(|e| e.void).unwrap_or(false)
    }

    pub fn void_elements(&self) -> impl Iterator<Item = &str> {
        self.elements
            .iter()
            .filter(|(_, e)| e.void)
            .map(|(name, _)| name.as_str())
    }

    /// True if `parent` may contain a `child`.
    ///
    /// The document root and elements missing from the table accept anything.
    /// Comments are accepted wherever children are.
    pub fn allows(&self, parent: &str, child: &str) -> bool {
        if parent == ROOT_NODE_NAME {
            return true;
        }
        let Some(reference) = self.elements.get(parent) else {
            return true;
        };

        match &reference.content {
            ContentModel::Any => true,
            ContentModel::None => false,
            ContentModel::Only(_) if child == COMMENT_NODE_NAME => true,
            ContentModel::Only(items) => {
                let categories = self
                    .elements
                    .get(child)
                    .map(|c| c.categories.as_slice())
                    .unwrap_or_default();
                items.iter().any(|item| match item.strip_prefix('@') {
                    Some(category) => categories.iter().any(|c| c == category),
                    None => item == child,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_valid() {
        let html = ReferenceData::html();
        assert_eq!(html.validate(), Ok(()));
        assert!(html.is_void("img"));
        assert!(!html.is_void("div"));
    }

    #[test]
    fn test_content_model() {
        let html = ReferenceData::html();

        assert!(html.allows("div", "p"));
        assert!(html.allows("ul", "li"));
        assert!(!html.allows("ul", "div"));
        assert!(html.allows("p", "span"));
        assert!(html.allows("p", TEXT_NODE_NAME));
        assert!(!html.allows("p", "div"));
        assert!(!html.allows("img", "span"));
        assert!(html.allows(ROOT_NODE_NAME, "li"));
        assert!(html.allows("custom-element", "div"));
        assert!(html.allows("ul", COMMENT_NODE_NAME));
    }

    #[test]
    fn test_default_attributes() {
        let html = ReferenceData::html();
        let attrs = html.get("img").unwrap().default_attributes().unwrap();
        assert_eq!(
            attrs,
            vec![("src".to_string(), String::new()), ("alt".to_string(), String::new())]
        );
    }

    #[test]
    fn test_from_json() {
        let data = ReferenceData::from_json(
            r#"{"elements": {
                "card": {"categories": ["flow"], "content": {"only": ["h1", "@phrasing"]}, "attributes": "class=\"card\""},
                "spacer": {"void": true, "content": "none"}
            }}"#,
        )
        .unwrap();

        assert!(data.is_void("spacer"));
        assert_eq!(
            data.get("card").unwrap().content,
            ContentModel::Only(vec!["h1".to_string(), "@phrasing".to_string()])
        );
    }

    #[test]
    fn test_from_json_rejects_malformed_attributes() {
        let err = ReferenceData::from_json(r#"{"elements": {"a": {"attributes": "href=#"}}}"#).unwrap_err();
        assert!(matches!(err, ParseError::ReferenceData(_)));
    }
}
