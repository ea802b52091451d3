use crate::error::ParseResult;
use crate::id_generator::{document_seed, NodeUidGenerator};
use crate::lexer::parse_tag_attributes;
use crate::line_index::LineIndex;
use crate::reference::ReferenceData;
use std::collections::{HashMap, HashSet};
use trellis_common::{
    Node, NodeKind, NodeTree, NodeUid, COMMENT_NODE_NAME, ROOT_NODE_NAME, ROOT_NODE_UID,
    TEXT_NODE_NAME,
};

/// Elements whose content is not markup
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Produces a node tree from a buffer snapshot
pub trait TreeParser: Send + Sync {
    fn parse(&self, source: &str) -> ParseResult<NodeTree>;
}

/// Lenient markup parser.
///
/// Never fails on malformed input: unclosed elements end where their parent
/// closes (or at end of input), stray close tags and doctype/processing
/// instructions are skipped, a `<` that does not start a tag is text.
#[derive(Debug, Clone)]
pub struct MarkupParser {
    seed: String,
    void_elements: HashSet<String>,
}

impl MarkupParser {
    pub fn new(path: &str) -> Self {
        Self::with_reference(path, &ReferenceData::html())
    }

    pub fn with_reference(path: &str, reference: &ReferenceData) -> Self {
        Self {
            seed: document_seed(path),
            void_elements: reference.void_elements().map(str::to_string).collect(),
        }
    }

    pub fn is_void(&self, name: &str) -> bool {
        self.void_elements.contains(name)
    }
}

impl TreeParser for MarkupParser {
    fn parse(&self, source: &str) -> ParseResult<NodeTree> {
        let tree = Scanner::new(source, self).run();
        tracing::debug!(nodes = tree.len(), bytes = source.len(), "parsed document");
        Ok(tree)
    }
}

struct OpenElement {
    uid: NodeUid,
    name: String,
}

struct Scanner<'src, 'p> {
    source: &'src str,
    pos: usize,
    lines: LineIndex<'src>,
    parser: &'p MarkupParser,
    uids: NodeUidGenerator,
    tree: NodeTree,
    stack: Vec<OpenElement>,
}

impl<'src, 'p> Scanner<'src, 'p> {
    fn new(source: &'src str, parser: &'p MarkupParser) -> Self {
        Self {
            source,
            pos: 0,
            lines: LineIndex::new(source),
            parser,
            uids: NodeUidGenerator::from_seed(parser.seed.as_str()),
            tree: NodeTree::new(),
            stack: Vec::new(),
        }
    }

    fn run(mut self) -> NodeTree {
        self.tree.insert(Node {
            uid: ROOT_NODE_UID.to_string(),
            parent_uid: None,
            children: vec![],
            kind: NodeKind::Root,
            name: ROOT_NODE_NAME.to_string(),
            attributes: HashMap::new(),
            is_entity: true,
            source_range: Some(self.lines.range(0, self.source.len())),
            start_tag: None,
            end_tag: None,
        });

        while self.pos < self.source.len() {
            let rest = &self.source[self.pos..];
            if rest.starts_with("<!--") {
                self.parse_comment();
            } else if rest.starts_with("</") && starts_tag_name(&rest[2..]) {
                self.parse_close_tag();
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_declaration();
            } else if rest.starts_with('<') && starts_tag_name(&rest[1..]) {
                self.parse_open_tag();
            } else {
                self.parse_text();
            }
        }

        let end = self.source.len();
        while let Some(open) = self.stack.pop() {
            self.finish_element(&open.uid, end, None);
        }

        self.tree
    }

    fn parent_uid(&self) -> NodeUid {
        self.stack
            .last()
            .map(|open| open.uid.clone())
            .unwrap_or_else(|| ROOT_NODE_UID.to_string())
    }

    fn push_node(&mut self, kind: NodeKind, name: String, start: usize, end: usize) -> NodeUid {
        let uid = self.uids.next_uid();
        let parent = self.parent_uid();
        let is_entity = match kind {
            NodeKind::Text => !self.source[start..end].trim().is_empty(),
            _ => true,
        };

        if let Some(parent_node) = self.tree.get_mut(&parent) {
            parent_node.children.push(uid.clone());
        }
        self.tree.insert(Node {
            uid: uid.clone(),
            parent_uid: Some(parent),
            children: vec![],
            kind,
            name,
            attributes: HashMap::new(),
            is_entity,
            source_range: Some(self.lines.range(start, end)),
            start_tag: None,
            end_tag: None,
        });
        uid
    }

    fn finish_element(&mut self, uid: &str, end: usize, end_tag: Option<(usize, usize)>) {
        let end_tag = end_tag.map(|(s, e)| self.lines.range(s, e));
        let Some(start) = self
            .tree
            .get(uid)
            .and_then(|n| n.source_range)
            .map(|r| r.start_offset)
        else {
            return;
        };
        let range = self.lines.range(start, end);
        if let Some(node) = self.tree.get_mut(uid) {
            node.source_range = Some(range);
            node.end_tag = end_tag;
        }
    }

    fn parse_comment(&mut self) {
        let start = self.pos;
        let end = self.source[start + 4..]
            .find("-->")
            .map(|i| start + 4 + i + 3)
            .unwrap_or(self.source.len());
        self.push_node(NodeKind::Comment, COMMENT_NODE_NAME.to_string(), start, end);
        self.pos = end;
    }

    fn skip_declaration(&mut self) {
        let start = self.pos;
        self.pos = self.source[start..]
            .find('>')
            .map(|i| start + i + 1)
            .unwrap_or(self.source.len());
        tracing::trace!(start, "skipped declaration");
    }

    fn parse_text(&mut self) {
        let start = self.pos;
        let mut end = self.source.len();
        let mut search = start
            + self.source[start..]
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(1);
        while let Some(i) = self.source.get(search..).and_then(|s| s.find('<')) {
            let at = search + i;
            if starts_construct(&self.source[at..]) {
                end = at;
                break;
            }
            search = at + 1;
        }
        self.push_node(NodeKind::Text, TEXT_NODE_NAME.to_string(), start, end);
        self.pos = end;
    }

    fn parse_open_tag(&mut self) {
        let source = self.source;
        let start = self.pos;
        let Some(gt) = find_tag_end(source, start + 1) else {
            // No closing '>': the rest of the buffer is text
            let end = self.source.len();
            self.push_node(NodeKind::Text, TEXT_NODE_NAME.to_string(), start, end);
            self.pos = end;
            return;
        };
        let tag_end = gt + 1;
        let inner = &source[start + 1..gt];
        let name_len = inner.find(|c: char| !is_tag_name_char(c)).unwrap_or(inner.len());
        let name = inner[..name_len].to_ascii_lowercase();
        let attr_source = &inner[name_len..];
        let self_closing = attr_source.trim_end().ends_with('/');

        let uid = self.push_node(NodeKind::Element, name.clone(), start, tag_end);
        let start_tag = self.lines.range(start, tag_end);
        let attributes: HashMap<String, String> = parse_tag_attributes(attr_source).into_iter().collect();
        if let Some(node) = self.tree.get_mut(&uid) {
            node.start_tag = Some(start_tag);
            node.attributes = attributes;
        }
        self.pos = tag_end;

        if self_closing || self.parser.is_void(&name) {
            return;
        }

        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            self.stack.push(OpenElement { uid: uid.clone(), name: name.clone() });
            let close = find_ascii_case_insensitive(source, tag_end, &format!("</{}", name));
            let content_end = close.unwrap_or(source.len());
            if content_end > tag_end {
                self.push_node(NodeKind::Text, TEXT_NODE_NAME.to_string(), tag_end, content_end);
            }
            self.pos = content_end;
            return;
        }

        self.stack.push(OpenElement { uid, name });
    }

    fn parse_close_tag(&mut self) {
        let start = self.pos;
        let Some(gt) = find_tag_end(self.source, start + 2) else {
            let end = self.source.len();
            self.push_node(NodeKind::Text, TEXT_NODE_NAME.to_string(), start, end);
            self.pos = end;
            return;
        };
        let end = gt + 1;
        let inner = &self.source[start + 2..gt];
        let name_len = inner.find(|c: char| !is_tag_name_char(c)).unwrap_or(inner.len());
        let name = inner[..name_len].to_ascii_lowercase();
        self.pos = end;

        let Some(index) = self.stack.iter().rposition(|open| open.name == name) else {
            tracing::trace!(start, %name, "skipped stray close tag");
            return;
        };

        // Anything opened after the matching element is left unclosed
        while self.stack.len() > index + 1 {
            if let Some(open) = self.stack.pop() {
                self.finish_element(&open.uid, start, None);
            }
        }
        if let Some(open) = self.stack.pop() {
            self.finish_element(&open.uid, end, Some((start, end)));
        }
    }
}

fn is_tag_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

fn starts_tag_name(rest: &str) -> bool {
    rest.chars().next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false)
}

fn starts_construct(rest: &str) -> bool {
    rest.starts_with("<!")
        || rest.starts_with("<?")
        || (rest.starts_with("</") && starts_tag_name(&rest[2..]))
        || (rest.starts_with('<') && starts_tag_name(&rest[1..]))
}

/// Offset of the `>` closing a tag, skipping quoted attribute values
fn find_tag_end(source: &str, from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, b) in source.as_bytes()[from..].iter().enumerate() {
        match (quote, *b) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(*b),
            (None, b'>') => return Some(from + i),
            _ => {}
        }
    }
    None
}

fn find_ascii_case_insensitive(source: &str, from: usize, needle: &str) -> Option<usize> {
    let haystack = source.as_bytes();
    let needle = needle.as_bytes();
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Parse with a path-derived uid seed
pub fn parse_with_path(source: &str, path: &str) -> ParseResult<NodeTree> {
    MarkupParser::new(path).parse(source)
}

pub fn parse(source: &str) -> ParseResult<NodeTree> {
    parse_with_path(source, "<anonymous>")
}
