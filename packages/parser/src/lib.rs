//! # Trellis Parser
//!
//! Turns a markup buffer into the node tree the editor works on, and carries
//! the element reference data used to validate structural edits.

pub mod error;
pub mod id_generator;
pub mod lexer;
pub mod line_index;
pub mod parser;
pub mod reference;
pub mod serializer;

pub use error::{ParseError, ParseResult};
pub use id_generator::{document_seed, NodeUidGenerator};
pub use lexer::{parse_attribute_string, parse_tag_attributes};
pub use line_index::LineIndex;
pub use parser::{parse, parse_with_path, MarkupParser, TreeParser};
pub use reference::{ContentModel, ElementReference, ReferenceData};
pub use serializer::Serializer;
