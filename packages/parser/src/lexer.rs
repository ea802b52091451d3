//! Attribute lexer using logos
//!
//! Tag boundaries are found by the markup scanner; the text between the tag
//! name and the closing `>` is tokenized here. The same tokens back the strict
//! grammar used for reference-data attribute strings.

use crate::error::{ParseError, ParseResult};
use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum AttrToken<'src> {
    #[regex(r#"[^ \t\r\n\f"'=<>/`]+"#, |lex| lex.slice())]
    Name(&'src str),

    #[token("=")]
    Eq,

    #[token("/")]
    Slash,

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        &s[1..s.len()-1]
    })]
    DoubleQuoted(&'src str),

    #[regex(r"'[^']*'", |lex| {
        let s = lex.slice();
        &s[1..s.len()-1]
    })]
    SingleQuoted(&'src str),
}

/// Tokenize, keeping byte spans. Unrecognized input is reported by offset.
pub fn tokenize(source: &str) -> Vec<Result<(AttrToken<'_>, std::ops::Range<usize>), usize>> {
    let mut lexer = AttrToken::lexer(source);
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push(Ok((token, lexer.span()))),
            Err(_) => tokens.push(Err(lexer.span().start)),
        }
    }

    tokens
}

/// Lenient in-tag attribute parsing.
///
/// Mirrors how browsers treat sloppy markup: stray `=`, `/` and unlexable
/// characters are skipped, unquoted values are accepted, a name without a
/// value maps to the empty string. Later duplicates do not override earlier
/// ones.
pub fn parse_tag_attributes(source: &str) -> Vec<(String, String)> {
    let tokens: Vec<_> = tokenize(source).into_iter().filter_map(Result::ok).collect();
    let mut attributes: Vec<(String, String)> = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let AttrToken::Name(name) = tokens[i].0 else {
            i += 1;
            continue;
        };
        i += 1;

        let mut value = String::new();
        if matches!(tokens.get(i), Some((AttrToken::Eq, _))) {
            i += 1;
            match tokens.get(i) {
                Some((AttrToken::DoubleQuoted(v), _))
                | Some((AttrToken::SingleQuoted(v), _))
                | Some((AttrToken::Name(v), _)) => {
                    value = v.to_string();
                    i += 1;
                }
                _ => {}
            }
        }

        let name = name.to_ascii_lowercase();
        if !attributes.iter().any(|(existing, _)| *existing == name) {
            attributes.push((name, value));
        }
    }

    attributes
}

/// Strict attribute-string grammar: `name` or `name="value"` / `name='value'`
/// separated by whitespace. Anything else is an error, including unquoted
/// values and repeated names.
pub fn parse_attribute_string(source: &str) -> ParseResult<Vec<(String, String)>> {
    let mut tokens = tokenize(source).into_iter().peekable();
    let mut attributes: Vec<(String, String)> = Vec::new();

    while let Some(token) = tokens.next() {
        let (token, span) = token.map_err(ParseError::lexer_error)?;
        let AttrToken::Name(name) = token else {
            return Err(ParseError::unexpected_token(
                span.start,
                "attribute name",
                format!("{:?}", token),
            ));
        };

        let mut value = String::new();
        if let Some(Ok((AttrToken::Eq, _))) = tokens.peek() {
            tokens.next();
            match tokens.next() {
                Some(Ok((AttrToken::DoubleQuoted(v), _))) | Some(Ok((AttrToken::SingleQuoted(v), _))) => {
                    value = v.to_string();
                }
                Some(Ok((other, span))) => {
                    return Err(ParseError::unexpected_token(
                        span.start,
                        "quoted value",
                        format!("{:?}", other),
                    ));
                }
                Some(Err(pos)) => return Err(ParseError::lexer_error(pos)),
                None => return Err(ParseError::unexpected_eof(source.len())),
            }
        }

        if attributes.iter().any(|(existing, _)| existing == name) {
            return Err(ParseError::invalid_syntax(
                span.start,
                format!("duplicate attribute '{}'", name),
            ));
        }
        attributes.push((name.to_string(), value));
    }

    Ok(attributes)
}
