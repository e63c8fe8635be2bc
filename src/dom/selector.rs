//! CSS selector subset used by binding queries and configuration.
//!
//! Supported: type (`div`, `*`), `#id`, `.class`, `[attr]`, `[attr=value]`
//! (quoted or bare), compound selectors, the descendant combinator and
//! comma-separated lists.

use thiserror::Error;

use crate::dom::document::Document;
use crate::dom::node::{ElementData, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected '{ch}' at offset {pos}")]
    Unexpected { ch: char, pos: usize },

    #[error("unterminated attribute selector")]
    UnterminatedAttribute,

    #[error("unterminated string in attribute selector")]
    UnterminatedString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, el: &ElementData) -> bool {
        if let Some(tag) = &self.tag {
            if tag != "*" && tag != el.tag() {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| el.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|a| match &a.value {
            None => el.has_attribute(&a.name),
            Some(v) if a.name == "class" => el.class_name() == *v,
            Some(v) => el.attribute(&a.name) == Some(v.as_str()),
        })
    }
}

/// Compounds joined by descendant combinators.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
}

impl Complex {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some((last, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        match doc.element(node) {
            Some(el) if last.matches(el) => {}
            _ => return false,
        }

        // Nearest-ancestor matching is exact for descendant-only chains.
        let mut current = doc.parent(node);
        for compound in ancestors.iter().rev() {
            loop {
                let Some(candidate) = current else {
                    return false;
                };
                current = doc.parent(candidate);
                if doc.element(candidate).is_some_and(|el| compound.matches(el)) {
                    break;
                }
            }
        }
        true
    }
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<Complex>,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        Parser::new(input).parse_list()
    }

    /// List matching elements that carry any of the `names` attributes.
    pub fn any_attribute(names: &[&str]) -> Self {
        let selectors = names
            .iter()
            .map(|name| Complex {
                compounds: vec![Compound {
                    attrs: vec![AttrSelector {
                        name: name.to_ascii_lowercase(),
                        value: None,
                    }],
                    ..Default::default()
                }],
            })
            .collect();
        Self { selectors }
    }

    /// Whether `node` is an element matched by any selector in the list.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(doc, node))
    }
}

impl std::str::FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(ch) => SelectorError::Unexpected { ch, pos: self.pos },
            None => SelectorError::Empty,
        }
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_list(&mut self) -> Result<SelectorList, SelectorError> {
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            selectors.push(self.parse_complex()?);
            match self.peek() {
                None => break,
                Some(',') => self.pos += 1,
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(SelectorList { selectors })
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        let mut compounds = Vec::new();
        loop {
            let compound = self.parse_compound()?;
            if compound.is_empty() {
                return Err(self.unexpected());
            }
            compounds.push(compound);

            let had_space = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => break,
                Some(_) if had_space => continue,
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(Complex { compounds })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();

        if self.peek() == Some('*') {
            self.pos += 1;
            compound.tag = Some("*".to_string());
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.ident()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.parse_attr()?);
                }
                _ => break,
            }
        }
        Ok(compound)
    }

    fn parse_attr(&mut self) -> Result<AttrSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.ident().map_err(|e| match e {
            SelectorError::Empty => SelectorError::UnterminatedAttribute,
            other => other,
        })?;
        self.skip_whitespace();

        let value = match self.peek() {
            Some(']') => None,
            Some('=') => {
                self.pos += 1;
                self.skip_whitespace();
                let value = match self.peek() {
                    Some(q @ ('"' | '\'')) => {
                        self.pos += 1;
                        let start = self.pos;
                        while self.peek().is_some_and(|c| c != q) {
                            self.pos += 1;
                        }
                        if self.peek().is_none() {
                            return Err(SelectorError::UnterminatedString);
                        }
                        let value: String = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        value
                    }
                    _ => self.ident()?,
                };
                self.skip_whitespace();
                Some(value)
            }
            None => return Err(SelectorError::UnterminatedAttribute),
            Some(_) => return Err(self.unexpected()),
        };

        if self.peek() != Some(']') {
            return Err(SelectorError::UnterminatedAttribute);
        }
        self.pos += 1;

        Ok(AttrSelector {
            name: name.to_ascii_lowercase(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        for input in [
            "div",
            "*",
            "#footer",
            ".a.b",
            "[cms-title]",
            "[cms-content-editor],[cms-component-content]",
            "div.x[data-k='v w'] span",
            "  main  #content ,  footer ",
            "[a = b]",
        ] {
            assert!(SelectorList::parse(input).is_ok(), "{input}");
        }
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(SelectorList::parse(""), Err(SelectorError::Empty));
        assert_eq!(SelectorList::parse("[unclosed"), Err(SelectorError::UnterminatedAttribute));
        assert_eq!(SelectorList::parse("[a='x]"), Err(SelectorError::UnterminatedString));
        assert!(SelectorList::parse("div >").is_err());
        assert!(SelectorList::parse("a,,b").is_err());
    }

    #[test]
    fn test_matching() {
        let mut doc = Document::new();
        let body = doc.body();
        let main = doc.create_element("main");
        doc.set_attribute(main, "id", "content");
        doc.append_child(body, main);
        let div = doc.create_element("div");
        doc.set_attribute(div, "class", "card wide");
        doc.set_attribute(div, "cms-title", "");
        doc.append_child(main, div);

        let matches = |s: &str| SelectorList::parse(s).unwrap().matches(&doc, div);
        assert!(matches("div"));
        assert!(matches(".card.wide"));
        assert!(matches("[cms-title]"));
        assert!(matches("#content div"));
        assert!(matches("body .card"));
        assert!(matches("span, div"));
        assert!(!matches(".content"));
        assert!(!matches("footer div"));
        assert!(!matches("div[cms-title=x]"));
        assert!(!matches(".card.narrow"));

        let bound = SelectorList::any_attribute(&["cms-content-editor", "cms-title"]);
        assert!(bound.matches(&doc, div));
        assert!(!bound.matches(&doc, main));
    }
}
