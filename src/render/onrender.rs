//! On-render helper scripts.
//!
//! A script is a `;`-separated list of helper calls evaluated against the
//! page document:
//!
//! ```text
//! showIf(page.properties.banner); addClass(page.properties.theme || 'light')
//! ```
//!
//! Only the helpers below exist; anything else fails to parse and the
//! whole script is skipped.

use serde_json::Value;

use crate::dom::{Document, NodeId};
use crate::render::expr::{to_text, truthy, Expr, ExprError, Parser, Token};
use crate::render::live::RENDERED_CLASS_PREFIX;

/// Class hiding an element (see the render stylesheet).
pub const HIDE_CLASS: &str = "jshcms_onrender_hide";
pub const INIT_CLASS_ATTR: &str = "jshcms_properties_initClass";
pub const INIT_STYLE_ATTR: &str = "jshcms_properties_initStyle";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Helper {
    /// `showIf` / `toggle`
    ShowIf,
    /// `addClass` / `setClass`
    AddClass,
    /// `addStyle` / `setStyle`
    AddStyle,
}

impl Helper {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "showIf" | "toggle" => Some(Helper::ShowIf),
            "addClass" | "setClass" => Some(Helper::AddClass),
            "addStyle" | "setStyle" => Some(Helper::AddStyle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub helper: Helper,
    pub args: Vec<Expr>,
}

/// A parsed on-render script.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    calls: Vec<Call>,
}

impl Script {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let mut parser = Parser::new(source)?;
        let mut calls = Vec::new();

        loop {
            while parser.eat(&Token::Semi) {}
            if parser.at_end() {
                break;
            }

            let name = parser.ident()?;
            let helper = Helper::from_name(&name).ok_or(ExprError::UnknownIdentifier(name))?;
            parser.expect(&Token::LParen, "'('")?;
            let mut args = Vec::new();
            if !parser.eat(&Token::RParen) {
                loop {
                    args.push(parser.expression()?);
                    if parser.eat(&Token::Comma) {
                        continue;
                    }
                    parser.expect(&Token::RParen, "')'")?;
                    break;
                }
            }
            calls.push(Call { helper, args });

            if !parser.at_end() {
                parser.expect(&Token::Semi, "';'")?;
            }
        }
        Ok(Self { calls })
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Apply every call to `node`, in order.
    pub fn run(&self, doc: &mut Document, node: NodeId, page: &Value) {
        for call in &self.calls {
            let arg = call
                .args
                .first()
                .map(|expr| expr.eval(page))
                .unwrap_or(Value::Null);
            match call.helper {
                Helper::ShowIf => show_if(doc, node, truthy(&arg)),
                Helper::AddClass => add_class(doc, node, &to_text(&arg)),
                Helper::AddStyle => add_style(doc, node, &to_text(&arg)),
            }
        }
    }
}

pub fn show_if(doc: &mut Document, node: NodeId, show: bool) {
    if show {
        doc.remove_class(node, HIDE_CLASS);
    } else {
        doc.add_class(node, HIDE_CLASS);
    }
}

/// Add `classes`, dropping classes added by earlier calls that are neither
/// requested now nor part of the element's initial class list.
pub fn add_class(doc: &mut Document, node: NodeId, classes: &str) {
    let previous: Vec<String> = doc
        .classes(node)
        .into_iter()
        .filter(|c| !c.starts_with(RENDERED_CLASS_PREFIX) && c != HIDE_CLASS)
        .collect();

    if !doc.has_attribute(node, INIT_CLASS_ATTR) {
        doc.set_attribute(node, INIT_CLASS_ATTR, &previous.join(" "));
    }
    let initial: Vec<String> = doc
        .attribute(node, INIT_CLASS_ATTR)
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let requested: Vec<&str> = classes.split_whitespace().collect();
    for class in &requested {
        doc.add_class(node, class);
    }
    for class in &previous {
        if !requested.contains(&class.as_str()) && !initial.contains(class) {
            doc.remove_class(node, class);
        }
    }
}

/// Set `style` to the element's initial style followed by `style`.
pub fn add_style(doc: &mut Document, node: NodeId, style: &str) {
    if !doc.has_attribute(node, INIT_STYLE_ATTR) {
        let current = doc.attribute(node, "style").unwrap_or_default().to_string();
        doc.set_attribute(node, INIT_STYLE_ATTR, &current);
    }
    let initial = doc.attribute(node, INIT_STYLE_ATTR).unwrap_or_default();
    let separator = if !initial.is_empty() && !initial.ends_with(';') { ";" } else { "" };
    let value = format!("{initial}{separator}{}", style.trim());
    doc.set_attribute(node, "style", &value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn element(doc: &mut Document, class: &str) -> NodeId {
        let node = doc.create_element("div");
        doc.set_attribute(node, "class", class);
        let body = doc.body();
        doc.append_child(body, node);
        node
    }

    #[test]
    fn test_parse() {
        let script = Script::parse("showIf(page.title); ; toggle(!page.x);setStyle('a:b')").unwrap();
        let helpers: Vec<Helper> = script.calls().iter().map(|c| c.helper).collect();
        assert_eq!(helpers, [Helper::ShowIf, Helper::ShowIf, Helper::AddStyle]);
        assert!(Script::parse("").unwrap().calls().is_empty());
    }

    #[test]
    fn test_parse_rejects_unknown_helpers() {
        assert_eq!(
            Script::parse("showIf(true); eval('x')"),
            Err(ExprError::UnknownIdentifier("eval".to_string()))
        );
        assert!(Script::parse("showIf(true) addClass('x')").is_err());
    }

    #[test]
    fn test_show_if() {
        let mut doc = Document::new();
        let node = element(&mut doc, "card");
        let page = json!({ "properties": { "visible": false } });

        Script::parse("showIf(page.properties.visible)").unwrap().run(&mut doc, node, &page);
        assert!(doc.has_class(node, HIDE_CLASS));
        Script::parse("toggle(true)").unwrap().run(&mut doc, node, &page);
        assert!(!doc.has_class(node, HIDE_CLASS));
    }

    #[test]
    fn test_add_class_replaces_previously_added() {
        let mut doc = Document::new();
        let node = element(&mut doc, "card jshcms_rendered_3");

        add_class(&mut doc, node, "dark wide");
        assert_eq!(doc.attribute(node, INIT_CLASS_ATTR), Some("card"));
        assert!(doc.has_class(node, "dark") && doc.has_class(node, "wide"));

        add_class(&mut doc, node, "light");
        assert!(doc.has_class(node, "card"));
        assert!(doc.has_class(node, "light"));
        assert!(!doc.has_class(node, "dark"));
        assert!(!doc.has_class(node, "wide"));
        assert!(doc.has_class(node, "jshcms_rendered_3"));
    }

    #[test]
    fn test_add_style_appends_to_initial() {
        let mut doc = Document::new();
        let node = element(&mut doc, "");
        doc.set_attribute(node, "style", "color:red");

        add_style(&mut doc, node, " margin:0 ");
        assert_eq!(doc.attribute(node, "style"), Some("color:red;margin:0"));
        add_style(&mut doc, node, "padding:1px");
        assert_eq!(doc.attribute(node, "style"), Some("color:red;padding:1px"));
        assert_eq!(doc.attribute(node, INIT_STYLE_ATTR), Some("color:red"));
    }
}
