use std::borrow::Cow;

use log::trace;
use once_cell::sync::Lazy;
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use regex::Regex;

use crate::errors::MarkupError;

#[derive(Parser)]
#[grammar = "markup.pest"]
struct MarkupParser;

/// Anything from `<` to the next `>`.
pub static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

/// Drops every tag and keeps the text between them.
pub fn strip_tags(text: &str) -> Cow<'_, str> {
    TAG.replace_all(text, "")
}

/// A parsed markup node. Raw source text is kept so untouched nodes are
/// written back byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// `<br>`, `<img ...>`, `<x />` and friends, plus unbalanced tags
    Void { name: String, raw: String },
    Text(String),
    /// Comments and declarations
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercased tag name
    pub name: String,
    pub open: String,
    pub close: String,
    pub children: Vec<Node>,
}

impl Node {
    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Element(element) => element.children.iter().for_each(|c| c.collect_text(out)),
            Node::Text(text) => out.push_str(text),
            Node::Void { .. } | Node::Comment(_) => (),
        }
    }

    pub fn write_to(&self, out: &mut String) {
        match self {
            Node::Element(element) => {
                out.push_str(&element.open);
                element.children.iter().for_each(|c| c.write_to(out));
                out.push_str(&element.close);
            }
            Node::Void { raw, .. } | Node::Text(raw) | Node::Comment(raw) => out.push_str(raw),
        }
    }
}

/// Parses a markup fragment or document into nodes.
pub fn parse_markup(raw: &str) -> Result<Vec<Node>, MarkupError> {
    let mut pairs = MarkupParser::parse(Rule::document, raw)
        .map_err(|e| MarkupError::Parse(Box::new(e)))?;
    let document = pairs.next().ok_or(MarkupError::InvalidRule(Rule::document))?;
    let nodes = document
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(build_node)
        .collect::<Result<Vec<_>, _>>()?;
    trace!("Parsed markup into {} top-level nodes", nodes.len());
    Ok(nodes)
}

pub fn write_markup(nodes: &[Node]) -> String {
    let mut out = String::new();
    nodes.iter().for_each(|n| n.write_to(&mut out));
    out
}

fn build_node(pair: Pair<Rule>) -> Result<Node, MarkupError> {
    match pair.as_rule() {
        Rule::text | Rule::stray_lt => Ok(Node::Text(pair.as_str().to_string())),
        Rule::comment | Rule::declaration => Ok(Node::Comment(pair.as_str().to_string())),
        Rule::void_element | Rule::stray_tag => {
            let raw = pair.as_str().to_string();
            let name = raw
                .trim_start_matches(['<', '/'])
                .split(|c: char| c.is_whitespace() || c == '/' || c == '>')
                .next()
                .unwrap_or_default()
                .to_ascii_lowercase();
            Ok(Node::Void { name, raw })
        }
        Rule::element => {
            let mut inner = pair.into_inner();
            let open = inner
                .next()
                .filter(|p| p.as_rule() == Rule::open_tag)
                .ok_or(MarkupError::InvalidRule(Rule::element))?;
            let name = open
                .clone()
                .into_inner()
                .find(|p| p.as_rule() == Rule::tag_name)
                .map(|p| p.as_str().to_ascii_lowercase())
                .ok_or(MarkupError::InvalidRule(Rule::open_tag))?;

            let mut children = Vec::new();
            let mut close = String::new();
            for child in inner {
                if child.as_rule() == Rule::close_tag {
                    close = child.as_str().to_string();
                } else {
                    children.push(build_node(child)?);
                }
            }

            Ok(Node::Element(Element {
                name,
                open: open.as_str().to_string(),
                close,
                children,
            }))
        }
        rule => Err(MarkupError::InvalidRule(rule)),
    }
}
