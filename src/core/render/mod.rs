use std::sync::Arc;

use log::{debug, trace};

pub mod condition;
pub mod value;

pub use condition::{Expr, Scope, parse_condition};
pub use value::Value;

use crate::core::functions::{FunctionRegistry, TemplateFunction, load_functions};
use crate::core::nodes::{
    Branch, ConditionalNode, RenderNode, TextNode, VariableNode, render_nodes,
};
use crate::core::validation::tokenizer::{Keyword, Token, tokenize};
use crate::errors::RenderError;
use crate::types::RenderContext;

/// Turns one template region plus a render context into markup.
///
/// `fill_template` only talks to this trait, so any substitution engine can
/// stand in for [`BasicRenderer`].
pub trait RenderEngine {
    fn render(&self, region: &str, context: &RenderContext) -> Result<String, RenderError>;
}

/// Built-in engine: `$redcap[...]` substitution plus `{if}` blocks.
pub struct BasicRenderer {
    functions: FunctionRegistry,
}

impl BasicRenderer {
    pub fn new() -> Self {
        Self {
            functions: load_functions(),
        }
    }

    /// Registers a function implementation, replacing one with the same name.
    pub fn register_function(&mut self, function: Arc<dyn TemplateFunction>) -> &mut Self {
        let (name, _) = function.signature();
        debug!("Registering function: {}", name);
        self.functions.insert(name, function);
        self
    }
}

impl Default for BasicRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderEngine for BasicRenderer {
    fn render(&self, region: &str, context: &RenderContext) -> Result<String, RenderError> {
        let nodes = parse_region(region)?;
        trace!("Parsed region into {} top-level nodes", nodes.len());
        let scope = Scope {
            context,
            functions: &self.functions,
        };
        render_nodes(&nodes, &scope)
    }
}

/// What a single `{...}` run turned out to be.
enum Piece {
    If(Expr),
    ElseIf(Expr),
    Else,
    EndIf,
    Variable(Expr),
    Literal,
}

fn classify(body: &str, line: usize) -> Result<Piece, RenderError> {
    let decoded = html_escape::decode_html_entities(body);
    let tokens = tokenize(decoded.trim());
    let piece = match tokens.first() {
        Some(Token::Keyword(Keyword::If)) => Piece::If(parse_condition(&tokens[1..], line)?),
        Some(Token::Keyword(Keyword::ElseIf)) => {
            Piece::ElseIf(parse_condition(&tokens[1..], line)?)
        }
        Some(Token::Keyword(Keyword::Else)) if tokens.len() == 1 => Piece::Else,
        Some(Token::Keyword(Keyword::Else)) => {
            return Err(RenderError::Condition {
                line,
                message: "'else' takes no condition".to_string(),
            });
        }
        Some(Token::Keyword(Keyword::EndIf)) => Piece::EndIf,
        Some(Token::Builtin(_)) => Piece::Variable(parse_condition(&tokens, line)?),
        _ => Piece::Literal,
    };
    Ok(piece)
}

struct OpenBlock {
    line: usize,
    branches: Vec<Branch>,
    current: Branch,
}

#[derive(Default)]
struct RegionBuilder {
    root: Vec<Box<dyn RenderNode>>,
    open: Vec<OpenBlock>,
}

impl RegionBuilder {
    fn push(&mut self, node: Box<dyn RenderNode>) {
        match self.open.last_mut() {
            Some(block) => block.current.nodes.push(node),
            None => self.root.push(node),
        }
    }

    fn text(&mut self, text: &str) {
        if !text.is_empty() {
            self.push(Box::new(TextNode::new(text)));
        }
    }

    fn apply(&mut self, piece: Piece, line: usize) -> Result<(), RenderError> {
        match piece {
            Piece::If(condition) => self.open.push(OpenBlock {
                line,
                branches: Vec::new(),
                current: Branch::new(Some(condition)),
            }),
            Piece::ElseIf(condition) => self.branch(Some(condition), line, "{elseif}")?,
            Piece::Else => self.branch(None, line, "{else}")?,
            Piece::EndIf => {
                let Some(mut block) = self.open.pop() else {
                    return Err(RenderError::UnexpectedMarker {
                        line,
                        marker: "{/if}".to_string(),
                    });
                };
                block.branches.push(block.current);
                self.push(Box::new(ConditionalNode::new(block.line, block.branches)));
            }
            Piece::Variable(expr) => self.push(Box::new(VariableNode::new(expr))),
            Piece::Literal => {}
        }
        Ok(())
    }

    fn branch(
        &mut self,
        condition: Option<Expr>,
        line: usize,
        marker: &str,
    ) -> Result<(), RenderError> {
        let Some(block) = self.open.last_mut() else {
            return Err(RenderError::UnexpectedMarker {
                line,
                marker: marker.to_string(),
            });
        };
        let finished = std::mem::replace(&mut block.current, Branch::new(condition));
        block.branches.push(finished);
        Ok(())
    }

    fn finish(self) -> Result<Vec<Box<dyn RenderNode>>, RenderError> {
        match self.open.last() {
            Some(block) => Err(RenderError::UnclosedBlock { line: block.line }),
            None => Ok(self.root),
        }
    }
}

/// Splits a region into text, variable and conditional nodes.
///
/// An expression never spans lines. `{...}` runs that are not expressions
/// (CSS rules, stray braces) stay literal text.
pub fn parse_region(text: &str) -> Result<Vec<Box<dyn RenderNode>>, RenderError> {
    let mut builder = RegionBuilder::default();
    let mut text_start = 0;
    let mut cursor = 0;
    let mut line = 1;
    let mut counted = 0;

    while let Some(offset) = text[cursor..].find('{') {
        let open = cursor + offset;
        let body_start = open + 1;
        let Some(len) = text[body_start..].find(['{', '}', '\n']) else {
            break;
        };
        let end = body_start + len;
        if !text[end..].starts_with('}') {
            cursor = body_start;
            continue;
        }

        line += text[counted..open].matches('\n').count();
        counted = open;

        match classify(&text[body_start..end], line)? {
            Piece::Literal => {}
            piece => {
                builder.text(&text[text_start..open]);
                builder.apply(piece, line)?;
                text_start = end + 1;
            }
        }
        cursor = end + 1;
    }

    builder.text(&text[text_start..]);
    builder.finish()
}
