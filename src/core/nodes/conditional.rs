use super::{RenderNode, render_nodes};
use crate::core::render::Scope;
use crate::core::render::condition::Expr;
use crate::errors::RenderError;

/// One `{if}`, `{elseif}` or `{else}` arm. `{else}` has no condition.
#[derive(Debug)]
pub struct Branch {
    pub condition: Option<Expr>,
    pub nodes: Vec<Box<dyn RenderNode>>,
}

impl Branch {
    pub fn new(condition: Option<Expr>) -> Self {
        Self {
            condition,
            nodes: Vec::new(),
        }
    }
}

/// A whole `{if} ... {/if}` block.
///
/// Conditions are evaluated in order and only the first matching arm is
/// rendered, so references inside hidden arms are never resolved.
#[derive(Debug)]
pub struct ConditionalNode {
    pub(crate) line: usize,
    pub(crate) branches: Vec<Branch>,
}

impl ConditionalNode {
    pub fn new(line: usize, branches: Vec<Branch>) -> Self {
        Self { line, branches }
    }
}

impl RenderNode for ConditionalNode {
    fn render(&self, scope: &Scope) -> Result<String, RenderError> {
        for branch in &self.branches {
            let taken = match &branch.condition {
                Some(condition) => scope.evaluate(condition)?.is_truthy(),
                None => true,
            };
            if taken {
                return render_nodes(&branch.nodes, scope);
            }
        }
        log::trace!("No branch taken for block opened on line {}", self.line);
        Ok(String::new())
    }

    fn name(&self) -> String {
        "conditional".to_string()
    }
}
