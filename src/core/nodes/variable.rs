use super::RenderNode;
use crate::core::render::Scope;
use crate::core::render::condition::Expr;
use crate::errors::RenderError;

/// `{$redcap['field']}`, `{$redcap['event']['field']['allValues']}` or
/// `{$showLabelAndRow}`.
#[derive(Debug, Clone)]
pub struct VariableNode {
    expr: Expr,
}

impl VariableNode {
    pub fn new(expr: Expr) -> Self {
        Self { expr }
    }
}

impl RenderNode for VariableNode {
    fn render(&self, scope: &Scope) -> Result<String, RenderError> {
        Ok(scope.evaluate(&self.expr)?.to_string())
    }

    fn name(&self) -> String {
        "variable".to_string()
    }
}
