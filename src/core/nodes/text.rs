use super::RenderNode;
use crate::core::render::Scope;
use crate::errors::RenderError;

/// Literal template text, including `{...}` runs that are not expressions.
#[derive(Debug, Clone)]
pub struct TextNode {
    pub(crate) content: String,
}

impl TextNode {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into() }
    }
}

impl RenderNode for TextNode {
    fn render(&self, _scope: &Scope) -> Result<String, RenderError> {
        Ok(self.content.clone())
    }

    fn name(&self) -> String {
        "text".to_string()
    }
}
