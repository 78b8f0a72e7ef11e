use std::fmt::Debug;

use crate::core::render::Scope;
use crate::errors::RenderError;

pub mod conditional;
pub mod text;
pub mod variable;

pub use conditional::{Branch, ConditionalNode};
pub use text::TextNode;
pub use variable::VariableNode;

/// One piece of a parsed template region.
pub trait RenderNode: Debug {
    fn render(&self, scope: &Scope) -> Result<String, RenderError>;
    fn name(&self) -> String;
}

/// Renders a run of nodes in order, stopping at the first error.
pub fn render_nodes(nodes: &[Box<dyn RenderNode>], scope: &Scope) -> Result<String, RenderError> {
    let mut result = String::new();
    for node in nodes {
        log::trace!("Rendering {} node", node.name());
        result.push_str(&node.render(scope)?);
    }
    Ok(result)
}
