pub mod data;
pub mod functions;
pub mod nodes;
pub mod prune;
pub mod render;
pub mod validation;
