use log::debug;

use crate::errors::MarkupError;
use crate::markup::{Element, Node, parse_markup, write_markup};

/// Elements that are never removed, whatever their content.
const PRESERVED: &[&str] = &["html", "head", "body", "title", "style", "script", "textarea"];

const CELLS: &[&str] = &["td", "th"];

/// Removes elements left empty once conditional content was hidden.
///
/// Runs bottom-up to a fixpoint. A table cell goes only when the cell right
/// after it is missing or empty too, so hiding one column does not shift the
/// rest of the row.
pub fn prune_empty(rendered: &str) -> Result<String, MarkupError> {
    let mut nodes = parse_markup(rendered)?;
    let mut passes = 0;
    loop {
        passes += 1;
        let removed = prune_children(&mut nodes);
        if removed == 0 {
            break;
        }
    }
    debug!("Pruned markup in {} passes", passes);
    Ok(write_markup(&nodes))
}

fn prune_children(nodes: &mut Vec<Node>) -> usize {
    let mut removed = 0;
    for node in nodes.iter_mut() {
        if let Node::Element(element) = node {
            removed += prune_children(&mut element.children);
        }
    }

    let empty: Vec<bool> = nodes.iter().map(is_empty_leaf).collect();
    let mut keep = vec![true; nodes.len()];
    for (index, node) in nodes.iter().enumerate() {
        let Node::Element(element) = node else {
            continue;
        };
        if !empty[index] {
            continue;
        }
        if is_cell(element) {
            let next_cell = nodes[index + 1..]
                .iter()
                .position(|n| matches!(n, Node::Element(e) if is_cell(e)))
                .map(|offset| index + 1 + offset);
            if next_cell.is_some_and(|next| !empty[next]) {
                continue;
            }
        }
        keep[index] = false;
        removed += 1;
    }

    let mut flags = keep.into_iter();
    nodes.retain(|_| flags.next().unwrap_or(true));
    removed
}

fn is_cell(element: &Element) -> bool {
    CELLS.contains(&element.name.as_str())
}

/// An element with no element or void children whose text is blank.
fn is_empty_leaf(node: &Node) -> bool {
    let Node::Element(element) = node else {
        return false;
    };
    if PRESERVED.contains(&element.name.as_str()) {
        return false;
    }
    let has_structure = element
        .children
        .iter()
        .any(|c| matches!(c, Node::Element(_) | Node::Void { .. }));
    !has_structure && is_blank(&node.text_content())
}

/// Whitespace, including non-breaking spaces written as characters or entities.
pub fn is_blank(text: &str) -> bool {
    html_escape::decode_html_entities(text)
        .chars()
        .all(|c| c.is_whitespace() || c == '\u{a0}')
}
