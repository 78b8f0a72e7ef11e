use std::collections::BTreeMap;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ValidationError;

static MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\s*(elseif|else|/if|endif|if)\b").expect("valid marker pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    If,
    ElseIf,
    Else,
    EndIf,
}

/// 1-based line and column of a marker's opening brace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMarker {
    pub kind: MarkerKind,
    pub position: Position,
}

/// Every block marker of a document, in document order.
pub fn find_markers<S: AsRef<str>>(lines: &[S]) -> Vec<BlockMarker> {
    let mut markers = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        for captures in MARKER.captures_iter(line) {
            let (Some(whole), Some(word)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let kind = match word.as_str() {
                "if" => MarkerKind::If,
                "elseif" => MarkerKind::ElseIf,
                "else" => MarkerKind::Else,
                _ => MarkerKind::EndIf,
            };
            markers.push(BlockMarker {
                kind,
                position: Position {
                    line: index + 1,
                    column: line[..whole.start()].chars().count() + 1,
                },
            });
        }
    }
    markers
}

/// An `if` and its matching close. An unclosed `if` extends to the end of
/// the document so its branches are not reported twice.
#[derive(Debug)]
struct Span {
    open: Position,
    close: Option<Position>,
}

impl Span {
    fn contains(&self, position: Position) -> bool {
        self.open < position && self.close.is_none_or(|close| position < close)
    }
}

/// Matches if/elseif/else/endif markers across the whole document.
pub fn validate_blocks<S: AsRef<str>>(lines: &[S]) -> Vec<ValidationError> {
    let markers = find_markers(lines);
    let mut errors = Vec::new();
    let mut spans: Vec<Span> = Vec::new();
    let mut open: Vec<usize> = Vec::new();

    for marker in &markers {
        match marker.kind {
            MarkerKind::If => {
                open.push(spans.len());
                spans.push(Span {
                    open: marker.position,
                    close: None,
                });
            }
            MarkerKind::EndIf => match open.pop() {
                Some(index) => spans[index].close = Some(marker.position),
                None => errors.push(ValidationError::structural(
                    marker.position.line,
                    "Extra {/if} without a matching {if}",
                )),
            },
            MarkerKind::Else | MarkerKind::ElseIf => (),
        }
    }

    for index in open {
        errors.push(ValidationError::structural(
            spans[index].open.line,
            "Missing {/if} for this {if}",
        ));
    }

    // branch markers grouped under their innermost enclosing span
    let mut branches: BTreeMap<usize, Vec<&BlockMarker>> = BTreeMap::new();
    for marker in markers
        .iter()
        .filter(|m| matches!(m.kind, MarkerKind::Else | MarkerKind::ElseIf))
    {
        let innermost = spans
            .iter()
            .enumerate()
            .filter(|(_, span)| span.contains(marker.position))
            .max_by_key(|(_, span)| span.open)
            .map(|(index, _)| index);

        match innermost {
            Some(index) => branches.entry(index).or_default().push(marker),
            None => errors.push(ValidationError::structural(
                marker.position.line,
                match marker.kind {
                    MarkerKind::Else => "{else} outside of any {if} block",
                    _ => "{elseif} outside of any {if} block",
                },
            )),
        }
    }

    for (index, members) in branches {
        let opened_on = spans[index].open.line;
        let mut seen_else = false;
        for marker in members {
            match marker.kind {
                MarkerKind::Else if seen_else => errors.push(ValidationError::structural(
                    marker.position.line,
                    format!(
                        "More than one {{else}} in the {{if}} block opened on line {}",
                        opened_on
                    ),
                )),
                MarkerKind::Else => seen_else = true,
                MarkerKind::ElseIf if seen_else => errors.push(ValidationError::structural(
                    marker.position.line,
                    format!(
                        "{{elseif}} after {{else}} in the {{if}} block opened on line {}",
                        opened_on
                    ),
                )),
                _ => (),
            }
        }
    }

    errors.sort_by_key(|e| e.line);
    debug!("Block validation found {} markers, {} errors", markers.len(), errors.len());
    errors
}
