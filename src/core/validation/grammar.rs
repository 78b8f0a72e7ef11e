use std::collections::HashSet;

use log::debug;

use super::tokenizer::{Builtin, Keyword, Logical, Token};
use crate::errors::ValidationError;
use crate::markup::TAG;

/// Tokens that can close an operand.
fn ends_value(token: &Token) -> bool {
    matches!(
        token,
        Token::CloseBracket
            | Token::CloseParen
            | Token::Str { .. }
            | Token::Number(_)
            | Token::Builtin(Builtin::ShowLabelAndRow)
    )
}

/// Tokens that can open a condition or an operand.
fn starts_condition(token: &Token) -> bool {
    matches!(
        token,
        Token::OpenParen
            | Token::Builtin(_)
            | Token::Function(_)
            | Token::Logical(Logical::Not)
            | Token::Str { .. }
            | Token::Number(_)
    )
}

fn is_opener(token: &Token) -> bool {
    matches!(token, Token::Keyword(Keyword::If | Keyword::ElseIf))
}

/// Tokens after which a fresh operand may begin.
fn operand_follows(token: &Token) -> bool {
    is_opener(token)
        || matches!(token, Token::OpenParen | Token::Comparison(_) | Token::Logical(_))
}

fn is_binary(token: &Token) -> bool {
    matches!(
        token,
        Token::Comparison(_) | Token::Logical(Logical::And | Logical::Or)
    )
}

/// What may stand on either side of a token.
struct Adjacency {
    prev: fn(Option<&Token>) -> bool,
    next: fn(Option<&Token>) -> bool,
}

fn adjacency(token: &Token) -> Adjacency {
    match token {
        Token::Keyword(Keyword::If | Keyword::ElseIf) => Adjacency {
            prev: |p| p.is_none(),
            next: |n| n.is_some_and(starts_condition),
        },
        Token::Keyword(Keyword::Else | Keyword::EndIf) => Adjacency {
            prev: |p| p.is_none(),
            next: |n| n.is_none(),
        },
        Token::Builtin(Builtin::Redcap) => Adjacency {
            prev: |p| {
                p.is_none_or(|p| {
                    is_opener(p)
                        || is_binary(p)
                        || matches!(p, Token::OpenParen | Token::Comma | Token::Logical(_))
                })
            },
            next: |n| matches!(n, Some(Token::OpenBracket { .. })),
        },
        Token::Builtin(Builtin::ShowLabelAndRow) => Adjacency {
            prev: |p| p.is_none_or(operand_follows),
            next: |n| n.is_none_or(|n| is_binary(n) || matches!(n, Token::CloseParen)),
        },
        Token::Function(_) => Adjacency {
            prev: |p| p.is_some_and(operand_follows),
            next: |n| matches!(n, Some(Token::OpenParen)),
        },
        Token::Comparison(_) | Token::Logical(Logical::And | Logical::Or) => Adjacency {
            prev: |p| p.is_some_and(ends_value),
            next: |n| n.is_some_and(starts_condition),
        },
        Token::Logical(Logical::Not) => Adjacency {
            prev: |p| p.is_some_and(operand_follows),
            next: |n| {
                matches!(
                    n,
                    Some(
                        Token::OpenParen
                            | Token::Builtin(_)
                            | Token::Function(_)
                            | Token::Logical(Logical::Not)
                    )
                )
            },
        },
        Token::OpenParen => Adjacency {
            prev: |p| p.is_some_and(|p| operand_follows(p) || matches!(p, Token::Function(_))),
            next: |n| n.is_some_and(starts_condition),
        },
        Token::CloseParen => Adjacency {
            prev: |p| p.is_some_and(ends_value),
            next: |n| n.is_none_or(|n| is_binary(n) || matches!(n, Token::CloseParen)),
        },
        Token::OpenBracket { .. } => Adjacency {
            prev: |p| matches!(p, Some(Token::Builtin(Builtin::Redcap) | Token::CloseBracket)),
            next: |n| n.is_some_and(Token::is_str),
        },
        Token::CloseBracket => Adjacency {
            prev: |p| p.is_some_and(Token::is_str),
            next: |n| {
                n.is_none_or(|n| {
                    is_binary(n) || matches!(n, Token::OpenBracket { .. } | Token::CloseParen)
                })
            },
        },
        Token::Comma => Adjacency {
            prev: |p| matches!(p, Some(Token::Str { .. } | Token::Number(_))),
            next: |n| matches!(n, Some(Token::Builtin(Builtin::Redcap))),
        },
        Token::Str { .. } => Adjacency {
            prev: |p| {
                p.is_some_and(|p| operand_follows(p) || matches!(p, Token::OpenBracket { .. }))
            },
            next: |n| {
                n.is_none_or(|n| {
                    is_binary(n)
                        || matches!(n, Token::CloseBracket | Token::Comma | Token::CloseParen)
                })
            },
        },
        Token::Number(_) => Adjacency {
            prev: |p| p.is_some_and(operand_follows),
            next: |n| {
                n.is_none_or(|n| is_binary(n) || matches!(n, Token::CloseParen | Token::Comma))
            },
        },
        Token::Word(_) => Adjacency {
            prev: |_| true,
            next: |_| true,
        },
    }
}

/// Checks every token against what may precede and follow it.
///
/// All violations are collected; a pair of tokens that is illegal from both
/// sides is reported once.
pub fn validate_grammar(tokens: &[Token], line: usize) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut flagged_pairs = HashSet::new();

    match tokens.first() {
        None => {
            errors.push(ValidationError::syntax(line, "Empty expression"));
            return errors;
        }
        Some(Token::Keyword(_) | Token::Builtin(_)) => (),
        Some(first) => errors.push(ValidationError::syntax(
            line,
            format!(
                "Expression cannot start with '{}'; expected if, elseif, else, /if or a variable",
                first
            ),
        )),
    }

    for (i, token) in tokens.iter().enumerate() {
        if let Token::Word(word) = token {
            errors.push(ValidationError::syntax(line, format!("Unknown word '{}'", word)));
            continue;
        }

        if let Token::OpenBracket { spaced: true } = token {
            errors.push(ValidationError::syntax(
                line,
                "Unexpected space before '['; a reference must directly follow '$redcap' or ']'",
            ));
        }

        let rule = adjacency(token);
        let prev = i.checked_sub(1).and_then(|p| tokens.get(p));
        let next = tokens.get(i + 1);

        if i > 0 && !(rule.prev)(prev) && flagged_pairs.insert(i - 1) {
            if let Some(prev) = prev {
                errors.push(pair_error(line, prev, token));
            }
        }
        if !(rule.next)(next) {
            match next {
                Some(next) => {
                    if flagged_pairs.insert(i) {
                        errors.push(pair_error(line, token, next));
                    }
                }
                None => errors.push(ValidationError::syntax(
                    line,
                    format!("Expression cannot end with '{}'", token),
                )),
            }
        }
    }

    errors.extend(check_balance(tokens, line));

    if !errors.is_empty() {
        debug!("Line {}: {} grammar errors", line, errors.len());
    }
    errors
}

fn pair_error(line: usize, left: &Token, right: &Token) -> ValidationError {
    ValidationError::syntax(line, format!("'{}' cannot follow '{}'", right, left))
}

fn check_balance(tokens: &[Token], line: usize) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let count = |wanted: fn(&Token) -> bool| tokens.iter().filter(|t| wanted(t)).count();

    let (open, close) = (
        count(|t| matches!(t, Token::OpenParen)),
        count(|t| matches!(t, Token::CloseParen)),
    );
    if open != close {
        errors.push(ValidationError::syntax(
            line,
            format!("Unbalanced parentheses: {} '(' and {} ')'", open, close),
        ));
    }

    let (open, close) = (
        count(|t| matches!(t, Token::OpenBracket { .. })),
        count(|t| matches!(t, Token::CloseBracket)),
    );
    if open != close {
        errors.push(ValidationError::syntax(
            line,
            format!("Unbalanced brackets: {} '[' and {} ']'", open, close),
        ));
    }
    errors
}

/// Checks on the raw expression text that do not depend on tokenization.
pub fn validate_expression_text(expression: &str, line: usize) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if count_single_quotes(expression) % 2 != 0 {
        errors.push(ValidationError::syntax(
            line,
            "Unbalanced quotes: every ' must be closed",
        ));
    }
    if TAG.is_match(expression) {
        errors.push(ValidationError::syntax(
            line,
            "Expression contains markup; remove formatting from inside { }",
        ));
    }
    if expression.contains(['{', '}']) {
        errors.push(ValidationError::syntax(
            line,
            "Expression contains a nested '{' or '}'",
        ));
    }
    errors
}

/// Counts every `'` in the text. Escapes and double quotes do not hide one.
fn count_single_quotes(expression: &str) -> usize {
    expression.matches('\'').count()
}
