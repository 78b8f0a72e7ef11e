use std::fmt;

use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid number pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    ElseIf,
    Else,
    EndIf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Redcap,
    ShowLabelAndRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logical {
    And,
    Or,
    Not,
}

/// One lexical unit of an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Keyword(Keyword),
    Builtin(Builtin),
    /// `in_array`
    Function(String),
    Comparison(Comparison),
    Logical(Logical),
    OpenParen,
    CloseParen,
    /// `[`, remembering whether whitespace preceded it
    OpenBracket { spaced: bool },
    CloseBracket,
    Comma,
    /// A quoted run. Grammar checks only ever look at the kind, never the content.
    Str { quote: char, content: String },
    Number(String),
    Word(String),
}

impl Token {
    fn from_word(word: &str) -> Token {
        match word {
            "if" => Token::Keyword(Keyword::If),
            "elseif" => Token::Keyword(Keyword::ElseIf),
            "else" => Token::Keyword(Keyword::Else),
            "endif" | "/if" => Token::Keyword(Keyword::EndIf),
            "$redcap" => Token::Builtin(Builtin::Redcap),
            "$showLabelAndRow" => Token::Builtin(Builtin::ShowLabelAndRow),
            "in_array" => Token::Function(word.to_string()),
            "eq" => Token::Comparison(Comparison::Eq),
            "ne" | "neq" => Token::Comparison(Comparison::Ne),
            "gt" => Token::Comparison(Comparison::Gt),
            "lt" => Token::Comparison(Comparison::Lt),
            "ge" | "gte" => Token::Comparison(Comparison::Ge),
            "le" | "lte" => Token::Comparison(Comparison::Le),
            "and" => Token::Logical(Logical::And),
            "or" => Token::Logical(Logical::Or),
            "not" => Token::Logical(Logical::Not),
            _ if NUMBER.is_match(word) => Token::Number(word.to_string()),
            _ => Token::Word(word.to_string()),
        }
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Token::Str { .. })
    }

    pub fn str_content(&self) -> Option<&str> {
        match self {
            Token::Str { content, .. } => Some(content),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(Keyword::If) => write!(f, "if"),
            Token::Keyword(Keyword::ElseIf) => write!(f, "elseif"),
            Token::Keyword(Keyword::Else) => write!(f, "else"),
            Token::Keyword(Keyword::EndIf) => write!(f, "/if"),
            Token::Builtin(Builtin::Redcap) => write!(f, "$redcap"),
            Token::Builtin(Builtin::ShowLabelAndRow) => write!(f, "$showLabelAndRow"),
            Token::Function(name) => write!(f, "{}", name),
            Token::Comparison(op) => write!(f, "{}", match op {
                Comparison::Eq => "eq",
                Comparison::Ne => "ne",
                Comparison::Gt => "gt",
                Comparison::Lt => "lt",
                Comparison::Ge => "ge",
                Comparison::Le => "le",
            }),
            Token::Logical(Logical::And) => write!(f, "and"),
            Token::Logical(Logical::Or) => write!(f, "or"),
            Token::Logical(Logical::Not) => write!(f, "not"),
            Token::OpenParen => write!(f, "("),
            Token::CloseParen => write!(f, ")"),
            Token::OpenBracket { .. } => write!(f, "["),
            Token::CloseBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Str { quote, content } => write!(f, "{}{}{}", quote, content, quote),
            Token::Number(n) => write!(f, "{}", n),
            Token::Word(w) => write!(f, "{}", w),
        }
    }
}

/// Splits one trimmed expression body into tokens.
///
/// Never fails: text that is not part of the language comes back as
/// [`Token::Word`] for later stages to reject. An unterminated quote runs to
/// the end of the expression.
pub fn tokenize(expression: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut spaced = false;
    let mut chars = expression.chars().peekable();

    fn flush(word: &mut String, tokens: &mut Vec<Token>) {
        if !word.is_empty() {
            tokens.push(Token::from_word(word));
            word.clear();
        }
    }

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                flush(&mut word, &mut tokens);
                let mut content = String::new();
                while let Some(next) = chars.next() {
                    if next == '\\' && chars.peek() == Some(&c) {
                        content.push(c);
                        chars.next();
                    } else if next == c {
                        break;
                    } else {
                        content.push(next);
                    }
                }
                tokens.push(Token::Str { quote: c, content });
                spaced = false;
            }
            c if c.is_whitespace() => {
                flush(&mut word, &mut tokens);
                spaced = true;
            }
            '(' | ')' | '[' | ']' | ',' => {
                flush(&mut word, &mut tokens);
                tokens.push(match c {
                    '(' => Token::OpenParen,
                    ')' => Token::CloseParen,
                    '[' => Token::OpenBracket { spaced },
                    ']' => Token::CloseBracket,
                    _ => Token::Comma,
                });
                spaced = false;
            }
            _ => {
                word.push(c);
                spaced = false;
            }
        }
    }
    flush(&mut word, &mut tokens);

    trace!("Tokenized {:?} into {} tokens", expression, tokens.len());
    tokens
}
