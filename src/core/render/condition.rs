use log::{debug, error};

use super::Value;
use crate::core::functions::FunctionRegistry;
use crate::core::validation::tokenizer::{Builtin, Comparison, Logical, Token};
use crate::errors::RenderError;
use crate::types::RenderContext;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// `$redcap['a']['b']...`
    Reference(Vec<String>),
    ShowLabelAndRow,
    Call { name: String, args: Vec<Expr> },
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(Comparison, Box<Expr>, Box<Expr>),
}

/// Recursive descent over the tokens of one expression.
/// `or` < `and` < `not` < comparison in binding strength.
struct ConditionParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    line: usize,
}

pub fn parse_condition(tokens: &[Token], line: usize) -> Result<Expr, RenderError> {
    let mut parser = ConditionParser { tokens, pos: 0, line };
    let expr = parser.or_expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(parser.error(format!("unexpected '{}'", token))),
    }
}

impl<'a> ConditionParser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn error(&self, message: String) -> RenderError {
        RenderError::Condition {
            line: self.line,
            message,
        }
    }

    fn expect(&mut self, wanted: &Token) -> Result<(), RenderError> {
        match self.advance() {
            Some(token) if token == wanted => Ok(()),
            Some(token) => Err(self.error(format!("expected '{}', found '{}'", wanted, token))),
            None => Err(self.error(format!("expected '{}'", wanted))),
        }
    }

    fn or_expr(&mut self) -> Result<Expr, RenderError> {
        let mut left = self.and_expr()?;
        while let Some(Token::Logical(Logical::Or)) = self.peek() {
            self.pos += 1;
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, RenderError> {
        let mut left = self.unary()?;
        while let Some(Token::Logical(Logical::And)) = self.peek() {
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, RenderError> {
        if let Some(Token::Logical(Logical::Not)) = self.peek() {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, RenderError> {
        let left = self.operand()?;
        if let Some(Token::Comparison(op)) = self.peek() {
            self.pos += 1;
            let right = self.operand()?;
            return Ok(Expr::Compare(*op, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn operand(&mut self) -> Result<Expr, RenderError> {
        match self.advance() {
            Some(Token::OpenParen) => {
                let inner = self.or_expr()?;
                self.expect(&Token::CloseParen)?;
                Ok(inner)
            }
            Some(Token::Str { content, .. }) => Ok(Expr::Literal(Value::Text(content.clone()))),
            Some(Token::Number(n)) => n
                .parse()
                .map(|n| Expr::Literal(Value::Number(n)))
                .map_err(|_| self.error(format!("invalid number '{}'", n))),
            Some(Token::Builtin(Builtin::ShowLabelAndRow)) => Ok(Expr::ShowLabelAndRow),
            Some(Token::Builtin(Builtin::Redcap)) => self.reference(),
            Some(Token::Function(name)) => {
                self.expect(&Token::OpenParen)?;
                let mut args = vec![self.or_expr()?];
                while let Some(Token::Comma) = self.peek() {
                    self.pos += 1;
                    args.push(self.or_expr()?);
                }
                self.expect(&Token::CloseParen)?;
                Ok(Expr::Call {
                    name: name.clone(),
                    args,
                })
            }
            Some(token) => Err(self.error(format!("unexpected '{}'", token))),
            None => Err(self.error("expression ends too early".to_string())),
        }
    }

    fn reference(&mut self) -> Result<Expr, RenderError> {
        let mut path = Vec::new();
        while let Some(Token::OpenBracket { .. }) = self.peek() {
            self.pos += 1;
            match self.advance() {
                Some(Token::Str { content, .. }) => path.push(content.trim().to_string()),
                Some(token) => {
                    return Err(self.error(format!("expected a quoted name, found '{}'", token)));
                }
                None => return Err(self.error("unterminated reference".to_string())),
            }
            self.expect(&Token::CloseBracket)?;
        }
        if path.is_empty() {
            return Err(self.error("'$redcap' needs a ['field'] reference".to_string()));
        }
        Ok(Expr::Reference(path))
    }
}

/// What an expression can see while it is evaluated.
pub struct Scope<'a> {
    pub context: &'a RenderContext,
    pub functions: &'a FunctionRegistry,
}

impl Scope<'_> {
    pub fn evaluate(&self, expr: &Expr) -> Result<Value, RenderError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Reference(path) => self
                .context
                .lookup(path)
                .map(Value::from)
                .ok_or_else(|| {
                    RenderError::UndefinedReference(format!("$redcap['{}']", path.join("']['")))
                }),
            Expr::ShowLabelAndRow => Ok(Value::Boolean(self.context.show_label_and_row)),
            Expr::Call { name, args } => {
                let Some(function) = self.functions.get(name) else {
                    error!("Attempted to call undefined function '{}'", name);
                    return Err(RenderError::UndefinedFunction(name.clone()));
                };
                let args = args
                    .iter()
                    .map(|a| self.evaluate(a))
                    .collect::<Result<Vec<_>, _>>()?;
                if let Err(validation_err) = function.validate_args(&args) {
                    error!(
                        "Argument validation failed for function '{}': {}",
                        name, validation_err
                    );
                    return Err(RenderError::FunctionArgs(validation_err));
                }
                debug!("Calling function '{}'", name);
                function.call(args)
            }
            Expr::Not(inner) => Ok(Value::Boolean(!self.evaluate(inner)?.is_truthy())),
            Expr::And(left, right) => Ok(Value::Boolean(
                self.evaluate(left)?.is_truthy() && self.evaluate(right)?.is_truthy(),
            )),
            Expr::Or(left, right) => Ok(Value::Boolean(
                self.evaluate(left)?.is_truthy() || self.evaluate(right)?.is_truthy(),
            )),
            Expr::Compare(op, left, right) => {
                let (left, right) = (self.evaluate(left)?, self.evaluate(right)?);
                Ok(Value::Boolean(left.compare(*op, &right)))
            }
        }
    }
}
