//! Recursive-descent parser producing the expression tree.
//!
//! Precedence, loosest first: `||`, `&&`, comparisons and regex matches
//! (non-associative), unary `!`/`-`, primaries.

use super::ast::{CmpOp, Expr, LogicOp, MsgField, RegexOperand, Var};
use super::functions::FunctionRegistry;
use super::lexer::{Token, TokenKind};
use super::value::Literal;
use super::CompileError;
use regex::Regex;

/// Limit on parentheses, unary operators and calls nested inside each other.
const MAX_DEPTH: usize = 64;

/// Limit on `&&`/`||` operators in one expression. Chains parse left-deep,
/// so evaluation recurses once per operator.
const MAX_LOGIC_OPS: usize = 256;

pub(crate) struct Parser<'r> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    logic_ops: usize,
    /// Character length of the source, used to locate end-of-input errors.
    end: usize,
    registry: &'r FunctionRegistry,
}

impl<'r> Parser<'r> {
    pub(crate) fn new(tokens: Vec<Token>, end: usize, registry: &'r FunctionRegistry) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            logic_ops: 0,
            end,
            registry,
        }
    }

    /// Parse the whole token stream as one expression.
    pub(crate) fn parse(mut self) -> Result<Expr, CompileError> {
        if self.tokens.is_empty() {
            return Err(CompileError::new(0, "empty expression"));
        }
        let expr = self.or()?;
        match self.peek() {
            None => Ok(expr),
            Some(tok) => Err(CompileError::new(
                tok.pos,
                format!("unexpected {} after expression", tok.kind.describe()),
            )),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), CompileError> {
        match self.next() {
            Some(tok) if tok.kind == kind => Ok(()),
            Some(tok) => Err(CompileError::new(
                tok.pos,
                format!("expected {}, found {}", kind.describe(), tok.kind.describe()),
            )),
            None => Err(CompileError::new(
                self.end,
                format!("expected {}, found end of expression", kind.describe()),
            )),
        }
    }

    fn enter(&mut self, pos: usize) -> Result<(), CompileError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CompileError::new(pos, "expression nested too deeply"));
        }
        Ok(())
    }

    /// Consume a `&&`/`||` token, counting it against the operator limit.
    fn eat_logic(&mut self, kind: &TokenKind) -> Result<bool, CompileError> {
        let Some(pos) = self.peek().filter(|t| &t.kind == kind).map(|t| t.pos) else {
            return Ok(false);
        };
        self.pos += 1;
        self.logic_ops += 1;
        if self.logic_ops > MAX_LOGIC_OPS {
            return Err(CompileError::new(
                pos,
                format!("too many `&&`/`||` operators (at most {MAX_LOGIC_OPS})"),
            ));
        }
        Ok(true)
    }

    fn or(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.and()?;
        while self.eat_logic(&TokenKind::Or)? {
            let rhs = self.and()?;
            lhs = Expr::Logic {
                op: LogicOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.comparison()?;
        while self.eat_logic(&TokenKind::And)? {
            let rhs = self.comparison()?;
            lhs = Expr::Logic {
                op: LogicOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Expr, CompileError> {
        let lhs = self.unary()?;
        let Some(tok) = self.peek() else {
            return Ok(lhs);
        };

        let op = match tok.kind {
            TokenKind::Eq => CmpOp::Eq,
            TokenKind::Ne => CmpOp::Ne,
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::Le => CmpOp::Le,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::Ge => CmpOp::Ge,
            TokenKind::Match | TokenKind::NotMatch => {
                let negated = tok.kind == TokenKind::NotMatch;
                self.pos += 1;
                return self.regex_match(lhs, negated);
            }
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.unary()?;
        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn regex_match(&mut self, lhs: Expr, negated: bool) -> Result<Expr, CompileError> {
        let at = self.peek().map(|t| t.pos).unwrap_or(self.end);
        let rhs = self.unary()?;
        let pattern = match rhs {
            Expr::Literal(Literal::Str(source)) => {
                let regex = Regex::new(&source)
                    .map_err(|e| CompileError::new(at, format!("invalid regex: {e}")))?;
                RegexOperand::Static(regex)
            }
            Expr::Literal(other) => {
                return Err(CompileError::new(
                    at,
                    format!("regex pattern must be a string, got {:?}", other),
                ))
            }
            dynamic => RegexOperand::Dynamic(Box::new(dynamic)),
        };
        Ok(Expr::Regex {
            negated,
            lhs: Box::new(lhs),
            pattern,
        })
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        let Some(tok) = self.peek().cloned() else {
            return Err(CompileError::new(self.end, "unexpected end of expression"));
        };
        match tok.kind {
            TokenKind::Not => {
                self.pos += 1;
                self.enter(tok.pos)?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(Expr::Not(Box::new(inner)))
            }
            TokenKind::Minus => {
                self.pos += 1;
                self.enter(tok.pos)?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(Expr::Neg(Box::new(inner)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        let Some(tok) = self.next() else {
            return Err(CompileError::new(self.end, "unexpected end of expression"));
        };
        match tok.kind {
            TokenKind::True => Ok(Expr::Literal(Literal::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(Literal::Bool(false))),
            TokenKind::Number(n) => Ok(Expr::Literal(Literal::Number(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(Literal::Str(s))),
            TokenKind::LParen => {
                self.enter(tok.pos)?;
                let inner = self.or()?;
                self.expect(TokenKind::RParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                if self.eat(&TokenKind::LParen) {
                    self.call(name, tok.pos)
                } else if self.eat(&TokenKind::Dot) {
                    self.field(name, tok.pos)
                } else {
                    Var::lookup(&name).map(Expr::Var).ok_or_else(|| {
                        CompileError::new(tok.pos, format!("unknown variable `{name}`"))
                    })
                }
            }
            other => Err(CompileError::new(
                tok.pos,
                format!("unexpected {}", other.describe()),
            )),
        }
    }

    /// Parse a call after its opening parenthesis.
    fn call(&mut self, name: String, pos: usize) -> Result<Expr, CompileError> {
        let func = *self
            .registry
            .get(&name)
            .ok_or_else(|| CompileError::new(pos, format!("unknown function `{name}`")))?;

        self.enter(pos)?;
        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                args.push(self.or()?);
                if self.eat(&TokenKind::Comma) {
                    continue;
                }
                self.expect(TokenKind::RParen)?;
                break;
            }
        }
        self.depth -= 1;

        if args.len() != func.arity {
            return Err(CompileError::new(
                pos,
                format!(
                    "`{}` takes {} argument(s), {} given",
                    func.name,
                    func.arity,
                    args.len()
                ),
            ));
        }
        Ok(Expr::Call { func, args })
    }

    /// Parse `<name>.<field>` after the dot.
    fn field(&mut self, name: String, pos: usize) -> Result<Expr, CompileError> {
        if Var::lookup(&name) != Some(Var::Msg) {
            return Err(CompileError::new(
                pos,
                format!("`{name}` has no fields, only `msg` does"),
            ));
        }
        match self.next() {
            Some(Token {
                kind: TokenKind::Ident(field),
                pos,
            }) => MsgField::lookup(&field)
                .map(Expr::Field)
                .ok_or_else(|| CompileError::new(pos, format!("unknown field `msg.{field}`"))),
            Some(tok) => Err(CompileError::new(
                tok.pos,
                format!("expected field name, found {}", tok.kind.describe()),
            )),
            None => Err(CompileError::new(self.end, "expected field name after `.`")),
        }
    }
}
