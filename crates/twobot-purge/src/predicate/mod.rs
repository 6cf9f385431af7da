//! Embedded predicate language.
//!
//! A purge can be narrowed with a boolean expression evaluated once per
//! message, e.g. `glob('*necroforger*', username) || content =~ 'owo'`.
//!
//! Bound variables: `msg`, `username`, `userid`, `content`, `id`,
//! `mentions_everyone`, `channelid`. Ids are strings. `msg` exposes
//! `msg.id`, `msg.content`, `msg.author_id`, `msg.author_name`,
//! `msg.channel_id`, `msg.mentions_everyone` and `msg.timestamp` (Unix ms).
//!
//! Expressions are compiled up front: syntax errors, unknown names and wrong
//! arities are [`CompileError`]s. Anything that can only be detected against
//! a real message (type mismatches, a non-boolean result) is an
//! [`EvalError`].

mod ast;
mod eval;
mod functions;
mod lexer;
mod parser;
mod value;


pub use functions::{FunctionDef, FunctionRegistry, NativeFn};
pub use value::Value;

use ast::Expr;
use thiserror::Error;
use twobot_core::message::Message;
use value::Literal;

/// Malformed expression, reported before any message is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (at position {position})")]
pub struct CompileError {
    /// Character offset into the expression.
    pub position: usize,
    pub message: String,
}

impl CompileError {
    pub(crate) fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// Failure while evaluating an expression against one message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("expression result was not a boolean value (got {0})")]
    NotBoolean(&'static str),

    #[error("cannot apply `{op}` to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("`{op}` expects {expected}, got {found}")]
    Operand {
        op: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{name}: {message}")]
    Function { name: &'static str, message: String },

    #[error("invalid regex {pattern:?}: {message}")]
    Regex { pattern: String, message: String },
}

/// A compiled message predicate.
#[derive(Debug, Clone)]
pub struct Predicate {
    source: String,
    root: Expr,
}

impl Predicate {
    /// Compile with the standard function registry.
    pub fn compile(source: &str) -> Result<Self, CompileError> {
        Self::compile_with(source, &FunctionRegistry::standard())
    }

    /// Compile against a custom function registry.
    pub fn compile_with(source: &str, registry: &FunctionRegistry) -> Result<Self, CompileError> {
        let tokens = lexer::tokenize(source)?;
        let root = parser::Parser::new(tokens, source.chars().count(), registry).parse()?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// Predicate that matches every message.
    pub fn always() -> Self {
        Self {
            source: "true".to_string(),
            root: Expr::Literal(Literal::Bool(true)),
        }
    }

    /// The expression text this predicate was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against one message.
    pub fn evaluate(&self, msg: &Message) -> Result<bool, EvalError> {
        match eval::eval(&self.root, msg)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::NotBoolean(other.type_name())),
        }
    }
}

/// Compile an expression with the standard function registry.
pub fn compile(source: &str) -> Result<Predicate, CompileError> {
    Predicate::compile(source)
}
