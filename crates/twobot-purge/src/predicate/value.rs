use std::borrow::Cow;
use twobot_core::message::Message;

/// Runtime value produced while evaluating an expression.
///
/// Borrows from the message under test and from the compiled expression, so
/// evaluation allocates only when a function builds a new string.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Bool(bool),
    Number(f64),
    Str(Cow<'a, str>),
    Message(&'a Message),
}

impl Value<'_> {
    /// Type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Message(_) => "message",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Constant folded into the syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Literal {
    Bool(bool),
    Number(f64),
    Str(String),
}

impl Literal {
    pub(crate) fn value(&self) -> Value<'_> {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(*n),
            Self::Str(s) => Value::Str(Cow::Borrowed(s)),
        }
    }
}
