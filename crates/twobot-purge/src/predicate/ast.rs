//! Syntax tree for predicate expressions.

use super::functions::FunctionDef;
use super::value::Literal;
use regex::Regex;

/// Variables bound for every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Var {
    Msg,
    Username,
    UserId,
    Content,
    Id,
    MentionsEveryone,
    ChannelId,
}

impl Var {
    pub(crate) fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "msg" => Self::Msg,
            "username" => Self::Username,
            "userid" => Self::UserId,
            "content" => Self::Content,
            "id" => Self::Id,
            "mentions_everyone" => Self::MentionsEveryone,
            "channelid" => Self::ChannelId,
            _ => return None,
        })
    }
}

/// Fields reachable through `msg.<field>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MsgField {
    Id,
    Content,
    AuthorId,
    AuthorName,
    ChannelId,
    MentionsEveryone,
    /// Creation time in Unix milliseconds.
    Timestamp,
}

impl MsgField {
    pub(crate) fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "id" => Self::Id,
            "content" => Self::Content,
            "author_id" => Self::AuthorId,
            "author_name" => Self::AuthorName,
            "channel_id" => Self::ChannelId,
            "mentions_everyone" => Self::MentionsEveryone,
            "timestamp" => Self::Timestamp,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogicOp {
    And,
    Or,
}

/// Right-hand side of `=~` / `!~`.
#[derive(Debug, Clone)]
pub(crate) enum RegexOperand {
    /// Literal pattern, compiled once.
    Static(Regex),
    /// Pattern computed per message.
    Dynamic(Box<Expr>),
}

#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Literal(Literal),
    Var(Var),
    Field(MsgField),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Logic {
        op: LogicOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Regex {
        negated: bool,
        lhs: Box<Expr>,
        pattern: RegexOperand,
    },
    Call {
        func: FunctionDef,
        args: Vec<Expr>,
    },
}
