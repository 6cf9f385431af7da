//! Tree-walking evaluator.

use super::ast::{CmpOp, Expr, LogicOp, MsgField, RegexOperand, Var};
use super::value::Value;
use super::EvalError;
use regex::Regex;
use std::borrow::Cow;
use std::cmp::Ordering;
use twobot_core::message::Message;

pub(crate) fn eval<'a>(expr: &'a Expr, msg: &'a Message) -> Result<Value<'a>, EvalError> {
    match expr {
        Expr::Literal(lit) => Ok(lit.value()),
        Expr::Var(var) => Ok(variable(*var, msg)),
        Expr::Field(field) => Ok(msg_field(*field, msg)),
        Expr::Not(inner) => match eval(inner, msg)? {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(EvalError::Operand {
                op: "!",
                expected: "boolean",
                found: other.type_name(),
            }),
        },
        Expr::Neg(inner) => match eval(inner, msg)? {
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(EvalError::Operand {
                op: "-",
                expected: "number",
                found: other.type_name(),
            }),
        },
        Expr::Logic { op, lhs, rhs } => {
            let symbol = match op {
                LogicOp::And => "&&",
                LogicOp::Or => "||",
            };
            let left = expect_bool(symbol, eval(lhs, msg)?)?;
            // Short-circuit: the right side is not evaluated when the left decides.
            match (op, left) {
                (LogicOp::And, false) => Ok(Value::Bool(false)),
                (LogicOp::Or, true) => Ok(Value::Bool(true)),
                _ => Ok(Value::Bool(expect_bool(symbol, eval(rhs, msg)?)?)),
            }
        }
        Expr::Compare { op, lhs, rhs } => {
            let left = eval(lhs, msg)?;
            let right = eval(rhs, msg)?;
            compare(*op, &left, &right).map(Value::Bool)
        }
        Expr::Regex {
            negated,
            lhs,
            pattern,
        } => {
            let symbol = if *negated { "!~" } else { "=~" };
            let subject = eval(lhs, msg)?;
            let Some(text) = subject.as_str() else {
                return Err(EvalError::Operand {
                    op: symbol,
                    expected: "string",
                    found: subject.type_name(),
                });
            };
            let matched = match pattern {
                RegexOperand::Static(re) => re.is_match(text),
                RegexOperand::Dynamic(expr) => {
                    let value = eval(expr, msg)?;
                    let Some(source) = value.as_str() else {
                        return Err(EvalError::Operand {
                            op: symbol,
                            expected: "string pattern",
                            found: value.type_name(),
                        });
                    };
                    let re = Regex::new(source).map_err(|e| EvalError::Regex {
                        pattern: source.to_string(),
                        message: e.to_string(),
                    })?;
                    re.is_match(text)
                }
            };
            Ok(Value::Bool(matched != *negated))
        }
        Expr::Call { func, args } => {
            let values = args
                .iter()
                .map(|arg| eval(arg, msg))
                .collect::<Result<Vec<_>, _>>()?;
            (func.call)(&values)
        }
    }
}

fn expect_bool(op: &'static str, value: Value<'_>) -> Result<bool, EvalError> {
    value.as_bool().ok_or(EvalError::Operand {
        op,
        expected: "boolean",
        found: value.type_name(),
    })
}

fn variable(var: Var, msg: &Message) -> Value<'_> {
    match var {
        Var::Msg => Value::Message(msg),
        Var::Username => Value::Str(Cow::Borrowed(&msg.author_name)),
        Var::UserId => Value::Str(Cow::Owned(msg.author_id.to_string())),
        Var::Content => Value::Str(Cow::Borrowed(&msg.content)),
        Var::Id => Value::Str(Cow::Owned(msg.id.to_string())),
        Var::MentionsEveryone => Value::Bool(msg.mentions_everyone),
        Var::ChannelId => Value::Str(Cow::Owned(msg.channel_id.to_string())),
    }
}

fn msg_field(field: MsgField, msg: &Message) -> Value<'_> {
    match field {
        MsgField::Id => Value::Str(Cow::Owned(msg.id.to_string())),
        MsgField::Content => Value::Str(Cow::Borrowed(&msg.content)),
        MsgField::AuthorId => Value::Str(Cow::Owned(msg.author_id.to_string())),
        MsgField::AuthorName => Value::Str(Cow::Borrowed(&msg.author_name)),
        MsgField::ChannelId => Value::Str(Cow::Owned(msg.channel_id.to_string())),
        MsgField::MentionsEveryone => Value::Bool(msg.mentions_everyone),
        MsgField::Timestamp => Value::Number(msg.id.timestamp_ms() as f64),
    }
}

/// Equality across different types is simply false; ordering across them is an error.
fn compare(op: CmpOp, left: &Value<'_>, right: &Value<'_>) -> Result<bool, EvalError> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.as_ref().cmp(b.as_ref())),
        (Value::Bool(a), Value::Bool(b)) if matches!(op, CmpOp::Eq | CmpOp::Ne) => {
            Some(a.cmp(b))
        }
        (Value::Message(a), Value::Message(b)) if matches!(op, CmpOp::Eq | CmpOp::Ne) => {
            Some(a.id.cmp(&b.id))
        }
        _ if matches!(op, CmpOp::Eq | CmpOp::Ne) => None,
        _ => {
            return Err(EvalError::TypeMismatch {
                op: op.symbol(),
                left: left.type_name(),
                right: right.type_name(),
            })
        }
    };

    Ok(match op {
        CmpOp::Eq => ordering == Some(Ordering::Equal),
        CmpOp::Ne => ordering != Some(Ordering::Equal),
        CmpOp::Lt => ordering == Some(Ordering::Less),
        CmpOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        CmpOp::Gt => ordering == Some(Ordering::Greater),
        CmpOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
    })
}
