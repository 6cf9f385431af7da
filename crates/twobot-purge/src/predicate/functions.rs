//! Function registry for predicate expressions.
//!
//! Functions are resolved by name at compile time, so an unknown name or a
//! wrong argument count never reaches the network.

use super::value::Value;
use super::EvalError;
use std::collections::HashMap;

/// Native implementation of an expression function.
pub type NativeFn = for<'a> fn(&[Value<'a>]) -> Result<Value<'a>, EvalError>;

/// A registered function.
#[derive(Clone, Copy)]
pub struct FunctionDef {
    pub name: &'static str,
    pub arity: usize,
    pub call: NativeFn,
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Functions callable from expressions.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<&'static str, FunctionDef>,
}

impl FunctionRegistry {
    /// A registry with no functions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard registry: `glob(pattern, value)`.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(FunctionDef {
            name: "glob",
            arity: 2,
            call: glob_match,
        });
        registry
    }

    /// Add or replace a function.
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }
}

/// Extract a string argument or fail with a descriptive error.
fn string_arg<'v>(
    function: &'static str,
    args: &'v [Value<'_>],
    index: usize,
) -> Result<&'v str, EvalError> {
    match args.get(index) {
        Some(Value::Str(s)) => Ok(s),
        Some(other) => Err(EvalError::Function {
            name: function,
            message: format!(
                "argument {} must be a string, got {}",
                index + 1,
                other.type_name()
            ),
        }),
        None => Err(EvalError::Function {
            name: function,
            message: format!("missing argument {}", index + 1),
        }),
    }
}

/// `glob(pattern, value)`: shell-style wildcard match of `value` against `pattern`.
fn glob_match<'a>(args: &[Value<'a>]) -> Result<Value<'a>, EvalError> {
    let pattern = string_arg("glob", args, 0)?;
    let value = string_arg("glob", args, 1)?;
    let compiled = ::glob::Pattern::new(pattern).map_err(|e| EvalError::Function {
        name: "glob",
        message: format!("invalid pattern {pattern:?}: {e}"),
    })?;
    Ok(Value::Bool(compiled.matches(value)))
}
