use crate::environment::Env;
use crate::evaluator::EvalError;
use crate::primitives::Builtin;
use std::fmt; // For custom display formatting

/// Symbol that marks the start of a variadic rest parameter: `(a & rest)`.
pub const VARIADIC_MARKER: &str = "&";

/// Every runtime datum of the language.
/// The same `Sequence` variant is used for code (an expression to apply) and for data (a list);
/// only the evaluation context tells them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(i64),
    Boolean(bool),
    Error(String), // First-class failure, compared by message text
    Symbol(String),
    String(String),
    Sequence(Vec<Value>),
    Closure(Closure),
    Primitive(Builtin),
}

/// A user-defined function or macro.
pub struct Closure {
    pub params: Vec<String>,
    pub body: Box<Value>,
    pub env: Env,
    pub is_macro: bool,
}

impl Closure {
    pub fn new(params: Vec<String>, body: Value, env: Env, is_macro: bool) -> Self {
        Closure {
            params,
            body: Box::new(body),
            env,
            is_macro,
        }
    }
}

// Cloning a closure copies its captured frame by content (the parent chain stays shared),
// so two copies can be extended independently afterwards.
impl Clone for Closure {
    fn clone(&self) -> Self {
        Closure {
            params: self.params.clone(),
            body: self.body.clone(),
            env: self.env.borrow().copy(),
            is_macro: self.is_macro,
        }
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.params)
            .field("body", &self.body)
            .field("is_macro", &self.is_macro)
            .finish_non_exhaustive()
    }
}

// Captured environments are deliberately left out of the comparison.
impl PartialEq for Closure {
    fn eq(&self, other: &Self) -> bool {
        self.is_macro == other.is_macro && self.params == other.params && self.body == other.body
    }
}

impl Value {
    pub fn symbol(name: &str) -> Self {
        Value::Symbol(name.to_string())
    }

    pub fn string(text: &str) -> Self {
        Value::String(text.to_string())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Value::Error(message.into())
    }

    pub fn empty() -> Self {
        Value::Sequence(Vec::new())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// True for callables that receive their operands unevaluated.
    pub fn is_macro(&self) -> bool {
        match self {
            Value::Closure(closure) => closure.is_macro,
            Value::Primitive(op) => op.is_macro(),
            _ => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::Error(_) => "error",
            Value::Symbol(_) => "symbol",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Closure(closure) if closure.is_macro => "macro",
            Value::Closure(_) => "function",
            Value::Primitive(op) if op.is_macro() => "macro",
            Value::Primitive(_) => "function",
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<EvalError> for Value {
    fn from(err: EvalError) -> Self {
        Value::Error(err.to_string())
    }
}

fn write_sequence(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    write!(f, "(")?;
    let mut first = true;
    for item in items {
        if !first {
            write!(f, " ")?;
        }
        write!(f, "{}", item)?;
        first = false;
    }
    write!(f, ")")
}

// Canonical rendering used by the REPL and `render`
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Error(message) => write!(f, "{}", message),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::String(str) => {
                write!(
                    f,
                    "\"{}\"",
                    str.chars().fold(String::new(), |mut acc, char| {
                        match char {
                            '"' => acc.push_str("\\\""),
                            '\\' => acc.push_str("\\\\"),
                            '\n' => acc.push_str("\\n"),
                            '\r' => acc.push_str("\\r"),
                            '\t' => acc.push_str("\\t"),
                            c => acc.push(c),
                        }
                        acc
                    })
                )
            }
            Value::Sequence(items) => write_sequence(f, items),
            Value::Closure(closure) => {
                write!(f, "({} (", if closure.is_macro { "macro" } else { "lambda" })?;
                write!(f, "{}", closure.params.join(" "))?;
                write!(f, ") {})", closure.body)
            }
            Value::Primitive(_) => write!(f, "<builtin>"),
        }
    }
}

/// Textual rendering of a value for display.
pub fn render(value: &Value) -> String {
    value.to_string()
}
