use crate::environment::{Env, Environment};
use crate::primitives;
use crate::types::{Closure, VARIADIC_MARKER, Value};
use thiserror::Error;
use tracing::trace;

// --- Evaluation Error ---
/// Failures raised while evaluating. They reach the language as `Value::Error`
/// carrying the rendered message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Variable `{0}` not found")]
    UnboundVariable(String),
    #[error("Function `{op}` expected {expected}, received {found}")]
    TypeMismatch {
        op: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("First element of an expression must be a function or macro, received {0}")]
    NotCallable(&'static str),
    #[error("Function `{op}` requires {expected} argument(s), given {given}")]
    Arity {
        op: String,
        expected: String,
        given: usize,
    },
    #[error("Function passed too many arguments: got {given}, expected {expected}")]
    TooManyArguments { given: usize, expected: usize },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Cannot take `{0}` of an empty sequence")]
    EmptySequence(String),
    #[error("Function format invalid: `&` must be followed by exactly one symbol")]
    MalformedVariadic,
    #[error("Integer overflow in `{0}`")]
    Overflow(String),
    #[error("Syntax error: {0}")]
    Syntax(String),
}

// Result type alias for convenience
pub type EvalResult<T = Value> = Result<T, EvalError>;

/// Fresh global scope with the builtin registry installed.
pub fn make_root_environment() -> Env {
    Environment::new_global_populated()
}

// --- Evaluate Function ---

/// Reduces `value` to its normal form in `env`.
/// Failures come back as `Value::Error`; this never panics on bad input.
pub fn eval(env: &Env, value: &Value) -> Value {
    match value {
        // Self-evaluating atoms
        Value::Number(_)
        | Value::Boolean(_)
        | Value::Error(_)
        | Value::String(_)
        | Value::Closure(_)
        | Value::Primitive(_) => value.clone(),

        Value::Symbol(name) => env.borrow().get(name).unwrap_or_else(Value::from),

        // The empty sequence is data, anything longer is an application
        Value::Sequence(elements) => match elements.split_first() {
            None => Value::empty(),
            Some((operator, operands)) => evaluate_application(env, operator, operands),
        },
    }
}

fn evaluate_application(env: &Env, operator: &Value, operands: &[Value]) -> Value {
    let callable = eval(env, operator);
    match callable {
        Value::Error(_) => return callable,
        Value::Closure(_) | Value::Primitive(_) => {}
        _ => return EvalError::NotCallable(callable.type_name()).into(),
    }
    trace!(operator = %callable, operands = operands.len(), "apply");

    // Macros decide for themselves what to evaluate
    if callable.is_macro() {
        return invoke(env, callable, operands.to_vec());
    }

    let mut args = Vec::with_capacity(operands.len());
    for operand in operands {
        let arg = eval(env, operand);
        if arg.is_error() {
            return arg;
        }
        args.push(arg);
    }
    invoke(env, callable, args)
}

/// Calls `callable` on an already-prepared argument list.
/// `env` is the caller's environment, which builtins such as `eval` and `define` act on.
pub fn invoke(env: &Env, callable: Value, args: Vec<Value>) -> Value {
    let result = match callable {
        Value::Primitive(op) => primitives::dispatch(op, env, args),
        Value::Closure(closure) => call_closure(closure, args),
        other => Err(EvalError::NotCallable(other.type_name())),
    };
    result.unwrap_or_else(Value::from)
}

fn call_closure(closure: Closure, args: Vec<Value>) -> EvalResult {
    let Closure {
        params,
        body,
        env: captured,
        is_macro,
    } = closure;
    let call_env = Environment::new_enclosed(captured);
    let given = args.len();

    let mut remaining: &[String] = &params;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match remaining {
            [] => {
                return Err(EvalError::TooManyArguments {
                    given,
                    expected: params.len(),
                });
            }
            [marker, rest @ ..] if marker == VARIADIC_MARKER => {
                let [name] = rest else {
                    return Err(EvalError::MalformedVariadic);
                };
                let collected: Vec<Value> = std::iter::once(arg).chain(args.by_ref()).collect();
                call_env.borrow_mut().set(name, Value::Sequence(collected));
                remaining = &[];
            }
            [name, rest @ ..] => {
                call_env.borrow_mut().set(name, arg);
                remaining = rest;
            }
        }
    }

    // A rest parameter left over after the last argument binds to the empty sequence
    if let [marker, rest @ ..] = remaining {
        if marker == VARIADIC_MARKER {
            let [name] = rest else {
                return Err(EvalError::MalformedVariadic);
            };
            call_env.borrow_mut().set(name, Value::empty());
            remaining = &[];
        }
    }

    if remaining.is_empty() {
        Ok(eval(&call_env, &body))
    } else {
        // Partial application: the bound arguments live on in the new closure's frame
        Ok(Value::Closure(Closure {
            params: remaining.to_vec(),
            body,
            env: call_env,
            is_macro,
        }))
    }
}
