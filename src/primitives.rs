use tracing::debug;

use crate::environment::{Env, Environment};
use crate::evaluator::{EvalError, EvalResult, eval};
use crate::types::{Closure, Value};

/// Operation ids of the builtin registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    // Macros: receive their operands unevaluated
    Lambda,
    Macro,
    If,
    Define,
    Put,
    // Ordinary functions
    List,
    Head,
    Tail,
    Join,
    Len,
    Cons,
    Eval,
    Equal,
    Add,
    Sub,
    Mul,
    Div,
    GreaterThan,
    LessThan,
}

impl Builtin {
    pub const ALL: [Builtin; 19] = [
        Builtin::Lambda,
        Builtin::Macro,
        Builtin::If,
        Builtin::Define,
        Builtin::Put,
        Builtin::List,
        Builtin::Head,
        Builtin::Tail,
        Builtin::Join,
        Builtin::Len,
        Builtin::Cons,
        Builtin::Eval,
        Builtin::Equal,
        Builtin::Add,
        Builtin::Sub,
        Builtin::Mul,
        Builtin::Div,
        Builtin::GreaterThan,
        Builtin::LessThan,
    ];

    /// The symbol the builtin is installed under.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Lambda => "lambda",
            Builtin::Macro => "macro",
            Builtin::If => "if",
            Builtin::Define => "define",
            Builtin::Put => "put",
            Builtin::List => "list",
            Builtin::Head => "head",
            Builtin::Tail => "tail",
            Builtin::Join => "join",
            Builtin::Len => "len",
            Builtin::Cons => "cons",
            Builtin::Eval => "eval",
            Builtin::Equal => "=",
            Builtin::Add => "+",
            Builtin::Sub => "-",
            Builtin::Mul => "*",
            Builtin::Div => "/",
            Builtin::GreaterThan => ">",
            Builtin::LessThan => "<",
        }
    }

    pub fn is_macro(self) -> bool {
        matches!(
            self,
            Builtin::Lambda | Builtin::Macro | Builtin::If | Builtin::Define | Builtin::Put
        )
    }
}

/// Runs a builtin. `args` are evaluated for functions and raw operands for macros;
/// `env` is the environment of the call site.
pub fn dispatch(op: Builtin, env: &Env, args: Vec<Value>) -> EvalResult {
    match op {
        Builtin::Lambda => prim_lambda(env, args, false),
        Builtin::Macro => prim_lambda(env, args, true),
        Builtin::If => prim_if(env, args),
        Builtin::Define => prim_define(env, args, Scope::Global),
        Builtin::Put => prim_define(env, args, Scope::Local),
        Builtin::List => prim_list(args),
        Builtin::Head => prim_head(args),
        Builtin::Tail => prim_tail(args),
        Builtin::Join => prim_join(args),
        Builtin::Len => prim_len(args),
        Builtin::Cons => prim_cons(args),
        Builtin::Eval => prim_eval(env, args),
        Builtin::Equal => prim_equals(args),
        Builtin::Add => prim_add(args),
        Builtin::Sub => prim_sub(args),
        Builtin::Mul => prim_mul(args),
        Builtin::Div => prim_div(args),
        Builtin::GreaterThan => prim_greater_than(args),
        Builtin::LessThan => prim_less_than(args),
    }
}

// --- Argument helpers ---

fn expect_exact<const N: usize>(args: Vec<Value>, name: &str) -> EvalResult<[Value; N]> {
    let given = args.len();
    <[Value; N]>::try_from(args).map_err(|_| EvalError::Arity {
        op: name.to_string(),
        expected: format!("exactly {}", N),
        given,
    })
}

fn expect_at_least(args: &[Value], min: usize, name: &str) -> EvalResult<()> {
    if args.len() < min {
        return Err(EvalError::Arity {
            op: name.to_string(),
            expected: format!("at least {}", min),
            given: args.len(),
        });
    }
    Ok(())
}

fn type_error(name: &str, expected: &'static str, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        op: name.to_string(),
        expected,
        found: found.type_name(),
    }
}

fn expect_number(value: &Value, name: &str) -> EvalResult<i64> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(type_error(name, "number", other)),
    }
}

fn expect_sequence(value: Value, name: &str) -> EvalResult<Vec<Value>> {
    match value {
        Value::Sequence(items) => Ok(items),
        other => Err(type_error(name, "sequence", &other)),
    }
}

// --- Special forms (macro primitives) ---

fn prim_lambda(env: &Env, args: Vec<Value>, is_macro: bool) -> EvalResult {
    // (lambda (formals...) body)
    let name = if is_macro { "macro" } else { "lambda" };
    let [formals, body] = expect_exact::<2>(args, name)?;
    let params = match formals {
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Symbol(param) => Ok(param),
                other => Err(type_error(name, "symbol", &other)),
            })
            .collect::<EvalResult<Vec<String>>>()?,
        other => return Err(type_error(name, "sequence", &other)),
    };
    // Local frames are captured by content; the root stays shared so globals resolve late
    let defining = if env.borrow().is_root() {
        env.clone()
    } else {
        env.borrow().copy()
    };
    let captured = Environment::new_enclosed(defining);
    Ok(Value::Closure(Closure::new(params, body, captured, is_macro)))
}

fn prim_if(env: &Env, args: Vec<Value>) -> EvalResult {
    // (if condition consequent alternate); only the selected branch is evaluated
    let [condition, consequent, alternate] = expect_exact::<3>(args, "if")?;
    match eval(env, &condition) {
        Value::Boolean(true) => Ok(eval(env, &consequent)),
        Value::Boolean(false) => Ok(eval(env, &alternate)),
        err @ Value::Error(_) => Ok(err),
        other => Err(type_error("if", "boolean", &other)),
    }
}

enum Scope {
    Global,
    Local,
}

fn prim_define(env: &Env, args: Vec<Value>, scope: Scope) -> EvalResult {
    let op = match scope {
        Scope::Global => "define",
        Scope::Local => "put",
    };
    let [name, expr] = expect_exact::<2>(args, op)?;
    let name = match name {
        Value::Symbol(name) => name,
        other => return Err(type_error(op, "symbol", &other)),
    };
    let value = eval(env, &expr);
    if value.is_error() {
        return Ok(value);
    }
    debug!(name = %name, scope = op, "binding");
    let bound = value.clone();
    match scope {
        Scope::Global => env.borrow_mut().define_global(&name, bound),
        Scope::Local => env.borrow_mut().set(&name, bound),
    }
    Ok(value)
}

// --- List Primitives ---

pub fn prim_list(args: Vec<Value>) -> EvalResult {
    // (list item1 item2 ...) -> new sequence containing items
    Ok(Value::Sequence(args))
}

pub fn prim_head(args: Vec<Value>) -> EvalResult {
    let [list] = expect_exact::<1>(args, "head")?;
    expect_sequence(list, "head")?
        .into_iter()
        .next()
        .ok_or_else(|| EvalError::EmptySequence("head".to_string()))
}

pub fn prim_tail(args: Vec<Value>) -> EvalResult {
    let [list] = expect_exact::<1>(args, "tail")?;
    let mut items = expect_sequence(list, "tail")?;
    if items.is_empty() {
        return Err(EvalError::EmptySequence("tail".to_string()));
    }
    items.remove(0);
    Ok(Value::Sequence(items))
}

pub fn prim_cons(args: Vec<Value>) -> EvalResult {
    // (cons item list) -> [item, ..list]
    let [item, list] = expect_exact::<2>(args, "cons")?;
    let mut items = expect_sequence(list, "cons")?;
    items.insert(0, item);
    Ok(Value::Sequence(items))
}

pub fn prim_join(args: Vec<Value>) -> EvalResult {
    expect_at_least(&args, 1, "join")?;
    let mut joined = Vec::new();
    for list in args {
        joined.extend(expect_sequence(list, "join")?);
    }
    Ok(Value::Sequence(joined))
}

pub fn prim_len(args: Vec<Value>) -> EvalResult {
    let [list] = expect_exact::<1>(args, "len")?;
    let items = expect_sequence(list, "len")?;
    i64::try_from(items.len())
        .map(Value::Number)
        .map_err(|_| EvalError::Overflow("len".to_string()))
}

fn prim_eval(env: &Env, args: Vec<Value>) -> EvalResult {
    let [expr] = expect_exact::<1>(args, "eval")?;
    Ok(eval(env, &expr))
}

// --- Numbers and comparison ---

fn fold_numbers(
    args: Vec<Value>,
    operator: &str,
    func: impl Fn(i64, i64) -> EvalResult<i64>,
) -> EvalResult {
    expect_at_least(&args, 1, operator)?;
    let numbers = args
        .iter()
        .map(|arg| expect_number(arg, operator))
        .collect::<EvalResult<Vec<i64>>>()?;
    match numbers.split_first() {
        Some((&first, rest)) => rest
            .iter()
            .try_fold(first, |acc, &n| func(acc, n))
            .map(Value::Number),
        None => Ok(Value::Number(0)),
    }
}

fn overflow(operator: &str) -> EvalError {
    EvalError::Overflow(operator.to_string())
}

pub fn prim_add(args: Vec<Value>) -> EvalResult {
    // (+ 1 2 3) -> 6
    fold_numbers(args, "+", |acc, n| acc.checked_add(n).ok_or_else(|| overflow("+")))
}

pub fn prim_sub(args: Vec<Value>) -> EvalResult {
    // (- x) -> -x
    // (- x y z) -> x - y - z
    if let [value] = args.as_slice() {
        let n = expect_number(value, "-")?;
        return n.checked_neg().map(Value::Number).ok_or_else(|| overflow("-"));
    }
    fold_numbers(args, "-", |acc, n| acc.checked_sub(n).ok_or_else(|| overflow("-")))
}

pub fn prim_mul(args: Vec<Value>) -> EvalResult {
    fold_numbers(args, "*", |acc, n| acc.checked_mul(n).ok_or_else(|| overflow("*")))
}

pub fn prim_div(args: Vec<Value>) -> EvalResult {
    // Integer division, truncating toward zero
    fold_numbers(args, "/", |acc, n| {
        if n == 0 {
            return Err(EvalError::DivisionByZero);
        }
        acc.checked_div(n).ok_or_else(|| overflow("/"))
    })
}

fn compare_numbers(args: Vec<Value>, operator: &str, compare: fn(i64, i64) -> bool) -> EvalResult {
    let [left, right] = expect_exact::<2>(args, operator)?;
    let left = expect_number(&left, operator)?;
    let right = expect_number(&right, operator)?;
    Ok(Value::Boolean(compare(left, right)))
}

pub fn prim_greater_than(args: Vec<Value>) -> EvalResult {
    compare_numbers(args, ">", |left, right| left > right)
}

pub fn prim_less_than(args: Vec<Value>) -> EvalResult {
    compare_numbers(args, "<", |left, right| left < right)
}

pub fn prim_equals(args: Vec<Value>) -> EvalResult {
    // Structural equality over any two values
    let [left, right] = expect_exact::<2>(args, "=")?;
    Ok(Value::Boolean(left == right))
}
