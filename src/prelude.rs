use crate::environment::Env;
use crate::evaluator::{EvalError, eval, make_root_environment};
use crate::parser::parse_program;
use crate::types::Value;
use tracing::debug;

/// Library functions written in the language itself, loaded before user code.
pub const PRELUDE: &str = r"
; Returns its operand unevaluated
(define quote (macro (x) x))

(define not (\ (x) (if x false true)))
(define >= (\ (a b) (not (< a b))))
(define <= (\ (a b) (not (> a b))))
(define empty? (\ (xs) (= xs ())))

(define map (\ (f xs)
  (if (empty? xs)
      ()
      (cons (f (head xs)) (map f (tail xs))))))

(define filter (\ (pred xs)
  (if (empty? xs)
      ()
      (if (pred (head xs))
          (cons (head xs) (filter pred (tail xs)))
          (filter pred (tail xs))))))

(define foldl (\ (f acc xs)
  (if (empty? xs)
      acc
      (foldl f (f acc (head xs)) (tail xs)))))

(define sum (\ (xs) (foldl + 0 xs)))
(define reverse (\ (xs) (foldl (\ (acc x) (cons x acc)) () xs)))
";

/// Evaluates every prelude form in `env`. The first `Error` stops loading and is returned.
pub fn load_prelude(env: &Env) -> Result<(), Value> {
    let forms =
        parse_program(PRELUDE).map_err(|err| Value::from(EvalError::Syntax(err.to_string())))?;
    debug!(forms = forms.len(), "loading prelude");
    for form in &forms {
        let result = eval(env, form);
        if result.is_error() {
            return Err(result);
        }
    }
    Ok(())
}

/// Root environment with the builtins and the prelude installed.
pub fn make_prelude_environment() -> Result<Env, Value> {
    let env = make_root_environment();
    load_prelude(&env)?;
    Ok(env)
}
