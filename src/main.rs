use std::fs;
use std::io;
use std::process::ExitCode;

use tinylisp::{Env, eval, init_tracing, make_prelude_environment, parse_program};
use tracing::debug;

/// Evaluates every top-level form of `path` in `env`.
/// Returns whether the whole file ran without a read, parse or evaluation error.
fn run_file(env: &Env, path: &str) -> io::Result<bool> {
    let input = match fs::read_to_string(path) {
        Ok(input) => input,
        Err(err) => {
            eprintln!("{}: could not read file: {}", path, err);
            return Ok(false);
        }
    };

    let forms = match parse_program(&input) {
        Ok(forms) => forms,
        Err(parse_err) => {
            parse_err.pretty_print(path, &input)?;
            return Ok(false);
        }
    };
    debug!(file = path, forms = forms.len(), "loaded");

    let mut ok = true;
    for form in &forms {
        let result = eval(env, form);
        if result.is_error() {
            eprintln!("{}: {}", path, result);
            ok = false;
        }
    }
    Ok(ok)
}

fn main() -> io::Result<ExitCode> {
    init_tracing();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("Usage: tinylisp FILE...");
        return Ok(ExitCode::FAILURE);
    }

    let env = match make_prelude_environment() {
        Ok(env) => env,
        Err(err) => {
            eprintln!("Failed to load prelude: {}", err);
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut ok = true;
    for path in &paths {
        ok &= run_file(&env, path)?;
    }

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
