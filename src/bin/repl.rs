use std::borrow::Cow;

use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, EditMode, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};
use tinylisp::{
    Env, TokenKind, eval, init_tracing, load_prelude, make_root_environment, parse_program, render,
    tokenize,
};

const DEFAULT_HISTORY_FILE: &str = "tinylisp_history.txt";

/// Settings for an interactive session, read from `TINYLISP_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
struct ReplConfig {
    history_file: String,
    edit_mode: EditMode,
    load_prelude: bool,
}

impl ReplConfig {
    fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let edit_mode = match lookup("TINYLISP_EDIT_MODE") {
            Some(mode) if mode.eq_ignore_ascii_case("vi") => EditMode::Vi,
            _ => EditMode::Emacs,
        };
        ReplConfig {
            history_file: lookup("TINYLISP_HISTORY")
                .filter(|path| !path.is_empty())
                .unwrap_or_else(|| DEFAULT_HISTORY_FILE.to_string()),
            edit_mode,
            load_prelude: lookup("TINYLISP_NO_PRELUDE").is_none(),
        }
    }

    fn editor_config(&self) -> rustyline::config::Config {
        rustyline::config::Config::builder()
            .edit_mode(self.edit_mode)
            .auto_add_history(false)
            .build()
    }
}

struct LispCompleter {
    env: Env,
}

impl LispCompleter {
    fn new(env: Env) -> Self {
        LispCompleter { env }
    }
}

impl rustyline::completion::Completer for LispCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        // Complete the symbol that ends at the cursor, if any
        let prefix = match tokenize(&line[..pos]) {
            Ok(tokens) => match tokens.last() {
                Some(token) if token.span.end == pos => match &token.kind {
                    TokenKind::Symbol(prefix) => prefix.clone(),
                    _ => return Ok((pos, vec![])),
                },
                _ => return Ok((pos, vec![])),
            },
            Err(_) => return Ok((pos, vec![])),
        };
        let mut candidates: Vec<String> = self
            .env
            .borrow()
            .get_identifiers()
            .into_iter()
            .filter_map(|id| id.strip_prefix(prefix.as_str()).map(str::to_string))
            .filter(|rest| !rest.is_empty())
            .collect();
        candidates.sort();
        Ok((pos, candidates))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputHelper {
    #[rustyline(Validator)]
    validator: ParenValidator,
    #[rustyline(Highlighter)]
    highlighter: ParenHighlighter,
    #[rustyline(Completer)]
    completer: LispCompleter,
}

struct ParenValidator;

impl ParenValidator {
    fn check(input: &str) -> ValidationResult {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut in_comment = false;
        let mut escape = false;

        for (i, c) in input.char_indices() {
            if in_comment {
                if c == '\n' {
                    in_comment = false;
                }
                continue;
            }
            if in_string {
                if escape {
                    escape = false;
                } else if c == '\\' {
                    escape = true;
                } else if c == '"' {
                    in_string = false;
                }
                continue;
            }

            match c {
                '"' => in_string = true,
                ';' => in_comment = true,
                '(' => depth += 1,
                ')' => {
                    if depth == 0 {
                        return ValidationResult::Invalid(Some(format!(
                            "  - Unmatched ')' at position {}",
                            i
                        )));
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }

        if in_string || depth > 0 {
            ValidationResult::Incomplete
        } else {
            ValidationResult::Valid(None)
        }
    }
}

impl Validator for ParenValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        Ok(Self::check(ctx.input()))
    }
}

struct ParenHighlighter;

impl Highlighter for ParenHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        let mut stack: Vec<(usize, usize)> = Vec::new();
        let mut highlighted = String::new();
        let mut in_string = false;
        let mut escape = false;

        for (i, c) in line.char_indices() {
            if in_string {
                if escape {
                    escape = false;
                } else if c == '\\' {
                    escape = true;
                } else if c == '"' {
                    in_string = false;
                }
                highlighted.push_str(&format!("\x1b[32m{}\x1b[0m", c)); // Green for strings
                continue;
            }

            match c {
                '"' => {
                    in_string = true;
                    highlighted.push_str(&format!("\x1b[32m{}\x1b[0m", c)); // Green for strings
                }
                '(' => {
                    stack.push((i, highlighted.len()));
                    highlighted.push(c);
                }
                ')' => {
                    if let Some((opening_idx, matching_pos)) = stack.pop() {
                        // Cursor sits just after either bracket of the pair
                        if opening_idx + 1 == pos || i + 1 == pos {
                            highlighted.push_str(&format!("\x1b[34m{}\x1b[0m", c)); // Blue for matching brackets
                            highlighted.replace_range(
                                matching_pos..=matching_pos,
                                "\x1b[1;34m(\x1b[0m",
                            );
                        } else {
                            highlighted.push(c);
                        }
                    } else {
                        highlighted.push_str(&format!("\x1b[31m{}\x1b[0m", c)); // Red for unmatched closing brackets
                    }
                }
                _ => {
                    highlighted.push(c);
                }
            }
        }

        Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

/// Reads, evaluates and prints every form on one line of input.
fn eval_line(env: &Env, line: &str) -> std::io::Result<()> {
    match parse_program(line) {
        Ok(forms) => {
            for form in &forms {
                println!("{}", render(&eval(env, form)));
            }
            Ok(())
        }
        Err(parse_err) => parse_err.pretty_print("repl", line),
    }
}

fn main() -> rustyline::Result<()> {
    init_tracing();
    let config = ReplConfig::from_env();

    println!("tinylisp {}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl-D to quit.");

    let global_env = make_root_environment();
    if config.load_prelude {
        if let Err(err) = load_prelude(&global_env) {
            eprintln!("Failed to load prelude: {}", err);
        }
    }

    let h = InputHelper {
        highlighter: ParenHighlighter,
        validator: ParenValidator,
        completer: LispCompleter::new(global_env.clone()),
    };
    let mut rl = Editor::with_config(config.editor_config())?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history(&config.history_file).is_err() {
        println!("No previous history.");
    }

    loop {
        let readline = rl.readline("tinylisp> ");
        match readline {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let trimmed_input = line.trim();
                if trimmed_input.is_empty() {
                    continue;
                }
                if trimmed_input.eq_ignore_ascii_case("exit") {
                    break;
                }
                eval_line(&global_env, trimmed_input)?;
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(&config.history_file)
}
