// Declare modules publicly so they are part of the library interface
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod prelude;
pub mod pretty_print;
pub mod primitives;
pub mod source;
pub mod types;

pub use environment::{Env, Environment};
pub use evaluator::{EvalError, eval, invoke, make_root_environment};
pub use lexer::{LexerError, Token, TokenKind, tokenize};
pub use parser::{ParseError, Parser, parse_program, parse_str, read};
pub use prelude::{load_prelude, make_prelude_environment};
pub use primitives::Builtin;
pub use source::Span;
pub use types::{Value, render};

static TRACING_INIT: std::sync::Once = std::sync::Once::new();

/// Installs a `tracing` subscriber for the binaries.
/// Does nothing unless `RUST_LOG` is set, so normal output stays clean.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
