//! The expression language behind `put` and `filter`.
//!
//! A program is a sequence of `;`-separated statements, optionally preceded
//! or followed by `begin { ... }` and `end { ... }` blocks:
//!
//! ```text
//! begin { @sum = 0 }
//! $z = $x * 2 . "_" . toupper($name);
//! $y > 10 { @sum += $y }
//! end { emit @sum }
//! ```
//!
//! Fields are `$name` (or `${name with spaces}`), out-of-stream variables are
//! `@name` and persist across records. Runtime type mismatches produce error
//! values; only parse failures are reported as errors.

pub mod ast;
mod eval;
pub(crate) mod functions;
mod lexer;
mod parser;

pub use eval::{FLATTEN_SEPARATOR, Interpreter, MainOutcome, Output, flatten_into};
pub use parser::parse_program;
