//! Source code parser and code generator
//!
//! This module transforms source text directly into stack-machine code:
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parser struct, helpers, symbol tables, error recovery
//! - `statements` / `expressions` / `arrays`: recognizers extending the
//!   parser via `impl` blocks, each emitting code as it recognizes its
//!   construct
//!
//! # Supported language
//!
//! A small imperative language: integer scalars, fixed-size integer
//! arrays, `if`/`while` control flow, `write`/`read` I/O, `delete`
//! (logical shrink of an array), the bracketed array set operations
//! `z := [ x | y ]` (union) and `z := [ x & y ]` (intersection), and
//! element-wise array assignment `z := x + y`.
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent with one token of lookahead, fused with
//! code generation: there is no AST, and no separate emission pass. After
//! an error the parser keeps going (skip-to-synchronization-token
//! recovery) so one run reports as many errors as possible, but only an
//! error-free compilation produces a finalized instruction stream.

pub mod lexer;
pub mod parse;

mod arrays;
mod expressions;
mod statements;
