//! # Introduction
//!
//! stacc compiles a small imperative language — integer scalars,
//! fixed-size integer arrays, conditionals, loops, I/O, and two built-in
//! array set operations (union and intersection) — into code for a simple
//! stack virtual machine.
//!
//! ## Compilation pipeline
//!
//! ```text
//! Source → Lexer → Parser (+ CodeGen, fused) → Instructions → Vm
//! ```
//!
//! 1. [`parser`] — tokenizes the source and drives a single-pass
//!    recursive descent that emits instructions as each construct is
//!    recognized; there is no AST. Errors are accumulated with source
//!    positions and reported together.
//! 2. [`codegen`] — the instruction set and the append-only buffer with
//!    reserve/patch support for forward jumps and runtime traps.
//! 3. [`vm`] — the stack-machine executor consuming the emitted code.
//!
//! ## Example
//!
//! ```
//! use stacc::parser::parse::Parser;
//! use stacc::vm::Vm;
//!
//! let source = "begin array a[3]; a[0] := 5; a[1] := 7; a[2] := 9;
//!               b := a[0] + a[1] + a[2]; write(b) end";
//! let code = Parser::new(source).unwrap().parse().unwrap();
//! let mut vm = Vm::new(code);
//! vm.run().unwrap();
//! assert_eq!(vm.output(), &[21]);
//! ```

pub mod codegen;
pub mod parser;
pub mod vm;
