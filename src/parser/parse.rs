//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing
//! infrastructure: error recording and recovery, token helpers, and the
//! symbol/address tables.
//!
//! # Parser Architecture
//!
//! The parser is a single-pass recursive descent recognizer that emits
//! stack-machine code as each construct is recognized; there is no AST.
//! Methods are split across multiple files using `impl Parser` blocks:
//! - This module: Parser struct, helpers, symbol tables, entry point
//! - `statements`: statement-level parsing and code emission
//! - `expressions`: expression/relation parsing with stack discipline
//! - `arrays`: the union/intersection/clear/copy emission routines
//!
//! # Error handling
//!
//! Errors never abort the parse. A mandatory-token mismatch records a
//! message and skips ahead to the expected token (`must_be`/`recover`);
//! semantic errors record a message and continue best-effort, so one run
//! surfaces as many errors as possible. Code emission keeps going either
//! way, but the buffer is only flushed when no error was recorded.

use crate::codegen::{Cmp, CodeGen, Instruction};
use crate::parser::lexer::{LexError, Lexer, SourceLocation, Token};
use rustc_hash::FxHashMap;
use std::fmt;

/// Scratch cells reserved below every user-visible address, reused by the
/// array-operation code sequences.
pub(crate) mod scratch {
    /// Outer/running index (also stashes the index of an indexed store).
    pub const INDEX: usize = 0;
    /// Inner scan/copy cursor (also the saved size in the element-wise
    /// assignment form).
    pub const CURSOR: usize = 1;
    /// Accumulated result size of a set operation.
    pub const LEN: usize = 2;
    /// Number of reserved cells; user allocation starts here.
    pub const CELLS: usize = 3;
}

/// Compile error: a message tied to a source position.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Compile error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(err: LexError) -> Self {
        CompileError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Storage layout of a declared array: `capacity` contiguous cells at
/// `base`, then the size cell holding the current (logical) size.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ArrayEntry {
    pub base: usize,
    pub size_cell: usize,
    pub capacity: usize,
}

/// Recursive descent parser and code generator, fused into one pass.
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    pub(crate) gen: CodeGen,
    pub(crate) errors: Vec<CompileError>,
    variables: FxHashMap<String, usize>,
    arrays: FxHashMap<String, ArrayEntry>,
    next_addr: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, CompileError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            gen: CodeGen::new(),
            errors: Vec::new(),
            variables: FxHashMap::default(),
            arrays: FxHashMap::default(),
            next_addr: scratch::CELLS,
        })
    }

    /// Compile the whole program. On success returns the finalized
    /// instruction buffer; otherwise every error recorded during the pass.
    pub fn parse(mut self) -> Result<Vec<Instruction>, Vec<CompileError>> {
        self.program();
        if self.errors.is_empty() {
            Ok(self.gen.flush())
        } else {
            Err(self.errors)
        }
    }

    // ===== Error recording and recovery =====

    pub(crate) fn report_error(&mut self, message: String) {
        let location = self.current_location();
        self.errors.push(CompileError { message, location });
    }

    /// Require `token` next. On mismatch, record the error and skip ahead
    /// until the token (consumed) or end of input is found.
    pub(crate) fn must_be(&mut self, token: &Token) {
        if !self.match_token(token) {
            let message =
                format!("{} found while {} expected.", self.peek(), token);
            self.report_error(message);
            self.recover(token);
        }
    }

    /// Skip to the synchronization token, consuming it if present.
    pub(crate) fn recover(&mut self, token: &Token) {
        while !self.check(token) && !self.is_at_end() {
            self.advance();
        }
        if self.check(token) {
            self.advance();
        }
    }

    // ===== Symbol tables and address allocation =====
    //
    // Addresses grow monotonically from a single counter and are never
    // reused, so `delete` can shrink an array logically without any
    // storage reclamation.

    /// Address of a scalar, allocating the next free cell on first use.
    pub(crate) fn find_or_add_variable(&mut self, name: &str) -> usize {
        if let Some(&addr) = self.variables.get(name) {
            addr
        } else {
            let addr = self.next_addr;
            self.next_addr += 1;
            self.variables.insert(name.to_string(), addr);
            addr
        }
    }

    pub(crate) fn find_variable(&self, name: &str) -> Option<usize> {
        self.variables.get(name).copied()
    }

    pub(crate) fn find_array(&self, name: &str) -> Option<ArrayEntry> {
        self.arrays.get(name).copied()
    }

    /// Allocate `capacity` contiguous cells plus a trailing size cell.
    /// Returns `None` if the name is already an array; the existing
    /// mapping is left untouched.
    pub(crate) fn add_array(
        &mut self,
        name: &str,
        capacity: usize,
    ) -> Option<ArrayEntry> {
        if self.arrays.contains_key(name) {
            return None;
        }
        let base = self.next_addr;
        let size_cell = base + capacity;
        self.next_addr = size_cell + 1;
        let entry = ArrayEntry {
            base,
            size_cell,
            capacity,
        };
        self.arrays.insert(name.to_string(), entry);
        Some(entry)
    }

    /// Current free-address frontier. The set-op routines use the cells
    /// from here upward as their working result buffer.
    pub(crate) fn free_address(&self) -> usize {
        self.next_addr
    }

    // ===== Shared emission helpers =====

    /// Emit the two-sided bounds check for an index on top of the stack:
    /// trap unless `0 <= index < memory[size_cell]`. Leaves the index on
    /// the stack.
    pub(crate) fn emit_bounds_check(&mut self, size_cell: usize) {
        self.gen.emit(Instruction::Dup);
        self.gen.emit(Instruction::Dup);
        self.gen.emit(Instruction::Load(size_cell));
        self.gen.emit(Instruction::Compare(Cmp::Lt));
        let here = self.gen.current_address();
        self.gen.emit(Instruction::JumpYes(here + 2));
        self.gen.emit_trap();
        self.gen.emit(Instruction::Push(0));
        self.gen.emit(Instruction::Compare(Cmp::Ge));
        let here = self.gen.current_address();
        self.gen.emit(Instruction::JumpYes(here + 2));
        self.gen.emit_trap();
    }

    // ===== Token helpers =====

    pub(crate) fn match_token(&mut self, token: &Token) -> bool {
        if std::mem::discriminant(&self.peek_token())
            == std::mem::discriminant(token)
        {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(&self.peek_token())
            == std::mem::discriminant(token)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek_token(), Token::Eof(_))
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn peek_token(&self) -> Token {
        self.tokens[self.position].clone()
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position - 1]
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location()
    }
}
