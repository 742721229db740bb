//! Statement parsing and code emission
//!
//! Statement-level recursive descent: each recognizer emits its code as
//! soon as the construct is recognized. Forward jumps whose targets depend
//! on code not yet generated (`if`/`while` exits, the `delete` guard) are
//! reserved and patched once the target address is known.

use crate::codegen::{Cmp, Instruction};
use crate::parser::arrays::SetOp;
use crate::parser::lexer::Token;
use crate::parser::parse::{scratch, ArrayEntry, Parser};

impl Parser {
    /// program := "begin" stmtList "end"
    pub(crate) fn program(&mut self) {
        self.must_be(&Token::Begin(self.current_location()));
        self.statement_list();
        self.must_be(&Token::End(self.current_location()));
        self.gen.emit(Instruction::Stop);
    }

    /// stmtList := (statement (";" statement)*)?
    ///
    /// An empty list is legal when the next token closes the enclosing
    /// block. The last statement carries no trailing semicolon.
    pub(crate) fn statement_list(&mut self) {
        let loc = self.current_location();
        if self.check(&Token::End(loc))
            || self.check(&Token::Od(loc))
            || self.check(&Token::Else(loc))
            || self.check(&Token::Fi(loc))
        {
            return;
        }
        loop {
            self.statement();
            if !self.match_token(&Token::Semicolon(self.current_location())) {
                break;
            }
        }
    }

    pub(crate) fn statement(&mut self) {
        let loc = self.current_location();

        if let Token::Ident(name, _) = self.peek_token() {
            self.advance();
            self.assignment(&name);
        } else if self.match_token(&Token::If(loc)) {
            self.if_statement();
        } else if self.match_token(&Token::While(loc)) {
            self.while_statement();
        } else if self.match_token(&Token::Write(loc)) {
            self.write_statement();
        } else if self.match_token(&Token::Array(loc)) {
            self.array_declaration();
        } else if self.match_token(&Token::Delete(loc)) {
            self.delete_statement();
        } else {
            self.report_error("statement expected.".to_string());
        }
    }

    /// Dispatch between the assignment forms once the leading identifier
    /// has been consumed: indexed store, scalar store, bracketed set-op,
    /// or element-wise array assignment.
    fn assignment(&mut self, name: &str) {
        if self.match_token(&Token::LBracket(self.current_location())) {
            self.indexed_store(name);
            return;
        }

        match self.find_array(name) {
            None => {
                let addr = self.find_or_add_variable(name);
                self.must_be(&Token::Assign(self.current_location()));
                self.expression();
                self.gen.emit(Instruction::Store(addr));
            }
            Some(dest) => {
                self.must_be(&Token::Assign(self.current_location()));
                if self.match_token(&Token::LBracket(self.current_location()))
                {
                    self.set_op_assignment(dest);
                } else {
                    self.elementwise_assignment(dest);
                }
            }
        }
    }

    /// IDENT "[" expression "]" ":=" expression
    ///
    /// The index is bounds-checked, stashed in a scratch cell across the
    /// evaluation of the right-hand side, then reloaded for the store.
    fn indexed_store(&mut self, name: &str) {
        match self.find_array(name) {
            None => {
                self.report_error(format!("no such array: {}.", name));
                self.recover(&Token::Assign(self.current_location()));
                self.expression();
            }
            Some(arr) => {
                self.expression();
                self.must_be(&Token::RBracket(self.current_location()));
                self.emit_bounds_check(arr.size_cell);
                self.gen.emit(Instruction::Store(scratch::INDEX));
                self.must_be(&Token::Assign(self.current_location()));
                self.expression();
                self.gen.emit(Instruction::Load(scratch::INDEX));
                self.gen.emit(Instruction::BStore(arr.base));
            }
        }
    }

    /// IDENT ":=" "[" IDENT ("|"|"&") IDENT "]"
    ///
    /// The destination identifier and ":=" "[" are already consumed.
    fn set_op_assignment(&mut self, dest: ArrayEntry) {
        // Zero the scratch cells shared by the set-op code sequences
        for cell in [scratch::INDEX, scratch::CURSOR, scratch::LEN] {
            self.gen.emit(Instruction::Push(0));
            self.gen.emit(Instruction::Store(cell));
        }

        let first = self.set_op_operand("the first argument must be array.");

        let op = match self.peek() {
            Token::Union(_) => Some(SetOp::Union),
            Token::Intersect(_) => Some(SetOp::Intersection),
            other => {
                let message = format!(
                    "array operator expected but found {}.",
                    other
                );
                self.report_error(message);
                None
            }
        };
        self.advance();

        let second = self.set_op_operand("the second argument must be array.");

        self.must_be(&Token::RBracket(self.current_location()));

        if let (Some(src1), Some(src2), Some(op)) = (first, second, op) {
            match op {
                SetOp::Union => {
                    self.emit_union_pass(src1);
                    self.gen.emit(Instruction::Push(0));
                    self.gen.emit(Instruction::Store(scratch::INDEX));
                    self.emit_union_pass(src2);
                }
                SetOp::Intersection => {
                    self.emit_intersection(src1, src2);
                }
            }
            self.emit_copy_to_dest(dest);
            self.emit_clear();
        }
    }

    /// One operand of the set-op form; must name a declared array.
    fn set_op_operand(&mut self, kind_message: &str) -> Option<ArrayEntry> {
        let operand = if let Token::Ident(name, _) = self.peek_token() {
            let arr = self.find_array(&name);
            if arr.is_none() {
                self.report_error(kind_message.to_string());
            }
            arr
        } else {
            let message = format!(
                "array identifier expected but found {}.",
                self.peek()
            );
            self.report_error(message);
            None
        };
        self.advance();
        operand
    }

    /// IDENT ":=" arrExpression — in-place element-wise assignment.
    ///
    /// Phase one evaluates the array expression once per index, leaving
    /// one value on the machine stack per element; phase two pops them
    /// back into the destination from the last index down. All reads
    /// finish before the first write, which is what makes shifts of an
    /// array onto itself well defined.
    fn elementwise_assignment(&mut self, dest: ArrayEntry) {
        self.gen.emit(Instruction::Push(0));
        self.gen.emit(Instruction::Store(scratch::INDEX));
        // Save the destination size; every operand is checked against it
        self.gen.emit(Instruction::Load(dest.size_cell));
        self.gen.emit(Instruction::Store(scratch::CURSOR));

        let eval_loop = self.gen.current_address();
        self.arr_expression();
        self.gen.emit(Instruction::Load(scratch::INDEX));
        self.gen.emit(Instruction::Push(1));
        self.gen.emit(Instruction::Add);
        self.gen.emit(Instruction::Dup);
        self.gen.emit(Instruction::Store(scratch::INDEX));
        self.gen.emit(Instruction::Load(scratch::CURSOR));
        self.gen.emit(Instruction::Compare(Cmp::Lt));
        self.gen.emit(Instruction::JumpYes(eval_loop));

        // Step back to the last index and store top-down
        self.gen.emit(Instruction::Load(scratch::INDEX));
        self.gen.emit(Instruction::Push(1));
        self.gen.emit(Instruction::Sub);
        self.gen.emit(Instruction::Store(scratch::INDEX));

        let store_loop = self.gen.current_address();
        self.gen.emit(Instruction::Load(scratch::INDEX));
        self.gen.emit(Instruction::BStore(dest.base));
        self.gen.emit(Instruction::Load(scratch::INDEX));
        self.gen.emit(Instruction::Push(1));
        self.gen.emit(Instruction::Sub);
        self.gen.emit(Instruction::Dup);
        self.gen.emit(Instruction::Store(scratch::INDEX));
        self.gen.emit(Instruction::Push(0));
        self.gen.emit(Instruction::Compare(Cmp::Ge));
        self.gen.emit(Instruction::JumpYes(store_loop));
    }

    /// ifStmt := "if" relation "then" stmtList ("else" stmtList)? "fi"
    fn if_statement(&mut self) {
        self.relation();
        // Target unknown until the then-block is generated
        let jump_no = self.gen.reserve();

        self.must_be(&Token::Then(self.current_location()));
        self.statement_list();

        if self.match_token(&Token::Else(self.current_location())) {
            // Reserve the jump past the else-block, then route the false
            // branch to the else-block's start
            let jump_out = self.gen.reserve();
            self.gen.emit_at(
                jump_no,
                Instruction::JumpNo(self.gen.current_address()),
            );
            self.statement_list();
            self.gen.emit_at(
                jump_out,
                Instruction::Jump(self.gen.current_address()),
            );
        } else {
            self.gen.emit_at(
                jump_no,
                Instruction::JumpNo(self.gen.current_address()),
            );
        }

        self.must_be(&Token::Fi(self.current_location()));
    }

    /// whileStmt := "while" relation "do" stmtList "od"
    fn while_statement(&mut self) {
        let condition_address = self.gen.current_address();
        self.relation();
        let jump_no = self.gen.reserve();

        self.must_be(&Token::Do(self.current_location()));
        self.statement_list();
        self.must_be(&Token::Od(self.current_location()));

        self.gen.emit(Instruction::Jump(condition_address));
        self.gen.emit_at(
            jump_no,
            Instruction::JumpNo(self.gen.current_address()),
        );
    }

    /// writeStmt := "write" "(" expression ")"
    fn write_statement(&mut self) {
        self.must_be(&Token::LParen(self.current_location()));
        self.expression();
        self.must_be(&Token::RParen(self.current_location()));
        self.gen.emit(Instruction::Print);
    }

    /// arrayDecl := "array" IDENT "[" NUMBER "]"
    ///
    /// Allocates the contiguous block plus size cell and initializes the
    /// size cell to the declared size. An invalid size reports an error
    /// and falls back to 1 so parsing can continue.
    fn array_declaration(&mut self) {
        let name = if let Token::Ident(name, _) = self.peek_token() {
            if self.find_variable(&name).is_some() {
                self.report_error(
                    "variable with such name already exists.".to_string(),
                );
            }
            Some(name)
        } else {
            self.report_error("identifier expected.".to_string());
            None
        };
        self.advance();

        self.must_be(&Token::LBracket(self.current_location()));
        let size = match self.peek_token() {
            Token::Number(n, _) if n > 0 => n as usize,
            _ => {
                self.report_error("positive number expected.".to_string());
                1
            }
        };
        self.advance();
        self.must_be(&Token::RBracket(self.current_location()));

        if let Some(name) = name {
            match self.add_array(&name, size) {
                None => {
                    self.report_error(
                        "redefining an existing array.".to_string(),
                    );
                }
                Some(arr) => {
                    self.gen.emit(Instruction::Push(size as i32));
                    self.gen.emit(Instruction::Store(arr.size_cell));
                }
            }
        }
    }

    /// deleteStmt := "delete" "(" IDENT ")"
    ///
    /// Logical shrink: when the current size is positive, decrement it and
    /// zero the newly excluded trailing element; at zero the statement is
    /// a no-op. Storage is never reclaimed.
    fn delete_statement(&mut self) {
        self.match_token(&Token::LParen(self.current_location()));

        if let Token::Ident(name, _) = self.peek_token() {
            let arr = self.find_array(&name);
            if arr.is_none() {
                self.report_error(format!("Unknown array {}.", name));
            }
            self.advance();
            self.match_token(&Token::RParen(self.current_location()));

            if let Some(arr) = arr {
                self.gen.emit(Instruction::Load(arr.size_cell));
                self.gen.emit(Instruction::Push(0));
                self.gen.emit(Instruction::Compare(Cmp::Gt));
                let skip = self.gen.reserve();
                self.gen.emit(Instruction::Load(arr.size_cell));
                self.gen.emit(Instruction::Push(1));
                self.gen.emit(Instruction::Sub);
                self.gen.emit(Instruction::Store(arr.size_cell));
                self.gen.emit(Instruction::Push(0));
                self.gen.emit(Instruction::Load(arr.size_cell));
                self.gen.emit(Instruction::BStore(arr.base));
                self.gen.emit_at(
                    skip,
                    Instruction::JumpNo(self.gen.current_address()),
                );
            }
        } else {
            self.report_error("identifier expected.".to_string());
        }
    }
}
