//! Expression and relation parsing
//!
//! Every method here preserves the stack discipline of the emitted code:
//! an expression leaves exactly one value on top of the machine stack, and
//! a relation leaves exactly one boolean flag (1 or 0).
//!
//! Precedence is encoded in the call structure: `expression` handles the
//! additive level, `term` the multiplicative level, and `factor` the
//! atoms (literals, variables, indexed loads, unary minus, parentheses,
//! `read`). All binary operators are left-associative.
//!
//! The `arr_*` family mirrors `expression`/`term`/`factor` over array
//! elements addressed by the shared running index; it is only reachable
//! from the element-wise array assignment form (see `statements`).

use crate::codegen::{Cmp, Instruction};
use crate::parser::lexer::Token;
use crate::parser::parse::{scratch, Parser};

impl Parser {
    /// expression := term (("+"|"-") term)*
    pub(crate) fn expression(&mut self) {
        self.term();
        loop {
            if self.match_token(&Token::Plus(self.current_location())) {
                self.term();
                self.gen.emit(Instruction::Add);
            } else if self.match_token(&Token::Minus(self.current_location()))
            {
                self.term();
                self.gen.emit(Instruction::Sub);
            } else {
                break;
            }
        }
    }

    /// term := factor (("*"|"/") factor)*
    pub(crate) fn term(&mut self) {
        self.factor();
        loop {
            if self.match_token(&Token::Star(self.current_location())) {
                self.factor();
                self.gen.emit(Instruction::Mult);
            } else if self.match_token(&Token::Slash(self.current_location()))
            {
                self.factor();
                self.gen.emit(Instruction::Div);
            } else {
                break;
            }
        }
    }

    /// factor := NUMBER | IDENT | IDENT "[" expression "]" | "-" factor
    ///         | "(" expression ")" | "read"
    pub(crate) fn factor(&mut self) {
        let loc = self.current_location();

        if let Token::Number(value, _) = self.peek_token() {
            self.advance();
            self.gen.emit(Instruction::Push(value));
            return;
        }

        if let Token::Ident(name, _) = self.peek_token() {
            self.advance();
            if self.match_token(&Token::LBracket(self.current_location())) {
                // Indexed load with an inline two-sided bounds check
                match self.find_array(&name) {
                    None => {
                        self.report_error(format!("no such array: {}.", name));
                        // Still consume the malformed index so parsing can
                        // continue past the construct
                        self.expression();
                        self.must_be(&Token::RBracket(
                            self.current_location(),
                        ));
                    }
                    Some(arr) => {
                        self.expression();
                        self.must_be(&Token::RBracket(
                            self.current_location(),
                        ));
                        self.emit_bounds_check(arr.size_cell);
                        self.gen.emit(Instruction::BLoad(arr.base));
                    }
                }
            } else {
                if self.find_array(&name).is_some() {
                    self.report_error(format!(
                        "inappropriate use of array: {}.",
                        name
                    ));
                }
                let addr = self.find_or_add_variable(&name);
                self.gen.emit(Instruction::Load(addr));
            }
            return;
        }

        if self.match_token(&Token::Minus(loc)) {
            self.factor();
            self.gen.emit(Instruction::Invert);
        } else if self.match_token(&Token::LParen(loc)) {
            self.expression();
            self.must_be(&Token::RParen(self.current_location()));
        } else if self.match_token(&Token::Read(loc)) {
            self.gen.emit(Instruction::Input);
        } else {
            self.report_error("expression expected.".to_string());
        }
    }

    /// relation := expression cmpOp expression
    ///
    /// Exactly one comparison of two expressions; a condition without a
    /// comparison operator is an error.
    pub(crate) fn relation(&mut self) {
        self.expression();
        match self.peek_cmp() {
            Some(cmp) => {
                self.advance();
                self.expression();
                self.gen.emit(Instruction::Compare(cmp));
            }
            None => {
                self.report_error("comparison operator expected.".to_string());
            }
        }
    }

    fn peek_cmp(&self) -> Option<Cmp> {
        match self.peek() {
            Token::Eq(_) => Some(Cmp::Eq),
            Token::Ne(_) => Some(Cmp::Ne),
            Token::Lt(_) => Some(Cmp::Lt),
            Token::Gt(_) => Some(Cmp::Gt),
            Token::Le(_) => Some(Cmp::Le),
            Token::Ge(_) => Some(Cmp::Ge),
            _ => None,
        }
    }

    // ===== Element-wise array expressions =====

    /// arrExpression := arrTerm (("+"|"-") arrTerm)*
    pub(crate) fn arr_expression(&mut self) {
        self.arr_term();
        loop {
            if self.match_token(&Token::Plus(self.current_location())) {
                self.arr_term();
                self.gen.emit(Instruction::Add);
            } else if self.match_token(&Token::Minus(self.current_location()))
            {
                self.arr_term();
                self.gen.emit(Instruction::Sub);
            } else {
                break;
            }
        }
    }

    /// arrTerm := arrFactor (("*"|"/") arrFactor)*
    pub(crate) fn arr_term(&mut self) {
        self.arr_factor();
        loop {
            if self.match_token(&Token::Star(self.current_location())) {
                self.arr_factor();
                self.gen.emit(Instruction::Mult);
            } else if self.match_token(&Token::Slash(self.current_location()))
            {
                self.arr_factor();
                self.gen.emit(Instruction::Div);
            } else {
                break;
            }
        }
    }

    /// arrFactor := IDENT | "-" arrFactor | "(" arrExpression ")"
    ///
    /// An identifier names a whole array; its element at the shared
    /// running index is loaded. The emitted code first traps unless the
    /// array's size cell equals the saved size of the destination, so
    /// every operand of an element-wise assignment has the same length.
    pub(crate) fn arr_factor(&mut self) {
        let loc = self.current_location();

        if let Token::Ident(name, _) = self.peek_token() {
            match self.find_array(&name) {
                None => {
                    self.report_error(format!("Unknown array {}.", name));
                }
                Some(arr) => {
                    self.gen.emit(Instruction::Load(scratch::CURSOR));
                    self.gen.emit(Instruction::Load(arr.size_cell));
                    self.gen.emit(Instruction::Compare(Cmp::Eq));
                    let here = self.gen.current_address();
                    self.gen.emit(Instruction::JumpYes(here + 2));
                    self.gen.emit_trap();
                    self.gen.emit(Instruction::Load(scratch::INDEX));
                    self.gen.emit(Instruction::BLoad(arr.base));
                }
            }
            self.advance();
        } else if self.match_token(&Token::Minus(loc)) {
            self.arr_factor();
            self.gen.emit(Instruction::Invert);
        } else if self.match_token(&Token::LParen(loc)) {
            self.arr_expression();
            self.must_be(&Token::RParen(self.current_location()));
        } else {
            self.report_error("Array expected.".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_expression(source: &str) -> Vec<Instruction> {
        let mut p = Parser::new(source).expect("lexing failed");
        p.expression();
        assert!(p.errors.is_empty(), "unexpected errors: {:?}", p.errors);
        p.gen.code().to_vec()
    }

    #[test]
    fn test_literal() {
        assert_eq!(compile_expression("42"), vec![Instruction::Push(42)]);
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 evaluates the product first
        assert_eq!(
            compile_expression("1 + 2 * 3"),
            vec![
                Instruction::Push(1),
                Instruction::Push(2),
                Instruction::Push(3),
                Instruction::Mult,
                Instruction::Add,
            ]
        );
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(
            compile_expression("10 - 4 - 3"),
            vec![
                Instruction::Push(10),
                Instruction::Push(4),
                Instruction::Sub,
                Instruction::Push(3),
                Instruction::Sub,
            ]
        );
    }

    #[test]
    fn test_parentheses_override() {
        assert_eq!(
            compile_expression("2 * (3 + 4)"),
            vec![
                Instruction::Push(2),
                Instruction::Push(3),
                Instruction::Push(4),
                Instruction::Add,
                Instruction::Mult,
            ]
        );
    }

    #[test]
    fn test_unary_minus_binds_tighter_than_mul() {
        assert_eq!(
            compile_expression("-2 * 3"),
            vec![
                Instruction::Push(2),
                Instruction::Invert,
                Instruction::Push(3),
                Instruction::Mult,
            ]
        );
    }

    #[test]
    fn test_read() {
        assert_eq!(compile_expression("read"), vec![Instruction::Input]);
    }

    #[test]
    fn test_scalar_load() {
        let code = compile_expression("x + x");
        assert_eq!(
            code,
            vec![
                Instruction::Load(scratch::CELLS),
                Instruction::Load(scratch::CELLS),
                Instruction::Add,
            ]
        );
    }

    #[test]
    fn test_relation_emits_compare() {
        let mut p = Parser::new("1 < 2").expect("lexing failed");
        p.relation();
        assert!(p.errors.is_empty());
        assert_eq!(
            p.gen.code(),
            &[
                Instruction::Push(1),
                Instruction::Push(2),
                Instruction::Compare(Cmp::Lt),
            ]
        );
    }

    #[test]
    fn test_relation_requires_comparison() {
        let mut p = Parser::new("1 + 2").expect("lexing failed");
        p.relation();
        assert_eq!(p.errors.len(), 1);
        assert_eq!(p.errors[0].message, "comparison operator expected.");
    }

    #[test]
    fn test_unknown_array_index_reports_error() {
        let mut p = Parser::new("xs[0]").expect("lexing failed");
        p.expression();
        assert_eq!(p.errors.len(), 1);
        assert_eq!(p.errors[0].message, "no such array: xs.");
    }

    #[test]
    fn test_indexed_load_emits_bounds_check() {
        let mut p = Parser::new("xs[1]").expect("lexing failed");
        let arr = p.add_array("xs", 3).unwrap();
        p.expression();
        assert!(p.errors.is_empty());
        let code = p.gen.code();
        // index, two DUPs for the two-sided check, then the indexed load
        assert_eq!(code[0], Instruction::Push(1));
        assert_eq!(code[1], Instruction::Dup);
        assert_eq!(code[2], Instruction::Dup);
        assert_eq!(code[3], Instruction::Load(arr.size_cell));
        assert_eq!(code[4], Instruction::Compare(Cmp::Lt));
        assert_eq!(*code.last().unwrap(), Instruction::BLoad(arr.base));
    }

    #[test]
    fn test_array_used_as_scalar_is_an_error() {
        let mut p = Parser::new("xs + 1").expect("lexing failed");
        p.add_array("xs", 3).unwrap();
        p.expression();
        assert_eq!(p.errors.len(), 1);
        assert_eq!(p.errors[0].message, "inappropriate use of array: xs.");
    }
}
