//! Stack-machine instruction set and code buffer
//!
//! This module defines the target instruction set and [`CodeGen`], the
//! append-only instruction buffer the parser emits into:
//! - [`Instruction`]: one opcode with its operand, if any
//! - [`Cmp`]: the comparison sub-code carried by `COMPARE`
//! - [`CodeGen`]: emission, slot reservation, and address patching
//!
//! # Forward jumps
//!
//! A jump whose target is not yet known is emitted in two phases:
//! [`CodeGen::reserve`] appends a placeholder and returns its address, and
//! [`CodeGen::emit_at`] later overwrites it once the target is generated.
//! Every reserved slot must be patched before [`CodeGen::flush`].
//!
//! # Runtime traps
//!
//! Out-of-bounds array access and set-op capacity overflow compile to an
//! unconditional jump to one past the last instruction, an address the
//! executor treats as a fatal halt. The final address is only known once
//! the whole program has been generated, so trap slots are reserved during
//! emission and patched in `flush`.

use std::fmt;

/// Comparison sub-code for the `COMPARE` instruction.
///
/// The wire encoding assigns `=, !=, <, >, <=, >=` the codes `0..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Cmp {
    /// Numeric sub-code used in the instruction listing.
    pub fn code(self) -> i32 {
        match self {
            Cmp::Eq => 0,
            Cmp::Ne => 1,
            Cmp::Lt => 2,
            Cmp::Gt => 3,
            Cmp::Le => 4,
            Cmp::Ge => 5,
        }
    }

    /// Apply the comparison to a pair of operands.
    pub fn eval(self, left: i32, right: i32) -> bool {
        match self {
            Cmp::Eq => left == right,
            Cmp::Ne => left != right,
            Cmp::Lt => left < right,
            Cmp::Gt => left > right,
            Cmp::Le => left <= right,
            Cmp::Ge => left >= right,
        }
    }
}

/// One stack-machine instruction.
///
/// Addresses (`Load`, `Store`, `BLoad`, `BStore`) refer to the flat
/// virtual-machine memory; jump targets are absolute indices into the
/// instruction buffer. `BLoad`/`BStore` pop an index off the operand stack
/// and access `memory[base + index]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Stop,
    Push(i32),
    Pop,
    Dup,
    Load(usize),
    Store(usize),
    BLoad(usize),
    BStore(usize),
    Add,
    Sub,
    Mult,
    Div,
    Invert,
    Compare(Cmp),
    Jump(usize),
    JumpYes(usize),
    JumpNo(usize),
    Input,
    Print,
    /// Placeholder appended by [`CodeGen::reserve`]; must not survive
    /// a successful compilation.
    Reserved,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Stop => write!(f, "STOP"),
            Instruction::Push(n) => write!(f, "PUSH {}", n),
            Instruction::Pop => write!(f, "POP"),
            Instruction::Dup => write!(f, "DUP"),
            Instruction::Load(a) => write!(f, "LOAD {}", a),
            Instruction::Store(a) => write!(f, "STORE {}", a),
            Instruction::BLoad(a) => write!(f, "BLOAD {}", a),
            Instruction::BStore(a) => write!(f, "BSTORE {}", a),
            Instruction::Add => write!(f, "ADD"),
            Instruction::Sub => write!(f, "SUB"),
            Instruction::Mult => write!(f, "MULT"),
            Instruction::Div => write!(f, "DIV"),
            Instruction::Invert => write!(f, "INVERT"),
            Instruction::Compare(c) => write!(f, "COMPARE {}", c.code()),
            Instruction::Jump(a) => write!(f, "JUMP {}", a),
            Instruction::JumpYes(a) => write!(f, "JUMP_YES {}", a),
            Instruction::JumpNo(a) => write!(f, "JUMP_NO {}", a),
            Instruction::Input => write!(f, "INPUT"),
            Instruction::Print => write!(f, "PRINT"),
            Instruction::Reserved => write!(f, "<reserved>"),
        }
    }
}

/// Append-only instruction buffer with two-phase patching.
#[derive(Debug, Default)]
pub struct CodeGen {
    code: Vec<Instruction>,
    traps: Vec<usize>,
}

impl CodeGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction.
    pub fn emit(&mut self, instr: Instruction) {
        self.code.push(instr);
    }

    /// Append a placeholder and return its address for later patching.
    pub fn reserve(&mut self) -> usize {
        let addr = self.code.len();
        self.code.push(Instruction::Reserved);
        addr
    }

    /// Overwrite a previously reserved (or any) address.
    pub fn emit_at(&mut self, addr: usize, instr: Instruction) {
        self.code[addr] = instr;
    }

    /// Address of the next instruction to be appended.
    pub fn current_address(&self) -> usize {
        self.code.len()
    }

    /// Reserve a slot that `flush` will fill with a jump past the end of
    /// the program, the fatal-halt convention for runtime traps.
    pub fn emit_trap(&mut self) {
        let addr = self.reserve();
        self.traps.push(addr);
    }

    /// The emitted code so far, placeholders included.
    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    /// Finalize the buffer: patch every trap slot to jump one past the
    /// last instruction and hand the code over. Only called on a
    /// successful compilation.
    pub fn flush(mut self) -> Vec<Instruction> {
        let end = self.code.len();
        for addr in self.traps.drain(..) {
            self.code[addr] = Instruction::Jump(end);
        }
        debug_assert!(
            !self.code.contains(&Instruction::Reserved),
            "unpatched reserved slot in finalized code"
        );
        self.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_and_current_address() {
        let mut gen = CodeGen::new();
        assert_eq!(gen.current_address(), 0);
        gen.emit(Instruction::Push(5));
        gen.emit(Instruction::Print);
        assert_eq!(gen.current_address(), 2);
        assert_eq!(gen.code(), &[Instruction::Push(5), Instruction::Print]);
    }

    #[test]
    fn test_reserve_and_patch() {
        let mut gen = CodeGen::new();
        gen.emit(Instruction::Push(1));
        let slot = gen.reserve();
        gen.emit(Instruction::Push(2));
        assert_eq!(gen.code()[slot], Instruction::Reserved);

        gen.emit_at(slot, Instruction::JumpNo(gen.current_address()));
        assert_eq!(gen.code()[slot], Instruction::JumpNo(3));
    }

    #[test]
    fn test_flush_patches_traps_past_end() {
        let mut gen = CodeGen::new();
        gen.emit(Instruction::Push(0));
        gen.emit_trap();
        gen.emit(Instruction::Stop);

        let code = gen.flush();
        assert_eq!(code[1], Instruction::Jump(3));
        assert_eq!(code.len(), 3);
    }

    #[test]
    fn test_compare_codes_match_wire_encoding() {
        assert_eq!(Cmp::Eq.code(), 0);
        assert_eq!(Cmp::Ne.code(), 1);
        assert_eq!(Cmp::Lt.code(), 2);
        assert_eq!(Cmp::Gt.code(), 3);
        assert_eq!(Cmp::Le.code(), 4);
        assert_eq!(Cmp::Ge.code(), 5);
    }

    #[test]
    fn test_compare_eval() {
        assert!(Cmp::Lt.eval(1, 2));
        assert!(!Cmp::Lt.eval(2, 2));
        assert!(Cmp::Ge.eval(2, 2));
        assert!(Cmp::Ne.eval(3, 4));
    }

    #[test]
    fn test_listing_format() {
        assert_eq!(Instruction::Push(5).to_string(), "PUSH 5");
        assert_eq!(Instruction::Compare(Cmp::Gt).to_string(), "COMPARE 3");
        assert_eq!(Instruction::JumpYes(17).to_string(), "JUMP_YES 17");
        assert_eq!(Instruction::Stop.to_string(), "STOP");
    }
}
