//! Stack virtual machine
//!
//! Executes the instruction stream produced by the parser: a fetch-decode
//! loop over an operand stack and a flat, growable integer memory. Input
//! values are taken from a queue supplied up front; `PRINT` appends to an
//! output log inspected after the run.
//!
//! A program counter that leaves the code — which is how compiled bounds
//! and capacity traps are expressed — is the fatal
//! [`VmError::PcOutOfRange`]. All failures are reported as errors, never
//! panics.

use crate::codegen::Instruction;
use std::collections::VecDeque;
use std::fmt;

/// Default cap on executed instructions, a guard against runaway loops.
const DEFAULT_STEP_LIMIT: usize = 10_000_000;

/// Runtime errors that halt execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// The program counter left the instruction buffer (the compiled
    /// trap convention for invalid array access).
    PcOutOfRange { pc: usize },

    /// An instruction needed more operands than the stack held
    StackUnderflow { pc: usize },

    /// Division by zero
    DivisionByZero { pc: usize },

    /// A memory access resolved to a negative address
    MemoryFault { pc: usize },

    /// `INPUT` executed with an empty input queue
    InputExhausted { pc: usize },

    /// An unpatched placeholder reached the executor
    ReservedInstruction { pc: usize },

    /// The step limit was exceeded
    StepLimitExceeded { limit: usize },
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::PcOutOfRange { pc } => {
                write!(f, "program counter {} outside the program", pc)
            }
            VmError::StackUnderflow { pc } => {
                write!(f, "operand stack underflow at {}", pc)
            }
            VmError::DivisionByZero { pc } => {
                write!(f, "division by zero at {}", pc)
            }
            VmError::MemoryFault { pc } => {
                write!(f, "negative memory address at {}", pc)
            }
            VmError::InputExhausted { pc } => {
                write!(f, "input exhausted at {}", pc)
            }
            VmError::ReservedInstruction { pc } => {
                write!(f, "reserved instruction slot executed at {}", pc)
            }
            VmError::StepLimitExceeded { limit } => {
                write!(f, "step limit of {} instructions exceeded", limit)
            }
        }
    }
}

impl std::error::Error for VmError {}

/// Stack-machine executor
pub struct Vm {
    code: Vec<Instruction>,
    stack: Vec<i32>,
    memory: Vec<i32>,
    pc: usize,
    input: VecDeque<i32>,
    output: Vec<i32>,
    step_limit: usize,
}

impl Vm {
    pub fn new(code: Vec<Instruction>) -> Self {
        Self {
            code,
            stack: Vec::new(),
            memory: Vec::new(),
            pc: 0,
            input: VecDeque::new(),
            output: Vec::new(),
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Queue up values for `INPUT` to consume, front first.
    pub fn with_input(mut self, input: &[i32]) -> Self {
        self.input = input.iter().copied().collect();
        self
    }

    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Values printed so far, in order.
    pub fn output(&self) -> &[i32] {
        &self.output
    }

    /// Read a memory cell (0 for cells never written).
    pub fn memory_at(&self, addr: usize) -> i32 {
        self.memory.get(addr).copied().unwrap_or(0)
    }

    /// Run until `STOP` or a fatal error.
    pub fn run(&mut self) -> Result<(), VmError> {
        let mut steps = 0usize;

        loop {
            steps += 1;
            if steps > self.step_limit {
                return Err(VmError::StepLimitExceeded {
                    limit: self.step_limit,
                });
            }

            let pc = self.pc;
            let instr = *self
                .code
                .get(pc)
                .ok_or(VmError::PcOutOfRange { pc })?;
            self.pc += 1;

            match instr {
                Instruction::Stop => return Ok(()),
                Instruction::Push(value) => self.stack.push(value),
                Instruction::Pop => {
                    self.pop(pc)?;
                }
                Instruction::Dup => {
                    let top = *self
                        .stack
                        .last()
                        .ok_or(VmError::StackUnderflow { pc })?;
                    self.stack.push(top);
                }
                Instruction::Load(addr) => {
                    let value = self.memory_at(addr);
                    self.stack.push(value);
                }
                Instruction::Store(addr) => {
                    let value = self.pop(pc)?;
                    self.write(addr, value);
                }
                Instruction::BLoad(base) => {
                    let index = self.pop(pc)?;
                    let addr = self.resolve(base, index, pc)?;
                    let value = self.memory_at(addr);
                    self.stack.push(value);
                }
                Instruction::BStore(base) => {
                    let index = self.pop(pc)?;
                    let value = self.pop(pc)?;
                    let addr = self.resolve(base, index, pc)?;
                    self.write(addr, value);
                }
                Instruction::Add => self.binary(pc, |l, r| l.wrapping_add(r))?,
                Instruction::Sub => self.binary(pc, |l, r| l.wrapping_sub(r))?,
                Instruction::Mult => {
                    self.binary(pc, |l, r| l.wrapping_mul(r))?
                }
                Instruction::Div => {
                    let right = self.pop(pc)?;
                    let left = self.pop(pc)?;
                    if right == 0 {
                        return Err(VmError::DivisionByZero { pc });
                    }
                    self.stack.push(left.wrapping_div(right));
                }
                Instruction::Invert => {
                    let value = self.pop(pc)?;
                    self.stack.push(value.wrapping_neg());
                }
                Instruction::Compare(cmp) => {
                    let right = self.pop(pc)?;
                    let left = self.pop(pc)?;
                    self.stack.push(cmp.eval(left, right) as i32);
                }
                Instruction::Jump(target) => self.pc = target,
                Instruction::JumpYes(target) => {
                    if self.pop(pc)? != 0 {
                        self.pc = target;
                    }
                }
                Instruction::JumpNo(target) => {
                    if self.pop(pc)? == 0 {
                        self.pc = target;
                    }
                }
                Instruction::Input => {
                    let value = self
                        .input
                        .pop_front()
                        .ok_or(VmError::InputExhausted { pc })?;
                    self.stack.push(value);
                }
                Instruction::Print => {
                    let value = self.pop(pc)?;
                    self.output.push(value);
                }
                Instruction::Reserved => {
                    return Err(VmError::ReservedInstruction { pc });
                }
            }
        }
    }

    fn pop(&mut self, pc: usize) -> Result<i32, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow { pc })
    }

    fn binary(
        &mut self,
        pc: usize,
        op: impl Fn(i32, i32) -> i32,
    ) -> Result<(), VmError> {
        let right = self.pop(pc)?;
        let left = self.pop(pc)?;
        self.stack.push(op(left, right));
        Ok(())
    }

    fn resolve(
        &self,
        base: usize,
        index: i32,
        pc: usize,
    ) -> Result<usize, VmError> {
        usize::try_from(base as i64 + index as i64)
            .map_err(|_| VmError::MemoryFault { pc })
    }

    fn write(&mut self, addr: usize, value: i32) {
        if addr >= self.memory.len() {
            self.memory.resize(addr + 1, 0);
        }
        self.memory[addr] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::Cmp;
    use Instruction::*;

    fn run(code: Vec<Instruction>) -> Vm {
        let mut vm = Vm::new(code);
        vm.run().expect("execution failed");
        vm
    }

    #[test]
    fn test_arithmetic() {
        let vm = run(vec![Push(2), Push(3), Mult, Push(1), Add, Print, Stop]);
        assert_eq!(vm.output(), &[7]);
    }

    #[test]
    fn test_invert_and_sub() {
        let vm = run(vec![Push(10), Push(4), Sub, Invert, Print, Stop]);
        assert_eq!(vm.output(), &[-6]);
    }

    #[test]
    fn test_memory_and_indexed_access() {
        let vm = run(vec![
            Push(42),
            Store(5),
            Push(7),
            Push(2),
            BStore(10), // memory[12] = 7
            Push(2),
            BLoad(10),
            Load(5),
            Add,
            Print,
            Stop,
        ]);
        assert_eq!(vm.output(), &[49]);
        assert_eq!(vm.memory_at(12), 7);
    }

    #[test]
    fn test_compare_and_conditional_jump() {
        let vm = run(vec![
            Push(1),
            Push(2),
            Compare(Cmp::Lt),
            JumpYes(6),
            Push(0),
            Print,
            Push(1),
            Print,
            Stop,
        ]);
        assert_eq!(vm.output(), &[1]);
    }

    #[test]
    fn test_input_queue() {
        let mut vm =
            Vm::new(vec![Input, Input, Add, Print, Stop]).with_input(&[20, 22]);
        vm.run().unwrap();
        assert_eq!(vm.output(), &[42]);
    }

    #[test]
    fn test_input_exhausted() {
        let mut vm = Vm::new(vec![Input, Stop]);
        assert_eq!(vm.run(), Err(VmError::InputExhausted { pc: 0 }));
    }

    #[test]
    fn test_jump_past_end_is_fatal() {
        let mut vm = Vm::new(vec![Jump(5), Stop]);
        assert_eq!(vm.run(), Err(VmError::PcOutOfRange { pc: 5 }));
    }

    #[test]
    fn test_division_by_zero() {
        let mut vm = Vm::new(vec![Push(1), Push(0), Div, Stop]);
        assert_eq!(vm.run(), Err(VmError::DivisionByZero { pc: 2 }));
    }

    #[test]
    fn test_stack_underflow() {
        let mut vm = Vm::new(vec![Add, Stop]);
        assert_eq!(vm.run(), Err(VmError::StackUnderflow { pc: 0 }));
    }

    #[test]
    fn test_step_limit() {
        let mut vm = Vm::new(vec![Jump(0)]).with_step_limit(100);
        assert_eq!(vm.run(), Err(VmError::StepLimitExceeded { limit: 100 }));
    }

    #[test]
    fn test_unread_memory_is_zero() {
        let vm = run(vec![Load(99), Print, Stop]);
        assert_eq!(vm.output(), &[0]);
    }
}
