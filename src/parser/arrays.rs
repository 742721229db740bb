//! Code emission for the array set operations
//!
//! The set-op assignment `dest := [ src1 | src2 ]` (or `&`) compiles to an
//! iterative algorithm over three reserved scratch cells — outer index,
//! scan cursor, and accumulated result size — plus a working result
//! buffer placed at the current free-address frontier. The result is then
//! copied into the destination block and the working buffer is zeroed for
//! the next statement.
//!
//! Both algorithms are bounded by the *current* size cell of each input,
//! so elements logically removed by `delete` never participate.
//!
//! All loops pre-check their condition, so empty inputs contribute
//! nothing. Forward exits use reserved slots patched once the loop body
//! is emitted; back edges jump to recorded addresses.

use crate::codegen::{Cmp, Instruction};
use crate::parser::parse::{scratch, ArrayEntry, Parser};

/// The two array set operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SetOp {
    Union,
    Intersection,
}

impl Parser {
    /// One union pass: append every element of `src` not already present
    /// in the accumulated result (linear membership scan).
    ///
    /// The caller zeroes the outer index before each pass and the result
    /// size before the first, so running this for `src1` then `src2`
    /// yields `src1` deduplicated against itself followed by the new
    /// elements of `src2`.
    pub(crate) fn emit_union_pass(&mut self, src: ArrayEntry) {
        let result = self.free_address();

        let outer = self.gen.current_address();
        self.gen.emit(Instruction::Load(scratch::INDEX));
        self.gen.emit(Instruction::Load(src.size_cell));
        self.gen.emit(Instruction::Compare(Cmp::Lt));
        let exit = self.gen.reserve();

        // Fetch the candidate element
        self.gen.emit(Instruction::Load(scratch::INDEX));
        self.gen.emit(Instruction::BLoad(src.base));

        // Membership scan over the result accumulated so far
        self.gen.emit(Instruction::Push(0));
        self.gen.emit(Instruction::Store(scratch::CURSOR));
        let scan = self.gen.current_address();
        self.gen.emit(Instruction::Load(scratch::CURSOR));
        self.gen.emit(Instruction::Load(scratch::LEN));
        self.gen.emit(Instruction::Compare(Cmp::Lt));
        let append = self.gen.reserve();
        self.gen.emit(Instruction::Dup);
        self.gen.emit(Instruction::Load(scratch::CURSOR));
        self.gen.emit(Instruction::BLoad(result));
        self.gen.emit(Instruction::Compare(Cmp::Eq));
        let duplicate = self.gen.reserve();
        self.gen.emit(Instruction::Load(scratch::CURSOR));
        self.gen.emit(Instruction::Push(1));
        self.gen.emit(Instruction::Add);
        self.gen.emit(Instruction::Store(scratch::CURSOR));
        self.gen.emit(Instruction::Jump(scan));

        // Already present: drop the candidate
        self.gen.emit_at(
            duplicate,
            Instruction::JumpYes(self.gen.current_address()),
        );
        self.gen.emit(Instruction::Pop);
        let advance = self.gen.reserve();

        // Scan exhausted: append and grow the result
        self.gen
            .emit_at(append, Instruction::JumpNo(self.gen.current_address()));
        self.gen.emit(Instruction::Load(scratch::LEN));
        self.gen.emit(Instruction::BStore(result));
        self.gen.emit(Instruction::Load(scratch::LEN));
        self.gen.emit(Instruction::Push(1));
        self.gen.emit(Instruction::Add);
        self.gen.emit(Instruction::Store(scratch::LEN));

        // Next source element
        self.gen
            .emit_at(advance, Instruction::Jump(self.gen.current_address()));
        self.gen.emit(Instruction::Load(scratch::INDEX));
        self.gen.emit(Instruction::Push(1));
        self.gen.emit(Instruction::Add);
        self.gen.emit(Instruction::Store(scratch::INDEX));
        self.gen.emit(Instruction::Jump(outer));

        self.gen
            .emit_at(exit, Instruction::JumpNo(self.gen.current_address()));
    }

    /// Intersection: for each element of `src1`, scan `src2` and append
    /// on a match. Result order follows `src1`; duplicates in `src1` each
    /// re-test independently, so the result is not deduplicated.
    pub(crate) fn emit_intersection(
        &mut self,
        src1: ArrayEntry,
        src2: ArrayEntry,
    ) {
        let result = self.free_address();

        let outer = self.gen.current_address();
        self.gen.emit(Instruction::Load(scratch::INDEX));
        self.gen.emit(Instruction::Load(src1.size_cell));
        self.gen.emit(Instruction::Compare(Cmp::Lt));
        let exit = self.gen.reserve();

        self.gen.emit(Instruction::Load(scratch::INDEX));
        self.gen.emit(Instruction::BLoad(src1.base));

        // Scan src2 for a match
        self.gen.emit(Instruction::Push(0));
        self.gen.emit(Instruction::Store(scratch::CURSOR));
        let scan = self.gen.current_address();
        self.gen.emit(Instruction::Load(scratch::CURSOR));
        self.gen.emit(Instruction::Load(src2.size_cell));
        self.gen.emit(Instruction::Compare(Cmp::Lt));
        let not_found = self.gen.reserve();
        self.gen.emit(Instruction::Dup);
        self.gen.emit(Instruction::Load(scratch::CURSOR));
        self.gen.emit(Instruction::BLoad(src2.base));
        self.gen.emit(Instruction::Compare(Cmp::Eq));
        let found = self.gen.reserve();
        self.gen.emit(Instruction::Load(scratch::CURSOR));
        self.gen.emit(Instruction::Push(1));
        self.gen.emit(Instruction::Add);
        self.gen.emit(Instruction::Store(scratch::CURSOR));
        self.gen.emit(Instruction::Jump(scan));

        // No match anywhere in src2: drop the candidate
        self.gen.emit_at(
            not_found,
            Instruction::JumpNo(self.gen.current_address()),
        );
        self.gen.emit(Instruction::Pop);
        let advance = self.gen.reserve();

        // Match: append
        self.gen
            .emit_at(found, Instruction::JumpYes(self.gen.current_address()));
        self.gen.emit(Instruction::Load(scratch::LEN));
        self.gen.emit(Instruction::BStore(result));
        self.gen.emit(Instruction::Load(scratch::LEN));
        self.gen.emit(Instruction::Push(1));
        self.gen.emit(Instruction::Add);
        self.gen.emit(Instruction::Store(scratch::LEN));

        self.gen
            .emit_at(advance, Instruction::Jump(self.gen.current_address()));
        self.gen.emit(Instruction::Load(scratch::INDEX));
        self.gen.emit(Instruction::Push(1));
        self.gen.emit(Instruction::Add);
        self.gen.emit(Instruction::Store(scratch::INDEX));
        self.gen.emit(Instruction::Jump(outer));

        self.gen
            .emit_at(exit, Instruction::JumpNo(self.gen.current_address()));
    }

    /// Copy the working result into the destination block: trap if the
    /// result exceeds the destination's declared capacity, set the
    /// destination's size cell, then copy element by element.
    pub(crate) fn emit_copy_to_dest(&mut self, dest: ArrayEntry) {
        let result = self.free_address();

        self.gen.emit(Instruction::Load(scratch::LEN));
        self.gen.emit(Instruction::Push(dest.capacity as i32));
        self.gen.emit(Instruction::Compare(Cmp::Le));
        let here = self.gen.current_address();
        self.gen.emit(Instruction::JumpYes(here + 2));
        self.gen.emit_trap();

        self.gen.emit(Instruction::Load(scratch::LEN));
        self.gen.emit(Instruction::Store(dest.size_cell));

        self.gen.emit(Instruction::Push(0));
        self.gen.emit(Instruction::Store(scratch::CURSOR));
        let copy = self.gen.current_address();
        self.gen.emit(Instruction::Load(scratch::CURSOR));
        self.gen.emit(Instruction::Load(scratch::LEN));
        self.gen.emit(Instruction::Compare(Cmp::Lt));
        let exit = self.gen.reserve();
        self.gen.emit(Instruction::Load(scratch::CURSOR));
        self.gen.emit(Instruction::BLoad(result));
        self.gen.emit(Instruction::Load(scratch::CURSOR));
        self.gen.emit(Instruction::BStore(dest.base));
        self.gen.emit(Instruction::Load(scratch::CURSOR));
        self.gen.emit(Instruction::Push(1));
        self.gen.emit(Instruction::Add);
        self.gen.emit(Instruction::Store(scratch::CURSOR));
        self.gen.emit(Instruction::Jump(copy));

        self.gen
            .emit_at(exit, Instruction::JumpNo(self.gen.current_address()));
    }

    /// Zero the working buffer for indices `0..result size`, sanitizing
    /// it for the next set-op statement.
    pub(crate) fn emit_clear(&mut self) {
        let result = self.free_address();

        self.gen.emit(Instruction::Push(0));
        self.gen.emit(Instruction::Store(scratch::CURSOR));
        let loop_start = self.gen.current_address();
        self.gen.emit(Instruction::Load(scratch::CURSOR));
        self.gen.emit(Instruction::Load(scratch::LEN));
        self.gen.emit(Instruction::Compare(Cmp::Lt));
        let exit = self.gen.reserve();
        self.gen.emit(Instruction::Push(0));
        self.gen.emit(Instruction::Load(scratch::CURSOR));
        self.gen.emit(Instruction::BStore(result));
        self.gen.emit(Instruction::Load(scratch::CURSOR));
        self.gen.emit(Instruction::Push(1));
        self.gen.emit(Instruction::Add);
        self.gen.emit(Instruction::Store(scratch::CURSOR));
        self.gen.emit(Instruction::Jump(loop_start));

        self.gen
            .emit_at(exit, Instruction::JumpNo(self.gen.current_address()));
    }
}
