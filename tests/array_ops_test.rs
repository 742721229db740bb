// End-to-end tests for the array operations: union, intersection,
// element-wise assignment, and delete.

use stacc::parser::parse::Parser;
use stacc::vm::{Vm, VmError};

fn run(source: &str) -> Vm {
    let code = Parser::new(source)
        .expect("lexing failed")
        .parse()
        .expect("compilation failed");
    let mut vm = Vm::new(code);
    vm.run().expect("execution failed");
    vm
}

fn run_expect_trap(source: &str) -> VmError {
    let code = Parser::new(source)
        .expect("lexing failed")
        .parse()
        .expect("compilation failed");
    let mut vm = Vm::new(code);
    vm.run().expect_err("execution unexpectedly succeeded")
}

#[test]
fn test_union_deduplicates() {
    let vm = run("begin \
                  array x[4]; array y[2]; array z[5]; \
                  x[0]:=1; x[1]:=2; x[2]:=2; x[3]:=3; \
                  y[0]:=2; y[1]:=4; \
                  z := [ x | y ]; \
                  write(z[0]); write(z[1]); write(z[2]); write(z[3]) \
                  end");
    assert_eq!(vm.output(), &[1, 2, 3, 4]);
    // z occupies cells 11..=15 with its size cell at 16
    assert_eq!(vm.memory_at(16), 4);
}

#[test]
fn test_union_deduplicates_within_one_source() {
    let vm = run("begin \
                  array x[2]; array y[1]; array z[2]; \
                  x[0]:=5; x[1]:=5; y[0]:=5; \
                  z := [ x | y ]; \
                  write(z[0]) \
                  end");
    assert_eq!(vm.output(), &[5]);
    // z: base 8, size cell 10
    assert_eq!(vm.memory_at(10), 1);
}

#[test]
fn test_intersection_follows_first_source_order() {
    let vm = run("begin \
                  array x[3]; array y[3]; array z[3]; \
                  x[0]:=1; x[1]:=2; x[2]:=3; \
                  y[0]:=3; y[1]:=2; y[2]:=4; \
                  z := [ x & y ]; \
                  write(z[0]); write(z[1]) \
                  end");
    assert_eq!(vm.output(), &[2, 3]);
    // z: base 11, size cell 14
    assert_eq!(vm.memory_at(14), 2);
}

#[test]
fn test_intersection_keeps_duplicates_from_first_source() {
    let vm = run("begin \
                  array x[2]; array y[1]; array z[2]; \
                  x[0]:=2; x[1]:=2; y[0]:=2; \
                  z := [ x & y ]; \
                  write(z[0]); write(z[1]) \
                  end");
    assert_eq!(vm.output(), &[2, 2]);
    assert_eq!(vm.memory_at(10), 2);
}

#[test]
fn test_set_ops_respect_deleted_elements() {
    // After delete, x is logically [1, 2]; the trailing 3 must not
    // participate in the union.
    let vm = run("begin \
                  array x[3]; array y[1]; array z[4]; \
                  x[0]:=1; x[1]:=2; x[2]:=3; delete(x); \
                  y[0]:=2; \
                  z := [ x | y ]; \
                  write(z[0]); write(z[1]) \
                  end");
    assert_eq!(vm.output(), &[1, 2]);
    // z: base 9, size cell 13
    assert_eq!(vm.memory_at(13), 2);
}

#[test]
fn test_result_larger_than_destination_traps() {
    let err = run_expect_trap(
        "begin \
         array x[3]; array y[2]; array z[4]; \
         x[0]:=1; x[1]:=2; x[2]:=3; \
         y[0]:=4; y[1]:=5; \
         z := [ x | y ] \
         end",
    );
    assert!(matches!(err, VmError::PcOutOfRange { .. }));
}

#[test]
fn test_consecutive_set_ops_reuse_the_working_buffer() {
    // The second result is smaller than the first; a stale working
    // buffer would corrupt it.
    let vm = run("begin \
                  array x[3]; array y[3]; array z[5]; \
                  x[0]:=1; x[1]:=2; x[2]:=3; \
                  y[0]:=3; y[1]:=4; y[2]:=5; \
                  z := [ x | y ]; \
                  z := [ x & y ]; \
                  write(z[0]) \
                  end");
    assert_eq!(vm.output(), &[3]);
    // z: base 11, size cell 16
    assert_eq!(vm.memory_at(16), 1);
}

#[test]
fn test_elementwise_addition() {
    let vm = run("begin \
                  array a[3]; array b[3]; \
                  a[0]:=1; a[1]:=2; a[2]:=3; \
                  b[0]:=10; b[1]:=20; b[2]:=30; \
                  a := a + b; \
                  write(a[0]); write(a[1]); write(a[2]) \
                  end");
    assert_eq!(vm.output(), &[11, 22, 33]);
}

#[test]
fn test_elementwise_onto_itself() {
    let vm = run("begin \
                  array a[2]; \
                  a[0]:=3; a[1]:=4; \
                  a := a + a; \
                  write(a[0]); write(a[1]) \
                  end");
    assert_eq!(vm.output(), &[6, 8]);
}

#[test]
fn test_elementwise_subtraction_order() {
    let vm = run("begin \
                  array a[2]; array b[2]; \
                  a[0]:=10; a[1]:=20; \
                  b[0]:=1; b[1]:=2; \
                  a := a - b; \
                  write(a[0]); write(a[1]) \
                  end");
    assert_eq!(vm.output(), &[9, 18]);
}

#[test]
fn test_elementwise_size_mismatch_traps() {
    let err = run_expect_trap(
        "begin \
         array a[3]; array b[2]; \
         a := a + b \
         end",
    );
    assert!(matches!(err, VmError::PcOutOfRange { .. }));
}

#[test]
fn test_delete_shrinks_and_zeroes_trailing_element() {
    let vm = run("begin \
                  array a[3]; \
                  a[0]:=7; a[1]:=8; a[2]:=9; \
                  delete(a); \
                  write(a[0]); write(a[1]) \
                  end");
    assert_eq!(vm.output(), &[7, 8]);
    // a: base 3, size cell 6
    assert_eq!(vm.memory_at(6), 2);
    assert_eq!(vm.memory_at(5), 0);
}

#[test]
fn test_delete_past_empty_is_a_no_op() {
    let vm = run("begin \
                  array a[2]; \
                  delete(a); delete(a); delete(a) \
                  end");
    // a: base 3, size cell 5; the size never goes negative
    assert_eq!(vm.memory_at(5), 0);
}

#[test]
fn test_access_beyond_live_size_traps() {
    let err = run_expect_trap(
        "begin \
         array a[2]; \
         a[0]:=1; a[1]:=2; \
         delete(a); \
         write(a[1]) \
         end",
    );
    assert!(matches!(err, VmError::PcOutOfRange { .. }));
}
