use crate::back::codegen::{compile, CodegenError};
use crate::back::interp::run;
use crate::front::parse::parse;

fn run_source(src: &str, args: &[i16]) -> i16 {
    let program = parse(src).expect("parse should succeed");
    let (code, symbols) = compile(&program).expect("compile should succeed");
    let main = symbols.get(&internment::Intern::new("main".to_string())).expect("main must exist");
    run(&code, main.entry, args).expect("run should succeed")
}

#[test]
fn s1_literal_return() {
    let src = "fn main() -> int32 { return 42; }";
    assert_eq!(run_source(src, &[]), 42);
}

#[test]
fn s2_print_and_return() {
    let src = "fn main() -> int32 { printNum(4000 + 1042); return 7; }";
    assert_eq!(run_source(src, &[]), 7);
}

#[test]
fn s3_while_loop_counting() {
    let src = r#"
        fn main(n: int32) -> int32 {
            int32 x = 0;
            while (x < n) {
                printNum(x);
                x = x + 1;
            }
            return x;
        }
    "#;
    assert_eq!(run_source(src, &[3]), 3);
}

#[test]
fn s4_recursion() {
    let src = r#"
        fn countdown(n: int32) -> int32 {
            int32 again = 0 < n;
            while (0 < again) {
                countdown(n + -1);
                again = 0;
            }
            return n;
        }

        fn main() -> int32 {
            return countdown(3);
        }
    "#;
    assert_eq!(run_source(src, &[]), 3);
}

#[test]
fn s5_nested_call_returning_value() {
    let src = r#"
        fn add3(a: int32, b: int32, c: int32) -> int32 {
            return a + b + c;
        }

        fn main() -> int32 {
            return add3(1, 2, 4);
        }
    "#;
    assert_eq!(run_source(src, &[]), 7);
}

#[test]
fn s6_less_than_branch() {
    let src = "fn main() -> int32 { return 3 < 5; }";
    assert_eq!(run_source(src, &[]), 1);

    let src_false = "fn main() -> int32 { return 5 < 3; }";
    assert_eq!(run_source(src_false, &[]), 0);
}

#[test]
fn forward_reference_between_functions() {
    // `main` (alphabetically after `helper`... and before it too, in this
    // case) calls a function compiled later in iteration order; the pending-
    // call backpatch must resolve it regardless of declaration order.
    let src = r#"
        fn main() -> int32 {
            return zzz_helper(10);
        }

        fn zzz_helper(x: int32) -> int32 {
            return x + 1;
        }
    "#;
    assert_eq!(run_source(src, &[]), 11);
}

#[test]
fn unknown_variable_is_a_compile_error() {
    let src = "fn main() -> int32 { return y; }";
    let program = parse(src).expect("parse should succeed");
    match compile(&program) {
        Err(CodegenError::UnknownVariable(_)) => {}
        other => panic!("expected UnknownVariable, got {other:?}"),
    }
}

#[test]
fn wrong_arity_is_a_compile_error() {
    let src = r#"
        fn takes_one(x: int32) -> int32 { return x; }
        fn main() -> int32 { return takes_one(1, 2); }
    "#;
    let program = parse(src).expect("parse should succeed");
    match compile(&program) {
        Err(CodegenError::ArityMismatch { expected: 1, found: 2, .. }) => {}
        other => panic!("expected ArityMismatch, got {other:?}"),
    }
}

#[test]
fn assign_to_parameter_is_a_compile_error() {
    let src = "fn main(x: int32) -> int32 { x = 1; return x; }";
    let program = parse(src).expect("parse should succeed");
    match compile(&program) {
        Err(CodegenError::AssignToParameter(_)) => {}
        other => panic!("expected AssignToParameter, got {other:?}"),
    }
}

#[test]
fn out_of_range_literal_is_a_compile_error_not_a_silent_wrap() {
    let src = "fn main() -> int32 { return 40000; }";
    let program = parse(src).expect("parse should succeed");
    match compile(&program) {
        Err(CodegenError::LiteralOutOfRange(_)) => {}
        other => panic!("expected LiteralOutOfRange, got {other:?}"),
    }
}

#[test]
fn absurdly_long_literal_is_a_compile_error_not_a_panic() {
    let src = "fn main() -> int32 { int32 x = 123456789012345678901234567890; return x; }";
    let program = parse(src).expect("parse should succeed");
    match compile(&program) {
        Err(CodegenError::LiteralOutOfRange(_)) => {}
        other => panic!("expected LiteralOutOfRange, got {other:?}"),
    }
}

#[test]
fn local_addressing_reads_back_what_it_wrote() {
    let src = r#"
        fn main() -> int32 {
            int32 a = 0;
            a = 1234;
            return a;
        }
    "#;
    assert_eq!(run_source(src, &[]), 1234);
}

#[test]
fn add_int_wraps_on_overflow() {
    let src = "fn main() -> int32 { return 32767 + 1; }";
    assert_eq!(run_source(src, &[]), -32768);
}
