// ABOUTME: End-to-end scenarios through lex → parse → compile → run

use std::path::{Path, PathBuf};

use liss::error::{CompileError, LissError, RuntimeError};
use liss::modules::ModuleLoader;
use liss::value::Value;
use liss::vm::Vm;

fn std_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("std")
}

/// Run a program with the bundled std/ directory on the module path.
fn run(src: &str) -> Value {
    try_run(src).expect("program failed")
}

fn try_run(src: &str) -> Result<Value, LissError> {
    let mut loader = ModuleLoader::with_std_dir(std_dir());
    let module = loader.load_main(src, Path::new("scenario.liss"))?;
    let mut vm = Vm::new();
    Ok(vm.run(&module)?)
}

// ============================================================================
// The end-to-end scenarios
// ============================================================================

#[test]
fn test_scenario_1_variadic_add() {
    assert_eq!(run("(+ 1 2 3)"), Value::Int(6));
}

#[test]
fn test_scenario_2_factorial() {
    assert_eq!(
        run("(fn fact [n] (cond (= n 0) 1 (* n (fact (- n 1))))) (fact 10)"),
        Value::Int(3628800)
    );
}

#[test]
fn test_scenario_3_list_sum() {
    assert_eq!(
        run("(fn sum [acc l] (cond (is_empty? l) acc (sum (+ acc (head l)) (tail l)))) \
             (sum 0 (list 1 2 3 4 5))"),
        Value::Int(15)
    );
}

#[test]
fn test_scenario_4_dict() {
    assert_eq!(
        run(r#"(let d (dict)) (put d "a" 1) (put d "b" 2) (+ (get d "a") (get d "b"))"#),
        Value::Int(3)
    );
}

#[test]
fn test_scenario_5_std_strings_reverse() {
    assert_eq!(
        run(r#"(import "strings" ["reverse"]) (strings:reverse "hello")"#),
        Value::string("olleh")
    );
}

#[test]
fn test_scenario_6_regex_captures() {
    assert_eq!(
        run(r#"(let capts (match "(\\d+) (\\d+)" "42 17")) (get capts 2)"#),
        Value::string("17")
    );
}

#[test]
fn test_scenario_7_tail_recursion_100k() {
    assert_eq!(
        run("(fn count [n acc] (cond (= n 0) acc (count (- n 1) (+ acc 1)))) (count 100000 0)"),
        Value::Int(100000)
    );
}

// ============================================================================
// Standard library
// ============================================================================

#[test]
fn test_std_strings() {
    assert_eq!(
        run(r#"(import "strings") (strings:repeat "ab" 3)"#),
        Value::string("ababab")
    );
    assert_eq!(
        run(r#"(import "strings") (strings:join ", " ["a" "b" "c"])"#),
        Value::string("a, b, c")
    );
    assert_eq!(
        run(r#"(import "strings") (strings:starts_with? "hello" "he")"#),
        Value::Bool(true)
    );
    assert_eq!(
        run(r#"(import "strings") (strings:ends_with? "hello" "lo")"#),
        Value::Bool(true)
    );
}

#[test]
fn test_std_strings_private_helper_not_importable() {
    assert!(matches!(
        try_run(r#"(import "strings" ["_rev_acc"])"#),
        Err(LissError::Compile(CompileError::UnknownExport { .. }))
    ));
}

#[test]
fn test_std_lists_map_filter_reduce() {
    assert_eq!(
        run(r#"(import "lists") (lists:map (fn [x] (* x x)) [1 2 3])"#),
        Value::list(vec![Value::Int(1), Value::Int(4), Value::Int(9)])
    );
    assert_eq!(
        run(r#"(import "lists") (lists:filter (fn [x] (> x 1)) [1 2 3])"#),
        Value::list(vec![Value::Int(2), Value::Int(3)])
    );
    assert_eq!(
        run(r#"(import "lists") (lists:reduce (fn [acc x] (+ acc x)) 0 [1 2 3 4])"#),
        Value::Int(10)
    );
    assert_eq!(
        run(r#"(import "lists") (lists:reverse [1 2 3])"#),
        Value::list(vec![Value::Int(3), Value::Int(2), Value::Int(1)])
    );
    assert_eq!(
        run(r#"(import "lists") (lists:contains? [1 2 3] 2)"#),
        Value::Bool(true)
    );
}

#[test]
fn test_std_math() {
    assert_eq!(run(r#"(import "math") (math:abs -5)"#), Value::Int(5));
    assert_eq!(run(r#"(import "math") (math:min 2 7)"#), Value::Int(2));
    assert_eq!(run(r#"(import "math") (math:max 2 7)"#), Value::Int(7));
    assert_eq!(run(r#"(import "math") (math:pow 2 10)"#), Value::Int(1024));
    assert_eq!(run(r#"(import "math") (math:even? 4)"#), Value::Bool(true));
    assert_eq!(run(r#"(import "math") (math:odd? 4)"#), Value::Bool(false));
}

#[test]
fn test_two_std_modules_together() {
    assert_eq!(
        run(r#"(import "strings") (import "lists")
               (strings:join "-" (lists:map (fn [x] (str x)) [1 2 3]))"#),
        Value::string("1-2-3")
    );
}

// ============================================================================
// Module resolution through relative paths
// ============================================================================

#[test]
fn test_nested_relative_imports_follow_dot_paths() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir(tmp.path().join("sub")).unwrap();
    std::fs::write(
        tmp.path().join("a.liss"),
        r#"(import "./sub/b.liss" as b) (fn via_a [n] (b:twice n))"#,
    )
    .unwrap();
    // b's relative import resolves against sub/, not the main file's dir.
    std::fs::write(
        tmp.path().join("sub/b.liss"),
        r#"(import "./c.liss" as c) (fn twice [n] (c:double n))"#,
    )
    .unwrap();
    std::fs::write(tmp.path().join("sub/c.liss"), "(fn double [n] (* n 2))").unwrap();

    let mut loader = ModuleLoader::with_std_dir("/nonexistent-std");
    loader.push_dot_path(tmp.path());
    let module = loader
        .load_main(
            r#"(import "./a.liss" as a) (a:via_a 21)"#,
            &tmp.path().join("main.liss"),
        )
        .unwrap();
    assert_eq!(Vm::new().run(&module).unwrap(), Value::Int(42));
}

#[test]
fn test_missing_module_is_compile_error() {
    assert!(matches!(
        try_run(r#"(import "definitely_not_a_module")"#),
        Err(LissError::Compile(CompileError::ModuleNotFound { .. }))
    ));
}

// ============================================================================
// Property-style checks
// ============================================================================

#[test]
fn test_dict_reflects_latest_put_or_del() {
    // has? is true iff the most recent operation on the key was put.
    assert_eq!(
        run(r#"(let d (dict))
               (put d "k" 1) (del d "k") (put d "k" 2)
               (has? d "k")"#),
        Value::Bool(true)
    );
    assert_eq!(
        run(r#"(let d (dict))
               (put d "k" 1) (put d "k" 2) (del d "k")
               (has? d "k")"#),
        Value::Bool(false)
    );
}

#[test]
fn test_str_parse_round_trips() {
    assert_eq!(run("(parse_int (str 123456789))"), Value::Int(123456789));
    assert_eq!(run("(parse_int (str -42))"), Value::Int(-42));
    assert_eq!(run("(parse_float (str 2.5))"), Value::Float(2.5));
}

#[test]
fn test_integer_arithmetic_wraps() {
    assert_eq!(run("(+ 9223372036854775807 1)"), Value::Int(i64::MIN));
    assert_eq!(run("(* 9223372036854775807 2)"), Value::Int(-2));
}

#[test]
fn test_and_or_evaluate_all_operands() {
    // No short-circuit: a type error in a later operand always surfaces.
    assert!(matches!(
        try_run("(| true 1)"),
        Err(LissError::Runtime(_))
    ));
}

#[test]
fn test_regex_match_p_full_anchor_property() {
    assert_eq!(run(r#"(match? "\\d+" "123")"#), Value::Bool(true));
    assert_eq!(run(r#"(match? "\\d+" "12a")"#), Value::Bool(false));
    assert_eq!(run(r#"(match? (re "a*b") "aaab")"#), Value::Bool(true));
}

#[test]
fn test_regex_search_is_leftmost() {
    assert_eq!(
        run(r#"(get (match_ix "\\d+" "ab 12 cd 34") 0)"#),
        Value::list(vec![Value::Int(3), Value::Int(5)])
    );
}

// ============================================================================
// Errors surface with context
// ============================================================================

#[test]
fn test_runtime_error_carries_anchor() {
    let err = try_run("(let a 1)\n(/ a 0)").unwrap_err();
    assert!(err.to_string().contains("(at scenario.liss:2)"));
}

#[test]
fn test_raise_is_fatal() {
    let err = try_run(r#"(raise! "custom failure")"#).unwrap_err();
    assert!(err.to_string().contains("custom failure"));
}

#[test]
fn test_compile_error_for_unknown_symbol() {
    assert!(matches!(
        try_run("(frobnicate 1)"),
        Err(LissError::Compile(CompileError::UndefinedSymbol { .. }))
    ));
}

#[test]
fn test_runtime_error_in_imported_module_anchors_there() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("bad.liss"), "(let x 1)\n(/ x 0)").unwrap();
    let mut loader = ModuleLoader::with_std_dir(tmp.path());
    let module = loader
        .load_main(r#"(import "bad")"#, Path::new("scenario.liss"))
        .unwrap();
    let err = Vm::new().run(&module).unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, RuntimeError::Anchored { line: 2, .. }));
    assert!(message.contains("bad.liss:2"), "message: {}", message);
}
