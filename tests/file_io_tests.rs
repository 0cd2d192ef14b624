// ABOUTME: File and console builtins exercised through whole programs

use std::path::Path;

use serial_test::serial;

use liss::modules::ModuleLoader;
use liss::value::Value;
use liss::vm::Vm;

/// Run a program whose module file lives in `dir`, so relative `fopen`
/// paths anchor there.
fn run_in_dir(dir: &Path, src: &str) -> Value {
    let mut loader = ModuleLoader::with_std_dir("/nonexistent-std");
    loader.push_dot_path(dir);
    let module = loader
        .load_main(src, &dir.join("prog.liss"))
        .expect("compile failed");
    Vm::new().run(&module).expect("program failed")
}

#[test]
fn test_fopen_resolves_relative_to_module_dir() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("data.txt"), "payload").unwrap();
    assert_eq!(
        run_in_dir(tmp.path(), r#"(fread_all (fopen "data.txt"))"#),
        Value::string("payload")
    );
}

#[test]
fn test_fopen_absolute_path() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("abs.txt");
    std::fs::write(&file, "absolute").unwrap();
    let src = format!(r#"(fread_all (fopen "{}"))"#, file.display());
    assert_eq!(run_in_dir(tmp.path(), &src), Value::string("absolute"));
}

#[test]
fn test_fclose_twice_is_silent() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("data.txt"), "x").unwrap();
    assert_eq!(
        run_in_dir(
            tmp.path(),
            r#"(let f (fopen "data.txt")) (fclose f) (fclose f)"#
        ),
        Value::Null
    );
}

#[test]
fn test_read_after_close_fails() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("data.txt"), "x").unwrap();
    let mut loader = ModuleLoader::with_std_dir("/nonexistent-std");
    loader.push_dot_path(tmp.path());
    let module = loader
        .load_main(
            r#"(let f (fopen "data.txt")) (fclose f) (fread_all f)"#,
            &tmp.path().join("prog.liss"),
        )
        .unwrap();
    assert!(Vm::new().run(&module).is_err());
}

#[test]
fn test_fopen_missing_file_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let mut loader = ModuleLoader::with_std_dir("/nonexistent-std");
    loader.push_dot_path(tmp.path());
    let module = loader
        .load_main(r#"(fopen "missing.txt")"#, &tmp.path().join("prog.liss"))
        .unwrap();
    let err = Vm::new().run(&module).unwrap_err();
    assert!(err.to_string().contains("fopen"));
}

#[test]
#[serial]
fn test_print_and_println_to_implicit_stdout() {
    let tmp = tempfile::tempdir().unwrap();
    // The hook injects the stdout handle; both forms return null.
    assert_eq!(
        run_in_dir(tmp.path(), r#"(print "a" 1 true)"#),
        Value::Null
    );
    assert_eq!(
        run_in_dir(tmp.path(), r#"(println "b" [1 2])"#),
        Value::Null
    );
}

#[test]
#[serial]
fn test_print_renders_strings_raw() {
    let tmp = tempfile::tempdir().unwrap();
    // A program can print and still produce a value.
    assert_eq!(
        run_in_dir(tmp.path(), r#"(println "out") (+ 1 2)"#),
        Value::Int(3)
    );
}
