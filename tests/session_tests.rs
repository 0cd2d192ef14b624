// ABOUTME: REPL-style sessions: compiler state and globals persist per line

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use liss::compiler::Compiler;
use liss::error::{CompileError, LissError};
use liss::modules::{Module, ModuleEnv, ModuleLoader};
use liss::parser;
use liss::value::Value;
use liss::vm::Vm;

/// A line-at-a-time session sharing one symbol table, constant pool, and
/// global environment, the way the interactive REPL runs.
struct Session {
    symtab: Rc<std::cell::RefCell<liss::symbols::SymbolTable>>,
    consts: Vec<Value>,
    env: Rc<ModuleEnv>,
    loader: ModuleLoader,
    vm: Vm,
}

impl Session {
    fn new() -> Self {
        Session {
            symtab: Compiler::new().symtab(),
            consts: Vec::new(),
            env: ModuleEnv::new(Vec::new(), 0),
            loader: ModuleLoader::with_std_dir("/nonexistent-std"),
            vm: Vm::new(),
        }
    }

    fn eval(&mut self, line: &str) -> Result<Value, LissError> {
        let program = parser::parse(line)?;
        let mut compiler = Compiler::new_with_state(self.symtab.clone(), self.consts.clone());
        compiler.compile_program(&program, &mut self.loader)?;
        let unit = compiler.finish();

        self.consts = unit.consts.clone();
        self.env.consts.replace(unit.consts);
        {
            let mut globals = self.env.globals.borrow_mut();
            if globals.len() < unit.num_globals {
                globals.resize(unit.num_globals, Value::Null);
            }
        }

        let module = Rc::new(Module {
            name: "repl".to_string(),
            path: PathBuf::from("repl"),
            instructions: unit.instructions,
            exports: unit.exports,
            env: self.env.clone(),
            initialized: Cell::new(false),
        });
        Ok(self.vm.run(&module)?)
    }
}

#[test]
fn test_definitions_persist_across_lines() {
    let mut session = Session::new();
    session.eval("(let x 10)").unwrap();
    session.eval("(fn add_x [a] (+ a x))").unwrap();
    assert_eq!(session.eval("(add_x 5)").unwrap(), Value::Int(15));
}

#[test]
fn test_line_value_is_echoed() {
    let mut session = Session::new();
    assert_eq!(session.eval("(+ 1 2)").unwrap(), Value::Int(3));
    assert_eq!(session.eval("(let y 7)").unwrap(), Value::Int(7));
}

#[test]
fn test_failed_line_leaves_session_usable() {
    let mut session = Session::new();
    session.eval("(let x 1)").unwrap();
    assert!(session.eval("(/ x 0)").is_err());
    assert_eq!(session.eval("(+ x 1)").unwrap(), Value::Int(2));
}

#[test]
fn test_redefinition_across_lines_is_rejected() {
    let mut session = Session::new();
    session.eval("(let x 1)").unwrap();
    assert!(matches!(
        session.eval("(let x 2)"),
        Err(LissError::Compile(CompileError::Redefinition { .. }))
    ));
}

#[test]
fn test_closures_survive_across_lines() {
    let mut session = Session::new();
    session.eval("(fn make_adder [n] (fn [m] (+ n m)))").unwrap();
    session.eval("(let add3 (make_adder 3))").unwrap();
    assert_eq!(session.eval("(add3 4)").unwrap(), Value::Int(7));
}
