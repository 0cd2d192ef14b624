// ABOUTME: Compiler walking the AST and emitting bytecode into scoped buffers

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Expr, Oper, Program};
use crate::builtins::BUILTINS;
use crate::bytecode::{make, Instructions, Opcode};
use crate::config::MAX_LOCALS;
use crate::error::{CompileError, ARITY_AT_LEAST_ONE, ARITY_ONE, ARITY_TWO};
use crate::modules::ModuleLoader;
use crate::symbols::{Symbol, SymbolScope, SymbolTable};
use crate::value::{Function, Value};

#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Opcode,
    position: usize,
}

/// One instruction buffer: the root block or a function body. Tracks the two
/// most recent instructions for the trailing-Pop peephole.
#[derive(Default)]
struct CompilationScope {
    instructions: Vec<u8>,
    last: Option<EmittedInstruction>,
    previous: Option<EmittedInstruction>,
    anchor_line: u32,
}

/// Everything the loader needs to build a `Module` out of a compilation.
pub struct CompiledUnit {
    pub instructions: Instructions,
    pub consts: Vec<Value>,
    pub num_globals: usize,
    pub exports: HashMap<String, usize>,
}

pub struct Compiler {
    consts: Vec<Value>,
    symtab: Rc<RefCell<SymbolTable>>,
    scopes: Vec<CompilationScope>,
}

impl Compiler {
    pub fn new() -> Self {
        let symtab = SymbolTable::new();
        {
            let mut table = symtab.borrow_mut();
            for (ix, builtin) in BUILTINS.iter().enumerate() {
                table.define_builtin(ix, builtin.name);
            }
        }
        Compiler {
            consts: Vec::new(),
            symtab,
            scopes: vec![CompilationScope::default()],
        }
    }

    /// Continue a previous compilation: the REPL threads its symbol table and
    /// constant pool through every line.
    pub fn new_with_state(symtab: Rc<RefCell<SymbolTable>>, consts: Vec<Value>) -> Self {
        Compiler {
            consts,
            symtab,
            scopes: vec![CompilationScope::default()],
        }
    }

    pub fn symtab(&self) -> Rc<RefCell<SymbolTable>> {
        self.symtab.clone()
    }

    /// Compile a whole program into the root scope. Imports are processed
    /// first, then the remaining forms as statements, then a final `Return`
    /// so a module body runs like any other function.
    pub fn compile_program(
        &mut self,
        program: &Program,
        loader: &mut ModuleLoader,
    ) -> Result<(), CompileError> {
        for form in &program.forms {
            if let Expr::Import {
                path,
                alias,
                symbols,
                ..
            } = form
            {
                self.compile_import(path, alias.as_deref(), symbols, loader)?;
            }
        }
        for form in &program.forms {
            if matches!(form, Expr::Import { .. }) {
                continue;
            }
            self.anchor(form);
            self.compile(form, false, false)?;
        }
        self.emit(Opcode::Return, &[]);
        Ok(())
    }

    /// Finish the root scope and hand the pieces to the module loader.
    pub fn finish(mut self) -> CompiledUnit {
        let scope = self.scopes.pop().expect("root scope");
        let table = self.symtab.borrow();
        CompiledUnit {
            instructions: scope.instructions.into(),
            consts: self.consts,
            num_globals: table.num_definitions,
            exports: table.exported_globals(),
        }
    }

    // ========================================================================
    // Expression compilation
    // ========================================================================

    /// Compile one expression. `managed` keeps the result on the stack for
    /// the caller; `is_tail` marks the enclosing function's tail position.
    fn compile(&mut self, expr: &Expr, managed: bool, is_tail: bool) -> Result<(), CompileError> {
        match expr {
            Expr::Int { value, .. } => {
                let ix = self.add_const(Value::Int(*value));
                self.emit(Opcode::Const, &[ix]);
                self.pop_unmanaged(managed);
            }
            Expr::Float { value, .. } => {
                let ix = self.add_const(Value::Float(*value));
                self.emit(Opcode::Const, &[ix]);
                self.pop_unmanaged(managed);
            }
            Expr::Str { value, .. } => {
                let ix = self.add_const(Value::string(value.as_str()));
                self.emit(Opcode::Const, &[ix]);
                self.pop_unmanaged(managed);
            }
            Expr::Bool { value, .. } => {
                self.emit(if *value { Opcode::True } else { Opcode::False }, &[]);
                self.pop_unmanaged(managed);
            }
            Expr::Null { .. } => {
                self.emit(Opcode::Null, &[]);
                self.pop_unmanaged(managed);
            }
            Expr::Ident { module, name, .. } => {
                let symbol = self.resolve(module.as_deref(), name)?;
                self.load_symbol(&symbol);
                self.pop_unmanaged(managed);
            }
            Expr::ListLit { items, .. } => {
                for item in items {
                    self.compile(item, true, false)?;
                }
                self.emit(Opcode::List, &[items.len()]);
                self.pop_unmanaged(managed);
            }
            Expr::Block { forms, .. } => self.compile_block(forms, managed, is_tail)?,
            Expr::Oper { op, operands, .. } => {
                self.compile_operator(*op, operands)?;
                self.pop_unmanaged(managed);
            }
            Expr::Call { callee, args, .. } => {
                match callee.as_ref() {
                    Expr::Ident { module, name, .. } => {
                        let symbol = self.resolve(module.as_deref(), name)?;
                        self.load_symbol(&symbol);
                    }
                    other => self.compile(other, true, false)?,
                }
                for arg in args {
                    self.compile(arg, true, false)?;
                }
                let op = if is_tail { Opcode::TailCall } else { Opcode::Call };
                self.emit(op, &[args.len()]);
                self.pop_unmanaged(managed);
            }
            Expr::Fn {
                name, params, body, ..
            } => self.compile_fn(name.as_deref(), params, body, managed)?,
            Expr::Let {
                module,
                name,
                value,
                ..
            } => {
                if let Some(module) = module {
                    return Err(CompileError::QualifiedLet {
                        name: format!("{}:{}", module, name),
                    });
                }
                let symbol = self.symtab.borrow_mut().define(name)?;
                self.compile(value, true, false)?;
                self.emit_set(&symbol);
                self.load_symbol(&symbol);
                self.pop_unmanaged(managed);
            }
            Expr::Cond {
                cond, then, alt, ..
            } => {
                self.compile(cond, true, false)?;
                let jump_if_false = self.emit(Opcode::JumpIfFalse, &[0xFFFF]);
                self.compile(then, managed, is_tail)?;
                let jump = self.emit(Opcode::Jump, &[0xFFFF]);

                self.patch_jump(jump_if_false);
                match alt {
                    Some(alt) => self.compile(alt, managed, is_tail)?,
                    None => {
                        self.emit(Opcode::Null, &[]);
                        self.pop_unmanaged(managed);
                    }
                }
                self.patch_jump(jump);
            }
            Expr::Accessor { path, target, .. } => {
                let get = self.resolve(None, "get")?;
                self.compile_access_chain(&get, path, target, is_tail)?;
                self.pop_unmanaged(managed);
            }
            Expr::Raise { value, .. } => {
                self.compile(value, true, false)?;
                self.emit(Opcode::Raise, &[]);
            }
            Expr::Breakpoint { loc } => {
                self.emit(
                    Opcode::Breakpoint,
                    &[clamp_u16(loc.line), clamp_u16(loc.col)],
                );
                if managed {
                    self.emit(Opcode::Null, &[]);
                }
            }
            Expr::Import { .. } => {
                return Err(CompileError::UnsupportedForm {
                    form: "import below top level",
                })
            }
            Expr::Try { .. } => return Err(CompileError::UnsupportedForm { form: "try" }),
            Expr::Switch { .. } => return Err(CompileError::UnsupportedForm { form: "switch" }),
        }
        Ok(())
    }

    /// A block forwards `managed` and `isTail` only to its last child.
    fn compile_block(
        &mut self,
        forms: &[Expr],
        managed: bool,
        is_tail: bool,
    ) -> Result<(), CompileError> {
        let Some((last, init)) = forms.split_last() else {
            self.emit(Opcode::Null, &[]);
            self.pop_unmanaged(managed);
            return Ok(());
        };
        for form in init {
            self.anchor(form);
            self.compile(form, false, false)?;
        }
        self.anchor(last);
        self.compile(last, managed, is_tail)
    }

    fn compile_operator(&mut self, op: Oper, operands: &[Expr]) -> Result<(), CompileError> {
        check_operator_arity(op, operands.len())?;
        for operand in operands {
            self.compile(operand, true, false)?;
        }
        match op {
            Oper::Add => self.emit(Opcode::Add, &[operands.len()]),
            Oper::Mul => self.emit(Opcode::Mul, &[operands.len()]),
            Oper::And => self.emit(Opcode::And, &[operands.len()]),
            Oper::Or => self.emit(Opcode::Or, &[operands.len()]),
            Oper::Sub => self.emit(Opcode::Sub, &[]),
            Oper::Div => self.emit(Opcode::Div, &[]),
            Oper::Mod => self.emit(Opcode::Mod, &[]),
            Oper::Eql => self.emit(Opcode::Eql, &[]),
            Oper::NotEql => self.emit(Opcode::NotEql, &[]),
            Oper::Lt => self.emit(Opcode::LessThan, &[]),
            Oper::LtEq => self.emit(Opcode::LessEqual, &[]),
            Oper::Gt => self.emit(Opcode::GreaterThan, &[]),
            Oper::GtEq => self.emit(Opcode::GreaterEqual, &[]),
            Oper::Not => self.emit(Opcode::Not, &[]),
        };
        Ok(())
    }

    fn compile_fn(
        &mut self,
        name: Option<&str>,
        params: &[String],
        body: &[Expr],
        managed: bool,
    ) -> Result<(), CompileError> {
        // A named function binds in the enclosing scope before its body
        // compiles; recursion goes through the Function self-slot instead.
        let fn_symbol = match name {
            Some(name) => Some(self.symtab.borrow_mut().define(name)?),
            None => None,
        };

        self.enter_scope();
        if let Some(name) = name {
            self.symtab.borrow_mut().define_function_name(name);
        }
        for param in params {
            self.symtab.borrow_mut().define(param)?;
        }

        self.compile_block(body, true, true)?;
        if self.last_instruction_is(Opcode::Pop) {
            self.remove_last();
        }
        self.emit(Opcode::Return, &[]);

        let (instructions, num_locals, free_symbols) = self.leave_scope();
        if num_locals > MAX_LOCALS {
            return Err(CompileError::TooManyLocals { limit: MAX_LOCALS });
        }

        for free in &free_symbols {
            self.load_symbol(free);
        }
        let func = Function {
            name: name.map(str::to_string),
            params: params.to_vec(),
            num_locals,
            instructions: instructions.into(),
        };
        let const_ix = self.add_const(Value::Function(Rc::new(func)));
        self.emit(Opcode::Closure, &[const_ix, free_symbols.len()]);

        match fn_symbol {
            Some(symbol) => {
                self.emit_set(&symbol);
                if managed {
                    self.load_symbol(&symbol);
                }
            }
            None => self.pop_unmanaged(managed),
        }
        Ok(())
    }

    /// `(.a.b x)` compiles as `(get (get x "a") "b")`.
    fn compile_access_chain(
        &mut self,
        get: &Symbol,
        path: &[String],
        target: &Expr,
        is_tail: bool,
    ) -> Result<(), CompileError> {
        let (key, prefix) = path.split_last().expect("accessor path is non-empty");
        self.load_symbol(get);
        if prefix.is_empty() {
            self.compile(target, true, false)?;
        } else {
            self.compile_access_chain(get, prefix, target, false)?;
        }
        let key_ix = self.add_const(Value::string(key.as_str()));
        self.emit(Opcode::Const, &[key_ix]);
        let op = if is_tail { Opcode::TailCall } else { Opcode::Call };
        self.emit(op, &[2]);
        Ok(())
    }

    /// Resolve the target module, register its exports under the alias, and
    /// emit the load. Runs before the program body compiles.
    fn compile_import(
        &mut self,
        path: &str,
        alias: Option<&str>,
        symbols: &[String],
        loader: &mut ModuleLoader,
    ) -> Result<(), CompileError> {
        let module = loader.load(path)?;
        let const_ix = self.add_const(Value::Module(module.clone()));
        let alias = alias.unwrap_or(&module.name);

        if symbols.is_empty() {
            for (name, global_ix) in &module.exports {
                self.symtab
                    .borrow_mut()
                    .define_module_member(alias, name, const_ix, *global_ix);
            }
        } else {
            for name in symbols {
                let global_ix =
                    module
                        .exports
                        .get(name)
                        .ok_or_else(|| CompileError::UnknownExport {
                            name: module.name.clone(),
                            symbol: name.clone(),
                        })?;
                self.symtab
                    .borrow_mut()
                    .define_module_member(alias, name, const_ix, *global_ix);
            }
        }

        self.emit(Opcode::LoadModule, &[const_ix]);
        self.emit(Opcode::Pop, &[]);
        Ok(())
    }

    // ========================================================================
    // Symbols
    // ========================================================================

    fn resolve(&mut self, module: Option<&str>, name: &str) -> Result<Symbol, CompileError> {
        let key = match module {
            Some(module) => format!("{}:{}", module, name),
            None => name.to_string(),
        };
        self.symtab
            .borrow_mut()
            .resolve(&key)
            .ok_or(CompileError::UndefinedSymbol { name: key })
    }

    fn load_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Opcode::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Opcode::GetLocal, &[symbol.index]),
            SymbolScope::Builtin => self.emit(Opcode::GetBuiltin, &[symbol.index]),
            SymbolScope::Free => self.emit(Opcode::GetFree, &[symbol.index]),
            SymbolScope::Function => self.emit(Opcode::CurrentClosure, &[]),
            SymbolScope::Module => {
                self.emit(Opcode::GetModule, &[symbol.module_index, symbol.index])
            }
        };
    }

    fn emit_set(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Opcode::SetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Opcode::SetLocal, &[symbol.index]),
            _ => unreachable!("only globals and locals are assignable"),
        };
    }

    // ========================================================================
    // Scopes and emission
    // ========================================================================

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        let outer = self.symtab.clone();
        self.symtab = SymbolTable::new_enclosed(outer);
    }

    fn leave_scope(&mut self) -> (Vec<u8>, usize, Vec<Symbol>) {
        let scope = self.scopes.pop().expect("scope underflow");
        let (num_locals, free_symbols) = {
            let table = self.symtab.borrow();
            (table.num_definitions, table.free_symbols.clone())
        };
        let outer = self
            .symtab
            .borrow()
            .outer
            .clone()
            .expect("nested scope has an outer table");
        self.symtab = outer;
        (scope.instructions, num_locals, free_symbols)
    }

    fn scope(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("at least the root scope")
    }

    fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let ins = make(op, operands);
        let scope = self.scope();
        let position = scope.instructions.len();
        scope.instructions.extend(ins);
        scope.previous = scope.last;
        scope.last = Some(EmittedInstruction {
            opcode: op,
            position,
        });
        position
    }

    fn pop_unmanaged(&mut self, managed: bool) {
        if !managed {
            self.emit(Opcode::Pop, &[]);
        }
    }

    fn last_instruction_is(&mut self, op: Opcode) -> bool {
        self.scope().last.map(|i| i.opcode) == Some(op)
    }

    fn remove_last(&mut self) {
        let scope = self.scope();
        if let Some(last) = scope.last {
            scope.instructions.truncate(last.position);
            scope.last = scope.previous;
            scope.previous = None;
        }
    }

    /// Point a previously emitted jump at the current position.
    fn patch_jump(&mut self, at: usize) {
        let target = self.scope().instructions.len() as u16;
        let scope = self.scope();
        scope.instructions[at + 1..at + 3].copy_from_slice(&target.to_be_bytes());
    }

    /// Emit a source anchor when the statement line changes.
    fn anchor(&mut self, form: &Expr) {
        let line = form.loc().line;
        if self.scope().anchor_line != line {
            self.scope().anchor_line = line;
            self.emit(Opcode::SrcAnchor, &[clamp_u16(line)]);
        }
    }

    fn add_const(&mut self, value: Value) -> usize {
        self.consts.push(value);
        self.consts.len() - 1
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}

fn clamp_u16(n: u32) -> usize {
    n.min(u16::MAX as u32) as usize
}

fn check_operator_arity(op: Oper, actual: usize) -> Result<(), CompileError> {
    let (expected, ok) = match op {
        Oper::Add | Oper::Mul | Oper::And | Oper::Or => (ARITY_AT_LEAST_ONE, actual >= 1),
        Oper::Not => (ARITY_ONE, actual == 1),
        _ => (ARITY_TWO, actual == 2),
    };
    if ok {
        return Ok(());
    }
    let name = match op {
        Oper::Add => "+",
        Oper::Sub => "-",
        Oper::Mul => "*",
        Oper::Div => "/",
        Oper::Mod => "%",
        Oper::Eql => "=",
        Oper::NotEql => "!=",
        Oper::Lt => "<",
        Oper::LtEq => "<=",
        Oper::Gt => ">",
        Oper::GtEq => ">=",
        Oper::And => "&",
        Oper::Or => "|",
        Oper::Not => "!",
    };
    Err(CompileError::OperatorArity {
        op: name,
        expected,
        actual,
    })
}
