// ABOUTME: Stack-based virtual machine: dispatch loop, frames, and linkage

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use crate::builtins::{Builtin, BUILTINS};
use crate::bytecode::{read_u16, read_u8, Opcode};
use crate::config::{MAX_FRAMES, STACK_SIZE};
use crate::error::RuntimeError;
use crate::modules::Module;
use crate::value::{Closure, FileHandle, Function, Value};

/// Call activation record. Frames are pooled: popped slots keep their
/// contents until the slot is reused or the VM shuts down.
struct Frame {
    closure: Rc<Closure>,
    ip: isize,
    bptr: usize,
}

/// A hook may rewrite a hookable builtin's arguments before invocation.
/// Installed at construction, read-only afterwards.
pub type Hook = fn(&Vm, &mut Vec<Value>) -> Result<(), RuntimeError>;

pub struct Vm {
    stack: Vec<Value>,
    sp: usize,
    frames: Vec<Frame>,
    frames_ix: usize,
    last_popped: Value,
    hooks: HashMap<&'static str, Hook>,
    open_files: Vec<Rc<std::cell::RefCell<FileHandle>>>,
    stdout: Value,
    /// Last source anchor: defining module and line.
    anchor: Option<(Rc<Module>, u16)>,
    debug: bool,
}

fn hook_inject_stdout(vm: &Vm, args: &mut Vec<Value>) -> Result<(), RuntimeError> {
    if args.first().is_none_or(|v| !v.is_file()) {
        args.insert(0, vm.stdout.clone());
    }
    Ok(())
}

fn hook_anchor_fopen(vm: &Vm, args: &mut Vec<Value>) -> Result<(), RuntimeError> {
    let anchored = match args.first() {
        Some(Value::Str(path)) => {
            let path = std::path::Path::new(path.as_ref());
            if path.is_relative() {
                let joined = vm.current_module_dir().join(path);
                Some(Value::string(joined.to_string_lossy().into_owned()))
            } else {
                None
            }
        }
        _ => None,
    };
    if let Some(path) = anchored {
        args[0] = path;
    }
    Ok(())
}

impl Vm {
    pub fn new() -> Self {
        Vm::with_debug(false)
    }

    pub fn with_debug(debug: bool) -> Self {
        let mut hooks: HashMap<&'static str, Hook> = HashMap::new();
        hooks.insert("print", hook_inject_stdout);
        hooks.insert("println", hook_inject_stdout);
        hooks.insert("fopen", hook_anchor_fopen);
        Vm {
            stack: vec![Value::Null; STACK_SIZE],
            sp: 0,
            frames: Vec::new(),
            frames_ix: 0,
            last_popped: Value::Null,
            hooks,
            open_files: Vec::new(),
            stdout: Value::File(Rc::new(std::cell::RefCell::new(FileHandle::Stdout))),
            anchor: None,
            debug,
        }
    }

    /// The value most recently discarded by `Pop`: a finished program's
    /// result.
    pub fn last_popped(&self) -> &Value {
        &self.last_popped
    }

    /// Execute a compiled module's top-level block and return the program
    /// result. Fatal errors carry the last source anchor.
    pub fn run(&mut self, module: &Rc<Module>) -> Result<Value, RuntimeError> {
        // A prior failed run may have left frames and stack slots behind.
        self.sp = 0;
        self.frames_ix = 0;
        self.anchor = None;
        for slot in &mut self.stack {
            *slot = Value::Null;
        }

        let root = Rc::new(Function {
            name: Some(module.name.clone()),
            params: Vec::new(),
            num_locals: 0,
            instructions: module.instructions.clone(),
        });
        let closure = Rc::new(Closure {
            func: root,
            free: Vec::new(),
            module: module.clone(),
        });
        module.initialized.set(true);

        self.push(Value::Closure(closure.clone()))?;
        let bptr = self.sp;
        self.push_frame(closure, bptr)?;

        match self.dispatch() {
            Ok(()) => {
                // The root block's own return value (always null) sits at
                // the stack base; drop it without touching last_popped.
                self.sp = 0;
                self.stack[0] = Value::Null;
                Ok(self.last_popped.clone())
            }
            Err(err) => Err(match &self.anchor {
                Some((module, line)) => err.at(&module.path.display().to_string(), *line),
                None => err,
            }),
        }
    }

    fn current_module_dir(&self) -> PathBuf {
        self.frames
            .get(self.frames_ix.wrapping_sub(1))
            .map(|f| f.closure.module.dir())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    // ========================================================================
    // Fetch-decode-execute
    // ========================================================================

    fn dispatch(&mut self) -> Result<(), RuntimeError> {
        // Hot state is cached locally and reloaded on every frame change.
        let mut closure = self.frames[self.frames_ix - 1].closure.clone();
        let mut ip = self.frames[self.frames_ix - 1].ip;

        loop {
            ip += 1;
            let (op, op1, op2) = {
                let ins: &[u8] = &closure.func.instructions;
                let pc = ip as usize;
                if pc >= ins.len() {
                    return Err(RuntimeError::general("vm", "instruction pointer out of range"));
                }
                let op = Opcode::from_byte(ins[pc]).ok_or_else(|| {
                    RuntimeError::general("vm", format!("invalid opcode {}", ins[pc]))
                })?;
                let widths = op.operand_widths();
                let mut operands = [0usize; 2];
                let mut at = pc + 1;
                for (k, width) in widths.iter().enumerate() {
                    operands[k] = match width {
                        2 => read_u16(ins, at) as usize,
                        _ => read_u8(ins, at) as usize,
                    };
                    at += width;
                }
                ip += widths.iter().sum::<usize>() as isize;
                (op, operands[0], operands[1])
            };

            match op {
                Opcode::Const => {
                    let value = closure.module.env.consts.borrow()[op1].clone();
                    self.push(value)?;
                }
                Opcode::True => self.push(Value::Bool(true))?,
                Opcode::False => self.push(Value::Bool(false))?,
                Opcode::Null => self.push(Value::Null)?,
                Opcode::List => {
                    let start = self.sp - op1;
                    let items: Vec<Value> = self.stack[start..self.sp]
                        .iter_mut()
                        .map(std::mem::take)
                        .collect();
                    self.sp = start;
                    self.push(Value::list(items))?;
                }

                Opcode::Add => self.fold_add(op1)?,
                Opcode::Sub => self.binary_sub_div(Opcode::Sub)?,
                Opcode::Mul => self.fold_mul(op1)?,
                Opcode::Div => self.binary_sub_div(Opcode::Div)?,
                Opcode::Mod => {
                    let b = self.pop();
                    let a = self.pop();
                    match (&a, &b) {
                        (Value::Int(a), Value::Int(b)) => {
                            if *b == 0 {
                                return Err(RuntimeError::DivisionByZero { op: "%" });
                            }
                            let r = a.wrapping_rem(*b);
                            self.push(Value::Int(r))?;
                        }
                        (Value::Int(_), other) | (other, _) => {
                            return Err(RuntimeError::type_mismatch("%", "int", other))
                        }
                    }
                }

                Opcode::Eql => {
                    let b = self.pop();
                    let a = self.pop();
                    let eq = values_equal("=", &a, &b)?;
                    self.push(Value::Bool(eq))?;
                }
                Opcode::NotEql => {
                    let b = self.pop();
                    let a = self.pop();
                    let eq = values_equal("!=", &a, &b)?;
                    self.push(Value::Bool(!eq))?;
                }
                Opcode::GreaterThan => self.binary_ordering(">", |o| o.is_gt())?,
                Opcode::GreaterEqual => self.binary_ordering(">=", |o| o.is_ge())?,
                Opcode::LessThan => self.binary_ordering("<", |o| o.is_lt())?,
                Opcode::LessEqual => self.binary_ordering("<=", |o| o.is_le())?,

                Opcode::Not => {
                    let v = self.pop();
                    match v {
                        Value::Bool(b) => self.push(Value::Bool(!b))?,
                        other => return Err(RuntimeError::type_mismatch("!", "bool", &other)),
                    }
                }
                Opcode::And => self.fold_bools("&", op1, |acc, b| acc && b, true)?,
                Opcode::Or => self.fold_bools("|", op1, |acc, b| acc || b, false)?,

                Opcode::Pop => {
                    self.last_popped = self.pop();
                }
                Opcode::Jump => {
                    ip = op1 as isize - 1;
                }
                Opcode::JumpIfFalse => {
                    let test = self.pop();
                    if !test.truthy() {
                        ip = op1 as isize - 1;
                    }
                }

                Opcode::GetGlobal => {
                    let value = closure
                        .module
                        .env
                        .globals
                        .borrow()
                        .get(op1)
                        .cloned()
                        .unwrap_or(Value::Null);
                    self.push(value)?;
                }
                Opcode::SetGlobal => {
                    let value = self.pop();
                    let mut globals = closure.module.env.globals.borrow_mut();
                    if op1 >= globals.len() {
                        globals.resize(op1 + 1, Value::Null);
                    }
                    globals[op1] = value;
                }
                Opcode::GetLocal => {
                    let bptr = self.frames[self.frames_ix - 1].bptr;
                    let value = self.stack[bptr + op1].clone();
                    self.push(value)?;
                }
                Opcode::SetLocal => {
                    let bptr = self.frames[self.frames_ix - 1].bptr;
                    self.stack[bptr + op1] = self.pop();
                }
                Opcode::GetBuiltin => {
                    self.push(Value::Builtin(&BUILTINS[op1]))?;
                }
                Opcode::GetFree => {
                    let value = closure.free[op1].clone();
                    self.push(value)?;
                }
                Opcode::CurrentClosure => {
                    self.push(Value::Closure(closure.clone()))?;
                }
                Opcode::GetModule => {
                    let value = self.module_symbol(&closure, op1, op2)?;
                    self.push(value)?;
                }

                Opcode::Call => {
                    let callee = self.stack[self.sp - 1 - op1].clone();
                    match callee {
                        Value::Closure(target) => {
                            self.check_arity(&target, op1)?;
                            let bptr = self.sp - op1;
                            let new_sp = bptr + target.func.num_locals;
                            if new_sp > STACK_SIZE {
                                return Err(RuntimeError::StackOverflow);
                            }
                            self.frames[self.frames_ix - 1].ip = ip;
                            self.push_frame(target.clone(), bptr)?;
                            self.sp = new_sp;
                            closure = target;
                            ip = -1;
                        }
                        Value::Builtin(builtin) => self.call_builtin(builtin, op1)?,
                        other => {
                            return Err(RuntimeError::NotAFunction {
                                actual: other.type_name().to_string(),
                            })
                        }
                    }
                }
                Opcode::TailCall => {
                    let callee = self.stack[self.sp - 1 - op1].clone();
                    match callee {
                        Value::Closure(target) => {
                            self.check_arity(&target, op1)?;
                            let bptr = self.frames[self.frames_ix - 1].bptr;
                            let new_sp = bptr + target.func.num_locals;
                            if new_sp > STACK_SIZE {
                                return Err(RuntimeError::StackOverflow);
                            }
                            // Overwrite the argument slots in place, then
                            // truncate to the callee's locals.
                            for k in 0..op1 {
                                self.stack[bptr + k] =
                                    std::mem::take(&mut self.stack[self.sp - op1 + k]);
                            }
                            for slot in bptr + op1..self.sp.max(new_sp) {
                                self.stack[slot] = Value::Null;
                            }
                            self.sp = new_sp;
                            let frame = &mut self.frames[self.frames_ix - 1];
                            frame.closure = target.clone();
                            frame.ip = -1;
                            closure = target;
                            ip = -1;
                        }
                        Value::Builtin(builtin) => self.call_builtin(builtin, op1)?,
                        other => {
                            return Err(RuntimeError::NotAFunction {
                                actual: other.type_name().to_string(),
                            })
                        }
                    }
                }
                Opcode::Return => {
                    let frame = &self.frames[self.frames_ix - 1];
                    let bptr = frame.bptr;
                    let num_locals = frame.closure.func.num_locals;
                    let ret = if self.sp > bptr + num_locals {
                        self.pop()
                    } else {
                        Value::Null
                    };
                    // Eagerly release the frame's slots and the callee slot.
                    for slot in bptr - 1..self.sp {
                        self.stack[slot] = Value::Null;
                    }
                    self.sp = bptr - 1;
                    self.frames_ix -= 1;
                    self.push(ret)?;
                    if self.debug {
                        eprintln!("liss: return, depth {}", self.frames_ix);
                    }
                    if self.frames_ix == 0 {
                        return Ok(());
                    }
                    closure = self.frames[self.frames_ix - 1].closure.clone();
                    ip = self.frames[self.frames_ix - 1].ip;
                }
                Opcode::Closure => {
                    let func = match &closure.module.env.consts.borrow()[op1] {
                        Value::Function(f) => f.clone(),
                        other => {
                            return Err(RuntimeError::general(
                                "vm",
                                format!("constant {} is {}, not a function", op1, other.type_name()),
                            ))
                        }
                    };
                    let start = self.sp - op2;
                    let free: Vec<Value> = self.stack[start..self.sp]
                        .iter_mut()
                        .map(std::mem::take)
                        .collect();
                    self.sp = start;
                    self.push(Value::Closure(Rc::new(Closure {
                        func,
                        free,
                        module: closure.module.clone(),
                    })))?;
                }

                Opcode::Breakpoint => {
                    if self.debug {
                        eprintln!(
                            "liss: breakpoint at {}:{}:{} (sp={}, depth={})",
                            closure.module.path.display(),
                            op1,
                            op2,
                            self.sp,
                            self.frames_ix
                        );
                    }
                }
                Opcode::SrcAnchor => {
                    self.anchor = Some((closure.module.clone(), op1 as u16));
                }
                Opcode::LoadModule => {
                    let module = match &closure.module.env.consts.borrow()[op1] {
                        Value::Module(m) => m.clone(),
                        other => {
                            return Err(RuntimeError::general(
                                "vm",
                                format!("constant {} is {}, not a module", op1, other.type_name()),
                            ))
                        }
                    };
                    if module.initialized.get() {
                        // Balance the Pop that follows.
                        self.push(Value::Null)?;
                    } else {
                        module.initialized.set(true);
                        let root = Rc::new(Function {
                            name: Some(module.name.clone()),
                            params: Vec::new(),
                            num_locals: 0,
                            instructions: module.instructions.clone(),
                        });
                        let target = Rc::new(Closure {
                            func: root,
                            free: Vec::new(),
                            module: module.clone(),
                        });
                        self.push(Value::Closure(target.clone()))?;
                        self.frames[self.frames_ix - 1].ip = ip;
                        let bptr = self.sp;
                        self.push_frame(target.clone(), bptr)?;
                        closure = target;
                        ip = -1;
                    }
                }
                Opcode::Raise => {
                    let value = self.pop();
                    return Err(RuntimeError::Raised {
                        message: value.to_display_string(),
                    });
                }
            }
        }
    }

    // ========================================================================
    // Stack and frames
    // ========================================================================

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.sp >= STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Value {
        self.sp -= 1;
        std::mem::take(&mut self.stack[self.sp])
    }

    fn push_frame(&mut self, closure: Rc<Closure>, bptr: usize) -> Result<(), RuntimeError> {
        if self.frames_ix == MAX_FRAMES {
            return Err(RuntimeError::StackOverflow);
        }
        if self.debug {
            let name = closure.func.name.as_deref().unwrap_or("<anon>");
            eprintln!("liss: call {}, depth {}", name, self.frames_ix + 1);
        }
        if self.frames_ix == self.frames.len() {
            self.frames.push(Frame {
                closure,
                ip: -1,
                bptr,
            });
        } else {
            // Reuse the pooled slot.
            let frame = &mut self.frames[self.frames_ix];
            frame.closure = closure;
            frame.ip = -1;
            frame.bptr = bptr;
        }
        self.frames_ix += 1;
        Ok(())
    }

    fn check_arity(&self, target: &Closure, argc: usize) -> Result<(), RuntimeError> {
        if target.func.params.len() != argc {
            return Err(RuntimeError::WrongArity {
                expected: target.func.params.len(),
                actual: argc,
            });
        }
        Ok(())
    }

    fn call_builtin(&mut self, builtin: &'static Builtin, argc: usize) -> Result<(), RuntimeError> {
        let mut args: Vec<Value> = self.stack[self.sp - argc..self.sp].to_vec();
        if builtin.hookable {
            if let Some(hook) = self.hooks.get(builtin.name).copied() {
                hook(self, &mut args)?;
            }
        }
        builtin.arity.check(builtin.name, args.len())?;
        let result = (builtin.func)(&args)?;

        for slot in self.sp - argc - 1..self.sp {
            self.stack[slot] = Value::Null;
        }
        self.sp -= argc + 1;

        // Files opened during execution are closed at shutdown.
        if let Value::File(handle) = &result {
            if !handle.borrow().is_std() {
                self.open_files.push(handle.clone());
            }
        }
        self.push(result)
    }

    /// Read `module.env.globals[symix]`, re-binding functions to their
    /// defining module so cross-module calls see the right environment.
    fn module_symbol(
        &self,
        closure: &Closure,
        modix: usize,
        symix: usize,
    ) -> Result<Value, RuntimeError> {
        let module = match &closure.module.env.consts.borrow()[modix] {
            Value::Module(m) => m.clone(),
            other => {
                return Err(RuntimeError::general(
                    "vm",
                    format!("constant {} is {}, not a module", modix, other.type_name()),
                ))
            }
        };
        let value = module
            .env
            .globals
            .borrow()
            .get(symix)
            .cloned()
            .unwrap_or(Value::Null);
        Ok(match value {
            Value::Function(func) => Value::Closure(Rc::new(Closure {
                func,
                free: Vec::new(),
                module: module.clone(),
            })),
            Value::Closure(c) if !Rc::ptr_eq(&c.module, &module) => {
                Value::Closure(Rc::new(Closure {
                    func: c.func.clone(),
                    free: c.free.clone(),
                    module: module.clone(),
                }))
            }
            other => other,
        })
    }

    // ========================================================================
    // Arithmetic and logic
    // ========================================================================

    /// Variadic Add: all operands must share one type. String and list
    /// concatenation keep the original push order.
    fn fold_add(&mut self, argc: usize) -> Result<(), RuntimeError> {
        let start = self.sp - argc;
        let result = match &self.stack[start] {
            Value::Int(_) => {
                let mut sum: i64 = 0;
                for v in &self.stack[start..self.sp] {
                    match v {
                        Value::Int(n) => sum = sum.wrapping_add(*n),
                        other => return Err(RuntimeError::type_mismatch("+", "int", other)),
                    }
                }
                Value::Int(sum)
            }
            Value::Float(_) => {
                let mut sum = 0.0;
                for v in &self.stack[start..self.sp] {
                    match v {
                        Value::Float(x) => sum += x,
                        other => return Err(RuntimeError::type_mismatch("+", "float", other)),
                    }
                }
                Value::Float(sum)
            }
            Value::Str(_) => {
                let mut out = String::new();
                for v in &self.stack[start..self.sp] {
                    match v {
                        Value::Str(s) => out.push_str(s),
                        other => return Err(RuntimeError::type_mismatch("+", "string", other)),
                    }
                }
                Value::string(out)
            }
            Value::List(_) => {
                let mut out = Vec::new();
                for v in &self.stack[start..self.sp] {
                    match v {
                        Value::List(items) => out.extend(items.borrow().iter().cloned()),
                        other => return Err(RuntimeError::type_mismatch("+", "list", other)),
                    }
                }
                Value::list(out)
            }
            other => {
                return Err(RuntimeError::type_mismatch(
                    "+",
                    "int, float, string, or list",
                    other,
                ))
            }
        };
        for slot in start..self.sp {
            self.stack[slot] = Value::Null;
        }
        self.sp = start;
        self.push(result)
    }

    /// Variadic Mul. With two operands and an integer on top, the other
    /// operand picks the mode, including string and list repetition.
    fn fold_mul(&mut self, argc: usize) -> Result<(), RuntimeError> {
        if argc == 2 {
            let b = self.pop();
            let a = self.pop();
            let result = match (&a, &b) {
                (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_mul(*b)),
                (Value::Float(a), Value::Int(b)) => Value::Float(a * *b as f64),
                (Value::Int(a), Value::Float(b)) => Value::Float(*a as f64 * b),
                (Value::Float(a), Value::Float(b)) => Value::Float(a * b),
                (Value::Str(s), Value::Int(n)) => {
                    if *n < 0 {
                        return Err(RuntimeError::general("*", "negative repetition"));
                    }
                    Value::string(s.repeat(*n as usize))
                }
                (Value::List(items), Value::Int(n)) => {
                    if *n < 0 {
                        return Err(RuntimeError::general("*", "negative repetition"));
                    }
                    let items = items.borrow();
                    let mut out = Vec::with_capacity(items.len() * *n as usize);
                    for _ in 0..*n {
                        out.extend(items.iter().map(Value::deep_clone));
                    }
                    Value::list(out)
                }
                (other, Value::Int(_) | Value::Float(_)) => {
                    return Err(RuntimeError::type_mismatch(
                        "*",
                        "int, float, string, or list",
                        other,
                    ))
                }
                (_, other) => return Err(RuntimeError::type_mismatch("*", "int or float", other)),
            };
            return self.push(result);
        }

        let start = self.sp - argc;
        let mut any_float = false;
        for v in &self.stack[start..self.sp] {
            match v {
                Value::Int(_) => {}
                Value::Float(_) => any_float = true,
                other => return Err(RuntimeError::type_mismatch("*", "int or float", other)),
            }
        }
        let result = if any_float {
            let mut product = 1.0;
            for v in &self.stack[start..self.sp] {
                product *= match v {
                    Value::Int(n) => *n as f64,
                    Value::Float(x) => *x,
                    _ => unreachable!(),
                };
            }
            Value::Float(product)
        } else {
            let mut product: i64 = 1;
            for v in &self.stack[start..self.sp] {
                if let Value::Int(n) = v {
                    product = product.wrapping_mul(*n);
                }
            }
            Value::Int(product)
        };
        for slot in start..self.sp {
            self.stack[slot] = Value::Null;
        }
        self.sp = start;
        self.push(result)
    }

    /// Binary Sub/Div: int op int stays int, anything else lifts to float.
    fn binary_sub_div(&mut self, op: Opcode) -> Result<(), RuntimeError> {
        let b = self.pop();
        let a = self.pop();
        let name = if op == Opcode::Sub { "-" } else { "/" };
        let result = match (&a, &b) {
            (Value::Int(a), Value::Int(b)) => {
                if op == Opcode::Sub {
                    Value::Int(a.wrapping_sub(*b))
                } else {
                    if *b == 0 {
                        return Err(RuntimeError::DivisionByZero { op: "/" });
                    }
                    Value::Int(a.wrapping_div(*b))
                }
            }
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let a = as_f64(&a);
                let b = as_f64(&b);
                if op == Opcode::Sub {
                    Value::Float(a - b)
                } else {
                    Value::Float(a / b)
                }
            }
            (Value::Int(_) | Value::Float(_), other) | (other, _) => {
                return Err(RuntimeError::type_mismatch(name, "int or float", other))
            }
        };
        self.push(result)
    }

    fn binary_ordering(
        &mut self,
        name: &'static str,
        accept: fn(std::cmp::Ordering) -> bool,
    ) -> Result<(), RuntimeError> {
        let b = self.pop();
        let a = self.pop();
        let ordering = match (&a, &b) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => as_f64(&a)
                .partial_cmp(&as_f64(&b))
                .ok_or_else(|| RuntimeError::general(name, "NaN is not ordered"))?,
            (Value::Str(a), Value::Str(b)) => a.chars().cmp(b.chars()),
            (other, Value::Int(_) | Value::Float(_) | Value::Str(_)) | (_, other) => {
                return Err(RuntimeError::type_mismatch(
                    name,
                    "ordered values of one type",
                    other,
                ))
            }
        };
        self.push(Value::Bool(accept(ordering)))
    }

    fn fold_bools(
        &mut self,
        name: &'static str,
        argc: usize,
        fold: fn(bool, bool) -> bool,
        seed: bool,
    ) -> Result<(), RuntimeError> {
        let start = self.sp - argc;
        let mut acc = seed;
        for v in &self.stack[start..self.sp] {
            match v {
                Value::Bool(b) => acc = fold(acc, *b),
                other => return Err(RuntimeError::type_mismatch(name, "bool", other)),
            }
        }
        for slot in start..self.sp {
            self.stack[slot] = Value::Null;
        }
        self.sp = start;
        self.push(Value::Bool(acc))
    }
}

impl Default for Vm {
    fn default() -> Self {
        Vm::new()
    }
}

impl Drop for Vm {
    /// VM shutdown closes every file opened during execution; the standard
    /// streams are borrowed and stay open.
    fn drop(&mut self) {
        for handle in &self.open_files {
            handle.borrow_mut().close();
        }
    }
}

fn as_f64(v: &Value) -> f64 {
    match v {
        Value::Int(n) => *n as f64,
        Value::Float(x) => *x,
        _ => unreachable!("caller checked numeric"),
    }
}

/// `=`/`!=` semantics: numerics lift, null equals only null, lists compare
/// structurally. Everything else is not comparable.
fn values_equal(op: &'static str, a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    Ok(match (a, b) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            as_f64(a) == as_f64(b)
        }
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::List(_), Value::List(_)) => a == b,
        _ => {
            let comparable = |v: &Value| {
                matches!(
                    v,
                    Value::Int(_)
                        | Value::Float(_)
                        | Value::Bool(_)
                        | Value::Str(_)
                        | Value::List(_)
                )
            };
            let offender = if comparable(a) { b } else { a };
            return Err(RuntimeError::type_mismatch(op, "comparable values", offender));
        }
    })
}
