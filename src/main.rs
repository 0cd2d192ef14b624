// ABOUTME: Command-line driver and REPL for the liss compiler and VM

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::{Config, Editor};

use liss::compiler::Compiler;
use liss::config::{HISTORY_FILE, PROMPT, VERSION, WELCOME_MESSAGE, WELCOME_SUBTITLE};
use liss::error::LissError;
use liss::modules::{Module, ModuleEnv, ModuleLoader};
use liss::parser;
use liss::value::Value;
use liss::vm::Vm;

/// Compiler and stack VM for the liss Lisp dialect
#[derive(Parser, Debug)]
#[command(name = "liss")]
#[command(version = VERSION)]
#[command(about = "Compiler and VM for the liss Lisp dialect")]
#[command(long_about = "Compiles liss source to bytecode and runs it on a stack VM \
with closures, proper tail calls, and modules. Without arguments, starts a REPL.")]
struct CliArgs {
    /// Execute a source file; its directory becomes the module search root
    #[arg(long = "src", value_name = "PATH")]
    src: Option<PathBuf>,

    /// Execute a code string and exit
    #[arg(long = "exec", value_name = "CODE")]
    exec: Option<String>,

    /// Debug output: breakpoint reports and frame traces on stderr
    #[arg(long = "debug")]
    debug: bool,

    /// Print bytecode disassembly before execution
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() {
    let args = CliArgs::parse();
    let code = if let Some(path) = &args.src {
        fallible(run_file(path, &args))
    } else if let Some(code) = &args.exec {
        fallible(run_exec(code, &args))
    } else {
        repl(&args)
    };
    std::process::exit(code);
}

fn fallible(result: Result<(), LissError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err);
            1
        }
    }
}

/// Execute a source file and print its final value.
fn run_file(path: &Path, args: &CliArgs) -> Result<(), LissError> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        LissError::Compile(liss::error::CompileError::ModuleRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    })?;
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    let mut loader = ModuleLoader::new();
    loader.push_dot_path(&path);
    let module = loader.load_main(&source, &path)?;
    run_module(&module, args)
}

/// Execute a code string against the current directory.
fn run_exec(code: &str, args: &CliArgs) -> Result<(), LissError> {
    let mut loader = ModuleLoader::new();
    let module = loader.load_main(code, Path::new("exec.liss"))?;
    run_module(&module, args)
}

fn run_module(module: &Rc<Module>, args: &CliArgs) -> Result<(), LissError> {
    if args.verbose {
        print_disassembly(module);
    }
    let mut vm = Vm::with_debug(args.debug);
    let result = vm.run(module)?;
    if !result.is_null() {
        println!("{}", result);
    }
    Ok(())
}

/// Bytecode listing for --verbose, on stderr so program output stays clean.
fn print_disassembly(module: &Module) {
    eprintln!("; module {} ({})", module.name, module.path.display());
    eprint!("{}", module.instructions);
    for (ix, constant) in module.env.consts.borrow().iter().enumerate() {
        if let Value::Function(func) = constant {
            let name = func.name.as_deref().unwrap_or("<anon>");
            eprintln!("; const {} fn {} ({} locals)", ix, name, func.num_locals);
            eprint!("{}", func.instructions);
        }
    }
}

// ============================================================================
// REPL
// ============================================================================

/// Interactive loop. Compiler state and module globals persist across lines,
/// so definitions accumulate like in a source file.
fn repl(args: &CliArgs) -> i32 {
    println!("{}", WELCOME_MESSAGE);
    println!("{}", WELCOME_SUBTITLE);

    let config = Config::builder().auto_add_history(true).build();
    let mut rl: Editor<(), FileHistory> = match Editor::with_config(config) {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("error: failed to initialize REPL: {}", err);
            return 1;
        }
    };
    let _ = rl.load_history(HISTORY_FILE);

    let mut session = ReplSession::new(args.debug);

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                match session.eval_line(&line, args.verbose) {
                    Ok(value) => {
                        if !value.is_null() {
                            println!("=> {}", value);
                        }
                    }
                    Err(err) => eprintln!("error: {}", err),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("error: {}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(HISTORY_FILE);
    0
}

struct ReplSession {
    symtab: Rc<std::cell::RefCell<liss::symbols::SymbolTable>>,
    consts: Vec<Value>,
    env: Rc<ModuleEnv>,
    loader: ModuleLoader,
    vm: Vm,
}

impl ReplSession {
    fn new(debug: bool) -> Self {
        ReplSession {
            symtab: Compiler::new().symtab(),
            consts: Vec::new(),
            env: ModuleEnv::new(Vec::new(), 0),
            loader: ModuleLoader::new(),
            vm: Vm::with_debug(debug),
        }
    }

    fn eval_line(&mut self, line: &str, verbose: bool) -> Result<Value, LissError> {
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
        if verbose {
            print_disassembly(&module);
        }
        Ok(self.vm.run(&module)?)
    }
}
