// ABOUTME: Module objects, import resolution, and the compile cache

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::bytecode::Instructions;
use crate::compiler::Compiler;
use crate::config::{MODULE_EXT, STD_DIR};
use crate::error::CompileError;
use crate::parser;
use crate::value::Value;

/// A module's runtime state: its globals table and constant pool. Shared by
/// reference between the defining module and every importer.
#[derive(Debug, Default)]
pub struct ModuleEnv {
    pub globals: RefCell<Vec<Value>>,
    pub consts: RefCell<Vec<Value>>,
}

impl ModuleEnv {
    pub fn new(consts: Vec<Value>, num_globals: usize) -> Rc<Self> {
        Rc::new(ModuleEnv {
            globals: RefCell::new(vec![Value::Null; num_globals]),
            consts: RefCell::new(consts),
        })
    }
}

/// A compiled module. Executed once to populate its globals, read-only for
/// importers afterwards.
pub struct Module {
    pub name: String,
    pub path: PathBuf,
    pub instructions: Instructions,
    /// Public globals (names not starting with `_`) by global index.
    pub exports: HashMap<String, usize>,
    pub env: Rc<ModuleEnv>,
    pub initialized: Cell<bool>,
}

impl Module {
    /// Directory imports and `fopen` paths resolve against at runtime.
    pub fn dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Module({} at {})", self.name, self.path.display())
    }
}

/// Resolves import references, compiles them, and caches the result per
/// canonical path so every importer shares one environment.
pub struct ModuleLoader {
    std_dir: PathBuf,
    dot_paths: Vec<PathBuf>,
    cache: HashMap<PathBuf, Rc<Module>>,
    loading: HashSet<PathBuf>,
}

impl ModuleLoader {
    /// Loader with the bundled std directory next to the executable and the
    /// current directory as the initial dot path.
    pub fn new() -> Self {
        let std_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|d| d.join(STD_DIR)))
            .filter(|d| d.is_dir())
            .unwrap_or_else(|| PathBuf::from(STD_DIR));
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        ModuleLoader {
            std_dir,
            dot_paths: vec![cwd],
            cache: HashMap::new(),
            loading: HashSet::new(),
        }
    }

    /// Loader with an explicit std directory (embedding and tests).
    pub fn with_std_dir(std_dir: impl Into<PathBuf>) -> Self {
        let mut loader = ModuleLoader::new();
        loader.std_dir = std_dir.into();
        loader
    }

    /// Push a dot path. A path ending in the module extension contributes
    /// its directory.
    pub fn push_dot_path(&mut self, path: &Path) {
        let dir = if path.extension().is_some_and(|e| e == "liss") {
            path.parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        } else {
            path.to_path_buf()
        };
        self.dot_paths.push(dir);
    }

    pub fn pop_dot_path(&mut self) {
        self.dot_paths.pop();
    }

    fn current_dot(&self) -> &Path {
        self.dot_paths
            .last()
            .map(PathBuf::as_path)
            .unwrap_or_else(|| Path::new("."))
    }

    /// Resolve an import reference to a canonical source path.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, CompileError> {
        let not_found = || CompileError::ModuleNotFound {
            reference: reference.to_string(),
        };

        let bare = !reference.contains(['/', '\\'])
            && !reference.starts_with('.')
            && !reference.ends_with(MODULE_EXT);
        let candidate = if bare {
            self.std_dir.join(format!("{}{}", reference, MODULE_EXT))
        } else {
            let path = Path::new(reference);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.current_dot().join(path)
            }
        };

        candidate.canonicalize().map_err(|_| not_found())
    }

    /// Compile the referenced module, reusing the cache. Executing the
    /// module is the VM's job (`LoadModule` runs it once).
    pub fn load(&mut self, reference: &str) -> Result<Rc<Module>, CompileError> {
        let path = self.resolve(reference)?;
        if let Some(module) = self.cache.get(&path) {
            return Ok(module.clone());
        }
        if self.loading.contains(&path) {
            return Err(CompileError::CircularImport {
                path: path.display().to_string(),
            });
        }

        let source = std::fs::read_to_string(&path).map_err(|e| CompileError::ModuleRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.loading.insert(path.clone());
        self.push_dot_path(&path);
        let compiled = self.compile_source(&source, &path);
        self.pop_dot_path();
        self.loading.remove(&path);

        let module = compiled?;
        self.cache.insert(path, module.clone());
        Ok(module)
    }

    /// Compile a main program. Not cached; the dot path it was given at
    /// construction stays in effect.
    pub fn load_main(&mut self, source: &str, path: &Path) -> Result<Rc<Module>, CompileError> {
        self.compile_source(source, path)
    }

    fn compile_source(&mut self, source: &str, path: &Path) -> Result<Rc<Module>, CompileError> {
        let program = parser::parse(source)?;
        let mut compiler = Compiler::new();
        compiler.compile_program(&program, self)?;
        let unit = compiler.finish();

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "main".to_string());

        Ok(Rc::new(Module {
            name,
            path: path.to_path_buf(),
            instructions: unit.instructions,
            exports: unit.exports,
            env: ModuleEnv::new(unit.consts, unit.num_globals),
            initialized: Cell::new(false),
        }))
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        ModuleLoader::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_resolve_bare_reference_hits_std() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "strings.liss", "(let reverse 1)");
        let loader = ModuleLoader::with_std_dir(tmp.path());
        let resolved = loader.resolve("strings").unwrap();
        assert!(resolved.ends_with("strings.liss"));
    }

    #[test]
    fn test_resolve_relative_uses_dot_path() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "util.liss", "(let x 1)");
        let mut loader = ModuleLoader::with_std_dir("/nonexistent-std");
        loader.push_dot_path(tmp.path());
        let resolved = loader.resolve("./util.liss").unwrap();
        assert!(resolved.ends_with("util.liss"));
    }

    #[test]
    fn test_resolve_missing_module() {
        let loader = ModuleLoader::with_std_dir("/nonexistent-std");
        assert!(matches!(
            loader.resolve("nosuchmodule"),
            Err(CompileError::ModuleNotFound { .. })
        ));
    }

    #[test]
    fn test_dot_path_of_file_is_its_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let file = write_file(tmp.path(), "prog.liss", "");
        let mut loader = ModuleLoader::with_std_dir("/nonexistent-std");
        loader.push_dot_path(&file);
        assert_eq!(loader.current_dot(), tmp.path());
    }

    #[test]
    fn test_load_compiles_and_caches() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "m.liss", "(let answer 42)");
        let mut loader = ModuleLoader::with_std_dir(tmp.path());

        let first = loader.load("m").unwrap();
        assert_eq!(first.name, "m");
        assert!(first.exports.contains_key("answer"));
        assert!(!first.initialized.get());

        let second = loader.load("m").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_private_symbols_not_exported() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "m.liss", "(let _hidden 1) (let shown 2)");
        let mut loader = ModuleLoader::with_std_dir(tmp.path());
        let module = loader.load("m").unwrap();
        assert!(module.exports.contains_key("shown"));
        assert!(!module.exports.contains_key("_hidden"));
    }

    #[test]
    fn test_circular_import_detected() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "a.liss", r#"(import "b")"#);
        write_file(tmp.path(), "b.liss", r#"(import "a")"#);
        let mut loader = ModuleLoader::with_std_dir(tmp.path());
        assert!(matches!(
            loader.load("a"),
            Err(CompileError::CircularImport { .. })
        ));
    }

    #[test]
    fn test_module_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("dir.liss")).unwrap();
        let mut loader = ModuleLoader::with_std_dir("/nonexistent-std");
        loader.push_dot_path(tmp.path());
        assert!(matches!(
            loader.load("./dir.liss"),
            Err(CompileError::ModuleRead { .. })
        ));
    }
}
