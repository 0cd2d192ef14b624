// ABOUTME: Symbol table with lexical scoping and free-variable lifting

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    Global,
    Local,
    Builtin,
    Free,
    /// Self-reference slot so a named function can recurse without
    /// consuming a local.
    Function,
    /// A public symbol of an imported module; `module_index` addresses the
    /// module constant, `index` the symbol inside its globals.
    Module,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
    pub module_index: usize,
}

impl Symbol {
    fn new(name: impl Into<String>, scope: SymbolScope, index: usize) -> Self {
        Symbol {
            name: name.into(),
            scope,
            index,
            module_index: 0,
        }
    }
}

/// One lexical scope. Function bodies get a nested table; resolution walks
/// outward and lifts locals of enclosing functions into free symbols.
#[derive(Debug, Default)]
pub struct SymbolTable {
    pub outer: Option<Rc<RefCell<SymbolTable>>>,
    store: HashMap<String, Symbol>,
    pub num_definitions: usize,
    pub free_symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(SymbolTable::default()))
    }

    pub fn new_enclosed(outer: Rc<RefCell<SymbolTable>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(SymbolTable {
            outer: Some(outer),
            ..SymbolTable::default()
        }))
    }

    pub fn is_global(&self) -> bool {
        self.outer.is_none()
    }

    /// Define a symbol in this scope. Redefining a name already bound here
    /// is a compile error; shadowing builtins, imports, and captures is fine.
    pub fn define(&mut self, name: &str) -> Result<Symbol, CompileError> {
        if let Some(existing) = self.store.get(name) {
            if matches!(
                existing.scope,
                SymbolScope::Global | SymbolScope::Local | SymbolScope::Function
            ) {
                return Err(CompileError::Redefinition {
                    name: name.to_string(),
                });
            }
        }
        let scope = if self.is_global() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let symbol = Symbol::new(name, scope, self.num_definitions);
        self.num_definitions += 1;
        self.store.insert(name.to_string(), symbol.clone());
        Ok(symbol)
    }

    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol::new(name, SymbolScope::Builtin, index);
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Bind the enclosing function's own name to the current-closure slot.
    pub fn define_function_name(&mut self, name: &str) -> Symbol {
        let symbol = Symbol::new(name, SymbolScope::Function, 0);
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Register one exported symbol of an imported module under
    /// `alias:name`.
    pub fn define_module_member(
        &mut self,
        alias: &str,
        name: &str,
        module_index: usize,
        symbol_index: usize,
    ) -> Symbol {
        let key = format!("{}:{}", alias, name);
        let symbol = Symbol {
            name: key.clone(),
            scope: SymbolScope::Module,
            index: symbol_index,
            module_index,
        };
        self.store.insert(key, symbol.clone());
        symbol
    }

    fn define_free(&mut self, original: Symbol) -> Symbol {
        self.free_symbols.push(original.clone());
        let symbol = Symbol::new(
            original.name.clone(),
            SymbolScope::Free,
            self.free_symbols.len() - 1,
        );
        self.store.insert(original.name, symbol.clone());
        symbol
    }

    /// Public globals of this table: the module's export surface. Names
    /// starting with `_` stay private.
    pub fn exported_globals(&self) -> std::collections::HashMap<String, usize> {
        self.store
            .values()
            .filter(|s| s.scope == SymbolScope::Global && !s.name.starts_with('_'))
            .map(|s| (s.name.clone(), s.index))
            .collect()
    }

    /// Resolve a name, lifting enclosing locals into this scope's free list.
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.store.get(name) {
            return Some(symbol.clone());
        }
        let outer = self.outer.clone()?;
        let symbol = outer.borrow_mut().resolve(name)?;
        match symbol.scope {
            SymbolScope::Global | SymbolScope::Builtin | SymbolScope::Module => Some(symbol),
            _ => Some(self.define_free(symbol)),
        }
    }
}
