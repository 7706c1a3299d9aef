//! Scoped symbol tables and the program arena.
//!
//! A [`Scope`] is one node in a tree: an ordered name → symbol mapping
//! plus a parent link. Scopes are append-only and never destroyed; the
//! assemblers walk them after analysis has finished. All scopes and all
//! function records live in the arenas of a single [`Program`] and refer
//! to each other by [`ScopeId`] / [`FuncId`].

use cc0_util::{define_idx, IndexVec};
use indexmap::IndexMap;

use crate::constant::ConstantPool;
use crate::error::IrError;
use crate::function::Function;
use crate::types::ValueType;

define_idx!(
    /// Index of a scope in the program's scope arena.
    ScopeId
);

define_idx!(
    /// Index of a function record in the program's function arena.
    FuncId
);

/// One named entity: a variable, a constant, or a function.
#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    /// Value type; for a callable this is the return type.
    pub kind: ValueType,
    /// Constants reject assignment and `scan`.
    pub is_constant: bool,
    /// Functions are callable; everything else is not.
    pub is_callable: bool,
    /// Local slot index for variables, function index for callables.
    pub address: i64,
    /// The function record, only present when callable.
    pub func: Option<FuncId>,
}

/// One scope: an ordered mapping from names to symbols.
#[derive(Debug)]
pub struct Scope {
    symbols: IndexMap<String, Symbol>,
    /// Enclosing scope; `None` for the global scope.
    pub parent: Option<ScopeId>,
    /// The function whose body this scope represents. The global scope
    /// maps to the start pseudo-function.
    pub function: FuncId,
}

impl Scope {
    /// The nearest binding for `name` in this scope only.
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Symbols in declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.symbols.iter().map(|(name, sym)| (name.as_str(), sym))
    }
}

/// The analyzed program: scope tree, function records, and the constant
/// pool, all owned by arenas.
#[derive(Debug)]
pub struct Program {
    /// All scopes; index 0 is the global scope.
    pub scopes: IndexVec<ScopeId, Scope>,
    /// All function records; index 0 is the global start function, which
    /// holds the initialization code for global variables.
    pub functions: IndexVec<FuncId, Function>,
    /// The global literal pool.
    pub pool: ConstantPool,
    /// The global scope.
    pub global_scope: ScopeId,
    /// The start pseudo-function.
    pub start: FuncId,
}

impl Program {
    /// Create a program with an empty global scope and start function.
    pub fn new() -> Self {
        let mut functions = IndexVec::new();
        let start = functions.push(Function::new(ValueType::Void));

        let mut scopes = IndexVec::new();
        let global_scope = scopes.push(Scope {
            symbols: IndexMap::new(),
            parent: None,
            function: start,
        });
        functions[start].scope = Some(global_scope);

        Self {
            scopes,
            functions,
            pool: ConstantPool::new(),
            global_scope,
            start,
        }
    }

    /// Create and link a child scope for the body of `function`, and
    /// return its id.
    pub fn append_child_scope(&mut self, parent: ScopeId, function: FuncId) -> ScopeId {
        let child = self.scopes.push(Scope {
            symbols: IndexMap::new(),
            parent: Some(parent),
            function,
        });
        self.functions[function].scope = Some(child);
        child
    }

    /// Resolve `name` starting from `scope` and walking parent-ward.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.lookup_with_level(scope, name).map(|(sym, _)| sym)
    }

    /// Resolve `name` and report how many scope levels lie between the
    /// use site and the definition (0 when local).
    pub fn lookup_with_level(&self, scope: ScopeId, name: &str) -> Option<(&Symbol, u32)> {
        let mut current = scope;
        let mut level = 0;
        loop {
            let node = &self.scopes[current];
            if let Some(symbol) = node.get(name) {
                return Some((symbol, level));
            }
            match node.parent {
                Some(parent) => {
                    current = parent;
                    level += 1;
                }
                None => return None,
            }
        }
    }

    /// The static nesting distance to the scope holding `name`, used as
    /// the first operand of `loada`.
    pub fn level_difference(&self, scope: ScopeId, name: &str) -> Option<u32> {
        self.lookup_with_level(scope, name).map(|(_, level)| level)
    }

    /// The slot (or function) address bound to `name`.
    pub fn address_of(&self, scope: ScopeId, name: &str) -> Option<i64> {
        self.lookup(scope, name).map(|sym| sym.address)
    }

    /// Declare a variable in `scope`, allocating slots from the scope's
    /// owning function.
    pub fn add_variable(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: ValueType,
    ) -> Result<i64, IrError> {
        self.add_binding(scope, name, kind, false)
    }

    /// Declare a constant in `scope`. Future assignments to the name are
    /// rejected by the analyzer.
    pub fn add_constant(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: ValueType,
    ) -> Result<i64, IrError> {
        self.add_binding(scope, name, kind, true)
    }

    /// Register a function in the global scope. Its address is the next
    /// function index, which is also its name's constant-pool index.
    pub fn add_function(
        &mut self,
        name: &str,
        return_type: ValueType,
        func: FuncId,
    ) -> Result<i64, IrError> {
        let global = self.global_scope;
        if self.scopes[global].get(name).is_some() {
            return Err(IrError::RedeclaredIdentifier {
                name: name.to_string(),
            });
        }
        let address = self.callables().count() as i64;
        self.scopes[global].symbols.insert(
            name.to_string(),
            Symbol {
                kind: return_type,
                is_constant: true,
                is_callable: true,
                address,
                func: Some(func),
            },
        );
        Ok(address)
    }

    /// Function symbols of the global scope, in address order.
    pub fn callables(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.scopes[self.global_scope]
            .symbols()
            .filter(|(_, sym)| sym.is_callable)
    }

    /// Add a string literal to the pool; returns the sentinel address.
    pub fn add_string_literal(&mut self, value: &str) -> i64 {
        self.pool.add_string(value)
    }

    /// Add a double literal to the pool; returns the sentinel address.
    pub fn add_double_literal(&mut self, value: f64) -> i64 {
        self.pool.add_double(value)
    }

    fn add_binding(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: ValueType,
        is_constant: bool,
    ) -> Result<i64, IrError> {
        if self.scopes[scope].get(name).is_some() {
            return Err(IrError::RedeclaredIdentifier {
                name: name.to_string(),
            });
        }
        let owner = self.scopes[scope].function;
        let address = i64::from(self.functions[owner].next_local_slot(kind));
        self.scopes[scope].symbols.insert(
            name.to_string(),
            Symbol {
                kind,
                is_constant,
                is_callable: false,
                address,
                func: None,
            },
        );
        Ok(address)
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_are_dense_in_declaration_order() {
        let mut program = Program::new();
        let g = program.global_scope;
        assert_eq!(program.add_variable(g, "a", ValueType::Int).unwrap(), 0);
        assert_eq!(program.add_variable(g, "d", ValueType::Double).unwrap(), 1);
        assert_eq!(program.add_variable(g, "b", ValueType::Char).unwrap(), 3);
    }

    #[test]
    fn test_redeclaration_in_same_scope_fails() {
        let mut program = Program::new();
        let g = program.global_scope;
        program.add_variable(g, "x", ValueType::Int).unwrap();
        let err = program.add_variable(g, "x", ValueType::Double).unwrap_err();
        assert!(matches!(err, IrError::RedeclaredIdentifier { .. }));
    }

    #[test]
    fn test_shadowing_across_scopes_is_allowed() {
        let mut program = Program::new();
        let g = program.global_scope;
        program.add_variable(g, "x", ValueType::Int).unwrap();

        let func = program.functions.push(Function::new(ValueType::Int));
        let body = program.append_child_scope(g, func);
        program.add_variable(body, "x", ValueType::Double).unwrap();

        let (sym, level) = program.lookup_with_level(body, "x").unwrap();
        assert_eq!(sym.kind, ValueType::Double);
        assert_eq!(level, 0);
    }

    #[test]
    fn test_lookup_walks_parent_ward() {
        let mut program = Program::new();
        let g = program.global_scope;
        program.add_variable(g, "g", ValueType::Int).unwrap();

        let func = program.functions.push(Function::new(ValueType::Void));
        let body = program.append_child_scope(g, func);

        let (sym, level) = program.lookup_with_level(body, "g").unwrap();
        assert!(!sym.is_callable);
        assert_eq!(level, 1);
        assert_eq!(program.level_difference(body, "g"), Some(1));
        assert!(program.lookup(body, "missing").is_none());
    }

    #[test]
    fn test_function_addresses_count_up() {
        let mut program = Program::new();
        let f0 = program.functions.push(Function::new(ValueType::Int));
        let f1 = program.functions.push(Function::new(ValueType::Void));
        assert_eq!(program.add_function("main", ValueType::Int, f0).unwrap(), 0);
        assert_eq!(program.add_function("tick", ValueType::Void, f1).unwrap(), 1);

        let names: Vec<_> = program.callables().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["main", "tick"]);
    }

    #[test]
    fn test_functions_are_constant_symbols() {
        let mut program = Program::new();
        let f = program.functions.push(Function::new(ValueType::Int));
        program.add_function("main", ValueType::Int, f).unwrap();
        let sym = program.lookup(program.global_scope, "main").unwrap();
        assert!(sym.is_callable);
        assert!(sym.is_constant);
        assert_eq!(sym.func, Some(f));
    }

    #[test]
    fn test_parameters_occupy_lowest_slots() {
        let mut program = Program::new();
        let func = program.functions.push(Function::new(ValueType::Int));
        let body = program.append_child_scope(program.global_scope, func);

        let a = program.add_variable(body, "a", ValueType::Int).unwrap();
        let b = program.add_variable(body, "b", ValueType::Double).unwrap();
        let local = program.add_variable(body, "tmp", ValueType::Int).unwrap();
        assert_eq!((a, b, local), (0, 1, 3));
    }
}
