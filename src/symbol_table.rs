use std::collections::HashMap;

use tracing::debug;

#[derive(Debug, Clone)]
pub struct Scope<T> {
    name: String,
    symbols: HashMap<String, T>,
}

impl<T> Scope<T> {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            symbols: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, symbol: &str) -> Option<&T> {
        self.symbols.get(symbol)
    }

    pub fn has(&self, symbol: &str) -> bool {
        self.symbols.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Chain of nested scopes. The outermost "main" scope lives as long as the
/// table; every other scope is owned by the stack and dropped on `pop`.
#[derive(Debug, Clone)]
pub struct SymbolTable<T> {
    main: Scope<T>,
    nested: Vec<Scope<T>>,
}

impl<T> SymbolTable<T> {
    pub fn new() -> Self {
        Self {
            main: Scope::new("main"),
            nested: Vec::new(),
        }
    }

    /// Inserts or overwrites `symbol` in the innermost scope only.
    pub fn declare(&mut self, symbol: &str, data: T) {
        self.current_mut().symbols.insert(symbol.to_string(), data);
    }

    /// Innermost declaration of `symbol`, searching outward to "main".
    pub fn lookup(&self, symbol: &str) -> Option<&T> {
        self.nested
            .iter()
            .rev()
            .chain(std::iter::once(&self.main))
            .find_map(|scope| scope.get(symbol))
    }

    /// Replaces the innermost existing declaration of `symbol`, wherever it
    /// lives. Returns false if `symbol` is not declared.
    pub fn update(&mut self, symbol: &str, data: T) -> bool {
        let scope = self
            .nested
            .iter_mut()
            .rev()
            .chain(std::iter::once(&mut self.main))
            .find(|scope| scope.has(symbol));

        match scope {
            Some(scope) => {
                scope.symbols.insert(symbol.to_string(), data);
                true
            }
            None => false,
        }
    }

    pub fn push(&mut self, label: &str) {
        self.nested.push(Scope::new(label));
        debug!(scope = label, depth = self.depth(), "push scope");
    }

    /// Discards the innermost scope. The main scope is never popped.
    pub fn pop(&mut self) -> Option<Scope<T>> {
        let scope = self.nested.pop();
        if let Some(scope) = &scope {
            debug!(scope = scope.name(), depth = self.depth(), "pop scope");
        }
        scope
    }

    /// Number of scopes above main.
    pub fn depth(&self) -> usize {
        self.nested.len()
    }

    pub fn current(&self) -> &Scope<T> {
        self.nested.last().unwrap_or(&self.main)
    }

    fn current_mut(&mut self) -> &mut Scope<T> {
        match self.nested.last_mut() {
            Some(scope) => scope,
            None => &mut self.main,
        }
    }
}

impl<T> Default for SymbolTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
