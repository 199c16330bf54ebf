use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use serde::Serialize;

/// Shared line buffer of one script source. Function definitions keep a handle
/// to the buffer they were declared in, so bodies from imported files stay
/// valid after the import finishes.
pub type Lines = Arc<[String]>;

/// A user function: its parameters and the raw body lines between the header
/// and `endfunction`. Bodies are re-dispatched line by line on every call.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub lines: Lines,
    pub body: Range<usize>,
}

impl FunctionDef {
    /// Line number (1-based) of the `function` header.
    pub fn header_line(&self) -> usize {
        self.body.start
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<FunctionDef>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `def`, replacing any earlier definition with the same name.
    pub fn define(&mut self, def: FunctionDef) -> Option<Arc<FunctionDef>> {
        self.functions.insert(def.name.clone(), Arc::new(def))
    }

    pub fn get(&self, name: &str) -> Option<Arc<FunctionDef>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn clear(&mut self) {
        self.functions.clear();
    }
}

/// Diagnostic record of an in-flight call. Has no effect on name resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallFrame {
    pub function: String,
    pub line: usize,
}
