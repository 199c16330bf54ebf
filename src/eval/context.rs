use std::collections::HashMap;

use serde::Serialize;

use super::function::{CallFrame, FunctionRegistry};
use super::store::VariableStore;
use super::value::Value;

/// State of one script execution context: the single live variable store, the
/// function registry, and the diagnostic call stack. Imported scripts run in
/// the importer's context.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    pub store: VariableStore,
    pub functions: FunctionRegistry,
    pub call_stack: Vec<CallFrame>,
    pub import_depth: usize,
    /// Line ranges currently being executed, one per open block or body.
    pub nesting: usize,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.store.clear();
        self.functions.clear();
        self.call_stack.clear();
        self.import_depth = 0;
        self.nesting = 0;
    }

    pub fn info(&self) -> ContextInfo {
        ContextInfo {
            variables: self.store.to_map(),
            functions: self.functions.names(),
            call_stack: self.call_stack.clone(),
        }
    }
}

/// Read-only view of a context for hosts and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ContextInfo {
    pub variables: HashMap<String, Value>,
    pub functions: Vec<String>,
    pub call_stack: Vec<CallFrame>,
}
