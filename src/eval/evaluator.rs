use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_recursion::async_recursion;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::{
    block::find_block_end,
    context::{ContextInfo, ExecutionContext},
    expression::{split_top_level, ExpressionEvaluator},
    function::{CallFrame, FunctionDef, Lines},
    statement::{parse_call, parse_function_header, ForClause, Statement},
    value::Value,
};
use crate::{
    config::InterpreterConfig,
    error::{ScriptError, ScriptResult},
    event::{ControlFlowKind, DiagnosticsSink, ScriptEvent},
    host::{CommandDispatcher, ErrorHandler, MemoryScriptSource, Reporter, ScriptSource, StderrReporter},
};

/// How a line range finished. Anything other than `Normal` unwinds to the
/// nearest construct that consumes it: loops take `Break`/`Continue`, function
/// calls take all three.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecSignal {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Structured result of a top-level script run. Hosts never see an `Err`.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptOutcome {
    pub success: bool,
    pub variables: HashMap<String, Value>,
    /// Value of a top-level `return`, if the script executed one.
    pub return_value: Option<Value>,
    pub error: Option<String>,
}

/// Cooperative cancellation flag, observed before every line and loop pass.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Line-by-line interpreter over one [`ExecutionContext`].
///
/// ```rust,no_run
/// # use std::collections::HashMap;
/// # use std::sync::Arc;
/// # use etx_script::{host::{CommandTable, StdoutWriter}, Interpreter};
/// # async fn example() {
/// let commands = Arc::new(CommandTable::with_builtins(Arc::new(StdoutWriter)));
/// let mut interpreter = Interpreter::new(commands);
/// let outcome = interpreter
///     .execute_script("for i 1 3\n  echo $i\nendfor", HashMap::new(), "inline")
///     .await;
/// assert!(outcome.success);
/// # }
/// ```
pub struct Interpreter {
    context: ExecutionContext,
    expressions: ExpressionEvaluator,
    dispatcher: Arc<dyn CommandDispatcher>,
    source: Arc<dyn ScriptSource>,
    sinks: Vec<Arc<dyn DiagnosticsSink>>,
    reporter: Arc<dyn Reporter>,
    error_handler: Option<ErrorHandler>,
    config: InterpreterConfig,
    cancel: CancelHandle,
}

impl Interpreter {
    pub fn new(dispatcher: Arc<dyn CommandDispatcher>) -> Self {
        Self {
            context: ExecutionContext::new(),
            expressions: ExpressionEvaluator::new(),
            dispatcher,
            source: Arc::new(MemoryScriptSource::new()),
            sinks: Vec::new(),
            reporter: Arc::new(StderrReporter),
            error_handler: None,
            config: InterpreterConfig::default(),
            cancel: CancelHandle::default(),
        }
    }

    pub fn with_source(mut self, source: Arc<dyn ScriptSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Attaches another diagnostics sink; every sink sees every event.
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.config.debug_mode = enabled;
    }

    /// Installs a handler that replaces the reporter for error output.
    pub fn set_error_handler(&mut self, handler: ErrorHandler) {
        self.error_handler = Some(handler);
    }

    pub fn clear_error_handler(&mut self) {
        self.error_handler = None;
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Drops all variables, functions and call frames.
    pub fn reset(&mut self) {
        self.context.reset();
        self.cancel.clear();
    }

    pub fn context_info(&self) -> ContextInfo {
        self.context.info()
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.context.store.get(name)
    }

    /// Runs `source` as a top-level script. `initial_variables` are merged into
    /// the current store; the context is not reset between runs.
    #[tracing::instrument(level = "debug", skip(self, source, initial_variables))]
    pub async fn execute_script(
        &mut self,
        source: &str,
        initial_variables: HashMap<String, Value>,
        path: &str,
    ) -> ScriptOutcome {
        self.context.store.merge(initial_variables);
        self.context.nesting = 0;

        let result = self.run_source(source, path).await;
        if self.context.import_depth == 0 {
            self.cancel.clear();
        }

        match result {
            Ok(return_value) => ScriptOutcome {
                success: true,
                variables: self.context.store.to_map(),
                return_value,
                error: None,
            },
            Err(error) => {
                let message = error.to_string();
                self.emit(|| ScriptEvent::Error {
                    message: message.clone(),
                    line: error.line(),
                });
                self.handle_error(&format!("Script execution failed: {}", message), &error);
                ScriptOutcome {
                    success: false,
                    variables: self.context.store.to_map(),
                    return_value: None,
                    error: Some(message),
                }
            }
        }
    }

    /// Evaluates one expression against the current store. Failures are
    /// reported and yield `Null`.
    pub fn evaluate(&self, expression: &str) -> Value {
        match self.expressions.evaluate(expression, &self.context.store) {
            Ok(value) => value,
            Err(e) => {
                self.handle_error(
                    &format!("Error evaluating expression: {}", expression),
                    &ScriptError::from(e),
                );
                Value::Null
            }
        }
    }

    /// Calls a registered function with already evaluated arguments.
    pub async fn call_function(&mut self, name: &str, arguments: Vec<Value>) -> ScriptResult<Value> {
        let function = self
            .context
            .functions
            .get(name)
            .ok_or_else(|| ScriptError::UndefinedFunction(name.to_string()))?;

        let limit = self.config.max_call_depth;
        if self.context.call_stack.len() >= limit {
            return Err(ScriptError::CallDepthExceeded {
                function: name.to_string(),
                limit,
            });
        }

        self.emit(|| ScriptEvent::FunctionCalled {
            name: name.to_string(),
            arguments: arguments.clone(),
            depth: self.context.call_stack.len() + 1,
        });

        let snapshot = self.context.store.snapshot();
        let mut arguments = arguments.into_iter();
        for param in &function.params {
            let value = arguments.next().unwrap_or_default();
            self.context.store.set(param.clone(), value);
        }
        self.context.call_stack.push(CallFrame {
            function: name.to_string(),
            line: function.header_line(),
        });

        let result = self
            .execute_lines(&function.lines, function.body.clone())
            .await;

        self.context.call_stack.pop();
        self.context.store.restore(snapshot);

        let value = match result? {
            ExecSignal::Return(value) => value,
            _ => Value::Null,
        };
        self.emit(|| ScriptEvent::FunctionReturned {
            name: name.to_string(),
            value: value.clone(),
        });
        Ok(value)
    }

    /// Executes `range` of `lines` in order. Stops at the first signal other
    /// than `Normal` and hands it to the caller.
    ///
    /// Errors carry the line context of the innermost failing line. Every
    /// block body and function body is one nesting level; past
    /// `max_nesting_depth` the range is refused.
    #[async_recursion]
    pub async fn execute_lines(&mut self, lines: &Lines, range: Range<usize>) -> ScriptResult<ExecSignal> {
        let limit = self.config.max_nesting_depth;
        if self.context.nesting >= limit {
            return Err(ScriptError::NestingDepthExceeded { limit });
        }

        self.context.nesting += 1;
        let result = self.run_lines(lines, range).await;
        self.context.nesting -= 1;
        result
    }

    async fn run_lines(&mut self, lines: &Lines, range: Range<usize>) -> ScriptResult<ExecSignal> {
        let end = range.end.min(lines.len());
        let mut index = range.start;

        while index < end {
            self.check_cancelled()?;

            let text = lines[index].trim();
            if text.is_empty() || text.starts_with('#') {
                index += 1;
                continue;
            }
            self.trace_line(index + 1, text);

            match self.execute_statement(lines, index, text).await {
                Ok((ExecSignal::Normal, next)) => index = next,
                Ok((signal, _)) => return Ok(signal),
                Err(e @ ScriptError::Line { .. }) => return Err(e),
                Err(e) => {
                    return Err(ScriptError::Line {
                        line: index + 1,
                        text: text.to_string(),
                        source: Box::new(e),
                    })
                }
            }
        }

        Ok(ExecSignal::Normal)
    }

    /// Runs the statement at `index` and returns its signal with the index of
    /// the next line to execute.
    async fn execute_statement(
        &mut self,
        lines: &Lines,
        index: usize,
        text: &str,
    ) -> ScriptResult<(ExecSignal, usize)> {
        let next = index + 1;
        let statement = Statement::classify(text);
        debug!(line = next, kind = statement.kind(), "{}", text);

        match statement {
            Statement::If { .. } => {
                let (signal, end) = self.execute_if(lines, index).await?;
                Ok((signal, end + 1))
            }
            Statement::While { condition } => {
                let (signal, end) = self.execute_while(lines, index, &condition).await?;
                Ok((signal, end + 1))
            }
            Statement::For { clause } => {
                let (signal, end) = self.execute_for(lines, index, &clause).await?;
                Ok((signal, end + 1))
            }
            Statement::Function { header } => {
                let end = self.define_function(lines, index, &header)?;
                Ok((ExecSignal::Normal, end + 1))
            }
            Statement::Return { expression } => {
                let value = expression
                    .map(|expression| self.evaluate(&expression))
                    .unwrap_or_default();
                self.emit_control_flow(ControlFlowKind::Return, None, None);
                Ok((ExecSignal::Return(value), next))
            }
            Statement::Break => {
                self.emit_control_flow(ControlFlowKind::Break, None, None);
                Ok((ExecSignal::Break, next))
            }
            Statement::Continue => {
                self.emit_control_flow(ControlFlowKind::Continue, None, None);
                Ok((ExecSignal::Continue, next))
            }
            Statement::Set { name, index, value } => {
                self.execute_set(&name, index.as_deref(), &value).await?;
                Ok((ExecSignal::Normal, next))
            }
            Statement::MalformedSet => {
                warn!(line = next, "ignoring malformed set statement: {}", text);
                Ok((ExecSignal::Normal, next))
            }
            Statement::Unset { name } => {
                self.context.store.unset(&name);
                self.emit(|| ScriptEvent::VariableUnset { name: name.clone() });
                Ok((ExecSignal::Normal, next))
            }
            Statement::Import { path } => {
                self.execute_import(&path).await?;
                Ok((ExecSignal::Normal, next))
            }
            Statement::Try => {
                let (signal, end) = self.execute_try(lines, index).await?;
                Ok((signal, end + 1))
            }
            Statement::Call { name, arguments } => {
                self.invoke(&name, &arguments).await?;
                Ok((ExecSignal::Normal, next))
            }
            Statement::Command { line } => {
                self.dispatch_command(&line).await?;
                Ok((ExecSignal::Normal, next))
            }
        }
    }

    /// Walks an `if` / `elif` / `else` chain; the first branch whose condition
    /// holds runs, the rest are only scanned.
    async fn execute_if(&mut self, lines: &Lines, start: usize) -> ScriptResult<(ExecSignal, usize)> {
        let end = find_block_end(start, lines, &["endif"]);
        let mut header = start;
        let mut matched = false;
        let mut signal = ExecSignal::Normal;

        while header < end {
            let branch_end = find_block_end(header, lines, &["elif", "else", "endif"]);

            if !matched {
                let text = lines[header].trim();
                let (kind, condition) = if let Some(condition) = text.strip_prefix("if") {
                    (ControlFlowKind::If, Some(condition.trim()))
                } else if let Some(condition) = text.strip_prefix("elif") {
                    (ControlFlowKind::Elif, Some(condition.trim()))
                } else {
                    (ControlFlowKind::Else, None)
                };
                let taken = condition.map_or(true, |condition| self.evaluate(condition).is_truthy());
                self.emit_control_flow(kind, condition.map(str::to_string), Some(taken));

                if taken {
                    matched = true;
                    signal = self.execute_lines(lines, header + 1..branch_end).await?;
                }
            }

            header = branch_end;
        }

        Ok((signal, end))
    }

    async fn execute_while(
        &mut self,
        lines: &Lines,
        start: usize,
        condition: &str,
    ) -> ScriptResult<(ExecSignal, usize)> {
        let end = find_block_end(start, lines, &["endwhile"]);

        loop {
            self.check_cancelled()?;
            let holds = self.evaluate(condition).is_truthy();
            self.emit_control_flow(ControlFlowKind::While, Some(condition.to_string()), Some(holds));
            if !holds {
                break;
            }

            match self.execute_lines(lines, start + 1..end).await? {
                ExecSignal::Break => break,
                ExecSignal::Return(value) => return Ok((ExecSignal::Return(value), end)),
                ExecSignal::Normal | ExecSignal::Continue => {}
            }
            tokio::task::yield_now().await;
        }

        Ok((ExecSignal::Normal, end))
    }

    async fn execute_for(
        &mut self,
        lines: &Lines,
        start: usize,
        clause: &str,
    ) -> ScriptResult<(ExecSignal, usize)> {
        let end = find_block_end(start, lines, &["endfor"]);
        let body = start + 1..end;
        self.emit_control_flow(ControlFlowKind::For, Some(clause.to_string()), None);

        match ForClause::parse(clause)? {
            ForClause::Each { variable, list } => {
                let items = match self.evaluate(&list) {
                    Value::Array(items) => items,
                    _ => Vec::new(),
                };
                for item in items {
                    self.check_cancelled()?;
                    self.assign(&variable, item);
                    match self.execute_lines(lines, body.clone()).await? {
                        ExecSignal::Break => break,
                        ExecSignal::Return(value) => return Ok((ExecSignal::Return(value), end)),
                        ExecSignal::Normal | ExecSignal::Continue => {}
                    }
                    tokio::task::yield_now().await;
                }
            }
            ForClause::Range {
                variable,
                start: from,
                end: to,
                step,
            } => {
                let from = self.evaluate(&from).to_number();
                let to = self.evaluate(&to).to_number();
                let step = step.map_or(1.0, |step| self.evaluate(&step).to_number());
                if step == 0.0 {
                    return Err(ScriptError::InvalidStatement {
                        statement: format!("for {}", clause),
                        message: "step must not be zero".to_string(),
                    });
                }

                let mut current = from;
                while (step > 0.0 && current <= to) || (step < 0.0 && current >= to) {
                    self.check_cancelled()?;
                    self.assign(&variable, Value::Number(current));
                    match self.execute_lines(lines, body.clone()).await? {
                        ExecSignal::Break => break,
                        ExecSignal::Return(value) => return Ok((ExecSignal::Return(value), end)),
                        ExecSignal::Normal | ExecSignal::Continue => {}
                    }
                    current += step;
                    tokio::task::yield_now().await;
                }
            }
        }

        Ok((ExecSignal::Normal, end))
    }

    fn define_function(&mut self, lines: &Lines, start: usize, header: &str) -> ScriptResult<usize> {
        let (name, params) = parse_function_header(header)?;
        let end = find_block_end(start, lines, &["endfunction"]);

        self.emit(|| ScriptEvent::FunctionDefined {
            name: name.clone(),
            params: params.clone(),
        });
        if self
            .context
            .functions
            .define(FunctionDef {
                name,
                params,
                lines: lines.clone(),
                body: start + 1..end,
            })
            .is_some()
        {
            debug!("function redefined: {}", header);
        }

        Ok(end)
    }

    /// `try` body up to `catch` (or `endtry` when there is no `catch`). A
    /// recoverable error binds its message to `error` and runs the catch body.
    async fn execute_try(&mut self, lines: &Lines, start: usize) -> ScriptResult<(ExecSignal, usize)> {
        let catch_index = find_block_end(start, lines, &["catch", "endtry"]);
        let has_catch = lines
            .get(catch_index)
            .and_then(|line| line.split_whitespace().next())
            == Some("catch");
        let end = if has_catch {
            find_block_end(catch_index, lines, &["endtry"])
        } else {
            catch_index
        };

        match self.execute_lines(lines, start + 1..catch_index).await {
            Ok(signal) => Ok((signal, end)),
            Err(error) if has_catch && error.is_recoverable() => {
                let message = error.root().to_string();
                debug!("caught error: {}", error);
                self.emit(|| ScriptEvent::Error {
                    message: message.clone(),
                    line: error.line(),
                });
                self.emit_control_flow(ControlFlowKind::Catch, None, None);

                self.assign("error", Value::String(message));
                let signal = self.execute_lines(lines, catch_index + 1..end).await?;
                Ok((signal, end))
            }
            Err(error) => Err(error),
        }
    }

    async fn execute_set(&mut self, name: &str, index: Option<&str>, value: &str) -> ScriptResult<()> {
        let value = match parse_call(value) {
            Some((function, arguments)) if self.context.functions.contains(&function) => {
                self.invoke(&function, &arguments).await?
            }
            _ => self.evaluate(value),
        };

        match index {
            Some(index) => {
                let index_value = self.evaluate(index);
                let position = index_value.as_index().ok_or_else(|| ScriptError::InvalidIndex {
                    name: name.to_string(),
                    index: index_value.to_string(),
                })?;
                if position > self.config.max_array_index {
                    return Err(ScriptError::InvalidIndex {
                        name: name.to_string(),
                        index: index_value.to_string(),
                    });
                }
                self.context
                    .store
                    .set_indexed(name, position, value.clone())?;
                self.emit(|| ScriptEvent::VariableSet {
                    name: format!("{}[{}]", name, position),
                    value,
                    old_value: None,
                });
            }
            None => self.assign(name, value),
        }

        Ok(())
    }

    async fn execute_import(&mut self, path: &str) -> ScriptResult<()> {
        let path = self.substitute(path);
        let path = unquote(path.trim()).to_string();

        let limit = self.config.max_import_depth;
        if self.context.import_depth >= limit {
            return Err(ScriptError::ImportDepthExceeded { path, limit });
        }

        let Some(source) = self.source.read_script(&path).await else {
            self.emit(|| ScriptEvent::Import {
                path: path.clone(),
                success: false,
            });
            return Err(ScriptError::ImportNotFound(path));
        };

        info!("importing {}", path);
        self.context.import_depth += 1;
        let result = self.run_source(&source, &path).await;
        self.context.import_depth -= 1;

        self.emit(|| ScriptEvent::Import {
            path: path.clone(),
            success: result.is_ok(),
        });
        result.map(|_| ()).map_err(|source| ScriptError::ImportFailed {
            path,
            source: Box::new(source),
        })
    }

    /// Evaluates the argument list in the caller's store, then calls.
    async fn invoke(&mut self, name: &str, arguments: &str) -> ScriptResult<Value> {
        if !self.context.functions.contains(name) {
            return Err(ScriptError::UndefinedFunction(name.to_string()));
        }
        let arguments: Vec<Value> = if arguments.trim().is_empty() {
            Vec::new()
        } else {
            split_top_level(arguments)
                .into_iter()
                .map(|argument| self.evaluate(argument))
                .collect()
        };
        self.call_function(name, arguments).await
    }

    async fn dispatch_command(&mut self, line: &str) -> ScriptResult<()> {
        let command = self.substitute(line);
        self.emit(|| ScriptEvent::CommandDispatched {
            command: command.clone(),
        });
        self.dispatcher.dispatch(&command).await?;
        Ok(())
    }

    /// Substitutes `$` references in a command or import path. An index that
    /// fails to evaluate is reported and substitutes as empty text.
    fn substitute(&self, text: &str) -> String {
        self.expressions
            .substitute_with(text, &self.context.store, |index, error| {
                self.handle_error(
                    &format!("Error evaluating expression: {}", index),
                    &ScriptError::from(error.clone()),
                );
            })
    }

    async fn run_source(&mut self, source: &str, path: &str) -> ScriptResult<Option<Value>> {
        let lines: Lines = source.lines().map(str::to_string).collect::<Vec<_>>().into();
        let depth = self.context.import_depth;
        info!(path, depth, "starting script execution");
        self.emit(|| ScriptEvent::ScriptStarted {
            path: path.to_string(),
            line_count: lines.len(),
            depth,
        });

        let started = Instant::now();
        let result = self.execute_lines(&lines, 0..lines.len()).await;
        let success = result.is_ok();
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        if success {
            info!(path, duration_ms, "script execution completed");
        } else {
            error!(path, duration_ms, "script execution failed");
        }
        self.emit(|| ScriptEvent::ScriptFinished {
            path: path.to_string(),
            success,
            duration_ms,
        });

        match result? {
            ExecSignal::Return(value) => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    fn assign(&mut self, name: &str, value: Value) {
        let old_value = self.context.store.set(name, value.clone());
        self.emit(|| ScriptEvent::VariableSet {
            name: name.to_string(),
            value,
            old_value,
        });
    }

    fn trace_line(&self, line: usize, text: &str) {
        if self.config.debug_mode {
            self.reporter.debug(&format!("[DEBUG] Line {}: {}", line, text));
        }
        self.emit(|| ScriptEvent::LineExecuted {
            line,
            text: text.to_string(),
        });
    }

    fn check_cancelled(&self) -> ScriptResult<()> {
        if self.cancel.is_cancelled() {
            Err(ScriptError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn handle_error(&self, message: &str, error: &ScriptError) {
        error!(%error, "{}", message);
        match &self.error_handler {
            Some(handler) => handler(message, error),
            None => self.reporter.report(message),
        }
    }

    fn emit(&self, event: impl FnOnce() -> ScriptEvent) {
        if self.sinks.is_empty() {
            return;
        }
        let event = event();
        for sink in &self.sinks {
            sink.record(&event);
        }
    }

    fn emit_control_flow(&self, kind: ControlFlowKind, condition: Option<String>, result: Option<bool>) {
        self.emit(|| ScriptEvent::ControlFlow {
            kind,
            condition,
            result,
        });
    }
}

fn unquote(text: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}
