mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::Harness;
use etx_script::{
    event::{ControlFlowKind, EventBus},
    host::{CommandTable, MemoryWriter},
    DiagnosticsSink, Interpreter, LogLevel, ScriptError, ScriptEvent, ScriptLogger, Value,
};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<ScriptEvent>>,
}

impl CollectingSink {
    fn events(&self) -> Vec<ScriptEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl DiagnosticsSink for CollectingSink {
    fn record(&self, event: &ScriptEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[tokio::test]
async fn test_events_describe_the_run() {
    let sink = Arc::new(CollectingSink::default());
    let mut harness = Harness::new().with_diagnostics(sink.clone());

    harness.run("set x 1\nif $x == 1\n  echo yes\nendif").await;

    let names: Vec<&str> = sink.events().iter().map(|e| e.name()).collect();
    assert_eq!(
        names,
        vec![
            "script_started",
            "line_executed",
            "variable_set",
            "line_executed",
            "control_flow",
            "line_executed",
            "command_dispatched",
            "script_finished",
        ]
    );
    assert!(sink.events().contains(&ScriptEvent::ControlFlow {
        kind: ControlFlowKind::If,
        condition: Some("$x == 1".to_string()),
        result: Some(true),
    }));
    assert!(sink.events().contains(&ScriptEvent::VariableSet {
        name: "x".to_string(),
        value: Value::Number(1.0),
        old_value: None,
    }));
}

#[tokio::test]
async fn test_sinks_do_not_change_behavior() {
    let script = "for i 1 3\n  echo $i\nendfor\nset done true";

    let mut plain = Harness::new();
    let plain_outcome = plain.run(script).await;

    let bus = Arc::new(EventBus::new(256));
    let mut rx = bus.subscribe();
    let mut observed = Harness::new()
        .with_diagnostics(bus.clone())
        .with_diagnostics(Arc::new(ScriptLogger::default()));
    let observed_outcome = observed.run(script).await;

    assert_eq!(plain.commands(), observed.commands());
    assert_eq!(plain_outcome.variables, observed_outcome.variables);
    assert!(matches!(
        rx.recv().await.unwrap(),
        ScriptEvent::ScriptStarted { .. }
    ));
}

#[tokio::test]
async fn test_logger_tracks_failed_run() {
    let logger = Arc::new(ScriptLogger::default());
    logger.set_level(LogLevel::Info);
    let mut harness = Harness::new().with_diagnostics(logger.clone());

    harness.run("boom bad").await;

    let history = logger.history();
    let messages: Vec<&str> = history.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages[0], "Starting script execution: main.etx");
    assert!(messages[1].starts_with("Script execution failed: main.etx"));
    assert_eq!(messages[2], "Script error: line 1 (boom bad): bad");
    assert_eq!(logger.stats().stack_depth, 0);
}

#[tokio::test]
async fn test_custom_error_handler_replaces_reporter() {
    let mut harness = Harness::new();
    let seen: Arc<Mutex<Vec<(String, Option<usize>)>>> = Arc::default();
    let captured = seen.clone();
    harness
        .interpreter
        .set_error_handler(Arc::new(move |message: &str, error: &ScriptError| {
            captured
                .lock()
                .unwrap()
                .push((message.to_string(), error.line()));
        }));

    harness.run("echo ok\nboom bad").await;

    assert!(harness.reporter.messages().is_empty());
    assert_eq!(
        seen.lock().unwrap().clone(),
        vec![(
            "Script execution failed: line 2 (boom bad): bad".to_string(),
            Some(2)
        )]
    );
}

#[tokio::test]
async fn test_initial_variables_merge_and_reset() {
    let mut harness = Harness::new();
    harness.run("set kept 1").await;

    let mut initial = HashMap::new();
    initial.insert("name".to_string(), Value::from("etx"));
    let outcome = harness
        .interpreter
        .execute_script("echo $name $kept", initial, "second.etx")
        .await;
    assert!(outcome.success);
    assert_eq!(harness.commands(), vec!["echo etx 1"]);

    harness.interpreter.reset();
    let info = harness.interpreter.context_info();
    assert!(info.variables.is_empty());
    assert!(info.functions.is_empty());
    assert!(info.call_stack.is_empty());
}

#[tokio::test]
async fn test_context_info_serializes() {
    let mut harness = Harness::new();
    harness
        .run("set xs [1, \"a\", true]\nfunction f()\nendfunction")
        .await;
    let json = serde_json::to_value(harness.interpreter.context_info()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "variables": {"xs": [1.0, "a", true]},
            "functions": ["f"],
            "call_stack": []
        })
    );
}

#[tokio::test]
async fn test_cancellation_stops_infinite_loop() {
    let writer = Arc::new(MemoryWriter::new());
    let mut interpreter = Interpreter::new(Arc::new(CommandTable::with_builtins(writer.clone())));
    let cancel = interpreter.cancel_handle();

    let handle = tokio::spawn(async move {
        let outcome = interpreter
            .execute_script(
                "set n 0\nwhile true\n  set n $n + 1\n  sleep 1\nendwhile",
                HashMap::new(),
                "forever.etx",
            )
            .await;
        (outcome, interpreter)
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let (outcome, interpreter) = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("script did not stop")
        .unwrap();
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("cancelled"));
    assert!(!interpreter.cancel_handle().is_cancelled());
}

#[tokio::test]
async fn test_try_does_not_catch_cancellation() {
    let writer = Arc::new(MemoryWriter::new());
    let table = Arc::new(CommandTable::with_builtins(writer.clone()));
    let mut interpreter = Interpreter::new(table.clone());
    let cancel = interpreter.cancel_handle();
    table.register("stop", move |_| {
        let cancel = cancel.clone();
        async move {
            cancel.cancel();
            Ok(())
        }
    });

    let outcome = interpreter
        .execute_script(
            "try\n  stop\n  echo never\ncatch\n  echo caught\nendtry",
            HashMap::new(),
            "cancelled.etx",
        )
        .await;
    assert!(!outcome.success);
    assert!(writer.lines().is_empty());
}

#[tokio::test]
async fn test_builtin_commands_through_interpreter() {
    let writer = Arc::new(MemoryWriter::new());
    let mut interpreter = Interpreter::new(Arc::new(CommandTable::with_builtins(writer.clone())));
    let outcome = interpreter
        .execute_script(
            "set who \"world\"\necho hello $who\ntry\n  fail out of cheese\ncatch\n  echo $error\nendtry\nunknowncmd",
            HashMap::new(),
            "builtins.etx",
        )
        .await;
    assert_eq!(writer.lines(), vec!["hello world", "out of cheese"]);
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().ends_with("Unknown command: unknowncmd"));
}
