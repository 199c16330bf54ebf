mod common;

use common::Harness;
use etx_script::{InterpreterConfig, Value};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_if_chain_runs_first_matching_branch_only() {
    let mut harness = Harness::new();
    let outcome = harness
        .run(
            r#"
if false
  echo if
elif true
  echo elif
elif true
  echo second-elif
else
  echo else
endif
"#,
        )
        .await;

    assert!(outcome.success);
    assert_eq!(harness.commands(), vec!["echo elif"]);
}

#[tokio::test]
async fn test_else_runs_when_nothing_matched() {
    let mut harness = Harness::new();
    harness
        .run("set x 1\nif $x > 5\n  echo big\nelif $x > 2\n  echo medium\nelse\n  echo small\nendif")
        .await;
    assert_eq!(harness.commands(), vec!["echo small"]);
}

#[tokio::test]
async fn test_nested_if_inside_branch() {
    let mut harness = Harness::new();
    harness
        .run(
            r#"
set a 1
set b 2
if $a == 1
  if $b == 3
    echo inner
  else
    echo inner-else
  endif
  echo after-inner
else
  echo outer-else
endif
echo done
"#,
        )
        .await;
    assert_eq!(
        harness.commands(),
        vec!["echo inner-else", "echo after-inner", "echo done"]
    );
}

#[tokio::test]
async fn test_range_for_dispatches_in_order() {
    let mut harness = Harness::new();
    harness.run("for i 1 3\n  echo $i\nendfor").await;
    assert_eq!(harness.commands(), vec!["echo 1", "echo 2", "echo 3"]);
}

#[tokio::test]
async fn test_for_each_binds_elements() {
    let mut harness = Harness::new();
    harness
        .run("for item in [\"a\", \"b\", \"c\"]\n  echo $item\nendfor")
        .await;
    assert_eq!(harness.commands(), vec!["echo a", "echo b", "echo c"]);
    assert_eq!(harness.variable("item"), Some(Value::from("c")));
}

#[tokio::test]
async fn test_for_each_over_non_array_runs_zero_times() {
    let mut harness = Harness::new();
    let outcome = harness
        .run("set text \"abc\"\nfor item in $text\n  echo $item\nendfor\nfor n in 42\n  echo $n\nendfor")
        .await;
    assert!(outcome.success);
    assert!(harness.commands().is_empty());
}

#[tokio::test]
async fn test_break_stops_loop() {
    let mut harness = Harness::new();
    harness
        .run("for i 1 5\n  if $i == 3\n    break\n  endif\n  echo $i\nendfor\necho after")
        .await;
    assert_eq!(harness.commands(), vec!["echo 1", "echo 2", "echo after"]);
}

#[tokio::test]
async fn test_continue_skips_rest_of_iteration() {
    let mut harness = Harness::new();
    harness
        .run("for i 1 4\n  if $i % 2 == 0\n    continue\n  endif\n  echo $i\nendfor")
        .await;
    assert_eq!(harness.commands(), vec!["echo 1", "echo 3"]);
}

#[tokio::test]
async fn test_break_only_leaves_innermost_loop() {
    let mut harness = Harness::new();
    harness
        .run(
            r#"
for i 1 2
  for j 1 3
    if $j == 2
      break
    endif
    echo $i $j
  endfor
endfor
"#,
        )
        .await;
    assert_eq!(harness.commands(), vec!["echo 1 1", "echo 2 1"]);
}

#[tokio::test]
async fn test_while_loop_counts_down() {
    let mut harness = Harness::new();
    harness
        .run("set n 3\nwhile $n > 0\n  echo $n\n  set n $n - 1\nendwhile")
        .await;
    assert_eq!(harness.commands(), vec!["echo 3", "echo 2", "echo 1"]);
    assert_eq!(harness.variable("n"), Some(Value::Number(0.0)));
}

#[tokio::test]
async fn test_for_with_nan_bounds_runs_zero_times() {
    let mut harness = Harness::new();
    let outcome = harness.run("for i 1 nope\n  echo $i\nendfor").await;
    assert!(outcome.success);
    assert!(harness.commands().is_empty());
}

#[tokio::test]
async fn test_comments_and_blank_lines_are_skipped() {
    let mut harness = Harness::new();
    harness.run("# header\n\n   # indented comment\necho ok\n").await;
    assert_eq!(harness.commands(), vec!["echo ok"]);
}

#[tokio::test]
async fn test_top_level_return_ends_script() {
    let mut harness = Harness::new();
    let outcome = harness.run("echo one\nreturn 7\necho two").await;
    assert!(outcome.success);
    assert_eq!(outcome.return_value, Some(Value::Number(7.0)));
    assert_eq!(harness.commands(), vec!["echo one"]);
}

#[tokio::test]
async fn test_array_elements_and_indexed_assignment() {
    let mut harness = Harness::new();
    harness
        .run("set xs [10, 20, 30]\nset xs[1] $xs[1] + 5\nset xs[4] 1\necho $xs[1] $xs[0]")
        .await;
    assert_eq!(harness.commands(), vec!["echo 25 10"]);
    assert_eq!(
        harness.variable("xs"),
        Some(Value::Array(vec![
            Value::Number(10.0),
            Value::Number(25.0),
            Value::Number(30.0),
            Value::Null,
            Value::Number(1.0),
        ]))
    );
}

#[tokio::test]
async fn test_unset_removes_variable() {
    let mut harness = Harness::new();
    harness.run("set x 1\nunset x\necho $x").await;
    assert_eq!(harness.commands(), vec!["echo $x"]);
    assert_eq!(harness.variable("x"), None);
}

#[tokio::test]
async fn test_malformed_set_is_ignored() {
    let mut harness = Harness::new();
    let outcome = harness.run("set lonely\necho next").await;
    assert!(outcome.success);
    assert_eq!(harness.commands(), vec!["echo next"]);
}

#[tokio::test]
async fn test_huge_index_assignment_fails_without_allocating() {
    let mut harness = Harness::new();
    let outcome = harness
        .run("set xs[99999999999999999999] 1\necho after")
        .await;
    assert!(!outcome.success);
    assert_eq!(
        outcome.error.as_deref(),
        Some(
            "line 1 (set xs[99999999999999999999] 1): \
             Invalid index '100000000000000000000' for 'xs'"
        )
    );
    assert!(harness.commands().is_empty());

    let outcome = harness
        .run("try\n  set ys[1e12] 1\ncatch\n  echo $error\nendtry")
        .await;
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(
        harness.commands(),
        vec!["echo Invalid index '1000000000000' for 'ys'"]
    );
}

#[tokio::test]
async fn test_array_index_limit_is_configurable() {
    let mut harness = Harness::with_config(InterpreterConfig {
        max_array_index: 4,
        ..InterpreterConfig::default()
    });
    let outcome = harness.run("set xs[4] \"last\"\nset xs[5] \"over\"").await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().ends_with("Invalid index '5' for 'xs'"));
    assert_eq!(
        harness.variable("xs"),
        Some(Value::Array(vec![
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Null,
            Value::from("last"),
        ]))
    );
}

#[tokio::test]
async fn test_bad_index_in_command_is_reported_and_skipped() {
    let mut harness = Harness::new();
    let outcome = harness
        .run("set xs [1, 2]\necho item $xs[(]\necho after $xs[1]")
        .await;
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(harness.commands(), vec!["echo item ", "echo after 2"]);
    assert_eq!(
        harness.reporter.messages(),
        vec!["Error evaluating expression: ("]
    );
}

#[tokio::test]
async fn test_deeply_nested_blocks_hit_nesting_limit() {
    let mut harness = Harness::with_config(InterpreterConfig {
        max_nesting_depth: 3,
        ..InterpreterConfig::default()
    });
    let outcome = harness
        .run("if true\n  if true\n    if true\n      echo deep\n    endif\n  endif\nendif")
        .await;
    assert!(!outcome.success);
    assert_eq!(
        outcome.error.as_deref(),
        Some("line 3 (if true): Nesting depth limit (3) exceeded")
    );
    assert!(harness.commands().is_empty());
}
