use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use etx_script::{
    eval::{expression::ExpressionEvaluator, store::VariableStore},
    host::{CommandDispatcher, CommandResult},
    Interpreter, Value,
};

struct NullDispatcher;

#[async_trait]
impl CommandDispatcher for NullDispatcher {
    async fn dispatch(&self, _command_line: &str) -> CommandResult<()> {
        Ok(())
    }
}

fn bench_expression(c: &mut Criterion) {
    let evaluator = ExpressionEvaluator::new();
    let mut store = VariableStore::new();
    store.set("x", Value::Number(21.0));
    store.set("xs", Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]));

    c.bench_function("evaluate arithmetic", |b| {
        b.iter(|| evaluator.evaluate(black_box("($x * 2 + 3) % 7 >= 1 && $xs[1] == 2"), &store))
    });
}

fn bench_counting_loop(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let script = "set total 0\nfor i 1 1000\n  set total $total + $i\nendfor";

    c.bench_function("for loop 1..1000", |b| {
        b.to_async(&runtime).iter(|| async {
            let mut interpreter = Interpreter::new(Arc::new(NullDispatcher));
            interpreter
                .execute_script(black_box(script), HashMap::new(), "bench.etx")
                .await
        })
    });
}

criterion_group!(benches, bench_expression, bench_counting_loop);
criterion_main!(benches);
