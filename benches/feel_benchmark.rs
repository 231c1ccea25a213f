// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use octofhir_feel::parser::tokenize;
use octofhir_feel::{Context, EngineConfig, FeelEngine, FeelValue, date, duration, parse_expression};

const EXPRESSIONS: &[&str] = &[
    "Applicant Age >= 18 and credit score > 600",
    "for x in 1..50 return x * x",
    "sum(orders[amount > 100].amount)",
    "if date(\"2024-03-01\") - @\"P1M\" < today() then \"past\" else \"future\"",
    "some o in orders satisfies upper case(o.status) = \"OPEN\"",
];

fn bench_context() -> Context {
    let orders: Vec<_> = (0..20)
        .map(|i| {
            Context::new()
                .with("amount", i * 15)
                .with("status", if i % 3 == 0 { "open" } else { "closed" })
                .entries()
                .clone()
        })
        .map(FeelValue::from)
        .collect();
    Context::new()
        .with("Applicant Age", 34)
        .with("credit score", 710)
        .with("orders", orders)
}

fn benchmark_temporal_literals(c: &mut Criterion) {
    c.bench_function("date_only_literal", |b| {
        b.iter(|| date(black_box(Some("2024-02-29")), None, None))
    });
    c.bench_function("zoned_literal", |b| {
        b.iter(|| date(black_box(Some("2024-02-29T10:15:00@Europe/Paris")), None, None))
    });
    c.bench_function("duration_literal", |b| {
        b.iter(|| duration(black_box("P1Y2M3DT4H5M6.789S")))
    });
}

fn benchmark_parser(c: &mut Criterion) {
    for (i, expression) in EXPRESSIONS.iter().enumerate() {
        c.bench_function(&format!("expr_{i}_tokenizer"), |b| {
            b.iter(|| black_box(tokenize(black_box(expression))))
        });
        c.bench_function(&format!("expr_{i}_parser"), |b| {
            b.iter(|| black_box(parse_expression(black_box(expression))))
        });
    }
}

fn benchmark_evaluation(c: &mut Criterion) {
    let context = bench_context();
    let cached = FeelEngine::new();
    let uncached = FeelEngine::with_config(EngineConfig::default().with_ast_cache(false));

    for (i, expression) in EXPRESSIONS.iter().enumerate() {
        c.bench_function(&format!("expr_{i}_evaluate_cached"), |b| {
            b.iter(|| black_box(cached.evaluate(black_box(expression), &context)))
        });
        c.bench_function(&format!("expr_{i}_evaluate_uncached"), |b| {
            b.iter(|| black_box(uncached.evaluate(black_box(expression), &context)))
        });
    }
}

criterion_group!(
    benches,
    benchmark_temporal_literals,
    benchmark_parser,
    benchmark_evaluation
);
criterion_main!(benches);
