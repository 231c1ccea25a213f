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

//! Command-line interface for FEEL evaluation
//!
//! Evaluates expressions and unary tests against a JSON context, and exposes
//! the temporal literal resolver directly.

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::process;

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use octofhir_feel::registry::standard_registry;
use octofhir_feel::{
    Context, EvaluationResult, FeelValue, date, duration, evaluate, parse_expression,
    parse_unary_tests, unary_test,
};
use serde_json::Value as JsonValue;

#[derive(Parser)]
#[command(name = "octofhir-feel")]
#[command(about = "Evaluate FEEL expressions and unary tests against a JSON context")]
#[command(version)]
#[command(author = "OctoFHIR Team <funyloony@gmail.com>")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a FEEL expression
    Evaluate {
        /// FEEL expression to evaluate
        expression: String,
        /// JSON file containing the context (reads from stdin if piped)
        #[arg(short, long)]
        file: Option<String>,
        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
        /// Suppress informational messages
        #[arg(short, long)]
        quiet: bool,
    },
    /// Evaluate unary tests against the context's `?` entry
    UnaryTest {
        /// Unary tests, e.g. `> 10, "A"`
        tests: String,
        /// Input value as JSON; overrides `?` in the context
        #[arg(short, long)]
        input: Option<String>,
        /// JSON file containing the context (reads from stdin if piped)
        #[arg(short, long)]
        file: Option<String>,
        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
        /// Suppress informational messages
        #[arg(short, long)]
        quiet: bool,
    },
    /// Parse an expression and print its syntax tree
    Parse {
        /// FEEL expression to parse
        expression: String,
        /// Parse as unary tests instead of an expression
        #[arg(short, long)]
        unary: bool,
        /// Suppress informational messages
        #[arg(short, long)]
        quiet: bool,
    },
    /// Resolve date, time and zone parts into a date-time
    Date {
        /// Date, ISO date-time, or `date@zone` text
        date: Option<String>,
        /// Time of day
        #[arg(short, long)]
        time: Option<String>,
        /// IANA zone name or UTC offset
        #[arg(short, long)]
        zone: Option<String>,
    },
    /// Parse an ISO-8601 duration
    Duration {
        /// Duration text such as `P1DT2H`, or a millisecond count
        text: String,
    },
    /// List the built-in functions
    Functions,
}

fn main() {
    human_panic::setup_panic!();
    env_logger::init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Evaluate {
            expression,
            file,
            pretty,
            quiet,
        } => handle_evaluate(&expression, file.as_deref(), pretty, quiet),
        Commands::UnaryTest {
            tests,
            input,
            file,
            pretty,
            quiet,
        } => handle_unary_test(&tests, input.as_deref(), file.as_deref(), pretty, quiet),
        Commands::Parse {
            expression,
            unary,
            quiet,
        } => handle_parse(&expression, unary, quiet),
        Commands::Date { date, time, zone } => {
            handle_date(date.as_deref(), time.as_deref(), zone.as_deref())
        }
        Commands::Duration { text } => handle_duration(&text),
        Commands::Functions => {
            handle_functions();
            Ok(())
        }
    };

    if let Err(e) = outcome {
        eprintln!("{} {e:#}", "✗".red());
        process::exit(1);
    }
}

fn read_context(file: Option<&str>) -> Result<Context> {
    let data = match file {
        Some(filename) => fs::read_to_string(filename)
            .with_context(|| format!("reading context file '{filename}'"))?,
        None if io::stdin().is_terminal() => return Ok(Context::new()),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("reading context from stdin")?;
            buffer
        }
    };
    if data.trim().is_empty() {
        return Ok(Context::new());
    }
    let json: JsonValue = serde_json::from_str(&data).context("parsing JSON context")?;
    match Context::from_json(&json) {
        Some(context) => Ok(context),
        None => bail!("context must be a JSON object"),
    }
}

fn print_result(expression: &str, result: &EvaluationResult, pretty: bool, quiet: bool) -> Result<()> {
    if !quiet {
        eprintln!("Expression: {expression}");
        for warning in &result.warnings {
            eprintln!("{} {warning}", "warning:".yellow());
        }
    }
    let output = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{output}");
    Ok(())
}

fn handle_evaluate(expression: &str, file: Option<&str>, pretty: bool, quiet: bool) -> Result<()> {
    let context = read_context(file)?;
    let result = evaluate(expression, &context)?;
    print_result(expression, &result, pretty, quiet)
}

fn handle_unary_test(
    tests: &str,
    input: Option<&str>,
    file: Option<&str>,
    pretty: bool,
    quiet: bool,
) -> Result<()> {
    let mut context = read_context(file)?;
    if let Some(input) = input {
        let json: JsonValue = serde_json::from_str(input).context("parsing input value")?;
        context.insert("?", FeelValue::from_json(&json));
    }
    let result = unary_test(tests, &context)?;
    print_result(tests, &result, pretty, quiet)
}

fn handle_parse(expression: &str, unary: bool, quiet: bool) -> Result<()> {
    let rendered = if unary {
        parse_unary_tests(expression)?.to_string()
    } else {
        parse_expression(expression)?.to_string()
    };
    if quiet {
        println!("OK");
    } else {
        println!("{} Expression parsed successfully", "✓".green());
        println!("AST: {rendered}");
    }
    Ok(())
}

fn handle_date(date_text: Option<&str>, time: Option<&str>, zone: Option<&str>) -> Result<()> {
    let resolved = date(date_text, time, zone)?;
    println!("{resolved}");
    println!("epoch ms: {}", resolved.epoch_milliseconds());
    Ok(())
}

fn handle_duration(text: &str) -> Result<()> {
    let parsed = match text.parse::<f64>() {
        Ok(millis) => duration(millis)?,
        Err(_) => duration(text)?,
    };
    println!("{parsed}");
    match parsed.total_milliseconds() {
        Some(millis) => println!("ms: {millis}"),
        None => println!("ms: {}", "undefined (calendar units)".dimmed()),
    }
    Ok(())
}

fn handle_functions() {
    let registry = standard_registry();
    let mut names: Vec<&str> = registry.names().collect();
    names.sort_unstable();
    for name in names {
        let Some(function) = registry.get(name) else {
            continue;
        };
        let marker = if function.is_pure() {
            String::new()
        } else {
            format!(" {}", "(reads clock)".dimmed())
        };
        println!(
            "{}{marker}\n  {}\n  {}",
            function.signature().to_string().bold(),
            function.human_friendly_name(),
            function.documentation()
        );
    }
}
