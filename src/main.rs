mod debug_report;

use std::io::{self, IsTerminal, Read};

use skribe::{Engine, EventBinding, Value, default_engine};
use tracing_subscriber::EnvFilter;

const DEFAULT_EXPECTED: &str = "text";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let engine = default_engine();
    let binding = build_binding(engine, &config.variables);

    let parsed = match engine.parse(&config.sentence, &config.expected) {
        Ok(expr) => expr,
        Err(err) => {
            debug_report::print_parse_error(&config.sentence, &err, config.color);
            std::process::exit(1);
        }
    };
    let simplified = engine.simplify(parsed.clone());
    let outcome = engine.evaluate(&simplified, &binding);
    debug_report::print_run(engine, &config.sentence, &parsed, &simplified, &outcome, config.color);
    if outcome.is_err() {
        std::process::exit(1);
    }
}

struct CliConfig {
    sentence: String,
    expected: String,
    variables: Vec<(String, String)>,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut sentence: Option<String> = None;
    let mut expected = DEFAULT_EXPECTED.to_string();
    let mut variables = Vec::new();
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("skribe {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--type" | "-t" => {
                expected = args.next().ok_or_else(|| "error: --type expects a value".to_string())?;
            }
            "--var" => {
                let value = args.next().ok_or_else(|| "error: --var expects NAME=VALUE".to_string())?;
                variables.push(split_var(&value)?);
            }
            "--" => {
                let rest = args.collect::<Vec<_>>().join(" ");
                if !rest.trim().is_empty() {
                    if sentence.is_some() {
                        return Err("error: sentence provided multiple times".to_string());
                    }
                    sentence = Some(rest);
                }
                break;
            }
            _ if arg.starts_with("--type=") => {
                expected = arg.trim_start_matches("--type=").to_string();
            }
            _ if arg.starts_with("--var=") => {
                variables.push(split_var(arg.trim_start_matches("--var="))?);
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                let rest = std::iter::once(arg).chain(args).collect::<Vec<_>>().join(" ");
                if sentence.is_some() {
                    return Err("error: sentence provided multiple times".to_string());
                }
                sentence = Some(rest);
                break;
            }
        }
    }

    let sentence = match sentence {
        Some(value) => value,
        None => read_stdin_input()?,
    };

    if sentence.trim().is_empty() {
        return Err(format!("error: no sentence provided\n\n{}", help_text()));
    }

    Ok(CliConfig { sentence, expected, variables, color })
}

fn split_var(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("error: invalid --var '{raw}' (expected NAME=VALUE)"))?;
    if name.is_empty() {
        return Err(format!("error: invalid --var '{raw}' (empty name)"));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Resolve each `--var` value to a typed constant by parsing it as a
/// sentence against each registered type in turn.
fn build_binding(engine: &Engine, variables: &[(String, String)]) -> EventBinding {
    const CANDIDATE_TYPES: [&str; 6] = ["integer", "number", "boolean", "location", "instant", "text"];

    let mut binding = EventBinding::empty();
    for (name, raw) in variables {
        let values = CANDIDATE_TYPES
            .iter()
            .find_map(|expected| constant(engine, raw, expected))
            .unwrap_or_else(|| vec![Value::Text(raw.clone())]);
        binding.set_variable(name.clone(), values);
    }
    binding
}

fn constant(engine: &Engine, raw: &str, expected: &str) -> Option<Vec<Value>> {
    let expr = engine.parse(raw, expected).ok()?;
    engine.evaluate(&expr, &EventBinding::empty()).ok().filter(|values| !values.is_empty())
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn help_text() -> String {
    format!(
        "skribe {version}

Sentence expression engine CLI.

Usage:
  skribe [OPTIONS] [--] <sentence...>

Options:
  -t, --type <name>      Expected result type. Default: {default_expected}
  --var NAME=VALUE       Bind a variable for evaluation. May be repeated;
                         the value is parsed as a constant sentence.
  --color                Force ANSI color output.
  --no-color             Disable ANSI color output.
  -h, --help             Show this help message.
  -V, --version          Print version information.

If no sentence is given on the command line, it is read from stdin.
Set RUST_LOG=skribe=trace to watch candidate binding and folding.

Exit codes:
  0  Parsed and evaluated.
  1  Parse or evaluation failure.
  2  Invalid arguments or missing sentence.
",
        version = env!("CARGO_PKG_VERSION"),
        default_expected = DEFAULT_EXPECTED
    )
}
