use skribe::{Engine, EvalError, Expr, ParseError, TimeState, Value};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const RED: &str = "\x1b[31m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_run(
    engine: &Engine,
    sentence: &str,
    parsed: &Expr,
    simplified: &Expr,
    outcome: &Result<Vec<Value>, EvalError>,
    color: bool,
) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Sentence: \"{}\"", sentence), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Tree ━━━", ansi::GRAY));
    print_tree(engine, parsed, 1, &palette);

    if simplified != parsed {
        println!("\n{}", palette.paint("━━━ Simplified ━━━", ansi::GRAY));
        print_tree(engine, simplified, 1, &palette);
    }

    println!("\n{}", palette.paint("━━━ Result ━━━", ansi::GRAY));
    match outcome {
        Ok(values) if values.is_empty() => {
            println!("{}", palette.dim("  (absent)"));
        }
        Ok(values) => {
            for (idx, value) in values.iter().enumerate() {
                println!(
                    "  {} {} {}",
                    palette.paint(format!("[{}]", idx), ansi::GRAY),
                    palette.bold(palette.paint(engine.display(value), ansi::GREEN)),
                    palette.dim(engine.type_name_of(value).unwrap_or("?")),
                );
            }
        }
        Err(err) => {
            println!("  {}", palette.paint(format!("✗ {err}"), ansi::RED));
        }
    }
    println!();
}

pub fn print_parse_error(sentence: &str, err: &ParseError, color: bool) {
    let palette = ansi::Palette::new(color);
    eprintln!("\n{}", palette.paint(format!("✗ {err}"), ansi::RED));
    if let ParseError::Failure(failure) = err {
        // Point at the offset inside the normalized sentence.
        eprintln!("  {}", failure.text);
        eprintln!(
            "  {}{} {}",
            " ".repeat(failure.offset),
            palette.paint("^", ansi::YELLOW),
            palette.dim(format!("expected {}", failure.expected)),
        );
    } else {
        eprintln!("  {}", palette.dim(sentence));
    }
    eprintln!();
}

fn print_tree(engine: &Engine, expr: &Expr, indent: usize, palette: &ansi::Palette) {
    let pad = "  ".repeat(indent);
    match expr {
        Expr::Literal { values, .. } => {
            let rendered: Vec<String> = values.iter().map(|v| engine.display(v)).collect();
            println!(
                "{pad}{} {}",
                palette.paint("literal", ansi::BLUE),
                palette.paint(rendered.join(", "), ansi::GREEN),
            );
        }
        Expr::Variable { name, plural, .. } => {
            let suffix = if *plural { "::*" } else { "" };
            println!("{pad}{} {{{name}{suffix}}}", palette.paint("variable", ansi::BLUE));
        }
        Expr::List { children } => {
            println!("{pad}{}", palette.paint("list", ansi::BLUE));
            for child in children {
                print_tree(engine, child, indent + 1, palette);
            }
        }
        Expr::Call { reg, pattern, children, time } => {
            let time_tag = match time {
                TimeState::Present => String::new(),
                other => format!(" ({other})"),
            };
            println!(
                "{pad}{} {}{}",
                palette.paint(engine.adapter_id(*reg), ansi::CYAN),
                palette.dim(format!("pattern {pattern}")),
                palette.paint(time_tag, ansi::YELLOW),
            );
            for child in children {
                match child {
                    Some(child) => print_tree(engine, child, indent + 1, palette),
                    None => println!("{}  {}", pad, palette.dim("(omitted)")),
                }
            }
        }
        Expr::Convert { inner, to } => {
            println!("{pad}{} {}", palette.paint("convert to", ansi::BLUE), engine.type_name(*to));
            print_tree(engine, inner, indent + 1, palette);
        }
    }
}
