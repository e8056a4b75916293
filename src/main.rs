use clap::Parser;
use makevar::{Expander, ExpandError, Flavor, Origin, SourceLocation, WarningAction};

#[derive(Parser)]
#[command(name = "makevar")]
#[command(about = "Expand make-style variable references in text")]
#[command(version)]
struct Cli {
    /// Define a variable: NAME=VALUE (recursive), NAME:=VALUE (simple),
    /// NAME+=VALUE (append)
    #[arg(short = 'D', long = "define", value_name = "DEF")]
    define: Vec<String>,

    /// Warning settings, e.g. "undefined-var:error" or "ignore"
    #[arg(long = "warn", value_name = "SPEC")]
    warn: Option<String>,

    /// Read the text to expand from a file
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    file: Option<String>,

    /// Output the result and warnings as JSON
    #[arg(long = "json")]
    json: bool,

    /// Text to expand
    #[arg()]
    text: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut exp = Expander::new();

    if let Some(spec) = &cli.warn {
        if let Err(err) = exp.diagnostics_mut().decode_flag(spec) {
            fatal(&err);
        }
    }

    for def in &cli.define {
        if let Err(err) = apply_define(&mut exp, def) {
            fatal(&err);
        }
    }

    // Determine the input: argument, file, or stdin.
    let (text, location) = if let Some(text) = cli.text {
        (text, None)
    } else if let Some(ref path) = cli.file {
        match std::fs::read_to_string(path) {
            Ok(content) => (trim_final_newline(content), Some(SourceLocation::new(path.as_str(), 1))),
            Err(e) => {
                eprintln!("makevar: cannot read '{}': {}", path, e);
                std::process::exit(1);
            }
        }
    } else {
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() {
            eprintln!("makevar: no input. Pass text, use -f FILE, or pipe via stdin.");
            std::process::exit(1);
        }
        match std::io::read_to_string(std::io::stdin()) {
            Ok(content) => (trim_final_newline(content), Some(SourceLocation::new("<stdin>", 1))),
            Err(e) => {
                eprintln!("makevar: cannot read stdin: {}", e);
                std::process::exit(1);
            }
        }
    };
    exp.set_location(location);

    let outcome = exp.expand(&text);

    if !cli.json {
        emit_warnings(&exp);
    }

    match outcome {
        Ok(result) => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "result": result,
                        "warnings": exp.diagnostics().reported(),
                    })
                );
            } else {
                println!("{}", result);
            }
            std::process::exit(0);
        }
        Err(err) => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "error": err.to_string(),
                        "warnings": exp.diagnostics().reported(),
                    })
                );
                std::process::exit(2);
            }
            fatal(&err);
        }
    }
}

/// Apply one -D definition.
fn apply_define(exp: &mut Expander, def: &str) -> Result<(), ExpandError> {
    let eq = match def.find('=') {
        Some(eq) => eq,
        None => {
            eprintln!("makevar: invalid definition '{}': missing '='", def);
            std::process::exit(1);
        }
    };
    let value = def[eq + 1..].trim_ascii_start();
    match def.as_bytes()[..eq].last().copied() {
        Some(b':') => exp.define(&def[..eq - 1], value, Flavor::Simple, Origin::CommandLine),
        Some(b'+') => exp.append_define(&def[..eq - 1], value, Origin::CommandLine),
        _ => exp.define(&def[..eq], value, Flavor::Recursive, Origin::CommandLine),
    }
}

fn trim_final_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

/// Print every warning-level diagnostic the expansion raised.
fn emit_warnings(exp: &Expander) {
    for w in exp.diagnostics().reported() {
        if w.action == WarningAction::Warn {
            match &w.location {
                Some(loc) => eprintln!("makevar: {}: warning: {}", loc, w.message),
                None => eprintln!("makevar: warning: {}", w.message),
            }
        }
    }
}

fn fatal(err: &ExpandError) -> ! {
    match err.location() {
        Some(loc) => eprintln!("makevar: {}: *** {}.  Stop.", loc, err),
        None => eprintln!("makevar: *** {}.  Stop.", err),
    }
    std::process::exit(2);
}
