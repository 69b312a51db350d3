use lead_audit::{Variant, run_check};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = lead_audit::infrastructure::logging::init_logging() {
        eprintln!("warning: logging setup failed: {e}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (variant, directory) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{}", usage());
            return ExitCode::FAILURE;
        }
    };

    println!("{}", run_check(variant, &directory));
    ExitCode::SUCCESS
}

fn parse_args(args: &[String]) -> Result<(Variant, PathBuf), String> {
    // "civitek new <dir>" is the historical two-word spelling.
    let (keyword, rest) = match args {
        [first, second, rest @ ..] if first == "civitek" && second == "new" => {
            (format!("{first} {second}"), rest)
        }
        [first, rest @ ..] => (first.clone(), rest),
        [] => return Err("error: no variant given".to_string()),
    };
    let variant = Variant::from_keyword(&keyword)
        .ok_or_else(|| format!("error: unknown variant '{keyword}'"))?;
    let directory = match rest {
        [dir] => PathBuf::from(dir),
        [] => PathBuf::from("."),
        _ => return Err("error: too many arguments".to_string()),
    };
    Ok((variant, directory))
}

fn usage() -> String {
    let variants = Variant::ALL
        .iter()
        .map(|v| v.name())
        .collect::<Vec<_>>()
        .join(" | ");
    format!("usage: lead-audit <{variants}> [directory]")
}
