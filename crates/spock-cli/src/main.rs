use std::{env, fs, io::Read, process::ExitCode};

use spock::{Engine, Session};

/// Which `Session` method the CLI drives.
enum Mode {
    Learn,
    Explain,
    Prove { declaration: String, threshold: f64 },
}

fn main() -> ExitCode {
    let filter = tracing_subscriber::EnvFilter::try_from_env("SPOCK_LOG_LEVEL").unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (mode, file_path) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let source = match read_source(file_path.as_deref()) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let engine = match Engine::from_env() {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut session = Session::new(&engine);

    match mode {
        Mode::Learn => match session.learn(&source) {
            Ok(results) => {
                for (name, value) in &results {
                    println!("@{name} = {value}");
                }
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("error: {err}");
                ExitCode::FAILURE
            }
        },
        Mode::Explain => match session.explain(&source) {
            Ok((results, events)) => {
                for (name, value) in &results {
                    println!("@{name} = {value}");
                }
                for event in &events {
                    eprintln!("{event:?}");
                }
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("error: {err}");
                ExitCode::FAILURE
            }
        },
        Mode::Prove { declaration, threshold } => match session.prove(&source, &declaration, threshold) {
            Ok(true) => {
                println!("proved");
                ExitCode::SUCCESS
            }
            Ok(false) => {
                println!("not proved");
                ExitCode::FAILURE
            }
            Err(err) => {
                eprintln!("error: {err}");
                ExitCode::FAILURE
            }
        },
    }
}

fn parse_args(args: &[String]) -> Result<(Mode, Option<String>), String> {
    let mut mode_name = "learn".to_string();
    let mut declaration = None;
    let mut threshold = 1.0;
    let mut file_path = None;

    for arg in args {
        if let Some(value) = arg.strip_prefix("--mode=") {
            mode_name = value.to_string();
        } else if let Some(value) = arg.strip_prefix("--declaration=") {
            declaration = Some(value.to_string());
        } else if let Some(value) = arg.strip_prefix("--threshold=") {
            threshold = value.parse().map_err(|_| format!("invalid --threshold value '{value}'"))?;
        } else if arg.starts_with("--") {
            return Err(format!("unknown flag '{arg}'"));
        } else {
            file_path = Some(arg.clone());
        }
    }

    let mode = match mode_name.as_str() {
        "learn" => Mode::Learn,
        "explain" => Mode::Explain,
        "prove" => Mode::Prove {
            declaration: declaration.ok_or("--mode=prove requires --declaration=NAME")?,
            threshold,
        },
        other => return Err(format!("unknown mode '{other}'")),
    };

    Ok((mode, file_path))
}

fn read_source(file_path: Option<&str>) -> Result<String, String> {
    match file_path {
        Some(path) => fs::read_to_string(path).map_err(|e| format!("reading {path}: {e}")),
        None => {
            let mut source = String::new();
            std::io::stdin().read_to_string(&mut source).map_err(|e| format!("reading stdin: {e}"))?;
            Ok(source)
        }
    }
}
