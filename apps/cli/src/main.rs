use std::env;
use std::fs;
use std::io::Read;

use expr_eval::{Bindings, Evaluated, SafeEvaluator};
use search_expert::{CountdownEnv, SearchExpert};
use trace_model::{Step, TraceExample, Value};
use trace_solver::ExpertRegistry;
use trace_verifier::{TraceVerifier, lint_formulas};

#[derive(Debug, PartialEq)]
enum Commands {
    Verify {
        path: String,
        expert: Option<String>,
        answer: Option<String>,
        tolerance: Option<f64>,
    },
    Run {
        path: String,
    },
    Batch {
        path: String,
    },
    Lint {
        path: String,
    },
    Eval {
        expression: String,
        bindings: Vec<(String, String)>,
    },
    Experts,
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    match parse_command(&args).and_then(run) {
        Ok(out) => println!("{out}"),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

fn run(command: Commands) -> Result<String, String> {
    let registry = build_registry();

    match command {
        Commands::Verify {
            path,
            expert,
            answer,
            tolerance,
        } => {
            let text = read_input(&path)?;
            let expected_answer = answer
                .map(|raw| serde_json::from_str::<Value>(&raw))
                .transpose()
                .map_err(|e| format!("invalid --answer value: {e}"))?;
            let mut verifier = TraceVerifier::new(&registry);
            if let Some(tolerance) = tolerance {
                verifier = verifier.with_tolerance(tolerance);
            }
            let result = verifier.verify(&text, expert.as_deref(), expected_answer.as_ref());
            serde_json::to_string_pretty(&result).map_err(|e| e.to_string())
        }
        Commands::Run { path } => {
            let text = read_input(&path)?;
            let result = TraceVerifier::new(&registry)
                .execute(&text)
                .map_err(|e| e.to_string())?;
            serde_json::to_string_pretty(&result).map_err(|e| e.to_string())
        }
        Commands::Batch { path } => {
            let text = read_input(&path)?;
            let examples: Vec<TraceExample> =
                serde_json::from_str(&text).map_err(|e| format!("invalid example file: {e}"))?;
            let report = TraceVerifier::new(&registry).verify_batch(&examples);
            Ok(format!(
                "total: {}\nparsed: {}\nvalid: {} ({:.1}%)\ncorrect: {} ({:.1}%)",
                report.total,
                report.parsed,
                report.valid,
                report.valid_rate() * 100.0,
                report.correct,
                report.accuracy() * 100.0,
            ))
        }
        Commands::Lint { path } => {
            let text = read_input(&path)?;
            let steps = load_steps(&text)?;
            let warnings = lint_formulas(&steps);
            if warnings.is_empty() {
                Ok("no formula warnings".to_string())
            } else {
                Ok(warnings.join("\n"))
            }
        }
        Commands::Eval {
            expression,
            bindings,
        } => {
            let bindings = parse_bindings(&bindings)?;
            let value = SafeEvaluator::new()
                .evaluate(&expression, &bindings)
                .map_err(|e| e.to_string())?;
            Ok(value.to_string())
        }
        Commands::Experts => {
            let mut out = String::new();
            for name in registry.names() {
                let description = registry
                    .get(&name)
                    .map(|expert| expert.description().to_string())
                    .unwrap_or_default();
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&format!("{name}: {description}"));
            }
            Ok(out)
        }
    }
}

fn build_registry() -> ExpertRegistry {
    let mut registry = ExpertRegistry::new();
    arithmetic_experts::register_all(&mut registry);
    registry.register(Box::new(
        SearchExpert::new().with_environment("countdown", Box::new(CountdownEnv::default())),
    ));
    registry
}

fn parse_command(args: &[String]) -> Result<Commands, String> {
    let Some(cmd) = args.first() else {
        return Err(help_text());
    };

    match cmd.as_str() {
        "verify" => parse_verify_command(args),
        "run" => {
            if args.len() != 2 {
                return Err("run requires a trace file".to_string());
            }
            Ok(Commands::Run {
                path: args[1].clone(),
            })
        }
        "batch" => {
            if args.len() != 2 {
                return Err("batch requires an example file".to_string());
            }
            Ok(Commands::Batch {
                path: args[1].clone(),
            })
        }
        "lint" => {
            if args.len() != 2 {
                return Err("lint requires a trace file".to_string());
            }
            Ok(Commands::Lint {
                path: args[1].clone(),
            })
        }
        "eval" => parse_eval_command(args),
        "experts" => {
            if args.len() != 1 {
                return Err("experts takes no arguments".to_string());
            }
            Ok(Commands::Experts)
        }
        _ => Err(help_text()),
    }
}

fn parse_verify_command(args: &[String]) -> Result<Commands, String> {
    if args.len() < 2 {
        return Err("verify requires a trace file".to_string());
    }

    let path = args[1].clone();
    let mut expert = None;
    let mut answer = None;
    let mut tolerance = None;

    let mut i = 2usize;
    while i < args.len() {
        match args[i].as_str() {
            "--expert" => {
                if i + 1 >= args.len() {
                    return Err("--expert requires a name".to_string());
                }
                expert = Some(args[i + 1].clone());
                i += 2;
            }
            "--answer" => {
                if i + 1 >= args.len() {
                    return Err("--answer requires a JSON value".to_string());
                }
                answer = Some(args[i + 1].clone());
                i += 2;
            }
            "--tolerance" => {
                if i + 1 >= args.len() {
                    return Err("--tolerance requires a number".to_string());
                }
                tolerance = Some(
                    args[i + 1]
                        .parse::<f64>()
                        .map_err(|_| "--tolerance must be a number".to_string())?,
                );
                i += 2;
            }
            unknown => return Err(format!("unknown option for verify: {unknown}")),
        }
    }

    Ok(Commands::Verify {
        path,
        expert,
        answer,
        tolerance,
    })
}

fn parse_eval_command(args: &[String]) -> Result<Commands, String> {
    if args.len() < 2 {
        return Err("eval requires an expression".to_string());
    }

    let expression = args[1].clone();
    let mut bindings = Vec::new();

    let mut i = 2usize;
    while i < args.len() {
        match args[i].as_str() {
            "--let" => {
                if i + 1 >= args.len() {
                    return Err("--let requires name=value".to_string());
                }
                let Some((name, value)) = args[i + 1].split_once('=') else {
                    return Err(format!("--let expects name=value, got {}", args[i + 1]));
                };
                bindings.push((name.trim().to_string(), value.trim().to_string()));
                i += 2;
            }
            unknown => return Err(format!("unknown option for eval: {unknown}")),
        }
    }

    Ok(Commands::Eval {
        expression,
        bindings,
    })
}

fn help_text() -> String {
    "Usage: trace <command>\n  verify <file|-> [--expert NAME] [--answer JSON] [--tolerance N]\n  run <file|->\n  batch <file|->\n  lint <file|->\n  eval <expression> [--let name=value ...]\n  experts"
        .to_string()
}

fn read_input(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| e.to_string())?;
        Ok(text)
    } else {
        fs::read_to_string(path).map_err(|e| format!("cannot read {path}: {e}"))
    }
}

fn load_steps(text: &str) -> Result<Vec<Step>, String> {
    let raw = trace_verifier::parse_submission(text).map_err(|e| e.to_string())?;
    let mut steps = Vec::with_capacity(raw.steps.len());
    for (i, value) in raw.steps.iter().enumerate() {
        let step: Step = serde_json::from_value(value.clone())
            .map_err(|e| format!("step {i}: invalid step: {e}"))?;
        steps.push(step);
    }
    Ok(steps)
}

fn parse_bindings(pairs: &[(String, String)]) -> Result<Bindings, String> {
    let mut bindings = Bindings::new();
    for (name, raw) in pairs {
        let value = if let Ok(int) = raw.parse::<i64>() {
            Evaluated::Int(int)
        } else if let Ok(float) = raw.parse::<f64>() {
            Evaluated::Float(float)
        } else {
            return Err(format!("binding {name} is not numeric: {raw}"));
        };
        bindings.insert(name.clone(), value);
    }
    Ok(bindings)
}
