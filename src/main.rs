use anyhow::{bail, Result};
use clap::Parser as ClapParser;
use monkey_rs::{parse, Env, Environment, Evaluator, Object, ParseError};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const PROMPT: &str = ">> ";

const MONKEY_FACE: &str = r#"           __,__
  .--.  .-"     "-.  .--.
 / .. \/  .-. .-.  \/ .. \
| |  '|  /   Y   \  |' | |
| \   \  \ 0 | 0 / /   / |
 \ '- ,\.-""" """-./, -' /
  ''-' /_   ^ ^   _\ '-''
      |  \._   _./  |
      \   \ '~' /   /
       '._ '-=-' _.'
          '-----'
"#;

#[derive(ClapParser, Debug)]
struct Args {
    /// Monkey script to run; starts an interactive session when omitted.
    file: Option<PathBuf>,

    /// Script evaluated into the environment before any other input.
    #[arg(long)]
    prelude: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let env = Environment::new();

    let result = args
        .prelude
        .as_deref()
        .map_or(Ok(()), |path| run_file(path, &env))
        .and_then(|_| match args.file {
            Some(path) => run_file(&path, &env),
            None => run_prompt(&env),
        });

    if let Err(why) = result {
        eprintln!("ERROR: {}", why);
        std::process::exit(1);
    }
}

fn run_file(path: &Path, env: &Env) -> Result<()> {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(why) => bail!("failed to read {}: {}", path.display(), why),
    };
    match execute(&source, env) {
        Ok(Some(Object::Error(message))) => bail!("{}", message),
        Ok(_) => Ok(()),
        Err(errors) => {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            bail!(
                "{} has syntax errors:\n    {}",
                path.display(),
                messages.join("\n    ")
            );
        }
    }
}

fn run_prompt(env: &Env) -> Result<()> {
    let user = std::env::var("USER").unwrap_or_else(|_| "there".to_owned());
    println!("Hello {}! This is the Monkey programming language!", user);
    println!("Feel free to type in commands");
    print_prompt()?;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => bail!("Failed to read line"),
        };
        // Every error is terminal for the line only; the session continues.
        match execute(&line, env) {
            Ok(Some(value)) => println!("{}", value),
            Ok(None) => {}
            Err(errors) => print_parse_errors(&errors),
        }
        print_prompt()?;
    }
    Ok(())
}

fn execute(source: &str, env: &Env) -> std::result::Result<Option<Object>, Vec<ParseError>> {
    let (program, errors) = parse(source);
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(Evaluator::new().eval_program(&program, env))
}

fn print_prompt() -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if let Err(why) = write!(handle, "{}", PROMPT) {
        bail!("Failed to write prompt to console: {}", why);
    }
    if let Err(why) = handle.flush() {
        bail!("Failed to flush prompt to console: {}", why);
    }
    Ok(())
}

fn print_parse_errors(errors: &[ParseError]) {
    println!("{}", MONKEY_FACE);
    println!("Woops! We ran into some monkey business here!");
    println!("    parser errors:");
    for error in errors {
        println!("        {}", error);
    }
}
