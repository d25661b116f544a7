use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser as _, Subcommand};
use thiserror::Error;
use tracing::{debug, info};

use matrix_lang::lexer::find_column;
use matrix_lang::{tokenize, Parser, ParserError, TypeChecker};

#[derive(Debug, Error)]
enum RunError {
    #[error("Cannot open {} file", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Syntax(#[from] ParserError),

    #[error("Type checking failed with {0} error(s)")]
    Semantic(usize),
}

#[derive(clap::Parser)]
#[command(name = "matrix_lang")]
#[command(about = "Front end for a small matrix scripting language")]
struct Cli {
    /// Log front-end internals (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream of a script
    Tokens {
        /// Path to the script
        #[arg(default_value = "example.txt")]
        path: PathBuf,
    },
    /// Print the syntax tree of a script
    Parse {
        #[arg(default_value = "example.txt")]
        path: PathBuf,
    },
    /// Parse and type check a script
    Check {
        #[arg(default_value = "example.txt")]
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Tokens { path } => tokens(&path),
        Commands::Parse { path } => parse(&path),
        Commands::Check { path } => check(&path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        // A missing input is reported but is not a failed compilation.
        Err(e @ RunError::Open { .. }) => {
            println!("{}", e);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(path: &Path) -> Result<String, RunError> {
    debug!(path = %path.display(), "reading source");
    std::fs::read_to_string(path).map_err(|source| RunError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn tokens(path: &Path) -> Result<(), RunError> {
    let source = read_source(path)?;
    let mut lexer = tokenize(&source);

    for token in lexer.by_ref() {
        println!(
            "({}, {}): {:?}({})",
            token.line,
            find_column(&source, token.offset),
            token.token_type,
            token.lexeme
        );
    }

    for error in lexer.errors() {
        println!("{}", error);
    }

    Ok(())
}

fn parse(path: &Path) -> Result<(), RunError> {
    let source = read_source(path)?;
    let mut parser = Parser::new(tokenize(&source));
    let result = parser.parse();

    for error in parser.lexer_errors() {
        println!("{}", error);
    }

    let root = result?;
    println!("{:#?}", root);
    Ok(())
}

fn check(path: &Path) -> Result<(), RunError> {
    let source = read_source(path)?;
    let mut parser = Parser::new(tokenize(&source));
    let result = parser.parse();

    for error in parser.lexer_errors() {
        println!("{}", error);
    }

    let root = result?;
    let mut checker = TypeChecker::new();
    if !checker.check(&root) {
        info!("no semantic errors");
        println!("No semantic errors found");
        return Ok(());
    }

    for diagnostic in checker.diagnostics() {
        println!("{}", diagnostic);
    }
    Err(RunError::Semantic(checker.diagnostics().len()))
}
