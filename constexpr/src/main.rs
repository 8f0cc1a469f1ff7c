//! Constexpr CLI
//!
//! Trees and environments are read as JSON, the serde form of
//! `constexpr::Node` and a map from variable name to `VariableItem`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use constexpr::error::report_error;
use constexpr::{
    EngineError, Environment, FloatMode, HostLibrary, Node, OptLevel, OptimizerOptions, Optimizer,
    VariableItem,
};

#[derive(Parser)]
#[command(name = "constexpr", version, about = "Compile-time partial evaluator and rewrite engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a tree to a value
    Eval {
        #[command(flatten)]
        input: Input,
    },
    /// Optimize a tree to a fixpoint and print the result
    Optimize {
        #[command(flatten)]
        input: Input,
        /// Print the rewritten tree as JSON instead of source form
        #[arg(long)]
        json: bool,
        /// Print pass and rule statistics to stderr
        #[arg(long)]
        stats: bool,
    },
    /// Print a tree in source form
    Render {
        /// Tree file (JSON)
        file: PathBuf,
    },
}

#[derive(Args)]
struct Input {
    /// Tree file (JSON)
    file: PathBuf,
    /// Environment file (JSON object: name -> variable)
    #[arg(long)]
    env: Option<PathBuf>,
    /// Options file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Optimization level, overrides the options file
    #[arg(long, value_enum)]
    level: Option<Level>,
    /// Allow rewrites that change floating-point rounding
    #[arg(long)]
    fast_math: bool,
    /// Fixpoint pass bound, overrides the options file
    #[arg(long)]
    max_passes: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Level {
    None,
    Fold,
    Full,
}

impl From<Level> for OptLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::None => OptLevel::None,
            Level::Fold => OptLevel::Fold,
            Level::Full => OptLevel::Full,
        }
    }
}

fn main() {
    constexpr::init_tracing();
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Eval { input } => eval_file(input),
        Command::Optimize { input, json, stats } => optimize_file(input, *json, *stats),
        Command::Render { file } => render_file(file),
    };

    if let Err((filename, source, e)) = result {
        report_error(&filename, &source, &e);
        std::process::exit(1);
    }
}

/// Error with the file and text it refers to
type CliResult<T> = std::result::Result<T, (String, String, EngineError)>;

fn read(path: &Path) -> CliResult<String> {
    let filename = path.display().to_string();
    std::fs::read_to_string(path).map_err(|e| (filename, String::new(), e.into()))
}

fn decode<T: serde::de::DeserializeOwned>(path: &Path) -> CliResult<T> {
    let source = read(path)?;
    serde_json::from_str(&source).map_err(|e| (path.display().to_string(), source, e.into()))
}

fn load_tree(path: &Path) -> CliResult<Node> {
    decode(path)
}

fn load_env(path: Option<&Path>) -> CliResult<Environment> {
    let Some(path) = path else {
        return Ok(Environment::new());
    };
    let bindings: BTreeMap<String, VariableItem> = decode(path)?;
    Ok(Environment::from_bindings(bindings))
}

fn load_options(input: &Input) -> CliResult<OptimizerOptions> {
    let mut options = match &input.config {
        Some(path) => OptimizerOptions::load(path)
            .map_err(|e| (path.display().to_string(), String::new(), e))?,
        None => OptimizerOptions::default(),
    };
    if let Some(level) = input.level {
        options.level = level.into();
    }
    if input.fast_math {
        options.float_mode = FloatMode::FastMath;
    }
    if let Some(max_passes) = input.max_passes {
        options.max_passes = max_passes;
    }
    Ok(options)
}

fn eval_file(input: &Input) -> CliResult<()> {
    let tree = load_tree(&input.file)?;
    let env = load_env(input.env.as_deref())?;
    let options = load_options(input)?;
    let host = HostLibrary::standard();

    match Optimizer::with_options(&host, options).evaluate(&tree, &env) {
        Some(value) => println!("{}", Node::literal(value)),
        None => {
            let filename = input.file.display().to_string();
            let e = EngineError::invalid_input("tree does not evaluate to a value");
            return Err((filename, String::new(), e));
        }
    }
    Ok(())
}

fn optimize_file(input: &Input, json: bool, show_stats: bool) -> CliResult<()> {
    let tree = load_tree(&input.file)?;
    let env = load_env(input.env.as_deref())?;
    let options = load_options(input)?;
    let host = HostLibrary::standard();

    let (optimized, stats) = Optimizer::with_options(&host, options).optimize_with_stats(&tree, &env);
    if json {
        println!("{}", to_json(&optimized, &input.file)?);
    } else {
        println!("{optimized}");
    }
    if show_stats {
        eprintln!("{}", to_json(&stats, &input.file)?);
    }
    Ok(())
}

fn render_file(path: &Path) -> CliResult<()> {
    let tree = load_tree(path)?;
    println!("{tree}");
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T, path: &Path) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| (path.display().to_string(), String::new(), EngineError::from(e)))
}
