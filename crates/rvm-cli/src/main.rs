//! Resurgence VM - CLI
//!
//! Run, inspect, or generate RVM bytecode files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use rvm_core::{
    BytecodeLoader, BytecodeWriter, CodeHolder, ExecutionEngine, Interpreter, OpCode,
    ProgramBuilder, RvmConfig,
};
use rvm_host::{Console, PRINT_NUMBER, PRINT_STRING};

#[derive(Parser, Debug)]
#[command(name = "rvm", version, about = "Resurgence VM")]
struct Cli {
    /// Log core VM activity at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a function from a bytecode file
    Run {
        file: PathBuf,

        /// Function to execute
        #[arg(short, long, default_value = "main")]
        function: String,

        /// Fail before running if any import has no native binding
        #[arg(long)]
        strict_imports: bool,

        #[arg(long, value_name = "N")]
        max_stack: Option<usize>,

        #[arg(long, value_name = "N")]
        max_call_depth: Option<usize>,
    },
    /// Print the tables and instruction listing of a bytecode file
    Inspect { file: PathBuf },
    /// Write a sample program that prints through the console natives
    Generate { file: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if verbose {
        if let Ok(directive) = "rvm_core=debug".parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Run {
            file,
            function,
            strict_imports,
            max_stack,
            max_call_depth,
        } => {
            let mut config = RvmConfig::new();
            config.strict_imports = strict_imports;
            if let Some(n) = max_stack {
                config.max_stack_size = n;
            }
            if let Some(n) = max_call_depth {
                config.max_call_depth = n;
            }
            run(&file, &function, config)
        }
        Command::Inspect { file } => inspect(&file),
        Command::Generate { file } => generate(&file),
    }
}

fn run(path: &Path, function: &str, config: RvmConfig) -> Result<()> {
    let code = BytecodeLoader::read_file(path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    let strict = config.strict_imports;
    let mut vm = Interpreter::with_config(code, config).context("failed to construct interpreter")?;
    Console::stdout()
        .register(&mut vm)
        .context("failed to register console natives")?;

    if let Err(err) = vm.resolve_imports() {
        if strict {
            return Err(err).context("import resolution failed");
        }
        warn!(%err, "continuing with unbound imports");
    }

    let result = vm
        .execute_function(function)
        .with_context(|| format!("execution of `{}` failed", function))?;
    if let Some(value) = result {
        println!("{}", value);
    }
    vm.destroy();
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let code = BytecodeLoader::read_file(path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    println!("constants ({}):", code.constants().len());
    for (i, value) in code.constants().iter().enumerate() {
        println!("  #{:<4} {:<5} {}", i, value.kind(), value);
    }

    println!("imports ({}):", code.imports().len());
    for (i, name) in code.imports().iter().enumerate() {
        println!("  #{:<4} {}", i, name);
    }

    println!("functions ({}):", code.function_count());
    for f in code.functions() {
        println!(
            "  {} @{} arity={} locals={}",
            f.name, f.entry, f.arity, f.locals
        );
    }

    println!("instructions ({}):", code.instructions().len());
    for (pc, instr) in code.instructions().iter().enumerate() {
        println!("  {:>5}: {}", pc, instr);
    }
    Ok(())
}

fn generate(path: &Path) -> Result<()> {
    let code = sample_program()?;
    BytecodeWriter::write_file(path, &code)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("wrote sample bytecode to {}", path.display());
    Ok(())
}

// main: printNumber(42); printString("Hello from RVM"); return
fn sample_program() -> Result<CodeHolder> {
    let mut b = ProgramBuilder::new();
    b.begin_function("main", 0, 0);
    b.push_constant(42i64);
    b.external_call(PRINT_NUMBER);
    b.push_constant("Hello from RVM");
    b.external_call(PRINT_STRING);
    b.emit(OpCode::Return);

    let code = b.build().context("sample program failed validation")?;
    if code.function("main").is_none() {
        bail!("sample program has no main");
    }
    Ok(code)
}
