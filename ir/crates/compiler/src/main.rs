use std::path::PathBuf;

use anyhow::{
    Context,
    Result,
};
use clap::Parser;
use nodal_back::CodegenConfig;
use nodal_compiler::{
    Emit,
    Options,
};
use tracing::{
    debug,
    Level,
};

#[derive(Parser, Debug)]
#[clap(name = "nodalc")]
#[command(version, about)]
struct Args {
    /// The file to compile
    #[arg(value_parser = valid_source_file_extension)]
    source_file: PathBuf,
    /// Where to write the output. Defaults to stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Emit::Asm)]
    emit: Emit,
    /// Only allocate from the first N registers of the target
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    registers: Option<u16>,
    /// Do not emit the `main` stub that calls `_main` and exits with its result
    ///
    /// `_main` does not save the callee-saved registers it uses (rbx, r12-r15), so callers
    /// must not rely on them surviving the call.
    #[arg(long)]
    no_entry_stub: bool,
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Explicit log level, overrides -v
    #[arg(long)]
    log_level: Option<Level>,
}

impl Args {
    fn log_level(&self) -> Level {
        self.log_level.unwrap_or(match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        })
    }

    fn options(&self) -> Options {
        Options {
            emit: self.emit,
            codegen: CodegenConfig {
                max_registers: self.registers.map(usize::from),
                entry_stub: !self.no_entry_stub,
            },
        }
    }
}

fn valid_source_file_extension(file_path: &str) -> Result<PathBuf, String> {
    let file_path = PathBuf::from(file_path);
    let extension = file_path.extension().ok_or("No file extension")?;
    if extension != "nir" {
        return Err(format!(
            "Invalid file extension: {} (expected .nir)",
            extension.to_string_lossy()
        ));
    }
    Ok(file_path)
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .init();
    let start = std::time::Instant::now();
    let source = std::fs::read_to_string(&args.source_file)
        .with_context(|| format!("Failed to read {}", args.source_file.display()))?;
    let output = nodal_compiler::compile(&source, &args.options())
        .with_context(|| format!("Failed to compile {}", args.source_file.display()))?;
    match &args.output {
        Some(path) => std::fs::write(path, output)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{output}"),
    }
    debug!("Took {:?} in total", start.elapsed());
    Ok(())
}
