//! Command-line front end: `assemble`, `run`, `run-trace`, and `debug`.
//! This binary is the only place in the workspace that touches files,
//! initializes logging, or picks a trace wire format — `vm-core` and
//! `vm-asm` know nothing about any of that.

mod debug;
mod error;
mod trace_json;
mod trace_text;

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use byteorder::{LittleEndian, WriteBytesExt};
use clap::{Parser, Subcommand, ValueEnum};

use error::CliError;
use vm_core::{Cpu, Memory, RunOutcome};

#[derive(Parser)]
#[command(name = "vm", about = "Assembler and emulator for the 16-bit teaching VM")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a source file into a raw binary image.
    Assemble {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long = "source-map")]
        source_map: Option<PathBuf>,
    },
    /// Run a binary image to completion.
    Run {
        program: PathBuf,
        #[arg(long, value_parser = parse_u16, default_value = "0x8000")]
        base: u16,
        #[arg(long = "max-cycles", default_value_t = 100_000)]
        max_cycles: u64,
    },
    /// Run a binary image, writing a per-cycle trace to a file.
    RunTrace {
        program: PathBuf,
        trace_out: PathBuf,
        #[arg(long, value_enum, default_value = "json")]
        format: TraceFormat,
        #[arg(long, value_parser = parse_u16, default_value = "0x8000")]
        base: u16,
        #[arg(long = "max-cycles", default_value_t = 100_000)]
        max_cycles: u64,
    },
    /// Step through a binary image interactively.
    Debug {
        program: PathBuf,
        #[arg(long, value_parser = parse_u16, default_value = "0x8000")]
        base: u16,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TraceFormat {
    Json,
    Text,
}

fn parse_u16(text: &str) -> Result<u16, std::num::ParseIntError> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16)
    } else {
        text.parse()
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn read_source(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::ReadInput {
        path: path.to_owned(),
        source,
    })
}

fn read_image(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|source| CliError::ReadInput {
        path: path.to_owned(),
        source,
    })
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    fs::write(path, bytes).map_err(|source| CliError::WriteOutput {
        path: path.to_owned(),
        source,
    })
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Assemble {
            input,
            output,
            source_map,
        } => assemble_command(&input, output.as_deref(), source_map.as_deref()),
        Command::Run {
            program,
            base,
            max_cycles,
        } => run_command(&program, base, max_cycles),
        Command::RunTrace {
            program,
            trace_out,
            format,
            base,
            max_cycles,
        } => run_trace_command(&program, &trace_out, format, base, max_cycles),
        Command::Debug { program, base } => debug_command(&program, base),
    }
}

fn assemble_command(input: &Path, output: Option<&Path>, source_map: Option<&Path>) -> Result<(), CliError> {
    let source = read_source(input)?;
    let assembled = vm_asm::assemble(&source).map_err(|source_err| CliError::Assemble {
        path: input.to_owned(),
        line: source_err.line(),
        source: source_err,
    })?;

    let output_path = output
        .map(Path::to_owned)
        .unwrap_or_else(|| input.with_extension("bin"));
    write_bytes(&output_path, &assembled.bytes)?;
    log::info!(
        "assembled {} ({} bytes) -> {}",
        input.display(),
        assembled.bytes.len(),
        output_path.display()
    );

    if let Some(map_path) = source_map {
        let mut writer = BufWriter::new(
            fs::File::create(map_path).map_err(|source| CliError::WriteOutput {
                path: map_path.to_owned(),
                source,
            })?,
        );
        for item in &assembled.source_map {
            writer
                .write_u32::<LittleEndian>(item.start_line)
                .and_then(|_| writer.write_u32::<LittleEndian>(item.line_count))
                .map_err(|source| CliError::WriteOutput {
                    path: map_path.to_owned(),
                    source,
                })?;
        }
    }
    Ok(())
}

fn load_cpu(program: &Path, base: u16) -> Result<Cpu, CliError> {
    let bytes = read_image(program)?;
    let mut mem = Memory::new();
    mem.set_output_sink(|byte| {
        print!("{}", byte as char);
        let _ = io::stdout().flush();
    });
    mem.load_image(&bytes, base)?;
    Ok(Cpu::new(mem))
}

fn run_command(program: &Path, base: u16, max_cycles: u64) -> Result<(), CliError> {
    let mut cpu = load_cpu(program, base)?;
    match cpu.run(max_cycles)? {
        RunOutcome::Halted => {
            log::info!("halted after {} max cycles budget", max_cycles);
            Ok(())
        }
        RunOutcome::CycleCapExceeded => Err(CliError::CycleCapExceeded),
    }
}

fn run_trace_command(
    program: &Path,
    trace_out: &Path,
    format: TraceFormat,
    base: u16,
    max_cycles: u64,
) -> Result<(), CliError> {
    let mut cpu = load_cpu(program, base)?;
    let outcome = match format {
        TraceFormat::Json => {
            let mut sink = trace_json::JsonTraceSink::new();
            let outcome = cpu.run_with_trace(max_cycles, &mut sink)?;
            let json = sink.finish()?;
            write_bytes(trace_out, json.as_bytes())?;
            outcome
        }
        TraceFormat::Text => {
            let file = fs::File::create(trace_out).map_err(|source| CliError::WriteOutput {
                path: trace_out.to_owned(),
                source,
            })?;
            let mut sink = trace_text::TextTraceSink::new(BufWriter::new(file));
            cpu.run_with_trace(max_cycles, &mut sink)?
        }
    };
    match outcome {
        RunOutcome::Halted => Ok(()),
        RunOutcome::CycleCapExceeded => Err(CliError::CycleCapExceeded),
    }
}

fn debug_command(program: &Path, base: u16) -> Result<(), CliError> {
    let mut cpu = load_cpu(program, base)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    debug::run_debug_loop(&mut cpu, stdin.lock(), stdout.lock()).map_err(|source| CliError::WriteOutput {
        path: PathBuf::from("<stdout>"),
        source,
    })
}
