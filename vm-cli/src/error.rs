//! Top-level error type the CLI reports to the host with a non-zero exit
//! code. Wraps the lower layers' error taxonomies without re-deriving them.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("reading \"{path}\" failed: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("writing \"{path}\" failed: {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("assembling \"{path}\" failed at line {line}: {source}")]
    Assemble {
        path: PathBuf,
        line: u32,
        #[source]
        source: vm_asm::AsmError,
    },

    #[error("loading image into memory failed: {0}")]
    LoadImage(#[from] vm_core::LoadImageError),

    #[error("execution failed: {0}")]
    Execution(#[from] vm_core::CpuError),

    #[error("the program did not halt within the cycle cap")]
    CycleCapExceeded,

    #[error("serializing trace output failed: {0}")]
    TraceSerialize(#[from] serde_json::Error),
}
