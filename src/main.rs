//! CLI entry point for the offliner tool.

use std::process::ExitCode;

mod app;
mod app_config;
mod cli;
mod output;

/// Process exit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every target was mirrored (or is optional and absent).
    Success,
    /// The run finished with failures, input issues or an interruption.
    Partial,
    /// The run could not start.
    Failure,
}

impl ProcessExit {
    fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Partial => 2,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let outcome = match app::runtime::run_offliner().await {
        Ok(outcome) => outcome,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ProcessExit::Failure
        }
    };
    ExitCode::from(outcome.code())
}
