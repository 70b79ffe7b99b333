//! Diagnostics on stderr, enabled by `--verbose`. stdout carries only the envelope.

use std::time::Instant;

const PREFIX: &str = "[edgegate]";

/// Emit a verbose diagnostic message to stderr.
pub fn emit(verbose: bool, msg: &str) {
    if verbose {
        eprintln!("{} {}", PREFIX, msg);
    }
}

/// Times one gateway step (connect, execute).
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }

    /// Report the step as done, e.g. `query complete (12ms, 3 rows)`.
    pub fn finish(self, verbose: bool, step: &str, detail: Option<&str>) {
        if !verbose {
            return;
        }
        match detail {
            Some(detail) => emit(true, &format!("{} ({}ms, {})", step, self.elapsed_ms(), detail)),
            None => emit(true, &format!("{} ({}ms)", step, self.elapsed_ms())),
        }
    }
}
