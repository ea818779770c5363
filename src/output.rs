use std::io::{self, Write};

use serde::Serialize;

use crate::app::{AlignResult, CollectResult, ProgressEvent, ProgressSink, TabulateResult};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

/// Prints progress lines to stdout when verbose, nothing otherwise.
pub struct ConsoleProgress {
    pub verbose: bool,
}

impl ProgressSink for ConsoleProgress {
    fn event(&self, event: ProgressEvent) {
        if !self.verbose {
            return;
        }
        match event.elapsed {
            Some(elapsed) => println!("{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => println!("{}", event.message),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_collect(result: &CollectResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_tabulate(result: &TabulateResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_align(result: &AlignResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
