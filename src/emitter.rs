//! JSON report writer

use crate::error::Result;
use serde::Serialize;
use std::io::{self, Stdout, Write};
use tracing::debug;

/// Writes one pretty-printed JSON document per call.
///
/// Stdout carries nothing but these documents; logs go to stderr.
pub struct ReportEmitter<W: Write> {
    writer: W,
}

impl ReportEmitter<Stdout> {
    /// Emitter bound to the process stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ReportEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialize `report`, terminate it with a newline and flush.
    pub fn emit<T: Serialize>(&mut self, report: &T) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, report).map_err(io::Error::from)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        debug!("Report written");
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
