//! CSV writer

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::CsvResult;
use crate::options::{CsvWriteOptions, LineTerminator};
use metasheet_core::CellValue;

/// CSV file writer
pub struct CsvWriter;

impl CsvWriter {
    /// Write rows to a CSV file, creating or truncating it
    pub fn write_file<P, R>(rows: &[R], path: P, options: &CsvWriteOptions) -> CsvResult<()>
    where
        P: AsRef<Path>,
        R: AsRef<[CellValue]>,
    {
        let file = BufWriter::new(File::create(path)?);
        Self::write_rows(rows, file, options)
    }

    /// Write rows to a writer
    ///
    /// Empty cells become empty fields and whole numbers are written without
    /// a fractional part. Every row is written with its own width.
    pub fn write_rows<W, R>(rows: &[R], writer: W, options: &CsvWriteOptions) -> CsvResult<()>
    where
        W: Write,
        R: AsRef<[CellValue]>,
    {
        let terminator = match options.line_terminator {
            LineTerminator::LF => csv::Terminator::Any(b'\n'),
            LineTerminator::CRLF => csv::Terminator::CRLF,
        };

        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .terminator(terminator)
            .flexible(true)
            .from_writer(writer);

        for row in rows {
            let record = row.as_ref().iter().map(|value| value.text());
            csv_writer.write_record(record.map(|field| field.into_owned()))?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}
