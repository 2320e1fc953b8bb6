//! Input decoding, record iteration, and result writing.
//!
//! Every read of the input file goes through [`open_records`], which decodes
//! the configured encoding, strips line terminators, skips the optional
//! header, and tokenizes each remaining line. A blank line is a record with a
//! single empty field. Both loading passes use
//! it, so they see the same records in the same order.

use std::{
    fs::File,
    io::{BufRead, BufReader, Lines, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::{DecodeReaderBytes, DecodeReaderBytesBuilder};

use crate::{engine::QueryResult, error::QueryError, tokenizer::RecordTokenizer};

pub fn resolve_encoding(label: Option<&str>) -> anyhow::Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn open_decoded(
    path: &Path,
    encoding: &'static Encoding,
) -> Result<BufReader<DecodeReaderBytes<File, Vec<u8>>>, QueryError> {
    let file = File::open(path).map_err(|source| QueryError::InputUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let decoder = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .build(file);
    Ok(BufReader::new(decoder))
}

/// Tokenized records of `path` with their 1-based physical line numbers.
pub struct RecordReader<R: BufRead> {
    lines: Lines<R>,
    tokenizer: RecordTokenizer,
    path: PathBuf,
    line: usize,
    skip_header: bool,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R, tokenizer: RecordTokenizer, path: &Path, skip_header: bool) -> Self {
        Self {
            lines: reader.lines(),
            tokenizer,
            path: path.to_path_buf(),
            line: 0,
            skip_header,
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<(usize, Vec<String>), QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.lines.next()? {
                Ok(raw) => raw,
                Err(source) => {
                    return Some(Err(QueryError::InputRead {
                        path: self.path.clone(),
                        line: self.line + 1,
                        source,
                    }));
                }
            };
            self.line += 1;
            let text = raw.strip_suffix('\r').unwrap_or(&raw);
            if self.skip_header {
                self.skip_header = false;
                continue;
            }
            return Some(Ok((self.line, self.tokenizer.split(text))));
        }
    }
}

pub fn open_records(
    path: &Path,
    encoding: &'static Encoding,
    tokenizer: RecordTokenizer,
    skip_header: bool,
) -> Result<RecordReader<impl BufRead>, QueryError> {
    let reader = open_decoded(path, encoding)?;
    Ok(RecordReader::new(reader, tokenizer, path, skip_header))
}

/// Writes result rows separated by `delimiter`; NULL cells become empty fields.
pub fn write_delimited<W: Write>(
    writer: W,
    result: &QueryResult,
    delimiter: u8,
    include_headers: bool,
) -> anyhow::Result<()> {
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true)
        .flexible(true);
    let mut out = builder.from_writer(writer);
    if include_headers {
        out.write_record(&result.columns)
            .context("Writing result headers")?;
    }
    for row in &result.rows {
        // The csv writer quotes a lone empty field; print an empty line instead.
        if matches!(row.as_slice(), [cell] if cell.as_deref().unwrap_or("").is_empty()) {
            out.flush().context("Flushing result output")?;
            let mut inner = out
                .into_inner()
                .map_err(|err| err.into_error())
                .context("Flushing result output")?;
            inner.write_all(b"\n").context("Writing result row")?;
            out = builder.from_writer(inner);
            continue;
        }
        out.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
            .context("Writing result row")?;
    }
    out.flush().context("Flushing result output")?;
    Ok(())
}
