// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Pull-based vector sources. A `VectorStream` is read by the
//! bootstrap sampler and by [`crate::pipeline`]'s serial read stage.

use crate::error::{Error, Result};
use crate::vector::Vector;
use std::io::BufRead;

/// A pull-based source of [`Vector`]s.
///
/// `next` returns `Ok(None)` at end of stream. Implementations are not
/// required to be `Send`; the pipeline only ever calls `next` from its
/// single reader stage.
pub trait VectorStream {
    fn next(&mut self) -> Result<Option<Vector>>;

    /// Reads up to `n` vectors, stopping early at end of stream.
    fn read_chunk(&mut self, n: usize) -> Result<Vec<Vector>> {
        let mut chunk = Vec::with_capacity(n);
        for _ in 0..n {
            match self.next()? {
                Some(v) => chunk.push(v),
                None => break,
            }
        }
        Ok(chunk)
    }
}

/// Reads whitespace-separated document-vector text: one vector per line,
/// formatted `<id> <f0> <f1> ... <fD-1>`.
///
/// `dimensions` is fixed at construction; every line must carry exactly
/// that many floating-point fields after the id, or
/// [`Error::DimensionMismatch`] is returned. Blank lines are skipped
/// rather than rejected — a deliberate leniency for hand-edited or
/// concatenated input files, not a format requirement.
pub struct DocVectorStream<R> {
    reader: R,
    dimensions: usize,
    line_number: usize,
}

impl<R: BufRead> DocVectorStream<R> {
    #[must_use]
    pub fn new(reader: R, dimensions: usize) -> Self {
        Self {
            reader,
            dimensions,
            line_number: 0,
        }
    }
}

impl<R: BufRead> VectorStream for DocVectorStream<R> {
    fn next(&mut self) -> Result<Option<Vector>> {
        loop {
            let mut line = String::new();
            let bytes_read = self.reader.read_line(&mut line)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let mut fields = trimmed.split_whitespace();
            let id = fields.next().ok_or_else(|| Error::InvalidVectorFormat {
                line: self.line_number,
                reason: "missing id field".to_string(),
            })?;

            let data: std::result::Result<Vec<f64>, _> = fields.map(str::parse::<f64>).collect();
            let data = data.map_err(|e| Error::InvalidVectorFormat {
                line: self.line_number,
                reason: e.to_string(),
            })?;

            if data.len() != self.dimensions {
                return Err(Error::DimensionMismatch {
                    expected: self.dimensions,
                    found: data.len(),
                });
            }

            return Ok(Some(Vector::from_data(id, data)));
        }
    }
}
