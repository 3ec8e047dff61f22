//! Length-delimited transport: each unit is a varint byte length followed
//! by one encoded row. Used to store a stream in a single file or pipe.
//!
//! ```
//! use jelly::delimited::{DelimitedReader, StatementWriter};
//! use jelly::{Statement, StreamOptions, Term};
//!
//! let mut w = StatementWriter::new(Vec::new(), StreamOptions::default());
//! let st = Statement::triple(Term::iri("http://ex.org/s"), Term::iri("http://ex.org/p"), Term::literal("v"));
//! w.add(&st).unwrap();
//! let bytes = w.finish().unwrap();
//!
//! let back: Vec<_> = DelimitedReader::new(&bytes[..]).statements().collect::<Result<_, _>>().unwrap();
//! assert_eq!(back, vec![st]);
//! ```

use std::io::{ErrorKind, Read, Write};

use crate::encoder::Encoder;
use crate::error::{JellyError, Result};
use crate::model::Statement;
use crate::options::{EncoderOptions, StreamOptions};
use crate::row::push_uvarint;
use crate::stream::RowStream;

/// Largest unit accepted by [`DelimitedReader`] unless overridden.
pub const DEFAULT_MAX_UNIT_LEN: usize = 16 * 1024 * 1024;

/// Write one unit with its length prefix.
pub fn write_delimited<W: Write>(w: &mut W, unit: &[u8]) -> Result<()> {
    let mut len = Vec::with_capacity(5);
    push_uvarint(unit.len() as u64, &mut len);
    w.write_all(&len)?;
    w.write_all(unit)?;
    Ok(())
}

/// Iterator over the units of a length-delimited byte source.
#[derive(Debug)]
pub struct DelimitedReader<R> {
    inner: R,
    max_unit_len: usize,
    done: bool,
}

impl<R: Read> DelimitedReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            max_unit_len: DEFAULT_MAX_UNIT_LEN,
            done: false,
        }
    }

    pub fn with_max_unit_len(mut self, max: usize) -> Self {
        self.max_unit_len = max;
        self
    }

    /// Decode the units into statements.
    pub fn statements(self) -> RowStream<Self> {
        RowStream::new(self)
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut b = [0u8; 1];
        loop {
            match self.inner.read(&mut b) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(b[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn read_len(&mut self) -> Result<Option<usize>> {
        let (mut x, mut s) = (0u64, 0u32);
        for i in 0..10 {
            let b = match self.read_byte()? {
                Some(b) => b as u64,
                None if i == 0 => return Ok(None),
                None => return Err(JellyError::Malformed("truncated unit length".into())),
            };
            x |= (b & 0x7f) << s;
            if b & 0x80 == 0 {
                return Ok(Some(x as usize));
            }
            s += 7;
        }
        Err(JellyError::Malformed("unit length varint too long".into()))
    }

    fn read_unit(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(len) = self.read_len()? else {
            return Ok(None);
        };
        if len > self.max_unit_len {
            return Err(JellyError::Malformed(format!(
                "unit of {} bytes exceeds the limit of {}",
                len, self.max_unit_len
            )));
        }
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => JellyError::Malformed("truncated unit".into()),
            _ => JellyError::Io(e),
        })?;
        Ok(Some(buf))
    }
}

impl<R: Read> Iterator for DelimitedReader<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_unit() {
            Ok(Some(unit)) => Some(Ok(unit)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Encoder bound to a byte sink; every row goes out as one delimited unit.
#[derive(Debug)]
pub struct StatementWriter<W: Write> {
    inner: W,
    encoder: Encoder,
    rows: u64,
}

impl<W: Write> StatementWriter<W> {
    pub fn new(inner: W, options: StreamOptions) -> Self {
        Self::with_options(inner, options, EncoderOptions::default())
    }

    pub fn with_options(inner: W, options: StreamOptions, settings: EncoderOptions) -> Self {
        Self {
            inner,
            encoder: Encoder::with_options(options, settings),
            rows: 0,
        }
    }

    /// Encode and write one statement.
    pub fn add(&mut self, st: &Statement) -> Result<()> {
        for unit in self.encoder.write(st)? {
            write_delimited(&mut self.inner, &unit)?;
            self.rows += 1;
        }
        Ok(())
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Rows written so far, including options and table updates.
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Flush and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
