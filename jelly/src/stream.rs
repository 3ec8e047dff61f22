//! Pull-based drivers that turn a sequence of transport units (one encoded
//! row each) into a sequence of statements.
//!
//! ```
//! use jelly::{Encoder, Statement, StreamOptions, Term, stream::decode_units};
//!
//! let mut enc = Encoder::new(StreamOptions::default());
//! let st = Statement::triple(Term::bnode("a"), Term::iri("http://ex.org/p"), Term::bnode("b"));
//! let units = enc.write(&st).unwrap();
//! let back: Vec<Statement> = decode_units(units).collect::<Result<_, _>>().unwrap();
//! assert_eq!(back, vec![st]);
//! ```

use std::iter::FusedIterator;

use crate::decoder::Decoder;
use crate::error::Result;
use crate::model::Statement;

/// Iterator over the statements carried by a source of transport units.
///
/// Ends when the source ends. The first error is yielded once, after
/// which the iterator is exhausted until [`RowStream::reset`].
#[derive(Debug)]
pub struct RowStream<I> {
    source: I,
    decoder: Decoder,
    done: bool,
}

impl<I, B> RowStream<I>
where
    I: Iterator<Item = Result<B>>,
    B: AsRef<[u8]>,
{
    pub fn new(source: I) -> Self {
        Self {
            source,
            decoder: Decoder::new(),
            done: false,
        }
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Clear decoder state and resume pulling from the same source, which
    /// must restart with a stream options row.
    pub fn reset(&mut self) {
        self.decoder.reset();
        self.done = false;
    }

    pub fn into_inner(self) -> I {
        self.source
    }
}

impl<I, B> Iterator for RowStream<I>
where
    I: Iterator<Item = Result<B>>,
    B: AsRef<[u8]>,
{
    type Item = Result<Statement>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let unit = match self.source.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Some(Ok(unit)) => unit,
            };
            match self.decoder.process_bytes(unit.as_ref()) {
                Ok(Some(st)) => return Some(Ok(st)),
                Ok(None) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<I, B> FusedIterator for RowStream<I>
where
    I: Iterator<Item = Result<B>>,
    B: AsRef<[u8]>,
{
}

type OkUnit<B> = fn(B) -> Result<B>;

/// Decode an infallible sequence of transport units.
pub fn decode_units<J, B>(units: J) -> RowStream<std::iter::Map<J::IntoIter, OkUnit<B>>>
where
    J: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    RowStream::new(units.into_iter().map(Ok as OkUnit<B>))
}

/// Decode an asynchronous sequence of transport units.
///
/// The returned stream only suspends while awaiting the next unit; dropping
/// it there discards the decoder without processing a partial row.
#[cfg(feature = "async")]
pub fn decode_stream<S, B>(source: S) -> impl futures_util::Stream<Item = Result<Statement>>
where
    S: futures_util::Stream<Item = B> + Unpin,
    B: AsRef<[u8]>,
{
    use futures_util::StreamExt;

    futures_util::stream::unfold(Some((source, Decoder::new())), |state| async move {
        let (mut source, mut decoder) = match state {
            Some(s) => s,
            None => return None,
        };
        loop {
            let unit = source.next().await?;
            match decoder.process_bytes(unit.as_ref()) {
                Ok(Some(st)) => return Some((Ok(st), Some((source, decoder)))),
                Ok(None) => continue,
                Err(e) => return Some((Err(e), None)),
            }
        }
    })
}
