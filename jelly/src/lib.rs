//! jelly: streaming encoder and decoder for RDF statements in the Jelly
//! row format.
//!
//! An [`Encoder`] turns each statement into lookup-table update rows
//! followed by one statement row; a [`Decoder`] replays those rows to
//! rebuild the statements. Repeated strings travel once per stream through
//! the prefix, name and datatype tables, and slots that repeat the previous
//! statement are elided.
//!
//! Quick start: round-trip two statements
//!
//! ```
//! use jelly::{Decoder, Encoder, Statement, StreamOptions, Term};
//!
//! let input = vec![
//!     Statement::triple(
//!         Term::iri("http://example.org/s"),
//!         Term::iri("http://example.org/p"),
//!         Term::literal("Hello Jelly"),
//!     ),
//!     Statement::quad(
//!         Term::iri("http://example.org/s"),
//!         Term::iri("http://example.org/p2"),
//!         Term::literal("Another Value"),
//!         Term::iri("http://example.org/g"),
//!     ),
//! ];
//!
//! let mut enc = Encoder::new(StreamOptions::default());
//! let mut dec = Decoder::new();
//! let mut output = Vec::new();
//! for st in &input {
//!     for row in enc.write(st).expect("encode") {
//!         if let Some(st) = dec.process_bytes(&row).expect("decode") {
//!             output.push(st);
//!         }
//!     }
//! }
//! assert_eq!(input, output);
//! ```
//!
//! Streams stored in files or pipes use the length-delimited helpers in
//! [`delimited`]; [`stream`] adapts any sequence of row buffers into a
//! sequence of statements.

pub mod decoder;
pub mod delimited;
pub mod encoder;
pub mod error;
pub mod model;
pub mod options;
pub mod row;
pub mod stream;
pub mod table;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{JellyError, Result, TableKind};
pub use model::{Statement, Term, Triple};
pub use options::{EncoderOptions, LogicalType, PhysicalType, StreamOptions};
pub use row::{decode_row, encode_row, Row};
