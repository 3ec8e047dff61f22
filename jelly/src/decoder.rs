//! Row -> statement decoder.
//!
//! The decoder mirrors [`crate::Encoder`]: table rows fill the lookup
//! tables, statement rows are resolved against them, and absent slots are
//! filled from the previous statement.
//!
//! ```
//! use jelly::{Decoder, Encoder, Statement, StreamOptions, Term};
//!
//! let st = Statement::triple(
//!     Term::iri("http://example.org/s"),
//!     Term::iri("http://example.org/p"),
//!     Term::lang_literal("hallo", "de"),
//! );
//! let mut enc = Encoder::new(StreamOptions::default());
//! let mut dec = Decoder::new();
//! let mut out = Vec::new();
//! for buf in enc.write(&st).unwrap() {
//!     out.extend(dec.process_bytes(&buf).unwrap());
//! }
//! assert_eq!(out, vec![st]);
//! ```

use log::{debug, trace, warn};

use crate::error::{JellyError, Result, TableKind};
use crate::model::{Statement, Term, Triple};
use crate::options::StreamOptions;
use crate::row::{decode_row, LiteralKind, Row, Slot, TripleRow, MAX_NESTING_DEPTH};
use crate::table::DecoderTable;

const SLOT_NAMES: [&str; 4] = ["subject", "predicate", "object", "graph"];

/// Stateful decoder for one stream.
#[derive(Debug)]
pub struct Decoder {
    options: Option<StreamOptions>,
    prefixes: DecoderTable,
    names: DecoderTable,
    datatypes: DecoderTable,
    last_prefix_id: Option<u32>,
    last_name_id: u32,
    last_terms: Option<[Term; 4]>,
    statements: u64,
    failed: bool,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// A decoder waiting for its stream options row.
    pub fn new() -> Self {
        Self {
            options: None,
            prefixes: DecoderTable::new(TableKind::Prefix, 0),
            names: DecoderTable::new(TableKind::Name, 0),
            datatypes: DecoderTable::new(TableKind::Datatype, 0),
            last_prefix_id: None,
            last_name_id: 0,
            last_terms: None,
            statements: 0,
            failed: false,
        }
    }

    /// Options announced by the peer, once the options row has been seen.
    pub fn options(&self) -> Option<&StreamOptions> {
        self.options.as_ref()
    }

    /// Statements produced since construction or the last reset.
    pub fn statements_decoded(&self) -> u64 {
        self.statements
    }

    /// Number of populated ids in `table`.
    pub fn table_len(&self, table: TableKind) -> usize {
        match table {
            TableKind::Prefix => self.prefixes.len(),
            TableKind::Name => self.names.len(),
            TableKind::Datatype => self.datatypes.len(),
        }
    }

    /// Drop all stream state; the next row must be a stream options row.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Parse one transport unit and process the resulting row.
    pub fn process_bytes(&mut self, buf: &[u8]) -> Result<Option<Statement>> {
        let row = decode_row(buf)?;
        self.process_row(row)
    }

    /// Process one row. Returns a statement for triple and quad rows and
    /// `None` for options and table rows.
    ///
    /// Any error leaves the decoder failed until [`Decoder::reset`].
    pub fn process_row(&mut self, row: Row) -> Result<Option<Statement>> {
        if self.failed {
            warn!("row received by a failed decoder; reset required");
            return Err(JellyError::Protocol(
                "decoder failed earlier; reset before reuse".into(),
            ));
        }
        trace!("processing {} row", row.kind_name());
        let res = self.apply(row);
        if res.is_err() {
            self.failed = true;
        }
        res
    }

    fn apply(&mut self, row: Row) -> Result<Option<Statement>> {
        if let Row::Options(opts) = row {
            self.set_options(opts)?;
            return Ok(None);
        }
        if self.options.is_none() {
            return Err(JellyError::Protocol(format!(
                "{} row before the stream options",
                row.kind_name()
            )));
        }
        match row {
            Row::Options(_) => Ok(None),
            Row::Prefix(e) => {
                self.prefixes.insert(e.id, e.value)?;
                Ok(None)
            }
            Row::Name(e) => {
                self.names.insert(e.id, e.value)?;
                Ok(None)
            }
            Row::Datatype(e) => {
                self.datatypes.insert(e.id, e.value)?;
                Ok(None)
            }
            Row::Triple(t) => {
                let s = self.top_term(t.s, 0)?;
                let p = self.top_term(t.p, 1)?;
                let o = self.top_term(t.o, 2)?;
                self.finish(Statement::triple(s, p, o)).map(Some)
            }
            Row::Quad(q) => {
                let s = self.top_term(q.s, 0)?;
                let p = self.top_term(q.p, 1)?;
                let o = self.top_term(q.o, 2)?;
                let g = self.top_term(q.g, 3)?;
                self.finish(Statement::quad(s, p, o, g)).map(Some)
            }
        }
    }

    fn set_options(&mut self, opts: StreamOptions) -> Result<()> {
        opts.validate()?;
        if let Some(current) = &self.options {
            if *current != opts {
                return Err(JellyError::Protocol(
                    "stream options changed mid-stream".into(),
                ));
            }
            debug!("repeated stream options row ignored");
            return Ok(());
        }
        debug!("stream options {:?}", opts);
        self.prefixes.set_limit(opts.max_prefix_table_size);
        self.names.set_limit(opts.max_name_table_size);
        self.datatypes.set_limit(opts.max_datatype_table_size);
        self.options = Some(opts);
        Ok(())
    }

    fn finish(&mut self, st: Statement) -> Result<Statement> {
        if let Some(opts) = &self.options {
            opts.check_statement(&st)?;
        }
        self.last_terms = Some([st.s.clone(), st.p.clone(), st.o.clone(), st.g.clone()]);
        self.statements += 1;
        Ok(st)
    }

    fn top_term(&mut self, slot: Slot, pos: usize) -> Result<Term> {
        match slot {
            Slot::Absent => self
                .last_terms
                .as_ref()
                .map(|prev| prev[pos].clone())
                .ok_or_else(|| {
                    JellyError::Protocol(format!(
                        "{} repeats a previous statement but none exists",
                        SLOT_NAMES[pos]
                    ))
                }),
            Slot::DefaultGraph if pos != 3 => Err(JellyError::Protocol(format!(
                "default graph marker in the {} slot",
                SLOT_NAMES[pos]
            ))),
            other => self.term(other, 0),
        }
    }

    fn term(&mut self, slot: Slot, depth: usize) -> Result<Term> {
        Ok(match slot {
            Slot::Absent => {
                return Err(JellyError::Protocol(
                    "absent slot inside a quoted triple".into(),
                ))
            }
            Slot::Iri { prefix_id, name_id } => Term::Iri(self.resolve_iri(prefix_id, name_id)?),
            Slot::BNode(b) => Term::BNode(b),
            Slot::Literal { lex, kind } => match kind {
                LiteralKind::Simple => Term::literal(lex),
                LiteralKind::Lang(lang) => Term::lang_literal(lex, lang),
                LiteralKind::Datatype(id) => {
                    Term::typed_literal(lex, self.datatypes.get(id.get())?)
                }
            },
            Slot::Triple(t) => {
                if depth >= MAX_NESTING_DEPTH {
                    return Err(JellyError::Malformed(format!(
                        "quoted triples nested deeper than {}",
                        MAX_NESTING_DEPTH
                    )));
                }
                let TripleRow { s, p, o } = *t;
                let s = self.term(s, depth + 1)?;
                let p = self.term(p, depth + 1)?;
                let o = self.term(o, depth + 1)?;
                Term::Triple(Box::new(Triple { s, p, o }))
            }
            Slot::DefaultGraph => {
                return Err(JellyError::Protocol(
                    "default graph marker inside a quoted triple".into(),
                ))
            }
        })
    }

    fn resolve_iri(&mut self, prefix_id: u32, name_id: u32) -> Result<String> {
        let uses_prefixes = self
            .options
            .as_ref()
            .is_some_and(StreamOptions::uses_prefix_table);

        let prefix_id = if !uses_prefixes {
            if prefix_id != 0 {
                return Err(JellyError::Protocol(format!(
                    "prefix id {} used while the prefix table is disabled",
                    prefix_id
                )));
            }
            None
        } else if prefix_id == 0 {
            Some(self.last_prefix_id.ok_or_else(|| {
                JellyError::Protocol("prefix id 0 on the first IRI of the stream".into())
            })?)
        } else {
            Some(prefix_id)
        };

        let name_id = if name_id == 0 {
            self.last_name_id
                .checked_add(1)
                .ok_or_else(|| JellyError::Protocol("name id overflow".into()))?
        } else {
            name_id
        };

        let mut iri = match prefix_id {
            Some(pid) => self.prefixes.get(pid)?.to_string(),
            None => String::new(),
        };
        iri.push_str(self.names.get(name_id)?);
        if prefix_id.is_some() {
            self.last_prefix_id = prefix_id;
        }
        self.last_name_id = name_id;
        Ok(iri)
    }
}
