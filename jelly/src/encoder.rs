//! Statement -> row encoder.
//!
//! Each call to [`Encoder::write`] produces the rows for one statement in
//! wire order: the stream options (first call only), any lookup-table
//! updates the statement needs, then the statement row itself.
//!
//! ```
//! use jelly::{Encoder, Statement, StreamOptions, Term};
//!
//! let mut enc = Encoder::new(StreamOptions::default());
//! let rows = enc
//!     .write(&Statement::triple(
//!         Term::iri("http://example.org/s"),
//!         Term::iri("http://example.org/p"),
//!         Term::literal("o"),
//!     ))
//!     .unwrap();
//! // options, prefix, two names, triple
//! assert_eq!(rows.len(), 5);
//! ```

use log::{debug, trace};

use crate::error::{JellyError, Result, TableKind};
use crate::model::{Statement, Term};
use crate::options::{EncoderOptions, PhysicalType, StreamOptions};
use crate::row::{encode_row, LiteralKind, QuadRow, Row, Slot, TableEntry, TripleRow};
use crate::table::EncoderTable;

/// Split an IRI right after its last `/` or `#`.
pub fn split_iri(iri: &str) -> (&str, &str) {
    match iri.rfind(['/', '#']) {
        Some(i) => iri.split_at(i + 1),
        None => ("", iri),
    }
}

/// Stateful encoder for one stream.
#[derive(Debug)]
pub struct Encoder {
    options: StreamOptions,
    settings: EncoderOptions,
    prefixes: EncoderTable,
    names: EncoderTable,
    datatypes: EncoderTable,
    options_sent: bool,
    // ids of the last IRI put on the wire, for the 0 sentinels
    last_prefix_id: Option<u32>,
    last_name_id: u32,
    last_terms: Option<[Term; 4]>,
    statements: u64,
    poisoned: bool,
}

impl Encoder {
    pub fn new(options: StreamOptions) -> Self {
        Self::with_options(options, EncoderOptions::default())
    }

    pub fn with_options(options: StreamOptions, settings: EncoderOptions) -> Self {
        Self {
            prefixes: EncoderTable::new(TableKind::Prefix, options.max_prefix_table_size),
            names: EncoderTable::new(TableKind::Name, options.max_name_table_size),
            datatypes: EncoderTable::new(TableKind::Datatype, options.max_datatype_table_size),
            options,
            settings,
            options_sent: false,
            last_prefix_id: None,
            last_name_id: 0,
            last_terms: None,
            statements: 0,
            poisoned: false,
        }
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// Statements successfully written since construction or the last reset.
    pub fn statements_written(&self) -> u64 {
        self.statements
    }

    /// Number of entries currently registered in `table`.
    pub fn table_len(&self, table: TableKind) -> usize {
        match table {
            TableKind::Prefix => self.prefixes.len(),
            TableKind::Name => self.names.len(),
            TableKind::Datatype => self.datatypes.len(),
        }
    }

    /// Forget all tables and the previous statement. The next write starts
    /// a fresh stream, beginning with the stream options row.
    pub fn reset(&mut self) {
        self.prefixes.clear();
        self.names.clear();
        self.datatypes.clear();
        self.options_sent = false;
        self.last_prefix_id = None;
        self.last_name_id = 0;
        self.last_terms = None;
        self.statements = 0;
        self.poisoned = false;
    }

    /// Encode one statement into serialized rows, in wire order.
    pub fn write(&mut self, st: &Statement) -> Result<Vec<Vec<u8>>> {
        Ok(self.write_rows(st)?.iter().map(encode_row).collect())
    }

    /// Encode one statement into structured rows, in wire order.
    ///
    /// A statement the stream options forbid is rejected before any state
    /// changes. A table overflow leaves the encoder unusable until
    /// [`Encoder::reset`].
    pub fn write_rows(&mut self, st: &Statement) -> Result<Vec<Row>> {
        if self.poisoned {
            return Err(JellyError::Protocol(
                "encoder failed earlier; reset before writing".into(),
            ));
        }
        self.options.validate()?;
        self.options.check_statement(st)?;

        let mut rows = Vec::new();
        if !self.options_sent {
            debug!("emitting stream options {:?}", self.options);
            rows.push(Row::Options(self.options.clone()));
        }
        let statement = match self.build_statement(st, &mut rows) {
            Ok(r) => r,
            Err(e) => {
                self.poisoned = true;
                return Err(e);
            }
        };
        rows.push(statement);

        self.options_sent = true;
        self.statements += 1;
        self.last_terms = Some([st.s.clone(), st.p.clone(), st.o.clone(), st.g.clone()]);
        trace!("statement {} -> {} rows", self.statements, rows.len());
        Ok(rows)
    }

    fn build_statement(&mut self, st: &Statement, rows: &mut Vec<Row>) -> Result<Row> {
        let as_quad = self.options.physical_type == PhysicalType::Quads || !st.is_triple();
        let s = self.top_slot(&st.s, 0, rows)?;
        let p = self.top_slot(&st.p, 1, rows)?;
        let o = self.top_slot(&st.o, 2, rows)?;
        Ok(if as_quad {
            let g = self.top_slot(&st.g, 3, rows)?;
            Row::Quad(QuadRow { s, p, o, g })
        } else {
            Row::Triple(TripleRow { s, p, o })
        })
    }

    fn top_slot(&mut self, term: &Term, pos: usize, rows: &mut Vec<Row>) -> Result<Slot> {
        if self.settings.elide_repeated_terms {
            if let Some(prev) = &self.last_terms {
                if prev[pos] == *term {
                    return Ok(Slot::Absent);
                }
            }
        }
        self.slot(term, rows)
    }

    fn slot(&mut self, term: &Term, rows: &mut Vec<Row>) -> Result<Slot> {
        Ok(match term {
            Term::Iri(iri) => self.iri(iri, rows)?,
            Term::BNode(b) => Slot::BNode(b.clone()),
            Term::Literal { lex, dt, lang } => {
                let kind = match (lang, dt) {
                    (Some(lang), _) => LiteralKind::Lang(lang.clone()),
                    (None, Some(dt)) => {
                        let (id, fresh) = self.datatypes.get_or_insert(dt)?;
                        if fresh {
                            rows.push(Row::Datatype(TableEntry {
                                id: 0,
                                value: dt.clone(),
                            }));
                        }
                        // ids start at 1
                        LiteralKind::Datatype(
                            std::num::NonZeroU32::new(id)
                                .ok_or_else(|| JellyError::Protocol("datatype id 0".into()))?,
                        )
                    }
                    (None, _) => LiteralKind::Simple,
                };
                Slot::Literal {
                    lex: lex.clone(),
                    kind,
                }
            }
            Term::Triple(t) => {
                let s = self.slot(&t.s, rows)?;
                let p = self.slot(&t.p, rows)?;
                let o = self.slot(&t.o, rows)?;
                Slot::Triple(Box::new(TripleRow { s, p, o }))
            }
            Term::DefaultGraph => Slot::DefaultGraph,
        })
    }

    fn iri(&mut self, iri: &str, rows: &mut Vec<Row>) -> Result<Slot> {
        let (prefix_id, name) = if self.options.uses_prefix_table() {
            let (prefix, name) = split_iri(iri);
            let (pid, fresh) = self.prefixes.get_or_insert(prefix)?;
            if fresh {
                rows.push(Row::Prefix(TableEntry {
                    id: 0,
                    value: prefix.to_string(),
                }));
            }
            let wire = if self.last_prefix_id == Some(pid) { 0 } else { pid };
            self.last_prefix_id = Some(pid);
            (wire, name)
        } else {
            (0, iri)
        };

        let (nid, fresh) = self.names.get_or_insert(name)?;
        if fresh {
            rows.push(Row::Name(TableEntry {
                id: 0,
                value: name.to_string(),
            }));
        }
        let name_id = if nid == self.last_name_id + 1 { 0 } else { nid };
        self.last_name_id = nid;
        Ok(Slot::Iri { prefix_id, name_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_iri_at_last_separator() {
        assert_eq!(split_iri("http://ex.org/a/b"), ("http://ex.org/a/", "b"));
        assert_eq!(split_iri("http://ex.org/ns#x"), ("http://ex.org/ns#", "x"));
        assert_eq!(split_iri("http://ex.org/"), ("http://ex.org/", ""));
        assert_eq!(split_iri("urn:isbn:123"), ("", "urn:isbn:123"));
    }

    #[test]
    fn rejected_statement_leaves_no_trace() {
        let mut enc = Encoder::new(StreamOptions::default());
        let bad = Statement::triple(
            Term::literal("nope"),
            Term::iri("http://ex.org/p"),
            Term::literal("o"),
        );
        assert!(matches!(enc.write_rows(&bad), Err(JellyError::Protocol(_))));
        assert_eq!(enc.table_len(TableKind::Name), 0);
        let ok = Statement::triple(
            Term::iri("http://ex.org/s"),
            Term::iri("http://ex.org/p"),
            Term::literal("o"),
        );
        let rows = enc.write_rows(&ok).unwrap();
        assert!(matches!(rows[0], Row::Options(_)));
    }

    #[test]
    fn overflow_poisons_until_reset() {
        let opts = StreamOptions::default()
            .with_prefix_table_size(0)
            .with_name_table_size(8);
        let mut enc = Encoder::new(opts);
        for i in 0..4 {
            let st = Statement::triple(
                Term::iri(format!("http://ex.org/s{}", i)),
                Term::iri(format!("http://ex.org/p{}", i)),
                Term::literal("o"),
            );
            enc.write_rows(&st).unwrap();
        }
        let st = Statement::triple(
            Term::iri("http://ex.org/s9"),
            Term::iri("http://ex.org/p9"),
            Term::literal("o"),
        );
        assert!(matches!(
            enc.write_rows(&st),
            Err(JellyError::ResourceLimit {
                table: TableKind::Name,
                limit: 8
            })
        ));
        assert!(enc.write_rows(&st).is_err());
        enc.reset();
        let rows = enc.write_rows(&st).unwrap();
        assert!(matches!(rows[0], Row::Options(_)));
    }
}
