//! Structured wire rows and their binary layout.
//!
//! A row is one transport unit. The layout is a one-byte row tag followed
//! by the row's fields; integers are LEB128 varints and strings are a
//! varint byte length followed by UTF-8 bytes.
//!
//! | tag | row                | fields                                              |
//! |-----|--------------------|-----------------------------------------------------|
//! | 1   | stream options     | name, physical u8, logical, flags u8, name/prefix/datatype sizes, version |
//! | 2   | prefix entry       | id, value                                           |
//! | 3   | name entry         | id, value                                           |
//! | 4   | datatype entry     | id, value                                           |
//! | 5   | triple             | s, p, o slots                                       |
//! | 6   | quad               | s, p, o, g slots                                    |
//!
//! Each slot starts with its own tag byte; see [`Slot`]. This module knows
//! nothing about tables or elision.

use std::num::NonZeroU32;

use crate::error::{JellyError, Result};
use crate::options::{LogicalType, PhysicalType, StreamOptions};

/// Deepest quoted-triple nesting accepted from the wire.
pub const MAX_NESTING_DEPTH: usize = 64;

const ROW_OPTIONS: u8 = 1;
const ROW_PREFIX: u8 = 2;
const ROW_NAME: u8 = 3;
const ROW_DATATYPE: u8 = 4;
const ROW_TRIPLE: u8 = 5;
const ROW_QUAD: u8 = 6;

const SLOT_ABSENT: u8 = 0;
const SLOT_IRI: u8 = 1;
const SLOT_BNODE: u8 = 2;
const SLOT_SIMPLE_LITERAL: u8 = 3;
const SLOT_LANG_LITERAL: u8 = 4;
const SLOT_TYPED_LITERAL: u8 = 5;
const SLOT_TRIPLE: u8 = 6;
const SLOT_DEFAULT_GRAPH: u8 = 7;

const FLAG_GENERALIZED: u8 = 1 << 0;
const FLAG_RDF_STAR: u8 = 1 << 1;

/// Lookup-table update. `id == 0` means "last id in this table plus one".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub id: u32,
    pub value: String,
}

/// Literal annotation as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralKind {
    /// `xsd:string`.
    Simple,
    Lang(String),
    /// Datatype table id.
    Datatype(NonZeroU32),
}

/// One term slot of a statement row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Repeat the same slot of the previous statement.
    Absent,
    /// IRI split into table references; 0 is a sentinel in both fields.
    Iri { prefix_id: u32, name_id: u32 },
    BNode(String),
    Literal { lex: String, kind: LiteralKind },
    Triple(Box<TripleRow>),
    DefaultGraph,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripleRow {
    pub s: Slot,
    pub p: Slot,
    pub o: Slot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadRow {
    pub s: Slot,
    pub p: Slot,
    pub o: Slot,
    pub g: Slot,
}

/// A single structured row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Options(StreamOptions),
    Prefix(TableEntry),
    Name(TableEntry),
    Datatype(TableEntry),
    Triple(TripleRow),
    Quad(QuadRow),
}

impl Row {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Row::Options(_) => "options",
            Row::Prefix(_) => "prefix",
            Row::Name(_) => "name",
            Row::Datatype(_) => "datatype",
            Row::Triple(_) => "triple",
            Row::Quad(_) => "quad",
        }
    }

    /// True for triple and quad rows.
    pub fn is_statement(&self) -> bool {
        matches!(self, Row::Triple(_) | Row::Quad(_))
    }
}

// ---------------- Encoding ----------------

pub(crate) fn push_uvarint(mut v: u64, out: &mut Vec<u8>) {
    loop {
        let mut b = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            b |= 0x80;
        }
        out.push(b);
        if v == 0 {
            break;
        }
    }
}

fn push_str(s: &str, out: &mut Vec<u8>) {
    push_uvarint(s.len() as u64, out);
    out.extend_from_slice(s.as_bytes());
}

fn push_slot(slot: &Slot, out: &mut Vec<u8>) {
    match slot {
        Slot::Absent => out.push(SLOT_ABSENT),
        Slot::Iri { prefix_id, name_id } => {
            out.push(SLOT_IRI);
            push_uvarint(*prefix_id as u64, out);
            push_uvarint(*name_id as u64, out);
        }
        Slot::BNode(b) => {
            out.push(SLOT_BNODE);
            push_str(b, out);
        }
        Slot::Literal { lex, kind } => match kind {
            LiteralKind::Simple => {
                out.push(SLOT_SIMPLE_LITERAL);
                push_str(lex, out);
            }
            LiteralKind::Lang(lang) => {
                out.push(SLOT_LANG_LITERAL);
                push_str(lex, out);
                push_str(lang, out);
            }
            LiteralKind::Datatype(id) => {
                out.push(SLOT_TYPED_LITERAL);
                push_str(lex, out);
                push_uvarint(id.get() as u64, out);
            }
        },
        Slot::Triple(t) => {
            out.push(SLOT_TRIPLE);
            push_slot(&t.s, out);
            push_slot(&t.p, out);
            push_slot(&t.o, out);
        }
        Slot::DefaultGraph => out.push(SLOT_DEFAULT_GRAPH),
    }
}

fn push_entry(tag: u8, e: &TableEntry, out: &mut Vec<u8>) {
    out.push(tag);
    push_uvarint(e.id as u64, out);
    push_str(&e.value, out);
}

/// Serialize one row into a standalone buffer.
pub fn encode_row(row: &Row) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    match row {
        Row::Options(o) => {
            out.push(ROW_OPTIONS);
            push_str(&o.stream_name, &mut out);
            out.push(o.physical_type as u8);
            push_uvarint(o.logical_type as u64, &mut out);
            let mut flags = 0u8;
            if o.generalized_statements {
                flags |= FLAG_GENERALIZED;
            }
            if o.rdf_star {
                flags |= FLAG_RDF_STAR;
            }
            out.push(flags);
            push_uvarint(o.max_name_table_size as u64, &mut out);
            push_uvarint(o.max_prefix_table_size as u64, &mut out);
            push_uvarint(o.max_datatype_table_size as u64, &mut out);
            push_uvarint(o.version as u64, &mut out);
        }
        Row::Prefix(e) => push_entry(ROW_PREFIX, e, &mut out),
        Row::Name(e) => push_entry(ROW_NAME, e, &mut out),
        Row::Datatype(e) => push_entry(ROW_DATATYPE, e, &mut out),
        Row::Triple(t) => {
            out.push(ROW_TRIPLE);
            push_slot(&t.s, &mut out);
            push_slot(&t.p, &mut out);
            push_slot(&t.o, &mut out);
        }
        Row::Quad(q) => {
            out.push(ROW_QUAD);
            push_slot(&q.s, &mut out);
            push_slot(&q.p, &mut out);
            push_slot(&q.o, &mut out);
            push_slot(&q.g, &mut out);
        }
    }
    out
}

// ---------------- Decoding ----------------

pub(crate) fn read_uvarint(buf: &[u8], mut off: usize) -> Option<(u64, usize)> {
    let (mut x, mut s) = (0u64, 0u32);
    for _ in 0..10 {
        let b = *buf.get(off)? as u64;
        off += 1;
        x |= (b & 0x7f) << s;
        if b & 0x80 == 0 {
            return Some((x, off));
        }
        s += 7;
    }
    None
}

fn malformed(m: impl Into<String>) -> JellyError {
    JellyError::Malformed(m.into())
}

struct RowReader<'a> {
    buf: &'a [u8],
    off: usize,
}

impl<'a> RowReader<'a> {
    fn u8(&mut self, what: &str) -> Result<u8> {
        let b = *self
            .buf
            .get(self.off)
            .ok_or_else(|| malformed(format!("truncated {}", what)))?;
        self.off += 1;
        Ok(b)
    }

    fn u64(&mut self, what: &str) -> Result<u64> {
        let (v, off) =
            read_uvarint(self.buf, self.off).ok_or_else(|| malformed(format!("bad varint in {}", what)))?;
        self.off = off;
        Ok(v)
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        u32::try_from(self.u64(what)?).map_err(|_| malformed(format!("{} overflows u32", what)))
    }

    fn str(&mut self, what: &str) -> Result<String> {
        let len = self.u64(what)? as usize;
        let end = self
            .off
            .checked_add(len)
            .filter(|&e| e <= self.buf.len())
            .ok_or_else(|| malformed(format!("truncated {}", what)))?;
        let s = std::str::from_utf8(&self.buf[self.off..end])
            .map_err(|_| malformed(format!("{} is not UTF-8", what)))?;
        self.off = end;
        Ok(s.to_string())
    }

    fn slot(&mut self, depth: usize) -> Result<Slot> {
        Ok(match self.u8("slot tag")? {
            SLOT_ABSENT => Slot::Absent,
            SLOT_IRI => {
                let prefix_id = self.u32("prefix id")?;
                let name_id = self.u32("name id")?;
                Slot::Iri { prefix_id, name_id }
            }
            SLOT_BNODE => Slot::BNode(self.str("blank node")?),
            SLOT_SIMPLE_LITERAL => Slot::Literal {
                lex: self.str("literal")?,
                kind: LiteralKind::Simple,
            },
            SLOT_LANG_LITERAL => {
                let lex = self.str("literal")?;
                let lang = self.str("language tag")?;
                Slot::Literal {
                    lex,
                    kind: LiteralKind::Lang(lang),
                }
            }
            SLOT_TYPED_LITERAL => {
                let lex = self.str("literal")?;
                let id = NonZeroU32::new(self.u32("datatype id")?)
                    .ok_or_else(|| malformed("datatype id 0"))?;
                Slot::Literal {
                    lex,
                    kind: LiteralKind::Datatype(id),
                }
            }
            SLOT_TRIPLE => {
                if depth >= MAX_NESTING_DEPTH {
                    return Err(malformed(format!(
                        "quoted triples nested deeper than {}",
                        MAX_NESTING_DEPTH
                    )));
                }
                Slot::Triple(Box::new(self.triple(depth + 1)?))
            }
            SLOT_DEFAULT_GRAPH => Slot::DefaultGraph,
            t => return Err(malformed(format!("unknown slot tag {}", t))),
        })
    }

    fn triple(&mut self, depth: usize) -> Result<TripleRow> {
        let s = self.slot(depth)?;
        let p = self.slot(depth)?;
        let o = self.slot(depth)?;
        Ok(TripleRow { s, p, o })
    }

    fn entry(&mut self) -> Result<TableEntry> {
        let id = self.u32("entry id")?;
        let value = self.str("entry value")?;
        Ok(TableEntry { id, value })
    }

    fn options(&mut self) -> Result<StreamOptions> {
        let stream_name = self.str("stream name")?;
        let physical = self.u8("physical type")?;
        let physical_type = PhysicalType::from_u8(physical)
            .ok_or_else(|| malformed(format!("unknown physical type {}", physical)))?;
        let logical = self.u32("logical type")?;
        let logical_type = LogicalType::from_u32(logical)
            .ok_or_else(|| malformed(format!("unknown logical type {}", logical)))?;
        let flags = self.u8("flags")?;
        Ok(StreamOptions {
            stream_name,
            physical_type,
            generalized_statements: flags & FLAG_GENERALIZED != 0,
            rdf_star: flags & FLAG_RDF_STAR != 0,
            max_name_table_size: self.u32("name table size")?,
            max_prefix_table_size: self.u32("prefix table size")?,
            max_datatype_table_size: self.u32("datatype table size")?,
            logical_type,
            version: self.u32("version")?,
        })
    }
}

/// Parse one transport unit into a row. The buffer must hold exactly one row.
pub fn decode_row(buf: &[u8]) -> Result<Row> {
    let mut r = RowReader { buf, off: 0 };
    let row = match r.u8("row tag")? {
        ROW_OPTIONS => Row::Options(r.options()?),
        ROW_PREFIX => Row::Prefix(r.entry()?),
        ROW_NAME => Row::Name(r.entry()?),
        ROW_DATATYPE => Row::Datatype(r.entry()?),
        ROW_TRIPLE => Row::Triple(r.triple(0)?),
        ROW_QUAD => {
            let s = r.slot(0)?;
            let p = r.slot(0)?;
            let o = r.slot(0)?;
            let g = r.slot(0)?;
            Row::Quad(QuadRow { s, p, o, g })
        }
        t => return Err(malformed(format!("unknown row tag {}", t))),
    };
    if r.off != buf.len() {
        return Err(malformed(format!(
            "{} trailing bytes after {} row",
            buf.len() - r.off,
            row.kind_name()
        )));
    }
    Ok(row)
}
