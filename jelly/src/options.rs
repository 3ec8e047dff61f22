//! Stream options sent once at the head of every stream, and encoder-local
//! settings that never reach the wire.

use crate::error::{JellyError, Result};
use crate::model::{Statement, Term, RDF_LANG_STRING, XSD_STRING};
use crate::row::MAX_NESTING_DEPTH;

/// Highest protocol version this crate reads and writes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Smallest name table a peer may declare.
pub const MIN_NAME_TABLE_SIZE: u32 = 8;

/// Largest size any lookup table may declare.
pub const MAX_TABLE_SIZE: u32 = 1 << 20;

/// Shape of the statement rows in a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum PhysicalType {
    /// Default-graph statements go out as Triple rows.
    #[default]
    Triples = 1,
    /// Every statement goes out as a Quad row.
    Quads = 2,
}

impl PhysicalType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            1 => PhysicalType::Triples,
            2 => PhysicalType::Quads,
            _ => return None,
        })
    }
}

/// Application-level classification of the stream. Carried verbatim; the
/// codec does not change behaviour based on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u32)]
pub enum LogicalType {
    #[default]
    Unspecified = 0,
    FlatTriples = 1,
    FlatQuads = 2,
    Graphs = 3,
    Datasets = 4,
    SubjectGraphs = 13,
    NamedGraphs = 14,
    TimestampedNamedGraphs = 114,
}

impl LogicalType {
    pub fn from_u32(v: u32) -> Option<Self> {
        use LogicalType::*;
        Some(match v {
            0 => Unspecified,
            1 => FlatTriples,
            2 => FlatQuads,
            3 => Graphs,
            4 => Datasets,
            13 => SubjectGraphs,
            14 => NamedGraphs,
            114 => TimestampedNamedGraphs,
            _ => return None,
        })
    }
}

/// Stream-wide header. Emitted by the encoder as the very first row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StreamOptions {
    /// Free-form label for the stream.
    pub stream_name: String,
    pub physical_type: PhysicalType,
    /// Allow literals and blank nodes in the predicate slot and literals in
    /// the subject and graph slots.
    pub generalized_statements: bool,
    /// Allow quoted triples.
    pub rdf_star: bool,
    pub max_name_table_size: u32,
    /// 0 disables prefix splitting.
    pub max_prefix_table_size: u32,
    pub max_datatype_table_size: u32,
    pub logical_type: LogicalType,
    pub version: u32,
}

impl Default for StreamOptions {
    fn default() -> Self {
        StreamOptions {
            stream_name: String::new(),
            physical_type: PhysicalType::Triples,
            generalized_statements: false,
            rdf_star: false,
            max_name_table_size: 4000,
            max_prefix_table_size: 150,
            max_datatype_table_size: 32,
            logical_type: LogicalType::Unspecified,
            version: PROTOCOL_VERSION,
        }
    }
}

impl StreamOptions {
    /// Defaults for a stream of quads.
    pub fn quads() -> Self {
        StreamOptions {
            physical_type: PhysicalType::Quads,
            logical_type: LogicalType::FlatQuads,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.stream_name = name.into();
        self
    }

    pub fn with_physical_type(mut self, physical_type: PhysicalType) -> Self {
        self.physical_type = physical_type;
        self
    }

    pub fn with_logical_type(mut self, logical_type: LogicalType) -> Self {
        self.logical_type = logical_type;
        self
    }

    pub fn with_generalized_statements(mut self, on: bool) -> Self {
        self.generalized_statements = on;
        self
    }

    pub fn with_rdf_star(mut self, on: bool) -> Self {
        self.rdf_star = on;
        self
    }

    pub fn with_name_table_size(mut self, size: u32) -> Self {
        self.max_name_table_size = size;
        self
    }

    pub fn with_prefix_table_size(mut self, size: u32) -> Self {
        self.max_prefix_table_size = size;
        self
    }

    pub fn with_datatype_table_size(mut self, size: u32) -> Self {
        self.max_datatype_table_size = size;
        self
    }

    /// True when IRIs are split into a prefix and a name.
    pub fn uses_prefix_table(&self) -> bool {
        self.max_prefix_table_size > 0
    }

    /// Check the options against what this crate can read and write.
    pub fn validate(&self) -> Result<()> {
        if self.version == 0 || self.version > PROTOCOL_VERSION {
            return Err(JellyError::Protocol(format!(
                "unsupported protocol version {} (max {})",
                self.version, PROTOCOL_VERSION
            )));
        }
        if self.max_name_table_size < MIN_NAME_TABLE_SIZE {
            return Err(JellyError::Protocol(format!(
                "name table size {} is below the minimum of {}",
                self.max_name_table_size, MIN_NAME_TABLE_SIZE
            )));
        }
        if self.max_datatype_table_size == 0 {
            return Err(JellyError::Protocol(
                "datatype table size must be at least 1".into(),
            ));
        }
        for (kind, size) in [
            ("name", self.max_name_table_size),
            ("prefix", self.max_prefix_table_size),
            ("datatype", self.max_datatype_table_size),
        ] {
            if size > MAX_TABLE_SIZE {
                return Err(JellyError::Protocol(format!(
                    "{} table size {} is above the maximum of {}",
                    kind, size, MAX_TABLE_SIZE
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Subject,
    Predicate,
    Object,
    Graph,
}

impl Role {
    fn name(self) -> &'static str {
        match self {
            Role::Subject => "subject",
            Role::Predicate => "predicate",
            Role::Object => "object",
            Role::Graph => "graph",
        }
    }
}

impl StreamOptions {
    /// Check that every term of `st` is allowed in its slot under these
    /// options. Used by the encoder before it touches any table, and by the
    /// decoder on every reconstructed statement.
    pub fn check_statement(&self, st: &Statement) -> Result<()> {
        self.check_term(&st.s, Role::Subject, 0)?;
        self.check_term(&st.p, Role::Predicate, 0)?;
        self.check_term(&st.o, Role::Object, 0)?;
        self.check_term(&st.g, Role::Graph, 0)
    }

    fn check_term(&self, term: &Term, role: Role, depth: usize) -> Result<()> {
        let generalized = self.generalized_statements;
        let reject = |why: &str| -> Result<()> {
            Err(JellyError::Protocol(format!(
                "{} cannot be a {}{}",
                role.name(),
                term.kind_name(),
                why
            )))
        };
        match term {
            Term::Iri(_) => Ok(()),
            Term::BNode(_) if role == Role::Predicate && !generalized => {
                reject(" without generalized statements")
            }
            Term::BNode(_) => Ok(()),
            Term::Literal { dt, lang, .. } => {
                if role != Role::Object && !generalized {
                    return reject(" without generalized statements");
                }
                // xsd:string and rdf:langString are implied, never spelled out
                match (lang, dt.as_deref()) {
                    (Some(_), Some(d @ RDF_LANG_STRING)) | (None, Some(d @ XSD_STRING)) => Err(
                        JellyError::Protocol(format!("literal datatype {} must be left implicit", d)),
                    ),
                    (Some(_), Some(_)) => Err(JellyError::Protocol(
                        "literal carries both a language tag and a datatype".into(),
                    )),
                    _ => Ok(()),
                }
            }
            Term::Triple(t) => {
                if !self.rdf_star {
                    return reject(" when RDF-star is disabled");
                }
                if matches!(role, Role::Predicate | Role::Graph) && !generalized {
                    return reject(" without generalized statements");
                }
                if depth >= MAX_NESTING_DEPTH {
                    return Err(JellyError::Protocol(format!(
                        "quoted triples nested deeper than {}",
                        MAX_NESTING_DEPTH
                    )));
                }
                self.check_term(&t.s, Role::Subject, depth + 1)?;
                self.check_term(&t.p, Role::Predicate, depth + 1)?;
                self.check_term(&t.o, Role::Object, depth + 1)
            }
            Term::DefaultGraph if role == Role::Graph && depth == 0 => Ok(()),
            Term::DefaultGraph => reject(""),
        }
    }
}

/// Encoder behaviour that does not affect the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EncoderOptions {
    /// Send a slot as absent when it repeats the previous statement's term.
    pub elide_repeated_terms: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        EncoderOptions {
            elide_repeated_terms: true,
        }
    }
}
