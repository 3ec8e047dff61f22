//! Owned RDF term and statement types consumed by the encoder and produced
//! by the decoder.
//!
//! ```
//! use jelly::{Statement, Term};
//!
//! let st = Statement::quad(
//!     Term::iri("http://example.org/s"),
//!     Term::iri("http://example.org/p"),
//!     Term::typed_literal("42", "http://www.w3.org/2001/XMLSchema#integer"),
//!     Term::iri("http://example.org/g"),
//! );
//! assert!(!st.is_triple());
//! ```

use std::fmt;

/// Datatype of plain literals; never sent on the wire.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
/// Datatype of language-tagged literals.
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// RDF term occupying one slot of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// IRI/URI node.
    Iri(String),
    /// Blank node label, without the `_:` prefix.
    BNode(String),
    /// Literal with an optional datatype or language tag.
    ///
    /// `dt: None` stands for `xsd:string` when `lang` is also `None`, and
    /// for `rdf:langString` when a language tag is present. Spelling either
    /// datatype out is rejected by the encoder; use the constructors.
    Literal {
        lex: String,
        dt: Option<String>,
        lang: Option<String>,
    },
    /// Quoted triple (RDF-star).
    Triple(Box<Triple>),
    /// Marker for the default graph; only valid in the graph slot.
    DefaultGraph,
}

impl Term {
    pub fn iri(s: impl Into<String>) -> Self {
        Term::Iri(s.into())
    }

    pub fn bnode(label: impl Into<String>) -> Self {
        Term::BNode(label.into())
    }

    /// Plain literal (`xsd:string`).
    pub fn literal(lex: impl Into<String>) -> Self {
        Term::Literal {
            lex: lex.into(),
            dt: None,
            lang: None,
        }
    }

    pub fn lang_literal(lex: impl Into<String>, lang: impl Into<String>) -> Self {
        Term::Literal {
            lex: lex.into(),
            dt: None,
            lang: Some(lang.into()),
        }
    }

    /// Typed literal. An `xsd:string` datatype is folded into a plain
    /// literal so that values compare equal after a round trip.
    pub fn typed_literal(lex: impl Into<String>, dt: impl Into<String>) -> Self {
        let dt = dt.into();
        Term::Literal {
            lex: lex.into(),
            dt: if dt == XSD_STRING { None } else { Some(dt) },
            lang: None,
        }
    }

    pub fn triple(s: Term, p: Term, o: Term) -> Self {
        Term::Triple(Box::new(Triple { s, p, o }))
    }

    /// Short name of the term kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Term::Iri(_) => "IRI",
            Term::BNode(_) => "blank node",
            Term::Literal { .. } => "literal",
            Term::Triple(_) => "quoted triple",
            Term::DefaultGraph => "default graph",
        }
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            _ => write!(f, "{}", c)?,
        }
    }
    Ok(())
}

/// N-Triples style rendering.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(s) => write!(f, "<{}>", s),
            Term::BNode(b) => write!(f, "_:{}", b),
            Term::Literal { lex, dt, lang } => {
                f.write_str("\"")?;
                write_escaped(f, lex)?;
                f.write_str("\"")?;
                match (dt, lang) {
                    (_, Some(lang)) => write!(f, "@{}", lang),
                    (Some(dt), None) => write!(f, "^^<{}>", dt),
                    (None, None) => Ok(()),
                }
            }
            Term::Triple(t) => write!(f, "<< {} {} {} >>", t.s, t.p, t.o),
            Term::DefaultGraph => Ok(()),
        }
    }
}

/// Subject, predicate and object of a quoted triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub s: Term,
    pub p: Term,
    pub o: Term,
}

/// One RDF statement; `g` is [`Term::DefaultGraph`] for plain triples.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    /// Subject term.
    pub s: Term,
    /// Predicate term.
    pub p: Term,
    /// Object term.
    pub o: Term,
    /// Graph term.
    pub g: Term,
}

impl Statement {
    /// Statement in the default graph.
    pub fn triple(s: Term, p: Term, o: Term) -> Self {
        Statement {
            s,
            p,
            o,
            g: Term::DefaultGraph,
        }
    }

    pub fn quad(s: Term, p: Term, o: Term, g: Term) -> Self {
        Statement { s, p, o, g }
    }

    /// True if the statement lives in the default graph.
    pub fn is_triple(&self) -> bool {
        self.g == Term::DefaultGraph
    }

    /// The four slots in wire order: subject, predicate, object, graph.
    pub fn terms(&self) -> [&Term; 4] {
        [&self.s, &self.p, &self.o, &self.g]
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.s, self.p, self.o)?;
        if !self.is_triple() {
            write!(f, " {}", self.g)?;
        }
        f.write_str(" .")
    }
}

// ---------------- Oxigraph helpers ----------------

#[cfg(feature = "oxigraph")]
mod ox {
    use super::{Statement, Term};
    use crate::error::{JellyError, Result};
    use oxigraph::model::{
        BlankNode, GraphName, Literal, NamedNode, NamedOrBlankNode, Quad, Term as OxTerm,
    };

    fn invalid(what: &str, e: impl std::fmt::Display) -> JellyError {
        JellyError::Protocol(format!("{}: {}", what, e))
    }

    impl TryFrom<&OxTerm> for Term {
        type Error = JellyError;

        fn try_from(t: &OxTerm) -> Result<Self> {
            Ok(match t {
                OxTerm::NamedNode(n) => Term::Iri(n.as_str().to_string()),
                OxTerm::BlankNode(b) => Term::BNode(b.as_str().to_string()),
                OxTerm::Literal(l) => match l.language() {
                    Some(lang) => Term::lang_literal(l.value(), lang),
                    None => Term::typed_literal(l.value(), l.datatype().as_str()),
                },
                // quoted triples only exist when oxigraph is built with RDF 1.2
                #[allow(unreachable_patterns)]
                other => {
                    return Err(JellyError::Protocol(format!(
                        "unsupported oxigraph term {}",
                        other
                    )))
                }
            })
        }
    }

    impl From<&NamedOrBlankNode> for Term {
        fn from(n: &NamedOrBlankNode) -> Self {
            match n {
                NamedOrBlankNode::NamedNode(n) => Term::Iri(n.as_str().to_string()),
                NamedOrBlankNode::BlankNode(b) => Term::BNode(b.as_str().to_string()),
            }
        }
    }

    impl TryFrom<&Quad> for Statement {
        type Error = JellyError;

        fn try_from(q: &Quad) -> Result<Self> {
            let g = match &q.graph_name {
                GraphName::NamedNode(n) => Term::Iri(n.as_str().to_string()),
                GraphName::BlankNode(b) => Term::BNode(b.as_str().to_string()),
                GraphName::DefaultGraph => Term::DefaultGraph,
            };
            Ok(Statement {
                s: Term::from(&q.subject),
                p: Term::Iri(q.predicate.as_str().to_string()),
                o: Term::try_from(&q.object)?,
                g,
            })
        }
    }

    fn to_named_or_blank(t: &Term, role: &str) -> Result<NamedOrBlankNode> {
        Ok(match t {
            Term::Iri(s) => NamedNode::new(s.as_str())
                .map_err(|e| invalid(role, e))?
                .into(),
            Term::BNode(b) => BlankNode::new(b.as_str())
                .map_err(|e| invalid(role, e))?
                .into(),
            other => {
                return Err(JellyError::Protocol(format!(
                    "{} cannot be a {}",
                    role,
                    other.kind_name()
                )))
            }
        })
    }

    fn to_ox_term(t: &Term) -> Result<OxTerm> {
        Ok(match t {
            Term::Iri(s) => NamedNode::new(s.as_str())
                .map_err(|e| invalid("object", e))?
                .into(),
            Term::BNode(b) => BlankNode::new(b.as_str())
                .map_err(|e| invalid("object", e))?
                .into(),
            Term::Literal { lex, dt, lang } => match (lang, dt) {
                (Some(lang), _) => Literal::new_language_tagged_literal(lex.as_str(), lang.as_str())
                    .map_err(|e| invalid("language tag", e))?
                    .into(),
                (None, Some(dt)) => {
                    let dt = NamedNode::new(dt.as_str()).map_err(|e| invalid("datatype", e))?;
                    Literal::new_typed_literal(lex.as_str(), dt).into()
                }
                (None, None) => Literal::new_simple_literal(lex.as_str()).into(),
            },
            other => {
                return Err(JellyError::Protocol(format!(
                    "object cannot be a {} in an oxigraph quad",
                    other.kind_name()
                )))
            }
        })
    }

    impl Statement {
        /// Convert into an oxigraph quad. Quoted triples and generalized
        /// statements have no oxigraph counterpart and are rejected.
        pub fn to_oxigraph(&self) -> Result<Quad> {
            let s = to_named_or_blank(&self.s, "subject")?;
            let p = match &self.p {
                Term::Iri(p) => NamedNode::new(p.as_str()).map_err(|e| invalid("predicate", e))?,
                other => {
                    return Err(JellyError::Protocol(format!(
                        "predicate cannot be a {}",
                        other.kind_name()
                    )))
                }
            };
            let o = to_ox_term(&self.o)?;
            let g = match &self.g {
                Term::DefaultGraph => GraphName::DefaultGraph,
                other => to_named_or_blank(other, "graph")?.into(),
            };
            Ok(Quad::new(s, p, o, g))
        }
    }
}
