use std::collections::HashSet;

use jelly::row::{QuadRow, Slot, TableEntry, TripleRow};
use jelly::{
    Decoder, Encoder, JellyError, Row, Statement, StreamOptions, TableKind, Term,
};

fn name_only() -> StreamOptions {
    StreamOptions::default().with_prefix_table_size(0)
}

fn entry(id: u32, value: &str) -> TableEntry {
    TableEntry {
        id,
        value: value.into(),
    }
}

fn iri(prefix_id: u32, name_id: u32) -> Slot {
    Slot::Iri { prefix_id, name_id }
}

fn spo(s: &str, p: &str, o: &str) -> Statement {
    Statement::triple(Term::iri(s), Term::iri(p), Term::iri(o))
}

#[test]
fn options_row_comes_first_exactly_once() {
    let mut enc = Encoder::new(StreamOptions::default());
    let mut all = Vec::new();
    for i in 0..20 {
        let rows = enc
            .write_rows(&spo(
                &format!("http://ex.org/s{}", i % 3),
                "http://ex.org/p",
                &format!("http://ex.org/o{}", i),
            ))
            .unwrap();
        all.extend(rows);
    }
    assert!(matches!(all[0], Row::Options(_)));
    assert_eq!(all.iter().filter(|r| matches!(r, Row::Options(_))).count(), 1);

    enc.reset();
    let rows = enc.write_rows(&spo("http://a/s", "http://a/p", "http://a/o")).unwrap();
    assert!(matches!(rows[0], Row::Options(_)));
}

#[test]
fn table_values_are_never_reassigned() {
    let mut enc = Encoder::new(StreamOptions::default());
    let mut dec = Decoder::new();
    let mut names = Vec::new();
    let mut prefixes = Vec::new();
    for i in 0..200 {
        let st = spo(
            &format!("http://ex.org/ns{}/s{}", i % 4, i % 13),
            &format!("http://ex.org/vocab#p{}", i % 6),
            &format!("http://other.org/o{}", i % 29),
        );
        for row in enc.write_rows(&st).unwrap() {
            match &row {
                Row::Name(e) => names.push(e.value.clone()),
                Row::Prefix(e) => prefixes.push(e.value.clone()),
                _ => {}
            }
            dec.process_row(row).unwrap();
        }
    }
    let unique: HashSet<_> = names.iter().collect();
    assert_eq!(unique.len(), names.len());
    let unique: HashSet<_> = prefixes.iter().collect();
    assert_eq!(unique.len(), prefixes.len());
    assert_eq!(dec.table_len(TableKind::Name), names.len());
    assert_eq!(enc.table_len(TableKind::Name), names.len());
    assert_eq!(dec.table_len(TableKind::Prefix), prefixes.len());
}

#[test]
fn name_id_zero_means_previous_plus_one() {
    let mut dec = Decoder::new();
    dec.process_row(Row::Options(name_only())).unwrap();
    for (i, v) in ["http://a", "http://b", "http://c"].iter().enumerate() {
        dec.process_row(Row::Name(entry(i as u32 + 1, v))).unwrap();
    }
    let st = dec
        .process_row(Row::Triple(TripleRow {
            s: iri(0, 2),
            p: iri(0, 0),
            o: iri(0, 1),
        }))
        .unwrap()
        .unwrap();
    assert_eq!(st, spo("http://b", "http://c", "http://a"));
}

#[test]
fn prefix_id_zero_repeats_previous_prefix() {
    let mut dec = Decoder::new();
    dec.process_row(Row::Options(StreamOptions::default())).unwrap();
    dec.process_row(Row::Prefix(entry(1, "http://x/"))).unwrap();
    dec.process_row(Row::Prefix(entry(0, "http://y/"))).unwrap();
    dec.process_row(Row::Name(entry(0, "a"))).unwrap();
    dec.process_row(Row::Name(entry(0, "b"))).unwrap();
    let st = dec
        .process_row(Row::Triple(TripleRow {
            s: iri(2, 1),
            p: iri(0, 2),
            o: iri(1, 1),
        }))
        .unwrap()
        .unwrap();
    assert_eq!(st, spo("http://y/a", "http://y/b", "http://x/a"));
}

#[test]
fn prefix_id_zero_on_first_iri_fails() {
    let mut dec = Decoder::new();
    dec.process_row(Row::Options(StreamOptions::default())).unwrap();
    dec.process_row(Row::Prefix(entry(0, "http://x/"))).unwrap();
    dec.process_row(Row::Name(entry(0, "a"))).unwrap();
    let err = dec
        .process_row(Row::Triple(TripleRow {
            s: iri(0, 1),
            p: iri(1, 1),
            o: iri(1, 1),
        }))
        .unwrap_err();
    assert!(matches!(err, JellyError::Protocol(_)), "{}", err);
}

#[test]
fn prefix_id_with_disabled_prefix_table_fails() {
    let mut dec = Decoder::new();
    dec.process_row(Row::Options(name_only())).unwrap();
    dec.process_row(Row::Name(entry(0, "http://a"))).unwrap();
    let err = dec
        .process_row(Row::Triple(TripleRow {
            s: iri(1, 1),
            p: iri(0, 1),
            o: iri(0, 1),
        }))
        .unwrap_err();
    assert!(matches!(err, JellyError::Protocol(_)));
}

#[test]
fn encoder_emits_sentinels_only_when_they_apply() {
    let mut enc = Encoder::new(name_only());
    enc.write_rows(&spo("http://a", "http://b", "http://c")).unwrap();
    let rows = enc.write_rows(&spo("http://b", "http://a", "http://d")).unwrap();
    match rows.last() {
        Some(Row::Triple(t)) => {
            assert_eq!(t.s, iri(0, 2));
            assert_eq!(t.p, iri(0, 1));
            assert_eq!(t.o, iri(0, 4));
        }
        other => panic!("expected triple row, got {:?}", other),
    }

    let mut enc = Encoder::new(StreamOptions::default());
    let rows = enc
        .write_rows(&spo("http://x/a", "http://x/b", "http://y/c"))
        .unwrap();
    match rows.last() {
        Some(Row::Triple(t)) => {
            assert_eq!(t.s, iri(1, 0));
            assert_eq!(t.p, iri(0, 0));
            assert_eq!(t.o, iri(2, 0));
        }
        other => panic!("expected triple row, got {:?}", other),
    }
}

#[test]
fn unknown_name_id_fails() {
    let mut dec = Decoder::new();
    dec.process_row(Row::Options(name_only())).unwrap();
    let err = dec
        .process_row(Row::Triple(TripleRow {
            s: iri(0, 5),
            p: iri(0, 5),
            o: Slot::BNode("b".into()),
        }))
        .unwrap_err();
    assert!(matches!(err, JellyError::Protocol(_)));
}

#[test]
fn unknown_datatype_id_fails() {
    let mut dec = Decoder::new();
    dec.process_row(Row::Options(name_only())).unwrap();
    dec.process_row(Row::Name(entry(0, "http://a"))).unwrap();
    let err = dec
        .process_row(Row::Triple(TripleRow {
            s: iri(0, 1),
            p: iri(0, 1),
            o: Slot::Literal {
                lex: "1".into(),
                kind: jelly::row::LiteralKind::Datatype(std::num::NonZeroU32::new(2).unwrap()),
            },
        }))
        .unwrap_err();
    assert!(matches!(err, JellyError::Protocol(_)));
}

#[test]
fn absent_slot_on_first_statement_fails() {
    let mut dec = Decoder::new();
    dec.process_row(Row::Options(name_only())).unwrap();
    let err = dec
        .process_row(Row::Triple(TripleRow {
            s: Slot::Absent,
            p: Slot::BNode("x".into()),
            o: Slot::BNode("y".into()),
        }))
        .unwrap_err();
    assert!(matches!(err, JellyError::Protocol(_)));
}

#[test]
fn absent_inside_quoted_triple_fails() {
    let opts = name_only().with_rdf_star(true);
    let mut dec = Decoder::new();
    dec.process_row(Row::Options(opts)).unwrap();
    dec.process_row(Row::Name(entry(0, "http://p"))).unwrap();
    dec.process_row(Row::Triple(TripleRow {
        s: Slot::BNode("a".into()),
        p: iri(0, 1),
        o: Slot::BNode("b".into()),
    }))
    .unwrap();
    let err = dec
        .process_row(Row::Triple(TripleRow {
            s: Slot::Triple(Box::new(TripleRow {
                s: Slot::Absent,
                p: iri(0, 1),
                o: Slot::BNode("c".into()),
            })),
            p: Slot::Absent,
            o: Slot::Absent,
        }))
        .unwrap_err();
    assert!(matches!(err, JellyError::Protocol(_)));
}

#[test]
fn failed_decoder_stays_failed_until_reset() {
    let mut dec = Decoder::new();
    let err = dec.process_row(Row::Name(entry(0, "x"))).unwrap_err();
    assert!(matches!(err, JellyError::Protocol(_)));
    assert!(dec.process_row(Row::Options(name_only())).is_err());
    dec.reset();
    dec.process_row(Row::Options(name_only())).unwrap();
    dec.process_row(Row::Name(entry(0, "http://a"))).unwrap();
    let st = dec
        .process_row(Row::Quad(QuadRow {
            s: iri(0, 1),
            p: iri(0, 1),
            o: iri(0, 1),
            g: Slot::DefaultGraph,
        }))
        .unwrap()
        .unwrap();
    assert_eq!(st, spo("http://a", "http://a", "http://a"));
}

#[test]
fn options_must_not_change_mid_stream() {
    let mut dec = Decoder::new();
    dec.process_row(Row::Options(StreamOptions::default())).unwrap();
    dec.process_row(Row::Options(StreamOptions::default())).unwrap();
    assert!(dec
        .process_row(Row::Options(StreamOptions::quads()))
        .is_err());
}

#[test]
fn unsupported_version_is_rejected_on_both_sides() {
    let mut opts = StreamOptions::default();
    opts.version = jelly::options::PROTOCOL_VERSION + 1;
    let mut enc = Encoder::new(opts.clone());
    assert!(enc.write_rows(&spo("http://a", "http://b", "http://c")).is_err());
    let mut dec = Decoder::new();
    assert!(dec.process_row(Row::Options(opts)).is_err());
}

#[test]
fn generalized_terms_need_the_option() {
    let mut enc = Encoder::new(StreamOptions::default());
    let literal_subject = Statement::triple(
        Term::literal("s"),
        Term::iri("http://ex.org/p"),
        Term::literal("o"),
    );
    assert!(matches!(
        enc.write_rows(&literal_subject),
        Err(JellyError::Protocol(_))
    ));
    let bnode_predicate = Statement::triple(
        Term::iri("http://ex.org/s"),
        Term::bnode("p"),
        Term::literal("o"),
    );
    assert!(enc.write_rows(&bnode_predicate).is_err());
    let default_graph_object = Statement::triple(
        Term::iri("http://ex.org/s"),
        Term::iri("http://ex.org/p"),
        Term::DefaultGraph,
    );
    assert!(enc.write_rows(&default_graph_object).is_err());
    let quoted = Statement::triple(
        Term::triple(
            Term::iri("http://ex.org/a"),
            Term::iri("http://ex.org/b"),
            Term::iri("http://ex.org/c"),
        ),
        Term::iri("http://ex.org/p"),
        Term::literal("o"),
    );
    assert!(enc.write_rows(&quoted).is_err());
    assert_eq!(enc.statements_written(), 0);
}

#[test]
fn decoder_enforces_announced_options() {
    let mut dec = Decoder::new();
    dec.process_row(Row::Options(name_only())).unwrap();
    dec.process_row(Row::Name(entry(0, "http://p"))).unwrap();
    let err = dec
        .process_row(Row::Triple(TripleRow {
            s: Slot::Literal {
                lex: "s".into(),
                kind: jelly::row::LiteralKind::Simple,
            },
            p: iri(0, 1),
            o: Slot::BNode("o".into()),
        }))
        .unwrap_err();
    assert!(matches!(err, JellyError::Protocol(_)));
}

#[test]
fn table_ceiling_is_enforced() {
    let mut enc = Encoder::new(StreamOptions::default().with_datatype_table_size(1));
    let typed = |dt: &str| {
        Statement::triple(
            Term::iri("http://ex.org/s"),
            Term::iri("http://ex.org/p"),
            Term::typed_literal("1", dt),
        )
    };
    enc.write_rows(&typed("http://www.w3.org/2001/XMLSchema#integer"))
        .unwrap();
    let err = enc
        .write_rows(&typed("http://www.w3.org/2001/XMLSchema#decimal"))
        .unwrap_err();
    assert!(matches!(
        err,
        JellyError::ResourceLimit {
            table: TableKind::Datatype,
            limit: 1
        }
    ));
}

#[test]
fn decoder_rejects_ids_beyond_declared_table_size() {
    let mut dec = Decoder::new();
    dec.process_row(Row::Options(name_only().with_name_table_size(8)))
        .unwrap();
    assert!(dec.process_row(Row::Name(entry(9, "http://x"))).is_err());
}

#[test]
fn oversized_table_declarations_are_refused() {
    let huge = name_only().with_name_table_size(u32::MAX);
    let mut dec = Decoder::new();
    let err = dec
        .process_bytes(&jelly::encode_row(&Row::Options(huge.clone())))
        .unwrap_err();
    assert!(matches!(err, JellyError::Protocol(_)), "{}", err);
    assert!(dec.options().is_none());

    let mut enc = Encoder::new(huge);
    assert!(enc.write_rows(&spo("http://a", "http://b", "http://c")).is_err());

    let at_max = name_only().with_name_table_size(jelly::options::MAX_TABLE_SIZE);
    at_max.validate().unwrap();
}

#[test]
fn far_table_ids_fail_without_allocating() {
    let opts = name_only().with_name_table_size(jelly::options::MAX_TABLE_SIZE);
    let mut dec = Decoder::new();
    dec.process_row(Row::Options(opts)).unwrap();
    let row = jelly::encode_row(&Row::Name(entry(jelly::options::MAX_TABLE_SIZE, "x")));
    let err = dec.process_bytes(&row).unwrap_err();
    assert!(matches!(err, JellyError::Protocol(_)), "{}", err);
    assert_eq!(dec.table_len(TableKind::Name), 0);

    // the id right after the last one is still accepted
    dec.reset();
    dec.process_row(Row::Options(name_only())).unwrap();
    dec.process_row(Row::Name(entry(1, "http://a"))).unwrap();
    dec.process_row(Row::Name(entry(2, "http://b"))).unwrap();
    assert!(dec.process_row(Row::Name(entry(4, "http://d"))).is_err());
    assert_eq!(dec.table_len(TableKind::Name), 2);
}
