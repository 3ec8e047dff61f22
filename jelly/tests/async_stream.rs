#![cfg(feature = "async")]

use futures_util::{stream, StreamExt};
use jelly::stream::decode_stream;
use jelly::{Encoder, JellyError, Statement, StreamOptions, Term};

fn units(input: &[Statement]) -> Vec<Vec<u8>> {
    let mut enc = Encoder::new(StreamOptions::quads());
    input
        .iter()
        .flat_map(|st| enc.write(st).expect("encode"))
        .collect()
}

fn sample() -> Vec<Statement> {
    (0..40)
        .map(|i| {
            Statement::quad(
                Term::iri(format!("http://example.org/sensor/{}", i % 4)),
                Term::iri("http://example.org/reading"),
                Term::typed_literal(format!("{}", i * 3), "http://www.w3.org/2001/XMLSchema#int"),
                Term::iri(format!("http://example.org/window/{}", i / 10)),
            )
        })
        .collect()
}

#[tokio::test]
async fn async_source_decodes_in_order() {
    let input = sample();
    let out: Vec<Statement> = decode_stream(stream::iter(units(&input)))
        .map(|r| r.expect("decode"))
        .collect()
        .await;
    assert_eq!(out, input);
}

#[tokio::test]
async fn async_stream_ends_after_error() {
    let mut source = units(&sample());
    source.insert(3, vec![0x07]);
    let results: Vec<_> = decode_stream(stream::iter(source)).collect().await;
    assert!(matches!(results.last(), Some(Err(JellyError::Malformed(_)))));
    assert!(results[..results.len() - 1].iter().all(Result::is_ok));
}

#[tokio::test]
async fn dropping_midway_is_fine() {
    let input = sample();
    let first: Vec<_> = decode_stream(stream::iter(units(&input)))
        .take(2)
        .collect()
        .await;
    assert_eq!(first.len(), 2);
}
