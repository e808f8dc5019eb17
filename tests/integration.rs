//! Integration tests for the full index→query pipeline (spec.md §8
//! scenarios 1-5): build an index, flush it to disk, reopen it as a
//! fresh process would, and query it.

use archer::engine::Index;
use archer::indexer::{delete_document, index_document};
use archer::query::{execute, parse, ProximityPosition, Query, TermNode};
use tempfile::tempdir;

fn build_and_flush(dir: &std::path::Path) {
    let mut index = Index::create(dir).unwrap();
    index_document(&mut index, "A", "foo bar foo").unwrap();
    index_document(&mut index, "B", "bar baz").unwrap();
    index_document(&mut index, "C", "foo foo bar").unwrap();
    index_document(&mut index, "D", "<title>foo</title> body bar").unwrap();
    index.flush().unwrap();
}

#[test]
fn scenario_bare_term_survives_a_reopen() {
    let dir = tempdir().unwrap();
    build_and_flush(dir.path());

    let mut index = Index::open(dir.path()).unwrap();
    let results = execute(&mut index, &parse("foo").unwrap()).unwrap();
    let names: Vec<&str> = results.iter().map(|r| index.doc_path(r.di).unwrap()).collect();
    assert!(names.contains(&"A"));
    assert!(names.contains(&"C"));
    assert!(!names.contains(&"B"));
}

#[test]
fn scenario_delete_then_reopen_hides_the_document() {
    let dir = tempdir().unwrap();
    build_and_flush(dir.path());

    {
        let mut index = Index::open(dir.path()).unwrap();
        delete_document(&mut index, "B").unwrap();
        index.flush().unwrap();
    }

    let mut index = Index::open(dir.path()).unwrap();
    let results = execute(&mut index, &parse("bar").unwrap()).unwrap();
    let names: Vec<&str> = results.iter().map(|r| index.doc_path(r.di).unwrap()).collect();
    assert_eq!(names.len(), 2);
    assert!(!names.contains(&"B"));
}

#[test]
fn scenario_phrase_query_requires_adjacency_after_reopen() {
    let dir = tempdir().unwrap();
    build_and_flush(dir.path());

    let mut index = Index::open(dir.path()).unwrap();
    let phrase = parse("\"foo bar\"").unwrap();
    let results = execute(&mut index, &phrase).unwrap();
    let names: Vec<&str> = results.iter().map(|r| index.doc_path(r.di).unwrap()).collect();
    assert!(names.contains(&"A"));
    assert!(names.contains(&"C"));
    assert!(!names.contains(&"B"));
}

#[test]
fn scenario_field_restriction_after_reopen() {
    let dir = tempdir().unwrap();
    build_and_flush(dir.path());
    let mut index = Index::open(dir.path()).unwrap();

    let hit = execute(&mut index, &parse("title:foo").unwrap()).unwrap();
    assert_eq!(hit.len(), 1);
    assert_eq!(index.doc_path(hit[0].di), Some("D"));

    let miss = execute(&mut index, &parse("title:bar").unwrap()).unwrap();
    assert!(miss.is_empty());
}

#[test]
fn scenario_inclusion_and_exclusion_can_cancel_out() {
    let dir = tempdir().unwrap();
    build_and_flush(dir.path());
    let mut index = Index::open(dir.path()).unwrap();

    let q = parse("+foo -bar").unwrap();
    let results = execute(&mut index, &q).unwrap();
    assert!(results.is_empty());
}

#[test]
fn reindexing_a_tombstoned_path_reuses_its_document_id() {
    let dir = tempdir().unwrap();
    let mut index = Index::create(dir.path()).unwrap();
    let di = index_document(&mut index, "a.txt", "alpha").unwrap();
    delete_document(&mut index, "a.txt").unwrap();
    index.flush().unwrap();

    let mut reopened = Index::open(dir.path()).unwrap();
    assert!(!reopened.is_live(di));
    let di2 = index_document(&mut reopened, "a.txt", "ignored on undelete").unwrap();
    assert_eq!(di, di2);
    assert!(reopened.is_live(di2));
}

#[test]
fn explicit_proximity_chain_matches_the_same_as_a_parsed_phrase() {
    let dir = tempdir().unwrap();
    build_and_flush(dir.path());
    let mut index = Index::open(dir.path()).unwrap();

    let manual = Query {
        ranking: vec![TermNode::word("foo").followed_by(ProximityPosition::Before, 1, TermNode::word("bar"))],
        ..Query::default()
    };
    let via_parser = parse("\"foo bar\"").unwrap();

    let mut manual_dis: Vec<i32> = execute(&mut index, &manual).unwrap().into_iter().map(|r| r.di).collect();
    let mut parsed_dis: Vec<i32> = execute(&mut index, &via_parser).unwrap().into_iter().map(|r| r.di).collect();
    manual_dis.sort_unstable();
    parsed_dis.sort_unstable();
    assert_eq!(manual_dis, parsed_dis);
}
