//! MEI export: XML structure, determinism, and failure modes

use score_capsule::renderers::mei::{self, MeiError};

const TUNE: &str = "X:1\nT:Air\nC:Trad.\nM:3/4\nL:1/4\nK:G\nG A B | c2 z |\n";

#[test]
fn mei_tree_structure() {
    let xml = mei::encode(TUNE).unwrap();
    let doc = roxmltree::Document::parse(&xml).unwrap();

    let root = doc.root_element();
    assert_eq!(root.tag_name().name(), "mei");

    let score_def = root
        .descendants()
        .find(|n| n.has_tag_name("scoreDef"))
        .unwrap();
    assert_eq!(score_def.attribute("meter.count"), Some("3"));
    assert_eq!(score_def.attribute("meter.unit"), Some("4"));
    assert_eq!(score_def.attribute("key.sig"), Some("1s")); // G major

    let measures = root.descendants().filter(|n| n.has_tag_name("measure")).count();
    assert_eq!(measures, 2);

    let notes: Vec<_> = root.descendants().filter(|n| n.has_tag_name("note")).collect();
    assert_eq!(notes.len(), 4);
    assert_eq!(notes[0].attribute("pname"), Some("g"));
    assert_eq!(notes[0].attribute("oct"), Some("4"));
    assert_eq!(notes[0].attribute("dur"), Some("4"));

    assert_eq!(
        root.descendants().filter(|n| n.has_tag_name("rest")).count(),
        1
    );
}

#[test]
fn one_staff_per_voice() {
    let abc = "X:1\nM:4/4\nL:1/4\nK:C\n[V:1] C D E F |\n[V:2] E F G A |\n";
    let xml = mei::encode(abc).unwrap();
    let doc = roxmltree::Document::parse(&xml).unwrap();

    let staff_defs = doc
        .root_element()
        .descendants()
        .filter(|n| n.has_tag_name("staffDef"))
        .count();
    assert_eq!(staff_defs, 2);

    // Each measure carries one staff per voice
    let first_measure = doc
        .root_element()
        .descendants()
        .find(|n| n.has_tag_name("measure"))
        .unwrap();
    let staves = first_measure
        .children()
        .filter(|n| n.has_tag_name("staff"))
        .count();
    assert_eq!(staves, 2);
}

#[test]
fn accidentals_are_encoded() {
    let xml = mei::encode("X:1\nM:4/4\nL:1/4\nK:C\n^F _B =C z |\n").unwrap();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let notes: Vec<_> = doc
        .root_element()
        .descendants()
        .filter(|n| n.has_tag_name("note"))
        .collect();
    assert_eq!(notes[0].attribute("accid"), Some("s"));
    assert_eq!(notes[1].attribute("accid"), Some("f"));
    // An explicit natural in C major carries no alteration
    assert_eq!(notes[2].attribute("accid"), None);
}

#[test]
fn identical_input_yields_identical_xml() {
    let first = mei::encode(TUNE).unwrap();
    let second = mei::encode(TUNE).unwrap();
    assert_eq!(first, second);
}

#[test]
fn empty_score_reports_empty_output_not_success() {
    let err = mei::encode("X:1\nT:Nothing\nM:4/4\nK:C\n").unwrap_err();
    assert!(matches!(err, MeiError::EmptyOutput));
}

#[test]
fn parse_errors_surface_as_parse_variant() {
    let err = mei::encode("X:1\nK:C\n%%%bogus\n???\n").unwrap_err();
    assert!(matches!(err, MeiError::Parse(_)));
}
