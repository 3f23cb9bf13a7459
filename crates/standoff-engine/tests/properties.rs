use pretty_assertions::assert_eq;
use rstest::rstest;
use standoff_engine::table::invariants;
use standoff_engine::{Inline, PositionedAnnotation, Standoff, io};

fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .is_test(true)
        .try_init();
}

#[rstest]
#[case::tei_fragment(r#"<W><text type="a">A <lb/>B C</text></W>"#)]
#[case::point_at_end_of_child("<p>a<hi>b<lb/></hi>c</p>")]
#[case::nested_body(r#"<TEI><text><body><p>x <pb n="1"/>y</p></body></text></TEI>"#)]
#[case::siblings("<r><a>ab</a>c<b>de</b></r>")]
#[case::comment("<p>a<!--bc-->d<!---->e</p>")]
fn annotations_rebuild_the_same_tree(#[case] source: &str) {
    // Given a parsed document
    let standoff = io::parse_str(source).unwrap();

    // When it is rebuilt from its text and annotations
    let rebuilt = Standoff::from_annotations(&standoff.plain(), &standoff.annotations()).unwrap();

    // Then the markup is unchanged
    assert_eq!(rebuilt.to_xml(), source);
    assert_eq!(rebuilt.annotations(), standoff.annotations());
}

#[rstest]
#[case::wide(0, 5)]
#[case::inner(1, 3)]
#[case::around_point(3, 5)]
#[case::first_char(0, 1)]
#[case::point(4, 4)]
fn add_then_remove_restores_document(#[case] begin: usize, #[case] end: usize) {
    init_logging();
    let source = "<p>a<hi>bc</hi>d<lb/>e</p>";
    let mut standoff = io::parse_str(source).unwrap();

    let el = standoff
        .add_inline(Inline::new(begin, end, "seg"))
        .unwrap()
        .unwrap();
    invariants::check(standoff.table());
    assert_eq!(
        standoff.text_of(el).as_deref(),
        Some(&standoff.plain()[begin..end])
    );

    standoff.remove_inline(el).unwrap();
    invariants::check(standoff.table());
    assert_eq!(standoff.to_xml(), source);
}

#[test]
fn json_round_trip() {
    let standoff = io::parse_str(r#"<p>a <hi rend="b">bold</hi><lb/></p>"#).unwrap();

    let json = standoff.to_json().unwrap();
    let restored = Standoff::from_json(&standoff.plain(), &json).unwrap();

    assert_eq!(restored.to_xml(), standoff.to_xml());
}

#[test]
fn json_round_trip_keeps_comments() {
    // Given a document with a comment
    let standoff = io::parse_str("<p>a<!--bc-->d</p>").unwrap();

    // When it goes through JSON
    let json = standoff.to_json().unwrap();
    let restored = Standoff::from_json(&standoff.plain(), &json).unwrap();

    // Then the comment comes back as a comment
    assert_eq!(
        json,
        r#"[{"tag":"p","attrib":{},"begin":0,"end":4,"depth":0},{"tag":"","attrib":{},"begin":1,"end":3,"depth":1,"comment":true}]"#
    );
    assert_eq!(restored.to_xml(), "<p>a<!--bc-->d</p>");
    assert_eq!(standoff.to_standoff_xml(), "<p>a<!--bc-->d</p>");
}

#[test]
fn json_without_attrib_defaults_to_empty() {
    let json = r#"[{"tag":"p","begin":0,"end":2,"depth":0},{"tag":"b","begin":1,"end":2,"depth":1}]"#;

    let standoff = Standoff::from_json("xy", json).unwrap();

    assert_eq!(standoff.to_xml(), "<p>x<b>y</b></p>");
}

#[test]
fn overlapping_annotations_are_resolved_by_order() {
    // b overlaps a; a starts first and claims the shared character
    let annotations = vec![
        PositionedAnnotation::new(0, 4, "p", 0),
        PositionedAnnotation::new(0, 3, "a", 1),
        PositionedAnnotation::new(1, 4, "b", 1),
    ];

    let standoff = Standoff::from_annotations("abcd", &annotations).unwrap();

    assert_eq!(standoff.plain(), "abcd");
    assert_eq!(standoff.to_xml(), "<p><a>a</a><b>bcd</b></p>");
    invariants::check(standoff.table());
}

#[test]
fn standoff_xml_matches_tree_markup() {
    let mut standoff = io::parse_str("<p>1 2 3</p>").unwrap();
    standoff
        .add_inline(Inline::new(0, 1, "num").attr("n", "1"))
        .unwrap();
    standoff.add_inline(Inline::point(3, "pc")).unwrap();

    assert_eq!(standoff.to_xml(), r#"<p><num n="1">1</num> 2<pc/> 3</p>"#);
    assert_eq!(standoff.to_standoff_xml(), "<p><num n='1'>1</num> 2<pc/> 3</p>");
}

#[test]
fn lazy_edits_match_eager_ones() {
    init_logging();
    let source = "<p>a<hi>bc</hi>d<lb/>e</p>";
    let edits = || {
        vec![
            Inline::new(0, 5, "s"),
            Inline::new(1, 3, "w"),
            Inline::point(4, "pb"),
            Inline::new(3, 4, "w"),
        ]
    };

    let mut eager = io::parse_str(source).unwrap();
    for inline in edits() {
        eager.add_inline(inline).unwrap();
    }

    let mut lazy = io::parse_str(source).unwrap();
    {
        let mut batch = lazy.batch();
        for inline in edits() {
            batch.add_inline(inline).unwrap();
        }
        batch.commit().unwrap();
    }

    assert_eq!(lazy.to_xml(), eager.to_xml());
    assert_eq!(lazy.annotations(), eager.annotations());
    invariants::check(lazy.table());
}

#[test]
fn version_counts_applied_edits() {
    let mut standoff = io::parse_str("<p>abc</p>").unwrap();

    standoff.add_inline(Inline::new(0, 1, "x")).unwrap();
    standoff.add_inline(Inline::new(0, 1, "x")).unwrap();
    let _ = standoff.add_inline(Inline::new(0, 9, "x"));

    assert_eq!(standoff.version(), 1);
}
