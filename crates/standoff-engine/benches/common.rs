// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_tei(paragraphs: usize) -> String {
    let mut body = String::new();
    for n in 0..paragraphs {
        body.push_str(&format!(
            "<p n=\"{n}\">Lorem <hi rend=\"italic\">ipsum</hi> dolor sit amet,<lb/>\n   consectetur <note>adipiscing</note> elit.</p>\n"
        ));
    }
    format!(
        "<TEI><teiHeader><title>Bench</title></teiHeader><text><body>\n{body}</body></text></TEI>"
    )
}

/// Word boundaries `(begin, end)` in `plain`.
#[allow(dead_code)]
pub fn word_spans(plain: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, ch) in plain.chars().enumerate() {
        match (ch.is_alphanumeric(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                spans.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, plain.chars().count()));
    }
    spans
}
