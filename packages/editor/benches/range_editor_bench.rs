use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::PathBuf;
use trellis_common::RunningActions;
use trellis_editor::{ActionEngine, CompoundEdit, Document, EditSession, NodeAction, RangeEdit};
use trellis_parser::{LineIndex, MarkupParser};

fn large_list(items: usize) -> String {
    let mut source = String::from("<ul>\n");
    for i in 0..items {
        source.push_str(&format!("  <li class=\"item\">Item {}</li>\n", i));
    }
    source.push_str("</ul>\n");
    source
}

fn compound_delete(c: &mut Criterion) {
    let source = large_list(1000);
    let lines = LineIndex::new(&source);
    // Every other <li>, computed against one snapshot
    let ranges: Vec<(usize, usize)> = source
        .match_indices("<li")
        .step_by(2)
        .filter_map(|(start, _)| source[start..].find("</li>").map(|end| (start, start + end + 5)))
        .collect();

    c.bench_function("compound_delete_500_ranges", |b| {
        b.iter(|| {
            let edits = ranges
                .iter()
                .map(|&(s, e)| RangeEdit::delete(lines.range(s, e)))
                .collect();
            let edit = CompoundEdit::new(edits, &source).unwrap();
            black_box(edit.apply_to(&source))
        })
    });
}

fn duplicate_through_session(c: &mut Criterion) {
    let source = large_list(200);

    c.bench_function("session_duplicate_and_reparse", |b| {
        b.iter(|| {
            let doc = Document::from_source(PathBuf::from("bench.html"), source.clone());
            let mut session = EditSession::new(
                doc,
                Box::new(MarkupParser::new("bench.html")),
                ActionEngine::default(),
                RunningActions::new(),
            )
            .unwrap();
            let items: Vec<String> = session
                .tree()
                .nodes()
                .filter(|n| n.name == "li")
                .map(|n| n.uid.clone())
                .collect();
            session.select(&items);
            black_box(session.run(&NodeAction::Duplicate).unwrap())
        })
    });
}

criterion_group!(benches, compound_delete, duplicate_through_session);
criterion_main!(benches);
