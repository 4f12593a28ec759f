//! End-to-end: store → edit sync → every export format

use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use score_capsule::renderers::{mei, midi, pdf};
use score_capsule::store::{CapsuleStore, SEED_ROUND};
use score_capsule::sync::RenderSync;
use score_capsule::{archive, parse};

#[test]
fn seeded_round_exports_to_every_format() {
    let store = CapsuleStore::seeded();
    let id = store.ids().pop().unwrap();
    let capsule = store.get(&id).unwrap();
    let doc = parse::parse(&capsule.parts[0].content).unwrap();

    let smf = midi::to_smf(&doc, capsule.meta.ppq).unwrap();
    assert_eq!(&smf[0..4], b"MThd");

    let pdf_bytes = pdf::export(&doc, &pdf::PdfOptions::default()).unwrap();
    assert!(pdf_bytes.starts_with(b"%PDF"));

    let xml = mei::encode(&capsule.parts[0].content).unwrap();
    assert!(xml.contains("<mei"));

    let zip_bytes = archive::build(&capsule).unwrap();
    assert_eq!(&zip_bytes[0..2], b"PK");

    // Artifacts land on disk the way a download handler would put them
    let dir = tempfile::tempdir().unwrap();
    for (name, bytes) in [
        ("round.mid", &smf),
        ("round.pdf", &pdf_bytes),
        ("round.zip", &zip_bytes),
    ] {
        let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
        file.write_all(bytes).unwrap();
    }
    assert_eq!(std::fs::read(dir.path().join("round.mid")).unwrap(), smf);
}

#[test]
fn edits_flow_through_sync_into_exports() {
    let store = Arc::new(CapsuleStore::seeded());
    let id = store.ids().pop().unwrap();
    let sync = RenderSync::with_quiescence(Arc::clone(&store), Duration::from_millis(25));

    sync.focus(&id, "zocharti-loch-round-v01.abc");
    sync.notify_edit("X:1\nT:Rewritten\nM:4/4\nL:1/4\nK:C\nC E G c |\n");
    thread::sleep(Duration::from_millis(120));

    let preview = sync.preview().unwrap();
    assert_eq!(preview.document.attributes.title.as_deref(), Some("Rewritten"));
    assert_eq!(preview.timeline.events.len(), 4);

    // The persisted capsule exports the edited content, not the seed
    let capsule = store.get(&id).unwrap();
    let xml = mei::encode(&capsule.parts[0].content).unwrap();
    assert!(xml.contains("pname=\"c\""));
    assert!(!capsule.parts[0].content.contains("Zocharti"));
}

#[test]
fn failed_parse_on_one_part_never_blocks_other_exports() {
    let store = Arc::new(CapsuleStore::seeded());
    let id = store.ids().pop().unwrap();

    let exporter = {
        let store = Arc::clone(&store);
        let id = id.clone();
        thread::spawn(move || {
            for _ in 0..20 {
                let capsule = store.get(&id).unwrap();
                // Seed content is never mutated here, so this must succeed
                let doc = parse::parse(&capsule.parts[0].content).unwrap();
                midi::to_smf(&doc, capsule.meta.ppq).unwrap();
            }
        })
    };

    let sync = RenderSync::with_quiescence(Arc::clone(&store), Duration::from_millis(5));
    let mut broken = store.get(&id).unwrap();
    broken.meta.title = "Scratch".to_string();
    broken.id = "scratch".to_string();
    store.insert(broken).unwrap();

    sync.focus("scratch", "zocharti-loch-round-v01.abc");
    for _ in 0..10 {
        sync.notify_edit("X:1\nK:C\nC D ?? |\n");
        thread::sleep(Duration::from_millis(10));
    }

    exporter.join().unwrap();
    assert!(sync.last_error().is_some());
    // The good capsule still parses
    assert!(parse::parse(&store.get(&id).unwrap().parts[0].content).is_ok());
}

#[test]
fn seed_round_is_a_strict_canon() {
    // Each voice enters one measure after the next, carrying the theme
    let doc = parse::parse(SEED_ROUND).unwrap();
    let theme: Vec<_> = doc.voices[2].measures[0]
        .events
        .iter()
        .map(|e| e.kind)
        .collect();
    let delayed: Vec<_> = doc.voices[1].measures[1]
        .events
        .iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(theme, delayed);
}
