use std::sync::Arc;

use proptest::prelude::*;
use tasmovie_core::{
    ControllerFrame, FrameLayout, FrameVector, FrameView, FrameViewMut, PortKind,
    PortTypeRegistry,
};
use tasmovie_support::{Error, MovieDocument, read_track, write_track};

const TRACK: &str = "\
# recorded on a test rig
port0 gamepad
port1 multitap
projectid 0123456789abcdef0123456789abcdef01234567
rerecords 42

F.|B.......A...|............|............|............|............
..|.Y..........|............|............|............|............
FR 1 250|...S........|B...........|............|............|.Y..........
F.|............|............|............|............|...........R
";

fn registry() -> PortTypeRegistry {
    PortTypeRegistry::with_standard_types()
}

fn write_to_string(doc: &MovieDocument) -> String {
    let mut out = Vec::new();
    write_track(doc, &mut out).expect("write");
    String::from_utf8(out).expect("utf-8")
}

#[test]
fn reads_headers_and_frames() {
    let doc = read_track(&registry(), TRACK.as_bytes()).expect("track");
    assert_eq!(doc.ports(), [PortKind::GAMEPAD, PortKind::MULTITAP]);
    assert_eq!(doc.project_id, "0123456789abcdef0123456789abcdef01234567");
    assert_eq!(doc.rerecords, "42");
    assert_eq!(doc.frames.len(), 4);
    assert_eq!(doc.frames.count_frames(), 3);

    let reset = doc.frames.get(2).expect("frame 2");
    assert!(reset.reset());
    assert_eq!(reset.delay(), (1, 250));
    assert_eq!(reset.axis(1, 0, 0).expect("tap 0 B"), 1);
    assert_eq!(reset.axis(1, 3, 1).expect("tap 3 Y"), 1);
}

#[test]
fn written_track_reads_back() {
    let doc = read_track(&registry(), TRACK.as_bytes()).expect("track");
    let text = write_to_string(&doc);
    assert!(text.starts_with("port0 gamepad\nport1 multitap\nprojectid "));
    let again = read_track(&registry(), text.as_bytes()).expect("reread");
    assert_eq!(again.ports(), doc.ports());
    assert_eq!(again.project_id, doc.project_id);
    assert_eq!(again.rerecords, doc.rerecords);
    assert_eq!(again.frames, doc.frames);
    assert_eq!(write_to_string(&again), text);
}

#[test]
fn crlf_line_ends_are_accepted() {
    let text = TRACK.replace('\n', "\r\n");
    let doc = read_track(&registry(), text.as_bytes()).expect("track");
    assert_eq!(doc.frames.len(), 4);
}

#[test]
fn malformed_frame_reports_line() {
    let text = "port1 none\nF.|B...........\nF. 1x|B...........\n";
    match read_track(&registry(), text.as_bytes()) {
        Err(Error::InvalidTrack { line, .. }) => assert_eq!(line, 3),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn track_must_start_with_sync_frame() {
    let text = "..|B...........\n";
    assert!(matches!(
        read_track(&registry(), text.as_bytes()),
        Err(Error::InvalidTrack { line: 1, .. })
    ));
}

#[test]
fn document_loads_into_movie() {
    let doc = read_track(&registry(), TRACK.as_bytes()).expect("track");
    let mut movie = doc.into_movie().expect("movie");
    assert!(movie.readonly());
    assert_eq!(movie.rerecord_count(), "42");
    assert_eq!(movie.frame_count(), 3);

    movie.next_frame().expect("frame 1");
    assert_eq!(movie.next_input_at(0, 0, 1).expect("Y first poll"), 0);
    assert_eq!(movie.next_input_at(0, 0, 1).expect("Y second poll"), 1);
    movie.next_frame().expect("frame 2");
    assert_eq!(movie.get_reset_status(), 10_250);

    let back = MovieDocument::from_movie(&movie);
    assert_eq!(back.ports(), [PortKind::GAMEPAD, PortKind::MULTITAP]);
    assert_eq!(back.frames.len(), 4);
}

#[test]
fn empty_track_uses_header_ports() {
    let doc = read_track(&registry(), "port0 mouse\nport1 superscope\n".as_bytes()).expect("track");
    assert!(doc.frames.is_empty());
    assert_eq!(doc.layout().kinds(), [PortKind::MOUSE, PortKind::SUPERSCOPE]);
    let movie = doc.into_movie().expect("movie");
    assert_eq!(movie.frame_count(), 0);
}

fn gamepad_track(masks: &[(bool, u16)]) -> MovieDocument {
    let registry = registry();
    let layout = Arc::new(
        FrameLayout::new(&registry, [PortKind::GAMEPAD, PortKind::GAMEPAD]).expect("layout"),
    );
    let mut frames = FrameVector::new(Arc::clone(&layout));
    for (index, &(sync, mask)) in masks.iter().enumerate() {
        let mut frame = ControllerFrame::new(Arc::clone(&layout));
        frame.set_sync(sync || index == 0);
        for control in 0..12 {
            let pressed = i16::from(mask & (1 << control) != 0);
            let port = usize::from(mask & 0x8000 != 0);
            frame.set_axis(port, 0, control, pressed).expect("button");
        }
        frames.append(&frame).expect("append");
    }
    let mut doc = MovieDocument::new(&registry, [PortKind::GAMEPAD, PortKind::GAMEPAD])
        .expect("document");
    doc.frames = frames;
    doc
}

proptest! {
    #[test]
    fn gamepad_tracks_roundtrip(masks in prop::collection::vec((any::<bool>(), any::<u16>()), 0..64)) {
        let doc = gamepad_track(&masks);
        let text = write_to_string(&doc);
        let again = read_track(&registry(), text.as_bytes()).expect("reread");
        prop_assert_eq!(&again.frames, &doc.frames);
        prop_assert_eq!(again.frames.count_frames(), doc.frames.count_frames());
    }
}
