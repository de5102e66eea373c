//! Scripted three-way and two-way merges through `Session::dispatch`.

use client_engine::protocol::{ArgMap, FunctionCall};
use client_engine::{EngineConfig, Session};
use test_support::{RecordingSink, Workspace, call};

const ALL: i64 = 0x0F;
const BASE: i64 = 0x01;
const THEIRS: i64 = 0x02 | 0x08;
const YOURS: i64 = 0x04 | 0x08;
const CONFLICT: i64 = 0x10;

fn session_in(ws: &Workspace) -> Session {
    Session::new(EngineConfig {
        client_root: Some(ws.root().to_path_buf()),
        ..EngineConfig::default()
    })
}

fn dispatch(session: &mut Session, sink: &mut RecordingSink, call: &FunctionCall) {
    let step = session.dispatch(call, sink).expect("dispatch");
    step.deliver(sink).expect("deliver");
}

fn chunk(bits: i64, data: &str) -> FunctionCall {
    FunctionCall::new(
        "writeMerge",
        ArgMap::new()
            .with("handle", "m")
            .with("bits", bits)
            .with("data", data.as_bytes()),
    )
}

fn open3(extra: &[(&str, &str)]) -> FunctionCall {
    let mut pairs = vec![
        ("handle", "m"),
        ("path", "file.txt"),
        ("type", "0"),
        ("baseName", "//depot/file.txt#3"),
        ("theirName", "//depot/file.txt#4"),
        ("yourName", "//ws/file.txt"),
    ];
    pairs.extend_from_slice(extra);
    call("openMerge3", &pairs)
}

fn close(auto: &str) -> FunctionCall {
    call(
        "closeMerge",
        &[
            ("handle", "m"),
            ("mergeAuto", auto),
            ("mergeConfirm", "dm-MergeOk"),
            ("mergeDecline", "dm-MergeNo"),
            ("mergePerms", "rw"),
        ],
    )
}

const YOURS_FILE: &str = "common\nold line\nmid\nyours line\nend\n";

fn send_clean_script(session: &mut Session, sink: &mut RecordingSink) {
    for (bits, data) in [
        (ALL, "common\n"),
        (BASE, "old line\n"),
        (THEIRS, "their line\n"),
        (ALL, "mid\n"),
        (BASE, "b-old\n"),
        (YOURS, "yours line\n"),
        (ALL, "end\n"),
    ] {
        dispatch(session, sink, &chunk(bits, data));
    }
}

#[test]
fn non_conflicting_changes_merge_automatically() {
    let ws = Workspace::new();
    ws.write("file.txt", YOURS_FILE);
    let mut session = session_in(&ws);
    let mut sink = RecordingSink::new();

    dispatch(&mut session, &mut sink, &open3(&[]));
    send_clean_script(&mut session, &mut sink);
    dispatch(&mut session, &mut sink, &close("auto"));

    assert_eq!(ws.read("file.txt"), b"common\ntheir line\nmid\nyours line\nend\n");
    let reply = sink.sent_to("dm-MergeOk").next().expect("confirm");
    assert_eq!(reply.args.str("mergeHow"), Some("merged"));
    assert_eq!(reply.args.str("yours"), Some("1"));
    assert_eq!(reply.args.str("theirs"), Some("1"));
    assert_eq!(reply.args.str("conflict"), Some("0"));
    let merged = client_engine::checksums::DigestAccumulator::digest_of(
        b"common\ntheir line\nmid\nyours line\nend\n",
    );
    assert_eq!(reply.args.str("digest"), Some(merged.to_hex().as_str()));
    assert_eq!(ws.entries(""), ["file.txt"]);
}

#[test]
fn safe_mode_skips_changes_on_both_sides() {
    let ws = Workspace::new();
    ws.write("file.txt", YOURS_FILE);
    let mut session = session_in(&ws);
    let mut sink = RecordingSink::new();

    dispatch(&mut session, &mut sink, &open3(&[]));
    send_clean_script(&mut session, &mut sink);
    dispatch(&mut session, &mut sink, &close("safe"));

    assert_eq!(sink.names(), ["dm-MergeNo"]);
    assert_eq!(ws.read("file.txt"), YOURS_FILE.as_bytes());
    assert_eq!(ws.entries(""), ["file.txt"]);
}

#[test]
fn show_all_writes_every_marker() {
    let ws = Workspace::new();
    ws.write("file.txt", YOURS_FILE);
    let mut session = session_in(&ws);
    let mut sink = RecordingSink::new();

    dispatch(&mut session, &mut sink, &open3(&[("showAll", "")]));
    send_clean_script(&mut session, &mut sink);
    dispatch(&mut session, &mut sink, &close("auto"));

    let expected = "common\n\
        >>>> ORIGINAL //depot/file.txt#3\n\
        ==== THEIRS //depot/file.txt#4\n\
        their line\n\
        <<<<\n\
        mid\n\
        >>>> ORIGINAL //depot/file.txt#3\n\
        ==== YOURS //ws/file.txt\n\
        yours line\n\
        <<<<\n\
        end\n";
    assert_eq!(String::from_utf8(ws.read("file.txt")).expect("utf8"), expected);
    let reply = sink.sent_to("dm-MergeOk").next().expect("confirm");
    assert_eq!(reply.args.str("mergeHow"), Some("merged"));
}

#[test]
fn forced_conflict_leaves_markers_for_editing() {
    let ws = Workspace::new();
    ws.write("file.txt", "a\nyours\nz\n");
    let mut session = session_in(&ws);
    let mut sink = RecordingSink::new();

    dispatch(&mut session, &mut sink, &open3(&[]));
    for (bits, data) in [
        (ALL, "a\n"),
        (BASE | CONFLICT, "base\n"),
        (THEIRS | CONFLICT, "theirs\n"),
        (YOURS | CONFLICT, "yours\n"),
        (ALL, "z\n"),
    ] {
        dispatch(&mut session, &mut sink, &chunk(bits, data));
    }
    dispatch(&mut session, &mut sink, &close("force"));

    let expected = "a\n\
        >>>> ORIGINAL //depot/file.txt#3\n\
        base\n\
        ==== THEIRS //depot/file.txt#4\n\
        theirs\n\
        ==== YOURS //ws/file.txt\n\
        yours\n\
        <<<<\n\
        z\n";
    assert_eq!(String::from_utf8(ws.read("file.txt")).expect("utf8"), expected);
    let reply = sink.sent_to("dm-MergeOk").next().expect("confirm");
    assert_eq!(reply.args.str("mergeHow"), Some("edit"));
    assert_eq!(reply.args.str("conflict"), Some("1"));
    assert!(!reply.args.contains("digest"));
    assert!(client_engine::metadata::is_user_writable(&ws.path("file.txt")));
}

#[test]
fn two_way_merge_takes_theirs_for_untouched_file() {
    let ws = Workspace::new();
    ws.write("file.txt", "base\n");
    let base = client_engine::checksums::DigestAccumulator::digest_of(b"base\n").to_hex();
    let mut session = session_in(&ws);
    let mut sink = RecordingSink::new();

    dispatch(
        &mut session,
        &mut sink,
        &call(
            "openMerge2",
            &[("handle", "m"), ("path", "file.txt"), ("type", "0"), ("digest", base.as_str())],
        ),
    );
    dispatch(&mut session, &mut sink, &chunk(THEIRS, "new\n"));
    dispatch(&mut session, &mut sink, &close("safe"));

    assert_eq!(ws.read("file.txt"), b"new\n");
    let reply = sink.sent_to("dm-MergeOk").next().expect("confirm");
    assert_eq!(reply.args.str("mergeHow"), Some("theirs"));
    assert_eq!(reply.args.str("force"), Some("no"));
}
