use simfs::wire::NAME_SLOT_LEN;

use super::common::Fixture;

#[test]
fn readdir_frames_every_entry_in_one_slot() {
    let mut fixture = Fixture::new();
    fixture.create_dir("sandbox");
    fixture.write_file("sandbox/foo", b"foo");
    fixture.write_file("sandbox/bar", b"bar");

    let names = fixture.fs.readdir(&fixture.path("sandbox")).expect("readdir succeeds");

    // One slot per entry: dot, dot-dot and the two files.
    assert_eq!(names.len(), 4);
    for expected in [".", "..", "foo", "bar"] {
        assert!(names.iter().any(|name| name == expected), "missing entry {expected}");
    }
}

#[test]
fn readdir_payload_is_a_multiple_of_the_slot_width() {
    let mut fixture = Fixture::new();
    fixture.create_dir("sandbox");
    for index in 0..10 {
        fixture.write_file(&format!("sandbox/file{index}"), b"x");
    }

    let names = fixture.fs.readdir(&fixture.path("sandbox")).expect("readdir succeeds");
    assert_eq!(names.len(), 12, "ten files plus the dot entries");

    // The framing itself: raw payload size must divide evenly into slots.
    let path = fixture.path("sandbox");
    let reply =
        simfs::guest::call::submit(fixture.fs.port_mut(), simfs::wire::Operation::ReadDir, &path, &[])
            .expect("raw readdir succeeds");
    assert_eq!(reply.payload.len() % NAME_SLOT_LEN, 0);
    assert_eq!(reply.payload.len() / NAME_SLOT_LEN, 12);
}

#[test]
fn empty_directory_still_lists_the_dot_entries() {
    let mut fixture = Fixture::new();
    fixture.create_dir("empty");

    let names = fixture.fs.readdir(&fixture.path("empty")).expect("readdir succeeds");
    assert_eq!(names.len(), 2);
    assert!(names.iter().any(|name| name == "."));
    assert!(names.iter().any(|name| name == ".."));
}

#[test]
fn readdir_of_a_file_reports_not_a_directory() {
    let mut fixture = Fixture::new();
    fixture.write_file("file", b"x");

    let err = fixture.fs.readdir(&fixture.path("file")).unwrap_err();
    assert_eq!(err.0, libc::ENOTDIR);
}

#[test]
fn rmdir_refuses_a_populated_directory() {
    let mut fixture = Fixture::new();
    fixture.create_dir("full");
    fixture.write_file("full/occupant", b"x");

    let err = fixture.fs.rmdir(&fixture.path("full")).unwrap_err();
    assert!(err.0 == libc::ENOTEMPTY || err.0 == libc::EEXIST, "got errno {}", err.0);
}
