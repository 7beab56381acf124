use super::common::Fixture;

#[test]
fn mkdir_applies_every_mode_exactly() {
    let mut fixture = Fixture::new();
    let path = fixture.path("sandbox");

    // The executor clears the umask around each operation, so the low nine
    // bits must come back exactly as requested, for every value.
    for mode in 0..=0o777u32 {
        fixture.fs.mkdir(&path, mode).expect("mkdir succeeds");
        let st = fixture.fs.getattr(&path).expect("getattr succeeds");
        assert_eq!(st.st_mode & 0o777, mode, "mode {mode:o} did not survive");
        fixture.fs.rmdir(&path).expect("rmdir succeeds");
    }

    assert!(fixture.fs.getattr(&path).is_err(), "directory must be gone");
}

#[test]
fn getattr_does_not_follow_symlinks() {
    let mut fixture = Fixture::new();
    fixture.write_file("target", b"0123456789");
    std::os::unix::fs::symlink("target", fixture.tempdir.path().join("link"))
        .expect("create symlink");

    let st = fixture.fs.getattr(&fixture.path("link")).expect("getattr on link");
    assert_eq!(st.st_mode & libc::S_IFMT, libc::S_IFLNK, "lstat must report the link itself");
    assert_ne!(st.st_size, 10, "size of the link, not the target");
}

#[test]
fn chmod_changes_permissions() {
    let mut fixture = Fixture::new();
    fixture.write_file("file", b"x");
    let path = fixture.path("file");

    fixture.fs.chmod(&path, 0o604).expect("chmod succeeds");
    let st = fixture.fs.getattr(&path).expect("getattr succeeds");
    assert_eq!(st.st_mode & 0o777, 0o604);
}

#[test]
fn chown_to_current_owner_is_accepted() {
    let mut fixture = Fixture::new();
    fixture.write_file("file", b"x");
    let path = fixture.path("file");

    let st = fixture.fs.getattr(&path).expect("getattr succeeds");
    fixture.fs.chown(&path, st.st_uid, st.st_gid).expect("chown to self succeeds");
}

#[test]
fn truncate_sets_the_reported_size() {
    let mut fixture = Fixture::new();
    fixture.write_file("file", b"0123456789");
    let path = fixture.path("file");

    fixture.fs.truncate(&path, 4).expect("truncate succeeds");
    let st = fixture.fs.getattr(&path).expect("getattr succeeds");
    assert_eq!(st.st_size, 4);
}

#[test]
fn access_agrees_with_mode_bits() {
    let mut fixture = Fixture::new();
    fixture.write_file("file", b"x");
    let path = fixture.path("file");

    fixture.fs.access(&path, libc::F_OK).expect("existence check");
    fixture.fs.access(&path, libc::R_OK).expect("readable");
}

#[test]
fn missing_path_propagates_enoent() {
    let mut fixture = Fixture::new();

    let err = fixture.fs.getattr(&fixture.path("nonexistent")).unwrap_err();
    assert_eq!(err.0, libc::ENOENT);
    // An error reply buffers nothing, so there is nothing left to fetch.
    assert_eq!(fixture.host().pending_replies(), 0);
}

#[test]
fn statfs_reports_a_live_filesystem() {
    let mut fixture = Fixture::new();

    let st = fixture.fs.statfs(&fixture.root()).expect("statfs succeeds");
    assert!(st.f_bsize > 0);
    assert!(st.f_blocks > 0);
}
