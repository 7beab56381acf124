use super::common::Fixture;

#[test]
fn write_then_read_back_through_the_protocol() {
    let mut fixture = Fixture::new();
    fixture.write_file("data", b"");
    let path = fixture.path("data");

    let fd = fixture.fs.open(&path, libc::O_RDWR).expect("open succeeds");

    let written = fixture.fs.write(&path, fd, b"foo", 0).expect("first write");
    assert_eq!(written, 3);
    // Writes are positioned; appending is the driver's bookkeeping, so the
    // second chunk lands at an explicit offset.
    let written = fixture.fs.write(&path, fd, b"bar", 3).expect("second write");
    assert_eq!(written, 3);

    let data = fixture.fs.read(&path, fd, 1024, 0).expect("read back");
    assert_eq!(data, b"foobar", "short read returns exactly the file contents");

    fixture.fs.release(fd).expect("release succeeds");
}

#[test]
fn read_at_the_end_of_file_is_empty() {
    let mut fixture = Fixture::new();
    fixture.write_file("data", b"abc");
    let path = fixture.path("data");

    let fd = fixture.fs.open(&path, libc::O_RDONLY).expect("open succeeds");
    let data = fixture.fs.read(&path, fd, 16, 3).expect("read at eof");
    assert!(data.is_empty());
    fixture.fs.release(fd).expect("release succeeds");
}

#[test]
fn open_with_trunc_empties_the_file() {
    let mut fixture = Fixture::new();
    fixture.write_file("data", b"foobar");
    let path = fixture.path("data");

    let fd = fixture.fs.open(&path, libc::O_TRUNC | libc::O_WRONLY).expect("open succeeds");
    fixture.fs.release(fd).expect("release succeeds");

    let st = fixture.fs.getattr(&path).expect("getattr succeeds");
    assert_eq!(st.st_size, 0);
}

#[test]
fn create_returns_a_usable_descriptor() {
    let mut fixture = Fixture::new();
    let path = fixture.path("fresh");

    let fd = fixture.fs.create(&path, 0o644).expect("create succeeds");
    let st = fixture.fs.fgetattr(fd).expect("fgetattr succeeds");
    assert_eq!(st.st_size, 0);
    assert_eq!(st.st_mode & 0o777, 0o644);

    // creat() opens write-only; writing must work through the returned fd.
    let written = fixture.fs.write(&path, fd, b"hello", 0).expect("write succeeds");
    assert_eq!(written, 5);

    fixture.fs.ftruncate(fd, 2).expect("ftruncate succeeds");
    fixture.fs.fsync(fd, false).expect("fsync succeeds");
    fixture.fs.release(fd).expect("release succeeds");

    let st = fixture.fs.getattr(&path).expect("getattr succeeds");
    assert_eq!(st.st_size, 2);
}

#[test]
fn fsync_with_datasync_flag_succeeds() {
    let mut fixture = Fixture::new();
    fixture.write_file("data", b"x");
    let path = fixture.path("data");

    let fd = fixture.fs.open(&path, libc::O_RDWR).expect("open succeeds");
    fixture.fs.fsync(fd, true).expect("fdatasync succeeds");
    fixture.fs.release(fd).expect("release succeeds");
}

#[test]
fn release_of_a_bad_descriptor_reports_ebadf() {
    let mut fixture = Fixture::new();

    let err = fixture.fs.release(-1).unwrap_err();
    assert_eq!(err.0, libc::EBADF);
}

#[test]
fn flush_completes_without_a_hypercall() {
    let mut fixture = Fixture::new();
    fixture.fs.flush(123).expect("flush is local");
    assert_eq!(fixture.host().pending_replies(), 0);
}
