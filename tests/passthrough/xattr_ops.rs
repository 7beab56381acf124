use super::common::Fixture;

/// Backing filesystems without user xattr support surface as setxattr
/// failures; those environments skip the group rather than fail it.
fn xattr_supported(fixture: &mut Fixture, path: &str) -> bool {
    match fixture.fs.setxattr(path, "user.simfs.probe", b"1", 0) {
        Ok(()) => {
            fixture.fs.removexattr(path, "user.simfs.probe").expect("cleanup probe attr");
            true
        }
        Err(err) if err.0 == libc::ENOTSUP || err.0 == libc::EOPNOTSUPP => false,
        Err(err) => panic!("unexpected setxattr errno {}", err.0),
    }
}

#[test]
fn set_get_list_remove_round_trip() {
    let mut fixture = Fixture::new();
    fixture.write_file("file", b"x");
    let path = fixture.path("file");
    if !xattr_supported(&mut fixture, &path) {
        return;
    }

    fixture.fs.setxattr(&path, "user.simfs.color", b"teal", 0).expect("setxattr succeeds");

    let len = fixture.fs.getxattr_len(&path, "user.simfs.color").expect("size probe");
    assert_eq!(len, 4);
    let value = fixture.fs.getxattr(&path, "user.simfs.color", 64).expect("getxattr succeeds");
    assert_eq!(value, b"teal");

    let list_len = fixture.fs.listxattr_len(&path).expect("list size probe");
    assert!(list_len >= "user.simfs.color".len() + 1);
    let list = fixture.fs.listxattr(&path, 256).expect("listxattr succeeds");
    let names: Vec<&[u8]> = list.split(|&b| b == 0).filter(|s| !s.is_empty()).collect();
    assert!(names.contains(&b"user.simfs.color".as_ref()));

    fixture.fs.removexattr(&path, "user.simfs.color").expect("removexattr succeeds");
    let err = fixture.fs.getxattr(&path, "user.simfs.color", 64).unwrap_err();
    assert_eq!(err.0, libc::ENODATA);
}

#[test]
fn direct_copy_never_parks_a_reply() {
    let mut fixture = Fixture::new();
    fixture.write_file("file", b"x");
    let path = fixture.path("file");
    if !xattr_supported(&mut fixture, &path) {
        return;
    }

    fixture.fs.setxattr(&path, "user.simfs.direct", b"value", 0).expect("setxattr succeeds");
    let value = fixture.fs.getxattr(&path, "user.simfs.direct", 32).expect("getxattr succeeds");
    assert_eq!(value, b"value");

    // The value travelled outside the two-stage path.
    assert_eq!(fixture.host().pending_replies(), 0);
}

#[test]
fn missing_attribute_reports_enodata() {
    let mut fixture = Fixture::new();
    fixture.write_file("file", b"x");
    let path = fixture.path("file");
    if !xattr_supported(&mut fixture, &path) {
        return;
    }

    let err = fixture.fs.getxattr(&path, "user.simfs.absent", 16).unwrap_err();
    assert_eq!(err.0, libc::ENODATA);
}
