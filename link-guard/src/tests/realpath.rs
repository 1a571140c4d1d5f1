use super::fixture::Layout;
use crate::{FileSystem, LinkGuardError};
use pretty_assertions::assert_eq;
use std::io;

/// sandbox/link -> execroot/link2 -> execroot/file, with sandbox/link2 mirroring execroot/link2.
fn mirrored_sandbox() -> Layout {
    let t = Layout::new();
    t.dir("sandbox");
    t.file("execroot/file");
    let link2 = t.link("execroot/link2", "file");
    t.link("sandbox/link", &link2);
    t.link("sandbox/link2", &link2);
    t
}

#[test]
fn escaping_chain_stops_at_the_last_in_root_location() {
    let t = mirrored_sandbox();
    let fs = t.guard(&["sandbox"]);

    assert_eq!(
        fs.canonicalize(&t.path("sandbox/link")).unwrap(),
        t.path("sandbox/link2")
    );
    assert_eq!(
        std::fs::canonicalize(t.path("sandbox/link")).unwrap(),
        t.path("execroot/file")
    );
}

#[test]
fn guarded_realpath_is_idempotent() {
    let t = mirrored_sandbox();
    t.file("sandbox/store/pkg/index.js");
    t.link("sandbox/node_modules/pkg", "../store/pkg");
    t.link("sandbox/lonely", t.path("execroot/file"));
    let fs = t.guard(&["sandbox"]);

    for rel in [
        "sandbox/link",
        "sandbox/link2",
        "sandbox/lonely",
        "sandbox/node_modules/pkg/index.js",
        "execroot/link2",
    ] {
        let once = fs.canonicalize(&t.path(rel)).unwrap();
        let twice = fs.canonicalize(&once).unwrap();
        assert_eq!(once, twice, "realpath of {rel}");
    }
}

#[test]
fn in_root_chain_matches_the_os() {
    let t = Layout::new();
    t.file("sandbox/store/pkg/index.js");
    t.link("sandbox/node_modules/pkg", "../store/pkg");
    t.link("sandbox/entry.js", "node_modules/pkg/index.js");
    let fs = t.guard(&["sandbox"]);

    let entry = t.path("sandbox/entry.js");
    assert_eq!(
        fs.canonicalize(&entry).unwrap(),
        std::fs::canonicalize(&entry).unwrap()
    );
    assert_eq!(
        fs.canonicalize(&entry).unwrap(),
        t.path("sandbox/store/pkg/index.js")
    );
}

#[test]
fn escaping_link_without_a_mirror_resolves_to_itself() {
    let t = Layout::new();
    t.dir("sandbox");
    let outside = t.file("execroot/file");
    let link = t.link("sandbox/link", &outside);
    let fs = t.guard(&["sandbox"]);

    assert_eq!(fs.canonicalize(&link).unwrap(), link);
}

#[test]
fn file_under_an_escaping_directory_link_stays_in_the_sandbox() {
    let t = Layout::new();
    t.dir("sandbox");
    t.file("execroot/pkg/index.js");
    t.link("sandbox/pkg", t.path("execroot/pkg"));
    let fs = t.guard(&["sandbox"]);

    let path = t.path("sandbox/pkg/index.js");
    assert_eq!(fs.canonicalize(&path).unwrap(), path);
}

#[test]
fn missing_path_is_an_os_error() {
    let t = Layout::new();
    t.dir("sandbox");
    let fs = t.guard(&["sandbox"]);

    let err = fs.canonicalize(&t.path("sandbox/nope")).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
    assert!(LinkGuardError::from_io_error(&err).is_none());
}

#[test]
fn hop_into_a_sibling_root_is_followed() {
    let t = Layout::new();
    let file = t.file("sandbox/other/file");
    let link = t.link("sandbox/pkg/link", &file);
    let fs = t.guard(&["sandbox", "sandbox/pkg"]);

    // The real path leaves sandbox/pkg but not sandbox, so only the inner root is judged.
    assert_eq!(fs.canonicalize(&link).unwrap(), link);

    let outer = fs.with_roots(t.roots(&["sandbox"]));
    assert_eq!(outer.canonicalize(&link).unwrap(), file);
}
