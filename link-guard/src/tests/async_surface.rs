//! The async trait runs the same walk as the blocking one.
use super::fixture::Layout;
use crate::{AsyncFileSystem, EntryKind, LinkGuardError, Syscall};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::io;

fn layout() -> Layout {
    let t = Layout::new();
    t.file("sandbox/real.txt");
    t.file("execroot/file");
    let link2 = t.link("execroot/link2", "file");
    t.link("sandbox/alias.txt", "real.txt");
    t.link("sandbox/link", &link2);
    t.link("sandbox/link2", &link2);
    t.link("sandbox/dangling", "missing");
    t
}

#[tokio::test]
async fn lstat_masks_in_root_links_and_keeps_escaping_ones() {
    let t = layout();
    let fs = t.guard(&["sandbox"]);

    let meta = fs.symlink_metadata(&t.path("sandbox/alias.txt")).await.unwrap();
    assert!(meta.is_file());
    let meta = fs.symlink_metadata(&t.path("sandbox/link")).await.unwrap();
    assert!(meta.file_type().is_symlink());

    let err = fs.symlink_metadata(&t.path("sandbox/dangling")).await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
    assert_eq!(
        LinkGuardError::from_io_error(&err).unwrap().syscall(),
        Some(Syscall::Lstat)
    );
}

#[tokio::test]
async fn realpath_and_readlink_agree_with_the_blocking_surface() {
    let t = layout();
    let fs = t.guard(&["sandbox"]);
    let link = t.path("sandbox/link");

    let blocking_real = crate::FileSystem::canonicalize(&fs, &link).unwrap();
    assert_eq!(fs.canonicalize(&link).await.unwrap(), blocking_real);
    assert_eq!(blocking_real, t.path("sandbox/link2"));

    let blocking_target = crate::FileSystem::read_link(&fs, &link).unwrap();
    assert_eq!(fs.read_link(&link).await.unwrap(), blocking_target);
    assert_eq!(blocking_target, t.path("sandbox/file"));
}

#[tokio::test]
async fn listing_and_stream_are_masked() {
    let t = layout();
    let fs = t.guard(&["sandbox"]);

    let eager: BTreeMap<_, _> = fs
        .read_dir(&t.path("sandbox"))
        .await
        .unwrap()
        .into_iter()
        .map(|entry| (entry.file_name().to_os_string(), entry.kind()))
        .collect();
    let streamed: BTreeMap<_, _> = fs
        .open_dir(&t.path("sandbox"))
        .await
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            (entry.file_name().to_os_string(), entry.kind())
        })
        .collect()
        .await;

    assert_eq!(eager, streamed);
    assert_eq!(eager[std::ffi::OsStr::new("alias.txt")], EntryKind::File);
    assert_eq!(eager[std::ffi::OsStr::new("link")], EntryKind::Symlink);
    assert_eq!(eager[std::ffi::OsStr::new("dangling")], EntryKind::Symlink);
}

#[tokio::test(flavor = "multi_thread")]
async fn guarded_fs_is_shareable_across_tasks() {
    let t = layout();
    let fs = std::sync::Arc::new(t.guard(&["sandbox"]));
    let alias = t.path("sandbox/alias.txt");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let fs = fs.clone();
            let alias = alias.clone();
            tokio::spawn(async move { fs.symlink_metadata(&alias).await.map(|m| m.is_file()) })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap());
    }
}
