use super::*;
use pretty_assertions::assert_eq;

#[test]
fn entry_kind_follows_the_file_type() {
    let td = tempfile::tempdir().unwrap();
    let file = td.path().join("file");
    std::fs::write(&file, "x").unwrap();

    let kind: EntryKind = std::fs::symlink_metadata(&file).unwrap().file_type().into();
    assert_eq!(kind, EntryKind::File);
    let kind: EntryKind = std::fs::symlink_metadata(td.path()).unwrap().file_type().into();
    assert_eq!(kind, EntryKind::Dir);
}

#[test]
fn dir_entry_joins_name_onto_directory() {
    let entry = DirEntry::new(Path::new("/sandbox/pkg"), "index.js", EntryKind::File);
    assert_eq!(entry.path(), Path::new("/sandbox/pkg/index.js"));
    assert_eq!(entry.file_name(), OsStr::new("index.js"));
    assert!(entry.is_file());
    assert!(!entry.is_dir());
    assert!(!entry.is_symlink());
}

#[test]
fn mask_as_takes_the_target_type() {
    let td = tempfile::tempdir().unwrap();
    let mut entry = DirEntry::new(td.path(), "link", EntryKind::Symlink);
    entry.mask_as(&std::fs::metadata(td.path()).unwrap());
    assert_eq!(entry.kind(), EntryKind::Dir);
    assert_eq!(entry.path(), td.path().join("link"));
}

#[test]
fn read_dir_ends_cleanly_after_last_entry() {
    let mut dir = ReadDir::new(
        vec![Ok(DirEntry::new(Path::new("/d"), "a", EntryKind::File))].into_iter(),
    );
    assert_eq!(dir.read().unwrap().unwrap().file_name(), OsStr::new("a"));
    assert!(dir.read().unwrap().is_none());
    assert!(dir.next().is_none());
}

#[test]
fn read_dir_surfaces_entry_errors() {
    let mut dir = ReadDir::new(
        vec![Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))].into_iter(),
    );
    assert_eq!(dir.read().unwrap_err().kind(), io::ErrorKind::PermissionDenied);
}

#[cfg(unix)]
mod host {
    use super::super::{DirEntry, EntryKind, FileSystem, HostFs};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::ffi::OsString;

    fn listing(
        entries: impl IntoIterator<Item = std::io::Result<DirEntry>>,
    ) -> BTreeMap<OsString, EntryKind> {
        entries
            .into_iter()
            .map(|entry| {
                let entry = entry.unwrap();
                (entry.file_name().to_os_string(), entry.kind())
            })
            .collect()
    }

    #[test]
    fn read_dir_and_open_dir_agree_and_do_not_follow_links() {
        let td = tempfile::tempdir().unwrap();
        std::fs::write(td.path().join("file"), "x").unwrap();
        std::fs::create_dir(td.path().join("dir")).unwrap();
        std::os::unix::fs::symlink("file", td.path().join("link")).unwrap();

        let eager = listing(HostFs.read_dir(td.path()).unwrap().into_iter().map(Ok));
        let lazy = listing(HostFs.open_dir(td.path()).unwrap());
        assert_eq!(eager, lazy);
        assert_eq!(eager.get(&OsString::from("file")), Some(&EntryKind::File));
        assert_eq!(eager.get(&OsString::from("dir")), Some(&EntryKind::Dir));
        assert_eq!(eager.get(&OsString::from("link")), Some(&EntryKind::Symlink));
    }

    #[test]
    fn entry_paths_are_under_the_listed_directory() {
        let td = tempfile::tempdir().unwrap();
        std::fs::write(td.path().join("file"), "x").unwrap();
        let entries = HostFs.read_dir(td.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path(), td.path().join("file"));
    }

    #[tokio::test]
    async fn async_listing_matches_blocking_listing() {
        use super::super::AsyncFileSystem;
        use futures::StreamExt;

        let td = tempfile::tempdir().unwrap();
        std::fs::write(td.path().join("file"), "x").unwrap();
        std::os::unix::fs::symlink("file", td.path().join("link")).unwrap();

        let blocking = FileSystem::read_dir(&HostFs, td.path()).unwrap();
        let eager = AsyncFileSystem::read_dir(&HostFs, td.path()).await.unwrap();
        let streamed: Vec<_> = AsyncFileSystem::open_dir(&HostFs, td.path())
            .await
            .unwrap()
            .collect()
            .await;
        let blocking = listing(blocking.into_iter().map(Ok));
        assert_eq!(blocking, listing(eager.into_iter().map(Ok)));
        assert_eq!(blocking, listing(streamed));
    }
}
