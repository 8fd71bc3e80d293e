//! Classification of native notifications into [`ChangeKind`]s.
//!
//! | notify kind                        | result                              |
//! |------------------------------------|-------------------------------------|
//! | `Create(Folder)`, `Remove(Folder)` | skipped                             |
//! | `Create(_)`                        | `Created`                           |
//! | `Remove(_)`                        | `Deleted`                           |
//! | `Modify(Name(From))`               | `Deleted`                           |
//! | `Modify(Name(To))`                 | `Created`                           |
//! | `Modify(Name(Both))`               | skipped, `From` and `To` also fire  |
//! | `Modify(Name(Any \| Other))`       | `Created` if the path exists, else `Deleted` |
//! | `Modify(_)`                        | `Modified`                          |
//! | `Access(_)`, `Any`, `Other`        | skipped                             |
//!
//! Rename notifications are split into a deletion of the old path and a
//! creation of the new one, so viewers only ever deal with three kinds.

use std::path::{Path, PathBuf};

use fc_core::ChangeKind;
use notify::EventKind;
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use smallvec::SmallVec;

/// Changes extracted from one notification, in path order.
pub type Classified<'a> = SmallVec<[(ChangeKind, &'a Path); 2]>;

/// Classifies a notification, checking the filesystem for ambiguous renames.
#[must_use]
pub fn classify(event: &notify::Event) -> Classified<'_> {
    classify_with(event, Path::exists)
}

/// Classifies a notification, using `exists` to resolve renames whose
/// direction the backend did not report.
pub fn classify_with<E>(event: &notify::Event, exists: E) -> Classified<'_>
where
    E: Fn(&Path) -> bool,
{
    let paths = event.paths.as_slice();

    match event.kind {
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => {
            Classified::new()
        }
        EventKind::Create(_) => all_as(paths, ChangeKind::Created),
        EventKind::Remove(_) => all_as(paths, ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => all_as(paths, ChangeKind::Deleted),
            RenameMode::To => all_as(paths, ChangeKind::Created),
            RenameMode::Both => Classified::new(),
            RenameMode::Any | RenameMode::Other => paths
                .iter()
                .map(|p| {
                    let kind = if exists(p) {
                        ChangeKind::Created
                    } else {
                        ChangeKind::Deleted
                    };
                    (kind, p.as_path())
                })
                .collect(),
        },
        EventKind::Modify(_) => all_as(paths, ChangeKind::Modified),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Classified::new(),
    }
}

fn all_as(paths: &[PathBuf], kind: ChangeKind) -> Classified<'_> {
    paths.iter().map(|p| (kind, p.as_path())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, AccessMode, DataChange, MetadataKind};

    fn event(kind: EventKind, paths: &[&str]) -> notify::Event {
        paths
            .iter()
            .fold(notify::Event::new(kind), |ev, p| ev.add_path(PathBuf::from(p)))
    }

    fn kinds(event: &notify::Event, exists: bool) -> Vec<(ChangeKind, String)> {
        classify_with(event, |_| exists)
            .into_iter()
            .map(|(kind, path)| (kind, path.display().to_string()))
            .collect()
    }

    #[test]
    fn test_create_and_remove() {
        let created = event(EventKind::Create(CreateKind::File), &["/w/a.txt"]);
        let removed = event(EventKind::Remove(RemoveKind::Any), &["/w/a.txt"]);

        assert_eq!(kinds(&created, true), vec![(ChangeKind::Created, "/w/a.txt".into())]);
        assert_eq!(kinds(&removed, false), vec![(ChangeKind::Deleted, "/w/a.txt".into())]);
    }

    #[test]
    fn test_folders_are_skipped() {
        let created = event(EventKind::Create(CreateKind::Folder), &["/w/sub"]);
        let removed = event(EventKind::Remove(RemoveKind::Folder), &["/w/sub"]);

        assert!(kinds(&created, true).is_empty());
        assert!(kinds(&removed, false).is_empty());
    }

    #[test]
    fn test_content_and_metadata_changes_are_modifications() {
        let data = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/w/a.txt"],
        );
        let meta = event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)),
            &["/w/a.txt"],
        );

        assert_eq!(kinds(&data, true), vec![(ChangeKind::Modified, "/w/a.txt".into())]);
        assert_eq!(kinds(&meta, true), vec![(ChangeKind::Modified, "/w/a.txt".into())]);
    }

    #[test]
    fn test_renames() {
        let from = event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &["/w/old"]);
        let to = event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/w/new"]);
        let both = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/w/old", "/w/new"],
        );

        assert_eq!(kinds(&from, false), vec![(ChangeKind::Deleted, "/w/old".into())]);
        assert_eq!(kinds(&to, true), vec![(ChangeKind::Created, "/w/new".into())]);
        assert!(kinds(&both, true).is_empty());
    }

    #[test]
    fn test_ambiguous_rename_checks_existence() {
        let rename = event(EventKind::Modify(ModifyKind::Name(RenameMode::Any)), &["/w/f"]);

        assert_eq!(kinds(&rename, true), vec![(ChangeKind::Created, "/w/f".into())]);
        assert_eq!(kinds(&rename, false), vec![(ChangeKind::Deleted, "/w/f".into())]);
    }

    #[test]
    fn test_access_and_unknown_are_skipped() {
        let access = event(
            EventKind::Access(AccessKind::Close(AccessMode::Write)),
            &["/w/a.txt"],
        );
        let any = event(EventKind::Any, &["/w/a.txt"]);
        let other = event(EventKind::Other, &["/w/a.txt"]);

        assert!(kinds(&access, true).is_empty());
        assert!(kinds(&any, true).is_empty());
        assert!(kinds(&other, true).is_empty());
    }

    #[test]
    fn test_multiple_paths_keep_order() {
        let created = event(EventKind::Create(CreateKind::Any), &["/w/1", "/w/2", "/w/3"]);
        let paths: Vec<String> = kinds(&created, true).into_iter().map(|(_, p)| p).collect();

        assert_eq!(paths, vec!["/w/1", "/w/2", "/w/3"]);
    }
}
