//! The project update flow run once per translation unit.
//!
//! If the store already holds a project model, it is loaded, the
//! translation unit's model is merged into it and the result is saved.
//! Otherwise the translation unit's model becomes the project model.

use serde::Serialize;
use tracing::{info, warn};

use acm_core::{MergePolicy, MergeStats, ProjectModel};

use crate::error::StorageError;
use crate::traits::ModelStore;

/// What [`update_project`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    /// No project model existed; the translation unit model was stored.
    pub created: bool,
    /// The stored document changed.
    pub written: bool,
    /// Merge statistics, when an existing project was updated.
    pub stats: Option<MergeStats>,
}

/// Merges `tu` into the project model held by `store` and saves the
/// result, stamping it with `version`.
///
/// `tu` is updated too: its join points carry the project's jpids
/// afterwards.
pub fn update_project(
    store: &mut dyn ModelStore,
    tu: &mut ProjectModel,
    version: &str,
    policy: &mut dyn MergePolicy,
) -> Result<UpdateOutcome, StorageError> {
    if !store.exists() {
        info!(version, "creating project model");
        tu.set_version(version);
        let written = store.save(tu)?;
        return Ok(UpdateOutcome {
            created: true,
            written,
            stats: None,
        });
    }

    info!(version, "updating project model");
    let mut prj = ProjectModel::new();
    store.load(&mut prj)?;
    if prj.version() != version {
        warn!(
            project = prj.version(),
            tool = version,
            "project model was written by a different version"
        );
    }
    let stats = prj.merge_with(tu, policy);
    prj.set_version(version);
    let written = store.save(&mut prj)?;
    Ok(UpdateOutcome {
        created: false,
        written,
        stats: Some(stats),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use acm_core::{DefaultPolicy, Kind, SourceLocKind};

    fn unit(file: &str, time: i32, function: &str) -> ProjectModel {
        let mut m = ProjectModel::new();
        let root = m.new_root().unwrap();
        let tu = m.new_tunit(file, time).unwrap();
        let f = m.new_name(root, Kind::Function, function).unwrap();
        m.assign_jpid(f).unwrap();
        m.new_source(f, tu, SourceLocKind::Def, 1, 1).unwrap();
        m
    }

    #[test]
    fn first_unit_creates_project() {
        let mut store = InMemoryStore::new();
        let outcome =
            update_project(&mut store, &mut unit("a.cc", 1, "f"), "2.0", &mut DefaultPolicy)
                .unwrap();
        assert!(outcome.created);
        assert!(outcome.written);
        assert!(store.document().unwrap().contains(r#"version="2.0""#));
    }

    #[test]
    fn second_unit_is_merged() {
        let mut store = InMemoryStore::new();
        update_project(&mut store, &mut unit("a.cc", 1, "f"), "2.0", &mut DefaultPolicy).unwrap();
        let mut tu = unit("b.cc", 1, "g");
        let outcome = update_project(&mut store, &mut tu, "2.0", &mut DefaultPolicy).unwrap();

        assert!(!outcome.created);
        assert!(outcome.written);
        assert_eq!(outcome.stats.as_ref().map(|s| s.modified_files), Some(0));

        let mut prj = ProjectModel::new();
        store.load(&mut prj).unwrap();
        assert_eq!(prj.select(Kind::Function.mask(), false).len(), 2);
        let g = tu.find(Kind::Function.mask(), "Function|g|-|0|-|").unwrap();
        assert_eq!(tu.data(g).unwrap().jpid(), Some(1));
    }

    #[test]
    fn unchanged_update_does_not_rewrite() {
        let mut store = InMemoryStore::new();
        update_project(&mut store, &mut unit("a.cc", 1, "f"), "2.0", &mut DefaultPolicy).unwrap();
        let outcome =
            update_project(&mut store, &mut unit("a.cc", 1, "f"), "2.0", &mut DefaultPolicy)
                .unwrap();
        assert!(!outcome.written);
        assert_eq!(store.writes(), 1);
    }
}
