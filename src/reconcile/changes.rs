use std::collections::BTreeSet;

use crate::model::Commit;

/// Distinct experiment file paths touched by a commit batch.
///
/// Sets are ordered so the path used to name the experiment does not depend
/// on delivery order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: BTreeSet<String>,
    pub modified: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl ChangeSet {
    /// Collect the paths under `prefix` from every commit in the batch.
    pub fn collect(commits: &[Commit], prefix: &str) -> Self {
        let mut set = ChangeSet::default();
        let keep = |p: &&String| p.starts_with(prefix);
        for c in commits {
            set.added.extend(c.added.iter().filter(keep).cloned());
            set.modified.extend(c.modified.iter().filter(keep).cloned());
            set.removed.extend(c.removed.iter().filter(keep).cloned());
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// Experiment named by the first usable path, looking at added, then
    /// modified, then removed.
    ///
    /// Paths that name no experiment (the bare prefix) are passed over.
    pub fn first_experiment_name<'a>(&'a self, prefix: &str) -> Option<&'a str> {
        [&self.added, &self.modified, &self.removed]
            .into_iter()
            .flatten()
            .find_map(|p| experiment_name(p, prefix))
    }

    /// Every experiment name the batch touches.
    pub fn experiment_names<'a>(&'a self, prefix: &str) -> BTreeSet<&'a str> {
        self.added
            .iter()
            .chain(&self.modified)
            .chain(&self.removed)
            .filter_map(|p| experiment_name(p, prefix))
            .collect()
    }
}

/// First path segment after `prefix`, e.g. `foo` for `js/experiments/foo/a.js`.
pub fn experiment_name<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    path.strip_prefix(prefix)?
        .split('/')
        .next()
        .filter(|s| !s.is_empty())
}
