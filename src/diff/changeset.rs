//! Classification of desired and current resources into a changeset.

use std::fmt;

use tracing::{debug, debug_span};

use super::ignore::{parse_ignore_paths, prune, IgnorePath};
use super::patch::{generate, PatchOperation};
use super::render::{render_addition, render_removal, render_update};
use crate::error::Result;
use crate::resource::{ResourceItem, ResourceList};
use crate::value::Value;

/// Action is what has to happen to a resource for the platform to match the templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Update,
    Delete,
    Noop,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Update => write!(f, "update"),
            Action::Delete => write!(f, "delete"),
            Action::Noop => write!(f, "noop"),
        }
    }
}

/// Change is the classification of one resource identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub action: Action,
    pub kind: String,
    pub name: String,
    /// Body on the platform, absent for creations. Pruned for matched pairs.
    pub current: Option<Value>,
    /// Body from the templates, absent for deletions. Pruned for matched pairs.
    pub desired: Option<Value>,
    diff: String,
    patches: Vec<PatchOperation>,
}

impl Change {
    fn create(item: &ResourceItem, desired: Value) -> Result<Change> {
        Ok(Change {
            action: Action::Create,
            kind: item.kind.clone(),
            name: item.name.clone(),
            diff: render_addition(&desired)?,
            current: None,
            desired: Some(desired),
            patches: Vec::new(),
        })
    }

    fn delete(item: &ResourceItem, current: Value) -> Result<Change> {
        Ok(Change {
            action: Action::Delete,
            kind: item.kind.clone(),
            name: item.name.clone(),
            diff: render_removal(&current)?,
            current: Some(current),
            desired: None,
            patches: Vec::new(),
        })
    }

    fn compare(item: &ResourceItem, current: Value, desired: Value) -> Result<Change> {
        let (action, diff, patches) = if current == desired {
            (Action::Noop, String::new(), Vec::new())
        } else {
            (
                Action::Update,
                render_update(&current, &desired)?,
                generate(&current, &desired),
            )
        };
        Ok(Change {
            action,
            kind: item.kind.clone(),
            name: item.name.clone(),
            current: Some(current),
            desired: Some(desired),
            diff,
            patches,
        })
    }

    /// Returns the identity of the resource as "Kind/Name".
    pub fn item_name(&self) -> String {
        format!("{}/{}", self.kind, self.name)
    }

    /// Returns the human-readable difference. Empty for noops.
    pub fn diff(&self) -> &str {
        &self.diff
    }

    /// Returns the operations turning the current body into the desired one.
    /// Only updates carry operations.
    pub fn patches(&self) -> &[PatchOperation] {
        &self.patches
    }

    /// Serializes the patch operations as a JSON array.
    pub fn json_patches(&self, pretty: bool) -> String {
        let serialized = if pretty {
            serde_json::to_string_pretty(&self.patches)
        } else {
            serde_json::to_string(&self.patches)
        };
        // A list of operations over value trees always serializes.
        serialized.unwrap_or_else(|_| String::from("[]"))
    }
}

/// Changeset groups changes by action.
///
/// Creations, updates and noops follow template order; deletions follow
/// platform order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    pub create: Vec<Change>,
    pub update: Vec<Change>,
    pub delete: Vec<Change>,
    pub noop: Vec<Change>,
}

impl Changeset {
    /// Compares the desired state (`template`) with the current state (`platform`).
    ///
    /// Ignore paths are pruned from both sides of every matched pair before
    /// comparing; creations and deletions carry the full bodies. With
    /// `upsert_only`, resources missing from the templates are left alone
    /// instead of being deleted.
    pub fn new<S: AsRef<str>>(
        platform: &ResourceList,
        template: &ResourceList,
        upsert_only: bool,
        ignore_paths: &[S],
    ) -> Result<Changeset> {
        let ignore_paths = parse_ignore_paths(ignore_paths)?;
        Changeset::with_ignore_paths(platform, template, upsert_only, &ignore_paths)
    }

    /// Like [`Changeset::new`], with ignore paths that are already parsed.
    pub fn with_ignore_paths(
        platform: &ResourceList,
        template: &ResourceList,
        upsert_only: bool,
        ignore_paths: &[IgnorePath],
    ) -> Result<Changeset> {
        let _span = debug_span!("changeset", current = platform.len(), desired = template.len()).entered();
        let mut changeset = Changeset::default();

        for desired in template {
            match platform.find(&desired.kind, &desired.name) {
                None => {
                    debug!(item = %desired.full_name(), "not on the platform, to create");
                    changeset.add(Change::create(desired, desired.config.clone())?);
                }
                Some(current) => {
                    let change = Change::compare(
                        desired,
                        prune(current, ignore_paths),
                        prune(desired, ignore_paths),
                    )?;
                    debug!(item = %desired.full_name(), action = %change.action, "compared");
                    changeset.add(change);
                }
            }
        }

        for current in platform {
            if template.contains(&current.kind, &current.name) {
                continue;
            }
            if upsert_only {
                debug!(item = %current.full_name(), "not in templates, kept because of upsert-only");
                continue;
            }
            debug!(item = %current.full_name(), "not in templates, to delete");
            changeset.add(Change::delete(current, current.config.clone())?);
        }

        debug!(summary = %changeset.summary(), "changeset calculated");
        Ok(changeset)
    }

    fn add(&mut self, change: Change) {
        match change.action {
            Action::Create => self.create.push(change),
            Action::Update => self.update.push(change),
            Action::Delete => self.delete.push(change),
            Action::Noop => self.noop.push(change),
        }
    }

    /// Returns true if nothing has to be created, updated or deleted.
    pub fn is_blank(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    /// Returns the number of changes per action.
    pub fn summary(&self) -> Summary {
        Summary {
            noop: self.noop.len(),
            create: self.create.len(),
            update: self.update.len(),
            delete: self.delete.len(),
        }
    }
}

/// Summary counts the changes of a changeset per action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub noop: usize,
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in sync, {} to create, {} to update, {} to delete",
            self.noop, self.create, self.update, self.delete
        )
    }
}
