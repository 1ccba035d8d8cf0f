//! Selection of the resources that take part in a comparison.

use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use super::item::ResourceItem;
use crate::error::{Error, Result};

/// Kinds exported when a filter names none, in export order.
pub const AVAILABLE_KINDS: &[&str] = &[
    "svc",
    "route",
    "dc",
    "bc",
    "is",
    "pvc",
    "template",
    "cm",
    "secret",
    "rolebinding",
    "serviceaccount",
];

/// Short name, canonical kind.
const KINDS: &[(&str, &str)] = &[
    ("svc", "Service"),
    ("route", "Route"),
    ("dc", "DeploymentConfig"),
    ("bc", "BuildConfig"),
    ("is", "ImageStream"),
    ("pvc", "PersistentVolumeClaim"),
    ("template", "Template"),
    ("cm", "ConfigMap"),
    ("secret", "Secret"),
    ("rolebinding", "RoleBinding"),
    ("serviceaccount", "ServiceAccount"),
];

/// Lowercased alias (short name, kind, plural) to canonical kind.
static KIND_ALIASES: Lazy<IndexMap<String, &'static str>> = Lazy::new(|| {
    let mut aliases = IndexMap::new();
    for (short, kind) in KINDS {
        let lower = kind.to_ascii_lowercase();
        aliases.insert(short.to_string(), *kind);
        aliases.insert(format!("{}s", lower), *kind);
        aliases.insert(lower, *kind);
    }
    aliases
});

/// Resolves a kind alias ("dc", "deploymentconfigs", "DeploymentConfig") to
/// its canonical kind.
pub fn canonical_kind(kind: &str) -> Option<&'static str> {
    KIND_ALIASES.get(&kind.to_ascii_lowercase()).copied()
}

// Unknown kinds pass through as long as they are spelled like a kind.
pub(crate) fn resolve_kind(input: &str, kind: &str) -> Result<String> {
    if let Some(canonical) = canonical_kind(kind) {
        return Ok(canonical.to_string());
    }
    if kind.starts_with(|c: char| c.is_ascii_uppercase()) && kind.chars().all(char::is_alphanumeric) {
        return Ok(kind.to_string());
    }
    Err(Error::invalid_filter(input, format!("unknown kind '{}'", kind)))
}

/// Exclude is a single rule removing matching items from a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclude {
    Kind(String),
    /// "Kind/Name"
    Name(String),
    Label { key: String, value: String },
}

impl Exclude {
    /// Parses "Kind", "Kind/Name" or "key=value".
    pub fn parse(rule: &str) -> Result<Exclude> {
        if let Some((key, value)) = rule.split_once('=') {
            if key.is_empty() {
                return Err(Error::invalid_filter(rule, "label key must not be empty"));
            }
            return Ok(Exclude::Label {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        if let Some((kind, name)) = rule.split_once('/') {
            if name.is_empty() {
                return Err(Error::invalid_filter(rule, "name must not be empty"));
            }
            return Ok(Exclude::Name(format!("{}/{}", resolve_kind(rule, kind)?, name)));
        }
        Ok(Exclude::Kind(resolve_kind(rule, rule)?))
    }

    /// Returns true if the item falls under this rule.
    pub fn matches(&self, item: &ResourceItem) -> bool {
        match self {
            Exclude::Kind(kind) => item.kind == *kind,
            Exclude::Name(name) => item.full_name() == *name,
            Exclude::Label { key, value } => item.labels.get(key) == Some(value),
        }
    }
}

/// ResourceFilter selects which resources take part in a comparison.
///
/// Every criterion that is set must hold. The same filter is used to build both the
/// desired and the current list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    /// Kinds to include; empty means all.
    pub kinds: Vec<String>,
    /// Exact "Kind/Name"; takes precedence over `kinds` for the export target.
    pub name: Option<String>,
    /// Single "key=value" label selector.
    pub label: Option<String>,
    pub excludes: Vec<Exclude>,
}

impl ResourceFilter {
    /// Builds a filter from user input.
    ///
    /// `resource` is either comma separated kinds ("dc,svc") or a single
    /// "kind/name". `selector` is one "key=value" pair. `exclude` is a comma
    /// separated list of kinds, "Kind/Name"s and "key=value" labels. Empty strings
    /// leave the corresponding criterion unset.
    pub fn new(resource: &str, selector: &str, exclude: &str) -> Result<ResourceFilter> {
        let mut filter = ResourceFilter::default();

        let resource = resource.trim();
        if let Some((kind, name)) = resource.split_once('/') {
            if name.is_empty() || name.contains('/') || kind.contains(',') {
                return Err(Error::invalid_filter(
                    resource,
                    "expected a single kind/name pair",
                ));
            }
            filter.name = Some(format!("{}/{}", resolve_kind(resource, kind)?, name));
        } else if !resource.is_empty() {
            for kind in resource.split(',').map(str::trim).filter(|k| !k.is_empty()) {
                let kind = resolve_kind(resource, kind)?;
                if !filter.kinds.contains(&kind) {
                    filter.kinds.push(kind);
                }
            }
        }

        let selector = selector.trim();
        if !selector.is_empty() {
            validate_selector(selector)?;
            filter.label = Some(selector.to_string());
        }

        filter.excludes = exclude
            .split(',')
            .map(str::trim)
            .filter(|rule| !rule.is_empty())
            .map(Exclude::parse)
            .collect::<Result<Vec<_>>>()?;

        Ok(filter)
    }

    /// Returns true if the item meets every criterion of the filter.
    pub fn satisfied_by(&self, item: &ResourceItem) -> bool {
        if let Some(name) = &self.name {
            if *name != item.full_name() {
                return false;
            }
        }

        if !self.kinds.is_empty() && !self.kinds.contains(&item.kind) {
            return false;
        }

        if let Some(label) = &self.label {
            let Some((key, value)) = label.split_once('=') else {
                return false;
            };
            if item.labels.get(key).map(String::as_str) != Some(value) {
                return false;
            }
        }

        !self.excludes.iter().any(|rule| rule.matches(item))
    }

    /// Returns the target handed to the platform export: the kind of `name` if
    /// set, else the selected kinds, else every available kind.
    pub fn convert_to_target(&self) -> String {
        if let Some(name) = &self.name {
            return name.split('/').next().unwrap_or_default().to_string();
        }
        if self.kinds.is_empty() {
            return AVAILABLE_KINDS.join(",");
        }
        self.kinds.join(",")
    }
}

fn validate_selector(selector: &str) -> Result<()> {
    let Some((key, _)) = selector.split_once('=') else {
        return Err(Error::invalid_filter(selector, "selector must be key=value"));
    };
    if key.is_empty() {
        return Err(Error::invalid_filter(selector, "label key must not be empty"));
    }
    if selector.contains(',') {
        return Err(Error::invalid_filter(
            selector,
            "only a single key=value selector is supported",
        ));
    }
    Ok(())
}

impl fmt::Display for ResourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Kind: {:?}, Name: {}, Label: {}",
            self.kinds,
            self.name.as_deref().unwrap_or_default(),
            self.label.as_deref().unwrap_or_default()
        )
    }
}
