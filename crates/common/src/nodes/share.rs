//! Share settings and their inheritance.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Access control for a node: a public flag plus an allow-list of user ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareSettings {
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub uids: BTreeSet<String>,
}

impl ShareSettings {
    pub fn new(is_public: bool, uids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            is_public,
            uids: uids.into_iter().map(Into::into).collect(),
        }
    }

    /// Public to nobody in particular: the state that is stored as absent.
    pub fn is_empty(&self) -> bool {
        !self.is_public && self.uids.is_empty()
    }
}

/// A node's own share settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "settings", rename_all = "camelCase")]
pub enum Share {
    /// No settings of its own; follows the nearest ancestor that has some.
    #[default]
    Inherited,
    Explicit(ShareSettings),
}

impl Share {
    /// Explicit settings, collapsing the empty state to [`Share::Inherited`]
    /// the same way the store does.
    pub fn from_settings(settings: Option<ShareSettings>) -> Self {
        match settings {
            Some(settings) if !settings.is_empty() => Share::Explicit(settings),
            _ => Share::Inherited,
        }
    }

    pub fn explicit(&self) -> Option<&ShareSettings> {
        match self {
            Share::Inherited => None,
            Share::Explicit(settings) => Some(settings),
        }
    }

    pub fn is_inherited(&self) -> bool {
        matches!(self, Share::Inherited)
    }
}

/// Carry a node's settings from one effective parent to another.
///
/// A public flag equal to the old parent's is treated as inherited and
/// follows the new parent; otherwise it is kept. Users granted by the old
/// parent are dropped and users granted by the new parent are added.
/// Settings set explicitly equal to the old parent's cannot be told apart
/// from inherited ones.
pub fn merge(
    target: &ShareSettings,
    from_parent: &ShareSettings,
    to_parent: &ShareSettings,
) -> ShareSettings {
    let is_public = if target.is_public == from_parent.is_public {
        to_parent.is_public
    } else {
        target.is_public
    };

    let mut uids: BTreeSet<String> = target.uids.difference(&from_parent.uids).cloned().collect();
    uids.extend(to_parent.uids.iter().cloned());

    ShareSettings { is_public, uids }
}
