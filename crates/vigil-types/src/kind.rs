//! Change kinds.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The kind of filesystem mutation a change event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumIter, EnumString)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A new entry appeared under the monitored root.
    Created,
    /// An existing entry's contents or metadata changed.
    Modified,
    /// An entry was removed.
    Deleted,
    /// An entry was renamed or moved.
    Renamed,
}

impl ChangeKind {
    /// All kinds, in declaration order.
    pub fn all() -> impl Iterator<Item = Self> {
        use strum::IntoEnumIterator;
        Self::iter()
    }
}
