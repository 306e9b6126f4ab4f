//! Command identifiers.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use share_core::SyncMode;
use share_scan::WalkMode;

/// A share command.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ShareOp {
    /// Copy local → shared unconditionally.
    Put,
    /// Copy local → shared when local is new or newer.
    Push,
    /// Push over the whole shared tree.
    PushAll,
    /// Copy shared → local unconditionally.
    Get,
    /// Copy shared → local when shared is new or newer.
    Pull,
    /// Pull over the whole shared tree.
    PullAll,
    /// Copy whichever side is newer.
    Sync,
    /// Sync over the whole shared tree.
    SyncAll,
    /// Report the decision without transferring.
    Check,
    /// Remove the shared copy.
    #[strum(to_string = "rm", serialize = "remove")]
    #[serde(rename = "rm", alias = "remove")]
    Remove,
    /// Compare content of synced pairs.
    Audit,
    /// Audit over the whole shared tree.
    AuditAll,
    /// Group every tracked file by state.
    Status,
    /// List every tracked file.
    List,
}

impl ShareOp {
    /// Traversal mode for directory arguments.
    ///
    /// Retrieval and removal must not silently pass over private-looking
    /// files the user named, so they only apply ignore patterns.
    pub fn walk_mode(self) -> WalkMode {
        match self {
            Self::Get | Self::Pull | Self::Remove => WalkMode::NoSkip,
            _ => WalkMode::Skipping,
        }
    }

    /// Which decision branches this command executes, for the newer-wins commands.
    pub fn sync_mode(self) -> Option<SyncMode> {
        match self {
            Self::Push | Self::PushAll => Some(SyncMode::Push),
            Self::Pull | Self::PullAll => Some(SyncMode::Pull),
            Self::Sync | Self::SyncAll => Some(SyncMode::Both),
            _ => None,
        }
    }

    /// Whether the command works over the whole shared tree instead of named paths.
    pub fn is_whole_tree(self) -> bool {
        matches!(
            self,
            Self::PushAll | Self::PullAll | Self::SyncAll | Self::AuditAll | Self::Status | Self::List
        )
    }

    /// Whether the command needs at least one path argument.
    pub fn takes_paths(self) -> bool {
        !self.is_whole_tree()
    }

    /// Verb used in summary lines ("Pushed 3 files").
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Put => "Put",
            Self::Push | Self::PushAll => "Pushed",
            Self::Get => "Got",
            Self::Pull | Self::PullAll => "Pulled",
            Self::Sync | Self::SyncAll => "Synced",
            Self::Check => "Checked",
            Self::Remove => "Removed",
            Self::Audit | Self::AuditAll => "Audited",
            Self::Status | Self::List => "Listed",
        }
    }
}
