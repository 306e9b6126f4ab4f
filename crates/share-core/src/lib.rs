//! Core types and policy for share.
//!
//! This crate provides the pieces every other share crate builds on: the
//! root pair and shared-root model, path mapping between the two roots, the
//! newer-wins decision policy, configuration resolution and the external
//! command builders used for remote shared roots.

mod config;
mod decision;
mod entry;
mod error;
mod location;
mod mapper;
pub mod paths;
pub mod remote;
mod roots;

pub use config::{DEFAULT_TOLERANCE, RootPair, SyncConfig, SyncConfigBuilder};
pub use decision::{Decision, Direction, SyncMode, decide, is_newer};
pub use entry::{ManagedEntry, SideState};
pub use error::ShareError;
pub use location::{Location, RemoteEndpoint, RemotePath, SharedRoot, Side, join_remote};
pub use mapper::PathMapper;
pub use remote::RemoteTools;
pub use roots::{
    CONFIG_FILE, ConfigLayer, ConfigSources, LOCAL_ROOT_FILE, OVERRIDE_FILE, SHARED_ROOT_FILE,
    find_override, parse_shared_root, resolve_config, resolve_roots,
};
