//! fleetpack-core: Label resolution and the packet/spec registry
//!
//! The resolver turns a device's labels into a concrete install list. The
//! `RegistryActor` (kameo) owns every stored packet and spec and answers the
//! queries the resolver needs.

pub mod actor;
pub mod error;
pub mod message;
pub mod persist;
pub mod resolver;

pub use actor::registry::{RegistryActor, RegistryActorArgs};
pub use error::CoreError;
pub use message::{
    BestMatch, ComputeDesiredState, ComputeSpec, CreateSpec, DeletePacket, DeleteSpec, GetInfos,
    GetPacketData, GetPacketInfo, GetSpec, GetStats, ListPackets, ListSpecs, RegistryStats,
    ReplaceSpec, SavePacket,
};
pub use persist::{SnapshotIndex, SnapshotStore};
pub use resolver::{best_match, labels_match, merge_specs, resolve_desired_state};
