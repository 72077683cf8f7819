//! Message types for actor communication
//!
//! Message handlers are implemented in `actor::registry`.

use std::collections::BTreeMap;

use fleetpack_api::Spec;
use fleetpack_packet::SealedPacket;
use kameo_macros::Reply;

// ============================================================================
// Packet Messages
// ============================================================================

/// Store a packet, replacing any packet with the same name and labels
#[derive(Debug)]
pub struct SavePacket {
    /// Already decoded and canonicalized packet
    pub packet: SealedPacket,
}

/// Look up control info by hash
#[derive(Debug)]
pub struct GetPacketInfo {
    pub hash: String,
}

/// Fetch canonical packet bytes by hash
#[derive(Debug)]
pub struct GetPacketData {
    pub hash: String,
}

/// Remove a packet by hash
#[derive(Debug)]
pub struct DeletePacket {
    pub hash: String,
}

/// All control infos grouped by packet name
#[derive(Debug)]
pub struct ListPackets;

/// Control infos of every variant of one packet, in registry order
#[derive(Debug)]
pub struct GetInfos {
    pub name: String,
}

/// Best variant of `name` for a label set
#[derive(Debug)]
pub struct BestMatch {
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

/// Merge matching specs and resolve every app to a packet hash
#[derive(Debug)]
pub struct ComputeDesiredState {
    pub labels: BTreeMap<String, String>,
}

// ============================================================================
// Spec Messages
// ============================================================================

/// All specs in creation order
#[derive(Debug)]
pub struct ListSpecs;

/// Add a new spec
#[derive(Debug)]
pub struct CreateSpec {
    pub spec: Spec,
}

/// Look up a spec by id
#[derive(Debug)]
pub struct GetSpec {
    pub id: String,
}

/// Replace an existing spec, keeping its position
#[derive(Debug)]
pub struct ReplaceSpec {
    /// Id of the spec to replace; overrides `spec.id`
    pub id: String,
    pub spec: Spec,
}

/// Remove a spec by id
#[derive(Debug)]
pub struct DeleteSpec {
    pub id: String,
}

/// Merge every spec whose target matches the labels
#[derive(Debug)]
pub struct ComputeSpec {
    pub labels: BTreeMap<String, String>,
}

// ============================================================================
// Registry Messages
// ============================================================================

/// Get registry counters
#[derive(Debug)]
pub struct GetStats;

/// Registry counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reply)]
pub struct RegistryStats {
    /// Stored packets
    pub packets: usize,
    /// Stored specs
    pub specs: usize,
}
