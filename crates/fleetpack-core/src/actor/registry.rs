//! `RegistryActor`: packet and spec storage
//!
//! Owns every stored packet and spec. Packets are kept in save order, which
//! is the order best-match ties are broken in; specs are kept in creation
//! order, which is the order their apps are merged in.

use std::path::PathBuf;

use fleetpack_api::{ControlInfo, DesiredState, PacketListing, Spec};
use fleetpack_packet::SealedPacket;
use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::ActorStopReason;
use kameo::message::{Context, Message};
use kameo::prelude::*;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::message::{
    BestMatch, ComputeDesiredState, ComputeSpec, CreateSpec, DeletePacket, DeleteSpec, GetInfos,
    GetPacketData, GetPacketInfo, GetSpec, GetStats, ListPackets, ListSpecs, RegistryStats,
    ReplaceSpec, SavePacket,
};
use crate::persist::{SnapshotIndex, SnapshotStore};
use crate::resolver;

/// Arguments for spawning a `RegistryActor`
#[derive(Debug, Clone, Default)]
pub struct RegistryActorArgs {
    /// Snapshot directory; `None` keeps everything in memory
    pub data_dir: Option<PathBuf>,
}

/// Packet and spec registry
pub struct RegistryActor {
    /// Stored packets in save order
    packets: Vec<SealedPacket>,
    /// Specs in creation order
    specs: Vec<Spec>,
    /// Snapshot writer, if persistence is enabled
    store: Option<SnapshotStore>,
}

impl RegistryActor {
    fn find_packet(&self, hash: &str) -> Result<&SealedPacket, CoreError> {
        self.packets
            .iter()
            .find(|p| p.hash() == hash)
            .ok_or_else(|| CoreError::PacketNotFound(hash.to_string()))
    }

    fn infos_for(&self, name: &str) -> Vec<ControlInfo> {
        self.packets
            .iter()
            .filter(|p| p.packet().name == name)
            .map(SealedPacket::control_info)
            .collect()
    }

    fn spec_position(&self, id: &str) -> Result<usize, CoreError> {
        self.specs
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| CoreError::SpecNotFound(id.to_string()))
    }

    fn packet_hashes(&self) -> Vec<String> {
        self.packets.iter().map(|p| p.hash().to_string()).collect()
    }

    /// Write the index a mutation would produce
    ///
    /// Handlers call this before touching `packets` or `specs`, so a failed
    /// write leaves memory and disk in agreement.
    async fn persist_index(&self, packets: Vec<String>, specs: &[Spec]) -> Result<(), CoreError> {
        match &self.store {
            Some(store) => {
                store
                    .write_index(&SnapshotIndex {
                        packets,
                        specs: specs.to_vec(),
                    })
                    .await
            }
            None => Ok(()),
        }
    }

    /// Drop a packet file that is no longer referenced by the index
    async fn discard_packet_file(&self, hash: &str) {
        if let Some(store) = &self.store {
            if let Err(e) = store.remove_packet(hash).await {
                warn!(hash = %hash, error = %e, "failed to remove unreferenced packet file");
            }
        }
    }
}

impl Actor for RegistryActor {
    type Args = RegistryActorArgs;
    type Error = CoreError;

    async fn on_start(args: Self::Args, actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        info!(id = %actor_ref.id(), "RegistryActor starting");

        let Some(data_dir) = args.data_dir else {
            return Ok(Self {
                packets: Vec::new(),
                specs: Vec::new(),
                store: None,
            });
        };

        let store = SnapshotStore::new(data_dir);
        let snapshot = store.load().await?;

        Ok(Self {
            packets: snapshot.packets,
            specs: snapshot.specs,
            store: Some(store),
        })
    }

    async fn on_stop(
        &mut self,
        _actor_ref: WeakActorRef<Self>,
        reason: ActorStopReason,
    ) -> Result<(), Self::Error> {
        info!(reason = ?reason, packets = self.packets.len(), "RegistryActor stopping");
        Ok(())
    }
}

// ============================================================================
// Packet Handlers
// ============================================================================

impl Message<SavePacket> for RegistryActor {
    type Reply = Result<ControlInfo, CoreError>;

    async fn handle(
        &mut self,
        msg: SavePacket,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        let sealed = msg.packet;
        let info = sealed.control_info();

        if self.packets.iter().any(|p| p.hash() == sealed.hash()) {
            debug!(hash = %info.hash, "packet already stored");
            return Ok(info);
        }

        let same_identity = self.packets.iter().position(|p| {
            p.packet().name == sealed.packet().name && p.packet().labels == sealed.packet().labels
        });

        let mut hashes = self.packet_hashes();
        match same_identity {
            Some(idx) => hashes[idx] = info.hash.clone(),
            None => hashes.push(info.hash.clone()),
        }

        if let Some(store) = &self.store {
            store.write_packet(&sealed).await?;
        }
        if let Err(e) = self.persist_index(hashes, &self.specs).await {
            self.discard_packet_file(&info.hash).await;
            return Err(e);
        }

        let replaced = match same_identity {
            Some(idx) => Some(std::mem::replace(&mut self.packets[idx], sealed)),
            None => {
                self.packets.push(sealed);
                None
            }
        };

        if let Some(old) = replaced {
            info!(
                name = %info.name,
                old_hash = %old.hash(),
                hash = %info.hash,
                "replaced packet variant"
            );
            self.discard_packet_file(old.hash()).await;
        } else {
            info!(name = %info.name, hash = %info.hash, "saved packet");
        }

        Ok(info)
    }
}

impl Message<GetPacketInfo> for RegistryActor {
    type Reply = Result<ControlInfo, CoreError>;

    async fn handle(
        &mut self,
        msg: GetPacketInfo,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.find_packet(&msg.hash).map(SealedPacket::control_info)
    }
}

impl Message<GetPacketData> for RegistryActor {
    type Reply = Result<Vec<u8>, CoreError>;

    async fn handle(
        &mut self,
        msg: GetPacketData,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.find_packet(&msg.hash).map(|p| p.bytes().to_vec())
    }
}

impl Message<DeletePacket> for RegistryActor {
    type Reply = Result<ControlInfo, CoreError>;

    async fn handle(
        &mut self,
        msg: DeletePacket,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        let idx = self
            .packets
            .iter()
            .position(|p| p.hash() == msg.hash)
            .ok_or_else(|| CoreError::PacketNotFound(msg.hash.clone()))?;

        let mut hashes = self.packet_hashes();
        hashes.remove(idx);
        self.persist_index(hashes, &self.specs).await?;

        let removed = self.packets.remove(idx);
        self.discard_packet_file(removed.hash()).await;

        info!(name = %removed.packet().name, hash = %removed.hash(), "deleted packet");
        Ok(removed.control_info())
    }
}

impl Message<ListPackets> for RegistryActor {
    type Reply = PacketListing;

    async fn handle(
        &mut self,
        _msg: ListPackets,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        let mut listing = PacketListing::new();
        for packet in &self.packets {
            listing
                .entry(packet.packet().name.clone())
                .or_default()
                .push(packet.control_info());
        }
        listing
    }
}

impl Message<GetInfos> for RegistryActor {
    type Reply = Vec<ControlInfo>;

    async fn handle(&mut self, msg: GetInfos, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        self.infos_for(&msg.name)
    }
}

impl Message<BestMatch> for RegistryActor {
    type Reply = Result<ControlInfo, CoreError>;

    async fn handle(
        &mut self,
        msg: BestMatch,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        let candidates = self.infos_for(&msg.name);
        resolver::best_match(&msg.name, &msg.labels, &candidates).cloned()
    }
}

impl Message<ComputeDesiredState> for RegistryActor {
    type Reply = Result<DesiredState, CoreError>;

    async fn handle(
        &mut self,
        msg: ComputeDesiredState,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        let spec = resolver::merge_specs(&msg.labels, &self.specs);
        let state = resolver::resolve_desired_state(&msg.labels, &spec, |name| {
            self.infos_for(name)
        });

        debug!(
            apps = state.apps.len(),
            errors = state.errors.len(),
            "computed desired state"
        );
        Ok(state)
    }
}

// ============================================================================
// Spec Handlers
// ============================================================================

impl Message<ListSpecs> for RegistryActor {
    type Reply = Vec<Spec>;

    async fn handle(
        &mut self,
        _msg: ListSpecs,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.specs.clone()
    }
}

impl Message<CreateSpec> for RegistryActor {
    type Reply = Result<Spec, CoreError>;

    async fn handle(
        &mut self,
        msg: CreateSpec,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        let spec = msg.spec;
        if spec.id.trim().is_empty() {
            return Err(CoreError::InvalidSpec("spec id must not be empty".to_string()));
        }
        if self.spec_position(&spec.id).is_ok() {
            return Err(CoreError::SpecAlreadyExists(spec.id));
        }

        let mut specs = self.specs.clone();
        specs.push(spec.clone());
        self.persist_index(self.packet_hashes(), &specs).await?;
        self.specs = specs;

        info!(id = %spec.id, apps = spec.apps.len(), "created spec");
        Ok(spec)
    }
}

impl Message<GetSpec> for RegistryActor {
    type Reply = Result<Spec, CoreError>;

    async fn handle(&mut self, msg: GetSpec, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        let idx = self.spec_position(&msg.id)?;
        Ok(self.specs[idx].clone())
    }
}

impl Message<ReplaceSpec> for RegistryActor {
    type Reply = Result<Spec, CoreError>;

    async fn handle(
        &mut self,
        msg: ReplaceSpec,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        let idx = self.spec_position(&msg.id)?;
        let mut spec = msg.spec;
        spec.id = msg.id;

        let mut specs = self.specs.clone();
        specs[idx] = spec.clone();
        self.persist_index(self.packet_hashes(), &specs).await?;
        self.specs = specs;

        info!(id = %spec.id, apps = spec.apps.len(), "replaced spec");
        Ok(spec)
    }
}

impl Message<DeleteSpec> for RegistryActor {
    type Reply = Result<Spec, CoreError>;

    async fn handle(
        &mut self,
        msg: DeleteSpec,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        let idx = self.spec_position(&msg.id)?;
        let mut specs = self.specs.clone();
        let removed = specs.remove(idx);
        self.persist_index(self.packet_hashes(), &specs).await?;
        self.specs = specs;

        info!(id = %removed.id, "deleted spec");
        Ok(removed)
    }
}

impl Message<ComputeSpec> for RegistryActor {
    type Reply = Result<Spec, CoreError>;

    async fn handle(
        &mut self,
        msg: ComputeSpec,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        Ok(resolver::merge_specs(&msg.labels, &self.specs))
    }
}

impl Message<GetStats> for RegistryActor {
    type Reply = RegistryStats;

    async fn handle(
        &mut self,
        _msg: GetStats,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        RegistryStats {
            packets: self.packets.len(),
            specs: self.specs.len(),
        }
    }
}
