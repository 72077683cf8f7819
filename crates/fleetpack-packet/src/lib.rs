//! fleetpack-packet: Packet archive codec
//!
//! A packet (`.jpk`) is an uncompressed tar holding two xz-compressed tars:
//! `control.tar.xz` with the metadata and lifecycle scripts, and
//! `data.tar.xz` with the payload tree. Packets are content addressed by a
//! SHAKE256 digest of their encoded bytes.

mod archive;
pub mod control;
pub mod error;
pub mod hash;
pub mod layout;
pub mod packet;
pub mod payload;

pub use error::PacketError;
pub use hash::{HASH_LEN, hash_bytes, is_valid_hash};
pub use layout::{build_from_directory, init_directory};
pub use packet::{CONTROL_ARCHIVE, DATA_ARCHIVE, MAX_UNPACKED_BYTES, Packet, SealedPacket};
pub use payload::{EntryKind, Payload, PayloadEntry};

/// Result type for packet operations
pub type Result<T> = std::result::Result<T, PacketError>;
