//! Whole-packet encoding and content addressing

use fleetpack_api::{ControlInfo, Labels, Scripts};
use tracing::debug;

use crate::archive;
use crate::control::{self, ControlFile};
use crate::error::PacketError;
use crate::hash::hash_bytes;
use crate::payload::Payload;

/// Outer entry holding metadata and scripts
pub const CONTROL_ARCHIVE: &str = "control.tar.xz";
/// Outer entry holding the payload tree
pub const DATA_ARCHIVE: &str = "data.tar.xz";

/// Default cap on the decompressed size of each section
pub const MAX_UNPACKED_BYTES: u64 = 512 * 1024 * 1024;

const OUTER_MODE: u32 = 0o600;

/// A decoded packet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    pub name: String,
    pub labels: Labels,
    pub scripts: Scripts,
    pub payload: Payload,
}

impl Packet {
    pub fn new(name: impl Into<String>, labels: Labels) -> Self {
        Self {
            name: name.into(),
            labels,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_scripts(mut self, scripts: Scripts) -> Self {
        self.scripts = scripts;
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Encode to `.jpk` bytes
    ///
    /// Output is canonical: entry order, timestamps and ownership are fixed,
    /// so equal packets always produce equal bytes.
    ///
    /// # Errors
    /// Returns an error if the metadata cannot be serialized or compression
    /// fails
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let control_file = ControlFile {
            name: self.name.clone(),
            labels: self.labels.clone(),
        };
        let control_bytes = control::encode(&control_file, &self.scripts)?;
        let data_bytes = self.payload.encode()?;

        let mut builder = tar::Builder::new(Vec::new());
        archive::append_bytes(&mut builder, CONTROL_ARCHIVE, OUTER_MODE, &control_bytes)?;
        archive::append_bytes(&mut builder, DATA_ARCHIVE, OUTER_MODE, &data_bytes)?;
        Ok(builder.into_inner()?)
    }

    /// Decode `.jpk` bytes with the default [`MAX_UNPACKED_BYTES`] limit
    ///
    /// # Errors
    /// See [`Packet::decode_limited`]
    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        Self::decode_limited(bytes, MAX_UNPACKED_BYTES)
    }

    /// Decode `.jpk` bytes, refusing either section if it expands past
    /// `max_unpacked` bytes
    ///
    /// The two outer entries may appear in either order; anything else in the
    /// outer archive is ignored.
    ///
    /// # Errors
    /// Returns a decode error (see [`PacketError::is_decode_error`]) if the
    /// bytes are not a well-formed packet or unpack too large
    pub fn decode_limited(bytes: &[u8], max_unpacked: u64) -> Result<Self, PacketError> {
        let mut outer = tar::Archive::new(bytes);
        let mut control_bytes = None;
        let mut data_bytes = None;

        for entry in outer.entries().map_err(PacketError::malformed)? {
            let mut entry = entry.map_err(PacketError::malformed)?;
            let name = entry
                .path()
                .map_err(PacketError::malformed)?
                .to_string_lossy()
                .into_owned();
            match name.trim_start_matches("./") {
                CONTROL_ARCHIVE => control_bytes = Some(archive::read_entry(&mut entry)?),
                DATA_ARCHIVE => data_bytes = Some(archive::read_entry(&mut entry)?),
                other => debug!(entry = %other, "ignoring unknown packet entry"),
            }
        }

        let control_bytes = control_bytes.ok_or(PacketError::MissingEntry(CONTROL_ARCHIVE))?;
        let data_bytes = data_bytes.ok_or(PacketError::MissingEntry(DATA_ARCHIVE))?;

        let section = control::decode(&control_bytes, max_unpacked)?;
        let payload = Payload::decode(&data_bytes, max_unpacked)?;

        Ok(Self {
            name: section.control.name,
            labels: section.control.labels,
            scripts: section.scripts,
            payload,
        })
    }

    /// Content hash of the canonical encoding
    ///
    /// # Errors
    /// Propagates encoding failures
    pub fn hash(&self) -> Result<String, PacketError> {
        Ok(hash_bytes(&self.encode()?))
    }

    /// Control info for this packet under a known hash
    #[must_use]
    pub fn control_info(&self, hash: impl Into<String>) -> ControlInfo {
        ControlInfo {
            name: self.name.clone(),
            labels: self.labels.clone(),
            hash: hash.into(),
            scripts: self.scripts.clone(),
        }
    }
}

/// A packet together with its canonical bytes and their hash
///
/// The three always agree; there is no way to mutate one without the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPacket {
    packet: Packet,
    bytes: Vec<u8>,
    hash: String,
}

impl SealedPacket {
    /// Encode and hash a packet
    ///
    /// # Errors
    /// Propagates encoding failures
    pub fn seal(packet: Packet) -> Result<Self, PacketError> {
        let bytes = packet.encode()?;
        let hash = hash_bytes(&bytes);
        Ok(Self {
            packet,
            bytes,
            hash,
        })
    }

    /// Decode untrusted bytes and re-encode them canonically
    ///
    /// The resulting hash identifies the canonical form, which may differ from
    /// a hash of `bytes` when the input was produced by another encoder.
    ///
    /// # Errors
    /// Returns a decode error if `bytes` is not a well-formed packet
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        Self::seal(Packet::decode(bytes)?)
    }

    /// Decode with an explicit unpacked-size limit, then seal
    ///
    /// # Errors
    /// See [`Packet::decode_limited`]
    pub fn from_bytes_limited(bytes: &[u8], max_unpacked: u64) -> Result<Self, PacketError> {
        Self::seal(Packet::decode_limited(bytes, max_unpacked)?)
    }

    #[must_use]
    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    #[must_use]
    pub fn control_info(&self) -> ControlInfo {
        self.packet.control_info(self.hash.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PayloadEntry;

    fn sample() -> Packet {
        let mut labels = Labels::new();
        labels.insert("os".to_string(), "linux".to_string());
        let mut payload = Payload::new();
        payload
            .push(PayloadEntry::file("etc/motd", 0o644, b"hi\n".to_vec()))
            .unwrap();
        Packet::new("motd", labels)
            .with_scripts(Scripts {
                post_install: "echo installed".to_string(),
                ..Scripts::default()
            })
            .with_payload(payload)
    }

    fn outer(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in entries {
            archive::append_bytes(&mut builder, name, 0o600, data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn sections(packet: &Packet) -> (Vec<u8>, Vec<u8>) {
        let control_file = ControlFile {
            name: packet.name.clone(),
            labels: packet.labels.clone(),
        };
        (
            control::encode(&control_file, &packet.scripts).unwrap(),
            packet.payload.encode().unwrap(),
        )
    }

    #[test]
    fn test_reversed_entry_order() {
        let packet = sample();
        let (control_bytes, data_bytes) = sections(&packet);
        let bytes = outer(&[
            (DATA_ARCHIVE, data_bytes.as_slice()),
            (CONTROL_ARCHIVE, control_bytes.as_slice()),
        ]);

        assert_eq!(Packet::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_unknown_outer_entries_ignored() {
        let packet = sample();
        let (control_bytes, data_bytes) = sections(&packet);
        let bytes = outer(&[
            ("debian-binary", &b"2.0\n"[..]),
            (CONTROL_ARCHIVE, control_bytes.as_slice()),
            (DATA_ARCHIVE, data_bytes.as_slice()),
        ]);

        assert_eq!(Packet::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_missing_data_archive() {
        let (control_bytes, _) = sections(&sample());
        let bytes = outer(&[(CONTROL_ARCHIVE, control_bytes.as_slice())]);

        let err = Packet::decode(&bytes).unwrap_err();
        assert!(matches!(err, PacketError::MissingEntry(DATA_ARCHIVE)));
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_sealed_from_foreign_bytes_is_canonical() {
        let packet = sample();
        let (control_bytes, data_bytes) = sections(&packet);
        let foreign = outer(&[
            (DATA_ARCHIVE, data_bytes.as_slice()),
            (CONTROL_ARCHIVE, control_bytes.as_slice()),
        ]);

        let sealed = SealedPacket::from_bytes(&foreign).unwrap();
        assert_eq!(sealed.hash(), packet.hash().unwrap());
        assert_eq!(sealed.bytes(), packet.encode().unwrap().as_slice());
    }

    #[test]
    fn test_control_info_carries_hash_and_scripts() {
        let sealed = SealedPacket::seal(sample()).unwrap();
        let info = sealed.control_info();
        assert_eq!(info.name, "motd");
        assert_eq!(info.hash, sealed.hash());
        assert_eq!(info.scripts.post_install, "echo installed");
    }
}
