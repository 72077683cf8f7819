//! Low-level tar/xz helpers shared by the control and data sections

use std::io::{Read, Write};

use tar::{Builder, EntryType, Header};
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

use crate::error::PacketError;

/// xz preset used for both sub-archives
const XZ_LEVEL: u32 = 6;

/// Header with every field that would make output non-reproducible zeroed
pub(crate) fn canonical_header(entry_type: EntryType, mode: u32, size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mode(mode);
    header.set_size(size);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header
}

/// Append an in-memory regular file
pub(crate) fn append_bytes<W: Write>(
    builder: &mut Builder<W>,
    name: &str,
    mode: u32,
    data: &[u8],
) -> Result<(), PacketError> {
    let mut header = canonical_header(EntryType::Regular, mode, data.len() as u64);
    builder.append_data(&mut header, name, data)?;
    Ok(())
}

pub(crate) fn compress(data: &[u8]) -> Result<Vec<u8>, PacketError> {
    let mut encoder = XzEncoder::new(Vec::new(), XZ_LEVEL);
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompress at most `limit` bytes; larger output is rejected
pub(crate) fn decompress(data: &[u8], limit: u64) -> Result<Vec<u8>, PacketError> {
    let mut decoder = XzDecoder::new(data).take(limit.saturating_add(1));
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(PacketError::malformed)?;
    if out.len() as u64 > limit {
        return Err(PacketError::TooLarge { limit });
    }
    Ok(out)
}

/// Read the remaining bytes of a tar entry
pub(crate) fn read_entry<R: Read>(entry: &mut tar::Entry<'_, R>) -> Result<Vec<u8>, PacketError> {
    let mut buf = Vec::new();
    entry
        .read_to_end(&mut buf)
        .map_err(PacketError::malformed)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_roundtrip() {
        let data = b"hello hello hello hello".repeat(10);
        let packed = compress(&data).unwrap();
        assert_eq!(decompress(&packed, data.len() as u64).unwrap(), data);
    }

    #[test]
    fn test_decompress_stops_at_limit() {
        let data = vec![0u8; 1024 * 1024];
        let packed = compress(&data).unwrap();
        assert!(packed.len() < 4096);

        let err = decompress(&packed, 64 * 1024).unwrap_err();
        assert!(matches!(err, PacketError::TooLarge { limit: 65536 }));
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_decompress_garbage() {
        let err = decompress(b"definitely not xz", 1024).unwrap_err();
        assert!(err.is_decode_error());
    }
}
