//! Byte layout of a cache file.
//!
//! ```text
//! offset 0      u32 little-endian L
//! offset 4      L bytes of metadata
//! offset 4 + L  payload, to end of file
//! ```
//!
//! The header is the only thing used to locate the payload, so it must equal
//! the metadata block length exactly.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::Error;

/// Size of the length prefix in bytes.
pub(crate) const HEADER_LEN: usize = 4;

/// Result of reading the length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Header {
    /// Zero bytes available: a freshly created file.
    Missing,
    /// Fewer than `HEADER_LEN` bytes available.
    Truncated(usize),
    /// Length of the metadata block.
    Length(u32),
}

/// Encode a metadata block length as the 4-byte header.
pub(crate) fn encode_header(len: usize) -> Result<[u8; HEADER_LEN], Error> {
    let len = u32::try_from(len)
        .map_err(|_| Error::EncodeFailure(format!("metadata block of {len} bytes exceeds u32 header")))?;
    Ok(len.to_le_bytes())
}

/// Read the header from the current position.
pub(crate) fn read_header<R: Read>(reader: &mut R, path: &Path) -> Result<Header, Error> {
    let mut buf = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::storage(path, e)),
        }
    }

    Ok(match filled {
        0 => Header::Missing,
        HEADER_LEN => Header::Length(u32::from_le_bytes(buf)),
        n => Header::Truncated(n),
    })
}

/// Read exactly `len` metadata bytes following the header.
///
/// A short read means the header disagrees with the file and is reported as
/// `CorruptMetadata`.
pub(crate) fn read_block<R: Read>(reader: &mut R, len: u32, path: &Path) -> Result<Vec<u8>, Error> {
    let mut block = Vec::new();
    reader
        .take(u64::from(len))
        .read_to_end(&mut block)
        .map_err(|e| Error::storage(path, e))?;

    if block.len() != len as usize {
        return Err(Error::CorruptMetadata(format!(
            "header declares {len} metadata bytes, file holds {}",
            block.len()
        )));
    }
    Ok(block)
}

/// Write header, metadata block, and payload back to back.
pub(crate) fn write_record<W: Write, T: Serialize>(
    writer: &mut W, metadata: &[u8], items: &[T], path: &Path,
) -> Result<(), Error> {
    let header = encode_header(metadata.len())?;
    writer.write_all(&header).map_err(|e| Error::storage(path, e))?;
    writer.write_all(metadata).map_err(|e| Error::storage(path, e))?;

    serde_json::to_writer(&mut *writer, items).map_err(|e| match e.io_error_kind() {
        Some(kind) => Error::storage(path, io::Error::new(kind, e)),
        None => Error::EncodeFailure(e.to_string()),
    })?;

    writer.flush().map_err(|e| Error::storage(path, e))
}

/// Skip `metadata_len` bytes from the current position (just past the header)
/// and decode the payload that follows.
pub(crate) fn read_payload<R: Read + Seek, T: DeserializeOwned>(
    reader: &mut R, metadata_len: u32, path: &Path,
) -> Result<Vec<T>, Error> {
    reader
        .seek(SeekFrom::Current(i64::from(metadata_len)))
        .map_err(|e| Error::storage(path, e))?;

    serde_json::from_reader(io::BufReader::new(reader)).map_err(|e| match e.io_error_kind() {
        Some(kind) => Error::storage(path, io::Error::new(kind, e)),
        None => Error::DecodeFailure(e.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn path() -> &'static Path {
        Path::new("layout-test")
    }

    #[test]
    fn test_header_is_little_endian() {
        assert_eq!(encode_header(0x0102_0304).unwrap(), [0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_read_header_states() {
        assert_eq!(read_header(&mut Cursor::new(Vec::new()), path()).unwrap(), Header::Missing);
        assert_eq!(read_header(&mut Cursor::new(vec![1, 2]), path()).unwrap(), Header::Truncated(2));
        assert_eq!(read_header(&mut Cursor::new(vec![7, 0, 0, 0, 9]), path()).unwrap(), Header::Length(7));
    }

    #[test]
    fn test_record_layout_has_no_gaps() {
        let mut buf = Cursor::new(Vec::new());
        write_record(&mut buf, b"{\"m\":1}", &["a", "b"], path()).unwrap();
        let bytes = buf.into_inner();

        assert_eq!(&bytes[..HEADER_LEN], &7u32.to_le_bytes());
        assert_eq!(&bytes[HEADER_LEN..HEADER_LEN + 7], b"{\"m\":1}");
        assert_eq!(&bytes[HEADER_LEN + 7..], b"[\"a\",\"b\"]");
    }

    #[test]
    fn test_read_payload_skips_metadata() {
        let mut buf = Cursor::new(Vec::new());
        write_record(&mut buf, b"ignored-block", &[1u32, 2, 3], path()).unwrap();
        buf.set_position(0);

        let Header::Length(len) = read_header(&mut buf, path()).unwrap() else {
            panic!("expected a length header");
        };
        let items: Vec<u32> = read_payload(&mut buf, len, path()).unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn test_read_block_short() {
        let mut buf = Cursor::new(b"abc".to_vec());
        let result = read_block(&mut buf, 10, path());
        assert!(matches!(result, Err(Error::CorruptMetadata(_))));
    }

    #[test]
    fn test_read_payload_garbage() {
        let mut buf = Cursor::new(b"xxnot json".to_vec());
        let result: Result<Vec<u32>, Error> = read_payload(&mut buf, 2, path());
        assert!(matches!(result, Err(Error::DecodeFailure(_))));
    }
}
