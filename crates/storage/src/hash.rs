//! Content hashing.
//!
//! Videos are checksummed with MD5 by streaming the stored file through the
//! digest [`CHUNK_SIZE`] bytes at a time, so memory use does not depend on
//! the size of the video. The hash is displayed to users; it is not used to
//! deduplicate content.

use std::io::{ErrorKind as IoErrorKind, Read, Result as IoResult};

/// Number of bytes read from the source per digest update.
pub const CHUNK_SIZE: usize = 4096;

/// Lowercase hex MD5 of an in-memory buffer.
pub fn hash_bytes(data: impl AsRef<[u8]>) -> String {
    format!("{:x}", md5::compute(data))
}

/// Lowercase hex MD5 of everything `reader` yields.
///
/// Short reads are fine: each chunk is folded into the running digest as it
/// arrives.
pub fn hash_reader(mut reader: impl Read) -> IoResult<String> {
    let mut context = md5::Context::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        context.consume(&buffer[..read]);
    }
    Ok(format!("{:x}", context.compute()))
}
