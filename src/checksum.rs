use std::fs::File;
use std::io::Read;
use std::path::Path;

use md5::Md5;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::BenchError;

const READ_BUFFER: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checksums {
    pub md5: String,
    pub sha256: String,
}

/// Streams the file once, feeding both digests.
pub fn compute_checksums(path: &Path) -> Result<Checksums, BenchError> {
    let file = File::open(path)
        .map_err(|err| BenchError::Checksum(format!("open {}: {err}", path.display())))?;
    digest_reader(file).map_err(|err| BenchError::Checksum(format!("read {}: {err}", path.display())))
}

pub fn digest_reader<R: Read>(mut reader: R) -> std::io::Result<Checksums> {
    let mut md5 = Md5::new();
    let mut sha256 = Sha256::new();
    let mut buf = vec![0u8; READ_BUFFER];
    loop {
        let read = reader.read(&mut buf)?;
        if read == 0 {
            break;
        }
        md5.update(&buf[..read]);
        sha256.update(&buf[..read]);
    }
    Ok(Checksums {
        md5: hex::encode(md5.finalize()),
        sha256: hex::encode(sha256.finalize()),
    })
}
