//! Strong ETags derived from file content.

use std::io;
use std::path::Path;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use tokio::io::AsyncReadExt;

use crate::config::{EtagAlgorithm, EtagConfig, EtagEncoding};

const READ_CHUNK: usize = 64 * 1024;

/// Hash the file at `path` and wrap the encoded digest in quotes.
pub async fn compute_etag(path: &Path, config: &EtagConfig) -> io::Result<String> {
    let digest = match config.algorithm {
        EtagAlgorithm::Sha1 => digest_file::<Sha1>(path).await?,
        EtagAlgorithm::Sha256 => digest_file::<Sha256>(path).await?,
        EtagAlgorithm::Sha384 => digest_file::<Sha384>(path).await?,
        EtagAlgorithm::Sha512 => digest_file::<Sha512>(path).await?,
    };
    Ok(format!("\"{}\"", encode(&digest, config.encoding)))
}

async fn digest_file<D: Digest + Send>(path: &Path) -> io::Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = D::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_vec())
}

fn encode(digest: &[u8], encoding: EtagEncoding) -> String {
    match encoding {
        EtagEncoding::Base64 => STANDARD.encode(digest),
        EtagEncoding::Base64url => URL_SAFE_NO_PAD.encode(digest),
        EtagEncoding::Hex => hex::encode(digest),
    }
}
