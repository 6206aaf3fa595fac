use sha2::{Digest, Sha256};

/// Calculate SHA256 hash of content and return it as a hex string
pub fn calculate_sha256(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    format!("{:x}", digest)
}
