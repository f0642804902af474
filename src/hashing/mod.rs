use blake3::Hasher;

/// Hex-encoded BLAKE3 checksum of an entity's derivable text.
///
/// Stored on the entity row once its vectors are upserted; the freshness worker compares it
/// against the current text to skip re-embedding unchanged entities.
#[inline]
pub fn content_checksum(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// Used for numeric vector point ids. Collisions are tolerated: the string id is kept in the
/// point payload and checked on the way back.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

/// Numeric point id for a `"<entity_id>:<facet>"` vector id within a namespace.
#[inline]
pub fn point_id(namespace: &str, vector_id: &str) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b"|");
    hasher.update(vector_id.as_bytes());

    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_content_checksum_determinism() {
        let text = "Skills: rust, sql | Experience: 4 years backend";
        assert_eq!(content_checksum(text), content_checksum(text));
        assert_eq!(content_checksum(text).len(), 64);
    }

    #[test]
    fn test_content_checksum_sensitivity() {
        let a = content_checksum("Skills: rust");
        let b = content_checksum("Skills: rust ");
        let c = content_checksum("skills: rust");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hash_to_u64_determinism() {
        let data = b"seeker-001:skills";
        assert_eq!(hash_to_u64(data), hash_to_u64(data));
    }

    #[test]
    fn test_point_id_namespace_sensitivity() {
        let seekers = point_id("job_seekers", "abc:skills");
        let posts = point_id("job_posts", "abc:skills");
        assert_ne!(seekers, posts);
    }

    #[test]
    fn test_point_id_uniqueness() {
        let ids = ["a:skills", "a:experience", "b:skills", "a:skills "];
        let hashes: HashSet<_> = ids.iter().map(|id| point_id("ns", id)).collect();
        assert_eq!(hashes.len(), ids.len());
    }
}
