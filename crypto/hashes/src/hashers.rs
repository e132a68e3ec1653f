use crate::{HASH_SIZE, Hash};

pub trait Hasher: Default {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self;
    fn finalize(self) -> Hash;

    fn hash<A: AsRef<[u8]>>(data: A) -> Hash {
        let mut hasher = Self::default();
        hasher.update(data);
        hasher.finalize()
    }
}

/// Keyed blake2b hasher deriving checkpoint marker identifiers
#[derive(Clone)]
pub struct MarkerIdHasher(blake2b_simd::State);

impl MarkerIdHasher {
    const DOMAIN: &'static [u8] = b"CheckpointMarker";

    pub fn new() -> Self {
        Self(blake2b_simd::Params::new().hash_length(HASH_SIZE).key(Self::DOMAIN).to_state())
    }
}

impl Default for MarkerIdHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for MarkerIdHasher {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.0.update(data.as_ref());
        self
    }

    fn finalize(self) -> Hash {
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(self.0.finalize().as_bytes());
        Hash::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_hasher_is_keyed_and_incremental() {
        let whole = MarkerIdHasher::hash(b"checkpoint-17");
        let mut split = MarkerIdHasher::new();
        split.update(b"checkpoint").update(b"-17");
        assert_eq!(split.finalize(), whole);

        let unkeyed = blake2b_simd::Params::new().hash_length(HASH_SIZE).hash(b"checkpoint-17");
        assert_ne!(&whole.as_bytes()[..], unkeyed.as_bytes());
    }
}
