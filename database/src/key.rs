use crate::registry::{DatabaseStorePrefixes, SEPARATOR};
use num_traits::FromPrimitive;
use std::fmt::{Debug, Display};

/// A full database key: the store prefix followed by the encoded item key
#[derive(Clone, PartialEq, Eq)]
pub struct DbKey {
    path: Vec<u8>,
    prefix_len: usize,
}

impl DbKey {
    pub fn new<TKey>(prefix: &[u8], key: TKey) -> Self
    where
        TKey: AsRef<[u8]>,
    {
        Self { path: prefix.iter().chain(key.as_ref().iter()).copied().collect(), prefix_len: prefix.len() }
    }

    pub fn prefix_only(prefix: &[u8]) -> Self {
        Self::new(prefix, [])
    }

    /// Appends a separator and a bucket to the prefix part of the key
    pub fn add_bucket<TBucket>(&mut self, bucket: TBucket)
    where
        TBucket: Copy + AsRef<[u8]>,
    {
        self.path.push(SEPARATOR);
        self.path.extend(bucket.as_ref().iter());
        self.prefix_len += 1 + bucket.as_ref().len();
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }
}

impl AsRef<[u8]> for DbKey {
    fn as_ref(&self) -> &[u8] {
        &self.path
    }
}

impl Display for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (prefix, key) = self.path.split_at(self.prefix_len);
        match prefix.first().and_then(|b| DatabaseStorePrefixes::from_u8(*b)) {
            Some(store) if prefix.len() == 1 => write!(f, "{:?}/", store)?,
            _ => f.write_str(&faster_hex::hex_string(prefix))?,
        }
        f.write_str(&faster_hex::hex_string(key))
    }
}

impl Debug for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = DbKey::new(&[DatabaseStorePrefixes::CheckpointMarkers as u8], 7u32.to_be_bytes());
        assert_eq!(key.to_string(), "CheckpointMarkers/00000007");
        assert_eq!(key.prefix_len(), 1);
        assert_eq!(key.as_ref(), &[13, 0, 0, 0, 7]);

        let raw = DbKey::new(&[0xaa, 0xbb], [0x01]);
        assert_eq!(raw.to_string(), "aabb01");
    }

    #[test]
    fn test_bucket() {
        let mut key = DbKey::prefix_only(&[DatabaseStorePrefixes::Entries as u8]);
        key.add_bucket([4u8]);
        assert_eq!(key.as_ref(), &[20, SEPARATOR, 4]);
        assert_eq!(key.prefix_len(), 3);
    }
}
