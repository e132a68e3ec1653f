use enum_primitive_derive::Primitive;

/// Separator between a store prefix and its bucket, never used as a prefix itself
pub const SEPARATOR: u8 = u8::MAX;

#[derive(Primitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DatabaseStorePrefixes {
    // ---- Metadata ----
    SchemaVersion = 1,
    DatabaseHealth = 2,

    // ---- Checkpoints ----
    LatestCheckpoint = 10,
    SolidCheckpoint = 11,
    PruningIndex = 12,
    CheckpointMarkers = 13,

    // ---- Tangle ----
    Entries = 20,
    SolidEntries = 21,

    // ---- Separator ----
    /// Reserved as a separator
    Separator = SEPARATOR,
}

impl From<DatabaseStorePrefixes> for Vec<u8> {
    fn from(value: DatabaseStorePrefixes) -> Self {
        [value as u8].to_vec()
    }
}

impl From<DatabaseStorePrefixes> for u8 {
    fn from(value: DatabaseStorePrefixes) -> Self {
        value as u8
    }
}
