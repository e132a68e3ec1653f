mod access;
mod cache;
mod db;
mod engine;
mod errors;
mod item;
mod key;
mod profile;
mod writer;

pub mod registry;
pub mod utils;

pub mod prelude {
    use crate::{db, errors};

    pub use super::access::CachedDbAccess;
    pub use super::cache::Cache;
    pub use super::engine::{CompactionOutcome, StorageEngine};
    pub use super::item::CachedDbItem;
    pub use super::key::DbKey;
    pub use super::profile::{ParseProfileError, StorageProfile};
    pub use super::writer::{BatchDbWriter, DbWriter, DirectDbWriter};
    pub use db::{ConnBuilder, ConnBuilderError, DB, delete_db};
    pub use errors::{StoreError, StoreResult, StoreResultExtensions};
}
