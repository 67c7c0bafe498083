/// External fixtures provider client.
pub mod fixtures;
/// Database model definitions.
pub mod models;
/// Pool, prediction and catalog storage backends.
pub mod pool_store;
/// Local JSON snapshot used while the remote store is offline.
pub mod snapshot;
/// Storage abstraction layer for database operations.
pub mod storage;
