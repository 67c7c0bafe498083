use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save pool `{id}`")]
    SavePool {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load pool `{id}`")]
    LoadPool {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list pools")]
    ListPools {
        #[source]
        source: MongoError,
    },
    #[error("failed to delete pool `{id}`")]
    DeletePool {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save prediction `{key}`")]
    SavePrediction {
        key: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list predictions of pool `{pool_id}`")]
    ListPredictions {
        pool_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete predictions of pool `{pool_id}`")]
    DeletePredictions {
        pool_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save catalog document `{id}` in `{collection}`")]
    SaveCatalog {
        collection: &'static str,
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load catalog documents from `{collection}`")]
    LoadCatalog {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("stored document `{id}` is malformed: {reason}")]
    Malformed { id: String, reason: String },
}
