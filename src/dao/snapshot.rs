//! Local JSON snapshot holding the offline copy of pools and the saved user profiles.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{fs, sync::Mutex};

use crate::{dao::models::PoolEntity, state::session::UserProfile};

/// Failures while reading or writing the snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write snapshot `{}`", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot `{}` is not valid JSON", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize snapshot")]
    Serialize(#[source] serde_json::Error),
}

/// Contents of the snapshot file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
    #[serde(default)]
    pub pools: Vec<PoolEntity>,
    #[serde(default)]
    pub profiles: Vec<UserProfile>,
}

/// Snapshot file on disk. Writes are serialized and replace the file atomically.
pub struct SnapshotFile {
    path: PathBuf,
    write_gate: Mutex<()>,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_gate: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot. A missing file yields an empty snapshot.
    pub async fn load(&self) -> Result<SnapshotData, SnapshotError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(SnapshotData::default()),
            Err(source) => {
                return Err(SnapshotError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&contents).map_err(|source| SnapshotError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Write `data` to a sibling temp file, then rename it over the snapshot.
    pub async fn save(&self, data: &SnapshotData) -> Result<(), SnapshotError> {
        let body = serde_json::to_vec_pretty(data).map_err(SnapshotError::Serialize)?;
        let _gate = self.write_gate.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| self.write_error(source))?;
        }
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, body)
            .await
            .map_err(|source| self.write_error(source))?;
        fs::rename(&staging, &self.path)
            .await
            .map_err(|source| self.write_error(source))
    }

    fn write_error(&self, source: std::io::Error) -> SnapshotError {
        SnapshotError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};
    use uuid::Uuid;

    use super::*;
    use crate::state::league::{League, Season};

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("pollamania-snapshot-{}", Uuid::new_v4()))
            .join(name)
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let snapshot = SnapshotFile::new(scratch_path("absent.json"));
        assert_eq!(snapshot.load().await.unwrap(), SnapshotData::default());
    }

    #[tokio::test]
    async fn saved_data_loads_back() {
        let snapshot = SnapshotFile::new(scratch_path("snapshot.json"));
        let data = SnapshotData {
            pools: vec![PoolEntity {
                id: Uuid::new_v4(),
                name: "Familia".into(),
                description: Some("Serie A".into()),
                owner: "u1".into(),
                league: League::SerieA,
                season: Season::new(2024).unwrap(),
                start_date: date!(2024 - 08 - 17),
                end_date: date!(2025 - 05 - 25),
                participants: vec!["u1".into(), "u2".into()],
                created_at: datetime!(2024-08-01 10:00 UTC),
                updated_at: datetime!(2024-08-02 10:00 UTC),
            }],
            profiles: vec![UserProfile {
                user_id: "u1".into(),
                display_name: "Ana".into(),
                email: "ana@example.com".into(),
                avatar: None,
                address: Some("Calle 10".into()),
            }],
        };

        snapshot.save(&data).await.unwrap();
        assert_eq!(snapshot.load().await.unwrap(), data);
    }

    #[tokio::test]
    async fn garbage_is_a_parse_error() {
        let path = scratch_path("broken.json");
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(&path, "{not json").await.unwrap();
        let err = SnapshotFile::new(path).load().await.unwrap_err();
        assert!(matches!(err, SnapshotError::Parse { .. }));
    }
}
