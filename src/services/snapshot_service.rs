//! Keeps the local JSON snapshot in step with the in-memory pool cache and profiles.

use tracing::{info, warn};

use crate::{
    dao::{models::PoolEntity, snapshot::SnapshotData},
    state::{SharedState, pool::sort_pools},
};

/// Load pools and profiles from the snapshot into memory. Failures leave the caches empty.
pub async fn restore(state: &SharedState) {
    match state.snapshot().load().await {
        Ok(data) => {
            let pools = data.pools.len();
            let profiles = data.profiles.len();
            state
                .pools()
                .replace_all(data.pools.into_iter().map(Into::into));
            state.sessions().restore(data.profiles);
            info!(
                path = %state.snapshot().path().display(),
                pools,
                profiles,
                "restored local snapshot"
            );
        }
        Err(err) => warn!(error = %err, "failed to restore local snapshot; starting empty"),
    }
}

/// Write the current pools and profiles to the snapshot. Errors are logged, not returned.
pub async fn persist(state: &SharedState) {
    let mut pools = state.pools().all();
    sort_pools(&mut pools);
    let data = SnapshotData {
        pools: pools.into_iter().map(PoolEntity::from).collect(),
        profiles: state.sessions().profiles(),
    };
    if let Err(err) = state.snapshot().save(&data).await {
        warn!(error = %err, "failed to persist local snapshot");
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::state::{
        league::LeagueTable,
        pool::{Pool, tests::draft},
        tests::memory_state,
    };

    #[tokio::test]
    async fn persisted_state_is_restored() {
        let (state, _store) = memory_state().await;
        let pool = Pool::create(
            "alice".into(),
            draft(),
            &LeagueTable::default(),
            datetime!(2024-07-20 10:00 UTC),
        )
        .unwrap();
        state.pools().replace(pool.clone());
        state
            .sessions()
            .login("alice", "Alice", "alice@example.com", datetime!(2024-07-20 10:00 UTC));
        persist(&state).await;

        state.pools().replace_all(Vec::new());
        restore(&state).await;
        assert_eq!(state.pools().get(pool.id), Some(pool));
        assert!(state.sessions().profile("alice").is_some());
    }
}
