//! Pool operations. Writes go to the remote store first and only then touch the local cache
//! and snapshot; reads prefer the remote store and fall back to the local cache while offline.

use std::{collections::HashMap, sync::Arc};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{models::PoolEntity, pool_store::Storage},
    dto::pool::{
        AddMemberRequest, CreatePoolRequest, PoolDetailResponse, PoolListResponse, PoolResponse,
        UpdatePoolRequest,
    },
    error::ServiceError,
    services::{snapshot_service, sse_events},
    state::{
        SharedState,
        league::Season,
        pool::{Pool, PoolDraft, PoolFilter, PoolId, sort_pools},
        timestamp_now, today,
    },
};

/// Outcome of a reconciliation between the local cache and the remote store.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Local records replaced by a newer remote copy, or added from remote.
    pub pulled: usize,
    /// Remote records overwritten by a newer local copy.
    pub pushed: usize,
    /// Local records dropped because they no longer exist remotely.
    pub dropped: usize,
}

fn ensure_participant(pool: &Pool, user: &str) -> Result<(), ServiceError> {
    if pool.is_participant(user) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "user `{user}` is not a participant of pool `{}`",
            pool.id
        )))
    }
}

fn ensure_owner(pool: &Pool, user: &str) -> Result<(), ServiceError> {
    if pool.is_owner(user) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "only the owner can modify pool `{}`",
            pool.id
        )))
    }
}

fn pool_not_found(id: PoolId) -> ServiceError {
    ServiceError::NotFound(format!("pool `{id}` not found"))
}

/// Read a pool from the authoritative store, refreshing the local copy.
async fn load_remote(
    state: &SharedState,
    store: &Arc<dyn Storage>,
    id: PoolId,
) -> Result<Pool, ServiceError> {
    match store.find_pool(id).await? {
        Some(entity) => {
            let pool = Pool::from(entity);
            state.pools().replace(pool.clone());
            Ok(pool)
        }
        None => {
            state.pools().remove(id);
            Err(pool_not_found(id))
        }
    }
}

/// Whether `user` still participates in the pool according to the remote store.
pub async fn is_remote_participant(
    store: &Arc<dyn Storage>,
    id: PoolId,
    user: &str,
) -> Result<bool, ServiceError> {
    Ok(store
        .find_pool(id)
        .await?
        .map(Pool::from)
        .is_some_and(|pool| pool.is_participant(user)))
}

/// Resolve a pool, returning whether it came from the local cache because the store is offline.
pub async fn load_pool(state: &SharedState, id: PoolId) -> Result<(Pool, bool), ServiceError> {
    if let Some(store) = state.storage().await {
        match load_remote(state, &store, id).await {
            Ok(pool) => return Ok((pool, false)),
            Err(ServiceError::Unavailable(err)) => {
                warn!(pool_id = %id, error = %err, "remote pool read failed; serving local copy");
            }
            Err(err) => return Err(err),
        }
    }

    state
        .pools()
        .get(id)
        .map(|pool| (pool, true))
        .ok_or_else(|| pool_not_found(id))
}

/// Resolve a pool the caller participates in.
pub async fn load_pool_for(
    state: &SharedState,
    id: PoolId,
    requester: &str,
) -> Result<(Pool, bool), ServiceError> {
    let (pool, offline) = load_pool(state, id).await?;
    ensure_participant(&pool, requester)?;
    Ok((pool, offline))
}

/// Validate and persist a new pool owned by `owner`.
pub async fn create_pool(
    state: &SharedState,
    owner: &str,
    request: CreatePoolRequest,
) -> Result<PoolResponse, ServiceError> {
    let draft = PoolDraft {
        name: request.name,
        description: request.description,
        league: request.league,
        season: Season::new(request.season)?,
        start_date: request.start_date,
        end_date: request.end_date,
    };
    let pool = Pool::create(
        owner.to_owned(),
        draft,
        state.fixtures().leagues(),
        timestamp_now(),
    )?;

    let store = state.require_storage().await?;
    store.save_pool(pool.clone().into()).await?;
    state.pools().replace(pool.clone());
    snapshot_service::persist(state).await;

    info!(pool_id = %pool.id, owner, league = %pool.league, season = %pool.season, "pool created");
    sse_events::broadcast_pool_created(state.public_sse(), pool.id);
    Ok(PoolResponse::from_pool(pool, today()))
}

/// Pools the user participates in, ordered by start date then name.
pub async fn list_pools(
    state: &SharedState,
    user: &str,
    filter: PoolFilter,
) -> Result<PoolListResponse, ServiceError> {
    let (mut pools, offline) = match state.storage().await {
        Some(store) => match store.list_pools_for_user(user.to_owned()).await {
            Ok(entities) => {
                let remote: Vec<Pool> = entities.into_iter().map(Pool::from).collect();
                for stale in state.pools().for_user(user) {
                    if !remote.iter().any(|pool| pool.id == stale.id) {
                        state.pools().remove(stale.id);
                    }
                }
                for pool in &remote {
                    state.pools().replace(pool.clone());
                }
                snapshot_service::persist(state).await;
                (remote, false)
            }
            Err(err) => {
                warn!(user, error = %err, "remote pool listing failed; serving local copy");
                (state.pools().for_user(user), true)
            }
        },
        None => (state.pools().for_user(user), true),
    };

    let today = today();
    pools.retain(|pool| filter.accepts(pool, today));
    sort_pools(&mut pools);
    Ok(PoolListResponse {
        pools: pools
            .into_iter()
            .map(|pool| PoolResponse::from_pool(pool, today))
            .collect(),
        offline,
    })
}

/// One pool, visible to its participants only.
pub async fn get_pool(
    state: &SharedState,
    id: PoolId,
    requester: &str,
) -> Result<PoolDetailResponse, ServiceError> {
    let (pool, offline) = load_pool_for(state, id, requester).await?;
    Ok(PoolDetailResponse {
        pool: PoolResponse::from_pool(pool, today()),
        offline,
    })
}

async fn commit_update(
    state: &SharedState,
    store: &Arc<dyn Storage>,
    pool: Pool,
) -> Result<PoolResponse, ServiceError> {
    store.save_pool(pool.clone().into()).await?;
    state.pools().replace(pool.clone());
    snapshot_service::persist(state).await;
    sse_events::broadcast_pool_updated(state.public_sse(), pool.id);
    Ok(PoolResponse::from_pool(pool, today()))
}

/// Rename the pool or change its description. Owner only.
pub async fn update_pool(
    state: &SharedState,
    id: PoolId,
    requester: &str,
    request: UpdatePoolRequest,
) -> Result<PoolResponse, ServiceError> {
    let store = state.require_storage().await?;
    let pool = load_remote(state, &store, id).await?;
    ensure_owner(&pool, requester)?;

    let next = pool.with_changes(request.into(), timestamp_now())?;
    debug!(pool_id = %id, "updating pool metadata");
    commit_update(state, &store, next).await
}

/// Add a participant. Adding an existing participant is a no-op. Owner only.
pub async fn add_member(
    state: &SharedState,
    id: PoolId,
    requester: &str,
    request: AddMemberRequest,
) -> Result<PoolResponse, ServiceError> {
    let store = state.require_storage().await?;
    let pool = load_remote(state, &store, id).await?;
    ensure_owner(&pool, requester)?;

    let Some(next) = pool.with_member(&request.user_id, timestamp_now()) else {
        return Ok(PoolResponse::from_pool(pool, today()));
    };
    let response = commit_update(state, &store, next).await?;
    state.standings().invalidate_pool(id);
    info!(pool_id = %id, user_id = %request.user_id, "participant added");
    Ok(response)
}

/// Remove a participant and their predictions in the pool. Owner only; the owner stays.
pub async fn remove_member(
    state: &SharedState,
    id: PoolId,
    requester: &str,
    user_id: &str,
) -> Result<PoolResponse, ServiceError> {
    let store = state.require_storage().await?;
    let pool = load_remote(state, &store, id).await?;
    ensure_owner(&pool, requester)?;
    if pool.is_owner(user_id) {
        return Err(ServiceError::InvalidInput(
            "the owner cannot be removed from their pool".into(),
        ));
    }

    let next = pool.without_member(user_id, timestamp_now()).ok_or_else(|| {
        ServiceError::NotFound(format!("user `{user_id}` is not a participant of pool `{id}`"))
    })?;
    // predictions go first so a failed cascade leaves the participant in place
    let removed = store
        .delete_user_predictions(id, user_id.to_owned())
        .await?;
    let response = commit_update(state, &store, next).await?;
    // sweep writes that passed the membership check before the removal committed
    match store.delete_user_predictions(id, user_id.to_owned()).await {
        Ok(0) => {}
        Ok(late) => debug!(pool_id = %id, user_id, late, "late predictions swept"),
        Err(err) => warn!(pool_id = %id, user_id, error = %err, "post-removal sweep failed"),
    }
    state.standings().invalidate_pool(id);
    info!(pool_id = %id, user_id, predictions = removed, "participant removed");
    Ok(response)
}

/// Delete the pool and every prediction in it. Owner only.
pub async fn delete_pool(
    state: &SharedState,
    id: PoolId,
    requester: &str,
) -> Result<(), ServiceError> {
    let store = state.require_storage().await?;
    let pool = load_remote(state, &store, id).await?;
    ensure_owner(&pool, requester)?;

    if !store.delete_pool(id).await? {
        debug!(pool_id = %id, "pool already removed remotely");
    }
    state.pools().remove(id);
    state.standings().invalidate_pool(id);
    snapshot_service::persist(state).await;

    info!(pool_id = %id, "pool deleted");
    sse_events::broadcast_pool_deleted(state.public_sse(), id);
    Ok(())
}

/// Align the local cache with the remote store, last writer wins per pool by `updated_at`.
/// Local records missing remotely are dropped.
pub async fn reconcile(
    state: &SharedState,
    store: &Arc<dyn Storage>,
) -> Result<ReconcileReport, ServiceError> {
    let remote: HashMap<Uuid, Pool> = store
        .list_pools()
        .await?
        .into_iter()
        .map(|entity| (entity.id, Pool::from(entity)))
        .collect();
    let local: HashMap<Uuid, Pool> = state
        .pools()
        .all()
        .into_iter()
        .map(|pool| (pool.id, pool))
        .collect();

    let mut report = ReconcileReport::default();
    let mut merged = Vec::with_capacity(remote.len());
    for (id, remote_pool) in remote {
        match local.get(&id) {
            Some(local_pool) if local_pool.updated_at > remote_pool.updated_at => {
                store
                    .save_pool(PoolEntity::from(local_pool.clone()))
                    .await?;
                report.pushed += 1;
                merged.push(local_pool.clone());
            }
            Some(local_pool) if *local_pool == remote_pool => merged.push(remote_pool),
            _ => {
                report.pulled += 1;
                merged.push(remote_pool);
            }
        }
    }
    report.dropped = local
        .keys()
        .filter(|id| !merged.iter().any(|pool| pool.id == **id))
        .count();

    state.pools().replace_all(merged);
    snapshot_service::persist(state).await;
    info!(
        pulled = report.pulled,
        pushed = report.pushed,
        dropped = report.dropped,
        "local pool cache reconciled"
    );
    Ok(report)
}
