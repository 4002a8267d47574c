//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. The cache is
//! synchronous and never waits on I/O, so handlers call it directly.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Duration;
use serde_json::Value;

use crate::cache::{Cache, MemoryAdapter};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, DeleteResponse, ExpireRequest, ExpireResponse, GetResponse, HealthResponse,
    KeysResponse, MessageResponse, SetIfNotExistResponse, SetRequest, SetResponse, StatsResponse,
    UpdateExpireResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache served over HTTP
    pub cache: Arc<Cache<String, Value>>,
    /// TTL applied to writes that carry none
    pub default_ttl: Duration,
}

impl AppState {
    pub fn new(cache: Arc<Cache<String, Value>>, default_ttl: Duration) -> Self {
        Self { cache, default_ttl }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds a memory adapter with the configured capacity and janitor
    /// period.
    pub fn from_config(config: &Config) -> Self {
        let adapter: Arc<MemoryAdapter<String, Value>> =
            Arc::new(MemoryAdapter::from_config(config));
        Self::new(
            Arc::new(Cache::with_adapter(adapter)),
            Duration::milliseconds(config.default_ttl_ms),
        )
    }

    fn ttl(&self, ttl_ms: Option<i64>) -> Result<Duration> {
        ttl_ms.map_or(Ok(self.default_ttl), ttl_from_millis)
    }
}

fn ttl_from_millis(ttl_ms: i64) -> Result<Duration> {
    Duration::try_milliseconds(ttl_ms)
        .ok_or_else(|| CacheError::InvalidRequest(format!("ttl_ms {} is out of range", ttl_ms)))
}

fn checked_key(key: String) -> Result<String> {
    match validate_key(&key) {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(key),
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair; a negative `ttl_ms` removes the key.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = state.ttl(req.ttl_ms)?;
    state.cache.set(req.key.clone(), req.value, ttl)?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for PUT /setnx
pub async fn set_if_not_exist_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetIfNotExistResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = state.ttl(req.ttl_ms)?;
    let stored = state.cache.set_if_not_exist(req.key.clone(), req.value, ttl)?;

    Ok(Json(SetIfNotExistResponse {
        key: req.key,
        stored,
    }))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let key = checked_key(key)?;
    match state.cache.get(&key)? {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
///
/// Deleting a missing key is not an error; the response value is null.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let key = checked_key(key)?;
    let value = state.cache.remove(std::slice::from_ref(&key))?;

    Ok(Json(DeleteResponse { key, value }))
}

/// Handler for GET /expire/:key
pub async fn get_expire_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ExpireResponse>> {
    let key = checked_key(key)?;
    let ttl = state.cache.get_expire(&key)?;

    Ok(Json(ExpireResponse {
        key,
        ttl_ms: ttl.num_milliseconds(),
    }))
}

/// Handler for PUT /expire/:key
pub async fn update_expire_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<ExpireRequest>,
) -> Result<Json<UpdateExpireResponse>> {
    let key = checked_key(key)?;
    let previous = state.cache.update_expire(&key, ttl_from_millis(req.ttl_ms)?)?;

    Ok(Json(UpdateExpireResponse {
        key,
        previous_ttl_ms: previous.num_milliseconds(),
    }))
}

/// Handler for GET /keys
pub async fn keys_handler(State(state): State<AppState>) -> Result<Json<KeysResponse>> {
    let mut keys = state.cache.keys()?;
    keys.sort();
    let size = keys.len();

    Ok(Json(KeysResponse { keys, size }))
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<MessageResponse>> {
    state.cache.clear()?;
    Ok(Json(MessageResponse::new("Cache cleared")))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let stats = state.cache.stats()?;
    Ok(Json(StatsResponse::from(stats)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_state() -> AppState {
        AppState::new(Arc::new(Cache::with_capacity(100)), Duration::zero())
    }

    fn set_request(key: &str, value: Value, ttl_ms: Option<i64>) -> Json<SetRequest> {
        Json(SetRequest {
            key: key.to_string(),
            value,
            ttl_ms,
        })
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state();

        let req = set_request("test_key", json!({"a": [1, 2]}), None);
        let result = set_handler(State(state.clone()), req).await;
        assert!(result.is_ok());

        let response = get_handler(State(state), Path("test_key".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, json!({"a": [1, 2]}));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state();

        let result = get_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_negative_ttl_removes() {
        let state = test_state();
        set_handler(State(state.clone()), set_request("k", json!(1), None))
            .await
            .unwrap();

        set_handler(State(state.clone()), set_request("k", json!(2), Some(-1)))
            .await
            .unwrap();

        assert!(!state.cache.contains(&"k".to_string()).unwrap());
    }

    #[tokio::test]
    async fn test_default_ttl_applies() {
        let state = AppState::new(Arc::new(Cache::new()), Duration::seconds(30));
        set_handler(State(state.clone()), set_request("k", json!(1), None))
            .await
            .unwrap();

        let response = get_expire_handler(State(state), Path("k".to_string()))
            .await
            .unwrap();
        assert!(response.ttl_ms > 29_000 && response.ttl_ms <= 30_000);
    }

    #[tokio::test]
    async fn test_setnx_handler() {
        let state = test_state();

        let first = set_if_not_exist_handler(State(state.clone()), set_request("k", json!(1), None))
            .await
            .unwrap();
        let second =
            set_if_not_exist_handler(State(state.clone()), set_request("k", json!(2), None))
                .await
                .unwrap();

        assert!(first.stored);
        assert!(!second.stored);
        assert_eq!(state.cache.get(&"k".to_string()).unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = test_state();
        set_handler(State(state.clone()), set_request("to_delete", json!("v"), None))
            .await
            .unwrap();

        let response = delete_handler(State(state.clone()), Path("to_delete".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, Some(json!("v")));

        let response = delete_handler(State(state), Path("to_delete".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, None);
    }

    #[tokio::test]
    async fn test_expire_handlers() {
        let state = test_state();

        let missing = get_expire_handler(State(state.clone()), Path("x".to_string()))
            .await
            .unwrap();
        assert_eq!(missing.ttl_ms, -1);

        set_handler(State(state.clone()), set_request("x", json!(1), Some(1_000)))
            .await
            .unwrap();
        let updated = update_expire_handler(
            State(state.clone()),
            Path("x".to_string()),
            Json(ExpireRequest { ttl_ms: 0 }),
        )
        .await
        .unwrap();
        assert!(updated.previous_ttl_ms > 0 && updated.previous_ttl_ms <= 1_000);

        let forever = get_expire_handler(State(state), Path("x".to_string()))
            .await
            .unwrap();
        assert_eq!(forever.ttl_ms, 0);
    }

    #[tokio::test]
    async fn test_keys_and_clear_handlers() {
        let state = test_state();
        for key in ["b", "a"] {
            set_handler(State(state.clone()), set_request(key, json!(null), None))
                .await
                .unwrap();
        }

        let response = keys_handler(State(state.clone())).await.unwrap();
        assert_eq!(response.keys, vec!["a", "b"]);
        assert_eq!(response.size, 2);

        clear_handler(State(state.clone())).await.unwrap();
        let response = keys_handler(State(state)).await.unwrap();
        assert_eq!(response.size, 0);
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        get_handler(State(state.clone()), Path("missing".to_string()))
            .await
            .unwrap_err();

        let response = stats_handler(State(state)).await.unwrap();
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 1);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_out_of_range_ttl_is_rejected() {
        let state = test_state();

        let result =
            set_handler(State(state.clone()), set_request("k", json!(1), Some(i64::MIN))).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
        assert!(!state.cache.contains(&"k".to_string()).unwrap());

        set_handler(State(state.clone()), set_request("k", json!(1), None))
            .await
            .unwrap();
        let result = update_expire_handler(
            State(state.clone()),
            Path("k".to_string()),
            Json(ExpireRequest { ttl_ms: i64::MIN }),
        )
        .await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
        assert_eq!(state.cache.get_expire(&"k".to_string()).unwrap(), Duration::zero());
    }

    #[tokio::test]
    async fn test_far_future_ttl_never_expires() {
        let state = test_state();
        set_handler(State(state.clone()), set_request("k", json!(1), Some(i64::MAX)))
            .await
            .unwrap();

        let response = get_expire_handler(State(state), Path("k".to_string()))
            .await
            .unwrap();
        assert_eq!(response.ttl_ms, 0);
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let state = test_state();

        let result = set_handler(State(state), set_request("", json!("value"), None)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }
}
