use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};

use super::models::*;
use super::server::AppState;
use super::websocket::{ServerEvent, StatusUpdate};
use crate::devices::Device;
use crate::error::{RegistryError, Result};
use crate::log_device_operation;

/// Get all devices in insertion order
pub async fn list_devices(State(state): State<AppState>) -> Json<Vec<Device>> {
    let devices = state.store.read().await.list();
    tracing::debug!(count = devices.len(), "Listing devices");
    Json(devices)
}

/// Set a device's status and broadcast the change
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateStatusRequest>,
) -> Result<Json<DeviceMessageResponse>> {
    // Publish while still holding the store lock so subscribers observe
    // updates in the same order the store applied them.
    let mut store = state.store.write().await;
    // Unknown ids are reported before the body is checked
    if !store.contains(&id) {
        return Err(RegistryError::DeviceNotFound(id));
    }
    let status = req.status()?;
    let device = store.update_status(&id, status)?;

    log_device_operation!("update_status", device.id, device.status);

    state
        .subscribers
        .publish(&ServerEvent::Update(StatusUpdate {
            id: device.id.clone(),
            status: device.status,
        }))
        .await;
    drop(store);

    Ok(Json(DeviceMessageResponse::status_changed(device)))
}

/// Rename a device. Renames are not broadcast.
pub async fn rename_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<RenameDeviceRequest>,
) -> Result<Json<DeviceMessageResponse>> {
    let mut store = state.store.write().await;
    if !store.contains(&id) {
        return Err(RegistryError::DeviceNotFound(id));
    }
    let name = req.into_name()?;
    let device = store.rename(&id, name)?;
    drop(store);

    log_device_operation!("rename", device.id, device.name);

    Ok(Json(DeviceMessageResponse::renamed(device)))
}

/// Register a new device
pub async fn create_device(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateDeviceRequest>,
) -> Result<impl IntoResponse> {
    let device = req.into_device()?;
    state.store.write().await.insert(device.clone());

    log_device_operation!("create", device.id);

    Ok((StatusCode::CREATED, Json(device)))
}

/// Remove every device with the given id. Always acknowledges.
pub async fn delete_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<DeleteResponse> {
    let removed = state.store.write().await.remove(&id);

    log_device_operation!("delete", id, removed);

    Json(DeleteResponse::deleted())
}

/// Health check
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let devices = state.store.read().await.len();
    let subscribers = state.subscribers.subscriber_count().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "device-registry".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        devices,
        subscribers,
    })
}

/// 404 Not Found handler
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::server::create_router;
    use crate::devices::DeviceStore;
    use axum::{
        body::{to_bytes, Body},
        extract::ws::Message,
        http::{Method, Request},
        Router,
    };
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState::new(DeviceStore::seeded(), Duration::from_secs(30))
    }

    async fn send(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            },
            None => Body::empty(),
        };
        let response = router.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_list_seeded_devices() {
        let router = create_router(test_state());
        let (status, body) = send(router, Method::GET, "/devices", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                { "id": "1", "name": "Luz da sala", "status": false },
                { "id": "2", "name": "Luz da sala 2", "status": true },
                { "id": "3", "name": "Porta", "status": true }
            ])
        );
    }

    #[tokio::test]
    async fn test_patch_status_broadcasts_once() {
        let state = test_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.subscribers.register(tx).await;

        let router = create_router(state.clone());
        let (status, body) = send(
            router,
            Method::PATCH,
            "/devices/1",
            Some(json!({ "status": true })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "message": "Luz da sala ligado com sucesso",
                "device": { "id": "1", "name": "Luz da sala", "status": true }
            })
        );

        match rx.recv().await {
            Some(Message::Text(text)) => {
                let event: Value = serde_json::from_str(&text).unwrap();
                assert_eq!(event, json!({ "event": "UPDATE", "data": { "id": "1", "status": true } }));
            },
            other => panic!("expected UPDATE, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_patch_unknown_device() {
        let state = test_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.subscribers.register(tx).await;

        let router = create_router(state.clone());
        let (status, body) = send(
            router,
            Method::PATCH,
            "/devices/999",
            Some(json!({ "status": true })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Device não encontrado" }));
        assert_eq!(state.store.read().await.list(), DeviceStore::seeded().list());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_patch_without_status() {
        let router = create_router(test_state());
        let (status, body) = send(router, Method::PATCH, "/devices/1", Some(json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": MISSING_STATUS }));
    }

    #[tokio::test]
    async fn test_patch_unknown_device_without_status() {
        let router = create_router(test_state());
        let (status, body) = send(router, Method::PATCH, "/devices/999", Some(json!({}))).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Device não encontrado" }));
    }

    #[tokio::test]
    async fn test_patch_coerces_non_boolean_status() {
        let state = test_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.subscribers.register(tx).await;

        let router = create_router(state.clone());
        let (status, body) = send(
            router,
            Method::PATCH,
            "/devices/1",
            Some(json!({ "status": 1 })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["device"]["status"], true);
        assert_eq!(body["message"], "Luz da sala ligado com sucesso");

        match rx.recv().await {
            Some(Message::Text(text)) => {
                let event: Value = serde_json::from_str(&text).unwrap();
                assert_eq!(event, json!({ "event": "UPDATE", "data": { "id": "1", "status": true } }));
            },
            other => panic!("expected UPDATE, got {:?}", other),
        }

        let (_, body) = send(
            create_router(state.clone()),
            Method::PATCH,
            "/devices/2",
            Some(json!({ "status": 0 })),
        )
        .await;
        assert_eq!(body["device"]["status"], false);
        assert!(!state.store.read().await.find_by_id("2").unwrap().status);
    }

    #[tokio::test]
    async fn test_rename_device() {
        let state = test_state();
        let router = create_router(state.clone());
        let (status, body) = send(
            router,
            Method::PUT,
            "/devices/2/name",
            Some(json!({ "name": "Luz da cozinha" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Luz da cozinha atualizado com sucesso");
        assert_eq!(
            body["device"],
            json!({ "id": "2", "name": "Luz da cozinha", "status": true })
        );

        let store = state.store.read().await;
        assert_eq!(store.find_by_id("1").unwrap().name, "Luz da sala");
        assert_eq!(store.find_by_id("3").unwrap().name, "Porta");
    }

    #[tokio::test]
    async fn test_rename_does_not_broadcast() {
        let state = test_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.subscribers.register(tx).await;

        let router = create_router(state);
        let (status, _) = send(
            router,
            Method::PUT,
            "/devices/3/name",
            Some(json!({ "name": "Portão" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rename_unknown_device() {
        let router = create_router(test_state());
        let (status, body) = send(
            router,
            Method::PUT,
            "/devices/999/name",
            Some(json!({ "name": "x" })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Device não encontrado" }));
    }

    #[tokio::test]
    async fn test_rename_unknown_device_without_name() {
        let router = create_router(test_state());
        let (status, body) = send(router, Method::PUT, "/devices/999/name", Some(json!({}))).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Device não encontrado" }));
    }

    #[tokio::test]
    async fn test_rename_known_device_without_name() {
        let router = create_router(test_state());
        let (status, body) = send(router, Method::PUT, "/devices/1/name", Some(json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": MISSING_NAME }));
    }

    #[tokio::test]
    async fn test_create_device() {
        let state = test_state();
        let router = create_router(state.clone());
        let (status, body) = send(
            router,
            Method::POST,
            "/devices",
            Some(json!({ "id": "4", "name": "Garagem", "status": 1 })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({ "id": "4", "name": "Garagem", "status": true }));

        let devices = state.store.read().await.list();
        assert_eq!(devices.len(), 4);
        assert_eq!(&devices[..3], &DeviceStore::seeded().list()[..]);
    }

    #[tokio::test]
    async fn test_create_missing_fields() {
        let router = create_router(test_state());
        let (status, body) = send(router, Method::POST, "/devices", Some(json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "id e name são obrigatórios" }));
    }

    #[tokio::test]
    async fn test_create_without_content_type() {
        let state = test_state();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/devices")
            .body(Body::from("{}"))
            .unwrap();
        let response = create_router(state.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": MISSING_ID_OR_NAME }));

        let (status, body) = send(create_router(state.clone()), Method::POST, "/devices", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": MISSING_ID_OR_NAME }));
        assert_eq!(state.store.read().await.len(), 3);
    }

    #[tokio::test]
    async fn test_create_with_numeric_id() {
        let state = test_state();
        let (status, body) = send(
            create_router(state.clone()),
            Method::POST,
            "/devices",
            Some(json!({ "id": 4, "name": "Sensor" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({ "id": "4", "name": "Sensor", "status": false }));
        assert_eq!(state.store.read().await.find_by_id("4").unwrap().name, "Sensor");
    }

    #[tokio::test]
    async fn test_create_non_object_body() {
        let (status, body) = send(
            create_router(test_state()),
            Method::POST,
            "/devices",
            Some(json!(["1", "x"])),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": MISSING_ID_OR_NAME }));
    }

    #[tokio::test]
    async fn test_create_malformed_json() {
        let router = create_router(test_state());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/devices")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_delete_known_and_unknown() {
        let state = test_state();

        let (status, body) =
            send(create_router(state.clone()), Method::DELETE, "/devices/999", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "deleted" }));
        assert_eq!(state.store.read().await.len(), 3);

        let (status, body) =
            send(create_router(state.clone()), Method::DELETE, "/devices/2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "deleted" }));

        let store = state.store.read().await;
        assert_eq!(store.len(), 2);
        assert!(store.find_by_id("2").is_none());
    }

    #[tokio::test]
    async fn test_health() {
        let router = create_router(test_state());
        let (status, body) = send(router, Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["devices"], 3);
        assert_eq!(body["subscribers"], 0);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let router = create_router(test_state());
        let (status, body) = send(router, Method::GET, "/nope", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Not found" }));
    }
}
