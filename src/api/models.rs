use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::header,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::devices::Device;
use crate::error::RegistryError;

pub const MISSING_ID_OR_NAME: &str = "id e name são obrigatórios";
pub const MISSING_STATUS: &str = "status é obrigatório";
pub const MISSING_NAME: &str = "name é obrigatório";

/// Create device request
#[derive(Deserialize)]
pub struct CreateDeviceRequest {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
}

impl CreateDeviceRequest {
    /// Build the device, rejecting a missing or falsy id/name
    pub fn into_device(self) -> Result<Device, RegistryError> {
        let id = self.id.filter(|v| is_truthy(v)).and_then(scalar_text);
        let name = self.name.filter(|v| is_truthy(v)).and_then(scalar_text);
        match (id, name) {
            (Some(id), Some(name)) => {
                let status = self.status.as_ref().is_some_and(is_truthy);
                Ok(Device::new(id, name, status))
            },
            _ => Err(RegistryError::InvalidInput(MISSING_ID_OR_NAME.to_string())),
        }
    }
}

/// Update status request
#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: Option<Value>,
}

impl UpdateStatusRequest {
    pub fn status(&self) -> Result<bool, RegistryError> {
        match &self.status {
            Some(value) => Ok(is_truthy(value)),
            None => Err(RegistryError::InvalidInput(MISSING_STATUS.to_string())),
        }
    }
}

/// Rename request
#[derive(Deserialize)]
pub struct RenameDeviceRequest {
    #[serde(default)]
    pub name: Option<Value>,
}

impl RenameDeviceRequest {
    /// Empty names are accepted; only a missing or non-scalar name is rejected
    pub fn into_name(self) -> Result<String, RegistryError> {
        self.name
            .and_then(scalar_text)
            .ok_or_else(|| RegistryError::InvalidInput(MISSING_NAME.to_string()))
    }
}

/// Response for status updates and renames
#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceMessageResponse {
    pub message: String,
    pub device: Device,
}

impl DeviceMessageResponse {
    pub fn status_changed(device: Device) -> Self {
        let state = if device.status { "ligado" } else { "desligado" };
        Self {
            message: format!("{} {} com sucesso", device.name, state),
            device,
        }
    }

    pub fn renamed(device: Device) -> Self {
        Self {
            message: format!("{} atualizado com sucesso", device.name),
            device,
        }
    }
}

/// Delete acknowledgment, identical whether or not anything was removed
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: String,
}

impl DeleteResponse {
    pub fn deleted() -> Self {
        Self {
            status: "deleted".to_string(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub devices: usize,
    pub subscribers: usize,
}

/// JSON truthiness: null, false, 0, NaN and "" are false, everything else true
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text form of a scalar JSON value; arrays, objects and null yield None
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn is_json_content_type(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| {
            let mime = ct.split(';').next().unwrap_or_default().trim();
            mime == "application/json" || mime.ends_with("+json")
        })
}

/// JSON body extractor with the registry's `{error}` rejections.
///
/// A request without a JSON content type, with an empty body, or whose body
/// is not a JSON object is read as `{}`, so field presence checks run in the
/// handler. Only unparsable JSON is rejected here.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RegistryError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = is_json_content_type(&req);
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| RegistryError::InvalidInput(rejection.body_text()))?;

        let value = if is_json && !bytes.is_empty() {
            serde_json::from_slice::<Value>(&bytes)
                .map_err(|e| RegistryError::InvalidInput(format!("Invalid JSON body: {}", e)))?
        } else {
            Value::Null
        };
        let value = match value {
            Value::Object(map) => Value::Object(map),
            _ => Value::Object(serde_json::Map::new()),
        };

        serde_json::from_value(value)
            .map(JsonBody)
            .map_err(|e| RegistryError::InvalidInput(format!("Invalid request body: {}", e)))
    }
}
