#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cert_adapters::{OpenApiClient, OpenApiError, OpenApiParams};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Cliente OpenAPI falso: registra cada acción y responde según guion.
/// Acciones sin guion responden `{}`.
#[derive(Default)]
pub struct FakeOpenApi {
    calls: Mutex<Vec<(String, OpenApiParams)>>,
    responses: Mutex<HashMap<String, Result<Value, OpenApiError>>>,
    hang: bool,
}

impl FakeOpenApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Nunca responde; sólo el guard del contexto puede terminar la llamada.
    pub fn hanging() -> Arc<Self> {
        Arc::new(Self { hang: true,
                        ..Self::default() })
    }

    pub fn respond(&self, action: &str, body: Value) {
        self.responses.lock().insert(action.to_string(), Ok(body));
    }

    pub fn fail(&self, action: &str, code: &str, message: &str) {
        self.responses.lock().insert(action.to_string(),
                                     Err(OpenApiError::Api { code: code.to_string(),
                                                             message: message.to_string() }));
    }

    pub fn actions(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(a, _)| a.clone()).collect()
    }

    pub fn params_of(&self, action: &str) -> OpenApiParams {
        self.calls
            .lock()
            .iter()
            .find(|(a, _)| a == action)
            .map(|(_, p)| p.clone())
            .unwrap_or_else(|| panic!("action {action} was not called"))
    }
}

#[async_trait]
impl OpenApiClient for FakeOpenApi {
    async fn call(&self, action: &str, params: &OpenApiParams) -> Result<Value, OpenApiError> {
        self.calls.lock().push((action.to_string(), params.clone()));
        if self.hang {
            return std::future::pending().await;
        }
        self.responses.lock().get(action).cloned().unwrap_or_else(|| Ok(json!({})))
    }
}

pub fn access() -> Value {
    json!({ "accessKeyId": "ak-test", "accessKeySecret": "sk-test" })
}
