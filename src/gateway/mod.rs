//! Gateway HTTP hacia el backend de tracking
//!
//! Este módulo contiene el cliente HTTP que adjunta el token bearer a
//! cada request y traduce los fallos, una sola vez, al error tipado del
//! cliente. Un 401 limpia el slot de token compartido y dispara el hook
//! de sesión expirada; ese camino y el timer de refresh convergen en el
//! mismo logout.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::models::auth::{
    AuthResponse, BusinessRegistration, ChangePasswordRequest, LoginCredentials, ProfileUpdate,
    SimpleRegistration, TokenResponse, User,
};
use crate::models::tracking::{TrackingData, VehicleMetrics};
use crate::models::vehicle::{
    CreateVehicleRequest, DateRange, Page, UpdateVehicleRequest, Vehicle, VehicleFilters,
};
use crate::utils::errors::{ApiError, ApiResult, FieldError};

/// Slot de token compartido entre el gateway y el store de sesión
pub type TokenSlot = Arc<RwLock<Option<String>>>;

/// Hook invocado cuando el backend responde 401
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// Superficie completa del backend REST
///
/// El gateway HTTP la implementa contra el servidor real; los tests la
/// implementan en memoria.
#[async_trait::async_trait]
pub trait TrackingApi: Send + Sync {
    async fn login(&self, credentials: &LoginCredentials) -> ApiResult<AuthResponse>;
    async fn register_business(&self, registration: &BusinessRegistration)
        -> ApiResult<AuthResponse>;
    async fn register_simple(&self, registration: &SimpleRegistration) -> ApiResult<AuthResponse>;
    async fn refresh_token(&self) -> ApiResult<TokenResponse>;
    async fn current_user(&self) -> ApiResult<User>;
    async fn update_profile(&self, profile: &ProfileUpdate) -> ApiResult<User>;
    async fn change_password(&self, request: &ChangePasswordRequest) -> ApiResult<()>;
    async fn reset_password(&self, email: &str) -> ApiResult<()>;

    async fn list_vehicles(
        &self,
        filters: &VehicleFilters,
        page: u32,
        size: u32,
    ) -> ApiResult<Page<Vehicle>>;
    async fn create_vehicle(&self, request: &CreateVehicleRequest) -> ApiResult<Vehicle>;
    async fn update_vehicle(
        &self,
        vehicle_id: i64,
        request: &UpdateVehicleRequest,
    ) -> ApiResult<Vehicle>;
    async fn delete_vehicle(&self, vehicle_id: i64) -> ApiResult<()>;
    async fn vehicle_history(
        &self,
        vehicle_id: i64,
        range: Option<DateRange>,
    ) -> ApiResult<Vec<TrackingData>>;
    async fn vehicle_metrics(&self, vehicle_id: i64) -> ApiResult<VehicleMetrics>;
}

/// Cliente HTTP del backend de tracking
pub struct HttpGateway {
    client: reqwest::Client,
    config: ClientConfig,
    token: TokenSlot,
    on_unauthorized: std::sync::RwLock<Option<UnauthorizedHook>>,
}

impl HttpGateway {
    /// Crear el gateway con un cliente HTTP compartido y timeout fijo
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("building HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            token: Arc::new(RwLock::new(None)),
            on_unauthorized: std::sync::RwLock::new(None),
        })
    }

    /// Slot de token compartido con el store de sesión
    pub fn token_slot(&self) -> TokenSlot {
        self.token.clone()
    }

    /// Registrar el hook de 401; el composition root lo enruta al logout
    pub fn set_unauthorized_hook(&self, hook: UnauthorizedHook) {
        *self.on_unauthorized.write().expect("hook lock poisoned") = Some(hook);
    }

    fn url(&self, path: &str) -> String {
        self.config.api_url(path)
    }

    /// Adjuntar el bearer token, enviar y traducir fallos
    async fn execute(&self, builder: reqwest::RequestBuilder) -> ApiResult<reqwest::Response> {
        let builder = match self.token.read().await.as_ref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "fallo de red contra el backend");
                return Err(ApiError::NetworkUnreachable);
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(self.map_failure(status.as_u16(), response).await)
    }

    /// Traducción única de status HTTP a error tipado
    async fn map_failure(&self, status: u16, response: reqwest::Response) -> ApiError {
        let body: serde_json::Value = response.json().await.unwrap_or_default();

        match status {
            401 => {
                debug!("401 del backend, limpiando sesión");
                self.token.write().await.take();
                if let Some(hook) = self.on_unauthorized.read().expect("hook lock poisoned").as_ref()
                {
                    hook();
                }
                ApiError::Unauthorized
            }
            403 => ApiError::Forbidden,
            404 => ApiError::NotFound,
            422 => ApiError::Validation(parse_field_errors(&body)),
            status if status >= 500 => {
                warn!(status, body = %body, "error del servidor");
                ApiError::Server { status }
            }
            status => {
                warn!(status, body = %body, "respuesta inesperada del backend");
                ApiError::Server { status }
            }
        }
    }

    async fn decode<T: DeserializeOwned>(&self, response: reqwest::Response) -> ApiResult<T> {
        response
            .json()
            .await
            .map_err(|e| ApiError::Config(format!("decoding response body: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        let response = self
            .execute(self.client.get(self.url(path)).query(query))
            .await?;
        self.decode(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let response = self
            .execute(self.client.post(self.url(path)).json(body))
            .await?;
        self.decode(response).await
    }

    async fn post_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<()> {
        self.execute(self.client.post(self.url(path)).json(body))
            .await?;
        Ok(())
    }

    async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let response = self
            .execute(self.client.put(self.url(path)).json(body))
            .await?;
        self.decode(response).await
    }

    async fn delete_unit(&self, path: &str) -> ApiResult<()> {
        self.execute(self.client.delete(self.url(path))).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TrackingApi for HttpGateway {
    async fn login(&self, credentials: &LoginCredentials) -> ApiResult<AuthResponse> {
        self.post_json("auth/login", credentials).await
    }

    async fn register_business(
        &self,
        registration: &BusinessRegistration,
    ) -> ApiResult<AuthResponse> {
        self.post_json("auth/register/business", registration).await
    }

    async fn register_simple(&self, registration: &SimpleRegistration) -> ApiResult<AuthResponse> {
        self.post_json("auth/register/simple", registration).await
    }

    async fn refresh_token(&self) -> ApiResult<TokenResponse> {
        self.post_json("auth/refresh-token", &serde_json::json!({}))
            .await
    }

    async fn current_user(&self) -> ApiResult<User> {
        self.get_json("auth/me", &[]).await
    }

    async fn update_profile(&self, profile: &ProfileUpdate) -> ApiResult<User> {
        self.put_json("auth/profile", profile).await
    }

    async fn change_password(&self, request: &ChangePasswordRequest) -> ApiResult<()> {
        self.post_unit("auth/change-password", request).await
    }

    async fn reset_password(&self, email: &str) -> ApiResult<()> {
        self.post_unit("auth/reset-password", &serde_json::json!({ "email": email }))
            .await
    }

    async fn list_vehicles(
        &self,
        filters: &VehicleFilters,
        page: u32,
        size: u32,
    ) -> ApiResult<Page<Vehicle>> {
        // El backend pagina 0-based; el cursor local es 1-based
        let mut query: Vec<(&str, String)> = vec![
            ("page", page.saturating_sub(1).to_string()),
            ("size", size.to_string()),
        ];
        if let Some(search) = &filters.search {
            query.push(("search", search.clone()));
        }
        if let Some(vehicle_type) = filters.vehicle_type {
            query.push(("type", vehicle_type.as_str().to_string()));
        }
        if let Some(status) = filters.status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(sort_by) = &filters.sort_by {
            query.push(("sortBy", sort_by.clone()));
        }
        if let Some(sort_order) = filters.sort_order {
            query.push(("sortOrder", sort_order.as_str().to_string()));
        }
        if let Some(range) = &filters.date_range {
            query.push(("startDate", range.start.to_rfc3339()));
            query.push(("endDate", range.end.to_rfc3339()));
        }

        self.get_json("vehicles", &query).await
    }

    async fn create_vehicle(&self, request: &CreateVehicleRequest) -> ApiResult<Vehicle> {
        self.post_json("vehicles", request).await
    }

    async fn update_vehicle(
        &self,
        vehicle_id: i64,
        request: &UpdateVehicleRequest,
    ) -> ApiResult<Vehicle> {
        self.put_json(&format!("vehicles/{vehicle_id}"), request)
            .await
    }

    async fn delete_vehicle(&self, vehicle_id: i64) -> ApiResult<()> {
        self.delete_unit(&format!("vehicles/{vehicle_id}")).await
    }

    async fn vehicle_history(
        &self,
        vehicle_id: i64,
        range: Option<DateRange>,
    ) -> ApiResult<Vec<TrackingData>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(range) = range {
            query.push(("startDate", range.start.to_rfc3339()));
            query.push(("endDate", range.end.to_rfc3339()));
        }
        self.get_json(&format!("vehicles/{vehicle_id}/history"), &query)
            .await
    }

    async fn vehicle_metrics(&self, vehicle_id: i64) -> ApiResult<VehicleMetrics> {
        self.get_json(&format!("vehicles/{vehicle_id}/metrics"), &[])
            .await
    }
}

/// Extraer errores de campo de un body de validación
///
/// Acepta tanto `{"errors": [{"field", "message"}]}` como una lista
/// plana de strings, que es lo que devuelven los validadores antiguos.
fn parse_field_errors(body: &serde_json::Value) -> Vec<FieldError> {
    let Some(errors) = body.get("errors").and_then(|e| e.as_array()) else {
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("validation failed");
        return vec![FieldError {
            field: String::new(),
            message: message.to_string(),
        }];
    };

    errors
        .iter()
        .map(|entry| match entry {
            serde_json::Value::String(message) => FieldError {
                field: String::new(),
                message: message.clone(),
            },
            other => FieldError {
                field: other
                    .get("field")
                    .and_then(|f| f.as_str())
                    .unwrap_or_default()
                    .to_string(),
                message: other
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("invalid value")
                    .to_string(),
            },
        })
        .collect()
}
