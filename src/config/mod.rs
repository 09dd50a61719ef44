//! Configuración del cliente
//!
//! Este módulo maneja la configuración del entorno: URL del backend,
//! fuente de tiles del mapa y parámetros de sesión.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Configuración del cliente de tracking
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// URL base del backend REST, sin barra final
    pub api_base_url: String,
    /// Timeout por request HTTP
    pub request_timeout: Duration,
    /// Plantilla de URL del proveedor de tiles
    pub tile_url: String,
    /// Atribución obligatoria del proveedor de tiles
    pub tile_attribution: String,
    /// Zoom máximo soportado por el proveedor
    pub max_zoom: u8,
    /// Intervalo del chequeo proactivo de expiración del token
    pub token_refresh_interval: Duration,
    /// Ruta del archivo donde persiste el token de sesión
    pub token_storage_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: env::var("FLEET_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080/api".to_string()),
            request_timeout: Duration::from_secs(
                env::var("FLEET_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
            tile_url: env::var("FLEET_TILE_URL").unwrap_or_else(|_| {
                "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string()
            }),
            tile_attribution: "© OpenStreetMap contributors".to_string(),
            max_zoom: 19,
            token_refresh_interval: Duration::from_secs(
                env::var("FLEET_TOKEN_REFRESH_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(300),
            ),
            token_storage_path: env::var("FLEET_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".fleet_tracking/token")),
        }
    }
}

impl ClientConfig {
    /// Cargar `.env` si existe y construir la configuración del entorno
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::default()
    }

    /// Componer la URL completa de un path del API
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Capa de tiles configurada para la proyección del mapa
    pub fn tile_layer(&self) -> crate::map::TileLayerOptions {
        crate::map::TileLayerOptions {
            url: self.tile_url.clone(),
            attribution: self.tile_attribution.clone(),
            max_zoom: self.max_zoom,
        }
    }
}
