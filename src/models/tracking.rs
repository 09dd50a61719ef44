//! Modelos de datos de seguimiento GPS
//!
//! Este módulo contiene las muestras de localización y las métricas
//! derivadas por vehículo. Las muestras son inmutables una vez recibidas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Posición geográfica (grados decimales)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

impl Position {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Muestra de localización de un vehículo
///
/// Una secuencia ordenada por timestamp ascendente forma el track
/// histórico del vehículo, tal como la entrega el backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingData {
    pub id: i64,
    pub vehicle_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub battery_level: f64,
    pub signal_strength: f64,
    pub temperature: f64,
    pub timestamp: DateTime<Utc>,
}

impl TrackingData {
    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude)
    }
}

/// Métricas derivadas de un vehículo
///
/// Datos auxiliares best-effort: se refrescan con independencia de la
/// lista de vehículos y sin garantía de orden entre ambas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleMetrics {
    pub current_speed: f64,
    pub average_speed: f64,
    pub distance: f64,
    pub runtime: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_level: Option<f64>,
    pub temperature: f64,
    pub battery_level: f64,
    pub signal_strength: f64,
}
