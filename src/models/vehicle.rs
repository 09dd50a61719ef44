//! Modelo de Vehicle
//!
//! Este módulo contiene el struct Vehicle y sus variantes para CRUD
//! operations. Mapea exactamente al contrato REST del backend (JSON camelCase).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::tracking::{Position, TrackingData};
use crate::utils::validation::REGISTRATION_NUMBER;

/// Tipo de vehículo - el backend lo serializa en mayúsculas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    Car,
    Truck,
    Van,
    Motorcycle,
    Other,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Car => "CAR",
            VehicleType::Truck => "TRUCK",
            VehicleType::Van => "VAN",
            VehicleType::Motorcycle => "MOTORCYCLE",
            VehicleType::Other => "OTHER",
        }
    }
}

/// Estado del vehículo - el backend lo serializa en minúsculas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Active,
    Inactive,
    Maintenance,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Active => "active",
            VehicleStatus::Inactive => "inactive",
            VehicleStatus::Maintenance => "maintenance",
        }
    }
}

/// Vehicle principal - espejo local del registro del servidor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: i64,
    pub name: String,
    pub registration_number: String,
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
    pub status: VehicleStatus,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_location: Option<TrackingData>,
}

/// Request para crear un nuevo vehículo
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[validate(regex(path = "REGISTRATION_NUMBER", message = "invalid registration number"))]
    pub registration_number: String,

    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
}

/// Request para actualizar un vehículo existente
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 2, max = 100))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[validate(regex(path = "REGISTRATION_NUMBER", message = "invalid registration number"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<VehicleType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VehicleStatus>,
}

/// Orden de clasificación para listados
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Rango de fechas inclusivo
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Verificar si un instante cae dentro del rango (inclusivo)
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

/// Filtros para búsqueda de vehículos - predicados puros sobre la lista local
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleFilters {
    pub search: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub status: Option<VehicleStatus>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub date_range: Option<DateRange>,
}

impl VehicleFilters {
    /// Aplicar un patch parcial: los campos `Some` sobreescriben, `None` conserva
    pub fn merge(&mut self, patch: VehicleFilters) {
        if patch.search.is_some() {
            self.search = patch.search;
        }
        if patch.vehicle_type.is_some() {
            self.vehicle_type = patch.vehicle_type;
        }
        if patch.status.is_some() {
            self.status = patch.status;
        }
        if patch.sort_by.is_some() {
            self.sort_by = patch.sort_by;
        }
        if patch.sort_order.is_some() {
            self.sort_order = patch.sort_order;
        }
        if patch.date_range.is_some() {
            self.date_range = patch.date_range;
        }
    }

    /// Evaluar los predicados de filtrado contra un vehículo
    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_name = vehicle.name.to_lowercase().contains(&needle);
            let in_registration = vehicle.registration_number.to_lowercase().contains(&needle);
            if !in_name && !in_registration {
                return false;
            }
        }

        if let Some(vehicle_type) = self.vehicle_type {
            if vehicle.vehicle_type != vehicle_type {
                return false;
            }
        }

        if let Some(status) = self.status {
            if vehicle.status != status {
                return false;
            }
        }

        if let Some(range) = &self.date_range {
            if !range.contains(vehicle.last_update) {
                return false;
            }
        }

        true
    }
}

/// Cursor de paginación - el servidor es la autoridad sobre estos valores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            total_items: 0,
            page_size: 10,
        }
    }
}

/// Envelope de respuesta paginada del backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    /// Número de página 0-based tal como lo reporta el servidor
    pub number: u32,
    pub total_elements: u64,
    pub size: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Cursor local equivalente (1-based) derivado del envelope
    pub fn pagination(&self) -> Pagination {
        Pagination {
            current_page: self.number + 1,
            total_pages: self.total_pages,
            total_items: self.total_elements,
            page_size: self.size,
        }
    }
}
