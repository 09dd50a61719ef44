//! Frontera con la librería de mapas
//!
//! El motor de tiles y el render visual no viven en este crate: la capa
//! de proyección habla con cualquier implementación de `MapBackend`
//! (un binding de Leaflet, un widget nativo, un doble de test).

use crate::models::tracking::Position;
use crate::models::vehicle::VehicleType;

/// Grupos de overlay independientes; se limpian por separado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayGroup {
    /// Marcadores de vehículos en vivo
    Markers,
    /// Polilínea e hitos del track histórico
    Track,
}

/// Handle opaco de un marcador creado por el backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub u64);

/// Handle opaco de una polilínea creada por el backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathHandle(pub u64);

/// Icono de un marcador
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerIcon {
    /// Icono según el tipo de vehículo
    Vehicle(VehicleType),
    /// Pin coloreado para hitos de track
    Pin { color: &'static str },
}

impl MarkerIcon {
    /// Pin de inicio de track
    pub fn track_start() -> Self {
        MarkerIcon::Pin { color: "green" }
    }

    /// Pin de fin de track
    pub fn track_end() -> Self {
        MarkerIcon::Pin { color: "red" }
    }

    /// URL del asset del icono
    pub fn asset_url(&self) -> &'static str {
        match self {
            MarkerIcon::Vehicle(VehicleType::Car) => "/icons/car.svg",
            MarkerIcon::Vehicle(VehicleType::Truck) => "/icons/truck.svg",
            MarkerIcon::Vehicle(VehicleType::Van) => "/icons/van.svg",
            MarkerIcon::Vehicle(VehicleType::Motorcycle) => "/icons/motorcycle.svg",
            MarkerIcon::Vehicle(VehicleType::Other) => "/icons/vehicle.svg",
            MarkerIcon::Pin { .. } => "/icons/pin.svg",
        }
    }
}

/// Estilo de la polilínea del track
#[derive(Debug, Clone, PartialEq)]
pub struct PathStyle {
    pub color: &'static str,
    pub weight: u32,
    pub opacity: f64,
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            color: "#0ea5e9",
            weight: 3,
            opacity: 0.8,
        }
    }
}

/// Configuración de la capa de tiles
#[derive(Debug, Clone)]
pub struct TileLayerOptions {
    pub url: String,
    pub attribution: String,
    pub max_zoom: u8,
}

/// Caja delimitadora de un conjunto de posiciones
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south_west: Position,
    pub north_east: Position,
}

impl Bounds {
    /// Caja mínima que contiene todos los puntos; `None` si no hay puntos
    pub fn from_points(points: &[Position]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Bounds {
            south_west: *first,
            north_east: *first,
        };
        for point in &points[1..] {
            bounds.extend(*point);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, point: Position) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }
}

/// Operaciones que la capa de proyección exige al mapa
///
/// Ninguna operación hace I/O ni suspende; los backends reales delegan
/// en la librería de mapas subyacente.
pub trait MapBackend: Send {
    fn create_map(&mut self, target: &str, center: Position, zoom: u8);
    fn add_tile_layer(&mut self, options: &TileLayerOptions);

    fn add_marker(
        &mut self,
        group: OverlayGroup,
        position: Position,
        icon: MarkerIcon,
        title: &str,
    ) -> MarkerHandle;
    fn move_marker(&mut self, marker: MarkerHandle, position: Position);
    fn remove_marker(&mut self, group: OverlayGroup, marker: MarkerHandle);
    fn set_popup(&mut self, marker: MarkerHandle, content: String);
    fn open_popup(&mut self, marker: MarkerHandle);

    fn draw_path(
        &mut self,
        group: OverlayGroup,
        points: &[Position],
        style: &PathStyle,
    ) -> PathHandle;
    fn clear_overlay(&mut self, group: OverlayGroup);

    fn fit_bounds(&mut self, bounds: Bounds, padding: u32);
    fn set_view(&mut self, center: Position, zoom: u8);
    fn current_zoom(&self) -> u8;
    fn invalidate_size(&mut self);
    fn remove_map(&mut self);
}
