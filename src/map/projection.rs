//! Capa de proyección del mapa
//!
//! Mantiene la biyección entre identificadores de vehículo y marcadores
//! en el mapa, reconciliando por diferencia en vez de redibujar, y
//! renderiza el track histórico de un vehículo a la vez. Toda operación
//! antes de `initialize` o después de `teardown` es un no-op silencioso:
//! es la carrera normal entre el desmontaje de la vista y un refresco
//! pendiente, no un error.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::map::backend::{
    Bounds, MapBackend, MarkerHandle, MarkerIcon, OverlayGroup, PathHandle, PathStyle,
    TileLayerOptions,
};
use crate::models::tracking::{Position, TrackingData};
use crate::models::vehicle::Vehicle;

/// Padding fijo al encuadrar un track completo
const FIT_PADDING: u32 = 50;
/// Zoom al centrar sobre un vehículo concreto
const FOCUS_ZOOM: u8 = 15;

/// Marcador vivo de un vehículo
struct MarkerEntry {
    handle: MarkerHandle,
    position: Position,
}

/// Bookkeeping de una instancia de mapa activa
struct MapInstance {
    markers: HashMap<i64, MarkerEntry>,
    track: Option<PathHandle>,
}

/// Proyección del estado de vehículos sobre un mapa en vivo
pub struct MapProjection {
    backend: Box<dyn MapBackend>,
    tiles: TileLayerOptions,
    instance: Option<MapInstance>,
}

impl MapProjection {
    pub fn new(backend: Box<dyn MapBackend>, tiles: TileLayerOptions) -> Self {
        Self {
            backend,
            tiles,
            instance: None,
        }
    }

    /// Crear la instancia de mapa sobre un target de render
    ///
    /// Una segunda llamada sin `teardown` previo no crea nada.
    pub fn initialize(&mut self, target: &str, center: Position, zoom: u8) {
        if self.instance.is_some() {
            warn!(target, "el mapa ya está inicializado, se ignora");
            return;
        }

        self.backend.create_map(target, center, zoom);
        self.backend.add_tile_layer(&self.tiles);
        self.instance = Some(MapInstance {
            markers: HashMap::new(),
            track: None,
        });
        debug!(target, "mapa inicializado");
    }

    /// Reconciliar el set de marcadores con la lista de vehículos
    ///
    /// Diff incremental: mueve los existentes, crea los que faltan y
    /// elimina los que sobran. El costo es proporcional a la diferencia
    /// simétrica, no a un redibujado completo; a igual entrada, la
    /// segunda pasada no crea ni elimina nada.
    pub fn reconcile_vehicles(&mut self, vehicles: &[Vehicle]) {
        let Some(instance) = self.instance.as_mut() else {
            return;
        };
        let backend = &mut self.backend;

        let mut keep: HashSet<i64> = HashSet::with_capacity(vehicles.len());
        for vehicle in vehicles {
            let Some(position) = vehicle.last_position else {
                continue;
            };
            keep.insert(vehicle.id);

            match instance.markers.get_mut(&vehicle.id) {
                Some(entry) => {
                    if entry.position != position {
                        backend.move_marker(entry.handle, position);
                        entry.position = position;
                    }
                }
                None => {
                    let handle = backend.add_marker(
                        OverlayGroup::Markers,
                        position,
                        MarkerIcon::Vehicle(vehicle.vehicle_type),
                        &vehicle.name,
                    );
                    backend.set_popup(handle, popup_content(vehicle));
                    instance.markers.insert(
                        vehicle.id,
                        MarkerEntry {
                            handle,
                            position,
                        },
                    );
                }
            }
        }

        // Vehículos ausentes de la lista, o que perdieron su posición,
        // pierden su marcador.
        instance.markers.retain(|id, entry| {
            if keep.contains(id) {
                true
            } else {
                backend.remove_marker(OverlayGroup::Markers, entry.handle);
                false
            }
        });
    }

    /// Renderizar el track histórico de un vehículo
    ///
    /// Siempre limpia el overlay anterior; un track vacío lo deja vacío.
    /// Con muestras, dibuja una polilínea en orden de entrada con pins
    /// de inicio y fin, y encuadra el viewport al track completo.
    pub fn render_history(&mut self, track: &[TrackingData]) {
        let Some(instance) = self.instance.as_mut() else {
            return;
        };
        let backend = &mut self.backend;

        backend.clear_overlay(OverlayGroup::Track);
        instance.track = None;

        if track.is_empty() {
            return;
        }

        let points: Vec<Position> = track.iter().map(TrackingData::position).collect();

        let handle = backend.draw_path(OverlayGroup::Track, &points, &PathStyle::default());
        backend.add_marker(
            OverlayGroup::Track,
            points[0],
            MarkerIcon::track_start(),
            "start",
        );
        backend.add_marker(
            OverlayGroup::Track,
            points[points.len() - 1],
            MarkerIcon::track_end(),
            "end",
        );

        if let Some(bounds) = Bounds::from_points(&points) {
            backend.fit_bounds(bounds, FIT_PADDING);
        }
        instance.track = Some(handle);
    }

    /// Centrar el viewport sobre un vehículo y abrir su popup
    ///
    /// Sin marcador para ese id, no hace nada.
    pub fn center_on(&mut self, vehicle_id: i64) {
        let Some(instance) = self.instance.as_ref() else {
            return;
        };
        let Some(entry) = instance.markers.get(&vehicle_id) else {
            return;
        };

        self.backend.set_view(entry.position, FOCUS_ZOOM);
        self.backend.open_popup(entry.handle);
    }

    /// Seguir a un vehículo re-centrando al zoom actual
    pub fn set_follow(&mut self, vehicle_id: i64, enabled: bool) {
        if !enabled {
            return;
        }
        let Some(instance) = self.instance.as_ref() else {
            return;
        };
        let Some(entry) = instance.markers.get(&vehicle_id) else {
            return;
        };

        let zoom = self.backend.current_zoom();
        self.backend.set_view(entry.position, zoom);
    }

    /// Recalcular el tamaño del viewport tras un cambio de layout
    pub fn resize(&mut self) {
        if self.instance.is_some() {
            self.backend.invalidate_size();
        }
    }

    /// Liberar la instancia de mapa y todo el bookkeeping
    ///
    /// Seguro de llamar más de una vez.
    pub fn teardown(&mut self) {
        if self.instance.take().is_some() {
            self.backend.remove_map();
            debug!("mapa liberado");
        }
    }

    /// ¿Hay una instancia de mapa activa?
    pub fn is_initialized(&self) -> bool {
        self.instance.is_some()
    }
}

/// Contenido del popup de un vehículo
fn popup_content(vehicle: &Vehicle) -> String {
    let mut content = format!("{}\n{}", vehicle.name, vehicle.registration_number);
    if let Some(location) = &vehicle.last_location {
        content.push_str(&format!(
            "\nSpeed: {:.0} km/h\nAltitude: {:.0} m\nBattery: {:.0}%",
            location.speed, location.altitude, location.battery_level
        ));
    }
    content
}
