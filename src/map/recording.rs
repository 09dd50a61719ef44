//! Backend de mapa en memoria
//!
//! Registra cada operación en vez de dibujar. Sirve como doble de test
//! para verificar la reconciliación sin una librería de mapas real.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::map::backend::{
    Bounds, MapBackend, MarkerHandle, MarkerIcon, OverlayGroup, PathHandle, PathStyle,
    TileLayerOptions,
};
use crate::models::tracking::Position;

/// Marcador vivo registrado
#[derive(Debug, Clone)]
pub struct RecordedMarker {
    pub group: OverlayGroup,
    pub position: Position,
    pub icon: MarkerIcon,
    pub title: String,
    pub popup: Option<String>,
}

/// Polilínea viva registrada
#[derive(Debug, Clone)]
pub struct RecordedPath {
    pub group: OverlayGroup,
    pub points: Vec<Position>,
    pub style: PathStyle,
}

/// Estado observable del backend de prueba
#[derive(Debug, Default)]
pub struct RecordingState {
    next_handle: u64,
    pub map_created: bool,
    pub maps_created: u32,
    pub map_removed: u32,
    pub tile_layers: Vec<TileLayerOptions>,
    pub markers: HashMap<MarkerHandle, RecordedMarker>,
    pub paths: HashMap<PathHandle, RecordedPath>,
    pub marker_creations: u32,
    pub marker_moves: u32,
    pub marker_removals: u32,
    pub fitted: Option<(Bounds, u32)>,
    pub views: Vec<(Position, u8)>,
    pub opened_popups: Vec<MarkerHandle>,
    pub invalidations: u32,
    pub zoom: u8,
}

impl RecordingState {
    /// Marcadores vivos en un grupo
    pub fn live_markers(&self, group: OverlayGroup) -> usize {
        self.markers.values().filter(|m| m.group == group).count()
    }

    /// Polilíneas vivas en un grupo
    pub fn live_paths(&self, group: OverlayGroup) -> usize {
        self.paths.values().filter(|p| p.group == group).count()
    }

    /// Posiciones de los marcadores vivos de un grupo
    pub fn marker_positions(&self, group: OverlayGroup) -> Vec<Position> {
        self.markers
            .values()
            .filter(|m| m.group == group)
            .map(|m| m.position)
            .collect()
    }
}

/// Backend de mapa que solo registra operaciones
///
/// Clonarlo comparte el mismo estado, así el test conserva una vista
/// del backend que se movió dentro de la proyección.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acceso al estado registrado
    pub fn snapshot(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().expect("recording state poisoned")
    }

    fn next_marker(&self) -> MarkerHandle {
        let mut state = self.snapshot();
        state.next_handle += 1;
        MarkerHandle(state.next_handle)
    }

    fn next_path(&self) -> PathHandle {
        let mut state = self.snapshot();
        state.next_handle += 1;
        PathHandle(state.next_handle)
    }
}

impl MapBackend for RecordingBackend {
    fn create_map(&mut self, _target: &str, center: Position, zoom: u8) {
        let mut state = self.snapshot();
        state.map_created = true;
        state.maps_created += 1;
        state.zoom = zoom;
        state.views.push((center, zoom));
    }

    fn add_tile_layer(&mut self, options: &TileLayerOptions) {
        self.snapshot().tile_layers.push(options.clone());
    }

    fn add_marker(
        &mut self,
        group: OverlayGroup,
        position: Position,
        icon: MarkerIcon,
        title: &str,
    ) -> MarkerHandle {
        let handle = self.next_marker();
        let mut state = self.snapshot();
        state.markers.insert(
            handle,
            RecordedMarker {
                group,
                position,
                icon,
                title: title.to_string(),
                popup: None,
            },
        );
        state.marker_creations += 1;
        handle
    }

    fn move_marker(&mut self, marker: MarkerHandle, position: Position) {
        let mut state = self.snapshot();
        if let Some(recorded) = state.markers.get_mut(&marker) {
            recorded.position = position;
        }
        state.marker_moves += 1;
    }

    fn remove_marker(&mut self, _group: OverlayGroup, marker: MarkerHandle) {
        let mut state = self.snapshot();
        state.markers.remove(&marker);
        state.marker_removals += 1;
    }

    fn set_popup(&mut self, marker: MarkerHandle, content: String) {
        if let Some(recorded) = self.snapshot().markers.get_mut(&marker) {
            recorded.popup = Some(content);
        }
    }

    fn open_popup(&mut self, marker: MarkerHandle) {
        self.snapshot().opened_popups.push(marker);
    }

    fn draw_path(
        &mut self,
        group: OverlayGroup,
        points: &[Position],
        style: &PathStyle,
    ) -> PathHandle {
        let handle = self.next_path();
        self.snapshot().paths.insert(
            handle,
            RecordedPath {
                group,
                points: points.to_vec(),
                style: style.clone(),
            },
        );
        handle
    }

    fn clear_overlay(&mut self, group: OverlayGroup) {
        let mut state = self.snapshot();
        state.markers.retain(|_, m| m.group != group);
        state.paths.retain(|_, p| p.group != group);
    }

    fn fit_bounds(&mut self, bounds: Bounds, padding: u32) {
        self.snapshot().fitted = Some((bounds, padding));
    }

    fn set_view(&mut self, center: Position, zoom: u8) {
        let mut state = self.snapshot();
        state.zoom = zoom;
        state.views.push((center, zoom));
    }

    fn current_zoom(&self) -> u8 {
        self.snapshot().zoom
    }

    fn invalidate_size(&mut self) {
        self.snapshot().invalidations += 1;
    }

    fn remove_map(&mut self) {
        let mut state = self.snapshot();
        state.map_created = false;
        state.map_removed += 1;
        state.markers.clear();
        state.paths.clear();
    }
}
