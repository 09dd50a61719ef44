//! Store de estado de vehículos
//!
//! Espejo local de la colección de vehículos, el track histórico y las
//! métricas por vehículo. Cada acción es un ciclo request/response
//! contra el gateway; las respuestas tardías de requests superados se
//! descartan comparando un número de secuencia al resolver.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};
use validator::Validate;

use crate::gateway::TrackingApi;
use crate::models::tracking::{TrackingData, VehicleMetrics};
use crate::models::vehicle::{
    CreateVehicleRequest, DateRange, Pagination, UpdateVehicleRequest, Vehicle, VehicleFilters,
    VehicleStatus,
};
use crate::notifications::NotificationBus;
use crate::utils::errors::{from_validation_errors, ApiResult};

/// Lista y cursor viajan juntos: se reemplazan atómicamente desde el
/// mismo envelope de respuesta, nunca por separado.
#[derive(Debug, Default)]
struct VehicleListState {
    vehicles: Vec<Vehicle>,
    pagination: Pagination,
}

/// Store de vehículos
pub struct VehicleStore {
    api: Arc<dyn TrackingApi>,
    notifier: Arc<NotificationBus>,
    list: RwLock<VehicleListState>,
    selected: RwLock<Option<Vehicle>>,
    history: RwLock<Vec<TrackingData>>,
    metrics: RwLock<HashMap<i64, VehicleMetrics>>,
    filters: RwLock<VehicleFilters>,
    loading: AtomicBool,
    history_loading: AtomicBool,
    /// Secuencia del último fetch de lista emitido
    list_seq: AtomicU64,
    /// Secuencia del último fetch de histórico emitido
    history_seq: AtomicU64,
}

impl VehicleStore {
    pub fn new(api: Arc<dyn TrackingApi>, notifier: Arc<NotificationBus>) -> Self {
        Self {
            api,
            notifier,
            list: RwLock::new(VehicleListState::default()),
            selected: RwLock::new(None),
            history: RwLock::new(Vec::new()),
            metrics: RwLock::new(HashMap::new()),
            filters: RwLock::new(VehicleFilters::default()),
            loading: AtomicBool::new(false),
            history_loading: AtomicBool::new(false),
            list_seq: AtomicU64::new(0),
            history_seq: AtomicU64::new(0),
        }
    }

    /// Carga inicial de la primera página
    pub async fn initialize(&self) {
        self.fetch_vehicles().await;
    }

    // ------------------------------------------------------------------
    // Lecturas

    pub async fn vehicles(&self) -> Vec<Vehicle> {
        self.list.read().await.vehicles.clone()
    }

    pub async fn pagination(&self) -> Pagination {
        self.list.read().await.pagination
    }

    pub async fn filters(&self) -> VehicleFilters {
        self.filters.read().await.clone()
    }

    pub async fn history(&self) -> Vec<TrackingData> {
        self.history.read().await.clone()
    }

    pub async fn metrics_for(&self, vehicle_id: i64) -> Option<VehicleMetrics> {
        self.metrics.read().await.get(&vehicle_id).cloned()
    }

    pub async fn selected_vehicle(&self) -> Option<Vehicle> {
        self.selected.read().await.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn is_history_loading(&self) -> bool {
        self.history_loading.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Vistas derivadas: puras, recalculadas en cada lectura

    /// Vehículos que pasan los filtros activos
    pub async fn filtered_vehicles(&self) -> Vec<Vehicle> {
        let filters = self.filters.read().await.clone();
        self.list
            .read()
            .await
            .vehicles
            .iter()
            .filter(|v| filters.matches(v))
            .cloned()
            .collect()
    }

    pub async fn active_vehicles(&self) -> Vec<Vehicle> {
        self.vehicles_with_status(VehicleStatus::Active).await
    }

    pub async fn vehicles_in_maintenance(&self) -> Vec<Vehicle> {
        self.vehicles_with_status(VehicleStatus::Maintenance).await
    }

    pub async fn inactive_vehicles(&self) -> Vec<Vehicle> {
        self.vehicles_with_status(VehicleStatus::Inactive).await
    }

    async fn vehicles_with_status(&self, status: VehicleStatus) -> Vec<Vehicle> {
        self.list
            .read()
            .await
            .vehicles
            .iter()
            .filter(|v| v.status == status)
            .cloned()
            .collect()
    }

    // ------------------------------------------------------------------
    // Acciones de lectura contra el backend

    /// Pedir una página según filtros y cursor actuales
    ///
    /// En éxito reemplaza lista y cursor de una vez; en fallo el estado
    /// previo queda intacto y el fallo se notifica, nunca se propaga.
    pub async fn fetch_vehicles(&self) {
        let seq = self.list_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.loading.store(true, Ordering::SeqCst);

        let filters = self.filters.read().await.clone();
        let (page, size) = {
            let state = self.list.read().await;
            (
                state.pagination.current_page,
                state.pagination.page_size,
            )
        };

        let result = self.api.list_vehicles(&filters, page, size).await;
        self.loading.store(false, Ordering::SeqCst);

        match result {
            Ok(envelope) => {
                if seq != self.list_seq.load(Ordering::SeqCst) {
                    debug!(seq, "respuesta de lista superada, descartada");
                    return;
                }
                let mut state = self.list.write().await;
                state.pagination = envelope.pagination();
                state.vehicles = envelope.content;
            }
            Err(e) => {
                warn!(error = %e, "fallo cargando vehículos");
                self.notifier.publish_api_error(&e);
            }
        }
    }

    /// Pedir el track histórico ordenado de un vehículo
    ///
    /// Gana el último request emitido: una respuesta en vuelo de un
    /// request anterior no puede pisar la del más reciente.
    pub async fn fetch_history(&self, vehicle_id: i64, range: Option<DateRange>) {
        let seq = self.history_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.history_loading.store(true, Ordering::SeqCst);

        let result = self.api.vehicle_history(vehicle_id, range).await;
        self.history_loading.store(false, Ordering::SeqCst);

        match result {
            Ok(track) => {
                if seq != self.history_seq.load(Ordering::SeqCst) {
                    debug!(seq, vehicle_id, "respuesta de histórico superada, descartada");
                    return;
                }
                *self.history.write().await = track;
            }
            Err(e) => {
                warn!(error = %e, vehicle_id, "fallo cargando histórico");
                self.notifier.publish_api_error(&e);
            }
        }
    }

    /// Refrescar las métricas de un vehículo sin tocar las demás
    pub async fn fetch_metrics(&self, vehicle_id: i64) {
        match self.api.vehicle_metrics(vehicle_id).await {
            Ok(metrics) => {
                self.metrics.write().await.insert(vehicle_id, metrics);
            }
            Err(e) => {
                warn!(error = %e, vehicle_id, "fallo cargando métricas");
                self.notifier.publish_api_error(&e);
            }
        }
    }

    /// Refrescar métricas de varios vehículos en paralelo
    pub async fn fetch_metrics_batch(&self, vehicle_ids: &[i64]) {
        futures::future::join_all(vehicle_ids.iter().map(|id| self.fetch_metrics(*id))).await;
    }

    // ------------------------------------------------------------------
    // Mutaciones: esperan confirmación del servidor

    /// Crear un vehículo; el registro local sale de la respuesta
    pub async fn add_vehicle(&self, request: &CreateVehicleRequest) -> ApiResult<Vehicle> {
        if let Err(errors) = request.validate() {
            let error = from_validation_errors(errors);
            self.notifier.publish_api_error(&error);
            return Err(error);
        }

        match self.api.create_vehicle(request).await {
            Ok(vehicle) => {
                self.list.write().await.vehicles.push(vehicle.clone());
                self.notifier.success("Vehicle added successfully");
                Ok(vehicle)
            }
            Err(e) => {
                self.notifier.publish_api_error(&e);
                Err(e)
            }
        }
    }

    /// Actualizar un vehículo existente
    pub async fn update_vehicle(
        &self,
        vehicle_id: i64,
        request: &UpdateVehicleRequest,
    ) -> ApiResult<Vehicle> {
        if let Err(errors) = request.validate() {
            let error = from_validation_errors(errors);
            self.notifier.publish_api_error(&error);
            return Err(error);
        }

        match self.api.update_vehicle(vehicle_id, request).await {
            Ok(updated) => {
                let mut state = self.list.write().await;
                if let Some(slot) = state.vehicles.iter_mut().find(|v| v.id == vehicle_id) {
                    *slot = updated.clone();
                }
                drop(state);

                let mut selected = self.selected.write().await;
                if selected.as_ref().map(|v| v.id) == Some(vehicle_id) {
                    *selected = Some(updated.clone());
                }
                drop(selected);

                self.notifier.success("Vehicle updated successfully");
                Ok(updated)
            }
            Err(e) => {
                self.notifier.publish_api_error(&e);
                Err(e)
            }
        }
    }

    /// Eliminar un vehículo; limpia la selección si apuntaba a él
    pub async fn delete_vehicle(&self, vehicle_id: i64) -> ApiResult<()> {
        match self.api.delete_vehicle(vehicle_id).await {
            Ok(()) => {
                self.list
                    .write()
                    .await
                    .vehicles
                    .retain(|v| v.id != vehicle_id);

                let mut selected = self.selected.write().await;
                if selected.as_ref().map(|v| v.id) == Some(vehicle_id) {
                    *selected = None;
                }
                drop(selected);

                self.notifier.success("Vehicle deleted successfully");
                Ok(())
            }
            Err(e) => {
                self.notifier.publish_api_error(&e);
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Selección, filtros y paginación

    /// Seleccionar un vehículo y refrescar sus métricas
    pub async fn select_vehicle(&self, vehicle: Option<Vehicle>) {
        let vehicle_id = vehicle.as_ref().map(|v| v.id);
        *self.selected.write().await = vehicle;
        if let Some(id) = vehicle_id {
            self.fetch_metrics(id).await;
        }
    }

    /// Aplicar un patch de filtros
    ///
    /// Filtros y paginación están acoplados: cualquier cambio invalida
    /// la página actual, así que el cursor vuelve a 1 y se refetchea.
    pub async fn set_filters(&self, patch: VehicleFilters) {
        self.filters.write().await.merge(patch);
        self.list.write().await.pagination.current_page = 1;
        self.fetch_vehicles().await;
    }

    /// Vaciar todos los filtros y volver a la primera página
    pub async fn clear_filters(&self) {
        *self.filters.write().await = VehicleFilters::default();
        self.list.write().await.pagination.current_page = 1;
        self.fetch_vehicles().await;
    }

    /// Cambiar de página sin tocar los filtros
    pub async fn set_page(&self, page: u32) {
        self.list.write().await.pagination.current_page = page;
        self.fetch_vehicles().await;
    }
}
