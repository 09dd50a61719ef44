//! Tests de integración de los stores contra un backend en memoria

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{TimeZone, Utc};
use tokio::sync::Mutex;

use fleet_tracking::gateway::{TokenSlot, TrackingApi};
use fleet_tracking::models::auth::{
    AuthResponse, BusinessRegistration, ChangePasswordRequest, LoginCredentials, ProfileUpdate,
    SimpleRegistration, TokenResponse, User, UserKind,
};
use fleet_tracking::models::tracking::{Position, TrackingData, VehicleMetrics};
use fleet_tracking::models::vehicle::{
    CreateVehicleRequest, DateRange, Page, UpdateVehicleRequest, Vehicle, VehicleFilters,
    VehicleStatus, VehicleType,
};
use fleet_tracking::notifications::{NotificationBus, NotificationEvent, NotificationKind};
use fleet_tracking::storage::TokenStorage;
use fleet_tracking::stores::{AuthStore, VehicleStore};
use fleet_tracking::utils::errors::{ApiError, ApiResult};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn sample_vehicle(id: i64, name: &str, registration: &str) -> Vehicle {
    let when = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    Vehicle {
        id,
        name: name.to_string(),
        registration_number: registration.to_string(),
        vehicle_type: VehicleType::Car,
        status: VehicleStatus::Active,
        user_id: 1,
        created_at: when,
        updated_at: when,
        last_update: when,
        last_position: Some(Position::new(48.85, 2.35)),
        last_location: None,
    }
}

fn sample_track(vehicle_id: i64, count: usize) -> Vec<TrackingData> {
    (0..count)
        .map(|i| TrackingData {
            id: i as i64,
            vehicle_id,
            latitude: 48.85 + i as f64 * 0.01,
            longitude: 2.35,
            altitude: 35.0,
            speed: 50.0,
            heading: 90.0,
            battery_level: 80.0,
            signal_strength: 0.9,
            temperature: 21.0,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, i as u32, 0).unwrap(),
        })
        .collect()
}

fn page_of(vehicles: Vec<Vehicle>, number: u32, total: u64) -> Page<Vehicle> {
    Page {
        content: vehicles,
        number,
        total_elements: total,
        size: 10,
        total_pages: (total as u32).div_ceil(10).max(1),
    }
}

fn sample_user() -> User {
    let when = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    User {
        id: 1,
        email: "owner@example.com".to_string(),
        phone_number: "+33123456789".to_string(),
        created_at: when,
        updated_at: when,
        kind: UserKind::Business,
        company_name: Some("Transportes Norte".to_string()),
        registration_number: Some("RCS-1234".to_string()),
        manager_full_name: Some("A. Dupont".to_string()),
        full_name: None,
        id_card_number: None,
    }
}

/// Token con firma falsa; solo importa el claim de expiración
fn fake_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({ "sub": "1", "exp": exp })
            .to_string()
            .as_bytes(),
    );
    format!("{header}.{payload}.firma")
}

fn temp_storage() -> TokenStorage {
    let path = std::env::temp_dir()
        .join("fleet_tracking_store_tests")
        .join(uuid::Uuid::new_v4().to_string());
    TokenStorage::new(path)
}

/// Backend en memoria con respuestas programables por endpoint
#[derive(Default)]
struct FakeApi {
    list_results: Mutex<VecDeque<ApiResult<Page<Vehicle>>>>,
    list_calls: Mutex<Vec<(VehicleFilters, u32, u32)>>,
    history_tracks: Mutex<HashMap<i64, Vec<TrackingData>>>,
    history_delays: Mutex<HashMap<i64, u64>>,
    metrics: Mutex<HashMap<i64, VehicleMetrics>>,
    create_results: Mutex<VecDeque<ApiResult<Vehicle>>>,
    delete_results: Mutex<VecDeque<ApiResult<()>>>,
    login_results: Mutex<VecDeque<ApiResult<AuthResponse>>>,
    refresh_results: Mutex<VecDeque<ApiResult<TokenResponse>>>,
}

#[async_trait::async_trait]
impl TrackingApi for FakeApi {
    async fn login(&self, _credentials: &LoginCredentials) -> ApiResult<AuthResponse> {
        self.login_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| {
                Ok(AuthResponse {
                    token: fake_token(Utc::now().timestamp() + 3600),
                    user: sample_user(),
                })
            })
    }

    async fn register_business(
        &self,
        _registration: &BusinessRegistration,
    ) -> ApiResult<AuthResponse> {
        Err(ApiError::NotFound)
    }

    async fn register_simple(
        &self,
        _registration: &SimpleRegistration,
    ) -> ApiResult<AuthResponse> {
        Err(ApiError::NotFound)
    }

    async fn refresh_token(&self) -> ApiResult<TokenResponse> {
        self.refresh_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| {
                Ok(TokenResponse {
                    token: fake_token(Utc::now().timestamp() + 7200),
                })
            })
    }

    async fn current_user(&self) -> ApiResult<User> {
        Ok(sample_user())
    }

    async fn update_profile(&self, _profile: &ProfileUpdate) -> ApiResult<User> {
        Ok(sample_user())
    }

    async fn change_password(&self, _request: &ChangePasswordRequest) -> ApiResult<()> {
        Ok(())
    }

    async fn reset_password(&self, _email: &str) -> ApiResult<()> {
        Ok(())
    }

    async fn list_vehicles(
        &self,
        filters: &VehicleFilters,
        page: u32,
        size: u32,
    ) -> ApiResult<Page<Vehicle>> {
        self.list_calls
            .lock()
            .await
            .push((filters.clone(), page, size));
        self.list_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(page_of(vec![], 0, 0)))
    }

    async fn create_vehicle(&self, _request: &CreateVehicleRequest) -> ApiResult<Vehicle> {
        self.create_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(sample_vehicle(99, "nuevo", "NV-001")))
    }

    async fn update_vehicle(
        &self,
        vehicle_id: i64,
        request: &UpdateVehicleRequest,
    ) -> ApiResult<Vehicle> {
        let mut updated = sample_vehicle(vehicle_id, "updated", "UP-001");
        if let Some(name) = &request.name {
            updated.name = name.clone();
        }
        Ok(updated)
    }

    async fn delete_vehicle(&self, _vehicle_id: i64) -> ApiResult<()> {
        self.delete_results
            .lock()
            .await
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn vehicle_history(
        &self,
        vehicle_id: i64,
        _range: Option<DateRange>,
    ) -> ApiResult<Vec<TrackingData>> {
        let delay = self.history_delays.lock().await.get(&vehicle_id).copied();
        if let Some(millis) = delay {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
        Ok(self
            .history_tracks
            .lock()
            .await
            .get(&vehicle_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn vehicle_metrics(&self, vehicle_id: i64) -> ApiResult<VehicleMetrics> {
        self.metrics
            .lock()
            .await
            .get(&vehicle_id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }
}

fn vehicle_store(api: Arc<FakeApi>) -> (Arc<VehicleStore>, Arc<NotificationBus>) {
    let notifier = Arc::new(NotificationBus::new());
    let store = Arc::new(VehicleStore::new(api, notifier.clone()));
    (store, notifier)
}

fn drain_shown(
    rx: &mut tokio::sync::broadcast::Receiver<NotificationEvent>,
) -> Vec<fleet_tracking::notifications::Notification> {
    let mut shown = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let NotificationEvent::Show(notification) = event {
            shown.push(notification);
        }
    }
    shown
}

// ----------------------------------------------------------------------
// VehicleStore

#[tokio::test]
async fn test_set_filters_resets_page_and_fetches_once() {
    init_tracing();
    let api = Arc::new(FakeApi::default());
    // Primera respuesta deja el cursor en la página 3 (number 0-based)
    api.list_results
        .lock()
        .await
        .push_back(Ok(page_of(vec![], 2, 45)));
    let (store, _notifier) = vehicle_store(api.clone());

    store.set_page(3).await;
    assert_eq!(store.pagination().await.current_page, 3);

    store
        .set_filters(VehicleFilters {
            status: Some(VehicleStatus::Maintenance),
            ..Default::default()
        })
        .await;

    let calls = api.list_calls.lock().await;
    assert_eq!(calls.len(), 2, "un fetch por set_page y uno por set_filters");

    let (filters, page, _size) = &calls[1];
    assert_eq!(*page, 1, "el cambio de filtros vuelve a la primera página");
    assert_eq!(filters.status, Some(VehicleStatus::Maintenance));
}

#[tokio::test]
async fn test_filter_patch_merges_over_current_filters() {
    init_tracing();
    let api = Arc::new(FakeApi::default());
    let (store, _notifier) = vehicle_store(api.clone());

    store
        .set_filters(VehicleFilters {
            search: Some("norte".to_string()),
            ..Default::default()
        })
        .await;
    store
        .set_filters(VehicleFilters {
            status: Some(VehicleStatus::Maintenance),
            ..Default::default()
        })
        .await;

    let calls = api.list_calls.lock().await;
    let (filters, _, _) = &calls[1];
    assert_eq!(filters.search.as_deref(), Some("norte"));
    assert_eq!(filters.status, Some(VehicleStatus::Maintenance));
}

#[tokio::test]
async fn test_failed_fetch_keeps_state_and_emits_one_error() {
    init_tracing();
    let api = Arc::new(FakeApi::default());
    let vehicles = vec![
        sample_vehicle(1, "Camion Norte", "CN-100"),
        sample_vehicle(2, "Van Sur", "VS-200"),
    ];
    api.list_results
        .lock()
        .await
        .push_back(Ok(page_of(vehicles.clone(), 0, 2)));
    api.list_results
        .lock()
        .await
        .push_back(Err(ApiError::Server { status: 503 }));

    let (store, notifier) = vehicle_store(api);
    store.fetch_vehicles().await;
    let before_vehicles = store.vehicles().await;
    let before_pagination = store.pagination().await;

    let mut rx = notifier.subscribe();
    store.fetch_vehicles().await;

    let after_vehicles = store.vehicles().await;
    assert_eq!(after_vehicles.len(), before_vehicles.len());
    assert!(after_vehicles
        .iter()
        .zip(&before_vehicles)
        .all(|(a, b)| a.id == b.id));
    assert_eq!(store.pagination().await, before_pagination);

    let shown = drain_shown(&mut rx);
    assert_eq!(shown.len(), 1, "exactamente una notificación de error");
    assert_eq!(shown[0].kind, NotificationKind::Error);
}

#[tokio::test(start_paused = true)]
async fn test_stale_history_response_is_discarded() {
    init_tracing();
    let api = Arc::new(FakeApi::default());
    let slow_track = sample_track(1, 5);
    let fast_track = sample_track(2, 3);
    api.history_tracks.lock().await.insert(1, slow_track);
    api.history_tracks
        .lock()
        .await
        .insert(2, fast_track.clone());
    api.history_delays.lock().await.insert(1, 1000);

    let (store, _notifier) = vehicle_store(api);

    // El request del vehículo 1 queda en vuelo; el del 2 lo supera
    let slow = {
        let store = store.clone();
        tokio::spawn(async move { store.fetch_history(1, None).await })
    };
    tokio::task::yield_now().await;
    store.fetch_history(2, None).await;
    assert_eq!(store.history().await, fast_track);

    // La respuesta tardía del vehículo 1 llega y debe descartarse
    slow.await.unwrap();
    assert_eq!(
        store.history().await,
        fast_track,
        "la respuesta superada no puede pisar la del último request"
    );
}

#[tokio::test]
async fn test_failed_create_leaves_collection_and_reraises() {
    init_tracing();
    let api = Arc::new(FakeApi::default());
    api.create_results
        .lock()
        .await
        .push_back(Err(ApiError::Server { status: 500 }));
    let (store, notifier) = vehicle_store(api);
    let mut rx = notifier.subscribe();

    let request = CreateVehicleRequest {
        name: "Camion Norte".to_string(),
        registration_number: "CN-100".to_string(),
        vehicle_type: VehicleType::Truck,
    };
    let result = store.add_vehicle(&request).await;

    assert_eq!(result, Err(ApiError::Server { status: 500 }));
    assert!(store.vehicles().await.is_empty());
    assert_eq!(drain_shown(&mut rx).len(), 1);
}

#[tokio::test]
async fn test_invalid_create_request_fails_client_side() {
    init_tracing();
    let api = Arc::new(FakeApi::default());
    let (store, notifier) = vehicle_store(api);
    let mut rx = notifier.subscribe();

    let request = CreateVehicleRequest {
        name: "X".to_string(),
        registration_number: "!bad!".to_string(),
        vehicle_type: VehicleType::Car,
    };
    let result = store.add_vehicle(&request).await;

    assert!(matches!(result, Err(ApiError::Validation(_))));
    let shown = drain_shown(&mut rx);
    assert_eq!(shown.len(), 2, "una notificación por campo inválido");
}

#[tokio::test]
async fn test_delete_clears_selection() {
    init_tracing();
    let api = Arc::new(FakeApi::default());
    api.list_results
        .lock()
        .await
        .push_back(Ok(page_of(vec![sample_vehicle(7, "Moto", "MT-700")], 0, 1)));
    api.metrics.lock().await.insert(
        7,
        VehicleMetrics {
            current_speed: 30.0,
            average_speed: 25.0,
            distance: 120.0,
            runtime: 3600.0,
            fuel_level: None,
            temperature: 20.0,
            battery_level: 90.0,
            signal_strength: 0.8,
        },
    );

    let (store, _notifier) = vehicle_store(api);
    store.fetch_vehicles().await;
    let vehicle = store.vehicles().await[0].clone();
    store.select_vehicle(Some(vehicle)).await;
    assert!(store.selected_vehicle().await.is_some());
    assert!(store.metrics_for(7).await.is_some());

    store.delete_vehicle(7).await.unwrap();
    assert!(store.vehicles().await.is_empty());
    assert!(store.selected_vehicle().await.is_none());
}

#[tokio::test]
async fn test_filtered_vehicles_matches_registration_case_insensitively() {
    init_tracing();
    let api = Arc::new(FakeApi::default());
    let vehicles = vec![
        sample_vehicle(1, "Camion Norte", "XY-AB-123-Z"),
        sample_vehicle(2, "Van Sur", "VS-200"),
    ];
    api.list_results
        .lock()
        .await
        .push_back(Ok(page_of(vehicles.clone(), 0, 2)));
    api.list_results
        .lock()
        .await
        .push_back(Ok(page_of(vehicles, 0, 2)));

    let (store, _notifier) = vehicle_store(api);
    store.fetch_vehicles().await;
    store
        .set_filters(VehicleFilters {
            search: Some("AB-123".to_string()),
            ..Default::default()
        })
        .await;

    let filtered = store.filtered_vehicles().await;
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, 1);
}

#[tokio::test]
async fn test_metrics_merge_without_disturbing_others() {
    init_tracing();
    let api = Arc::new(FakeApi::default());
    let metrics = VehicleMetrics {
        current_speed: 30.0,
        average_speed: 25.0,
        distance: 120.0,
        runtime: 3600.0,
        fuel_level: Some(0.5),
        temperature: 20.0,
        battery_level: 90.0,
        signal_strength: 0.8,
    };
    api.metrics.lock().await.insert(1, metrics.clone());
    api.metrics.lock().await.insert(
        2,
        VehicleMetrics {
            current_speed: 10.0,
            ..metrics.clone()
        },
    );

    let (store, _notifier) = vehicle_store(api.clone());
    store.fetch_metrics_batch(&[1, 2]).await;
    assert_eq!(store.metrics_for(1).await.unwrap().current_speed, 30.0);
    assert_eq!(store.metrics_for(2).await.unwrap().current_speed, 10.0);

    // Refrescar el 2 no toca el 1
    api.metrics.lock().await.insert(
        2,
        VehicleMetrics {
            current_speed: 55.0,
            ..metrics
        },
    );
    store.fetch_metrics(2).await;
    assert_eq!(store.metrics_for(1).await.unwrap().current_speed, 30.0);
    assert_eq!(store.metrics_for(2).await.unwrap().current_speed, 55.0);
}

// ----------------------------------------------------------------------
// AuthStore

fn auth_store(api: Arc<FakeApi>) -> (Arc<AuthStore>, Arc<NotificationBus>, TokenSlot) {
    let notifier = Arc::new(NotificationBus::new());
    let token: TokenSlot = Arc::new(tokio::sync::RwLock::new(None));
    let store = Arc::new(AuthStore::new(
        api,
        notifier.clone(),
        temp_storage(),
        token.clone(),
        Duration::from_secs(300),
    ));
    (store, notifier, token)
}

#[tokio::test]
async fn test_expired_token_forces_logout() {
    init_tracing();
    let api = Arc::new(FakeApi::default());
    let (store, notifier, token) = auth_store(api);
    *token.write().await = Some(fake_token(Utc::now().timestamp() - 60));

    let mut rx = notifier.subscribe();
    assert!(!store.check_token_expiration().await);
    assert!(!store.is_authenticated().await);

    let shown = drain_shown(&mut rx);
    assert!(shown
        .iter()
        .any(|n| n.kind == NotificationKind::Warning));
}

#[tokio::test]
async fn test_valid_token_keeps_session() {
    init_tracing();
    let api = Arc::new(FakeApi::default());
    let (store, _notifier, token) = auth_store(api);
    *token.write().await = Some(fake_token(Utc::now().timestamp() + 3600));

    assert!(store.check_token_expiration().await);
    assert!(store.is_authenticated().await);
}

#[tokio::test]
async fn test_login_persists_token_and_user() {
    init_tracing();
    let api = Arc::new(FakeApi::default());
    let (store, _notifier, token) = auth_store(api);

    store
        .login(&LoginCredentials {
            email: "owner@example.com".to_string(),
            password: "supersecret".to_string(),
        })
        .await
        .unwrap();

    assert!(token.read().await.is_some());
    assert!(store.is_business_user().await);
}

#[tokio::test]
async fn test_login_with_bad_credentials_notifies_and_reraises() {
    init_tracing();
    let api = Arc::new(FakeApi::default());
    api.login_results
        .lock()
        .await
        .push_back(Err(ApiError::Unauthorized));
    let (store, notifier, _token) = auth_store(api);
    let mut rx = notifier.subscribe();

    let result = store
        .login(&LoginCredentials {
            email: "owner@example.com".to_string(),
            password: "wrong-password".to_string(),
        })
        .await;

    assert_eq!(result, Err(ApiError::Unauthorized));
    let shown = drain_shown(&mut rx);
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].message, "Invalid credentials");
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    init_tracing();
    let api = Arc::new(FakeApi::default());
    let (store, notifier, token) = auth_store(api);
    *token.write().await = Some(fake_token(Utc::now().timestamp() + 3600));

    let mut rx = notifier.subscribe();
    store.logout().await;
    store.logout().await;

    let shown = drain_shown(&mut rx);
    assert_eq!(shown.len(), 1, "solo la transición real notifica");
}

#[tokio::test]
async fn test_update_profile_replaces_user() {
    init_tracing();
    let api = Arc::new(FakeApi::default());
    let (store, notifier, _token) = auth_store(api);
    let mut rx = notifier.subscribe();

    let updated = store
        .update_profile(&ProfileUpdate {
            company_name: Some("Transportes Sur".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(store.user().await.unwrap().id, updated.id);
    let shown = drain_shown(&mut rx);
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].kind, NotificationKind::Success);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_task_renews_valid_token() {
    init_tracing();
    let api = Arc::new(FakeApi::default());
    let renewed = fake_token(Utc::now().timestamp() + 7200);
    api.refresh_results
        .lock()
        .await
        .push_back(Ok(TokenResponse {
            token: renewed.clone(),
        }));

    let (store, _notifier, token) = auth_store(api);
    let original = fake_token(Utc::now().timestamp() + 3600);
    *token.write().await = Some(original.clone());

    store.start_refresh_task();
    tokio::time::sleep(Duration::from_secs(301)).await;
    store.cleanup();

    assert_eq!(token.read().await.as_deref(), Some(renewed.as_str()));
}
