//! Cliente de tracking GPS de flotas
//!
//! Núcleo cliente de un producto de seguimiento de vehículos: sesión
//! autenticada contra el backend REST, espejo local de la colección de
//! vehículos con su track histórico y métricas, proyección de ese
//! estado sobre un mapa en vivo y fan-out de notificaciones hacia la UI.
//!
//! El composition root de la aplicación crea la configuración, el
//! gateway y los stores, y los comparte por `Arc`:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fleet_tracking::config::ClientConfig;
//! use fleet_tracking::gateway::HttpGateway;
//! use fleet_tracking::notifications::NotificationBus;
//! use fleet_tracking::storage::TokenStorage;
//! use fleet_tracking::stores::{AuthStore, VehicleStore};
//!
//! # async fn build() -> fleet_tracking::utils::errors::ApiResult<()> {
//! let config = ClientConfig::default();
//! let notifier = Arc::new(NotificationBus::new());
//! let gateway = Arc::new(HttpGateway::new(config.clone())?);
//!
//! let auth = Arc::new(AuthStore::new(
//!     gateway.clone(),
//!     notifier.clone(),
//!     TokenStorage::new(config.token_storage_path.clone()),
//!     gateway.token_slot(),
//!     config.token_refresh_interval,
//! ));
//! let vehicles = Arc::new(VehicleStore::new(gateway.clone(), notifier.clone()));
//!
//! auth.initialize().await?;
//! auth.start_refresh_task();
//! vehicles.initialize().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod gateway;
pub mod map;
pub mod models;
pub mod notifications;
pub mod storage;
pub mod stores;
pub mod utils;
