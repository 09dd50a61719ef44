//! Stores de estado del cliente
//!
//! Contenedores de estado explícitos, creados por el composition root
//! de la aplicación y compartidos por `Arc`; no hay singletons
//! ambientales.

pub mod auth;
pub mod vehicles;

pub use auth::AuthStore;
pub use vehicles::VehicleStore;
