//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al contrato REST del backend de tracking.

pub mod auth;
pub mod tracking;
pub mod vehicle;
