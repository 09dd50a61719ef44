//! Utilidades de validación
//!
//! Patrones compartidos por los derives de `validator` en los payloads
//! de creación y actualización.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Matrícula: alfanumérica con guiones o espacios interiores, 3 a 20 caracteres
    pub static ref REGISTRATION_NUMBER: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 \-]{1,18}[A-Za-z0-9]$").unwrap();
}
