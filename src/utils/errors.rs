//! Sistema de manejo de errores
//!
//! Este módulo define el error tipado que produce el gateway HTTP, una
//! sola vez, en la frontera con el backend. El resto del cliente solo
//! ve estas variantes.

use thiserror::Error;

/// Error de un campo concreto en una respuesta de validación
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Errores del cliente de tracking
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("Validation failed ({} fields)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Server error (status {status})")]
    Server { status: u16 },

    #[error("Network unreachable")]
    NetworkUnreachable,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Resultado tipado para operaciones contra el backend
pub type ApiResult<T> = Result<T, ApiError>;

/// Función helper para crear un error de validación de un solo campo
pub fn validation_error(field: &str, message: &str) -> ApiError {
    ApiError::Validation(vec![FieldError {
        field: field.to_string(),
        message: message.to_string(),
    }])
}

/// Convertir los errores del derive de `validator` al error tipado
pub fn from_validation_errors(errors: validator::ValidationErrors) -> ApiError {
    let mut fields = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| error.code.to_string());
            fields.push(FieldError {
                field: field.to_string(),
                message,
            });
        }
    }
    ApiError::Validation(fields)
}
