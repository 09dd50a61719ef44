//! Modelos de autenticación
//!
//! Este módulo contiene los tipos de usuario, credenciales y payloads
//! de registro que espera el backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Clase de cuenta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
    Business,
    Simple,
}

/// Usuario autenticado
///
/// El backend devuelve un solo shape con los campos del subtipo que
/// corresponda; los del otro subtipo llegan ausentes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: UserKind,

    // Campos de cuenta empresa
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_full_name: Option<String>,

    // Campos de cuenta particular
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_card_number: Option<String>,
}

impl User {
    pub fn is_business(&self) -> bool {
        self.kind == UserKind::Business
    }
}

/// Credenciales de login
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginCredentials {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

/// Registro de cuenta empresa
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRegistration {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 2, max = 100))]
    pub company_name: String,
    #[validate(length(min = 2, max = 50))]
    pub registration_number: String,
    #[validate(length(min = 2, max = 100))]
    pub manager_full_name: String,
    pub phone_number: String,
}

/// Registro de cuenta particular
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SimpleRegistration {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 2, max = 100))]
    pub full_name: String,
    #[validate(length(min = 2, max = 50))]
    pub id_card_number: String,
    pub phone_number: String,
}

/// Respuesta de autenticación (login y registro)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Respuesta del endpoint de refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Request de cambio de contraseña
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8))]
    pub new_password: String,
}

/// Patch parcial de perfil
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Claims embebidos en el token de sesión
///
/// El cliente solo los lee para conocer la expiración; nunca firma
/// ni verifica tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}
