//! Lectura de claims del token de sesión
//!
//! El cliente no firma ni verifica tokens: solo decodifica el segmento
//! de payload para conocer el claim de expiración.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;

use crate::models::auth::TokenClaims;
use crate::utils::errors::{ApiError, ApiResult};

/// Decodificar los claims del payload de un JWT sin verificar la firma
pub fn decode_claims(token: &str) -> ApiResult<TokenClaims> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| ApiError::Config("malformed session token".to_string()))?;

    let raw = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| ApiError::Config("session token payload is not base64".to_string()))?;

    serde_json::from_slice(&raw)
        .map_err(|_| ApiError::Config("session token payload is not valid JSON".to_string()))
}

/// Verificar si el claim de expiración ya pasó
pub fn is_expired(claims: &TokenClaims) -> bool {
    Utc::now().timestamp() >= claims.exp
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Construye un token con firma falsa; solo importa el payload
    fn fake_token(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            json!({ "sub": "42", "exp": exp, "iat": exp - 3600 })
                .to_string()
                .as_bytes(),
        );
        format!("{header}.{payload}.firma")
    }

    #[test]
    fn test_decode_claims_reads_expiry() {
        let token = fake_token(1_900_000_000);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, 1_900_000_000);
        assert_eq!(claims.sub, "42");
    }

    #[test]
    fn test_expired_and_valid_claims() {
        let past = decode_claims(&fake_token(Utc::now().timestamp() - 60)).unwrap();
        assert!(is_expired(&past));

        let future = decode_claims(&fake_token(Utc::now().timestamp() + 3600)).unwrap();
        assert!(!is_expired(&future));
    }

    #[test]
    fn test_malformed_token_is_rejected() {
        assert!(decode_claims("not-a-token").is_err());
        assert!(decode_claims("a.!!!!.c").is_err());
    }
}
