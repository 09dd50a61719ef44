//! Almacenamiento durable del token de sesión
//!
//! Un solo valor en una sola ruta. La ausencia del archivo significa
//! no autenticado. Los fallos de disco degradan a warning: la sesión
//! simplemente no sobrevive una recarga.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

/// Persistencia del token de sesión
#[derive(Debug, Clone)]
pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Leer el token persistido, si existe
    pub fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim().to_string();
                if token.is_empty() {
                    None
                } else {
                    Some(token)
                }
            }
            Err(_) => None,
        }
    }

    /// Persistir el token, creando el directorio si hace falta
    pub fn store(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating token directory {}", parent.display()))?;
        }
        fs::write(&self.path, token)
            .with_context(|| format!("writing token to {}", self.path.display()))
    }

    /// Eliminar el token persistido
    pub fn clear(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "no se pudo eliminar el token");
            }
        }
    }
}
