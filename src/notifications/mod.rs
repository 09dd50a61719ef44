//! Bus de notificaciones
//!
//! Fan-out publish/subscribe de mensajes transitorios hacia la UI. Una
//! notificación con duración programa un evento `Remove` explícito al
//! expirar; los suscriptores son responsables de retirarla de pantalla.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, oneshot, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::utils::errors::ApiError;

/// Capacidad del canal broadcast; los suscriptores lentos pierden eventos
const CHANNEL_CAPACITY: usize = 64;

const SUCCESS_DURATION_MS: u64 = 3000;
const ERROR_DURATION_MS: u64 = 5000;
const WARNING_DURATION_MS: u64 = 4000;
const INFO_DURATION_MS: u64 = 3000;

/// Clase de notificación
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

/// Notificación transitoria para la UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    /// Auto-descarte en milisegundos; `None` = persiste hasta acción externa
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Evento entregado a los suscriptores
///
/// La expiración es una variante explícita, no una copia mutada de la
/// notificación original.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    Show(Notification),
    Remove(Uuid),
}

/// Handle de una notificación de carga; `finish` publica el `Remove`
pub struct LoadingHandle {
    id: Uuid,
    sender: broadcast::Sender<NotificationEvent>,
}

impl LoadingHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Retirar la notificación de carga
    pub fn finish(self) {
        let _ = self.sender.send(NotificationEvent::Remove(self.id));
    }
}

/// Bus de notificaciones del cliente
pub struct NotificationBus {
    sender: broadcast::Sender<NotificationEvent>,
    pending_confirms: Mutex<HashMap<Uuid, oneshot::Sender<bool>>>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            pending_confirms: Mutex::new(HashMap::new()),
        }
    }

    /// Suscribirse al bus; soltar el receiver cancela la suscripción
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.sender.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) -> Uuid {
        self.publish(
            NotificationKind::Success,
            "Success",
            message,
            Some(SUCCESS_DURATION_MS),
        )
    }

    pub fn error(&self, message: impl Into<String>) -> Uuid {
        self.publish(
            NotificationKind::Error,
            "Error",
            message,
            Some(ERROR_DURATION_MS),
        )
    }

    pub fn warning(&self, message: impl Into<String>) -> Uuid {
        self.publish(
            NotificationKind::Warning,
            "Warning",
            message,
            Some(WARNING_DURATION_MS),
        )
    }

    pub fn info(&self, message: impl Into<String>) -> Uuid {
        self.publish(
            NotificationKind::Info,
            "Information",
            message,
            Some(INFO_DURATION_MS),
        )
    }

    /// Publicar una notificación; con duración, programa su expiración
    pub fn publish(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        duration_ms: Option<u64>,
    ) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            kind,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
            read: false,
            duration_ms,
        };
        let id = notification.id;

        debug!(kind = ?kind, %id, "notificación publicada");
        let _ = self.sender.send(NotificationEvent::Show(notification));

        if let Some(millis) = duration_ms {
            let sender = self.sender.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                let _ = sender.send(NotificationEvent::Remove(id));
            });
        }

        id
    }

    /// Publicar una confirmación y esperar la respuesta del usuario
    ///
    /// La notificación no expira sola; se retira al resolverse mediante
    /// `respond`. Si el lado de la UI desaparece sin responder, el futuro
    /// queda pendiente, igual que un diálogo que nadie cierra.
    pub async fn confirm(&self, message: impl Into<String>, title: impl Into<String>) -> bool {
        let notification = Notification {
            id: Uuid::new_v4(),
            kind: NotificationKind::Warning,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
            read: false,
            duration_ms: None,
        };
        let id = notification.id;

        let (tx, rx) = oneshot::channel();
        self.pending_confirms.lock().await.insert(id, tx);
        let _ = self.sender.send(NotificationEvent::Show(notification));

        let confirmed = rx.await.unwrap_or(false);
        let _ = self.sender.send(NotificationEvent::Remove(id));
        confirmed
    }

    /// Resolver una confirmación pendiente; respuestas desconocidas se ignoran
    pub async fn respond(&self, id: Uuid, confirmed: bool) {
        match self.pending_confirms.lock().await.remove(&id) {
            Some(tx) => {
                let _ = tx.send(confirmed);
            }
            None => debug!(%id, "respuesta a confirmación desconocida, ignorada"),
        }
    }

    /// Publicar una notificación de carga persistente
    pub fn loading(&self, message: impl Into<String>, title: impl Into<String>) -> LoadingHandle {
        let notification = Notification {
            id: Uuid::new_v4(),
            kind: NotificationKind::Info,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
            read: false,
            duration_ms: None,
        };
        let id = notification.id;
        let _ = self.sender.send(NotificationEvent::Show(notification));

        LoadingHandle {
            id,
            sender: self.sender.clone(),
        }
    }

    /// Mapeo centralizado de errores del API a notificaciones de usuario
    ///
    /// Cada fallo de request se traduce aquí exactamente una vez. Los
    /// errores de validación se reportan campo por campo.
    pub fn publish_api_error(&self, error: &ApiError) {
        match error {
            ApiError::Unauthorized => {
                self.error("Session expired. Please sign in again.");
            }
            ApiError::Forbidden => {
                self.error("Access denied");
            }
            ApiError::NotFound => {
                self.error("Resource not found");
            }
            ApiError::Validation(fields) => {
                if fields.is_empty() {
                    self.error("Validation failed");
                } else {
                    for field in fields {
                        self.error(field.to_string());
                    }
                }
            }
            ApiError::Server { status } => {
                warn!(status, "error del servidor notificado al usuario");
                self.error("Internal server error");
            }
            ApiError::NetworkUnreachable => {
                self.error("Unable to reach the server");
            }
            ApiError::Config(reason) => {
                warn!(%reason, "error de configuración de request");
                self.error("Request configuration error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::FieldError;

    #[tokio::test]
    async fn test_show_reaches_all_subscribers() {
        let bus = NotificationBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let id = bus.info("hola");

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                NotificationEvent::Show(n) => assert_eq!(n.id, id),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_duration_publishes_remove_after_expiry() {
        let bus = NotificationBus::new();
        let mut rx = bus.subscribe();

        let id = bus.publish(NotificationKind::Error, "Error", "falló", Some(3000));

        assert!(matches!(
            rx.recv().await.unwrap(),
            NotificationEvent::Show(_)
        ));

        tokio::time::sleep(Duration::from_millis(3001)).await;
        assert_eq!(rx.recv().await.unwrap(), NotificationEvent::Remove(id));
    }

    #[tokio::test]
    async fn test_confirm_resolves_with_response() {
        let bus = std::sync::Arc::new(NotificationBus::new());
        let mut rx = bus.subscribe();

        let bus_clone = bus.clone();
        let answer = tokio::spawn(async move { bus_clone.confirm("¿Eliminar?", "Confirm").await });

        let id = match rx.recv().await.unwrap() {
            NotificationEvent::Show(n) => n.id,
            other => panic!("unexpected event: {other:?}"),
        };
        bus.respond(id, true).await;

        assert!(answer.await.unwrap());
        assert_eq!(rx.recv().await.unwrap(), NotificationEvent::Remove(id));
    }

    #[tokio::test]
    async fn test_loading_handle_removes_on_finish() {
        let bus = NotificationBus::new();
        let mut rx = bus.subscribe();

        let handle = bus.loading("Cargando vehículos", "Loading");
        let id = handle.id();

        assert!(matches!(
            rx.recv().await.unwrap(),
            NotificationEvent::Show(_)
        ));

        handle.finish();
        assert_eq!(rx.recv().await.unwrap(), NotificationEvent::Remove(id));
    }

    #[tokio::test]
    async fn test_validation_errors_notify_per_field() {
        let bus = NotificationBus::new();
        let mut rx = bus.subscribe();

        bus.publish_api_error(&ApiError::Validation(vec![
            FieldError {
                field: "name".to_string(),
                message: "too short".to_string(),
            },
            FieldError {
                field: "registrationNumber".to_string(),
                message: "invalid".to_string(),
            },
        ]));

        let mut shown = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, NotificationEvent::Show(_)) {
                shown += 1;
            }
        }
        assert_eq!(shown, 2);
    }
}
