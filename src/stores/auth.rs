//! Store de sesión
//!
//! Mantiene el token bearer y el usuario autenticado. El token persiste
//! en almacenamiento durable en cada cambio; el usuario es volátil y se
//! vuelve a pedir tras una recarga. Dos disparadores independientes, el
//! timer de expiración y el hook de 401 del gateway, convergen en el
//! mismo `logout` idempotente.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::gateway::{TokenSlot, TrackingApi};
use crate::models::auth::{
    BusinessRegistration, ChangePasswordRequest, LoginCredentials, ProfileUpdate,
    SimpleRegistration, User,
};
use crate::notifications::NotificationBus;
use crate::storage::TokenStorage;
use crate::utils::errors::{ApiError, ApiResult};
use crate::utils::jwt;

/// Store de autenticación
pub struct AuthStore {
    api: Arc<dyn TrackingApi>,
    notifier: Arc<NotificationBus>,
    storage: TokenStorage,
    /// Slot compartido con el gateway; es la única fuente del token
    token: TokenSlot,
    user: RwLock<Option<User>>,
    loading: AtomicBool,
    refresh_interval: Duration,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl AuthStore {
    pub fn new(
        api: Arc<dyn TrackingApi>,
        notifier: Arc<NotificationBus>,
        storage: TokenStorage,
        token: TokenSlot,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            api,
            notifier,
            storage,
            token,
            user: RwLock::new(None),
            loading: AtomicBool::new(false),
            refresh_interval,
            refresh_task: Mutex::new(None),
        }
    }

    /// Restaurar la sesión persistida y recargar el usuario si procede
    pub async fn initialize(&self) -> ApiResult<()> {
        if let Some(stored) = self.storage.load() {
            debug!("token persistido encontrado, restaurando sesión");
            *self.token.write().await = Some(stored);
        }

        if self.is_authenticated().await && self.user.read().await.is_none() {
            self.fetch_current_user().await?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lecturas

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub async fn is_business_user(&self) -> bool {
        self.user
            .read()
            .await
            .as_ref()
            .map(User::is_business)
            .unwrap_or(false)
    }

    pub async fn user(&self) -> Option<User> {
        self.user.read().await.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Flujos de autenticación

    pub async fn login(&self, credentials: &LoginCredentials) -> ApiResult<()> {
        self.loading.store(true, Ordering::SeqCst);
        let result = self.api.login(credentials).await;
        self.loading.store(false, Ordering::SeqCst);

        match result {
            Ok(response) => {
                self.set_token(Some(response.token)).await;
                *self.user.write().await = Some(response.user);
                self.notifier.success("Signed in successfully");
                Ok(())
            }
            Err(ApiError::Unauthorized) => {
                self.notifier.error("Invalid credentials");
                Err(ApiError::Unauthorized)
            }
            Err(e) => {
                self.notifier.publish_api_error(&e);
                Err(e)
            }
        }
    }

    pub async fn register_business(&self, registration: &BusinessRegistration) -> ApiResult<()> {
        self.loading.store(true, Ordering::SeqCst);
        let result = self.api.register_business(registration).await;
        self.loading.store(false, Ordering::SeqCst);

        match result {
            Ok(response) => {
                self.set_token(Some(response.token)).await;
                *self.user.write().await = Some(response.user);
                self.notifier.success("Registration successful");
                Ok(())
            }
            Err(e) => {
                self.notifier.publish_api_error(&e);
                Err(e)
            }
        }
    }

    pub async fn register_simple(&self, registration: &SimpleRegistration) -> ApiResult<()> {
        self.loading.store(true, Ordering::SeqCst);
        let result = self.api.register_simple(registration).await;
        self.loading.store(false, Ordering::SeqCst);

        match result {
            Ok(response) => {
                self.set_token(Some(response.token)).await;
                *self.user.write().await = Some(response.user);
                self.notifier.success("Registration successful");
                Ok(())
            }
            Err(e) => {
                self.notifier.publish_api_error(&e);
                Err(e)
            }
        }
    }

    /// Recargar el usuario autenticado desde el backend
    ///
    /// Un fallo aquí invalida la sesión completa: sin usuario no hay
    /// vista autenticada que mantener.
    pub async fn fetch_current_user(&self) -> ApiResult<()> {
        self.loading.store(true, Ordering::SeqCst);
        let result = self.api.current_user().await;
        self.loading.store(false, Ordering::SeqCst);

        match result {
            Ok(user) => {
                *self.user.write().await = Some(user);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "fallo cargando el usuario actual");
                self.notifier.publish_api_error(&e);
                self.logout().await;
                Err(e)
            }
        }
    }

    pub async fn update_profile(&self, profile: &ProfileUpdate) -> ApiResult<User> {
        match self.api.update_profile(profile).await {
            Ok(user) => {
                *self.user.write().await = Some(user.clone());
                self.notifier.success("Profile updated successfully");
                Ok(user)
            }
            Err(e) => {
                self.notifier.publish_api_error(&e);
                Err(e)
            }
        }
    }

    pub async fn change_password(&self, request: &ChangePasswordRequest) -> ApiResult<()> {
        match self.api.change_password(request).await {
            Ok(()) => {
                self.notifier.success("Password changed successfully");
                Ok(())
            }
            Err(e) => {
                self.notifier.publish_api_error(&e);
                Err(e)
            }
        }
    }

    pub async fn reset_password(&self, email: &str) -> ApiResult<()> {
        match self.api.reset_password(email).await {
            Ok(()) => {
                self.notifier
                    .success("Password reset instructions sent by email");
                Ok(())
            }
            Err(e) => {
                self.notifier.publish_api_error(&e);
                Err(e)
            }
        }
    }

    /// Cerrar la sesión; idempotente, notifica solo en la transición real
    pub async fn logout(&self) {
        let had_token = self.token.write().await.take().is_some();
        let had_user = self.user.write().await.take().is_some();
        self.storage.clear();

        if had_token || had_user {
            info!("sesión cerrada");
            self.notifier.info("Signed out");
        }
    }

    /// Fijar o limpiar el token, persistiéndolo en el mismo paso
    async fn set_token(&self, token: Option<String>) {
        match &token {
            Some(value) => {
                if let Err(e) = self.storage.store(value) {
                    warn!(error = %e, "no se pudo persistir el token");
                }
            }
            None => self.storage.clear(),
        }
        *self.token.write().await = token;
    }

    // ------------------------------------------------------------------
    // Expiración y refresh

    /// Verificar el claim de expiración del token vigente
    ///
    /// Un token expirado o ilegible fuerza el logout y devuelve `false`;
    /// un token vigente deja la sesión intacta y devuelve `true`.
    pub async fn check_token_expiration(&self) -> bool {
        let token = self.token.read().await.clone();
        let Some(token) = token else {
            return false;
        };

        match jwt::decode_claims(&token) {
            Ok(claims) if !jwt::is_expired(&claims) => true,
            Ok(_) => {
                self.logout().await;
                self.notifier
                    .warning("Session expired, please sign in again");
                false
            }
            Err(e) => {
                warn!(error = %e, "token de sesión ilegible");
                self.logout().await;
                false
            }
        }
    }

    /// Arrancar el chequeo periódico de expiración con refresh proactivo
    ///
    /// Cada tick: token expirado → logout (vía `check_token_expiration`);
    /// token vigente → se pide uno fresco al backend.
    pub fn start_refresh_task(self: &Arc<Self>) {
        let mut guard = self.refresh_task.lock().expect("refresh task lock poisoned");
        if guard.is_some() {
            warn!("el timer de refresh ya está activo");
            return;
        }

        let store = Arc::clone(self);
        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(store.refresh_interval);
            // El primer tick del interval es inmediato; el chequeo empieza
            // un periodo completo después, como un setInterval.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if !store.check_token_expiration().await {
                    continue;
                }
                match store.api.refresh_token().await {
                    Ok(response) => {
                        debug!("token de sesión refrescado");
                        store.set_token(Some(response.token)).await;
                    }
                    Err(e) => {
                        warn!(error = %e, "fallo refrescando el token");
                        store.logout().await;
                    }
                }
            }
        }));
    }

    /// Detener el timer de refresh; seguro de llamar más de una vez
    pub fn cleanup(&self) {
        if let Some(handle) = self
            .refresh_task
            .lock()
            .expect("refresh task lock poisoned")
            .take()
        {
            handle.abort();
        }
    }
}

impl Drop for AuthStore {
    fn drop(&mut self) {
        self.cleanup();
    }
}
