// ==========================================
// Sistema de Gestión de Transporte - Errores de API
// ==========================================
// Herramienta: macro derive de thiserror
// ==========================================

use thiserror::Error;

/// Error del cliente del backend
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("error de red: {0}")]
    Network(String),

    #[error("timeout de red: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("respuesta inválida del backend: {0}")]
    InvalidResponse(String),

    #[error("tipo de entidad no soportado: {0}")]
    UnsupportedEntity(String),
}

impl ApiError {
    /// Falla transitoria: se reintenta con backoff.
    /// Red/timeout y HTTP 408, 429 y 5xx cuentan como transitorias.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout(_) => true,
            ApiError::Status { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
