// ==========================================
// Sistema de Gestión de Transporte - Capa de API
// ==========================================
// Responsabilidad: acceso al backend de persistencia por HTTP
// ==========================================

pub mod backend;
pub mod error;

pub use backend::{BackendApi, BackendRecord, HttpBackendClient};
pub use error::ApiError;
