// ==========================================
// Sistema de Gestión de Transporte - Errores de importación
// ==========================================
// Herramienta: macro derive de thiserror
// Política: los problemas de fila viajan en objetos de resultado;
// estos errores quedan para fallas de archivo, estructura, entidad
// e infraestructura, que abortan la sesión completa.
// ==========================================

use crate::api::ApiError;
use thiserror::Error;

/// Error del pipeline de importación
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== Errores de archivo =====
    #[error("archivo no encontrado: {0}")]
    FileNotFound(String),

    #[error("formato de archivo no soportado: {0} (solo .xlsx/.xls/.csv)")]
    UnsupportedFormat(String),

    #[error("falla al leer el archivo: {0}")]
    FileReadError(String),

    #[error("falla al parsear Excel: {0}")]
    ExcelParseError(String),

    #[error("falla al parsear CSV: {0}")]
    CsvParseError(String),

    // ===== Errores estructurales (abortan antes de tocar filas) =====
    #[error("estructura de archivo inválida: {0}")]
    InvalidStructure(String),

    #[error("hoja no encontrada: {0}")]
    SheetNotFound(String),

    // ===== Errores de programación =====
    #[error("tipo de entidad no soportado: {0}")]
    UnsupportedEntity(String),

    // ===== Errores de infraestructura =====
    #[error("falla del backend: {0}")]
    Backend(#[from] ApiError),

    // ===== Errores genéricos =====
    #[error("error interno: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

impl From<reqwest::Error> for ImportError {
    fn from(err: reqwest::Error) -> Self {
        ImportError::Backend(ApiError::from(err))
    }
}

/// Alias de Result para el pipeline
pub type Result<T> = std::result::Result<T, ImportError>;
