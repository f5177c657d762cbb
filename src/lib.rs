// ==========================================
// Sistema de Gestión de Transporte - Importación Masiva
// ==========================================
// Núcleo de importación tabular: planilla subida -> registros validados
// Flujo: lectura -> validación -> recuperación -> commit masivo
// Persistencia: API HTTP del backend (sin base local)
// ==========================================

// ==========================================
// Declaración de módulos
// ==========================================

// Capa de dominio - entidades y tipos
pub mod domain;

// Capa de configuración - política de importación
pub mod config;

// Capa de importación - pipeline completo
pub mod importer;

// Capa de API - cliente del backend
pub mod api;

// Sistema de logs
pub mod logging;

// ==========================================
// Re-exportación de tipos centrales
// ==========================================

// Tipos de dominio
pub use domain::{
    BulkError, BulkProgress, BulkResult, CellValue, EntityType, RecoveryAction, RecoveryKind,
    RecoveryPlan, RecoveryResult, Row, Severity, ValidationError, ValidationResult,
    ValidationSummary,
};

// Configuración
pub use config::ImportOptions;

// Pipeline
pub use importer::{
    BulkCommitter, CommitOptions, FileInfo, ImportError, ImportPipeline, ImportSummary,
    PipelineResult, ProgressCallback, RecoveryPlanner, ReferenceSnapshot, SheetData,
    StructureReport, TabularReader, ValidationEngine,
};

// Backend
pub use api::{ApiError, BackendApi, BackendRecord, HttpBackendClient};

// ==========================================
// Constantes del sistema
// ==========================================

// Versión del sistema
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Nombre del sistema
pub const APP_NAME: &str = "Sistema de Gestión de Transporte - Importación Masiva";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
