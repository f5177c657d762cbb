// ==========================================
// Sistema de Gestión de Transporte - Capa de dominio
// ==========================================
// Responsabilidad: entidades y tipos del pipeline de importación
// Restricción: sin acceso a datos, sin lógica de pipeline
// ==========================================

pub mod bulk;
pub mod recovery;
pub mod row;
pub mod types;
pub mod validation;

// Re-exportación de tipos centrales
pub use bulk::{BulkError, BulkProgress, BulkResult};
pub use recovery::{AppliedAction, RecoveryAction, RecoveryKind, RecoveryPlan, RecoveryResult};
pub use row::Row;
pub use types::{CellValue, EntityType, Severity};
pub use validation::{ValidationError, ValidationResult, ValidationSummary};
