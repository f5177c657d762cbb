// ==========================================
// Sistema de Gestión de Transporte - Capa de importación
// ==========================================
// Responsabilidad: pipeline de importación tabular
// Etapas: lectura -> validación -> recuperación -> commit masivo
// Soporta: Excel (.xlsx/.xls), CSV
// ==========================================

// Declaración de módulos
pub mod bulk_committer;
pub mod error;
pub mod file_reader;
pub mod pipeline;
pub mod recovery;
pub mod rules;
pub mod validator;

// Re-exportación de tipos centrales
pub use bulk_committer::{BulkCommitter, CommitOptions, ProgressCallback};
pub use error::{ImportError, Result};
pub use file_reader::{FileInfo, ReaderOptions, SheetData, StructureReport, TabularReader};
pub use pipeline::{ImportPipeline, ImportSummary, PipelineResult};
pub use recovery::{attempt_format_correction, FormatCorrection, RecoveryPlanner};
pub use rules::{catalog_for, EntityRules, RuleKind, ValidationRule};
pub use validator::{ReferenceSnapshot, ValidationEngine};
