// ==========================================
// Sistema de Gestión de Transporte - Orquestador de importación
// ==========================================
// Encadena las etapas del pipeline sobre un archivo subido:
//   1. lectura y validación estructural
//   2. snapshot de referencia del backend
//   3. validación por reglas
//   4. recuperación automática (opcional por política)
//   5. commit masivo de válidas + recuperadas
// Las fallas estructurales abortan con Err; los problemas de fila
// viajan en el resultado, nunca como error del pipeline.
// ==========================================

use crate::api::BackendApi;
use crate::config::ImportOptions;
use crate::domain::{BulkResult, EntityType, RecoveryResult, Row, ValidationResult};
use crate::importer::bulk_committer::{BulkCommitter, CommitOptions, ProgressCallback};
use crate::importer::error::{ImportError, Result};
use crate::importer::file_reader::{FileInfo, ReaderOptions, SheetData, TabularReader};
use crate::importer::recovery::RecoveryPlanner;
use crate::importer::validator::{ReferenceSnapshot, ValidationEngine};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

// ==========================================
// Resumen de la sesión
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub session_id: String,
    pub entity: EntityType,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub recovered_rows: usize,
    pub skipped_rows: usize,
    /// Filas que quedaron inválidas tras la recuperación
    pub rejected_rows: usize,
    pub committed_rows: usize,
    pub failed_rows: usize,
    pub elapsed_ms: u64,
    /// Reporte textual (según política)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
}

// ==========================================
// Resultado completo de la sesión
// ==========================================
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub file_info: FileInfo,
    /// Filas que llegaron a la etapa de commit (válidas + recuperadas)
    pub processed_data: Vec<Row>,
    pub validation: ValidationResult,
    pub recovery: Option<RecoveryResult>,
    pub bulk: Option<BulkResult>,
    pub summary: ImportSummary,
}

// ==========================================
// Orquestador
// ==========================================
pub struct ImportPipeline<A: BackendApi + 'static> {
    api: Arc<A>,
    options: ImportOptions,
}

impl<A: BackendApi + 'static> ImportPipeline<A> {
    pub fn new(api: Arc<A>, options: ImportOptions) -> Self {
        Self { api, options }
    }

    pub fn with_defaults(api: Arc<A>) -> Self {
        Self::new(api, ImportOptions::default())
    }

    /// Importación completa: lectura, validación, recuperación y commit
    pub async fn import_file(
        &self,
        path: &Path,
        entity: Option<EntityType>,
        progress: Option<ProgressCallback>,
        cancel: Option<CancellationToken>,
    ) -> Result<PipelineResult> {
        let session_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        info!(
            sesion = %session_id,
            archivo = %path.display(),
            "Paso 1: lectura y validación estructural"
        );
        let reader = self.reader();
        let info = reader.load(path)?;
        let (sheet, entity) = self.resolve_sheet(&reader, &info, entity)?;

        info!(sesion = %session_id, entity = %entity, "Paso 2: snapshot de referencia");
        let snapshot = ReferenceSnapshot::load(self.api.as_ref()).await?;

        info!(sesion = %session_id, filas = sheet.rows.len(), "Paso 3: validación por reglas");
        let engine = ValidationEngine::new(&snapshot);
        let validation = engine.validate(entity, &sheet)?;

        let recovery = if self.options.auto_correct && !validation.invalid.is_empty() {
            info!(
                sesion = %session_id,
                invalidas = validation.invalid.len(),
                "Paso 4: recuperación automática"
            );
            let planner = RecoveryPlanner::new(&snapshot);
            let plan = planner.analyze(entity, &validation)?;
            Some(planner.execute(&plan, &validation, self.options.skip_invalid_rows))
        } else {
            None
        };

        // Filas a confirmar: válidas + recuperadas, en el orden original
        let mut commit_rows: Vec<Row> = validation.valid.clone();
        if let Some(recovery) = &recovery {
            commit_rows.extend(recovery.recovered.iter().cloned());
        }
        commit_rows.sort_by_key(|r| r.number);

        info!(sesion = %session_id, filas = commit_rows.len(), "Paso 5: commit masivo");
        let committer =
            BulkCommitter::new(Arc::clone(&self.api), CommitOptions::from(&self.options));
        let bulk = committer
            .bulk_insert(entity, commit_rows.clone(), progress, cancel)
            .await;

        if !bulk.success {
            warn!(
                sesion = %session_id,
                fallidas = bulk.failed,
                cancelado = bulk.cancelled,
                "Commit masivo con problemas"
            );
        }

        let summary = self.build_summary(
            session_id,
            entity,
            &validation,
            recovery.as_ref(),
            Some(&bulk),
            started.elapsed(),
        );
        info!(
            sesion = %summary.session_id,
            confirmadas = summary.committed_rows,
            rechazadas = summary.rejected_rows,
            duracion_ms = summary.elapsed_ms,
            "Sesión de importación finalizada"
        );

        Ok(PipelineResult {
            file_info: info,
            processed_data: commit_rows,
            validation,
            recovery,
            bulk: Some(bulk),
            summary,
        })
    }

    /// Corrida en seco: lee y valida sin tocar el backend con escrituras
    pub async fn validate_file(
        &self,
        path: &Path,
        entity: Option<EntityType>,
    ) -> Result<PipelineResult> {
        let session_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        let reader = self.reader();
        let info = reader.load(path)?;
        let (sheet, entity) = self.resolve_sheet(&reader, &info, entity)?;

        let snapshot = ReferenceSnapshot::load(self.api.as_ref()).await?;
        let engine = ValidationEngine::new(&snapshot);
        let validation = engine.validate(entity, &sheet)?;

        let summary = self.build_summary(
            session_id,
            entity,
            &validation,
            None,
            None,
            started.elapsed(),
        );

        Ok(PipelineResult {
            file_info: info,
            processed_data: validation.valid.clone(),
            validation,
            recovery: None,
            bulk: None,
            summary,
        })
    }

    fn reader(&self) -> TabularReader {
        TabularReader::new(ReaderOptions {
            drop_empty_rows: true,
            max_total_rows: self.options.max_total_rows,
            required_sheets: self.options.required_sheets.clone(),
        })
    }

    /// Resuelve la hoja de trabajo y su entidad
    ///
    /// Con entidad pedida: primera hoja cuya detección coincide.
    /// Sin entidad: primera hoja del archivo, cuya entidad debe ser
    /// detectable.
    fn resolve_sheet(
        &self,
        reader: &TabularReader,
        info: &FileInfo,
        requested: Option<EntityType>,
    ) -> Result<(SheetData, EntityType)> {
        let structure = reader.validate_structure(info);
        if !structure.valid {
            return Err(ImportError::InvalidStructure(structure.errors.join("; ")));
        }

        match requested {
            Some(entity) => {
                for sheet in &info.sheets {
                    if reader.detect_entity_type(info, &sheet.name) == entity {
                        return Ok((sheet.clone(), entity));
                    }
                }
                Err(ImportError::SheetNotFound(entity.to_string()))
            }
            None => {
                let sheet = info.sheets.first().ok_or_else(|| {
                    ImportError::InvalidStructure("el archivo no tiene hojas".to_string())
                })?;
                let entity = reader.detect_entity_type(info, &sheet.name);
                if entity == EntityType::Desconocido {
                    return Err(ImportError::UnsupportedEntity(sheet.name.clone()));
                }
                Ok((sheet.clone(), entity))
            }
        }
    }

    fn build_summary(
        &self,
        session_id: String,
        entity: EntityType,
        validation: &ValidationResult,
        recovery: Option<&RecoveryResult>,
        bulk: Option<&BulkResult>,
        elapsed: Duration,
    ) -> ImportSummary {
        let recovered_rows = recovery.map(|r| r.recovered.len()).unwrap_or(0);
        let skipped_rows = recovery.map(|r| r.skipped.len()).unwrap_or(0);
        let rejected_rows = recovery
            .map(|r| r.still_invalid.len())
            .unwrap_or(validation.invalid.len());

        let mut summary = ImportSummary {
            session_id,
            entity,
            total_rows: validation.summary.total_rows,
            valid_rows: validation.summary.valid_rows,
            recovered_rows,
            skipped_rows,
            rejected_rows,
            committed_rows: bulk.map(|b| b.successful).unwrap_or(0),
            failed_rows: bulk.map(|b| b.failed).unwrap_or(0),
            elapsed_ms: elapsed.as_millis() as u64,
            report: None,
        };
        if self.options.generate_report {
            summary.report = Some(render_report(&summary, validation, bulk));
        }
        summary
    }
}

// ==========================================
// Reporte textual
// ==========================================
fn render_report(
    summary: &ImportSummary,
    validation: &ValidationResult,
    bulk: Option<&BulkResult>,
) -> String {
    let mut out = String::new();
    out.push_str("=== Reporte de importación ===\n");
    out.push_str(&format!("Sesión: {}\n", summary.session_id));
    out.push_str(&format!("Entidad: {}\n", summary.entity));
    out.push_str(&format!("Duración: {} ms\n", summary.elapsed_ms));
    out.push_str(&format!(
        "Filas: {} totales | {} válidas | {} recuperadas | {} salteadas | {} rechazadas\n",
        summary.total_rows,
        summary.valid_rows,
        summary.recovered_rows,
        summary.skipped_rows,
        summary.rejected_rows
    ));
    out.push_str(&format!(
        "Commit: {} confirmadas | {} fallidas\n",
        summary.committed_rows, summary.failed_rows
    ));

    if !validation.errors.is_empty() {
        out.push_str("\n--- Hallazgos de validación ---\n");
        for error in &validation.errors {
            out.push_str(&format!(
                "Fila {} [{}] {}: {}",
                error.row, error.field, error.severity, error.message
            ));
            if let Some(suggestion) = &error.suggestion {
                out.push_str(&format!(" (sugerencia: {suggestion})"));
            }
            out.push('\n');
        }
    }

    if let Some(bulk) = bulk {
        if !bulk.errors.is_empty() {
            out.push_str("\n--- Fallas de commit ---\n");
            for error in &bulk.errors {
                out.push_str(&format!(
                    "Fila {}: {} (reintentos: {})\n",
                    error.row, error.error, error.retry_count
                ));
            }
        }
        if bulk.cancelled {
            out.push_str("\nOperación cancelada antes de completarse.\n");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Severity, ValidationError, ValidationSummary};
    use crate::domain::CellValue;

    fn sample_validation() -> ValidationResult {
        ValidationResult {
            entity: EntityType::Cliente,
            valid: Vec::new(),
            invalid: Vec::new(),
            errors: vec![ValidationError {
                row: 3,
                field: "CUIT (*)".to_string(),
                value: CellValue::from("x"),
                message: "Formato de CUIT inválido (esperado XX-XXXXXXXX-X)".to_string(),
                severity: Severity::Error,
                suggestion: None,
            }],
            summary: ValidationSummary {
                total_rows: 5,
                valid_rows: 4,
                error_rows: 1,
                warning_rows: 0,
            },
        }
    }

    #[test]
    fn test_reporte_incluye_hallazgos() {
        let summary = ImportSummary {
            session_id: "s-1".to_string(),
            entity: EntityType::Cliente,
            total_rows: 5,
            valid_rows: 4,
            recovered_rows: 0,
            skipped_rows: 0,
            rejected_rows: 1,
            committed_rows: 4,
            failed_rows: 0,
            elapsed_ms: 12,
            report: None,
        };
        let report = render_report(&summary, &sample_validation(), None);
        assert!(report.contains("Sesión: s-1"));
        assert!(report.contains("Fila 3 [CUIT (*)]"));
        assert!(report.contains("4 confirmadas"));
    }
}
