// ==========================================
// Sistema de Gestión de Transporte - Plan de recuperación
// ==========================================
// Una acción por campo con error, con puntaje de confianza.
// Ciclo de vida: creada por el análisis, opcionalmente reemplazada por
// acciones del llamador, consumida una sola vez por la ejecución del plan.
// ==========================================

use crate::domain::row::Row;
use crate::domain::types::CellValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// Tipo de acción de recuperación
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryKind {
    AutoCorrect,
    SkipRow,
    ManualFix,
    Ignore,
}

// ==========================================
// Acción de recuperación
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryAction {
    pub kind: RecoveryKind,
    pub field: String,
    pub original_value: CellValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_value: Option<CellValue>,
    pub reason: String,
    /// Confianza en [0, 1]
    pub confidence: f64,
}

impl RecoveryAction {
    pub fn auto_correct(
        field: &str,
        original: CellValue,
        corrected: CellValue,
        reason: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            kind: RecoveryKind::AutoCorrect,
            field: field.to_string(),
            original_value: original,
            corrected_value: Some(corrected),
            reason: reason.into(),
            confidence,
        }
    }

    pub fn skip_row(field: &str, original: CellValue, reason: impl Into<String>) -> Self {
        Self {
            kind: RecoveryKind::SkipRow,
            field: field.to_string(),
            original_value: original,
            corrected_value: None,
            reason: reason.into(),
            confidence: 0.9,
        }
    }

    pub fn ignore(field: &str, original: CellValue, reason: impl Into<String>) -> Self {
        Self {
            kind: RecoveryKind::Ignore,
            field: field.to_string(),
            original_value: original,
            corrected_value: None,
            reason: reason.into(),
            confidence: 0.8,
        }
    }

    pub fn manual_fix(field: &str, original: CellValue, reason: impl Into<String>) -> Self {
        Self {
            kind: RecoveryKind::ManualFix,
            field: field.to_string(),
            original_value: original,
            corrected_value: None,
            reason: reason.into(),
            confidence: 0.0,
        }
    }
}

// ==========================================
// Plan de recuperación
// ==========================================
// Solo lectura una vez devuelto; la ejecución lo toma por referencia
// y no lo muta. Los contadores son por fila, no por acción.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryPlan {
    pub auto_correctable: usize,
    pub skippable: usize,
    pub manual_fix_required: usize,
    /// número de fila original -> acciones (una por campo con error)
    pub actions: BTreeMap<usize, Vec<RecoveryAction>>,
    /// Porcentaje estimado de filas que terminarán resueltas
    pub estimated_success: f64,
    pub total_rows: usize,
    pub error_rows: usize,
}

// ==========================================
// Acción aplicada (auditoría)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedAction {
    pub row: usize,
    pub action: RecoveryAction,
}

// ==========================================
// Resultado de la ejecución del plan
// ==========================================
// Cada fila con error resuelve a exactamente un balde:
// recuperada, salteada o aún inválida.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryResult {
    pub recovered: Vec<Row>,
    pub skipped: Vec<Row>,
    pub still_invalid: Vec<Row>,
    pub applied: Vec<AppliedAction>,
}
