// ==========================================
// Sistema de Gestión de Transporte - Resultado de validación
// ==========================================
// Producido por el motor de validación, consumido por el planificador
// de recuperación y por el llamador. Nunca se muta tras su creación.
// ==========================================

use crate::domain::row::Row;
use crate::domain::types::{CellValue, EntityType, Severity};
use serde::{Deserialize, Serialize};

// ==========================================
// Error de validación
// ==========================================
// `row` es siempre el número de fila original de la planilla (1-based)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub row: usize,
    pub field: String,
    pub value: CellValue,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn error(row: usize, field: &str, value: CellValue, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.to_string(),
            value,
            message: message.into(),
            severity: Severity::Error,
            suggestion: None,
        }
    }

    pub fn warning(row: usize, field: &str, value: CellValue, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.to_string(),
            value,
            message: message.into(),
            severity: Severity::Warning,
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

// ==========================================
// Resumen de validación
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub error_rows: usize,
    pub warning_rows: usize,
}

// ==========================================
// Resultado de validación
// ==========================================
// Una fila es inválida sii tiene al menos un hallazgo de severidad Error.
// Los hallazgos de plantilla (rechazo grueso de la fila) y los de campo
// se fusionan en `errors` con el mismo resumen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub entity: EntityType,
    pub valid: Vec<Row>,
    pub invalid: Vec<Row>,
    pub errors: Vec<ValidationError>,
    pub summary: ValidationSummary,
}

impl ValidationResult {
    /// Hallazgos de una fila concreta
    pub fn errors_for_row(&self, row: usize) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.row == row).collect()
    }

    /// Hallazgos bloqueantes de una fila concreta
    pub fn blocking_errors_for_row(&self, row: usize) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.row == row && e.severity == Severity::Error)
            .collect()
    }

    /// Sin filas inválidas (los warnings no invalidan)
    pub fn is_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let err = ValidationError::error(3, "CUIT (*)", CellValue::from("x"), "Formato inválido");
        assert_eq!(err.severity, Severity::Error);
        assert_eq!(err.row, 3);
        assert!(err.suggestion.is_none());

        let warn = ValidationError::warning(4, "Licencia", CellValue::Empty, "vencida")
            .with_suggestion("Renovar");
        assert_eq!(warn.severity, Severity::Warning);
        assert_eq!(warn.suggestion.as_deref(), Some("Renovar"));
    }
}
