// ==========================================
// Sistema de Gestión de Transporte - Planificador de recuperación
// ==========================================
// Por cada campo con error propone una acción (auto_correct / skip_row /
// manual_fix / ignore) con puntaje de confianza, usando heurísticas
// deterministas. La escalera de decisión es una cadena ordenada de
// funciones puras que devuelven Option: gana la primera aplicable.
// ==========================================

use crate::domain::{
    AppliedAction, CellValue, EntityType, RecoveryAction, RecoveryKind, RecoveryPlan,
    RecoveryResult, Severity, ValidationError, ValidationResult,
};
use crate::importer::error::{ImportError, Result};
use crate::importer::rules::{catalog_for, EntityRules, SKIPPABLE_MANDATORY_RATIO};
use crate::importer::validator::ReferenceSnapshot;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Confianza mínima para aplicar una corrección automática
pub const AUTO_CORRECT_THRESHOLD: f64 = 0.7;

/// Largo mínimo del valor para intentar coincidencia por contención
const REFERENCE_CONTAINMENT_MIN_LEN: usize = 4;

// ==========================================
// Corrección de formato
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct FormatCorrection {
    pub success: bool,
    pub value: Option<String>,
    pub confidence: f64,
}

impl FormatCorrection {
    fn failed() -> Self {
        Self {
            success: false,
            value: None,
            confidence: 0.0,
        }
    }

    fn ok(value: String, confidence: f64) -> Self {
        Self {
            success: true,
            value: Some(value),
            confidence,
        }
    }
}

/// Corrección determinista de formato según el tipo de campo
///
/// - CUIT/CUIL: inserta separadores cuando hay exactamente 11 dígitos
/// - DNI: descarta no-dígitos cuando quedan 7 u 8
/// - Email: minúsculas cuando contiene '@' y '.'
/// - Fechas: reparsea DD/MM/YYYY, DD-MM-YYYY, YYYY/MM/DD, YYYY-MM-DD
///   y reemite DD/MM/YYYY
pub fn attempt_format_correction(field: &str, raw: &str) -> FormatCorrection {
    let field_lower = field.to_lowercase();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FormatCorrection::failed();
    }

    if field_lower.contains("cuit") || field_lower.contains("cuil") {
        let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() == 11 {
            let formatted = format!("{}-{}-{}", &digits[0..2], &digits[2..10], &digits[10..11]);
            return FormatCorrection::ok(formatted, 0.9);
        }
        return FormatCorrection::failed();
    }

    if field_lower.contains("dni") {
        let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() == 7 || digits.len() == 8 {
            return FormatCorrection::ok(digits, 0.85);
        }
        return FormatCorrection::failed();
    }

    if field_lower.contains("email") {
        if trimmed.contains('@') && trimmed.contains('.') {
            return FormatCorrection::ok(trimmed.to_lowercase(), 0.8);
        }
        return FormatCorrection::failed();
    }

    if field_lower.contains("fecha") || field_lower.contains("vencimiento") {
        for pattern in ["%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%Y-%m-%d"] {
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, pattern) {
                return FormatCorrection::ok(date.format("%d/%m/%Y").to_string(), 0.85);
            }
        }
        return FormatCorrection::failed();
    }

    FormatCorrection::failed()
}

/// Mapeo de términos booleanos habituales a la forma canónica
fn map_boolean_token(raw: &str) -> Option<&'static str> {
    match raw.trim().to_lowercase().as_str() {
        "si" | "sí" | "yes" | "y" | "true" | "1" | "activo" | "habilitado" | "habilitada" => {
            Some("Sí")
        }
        "no" | "n" | "false" | "0" | "inactivo" | "inactiva" | "deshabilitado"
        | "deshabilitada" => Some("No"),
        _ => None,
    }
}

// ==========================================
// Planificador de recuperación
// ==========================================
pub struct RecoveryPlanner<'a> {
    snapshot: &'a ReferenceSnapshot,
}

impl<'a> RecoveryPlanner<'a> {
    pub fn new(snapshot: &'a ReferenceSnapshot) -> Self {
        Self { snapshot }
    }

    /// Analiza los errores de validación y arma el plan de recuperación
    ///
    /// Una acción por campo con error, agrupadas por número de fila
    /// original. Los contadores del plan son por fila.
    pub fn analyze(
        &self,
        entity: EntityType,
        validation: &ValidationResult,
    ) -> Result<RecoveryPlan> {
        let catalog = catalog_for(entity)
            .ok_or_else(|| ImportError::UnsupportedEntity(entity.to_string()))?;

        let invalid_numbers: HashSet<usize> =
            validation.invalid.iter().map(|r| r.number).collect();

        // Errores bloqueantes agrupados por fila (los warnings no se recuperan)
        let mut by_row: BTreeMap<usize, Vec<&ValidationError>> = BTreeMap::new();
        for error in &validation.errors {
            if error.severity == Severity::Error && invalid_numbers.contains(&error.row) {
                by_row.entry(error.row).or_default().push(error);
            }
        }

        let mut actions: BTreeMap<usize, Vec<RecoveryAction>> = BTreeMap::new();
        let mut auto_correctable = 0usize;
        let mut skippable = 0usize;
        let mut manual_fix_required = 0usize;

        for (row_number, row_errors) in &by_row {
            let row_actions: Vec<RecoveryAction> = row_errors
                .iter()
                .map(|error| self.analyze_error(&catalog, error, row_errors))
                .collect();

            let all_resolvable = row_actions.iter().all(|a| match a.kind {
                RecoveryKind::AutoCorrect => a.confidence > AUTO_CORRECT_THRESHOLD,
                RecoveryKind::Ignore => true,
                _ => false,
            });
            let any_skip = row_actions.iter().any(|a| a.kind == RecoveryKind::SkipRow);

            if all_resolvable {
                auto_correctable += 1;
            } else if any_skip {
                skippable += 1;
            } else {
                manual_fix_required += 1;
            }

            actions.insert(*row_number, row_actions);
        }

        let total_rows = validation.summary.total_rows;
        let error_rows = validation.summary.error_rows;
        let estimated_success = if total_rows == 0 {
            100.0
        } else {
            (total_rows - error_rows + auto_correctable + skippable) as f64 / total_rows as f64
                * 100.0
        };

        info!(
            entity = %entity,
            auto = auto_correctable,
            descartables = skippable,
            manuales = manual_fix_required,
            exito_estimado = format!("{:.1}", estimated_success),
            "Plan de recuperación analizado"
        );

        Ok(RecoveryPlan {
            auto_correctable,
            skippable,
            manual_fix_required,
            actions,
            estimated_success,
            total_rows,
            error_rows,
        })
    }

    /// Escalera de decisión: gana la primera heurística aplicable
    fn analyze_error(
        &self,
        catalog: &EntityRules,
        error: &ValidationError,
        row_errors: &[&ValidationError],
    ) -> RecoveryAction {
        // Rechazo de plantilla: la fila entera no sirve
        if error.field == "*" {
            return RecoveryAction::skip_row(
                &error.field,
                error.value.clone(),
                "La fila no coincide con la plantilla",
            );
        }

        try_format_fix(error)
            .or_else(|| try_boolean_fix(catalog, error))
            .or_else(|| self.try_reference_fix(catalog, error))
            .or_else(|| try_skip(catalog, error, row_errors))
            .or_else(|| try_ignore(catalog, error))
            .unwrap_or_else(|| {
                RecoveryAction::manual_fix(
                    &error.field,
                    error.value.clone(),
                    "Requiere corrección manual",
                )
            })
    }

    /// Referencia faltante: coincidencia contra las claves del snapshot.
    /// Exacta sin distinguir mayúsculas (0.9) o por contención (0.75),
    /// emitiendo siempre la clave canónica del snapshot.
    ///
    /// La rama exacta no se alcanza con hallazgos del motor de validación
    /// (ese chequeo ya es exacto sin caso); cubre planes armados sobre
    /// hallazgos construidos por el llamador.
    fn try_reference_fix(
        &self,
        catalog: &EntityRules,
        error: &ValidationError,
    ) -> Option<RecoveryAction> {
        if !error.message.to_lowercase().contains("no existe") {
            return None;
        }
        let rule = catalog.rules.iter().find(|r| {
            r.field == error.field && r.reference_entity.is_some() && r.reference_field.is_some()
        })?;
        let entity = rule.reference_entity?;
        let field = rule.reference_field?;
        let raw = error.value.trimmed();

        if let Some(canonical) = self.snapshot.canonical_match(entity, field, &raw) {
            return Some(RecoveryAction::auto_correct(
                &error.field,
                error.value.clone(),
                CellValue::Text(canonical),
                "Referencia normalizada al valor existente",
                0.9,
            ));
        }

        if raw.len() >= REFERENCE_CONTAINMENT_MIN_LEN {
            if let Some(suggestion) = self.snapshot.suggest(entity, field, &raw) {
                return Some(RecoveryAction::auto_correct(
                    &error.field,
                    error.value.clone(),
                    CellValue::Text(suggestion),
                    "Referencia aproximada por contención",
                    0.75,
                ));
            }
        }
        None
    }

    /// Ejecuta el plan sobre las filas inválidas
    ///
    /// Cada fila resuelve a exactamente un balde:
    /// - skip_row con política permisiva -> salteada
    /// - todas las acciones aplicables (auto_correct sobre umbral /
    ///   ignore) -> recuperada con los campos reescritos en una copia
    /// - cualquier otro caso -> aún inválida, con la fila original intacta
    pub fn execute(
        &self,
        plan: &RecoveryPlan,
        validation: &ValidationResult,
        allow_skip: bool,
    ) -> RecoveryResult {
        let mut recovered = Vec::new();
        let mut skipped = Vec::new();
        let mut still_invalid = Vec::new();
        let mut applied = Vec::new();

        for row in &validation.invalid {
            let actions = match plan.actions.get(&row.number) {
                Some(actions) => actions,
                None => {
                    still_invalid.push(row.clone());
                    continue;
                }
            };

            let skip_actions: Vec<&RecoveryAction> = actions
                .iter()
                .filter(|a| a.kind == RecoveryKind::SkipRow)
                .collect();
            if !skip_actions.is_empty() {
                if allow_skip {
                    for action in skip_actions {
                        applied.push(AppliedAction {
                            row: row.number,
                            action: action.clone(),
                        });
                    }
                    skipped.push(row.clone());
                } else {
                    still_invalid.push(row.clone());
                }
                continue;
            }

            let mut fixed = row.clone();
            let mut resolvable = true;
            let mut row_applied = Vec::new();

            for action in actions {
                match action.kind {
                    RecoveryKind::AutoCorrect if action.confidence > AUTO_CORRECT_THRESHOLD => {
                        match &action.corrected_value {
                            Some(corrected) => {
                                fixed = fixed.with_value(&action.field, corrected.clone());
                                row_applied.push(AppliedAction {
                                    row: row.number,
                                    action: action.clone(),
                                });
                            }
                            None => resolvable = false,
                        }
                    }
                    RecoveryKind::Ignore => {
                        // Registrada como aplicada, sin reescritura
                        row_applied.push(AppliedAction {
                            row: row.number,
                            action: action.clone(),
                        });
                    }
                    _ => resolvable = false,
                }
            }

            if resolvable {
                applied.extend(row_applied);
                recovered.push(fixed);
            } else {
                still_invalid.push(row.clone());
            }
        }

        debug!(
            recuperadas = recovered.len(),
            salteadas = skipped.len(),
            invalidas = still_invalid.len(),
            "Plan de recuperación ejecutado"
        );

        RecoveryResult {
            recovered,
            skipped,
            still_invalid,
            applied,
        }
    }
}

// ==========================================
// Heurísticas puras de la escalera
// ==========================================

/// Paso 1: el mensaje indica un problema de formato
fn try_format_fix(error: &ValidationError) -> Option<RecoveryAction> {
    if !error.message.to_lowercase().contains("formato") {
        return None;
    }
    let correction = attempt_format_correction(&error.field, &error.value.trimmed());
    if !correction.success {
        return None;
    }
    let value = correction.value?;
    Some(RecoveryAction::auto_correct(
        &error.field,
        error.value.clone(),
        CellValue::Text(value),
        "Formato normalizado automáticamente",
        correction.confidence,
    ))
}

/// Paso 2: campo booleano conocido con término mapeable
fn try_boolean_fix(catalog: &EntityRules, error: &ValidationError) -> Option<RecoveryAction> {
    if !catalog.boolean_fields.contains(&error.field.as_str()) {
        return None;
    }
    let token = map_boolean_token(&error.value.trimmed())?;
    Some(RecoveryAction::auto_correct(
        &error.field,
        error.value.clone(),
        CellValue::Text(token.to_string()),
        "Término booleano normalizado",
        0.9,
    ))
}

/// Paso 4: fila descartable (clave crítica faltante o más de la mitad
/// de los campos obligatorios con error)
fn try_skip(
    catalog: &EntityRules,
    error: &ValidationError,
    row_errors: &[&ValidationError],
) -> Option<RecoveryAction> {
    let critical_missing = error.field == catalog.critical_field && error.value.is_empty();

    let mandatory_in_error = row_errors
        .iter()
        .filter(|e| catalog.mandatory_fields.contains(&e.field.as_str()))
        .map(|e| e.field.as_str())
        .collect::<HashSet<_>>()
        .len();
    let too_many_mandatory = !catalog.mandatory_fields.is_empty()
        && mandatory_in_error as f64
            > catalog.mandatory_fields.len() as f64 * SKIPPABLE_MANDATORY_RATIO;

    if critical_missing || too_many_mandatory {
        Some(RecoveryAction::skip_row(
            &error.field,
            error.value.clone(),
            "Registro incompleto: conviene descartar la fila",
        ))
    } else {
        None
    }
}

/// Paso 5: campo no obligatorio, el error se puede ignorar
fn try_ignore(catalog: &EntityRules, error: &ValidationError) -> Option<RecoveryAction> {
    if catalog.mandatory_fields.contains(&error.field.as_str()) {
        return None;
    }
    Some(RecoveryAction::ignore(
        &error.field,
        error.value.clone(),
        "Campo no obligatorio",
    ))
}
