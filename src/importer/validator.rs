// ==========================================
// Sistema de Gestión de Transporte - Motor de validación
// ==========================================
// Aplica el catálogo de reglas a cada fila del lector, usando un
// snapshot de registros existentes del backend para los chequeos de
// unicidad y referencia. Clasifica filas en válidas/inválidas y los
// hallazgos en error/warning, siempre contra el número de fila original.
// ==========================================

use crate::api::{ApiError, BackendApi, BackendRecord};
use crate::domain::{
    CellValue, EntityType, Row, Severity, ValidationError, ValidationResult, ValidationSummary,
};
use crate::importer::error::{ImportError, Result};
use crate::importer::file_reader::SheetData;
use crate::importer::rules::{catalog_for, EntityRules, RuleKind, ValidationRule};
use futures::future::join_all;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

// ==========================================
// Snapshot de referencia
// ==========================================
// Copia en memoria de los registros existentes del backend, cargada una
// vez por sesión de importación. Solo lectura durante toda la sesión:
// no se refresca aunque otro proceso escriba en paralelo.
#[derive(Debug, Default)]
pub struct ReferenceSnapshot {
    data: HashMap<EntityType, Vec<HashMap<String, String>>>,
}

impl ReferenceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carga el snapshot completo (las tres entidades en paralelo)
    pub async fn load(api: &dyn BackendApi) -> std::result::Result<Self, ApiError> {
        let futures = EntityType::SUPPORTED
            .iter()
            .map(|entity| api.fetch_all(*entity));
        let results = join_all(futures).await;

        let mut snapshot = Self::new();
        for (entity, result) in EntityType::SUPPORTED.iter().zip(results) {
            let records = result?;
            snapshot.insert(*entity, records);
        }
        info!(
            clientes = snapshot.len(EntityType::Cliente),
            empresas = snapshot.len(EntityType::Empresa),
            personal = snapshot.len(EntityType::Personal),
            "Snapshot de referencia cargado"
        );
        Ok(snapshot)
    }

    /// Incorpora los registros de una entidad (aplana los valores a texto)
    pub fn insert(&mut self, entity: EntityType, records: Vec<BackendRecord>) {
        let flattened = records
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .filter_map(|(key, value)| flatten_value(value).map(|v| (key, v)))
                    .collect()
            })
            .collect();
        self.data.insert(entity, flattened);
    }

    pub fn len(&self, entity: EntityType) -> usize {
        self.data.get(&entity).map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.data.values().all(Vec::is_empty)
    }

    /// Valores conocidos de un campo de una entidad
    pub fn keys(&self, entity: EntityType, field: &str) -> Vec<&str> {
        self.data
            .get(&entity)
            .map(|records| {
                records
                    .iter()
                    .filter_map(|r| r.get(field).map(String::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// El valor existe en el snapshot (recortado, sin distinguir mayúsculas)
    pub fn contains(&self, entity: EntityType, field: &str, value: &str) -> bool {
        self.canonical_match(entity, field, value).is_some()
    }

    /// Valor canónico del snapshot que coincide exactamente (sin caso)
    pub fn canonical_match(&self, entity: EntityType, field: &str, value: &str) -> Option<String> {
        let needle = value.trim().to_lowercase();
        self.keys(entity, field)
            .into_iter()
            .find(|k| k.trim().to_lowercase() == needle)
            .map(|k| k.to_string())
    }

    /// Sugerencia por contención de subcadena (gana la primera)
    pub fn suggest(&self, entity: EntityType, field: &str, value: &str) -> Option<String> {
        let needle = value.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.keys(entity, field)
            .into_iter()
            .find(|k| {
                let key = k.trim().to_lowercase();
                key.contains(&needle) || needle.contains(&key)
            })
            .map(|k| k.to_string())
    }
}

fn flatten_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ==========================================
// Motor de validación
// ==========================================
pub struct ValidationEngine<'a> {
    snapshot: &'a ReferenceSnapshot,
}

impl<'a> ValidationEngine<'a> {
    pub fn new(snapshot: &'a ReferenceSnapshot) -> Self {
        Self { snapshot }
    }

    /// Valida una hoja completa contra el catálogo de su entidad
    ///
    /// Una fila es inválida sii tiene al menos un hallazgo de severidad
    /// Error; los warnings solos no invalidan. Los rechazos de plantilla
    /// y los errores de campo se fusionan en un único resultado.
    pub fn validate(&self, entity: EntityType, sheet: &SheetData) -> Result<ValidationResult> {
        let catalog = catalog_for(entity)
            .ok_or_else(|| ImportError::UnsupportedEntity(entity.to_string()))?;

        let mut errors: Vec<ValidationError> = Vec::new();

        // Chequeo de plantilla: columnas obligatorias presentes
        for header in catalog.required_headers {
            if !sheet.headers.iter().any(|h| h == header) {
                errors.push(ValidationError::error(
                    1,
                    header,
                    CellValue::Empty,
                    format!("Falta la columna obligatoria: {}", header),
                ));
            }
        }

        // Rechazo grueso por fila: todos los campos obligatorios vacíos
        let mut template_rejected: HashSet<usize> = HashSet::new();
        for row in &sheet.rows {
            let all_empty = catalog
                .mandatory_fields
                .iter()
                .all(|field| row.is_field_empty(field));
            if all_empty {
                template_rejected.insert(row.number);
                errors.push(ValidationError::error(
                    row.number,
                    "*",
                    CellValue::Empty,
                    "La fila no coincide con la plantilla: campos obligatorios vacíos",
                ));
            }
        }

        // Valores repetidos dentro del archivo, por regla unique
        let file_duplicates = collect_file_duplicates(&catalog, &sheet.rows);

        // Reglas por campo + chequeos cruzados
        for row in &sheet.rows {
            if template_rejected.contains(&row.number) {
                continue;
            }
            for rule in &catalog.rules {
                if let Some(finding) = self.apply_rule(entity, rule, row, sheet, &file_duplicates)
                {
                    errors.push(finding);
                }
            }
            errors.extend((catalog.record_checks)(row));
        }

        // Clasificación de filas
        let error_row_numbers: HashSet<usize> = errors
            .iter()
            .filter(|e| e.severity == Severity::Error)
            .map(|e| e.row)
            .collect();
        let warning_row_numbers: HashSet<usize> = errors
            .iter()
            .filter(|e| e.severity == Severity::Warning)
            .map(|e| e.row)
            .collect();

        let mut valid = Vec::new();
        let mut invalid = Vec::new();
        for row in &sheet.rows {
            if error_row_numbers.contains(&row.number) {
                invalid.push(row.clone());
            } else {
                valid.push(row.clone());
            }
        }

        let summary = ValidationSummary {
            total_rows: sheet.rows.len(),
            valid_rows: valid.len(),
            error_rows: invalid.len(),
            warning_rows: sheet
                .rows
                .iter()
                .filter(|r| warning_row_numbers.contains(&r.number))
                .count(),
        };

        debug!(
            entity = %entity,
            total = summary.total_rows,
            validas = summary.valid_rows,
            con_error = summary.error_rows,
            con_warning = summary.warning_rows,
            "Validación completada"
        );

        Ok(ValidationResult {
            entity,
            valid,
            invalid,
            errors,
            summary,
        })
    }

    fn apply_rule(
        &self,
        entity: EntityType,
        rule: &ValidationRule,
        row: &Row,
        sheet: &SheetData,
        file_duplicates: &HashMap<(&'static str, String), usize>,
    ) -> Option<ValidationError> {
        let value = row.get(rule.field).cloned().unwrap_or(CellValue::Empty);
        let text = value.trimmed();

        match rule.kind {
            RuleKind::Required => {
                if text.is_empty() {
                    return Some(ValidationError::error(
                        row.number,
                        rule.field,
                        value,
                        rule.message,
                    ));
                }
            }
            // required y format son ortogonales: vacío se saltea entero
            RuleKind::Format => {
                if text.is_empty() {
                    return None;
                }
                let regex = rule.format_regex.as_ref()?;
                if !regex.is_match(&text) {
                    return Some(ValidationError::error(
                        row.number,
                        rule.field,
                        value,
                        rule.message,
                    ));
                }
            }
            RuleKind::Unique => {
                if text.is_empty() {
                    return None;
                }
                let normalized = text.to_lowercase();
                // Duplicado dentro del archivo (excluyendo la fila misma)
                let file_count = file_duplicates
                    .get(&(rule.field, normalized.clone()))
                    .copied()
                    .unwrap_or(0);
                if file_count > 1 {
                    return Some(ValidationError::error(
                        row.number,
                        rule.field,
                        value,
                        format!("{} (duplicado en el archivo)", rule.message),
                    ));
                }
                // Duplicado contra el snapshot del backend
                if let Some(snapshot_field) = rule.reference_field {
                    if self.snapshot.contains(entity, snapshot_field, &text) {
                        return Some(ValidationError::error(
                            row.number,
                            rule.field,
                            value,
                            format!("{} (ya existe en el sistema)", rule.message),
                        ));
                    }
                }
            }
            RuleKind::Reference => {
                if text.is_empty() {
                    return None;
                }
                let entity = rule.reference_entity?;
                let snapshot_field = rule.reference_field?;
                if !self.snapshot.contains(entity, snapshot_field, &text) {
                    let mut finding =
                        ValidationError::error(row.number, rule.field, value, rule.message);
                    if let Some(suggestion) = self.snapshot.suggest(entity, snapshot_field, &text)
                    {
                        finding = finding.with_suggestion(suggestion);
                    }
                    return Some(finding);
                }
            }
            RuleKind::Custom => {
                let validator = rule.validator?;
                if !validator(&value, row, &sheet.rows) {
                    return Some(ValidationError::error(
                        row.number,
                        rule.field,
                        value,
                        rule.message,
                    ));
                }
            }
        }
        None
    }
}

/// Conteo de apariciones por (campo unique, valor normalizado)
fn collect_file_duplicates(
    catalog: &EntityRules,
    rows: &[Row],
) -> HashMap<(&'static str, String), usize> {
    let mut counts: HashMap<(&'static str, String), usize> = HashMap::new();
    for rule in &catalog.rules {
        if rule.kind != RuleKind::Unique {
            continue;
        }
        for row in rows {
            let text = row.text(rule.field);
            if text.is_empty() {
                continue;
            }
            *counts.entry((rule.field, text.to_lowercase())).or_insert(0) += 1;
        }
    }
    counts
}
