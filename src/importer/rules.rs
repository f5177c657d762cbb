// ==========================================
// Sistema de Gestión de Transporte - Catálogo de reglas
// ==========================================
// Reglas declarativas por entidad: required / format / unique /
// reference / custom, más chequeos cruzados por registro.
// Datos puros + predicados puros; sin I/O.
// ==========================================

use crate::domain::{CellValue, EntityType, Row, ValidationError};
use regex::Regex;

/// Umbral del planificador: proporción de campos obligatorios con error
/// a partir de la cual la fila se considera descartable
pub const SKIPPABLE_MANDATORY_RATIO: f64 = 0.5;

// ==========================================
// Tipo de regla
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Required,
    Format,
    Unique,
    Reference,
    Custom,
}

/// Predicado de una regla custom: (valor, fila, todas las filas) -> válido
pub type CustomValidator = fn(&CellValue, &Row, &[Row]) -> bool;

// ==========================================
// Regla de validación
// ==========================================
#[derive(Debug, Clone)]
pub struct ValidationRule {
    pub field: &'static str,
    pub kind: RuleKind,
    /// Mensaje estático de la regla (los predicados no generan mensajes)
    pub message: &'static str,
    pub format_regex: Option<Regex>,
    /// Entidad consultada por las reglas reference
    pub reference_entity: Option<EntityType>,
    /// Campo del snapshot consultado por unique y reference
    pub reference_field: Option<&'static str>,
    pub validator: Option<CustomValidator>,
}

impl ValidationRule {
    pub fn required(field: &'static str, message: &'static str) -> Self {
        Self {
            field,
            kind: RuleKind::Required,
            message,
            format_regex: None,
            reference_entity: None,
            reference_field: None,
            validator: None,
        }
    }

    pub fn format(field: &'static str, message: &'static str, pattern: &str) -> Self {
        Self {
            field,
            kind: RuleKind::Format,
            message,
            // Los patrones son literales del catálogo
            format_regex: Some(Regex::new(pattern).expect("patrón de formato inválido")),
            reference_entity: None,
            reference_field: None,
            validator: None,
        }
    }

    pub fn unique(
        field: &'static str,
        message: &'static str,
        snapshot_field: &'static str,
    ) -> Self {
        Self {
            field,
            kind: RuleKind::Unique,
            message,
            format_regex: None,
            reference_entity: None,
            reference_field: Some(snapshot_field),
            validator: None,
        }
    }

    pub fn reference(
        field: &'static str,
        message: &'static str,
        entity: EntityType,
        snapshot_field: &'static str,
    ) -> Self {
        Self {
            field,
            kind: RuleKind::Reference,
            message,
            format_regex: None,
            reference_entity: Some(entity),
            reference_field: Some(snapshot_field),
            validator: None,
        }
    }

    pub fn custom(field: &'static str, message: &'static str, validator: CustomValidator) -> Self {
        Self {
            field,
            kind: RuleKind::Custom,
            message,
            format_regex: None,
            reference_entity: None,
            reference_field: None,
            validator: Some(validator),
        }
    }
}

/// Chequeos cruzados de un registro completo (pueden emitir warnings)
pub type RecordChecks = fn(&Row) -> Vec<ValidationError>;

// ==========================================
// Reglas de una entidad
// ==========================================
#[derive(Debug, Clone)]
pub struct EntityRules {
    pub entity: EntityType,
    pub rules: Vec<ValidationRule>,
    /// Columnas que la plantilla exige presentes
    pub required_headers: &'static [&'static str],
    /// Campos con regla required (usado por el planificador)
    pub mandatory_fields: &'static [&'static str],
    /// Campo clave: si falta, la fila es descartable
    pub critical_field: &'static str,
    /// Campos booleanos Sí/No (mapeo de términos en la recuperación)
    pub boolean_fields: &'static [&'static str],
    pub record_checks: RecordChecks,
}

// ==========================================
// Patrones de formato
// ==========================================
const CUIT_PATTERN: &str = r"^\d{2}-\d{8}-\d$";
const DNI_PATTERN: &str = r"^\d{7,8}$";
const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const PHONE_PATTERN: &str = r"^[\d\s()+\-]{6,20}$";
const DATE_PATTERN: &str = r"^\d{2}/\d{2}/\d{4}$";

// ==========================================
// Predicados custom
// ==========================================

/// Campo booleano canónico: vacío, "Sí" o "No"
fn is_si_no(value: &CellValue, _row: &Row, _all: &[Row]) -> bool {
    let text = value.trimmed();
    text.is_empty() || text == "Sí" || text == "No"
}

// ==========================================
// Chequeos cruzados por entidad
// ==========================================

fn cliente_record_checks(_row: &Row) -> Vec<ValidationError> {
    Vec::new()
}

fn empresa_record_checks(_row: &Row) -> Vec<ValidationError> {
    Vec::new()
}

fn personal_record_checks(row: &Row) -> Vec<ValidationError> {
    let mut findings = Vec::new();

    // Un registro marcado como chofer debe tener número de licencia
    if row.text("Es Chofer") == "Sí" && row.is_field_empty("Nro Licencia") {
        findings.push(ValidationError::error(
            row.number,
            "Nro Licencia",
            row.get("Nro Licencia").cloned().unwrap_or(CellValue::Empty),
            "Un chofer debe tener número de licencia",
        ));
    }

    // El vencimiento de licencia no debe estar ya en el pasado
    let vencimiento = row.text("Vencimiento Licencia");
    if let Ok(date) = chrono::NaiveDate::parse_from_str(&vencimiento, "%d/%m/%Y") {
        let today = chrono::Local::now().date_naive();
        if date < today {
            findings.push(ValidationError::warning(
                row.number,
                "Vencimiento Licencia",
                CellValue::Text(vencimiento),
                "La licencia ya está vencida",
            ));
        }
    }

    findings
}

// ==========================================
// Catálogos por entidad
// ==========================================

fn cliente_rules() -> EntityRules {
    EntityRules {
        entity: EntityType::Cliente,
        rules: vec![
            ValidationRule::required("Nombre (*)", "El nombre es obligatorio"),
            ValidationRule::required("CUIT (*)", "El CUIT es obligatorio"),
            ValidationRule::format(
                "CUIT (*)",
                "Formato de CUIT inválido (esperado XX-XXXXXXXX-X)",
                CUIT_PATTERN,
            ),
            ValidationRule::unique("CUIT (*)", "CUIT duplicado", "cuit"),
            ValidationRule::format("Email", "Formato de email inválido", EMAIL_PATTERN),
            ValidationRule::format("Teléfono", "Formato de teléfono inválido", PHONE_PATTERN),
            ValidationRule::reference(
                "Empresa",
                "La empresa no existe en el sistema",
                EntityType::Empresa,
                "razonSocial",
            ),
            ValidationRule::custom("Activo", "El valor debe ser Sí o No", is_si_no),
        ],
        required_headers: &["Nombre (*)", "CUIT (*)"],
        mandatory_fields: &["Nombre (*)", "CUIT (*)"],
        critical_field: "CUIT (*)",
        boolean_fields: &["Activo"],
        record_checks: cliente_record_checks,
    }
}

fn empresa_rules() -> EntityRules {
    EntityRules {
        entity: EntityType::Empresa,
        rules: vec![
            ValidationRule::required("Razón Social (*)", "La razón social es obligatoria"),
            ValidationRule::unique("Razón Social (*)", "Razón social duplicada", "razonSocial"),
            ValidationRule::required("CUIT (*)", "El CUIT es obligatorio"),
            ValidationRule::format(
                "CUIT (*)",
                "Formato de CUIT inválido (esperado XX-XXXXXXXX-X)",
                CUIT_PATTERN,
            ),
            ValidationRule::unique("CUIT (*)", "CUIT duplicado", "cuit"),
            ValidationRule::format("Email", "Formato de email inválido", EMAIL_PATTERN),
            ValidationRule::format("Teléfono", "Formato de teléfono inválido", PHONE_PATTERN),
            ValidationRule::custom("Habilitada", "El valor debe ser Sí o No", is_si_no),
        ],
        required_headers: &["Razón Social (*)", "CUIT (*)"],
        mandatory_fields: &["Razón Social (*)", "CUIT (*)"],
        critical_field: "CUIT (*)",
        boolean_fields: &["Habilitada"],
        record_checks: empresa_record_checks,
    }
}

fn personal_rules() -> EntityRules {
    EntityRules {
        entity: EntityType::Personal,
        rules: vec![
            ValidationRule::required("Nombre (*)", "El nombre es obligatorio"),
            ValidationRule::required("Apellido (*)", "El apellido es obligatorio"),
            ValidationRule::required("DNI (*)", "El DNI es obligatorio"),
            ValidationRule::format(
                "DNI (*)",
                "Formato de DNI inválido (7 u 8 dígitos)",
                DNI_PATTERN,
            ),
            ValidationRule::unique("DNI (*)", "DNI duplicado", "dni"),
            ValidationRule::format(
                "CUIL",
                "Formato de CUIL inválido (esperado XX-XXXXXXXX-X)",
                CUIT_PATTERN,
            ),
            ValidationRule::format("Email", "Formato de email inválido", EMAIL_PATTERN),
            ValidationRule::reference(
                "Empresa",
                "La empresa no existe en el sistema",
                EntityType::Empresa,
                "razonSocial",
            ),
            ValidationRule::custom("Es Chofer", "El valor debe ser Sí o No", is_si_no),
            ValidationRule::format(
                "Vencimiento Licencia",
                "Formato de fecha inválido (esperado DD/MM/YYYY)",
                DATE_PATTERN,
            ),
        ],
        required_headers: &["Nombre (*)", "Apellido (*)", "DNI (*)"],
        mandatory_fields: &["Nombre (*)", "Apellido (*)", "DNI (*)"],
        critical_field: "DNI (*)",
        boolean_fields: &["Es Chofer"],
        record_checks: personal_record_checks,
    }
}

/// Catálogo de reglas de una entidad (None para Desconocido)
pub fn catalog_for(entity: EntityType) -> Option<EntityRules> {
    match entity {
        EntityType::Cliente => Some(cliente_rules()),
        EntityType::Empresa => Some(empresa_rules()),
        EntityType::Personal => Some(personal_rules()),
        EntityType::Desconocido => None,
    }
}
