// ==========================================
// Sistema de Gestión de Transporte - Tipos de dominio
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Tipo de entidad
// ==========================================
// Cada hoja de la planilla representa un tipo de entidad del backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Cliente,
    Empresa,
    Personal,
    Desconocido,
}

impl EntityType {
    /// Entidades con catálogo de reglas y endpoint propio
    pub const SUPPORTED: [EntityType; 3] =
        [EntityType::Cliente, EntityType::Empresa, EntityType::Personal];

    /// Ruta de la colección en el backend (None para Desconocido)
    pub fn endpoint(&self) -> Option<&'static str> {
        match self {
            EntityType::Cliente => Some("clientes"),
            EntityType::Empresa => Some("empresas"),
            EntityType::Personal => Some("personal"),
            EntityType::Desconocido => None,
        }
    }

    /// Palabras clave de encabezados usadas por la detección heurística
    pub fn header_hints(&self) -> &'static [&'static str] {
        match self {
            EntityType::Cliente => &["nombre", "cuit", "activo", "dirección", "direccion"],
            EntityType::Empresa => &["razón social", "razon social", "habilitada", "cuit"],
            EntityType::Personal => &["dni", "apellido", "cuil", "licencia", "chofer"],
            EntityType::Desconocido => &[],
        }
    }

    /// Nombres de hoja que identifican la entidad de forma directa
    pub fn sheet_name_hints(&self) -> &'static [&'static str] {
        match self {
            EntityType::Cliente => &["cliente"],
            EntityType::Empresa => &["empresa"],
            EntityType::Personal => &["personal", "chofer"],
            EntityType::Desconocido => &[],
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Cliente => write!(f, "cliente"),
            EntityType::Empresa => write!(f, "empresa"),
            EntityType::Personal => write!(f, "personal"),
            EntityType::Desconocido => write!(f, "desconocido"),
        }
    }
}

// ==========================================
// Severidad de un hallazgo de validación
// ==========================================
// Error bloquea el commit de la fila; Warning solo informa
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

// ==========================================
// Valor de celda
// ==========================================
// Valor escalar normalizado producido por el lector tabular.
// Las fechas ya llegan normalizadas como texto DD/MM/YYYY.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

impl CellValue {
    /// Representación textual del valor (números enteros sin decimales)
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Bool(b) => {
                if *b {
                    "Sí".to_string()
                } else {
                    "No".to_string()
                }
            }
            CellValue::Empty => String::new(),
        }
    }

    /// Texto recortado (para reglas y comparaciones)
    pub fn trimmed(&self) -> String {
        self.as_text().trim().to_string()
    }

    /// Celda vacía: Empty o texto en blanco tras recortar
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}
