// ==========================================
// Sistema de Gestión de Transporte - Fila lógica
// ==========================================
// Una fila = un registro de la planilla tras el mapeo de encabezados.
// Inmutable una vez producida por el lector: las etapas posteriores
// construyen copias con `with_value`, nunca mutan en el lugar.
// ==========================================

use crate::domain::types::CellValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fila lógica de la planilla
///
/// `number` es el número de fila 1-based tal como lo muestra la planilla
/// (fila 1 = encabezados, datos desde la fila 2). Todo error, acción de
/// recuperación o entrada de ledger apunta siempre a este número original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub number: usize,
    cells: HashMap<String, CellValue>,
}

impl Row {
    pub fn new(number: usize, cells: HashMap<String, CellValue>) -> Self {
        Self { number, cells }
    }

    /// Valor de un campo (None si la columna no existe)
    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.cells.get(field)
    }

    /// Texto recortado de un campo ("" si la columna no existe)
    pub fn text(&self, field: &str) -> String {
        self.cells.get(field).map(|v| v.trimmed()).unwrap_or_default()
    }

    /// Campo vacío o ausente
    pub fn is_field_empty(&self, field: &str) -> bool {
        self.cells.get(field).map(|v| v.is_empty()).unwrap_or(true)
    }

    /// Fila en blanco: todas las celdas vacías tras recortar
    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.is_empty())
    }

    /// Copia de la fila con un campo reescrito (mismo número de fila)
    pub fn with_value(&self, field: &str, value: CellValue) -> Row {
        let mut cells = self.cells.clone();
        cells.insert(field.to_string(), value);
        Row {
            number: self.number,
            cells,
        }
    }

    /// Acceso al mapa de celdas (para serializar hacia el backend)
    pub fn cells(&self) -> &HashMap<String, CellValue> {
        &self.cells
    }
}
