// ==========================================
// Sistema de Gestión de Transporte - Commit masivo (tipos)
// ==========================================
// Ledger de errores, progreso incremental y resultado consolidado
// del motor de commit masivo.
// ==========================================

use crate::domain::row::Row;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Error de commit por fila
// ==========================================
// `retry_count` es el número final de reintentos agotados; una vez que
// la entrada llega al ledger es historia append-only, no se muta más.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkError {
    pub row: usize,
    pub data: Row,
    pub error: String,
    pub retry_count: u32,
    pub timestamp: DateTime<Utc>,
}

// ==========================================
// Progreso de commit
// ==========================================
// Instantánea de un único escritor (la operación de commit en curso);
// se entrega clonada al callback después de cada lote.
// Invariantes: successful + failed == processed, processed <= total,
// percentage == round(processed / total * 100).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkProgress {
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub current_batch: usize,
    pub total_batches: usize,
    pub percentage: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time_remaining_ms: Option<u64>,
    pub errors: Vec<BulkError>,
}

impl BulkProgress {
    pub fn new(total: usize, total_batches: usize) -> Self {
        Self {
            total,
            processed: 0,
            successful: 0,
            failed: 0,
            current_batch: 0,
            total_batches,
            percentage: 0,
            estimated_time_remaining_ms: None,
            errors: Vec::new(),
        }
    }
}

// ==========================================
// Resultado de commit masivo
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResult {
    pub success: bool,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<BulkError>,
    pub duration_ms: u64,
    /// Filas exitosas por segundo
    pub throughput: f64,
    /// Operación detenida por el token de cancelación
    pub cancelled: bool,
}

impl BulkResult {
    /// Resultado vacío para una entrada sin filas
    pub fn empty() -> Self {
        Self {
            success: true,
            total: 0,
            successful: 0,
            failed: 0,
            errors: Vec::new(),
            duration_ms: 0,
            throughput: 0.0,
            cancelled: false,
        }
    }
}
