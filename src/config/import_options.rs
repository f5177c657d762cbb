// ==========================================
// Sistema de Gestión de Transporte - Política de importación
// ==========================================
// Objeto de política que el llamador entrega al pipeline.
// Los defaults replican el comportamiento estándar del sistema.
// ==========================================

use std::time::Duration;

/// Valores por defecto de la política de importación
pub mod defaults {
    use std::time::Duration;

    /// Filas por lote
    pub const BATCH_SIZE: usize = 50;

    /// Lotes simultáneos en vuelo
    pub const MAX_CONCURRENCY: usize = 3;

    /// Reintentos por fila ante fallas transitorias
    pub const RETRY_ATTEMPTS: u32 = 3;

    /// Base del backoff lineal (delay * número de intento)
    pub const RETRY_DELAY: Duration = Duration::from_millis(1000);

    /// Techo de filas totales del archivo
    pub const MAX_TOTAL_ROWS: usize = 10_000;
}

/// Política de importación
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Tamaño de lote para el commit masivo
    pub batch_size: usize,
    /// Cantidad máxima de lotes simultáneos
    pub max_concurrency: usize,
    /// Reintentos por fila ante fallas transitorias
    pub retry_attempts: u32,
    /// Base del backoff lineal entre reintentos
    pub retry_delay: Duration,
    /// Una falla de fila no aborta el lote
    pub continue_on_error: bool,
    /// Ejecutar el planificador de recuperación automática
    pub auto_correct: bool,
    /// Permitir que las acciones skip_row descarten filas
    pub skip_invalid_rows: bool,
    /// Generar el reporte textual del resumen
    pub generate_report: bool,
    /// Techo de filas totales (validación estructural)
    pub max_total_rows: usize,
    /// Hojas que deben existir en el archivo (vacío = sin exigencia)
    pub required_sheets: Vec<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: defaults::BATCH_SIZE,
            max_concurrency: defaults::MAX_CONCURRENCY,
            retry_attempts: defaults::RETRY_ATTEMPTS,
            retry_delay: defaults::RETRY_DELAY,
            continue_on_error: true,
            auto_correct: true,
            skip_invalid_rows: false,
            generate_report: true,
            max_total_rows: defaults::MAX_TOTAL_ROWS,
            required_sheets: Vec::new(),
        }
    }
}
