// ==========================================
// Sistema de Gestión de Transporte - Motor de commit masivo
// ==========================================
// Particiona las filas en lotes de tamaño fijo y los envía al backend
// con concurrencia acotada por semáforo. Dentro de cada lote las filas
// van en orden estricto; entre lotes el orden de finalización es libre.
// El colector de resultados es el único escritor del progreso.
// ==========================================

use crate::api::BackendApi;
use crate::config::ImportOptions;
use crate::domain::{BulkError, BulkProgress, BulkResult, EntityType, Row};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Callback de progreso, invocado tras cada lote completado
pub type ProgressCallback = Arc<dyn Fn(&BulkProgress) + Send + Sync>;

// ==========================================
// Opciones de commit
// ==========================================
#[derive(Debug, Clone)]
pub struct CommitOptions {
    pub batch_size: usize,
    pub max_concurrency: usize,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub continue_on_error: bool,
}

impl From<&ImportOptions> for CommitOptions {
    fn from(options: &ImportOptions) -> Self {
        Self {
            batch_size: options.batch_size,
            max_concurrency: options.max_concurrency,
            retry_attempts: options.retry_attempts,
            retry_delay: options.retry_delay,
            continue_on_error: options.continue_on_error,
        }
    }
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self::from(&ImportOptions::default())
    }
}

// ==========================================
// Resultado por lote
// ==========================================
struct BatchOutcome {
    index: usize,
    successful: usize,
    errors: Vec<BulkError>,
    aborted: bool,
}

// ==========================================
// Motor de commit masivo
// ==========================================
pub struct BulkCommitter<A: BackendApi + 'static> {
    api: Arc<A>,
    options: CommitOptions,
}

impl<A: BackendApi + 'static> BulkCommitter<A> {
    pub fn new(api: Arc<A>, options: CommitOptions) -> Self {
        Self { api, options }
    }

    /// Inserta las filas en lotes concurrentes
    ///
    /// El token de cancelación corta en el límite de fila: lo ya enviado
    /// no se deshace y el resultado refleja el trabajo parcial con
    /// `cancelled = true`. Sin filas devuelve el resultado vacío sin
    /// tocar el backend.
    pub async fn bulk_insert(
        &self,
        entity: EntityType,
        rows: Vec<Row>,
        progress: Option<ProgressCallback>,
        cancel: Option<CancellationToken>,
    ) -> BulkResult {
        if rows.is_empty() {
            return BulkResult::empty();
        }

        let started = Instant::now();
        let total = rows.len();
        let batch_size = self.options.batch_size.max(1);
        let batches: Vec<Vec<Row>> = rows.chunks(batch_size).map(|c| c.to_vec()).collect();
        let total_batches = batches.len();
        let token = cancel.unwrap_or_default();
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));

        info!(
            entity = %entity,
            filas = total,
            lotes = total_batches,
            lote = batch_size,
            concurrencia = self.options.max_concurrency,
            "Inicio de commit masivo"
        );

        let mut set = JoinSet::new();
        for (index, batch) in batches.into_iter().enumerate() {
            let api = Arc::clone(&self.api);
            let semaphore = Arc::clone(&semaphore);
            let token = token.clone();
            let options = self.options.clone();
            set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return BatchOutcome {
                            index,
                            successful: 0,
                            errors: Vec::new(),
                            aborted: true,
                        }
                    }
                };
                commit_batch(api.as_ref(), entity, index, batch, &options, &token).await
            });
        }

        // Colector: único escritor de la instantánea de progreso
        let mut snapshot = BulkProgress::new(total, total_batches);
        let mut machinery_failure = false;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => {
                    debug!(
                        lote = outcome.index + 1,
                        exitosas = outcome.successful,
                        fallidas = outcome.errors.len(),
                        "Lote completado"
                    );
                    snapshot.successful += outcome.successful;
                    snapshot.failed += outcome.errors.len();
                    snapshot.processed = snapshot.successful + snapshot.failed;
                    snapshot.current_batch += 1;
                    snapshot.percentage =
                        ((snapshot.processed as f64 / total as f64) * 100.0).round() as u32;
                    snapshot.errors.extend(outcome.errors);

                    // Un lote abortado sin token cancelado solo puede venir
                    // de la contabilidad interna (semáforo cerrado)
                    if outcome.aborted && !token.is_cancelled() {
                        machinery_failure = true;
                    }

                    // ETA lineal sobre lo ya procesado
                    snapshot.estimated_time_remaining_ms =
                        if snapshot.processed > 0 && snapshot.processed < total {
                            let elapsed = started.elapsed().as_millis() as f64;
                            let per_row = elapsed / snapshot.processed as f64;
                            Some((per_row * (total - snapshot.processed) as f64) as u64)
                        } else {
                            None
                        };

                    if let Some(callback) = &progress {
                        callback(&snapshot);
                    }
                }
                Err(join_error) => {
                    error!(error = %join_error, "Falla interna de un lote");
                    machinery_failure = true;
                }
            }
        }

        let duration = started.elapsed();
        let duration_ms = duration.as_millis() as u64;
        let cancelled = token.is_cancelled();
        let mut errors = snapshot.errors;
        errors.sort_by_key(|e| e.row);

        let secs = duration.as_secs_f64();
        let throughput = if secs > 0.0 {
            snapshot.successful as f64 / secs
        } else {
            0.0
        };

        let result = BulkResult {
            success: errors.is_empty() && !cancelled && !machinery_failure,
            total,
            successful: snapshot.successful,
            failed: snapshot.failed,
            errors,
            duration_ms,
            throughput,
            cancelled,
        };

        info!(
            exitosas = result.successful,
            fallidas = result.failed,
            cancelado = result.cancelled,
            duracion_ms = result.duration_ms,
            "Commit masivo finalizado"
        );
        result
    }

    /// Actualiza registros uno por uno, con la misma política de reintentos
    pub async fn bulk_update(&self, entity: EntityType, records: Vec<(String, Row)>) -> BulkResult {
        if records.is_empty() {
            return BulkResult::empty();
        }
        let started = Instant::now();
        let total = records.len();
        let mut successful = 0;
        let mut errors = Vec::new();

        for (id, row) in &records {
            let outcome = with_retry(&self.options, row.number, row, || {
                self.api.update(entity, id, row)
            })
            .await;
            match outcome {
                Ok(()) => successful += 1,
                Err(entry) => errors.push(entry),
            }
        }

        finish_sequential(started, total, successful, errors)
    }

    /// Elimina registros uno por uno, con la misma política de reintentos
    pub async fn bulk_delete(&self, entity: EntityType, records: Vec<(usize, String)>) -> BulkResult {
        if records.is_empty() {
            return BulkResult::empty();
        }
        let started = Instant::now();
        let total = records.len();
        let mut successful = 0;
        let mut errors = Vec::new();

        for (row_number, id) in &records {
            // Fila sintética para el ledger: el registro original ya no está
            let placeholder = Row::new(*row_number, HashMap::new());
            let outcome = with_retry(&self.options, *row_number, &placeholder, || {
                self.api.delete(entity, id)
            })
            .await;
            match outcome {
                Ok(()) => successful += 1,
                Err(entry) => errors.push(entry),
            }
        }

        finish_sequential(started, total, successful, errors)
    }
}

// ==========================================
// Lote y fila
// ==========================================

/// Commit de un lote, fila por fila en orden estricto
async fn commit_batch<A: BackendApi>(
    api: &A,
    entity: EntityType,
    index: usize,
    rows: Vec<Row>,
    options: &CommitOptions,
    token: &CancellationToken,
) -> BatchOutcome {
    let mut successful = 0;
    let mut errors = Vec::new();
    let mut aborted = false;

    for row in &rows {
        if token.is_cancelled() {
            aborted = true;
            break;
        }
        let outcome = with_retry(options, row.number, row, || api.create(entity, row)).await;
        match outcome {
            Ok(()) => successful += 1,
            Err(entry) => {
                errors.push(entry);
                if !options.continue_on_error {
                    // Los lotes restantes verán el token y cortarán
                    token.cancel();
                    aborted = true;
                    break;
                }
            }
        }
    }

    BatchOutcome {
        index,
        successful,
        errors,
        aborted,
    }
}

/// Ejecuta una operación de fila con reintentos ante fallas transitorias
///
/// Backoff lineal: `retry_delay * número de intento`. Las fallas
/// permanentes (4xx salvo 408/429) van directo al ledger con
/// `retry_count = 0`; las transitorias agotan los reintentos y llegan
/// con `retry_count == retry_attempts`.
async fn with_retry<F, Fut>(
    options: &CommitOptions,
    row_number: usize,
    row: &Row,
    mut operation: F,
) -> Result<(), BulkError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<(), crate::api::ApiError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() && attempt < options.retry_attempts => {
                attempt += 1;
                warn!(fila = row_number, intento = attempt, error = %e, "Reintentando fila");
                sleep(options.retry_delay * attempt).await;
            }
            Err(e) => {
                return Err(BulkError {
                    row: row_number,
                    data: row.clone(),
                    error: e.to_string(),
                    retry_count: attempt,
                    timestamp: Utc::now(),
                });
            }
        }
    }
}

fn finish_sequential(
    started: Instant,
    total: usize,
    successful: usize,
    errors: Vec<BulkError>,
) -> BulkResult {
    let duration = started.elapsed();
    let secs = duration.as_secs_f64();
    BulkResult {
        success: errors.is_empty(),
        total,
        successful,
        failed: errors.len(),
        duration_ms: duration.as_millis() as u64,
        throughput: if secs > 0.0 {
            successful as f64 / secs
        } else {
            0.0
        },
        errors,
        cancelled: false,
    }
}
