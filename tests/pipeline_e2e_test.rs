// ==========================================
// Tests de integración - Pipeline completo
// ==========================================
// Archivo CSV real en disco -> lectura -> validación -> recuperación
// -> commit contra el backend en memoria.
// ==========================================


use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use test_helpers::{write_csv, MockBackend};
use tokio_util::sync::CancellationToken;
use transporte_import::{
    BulkProgress, EntityType, ImportError, ImportOptions, ImportPipeline, ProgressCallback,
};

const HEADERS: &str = "Nombre (*),CUIT (*),Email,Teléfono,Empresa,Activo";

fn fast_options() -> ImportOptions {
    let mut options = ImportOptions::default();
    options.batch_size = 4;
    options.max_concurrency = 2;
    options.retry_delay = Duration::from_millis(1);
    options
}

#[tokio::test]
async fn test_archivo_limpio_se_confirma_completo() {
    transporte_import::logging::init_test();
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "clientes.csv",
        &format!(
            "{HEADERS}\n\
             Transporte Sur,20-12345678-9,sur@mail.com,,,Sí\n\
             Cargas Norte,27-87654321-3,,,,No\n\
             Fletes Oeste,23-11223344-5,,,,\n"
        ),
    );

    let api = Arc::new(MockBackend::new());
    let pipeline = ImportPipeline::new(Arc::clone(&api), fast_options());
    let result = pipeline
        .import_file(&path, Some(EntityType::Cliente), None, None)
        .await
        .unwrap();

    assert!(result.validation.is_valid());
    assert!(result.bulk.as_ref().unwrap().success);
    assert_eq!(result.summary.total_rows, 3);
    assert_eq!(result.summary.valid_rows, 3);
    assert_eq!(result.summary.committed_rows, 3);
    assert_eq!(result.summary.rejected_rows, 0);
    assert_eq!(result.processed_data.len(), 3);
    assert_eq!(api.created_count(), 3);
    assert!(result.summary.report.is_some());
}

#[tokio::test]
async fn test_cuit_sin_separadores_se_recupera_y_confirma() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "clientes.csv",
        &format!(
            "{HEADERS}\n\
             Transporte Sur,20-12345678-9,,,,\n\
             Cargas Norte,20123456788,,,,\n"
        ),
    );

    let api = Arc::new(MockBackend::new());
    let pipeline = ImportPipeline::new(Arc::clone(&api), fast_options());
    let result = pipeline
        .import_file(&path, Some(EntityType::Cliente), None, None)
        .await
        .unwrap();

    assert_eq!(result.summary.valid_rows, 1);
    assert_eq!(result.summary.recovered_rows, 1);
    assert_eq!(result.summary.committed_rows, 2);

    // La fila 3 llegó al backend con el CUIT normalizado
    let committed = api.created_row(3).unwrap();
    assert_eq!(committed.text("CUIT (*)"), "20-12345678-8");
}

#[tokio::test]
async fn test_booleano_en_mayusculas_se_normaliza() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "clientes.csv",
        &format!("{HEADERS}\nTransporte Sur,20-12345678-9,,,,SI\n"),
    );

    let api = Arc::new(MockBackend::new());
    let pipeline = ImportPipeline::new(Arc::clone(&api), fast_options());
    let result = pipeline
        .import_file(&path, Some(EntityType::Cliente), None, None)
        .await
        .unwrap();

    assert_eq!(result.summary.recovered_rows, 1);
    assert_eq!(api.created_row(2).unwrap().text("Activo"), "Sí");
}

#[tokio::test]
async fn test_referencia_aproximada_se_canonicaliza() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "clientes.csv",
        &format!("{HEADERS}\nTransporte Sur,20-12345678-9,,,transportes del sur,\n"),
    );

    let api = Arc::new(MockBackend::new().with_empresas(&["Transportes del Sur SA"]));
    let pipeline = ImportPipeline::new(Arc::clone(&api), fast_options());
    let result = pipeline
        .import_file(&path, Some(EntityType::Cliente), None, None)
        .await
        .unwrap();

    assert_eq!(result.summary.recovered_rows, 1);
    assert_eq!(
        api.created_row(2).unwrap().text("Empresa"),
        "Transportes del Sur SA"
    );
}

#[tokio::test]
async fn test_cuit_preexistente_queda_rechazado() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "clientes.csv",
        &format!(
            "{HEADERS}\n\
             Transporte Sur,20-12345678-9,,,,\n\
             Cargas Norte,27-87654321-3,,,,\n"
        ),
    );

    let api = Arc::new(MockBackend::new().with_cliente_cuits(&["20-12345678-9"]));
    let pipeline = ImportPipeline::new(Arc::clone(&api), fast_options());
    let result = pipeline
        .import_file(&path, Some(EntityType::Cliente), None, None)
        .await
        .unwrap();

    // El duplicado contra el sistema no tiene corrección automática
    assert_eq!(result.summary.rejected_rows, 1);
    assert_eq!(result.summary.committed_rows, 1);
    assert!(api.created_row(2).is_none());
    assert!(api.created_row(3).is_some());
}

#[tokio::test]
async fn test_duplicado_dentro_del_archivo_rechaza_ambas() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "clientes.csv",
        &format!(
            "{HEADERS}\n\
             Transporte Sur,20-12345678-9,,,,\n\
             Cargas Norte,20-12345678-9,,,,\n"
        ),
    );

    let api = Arc::new(MockBackend::new());
    let pipeline = ImportPipeline::new(Arc::clone(&api), fast_options());
    let result = pipeline
        .import_file(&path, Some(EntityType::Cliente), None, None)
        .await
        .unwrap();

    assert_eq!(result.summary.rejected_rows, 2);
    assert_eq!(result.summary.committed_rows, 0);
    assert_eq!(api.created_count(), 0);
}

#[tokio::test]
async fn test_clave_critica_faltante_se_saltea_con_politica() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "clientes.csv",
        &format!(
            "{HEADERS}\n\
             Transporte Sur,20-12345678-9,,,,\n\
             Sin Cuit,,,,,\n"
        ),
    );

    let api = Arc::new(MockBackend::new());

    // Sin la política: la fila queda rechazada
    let pipeline = ImportPipeline::new(Arc::clone(&api), fast_options());
    let result = pipeline
        .import_file(&path, Some(EntityType::Cliente), None, None)
        .await
        .unwrap();
    assert_eq!(result.summary.rejected_rows, 1);
    assert_eq!(result.summary.skipped_rows, 0);

    // Con la política: la fila se saltea y no cuenta como rechazo
    let mut options = fast_options();
    options.skip_invalid_rows = true;
    let api = Arc::new(MockBackend::new());
    let pipeline = ImportPipeline::new(Arc::clone(&api), options);
    let result = pipeline
        .import_file(&path, Some(EntityType::Cliente), None, None)
        .await
        .unwrap();
    assert_eq!(result.summary.skipped_rows, 1);
    assert_eq!(result.summary.rejected_rows, 0);
    assert_eq!(result.summary.committed_rows, 1);
}

#[tokio::test]
async fn test_validacion_en_seco_no_escribe() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "clientes.csv",
        &format!("{HEADERS}\nTransporte Sur,20-12345678-9,,,,\n"),
    );

    let api = Arc::new(MockBackend::new());
    let pipeline = ImportPipeline::new(Arc::clone(&api), fast_options());
    let result = pipeline
        .validate_file(&path, Some(EntityType::Cliente))
        .await
        .unwrap();

    assert!(result.bulk.is_none());
    assert!(result.recovery.is_none());
    assert_eq!(result.summary.valid_rows, 1);
    assert_eq!(result.summary.committed_rows, 0);
    assert_eq!(api.created_count(), 0);
}

#[tokio::test]
async fn test_entidad_detectada_por_nombre_de_archivo() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "clientes.csv",
        &format!("{HEADERS}\nTransporte Sur,20-12345678-9,,,,\n"),
    );

    let api = Arc::new(MockBackend::new());
    let pipeline = ImportPipeline::new(Arc::clone(&api), fast_options());
    let result = pipeline.import_file(&path, None, None, None).await.unwrap();

    assert_eq!(result.summary.entity, EntityType::Cliente);
    assert_eq!(result.summary.committed_rows, 1);
}

#[tokio::test]
async fn test_archivo_irreconocible_aborta() {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, "datos.csv", "ColA,ColB\n1,2\n");

    let api = Arc::new(MockBackend::new());
    let pipeline = ImportPipeline::new(Arc::clone(&api), fast_options());
    let error = pipeline
        .import_file(&path, None, None, None)
        .await
        .unwrap_err();

    assert!(matches!(error, ImportError::UnsupportedEntity(_)));
    assert_eq!(api.created_count(), 0);
}

#[tokio::test]
async fn test_techo_de_filas_aborta_antes_de_validar() {
    let dir = tempdir().unwrap();
    let mut content = format!("{HEADERS}\n");
    for i in 0..5 {
        content.push_str(&format!("Cliente {i},20-1234567{i}-9,,,,\n"));
    }
    let path = write_csv(&dir, "clientes.csv", &content);

    let mut options = fast_options();
    options.max_total_rows = 3;
    let api = Arc::new(MockBackend::new());
    let pipeline = ImportPipeline::new(Arc::clone(&api), options);
    let error = pipeline
        .import_file(&path, Some(EntityType::Cliente), None, None)
        .await
        .unwrap_err();

    assert!(matches!(error, ImportError::InvalidStructure(_)));
    assert_eq!(api.created_count(), 0);
}

#[tokio::test]
async fn test_cancelacion_devuelve_resultado_parcial() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "clientes.csv",
        &format!(
            "{HEADERS}\n\
             Transporte Sur,20-12345678-9,,,,\n\
             Cargas Norte,27-87654321-3,,,,\n"
        ),
    );

    let api = Arc::new(MockBackend::new());
    let pipeline = ImportPipeline::new(Arc::clone(&api), fast_options());
    let token = CancellationToken::new();
    token.cancel();

    let result = pipeline
        .import_file(&path, Some(EntityType::Cliente), None, Some(token))
        .await
        .unwrap();

    let bulk = result.bulk.unwrap();
    assert!(bulk.cancelled);
    assert_eq!(result.summary.committed_rows, 0);
    assert!(result.summary.report.unwrap().contains("cancelada"));
}

#[tokio::test]
async fn test_progreso_llega_al_callback() {
    let dir = tempdir().unwrap();
    let mut content = format!("{HEADERS}\n");
    for i in 0..10 {
        content.push_str(&format!("Cliente {i},2{i}-1234567{i}-9,,,,\n"));
    }
    let path = write_csv(&dir, "clientes.csv", &content);

    let snapshots: Arc<Mutex<Vec<BulkProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&snapshots);
    let callback: ProgressCallback = Arc::new(move |p: &BulkProgress| {
        sink.lock().unwrap().push(p.clone());
    });

    let api = Arc::new(MockBackend::new());
    let pipeline = ImportPipeline::new(Arc::clone(&api), fast_options());
    let result = pipeline
        .import_file(&path, Some(EntityType::Cliente), Some(callback), None)
        .await
        .unwrap();

    assert_eq!(result.summary.committed_rows, 10);
    let snapshots = snapshots.lock().unwrap();
    // 10 filas con lote de 4: 3 lotes reportados
    assert_eq!(snapshots.len(), 3);
    assert_eq!(snapshots.last().unwrap().processed, 10);
}
