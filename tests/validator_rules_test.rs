// ==========================================
// Tests de integración - Reglas de validación
// ==========================================
// Planillas CSV reales contra el motor de validación, cubriendo el
// catálogo de personal (chequeos cruzados de chofer) y los casos de
// plantilla incompleta.
// ==========================================


use tempfile::tempdir;
use test_helpers::{write_csv, MockBackend};
use transporte_import::{
    BackendApi, EntityType, ReferenceSnapshot, Severity, TabularReader, ValidationEngine,
};

const PERSONAL_HEADERS: &str =
    "Nombre (*),Apellido (*),DNI (*),CUIL,Email,Empresa,Es Chofer,Nro Licencia,Vencimiento Licencia";

async fn snapshot_for(api: &MockBackend) -> ReferenceSnapshot {
    ReferenceSnapshot::load(api as &dyn BackendApi).await.unwrap()
}

#[tokio::test]
async fn test_chofer_sin_licencia_es_error() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "personal.csv",
        &format!(
            "{PERSONAL_HEADERS}\n\
             Juan,Pérez,12345678,,,,Sí,,\n\
             Ana,López,87654321,,,,No,,\n"
        ),
    );

    let reader = TabularReader::with_defaults();
    let info = reader.load(&path).unwrap();
    let sheet = reader.read_sheet(&info, "personal").unwrap();

    let api = MockBackend::new();
    let snapshot = snapshot_for(&api).await;
    let engine = ValidationEngine::new(&snapshot);
    let result = engine.validate(EntityType::Personal, sheet).unwrap();

    // El chofer sin licencia queda inválido; el no-chofer pasa
    assert_eq!(result.invalid.len(), 1);
    assert_eq!(result.invalid[0].number, 2);
    let blocking = result.blocking_errors_for_row(2);
    assert_eq!(blocking.len(), 1);
    assert_eq!(blocking[0].field, "Nro Licencia");
}

#[tokio::test]
async fn test_licencia_vencida_es_solo_warning() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "personal.csv",
        &format!("{PERSONAL_HEADERS}\nJuan,Pérez,12345678,,,,Sí,LIC-99,01/01/2020\n"),
    );

    let reader = TabularReader::with_defaults();
    let info = reader.load(&path).unwrap();
    let sheet = reader.read_sheet(&info, "personal").unwrap();

    let api = MockBackend::new();
    let snapshot = snapshot_for(&api).await;
    let engine = ValidationEngine::new(&snapshot);
    let result = engine.validate(EntityType::Personal, sheet).unwrap();

    // El warning no bloquea: la fila sigue siendo válida
    assert!(result.is_valid());
    assert_eq!(result.summary.warning_rows, 1);
    let findings = result.errors_for_row(2);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Warning);
    assert_eq!(findings[0].field, "Vencimiento Licencia");
}

#[tokio::test]
async fn test_columna_obligatoria_ausente() {
    let dir = tempdir().unwrap();
    // Sin la columna DNI (*)
    let path = write_csv(
        &dir,
        "personal.csv",
        "Nombre (*),Apellido (*)\nJuan,Pérez\n",
    );

    let reader = TabularReader::with_defaults();
    let info = reader.load(&path).unwrap();
    let sheet = reader.read_sheet(&info, "personal").unwrap();

    let api = MockBackend::new();
    let snapshot = snapshot_for(&api).await;
    let engine = ValidationEngine::new(&snapshot);
    let result = engine.validate(EntityType::Personal, sheet).unwrap();

    // Hallazgo de plantilla en la fila 1 y fila de datos inválida
    let header_findings = result.errors_for_row(1);
    assert!(header_findings
        .iter()
        .any(|e| e.message.contains("DNI (*)")));
    assert_eq!(result.invalid.len(), 1);
}

#[tokio::test]
async fn test_fila_sin_obligatorios_se_rechaza_por_plantilla() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "personal.csv",
        &format!(
            "{PERSONAL_HEADERS}\n\
             Juan,Pérez,12345678,,,,No,,\n\
             ,,,,juan@mail.com,,,,\n"
        ),
    );

    let reader = TabularReader::with_defaults();
    let info = reader.load(&path).unwrap();
    let sheet = reader.read_sheet(&info, "personal").unwrap();

    let api = MockBackend::new();
    let snapshot = snapshot_for(&api).await;
    let engine = ValidationEngine::new(&snapshot);
    let result = engine.validate(EntityType::Personal, sheet).unwrap();

    assert_eq!(result.invalid.len(), 1);
    assert_eq!(result.invalid[0].number, 3);
    let blocking = result.blocking_errors_for_row(3);
    assert_eq!(blocking.len(), 1);
    assert_eq!(blocking[0].field, "*");
}

#[tokio::test]
async fn test_referencia_existente_no_genera_hallazgos() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "personal.csv",
        &format!("{PERSONAL_HEADERS}\nJuan,Pérez,12345678,,,Transportes Sur,No,,\n"),
    );

    let reader = TabularReader::with_defaults();
    let info = reader.load(&path).unwrap();
    let sheet = reader.read_sheet(&info, "personal").unwrap();

    let api = MockBackend::new().with_empresas(&["Transportes Sur"]);
    let snapshot = snapshot_for(&api).await;
    let engine = ValidationEngine::new(&snapshot);
    let result = engine.validate(EntityType::Personal, sheet).unwrap();

    assert!(result.is_valid());
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_dni_duplicado_en_archivo_marca_ambas_filas() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "personal.csv",
        &format!(
            "{PERSONAL_HEADERS}\n\
             Juan,Pérez,12345678,,,,No,,\n\
             Ana,López,12345678,,,,No,,\n"
        ),
    );

    let reader = TabularReader::with_defaults();
    let info = reader.load(&path).unwrap();
    let sheet = reader.read_sheet(&info, "personal").unwrap();

    let api = MockBackend::new();
    let snapshot = snapshot_for(&api).await;
    let engine = ValidationEngine::new(&snapshot);
    let result = engine.validate(EntityType::Personal, sheet).unwrap();

    assert_eq!(result.invalid.len(), 2);
    for row in [2, 3] {
        let blocking = result.blocking_errors_for_row(row);
        assert!(blocking
            .iter()
            .any(|e| e.message.contains("duplicado en el archivo")));
    }
}

#[tokio::test]
async fn test_obligatorio_vacio_usa_el_mensaje_de_la_regla() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "clientes.csv",
        "Nombre (*),CUIT (*)\n,20-12345678-9\n",
    );

    let reader = TabularReader::with_defaults();
    let info = reader.load(&path).unwrap();
    let sheet = reader.read_sheet(&info, "clientes").unwrap();

    let api = MockBackend::new();
    let snapshot = snapshot_for(&api).await;
    let engine = ValidationEngine::new(&snapshot);
    let result = engine.validate(EntityType::Cliente, sheet).unwrap();

    let blocking = result.blocking_errors_for_row(2);
    assert_eq!(blocking.len(), 1);
    assert_eq!(blocking[0].message, "El nombre es obligatorio");
    assert_eq!(blocking[0].severity, Severity::Error);
}
