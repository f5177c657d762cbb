// ==========================================
// Sistema de Gestión de Transporte - Lector tabular
// ==========================================
// Etapa 1 del pipeline: decodifica la planilla subida en hojas
// nombradas {encabezados, filas}, normaliza celdas (fechas, recorte,
// elisión de filas en blanco), detecta el tipo de entidad de cada hoja
// y valida la estructura gruesa del archivo.
// Soporta: Excel (.xlsx/.xls) y CSV (.csv)
// ==========================================

use crate::config::defaults;
use crate::domain::{CellValue, EntityType, Row};
use crate::importer::error::{ImportError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

// ==========================================
// Datos de una hoja
// ==========================================
#[derive(Debug, Clone)]
pub struct SheetData {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    /// Filas de datos encontradas (incluye las descartadas por estar en blanco)
    pub total_rows: usize,
    /// Filas efectivamente retenidas
    pub processed_rows: usize,
    /// Anomalías no fatales detectadas durante la lectura
    pub errors: Vec<String>,
}

// ==========================================
// Información del archivo cargado
// ==========================================
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub file_name: String,
    pub sheets: Vec<SheetData>,
    pub total_row_count: usize,
}

// ==========================================
// Reporte de validación estructural
// ==========================================
#[derive(Debug, Clone)]
pub struct StructureReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

// ==========================================
// Opciones del lector
// ==========================================
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Descartar filas completamente en blanco
    pub drop_empty_rows: bool,
    /// Techo de filas totales del archivo
    pub max_total_rows: usize,
    /// Hojas que deben existir (comparación sin mayúsculas/minúsculas)
    pub required_sheets: Vec<String>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            drop_empty_rows: true,
            max_total_rows: defaults::MAX_TOTAL_ROWS,
            required_sheets: Vec::new(),
        }
    }
}

// ==========================================
// Lector tabular
// ==========================================
pub struct TabularReader {
    options: ReaderOptions,
}

impl TabularReader {
    pub fn new(options: ReaderOptions) -> Self {
        Self { options }
    }

    pub fn with_defaults() -> Self {
        Self::new(ReaderOptions::default())
    }

    /// Carga el archivo y normaliza todas sus hojas
    ///
    /// El despacho por extensión sigue el mismo esquema que el resto del
    /// sistema: .xlsx/.xls via calamine, .csv via csv.
    pub fn load(&self, file_path: &Path) -> Result<FileInfo> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let info = match ext.as_str() {
            "xlsx" | "xls" => self.load_excel(file_path)?,
            "csv" => self.load_csv(file_path)?,
            _ => return Err(ImportError::UnsupportedFormat(ext)),
        };

        info!(
            file = %info.file_name,
            sheets = info.sheets.len(),
            total_rows = info.total_row_count,
            "Archivo cargado"
        );
        Ok(info)
    }

    /// Valida la estructura gruesa del archivo
    ///
    /// Fallas: hoja requerida ausente, libro sin hojas, techo de filas
    /// excedido. No fatal a nivel lector; el orquestador aborta con ellas.
    pub fn validate_structure(&self, info: &FileInfo) -> StructureReport {
        let mut errors = Vec::new();

        if info.sheets.is_empty() {
            errors.push("El archivo no contiene hojas".to_string());
        }

        for required in &self.options.required_sheets {
            let found = info
                .sheets
                .iter()
                .any(|s| s.name.eq_ignore_ascii_case(required));
            if !found {
                errors.push(format!("Falta la hoja requerida: {}", required));
            }
        }

        if info.total_row_count > self.options.max_total_rows {
            errors.push(format!(
                "El archivo supera el máximo de filas permitido ({} > {})",
                info.total_row_count, self.options.max_total_rows
            ));
        }

        StructureReport {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Busca una hoja por nombre
    pub fn read_sheet<'a>(&self, info: &'a FileInfo, name: &str) -> Result<&'a SheetData> {
        info.sheets
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ImportError::SheetNotFound(name.to_string()))
    }

    /// Detección heurística del tipo de entidad de una hoja
    ///
    /// Primero por nombre de hoja, después por coincidencia parcial de
    /// encabezados contra los campos conocidos de cada entidad. Devuelve
    /// Desconocido en lugar de fallar cuando nada coincide.
    pub fn detect_entity_type(&self, info: &FileInfo, sheet_name: &str) -> EntityType {
        let sheet = match info
            .sheets
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(sheet_name))
        {
            Some(s) => s,
            None => return EntityType::Desconocido,
        };

        let name_lower = sheet.name.to_lowercase();
        for entity in EntityType::SUPPORTED {
            if entity
                .sheet_name_hints()
                .iter()
                .any(|hint| name_lower.contains(hint))
            {
                return entity;
            }
        }

        let headers_lower: Vec<String> =
            sheet.headers.iter().map(|h| h.to_lowercase()).collect();

        let mut best = EntityType::Desconocido;
        let mut best_score = 0usize;
        for entity in EntityType::SUPPORTED {
            let score = entity
                .header_hints()
                .iter()
                .filter(|hint| headers_lower.iter().any(|h| h.contains(*hint)))
                .count();
            if score > best_score {
                best_score = score;
                best = entity;
            }
        }

        debug!(sheet = %sheet_name, entity = %best, score = best_score, "Entidad detectada");
        best
    }

    // ==========================================
    // Carga Excel
    // ==========================================
    fn load_excel(&self, path: &Path) -> Result<FileInfo> {
        let mut workbook = open_workbook_auto(path)?;

        let sheet_names = workbook.sheet_names().to_vec();
        let mut sheets = Vec::new();

        for sheet_name in sheet_names {
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

            let mut rows_iter = range.rows();

            // Fila 1: encabezados; celdas en blanco -> placeholder posicional
            let headers: Vec<String> = match rows_iter.next() {
                Some(header_row) => header_row
                    .iter()
                    .enumerate()
                    .map(|(idx, cell)| {
                        let text = cell.to_string().trim().to_string();
                        if text.is_empty() {
                            format!("Columna_{}", idx + 1)
                        } else {
                            text
                        }
                    })
                    .collect(),
                None => Vec::new(),
            };

            let mut rows = Vec::new();
            let mut errors = Vec::new();
            let mut total_rows = 0usize;

            for (idx, data_row) in rows_iter.enumerate() {
                total_rows += 1;
                // Número de fila tal como lo muestra la planilla
                let row_number = idx + 2;

                let mut cells = HashMap::new();
                for (col_idx, cell) in data_row.iter().enumerate() {
                    let header = match headers.get(col_idx) {
                        Some(h) => h.clone(),
                        None => format!("Columna_{}", col_idx + 1),
                    };
                    if let Data::Error(e) = cell {
                        errors.push(format!(
                            "Celda con error en fila {}, columna {}: {:?}",
                            row_number, header, e
                        ));
                    }
                    cells.insert(header, normalize_cell(cell));
                }

                let row = Row::new(row_number, cells);
                if self.options.drop_empty_rows && row.is_blank() {
                    continue;
                }
                rows.push(row);
            }

            let processed_rows = rows.len();
            sheets.push(SheetData {
                name: sheet_name,
                headers,
                rows,
                total_rows,
                processed_rows,
                errors,
            });
        }

        let total_row_count = sheets.iter().map(|s| s.total_rows).sum();
        Ok(FileInfo {
            file_name: file_name_of(path),
            sheets,
            total_row_count,
        })
    }

    // ==========================================
    // Carga CSV (una hoja sintética)
    // ==========================================
    fn load_csv(&self, path: &Path) -> Result<FileInfo> {
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // tolera filas de largo desparejo
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(idx, h)| {
                let text = h.trim().to_string();
                if text.is_empty() {
                    format!("Columna_{}", idx + 1)
                } else {
                    text
                }
            })
            .collect();

        let mut rows = Vec::new();
        let mut errors = Vec::new();
        let mut total_rows = 0usize;

        for (idx, result) in reader.records().enumerate() {
            total_rows += 1;
            let row_number = idx + 2;

            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    warn!(row = row_number, error = %e, "Fila CSV ilegible");
                    errors.push(format!("Fila {} ilegible: {}", row_number, e));
                    continue;
                }
            };

            let mut cells = HashMap::new();
            for (col_idx, value) in record.iter().enumerate() {
                let header = match headers.get(col_idx) {
                    Some(h) => h.clone(),
                    None => format!("Columna_{}", col_idx + 1),
                };
                cells.insert(header, CellValue::from(value));
            }

            let row = Row::new(row_number, cells);
            if self.options.drop_empty_rows && row.is_blank() {
                continue;
            }
            rows.push(row);
        }

        let sheet_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Hoja1")
            .to_string();

        let processed_rows = rows.len();
        let sheet = SheetData {
            name: sheet_name,
            headers,
            rows,
            total_rows,
            processed_rows,
            errors,
        };

        Ok(FileInfo {
            file_name: file_name_of(path),
            total_row_count: sheet.total_rows,
            sheets: vec![sheet],
        })
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("desconocido")
        .to_string()
}

// ==========================================
// Normalización de celdas
// ==========================================

/// Rango de seriales que se reinterpretan como fechas de planilla
const DATE_SERIAL_MIN: f64 = 1.0;
const DATE_SERIAL_MAX: f64 = 50_000.0;

/// Convierte una celda calamine en un valor normalizado
///
/// Los enteros dentro del rango de seriales de fecha y las celdas con
/// tipo fecha convergen en la misma representación textual DD/MM/YYYY,
/// para que las reglas de formato posteriores ignoren el origen.
fn normalize_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Int(i) => {
            let v = *i as f64;
            if v > DATE_SERIAL_MIN && v < DATE_SERIAL_MAX {
                match date_serial_to_text(v) {
                    Some(text) => CellValue::Text(text),
                    None => CellValue::Number(v),
                }
            } else {
                CellValue::Number(v)
            }
        }
        Data::Float(f) => {
            if f.fract() == 0.0 && *f > DATE_SERIAL_MIN && *f < DATE_SERIAL_MAX {
                match date_serial_to_text(*f) {
                    Some(text) => CellValue::Text(text),
                    None => CellValue::Number(*f),
                }
            } else {
                CellValue::Number(*f)
            }
        }
        Data::DateTime(dt) => match date_serial_to_text(dt.as_f64()) {
            Some(text) => CellValue::Text(text),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => {
            // ISO -> DD/MM/YYYY (misma representación que los seriales)
            let date_part = s.get(..10).unwrap_or(s.as_str());
            match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
                Ok(date) => CellValue::Text(date.format("%d/%m/%Y").to_string()),
                Err(_) => CellValue::from(s.as_str()),
            }
        }
        Data::DurationIso(s) => CellValue::from(s.as_str()),
        Data::Error(_) => CellValue::Empty,
    }
}

/// Serial de planilla -> texto DD/MM/YYYY (época 1899-12-30)
fn date_serial_to_text(serial: f64) -> Option<String> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_signed(Duration::days(serial.trunc() as i64))?;
    Some(date.format("%d/%m/%Y").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_load_csv_basic() {
        let file = csv_file("Nombre (*),CUIT (*)\nJuan,20-12345678-9\nAna,27-87654321-0\n");
        let reader = TabularReader::with_defaults();
        let info = reader.load(file.path()).unwrap();

        assert_eq!(info.sheets.len(), 1);
        let sheet = &info.sheets[0];
        assert_eq!(sheet.rows.len(), 2);
        // Fila 1 = encabezados; los datos arrancan en la 2
        assert_eq!(sheet.rows[0].number, 2);
        assert_eq!(sheet.rows[0].text("Nombre (*)"), "Juan");
    }

    #[test]
    fn test_load_csv_skips_blank_rows_keeps_numbers() {
        let file = csv_file("Nombre (*),CUIT (*)\nJuan,20-12345678-9\n,\nAna,27-87654321-0\n");
        let reader = TabularReader::with_defaults();
        let info = reader.load(file.path()).unwrap();

        let sheet = &info.sheets[0];
        assert_eq!(sheet.total_rows, 3);
        assert_eq!(sheet.processed_rows, 2);
        // La fila en blanco (3) se descarta pero Ana conserva su posición original
        assert_eq!(sheet.rows[1].number, 4);
        assert_eq!(sheet.rows[1].text("Nombre (*)"), "Ana");
    }

    #[test]
    fn test_blank_header_gets_placeholder() {
        let file = csv_file("Nombre (*),,Email\nJuan,x,j@a.com\n");
        let reader = TabularReader::with_defaults();
        let info = reader.load(file.path()).unwrap();

        assert_eq!(info.sheets[0].headers[1], "Columna_2");
        assert_eq!(info.sheets[0].rows[0].text("Columna_2"), "x");
    }

    #[test]
    fn test_file_not_found() {
        let reader = TabularReader::with_defaults();
        let result = reader.load(Path::new("no_existe.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "x").unwrap();
        let reader = TabularReader::with_defaults();
        let result = reader.load(file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_validate_structure_row_ceiling() {
        let file = csv_file("A\n1\n2\n3\n");
        let reader = TabularReader::new(ReaderOptions {
            max_total_rows: 2,
            ..ReaderOptions::default()
        });
        let info = reader.load(file.path()).unwrap();
        let report = reader.validate_structure(&info);
        assert!(!report.valid);
        assert!(report.errors[0].contains("máximo de filas"));
    }

    #[test]
    fn test_validate_structure_required_sheet() {
        let file = csv_file("A\n1\n");
        let reader = TabularReader::new(ReaderOptions {
            required_sheets: vec!["Clientes".to_string()],
            ..ReaderOptions::default()
        });
        let info = reader.load(file.path()).unwrap();
        let report = reader.validate_structure(&info);
        assert!(!report.valid);
        assert!(report.errors[0].contains("Falta la hoja requerida"));
    }

    #[test]
    fn test_detect_entity_by_headers() {
        let file = csv_file("Nombre (*),Apellido (*),DNI (*)\nJuan,Paz,12345678\n");
        let reader = TabularReader::with_defaults();
        let info = reader.load(file.path()).unwrap();
        let sheet_name = info.sheets[0].name.clone();
        assert_eq!(
            reader.detect_entity_type(&info, &sheet_name),
            EntityType::Personal
        );
    }

    #[test]
    fn test_detect_entity_unknown() {
        let file = csv_file("Foo,Bar\n1,2\n");
        let reader = TabularReader::with_defaults();
        let info = reader.load(file.path()).unwrap();
        let sheet_name = info.sheets[0].name.clone();
        assert_eq!(
            reader.detect_entity_type(&info, &sheet_name),
            EntityType::Desconocido
        );
    }

    #[test]
    fn test_date_serial_to_text() {
        // 45292 = 01/01/2024
        assert_eq!(date_serial_to_text(45292.0).unwrap(), "01/01/2024");
        // 2 = 01/01/1900
        assert_eq!(date_serial_to_text(2.0).unwrap(), "01/01/1900");
    }

    #[test]
    fn test_normalize_cell_date_serial() {
        let value = normalize_cell(&Data::Int(45292));
        assert_eq!(value, CellValue::Text("01/01/2024".to_string()));
        // Fuera del rango de seriales queda como número
        let value = normalize_cell(&Data::Int(20123456789));
        assert_eq!(value, CellValue::Number(20123456789.0));
    }

    #[test]
    fn test_normalize_cell_datetime_iso() {
        let value = normalize_cell(&Data::DateTimeIso("2024-01-15T10:30:00".to_string()));
        assert_eq!(value, CellValue::Text("15/01/2024".to_string()));

        // Texto no parseable queda intacto, incluso cuando el byte 10
        // cae en medio de un carácter multibyte
        let value = normalize_cell(&Data::DateTimeIso("declaración".to_string()));
        assert_eq!(value, CellValue::Text("declaración".to_string()));

        let value = normalize_cell(&Data::DateTimeIso("corto".to_string()));
        assert_eq!(value, CellValue::Text("corto".to_string()));
    }
}
