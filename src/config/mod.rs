// ==========================================
// Sistema de Gestión de Transporte - Capa de configuración
// ==========================================
// Responsabilidad: política de importación provista por el llamador
// ==========================================

pub mod import_options;

pub use import_options::{defaults, ImportOptions};
