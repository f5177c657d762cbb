// ==========================================
// Sistema de Gestión de Transporte - Cliente del backend
// ==========================================
// Responsabilidad: un endpoint por entidad, consumido fila por fila por
// el motor de commit, más las lecturas para el snapshot de referencia.
// El trait es la costura para sustituir el backend en tests.
// ==========================================

use crate::api::error::ApiError;
use crate::domain::{EntityType, Row};
use async_trait::async_trait;
use serde_json::Value;

/// Registro plano tal como lo devuelve el backend
pub type BackendRecord = serde_json::Map<String, Value>;

// ==========================================
// BackendApi Trait
// ==========================================
// Implementadores: HttpBackendClient (producción), mocks (tests)
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Crea un registro (POST /{entidad})
    async fn create(&self, entity: EntityType, record: &Row) -> Result<(), ApiError>;

    /// Actualiza un registro (PUT /{entidad}/:id)
    async fn update(&self, entity: EntityType, id: &str, record: &Row) -> Result<(), ApiError>;

    /// Elimina un registro (DELETE /{entidad}/:id)
    async fn delete(&self, entity: EntityType, id: &str) -> Result<(), ApiError>;

    /// Lee todos los registros de una entidad (GET /{entidad})
    ///
    /// Se consume una vez por sesión para armar el snapshot de referencia.
    async fn fetch_all(&self, entity: EntityType) -> Result<Vec<BackendRecord>, ApiError>;
}

// ==========================================
// HttpBackendClient - implementación reqwest
// ==========================================
pub struct HttpBackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn collection_url(&self, entity: EntityType) -> Result<String, ApiError> {
        let path = entity
            .endpoint()
            .ok_or_else(|| ApiError::UnsupportedEntity(entity.to_string()))?;
        Ok(format!("{}/{}", self.base_url, path))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl BackendApi for HttpBackendClient {
    async fn create(&self, entity: EntityType, record: &Row) -> Result<(), ApiError> {
        let url = self.collection_url(entity)?;
        let response = self.client.post(&url).json(record.cells()).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn update(&self, entity: EntityType, id: &str, record: &Row) -> Result<(), ApiError> {
        let url = format!("{}/{}", self.collection_url(entity)?, id);
        let response = self.client.put(&url).json(record.cells()).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn delete(&self, entity: EntityType, id: &str) -> Result<(), ApiError> {
        let url = format!("{}/{}", self.collection_url(entity)?, id);
        let response = self.client.delete(&url).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn fetch_all(&self, entity: EntityType) -> Result<Vec<BackendRecord>, ApiError> {
        let url = self.collection_url(entity)?;
        let response = self.client.get(&url).send().await?;
        let response = Self::check_status(response).await?;
        let records: Vec<BackendRecord> = response.json().await?;
        Ok(records)
    }
}
