//! # Client Repository
//!
//! The shared client directory (`clientes`): lookup, registration of
//! titulars and dependents, and photo upload.
//!
//! ## Registration
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  register(client, photo)                                                │
//! │                                                                         │
//! │  1. CPF not already in the directory        → else UniqueViolation     │
//! │  2. dependent? titular must exist           → else NotFound            │
//! │  3. assign id                                                           │
//! │  4. photo? upload, keep URL                 (failure: warn, no photo)  │
//! │  5. create document                                                     │
//! │  6. dependent? titular.temDependentes=true  (failure: warn only)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use otica_core::directory::{search_clients, ClientRow};
use otica_core::Client;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::error::{DbError, DbResult};
use crate::paths::{self, CLIENTS};
use crate::repository::{decode, encode};
use crate::store::{DocumentStore, StoredDocument, WriteOp};

/// Photo bytes captured during registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPhoto {
    pub bytes: Vec<u8>,
    /// File extension without the dot, e.g. `jpg`.
    pub extension: String,
}

impl ClientPhoto {
    pub fn new(bytes: Vec<u8>, extension: impl Into<String>) -> Self {
        ClientPhoto {
            bytes,
            extension: extension.into(),
        }
    }

    fn safe_extension(&self) -> String {
        let ext = self.extension.trim().trim_start_matches('.').to_lowercase();
        if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            ext
        } else {
            "jpg".to_string()
        }
    }
}

/// Repository for the client directory.
#[derive(Clone)]
pub struct ClientRepository {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
}

impl ClientRepository {
    /// Creates a new ClientRepository.
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        ClientRepository { store, blobs }
    }

    fn decode_all(docs: Vec<StoredDocument>) -> DbResult<Vec<Client>> {
        docs.into_iter().map(|doc| decode(CLIENTS, doc)).collect()
    }

    /// Gets a client by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Client>> {
        match self.store.get(CLIENTS, id).await? {
            Some(data) => decode(
                CLIENTS,
                StoredDocument {
                    id: id.to_string(),
                    data,
                },
            )
            .map(Some),
            None => Ok(None),
        }
    }

    /// Every client in the directory.
    pub async fn list(&self) -> DbResult<Vec<Client>> {
        Self::decode_all(self.store.list(CLIENTS).await?)
    }

    /// Finds the client registered with `cpf` (digits only).
    pub async fn find_by_cpf(&self, cpf: &str) -> DbResult<Option<Client>> {
        let docs = self
            .store
            .query_by_field(CLIENTS, "cpf", &Value::String(cpf.to_string()))
            .await?;
        Ok(Self::decode_all(docs)?.into_iter().next())
    }

    /// Dependents registered under a titular.
    pub async fn dependents_of(&self, titular_id: &str) -> DbResult<Vec<Client>> {
        let docs = self
            .store
            .query_by_field(CLIENTS, "dependentesDe", &Value::String(titular_id.to_string()))
            .await?;
        Self::decode_all(docs)
    }

    /// Picker rows for `query`: matching titulars followed by their dependents.
    ///
    /// ## Arguments
    /// * `query` - Name substring, or CPF/phone digits
    /// * `limit` - Maximum rows
    pub async fn search(&self, query: &str, limit: usize) -> DbResult<Vec<ClientRow>> {
        debug!(query, limit, "Searching clients");

        let directory = self.list().await?;
        let rows = search_clients(&directory, query, limit);

        debug!(count = rows.len(), "Client search complete");
        Ok(rows)
    }

    /// Registers a validated client and returns it with its assigned id.
    ///
    /// ## Errors
    /// * `UniqueViolation` - the CPF is already registered
    /// * `NotFound` - a dependent's titular does not exist
    pub async fn register(&self, client: Client, photo: Option<ClientPhoto>) -> DbResult<Client> {
        let mut client = client;
        debug!(cpf = %client.cpf, dependent = client.is_dependent(), "Registering client");

        if self.find_by_cpf(&client.cpf).await?.is_some() {
            return Err(DbError::duplicate("cpf", client.formatted_cpf()));
        }

        if let Some(titular_id) = client.dependent_of.as_deref() {
            if self.get(titular_id).await?.is_none() {
                return Err(DbError::not_found("Client", titular_id));
            }
        }

        if client.id.trim().is_empty() {
            client.id = generate_client_id();
        }
        client.has_dependents = false;

        if let Some(photo) = photo {
            client.photo_url = self.upload_photo(&client.id, &photo).await;
        }

        let data = encode(CLIENTS, &client)?;
        self.store
            .commit(vec![WriteOp::Create {
                collection: CLIENTS.to_string(),
                id: client.id.clone(),
                data,
            }])
            .await?;

        if let Some(titular_id) = client.dependent_of.as_deref() {
            self.mark_has_dependents(titular_id).await;
        }

        info!(id = %client.id, "Client registered");
        Ok(client)
    }

    /// Uploads a client photo.
    ///
    /// Returns the photo URL, or `None` when the upload failed. A failed
    /// upload never aborts registration.
    pub async fn upload_photo(&self, client_id: &str, photo: &ClientPhoto) -> Option<String> {
        let path = paths::client_photo(client_id, &photo.safe_extension());
        match self.blobs.put(&path, &photo.bytes).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(client_id, error = %e, "Photo upload failed, registering without photo");
                None
            }
        }
    }

    /// Sets `temDependentes` on a titular. Failures are logged, not returned.
    async fn mark_has_dependents(&self, titular_id: &str) {
        let result = async {
            let mut data = self
                .store
                .get(CLIENTS, titular_id)
                .await?
                .ok_or_else(|| DbError::not_found("Client", titular_id))?;
            data.insert("temDependentes".to_string(), Value::Bool(true));
            self.store.set(CLIENTS, titular_id, data).await
        }
        .await;

        if let Err(e) = result {
            warn!(titular_id, error = %e, "Could not flag titular as having dependents");
        }
    }
}

/// Generates a new unique client ID.
pub fn generate_client_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use async_trait::async_trait;
    use chrono::Utc;
    use otica_core::registration::ClientDraft;
    use std::sync::Mutex;

    /// Records uploads in memory; optionally fails every upload.
    #[derive(Default)]
    struct MemoryBlobs {
        fail: bool,
        paths: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BlobStore for MemoryBlobs {
        async fn put(&self, path: &str, _bytes: &[u8]) -> DbResult<String> {
            if self.fail {
                return Err(DbError::Blob("disk full".to_string()));
            }
            self.paths.lock().unwrap().push(path.to_string());
            Ok(format!("mem://{path}"))
        }
    }

    fn draft(nome: &str, cpf: &str) -> ClientDraft {
        ClientDraft {
            nome: nome.to_string(),
            cpf: cpf.to_string(),
            telefone: "11987654321".to_string(),
            ..Default::default()
        }
    }

    fn client(nome: &str, cpf: &str) -> Client {
        draft(nome, cpf).build("", Utc::now()).unwrap()
    }

    fn dependent(nome: &str, cpf: &str, titular_id: &str) -> Client {
        let mut d = draft(nome, cpf);
        d.dependentes_de = Some(titular_id.to_string());
        d.parentesco = Some("filho".to_string());
        d.build("", Utc::now()).unwrap()
    }

    async fn setup(blobs: MemoryBlobs) -> (ClientRepository, Arc<MemoryBlobs>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let blobs = Arc::new(blobs);
        (db.clients(blobs.clone()), blobs)
    }

    #[tokio::test]
    async fn test_register_assigns_id_and_persists() {
        let (repo, _) = setup(MemoryBlobs::default()).await;

        let saved = repo.register(client("Maria Silva", "52998224725"), None).await.unwrap();

        assert!(!saved.id.is_empty());
        assert_eq!(repo.get(&saved.id).await.unwrap(), Some(saved.clone()));
        assert_eq!(
            repo.find_by_cpf("52998224725").await.unwrap().map(|c| c.id),
            Some(saved.id)
        );
    }

    #[tokio::test]
    async fn test_duplicate_cpf_rejected() {
        let (repo, _) = setup(MemoryBlobs::default()).await;
        repo.register(client("Maria Silva", "52998224725"), None).await.unwrap();

        let result = repo.register(client("Outra Maria", "529.982.247-25"), None).await;

        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dependent_requires_existing_titular() {
        let (repo, _) = setup(MemoryBlobs::default()).await;

        let result = repo
            .register(dependent("Pedro Silva", "11144477735", "ghost"), None)
            .await;

        assert!(matches!(result, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_dependent_flags_titular() {
        let (repo, _) = setup(MemoryBlobs::default()).await;
        let titular = repo.register(client("Maria Silva", "52998224725"), None).await.unwrap();
        assert!(!titular.has_dependents);

        let pedro = repo
            .register(dependent("Pedro Silva", "11144477735", &titular.id), None)
            .await
            .unwrap();

        let titular = repo.get(&titular.id).await.unwrap().unwrap();
        assert!(titular.has_dependents);

        let dependents = repo.dependents_of(&titular.id).await.unwrap();
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].id, pedro.id);
    }

    #[tokio::test]
    async fn test_search_flattens_dependents() {
        let (repo, _) = setup(MemoryBlobs::default()).await;
        let titular = repo.register(client("Maria Silva", "52998224725"), None).await.unwrap();
        repo.register(dependent("Pedro Souza", "11144477735", &titular.id), None)
            .await
            .unwrap();
        repo.register(client("Joao Pereira", "39053344705"), None).await.unwrap();

        let rows = repo.search("silva", 10).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "Maria Silva");
        assert_eq!(rows[1].label, "Pedro Souza (Maria Silva)");
    }

    #[tokio::test]
    async fn test_photo_upload_sets_url() {
        let (repo, blobs) = setup(MemoryBlobs::default()).await;

        let saved = repo
            .register(
                client("Maria Silva", "52998224725"),
                Some(ClientPhoto::new(vec![1, 2, 3], ".PNG")),
            )
            .await
            .unwrap();

        let expected_path = format!("clientes/{}/foto.png", saved.id);
        assert_eq!(saved.photo_url, Some(format!("mem://{expected_path}")));
        assert_eq!(*blobs.paths.lock().unwrap(), vec![expected_path]);
    }

    #[tokio::test]
    async fn test_failed_photo_upload_does_not_abort_registration() {
        let (repo, _) = setup(MemoryBlobs {
            fail: true,
            ..Default::default()
        })
        .await;

        let saved = repo
            .register(
                client("Maria Silva", "52998224725"),
                Some(ClientPhoto::new(vec![1], "jpg")),
            )
            .await
            .unwrap();

        assert_eq!(saved.photo_url, None);
        assert!(repo.get(&saved.id).await.unwrap().is_some());
    }

    #[test]
    fn test_photo_extension_is_sanitized() {
        assert_eq!(ClientPhoto::new(vec![], "JPEG").safe_extension(), "jpeg");
        assert_eq!(ClientPhoto::new(vec![], "../sh").safe_extension(), "jpg");
        assert_eq!(ClientPhoto::new(vec![], "").safe_extension(), "jpg");
    }
}
