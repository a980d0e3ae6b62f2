use crate::store::atomic_writer::AtomicWriter;
use crate::traits::{PersistenceMetadata, FORMAT_VERSION};
use async_trait::async_trait;
use crm_core::{CrmError, CrmResult};
use crm_domain::{
    Contact, Deal, DealCategory, DealId, DealUpdate, InboundLead, IngestedLead, NewContact,
    NewDeal, PipelineSnapshot, PipelineStore, Stage, StageOrder, StageUpdate,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// On-disk layout of a pipeline file
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonEnvelope {
    pub version: u32,
    pub metadata: PersistenceMetadata,
    pub data: PipelineSnapshot,
}

/// Pipeline kept in a single JSON file.
///
/// The file is read on first use. Every write is applied to a copy of the
/// snapshot, saved atomically, and only then becomes visible to readers, so
/// a failed save leaves both the file and memory as they were. Once a save
/// has started it runs to completion even if the caller stops waiting.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    instance_id: Uuid,
    state: Arc<Mutex<Option<PipelineSnapshot>>>,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_instance_id(path, Uuid::new_v4())
    }

    pub fn with_instance_id(path: impl AsRef<Path>, instance_id: Uuid) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            instance_id,
            state: Arc::new(Mutex::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Reads the file. A missing or empty pipeline starts from the default
    /// stages.
    async fn load(&self) -> CrmResult<PipelineSnapshot> {
        let Some(bytes) = AtomicWriter::read_if_exists(&self.path).await? else {
            tracing::info!(path = %self.path.display(), "No pipeline file yet, using defaults");
            return Ok(PipelineSnapshot::seeded());
        };

        let envelope: JsonEnvelope = serde_json::from_slice(&bytes)
            .map_err(|e| CrmError::Serialization(e.to_string()))?;
        if envelope.version != FORMAT_VERSION {
            return Err(CrmError::Serialization(format!(
                "Unsupported format version: {}",
                envelope.version
            )));
        }

        let mut snapshot = envelope.data;
        if snapshot.seed_if_empty() {
            tracing::info!("Pipeline file had no stages, seeded defaults");
        }
        tracing::info!(
            bytes = bytes.len(),
            path = %self.path.display(),
            "Loaded pipeline"
        );
        Ok(snapshot)
    }

    async fn save(
        path: &Path,
        instance_id: Uuid,
        snapshot: &PipelineSnapshot,
    ) -> CrmResult<PersistenceMetadata> {
        let envelope = JsonEnvelope {
            version: FORMAT_VERSION,
            metadata: PersistenceMetadata::new(instance_id),
            data: snapshot.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&envelope)
            .map_err(|e| CrmError::Serialization(e.to_string()))?;
        AtomicWriter::write_atomic(path, &bytes).await?;

        tracing::info!(
            bytes = bytes.len(),
            path = %path.display(),
            "Saved pipeline"
        );
        Ok(envelope.metadata)
    }

    async fn read<T>(&self, f: impl FnOnce(&PipelineSnapshot) -> T) -> CrmResult<T> {
        let mut state = self.state.lock().await;
        if state.is_none() {
            *state = Some(self.load().await?);
        }
        match state.as_ref() {
            Some(snapshot) => Ok(f(snapshot)),
            None => Err(CrmError::Internal("pipeline not loaded".into())),
        }
    }

    async fn write<T>(
        &self,
        f: impl FnOnce(&mut PipelineSnapshot) -> CrmResult<T>,
    ) -> CrmResult<T> {
        let mut state = self.state.clone().lock_owned().await;
        let mut working = match state.as_ref() {
            Some(snapshot) => snapshot.clone(),
            None => self.load().await?,
        };
        let value = f(&mut working)?;

        // Save and swap together, holding the lock, on a task of their own.
        let path = self.path.clone();
        let instance_id = self.instance_id;
        let commit = tokio::spawn(async move {
            Self::save(&path, instance_id, &working).await?;
            *state = Some(working);
            Ok::<_, CrmError>(())
        });
        commit
            .await
            .map_err(|e| CrmError::Internal(format!("save task failed: {}", e)))??;
        Ok(value)
    }
}

#[async_trait]
impl PipelineStore for JsonFileStore {
    async fn list_stages(&self) -> CrmResult<Vec<Stage>> {
        self.read(PipelineSnapshot::stages_sorted).await
    }

    async fn list_deals(&self, category: Option<DealCategory>) -> CrmResult<Vec<Deal>> {
        self.read(|s| s.deals_in(category)).await
    }

    async fn get_deal(&self, id: DealId) -> CrmResult<Option<Deal>> {
        self.read(|s| s.deal(id).cloned()).await
    }

    async fn update_deal_stage(&self, id: DealId, stage_id: &str) -> CrmResult<Deal> {
        self.write(|s| s.update_deal_stage(id, stage_id)).await
    }

    async fn create_deal(&self, deal: NewDeal) -> CrmResult<Deal> {
        self.write(|s| s.create_deal(deal)).await
    }

    async fn update_deal(&self, id: DealId, update: DealUpdate) -> CrmResult<Deal> {
        self.write(|s| s.update_deal(id, update)).await
    }

    async fn create_stage(&self, stage: Stage) -> CrmResult<Stage> {
        self.write(|s| s.create_stage(stage)).await
    }

    async fn update_stage(&self, id: &str, update: StageUpdate) -> CrmResult<Stage> {
        self.write(|s| s.update_stage(id, update)).await
    }

    async fn reorder_stages(&self, orders: &[StageOrder]) -> CrmResult<()> {
        self.write(|s| s.reorder_stages(orders)).await
    }

    async fn delete_stage(&self, id: &str) -> CrmResult<()> {
        self.write(|s| s.delete_stage(id)).await
    }

    async fn list_contacts(&self) -> CrmResult<Vec<Contact>> {
        self.read(|s| s.contacts.clone()).await
    }

    async fn upsert_contact(&self, contact: NewContact) -> CrmResult<Contact> {
        self.write(|s| s.upsert_contact(contact)).await
    }

    async fn ingest_lead(&self, lead: InboundLead) -> CrmResult<IngestedLead> {
        self.write(|s| s.ingest_lead(lead)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_starts_seeded_without_writing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let store = JsonFileStore::new(&path);

        let stages = store.list_stages().await.unwrap();
        assert_eq!(stages.len(), 5);
        assert_eq!(stages[0].id, "NOVO");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.json");

        let deal_id = {
            let store = JsonFileStore::new(&path);
            let deal = store
                .create_deal(NewDeal::new("Seguro auto", "NOVO"))
                .await
                .unwrap();
            store.update_deal_stage(deal.id, "COTACAO").await.unwrap();
            deal.id
        };

        let reopened = JsonFileStore::new(&path);
        let deal = reopened.get_deal(deal_id).await.unwrap().unwrap();
        assert_eq!(deal.stage, "COTACAO");
        assert_eq!(deal.logs.len(), 1);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], 1);
        assert_eq!(raw["metadata"]["format_version"], 1);
        assert!(raw["data"]["stages"].is_array());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let store = JsonFileStore::new(&path);
        store
            .create_deal(NewDeal::new("Plano de saúde", "COTACAO"))
            .await
            .unwrap();
        let before = std::fs::read(&path).unwrap();

        let err = store.delete_stage("COTACAO").await.unwrap_err();
        assert!(matches!(err, CrmError::StageInUse { deal_count: 1, .. }));
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(store.list_stages().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_abandoned_write_still_lands_in_file_and_memory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let store = JsonFileStore::new(&path);
        let deal = store
            .create_deal(NewDeal::new("Vida em grupo", "NOVO"))
            .await
            .unwrap();

        let _ = tokio::time::timeout(
            std::time::Duration::ZERO,
            store.update_deal_stage(deal.id, "COTACAO"),
        )
        .await;

        let cached = store.get_deal(deal.id).await.unwrap().unwrap();
        let on_disk = JsonFileStore::new(&path)
            .get_deal(deal.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.stage, "COTACAO");
        assert_eq!(on_disk.stage, cached.stage);
    }

    #[tokio::test]
    async fn test_rejected_lead_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let store = JsonFileStore::new(&path);
        store
            .ingest_lead(InboundLead {
                name: "Maria Silva".into(),
                phone: Some("11999990000".into()),
                ..InboundLead::default()
            })
            .await
            .unwrap();
        let before = std::fs::read(&path).unwrap();

        let err = store
            .ingest_lead(InboundLead {
                name: "João".into(),
                email: Some("joao@mail.com".into()),
                ..InboundLead::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::Validation(_)));
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(store.list_contacts().await.unwrap().len(), 1);
        assert_eq!(store.list_deals(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_unknown_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(
            &path,
            r#"{"version": 7, "metadata": {"format_version": 7,
                "instance_id": "00000000-0000-0000-0000-000000000000",
                "saved_at": "2024-01-01T00:00:00Z"}, "data": {}}"#,
        )
        .unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(
            store.list_stages().await,
            Err(CrmError::Serialization(_))
        ));
    }
}
