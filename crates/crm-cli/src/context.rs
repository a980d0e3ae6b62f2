use crm_core::{AppConfig, CrmResult};
use crm_domain::{BoardStore, DragController, ReconciliationClient, StageColor, StageManager};
use crm_persistence::JsonFileStore;
use std::path::Path;
use std::sync::Arc;

pub struct CliContext {
    pub store: Arc<JsonFileStore>,
    pub config: AppConfig,
}

impl CliContext {
    pub fn new(file_path: &Path, config: AppConfig) -> Self {
        Self {
            store: Arc::new(JsonFileStore::new(file_path)),
            config,
        }
    }

    /// Fresh board built from the file.
    pub async fn load_board(&self) -> CrmResult<BoardStore> {
        let mut board = BoardStore::new();
        board.load_all(self.store.as_ref()).await?;
        Ok(board)
    }

    pub fn stage_manager(&self) -> StageManager<JsonFileStore> {
        StageManager::new(self.store.clone())
    }

    pub fn drag_controller(&self) -> DragController {
        DragController::from_config(&self.config)
    }

    pub fn reconciliation_client(&self) -> ReconciliationClient<JsonFileStore> {
        ReconciliationClient::from_config(self.store.clone(), &self.config)
    }

    /// Configured color for new stages, `slate` when unset or unrecognised.
    pub fn default_stage_color(&self) -> StageColor {
        self.config
            .effective_default_stage_color()
            .parse()
            .unwrap_or(StageColor::Slate)
    }
}
