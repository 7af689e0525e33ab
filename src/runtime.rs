//! Component wiring: one sled database, the provider gateway, and the three
//! automation components built from a single [`AutomationConfig`] value.

use crate::comments::{CommentQueue, CommentSettings, PlanStore, SledPlanStore};
use crate::config::AutomationConfig;
use crate::content::{ContentPipeline, PipelineSettings};
use crate::error::{AutomationError, StorageError};
use crate::media::build_engine;
use crate::notify::{notifier_from_config, Notifier};
use crate::provider::ProviderGateway;
use crate::scheduler::{AutomationScheduler, SchedulerSettings};
use crate::status::{SledStatusStore, StatusStore};
use crate::store::SledContentStore;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct Automation {
    pub config: AutomationConfig,
    pub gateway: Arc<ProviderGateway>,
    pub content: Arc<SledContentStore>,
    pub plans: Arc<dyn PlanStore>,
    pub status: Arc<dyn StatusStore>,
    pub queue: Arc<CommentQueue>,
    pub pipeline: Arc<ContentPipeline>,
    pub scheduler: Arc<AutomationScheduler>,
}

impl Automation {
    /// Open the store under the workspace and build providers from configuration.
    pub fn open(config: AutomationConfig, workspace_root: &Path) -> Result<Self, AutomationError> {
        let store_path = config.system.resolve_store_path(workspace_root);
        std::fs::create_dir_all(&store_path).map_err(StorageError::IoError)?;
        let content = SledContentStore::open(&store_path)?;
        let gateway = ProviderGateway::from_config(&config.providers)?;
        let notifier = notifier_from_config(&config.notifications)?;
        info!(store = %store_path.display(), mode = ?gateway.mode(), "Automation opened");
        Self::assemble(config, content, gateway, notifier)
    }

    /// Wire components around an already opened store and gateway.
    pub fn assemble(
        config: AutomationConfig,
        content: SledContentStore,
        gateway: ProviderGateway,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AutomationError> {
        let content = Arc::new(
            content.with_site(config.content.categories.clone(), config.content.site_url.clone()),
        );
        let gateway = Arc::new(gateway);
        let plans: Arc<dyn PlanStore> = Arc::new(SledPlanStore::new(content.db())?);
        let status: Arc<dyn StatusStore> = Arc::new(SledStatusStore::new(content.db())?);

        let queue = Arc::new(CommentQueue::new(
            CommentSettings::from_config(&config.comments, &config.content),
            Arc::clone(&gateway),
            Arc::clone(&plans),
            content.clone(),
            Arc::clone(&status),
        ));
        let images = build_engine(&config.images, Arc::clone(&gateway))?;
        let pipeline = Arc::new(ContentPipeline::new(
            PipelineSettings::from_config(&config),
            Arc::clone(&gateway),
            content.clone(),
            content.clone(),
            content.clone(),
            images,
            Arc::clone(&queue),
            Arc::clone(&status),
            notifier,
        ));
        let scheduler = Arc::new(AutomationScheduler::new(
            SchedulerSettings::from_config(&config),
            Arc::clone(&pipeline),
            Arc::clone(&queue),
            Arc::clone(&status),
        ));

        Ok(Self {
            config,
            gateway,
            content,
            plans,
            status,
            queue,
            pipeline,
            scheduler,
        })
    }
}
