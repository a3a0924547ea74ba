//! Application state wiring the stores, the connector and the chat session.
//!
//! `ChatSession` is generic over repository and connector traits; AppState
//! pins it to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use taskpilot_core::assistant::session::ChatSession;
use taskpilot_core::assistant::simulator::LocalSimulator;
use taskpilot_infra::config::api_key_from_env;
use taskpilot_infra::llm::HttpModelConnector;
use taskpilot_infra::sqlite::pool::{DatabasePool, database_url};
use taskpilot_infra::sqlite::settings::SqliteSettingsRepository;
use taskpilot_infra::sqlite::task::SqliteTaskRepository;
use taskpilot_types::config::GlobalConfig;

pub type ConcreteChatSession =
    ChatSession<SqliteTaskRepository, SqliteSettingsRepository, HttpModelConnector>;

/// Shared application state used by every CLI command.
#[derive(Clone)]
pub struct AppState {
    pub task_repo: Arc<SqliteTaskRepository>,
    pub settings_repo: Arc<SqliteSettingsRepository>,
    pub session: Arc<ConcreteChatSession>,
    pub connector: HttpModelConnector,
    pub config: GlobalConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Open the database and wire the session.
    pub async fn init(data_dir: PathBuf, config: GlobalConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;

        let task_repo = Arc::new(SqliteTaskRepository::new(db_pool.clone()));
        let settings_repo = Arc::new(
            SqliteSettingsRepository::new(db_pool).with_api_key_override(api_key_from_env()),
        );
        let connector = HttpModelConnector::new(config.request_timeout());

        let session = ChatSession::new(task_repo.clone(), settings_repo.clone(), connector.clone())
            .with_simulator(LocalSimulator::new(Duration::from_millis(
                config.simulator_delay_ms,
            )))
            .with_max_context_tasks(config.max_context_tasks);

        tracing::debug!(data_dir = %data_dir.display(), "Application state initialized");

        Ok(Self {
            task_repo,
            settings_repo,
            session: Arc::new(session),
            connector,
            config,
            data_dir,
        })
    }
}
