//! SQLite settings repository implementation.
//!
//! Each `AssistantSettings` field is one row whose value is JSON text, so
//! fields added later simply take their defaults on older databases.
//!
//! An API key supplied through the environment overrides the stored one for
//! the life of the process and is never written back.

use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::Row;

use taskpilot_core::repository::settings::SettingsRepository;
use taskpilot_types::error::RepositoryError;
use taskpilot_types::settings::AssistantSettings;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SettingsRepository`.
pub struct SqliteSettingsRepository {
    pool: DatabasePool,
    api_key_override: Option<String>,
}

impl SqliteSettingsRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            pool,
            api_key_override: None,
        }
    }

    /// Serve `key` in place of the stored API key. Blank keys are ignored.
    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        self.api_key_override = key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self
    }
}

impl SettingsRepository for SqliteSettingsRepository {
    async fn get(&self) -> Result<AssistantSettings, RepositoryError> {
        let rows = sqlx::query("SELECT key, value FROM settings")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut fields = Map::new();
        for row in &rows {
            let key: String = row
                .try_get("key")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let value: String = row
                .try_get("value")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let value: Value = serde_json::from_str(&value)
                .map_err(|e| RepositoryError::Query(format!("invalid JSON for '{key}': {e}")))?;
            fields.insert(key, value);
        }

        let mut settings: AssistantSettings = serde_json::from_value(Value::Object(fields))
            .map_err(|e| RepositoryError::Query(format!("invalid settings: {e}")))?;
        if let Some(key) = &self.api_key_override {
            settings.api_key = Some(key.clone());
        }
        Ok(settings)
    }

    async fn save(&self, settings: &AssistantSettings) -> Result<(), RepositoryError> {
        let Value::Object(mut fields) =
            serde_json::to_value(settings).map_err(|e| RepositoryError::Query(e.to_string()))?
        else {
            return Err(RepositoryError::Query(
                "settings did not serialize to an object".to_string(),
            ));
        };
        if self.api_key_override.is_some() && settings.api_key == self.api_key_override {
            fields.remove("api_key");
        }
        let now = Utc::now().to_rfc3339();

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        for (key, value) in &fields {
            sqlx::query(
                r#"INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
                   ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
            )
            .bind(key)
            .bind(value.to_string())
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tracing::debug!(fields = fields.len(), "Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::test_pool;
    use taskpilot_types::settings::FunctionCallingMode;

    #[tokio::test]
    async fn test_empty_store_returns_defaults() {
        let repo = SqliteSettingsRepository::new(test_pool().await);
        assert_eq!(repo.get().await.unwrap(), AssistantSettings::default());
    }

    #[tokio::test]
    async fn test_save_then_get() {
        let repo = SqliteSettingsRepository::new(test_pool().await);
        let settings = AssistantSettings {
            api_key: Some("sk-abcdefgh12345678".to_string()),
            model: "deepseek-chat".to_string(),
            function_calling_mode: FunctionCallingMode::Functions,
            enable_text_fallback: false,
            provider: Some("deepseek".to_string()),
            ..Default::default()
        };
        repo.save(&settings).await.unwrap();
        assert_eq!(repo.get().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn test_save_overwrites_and_clears_key() {
        let repo = SqliteSettingsRepository::new(test_pool().await);
        let mut settings = AssistantSettings {
            api_key: Some("sk-first-key-000000".to_string()),
            ..Default::default()
        };
        repo.save(&settings).await.unwrap();

        settings.api_key = None;
        repo.save(&settings).await.unwrap();
        assert!(repo.get().await.unwrap().api_key.is_none());
    }

    #[tokio::test]
    async fn test_api_key_override_is_served_not_stored() {
        let pool = test_pool().await;
        let plain = SqliteSettingsRepository::new(pool.clone());
        plain
            .save(&AssistantSettings {
                api_key: Some("sk-stored-key-000000".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let repo = SqliteSettingsRepository::new(pool)
            .with_api_key_override(Some("sk-env-key-11111111".to_string()));
        let mut settings = repo.get().await.unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("sk-env-key-11111111"));

        settings.model = "deepseek-chat".to_string();
        repo.save(&settings).await.unwrap();

        let stored = plain.get().await.unwrap();
        assert_eq!(stored.api_key.as_deref(), Some("sk-stored-key-000000"));
        assert_eq!(stored.model, "deepseek-chat");
    }

    #[tokio::test]
    async fn test_blank_override_is_ignored() {
        let repo = SqliteSettingsRepository::new(test_pool().await)
            .with_api_key_override(Some("   ".to_string()));
        assert!(repo.get().await.unwrap().api_key.is_none());
    }

    #[tokio::test]
    async fn test_missing_rows_take_defaults() {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO settings (key, value, updated_at) VALUES ('model', '\"glm-4-flash\"', '2025-01-01T00:00:00Z')")
            .execute(&pool.writer)
            .await
            .unwrap();

        let repo = SqliteSettingsRepository::new(pool);
        let settings = repo.get().await.unwrap();
        assert_eq!(settings.model, "glm-4-flash");
        assert!(settings.enable_text_fallback);
    }
}
