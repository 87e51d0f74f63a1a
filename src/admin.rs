//! Admin endpoints: engines, global tasks, users and system stats.

use anyhow::{Context, Result};
use reqwest::Method;
use serde::Deserialize;
use std::collections::HashMap;

use crate::client::ApiClient;
use crate::models::{
    BatchStatusResult, BatchStatusUpdate, Channel, ChannelForm, EngineTestResult, EngineType,
    Paginated, SystemStats, TaskListParams, TranscriptionTask, User, UserListParams, UserUpdate,
};

const ENGINES_PATH: &str = "/transcription/engines";

lazy_static::lazy_static! {
    /// Engine type names the backend ships with.
    pub static ref BUILTIN_ENGINE_TYPES: Vec<EngineType> = [
        (1, "OpenAI Whisper"),
        (2, "Alibaba Cloud Speech"),
        (3, "Tencent Cloud ASR"),
        (4, "Baidu Speech"),
        (5, "iFlytek Speech"),
        (6, "Azure Speech Services"),
        (7, "AWS Transcribe"),
        (8, "Google Speech-to-Text"),
        (9, "Self-hosted engine"),
    ]
    .iter()
    .map(|(id, name)| EngineType {
        id: *id,
        name: name.to_string(),
        description: None,
    })
    .collect();
}

/// Name for an engine type id, looked up in `types` then in the built-in table.
pub fn engine_type_name(types: &[EngineType], id: i32) -> String {
    types
        .iter()
        .chain(BUILTIN_ENGINE_TYPES.iter())
        .find(|t| t.id == id)
        .map(|t| t.name.clone())
        .unwrap_or_else(|| format!("Type {}", id))
}

/// Engine types arrive either as a list or as an `id -> name` map.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EngineTypeList {
    List(Vec<EngineType>),
    Map(HashMap<String, String>),
}

impl From<EngineTypeList> for Vec<EngineType> {
    fn from(value: EngineTypeList) -> Self {
        match value {
            EngineTypeList::List(list) => list,
            EngineTypeList::Map(map) => {
                let mut types: Vec<_> = map
                    .into_iter()
                    .filter_map(|(id, name)| {
                        id.parse().ok().map(|id| EngineType {
                            id,
                            name,
                            description: None,
                        })
                    })
                    .collect();
                types.sort_by_key(|t| t.id);
                types
            }
        }
    }
}

/// The dashboard's two independent fetches. Either may fail on its own.
pub struct Overview {
    pub stats: Result<SystemStats>,
    pub recent_tasks: Result<Paginated<TranscriptionTask>>,
}

impl ApiClient {
    pub async fn list_engines(&self) -> Result<Vec<Channel>> {
        let request = self.request(Method::GET, ENGINES_PATH);
        let engines = self
            .call_or_default(request)
            .await
            .context("Failed to list engines")?;
        Ok(engines)
    }

    pub async fn engine_types(&self) -> Result<Vec<EngineType>> {
        let request = self.request(Method::GET, &format!("{}/types", ENGINES_PATH));
        let types: EngineTypeList = self
            .call(request)
            .await
            .context("Failed to get engine types")?;
        Ok(types.into())
    }

    pub async fn create_engine(&self, engine: &ChannelForm) -> Result<Channel> {
        let request = self.request(Method::POST, ENGINES_PATH).json(engine);
        let created = self
            .call(request)
            .await
            .context("Failed to create engine")?;
        Ok(created)
    }

    pub async fn update_engine(&self, id: i64, engine: &ChannelForm) -> Result<Channel> {
        let request = self
            .request(Method::PUT, &format!("{}/{}", ENGINES_PATH, id))
            .json(engine);
        let updated = self
            .call(request)
            .await
            .with_context(|| format!("Failed to update engine {}", id))?;
        Ok(updated)
    }

    pub async fn delete_engine(&self, id: i64) -> Result<()> {
        let request = self.request(Method::DELETE, &format!("{}/{}", ENGINES_PATH, id));
        self.call_unit(request)
            .await
            .with_context(|| format!("Failed to delete engine {}", id))?;
        Ok(())
    }

    /// Runs the server-side connectivity test. The server may auto-disable the engine.
    pub async fn test_engine(&self, id: i64) -> Result<EngineTestResult> {
        let request = self.request(Method::POST, &format!("{}/{}/test", ENGINES_PATH, id));
        let envelope = self
            .envelope::<EngineTestResult>(request)
            .await
            .with_context(|| format!("Failed to test engine {}", id))?;

        match envelope.data {
            Some(result) => Ok(result),
            None if envelope.success => Ok(EngineTestResult {
                status: "success".to_string(),
                error: None,
                test_time: 0,
                auto_disabled: None,
            }),
            None => Err(crate::error::ApiError::rejected(envelope.message, envelope.code))
                .with_context(|| format!("Engine {} test failed", id)),
        }
    }

    pub async fn set_engines_status(&self, channel_ids: Vec<i64>, status: i32) -> Result<i64> {
        let body = BatchStatusUpdate { channel_ids, status };
        let request = self
            .request(Method::PUT, &format!("{}/batch/status", ENGINES_PATH))
            .json(&body);
        let result: BatchStatusResult = self
            .call(request)
            .await
            .context("Failed to update engine status")?;
        Ok(result.updated_count)
    }

    pub async fn system_stats(&self) -> Result<SystemStats> {
        let request = self.request(Method::GET, "/transcription/stats");
        let stats = self
            .call(request)
            .await
            .context("Failed to get system stats")?;
        Ok(stats)
    }

    pub async fn list_all_tasks(&self, params: &TaskListParams) -> Result<Paginated<TranscriptionTask>> {
        let request = self.request(Method::GET, "/transcription/tasks").query(params);
        let page = self
            .call(request)
            .await
            .context("Failed to list all tasks")?;
        Ok(page)
    }

    /// Users come back under the `tasks` key like every other page.
    pub async fn list_users(&self, params: &UserListParams) -> Result<Paginated<User>> {
        let request = self.request(Method::GET, "/users").query(params);
        let page = self.call(request).await.context("Failed to list users")?;
        Ok(page)
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        let request = self.request(Method::GET, &format!("/users/{}", id));
        let user = self
            .call(request)
            .await
            .with_context(|| format!("Failed to get user {}", id))?;
        Ok(user)
    }

    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<User> {
        let request = self
            .request(Method::PUT, &format!("/users/{}", id))
            .json(update);
        let user = self
            .call(request)
            .await
            .with_context(|| format!("Failed to update user {}", id))?;
        Ok(user)
    }

    pub async fn delete_user(&self, id: i64) -> Result<()> {
        let request = self.request(Method::DELETE, &format!("/users/{}", id));
        self.call_unit(request)
            .await
            .with_context(|| format!("Failed to delete user {}", id))?;
        Ok(())
    }

    /// Fetches stats and the latest tasks in parallel.
    pub async fn overview(&self, recent: u32) -> Overview {
        let params = TaskListParams {
            page: Some(1),
            page_size: Some(recent),
            ..Default::default()
        };
        let (stats, recent_tasks) = tokio::join!(self.system_stats(), self.list_all_tasks(&params));
        Overview {
            stats,
            recent_tasks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_type_name_prefers_server_types() {
        let types = vec![EngineType {
            id: 1,
            name: "Whisper (self-hosted)".to_string(),
            description: None,
        }];
        assert_eq!(engine_type_name(&types, 1), "Whisper (self-hosted)");
        assert_eq!(engine_type_name(&types, 7), "AWS Transcribe");
        assert_eq!(engine_type_name(&[], 42), "Type 42");
    }

    #[test]
    fn test_engine_type_map_decodes() {
        let list: EngineTypeList =
            serde_json::from_str(r#"{"2": "Alibaba", "1": "Whisper", "x": "bad"}"#).unwrap();
        let types: Vec<EngineType> = list.into();
        assert_eq!(types.len(), 2);
        assert_eq!(types[0].id, 1);
        assert_eq!(types[1].name, "Alibaba");
    }
}
