use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub description: String,
}

/// Query string for the task list: optional completed filter plus paging.
#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub completed: Option<bool>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 {
    20
}

/// Partial task update; unrecognized keys land in `extra` and reject the
/// whole patch.
#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub description: Option<String>,
    pub completed: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UpdateTaskRequest {
    pub fn check_shape(&self) -> Result<(), ApiError> {
        if !self.extra.is_empty() {
            return Err(ApiError::InvalidUpdate);
        }
        if self.description.is_none() && self.completed.is_none() {
            return Err(ApiError::InvalidUpdate);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_defaults() {
        let q: ListTasksQuery = serde_json::from_value(serde_json::json!({})).expect("query");
        assert_eq!(q.completed, None);
        assert_eq!(q.limit, 20);
        assert_eq!(q.offset, 0);

        let q: ListTasksQuery =
            serde_json::from_value(serde_json::json!({"completed": true, "limit": 5, "offset": 10}))
                .expect("query");
        assert_eq!(q.completed, Some(true));
        assert_eq!(q.limit, 5);
        assert_eq!(q.offset, 10);
    }

    #[test]
    fn patch_shape_is_all_or_nothing() {
        let ok: UpdateTaskRequest =
            serde_json::from_value(serde_json::json!({"completed": true})).expect("patch");
        assert!(ok.check_shape().is_ok());

        let empty: UpdateTaskRequest =
            serde_json::from_value(serde_json::json!({})).expect("patch");
        assert!(matches!(empty.check_shape(), Err(ApiError::InvalidUpdate)));

        let unknown: UpdateTaskRequest =
            serde_json::from_value(serde_json::json!({"completed": true, "owner_id": "x"}))
                .expect("patch");
        assert!(matches!(unknown.check_shape(), Err(ApiError::InvalidUpdate)));
    }
}
