//! Wire DTOs and REST operations for the board backend.
//!
//! The backend speaks camelCase JSON. DTOs convert into the in-memory model
//! at the edge: every wire id string becomes [`EntityId::Confirmed`], so
//! Temporary ids can never leak in from the network side.
//!
//! Update/delete operations take bare remote id strings (`&str`), not
//! [`EntityId`] — callers must have already passed the confirmable check,
//! which keeps "update by Temporary id" unrepresentable here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use plank_types::{
    ActivityLogEntry, Board, ChecklistItem, Column, Comment, DueRange, EntityId, Label, Member,
    Priority, Role, Task, Visibility,
};

use crate::{ApiClient, ApiError, expect_success};

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub members: Vec<MemberDto>,
    #[serde(default)]
    pub labels: Vec<LabelDto>,
    #[serde(default)]
    pub columns: Vec<ColumnDto>,
    #[serde(default)]
    pub activities: Vec<ActivityLogEntry>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl BoardDto {
    #[must_use]
    pub fn into_model(self) -> Board {
        Board {
            id: EntityId::Confirmed(self.id),
            name: self.name,
            visibility: self.visibility,
            members: self.members.into_iter().map(MemberDto::into_model).collect(),
            labels: self.labels.into_iter().map(LabelDto::into_model).collect(),
            columns: self.columns.into_iter().map(ColumnDto::into_model).collect(),
            activities: self.activities,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    /// Board-membership id - distinct from the account id below.
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
}

impl MemberDto {
    #[must_use]
    pub fn into_model(self) -> Member {
        Member {
            membership_id: EntityId::Confirmed(self.id),
            user_id: self.user_id,
            name: self.name,
            email: self.email,
            role: self.role,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

impl LabelDto {
    #[must_use]
    pub fn into_model(self) -> Label {
        Label {
            id: EntityId::Confirmed(self.id),
            name: self.name,
            color: self.color,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDto {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub tasks: Vec<TaskDto>,
}

impl ColumnDto {
    #[must_use]
    pub fn into_model(self) -> Column {
        Column {
            id: EntityId::Confirmed(self.id),
            title: self.title,
            color: self.color,
            tasks: self.tasks.into_iter().map(TaskDto::into_model).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub assignees: Vec<String>,
    pub due_start: Option<DateTime<Utc>>,
    pub due_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub checklist_count: u32,
    #[serde(default)]
    pub comments_count: u32,
    #[serde(default)]
    pub attachments_count: u32,
}

impl TaskDto {
    #[must_use]
    pub fn into_model(self) -> Task {
        Task {
            id: EntityId::Confirmed(self.id),
            title: self.title,
            tag: self.tag,
            priority: self.priority,
            status: self.status,
            assignees: self.assignees,
            due: DueRange {
                start: self.due_start,
                end: self.due_end,
            },
            checklist_count: self.checklist_count,
            comments_count: self.comments_count,
            attachments_count: self.attachments_count,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItemDto {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

impl ChecklistItemDto {
    #[must_use]
    pub fn into_model(self) -> ChecklistItem {
        ChecklistItem {
            id: EntityId::Confirmed(self.id),
            text: self.text,
            done: self.done,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub id: String,
    #[serde(default)]
    pub author_id: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl CommentDto {
    #[must_use]
    pub fn into_model(self) -> Comment {
        Comment {
            id: EntityId::Confirmed(self.id),
            author_id: self.author_id,
            text: self.text,
            created_at: self.created_at,
        }
    }
}

// ============================================================================
// Request payloads
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewColumn {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Denormalized owning-column title.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Account ids, already cross-mapped from membership ids by the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderPayload<'a> {
    task_ids: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub user: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLabel {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChecklistItem {
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub author_id: String,
    pub text: String,
}

// ============================================================================
// REST operations
// ============================================================================

impl ApiClient {
    pub async fn get_board(&self, board_id: &str) -> Result<Board, ApiError> {
        let response = self
            .http()
            .get(self.url(&format!("boards/{board_id}")))
            .send()
            .await?;
        let dto: BoardDto = expect_success(response).await?.json().await?;
        Ok(dto.into_model())
    }

    pub async fn create_column(
        &self,
        board_id: &str,
        column: &NewColumn,
    ) -> Result<Column, ApiError> {
        let response = self
            .http()
            .post(self.url(&format!("boards/{board_id}/columns")))
            .json(column)
            .send()
            .await?;
        let dto: ColumnDto = expect_success(response).await?.json().await?;
        Ok(dto.into_model())
    }

    pub async fn update_column(&self, column_id: &str, patch: &ColumnPatch) -> Result<(), ApiError> {
        let response = self
            .http()
            .patch(self.url(&format!("columns/{column_id}")))
            .json(patch)
            .send()
            .await?;
        expect_success(response).await.map(drop)
    }

    pub async fn delete_column(&self, column_id: &str) -> Result<(), ApiError> {
        let response = self
            .http()
            .delete(self.url(&format!("columns/{column_id}")))
            .send()
            .await?;
        expect_success(response).await.map(drop)
    }

    pub async fn create_task(&self, column_id: &str, task: &NewTask) -> Result<Task, ApiError> {
        let response = self
            .http()
            .post(self.url(&format!("columns/{column_id}/tasks")))
            .json(task)
            .send()
            .await?;
        let dto: TaskDto = expect_success(response).await?.json().await?;
        Ok(dto.into_model())
    }

    pub async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> Result<(), ApiError> {
        let response = self
            .http()
            .patch(self.url(&format!("tasks/{task_id}")))
            .json(patch)
            .send()
            .await?;
        expect_success(response).await.map(drop)
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<(), ApiError> {
        let response = self
            .http()
            .delete(self.url(&format!("tasks/{task_id}")))
            .send()
            .await?;
        expect_success(response).await.map(drop)
    }

    /// Persist a column's task order as the full ordered id list.
    pub async fn persist_order(
        &self,
        column_id: &str,
        task_ids: &[String],
    ) -> Result<(), ApiError> {
        let response = self
            .http()
            .put(self.url(&format!("columns/{column_id}/order")))
            .json(&OrderPayload { task_ids })
            .send()
            .await?;
        expect_success(response).await.map(drop)
    }

    pub async fn get_activities(
        &self,
        board_id: &str,
        task_id: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<ActivityLogEntry>, ApiError> {
        let mut url = self.url(&format!("boards/{board_id}/activities"));
        {
            let mut query = url.query_pairs_mut();
            if let Some(task_id) = task_id {
                query.append_pair("taskId", task_id);
            }
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
        }
        let response = self.http().get(url).send().await?;
        expect_success(response).await?.json().await.map_err(Into::into)
    }

    /// The single most recent activity entry, if any. One poller tick.
    pub async fn latest_activity(
        &self,
        board_id: &str,
    ) -> Result<Option<ActivityLogEntry>, ApiError> {
        let mut entries = self.get_activities(board_id, None, Some(1)).await?;
        Ok(if entries.is_empty() {
            None
        } else {
            Some(entries.swap_remove(0))
        })
    }

    pub async fn create_activity(
        &self,
        board_id: &str,
        activity: &NewActivity,
    ) -> Result<ActivityLogEntry, ApiError> {
        let response = self
            .http()
            .post(self.url(&format!("boards/{board_id}/activities")))
            .json(activity)
            .send()
            .await?;
        expect_success(response).await?.json().await.map_err(Into::into)
    }

    pub async fn create_label(&self, board_id: &str, label: &NewLabel) -> Result<Label, ApiError> {
        let response = self
            .http()
            .post(self.url(&format!("boards/{board_id}/labels")))
            .json(label)
            .send()
            .await?;
        let dto: LabelDto = expect_success(response).await?.json().await?;
        Ok(dto.into_model())
    }

    pub async fn update_label(&self, label_id: &str, patch: &LabelPatch) -> Result<(), ApiError> {
        let response = self
            .http()
            .patch(self.url(&format!("labels/{label_id}")))
            .json(patch)
            .send()
            .await?;
        expect_success(response).await.map(drop)
    }

    pub async fn delete_label(&self, label_id: &str) -> Result<(), ApiError> {
        let response = self
            .http()
            .delete(self.url(&format!("labels/{label_id}")))
            .send()
            .await?;
        expect_success(response).await.map(drop)
    }

    pub async fn create_checklist_item(
        &self,
        task_id: &str,
        item: &NewChecklistItem,
    ) -> Result<ChecklistItem, ApiError> {
        let response = self
            .http()
            .post(self.url(&format!("tasks/{task_id}/checklist")))
            .json(item)
            .send()
            .await?;
        let dto: ChecklistItemDto = expect_success(response).await?.json().await?;
        Ok(dto.into_model())
    }

    pub async fn update_checklist_item(
        &self,
        item_id: &str,
        patch: &ChecklistPatch,
    ) -> Result<(), ApiError> {
        let response = self
            .http()
            .patch(self.url(&format!("checklist/{item_id}")))
            .json(patch)
            .send()
            .await?;
        expect_success(response).await.map(drop)
    }

    pub async fn delete_checklist_item(&self, item_id: &str) -> Result<(), ApiError> {
        let response = self
            .http()
            .delete(self.url(&format!("checklist/{item_id}")))
            .send()
            .await?;
        expect_success(response).await.map(drop)
    }

    pub async fn create_comment(
        &self,
        task_id: &str,
        comment: &NewComment,
    ) -> Result<Comment, ApiError> {
        let response = self
            .http()
            .post(self.url(&format!("tasks/{task_id}/comments")))
            .json(comment)
            .send()
            .await?;
        let dto: CommentDto = expect_success(response).await?.json().await?;
        Ok(dto.into_model())
    }

    pub async fn update_comment(&self, comment_id: &str, text: &str) -> Result<(), ApiError> {
        let response = self
            .http()
            .patch(self.url(&format!("comments/{comment_id}")))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;
        expect_success(response).await.map(drop)
    }

    pub async fn delete_comment(&self, comment_id: &str) -> Result<(), ApiError> {
        let response = self
            .http()
            .delete(self.url(&format!("comments/{comment_id}")))
            .send()
            .await?;
        expect_success(response).await.map(drop)
    }
}
