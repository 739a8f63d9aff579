// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Task priority as the backend spells it on the wire (`low`, `medium`, `high`).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        };
        f.write_str(label)
    }
}

/// A daily task owned by exactly one user (or by a group when `group_id` is set).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub completed: bool,

    pub created_at: DateTime<Utc>,

    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body of `POST /tasks`.
/// Kept apart from `Task` since the id, owner and timestamps are assigned
/// by the backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CreateTaskPayload {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

/// Body of `PUT /tasks/{id}`. Only the fields that are set are sent.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UpdateTaskPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl UpdateTaskPayload {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }
}

/// Response of `GET /tasks/today`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TodayTasks {
    #[serde(default)]
    pub tasks: Vec<Task>,
    pub date: NaiveDate,
}

/// One archived day of a user's task list. The backend writes one entry per
/// day; the client only reads them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    // Calendar day, the unique key of the entry.
    pub date: NaiveDate,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub completion_percentage: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default)]
    pub friends: Vec<String>,

    #[serde(default)]
    pub groups: Vec<String>,
}

/// Body of `POST /users/setup`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Friend {
    pub id: String,
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Friend {
    /// Name shown for the friend: display name, then username, then email.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or(&self.email)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FriendRequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, FriendRequestStatus::Pending)
    }
}

impl fmt::Display for FriendRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FriendRequestStatus::Pending => "pending",
            FriendRequestStatus::Accepted => "accepted",
            FriendRequestStatus::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// The answer given to a pending friend request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestAction {
    Accept,
    Reject,
}

impl FriendRequestAction {
    pub fn as_str(self) -> &'static str {
        match self {
            FriendRequestAction::Accept => "accept",
            FriendRequestAction::Reject => "reject",
        }
    }

    fn outcome(self) -> FriendRequestStatus {
        match self {
            FriendRequestAction::Accept => FriendRequestStatus::Accepted,
            FriendRequestAction::Reject => FriendRequestStatus::Rejected,
        }
    }
}

/// Returned when answering a friend request that is no longer pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: FriendRequestStatus,
    pub action: FriendRequestAction,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot {} a friend request that is already {}",
            self.action.as_str(),
            self.from
        )
    }
}

impl std::error::Error for InvalidTransition {}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FriendRequest {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_user: Option<Friend>,
}

impl FriendRequest {
    /// Moves a pending request to accepted or rejected.
    /// Terminal states never change again.
    pub fn respond(&mut self, action: FriendRequestAction) -> Result<(), InvalidTransition> {
        if self.status.is_terminal() {
            return Err(InvalidTransition {
                from: self.status,
                action,
            });
        }
        self.status = action.outcome();
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Group {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub created_by: String,
    pub created_at: DateTime<Utc>,

    // Unique join token, one group per code.
    pub invite_code: String,

    #[serde(default)]
    pub members: Vec<String>,
}

impl Group {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }
}

/// Body of `POST /groups`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CreateGroupPayload {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GroupMember {
    pub id: String,
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GroupTask {
    pub id: String,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,

    pub completed: bool,

    #[serde(default)]
    pub priority: Priority,

    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub group_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CreateGroupTaskPayload {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,

    #[serde(default)]
    pub priority: Priority,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UpdateGroupTaskPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GroupMessage {
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    pub user_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// A directed encouragement message between two users.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MotivationalNote {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub read: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl MotivationalNote {
    /// Flags the note as read. There is no way back to unread.
    pub fn mark_read(&mut self) {
        self.read = true;
    }
}

/// Body of `POST /motivational-notes`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SendNotePayload {
    pub to_user_id: String,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MemberProgress {
    pub user_id: String,
    pub user_name: String,
    pub completed_tasks: u32,
    pub total_tasks: u32,
}

/// Response of `GET /groups/{id}/progress`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GroupProgress {
    pub group_id: String,
    pub group_name: String,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub completion_percentage: f64,

    #[serde(default)]
    pub members_progress: Vec<MemberProgress>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressStats {
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub completion_percentage: f64,
}

/// One element of `GET /friends/progress`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FriendProgress {
    pub friend: Friend,

    #[serde(default)]
    pub tasks: Vec<Task>,

    pub stats: ProgressStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn pending_request() -> FriendRequest {
        FriendRequest {
            id: "req-1".to_string(),
            from_user_id: "alice".to_string(),
            to_user_id: "bob".to_string(),
            status: FriendRequestStatus::Pending,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            from_user: None,
        }
    }

    #[test]
    fn test_pending_request_can_be_accepted() {
        let mut request = pending_request();

        request.respond(FriendRequestAction::Accept).unwrap();

        assert_eq!(request.status, FriendRequestStatus::Accepted);
    }

    #[test]
    fn test_terminal_request_never_changes() {
        let mut request = pending_request();
        request.respond(FriendRequestAction::Reject).unwrap();

        let err = request.respond(FriendRequestAction::Accept).unwrap_err();

        assert_eq!(err.from, FriendRequestStatus::Rejected);
        assert_eq!(request.status, FriendRequestStatus::Rejected);
        assert_eq!(
            err.to_string(),
            "cannot accept a friend request that is already rejected"
        );
    }

    #[test]
    fn test_note_read_is_monotonic() {
        let mut note: MotivationalNote = serde_json::from_value(json!({
            "id": "n1",
            "from_user_id": "alice",
            "to_user_id": "bob",
            "message": "keep going",
            "created_at": "2025-03-01T09:00:00Z"
        }))
        .unwrap();
        assert!(!note.read);

        note.mark_read();
        note.mark_read();

        assert!(note.read);
    }

    #[test]
    fn test_task_accepts_backend_shape() {
        let task: Task = serde_json::from_value(json!({
            "id": "t1",
            "title": "Write report",
            "completed": false,
            "created_at": "2025-03-01T09:00:00Z",
            "user_id": "alice",
            "priority": "high"
        }))
        .unwrap();

        assert_eq!(task.priority, Some(Priority::High));
        assert_eq!(task.description, None);
        assert_eq!(task.group_id, None);
    }

    #[test]
    fn test_update_payload_omits_unset_fields() {
        let body = serde_json::to_value(UpdateTaskPayload::completed(true)).unwrap();

        assert_eq!(body, json!({ "completed": true }));
    }

    #[test]
    fn test_friend_label_fallbacks() {
        let mut friend = Friend {
            id: "f1".to_string(),
            email: "bob@example.com".to_string(),
            display_name: None,
            username: Some("bobby".to_string()),
        };
        assert_eq!(friend.label(), "bobby");

        friend.username = None;
        assert_eq!(friend.label(), "bob@example.com");

        friend.display_name = Some("Bob".to_string());
        assert_eq!(friend.label(), "Bob");
    }
}
