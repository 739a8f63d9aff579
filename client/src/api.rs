// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use common::{
    CreateGroupPayload, CreateGroupTaskPayload, CreateTaskPayload, Friend, FriendProgress,
    FriendRequest, FriendRequestAction, Group, GroupMember, GroupMessage, GroupProgress,
    GroupTask, HistoryEntry, MotivationalNote, ProfileUpdate, SendNotePayload, Task, TodayTasks,
    UpdateGroupTaskPayload, UpdateTaskPayload, UserProfile,
};
use reqwest::{Method, RequestBuilder, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

use crate::auth::TokenProvider;
use crate::config::ClientConfig;
use crate::error::ApiError;

/// Number of group messages fetched when the caller does not say.
pub const DEFAULT_MESSAGE_LIMIT: u32 = 50;

/// Typed access to the Daily Check-In REST backend.
///
/// Every call asks `P` for a fresh bearer token; nothing is cached between
/// calls, so the caller always sees the backend's current state.
pub struct ApiClient<P> {
    http: reqwest::Client,
    base: Url,
    tokens: P,
}

// --- Response envelopes ---

#[derive(Deserialize)]
struct UserEnvelope {
    user: Option<UserProfile>,
}

#[derive(Deserialize)]
struct UsersEnvelope {
    #[serde(default)]
    users: Vec<Friend>,
}

#[derive(Deserialize)]
struct FriendsEnvelope {
    #[serde(default)]
    friends: Vec<Friend>,
}

#[derive(Deserialize)]
struct RequestsEnvelope {
    #[serde(default)]
    requests: Vec<FriendRequest>,
}

#[derive(Deserialize)]
struct FriendsProgressEnvelope {
    #[serde(default)]
    friends_progress: Vec<FriendProgress>,
}

#[derive(Deserialize)]
struct GroupsEnvelope {
    #[serde(default)]
    groups: Vec<Group>,
}

#[derive(Deserialize)]
struct NotesEnvelope {
    #[serde(default)]
    notes: Vec<MotivationalNote>,
}

#[derive(Deserialize, Default)]
struct MessageReply {
    #[serde(default)]
    message: String,
}

// The history endpoints have answered both with a bare list and with
// `{"history": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryPayload {
    Bare(Vec<HistoryEntry>),
    Wrapped {
        #[serde(default)]
        history: Vec<HistoryEntry>,
    },
}

/// Answer to an update. Some endpoints echo the stored entity, others only
/// acknowledge with a message; either way the change was committed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Saved<T> {
    Entity(T),
    Acknowledged {
        #[serde(default)]
        message: String,
    },
}

impl<T> Saved<T> {
    pub fn entity(self) -> Option<T> {
        match self {
            Saved::Entity(entity) => Some(entity),
            Saved::Acknowledged { .. } => None,
        }
    }
}

impl<T> From<Option<Saved<T>>> for Saved<T> {
    // An empty body is an acknowledgement too.
    fn from(reply: Option<Saved<T>>) -> Self {
        reply.unwrap_or(Saved::Acknowledged {
            message: String::new(),
        })
    }
}

impl HistoryPayload {
    fn into_entries(self) -> Vec<HistoryEntry> {
        match self {
            HistoryPayload::Bare(entries) | HistoryPayload::Wrapped { history: entries } => entries,
        }
    }
}

#[derive(Serialize)]
struct FriendRequestBody<'a> {
    user_email: &'a str,
}

#[derive(Serialize)]
struct JoinGroupBody<'a> {
    invite_code: &'a str,
}

#[derive(Serialize)]
struct GroupMessageBody<'a> {
    message: &'a str,
}

impl<P: TokenProvider> ApiClient<P> {
    pub fn new(config: &ClientConfig, tokens: P) -> Result<Self, ApiError> {
        let base = Url::parse(&config.api_url)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {e}", config.api_url)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(config.api_url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { http, base, tokens })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    // Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn request(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<RequestBuilder, ApiError> {
        let token = self.tokens.bearer_token().await?;
        let url = self.endpoint(segments);
        debug!("{} {}", method, url);
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn execute<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R, ApiError> {
        let response = request.send().await.map_err(|e| {
            warn!("Request failed before a response arrived: {}", e);
            ApiError::Network(e)
        })?;

        let status = response.status();
        let url = response.url().clone();
        let body = response.text().await?;

        if !status.is_success() {
            let err = ApiError::from_status(status, &body);
            warn!("{} answered {}: {}", url, status.as_u16(), err);
            return Err(err);
        }

        // Some mutations answer with an empty body.
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        Ok(serde_json::from_str(body)?)
    }

    async fn get<R: DeserializeOwned>(&self, segments: &[&str]) -> Result<R, ApiError> {
        let request = self.request(Method::GET, segments).await?;
        self.execute(request).await
    }

    async fn send_json<B, R>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.request(method, segments).await?.json(body);
        self.execute(request).await
    }

    async fn send_message(&self, method: Method, segments: &[&str]) -> Result<String, ApiError> {
        let request = self.request(method, segments).await?;
        let reply: Option<MessageReply> = self.execute(request).await?;
        Ok(reply.unwrap_or_default().message)
    }

    // --- Profile ---

    /// The signed-in user's profile, `None` when it was never set up.
    pub async fn get_profile(&self) -> Result<Option<UserProfile>, ApiError> {
        let envelope: UserEnvelope = self.get(&["user", "profile"]).await?;
        Ok(envelope.user)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let envelope: UserEnvelope = self
            .send_json(Method::POST, &["users", "setup"], update)
            .await?;
        envelope
            .user
            .ok_or_else(|| ApiError::NotFound("profile missing from the answer".to_string()))
    }

    pub async fn search_users(&self, query: &str) -> Result<Vec<Friend>, ApiError> {
        let request = self
            .request(Method::GET, &["users", "search"])
            .await?
            .query(&[("query", query)]);
        let envelope: UsersEnvelope = self.execute(request).await?;
        Ok(envelope.users)
    }

    // --- Friends ---

    pub async fn send_friend_request(&self, user_email: &str) -> Result<FriendRequest, ApiError> {
        let request = self
            .send_json(Method::POST, &["friends", "request"], &FriendRequestBody { user_email })
            .await?;
        info!("Friend request sent to {}.", user_email);
        Ok(request)
    }

    pub async fn friend_requests(&self) -> Result<Vec<FriendRequest>, ApiError> {
        let envelope: RequestsEnvelope = self.get(&["friends", "requests"]).await?;
        Ok(envelope.requests)
    }

    pub async fn respond_to_friend_request(
        &self,
        request_id: &str,
        action: FriendRequestAction,
    ) -> Result<String, ApiError> {
        let request = self
            .request(Method::PUT, &["friends", "requests", request_id])
            .await?
            .query(&[("action", action.as_str())]);
        let reply: Option<MessageReply> = self.execute(request).await?;
        info!("Friend request {} answered: {}.", request_id, action.as_str());
        Ok(reply.unwrap_or_default().message)
    }

    pub async fn friends(&self) -> Result<Vec<Friend>, ApiError> {
        let envelope: FriendsEnvelope = self.get(&["friends"]).await?;
        info!("Successfully retrieved {} friends.", envelope.friends.len());
        Ok(envelope.friends)
    }

    pub async fn remove_friend(&self, friend_id: &str) -> Result<String, ApiError> {
        self.send_message(Method::DELETE, &["friends", friend_id]).await
    }

    pub async fn friends_progress(&self) -> Result<Vec<FriendProgress>, ApiError> {
        let envelope: FriendsProgressEnvelope = self.get(&["friends", "progress"]).await?;
        Ok(envelope.friends_progress)
    }

    // --- Tasks ---

    pub async fn create_task(&self, payload: &CreateTaskPayload) -> Result<Task, ApiError> {
        let task: Task = self.send_json(Method::POST, &["tasks"], payload).await?;
        info!("Task created successfully with ID: {}", task.id);
        Ok(task)
    }

    pub async fn today_tasks(&self) -> Result<TodayTasks, ApiError> {
        let today: TodayTasks = self.get(&["tasks", "today"]).await?;
        info!("Successfully retrieved {} tasks for {}.", today.tasks.len(), today.date);
        Ok(today)
    }

    pub async fn update_task(
        &self,
        task_id: &str,
        update: &UpdateTaskPayload,
    ) -> Result<Saved<Task>, ApiError> {
        let reply: Option<Saved<Task>> =
            self.send_json(Method::PUT, &["tasks", task_id], update).await?;
        info!("Task with ID {} updated successfully.", task_id);
        Ok(reply.into())
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<String, ApiError> {
        let message = self.send_message(Method::DELETE, &["tasks", task_id]).await?;
        info!("Task with ID {} deleted successfully.", task_id);
        Ok(message)
    }

    pub async fn friend_tasks(&self, friend_id: &str) -> Result<Vec<Task>, ApiError> {
        self.get(&["tasks", "friend", friend_id]).await
    }

    // --- Groups ---

    pub async fn create_group(&self, payload: &CreateGroupPayload) -> Result<Group, ApiError> {
        let group: Group = self.send_json(Method::POST, &["groups"], payload).await?;
        info!("Group {} created with invite code {}.", group.id, group.invite_code);
        Ok(group)
    }

    pub async fn join_group(&self, invite_code: &str) -> Result<Group, ApiError> {
        self.send_json(Method::POST, &["groups", "join"], &JoinGroupBody { invite_code })
            .await
    }

    pub async fn groups(&self) -> Result<Vec<Group>, ApiError> {
        let envelope: GroupsEnvelope = self.get(&["groups"]).await?;
        Ok(envelope.groups)
    }

    pub async fn group(&self, group_id: &str) -> Result<Group, ApiError> {
        self.get(&["groups", group_id]).await
    }

    pub async fn group_members(&self, group_id: &str) -> Result<Vec<GroupMember>, ApiError> {
        self.get(&["groups", group_id, "members"]).await
    }

    pub async fn leave_group(&self, group_id: &str) -> Result<String, ApiError> {
        self.send_message(Method::POST, &["groups", group_id, "leave"]).await
    }

    pub async fn group_progress(&self, group_id: &str) -> Result<GroupProgress, ApiError> {
        self.get(&["groups", group_id, "progress"]).await
    }

    // --- Group tasks ---

    pub async fn create_group_task(
        &self,
        group_id: &str,
        payload: &CreateGroupTaskPayload,
    ) -> Result<GroupTask, ApiError> {
        self.send_json(Method::POST, &["groups", group_id, "tasks"], payload)
            .await
    }

    pub async fn group_tasks(&self, group_id: &str) -> Result<Vec<GroupTask>, ApiError> {
        self.get(&["groups", group_id, "tasks"]).await
    }

    pub async fn update_group_task(
        &self,
        group_id: &str,
        task_id: &str,
        update: &UpdateGroupTaskPayload,
    ) -> Result<Saved<GroupTask>, ApiError> {
        let reply: Option<Saved<GroupTask>> = self
            .send_json(Method::PUT, &["groups", group_id, "tasks", task_id], update)
            .await?;
        Ok(reply.into())
    }

    pub async fn delete_group_task(
        &self,
        group_id: &str,
        task_id: &str,
    ) -> Result<String, ApiError> {
        self.send_message(Method::DELETE, &["groups", group_id, "tasks", task_id])
            .await
    }

    // --- Group messages ---

    pub async fn send_group_message(
        &self,
        group_id: &str,
        message: &str,
    ) -> Result<GroupMessage, ApiError> {
        self.send_json(
            Method::POST,
            &["groups", group_id, "messages"],
            &GroupMessageBody { message },
        )
        .await
    }

    pub async fn group_messages(
        &self,
        group_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<GroupMessage>, ApiError> {
        let limit = limit.unwrap_or(DEFAULT_MESSAGE_LIMIT).to_string();
        let request = self
            .request(Method::GET, &["groups", group_id, "messages"])
            .await?
            .query(&[("limit", limit.as_str())]);
        self.execute(request).await
    }

    // --- Motivational notes ---

    pub async fn send_note(&self, payload: &SendNotePayload) -> Result<MotivationalNote, ApiError> {
        let note: MotivationalNote = self
            .send_json(Method::POST, &["motivational-notes"], payload)
            .await?;
        info!("Motivational note sent to {}.", note.to_user_id);
        Ok(note)
    }

    pub async fn notes(&self) -> Result<Vec<MotivationalNote>, ApiError> {
        let envelope: NotesEnvelope = self.get(&["motivational-notes"]).await?;
        Ok(envelope.notes)
    }

    pub async fn mark_note_read(&self, note_id: &str) -> Result<String, ApiError> {
        self.send_message(Method::PUT, &["motivational-notes", note_id, "read"])
            .await
    }

    // --- History ---

    pub async fn history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        let payload: HistoryPayload = self.get(&["history"]).await?;
        Ok(payload.into_entries())
    }

    pub async fn friend_history(&self, friend_id: &str) -> Result<Vec<HistoryEntry>, ApiError> {
        let payload: HistoryPayload = self.get(&["history", "friend", friend_id]).await?;
        Ok(payload.into_entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;

    fn client(api_url: &str) -> ApiClient<StaticToken> {
        let config = ClientConfig::default().with_api_url(api_url);
        ApiClient::new(&config, StaticToken::new("token")).unwrap()
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let client = client("http://localhost:8000/api");

        let url = client.endpoint(&["groups", "g1", "tasks"]);

        assert_eq!(url.as_str(), "http://localhost:8000/api/groups/g1/tasks");
    }

    #[test]
    fn test_endpoint_encodes_ids() {
        let client = client("http://localhost:8000/api/");

        let url = client.endpoint(&["tasks", "a/b c"]);

        assert_eq!(url.as_str(), "http://localhost:8000/api/tasks/a%2Fb%20c");
    }

    #[test]
    fn test_invalid_base_url_is_refused() {
        let config = ClientConfig::default().with_api_url("not a url");

        let result = ApiClient::new(&config, StaticToken::new("token"));

        assert!(matches!(result, Err(ApiError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_history_payload_shapes() {
        let bare: HistoryPayload = serde_json::from_str(
            r#"[{"date":"2025-03-01","total_tasks":2,"completed_tasks":1,
                "completion_percentage":50.0}]"#,
        )
        .unwrap();
        let wrapped: HistoryPayload = serde_json::from_str(r#"{"history": []}"#).unwrap();

        assert_eq!(bare.into_entries().len(), 1);
        assert!(wrapped.into_entries().is_empty());
    }

    #[test]
    fn test_update_reply_may_be_a_message() {
        let reply: Option<Saved<Task>> =
            serde_json::from_str(r#"{"message": "Task updated successfully"}"#).unwrap();
        let empty: Option<Saved<Task>> = serde_json::from_str("null").unwrap();

        assert_eq!(
            Saved::from(reply),
            Saved::Acknowledged {
                message: "Task updated successfully".to_string()
            }
        );
        assert!(Saved::from(empty).entity().is_none());
    }

    #[test]
    fn test_update_reply_may_be_the_entity() {
        let reply: Option<Saved<Task>> = serde_json::from_str(
            r#"{"id": "t1", "title": "Stretch", "completed": true,
                "created_at": "2025-03-01T09:00:00Z", "user_id": "alice"}"#,
        )
        .unwrap();

        let task = Saved::from(reply).entity().unwrap();

        assert_eq!(task.id, "t1");
        assert!(task.completed);
    }
}
