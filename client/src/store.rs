// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.

//! Client-side state and the actions that change it.
//!
//! `reduce` is a pure function over `AppState`; `Session` is the only place
//! that talks to the backend and feeds the results back as actions. Task
//! changes are applied optimistically and rolled back when the backend
//! refuses them. Other changes are applied once the backend confirmed them.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use common::{
    CreateGroupPayload, CreateTaskPayload, Friend, FriendProgress, FriendRequest,
    FriendRequestAction, Group, HistoryEntry, HistoryStats, InvalidTransition, MotivationalNote,
    Priority, Progress, SendNotePayload, Streaks, Task, TodayTasks, UpdateTaskPayload,
    compute_progress, compute_streaks, history_stats, progress,
};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, Saved};
use crate::auth::TokenProvider;
use crate::error::ApiError;

/// Lists the client keeps a copy of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resource {
    Tasks,
    History,
    Friends,
    FriendRequests,
    FriendsProgress,
    Groups,
    Notes,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub date: Option<NaiveDate>,
    pub tasks: Vec<Task>,
    pub history: Vec<HistoryEntry>,
    pub friends: Vec<Friend>,
    pub friend_requests: Vec<FriendRequest>,
    pub friends_progress: Vec<FriendProgress>,
    pub groups: Vec<Group>,
    pub notes: Vec<MotivationalNote>,
    /// Lists known to be out of date after a change elsewhere.
    pub stale: BTreeSet<Resource>,
    /// Message of the last failed operation, cleared by the next success.
    pub last_error: Option<String>,
}

impl AppState {
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn unread_notes(&self) -> usize {
        self.notes.iter().filter(|n| !n.read).count()
    }

    pub fn pending_requests(&self) -> impl Iterator<Item = &FriendRequest> {
        self.friend_requests.iter().filter(|r| !r.status.is_terminal())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    TasksLoaded(TodayTasks),
    TaskCreated(Task),
    /// Puts a task back as given, either the backend's copy or a rollback.
    TaskReplaced(Task),
    TaskToggled { id: String, completed: bool },
    TaskRemoved(String),
    TaskRestored { index: usize, task: Task },
    HistoryLoaded(Vec<HistoryEntry>),
    FriendsLoaded(Vec<Friend>),
    FriendRequestsLoaded(Vec<FriendRequest>),
    FriendRequestResolved { id: String, action: FriendRequestAction },
    FriendRemoved(String),
    FriendsProgressLoaded(Vec<FriendProgress>),
    GroupsLoaded(Vec<Group>),
    GroupJoined(Group),
    GroupLeft(String),
    NotesLoaded(Vec<MotivationalNote>),
    NoteRead(String),
    /// A change the backend accepted without sending data back.
    Committed,
    Failed(String),
}

pub fn reduce(mut state: AppState, action: Action) -> AppState {
    if !matches!(action, Action::Failed(_)) {
        state.last_error = None;
    }

    match action {
        Action::TasksLoaded(today) => {
            state.date = Some(today.date);
            state.tasks = today.tasks;
            state.stale.remove(&Resource::Tasks);
        }
        Action::TaskCreated(task) => {
            if state.task(&task.id).is_none() {
                state.tasks.push(task);
            }
        }
        Action::TaskReplaced(task) => {
            if let Some(slot) = state.tasks.iter_mut().find(|t| t.id == task.id) {
                *slot = task;
            }
        }
        Action::TaskToggled { id, completed } => {
            if let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) {
                task.completed = completed;
            }
        }
        Action::TaskRemoved(id) => state.tasks.retain(|t| t.id != id),
        Action::TaskRestored { index, task } => {
            if state.task(&task.id).is_none() {
                let index = index.min(state.tasks.len());
                state.tasks.insert(index, task);
            }
        }
        Action::HistoryLoaded(history) => {
            state.history = history;
            state.stale.remove(&Resource::History);
        }
        Action::FriendsLoaded(friends) => {
            state.friends = friends;
            state.stale.remove(&Resource::Friends);
        }
        Action::FriendRequestsLoaded(requests) => {
            state.friend_requests = requests;
            state.stale.remove(&Resource::FriendRequests);
        }
        Action::FriendRequestResolved { id, action } => {
            if let Some(request) = state.friend_requests.iter_mut().find(|r| r.id == id) {
                // Session checks the transition before calling the backend.
                if let Err(err) = request.respond(action) {
                    warn!("Request {} kept as {}: {}", id, request.status, err);
                }
            }
            if action == FriendRequestAction::Accept {
                state.stale.insert(Resource::Friends);
                state.stale.insert(Resource::FriendsProgress);
            }
        }
        Action::FriendRemoved(id) => {
            state.friends.retain(|f| f.id != id);
            state.friends_progress.retain(|p| p.friend.id != id);
        }
        Action::FriendsProgressLoaded(progress) => {
            state.friends_progress = progress;
            state.stale.remove(&Resource::FriendsProgress);
        }
        Action::GroupsLoaded(groups) => {
            state.groups = groups;
            state.stale.remove(&Resource::Groups);
        }
        Action::GroupJoined(group) => {
            match state.groups.iter_mut().find(|g| g.id == group.id) {
                Some(slot) => *slot = group,
                None => state.groups.push(group),
            }
        }
        Action::GroupLeft(id) => state.groups.retain(|g| g.id != id),
        Action::NotesLoaded(notes) => {
            state.notes = notes;
            state.stale.remove(&Resource::Notes);
        }
        Action::NoteRead(id) => {
            if let Some(note) = state.notes.iter_mut().find(|n| n.id == id) {
                note.mark_read();
            }
        }
        Action::Committed => {}
        Action::Failed(message) => state.last_error = Some(message),
    }

    state
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0} must not be blank")]
    Blank(&'static str),

    #[error("Another change to {0} is still in progress")]
    InFlight(String),

    #[error("Unknown {kind}: {id}")]
    UnknownEntity { kind: &'static str, id: String },

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Blank(field));
    }
    Ok(trimmed)
}

// Holds an entity key in the in-flight set until dropped.
struct InFlight<'a> {
    keys: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.keys.lock().remove(&self.key);
    }
}

/// One signed-in user's view of the backend.
pub struct Session<P> {
    api: ApiClient<P>,
    state: RwLock<AppState>,
    in_flight: Mutex<HashSet<String>>,
    streak_threshold: f64,
}

impl<P: TokenProvider> Session<P> {
    pub fn new(api: ApiClient<P>, streak_threshold: f64) -> Self {
        Self {
            api,
            state: RwLock::new(AppState::default()),
            in_flight: Mutex::new(HashSet::new()),
            streak_threshold,
        }
    }

    /// Direct access for read-only calls that keep no local copy.
    pub fn api(&self) -> &ApiClient<P> {
        &self.api
    }

    pub fn streak_threshold(&self) -> f64 {
        self.streak_threshold
    }

    pub fn snapshot(&self) -> AppState {
        self.state.read().clone()
    }

    pub fn dispatch(&self, action: Action) {
        debug!("dispatch {:?}", action);
        let mut state = self.state.write();
        *state = reduce(std::mem::take(&mut *state), action);
    }

    fn begin(&self, key: String) -> Result<InFlight<'_>, StoreError> {
        let mut keys = self.in_flight.lock();
        if !keys.insert(key.clone()) {
            return Err(StoreError::InFlight(key));
        }
        Ok(InFlight {
            keys: &self.in_flight,
            key,
        })
    }

    fn fail(&self, err: ApiError) -> StoreError {
        error!("Operation failed: {}", err);
        self.dispatch(Action::Failed(err.user_message()));
        StoreError::Api(err)
    }

    // --- Loading ---

    pub async fn load_today(&self) -> Result<(), StoreError> {
        let today = self.api.today_tasks().await.map_err(|e| self.fail(e))?;
        self.dispatch(Action::TasksLoaded(today));
        Ok(())
    }

    pub async fn load_history(&self) -> Result<(), StoreError> {
        let history = self.api.history().await.map_err(|e| self.fail(e))?;
        self.dispatch(Action::HistoryLoaded(history));
        Ok(())
    }

    pub async fn load_friends(&self) -> Result<(), StoreError> {
        let friends = self.api.friends().await.map_err(|e| self.fail(e))?;
        self.dispatch(Action::FriendsLoaded(friends));
        Ok(())
    }

    pub async fn load_friend_requests(&self) -> Result<(), StoreError> {
        let requests = self.api.friend_requests().await.map_err(|e| self.fail(e))?;
        self.dispatch(Action::FriendRequestsLoaded(requests));
        Ok(())
    }

    pub async fn load_friends_progress(&self) -> Result<(), StoreError> {
        let progress = self.api.friends_progress().await.map_err(|e| self.fail(e))?;
        self.dispatch(Action::FriendsProgressLoaded(progress));
        Ok(())
    }

    pub async fn load_groups(&self) -> Result<(), StoreError> {
        let groups = self.api.groups().await.map_err(|e| self.fail(e))?;
        self.dispatch(Action::GroupsLoaded(groups));
        Ok(())
    }

    pub async fn load_notes(&self) -> Result<(), StoreError> {
        let notes = self.api.notes().await.map_err(|e| self.fail(e))?;
        self.dispatch(Action::NotesLoaded(notes));
        Ok(())
    }

    pub async fn load(&self, resource: Resource) -> Result<(), StoreError> {
        match resource {
            Resource::Tasks => self.load_today().await,
            Resource::History => self.load_history().await,
            Resource::Friends => self.load_friends().await,
            Resource::FriendRequests => self.load_friend_requests().await,
            Resource::FriendsProgress => self.load_friends_progress().await,
            Resource::Groups => self.load_groups().await,
            Resource::Notes => self.load_notes().await,
        }
    }

    /// Today's tasks and the received notes, fetched side by side.
    pub async fn load_dashboard(&self) -> Result<(), StoreError> {
        let (today, notes) = tokio::try_join!(self.api.today_tasks(), self.api.notes())
            .map_err(|e| self.fail(e))?;
        self.dispatch(Action::TasksLoaded(today));
        self.dispatch(Action::NotesLoaded(notes));
        Ok(())
    }

    /// Reloads every list a previous change marked as out of date.
    pub async fn refresh_stale(&self) -> Result<(), StoreError> {
        let stale = self.state.read().stale.clone();
        for resource in stale {
            info!("Refreshing {:?}", resource);
            self.load(resource).await?;
        }
        Ok(())
    }

    // --- Tasks ---

    pub async fn create_task(
        &self,
        title: &str,
        description: Option<&str>,
        priority: Priority,
    ) -> Result<Task, StoreError> {
        let title = required(title, "Task title")?;
        let _guard = self.begin(format!("new task {title}"))?;

        let payload = CreateTaskPayload {
            title: title.to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            priority,
            group_id: None,
        };

        let task = self.api.create_task(&payload).await.map_err(|e| self.fail(e))?;
        self.dispatch(Action::TaskCreated(task.clone()));
        Ok(task)
    }

    /// Flips the completed flag right away and undoes it if the backend
    /// refuses the change.
    pub async fn toggle_task(&self, task_id: &str) -> Result<Task, StoreError> {
        let original = self
            .state
            .read()
            .task(task_id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownEntity {
                kind: "task",
                id: task_id.to_string(),
            })?;
        let _guard = self.begin(format!("task {task_id}"))?;

        let completed = !original.completed;
        self.dispatch(Action::TaskToggled {
            id: task_id.to_string(),
            completed,
        });

        match self
            .api
            .update_task(task_id, &UpdateTaskPayload::completed(completed))
            .await
        {
            Ok(Saved::Entity(task)) => {
                self.dispatch(Action::TaskReplaced(task.clone()));
                Ok(task)
            }
            // Committed without an echo: the optimistic flag is the new state.
            Ok(Saved::Acknowledged { message }) => {
                debug!("Task {} saved: {}", task_id, message);
                self.dispatch(Action::Committed);
                Ok(Task {
                    completed,
                    ..original
                })
            }
            Err(err) => {
                info!("Rolling back task {}", task_id);
                self.dispatch(Action::TaskReplaced(original));
                Err(self.fail(err))
            }
        }
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<(), StoreError> {
        let (index, original) = {
            let state = self.state.read();
            state
                .tasks
                .iter()
                .position(|t| t.id == task_id)
                .map(|i| (i, state.tasks[i].clone()))
                .ok_or_else(|| StoreError::UnknownEntity {
                    kind: "task",
                    id: task_id.to_string(),
                })?
        };
        let _guard = self.begin(format!("task {task_id}"))?;

        self.dispatch(Action::TaskRemoved(task_id.to_string()));

        match self.api.delete_task(task_id).await {
            Ok(_) => Ok(()),
            Err(err) => {
                info!("Rolling back deletion of task {}", task_id);
                self.dispatch(Action::TaskRestored {
                    index,
                    task: original,
                });
                Err(self.fail(err))
            }
        }
    }

    // --- Notes ---

    pub async fn send_note(
        &self,
        to_user_id: &str,
        message: &str,
        group_id: Option<&str>,
    ) -> Result<MotivationalNote, StoreError> {
        let to_user_id = required(to_user_id, "Recipient")?;
        let message = required(message, "Message")?;

        let payload = SendNotePayload {
            to_user_id: to_user_id.to_string(),
            message: message.to_string(),
            group_id: group_id.map(str::to_string),
        };
        let note = self.api.send_note(&payload).await.map_err(|e| self.fail(e))?;
        Ok(note)
    }

    /// Marks a received note as read. Not applied ahead of the backend
    /// since a read note cannot be rolled back to unread.
    pub async fn mark_note_read(&self, note_id: &str) -> Result<(), StoreError> {
        let already_read = self
            .state
            .read()
            .notes
            .iter()
            .any(|n| n.id == note_id && n.read);
        if already_read {
            return Ok(());
        }

        let _guard = self.begin(format!("note {note_id}"))?;
        self.api.mark_note_read(note_id).await.map_err(|e| self.fail(e))?;
        self.dispatch(Action::NoteRead(note_id.to_string()));
        Ok(())
    }

    // --- Friends ---

    pub async fn send_friend_request(&self, email: &str) -> Result<FriendRequest, StoreError> {
        let email = required(email, "Email")?;
        let _guard = self.begin(format!("friend request {email}"))?;
        let request = self
            .api
            .send_friend_request(email)
            .await
            .map_err(|e| self.fail(e))?;
        Ok(request)
    }

    pub async fn respond_to_request(
        &self,
        request_id: &str,
        action: FriendRequestAction,
    ) -> Result<(), StoreError> {
        if let Some(request) = self
            .state
            .read()
            .friend_requests
            .iter()
            .find(|r| r.id == request_id)
        {
            request.clone().respond(action)?;
        }

        let _guard = self.begin(format!("friend request {request_id}"))?;
        self.api
            .respond_to_friend_request(request_id, action)
            .await
            .map_err(|e| self.fail(e))?;
        self.dispatch(Action::FriendRequestResolved {
            id: request_id.to_string(),
            action,
        });
        Ok(())
    }

    pub async fn remove_friend(&self, friend_id: &str) -> Result<(), StoreError> {
        let _guard = self.begin(format!("friend {friend_id}"))?;
        self.api.remove_friend(friend_id).await.map_err(|e| self.fail(e))?;
        self.dispatch(Action::FriendRemoved(friend_id.to_string()));
        Ok(())
    }

    // --- Groups ---

    pub async fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Group, StoreError> {
        let name = required(name, "Group name")?;
        let _guard = self.begin(format!("new group {name}"))?;

        let payload = CreateGroupPayload {
            name: name.to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        };
        let group = self.api.create_group(&payload).await.map_err(|e| self.fail(e))?;
        self.dispatch(Action::GroupJoined(group.clone()));
        Ok(group)
    }

    pub async fn join_group(&self, invite_code: &str) -> Result<Group, StoreError> {
        let invite_code = required(invite_code, "Invite code")?;
        let _guard = self.begin(format!("invite {invite_code}"))?;
        let group = self.api.join_group(invite_code).await.map_err(|e| self.fail(e))?;
        self.dispatch(Action::GroupJoined(group.clone()));
        Ok(group)
    }

    pub async fn leave_group(&self, group_id: &str) -> Result<(), StoreError> {
        let _guard = self.begin(format!("group {group_id}"))?;
        self.api.leave_group(group_id).await.map_err(|e| self.fail(e))?;
        self.dispatch(Action::GroupLeft(group_id.to_string()));
        Ok(())
    }

    // --- Derived statistics ---

    pub fn my_progress(&self) -> Progress {
        compute_progress(&self.state.read().tasks)
    }

    pub fn streaks(&self) -> Streaks {
        compute_streaks(&self.state.read().history, self.streak_threshold)
    }

    pub fn history_stats(&self) -> HistoryStats {
        history_stats(&self.state.read().history, self.streak_threshold)
    }

    pub fn friends_progress(&self) -> HashMap<String, Progress> {
        progress::friends_progress(&self.state.read().friends_progress)
    }
}
