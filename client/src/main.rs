// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use client::api::{ApiClient, Saved};
use client::auth::{EnvToken, StaticToken, TokenProvider};
use client::config::{ClientConfig, TOKEN_VAR};
use client::store::Session;
use client::views;
use common::{
    CreateGroupTaskPayload, FriendRequestAction, ProfileUpdate, UpdateGroupTaskPayload,
    compute_progress, compute_streaks, history_stats,
};

use cli::{Command, CommandLineArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so tables on stdout stay clean.
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let CommandLineArgs {
        action,
        api_url,
        token,
    } = CommandLineArgs::parse();

    let mut config = ClientConfig::from_env().context("Failed to load configuration")?;
    if let Some(api_url) = api_url {
        config = config.with_api_url(api_url).validated()?;
    }
    tracing::debug!("Using backend at {}", config.api_url);

    match token {
        Some(token) => run(session(&config, StaticToken::new(token))?, action).await,
        None => run(session(&config, EnvToken::new(TOKEN_VAR))?, action).await,
    }
}

fn session<P: TokenProvider>(config: &ClientConfig, tokens: P) -> Result<Session<P>> {
    let api = ApiClient::new(config, tokens).context("Failed to build the API client")?;
    Ok(Session::new(api, config.streak_threshold))
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

async fn run<P: TokenProvider>(session: Session<P>, action: Command) -> Result<()> {
    let threshold = session.streak_threshold();

    match action {
        Command::Today => {
            session.load_dashboard().await?;
            let state = session.snapshot();
            if let Some(date) = state.date {
                println!("Tasks for {date}");
            }
            println!("{}", views::tasks_table(&state.tasks));
            println!("{}", views::progress_line("My progress", &session.my_progress()));
            let unread = state.unread_notes();
            if unread > 0 {
                println!("You have {unread} unread motivational note(s). Run `checkin notes`.");
            }
        }
        Command::Add {
            title,
            description,
            priority,
        } => {
            let task = session
                .create_task(&title, description.as_deref(), priority.into())
                .await?;
            println!("Added task {} ({})", task.title, task.id);
        }
        Command::Toggle { id } => {
            session.load_today().await?;
            let task = session.toggle_task(&id).await?;
            let status = if task.completed { "done" } else { "not done" };
            println!("{} is now {status}", task.title);
            println!("{}", views::progress_line("My progress", &session.my_progress()));
        }
        Command::Rm { id } => {
            session.load_today().await?;
            session.delete_task(&id).await?;
            println!("Deleted task {id}");
        }
        Command::History { friend } => {
            let history = match friend {
                Some(friend_id) => session.api().friend_history(&friend_id).await?,
                None => {
                    session.load_history().await?;
                    session.snapshot().history
                }
            };
            if history.is_empty() {
                println!("No history yet! Complete some tasks to start tracking your progress.");
                return Ok(());
            }
            let stats = history_stats(&history, threshold);
            println!("{}", views::history_summary(&stats, threshold));
            println!("{}", views::history_table(&history));
        }
        Command::Friends => {
            session.load_friends().await?;
            let friends = session.snapshot().friends;
            println!("Your friends ({})", friends.len());
            println!("{}", views::friends_table(&friends));
        }
        Command::Progress => {
            session.load_friends_progress().await?;
            println!("{}", views::friends_progress_table(&session.snapshot().friends_progress));
        }
        Command::FriendTasks { id } => {
            let api = session.api();
            let (tasks, history) =
                tokio::try_join!(api.friend_tasks(&id), api.friend_history(&id))?;
            println!("{}", views::tasks_table(&tasks));
            println!("{}", views::progress_line("Today", &compute_progress(&tasks)));
            let streaks = compute_streaks(&history, threshold);
            println!(
                "Current streak: {} day(s), best: {}",
                streaks.current_streak, streaks.best_streak
            );
        }
        Command::Search { query } => {
            let users = session.api().search_users(query.trim()).await?;
            println!("{}", views::friends_table(&users));
        }
        Command::Requests => {
            session.load_friend_requests().await?;
            let state = session.snapshot();
            println!("{}", views::requests_table(state.pending_requests()));
        }
        Command::Request { email } => {
            session.send_friend_request(&email).await?;
            println!("Friend request sent to {}", email.trim());
        }
        Command::Respond { id, answer } => {
            session.load_friend_requests().await?;
            let action = FriendRequestAction::from(answer);
            session.respond_to_request(&id, action).await?;
            session.refresh_stale().await?;
            println!("Request {id}: {}", action.as_str());
            if action == FriendRequestAction::Accept {
                println!("{}", views::friends_table(&session.snapshot().friends));
            }
        }
        Command::Unfriend { id } => {
            session.remove_friend(&id).await?;
            println!("Removed friend {id}");
        }
        Command::Groups => {
            session.load_groups().await?;
            println!("{}", views::groups_table(&session.snapshot().groups));
        }
        Command::Group { id } => {
            let api = session.api();
            let (group, members, progress, tasks, messages) = tokio::try_join!(
                api.group(&id),
                api.group_members(&id),
                api.group_progress(&id),
                api.group_tasks(&id),
                api.group_messages(&id, None)
            )?;
            println!("{} (invite code {})", group.name, group.invite_code);
            if let Some(description) = &group.description {
                println!("{description}");
            }
            println!("{}", views::members_table(&members));
            println!(
                "{}",
                views::progress_line("Group progress", &compute_progress(&tasks))
            );
            println!("{}", views::group_progress_table(&progress));
            println!("{}", views::group_tasks_table(&tasks));
            println!("{}", views::messages_table(&messages));
        }
        Command::CreateGroup { name, description } => {
            let group = session.create_group(&name, description.as_deref()).await?;
            println!("Created group {} with invite code {}", group.name, group.invite_code);
        }
        Command::Join { code } => {
            let group = session.join_group(&code).await?;
            println!("Joined {} ({} members)", group.name, group.members.len());
        }
        Command::Leave { id } => {
            session.leave_group(&id).await?;
            println!("Left group {id}");
        }
        Command::GroupAdd {
            group,
            title,
            assign,
            priority,
        } => {
            let title = title.trim();
            anyhow::ensure!(!title.is_empty(), "Task title must not be blank");
            let payload = CreateGroupTaskPayload {
                title: title.to_string(),
                description: None,
                assigned_to: optional(assign),
                priority: priority.into(),
            };
            let task = session.api().create_group_task(&group, &payload).await?;
            println!("Added {} to group {}", task.title, task.group_id);
        }
        Command::GroupDone { group, task, undo } => {
            let update = UpdateGroupTaskPayload {
                completed: Some(!undo),
                ..UpdateGroupTaskPayload::default()
            };
            match session.api().update_group_task(&group, &task, &update).await? {
                Saved::Entity(task) => {
                    let status = if task.completed { "done" } else { "not done" };
                    println!("{} is now {status}", task.title);
                }
                Saved::Acknowledged { .. } => println!("Group task {task} updated"),
            }
        }
        Command::GroupRm { group, task } => {
            session.api().delete_group_task(&group, &task).await?;
            println!("Deleted group task {task}");
        }
        Command::Say { group, message } => {
            let message = message.trim();
            anyhow::ensure!(!message.is_empty(), "Message must not be blank");
            session.api().send_group_message(&group, message).await?;
            println!("Message posted");
        }
        Command::Note { to, message, group } => {
            session.send_note(&to, &message, group.as_deref()).await?;
            println!("Motivational note sent!");
        }
        Command::Notes => {
            session.load_notes().await?;
            println!("{}", views::notes_table(&session.snapshot().notes));
        }
        Command::Read { id } => {
            session.load_notes().await?;
            session.mark_note_read(&id).await?;
            println!("Note {id} marked as read");
        }
        Command::Profile {
            display_name,
            username,
        } => {
            let update = ProfileUpdate {
                display_name: optional(display_name),
                username: optional(username),
            };
            let profile = if update == ProfileUpdate::default() {
                session.api().get_profile().await?
            } else {
                Some(session.api().update_profile(&update).await?)
            };
            match profile {
                Some(profile) => println!("{}", views::profile_table(&profile)),
                None => println!("No profile yet. Set one with --display-name or --username."),
            }
        }
    }

    Ok(())
}
