// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use clap::{Parser, Subcommand, ValueEnum};
use common::{FriendRequestAction, Priority};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::High => Priority::High,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Answer {
    Accept,
    Reject,
}

impl From<Answer> for FriendRequestAction {
    fn from(answer: Answer) -> Self {
        match answer {
            Answer::Accept => FriendRequestAction::Accept,
            Answer::Reject => FriendRequestAction::Reject,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show today's tasks, progress and unread notes.
    Today,
    /// Add a task for today.
    Add {
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,
    },
    /// Mark a task done, or not done.
    Toggle { id: String },
    /// Delete a task.
    Rm { id: String },
    /// Show the completion history with streaks.
    History {
        /// Show a friend's history instead of yours.
        #[arg(long)]
        friend: Option<String>,
    },
    /// List your friends.
    Friends,
    /// Show how your friends are doing today.
    Progress,
    /// Show a friend's tasks for today.
    FriendTasks { id: String },
    /// Look users up by name or email.
    Search { query: String },
    /// List friend requests.
    Requests,
    /// Send a friend request.
    Request { email: String },
    /// Accept or reject a friend request.
    Respond {
        id: String,

        #[arg(value_enum)]
        answer: Answer,
    },
    /// Remove a friend.
    Unfriend { id: String },
    /// List your groups.
    Groups,
    /// Show a group's members, progress, tasks and recent messages.
    Group { id: String },
    /// Create a group and print its invite code.
    CreateGroup {
        name: String,

        #[arg(short, long)]
        description: Option<String>,
    },
    /// Join a group with an invite code.
    Join { code: String },
    /// Leave a group.
    Leave { id: String },
    /// Add a task to a group.
    GroupAdd {
        group: String,
        title: String,

        #[arg(long)]
        assign: Option<String>,

        #[arg(short, long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,
    },
    /// Mark a group task done, or not done with --undo.
    GroupDone {
        group: String,
        task: String,

        #[arg(long)]
        undo: bool,
    },
    /// Delete a group task.
    GroupRm { group: String, task: String },
    /// Post a message to a group.
    Say { group: String, message: String },
    /// Send a motivational note.
    Note {
        to: String,
        message: String,

        #[arg(long)]
        group: Option<String>,
    },
    /// List the motivational notes you received.
    Notes,
    /// Mark a note as read.
    Read { id: String },
    /// Show your profile, or update it when a flag is given.
    Profile {
        #[arg(long)]
        display_name: Option<String>,

        #[arg(long)]
        username: Option<String>,
    },
}

#[derive(Debug, Parser)]
#[command(name = "checkin", version, about = "Daily check-in accountability client.")]
pub struct CommandLineArgs {
    #[command(subcommand)]
    pub action: Command,

    /// Backend base URL.
    #[arg(long, global = true, env = "CHECKIN_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token. When omitted CHECKIN_TOKEN is read before every request.
    #[arg(long, global = true)]
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        CommandLineArgs::command().debug_assert();
    }

    #[test]
    fn test_parse_add_with_priority() {
        let args =
            CommandLineArgs::try_parse_from(["checkin", "add", "Run 5k", "-p", "high"]).unwrap();

        match args.action {
            Command::Add {
                title, priority, ..
            } => {
                assert_eq!(title, "Run 5k");
                assert_eq!(Priority::from(priority), Priority::High);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_respond() {
        let args = CommandLineArgs::try_parse_from(["checkin", "respond", "r1", "reject"]).unwrap();

        assert!(matches!(
            args.action,
            Command::Respond {
                answer: Answer::Reject,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_group_done_with_undo() {
        let args =
            CommandLineArgs::try_parse_from(["checkin", "group-done", "g1", "gt1", "--undo"])
                .unwrap();

        match args.action {
            Command::GroupDone { group, task, undo } => {
                assert_eq!(group, "g1");
                assert_eq!(task, "gt1");
                assert!(undo);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
