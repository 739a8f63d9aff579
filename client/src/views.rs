// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.

//! Plain-text renderings of the state for the terminal.

use common::progress::{self, members_progress, sorted_history};
use common::{
    CompletionGrade, Friend, FriendProgress, FriendRequest, Group, GroupMember, GroupMessage,
    GroupProgress, GroupTask, HistoryEntry, HistoryStats, MotivationalNote, Progress, Task,
    UserProfile,
};
use prettytable::{Cell, Row, Table};

const BAR_WIDTH: u32 = 20;

fn row<I>(cells: I) -> Row
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    Row::new(cells.into_iter().map(|c| Cell::new(c.as_ref())).collect())
}

fn table(titles: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_titles(row(titles));
    table
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

fn checkbox(done: bool) -> &'static str {
    if done { "[x]" } else { "[ ]" }
}

pub fn grade_label(grade: CompletionGrade) -> &'static str {
    match grade {
        CompletionGrade::OnTrack => "on track",
        CompletionGrade::Fair => "fair",
        CompletionGrade::Behind => "behind",
    }
}

/// `####------` style bar for a percentage in `0..=100`.
pub fn progress_bar(percentage: u32) -> String {
    let filled = (percentage.min(100) * BAR_WIDTH / 100) as usize;
    let empty = BAR_WIDTH as usize - filled;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(empty))
}

pub fn progress_line(label: &str, progress: &Progress) -> String {
    format!(
        "{label}: {} {}/{} ({}%, {})",
        progress_bar(progress.percentage),
        progress.completed,
        progress.total,
        progress.percentage,
        grade_label(progress.grade())
    )
}

pub fn tasks_table(tasks: &[Task]) -> Table {
    let mut table = table(&["ID", "Done", "Title", "Priority", "Description"]);
    for task in tasks {
        let priority = task.priority.map(|p| p.to_string());
        table.add_row(row([
            task.id.as_str(),
            checkbox(task.completed),
            task.title.as_str(),
            or_dash(priority.as_deref()),
            or_dash(task.description.as_deref()),
        ]));
    }
    table
}

pub fn group_tasks_table(tasks: &[GroupTask]) -> Table {
    let mut table = table(&["ID", "Done", "Title", "Priority", "Assigned to"]);
    for task in tasks {
        table.add_row(row([
            task.id.clone(),
            checkbox(task.completed).to_string(),
            task.title.clone(),
            task.priority.to_string(),
            or_dash(task.assigned_to.as_deref()).to_string(),
        ]));
    }
    table
}

/// Daily entries, newest first.
pub fn history_table(history: &[HistoryEntry]) -> Table {
    let mut table = table(&["Date", "Tasks", "Completion", "Grade"]);
    for entry in sorted_history(history) {
        table.add_row(row([
            entry.date.format("%a %b %-d").to_string(),
            format!("{}/{}", entry.completed_tasks, entry.total_tasks),
            format!("{}%", entry.completion_percentage.round()),
            grade_label(CompletionGrade::of(entry.completion_percentage)).to_string(),
        ]));
    }
    table
}

pub fn history_summary(stats: &HistoryStats, threshold: f64) -> Table {
    let mut table = table(&["Days tracked", "Average completion", "Best streak", "Current streak"]);
    table.add_row(row([
        stats.total_days.to_string(),
        format!("{}%", stats.average_completion),
        format!("{} ({threshold}%+ days)", stats.best_streak),
        stats.current_streak.to_string(),
    ]));
    table
}

pub fn friends_table(friends: &[Friend]) -> Table {
    let mut table = table(&["ID", "Name", "Email"]);
    for friend in friends {
        table.add_row(row([friend.id.as_str(), friend.label(), friend.email.as_str()]));
    }
    table
}

pub fn friends_progress_table(friends: &[FriendProgress]) -> Table {
    let by_friend = progress::friends_progress(friends);
    let mut table = table(&["Friend", "Progress", "Done", "Grade"]);
    for entry in friends {
        let progress = by_friend
            .get(&entry.friend.id)
            .copied()
            .unwrap_or_default();
        table.add_row(row([
            entry.friend.label().to_string(),
            progress_bar(progress.percentage),
            format!("{}/{} ({}%)", progress.completed, progress.total, progress.percentage),
            grade_label(progress.grade()).to_string(),
        ]));
    }
    table
}

pub fn requests_table<'a>(requests: impl IntoIterator<Item = &'a FriendRequest>) -> Table {
    let mut table = table(&["ID", "From", "Status", "Sent"]);
    for request in requests {
        let from = request
            .from_user
            .as_ref()
            .map(|u| u.label().to_string())
            .unwrap_or_else(|| request.from_user_id.clone());
        table.add_row(row([
            request.id.clone(),
            from,
            request.status.to_string(),
            request.created_at.format("%Y-%m-%d").to_string(),
        ]));
    }
    table
}

pub fn groups_table(groups: &[Group]) -> Table {
    let mut table = table(&["ID", "Name", "Members", "Invite code", "Description"]);
    for group in groups {
        table.add_row(row([
            group.id.clone(),
            group.name.clone(),
            group.members.len().to_string(),
            group.invite_code.clone(),
            or_dash(group.description.as_deref()).to_string(),
        ]));
    }
    table
}

pub fn members_table(members: &[GroupMember]) -> Table {
    let mut table = table(&["ID", "Name", "Email"]);
    for member in members {
        let name = member
            .display_name
            .as_deref()
            .or(member.username.as_deref())
            .unwrap_or(&member.email);
        table.add_row(row([member.id.as_str(), name, member.email.as_str()]));
    }
    table
}

pub fn group_progress_table(group: &GroupProgress) -> Table {
    let mut table = table(&["Member", "Progress", "Done", "Grade"]);
    for (name, progress) in members_progress(group) {
        table.add_row(row([
            name,
            progress_bar(progress.percentage),
            format!("{}/{} ({}%)", progress.completed, progress.total, progress.percentage),
            grade_label(progress.grade()).to_string(),
        ]));
    }
    table
}

pub fn messages_table(messages: &[GroupMessage]) -> Table {
    let mut table = table(&["When", "From", "Message"]);
    for message in messages {
        table.add_row(row([
            message.created_at.format("%Y-%m-%d %H:%M").to_string(),
            message.user_name.clone(),
            message.message.clone(),
        ]));
    }
    table
}

pub fn notes_table(notes: &[MotivationalNote]) -> Table {
    let mut table = table(&["ID", "", "From", "Message", "Received"]);
    for note in notes {
        table.add_row(row([
            note.id.clone(),
            if note.read { "" } else { "new" }.to_string(),
            note.from_user_id.clone(),
            note.message.clone(),
            note.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]));
    }
    table
}

pub fn profile_table(profile: &UserProfile) -> Table {
    let mut table = table(&["Field", "Value"]);
    table.add_row(row(["ID", profile.id.as_str()]));
    table.add_row(row(["Email", profile.email.as_str()]));
    table.add_row(row(["Display name", or_dash(profile.display_name.as_deref())]));
    table.add_row(row(["Username", or_dash(profile.username.as_deref())]));
    table.add_row(row(["Friends", profile.friends.len().to_string().as_str()]));
    table.add_row(row(["Groups", profile.groups.len().to_string().as_str()]));
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn test_progress_bar_widths() {
        assert_eq!(progress_bar(0), format!("[{}]", "-".repeat(20)));
        assert_eq!(progress_bar(100), format!("[{}]", "#".repeat(20)));
        assert_eq!(progress_bar(67), format!("[{}{}]", "#".repeat(13), "-".repeat(7)));
    }

    #[test]
    fn test_progress_line() {
        let line = progress_line("Today", &Progress::from_counts(2, 3));

        assert!(line.starts_with("Today: ["));
        assert!(line.ends_with("2/3 (67%, fair)"));
    }

    #[test]
    fn test_tasks_table_lists_every_task() {
        let task = Task {
            id: "t1".to_string(),
            title: "Stretch".to_string(),
            description: None,
            completed: true,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            user_id: "alice".to_string(),
            priority: None,
            group_id: None,
            updated_at: None,
        };

        let rendered = tasks_table(&[task]).to_string();

        assert!(rendered.contains("Stretch"));
        assert!(rendered.contains("[x]"));
    }

    #[test]
    fn test_history_table_is_newest_first() {
        let entry = |day: u32, pct: f64| HistoryEntry {
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            total_tasks: 4,
            completed_tasks: 2,
            completion_percentage: pct,
        };

        let rendered = history_table(&[entry(1, 50.0), entry(3, 100.0)]).to_string();

        let newest = rendered.find("Mon Mar 3").unwrap();
        let oldest = rendered.find("Sat Mar 1").unwrap();
        assert!(newest < oldest);
        assert!(rendered.contains("on track"));
    }
}
