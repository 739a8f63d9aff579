// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.

//! Pure statistics over task lists and the daily history.
//!
//! Nothing in here performs I/O or fails: every function takes data that was
//! already fetched and returns a derived value. Percentages are rounded half
//! away from zero (`2/3` gives `67`, `1/8` gives `13`).

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{FriendProgress, GroupProgress, GroupTask, HistoryEntry, ProgressStats, Task};

/// Days at or above this completion percentage count towards a streak.
pub const DEFAULT_STREAK_THRESHOLD: f64 = 80.0;

/// Anything that carries a completion flag.
pub trait Completable {
    fn is_completed(&self) -> bool;
}

impl Completable for Task {
    fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Completable for GroupTask {
    fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Completable for bool {
    fn is_completed(&self) -> bool {
        *self
    }
}

/// Completed/total counts with the derived percentage, always in `0..=100`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub completed: u32,
    pub total: u32,
    pub percentage: u32,
}

impl Progress {
    /// Builds a summary from raw counts. A completed count above the total
    /// is clamped so the percentage stays within bounds.
    pub fn from_counts(completed: u32, total: u32) -> Self {
        let completed = completed.min(total);
        Self {
            completed,
            total,
            percentage: rounded_percentage(completed, total),
        }
    }

    pub fn grade(&self) -> CompletionGrade {
        CompletionGrade::of(f64::from(self.percentage))
    }
}

impl From<&ProgressStats> for Progress {
    fn from(stats: &ProgressStats) -> Self {
        Progress::from_counts(stats.completed_tasks, stats.total_tasks)
    }
}

// round(100 * completed / total) in integers, half away from zero.
fn rounded_percentage(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let completed = u64::from(completed);
    let total = u64::from(total);
    ((200 * completed + total) / (2 * total)) as u32
}

fn saturating_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Counts the tasks and the completed ones. Order does not matter and an
/// empty list yields `{0, 0, 0}`.
pub fn compute_progress<T: Completable>(tasks: &[T]) -> Progress {
    let total = saturating_count(tasks.len());
    let completed = saturating_count(tasks.iter().filter(|t| t.is_completed()).count());
    Progress::from_counts(completed, total)
}

/// Applies [`compute_progress`] to every entity independently.
pub fn aggregate_multi_progress<K, T>(per_entity: &HashMap<K, Vec<T>>) -> HashMap<K, Progress>
where
    K: Eq + Hash + Clone,
    T: Completable,
{
    per_entity
        .iter()
        .map(|(id, tasks)| (id.clone(), compute_progress(tasks)))
        .collect()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Streaks {
    pub best_streak: u32,
    pub current_streak: u32,
}

/// Keeps one entry per date. When a date appears more than once the entry
/// that comes last in `history` wins. Returned oldest first.
pub fn collapse_duplicate_dates(history: &[HistoryEntry]) -> BTreeMap<NaiveDate, &HistoryEntry> {
    let mut by_date = BTreeMap::new();
    for entry in history {
        by_date.insert(entry.date, entry);
    }
    by_date
}

/// Streaks of consecutive days at or above `threshold`.
///
/// Days are walked from the most recent backwards. The current streak is the
/// run that ends on the most recent day (zero if that day is below the
/// threshold); the best streak is the longest run anywhere in the history.
pub fn compute_streaks(history: &[HistoryEntry], threshold: f64) -> Streaks {
    let by_date = collapse_duplicate_dates(history);

    let mut running = 0u32;
    let mut best = 0u32;
    let mut current = None;

    for entry in by_date.values().rev() {
        if entry.completion_percentage >= threshold {
            running += 1;
            best = best.max(running);
        } else {
            // The first break closes the current streak.
            if current.is_none() {
                current = Some(running);
            }
            running = 0;
        }
    }

    Streaks {
        best_streak: best,
        current_streak: current.unwrap_or(running),
    }
}

/// Summary figures shown on top of the history list.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryStats {
    pub total_days: u32,
    pub average_completion: u32,
    pub best_streak: u32,
    pub current_streak: u32,
}

pub fn history_stats(history: &[HistoryEntry], threshold: f64) -> HistoryStats {
    let by_date = collapse_duplicate_dates(history);
    if by_date.is_empty() {
        return HistoryStats::default();
    }

    let total_days = saturating_count(by_date.len());
    let sum: f64 = by_date.values().map(|e| e.completion_percentage).sum();
    let average = (sum / f64::from(total_days)).round().clamp(0.0, 100.0) as u32;
    let streaks = compute_streaks(history, threshold);

    HistoryStats {
        total_days,
        average_completion: average,
        best_streak: streaks.best_streak,
        current_streak: streaks.current_streak,
    }
}

/// History entries newest first, one per date.
pub fn sorted_history(history: &[HistoryEntry]) -> Vec<HistoryEntry> {
    collapse_duplicate_dates(history)
        .into_values()
        .rev()
        .cloned()
        .collect()
}

/// Colour band of a completion percentage.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionGrade {
    OnTrack,
    Fair,
    Behind,
}

impl CompletionGrade {
    pub fn of(percentage: f64) -> Self {
        if percentage >= 80.0 {
            CompletionGrade::OnTrack
        } else if percentage >= 60.0 {
            CompletionGrade::Fair
        } else {
            CompletionGrade::Behind
        }
    }
}

/// Per-member summaries of a group, in the order the backend listed them.
pub fn members_progress(group: &GroupProgress) -> Vec<(String, Progress)> {
    group
        .members_progress
        .iter()
        .map(|m| {
            (
                m.user_name.clone(),
                Progress::from_counts(m.completed_tasks, m.total_tasks),
            )
        })
        .collect()
}

/// Per-friend summaries keyed by friend id, recomputed from the tasks the
/// backend returned rather than from its pre-computed stats.
pub fn friends_progress(friends: &[FriendProgress]) -> HashMap<String, Progress> {
    let per_friend: HashMap<String, Vec<Task>> = friends
        .iter()
        .map(|f| (f.friend.id.clone(), f.tasks.clone()))
        .collect();
    aggregate_multi_progress(&per_friend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Friend, MemberProgress};
    use chrono::{Duration, TimeZone, Utc};

    fn task(completed: bool) -> Task {
        Task {
            id: "t".to_string(),
            title: "task".to_string(),
            description: None,
            completed,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            user_id: "alice".to_string(),
            priority: None,
            group_id: None,
            updated_at: None,
        }
    }

    // Builds a history from percentages listed newest first.
    fn history_desc(percentages: &[f64]) -> Vec<HistoryEntry> {
        let newest = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        percentages
            .iter()
            .enumerate()
            .map(|(i, &p)| HistoryEntry {
                date: newest - Duration::days(i as i64),
                total_tasks: 10,
                completed_tasks: (p / 10.0) as u32,
                completion_percentage: p,
            })
            .collect()
    }

    #[test]
    fn test_progress_of_empty_list() {
        let progress = compute_progress::<Task>(&[]);

        assert_eq!(progress, Progress::default());
        assert_eq!(progress.percentage, 0);
    }

    #[test]
    fn test_progress_rounds_two_thirds_up() {
        let tasks = vec![task(true), task(false), task(true)];

        let progress = compute_progress(&tasks);

        assert_eq!(
            progress,
            Progress {
                completed: 2,
                total: 3,
                percentage: 67
            }
        );
    }

    #[test]
    fn test_progress_rounds_half_away_from_zero() {
        // 1/8 = 12.5%
        let mut flags = vec![false; 8];
        flags[0] = true;

        assert_eq!(compute_progress(&flags).percentage, 13);
        assert_eq!(Progress::from_counts(1, 3).percentage, 33);
    }

    #[test]
    fn test_progress_percentage_stays_in_bounds() {
        for total in 0..40u32 {
            for completed in 0..=total {
                let flags: Vec<bool> = (0..total).map(|i| i < completed).collect();
                let progress = compute_progress(&flags);
                assert!(progress.percentage <= 100);
                assert_eq!(progress.completed, completed);
                assert_eq!(progress.total, total);
            }
        }
        assert_eq!(Progress::from_counts(7, 5).percentage, 100);
    }

    #[test]
    fn test_counts_saturate_instead_of_wrapping() {
        assert_eq!(saturating_count(3), 3);
        assert_eq!(saturating_count(usize::MAX), u32::MAX);
    }

    #[test]
    fn test_streaks_of_empty_history() {
        assert_eq!(compute_streaks(&[], DEFAULT_STREAK_THRESHOLD), Streaks::default());
    }

    #[test]
    fn test_streaks_with_a_break() {
        let history = history_desc(&[90.0, 85.0, 40.0, 95.0, 95.0]);

        let streaks = compute_streaks(&history, DEFAULT_STREAK_THRESHOLD);

        assert_eq!(streaks.current_streak, 2);
        assert_eq!(streaks.best_streak, 2);
    }

    #[test]
    fn test_streaks_all_above_threshold() {
        let history = history_desc(&[95.0, 95.0, 95.0]);

        let streaks = compute_streaks(&history, DEFAULT_STREAK_THRESHOLD);

        assert_eq!(streaks.current_streak, 3);
        assert_eq!(streaks.best_streak, 3);
    }

    #[test]
    fn test_streaks_ignore_input_order() {
        let mut history = history_desc(&[80.0, 10.0, 90.0, 90.0, 90.0]);
        history.reverse();

        let streaks = compute_streaks(&history, DEFAULT_STREAK_THRESHOLD);

        assert_eq!(streaks.current_streak, 1);
        assert_eq!(streaks.best_streak, 3);
    }

    #[test]
    fn test_current_streak_is_zero_when_latest_day_missed() {
        let history = history_desc(&[50.0, 100.0, 100.0]);

        let streaks = compute_streaks(&history, DEFAULT_STREAK_THRESHOLD);

        assert_eq!(streaks.current_streak, 0);
        assert_eq!(streaks.best_streak, 2);
    }

    #[test]
    fn test_custom_threshold() {
        let history = history_desc(&[60.0, 70.0, 55.0]);

        assert_eq!(compute_streaks(&history, 60.0).current_streak, 2);
        assert_eq!(compute_streaks(&history, 50.0).current_streak, 3);
    }

    #[test]
    fn test_duplicate_dates_last_entry_wins() {
        let mut history = history_desc(&[90.0, 90.0]);
        let mut duplicate = history[0].clone();
        duplicate.completion_percentage = 20.0;
        history.push(duplicate);

        let streaks = compute_streaks(&history, DEFAULT_STREAK_THRESHOLD);
        let stats = history_stats(&history, DEFAULT_STREAK_THRESHOLD);

        assert_eq!(streaks.current_streak, 0);
        assert_eq!(streaks.best_streak, 1);
        assert_eq!(stats.total_days, 2);
        assert_eq!(stats.average_completion, 55);
    }

    #[test]
    fn test_statistics_are_idempotent() {
        let history = history_desc(&[90.0, 85.0, 40.0, 95.0, 95.0]);
        let tasks = vec![task(true), task(false)];

        assert_eq!(
            compute_streaks(&history, DEFAULT_STREAK_THRESHOLD),
            compute_streaks(&history, DEFAULT_STREAK_THRESHOLD)
        );
        assert_eq!(compute_progress(&tasks), compute_progress(&tasks));
    }

    #[test]
    fn test_history_stats() {
        let history = history_desc(&[90.0, 85.0, 40.0, 95.0, 95.0]);

        let stats = history_stats(&history, DEFAULT_STREAK_THRESHOLD);

        assert_eq!(
            stats,
            HistoryStats {
                total_days: 5,
                average_completion: 81,
                best_streak: 2,
                current_streak: 2,
            }
        );
        assert_eq!(history_stats(&[], DEFAULT_STREAK_THRESHOLD), HistoryStats::default());
    }

    #[test]
    fn test_sorted_history_is_newest_first() {
        let mut history = history_desc(&[10.0, 20.0, 30.0]);
        history.swap(0, 2);

        let sorted = sorted_history(&history);

        let percentages: Vec<f64> = sorted.iter().map(|e| e.completion_percentage).collect();
        assert_eq!(percentages, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_aggregate_matches_single_computation() {
        let mut per_entity = HashMap::new();
        per_entity.insert("alice".to_string(), vec![task(true), task(true), task(false)]);
        per_entity.insert("bob".to_string(), vec![]);
        per_entity.insert("carol".to_string(), vec![task(false)]);

        let aggregated = aggregate_multi_progress(&per_entity);

        assert_eq!(aggregated.len(), 3);
        for (id, tasks) in &per_entity {
            assert_eq!(aggregated[id], compute_progress(tasks));
        }
    }

    #[test]
    fn test_grades() {
        assert_eq!(CompletionGrade::of(80.0), CompletionGrade::OnTrack);
        assert_eq!(CompletionGrade::of(79.9), CompletionGrade::Fair);
        assert_eq!(CompletionGrade::of(60.0), CompletionGrade::Fair);
        assert_eq!(CompletionGrade::of(0.0), CompletionGrade::Behind);
        assert_eq!(Progress::from_counts(2, 3).grade(), CompletionGrade::Fair);
    }

    #[test]
    fn test_members_and_friends_progress() {
        let group = GroupProgress {
            group_id: "g1".to_string(),
            group_name: "Runners".to_string(),
            total_tasks: 5,
            completed_tasks: 3,
            completion_percentage: 60.0,
            members_progress: vec![
                MemberProgress {
                    user_id: "alice".to_string(),
                    user_name: "Alice".to_string(),
                    completed_tasks: 2,
                    total_tasks: 3,
                },
                MemberProgress {
                    user_id: "bob".to_string(),
                    user_name: "Bob".to_string(),
                    completed_tasks: 0,
                    total_tasks: 0,
                },
            ],
        };

        let members = members_progress(&group);

        assert_eq!(members[0], ("Alice".to_string(), Progress::from_counts(2, 3)));
        assert_eq!(members[1].1.percentage, 0);

        let friends = vec![FriendProgress {
            friend: Friend {
                id: "bob".to_string(),
                email: "bob@example.com".to_string(),
                display_name: None,
                username: None,
            },
            tasks: vec![task(true), task(false), task(false), task(false)],
            stats: ProgressStats {
                total_tasks: 4,
                completed_tasks: 1,
                completion_percentage: 25.0,
            },
        }];

        let progress = friends_progress(&friends);

        assert_eq!(progress["bob"].percentage, 25);
        assert_eq!(Progress::from(&friends[0].stats), progress["bob"]);
    }
}
