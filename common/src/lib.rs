// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.

//! Domain model of the Daily Check-In backend and the statistics derived
//! from it on the client side.

pub mod models;
pub mod progress;

pub use models::*;
pub use progress::{
    Completable, CompletionGrade, DEFAULT_STREAK_THRESHOLD, HistoryStats, Progress, Streaks,
    aggregate_multi_progress, compute_progress, compute_streaks, history_stats,
};
