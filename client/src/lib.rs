// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.

//! Client for the Daily Check-In backend: typed API access, local state
//! with optimistic updates, and terminal renderings.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod store;
pub mod views;

pub use api::{ApiClient, Saved};
pub use auth::{EnvToken, StaticToken, TokenProvider};
pub use config::ClientConfig;
pub use error::ApiError;
pub use store::{Action, AppState, Resource, Session, StoreError, reduce};
