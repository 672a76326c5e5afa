// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! EcoTrack: earn eco-points for walking, planting trees, riding public
//! transport and recycling plastic.
//!
//! This crate provides the backend API: account registration and login,
//! server-side verification of each activity kind, an idempotent point
//! ledger, and reward claims.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::{ActivityService, RoutingService, TreeClassifier};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub routing: RoutingService,
    pub activities: ActivityService,
}

impl AppState {
    /// Wire services for a configuration and database.
    pub fn new(config: Config, db: Database) -> Self {
        let routing = RoutingService::from_config(&config);
        let classifier = TreeClassifier::from_config(&config);
        let activities = ActivityService::new(db.clone(), classifier, routing.clone());

        Self {
            config,
            db,
            routing,
            activities,
        }
    }
}
