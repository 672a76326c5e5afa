// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod admin;
pub mod password;
pub mod plastic;
pub mod rewards;
pub mod transport;
pub mod tree;
pub mod walk;

pub use activity::{ActivityService, TransportSubmission, TreeSubmission};
pub use transport::RoutingService;
pub use tree::TreeClassifier;
