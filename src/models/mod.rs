// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod ledger;
pub mod reward;
pub mod user;

pub use activity::{
    submission_id, ActivityKind, ActivityRecord, Measurement, TransitionError, TreeSite,
    VerificationStatus,
};
pub use ledger::{InsufficientPoints, PointBalance};
pub use reward::{RedemptionCode, Reward, RewardClaim};
pub use user::Account;
