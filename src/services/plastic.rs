// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Plastic bottle redemption codes.
//!
//! Vendor machines print a 6-character code per deposited bottle. Codes are
//! single-use; the one-time registry lives in the `redemption_codes`
//! collection and is claimed atomically with the credit.

use crate::error::{AppError, Result};

/// Length of a bottle code.
pub const CODE_LEN: usize = 6;
/// Eco-points per recycled bottle.
pub const BOTTLE_POINTS: u32 = 15;

/// Trim, uppercase and check a bottle code.
pub fn normalize_code(raw: &str) -> Result<String> {
    let code = raw.trim().to_ascii_uppercase();

    if code.chars().count() != CODE_LEN {
        return Err(AppError::BadRequest(format!(
            "Code must be exactly {} characters",
            CODE_LEN
        )));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::BadRequest(
            "Code may only contain letters and digits".to_string(),
        ));
    }

    Ok(code)
}
