//! API handlers grouped by resource.

mod jobs;
mod resumes;
mod users;

pub use jobs::*;
pub use resumes::*;
pub use users::*;

use super::error::ApiError;

/// Job and resume ids arrive as path or query strings.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::bad_request("Invalid id"))
}
