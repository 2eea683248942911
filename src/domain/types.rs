//! Shared domain enumerations aligned with persisted database enums.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_type")]
pub enum JobType {
    #[serde(rename = "Full-Time")]
    #[sqlx(rename = "Full-Time")]
    FullTime,
    #[serde(rename = "Part-Time")]
    #[sqlx(rename = "Part-Time")]
    PartTime,
    Internship,
    Contract,
}

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::FullTime,
        JobType::PartTime,
        JobType::Internship,
        JobType::Contract,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            JobType::FullTime => "Full-Time",
            JobType::PartTime => "Part-Time",
            JobType::Internship => "Internship",
            JobType::Contract => "Contract",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for JobType {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        JobType::ALL
            .into_iter()
            .find(|job_type| job_type.as_str() == value)
            .ok_or_else(|| DomainError::unknown_variant("job type", value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role")]
pub enum UserRole {
    #[serde(rename = "HR")]
    #[sqlx(rename = "HR")]
    Hr,
    #[serde(rename = "jobSeeker")]
    #[sqlx(rename = "jobSeeker")]
    JobSeeker,
}

impl UserRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            UserRole::Hr => "HR",
            UserRole::JobSeeker => "jobSeeker",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for UserRole {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "HR" => Ok(UserRole::Hr),
            "jobSeeker" => Ok(UserRole::JobSeeker),
            other => Err(DomainError::unknown_variant("user role", other)),
        }
    }
}
