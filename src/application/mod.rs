pub mod auth;
pub mod error;
pub mod jobs;
pub mod pagination;
pub mod repos;
pub mod resumes;
pub mod users;
pub mod validation;
