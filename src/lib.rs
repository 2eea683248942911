//! Job board backend: accounts, job postings, resume uploads and a
//! read-through cache for job listings.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
