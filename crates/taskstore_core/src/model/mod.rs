//! Domain model for the task store.
//!
//! # Responsibility
//! - Define the canonical `Task` record shared by every backend.
//!
//! # Invariants
//! - Every stored task is identified by a repository-assigned `TaskId`.
//! - Task ids are never reused within one repository lifetime.

pub mod task;
