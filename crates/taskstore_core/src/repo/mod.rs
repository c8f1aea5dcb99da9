//! Repository layer: task store contract and its two backends.
//!
//! # Responsibility
//! - Define the `TaskRepository` contract consumed by callers.
//! - Provide in-memory and SQLite implementations with identical semantics.
//!
//! # Invariants
//! - Every operation runs under one exclusive lock for its whole duration.
//! - Repository APIs return semantic `NotFound` errors in addition to
//!   storage failures; storage failures are never swallowed.

pub mod memory_repo;
pub mod sqlite_repo;
pub mod task_repo;
