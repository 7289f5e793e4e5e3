//! Shared helpers for integration tests.

pub mod atexit_cleanup;
mod cluster_skip;

pub use cluster_skip::handle_cluster_setup_failure;

/// Connection string of an externally managed database, if one is provided.
///
/// When `TEST_DATABASE_URL` is set the PostgreSQL suites run against it
/// instead of bootstrapping the embedded cluster.
pub fn external_database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
}

/// A name unlikely to collide with rows left by earlier runs.
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}
