//! `PostgreSQL` spot store for Box Office.
//!
//! [`PostgresSpotStore`] implements [`boxoffice_core::SpotStore`] on top of a
//! sqlx connection pool. Every operation runs in one transaction, and spot
//! contention is settled by row locks:
//!
//! - reserve locks the requested spot rows (`FOR UPDATE`, in id order so two
//!   overlapping requests cannot deadlock) and only flips them if all are
//!   `available`
//! - confirm and release lock the reservation row first, which serializes
//!   them against each other and against the sweeper
//! - the stale sweep uses `FOR UPDATE SKIP LOCKED` so it never waits on a
//!   purchase that is resolving its own hold
//!
//! # Example
//!
//! ```no_run
//! use boxoffice_postgres::PostgresSpotStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = sqlx::PgPool::connect("postgres://localhost/boxoffice").await?;
//! let store = PostgresSpotStore::new(pool);
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod rows;
mod store;

pub use store::PostgresSpotStore;
