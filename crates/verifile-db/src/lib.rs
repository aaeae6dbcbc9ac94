//! Verifile database layer
//!
//! PostgreSQL-backed implementations of the persistence seams defined in
//! `verifile-core`. Queries are built at runtime so the crate compiles without
//! a live database.

pub mod db;

pub use db::PgOtpStore;
