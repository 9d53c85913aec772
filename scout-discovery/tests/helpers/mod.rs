//! Test helper utilities
//!
//! Shared fakes, database setup, and throwaway HTTP servers for the
//! scout-discovery integration tests

#![allow(dead_code)]

pub mod db_utils;
pub mod fakes;
pub mod mock_server;

pub use db_utils::{count_rows, create_test_store, seed_catalog_artist};
pub use fakes::{
    FakeCoverArt, FakeDetails, FakeFeed, FakeJobs, FakeNaming, FakeProvider, FakeResolver,
    FakeSource,
};
pub use mock_server::spawn_server;
