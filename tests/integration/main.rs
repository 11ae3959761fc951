//! Integration tests for Harvest

mod crawl_tests;
