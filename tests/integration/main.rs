//! Integration tests for poly-alert

mod common;
mod e2e_test;
mod feed_test;
mod market_test;
