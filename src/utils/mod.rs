//! Utility functions and types

pub mod quantile;

pub use quantile::{ascending_order, count_distinct, descending_order, quantile_linear, rank_bucket, right_closed_bin, sorted};
