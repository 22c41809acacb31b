//! Deadline-miss analysis of network simulator flow logs.
//!
//! Reads one flow-completion log per protocol, keeps the flows inside an
//! observation window, buckets them by size and reports mean / p99 flow
//! completion time together with deadline miss ratios.

pub mod analyzer;
pub mod common;
pub mod output;
