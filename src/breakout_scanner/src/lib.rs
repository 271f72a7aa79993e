//! Scans the exchange's daily reports for securities whose latest session looks
//! like the start of an explosive volume breakout.
//!
//! The pipeline lives in [`scanner`]; the checks themselves in [`detector`].

#![deny(missing_docs)]

pub mod backoff;
pub mod config;
pub mod detector;
pub mod logging;
pub mod retriever;
pub mod scanner;
