//! API module
//!
//! Contains HTTP request handlers for the try-on pipeline endpoint

pub mod tryon;
