//! Service plumbing.

pub mod http;
