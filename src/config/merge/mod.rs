//! Config composition: defaults plus ordered sources.

pub mod policy;
pub mod service;
