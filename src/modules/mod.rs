//! Modules layer - Infrastructure components behind the features
//!
//! Contains adapters for where document payloads physically live.

pub mod storage;
