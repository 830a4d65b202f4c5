//! SDS Data Source Library
//!
//! Queries a Sequential Data Store over its REST API and renders streams as
//! typed columnar frames for a visualization host.

pub mod config;
pub mod datasource;
pub mod sds;
