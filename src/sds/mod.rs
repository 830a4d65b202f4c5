//! Sequential Data Store REST client module
//!
//! Structure:
//! - `transport.rs`: HTTP seam (`HttpTransport`) and the `reqwest` implementation
//! - `token.rs`: OAuth2 client-credentials token cache
//! - `client.rs`: authenticated GETs against the versioned REST API
//! - `addressing.rs`: account vs tenant base-path conventions
//! - `types.rs`: streams, type definitions, type codes
//! - `coercion.rs`: type-code → column/decode table
//! - `frame.rs`: typed result frames and Polars conversion
//! - `schema.rs` / `query.rs`: the two query operations
//! - `error.rs`: Error types

pub mod addressing;
pub mod client;
pub mod coercion;
pub mod error;
pub mod frame;
pub mod query;
pub mod schema;
pub mod token;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use addressing::{Addressing, Scope};
pub use client::SdsClient;
pub use coercion::{CellValue, ColumnData, DecodePolicy};
pub use error::{Result, SdsError};
pub use frame::{build_frame, DataRecord, FrameColumn, ResultFrame};
pub use query::{fetch_stream_data, list_streams};
pub use schema::resolve_schema;
pub use token::{Credentials, TokenManager};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
pub use types::{Property, Stream, TypeCode, TypeDefinition};
