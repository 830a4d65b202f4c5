//! Stream → type definition resolution

use super::client::SdsClient;
use super::error::Result;
use super::types::{Stream, TypeDefinition};
use tracing::debug;
use urlencoding::encode;

/// Fetch a stream's metadata, then the type it references
///
/// Both lookups must succeed; there is no partial result.
pub async fn resolve_schema(
    client: &SdsClient,
    token: &str,
    stream_id: &str,
) -> Result<(Stream, TypeDefinition)> {
    let base = client.base_path();

    let stream: Stream = client
        .fetch_json(token, &format!("{}/streams/{}", base, encode(stream_id)))
        .await?;

    let type_def: TypeDefinition = client
        .fetch_json(token, &format!("{}/types/{}", base, encode(&stream.type_id)))
        .await?;

    debug!(
        "Resolved stream '{}' to type '{}' with {} properties",
        stream.id,
        type_def.id,
        type_def.properties.len()
    );

    Ok((stream, type_def))
}
