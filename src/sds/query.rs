//! Query orchestration: stream listing and range-bounded data fetches
//!
//! Both operations take a ready-to-use `Authorization` value. Whether it came
//! from the token manager or was passed through from the caller is decided
//! one level up, in the data source.

use super::client::SdsClient;
use super::coercion::{ColumnData, DecodePolicy};
use super::error::Result;
use super::frame::{build_frame, DataRecord, FrameColumn, ResultFrame};
use super::schema::resolve_schema;
use super::types::Stream;
use tracing::debug;
use urlencoding::encode;

/// Frame name used for listings and unrecognized queries
pub const DEFAULT_FRAME_NAME: &str = "response";

/// List streams matching a server-side filter as an `Id`/`Name` frame
pub async fn list_streams(client: &SdsClient, token: &str, filter: &str) -> Result<ResultFrame> {
    let path = format!("{}/streams?query={}", client.base_path(), encode(filter));
    let streams: Vec<Stream> = client.fetch_json(token, &path).await?;

    debug!("Stream listing returned {} streams", streams.len());

    let (ids, names): (Vec<_>, Vec<_>) = streams
        .into_iter()
        .map(|s| (Some(s.id), Some(s.name)))
        .unzip();

    Ok(ResultFrame {
        name: DEFAULT_FRAME_NAME.to_string(),
        columns: vec![
            FrameColumn {
                name: "Id".to_string(),
                data: ColumnData::String(ids),
            },
            FrameColumn {
                name: "Name".to_string(),
                data: ColumnData::String(names),
            },
        ],
    })
}

/// Fetch a stream's values between two inclusive index bounds
///
/// The bounds are opaque index values (usually RFC3339 timestamps) passed
/// through URL-escaped. The frame is named after the stream.
pub async fn fetch_stream_data(
    client: &SdsClient,
    token: &str,
    stream_id: &str,
    start_index: &str,
    end_index: &str,
    policy: DecodePolicy,
) -> Result<ResultFrame> {
    let (stream, type_def) = resolve_schema(client, token, stream_id).await?;

    let path = format!(
        "{}/streams/{}/Data?startIndex={}&endIndex={}",
        client.base_path(),
        encode(stream_id),
        encode(start_index),
        encode(end_index)
    );
    let records: Vec<DataRecord> = client.fetch_json(token, &path).await?;

    debug!(
        "Stream '{}' returned {} records for [{}, {}]",
        stream_id,
        records.len(),
        start_index,
        end_index
    );

    build_frame(&stream.name, &type_def, &records, policy)
}
