//! SDS data source CLI
//!
//! Runs the data source outside a visualization host: health checks, stream
//! listings and range queries, printing each frame as a table.
//!
//! Usage:
//!   sds-datasource [--resource URL] [--tenantId ID] [--namespaceId ID] ... health
//!   sds-datasource [...] streams [FILTER]
//!   sds-datasource [...] data STREAM_ID FROM TO

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Utc};
use sds_datasource::config::SdsSettings;
use sds_datasource::datasource::{
    DataQuery, HealthStatus, QueryDataRequest, SdsDataSource, TimeRange,
};
use serde_json::json;
use std::collections::HashMap;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "jemalloc")]
use tikv_jemallocator::Jemalloc;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    info!("SDS data source v{}", env!("CARGO_PKG_VERSION"));

    // Flags become SDS_* environment variables; what remains is the command
    let args: Vec<String> = std::env::args().collect();
    let command = parse_args(&args);

    let settings = SdsSettings::from_env().context("loading settings")?;
    info!("Settings: {:?}", settings);

    let datasource = SdsDataSource::new(&settings).context("creating data source")?;

    match command.first().map(String::as_str) {
        Some("health") | None => {
            let result = datasource.check_health().await;
            println!("{:?}: {}", result.status, result.message);
            if let Some(details) = &result.details {
                println!("  {}", details);
            }
            if result.status == HealthStatus::Error {
                std::process::exit(1);
            }
        }
        Some("streams") => {
            let filter = command.get(1).cloned().unwrap_or_default();
            let query = json!({"collection": "streams", "queryText": filter});
            run_query(&datasource, query, default_range()).await?;
        }
        Some("data") => {
            let [_, id, from, to] = command.as_slice() else {
                bail!("usage: data STREAM_ID FROM TO");
            };
            let range = TimeRange {
                from: parse_time(from)?,
                to: parse_time(to)?,
            };
            let query = json!({"collection": "streams", "id": id});
            run_query(&datasource, query, range).await?;
        }
        Some(other) => bail!("unknown command '{}' (expected health, streams or data)", other),
    }

    Ok(())
}

/// Move known `--flag value` pairs into environment variables
///
/// Returns the remaining positional arguments.
fn parse_args(args: &[String]) -> Vec<String> {
    const FLAGS: [(&str, &str); 11] = [
        ("--resource", "SDS_RESOURCE"),
        ("--apiVersion", "SDS_API_VERSION"),
        ("--addressing", "SDS_ADDRESSING"),
        ("--tenantId", "SDS_TENANT_ID"),
        ("--accountId", "SDS_ACCOUNT_ID"),
        ("--namespaceId", "SDS_NAMESPACE_ID"),
        ("--communityId", "SDS_COMMUNITY_ID"),
        ("--sdsId", "SDS_SDS_ID"),
        ("--clientId", "SDS_CLIENT_ID"),
        ("--clientSecret", "SDS_CLIENT_SECRET"),
        ("--decodePolicy", "SDS_DECODE_POLICY"),
    ];

    let mut positional = Vec::new();
    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        match FLAGS.iter().find(|(flag, _)| *flag == arg) {
            Some((_, var)) if i + 1 < args.len() => {
                std::env::set_var(var, &args[i + 1]);
                i += 2;
            }
            _ if arg == "--useCommunity" => {
                std::env::set_var("SDS_USE_COMMUNITY", "true");
                i += 1;
            }
            _ => {
                positional.push(args[i].clone());
                i += 1;
            }
        }
    }
    positional
}

async fn run_query(
    datasource: &SdsDataSource,
    json: serde_json::Value,
    time_range: TimeRange,
) -> anyhow::Result<()> {
    let request = QueryDataRequest {
        headers: HashMap::new(),
        queries: vec![DataQuery {
            ref_id: "A".to_string(),
            json,
            time_range,
        }],
    };

    let response = datasource.query_data(&request).await?;
    let data = response
        .responses
        .get("A")
        .ok_or_else(|| anyhow!("no response for query"))?;

    for frame in &data.frames {
        println!("{}", frame.name);
        println!("{}", frame.to_dataframe()?);
    }
    Ok(())
}

fn parse_time(s: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("invalid RFC3339 time '{}'", s))
}

fn default_range() -> TimeRange {
    let to = Utc::now();
    TimeRange {
        from: to - chrono::TimeDelta::hours(1),
        to,
    }
}
