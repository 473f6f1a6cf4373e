use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde_json::json;

use crate::cli::Commands;
use crate::main_lib::AppState;
use secmaster_core::securities::{ResolveOutcome, ResolveRequest};

pub async fn run(command: Commands, state: &AppState) -> anyhow::Result<()> {
    let service = &state.security_master;

    match command {
        Commands::Resolve {
            identifier_type,
            identifier_value,
            exchange,
            currency,
            no_create,
        } => {
            let request = ResolveRequest {
                identifier_type,
                identifier_value,
                exchange,
                currency,
            };
            let outcome = match service.resolve(&request, !no_create).await? {
                Some(resolved) => ResolveOutcome::Resolved(resolved),
                None => ResolveOutcome::NotFound,
            };
            print_json(&outcome)
        }
        Commands::ResolveBatch { input, no_create } => {
            let requests = read_requests(&input)?;
            tracing::info!("Resolving {} identifiers", requests.len());
            let outcomes = service.resolve_many(requests, !no_create).await;
            print_json(&outcomes)
        }
        Commands::Enrich { security_id } => {
            let changed = service.enrich(&security_id).await?;
            print_json(&json!({ "securityId": security_id, "changed": changed }))
        }
        Commands::Search { query, limit } => print_json(&service.search(&query, limit).await),
        Commands::Show { security_id } => {
            let security = service.get_security(&security_id)?;
            let identifiers = service.list_identifiers(&security_id)?;
            print_json(&json!({ "security": security, "identifiers": identifiers }))
        }
        Commands::Deactivate { security_id } => {
            service.deactivate(&security_id).await?;
            print_json(&json!({ "securityId": security_id, "active": false }))
        }
    }
}

fn read_requests(input: &Path) -> anyhow::Result<Vec<ResolveRequest>> {
    let raw = if input.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read requests from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?
    };
    parse_requests(&raw)
}

fn parse_requests(raw: &str) -> anyhow::Result<Vec<ResolveRequest>> {
    serde_json::from_str(raw).context("Expected a JSON array of resolve requests")
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
