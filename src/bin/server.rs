//! pir-server: standalone PIR service speaking the invoke envelope.
//!
//! Every method rides one `POST /invoke` route carrying
//! `{"method": ..., "args": [...]}` and returning `{"response": ...}` or
//! `{"error": ...}`, so any transport that can deliver opaque strings can
//! front the same core.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use cti_pir::{MemoryStore, ParamHint, PirError, PirLedger};

#[derive(Parser)]
#[command(name = "pir-server")]
#[command(about = "BGV PIR server over an in-memory ledger")]
#[command(version)]
struct Args {
    /// Listening endpoint.
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,
}

#[derive(Deserialize)]
struct InvokeRequest {
    method: String,
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Serialize)]
struct InvokeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

type AppState = Arc<PirLedger<MemoryStore>>;

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn invoke(
    State(ledger): State<AppState>,
    Json(request): Json<InvokeRequest>,
) -> (StatusCode, Json<InvokeResponse>) {
    match dispatch(&ledger, &request) {
        Ok(response) => (
            StatusCode::OK,
            Json(InvokeResponse {
                response: Some(response),
                error: None,
            }),
        ),
        Err(err) => (
            StatusCode::BAD_REQUEST,
            Json(InvokeResponse {
                response: None,
                error: Some(err.to_string()),
            }),
        ),
    }
}

fn dispatch(ledger: &AppState, request: &InvokeRequest) -> Result<String, PirError> {
    match request.method.as_str() {
        "InitLedger" => init_ledger(ledger, &request.args),
        "GetMetadata" => {
            expect_arity(&request.args, 0, "GetMetadata")?;
            let meta = ledger.get_metadata()?;
            serde_json::to_string(&meta).map_err(|e| PirError::InvalidArguments(e.to_string()))
        }
        "PublicQuery" => {
            expect_arity(&request.args, 1, "PublicQuery")?;
            let bytes = ledger.public_get(&request.args[0])?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        "PIRQuery" => {
            expect_arity(&request.args, 1, "PIRQuery")?;
            ledger.pir_query(&request.args[0])
        }
        other => Err(PirError::InvalidArguments(format!(
            "unknown method {}",
            other
        ))),
    }
}

/// `InitLedger n maxJSON [logN] [logQi] [logPi] [t]`: tail arguments are
/// positional and optional; an empty string means "use the default".
fn init_ledger(ledger: &AppState, args: &[String]) -> Result<String, PirError> {
    if args.len() < 2 || args.len() > 6 {
        return Err(PirError::InvalidArguments(format!(
            "InitLedger takes 2 to 6 arguments, got {}",
            args.len()
        )));
    }

    let n_records = parse_decimal(&args[0], "numRecords")?;
    let max_json = parse_decimal(&args[1], "maxJSON")?;

    let hint = ParamHint {
        log_n: tail_arg(args, 2)
            .map(|v| parse_decimal(v, "logN"))
            .transpose()?,
        log_qi: tail_arg(args, 3).map(|v| parse_sizes(v, "logQi")).transpose()?,
        log_pi: tail_arg(args, 4).map(|v| parse_sizes(v, "logPi")).transpose()?,
        t: tail_arg(args, 5)
            .map(|v| {
                v.parse::<u64>()
                    .map_err(|_| PirError::InvalidArguments(format!("t must be an integer, got {:?}", v)))
            })
            .transpose()?,
    };

    let meta = ledger.init(n_records, max_json, &hint)?;
    Ok(format!(
        "ledger initialised with {} records (logN={}) using slotsPerRec={}",
        meta.n_records, meta.log_n, meta.record_s
    ))
}

fn expect_arity(args: &[String], expected: usize, method: &str) -> Result<(), PirError> {
    if args.len() != expected {
        return Err(PirError::InvalidArguments(format!(
            "{} takes {} argument(s), got {}",
            method,
            expected,
            args.len()
        )));
    }
    Ok(())
}

fn tail_arg(args: &[String], index: usize) -> Option<&str> {
    args.get(index).map(String::as_str).filter(|v| !v.is_empty())
}

fn parse_decimal(value: &str, name: &str) -> Result<usize, PirError> {
    value.parse::<usize>().ok().filter(|&v| v > 0).ok_or_else(|| {
        PirError::InvalidArguments(format!("{} must be a positive integer, got {:?}", name, value))
    })
}

fn parse_sizes(value: &str, name: &str) -> Result<Vec<usize>, PirError> {
    serde_json::from_str(value).map_err(|_| {
        PirError::InvalidArguments(format!("{} must be a JSON array of integers, got {:?}", name, value))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let ledger: AppState = Arc::new(PirLedger::new(MemoryStore::new()));

    let app = Router::new()
        .route("/health", get(health))
        .route("/invoke", post(invoke))
        .with_state(ledger);

    info!("PIR server starting on {}", args.bind);
    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;

    println!();
    println!("=== PIR Server Running ===");
    println!("Listening on: http://{}", args.bind);
    println!();
    println!("Methods (POST /invoke):");
    println!("  InitLedger n maxJSON [logN] [logQi] [logPi] [t]");
    println!("  GetMetadata");
    println!("  PublicQuery key");
    println!("  PIRQuery encQueryB64");
    println!();

    axum::serve(listener, app).await?;

    Ok(())
}
