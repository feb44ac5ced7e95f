// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Cholo Pay Node
//!
//! Entry point for the `cholo-node` binary. Parses CLI arguments,
//! initializes logging, opens the ledger and runs one operation.
//!
//! Output contract:
//!
//! - success: the operation's result as pretty JSON on stdout, exit 0
//! - ledger error: `{"error": ..., "kind": ...}` on stdout, non-zero exit
//!   (see [`exit_code`])
//! - anything else (unreadable data dir, bad flags): anyhow report on
//!   stderr, exit 1

mod cli;
mod logging;

use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};

use cholo_ledger::model::OwnerSettings;
use cholo_ledger::validity::parse_instant;
use cholo_ledger::{LedgerError, LedgerResult, LedgerStore, TransitLedger};

use cli::{CholoNodeCli, Commands};

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "cholo_node=info,cholo_ledger=info";

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = CholoNodeCli::parse();

    if let Commands::Version = cli.command {
        print_version();
        return Ok(ExitCode::SUCCESS);
    }

    logging::init_logging(DEFAULT_LOG_FILTER, cli.log_format);

    let config = cli.ledger.to_config();
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!(
            "failed to create data directory: {}",
            config.data_dir.display()
        )
    })?;

    let db_path = config.db_path();
    let ledger = TransitLedger::open(config)
        .with_context(|| format!("failed to open ledger at {}", db_path.display()))?;

    let outcome = execute(&ledger, cli.command).await;
    let code = match &outcome {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(exit_code(e)),
    };
    println!("{}", render(outcome)?);
    Ok(code)
}

/// Runs one subcommand against the ledger and returns its JSON result.
async fn execute<S: LedgerStore>(ledger: &TransitLedger<S>, command: Commands) -> LedgerResult<Value> {
    match command {
        Commands::Init => {
            let config = ledger.config();
            Ok(json!({
                "initialized": true,
                "dataDir": config.data_dir,
                "dbPath": config.db_path(),
            }))
        }
        Commands::RegisterRider {
            rider_id,
            name,
            email,
            balance,
        } => to_json(ledger.register_rider(&rider_id, &name, &email, balance).await?),
        Commands::RegisterOwner {
            owner_id,
            name,
            email,
            vehicle,
            fare,
        } => to_json(
            ledger
                .register_owner(&owner_id, &name, &email, &vehicle, fare)
                .await?,
        ),
        Commands::Rider { rider_id } => to_json(ledger.rider(&rider_id).await?),
        Commands::Owner { owner_id } => to_json(ledger.owner(&owner_id).await?),
        Commands::Fare { vehicle_id } => to_json(ledger.resolve_fare(&vehicle_id).await?),
        Commands::Pay {
            rider_id,
            vehicle_id,
        } => to_json(ledger.pay(&rider_id, &vehicle_id).await?),
        Commands::Tickets { rider_id } => to_json(ledger.tickets_for_rider(&rider_id).await),
        Commands::OwnerTickets { owner_id, status } => {
            let tickets = match status {
                Some(state) => ledger.tickets_for_owner_by_state(&owner_id, state).await,
                None => ledger.tickets_for_owner(&owner_id).await,
            };
            to_json(tickets)
        }
        Commands::CheckTicket { ticket_id, at } => {
            let report = match at {
                Some(raw) => {
                    let now = Local::now();
                    let reference = now.with_timezone(now.offset());
                    let at = parse_instant(&raw, &reference)?;
                    ledger.check_ticket_at(&ticket_id, at).await?
                }
                None => ledger.check_ticket(&ticket_id).await?,
            };
            to_json(report)
        }
        Commands::UpdateSettings {
            owner_id,
            fare,
            validity_minutes,
        } => {
            let settings = OwnerSettings {
                fixed_fare: fare,
                ticket_validity_minutes: validity_minutes,
            };
            let applied = ledger.update_owner_settings(&owner_id, settings).await?;
            Ok(json!({ "ownerId": owner_id, "updated": applied }))
        }
        Commands::ResyncEarnings { owner_id } => {
            to_json(ledger.resync_owner_earnings(&owner_id).await?)
        }
        Commands::AuditEarnings { owner_id } => {
            to_json(ledger.audit_owner_earnings(&owner_id).await?)
        }
        Commands::InvalidateTicket { ticket_id, status } => {
            to_json(ledger.invalidate_ticket(&ticket_id, &status).await?)
        }
        Commands::Version => Ok(json!({ "version": env!("CARGO_PKG_VERSION") })),
    }
}

fn to_json<T: Serialize>(value: T) -> LedgerResult<Value> {
    serde_json::to_value(value).map_err(|e| LedgerError::Serialization(e.to_string()))
}

/// Pretty JSON for stdout: the result itself, or an error object.
fn render(outcome: LedgerResult<Value>) -> Result<String> {
    let value = match outcome {
        Ok(value) => value,
        Err(e) => json!({ "error": e.to_string(), "kind": error_kind(&e) }),
    };
    serde_json::to_string_pretty(&value).context("failed to render result")
}

fn error_kind(e: &LedgerError) -> &'static str {
    match e {
        LedgerError::RiderNotFound(_)
        | LedgerError::OwnerNotFound(_)
        | LedgerError::VehicleNotFound(_)
        | LedgerError::TicketNotFound(_) => "notFound",
        LedgerError::InsufficientFunds { .. } => "insufficientFunds",
        LedgerError::Validation(_) => "validation",
        LedgerError::StoreUnavailable(_) | LedgerError::Serialization(_) => "storeUnavailable",
    }
}

/// Process exit status for a ledger error.
///
/// | code | meaning            |
/// |------|--------------------|
/// | 2    | validation         |
/// | 3    | not found          |
/// | 4    | insufficient funds |
/// | 5    | store unavailable  |
fn exit_code(e: &LedgerError) -> u8 {
    match error_kind(e) {
        "validation" => 2,
        "notFound" => 3,
        "insufficientFunds" => 4,
        _ => 5,
    }
}

/// Prints version information to stdout.
fn print_version() {
    println!("cholo-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cholo_ledger::{LedgerConfig, LedgerDb, SystemClock};

    fn ledger() -> TransitLedger<LedgerDb> {
        let config = LedgerConfig {
            flush_on_commit: false,
            ..LedgerConfig::default()
        };
        let store = Arc::new(LedgerDb::open_temporary().unwrap());
        TransitLedger::new(store, config, Arc::new(SystemClock))
    }

    async fn run(ledger: &TransitLedger<LedgerDb>, args: &[&str]) -> LedgerResult<Value> {
        let argv = std::iter::once("cholo-node").chain(args.iter().copied());
        let cli = CholoNodeCli::try_parse_from(argv).expect("valid arguments");
        execute(ledger, cli.command).await
    }

    #[tokio::test]
    async fn register_pay_and_list() {
        let ledger = ledger();
        run(&ledger, &["register-rider", "r1", "--name", "Asha", "--email", "a@x"])
            .await
            .unwrap();
        run(
            &ledger,
            &["register-owner", "o1", "--name", "Ravi", "--email", "r@x", "--vehicle", "BUS-1", "--fare", "15"],
        )
        .await
        .unwrap();

        let fare = run(&ledger, &["fare", "BUS-1"]).await.unwrap();
        assert_eq!(fare["fare"], 15);

        let receipt = run(&ledger, &["pay", "r1", "BUS-1"]).await.unwrap();
        assert_eq!(receipt["newBalance"], 485);
        let ticket_id = receipt["ticketId"].as_str().unwrap().to_string();

        let tickets = run(&ledger, &["owner-tickets", "o1", "--status", "active"])
            .await
            .unwrap();
        assert_eq!(tickets[0]["ticketId"], ticket_id.as_str());
        assert_eq!(tickets[0]["riderName"], "Asha");

        let check = run(&ledger, &["check-ticket", &ticket_id]).await.unwrap();
        assert_eq!(check["isValid"], true);

        let far_future = run(
            &ledger,
            &["check-ticket", &ticket_id, "--at", "2999-01-01T00:00:00Z"],
        )
        .await
        .unwrap();
        assert_eq!(far_future["isValid"], false);

        let resync = run(&ledger, &["resync-earnings", "o1"]).await.unwrap();
        assert_eq!(resync["totalRevenue"], 15);
        assert_eq!(resync["ticketCount"], 1);
    }

    #[tokio::test]
    async fn errors_render_with_kind_and_exit_code() {
        let ledger = ledger();
        let err = run(&ledger, &["pay", "ghost", "BUS-9"]).await.unwrap_err();
        assert_eq!(exit_code(&err), 3);

        let rendered: Value = serde_json::from_str(&render(Err(err)).unwrap()).unwrap();
        assert_eq!(rendered["kind"], "notFound");
        assert!(rendered["error"].as_str().unwrap().contains("BUS-9"));

        let err = run(&ledger, &["update-settings", "o1"]).await.unwrap_err();
        assert_eq!(exit_code(&err), 2);

        let err = run(&ledger, &["check-ticket", "t1", "--at", "tomorrow"])
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn insufficient_funds_has_its_own_code() {
        let err = LedgerError::InsufficientFunds {
            required: 10,
            available: 5,
        };
        assert_eq!(exit_code(&err), 4);
        assert_eq!(exit_code(&LedgerError::StoreUnavailable("down".into())), 5);
    }

    #[tokio::test]
    async fn init_reports_paths() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig {
            data_dir: dir.path().to_path_buf(),
            ..LedgerConfig::default()
        };
        let ledger = TransitLedger::open(config).unwrap();
        let out = execute(&ledger, Commands::Init).await.unwrap();
        assert_eq!(out["initialized"], true);
        assert!(out["dbPath"].as_str().unwrap().ends_with("ledger-db"));
    }
}
