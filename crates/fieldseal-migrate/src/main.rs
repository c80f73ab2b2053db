//! `fieldseal-migrate` — one-shot migration binary entry point.
//!
//! Reads exported table rows as JSON lines on stdin, encrypts (or
//! re-encrypts) the configured fields, and writes the rows to stdout for
//! loading back into the database. Persistence itself stays outside this
//! tool.
//!
//! Startup sequence:
//! 1. Parse the mode argument.
//! 2. Load and validate configuration; decode the encryption key.
//! 3. Initialise structured JSON logging (stderr).
//! 4. Stream stdin → stdout, transforming configured fields per row.

mod config;
mod migrate;
mod telemetry;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use fieldseal::FieldCipher;
use migrate::Mode;

fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Mode
    // -----------------------------------------------------------------------
    let mode = match std::env::args().nth(1).as_deref() {
        Some("encrypt-existing") => Mode::EncryptExisting,
        Some("reencrypt") => Mode::Reencrypt,
        _ => {
            eprintln!("usage: fieldseal-migrate <encrypt-existing|reencrypt>");
            eprintln!("  reads JSON-lines rows on stdin, writes transformed rows to stdout");
            anyhow::bail!("missing or unknown mode argument");
        }
    };

    // -----------------------------------------------------------------------
    // 2. Configuration + key
    // -----------------------------------------------------------------------
    let seal_cfg = fieldseal::Config::from_env().map_err(|e| {
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;
    let cfg = config::Config::from_env().map_err(|e| {
        eprintln!("ERROR: migrate configuration invalid: {e}");
        e
    })?;

    let keys = fieldseal::keystore::load(&seal_cfg).map_err(|e| {
        eprintln!("ERROR: encryption key invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 3. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&seal_cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        ?mode,
        fields = %cfg.fields,
        "fieldseal-migrate starting"
    );

    // -----------------------------------------------------------------------
    // 4. Stream transform
    // -----------------------------------------------------------------------
    let cipher = FieldCipher::new(Arc::new(keys));
    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();

    let stats = migrate::run(&cipher, &cfg.field_list(), mode, stdin, stdout)?;
    info!(
        lines = stats.lines,
        fields_encrypted = stats.fields_encrypted,
        fields_skipped = stats.fields_skipped,
        lines_passed_through = stats.lines_passed_through,
        legacy_fallbacks = cipher.legacy_fallbacks(),
        "migration complete"
    );

    Ok(())
}
