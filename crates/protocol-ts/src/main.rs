//! Exports the TypeScript bindings of `wl-protocol`.
//!
//! Usage: `wl-protocol-ts [OUT_DIR]` (defaults to `./bindings`).

use std::path::PathBuf;

use anyhow::Context;
use ts_rs::TS;
use wl_protocol::{Event, LoaderConfig, Op, Scenario};

fn main() -> anyhow::Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("bindings"));

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    // Exporting the roots pulls in every type they reference.
    Op::export_all_to(&out_dir).context("failed to export Op")?;
    Event::export_all_to(&out_dir).context("failed to export Event")?;
    LoaderConfig::export_all_to(&out_dir).context("failed to export LoaderConfig")?;
    Scenario::export_all_to(&out_dir).context("failed to export Scenario")?;

    println!("TypeScript bindings written to {}", out_dir.display());
    Ok(())
}
