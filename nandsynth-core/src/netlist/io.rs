// SPDX-License-Identifier: Apache-2.0

//! Shared helpers for reading and writing netlists as JSON.
//!
//! The on-disk form is the serde encoding of `Netlist`. The derived
//! `signal_map` may be omitted by producers; it is rebuilt on load.

use crate::netlist::Netlist;
use anyhow::{anyhow, Result};
use std::path::Path;

pub fn netlist_from_json_str(text: &str) -> Result<Netlist> {
    let mut netlist: Netlist =
        serde_json::from_str(text).map_err(|e| anyhow!(format!("parsing netlist JSON: {}", e)))?;
    netlist.rebuild_signal_map();
    Ok(netlist)
}

pub fn netlist_to_json_string(netlist: &Netlist) -> Result<String> {
    serde_json::to_string_pretty(netlist)
        .map_err(|e| anyhow!(format!("serializing netlist '{}': {}", netlist.name, e)))
}

pub fn load_netlist(path: &Path) -> Result<Netlist> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow!(format!("reading netlist '{}': {}", path.display(), e)))?;
    log::info!("load_netlist; read {} bytes from {}", text.len(), path.display());
    netlist_from_json_str(&text).map_err(|e| anyhow!(format!("{}: {}", path.display(), e)))
}

pub fn save_netlist(netlist: &Netlist, path: &Path) -> Result<()> {
    let text = netlist_to_json_string(netlist)?;
    std::fs::write(path, text)
        .map_err(|e| anyhow!(format!("writing netlist '{}': {}", path.display(), e)))
}
