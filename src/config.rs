//! Configuration loading: CLI flags (`clap`) and the three JSON config
//! files they name. A thin `Config::from_*`-style constructor does all
//! the fallible parsing up front, so `main` either has a
//! fully-validated config or exits.

use std::collections::HashMap;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;

#[derive(Debug, clap::Parser)]
#[command(name = "ct-revocation-ca", about = "Revocation Transparency CA node")]
pub struct Opt {
    /// Path to the CA config file (`{ log_ids, ca_id, private_key }`).
    #[arg(long)]
    pub config: String,

    /// Path to the CA list file (directory entry for this CA).
    #[arg(long)]
    pub calist: String,

    /// Path to the log list file (logID -> {URL, Key}).
    #[arg(long)]
    pub loglist: String,
}

#[derive(Debug, Deserialize)]
pub struct CaConfigFile {
    pub log_ids: Vec<String>,
    pub ca_id: String,
    /// Base64-encoded PKCS#8 Ed25519 private key.
    pub private_key: String,
}

#[derive(Debug, Deserialize)]
struct CaListFile {
    #[serde(flatten)]
    entries: HashMap<String, CaListEntry>,
}

#[derive(Debug, Deserialize)]
struct CaListEntry {
    #[serde(rename = "CAURL")]
    ca_url: String,
    #[serde(rename = "MMD")]
    mmd: u64,
}

#[derive(Debug, Deserialize)]
struct LogListEntry {
    #[serde(rename = "URL")]
    url: String,
    #[serde(rename = "Key")]
    key: String,
}

/// Fully resolved configuration: the CA's own identity and key, the
/// timing/listen parameters from the CA list, and the directory of
/// Loggers this CA is configured to publish to.
pub struct ResolvedConfig {
    pub ca_id: String,
    pub private_key_pkcs8: Vec<u8>,
    pub mmd: u64,
    pub listen_address: String,
    pub log_directory: HashMap<String, crate::store::LogEntry>,
}

pub fn load(opt: &Opt) -> Result<ResolvedConfig> {
    let ca_config = load_ca_config(&opt.config)?;
    let (listen_address, mmd) = load_ca_list_info(&opt.calist, &ca_config.ca_id)?;
    let log_directory = load_log_directory(&opt.loglist, &ca_config.log_ids)?;

    let private_key_pkcs8 = BASE64
        .decode(ca_config.private_key.as_bytes())
        .context("ca_config.private_key is not valid base64 PKCS#8")?;

    Ok(ResolvedConfig {
        ca_id: ca_config.ca_id,
        private_key_pkcs8,
        mmd,
        listen_address,
        log_directory,
    })
}

fn load_ca_config(path: &str) -> Result<CaConfigFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading CA config file {path}"))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing CA config file {path}"))
}

/// Parses the `CAURL` entry for this CA (`proto://host:port`) down to
/// the `host:port` listen address, and pulls out the configured MMD.
fn load_ca_list_info(path: &str, ca_id: &str) -> Result<(String, u64)> {
    let bytes = std::fs::read(path).with_context(|| format!("reading CA list file {path}"))?;
    let list: CaListFile =
        serde_json::from_slice(&bytes).with_context(|| format!("parsing CA list file {path}"))?;
    let entry = list
        .entries
        .get(ca_id)
        .with_context(|| format!("CA id {ca_id} not found in CA list {path}"))?;

    let parsed = url::Url::parse(&entry.ca_url)
        .with_context(|| format!("CAURL {} is not a valid URL", entry.ca_url))?;
    let host = parsed
        .host_str()
        .with_context(|| format!("CAURL {} has no host", entry.ca_url))?;
    let port = parsed
        .port()
        .with_context(|| format!("CAURL {} has no port", entry.ca_url))?;
    let listen_address = format!("{host}:{port}");

    Ok((listen_address, entry.mmd))
}

fn load_log_directory(
    path: &str,
    log_ids: &[String],
) -> Result<HashMap<String, crate::store::LogEntry>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading log list file {path}"))?;
    let all: HashMap<String, LogListEntry> =
        serde_json::from_slice(&bytes).with_context(|| format!("parsing log list file {path}"))?;

    let mut directory = HashMap::new();
    for log_id in log_ids {
        let entry = all
            .get(log_id)
            .with_context(|| format!("log id {log_id} not found in log list {path}"))?;
        let public_key = hex::decode(&entry.key)
            .with_context(|| format!("log id {log_id} has non-hex Key in log list"))?;
        directory.insert(
            log_id.clone(),
            crate::store::LogEntry {
                url: entry.url.clone(),
                public_key,
            },
        );
    }
    Ok(directory)
}
