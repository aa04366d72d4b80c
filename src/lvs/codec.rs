//! Parser and serializer for the line-oriented LVS configuration format.
//!
//! # Responsibilities
//! - Parse config text into a [`ServiceTable`], admitting only backends the
//!   membership gate confirms to exist
//! - Serialize a table back to canonical text (5-space indentation, one
//!   blank line per record, sorted service order)
//! - Replace the on-disk file atomically so readers never see a torn write
//!
//! # Design Decisions
//! - Explicit two-state parser (seeking a record / inside a record); a
//!   committed record resets every field, nothing leaks into the next one
//! - Unrecognized lines are ignored for forward compatibility
//! - A record still open at end of input is committed

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::lvs::model::{RealServer, ServiceTable, VirtualService};
use crate::membership::{MembershipClient, MembershipError};

/// Errors from parsing or persisting the LVS configuration.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Reading or writing the config file failed.
    #[error("config file I/O: {0}")]
    Io(#[from] io::Error),

    /// The existence gate could not be queried during parse.
    #[error(transparent)]
    Membership(#[from] MembershipError),
}

/// Read and parse the config file at `path`.
///
/// An unreadable file is an error; the controller cannot run without a base
/// configuration.
pub async fn load(
    path: &Path,
    gate: &dyn MembershipClient,
    namespace: &str,
) -> Result<ServiceTable, CodecError> {
    let text = fs::read_to_string(path)?;
    parse(&text, gate, namespace).await
}

/// Parse config text into a service table.
///
/// Each `real` line is admitted only if the gate confirms the address still
/// exists as a live member; dropped lines are logged at debug level.
pub async fn parse(
    text: &str,
    gate: &dyn MembershipClient,
    namespace: &str,
) -> Result<ServiceTable, CodecError> {
    let mut table = ServiceTable::new();
    // None = seeking the next `virtual =` line; Some = inside a record.
    let mut record: Option<VirtualService> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            if let Some(service) = record.take() {
                table.insert(service);
            }
            continue;
        }

        // `virtual` lines are unindented; a new one also commits an open
        // record so a missing blank line cannot merge two services.
        if let Some(rest) = line.strip_prefix("virtual = ") {
            if let Some(service) = record.take() {
                table.insert(service);
            }
            record = match split_host_port(rest.trim()) {
                Some((hostname, port)) => Some(VirtualService {
                    hostname,
                    port,
                    protocol: String::new(),
                    scheduler: String::new(),
                    backends: Vec::new(),
                }),
                None => {
                    tracing::warn!(line, "skipping malformed virtual line");
                    None
                }
            };
            continue;
        }

        let Some(service) = record.as_mut() else {
            continue;
        };

        let body = line.trim_start();
        if let Some(value) = body.strip_prefix("protocol = ") {
            service.protocol = value.trim().to_string();
        } else if let Some(value) = body.strip_prefix("scheduler = ") {
            service.scheduler = value.trim().to_string();
        } else if let Some(value) = body.strip_prefix("real = ") {
            if let Some(server) = parse_real(value.trim()) {
                if gate.get(namespace, &server.address).await?.is_some() {
                    service.backends.push(server);
                } else {
                    tracing::debug!(
                        address = %server.address,
                        "dropping real server line, member no longer exists"
                    );
                }
            }
        }
        // anything else: forward-compatible comment, ignored
    }

    if let Some(service) = record.take() {
        table.insert(service);
    }
    Ok(table)
}

/// Serialize a table to canonical config text.
pub fn serialize(table: &ServiceTable) -> String {
    let mut out = String::new();
    for (key, service) in table.iter() {
        out.push_str(&format!("virtual = {}\n", key));
        out.push_str(&format!("     protocol = {}\n", service.protocol));
        out.push_str(&format!("     scheduler = {}\n", service.scheduler));
        for server in &service.backends {
            if server.address.is_empty() {
                continue;
            }
            out.push_str(&format!(
                "     real = {}:{} gate {}\n",
                server.address, server.port, server.weight
            ));
        }
        out.push('\n');
    }
    out
}

/// Atomically replace the file at `path` with `contents`.
///
/// Writes a sibling temp file, fsyncs it, then renames over the target. A
/// failure before the rename leaves the previous file intact.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let tmp = tmp_path(path);
    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn split_host_port(value: &str) -> Option<(String, u16)> {
    let (host, port) = value.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    Some((host.to_string(), port.parse().ok()?))
}

fn parse_real(value: &str) -> Option<RealServer> {
    let (addr_port, weight) = value.split_once(" gate ")?;
    let (address, port) = split_host_port(addr_port.trim())?;
    Some(RealServer {
        address,
        port,
        weight: weight.trim().parse().ok()?,
    })
}
