//! Free port allocation.

use crate::error::{ConfigError, Result};
use std::net::{SocketAddr, TcpListener};

/// Lowest port the controller allocates from.
pub const DEFAULT_LOWER_BOUND: u16 = 19000;

/// The two ports the controller runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortAssignment {
    /// Port of the local HTTP server (manifest and proxy)
    pub port: u16,
    /// Port the bundler listens on
    pub packager_port: u16,
}

/// Find `count` consecutive free ports starting at `lower_bound`.
///
/// A port is free when a listener can bind it on all interfaces. The
/// listeners are released before returning, so a port may be taken by
/// someone else before the caller binds it.
pub fn find_free_ports(count: usize, lower_bound: u16) -> Result<Vec<u16>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut start = lower_bound as u32;
    while start + count as u32 - 1 <= u16::MAX as u32 {
        match (0..count as u32).find(|offset| !is_free((start + offset) as u16)) {
            None => return Ok((start..start + count as u32).map(|p| p as u16).collect()),
            Some(busy) => start += busy + 1,
        }
    }

    Err(ConfigError::InvalidValue {
        field: "port".to_string(),
        value: format!("{} consecutive ports from {}", count, lower_bound),
        hint: "No free port range available; pass --port and --packager-port".to_string(),
    }
    .into())
}

/// Allocate a [`PortAssignment`] with one call to [`find_free_ports`].
pub fn allocate(lower_bound: u16) -> Result<PortAssignment> {
    let ports = find_free_ports(2, lower_bound)?;
    Ok(PortAssignment {
        port: ports[0],
        packager_port: ports[1],
    })
}

fn is_free(port: u16) -> bool {
    TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).is_ok()
}
