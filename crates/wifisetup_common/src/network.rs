//! NetworkManager client.
//!
//! Three read-only probes (connectivity, wireless IPv4, signal strength) and
//! two mutating operations (radio on, networking off/on). Nothing here ever
//! fails past its boundary: probe failures normalize to "not connected",
//! "no address" and zero signal; mutating failures are reported as `false`.
//! Results are never cached.

use crate::command::CommandRunner;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const NMCLI: &str = "nmcli";

#[derive(Clone)]
pub struct NetworkManager {
    runner: Arc<dyn CommandRunner>,
    interface: String,
    settle: Duration,
}

impl NetworkManager {
    pub fn new(runner: Arc<dyn CommandRunner>, interface: impl Into<String>) -> Self {
        Self {
            runner,
            interface: interface.into(),
            settle: crate::config::RECOVERY_SETTLE,
        }
    }

    /// Override the pause between `networking off` and `networking on`.
    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Whether `nmcli` can be executed at all.
    pub fn is_available(&self) -> bool {
        let result = self.runner.run(NMCLI, &["--version"]);
        if !result.is_success() {
            debug!("nmcli unavailable: {}", result.summary());
        }
        result.is_success()
    }

    /// True only when NetworkManager classifies connectivity as `full`.
    pub fn has_full_connectivity(&self) -> bool {
        let result = self
            .runner
            .run(NMCLI, &["-t", "-f", "CONNECTIVITY", "networking", "connectivity"]);
        if !result.is_success() {
            debug!("connectivity query failed: {}", result.summary());
            return false;
        }
        result.stdout.trim() == "full"
    }

    /// IPv4 address of the wireless interface, subnet suffix stripped.
    pub fn wifi_ipv4(&self) -> Option<Ipv4Addr> {
        let result = self.runner.run(
            NMCLI,
            &["-g", "IP4.ADDRESS", "device", "show", &self.interface],
        );
        if !result.is_success() {
            debug!("address query failed: {}", result.summary());
            return None;
        }
        parse_ipv4_address(&result.stdout)
    }

    /// Signal strength (0-100) of the in-use network, 0 when unknown.
    pub fn signal_strength(&self) -> u8 {
        let result = self.runner.run(NMCLI, &["-f", "IN-USE,SIGNAL", "device", "wifi"]);
        if !result.is_success() {
            debug!("signal query failed: {}", result.summary());
            return 0;
        }
        parse_in_use_signal(&result.stdout)
    }

    /// Power the wifi radio on. Idempotent.
    pub fn ensure_radio_on(&self) -> bool {
        let result = self.runner.run(NMCLI, &["radio", "wifi", "on"]);
        if !result.is_success() {
            warn!("Failed to switch wifi radio on: {}", result.summary());
        }
        result.is_success()
    }

    /// Turn networking off then on again to force the stack to re-initialize.
    ///
    /// `networking on` is always attempted, even when `off` failed.
    pub fn cycle_networking(&self) -> bool {
        let off = self.runner.run(NMCLI, &["networking", "off"]);
        if !off.is_success() {
            warn!("Failed to turn networking off: {}", off.summary());
        }

        thread::sleep(self.settle);

        let on = self.runner.run(NMCLI, &["networking", "on"]);
        if !on.is_success() {
            warn!("Failed to turn networking on: {}", on.summary());
        }
        off.is_success() && on.is_success()
    }
}

/// Parse `nmcli -g IP4.ADDRESS` output.
///
/// Multiple addresses come back separated by ` | `; the first one wins.
pub fn parse_ipv4_address(output: &str) -> Option<Ipv4Addr> {
    let first = output
        .lines()
        .flat_map(|line| line.split('|'))
        .map(str::trim)
        .find(|entry| !entry.is_empty())?;
    let addr = first.split('/').next()?;
    addr.parse().ok()
}

/// Parse `nmcli -f IN-USE,SIGNAL device wifi` output.
///
/// The associated network is the row marked with `*`. Accepts both the
/// tabular and the terse (`*:72`) forms.
pub fn parse_in_use_signal(output: &str) -> u8 {
    output
        .lines()
        .map(str::trim_start)
        .find_map(|line| line.strip_prefix('*'))
        .and_then(|rest| {
            rest.trim_start_matches(':')
                .split_whitespace()
                .next()
                .and_then(|field| field.parse::<u32>().ok())
        })
        .map(|signal| signal.min(100) as u8)
        .unwrap_or(0)
}
