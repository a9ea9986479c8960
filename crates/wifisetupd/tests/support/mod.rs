//! Test doubles for the orchestrator: scripted commands, a recording
//! surface, a recording LED and a manually advanced clock.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wifisetup_common::{CommandResult, CommandRunner, DeviceConfig, ExecutionStatus, NetworkManager};
use wifisetupd::indicator::{Indicator, StatusLed, StatusView, Surface};
use wifisetupd::orchestrator::{Clock, SetupOrchestrator};
use wifisetupd::portal::ProvisioningPortal;

pub const CONNECTIVITY: &str = "nmcli -t -f CONNECTIVITY networking connectivity";
pub const ADDRESS: &str = "nmcli -g IP4.ADDRESS device show wlan0";
pub const SIGNAL: &str = "nmcli -f IN-USE,SIGNAL device wifi";
pub const RADIO_ON: &str = "nmcli radio wifi on";
pub const NETWORKING_OFF: &str = "nmcli networking off";
pub const NETWORKING_ON: &str = "nmcli networking on";

/// Answers commands from a table keyed by full command line, falling back
/// to the program name. Unscripted commands fail.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, CommandResult>>,
    calls: Mutex<Vec<String>>,
    gates: Mutex<HashMap<String, Receiver<()>>>,
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, key: &str, stdout: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(key.to_string(), CommandResult::success(key, &[], stdout));
    }

    pub fn fail(&self, key: &str) {
        self.responses.lock().unwrap().insert(
            key.to_string(),
            CommandResult::failure(key, &[], ExecutionStatus::NonZeroExit, "scripted failure"),
        );
    }

    /// Make `program` block until the returned sender fires (or is dropped).
    pub fn gate(&self, program: &str) -> Sender<()> {
        let (tx, rx) = mpsc::channel();
        self.gates.lock().unwrap().insert(program.to_string(), rx);
        tx
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, line: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == line).count()
    }

    pub fn count_program(&self, program: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(' ').next() == Some(program))
            .count()
    }

    pub fn set_online(&self, online: bool) {
        self.respond(CONNECTIVITY, if online { "full\n" } else { "none\n" });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[&str]) -> CommandResult {
        let line = if args.is_empty() {
            program.to_string()
        } else {
            format!("{} {}", program, args.join(" "))
        };
        self.calls.lock().unwrap().push(line.clone());

        let gate = self.gates.lock().unwrap().remove(program);
        if let Some(rx) = gate {
            let _ = rx.recv();
        }

        let responses = self.responses.lock().unwrap();
        let scripted = responses.get(&line).or_else(|| responses.get(program)).cloned();
        let mut result = scripted.unwrap_or_else(|| {
            CommandResult::failure(program, args, ExecutionStatus::NonZeroExit, "unscripted")
        });
        result.full_command = line;
        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Render(StatusView),
    Power(bool),
}

#[derive(Clone, Default)]
pub struct RecordingSurface {
    pub calls: Arc<Mutex<Vec<SurfaceCall>>>,
}

impl Surface for RecordingSurface {
    fn render(&mut self, view: &StatusView) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(SurfaceCall::Render(view.clone()));
        Ok(())
    }

    fn set_power(&mut self, on: bool) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(SurfaceCall::Power(on));
        Ok(())
    }
}

impl RecordingSurface {
    pub fn renders(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                SurfaceCall::Render(view) => Some(view.text.clone()),
                SurfaceCall::Power(_) => None,
            })
            .collect()
    }

    pub fn last_render(&self) -> Option<StatusView> {
        self.calls.lock().unwrap().iter().rev().find_map(|c| match c {
            SurfaceCall::Render(view) => Some(view.clone()),
            SurfaceCall::Power(_) => None,
        })
    }

    pub fn power_calls(&self) -> Vec<bool> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                SurfaceCall::Power(on) => Some(*on),
                SurfaceCall::Render(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[derive(Clone, Default)]
pub struct RecordingLed {
    pub writes: Arc<Mutex<Vec<bool>>>,
}

impl StatusLed for RecordingLed {
    fn set(&mut self, on: bool) -> anyhow::Result<()> {
        self.writes.lock().unwrap().push(on);
        Ok(())
    }
}

pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Instant::now()),
        })
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

/// Scratch assets directory with a placeholder portal binary.
pub struct Fixture {
    pub dir: TempDir,
    pub runner: Arc<ScriptedRunner>,
    pub clock: Arc<ManualClock>,
    pub config: DeviceConfig,
}

impl Fixture {
    pub fn new(screen_off_secs: u64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("ui")).unwrap();
        fs::write(dir.path().join("wifi-connect"), b"#!/bin/sh\n").unwrap();

        let config = DeviceConfig {
            assets_dir: dir.path().to_path_buf(),
            override_path: dir.path().join("override.txt"),
            screen_off_secs,
            ..Default::default()
        };

        let runner = ScriptedRunner::new();
        runner.respond(RADIO_ON, "");
        runner.respond(NETWORKING_OFF, "");
        runner.respond(NETWORKING_ON, "");
        runner.set_online(false);

        Self {
            dir,
            runner,
            clock: ManualClock::new(),
            config,
        }
    }

    pub fn portal_binary(&self) -> PathBuf {
        self.dir.path().join("wifi-connect")
    }

    pub fn portal_program(&self) -> String {
        self.portal_binary().to_string_lossy().into_owned()
    }

    pub fn override_path(&self) -> &Path {
        &self.config.override_path
    }

    pub fn online(&self, ip: &str, signal: u8) {
        self.runner.set_online(true);
        self.runner.respond(ADDRESS, &format!("{}\n", ip));
        self.runner
            .respond(SIGNAL, &format!("IN-USE  SIGNAL\n        12\n*       {}\n", signal));
    }

    fn network(&self) -> NetworkManager {
        let runner: Arc<dyn CommandRunner> = self.runner.clone();
        NetworkManager::new(runner, "wlan0").with_settle_delay(Duration::ZERO)
    }

    pub fn orchestrator(&self, indicator: Indicator) -> SetupOrchestrator {
        let runner: Arc<dyn CommandRunner> = self.runner.clone();
        let portal = ProvisioningPortal::new(self.portal_binary(), runner, self.network()).unwrap();
        SetupOrchestrator::new(
            &self.config,
            indicator,
            self.network(),
            portal,
            self.clock.clone(),
        )
    }

    pub fn display_orchestrator(&self) -> (SetupOrchestrator, RecordingSurface) {
        let surface = RecordingSurface::default();
        let orchestrator = self.orchestrator(Indicator::Display(Box::new(surface.clone())));
        (orchestrator, surface)
    }
}
