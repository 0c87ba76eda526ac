//! The normalized target configuration.
//!
//! A [`TargetConfig`] is created fresh for every compiled program and only
//! ever mutated by target-property setters. It is never shared between
//! compilations.

use serde::{Deserialize, Serialize};

use lfc_types::lookup::{match_ignore_case, Named};
use lfc_types::{TimeUnit, TimeValue};

use crate::target::Target;

// ══════════════════════════════════════════════════════════════════════════════
// Enumerated option values
// ══════════════════════════════════════════════════════════════════════════════

/// CMake build types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BuildType {
    #[default]
    Release,
    Debug,
    RelWithDebInfo,
    MinSizeRel,
}

impl BuildType {
    pub const ALL: [BuildType; 4] = [
        Self::Release,
        Self::Debug,
        Self::RelWithDebInfo,
        Self::MinSizeRel,
    ];

    pub const fn alias(self) -> &'static str {
        match self {
            Self::Release => "Release",
            Self::Debug => "Debug",
            Self::RelWithDebInfo => "RelWithDebInfo",
            Self::MinSizeRel => "MinSizeRel",
        }
    }

    pub fn for_name(name: &str) -> Option<Self> {
        match_ignore_case(name, &Self::ALL).copied()
    }
}

impl Named for BuildType {
    fn name(&self) -> &str {
        self.alias()
    }
}

/// Clock synchronization between federates.
///
/// - `Off`: never synchronize.
/// - `Initial`: synchronize at startup only.
/// - `On`: synchronize at startup and periodically at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockSyncMode {
    Off,
    #[default]
    Initial,
    On,
}

impl ClockSyncMode {
    pub const ALL: [ClockSyncMode; 3] = [Self::Off, Self::Initial, Self::On];

    pub const fn alias(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Initial => "initial",
            Self::On => "on",
        }
    }

    pub fn for_name(name: &str) -> Option<Self> {
        match_ignore_case(name, &Self::ALL).copied()
    }
}

impl Named for ClockSyncMode {
    fn name(&self) -> &str {
        self.alias()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinationType {
    #[default]
    Centralized,
    Decentralized,
}

impl CoordinationType {
    pub const ALL: [CoordinationType; 2] = [Self::Centralized, Self::Decentralized];

    pub const fn alias(self) -> &'static str {
        match self {
            Self::Centralized => "centralized",
            Self::Decentralized => "decentralized",
        }
    }

    pub fn for_name(name: &str) -> Option<Self> {
        match_ignore_case(name, &Self::ALL).copied()
    }
}

impl Named for CoordinationType {
    fn name(&self) -> &str {
        self.alias()
    }
}

/// Runtime log levels in descending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Log,
    Debug,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [Self::Error, Self::Warn, Self::Info, Self::Log, Self::Debug];

    pub const fn alias(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Log => "log",
            Self::Debug => "debug",
        }
    }

    pub fn for_name(name: &str) -> Option<Self> {
        match_ignore_case(name, &Self::ALL).copied()
    }

    /// Numeric level understood by the runtime's `LOG_LEVEL` macro.
    pub fn runtime_level(self) -> u8 {
        self as u8
    }
}

impl Named for LogLevel {
    fn name(&self) -> &str {
        self.alias()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Option groups
// ══════════════════════════════════════════════════════════════════════════════

/// Settings of the `clock-sync-options` dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockSyncOptions {
    /// Dampens the adjustment applied per synchronization round.
    pub attenuation: i32,
    /// Whether to collect statistics while synchronizing.
    pub collect_stats: bool,
    /// Synchronize federates that run on the same host, too.
    pub local_federates_on: bool,
    /// Interval between runtime synchronization rounds.
    pub period: TimeValue,
    /// Artificial clock offset for testing.
    pub test_offset: Option<TimeValue>,
    /// Messages exchanged per synchronization round.
    pub trials: i32,
}

impl Default for ClockSyncOptions {
    fn default() -> Self {
        Self {
            attenuation: 10,
            collect_stats: true,
            local_federates_on: false,
            period: TimeValue::new(5, TimeUnit::Msec),
            test_offset: None,
            trials: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TracingOptions {
    /// Trace file name; the runtime picks one when absent.
    pub trace_file_name: Option<String>,
}

// ══════════════════════════════════════════════════════════════════════════════
// TargetConfig
// ══════════════════════════════════════════════════════════════════════════════

/// The typed configuration of one compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub target: Target,
    pub build_commands: Vec<String>,
    pub cmake_build_type: BuildType,
    pub cmake_include: Option<String>,
    pub clock_sync: ClockSyncMode,
    pub clock_sync_options: ClockSyncOptions,
    pub compiler: Option<String>,
    pub compiler_flags: Vec<String>,
    pub coordination: CoordinationType,
    pub fast_mode: bool,
    pub file_names: Vec<String>,
    pub keepalive: bool,
    pub log_level: LogLevel,
    pub no_compile: bool,
    pub no_runtime_validation: bool,
    pub proto_files: Vec<String>,
    pub threads: u32,
    pub timeout: Option<TimeValue>,
    pub tracing: Option<TracingOptions>,
}

impl TargetConfig {
    /// The default configuration for `target`.
    pub fn new(target: Target) -> Self {
        Self {
            target,
            build_commands: Vec::new(),
            cmake_build_type: BuildType::default(),
            cmake_include: None,
            clock_sync: ClockSyncMode::default(),
            clock_sync_options: ClockSyncOptions::default(),
            compiler: None,
            compiler_flags: Vec::new(),
            coordination: CoordinationType::default(),
            fast_mode: false,
            file_names: Vec::new(),
            keepalive: false,
            log_level: LogLevel::default(),
            no_compile: false,
            no_runtime_validation: false,
            proto_files: Vec::new(),
            threads: 0,
            timeout: None,
            tracing: None,
        }
    }

    pub fn tracing_enabled(&self) -> bool {
        self.tracing.is_some()
    }

    /// Serialize to pretty JSON for `--dump-config`-style tooling.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
