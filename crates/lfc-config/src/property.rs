//! The target-property table.
//!
//! Each entry pairs a property name with its type, the targets that
//! support it and a setter that writes an already validated value into a
//! [`TargetConfig`]. Setters never fail; values that cannot be read leave
//! the corresponding setting untouched.

use std::fmt;

use lfc_types::lookup::{match_ignore_case, Named};
use lfc_types::Element;

use crate::config::{
    BuildType, ClockSyncMode, CoordinationType, LogLevel, TargetConfig, TracingOptions,
};
use crate::target::Target;
use crate::types::{self, PropertyType};

/// Writes a validated value into the configuration.
pub type Setter = fn(&mut TargetConfig, &Element);

pub struct TargetProperty {
    pub name: &'static str,
    pub ty: &'static dyn PropertyType,
    pub supported_by: &'static [Target],
    pub setter: Setter,
}

impl TargetProperty {
    /// Case-insensitive lookup in table order.
    pub fn match_name(name: &str) -> Option<&'static TargetProperty> {
        match_ignore_case(name, TARGET_PROPERTIES)
    }

    pub fn supports(&self, target: Target) -> bool {
        self.supported_by.contains(&target)
    }

    pub fn apply(&self, config: &mut TargetConfig, value: &Element) {
        (self.setter)(config, value)
    }
}

impl Named for TargetProperty {
    fn name(&self) -> &str {
        self.name
    }
}

impl fmt::Debug for TargetProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetProperty")
            .field("name", &self.name)
            .field("supported_by", &self.supported_by)
            .finish()
    }
}

const ALL: &[Target] = &Target::ALL;

/// Every known target property, in declaration order.
pub static TARGET_PROPERTIES: &[TargetProperty] = &[
    TargetProperty {
        name: "build",
        ty: &types::STRING_OR_STRING_ARRAY,
        supported_by: &[Target::C],
        setter: |c, v| c.build_commands = v.to_list_of_strings(),
    },
    TargetProperty {
        name: "build-type",
        ty: &types::BUILD_TYPE_UNION,
        supported_by: &[Target::Cpp],
        setter: |c, v| {
            if let Some(build_type) = BuildType::for_name(&v.to_text()) {
                c.cmake_build_type = build_type;
            }
        },
    },
    TargetProperty {
        name: "clock-sync",
        ty: &types::CLOCK_SYNC_UNION,
        supported_by: &[Target::C, Target::CCpp],
        setter: |c, v| {
            if let Some(mode) = ClockSyncMode::for_name(&v.to_text()) {
                c.clock_sync = mode;
            }
        },
    },
    TargetProperty {
        name: "clock-sync-options",
        ty: &types::CLOCK_SYNC_OPTION_DICT,
        supported_by: &[Target::C, Target::CCpp],
        setter: set_clock_sync_options,
    },
    TargetProperty {
        name: "cmake-include",
        ty: &types::STRING,
        supported_by: &[Target::Cpp],
        setter: |c, v| c.cmake_include = Some(v.to_text()),
    },
    TargetProperty {
        name: "compiler",
        ty: &types::STRING,
        supported_by: ALL,
        setter: |c, v| c.compiler = Some(v.to_text()),
    },
    TargetProperty {
        name: "fast",
        ty: &types::BOOLEAN,
        supported_by: ALL,
        setter: |c, v| c.fast_mode = v.to_bool(),
    },
    TargetProperty {
        name: "files",
        ty: &types::FILE_OR_FILE_ARRAY,
        supported_by: ALL,
        setter: |c, v| c.file_names = v.to_list_of_strings(),
    },
    TargetProperty {
        name: "flags",
        ty: &types::STRING_OR_STRING_ARRAY,
        supported_by: &[Target::C, Target::CCpp],
        setter: |c, v| c.compiler_flags = v.to_list_of_strings(),
    },
    TargetProperty {
        name: "coordination",
        ty: &types::COORDINATION_UNION,
        supported_by: &[Target::C, Target::CCpp, Target::Python],
        setter: |c, v| {
            if let Some(coordination) = CoordinationType::for_name(&v.to_text()) {
                c.coordination = coordination;
            }
        },
    },
    TargetProperty {
        name: "keepalive",
        ty: &types::BOOLEAN,
        supported_by: ALL,
        setter: |c, v| c.keepalive = v.to_bool(),
    },
    TargetProperty {
        name: "logging",
        ty: &types::LOGGING_UNION,
        supported_by: ALL,
        setter: |c, v| {
            if let Some(level) = LogLevel::for_name(&v.to_text()) {
                c.log_level = level;
            }
        },
    },
    TargetProperty {
        name: "no-compile",
        ty: &types::BOOLEAN,
        supported_by: &[Target::C, Target::Cpp, Target::CCpp],
        setter: |c, v| c.no_compile = v.to_bool(),
    },
    TargetProperty {
        name: "no-runtime-validation",
        ty: &types::BOOLEAN,
        supported_by: &[Target::Cpp],
        setter: |c, v| c.no_runtime_validation = v.to_bool(),
    },
    TargetProperty {
        name: "protobufs",
        ty: &types::FILE_OR_FILE_ARRAY,
        supported_by: &[Target::C, Target::TypeScript, Target::Python],
        setter: |c, v| c.proto_files = v.to_list_of_strings(),
    },
    TargetProperty {
        name: "threads",
        ty: &types::NON_NEGATIVE_INTEGER,
        supported_by: &[Target::C, Target::Cpp, Target::CCpp],
        setter: |c, v| {
            if let Some(threads) = v.to_integer().and_then(|n| u32::try_from(n).ok()) {
                c.threads = threads;
            }
        },
    },
    TargetProperty {
        name: "timeout",
        ty: &types::TIME_VALUE,
        supported_by: ALL,
        setter: |c, v| c.timeout = v.to_time_value(),
    },
    TargetProperty {
        name: "tracing",
        ty: &types::BOOLEAN,
        supported_by: &[Target::C, Target::Cpp],
        setter: |c, v| {
            c.tracing = v.to_bool().then(TracingOptions::default);
        },
    },
];

fn set_clock_sync_options(config: &mut TargetConfig, value: &Element) {
    let Some(pairs) = value.as_key_value() else {
        return;
    };
    let options = &mut config.clock_sync_options;
    for pair in pairs {
        let Some(entry) = types::CLOCK_SYNC_OPTION_DICT.for_name(&pair.name) else {
            continue;
        };
        let v = &pair.value;
        match entry.key {
            "attenuation" => {
                if let Some(n) = v.to_integer() {
                    options.attenuation = n;
                }
            }
            "collect-stats" => options.collect_stats = v.to_bool(),
            "local-federates-on" => options.local_federates_on = v.to_bool(),
            "period" => {
                if let Some(t) = v.to_time_value() {
                    options.period = t;
                }
            }
            "test-offset" => options.test_offset = v.to_time_value(),
            "trials" => {
                if let Some(n) = v.to_integer() {
                    options.trials = n;
                }
            }
            _ => {}
        }
    }
}
