//! Resolving a target declaration into a [`TargetConfig`].

use log::{debug, warn};

use lfc_types::{Diagnostic, Diagnostics, ErrorCode, KeyValuePair};

use crate::config::TargetConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::property::TargetProperty;
use crate::target::Target;
use crate::types::CheckContext;

/// A configuration together with everything reported while building it.
#[derive(Debug, Clone)]
pub struct Configured {
    pub config: TargetConfig,
    pub diagnostics: Diagnostics,
}

/// Resolve the target named `target_name`, then configure it.
pub fn configure_named(
    target_name: &str,
    properties: &[KeyValuePair],
    ctx: &CheckContext<'_>,
) -> ConfigResult<Configured> {
    let target = Target::for_name(target_name)
        .ok_or_else(|| ConfigError::UnknownTarget(target_name.to_string()))?;
    Ok(configure(target, properties, ctx))
}

/// Build a fresh configuration for `target` from the declared properties.
///
/// Properties are processed in declaration order. Each one is checked,
/// and its setter runs only if the value validates; a later assignment to
/// the same property overrides an earlier one. Problems with one property
/// never prevent the others from being applied.
pub fn configure(target: Target, properties: &[KeyValuePair], ctx: &CheckContext<'_>) -> Configured {
    let mut config = TargetConfig::new(target);
    let mut diagnostics = Diagnostics::empty();
    for pair in properties {
        match apply_property(&mut config, pair, ctx) {
            Ok(reported) => diagnostics.extend(reported),
            Err(err) => {
                warn!("{err}");
                diagnostics.push(err.to_diagnostic());
            }
        }
    }
    Configured {
        config,
        diagnostics,
    }
}

/// Check one `name: value` pair and, if it validates, apply it.
pub fn apply_property(
    config: &mut TargetConfig,
    pair: &KeyValuePair,
    ctx: &CheckContext<'_>,
) -> ConfigResult<Vec<Diagnostic>> {
    let property = TargetProperty::match_name(&pair.name)
        .ok_or_else(|| ConfigError::UnknownProperty(pair.name.clone()))?;
    let mut reported = property.ty.check(&pair.value, property.name, ctx);
    if !property.supports(config.target) {
        let message = format!(
            "The target parameter: {} is not supported by the {} target and will thus be ignored.",
            property.name, config.target
        );
        warn!("{message}");
        reported.push(Diagnostic::warning(
            ErrorCode::UNSUPPORTED_PROPERTY,
            property.name,
            message,
        ));
    }
    if property.ty.validate(&pair.value) {
        debug!("setting target property '{}'", property.name);
        property.apply(config, &pair.value);
    }
    Ok(reported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lfc_types::{Element, Severity, TimeUnit, TimeValue};

    fn kv(name: &str, value: Element) -> KeyValuePair {
        KeyValuePair::new(name, value)
    }

    #[test]
    fn timeout_is_applied() {
        let out = configure(
            Target::C,
            &[kv("timeout", Element::time(10, TimeUnit::Msec))],
            &CheckContext::default(),
        );
        assert!(out.diagnostics.errors.is_empty());
        assert_eq!(out.config.timeout, Some(TimeValue::msec(10)));
    }

    #[test]
    fn unknown_property_only_affects_its_entry() {
        let out = configure(
            Target::C,
            &[kv("bogus", Element::literal("1")), kv("fast", Element::literal("true"))],
            &CheckContext::default(),
        );
        assert_eq!(out.diagnostics.total_errors, 1);
        assert_eq!(out.diagnostics.errors[0].code, ErrorCode::UNKNOWN_PROPERTY);
        assert!(out.config.fast_mode);
    }

    #[test]
    fn invalid_value_is_not_applied() {
        let out = configure(
            Target::C,
            &[kv("threads", Element::string("foo"))],
            &CheckContext::default(),
        );
        assert_eq!(out.diagnostics.total_errors, 1);
        assert_eq!(out.config.threads, 0);
    }

    #[test]
    fn unsupported_property_warns_and_proceeds() {
        let out = configure(
            Target::Python,
            &[kv("build-type", Element::id("Debug"))],
            &CheckContext::default(),
        );
        assert!(!out.diagnostics.has_errors());
        assert_eq!(out.diagnostics.warnings.len(), 1);
        let w = &out.diagnostics.warnings[0];
        assert_eq!(w.severity, Severity::Warning);
        assert_eq!(
            w.message,
            "The target parameter: build-type is not supported by the Python target and will thus be ignored."
        );
    }

    #[test]
    fn later_assignment_wins() {
        let out = configure(
            Target::C,
            &[kv("logging", Element::id("DEBUG")), kv("logging", Element::id("warn"))],
            &CheckContext::default(),
        );
        assert_eq!(out.config.log_level, crate::LogLevel::Warn);
    }

    #[test]
    fn configure_named_rejects_unknown_target() {
        let err = configure_named("Rust", &[], &CheckContext::default()).unwrap_err();
        assert_eq!(err, ConfigError::UnknownTarget("Rust".to_string()));
        assert_eq!(err.to_diagnostic().code, ErrorCode::UNKNOWN_TARGET);
    }
}
