//! Update configuration template.
//!
//! Validates a workload's update strategy type against a regex and, for
//! rolling updates, bounds on `maxUnavailable` and `maxSurge`. Bounds are
//! integers or percentages; an integer bound never satisfies a percentage
//! value and vice versa.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use regex::Regex;
use serde::Deserialize;

use crate::context::{LintContext, Object};
use crate::extract::{self, int_or_string_to_string};
use crate::objectkinds::DEPLOYMENT_LIKE;
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

const TEMPLATE_KEY: &str = "update-configuration";

/// A bound as written in configuration: `2`, `"2"` or `"25%"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawBound {
    Int(i64),
    Str(String),
}

impl RawBound {
    fn into_string(self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Str(s) => s,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Params {
    strategy_type_regex: String,
    max_pods_unavailable: Option<RawBound>,
    min_pods_unavailable: Option<RawBound>,
    max_surge: Option<RawBound>,
    min_surge: Option<RawBound>,
}

/// A min/max pair together with its source text for messages.
#[derive(Debug, Clone, Default)]
struct Bounds {
    max: Option<(IntOrString, String)>,
    min: Option<(IntOrString, String)>,
}

impl Bounds {
    fn is_set(&self) -> bool {
        self.max.is_some() || self.min.is_some()
    }

    fn satisfied_by(&self, actual: Option<&IntOrString>) -> bool {
        compare(
            self.max.as_ref().map(|(v, _)| v),
            self.min.as_ref().map(|(v, _)| v),
            actual,
        )
    }

    /// `at least X`, `no more than Y`, or both joined with `and`.
    fn requirement(&self) -> String {
        let mut parts = Vec::new();
        if let Some((_, raw)) = &self.min {
            parts.push(format!("at least {}", raw));
        }
        if let Some((_, raw)) = &self.max {
            parts.push(format!("no more than {}", raw));
        }
        parts.join(" and ")
    }
}

struct UpdateConfig {
    strategy_type_regex: Regex,
    regex_source: String,
    needs_rolling_definition: bool,
    unavailable: Bounds,
    surge: Bounds,
}

pub struct UpdateConfigurationTemplate;

impl Template for UpdateConfigurationTemplate {
    fn key(&self) -> &str {
        TEMPLATE_KEY
    }

    fn human_name(&self) -> &str {
        "Update configuration"
    }

    fn description(&self) -> &str {
        "Flag configurations that do not meet the specified update configuration"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[DEPLOYMENT_LIKE]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        vec![
            ParameterDesc::new(
                "strategyTypeRegex",
                "string",
                "A regular expression the defines the type of update strategy allowed.",
            )
            .required(),
            ParameterDesc::new(
                "maxPodsUnavailable",
                "string",
                "The maximum value that be set in a RollingUpdate configuration for the MaxUnavailable. This can be an integer or a percent.",
            ),
            ParameterDesc::new(
                "minPodsUnavailable",
                "string",
                "The minimum value that be set in a RollingUpdate configuration for the MaxUnavailable. This can be an integer or a percent.",
            ),
            ParameterDesc::new(
                "maxSurge",
                "string",
                "The maximum value that be set in a RollingUpdate configuration for the MaxSurge. This can be an integer or a percent.",
            ),
            ParameterDesc::new(
                "minSurge",
                "string",
                "The minimum value that be set in a RollingUpdate configuration for the MaxSurge. This can be an integer or a percent.",
            ),
        ]
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        let params: Params = decode_params(&self.parameters(), params)?;
        let mut errors = Vec::new();

        let regex = Regex::new(&params.strategy_type_regex)
            .map_err(|e| errors.push(format!("invalid regex {}: {}", params.strategy_type_regex, e)))
            .ok();

        let mut bound = |name: &str, raw: Option<RawBound>| -> Option<(IntOrString, String)> {
            let raw = raw.map(RawBound::into_string).filter(|s| !s.is_empty())?;
            match parse_int_or_string(&raw) {
                Ok(value) => Some((value, raw)),
                Err(e) => {
                    errors.push(format!("invalid {} {}: {}", name, raw, e));
                    None
                }
            }
        };
        let unavailable = Bounds {
            max: bound("MaxPodsUnavailable", params.max_pods_unavailable),
            min: bound("MinPodsUnavailable", params.min_pods_unavailable),
        };
        let surge = Bounds {
            max: bound("MaxSurge", params.max_surge),
            min: bound("MinSurge", params.min_surge),
        };

        let Some(regex) = regex.filter(|_| errors.is_empty()) else {
            return Err(TemplateError::InvalidParams(format!(
                "configuration verification: {}",
                errors.join("; ")
            )));
        };

        let needs_rolling_definition = params.strategy_type_regex.contains("Rolling")
            && (unavailable.is_set() || surge.is_set());
        Ok(ParsedParams::new(UpdateConfig {
            strategy_type_regex: regex,
            regex_source: params.strategy_type_regex,
            needs_rolling_definition,
            unavailable,
            surge,
        }))
    }

    fn instantiate(&self, params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        let config: UpdateConfig = params.downcast(TEMPLATE_KEY)?;
        Ok(Box::new(config))
    }
}

impl CheckFunc for UpdateConfig {
    fn check(&self, _ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        let Some(strategy) = extract::update_strategy(object.k8s_object()) else {
            return Vec::new();
        };
        let mut diagnostics = Vec::new();

        if !self.strategy_type_regex.is_match(&strategy.type_) {
            let type_ = if strategy.type_.is_empty() {
                "no"
            } else {
                strategy.type_.as_str()
            };
            diagnostics.push(Diagnostic::new(format!(
                "object has {} strategy type but must match regex {}",
                type_, self.regex_source
            )));
        }

        let Some(rolling) = strategy.rolling else {
            if self.needs_rolling_definition {
                diagnostics.push(Diagnostic::new(
                    "object has no rolling update parameters defined",
                ));
            }
            return diagnostics;
        };

        if !self.unavailable.satisfied_by(rolling.max_unavailable.as_ref()) {
            diagnostics.push(Diagnostic::new(format!(
                "object has a max unavailable of {} but {} is required",
                render(rolling.max_unavailable.as_ref()),
                self.unavailable.requirement()
            )));
        }
        if rolling.supports_max_surge && !self.surge.satisfied_by(rolling.max_surge.as_ref()) {
            diagnostics.push(Diagnostic::new(format!(
                "object has a max surge of {} but {} is required",
                render(rolling.max_surge.as_ref()),
                self.surge.requirement()
            )));
        }
        diagnostics
    }
}

fn render(value: Option<&IntOrString>) -> String {
    value.map_or_else(|| "none".to_string(), int_or_string_to_string)
}

/// Parse a bound: a non-negative integer, or a percentage between 0% and 100%.
fn parse_int_or_string(data: &str) -> Result<IntOrString, String> {
    if let Ok(value) = data.parse::<i32>() {
        if value < 0 {
            return Err(format!("{} isn't a valid value", value));
        }
        return Ok(IntOrString::Int(value));
    }
    let Some(number) = data.strip_suffix('%') else {
        return Err(format!("{} is not a valid string.  It does not end with %", data));
    };
    let percent: i32 = number
        .parse()
        .map_err(|_| format!("unable to parse {}", data))?;
    if !(0..=100).contains(&percent) {
        return Err(format!("{} isn't a valid percent", data));
    }
    Ok(IntOrString::String(data.to_string()))
}

fn is_percent(value: &IntOrString) -> bool {
    matches!(value, IntOrString::String(s) if s.contains('%'))
}

/// Absolute value of an integer, or the number of a percentage.
fn scaled_value(value: &IntOrString) -> Option<i32> {
    match value {
        IntOrString::Int(i) => Some(*i),
        IntOrString::String(s) => s.strip_suffix('%')?.parse().ok(),
    }
}

fn compare(
    max: Option<&IntOrString>,
    min: Option<&IntOrString>,
    actual: Option<&IntOrString>,
) -> bool {
    if max.is_none() && min.is_none() {
        return true;
    }
    let Some(actual) = actual else {
        return false;
    };
    let Some(actual_value) = scaled_value(actual) else {
        return false;
    };
    let actual_is_percent = is_percent(actual);

    if let Some(max) = max {
        if is_percent(max) != actual_is_percent {
            return false;
        }
        match scaled_value(max) {
            Some(max_value) if actual_value <= max_value => {}
            _ => return false,
        }
    }
    if let Some(min) = min {
        if is_percent(min) != actual_is_percent {
            return false;
        }
        match scaled_value(min) {
            Some(min_value) if actual_value >= min_value => {}
            _ => return false,
        }
    }
    true
}
