//! Required label and annotation templates.
//!
//! Both flag objects that carry no key/value pair matching a pair of string
//! matchers (regex, `!` negation, empty matches anything).

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::context::{K8sObject, LintContext, Object};
use crate::extract;
use crate::objectkinds::ANY;
use crate::templates::util::StringMatcher;
use crate::templates::{
    CheckFunc, ParamBag, ParameterDesc, ParsedParams, Template, TemplateError, decode_params,
};
use crate::types::Diagnostic;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Params {
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Clone, Copy)]
enum MapField {
    Label,
    Annotation,
}

impl MapField {
    fn noun(self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::Annotation => "annotation",
        }
    }

    fn extract(self, obj: &K8sObject) -> &BTreeMap<String, String> {
        match self {
            Self::Label => extract::labels(obj),
            Self::Annotation => extract::annotations(obj),
        }
    }

    fn parameters(self) -> Vec<ParameterDesc> {
        let noun = self.noun();
        vec![
            ParameterDesc::new("key", "string", &format!("Key of the required {}.", noun)).required(),
            ParameterDesc::new("value", "string", &format!("Value of the required {}.", noun)),
        ]
    }
}

struct RequiredMapMatcher {
    field: MapField,
    key: StringMatcher,
    value: StringMatcher,
    key_source: String,
    value_source: String,
}

fn parse(field: MapField, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
    let params: Params = decode_params(&field.parameters(), params)?;
    let key = StringMatcher::new(&params.key)
        .map_err(|e| TemplateError::InvalidParams(format!("invalid key: {}", e)))?;
    let value = StringMatcher::new(&params.value)
        .map_err(|e| TemplateError::InvalidParams(format!("invalid value: {}", e)))?;
    Ok(ParsedParams::new(RequiredMapMatcher {
        field,
        key,
        value,
        key_source: params.key,
        value_source: params.value,
    }))
}

impl CheckFunc for RequiredMapMatcher {
    fn check(&self, _ctx: &dyn LintContext, object: &Object) -> Vec<Diagnostic> {
        let found = self
            .field
            .extract(object.k8s_object())
            .iter()
            .any(|(k, v)| self.key.matches(k) && self.value.matches(v));
        if found {
            return Vec::new();
        }
        let value = if self.value_source.is_empty() {
            "<any>"
        } else {
            self.value_source.as_str()
        };
        vec![Diagnostic::new(format!(
            "no {} matching \"{}={}\" found",
            self.field.noun(),
            self.key_source,
            value
        ))]
    }
}

pub struct RequiredLabelTemplate;

impl Template for RequiredLabelTemplate {
    fn key(&self) -> &str {
        "required-label"
    }

    fn human_name(&self) -> &str {
        "Required Label"
    }

    fn description(&self) -> &str {
        "Flag objects not carrying at least one label matching the provided patterns"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[ANY]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        MapField::Label.parameters()
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        parse(MapField::Label, params)
    }

    fn instantiate(&self, params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        let matcher: RequiredMapMatcher = params.downcast(self.key())?;
        Ok(Box::new(matcher))
    }
}

pub struct RequiredAnnotationTemplate;

impl Template for RequiredAnnotationTemplate {
    fn key(&self) -> &str {
        "required-annotation"
    }

    fn human_name(&self) -> &str {
        "Required Annotation"
    }

    fn description(&self) -> &str {
        "Flag objects not carrying at least one annotation matching the provided patterns"
    }

    fn supported_object_kinds(&self) -> &'static [&'static str] {
        &[ANY]
    }

    fn parameters(&self) -> Vec<ParameterDesc> {
        MapField::Annotation.parameters()
    }

    fn parse_and_validate(&self, params: &ParamBag) -> Result<ParsedParams, TemplateError> {
        parse(MapField::Annotation, params)
    }

    fn instantiate(&self, params: ParsedParams) -> Result<Box<dyn CheckFunc>, TemplateError> {
        let matcher: RequiredMapMatcher = params.downcast(self.key())?;
        Ok(Box::new(matcher))
    }
}
