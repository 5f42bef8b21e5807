//! Decoding of YAML manifests into [`Object`]s.
//!
//! This is a thin helper for tests and embedding programs; file discovery,
//! Helm and Kustomize rendering are left to the caller.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::de::DeserializeOwned;
use std::path::Path;
use thiserror::Error;

use super::object::{
    GroupVersionKind, InvalidObject, K8sObject, Object, ObjectMetadata, UnknownObject,
};
use super::openshift::DeploymentConfig;
use super::LintContextImpl;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid YAML at line {line}: {source}")]
    Syntax {
        line: u32,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("document at line {line} has no apiVersion/kind")]
    MissingTypeMeta { line: u32 },

    #[error("failed to decode {kind} at line {line}: {source}")]
    Decode {
        kind: String,
        line: u32,
        #[source]
        source: serde_json::Error,
    },
}

/// One YAML document of a multi-document stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document<'a> {
    /// Line of the first document line (1-indexed).
    pub line: u32,
    pub text: &'a str,
}

/// Split a stream on `---` separator lines, dropping empty and comment-only documents.
pub fn split_documents(content: &str) -> Vec<Document<'_>> {
    let mut documents = Vec::new();
    let mut start = 0usize;
    let mut start_line = 1u32;
    let mut offset = 0usize;

    for (idx, line) in content.split_inclusive('\n').enumerate() {
        let is_separator = line.trim_end() == "---" || line.starts_with("--- ");
        if is_separator {
            push_document(&mut documents, &content[start..offset], start_line);
            start = offset + line.len();
            start_line = idx as u32 + 2;
        }
        offset += line.len();
    }
    push_document(&mut documents, &content[start..], start_line);

    documents
}

fn push_document<'a>(documents: &mut Vec<Document<'a>>, text: &'a str, line: u32) {
    let has_content = text
        .lines()
        .any(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'));
    if has_content {
        documents.push(Document { line, text });
    }
}

/// Decode one parsed YAML document into a typed object payload.
///
/// Dispatch is on the exact `(apiVersion, kind)` pair; any other pair becomes
/// [`K8sObject::Unknown`] carrying the generic field tree.
pub fn decode_object(value: &serde_yaml::Value, line: u32) -> Result<K8sObject, DecodeError> {
    let json = serde_json::to_value(value).map_err(|source| DecodeError::Decode {
        kind: "document".to_string(),
        line,
        source,
    })?;

    let (api_version, kind) = match (
        json.get("apiVersion").and_then(|v| v.as_str()),
        json.get("kind").and_then(|v| v.as_str()),
    ) {
        (Some(api_version), Some(kind)) => (api_version.to_string(), kind.to_string()),
        _ => return Err(DecodeError::MissingTypeMeta { line }),
    };

    let object = match (api_version.as_str(), kind.as_str()) {
        ("apps/v1", "Deployment") => K8sObject::Deployment(Box::new(from_json(json, &kind, line)?)),
        ("apps/v1", "StatefulSet") => {
            K8sObject::StatefulSet(Box::new(from_json(json, &kind, line)?))
        }
        ("apps/v1", "DaemonSet") => K8sObject::DaemonSet(Box::new(from_json(json, &kind, line)?)),
        ("apps/v1", "ReplicaSet") => K8sObject::ReplicaSet(Box::new(from_json(json, &kind, line)?)),
        ("v1", "ReplicationController") => {
            K8sObject::ReplicationController(Box::new(from_json(json, &kind, line)?))
        }
        ("apps.openshift.io/v1", "DeploymentConfig") => {
            K8sObject::DeploymentConfig(Box::new(from_json::<DeploymentConfig>(json, &kind, line)?))
        }
        ("v1", "Pod") => K8sObject::Pod(Box::new(from_json(json, &kind, line)?)),
        ("batch/v1", "Job") => K8sObject::Job(Box::new(from_json(json, &kind, line)?)),
        ("batch/v1", "CronJob") => K8sObject::CronJob(Box::new(from_json(json, &kind, line)?)),
        ("autoscaling/v2", "HorizontalPodAutoscaler") => {
            K8sObject::HorizontalPodAutoscaler(Box::new(from_json(json, &kind, line)?))
        }
        ("v1", "Service") => K8sObject::Service(Box::new(from_json(json, &kind, line)?)),
        _ => {
            let metadata = match json.get("metadata") {
                Some(meta) => from_json::<ObjectMeta>(meta.clone(), &kind, line)?,
                None => ObjectMeta::default(),
            };
            K8sObject::Unknown(Box::new(UnknownObject {
                gvk: GroupVersionKind::from_api_version(&api_version, &kind),
                metadata,
                raw: json,
            }))
        }
    };

    Ok(object)
}

fn from_json<T: DeserializeOwned>(
    json: serde_json::Value,
    kind: &str,
    line: u32,
) -> Result<T, DecodeError> {
    serde_json::from_value(json).map_err(|source| DecodeError::Decode {
        kind: kind.to_string(),
        line,
        source,
    })
}

/// Decode every document of a stream, failing on the first bad one.
pub fn parse_objects(content: &str) -> Result<Vec<Object>, DecodeError> {
    parse_objects_with_path(content, Path::new("<stdin>"))
}

/// Decode every document of a stream with a source file path.
pub fn parse_objects_with_path(content: &str, path: &Path) -> Result<Vec<Object>, DecodeError> {
    let mut objects = Vec::new();
    for doc in split_documents(content) {
        if let Some(obj) = decode_document(&doc, path)? {
            objects.push(obj);
        }
    }
    Ok(objects)
}

/// Build a lint context from one source; undecodable documents become
/// [`InvalidObject`]s instead of failing the whole source.
pub fn load_context(path: impl AsRef<Path>, content: &str) -> LintContextImpl {
    let path = path.as_ref();
    let mut ctx = LintContextImpl::new();

    for doc in split_documents(content) {
        match decode_document(&doc, path) {
            Ok(Some(obj)) => ctx.add_object(obj),
            Ok(None) => {}
            Err(err) => {
                log::debug!("{}: {}", path.display(), err);
                ctx.add_invalid_object(InvalidObject::new(
                    ObjectMetadata::from_file(path)
                        .with_line(doc.line)
                        .with_raw(doc.text.as_bytes().to_vec()),
                    err.to_string(),
                ));
            }
        }
    }

    ctx
}

fn decode_document(doc: &Document<'_>, path: &Path) -> Result<Option<Object>, DecodeError> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(doc.text).map_err(|source| DecodeError::Syntax {
            line: doc.line,
            source,
        })?;
    if value.is_null() {
        return Ok(None);
    }

    let k8s_object = decode_object(&value, doc.line)?;
    let metadata = ObjectMetadata::from_file(path)
        .with_line(doc.line)
        .with_raw(doc.text.as_bytes().to_vec());
    Ok(Some(Object::new(metadata, k8s_object)))
}
