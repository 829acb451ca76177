//! Mapping of `kubectl get namespaces -o json` output

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sfb_platform_api::{CandidateResource, PlatformError, PlatformResult};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct NamespaceList {
    #[serde(default)]
    items: Vec<Namespace>,
}

#[derive(Debug, Deserialize)]
struct Namespace {
    metadata: ObjectMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMeta {
    name: String,
    creation_timestamp: Option<DateTime<Utc>>,
    deletion_timestamp: Option<DateTime<Utc>>,
}

/// Convert a namespace list document into candidate resources.
///
/// Namespaces that already carry a deletion timestamp are being removed
/// and are left out.
pub fn parse_namespace_list(json: &[u8]) -> PlatformResult<Vec<CandidateResource>> {
    let list: NamespaceList =
        serde_json::from_slice(json).map_err(|e| PlatformError::Decode(e.to_string()))?;

    let mut candidates = Vec::with_capacity(list.items.len());
    for namespace in list.items {
        let meta = namespace.metadata;

        if meta.deletion_timestamp.is_some() {
            debug!(namespace = %meta.name, "Skipping terminating namespace");
            continue;
        }

        let created_at = meta.creation_timestamp.ok_or_else(|| {
            PlatformError::Decode(format!("namespace '{}' has no creationTimestamp", meta.name))
        })?;

        candidates.push(CandidateResource::new(meta.name, created_at));
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn maps_names_and_creation_times() {
        let json = br#"{
            "apiVersion": "v1",
            "kind": "List",
            "items": [
                {"metadata": {"name": "project-pr-1", "creationTimestamp": "2010-11-10T10:10:10Z"}, "status": {"phase": "Active"}},
                {"metadata": {"name": "project", "creationTimestamp": "2021-03-01T08:00:00Z"}}
            ]
        }"#;

        let candidates = parse_namespace_list(json).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name.as_str(), "project-pr-1");
        assert_eq!(
            candidates[0].created_at,
            Utc.with_ymd_and_hms(2010, 11, 10, 10, 10, 10).unwrap()
        );
        assert_eq!(candidates[1].name.as_str(), "project");
    }

    #[test]
    fn skips_terminating_namespaces() {
        let json = br#"{"items": [
            {"metadata": {"name": "project-pr-1", "creationTimestamp": "2010-11-10T10:10:10Z",
                          "deletionTimestamp": "2010-11-20T10:10:10Z"}},
            {"metadata": {"name": "project-pr-2", "creationTimestamp": "2010-11-10T10:10:10Z"}}
        ]}"#;

        let candidates = parse_namespace_list(json).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name.as_str(), "project-pr-2");
    }

    #[test]
    fn empty_list() {
        assert!(parse_namespace_list(br#"{"items": []}"#).unwrap().is_empty());
        assert!(parse_namespace_list(br#"{"kind": "List"}"#).unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(parse_namespace_list(b"not json"), Err(PlatformError::Decode(_))));

        let no_timestamp = br#"{"items": [{"metadata": {"name": "project-pr-1"}}]}"#;
        assert!(matches!(parse_namespace_list(no_timestamp), Err(PlatformError::Decode(_))));
    }
}
