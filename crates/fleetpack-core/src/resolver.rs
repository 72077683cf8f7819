//! Label-matching resolution
//!
//! Everything here is pure: callers fetch candidates from the registry and
//! pass them in, in the order that should break ties.

use std::collections::BTreeMap;

use fleetpack_api::{ControlInfo, DesiredApp, DesiredState, ResolutionError, Spec, format_labels};
use tracing::{debug, warn};

use crate::error::CoreError;

/// Joins the ids of merged specs
const MERGED_SEPARATOR: &str = "+";

/// Whether every pair in `predicate` is present with an equal value in
/// `labels`; an empty predicate matches anything
#[must_use]
pub fn labels_match(predicate: &BTreeMap<String, String>, labels: &BTreeMap<String, String>) -> bool {
    predicate
        .iter()
        .all(|(key, value)| labels.get(key) == Some(value))
}

/// Pick the most specific variant of `name` satisfied by `request`
///
/// Candidates whose labels are not a subset of `request` are discarded; of
/// the rest the one with the most labels wins, the earliest on a tie.
///
/// # Errors
/// Returns `CoreError::NoMatchingPacket` when no candidate survives
pub fn best_match<'a>(
    name: &str,
    request: &BTreeMap<String, String>,
    candidates: &'a [ControlInfo],
) -> Result<&'a ControlInfo, CoreError> {
    let mut best: Option<&ControlInfo> = None;

    for candidate in candidates
        .iter()
        .filter(|c| c.name == name && labels_match(&c.labels, request))
    {
        if best.is_none_or(|b| candidate.labels.len() > b.labels.len()) {
            best = Some(candidate);
        }
    }

    best.ok_or_else(|| CoreError::NoMatchingPacket {
        name: name.to_string(),
        labels: format_labels(request),
    })
}

/// Merge every spec whose target is satisfied by `request`
///
/// Targets are unioned (later specs win on a key collision) and apps are
/// concatenated in the order the specs were supplied. With no matching spec
/// the result is empty.
#[must_use]
pub fn merge_specs(request: &BTreeMap<String, String>, specs: &[Spec]) -> Spec {
    let mut merged = Spec::default();
    let mut ids = Vec::new();

    for spec in specs.iter().filter(|s| labels_match(&s.target, request)) {
        for (key, value) in &spec.target {
            if let Some(previous) = merged.target.insert(key.clone(), value.clone())
                && previous != *value
            {
                warn!(
                    key = %key,
                    previous = %previous,
                    value = %value,
                    spec = %spec.id,
                    "conflicting target label while merging specs, keeping later value"
                );
            }
        }
        merged.apps.extend(spec.apps.iter().cloned());
        ids.push(spec.id.as_str());
    }

    merged.id = ids.join(MERGED_SEPARATOR);
    debug!(specs = ids.len(), apps = merged.apps.len(), "merged specs");
    merged
}

/// Resolve each app of `spec` to a concrete packet
///
/// Request labels are layered over each app's own labels before matching.
/// `lookup` returns the candidates for a packet name. Apps that fail to
/// resolve are reported in `errors` without affecting the others.
pub fn resolve_desired_state<F>(
    request: &BTreeMap<String, String>,
    spec: &Spec,
    mut lookup: F,
) -> DesiredState
where
    F: FnMut(&str) -> Vec<ControlInfo>,
{
    let mut state = DesiredState::default();

    for app in &spec.apps {
        let mut labels = app.labels.clone();
        labels.extend(request.iter().map(|(k, v)| (k.clone(), v.clone())));

        let candidates = lookup(&app.name);
        match best_match(&app.name, &labels, &candidates) {
            Ok(info) => state.apps.push(DesiredApp {
                name: info.name.clone(),
                labels: info.labels.clone(),
                hash: info.hash.clone(),
            }),
            Err(e) => {
                warn!(app = %app.name, error = %e, "could not resolve app");
                state.errors.push(ResolutionError {
                    app: app.name.clone(),
                    labels,
                    message: e.to_string(),
                });
            }
        }
    }

    state
}

#[cfg(test)]
mod tests {
    use fleetpack_api::App;

    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn info(name: &str, pairs: &[(&str, &str)], hash: &str) -> ControlInfo {
        ControlInfo::new(name, labels(pairs)).with_hash(hash)
    }

    #[test]
    fn test_labels_match() {
        let request = labels(&[("a", "1"), ("b", "2")]);
        assert!(labels_match(&labels(&[]), &request));
        assert!(labels_match(&labels(&[("a", "1")]), &request));
        assert!(!labels_match(&labels(&[("a", "2")]), &request));
        assert!(!labels_match(&labels(&[("c", "1")]), &request));
    }

    #[test]
    fn test_best_match_prefers_most_specific() {
        let candidates = vec![
            info("test-packet", &[], "h0"),
            info("test-packet", &[("n", "3")], "h1"),
            info(
                "test-packet",
                &[("n", "3"), ("even", "false"), ("odd", "true")],
                "h3",
            ),
        ];
        let request = labels(&[
            ("n", "3"),
            ("even", "false"),
            ("odd", "true"),
            ("doesnt", "exist"),
        ]);

        let best = best_match("test-packet", &request, &candidates).unwrap();
        assert_eq!(best.hash, "h3");
    }

    #[test]
    fn test_best_match_tie_keeps_first() {
        let candidates = vec![
            info("app", &[("a", "1")], "first"),
            info("app", &[("b", "2")], "second"),
        ];
        let request = labels(&[("a", "1"), ("b", "2")]);

        assert_eq!(best_match("app", &request, &candidates).unwrap().hash, "first");
    }

    #[test]
    fn test_best_match_ignores_other_names_and_mismatches() {
        let candidates = vec![
            info("other", &[], "x"),
            info("app", &[("arch", "arm")], "y"),
        ];
        let err = best_match("app", &labels(&[("arch", "x86")]), &candidates).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_merge_specs() {
        let specs = vec![
            Spec::new("first")
                .with_target("a", "a")
                .with_app(App::new("foo")),
            Spec::new("second")
                .with_target("b", "b")
                .with_app(App::new("bar")),
        ];
        let request = labels(&[("a", "a"), ("b", "b")]);

        let merged = merge_specs(&request, &specs);
        assert_eq!(merged.id, "first+second");
        assert_eq!(merged.target, request);
        let names: Vec<_> = merged.apps.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["foo", "bar"]);

        let merged = merge_specs(&request, &specs[1..]);
        let names: Vec<_> = merged.apps.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["bar"]);
    }

    #[test]
    fn test_merge_specs_skips_unmatched() {
        let specs = vec![Spec::new("arm").with_target("arch", "arm").with_app(App::new("x"))];
        let merged = merge_specs(&labels(&[("arch", "x86")]), &specs);
        assert!(merged.apps.is_empty());
        assert!(merged.id.is_empty());
    }

    #[test]
    fn test_resolve_request_labels_override_app_labels() {
        let candidates = vec![
            info("web", &[("tier", "canary")], "canary"),
            info("web", &[("tier", "stable")], "stable"),
        ];
        let spec = Spec::new("s").with_app(App::new("web").with_label("tier", "canary"));

        let state = resolve_desired_state(&labels(&[("tier", "stable")]), &spec, |_| {
            candidates.clone()
        });
        assert_eq!(state.apps.len(), 1);
        assert_eq!(state.apps[0].hash, "stable");
    }

    #[test]
    fn test_resolve_partial_failure() {
        let candidates = vec![info("present", &[], "h")];
        let spec = Spec::new("s")
            .with_app(App::new("missing"))
            .with_app(App::new("present"));

        let state = resolve_desired_state(&labels(&[]), &spec, |name| {
            candidates
                .iter()
                .filter(|c| c.name == name)
                .cloned()
                .collect()
        });

        assert_eq!(state.apps.len(), 1);
        assert_eq!(state.apps[0].name, "present");
        assert_eq!(state.errors.len(), 1);
        assert_eq!(state.errors[0].app, "missing");
    }
}
