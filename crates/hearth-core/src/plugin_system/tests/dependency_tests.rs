#![cfg(test)]

use crate::plugin_system::dependency::{DependencyEdge, DependencyState, PluginDependency};
use crate::plugin_system::version::VersionRange;

fn range(constraint: &str) -> VersionRange {
    VersionRange::from_constraint(constraint).unwrap()
}

#[test]
fn test_dependency_constructors() {
    let required = PluginDependency::required("economy", range("^1.0"));
    assert!(required.required);
    assert_eq!(required.version_range, Some(range("^1.0")));

    let optional = PluginDependency::optional_any("chat");
    assert!(!optional.required);
    assert!(optional.version_range.is_none());
    assert!(optional.incompatible_range.is_none());
}

#[test]
fn test_is_compatible_with_version_and_incompatible_ranges() {
    let dep = PluginDependency::required("economy", range(">=1.0.0")).with_incompatible(range(">=1.3.0, <1.4.0"));
    assert!(dep.is_compatible_with("1.0.0"));
    assert!(dep.is_compatible_with("1.2.9"));
    assert!(!dep.is_compatible_with("1.3.2"));
    assert!(dep.is_compatible_with("1.4.0"));
    assert!(!dep.is_compatible_with("0.9.0"));

    let any = PluginDependency::required_any("economy");
    assert!(any.is_compatible_with("0.0.1"));
    assert!(!any.with_incompatible(range("<1.0.0")).is_compatible_with("0.0.1"));
}

#[test]
fn test_dependency_display() {
    assert_eq!(
        PluginDependency::required("economy", range("^1.2")).to_string(),
        "Requires plugin: economy (version: ^1.2)"
    );
    assert_eq!(
        PluginDependency::optional_any("chat").to_string(),
        "Optional plugin: chat (any version)"
    );
}

#[test]
fn test_dependency_manifest_fields() {
    let dep: PluginDependency = serde_json::from_str(r#"{"id": "chat", "optional": true, "version": "^2"}"#).unwrap();
    assert_eq!(dep, PluginDependency::optional("chat", range("^2")));

    let dep: PluginDependency = serde_json::from_str(r#"{"id": "core", "incompatible": "<0.5"}"#).unwrap();
    assert!(dep.required, "dependencies are required unless marked optional");
    assert_eq!(dep.incompatible_range, Some(range("<0.5")));

    let json = serde_json::to_value(PluginDependency::optional_any("maps")).unwrap();
    assert_eq!(json, serde_json::json!({"id": "maps", "optional": true}));
}

#[test]
fn test_edges_order_and_state_display() {
    let mut edges = vec![
        DependencyEdge::new("b", "a", true),
        DependencyEdge::new("a", "c", false),
        DependencyEdge::new("a", "b", true),
    ];
    edges.sort();
    assert_eq!(edges[0], DependencyEdge::new("a", "b", true));
    assert_eq!(edges[2], DependencyEdge::new("b", "a", true));

    assert_eq!(DependencyState::Present.to_string(), "present");
    assert_eq!(DependencyState::Incompatible.to_string(), "incompatible");
}
