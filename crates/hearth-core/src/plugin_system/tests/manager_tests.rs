#![cfg(test)]

use std::path::Path;

use tempfile::tempdir;

use crate::config::HostConfig;
use crate::plugin_system::dependency::DependencyState;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::loader::PluginLoader;
use crate::plugin_system::manager::PluginManager;
use crate::plugin_system::manifest::ManifestBuilder;
use crate::plugin_system::tests::fixtures::{container, container_from, write_file, Behaviour, ScriptedRegistry};
use crate::plugin_system::container::PluginState;

fn manager(scripted: &ScriptedRegistry) -> PluginManager {
    PluginManager::new(PluginLoader::new(scripted.registry.clone(), semver::Version::new(1, 0, 0)))
}

fn write_plugin(dir: &Path, id: &str, entry_point: &str, requires: &[&str]) {
    let mut content = format!("id = \"{}\"\nversion = \"1.0.0\"\nentry_point = \"{}\"\n", id, entry_point);
    for dep in requires {
        content.push_str(&format!("\n[[dependencies]]\nid = \"{}\"\n", dep));
    }
    write_file(dir, &format!("{}/plugin.toml", id), &content);
}

#[tokio::test]
async fn test_pipeline_loads_in_dependency_order() {
    let tmp = tempdir().unwrap();
    write_plugin(tmp.path(), "world", "builtin:ok", &[]);
    write_plugin(tmp.path(), "economy", "builtin:ok", &["world"]);
    write_plugin(tmp.path(), "shops", "builtin:ok", &["economy"]);

    let scripted = ScriptedRegistry::new().with("builtin:ok", Behaviour::Succeed);
    let mut manager = manager(&scripted);
    let report = manager.load_plugins_from_directory(tmp.path()).await.unwrap();

    assert_eq!(report.loaded, vec!["world", "economy", "shops"]);
    assert!(report.is_clean());
    assert_eq!(
        scripted.log.entries(),
        vec!["activate:world", "activate:economy", "activate:shops"]
    );
    assert_eq!(manager.load_order(), ["world", "economy", "shops"]);
    assert!(manager.is_plugin_loaded("shops"));
    assert_eq!(manager.graph().dependents_of("world"), vec!["economy"]);
}

#[tokio::test]
async fn test_failed_dependency_skips_dependents_without_activating_them() {
    let scripted = ScriptedRegistry::new()
        .with("builtin:ok", Behaviour::Succeed)
        .with("builtin:fail", Behaviour::FailActivate);
    let mut manager = manager(&scripted);
    // A requires B, B fails to activate, C is unrelated.
    manager
        .add_container(container_from(
            ManifestBuilder::new("A", "1.0.0").requires("B").entry_point("builtin:ok").build(),
        ))
        .unwrap();
    manager
        .add_container(container_from(ManifestBuilder::new("B", "1.0.0").entry_point("builtin:fail").build()))
        .unwrap();
    manager
        .add_container(container_from(ManifestBuilder::new("C", "1.0.0").entry_point("builtin:ok").build()))
        .unwrap();

    let report = manager.load_all().await.unwrap();

    assert_eq!(report.loaded, vec!["C"]);
    assert_eq!(scripted.activation_count(), 2, "A must never be activated");
    assert!(!scripted.log.entries().contains(&"activate:A".to_string()));

    let b = manager.get_failed_plugin("B").expect("B failed");
    assert!(matches!(b.failure(), Some(PluginSystemError::ActivationError { .. })));
    let a = manager.get_failed_plugin("A").expect("A failed");
    assert!(matches!(
        a.failure(),
        Some(PluginSystemError::DependencyFailed { dependency_id, .. }) if dependency_id == "B"
    ));
    assert!(manager.get_failed_plugin("C").is_none());
    assert_eq!(report.failed.len(), 2);
}

#[tokio::test]
async fn test_resolution_errors_fail_only_affected_plugins() {
    let scripted = ScriptedRegistry::new().with("builtin:ok", Behaviour::Succeed);
    let mut manager = manager(&scripted);
    for c in [
        container("lonely", &["ghost"]),
        container("fan", &["lonely"]),
        container("x", &["y"]),
        container("y", &["x"]),
    ] {
        manager.add_container(c).unwrap();
    }
    manager
        .add_container(container_from(ManifestBuilder::new("fine", "1.0.0").entry_point("builtin:ok").build()))
        .unwrap();

    let report = manager.load_all().await.unwrap();
    assert_eq!(report.loaded, vec!["fine"]);

    let failure = |id: &str| manager.get_plugin(id).and_then(|c| c.failure());
    assert!(matches!(failure("lonely"), Some(PluginSystemError::MissingDependency { .. })));
    assert!(matches!(failure("fan"), Some(PluginSystemError::DependencyFailed { .. })));
    assert!(matches!(failure("x"), Some(PluginSystemError::CycleDetected(_))));
    assert!(matches!(failure("y"), Some(PluginSystemError::CycleDetected(_))));
    for container in manager.failed_plugins() {
        assert_eq!(container.state(), PluginState::Failed);
    }
}

#[tokio::test]
async fn test_lookups() {
    let scripted = ScriptedRegistry::new().with("builtin:ok", Behaviour::Succeed);
    let mut manager = manager(&scripted);
    manager
        .add_container(container_from(
            ManifestBuilder::new("economy", "1.0.0").entry_point("builtin:ok").tag("core").build(),
        ))
        .unwrap();
    manager
        .add_container(container_from(
            ManifestBuilder::new("shops", "1.0.0")
                .entry_point("builtin:ok")
                .requires("economy")
                .optionally("chat")
                .build(),
        ))
        .unwrap();
    manager.load_all().await.unwrap();

    assert_eq!(manager.get_require_plugin("economy").unwrap().name(), "economy");
    match manager.get_require_plugin("nope") {
        Err(PluginSystemError::NotFound(id)) => assert_eq!(id, "nope"),
        other => panic!("expected NotFound, got {:?}", other),
    }
    assert!(manager.get_plugin("nope").is_none());

    let tagged = manager.find_plugins(|c| c.manifest().tags.iter().any(|t| t == "core"));
    assert_eq!(tagged.len(), 1);
    assert_eq!(manager.plugins().count(), 2);
    let loaded: Vec<&str> = manager.loaded_plugins().into_iter().map(|c| c.id()).collect();
    assert_eq!(loaded, vec!["economy", "shops"]);

    let states: Vec<(String, DependencyState)> = manager
        .dependencies_state("shops")
        .unwrap()
        .into_iter()
        .map(|(dep, state)| (dep.id.clone(), state))
        .collect();
    assert_eq!(
        states,
        vec![
            ("economy".to_string(), DependencyState::Present),
            ("chat".to_string(), DependencyState::Missing)
        ]
    );
    assert_eq!(manager.dependents_of("economy"), vec!["shops"]);
    assert!(manager.dependencies_state("nope").is_err());
}

#[tokio::test]
async fn test_duplicate_and_disabled_plugins_at_discovery() {
    let tmp = tempdir().unwrap();
    write_file(tmp.path(), "a.plugin.toml", "id = \"economy\"\nversion = \"1.0.0\"\nentry_point = \"builtin:ok\"\n");
    write_file(tmp.path(), "b.plugin.toml", "id = \"economy\"\nversion = \"2.0.0\"\nentry_point = \"builtin:ok\"\n");
    write_file(tmp.path(), "c.plugin.toml", "id = \"cheats\"\nversion = \"1.0.0\"\nentry_point = \"builtin:ok\"\n");

    let scripted = ScriptedRegistry::new().with("builtin:ok", Behaviour::Succeed);
    let mut manager = manager(&scripted).with_disabled(["cheats".to_string()]);
    let report = manager.load_plugins_from_directory(tmp.path()).await.unwrap();

    assert_eq!(report.loaded, vec!["economy"]);
    assert_eq!(manager.get_plugin("economy").unwrap().version(), "1.0.0", "first artifact by path wins");
    assert!(manager.get_plugin("cheats").is_none());
    assert_eq!(manager.discovery_errors().len(), 1);
    match &manager.discovery_errors()[0] {
        PluginSystemError::DuplicatePlugin { plugin_id, path } => {
            assert_eq!(plugin_id, "economy");
            assert_eq!(path, &tmp.path().join("b.plugin.toml"));
        }
        other => panic!("expected DuplicatePlugin, got {:?}", other),
    }
}

#[tokio::test]
async fn test_pipeline_runs_once() {
    let tmp = tempdir().unwrap();
    let scripted = ScriptedRegistry::new();
    let mut manager = manager(&scripted);
    manager.load_plugins_from_directory(tmp.path()).await.unwrap();

    assert!(matches!(
        manager.load_plugins_from_directory(tmp.path()).await,
        Err(PluginSystemError::PipelineAlreadyRun)
    ));
    assert!(matches!(manager.load_all().await, Err(PluginSystemError::PipelineAlreadyRun)));
    assert!(matches!(
        manager.add_container(container("late", &[])),
        Err(PluginSystemError::PipelineAlreadyRun)
    ));
}

#[tokio::test]
async fn test_shutdown_reverse_order_and_collects_errors() {
    let scripted = ScriptedRegistry::new()
        .with("builtin:ok", Behaviour::Succeed)
        .with("builtin:stubborn", Behaviour::FailDeactivate);
    let mut manager = manager(&scripted);
    manager
        .add_container(container_from(ManifestBuilder::new("base", "1.0.0").entry_point("builtin:ok").build()))
        .unwrap();
    manager
        .add_container(container_from(
            ManifestBuilder::new("middle", "1.0.0").entry_point("builtin:stubborn").requires("base").build(),
        ))
        .unwrap();
    manager
        .add_container(container_from(
            ManifestBuilder::new("top", "1.0.0").entry_point("builtin:ok").requires("middle").build(),
        ))
        .unwrap();
    manager.load_all().await.unwrap();

    let errors = manager.shutdown().await;
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        PluginSystemError::DeactivationError { plugin_id, .. } if plugin_id == "middle"
    ));
    let deactivations: Vec<String> = scripted
        .log
        .entries()
        .into_iter()
        .filter(|e| e.starts_with("deactivate:"))
        .collect();
    assert_eq!(deactivations, vec!["deactivate:top", "deactivate:middle", "deactivate:base"]);

    assert!(manager.shutdown().await.is_empty(), "second shutdown is a no-op");
}

#[tokio::test]
async fn test_from_config() {
    let config = HostConfig {
        activation_timeout_ms: Some(250),
        disabled: vec!["cheats".to_string()],
        ..HostConfig::default()
    };
    let manager = PluginManager::from_config(&config, ScriptedRegistry::new().registry).unwrap();
    assert_eq!(manager.loader().activation_timeout(), Some(std::time::Duration::from_millis(250)));
    assert_eq!(manager.loader().api_version(), &semver::Version::new(1, 0, 0));

    let bad = HostConfig {
        api_version: "v1".to_string(),
        ..HostConfig::default()
    };
    assert!(PluginManager::from_config(&bad, ScriptedRegistry::new().registry).is_err());
}
