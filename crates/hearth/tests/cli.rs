use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn write_plugin(dir: &Path, id: &str, entry_point: &str, requires: &[&str]) {
    let mut content = format!("id = \"{}\"\nversion = \"1.0.0\"\nentry_point = \"{}\"\n", id, entry_point);
    for dep in requires {
        content.push_str(&format!("\n[[dependencies]]\nid = \"{}\"\n", dep));
    }
    fs::write(dir.join(format!("{}.plugin.toml", id)), content).unwrap();
}

fn hearth(plugins_dir: &Path) -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("hearth")?;
    cmd.arg("--plugins-dir").arg(plugins_dir);
    Ok(cmd)
}

#[test]
fn test_resolve_prints_load_order() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    write_plugin(tmp.path(), "shops", "builtin:noop", &["economy"]);
    write_plugin(tmp.path(), "economy", "builtin:noop", &["world"]);
    write_plugin(tmp.path(), "world", "builtin:noop", &[]);

    hearth(tmp.path())?
        .arg("resolve")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. world"))
        .stdout(predicate::str::contains("2. economy"))
        .stdout(predicate::str::contains("3. shops"));
    Ok(())
}

#[test]
fn test_resolve_reports_missing_dependency() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    write_plugin(tmp.path(), "shops", "builtin:noop", &["ghost"]);

    hearth(tmp.path())?
        .arg("resolve")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Dependency 'ghost' of plugin 'shops' is missing"));
    Ok(())
}

#[test]
fn test_load_reports_failures_and_keeps_going() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    write_plugin(tmp.path(), "base", "builtin:fail", &[]);
    write_plugin(tmp.path(), "dependent", "builtin:noop", &["base"]);
    write_plugin(tmp.path(), "standalone", "builtin:noop", &[]);

    hearth(tmp.path())?
        .arg("load")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Loaded 1 plugin(s)"))
        .stdout(predicate::str::contains("+ standalone"))
        .stdout(predicate::str::contains("- base: Activation of plugin 'base' failed"))
        .stdout(predicate::str::contains("- dependent: Plugin 'dependent' cannot load"));
    Ok(())
}

#[test]
fn test_list_shows_plugins_and_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let plugins = tmp.path().join("plugins");
    fs::create_dir(&plugins)?;
    write_plugin(&plugins, "economy", "builtin:noop", &[]);
    write_plugin(&plugins, "cheats", "builtin:noop", &[]);
    let config = tmp.path().join("hearth.yaml");
    fs::write(
        &config,
        format!("plugins_dir: {}\ndisabled:\n  - cheats\n", plugins.display()),
    )?;

    Command::cargo_bin("hearth")?
        .arg("--config")
        .arg(&config)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("economy@1.0.0"))
        .stdout(predicate::str::contains("cheats").not());
    Ok(())
}

#[test]
fn test_bad_config_fails() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let config = tmp.path().join("hearth.ini");
    fs::write(&config, "nothing")?;

    Command::cargo_bin("hearth")?
        .arg("--config")
        .arg(&config)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
    Ok(())
}
