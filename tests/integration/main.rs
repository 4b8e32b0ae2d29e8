//! Integration tests for the precache binary

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// Binary isolated to a temp state dir and config file
    fn precache(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("precache");
        cmd.env("PRECACHE_STATE_DIR", temp.path().join("state"))
            .env("PRECACHE_CONFIG", temp.path().join("config.toml"))
            .env("CI", "1");
        cmd
    }

    /// Point the origin at a port nothing listens on
    fn write_offline_config(dir: &Path) {
        std::fs::write(
            dir.join("config.toml"),
            "[origin]\nbase_url = \"http://127.0.0.1:1\"\ntimeout_secs = 2\n",
        )
        .unwrap();
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        precache(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("offline asset cache"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        precache(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("precache"));
    }

    #[test]
    fn manifest_lists_builtin_assets() {
        let temp = TempDir::new().unwrap();
        precache(&temp)
            .arg("manifest")
            .assert()
            .success()
            .stdout(predicate::str::contains("fusikab-dj-cache-v1"))
            .stdout(predicate::str::contains("/static/css/style.css"))
            .stdout(predicate::str::contains("/templates/mentions.html"));
    }

    #[test]
    fn config_path_follows_env() {
        let temp = TempDir::new().unwrap();
        precache(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        precache(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[origin]"))
            .stdout(predicate::str::contains("install_attempts = 1"));
    }

    #[test]
    fn config_init_writes_defaults() {
        let temp = TempDir::new().unwrap();
        precache(&temp).args(["config", "init"]).assert().success();

        let written = std::fs::read_to_string(temp.path().join("config.toml")).unwrap();
        assert!(written.contains("base_url"));

        precache(&temp)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn invalid_config_fails() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[origin\n").unwrap();
        precache(&temp)
            .arg("status")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn list_empty() {
        let temp = TempDir::new().unwrap();
        precache(&temp)
            .args(["list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache stores"));

        precache(&temp)
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn status_with_nothing_installed() {
        let temp = TempDir::new().unwrap();
        precache(&temp)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("fusikab-dj-cache-v1"))
            .stdout(predicate::str::contains("No generations installed"));
    }

    #[test]
    fn activate_before_install_fails() {
        let temp = TempDir::new().unwrap();
        precache(&temp)
            .arg("activate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Generation not installed"))
            .stderr(predicate::str::contains("Run: precache install"));
    }

    #[test]
    fn install_fails_when_origin_offline() {
        let temp = TempDir::new().unwrap();
        write_offline_config(temp.path());

        precache(&temp)
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("could not be cached"));

        precache(&temp)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("uninstalled"));
    }

    #[test]
    fn fetch_uncached_with_origin_offline() {
        let temp = TempDir::new().unwrap();
        write_offline_config(temp.path());

        precache(&temp)
            .args(["fetch", "/"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Resource unavailable"));
    }
}
