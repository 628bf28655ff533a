//! Basic CLI tests for the duco command-line interface.
//!
//! Everything runs against the built-in fake box.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn duco() -> Command {
    let mut cmd = Command::cargo_bin("duco").unwrap();
    cmd.env_remove("DUCO_CONFIG")
        .env_remove("DUCO_MODBUS_HOST")
        .env_remove("DUCO_SLAVE_ID")
        .env_remove("DUCO_UPDATE_INTERVAL_SECS");
    cmd
}

/// Test that the CLI binary exists and shows help.
#[test]
fn test_cli_help() {
    duco()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Poll a Duco ventilation box"))
        .stdout(predicate::str::contains("discover"))
        .stdout(predicate::str::contains("poll"))
        .stdout(predicate::str::contains("set"))
        .stdout(predicate::str::contains("select"));
}

/// Test that the CLI shows version information.
#[test]
fn test_cli_version() {
    duco()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("duco"));
}

/// Test that providing no subcommand shows an error.
#[test]
fn test_no_subcommand_shows_error() {
    duco().assert().failure().code(2);
}

#[test]
fn test_fake_discover() {
    duco()
        .args(["--fake", "discover"])
        .assert()
        .success()
        .stdout(predicate::str::contains("MASTER_UNIT"))
        .stdout(predicate::str::contains("CO2_VALVE"))
        .stdout(predicate::str::contains("zone 1"))
        .stdout(predicate::str::contains("slave_1_zone1"));
}

#[test]
fn test_fake_discover_json() {
    duco()
        .args(["--fake", "discover", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kind\": \"CO2_VALVE\""))
        .stdout(predicate::str::contains("\"base\": 20"));
}

#[test]
fn test_fake_poll_prints_states() {
    duco()
        .args(["--fake", "poll"])
        .assert()
        .success()
        .stdout(predicate::str::contains("master_unit_fan"))
        .stdout(predicate::str::contains("69 %"))
        .stdout(predicate::str::contains("20.1 °C"))
        .stdout(predicate::str::contains("co2_valve_valve_flow_zone1"))
        .stdout(predicate::str::contains("unknown"));
}

#[test]
fn test_fake_poll_json() {
    duco()
        .args(["--fake", "poll", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"unique_id\":\"master_unit_status\""))
        .stdout(predicate::str::contains("\"value\":\"AUTO\""));
}

#[test]
fn test_set_number() {
    duco()
        .args(["--fake", "set", "master_unit_ventilation_target", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("master_unit_ventilation_target set to 50"));
}

#[test]
fn test_set_accepts_no_override_sentinel() {
    duco()
        .args(["--fake", "set", "master_unit_ventilation_target", "-1"])
        .assert()
        .success();
}

#[test]
fn test_set_out_of_range_fails() {
    duco()
        .args(["--fake", "set", "master_unit_ventilation_target", "150"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value"));
}

#[test]
fn test_select_status() {
    duco()
        .args(["--fake", "select", "master_unit_status", "man_high"])
        .assert()
        .success()
        .stdout(predicate::str::contains("set to MAN_HIGH"));
}

#[test]
fn test_select_non_writable_status_fails() {
    duco()
        .args(["--fake", "select", "master_unit_status", "TEMP_HIGH"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not writable"));
}

#[test]
fn test_unknown_entity_fails() {
    duco()
        .args(["--fake", "set", "master_unit_turbo", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown entity"));
}

#[test]
fn test_invalid_slave_id_rejected() {
    duco()
        .args(["--fake", "--slave", "40", "discover"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "fake = true\nslave_id = 7").unwrap();

    duco()
        .arg("--config")
        .arg(file.path())
        .arg("discover")
        .assert()
        .success()
        .stdout(predicate::str::contains("slave_7_zone1"));
}

#[test]
fn test_missing_config_file_fails() {
    duco()
        .args(["--config", "/nonexistent/duco.toml", "discover"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}
