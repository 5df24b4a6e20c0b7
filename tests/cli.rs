use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const BIN: &str = "atticmatic-config";

#[test]
fn generate_then_validate() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let config = dir.child("config.yaml");

    for archiver in ["attic", "borg"] {
        config.assert(predicate::path::missing());

        Command::cargo_bin(BIN)?
            .args(["--archiver", archiver, "-c"])
            .arg(config.path())
            .arg("generate")
            .assert()
            .success();
        config.assert(predicate::str::contains(format!(
            "user@backupserver:sourcehostname.{archiver}"
        )));

        Command::cargo_bin(BIN)?
            .args(["--archiver", archiver, "-c"])
            .arg(config.path())
            .arg("validate")
            .assert()
            .success()
            .stderr(predicate::str::is_empty());

        std::fs::remove_file(config.path())?;
    }

    dir.close()?;
    Ok(())
}

#[test]
fn generate_refuses_existing_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let config = dir.child("config.yaml");
    config.write_str("repository: mine\n")?;

    Command::cargo_bin(BIN)?
        .args(["--archiver", "borg", "-c"])
        .arg(config.path())
        .arg("generate")
        .assert()
        .code(73)
        .stderr(predicate::str::contains("File already exists"));

    config.assert("repository: mine\n");
    Ok(())
}

#[test]
fn validate_reports_position() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let config = dir.child("config.yaml");
    config.write_str(
        "source_directories:\n    - /home\nrepository: host:repo\ncreate:\n    umask: oops\n",
    )?;

    Command::cargo_bin(BIN)?
        .args(["--archiver", "borg", "-c"])
        .arg(config.path())
        .arg("validate")
        .assert()
        .code(78)
        .stderr(predicate::str::contains("line 5, column 12:"))
        .stderr(predicate::str::contains("    umask: oops\n           ^\nInvalid value"));

    Ok(())
}

#[test]
fn validate_reports_syntax_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let config = dir.child("config.yaml");
    config.write_str("source_directories: [/home\nrepository: host:repo\n")?;

    Command::cargo_bin(BIN)?
        .args(["--archiver", "attic", "-c"])
        .arg(config.path())
        .arg("validate")
        .assert()
        .code(78)
        .stderr(predicate::str::starts_with("File \""));

    Ok(())
}

#[test]
fn validate_missing_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;

    Command::cargo_bin(BIN)?
        .args(["--archiver", "attic", "-c"])
        .arg(dir.child("missing.yaml").path())
        .arg("validate")
        .assert()
        .code(66)
        .stderr(predicate::str::contains("missing.yaml"));

    Ok(())
}

#[test]
fn operation_is_required() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin(BIN)?
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
    Ok(())
}
