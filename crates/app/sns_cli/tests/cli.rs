use assert_cmd::Command;
use predicates::prelude::*;

fn sns_cli() -> Command {
    let mut cmd = Command::cargo_bin("sns_cli").unwrap();
    cmd.env_remove("DATABASE_URL");
    cmd
}

#[test]
fn version_prints_package_version() {
    sns_cli()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("sns_cli "))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn gen_secret_prints_url_safe_secret() {
    let output = sns_cli().arg("gen-secret").assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let secret = stdout.trim();

    // 48 bytes → 64 base64url chars.
    assert_eq!(secret.len(), 64);
    assert!(
        secret
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    );
}

#[test]
fn gen_secret_refuses_weak_lengths() {
    sns_cli()
        .args(["gen-secret", "--bytes", "16"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("16"));
}

#[test]
fn revoke_sessions_requires_user_id() {
    sns_cli()
        .arg("revoke-sessions")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--user-id"));
}

#[test]
fn cleanup_with_bad_database_url_fails() {
    sns_cli()
        .args(["cleanup-tokens", "--database-url", "not-a-url"])
        .assert()
        .failure()
        .code(1);
}
