//! End-to-end exercise of the `build` subcommand against the compiled
//! binary, the way `assert_cmd` is meant to be used: spawn the real
//! process, feed it a source fixture, check stdout.

use std::io::Write;

use assert_cmd::Command;

#[test]
fn build_emits_a_single_document_with_canonicalized_metadata_name() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("app.go");
    std::fs::File::create(&source)
        .unwrap()
        .write_all(br#"var MyConfigMap = &corev1.ConfigMap{ Name: "my-config", Data: map[string]string{"a": "b"} }"#)
        .unwrap();

    Command::cargo_bin("wetwire")
        .unwrap()
        .args(["build", source.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicates::str::contains("apiVersion: v1"))
        .stdout(predicates::str::contains("kind: ConfigMap"))
        .stdout(predicates::str::contains("name: my-config-map"));
}

#[test]
fn build_on_a_missing_path_fails() {
    Command::cargo_bin("wetwire")
        .unwrap()
        .args(["build", "/no/such/path/exists.go"])
        .assert()
        .failure();
}

#[test]
fn graph_ascii_roots_on_the_resource_with_no_dependencies() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("app.go");
    std::fs::File::create(&source)
        .unwrap()
        .write_all(
            br#"
            var WebAppConfig = &corev1.ConfigMap{ Name: "web-app" }
            var WebAppDeployment = &appsv1.Deployment{ Name: WebAppConfig.Name }
            "#,
        )
        .unwrap();

    let assert = Command::cargo_bin("wetwire")
        .unwrap()
        .args(["graph", source.to_str().unwrap()])
        .assert()
        .success();
    let output = assert.get_output();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let config_idx = stdout.find("WebAppConfig").unwrap();
    let deploy_idx = stdout.find("WebAppDeployment").unwrap();
    assert!(config_idx < deploy_idx, "expected config before deployment:\n{}", stdout);
}
