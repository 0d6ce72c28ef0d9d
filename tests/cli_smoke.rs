use std::process::Command;

use tempfile::tempdir;

fn campaign() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_campaign"));
    // Keep provider credentials from the developer's shell out of the run.
    cmd.env_remove("OPENROUTER_API_KEY")
        .env_remove("SERPER_API_KEY")
        .env_remove("CAMPAIGN_CONFIG");
    cmd
}

#[test]
fn cli_allocate_splits_evenly_without_history() {
    let output = campaign()
        .args(["allocate", "--budget", "1000", "--channel", "A", "--channel", "B"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let split: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(split, serde_json::json!({"A": 500, "B": 500}));
}

#[test]
fn cli_allocate_boosts_channel_named_in_history() {
    let output = campaign()
        .args([
            "allocate",
            "--budget",
            "5000",
            "--channel",
            "Facebook Ads",
            "--channel",
            "Pamphlets",
            "--history",
            "Pamphlets had the highest Conversion Rate.",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let split: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(split["Pamphlets"], 3000);
    assert_eq!(split["Facebook Ads"], 2000);
}

#[test]
fn cli_plan_without_credentials_fails_at_persona() {
    let dir = tempdir().unwrap();
    let request_path = dir.path().join("request.json");
    let out_path = dir.path().join("plan.json");
    let req = serde_json::json!({
        "business_type": "cafe",
        "location": "Pune",
        "goal_description": "Diwali discount sale",
        "budget_fixed": 6000,
        "channel_preference": "Both",
        "user_id": "user123_with_history"
    });
    std::fs::write(&request_path, serde_json::to_string_pretty(&req).unwrap()).unwrap();

    let output = campaign()
        .args(["plan"])
        .arg("--request")
        .arg(&request_path)
        .arg("--out")
        .arg(&out_path)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(!out_path.exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("persona"), "stderr: {stderr}");
}

#[test]
fn cli_rejects_unknown_config_file() {
    let dir = tempdir().unwrap();
    let output = campaign()
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .args(["plan", "--request", "unused.json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing.toml"), "stderr: {stderr}");
}
