use serial_test::serial;
use std::{fs, path::PathBuf};
use techtalk_config::{LlmConfig, TechTalkConfigLoader};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
server:
  bind: "0.0.0.0:9000"
llm:
  provider: openai
  model: "gpt-4o-mini"
  auth_token: "${TECHTALK_TEST_OPENAI_KEY}"
email:
  username: "mailer"
  password: "secret"
  sender: "noreply@example.com"
  recipients: ["dev@example.com"]
"#;
    let p = write_yaml(&tmp, "techtalk.yaml", file_yaml);

    temp_env::with_var("TECHTALK_TEST_OPENAI_KEY", Some("sk-from-env"), || {
        let config = TechTalkConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load system config");

        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.llm.api_key(), Some("sk-from-env"));
        let LlmConfig::Openai { model, .. } = &config.llm;
        assert_eq!(model, "gpt-4o-mini");
        assert_eq!(config.email.recipient_list(), vec!["dev@example.com"]);
        // untouched sections keep their defaults
        assert_eq!(config.fetch.user_agent, "Mozilla/5.0 (compatible; TechTalkBot/1.0)");
        assert_eq!(config.scheduler.weekly_digest, "0 9 * * Mon");
    });
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(
        &tmp,
        "techtalk.yaml",
        "email:\n  smtp_port: 25\n  password: \"from-file\"\n",
    );

    temp_env::with_vars(
        [
            ("TECHTALK__EMAIL__SMTP_PORT", Some("2525")),
            ("TECHTALK__EMAIL__PASSWORD", Some("123456")),
            ("TECHTALK__EMAIL__RECIPIENTS", Some("a@example.com,b@example.com")),
        ],
        || {
            let config = TechTalkConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load config");

            assert_eq!(config.email.smtp_port, 2525);
            assert_eq!(config.email.password.as_deref(), Some("123456"));
            assert_eq!(
                config.email.recipient_list(),
                vec!["a@example.com", "b@example.com"]
            );
        },
    );
}

#[test]
#[serial]
fn optional_file_may_be_missing() {
    let tmp = TempDir::new().unwrap();
    let config = TechTalkConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults only");

    assert_eq!(config.database.url, "sqlite://techtalk.db?mode=rwc");
    assert_eq!(config.server.cors_origins, vec!["http://localhost:3000"]);
}

#[test]
#[serial]
fn required_file_must_exist() {
    let tmp = TempDir::new().unwrap();
    let result = TechTalkConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}
