use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOGIN_PAGE: &str = r#"<html><body>
  <form class="login-form" action="/login" method="post">
    <input type="text" name="Login"><input type="password" name="Password">
  </form>
</body></html>"#;

const FRONT_PAGE: &str = r#"<html><body>
  <div class="name-container"><span class="teacher">Parent Person</span></div>
  <a href="/passwd/settings">Account settings</a>
  <a href="/!0111">Alice Example</a>
  <a href="/!0222">Bob Example</a>
  <a href="/!0111/messages">3 new messages</a>
</body></html>"#;

/// Isolated HOME and XDG directories for one run.
struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(xdg_config.join("wilmes")).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_config,
            xdg_state,
        }
    }

    fn write_config(&self, content: &str) {
        fs::write(self.xdg_config.join("wilmes/config.toml"), content)
            .expect("failed to write config");
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(PathBuf::from(assert_cmd::cargo::cargo_bin!("wilmes")))
            .args(args)
            .env("HOME", &self.home)
            .env("XDG_CONFIG_HOME", &self.xdg_config)
            .env("XDG_STATE_HOME", &self.xdg_state)
            .env("WILMES_PASSWORD", "secret")
            .env_remove("RUST_LOG")
            .output()
            .unwrap_or_else(|e| panic!("failed to execute wilmes: {e}"))
    }
}

async fn mock_portal() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("langid", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(303).insert_header("Location", "/"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FRONT_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    server
}

#[test]
fn test_help() {
    let env = CliTestEnv::new();
    let output = env.run(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--check-only"));
    assert!(stdout.contains("--news"));
}

#[test]
fn test_missing_url_fails() {
    let env = CliTestEnv::new();
    let output = env.run(&["--check-only", "--username", "guardian"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no portal URL"), "stderr: {stderr}");
}

#[test]
fn test_invalid_config_fails() {
    let env = CliTestEnv::new();
    env.write_config("[portal]\ntimezone = \"Nowhere/Special\"\n");
    let output = env.run(&["--check-only", "-U", "https://school.example.com", "-u", "x"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid configuration"), "stderr: {stderr}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_only_prints_counts_and_logs_out() {
    let server = mock_portal().await;
    let env = CliTestEnv::new();
    env.write_config(&format!(
        "[portal]\nurl = \"{}\"\nusername = \"guardian\"\n",
        server.uri()
    ));

    let output = env.run(&["--check-only"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "Alice Example: 3\nBob Example: 0\n"
    );
}
