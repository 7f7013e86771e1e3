//! Integration tests for file and directory policy checks

use agent_policy::output::{DirectoryView, FileView};
use agent_policy::rules::registry::{Platform, Registry};
use agent_policy::{Action, CheckRequest, Config, Pattern, PolicyEngine, PolicySet, Rule, RuleList};

fn engine(toml: &str) -> PolicyEngine {
    let config = Config::from_toml(toml).unwrap();
    PolicyEngine::new(
        config
            .build_policy_for(&Registry::with_builtins(), Platform::Linux)
            .unwrap(),
    )
}

fn secrets_engine() -> PolicyEngine {
    engine(
        r#"
        [[rules]]
        id = "dotenv-files"

        [[rules]]
        id = "ssh-keys"

        [[rules]]
        id = "cloud-credentials"

        [[rules]]
        id = "package-registry-auth"

        [[rules]]
        id = "linux-shadow"
        "#,
    )
}

fn check_read(engine: &PolicyEngine, path: &str) -> bool {
    engine.check_file(path).is_allowed()
}

// ============================================================================
// Explicit rules
// ============================================================================

#[test]
fn test_node_modules_denied_end_to_end() {
    let engine = PolicyEngine::new(PolicySet {
        file_rules: RuleList::file(vec![Rule::deny(Pattern::literal("node_modules"))]),
        ..PolicySet::default()
    });

    let outcome = engine.check_file("packages/app/node_modules/x");
    let blocked = outcome.blocked().expect("path should be hidden");
    assert_eq!(blocked.details.policy, "fileRules[0]");
    assert_eq!(blocked.reason, "file_hidden_by_policy");
    assert_eq!(blocked.details.target, "packages/app/node_modules/x");
}

#[test]
fn test_first_match_wins_in_config_order() {
    let engine = engine(
        r#"
        [[file_rules]]
        match = "docs/"
        action = "allow"

        [[file_rules]]
        regex = "secret"
        action = "deny"
        "#,
    );
    assert!(check_read(&engine, "docs/secret-handling.md"));
    assert!(!check_read(&engine, "config/secret.yml"));
}

#[test]
fn test_mask_and_rewrite_from_config() {
    let engine = engine(
        r#"
        [[file_rules]]
        regex = "secrets\\.ya?ml$"
        action = "mask"
        replacement = "api_key: <redacted>"

        [[file_rules]]
        exact = "config/local.json"
        action = "rewrite"
        replacement = "{}"
        "#,
    );

    let outcome = engine.check_file("deploy/secrets.yaml");
    let details = &outcome.blocked().unwrap().details;
    assert_eq!(details.action, Action::Mask);
    assert_eq!(details.replacement.as_deref(), Some("api_key: <redacted>"));

    let outcome = engine.check_file("config/local.json");
    assert_eq!(
        outcome.into_value(),
        Some(FileView::Replaced("{}".to_string()))
    );
    // exact does not match substrings
    assert!(check_read(&engine, "app/config/local.json"));
}

// ============================================================================
// Built-in secret rules
// ============================================================================

#[test]
fn test_env_files_blocked() {
    let engine = secrets_engine();
    assert!(!check_read(&engine, ".env"));
    assert!(!check_read(&engine, "/home/user/project/.env"));
    assert!(!check_read(&engine, ".env.local"));
    assert!(!check_read(&engine, "app/.env.production"));
}

#[test]
fn test_env_templates_allowed() {
    let engine = secrets_engine();
    assert!(check_read(&engine, ".env.example"));
    assert!(check_read(&engine, "app/.env.sample"));
    assert!(check_read(&engine, ".env.template"));
    assert!(check_read(&engine, "src/environment.ts"));
}

#[test]
fn test_credentials_blocked() {
    let engine = secrets_engine();
    assert!(!check_read(&engine, "/home/user/.ssh/id_rsa"));
    assert!(!check_read(&engine, "/home/user/.ssh/id_ed25519"));
    assert!(!check_read(&engine, "certs/server.pem"));
    assert!(!check_read(&engine, "/home/user/.aws/credentials"));
    assert!(!check_read(&engine, "/home/user/.kube/config"));
    assert!(!check_read(&engine, "/home/user/.npmrc"));
    assert!(!check_read(&engine, "/home/user/.netrc"));
    assert!(!check_read(&engine, "/etc/shadow"));
}

#[test]
fn test_normal_files_allowed() {
    let engine = secrets_engine();
    assert!(check_read(&engine, "README.md"));
    assert!(check_read(&engine, "/home/user/.ssh/id_rsa.pub"));
    assert!(check_read(&engine, "/home/user/.ssh/known_hosts"));
    assert!(check_read(&engine, "src/main.rs"));
    assert!(check_read(&engine, "/etc/passwd"));
}

#[test]
fn test_filter_paths() {
    let engine = secrets_engine();
    let paths = ["README.md", ".env", ".env.example", "deploy/key.pem", "Cargo.toml"];
    assert_eq!(
        engine.files().filter(&paths),
        vec!["README.md", ".env.example", "Cargo.toml"]
    );
}

// ============================================================================
// Directories
// ============================================================================

#[test]
fn test_directory_checks() {
    let engine = engine(
        r#"
        [[file_rules]]
        match = "private"
        action = "rewrite"
        replacement = "unused"

        [[file_rules]]
        match = ".git"
        action = "deny"
        "#,
    );

    assert_eq!(
        engine.check_directory("private", None).into_value(),
        Some(DirectoryView::Listing(vec![]))
    );
    assert!(engine.check_directory("repo/.git", None).is_blocked());
    assert_eq!(
        engine.check_directory("src", None).into_value(),
        Some(DirectoryView::Unchanged)
    );

    let listing = vec!["HEAD".to_string(), "config".to_string()];
    assert_eq!(
        engine.check_directory("repo/.git", Some(listing.as_slice())).into_value(),
        Some(DirectoryView::Listing(listing))
    );
}

#[test]
fn test_directory_request_json() {
    let engine = engine("[[file_rules]]\nmatch = \"private\"\naction = \"rewrite\"\nreplacement = \"x\"\n");
    let request = CheckRequest::from_json(r#"{"kind":"directory","target":"private"}"#).unwrap();
    let (record, response) = engine.check(&request);
    assert_eq!(record.action, Action::Rewrite);
    assert_eq!(record.policy.as_deref(), Some("fileRules[0]"));
    assert_eq!(response.to_json(), r#"{"ok":true,"entries":[]}"#);
}
