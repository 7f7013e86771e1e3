//! Integration tests for command policy checks

use agent_policy::parser::{normalize, NormalizeOptions};
use agent_policy::rules::registry::{Platform, Registry};
use agent_policy::{Action, CheckRequest, Config, Pattern, PolicyEngine, PolicySet, Rule, RuleList};

fn rm_rf_engine() -> PolicyEngine {
    PolicyEngine::new(PolicySet {
        cli_rules: RuleList::cli(vec![Rule::deny(Pattern::regex("^rm -rf").unwrap())
            .into_cli()
            .with_alternatives(["rm -i"])]),
        ..PolicySet::default()
    })
}

fn builtin_engine(toml: &str) -> PolicyEngine {
    let config = Config::from_toml(toml).unwrap();
    let policy = config
        .build_policy_for(&Registry::with_builtins(), Platform::Linux)
        .unwrap();
    PolicyEngine::new(policy)
}

fn is_allowed(engine: &PolicyEngine, command: &str) -> bool {
    engine.check_command(command).is_allowed()
}

// ============================================================================
// Normalization
// ============================================================================

#[test]
fn test_first_variant_is_trimmed_command() {
    let options = NormalizeOptions::default();
    for command in ["  ls -la  ", "bash -c 'echo hi'", "/usr/bin/git push", "npx -y prettier ."] {
        let variants = normalize(command, &options);
        assert_eq!(variants[0], command.trim());
        assert_eq!(variants, normalize(command, &options));
    }
}

#[test]
fn test_bypass_coverage() {
    let options = NormalizeOptions::default();
    assert!(normalize(r#"bash -c "rm -rf /""#, &options).contains(&"rm -rf /".to_string()));
    assert!(normalize("/usr/bin/git push", &options).contains(&"git push".to_string()));
    assert!(normalize("npx wrangler deploy", &options).contains(&"wrangler deploy".to_string()));
    assert!(normalize(r#"bash -c "/usr/bin/npx wrangler deploy""#, &options)
        .contains(&"wrangler deploy".to_string()));
}

#[test]
fn test_empty_command_has_no_variants() {
    assert!(normalize("", &NormalizeOptions::default()).is_empty());
    assert!(normalize(" \t ", &NormalizeOptions::default()).is_empty());
}

// ============================================================================
// Deny through wrappers
// ============================================================================

#[test]
fn test_subshell_rm_blocked_end_to_end() {
    let outcome = rm_rf_engine().check_command(r#"bash -c "rm -rf /""#);
    let blocked = outcome.blocked().expect("command should be blocked");

    assert!(blocked.reason.contains("command_denied_by_policy"));
    assert!(blocked.reason.contains("subshell"));
    assert_eq!(blocked.details.safe_alternatives, vec!["rm -i"]);
    assert_eq!(blocked.details.policy, "cliRules[0]");
    assert_eq!(blocked.details.action, Action::Deny);
}

#[test]
fn test_nested_and_eval_wrappers_blocked() {
    let engine = rm_rf_engine();
    assert!(!is_allowed(&engine, r#"sh -c "bash -c 'rm -rf /'""#));
    assert!(!is_allowed(&engine, r#"eval "rm -rf /tmp/x""#));
    assert!(!is_allowed(&engine, "/bin/bash -lc 'rm -rf ~'"));
    assert!(is_allowed(&engine, r#"bash -c "ls -la""#));
}

#[test]
fn test_direct_match_has_no_annotation() {
    let outcome = rm_rf_engine().check_command("rm -rf /");
    assert_eq!(outcome.reason(), Some("command_denied_by_policy"));
}

// ============================================================================
// Built-in rules via configuration
// ============================================================================

#[test]
fn test_builtin_destructive_rm() {
    let engine = builtin_engine("[[rules]]\nid = \"destructive-rm\"\n");
    assert!(!is_allowed(&engine, "rm -rf /"));
    assert!(!is_allowed(&engine, "rm -rf ~"));
    assert!(!is_allowed(&engine, r#"bash -c "rm -rf /""#));
    assert!(is_allowed(&engine, "rm -rf ./target"));
}

#[test]
fn test_builtin_disk_tools_linux_only() {
    let config = Config::from_toml("[[rules]]\nid = \"disk-tools\"\n").unwrap();
    let registry = Registry::with_builtins();

    let linux = PolicyEngine::new(config.build_policy_for(&registry, Platform::Linux).unwrap());
    assert!(!is_allowed(&linux, "dd if=/dev/zero of=/dev/sda"));
    assert!(!is_allowed(&linux, "mkfs.ext4 /dev/sdb1"));

    let mac = PolicyEngine::new(config.build_policy_for(&registry, Platform::MacOs).unwrap());
    assert!(is_allowed(&mac, "dd if=/dev/zero of=/dev/sda"));
}

#[test]
fn test_explicit_allow_beats_builtin_deny() {
    let engine = builtin_engine(
        r#"
        [[rules]]
        id = "destructive-rm"

        [[cli_rules]]
        exact = "rm -rf /"
        action = "allow"
        reason = "sandboxed container"
        "#,
    );
    let outcome = engine.check_command("rm -rf /");
    assert!(outcome.is_allowed());
    assert_eq!(outcome.context(), Some("sandboxed container"));
    assert_eq!(outcome.policy(), Some("cliRules[0]"));
}

// ============================================================================
// Actions
// ============================================================================

#[test]
fn test_rewrite_and_fail_closed() {
    let engine = builtin_engine(
        r#"
        [[cli_rules]]
        exact = "npm test"
        action = "rewrite"
        replacement = "npm test -- --ci"

        [[cli_rules]]
        regex = "^curl "
        action = "rewrite"
        "#,
    );
    assert_eq!(
        engine.commands().transform("npm test").as_deref(),
        Some("npm test -- --ci")
    );
    assert_eq!(engine.commands().transform("curl https://example.com"), None);
}

#[test]
fn test_mask_is_denial_for_commands() {
    let engine = builtin_engine("[[cli_rules]]\nmatch = \"printenv\"\naction = \"mask\"\n");
    let outcome = engine.check_command("printenv");
    assert!(outcome.is_blocked());
    assert_eq!(outcome.action(), Action::Mask);
}

#[test]
fn test_normalization_can_be_disabled() {
    let engine = builtin_engine(
        r#"
        [general]
        normalize_commands = false

        [[cli_rules]]
        regex = "^rm -rf"
        action = "deny"
        "#,
    );
    assert!(is_allowed(&engine, r#"bash -c "rm -rf /""#));
    assert!(!is_allowed(&engine, "rm -rf /"));
}

// ============================================================================
// Requests
// ============================================================================

#[test]
fn test_cli_request_response_json() {
    let engine = rm_rf_engine();

    let request = CheckRequest::from_json(r#"{"kind":"cli","target":"git status"}"#).unwrap();
    let (record, response) = engine.check(&request);
    assert!(!record.blocked);
    assert_eq!(response.to_json(), r#"{"ok":true,"command":"git status"}"#);

    let request = CheckRequest::from_json(r#"{"kind":"cli","target":"rm -rf /"}"#).unwrap();
    let (record, response) = engine.check(&request);
    assert!(record.blocked);
    let json: serde_json::Value = serde_json::from_str(&response.to_json()).unwrap();
    assert_eq!(json["ok"], false);
    assert_eq!(json["blocked"], true);
    assert_eq!(json["details"]["target"], "rm -rf /");
    assert_eq!(json["details"]["safeAlternatives"][0], "rm -i");
}
