//! Integration tests for modal rules and the rule registry

use agent_policy::rules::modal::{resolve, ModalOptions, ModalRuleDefinition, Mode};
use agent_policy::rules::registry::{self, Category, Definition, Platform, Registry};
use agent_policy::{Action, Config, Pattern, PolicyEngine, RuleKind};

fn engine_with(registry: &Registry, toml: &str) -> PolicyEngine {
    let config = Config::from_toml(toml).unwrap();
    PolicyEngine::new(config.build_policy_for(registry, Platform::Linux).unwrap())
}

fn deploy_definition() -> ModalRuleDefinition {
    ModalRuleDefinition::new(
        "fly-deploy",
        Mode::Passive,
        "Deploying to Fly.io from the agent is not allowed",
        "This deploys to Fly.io production.",
    )
    .with_invocations(vec![Pattern::regex(r"^fly(ctl)?\s+deploy\b").unwrap()])
    .with_config_files(vec![Pattern::regex(r"fly\.toml$").unwrap()])
    .with_credential_env(vec![Pattern::exact("FLY_API_TOKEN")])
    .with_safe_alternatives(["fly deploy --build-only"])
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_default_passive_yields_allow() {
    let rules = resolve(&deploy_definition(), None, &ModalOptions::default());
    assert_eq!(rules.cli_rules[0].rule.action, Action::Allow);
    assert_eq!(rules.file_rules[0].action, Action::Allow);
    assert!(rules.env_rules.is_empty());
}

#[test]
fn test_explicit_strict_yields_deny_with_message() {
    let options = ModalOptions {
        message: Some("Ship through the release pipeline".to_string()),
        context: None,
    };
    let rules = resolve(&deploy_definition(), Some(Mode::Strict), &options);

    for rule in &rules.cli_rules {
        assert_eq!(rule.rule.action, Action::Deny);
        assert_eq!(rule.rule.reason.as_deref(), Some("Ship through the release pipeline"));
        assert_eq!(rule.safe_alternatives, vec!["fly deploy --build-only"]);
    }
    assert_eq!(rules.env_rules[0].pattern, Pattern::exact("FLY_API_TOKEN"));
}

// ============================================================================
// Engine behaviour
// ============================================================================

#[test]
fn test_passive_modal_adds_context() {
    let mut registry = Registry::new();
    registry.register(Category::Deployment, Definition::Modal(deploy_definition()));
    let engine = engine_with(&registry, "[[rules]]\nid = \"fly-deploy\"\n");

    let outcome = engine.check_command("fly deploy");
    assert!(outcome.is_allowed());
    assert_eq!(outcome.context(), Some("This deploys to Fly.io production."));

    let outcome = engine.check_command("npx fly deploy");
    let context = outcome.context().unwrap();
    assert!(context.starts_with("This deploys to Fly.io production."));
    assert!(context.contains("package runner prefix stripped"));

    assert_eq!(
        engine.check_env("FLY_API_TOKEN", "abc").into_value().as_deref(),
        Some("abc")
    );
}

#[test]
fn test_strict_modal_blocks_wrapped_invocation() {
    let engine = engine_with(
        registry::builtin(),
        "[[rules]]\nid = \"wrangler-deploy\"\nmode = \"strict\"\n",
    );

    let outcome = engine.check_command(r#"bash -c "/usr/bin/npx wrangler deploy""#);
    let blocked = outcome.blocked().expect("deploy should be blocked");
    assert!(blocked
        .reason
        .starts_with("Deploying Cloudflare Workers from the agent is not allowed"));
    assert_eq!(blocked.details.safe_alternatives, vec!["wrangler deploy --dry-run"]);

    assert!(engine.check_file("worker/wrangler.toml").is_blocked());
    assert!(engine.check_env("CLOUDFLARE_API_TOKEN", "t").is_blocked());
}

#[test]
fn test_fixed_mode_ignores_config() {
    let engine = engine_with(
        registry::builtin(),
        "[[rules]]\nid = \"kubectl-delete\"\nmode = \"passive\"\n",
    );
    assert!(engine.check_command("kubectl delete pod api-0").is_blocked());
    assert!(engine.check_command("kubectl get pods").is_allowed());
}

#[test]
fn test_git_force_push() {
    let engine = engine_with(registry::builtin(), "[[rules]]\nid = \"git-force-push\"\n");
    assert!(engine.check_command("git push --force origin main").is_blocked());
    assert!(engine.check_command("/usr/bin/git push -f").is_blocked());
    assert!(engine.check_command("git push --force-with-lease").is_allowed());
    assert!(engine.check_command("git push origin main").is_allowed());
}

#[test]
fn test_explain_modal_decision() {
    let engine = engine_with(
        registry::builtin(),
        "[[rules]]\nid = \"npm-publish\"\n",
    );
    let explanation = engine.explain(RuleKind::Cli, "npx npm publish");
    assert_eq!(explanation.action, Action::Deny);
    assert_eq!(explanation.variant.as_deref(), Some("npm publish"));
    assert_eq!(explanation.policy.as_deref(), Some("cliRules[0]"));
    assert_eq!(
        explanation.reason.as_deref(),
        Some("Publishing packages from the agent is not allowed")
    );
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn test_registry_idempotent_registration() {
    let mut registry = Registry::with_builtins();
    let before = registry.len();

    let replacement = ModalRuleDefinition::new("npm-publish", Mode::Passive, "x", "y");
    assert!(!registry.register(Category::Publishing, Definition::Modal(replacement)));
    assert_eq!(registry.len(), before);
    assert_eq!(registry.modal("npm-publish").unwrap().default_mode, Mode::Strict);
}

#[test]
fn test_registry_browsing() {
    let registry = registry::builtin();
    assert!(registry.by_category(Category::Deployment).any(|e| e.id() == "wrangler-deploy"));
    assert!(registry
        .for_platform(Platform::Linux)
        .all(|e| e.platform() != Platform::MacOs));
    assert!(registry.ids().any(|id| id == "dotenv-files"));
}
