//! Built-in rule definitions
//!
//! Cross-platform secret and destructive-command rules, a few
//! platform-specific ones, and modal rules for common deploy and publish
//! tools.

use crate::rules::modal::{ModalRuleDefinition, Mode};
use crate::rules::registry::{Category, Definition, Platform, Registry, StaticRule};
use crate::rules::{Pattern, Rule};

/// Compile a built-in regex. Every pattern here is exercised by tests.
fn re(source: &str) -> Pattern {
    Pattern::regex(source).unwrap()
}

fn static_rules() -> Vec<(Category, StaticRule)> {
    vec![
        (
            Category::Secrets,
            StaticRule::new("dotenv-files", Platform::Any)
                .with_description("Environment files that usually hold secrets")
                .with_file_rules(vec![
                    Rule::allow(re(r"\.env\.(example|sample|template)$")),
                    Rule::deny(re(r"(^|/)\.env(\.[\w.-]+)?$"))
                        .with_reason("Environment file may contain secrets"),
                ]),
        ),
        (
            Category::Secrets,
            StaticRule::new("ssh-keys", Platform::Any)
                .with_description("SSH private keys")
                .with_file_rules(vec![
                    Rule::deny(re(r"\.ssh/id_(rsa|ed25519|ecdsa|dsa)$"))
                        .with_reason("SSH private key file"),
                    Rule::deny(re(r"\.pem$")).with_reason("PEM certificate or key file"),
                ]),
        ),
        (
            Category::Credentials,
            StaticRule::new("cloud-credentials", Platform::Any)
                .with_description("Cloud provider and cluster credentials")
                .with_file_rules(vec![
                    Rule::deny(re(r"\.aws/credentials$")).with_reason("AWS credentials file"),
                    Rule::deny(re(r"\.kube/config$")).with_reason("Kubernetes config"),
                    Rule::deny(re(r"\.docker/config\.json$")).with_reason("Docker registry auth"),
                    Rule::deny(re(r"gcloud/.*credentials.*\.json$"))
                        .with_reason("Google Cloud credentials"),
                ])
                .with_env_rules(vec![
                    Rule::mask(re(r"^AWS_(SECRET_ACCESS_KEY|SESSION_TOKEN|ACCESS_KEY_ID)$")),
                    Rule::mask(re(r"(?i)(_TOKEN|_SECRET|_API_KEY|_PASSWORD)$")),
                ]),
        ),
        (
            Category::Credentials,
            StaticRule::new("package-registry-auth", Platform::Any)
                .with_description("Package manager auth files")
                .with_file_rules(vec![
                    Rule::deny(re(r"\.npmrc$")).with_reason("npm config may contain auth tokens"),
                    Rule::deny(re(r"\.pypirc$")).with_reason("PyPI config may contain credentials"),
                    Rule::deny(re(r"\.netrc$")).with_reason("netrc contains credentials"),
                ]),
        ),
        (
            Category::Destructive,
            StaticRule::new("destructive-rm", Platform::Any)
                .with_description("Recursive deletes of the filesystem root or home")
                .with_cli_rules(vec![
                    Rule::deny(re(r"^rm\s+(-[rfv]+\s+)*/\*?\s*$"))
                        .with_reason("Attempting to delete root filesystem")
                        .into_cli()
                        .with_alternatives(["rm -ri <path>"]),
                    Rule::deny(re(r"^rm\s+(-[rfv]+\s+)*(~|\$HOME)/?\s*$"))
                        .with_reason("Attempting to delete home directory")
                        .into_cli()
                        .with_alternatives(["rm -ri <path>"]),
                ]),
        ),
        (
            Category::Destructive,
            StaticRule::new("disk-tools", Platform::Linux)
                .with_description("Raw disk writes and formatting")
                .with_cli_rules(vec![
                    Rule::deny(re(r"^dd\b.*\bof=/dev/(sd|nvme|hd|vd|xvd)[a-z]"))
                        .with_reason("Writing directly to disk device")
                        .into_cli(),
                    Rule::deny(re(r"^mkfs(\.\w+)?\s+/dev/"))
                        .with_reason("Formatting disk device")
                        .into_cli(),
                ]),
        ),
        (
            Category::Secrets,
            StaticRule::new("linux-shadow", Platform::Linux)
                .with_description("Local password hashes")
                .with_file_rules(vec![Rule::deny(re(r"^/etc/g?shadow-?$"))
                    .with_reason("System password hashes")]),
        ),
        (
            Category::Secrets,
            StaticRule::new("macos-keychain", Platform::MacOs)
                .with_description("macOS keychain access")
                .with_file_rules(vec![Rule::deny(re(r"Library/Keychains/"))
                    .with_reason("macOS keychain database")])
                .with_cli_rules(vec![Rule::deny(re(
                    r"^security\s+(find-(generic|internet)-password|dump-keychain)\b",
                ))
                .with_reason("Reading secrets from the keychain")
                .into_cli()]),
        ),
        (
            Category::Destructive,
            StaticRule::new("windows-format", Platform::Windows)
                .with_description("Formatting drives on Windows")
                .with_cli_rules(vec![Rule::deny(re(r"(?i)^format(\.com)?\s+[a-z]:"))
                    .with_reason("Formatting a drive")
                    .into_cli()]),
        ),
    ]
}

fn modal_rules() -> Vec<(Category, ModalRuleDefinition)> {
    vec![
        (
            Category::Deployment,
            ModalRuleDefinition::new(
                "wrangler-deploy",
                Mode::Passive,
                "Deploying Cloudflare Workers from the agent is not allowed",
                "This deploys to Cloudflare. Confirm the target environment before running.",
            )
            .with_description("Cloudflare wrangler deploys")
            .with_invocations(vec![re(r"^wrangler\s+(deploy|publish)\b")])
            .with_config_files(vec![re(r"wrangler\.(toml|jsonc?)$")])
            .with_credential_env(vec![re(r"^CLOUDFLARE_(API_TOKEN|API_KEY)$")])
            .with_safe_alternatives(["wrangler deploy --dry-run"]),
        ),
        (
            Category::Publishing,
            ModalRuleDefinition::new(
                "npm-publish",
                Mode::Strict,
                "Publishing packages from the agent is not allowed",
                "This publishes to the npm registry and cannot be undone for this version.",
            )
            .with_description("npm package publishing")
            .with_invocations(vec![re(r"^(npm|pnpm|yarn)\s+publish\b")])
            .with_credential_env(vec![re(r"^NPM_TOKEN$")])
            .with_safe_alternatives(["npm publish --dry-run", "npm pack"]),
        ),
        (
            Category::Deployment,
            ModalRuleDefinition::new(
                "terraform-apply",
                Mode::Strict,
                "Applying infrastructure changes from the agent is not allowed",
                "This changes real infrastructure. Review the plan output first.",
            )
            .with_description("Terraform apply and destroy")
            .with_invocations(vec![re(r"^terraform\s+(apply|destroy)\b")])
            .with_config_files(vec![re(r"\.tfstate(\.backup)?$")])
            .with_safe_alternatives(["terraform plan"]),
        ),
        (
            Category::Destructive,
            ModalRuleDefinition::new(
                "git-force-push",
                Mode::Strict,
                "Force pushing from the agent is not allowed",
                "Force pushing rewrites remote history.",
            )
            .with_description("git push --force")
            .with_invocations(vec![re(r"^git\s+push\b.*\s(-f|--force)(\s|$)")])
            .with_safe_alternatives(["git push --force-with-lease"]),
        ),
        (
            Category::Destructive,
            ModalRuleDefinition::new(
                "kubectl-delete",
                Mode::Strict,
                "Deleting cluster resources from the agent is not allowed",
                "",
            )
            .with_description("kubectl delete")
            .with_invocations(vec![re(r"^kubectl\s+delete\b")])
            .with_safe_alternatives(["kubectl delete --dry-run=client"])
            .fixed_mode(),
        ),
    ]
}

/// Register every built-in definition. Safe to call more than once.
pub fn register_builtins(registry: &mut Registry) -> usize {
    let statics = static_rules()
        .into_iter()
        .map(|(category, rule)| (category, Definition::Static(rule)));
    let modals = modal_rules()
        .into_iter()
        .map(|(category, modal)| (category, Definition::Modal(modal)));

    registry.register_all(statics.chain(modals))
}
