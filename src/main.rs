//! agent-policy - Access policy for LLM agents
//!
//! Reads one check request as JSON from stdin and writes the decision as
//! JSON to stdout.
//!
//! # Usage
//!
//! ```bash
//! echo '{"kind":"cli","target":"bash -c \"rm -rf /\""}' | agent-policy
//!
//! # Show which rule decides a target
//! echo '{"kind":"env","target":"AWS_SECRET_ACCESS_KEY"}' | agent-policy --explain
//! ```

use std::env;
use std::io::{self, Read, Write};

use tracing::warn;
use tracing_subscriber::EnvFilter;

use agent_policy::{
    audit::AuditLogger, config::Config, rules::registry, CheckRequest, PolicyEngine, Response,
};

/// Environment variable holding the log filter
const LOG_ENV: &str = "AGENT_POLICY_LOG";

/// Print version information
fn print_version() {
    println!("agent-policy {}", env!("CARGO_PKG_VERSION"));
}

/// Print help message
fn print_help() {
    println!(
        r#"agent-policy - Access policy for LLM agents

USAGE:
    agent-policy [OPTIONS] < request.json

OPTIONS:
    -h, --help              Print this help message
    -v, --version           Print version information
    -c, --config PATH       Path to config file
    -e, --explain           Print the deciding rule instead of the result

REQUEST:
    {{"kind": "cli",       "target": "git push --force"}}
    {{"kind": "file",      "target": "app/.env"}}
    {{"kind": "directory", "target": "secrets", "listing": ["a.txt"]}}
    {{"kind": "env",       "target": "AWS_SECRET_ACCESS_KEY", "value": "..."}}

ENVIRONMENT:
    {}=debug   Log filter (default: warn)
"#,
        LOG_ENV
    );
}

/// Parse command line arguments
struct Args {
    help: bool,
    version: bool,
    explain: bool,
    config_path: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut result = Args {
            help: false,
            version: false,
            explain: false,
            config_path: None,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-h" | "--help" => result.help = true,
                "-v" | "--version" => result.version = true,
                "-e" | "--explain" => result.explain = true,
                "-c" | "--config" => {
                    if i + 1 < args.len() {
                        i += 1;
                        result.config_path = Some(args[i].clone());
                    }
                }
                arg if arg.starts_with("--config=") => {
                    let path = arg.trim_start_matches("--config=");
                    result.config_path = Some(path.to_string());
                }
                _ => {}
            }
            i += 1;
        }

        result
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn write_json(json: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let _ = writeln!(handle, "{}", json);
    let _ = handle.flush();
}

fn main() {
    let args = Args::parse();

    if args.help {
        print_help();
        return;
    }

    if args.version {
        print_version();
        return;
    }

    init_logging();

    let loaded = match args.config_path {
        Some(ref path) => Config::load_from(std::path::Path::new(path)),
        None => Config::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            // Fail closed
            warn!(error = %e, "failed to load config");
            write_json(&Response::policy_unavailable(&e.to_string()).to_json());
            return;
        }
    };

    let engine: PolicyEngine = match config.build_engine(registry::builtin()) {
        Ok(engine) => engine,
        Err(e) => {
            warn!(error = %e, "failed to build policy");
            write_json(&Response::policy_unavailable(&e.to_string()).to_json());
            return;
        }
    };

    let mut input_json = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input_json) {
        write_json(&Response::invalid_input(&e.to_string()).to_json());
        return;
    }

    // Malformed input could be an evasion attempt: deny
    let request = match CheckRequest::from_json(&input_json) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "failed to parse request");
            write_json(&Response::invalid_input(&e.to_string()).to_json());
            return;
        }
    };

    if args.explain {
        let explanation = engine.explain(request.rule_kind(), request.target());
        let json = serde_json::to_string(&explanation).unwrap_or_else(|_| "{}".to_string());
        write_json(&json);
        return;
    }

    let (record, response) = engine.check(&request);

    let audit_path = if config.general.audit_log {
        config.audit_path()
    } else {
        None
    };
    let mut logger = AuditLogger::new(audit_path.as_deref());
    if let Err(e) = logger.log_record(record) {
        warn!(request = %request.summary(), error = %e, "failed to write audit log");
    }

    write_json(&response.to_json());
}
