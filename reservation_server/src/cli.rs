use std::{env, env::VarError};

use crate::{auth::TokenIssuer, config::AuthConfig};

/// There's no real CLI for the server, so just do quick 'n dirty. The one useful subcommand mints a bearer token for
/// an operator or a test client.
pub fn handle_command_line_args() -> bool {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        return false;
    }
    match args.first().map(String::as_str) {
        Some("token") => match args.get(1) {
            Some(user_id) => issue_token(user_id),
            None => println!("Usage: reservation_server token <user_id>"),
        },
        _ => {
            display_readme();
            display_envs();
        },
    }
    true
}

fn issue_token(user_id: &str) {
    match AuthConfig::try_from_env() {
        Ok(config) => match TokenIssuer::new(&config).issue_token(user_id) {
            Ok(token) => println!("{token}"),
            Err(e) => eprintln!("{e}"),
        },
        Err(e) => eprintln!("{e}"),
    }
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 12] = [
        "RUST_LOG",
        "SRS_HOST",
        "SRS_PORT",
        "SRS_SKIP_PREFLIGHT",
        "REDIS_URL",
        "DATABASE_URL",
        "RESERVATION_TTL_SECONDS",
        "MAX_QUANTITY_PER_RESERVATION",
        "IDEMPOTENCY_TTL_SECONDS",
        "SWEEPER_INTERVAL_SECONDS",
        "SWEEPER_BATCH_SIZE",
        "RATE_LIMIT_PER_MINUTE",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
