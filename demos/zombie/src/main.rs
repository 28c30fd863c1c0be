//! Zombie horde: a swarm of green knife bots that hunt as a pack.
//!
//! Usage:
//!
//! ```text
//! zombie <ws-url> [<ws-url> ...]
//! ```
//!
//! Bots spread round-robin over the given servers and run until Ctrl-C.

use gatsling::prelude::*;

#[tokio::main]
async fn main() -> Result<(), GatslingError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let servers: Vec<String> = std::env::args().skip(1).collect();
    if servers.is_empty() {
        eprintln!("usage: zombie <ws-url> [<ws-url> ...]");
        std::process::exit(2);
    }

    let directory = StaticDirectory::from_addresses(servers, "ffa");
    let config = SwarmConfig {
        color: Color::Green,
        skills: vec![Skill::Knife, Skill::Dash, Skill::ThickSkin],
        chat_lines: vec![
            "braaains".to_owned(),
            "the horde grows".to_owned(),
            "one of us".to_owned(),
        ],
        ..SwarmConfig::default()
    };

    let swarm = Swarm::new(config);
    swarm.start(&directory).await?;
    tracing::info!("horde unleashed; Ctrl-C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "signal listener failed");
    }
    swarm.stop().await;
    Ok(())
}
