use std::env;
use std::time::Duration;

use log::error;

use utquery::{QueryConfig, QueryError, QuerySession, ServerInfo};

fn print_info(info: &ServerInfo) {
    println!("{} ({}:{})", info.name, info.address, info.port);
    println!(
        "  {} on {}, {}/{} players",
        info.game_type, info.map, info.players, info.max_players
    );
    let mut keys: Vec<_> = info.game_info.keys().collect();
    keys.sort();
    for key in keys {
        println!("  {} = {}", key, info.game_info[key]);
    }
    for p in &info.player_list {
        println!("  [{:>3}] {:<24} score {:>4} ping {:>4}", p.id, p.name, p.score, p.ping);
    }
}

#[tokio::main]
async fn main() -> Result<(), QueryError> {
    env_logger::init();

    let mut config = QueryConfig::default();
    if let Some(ms) = env::var("UTQUERY_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()) {
        config = config.with_timeout(Duration::from_millis(ms));
    }

    // one session per server, all running at once
    let mut pending = Vec::new();
    for address in env::args().skip(1) {
        match QuerySession::connect(&address, config).await {
            Ok(session) => pending.push((address, session.spawn())),
            Err(err) => error!("{}: {}", address, err),
        }
    }

    for (address, handle) in pending {
        match handle.outcome().await {
            Ok(info) => print_info(&info),
            Err(err) => {
                error!("{}: {}", address, err);
                if let Some(partial) = err.partial() {
                    print_info(partial);
                }
            }
        }
    }

    Ok(())
}
