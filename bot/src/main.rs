use anyhow::{Context, Result};
use banroyale_bot::{
    commands::Dispatcher,
    init_tracing,
    local::{Fixture, LocalPlatform},
    Config,
};
use banroyale_engine::{GameSession, Platform, RecordStore, RngEntropy};
use banroyale_types::{ChannelId, Member, MemberId, SpaceId};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::{path::PathBuf, sync::Arc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "banroyale")]
#[command(about = "Run a Ban Royale game against a local console space")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// YAML fixture describing the initial members of the space
    #[arg(short, long)]
    members: Option<PathBuf>,

    /// Identifier of the local space
    #[arg(long, default_value_t = 1)]
    space: u64,
}

enum Line {
    Join(Member),
    Leave(MemberId),
    Say {
        author: MemberId,
        channel: Option<ChannelId>,
        text: String,
    },
}

/// Console input forms:
/// `join <id> <name>`, `leave <id>` and `<author id>[@<channel id>] <message>`.
fn parse_line(line: &str) -> Option<Line> {
    let (head, rest) = line.trim().split_once(char::is_whitespace)?;
    let rest = rest.trim();
    match head {
        "join" => {
            let (id, name) = rest.split_once(char::is_whitespace)?;
            let id: MemberId = id.parse().ok()?;
            Some(Line::Join(Member::new(id, name.trim())))
        }
        "leave" => Some(Line::Leave(rest.parse().ok()?)),
        _ => {
            let (author, channel) = match head.split_once('@') {
                Some((author, channel)) => (author, Some(channel.parse().ok()?)),
                None => (head, None),
            };
            Some(Line::Say {
                author: author.parse().ok()?,
                channel,
                text: rest.to_string(),
            })
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let raw = std::fs::read_to_string(&args.config).context("Could not read config file")?;
    let config: Config = serde_yaml::from_str(&raw).context("Could not parse config file")?;
    let config = config.validate().context("Invalid config")?;
    init_tracing(config.log_level, config.log_json);

    let fixture = match &args.members {
        Some(path) => {
            let raw = std::fs::read_to_string(path).context("Could not read members file")?;
            serde_yaml::from_str::<Fixture>(&raw).context("Could not parse members file")?
        }
        None => Fixture::default(),
    };
    info!(members = fixture.members.len(), space = args.space, "starting local space");

    let platform = Arc::new(LocalPlatform::new(fixture));
    let store = Arc::new(RecordStore::new(config.store_path.clone()));
    let default_channel = config.settings.elimination_channel();
    let mut session = GameSession::new(platform.clone(), store, config.settings);
    if let Some(seed) = config.deterministic_seed {
        session = session.with_entropy(RngEntropy(ChaCha20Rng::seed_from_u64(seed)));
    }
    let space = SpaceId(args.space);
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(session), space));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Could not read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Some(Line::Join(member)) => {
                platform.join(member.clone());
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher.member_joined(&member).await;
                });
            }
            Some(Line::Leave(id)) => platform.leave(id),
            Some(Line::Say {
                author,
                channel,
                text,
            }) => {
                let Some(author) = platform.member(author) else {
                    warn!(%author, "unknown author");
                    continue;
                };
                let channel = channel.unwrap_or(default_channel);
                let dispatcher = dispatcher.clone();
                let platform = platform.clone();
                tokio::spawn(async move {
                    if let Some(reply) = dispatcher.handle(&author, channel, &text).await {
                        if let Err(e) = platform.post(channel, &reply).await {
                            warn!(%channel, error = %e, "failed to post reply");
                        }
                    }
                });
            }
            None => warn!(%line, "unrecognized input"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_lines() {
        assert!(matches!(
            parse_line("join 7 dave"),
            Some(Line::Join(m)) if m.id == MemberId(7) && m.name == "dave"
        ));
        assert!(matches!(parse_line("leave 7"), Some(Line::Leave(MemberId(7)))));
        assert!(matches!(
            parse_line("1@20 !ban bob"),
            Some(Line::Say { author: MemberId(1), channel: Some(ChannelId(20)), text }) if text == "!ban bob"
        ));
        assert!(matches!(
            parse_line("1 !r"),
            Some(Line::Say { channel: None, .. })
        ));
        assert!(parse_line("x !r").is_none());
        assert!(parse_line("leave").is_none());
    }
}
