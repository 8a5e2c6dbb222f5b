//! Chat command parsing, dispatch and plain-text rendering.

use banroyale_engine::{
    Attempt, ErrorKind, GameEnd, GameError, GameSession, Phase, Platform, SettingsApplied,
    SettingsChange, StatusTier, TargetError,
};
use banroyale_types::{ChannelId, Member, MemberId, SpaceId};
use std::sync::Arc;
use tracing::{debug, error};

pub const PREFIX: char = '!';

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Enable,
    Disable,
    Ban(Option<String>),
    BanChance(Option<String>),
    BanDelay(Option<String>),
    Decay,
    DecayMin(Option<String>),
    DecayMax(Option<String>),
    Config,
    Remaining,
    UnbanAll,
    EndGame,
    Help,
}

/// Parse a chat line. Returns `None` for anything that is not a known
/// command; names are case-insensitive.
pub fn parse(line: &str) -> Option<Command> {
    let body = line.trim().strip_prefix(PREFIX)?;
    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };
    let arg = (!rest.is_empty()).then(|| rest.to_string());
    let command = match name.to_ascii_lowercase().as_str() {
        "enable" | "start" => Command::Enable,
        "disable" => Command::Disable,
        "ban" | "b" => Command::Ban(arg),
        "banchance" | "bc" => Command::BanChance(arg),
        "bandelay" | "bd" => Command::BanDelay(arg),
        "decay" | "d" => Command::Decay,
        "decaymin" | "dmin" => Command::DecayMin(arg),
        "decaymax" | "dmax" => Command::DecayMax(arg),
        "config" | "cfg" => Command::Config,
        "remaining" | "r" => Command::Remaining,
        "unbanall" | "ua" => Command::UnbanAll,
        "endgame" | "eg" => Command::EndGame,
        "help" | "h" | "commands" => Command::Help,
        _ => return None,
    };
    Some(command)
}

pub const HELP: &str = "\
Ban Royale commands

Game
  !enable | !start         start a game after a 10 second countdown (controller)
  !disable                 stop the current game (controller)
  !ban <member> | !b       try to eliminate a member
  !remaining | !r          show how many participants remain
  !endgame | !eg           stop, reverse every elimination and reset (controller)

Settings (controller)
  !banchance <pct> | !bc   elimination chance, 0.01 to 100
  !bandelay <secs> | !bd   delay after each elimination, 0 to 60
  !decay | !d              toggle decay mode
  !decaymin <pct> | !dmin  minimum decay chance
  !decaymax <pct> | !dmax  maximum decay chance
  !config | !cfg           show the current configuration

Reversal (controller)
  !unbanall | !ua          reverse every elimination of this game";

fn parse_number(arg: Option<&str>) -> Option<f64> {
    arg?.trim().trim_end_matches('%').parse::<f64>().ok()
}

fn pct(chance: f64) -> String {
    format!("{:.1}%", chance * 100.0)
}

/// Routes commands from one space to its [GameSession].
pub struct Dispatcher<P: Platform> {
    session: Arc<GameSession<P>>,
    space: SpaceId,
}

impl<P: Platform> Dispatcher<P> {
    pub fn new(session: Arc<GameSession<P>>, space: SpaceId) -> Self {
        Self { session, space }
    }

    pub fn session(&self) -> &Arc<GameSession<P>> {
        &self.session
    }

    /// Handle one chat line, returning the reply to post in `channel`.
    pub async fn handle(&self, author: &Member, channel: ChannelId, line: &str) -> Option<String> {
        let command = parse(line)?;
        debug!(space = %self.space, author = %author.id, ?command, "dispatching command");
        let reply = match self.run(author, channel, command).await {
            Ok(reply) => reply,
            Err(err) => render_error(author, &err),
        };
        Some(reply)
    }

    pub async fn member_joined(&self, member: &Member) -> bool {
        self.session.member_joined(self.space, member).await
    }

    async fn run(
        &self,
        author: &Member,
        channel: ChannelId,
        command: Command,
    ) -> Result<String, GameError> {
        let space = self.space;
        let who = author.shown_name();
        match command {
            Command::Enable => {
                let enabled = self.session.enable(space, author).await?;
                Ok(format!(
                    "✅ Ban Royale has been enabled with {} participants! Session counts reset. Let the games begin! 🎯",
                    enabled.participants
                ))
            }
            Command::Disable => {
                self.session.disable(space, author).await?;
                Ok("Ban Royale has been disabled!".to_string())
            }
            Command::Ban(arg) => self.ban(author, channel, arg.as_deref()).await,
            Command::BanChance(arg) => {
                let Some(value) = parse_number(arg.as_deref()) else {
                    return Ok(format!(
                        "{who}, please enter a valid number between 0.01 and 100!"
                    ));
                };
                self.configure(author, SettingsChange::EliminationChance(value))
                    .await
            }
            Command::BanDelay(arg) => {
                let Some(value) = parse_number(arg.as_deref()) else {
                    return Ok(format!(
                        "{who}, please enter a valid number between 0 and 60 seconds!"
                    ));
                };
                self.configure(author, SettingsChange::EliminationDelay(value))
                    .await
            }
            Command::Decay => self.configure(author, SettingsChange::ToggleDecay).await,
            Command::DecayMin(arg) => {
                let Some(value) = parse_number(arg.as_deref()) else {
                    return Ok(format!("{who}, please enter a valid percentage!"));
                };
                self.configure(author, SettingsChange::DecayMin(value)).await
            }
            Command::DecayMax(arg) => {
                let Some(value) = parse_number(arg.as_deref()) else {
                    return Ok(format!("{who}, please enter a valid percentage!"));
                };
                self.configure(author, SettingsChange::DecayMax(value)).await
            }
            Command::Config => {
                if !self.session.is_controller(author) {
                    return Err(GameError::PermissionDenied);
                }
                self.render_config().await
            }
            Command::Remaining => self.render_remaining().await,
            Command::UnbanAll => {
                let report = self.session.unban_all(space, author, channel).await?;
                Ok(format!(
                    "Reversal complete! Reversed {} eliminations. Failed: {}.",
                    report.reversed, report.failed
                ))
            }
            Command::EndGame => {
                let summary = self.session.end_game(space, author, channel).await?;
                let mut lines = vec![
                    "✅ Game cleanup completed!".to_string(),
                    format!(
                        "{}/{} participants had been eliminated.",
                        summary.eliminated, summary.effective
                    ),
                ];
                if summary.was_enabled {
                    lines.push("Ban Royale has been disabled.".to_string());
                }
                lines.push(format!(
                    "Reversed {} eliminations, {} failed.",
                    summary.reversal.reversed, summary.reversal.failed
                ));
                if summary.decay_reset {
                    lines.push("Decay mode has been switched off.".to_string());
                }
                lines.push("Game state and checkpoints have been reset.".to_string());
                if summary.spectators_cleared > 0 {
                    lines.push(format!(
                        "Spectator role removed from {} members.",
                        summary.spectators_cleared
                    ));
                }
                Ok(lines.join("\n"))
            }
            Command::Help => Ok(HELP.to_string()),
        }
    }

    async fn ban(
        &self,
        author: &Member,
        channel: ChannelId,
        arg: Option<&str>,
    ) -> Result<String, GameError> {
        let who = author.shown_name();
        if self.session.phase(self.space).await != Phase::Enabled {
            return Err(GameError::GameDisabled);
        }
        let Some(query) = arg else {
            return Err(TargetError::Missing.into());
        };
        let settings = self.session.settings();
        if channel != settings.elimination_channel() {
            return Ok(format!("{who}, you can't eliminate in this channel!"));
        }
        let Some(target) = self.resolve(query).await? else {
            return Ok(format!("{who}, I can't find that member!"));
        };

        match self
            .session
            .attempt_elimination(self.space, author, Some(&target))
            .await?
        {
            Attempt::Eliminated(hit) => {
                let mut reply = format!(
                    "{} {who} eliminated {}! ({})",
                    settings.react_marker(),
                    hit.target.shown_name(),
                    hit.session_count
                );
                match hit.game_end {
                    Some(GameEnd::Victory { winner, .. }) => {
                        reply.push_str(&format!("\n🏆 {} wins the Ban Royale!", winner.shown_name()))
                    }
                    Some(GameEnd::TotalElimination { .. }) => {
                        reply.push_str("\n🏁 Total elimination, nobody is left standing!")
                    }
                    None => {}
                }
                Ok(reply)
            }
            Attempt::Missed { target, .. } => Ok(format!(
                "{who}, your attempted elimination against {} failed! (lol)",
                target.shown_name()
            )),
        }
    }

    /// Find a member by id, name or display name.
    async fn resolve(&self, query: &str) -> Result<Option<Member>, GameError> {
        let query = query.trim().trim_start_matches('@');
        let id = query.parse::<MemberId>().ok();
        let members = self.session.platform().members(self.space).await?;
        Ok(members.into_iter().find(|m| {
            Some(m.id) == id
                || m.name.eq_ignore_ascii_case(query)
                || m
                    .display_name
                    .as_deref()
                    .is_some_and(|d| d.eq_ignore_ascii_case(query))
        }))
    }

    async fn configure(&self, author: &Member, change: SettingsChange) -> Result<String, GameError> {
        let applied = self.session.configure(self.space, author, change).await?;
        Ok(match applied {
            SettingsApplied::EliminationChance(chance) => {
                format!("Elimination chance has been set to {}!", pct(chance))
            }
            SettingsApplied::EliminationDelay(secs) => {
                format!("Elimination delay has been set to {secs} seconds!")
            }
            SettingsApplied::DecayMode { enabled: true, effective } => {
                let mut reply = "Decay mode has been enabled!".to_string();
                if let Some(effective) = effective {
                    reply.push_str(&format!(
                        "\n📊 Effective members for decay calculations: {effective} (excluding bots and controllers)"
                    ));
                }
                reply
            }
            SettingsApplied::DecayMode { enabled: false, .. } => {
                "Decay mode has been disabled!".to_string()
            }
            SettingsApplied::DecayMin(chance) => {
                format!("Minimum decay chance has been set to {}!", pct(chance))
            }
            SettingsApplied::DecayMax(chance) => {
                format!("Maximum decay chance has been set to {}!", pct(chance))
            }
        })
    }

    async fn render_config(&self) -> Result<String, GameError> {
        let status = self.session.status(self.space).await?;
        let settings = &status.settings;
        let mut lines = vec![
            "🤖 Ban Royale configuration".to_string(),
            format!(
                "Status: {}",
                match status.phase {
                    Phase::Enabled => "🟢 Enabled",
                    Phase::Enabling => "🟡 Starting",
                    Phase::Disabled => "🔴 Disabled",
                }
            ),
        ];
        if settings.decay_mode() {
            lines.push(format!("Current chance (decay): {}", pct(status.chance)));
        } else {
            lines.push(format!("Chance (static): {}", pct(status.chance)));
        }
        lines.push(format!(
            "Elimination delay: {:.1}s",
            settings.elimination_delay_secs()
        ));
        lines.push(format!(
            "Members: {} (excl. bots/controllers)",
            status.effective
        ));
        lines.push(format!(
            "Progress: {}/{} eliminated",
            status.eliminated, status.effective
        ));
        lines.push(format!(
            "Decay mode: {}",
            if settings.decay_mode() {
                "🟢 Enabled"
            } else {
                "🔴 Disabled"
            }
        ));
        if settings.decay_mode() {
            lines.push(format!(
                "Decay range: {} - {}",
                pct(settings.min_decay_chance()),
                pct(settings.max_decay_chance())
            ));
            let checkpoints = if status.checkpoints.is_empty() {
                "None yet".to_string()
            } else {
                status
                    .checkpoints
                    .iter()
                    .map(|c| format!("{c}%"))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            lines.push(format!("Logged checkpoints: {checkpoints}"));
        }
        lines.push(format!(
            "Elimination channel: #{}",
            settings.elimination_channel()
        ));
        lines.push(format!("Log channel: #{}", settings.log_channel()));
        lines.push(format!("React marker: {}", settings.react_marker()));
        lines.push(format!("Spectator role: {}", settings.spectator_role()));
        Ok(lines.join("\n"))
    }

    async fn render_remaining(&self) -> Result<String, GameError> {
        let status = self.session.status(self.space).await?;
        if status.phase != Phase::Enabled {
            return Ok("📊 No Ban Royale game is currently active.".to_string());
        }
        let (remaining_pct, eliminated_pct) = if status.effective > 0 {
            let effective = status.effective as f64;
            (
                status.remaining as f64 / effective * 100.0,
                status.eliminated as f64 / effective * 100.0,
            )
        } else {
            (0.0, 0.0)
        };
        let tier = match status.tier() {
            StatusTier::WinnerDetermined => "🏆 Winner determined!",
            StatusTier::TotalElimination => "💀 Total elimination!",
            StatusTier::FinalShowdown => "🔥 Final showdown!",
            StatusTier::GettingIntense => "⚡ Getting intense!",
            StatusTier::InProgress => "🎯 Game in progress",
        };
        Ok(format!(
            "📊 Game status\n👥 Participants remaining: {} out of {} ({remaining_pct:.1}%)\n💀 Participants eliminated: {} ({eliminated_pct:.1}%)\n{tier}",
            status.remaining, status.effective, status.eliminated
        ))
    }
}

/// User-facing text for a failed command.
pub fn render_error(author: &Member, err: &GameError) -> String {
    let who = author.shown_name();
    match err {
        GameError::PermissionDenied => {
            format!("{who}, you don't have permission to use this command!")
        }
        GameError::AlreadyEnabled => format!("{who}, Ban Royale is already enabled!"),
        GameError::AlreadyDisabled => format!("{who}, Ban Royale is already disabled!"),
        GameError::GameDisabled => format!("{who}, Ban Royale is currently disabled!"),
        GameError::InvalidTarget(TargetError::Missing) => {
            format!("{who}, I need someone to eliminate.")
        }
        GameError::InvalidTarget(TargetError::SelfTarget) => {
            format!("{who}, you can't eliminate yourself.")
        }
        GameError::InvalidTarget(TargetError::Outranked) => {
            format!("{who}, you can't eliminate that person!")
        }
        GameError::SpectatorForbidden => {
            format!("{who}, spectators cannot eliminate anyone! You joined mid-game.")
        }
        GameError::NoRecords => format!("{who}, no eliminations are recorded for this game!"),
        GameError::Settings(e) => format!("{who}, {e}"),
        GameError::ExternalRateLimited { .. } => format!(
            "{who}, failed to eliminate after multiple rate limit retries. Please try again later."
        ),
        GameError::ExternalPermissionDenied => {
            format!("{who}, I can't do that! (insufficient permissions)")
        }
        GameError::ExternalNotFound => format!("{who}, I can't find that member!"),
        other => {
            if other.kind() == ErrorKind::IoFailure {
                error!(error = %other, "record store failure");
            }
            format!("{who}, something went wrong: {other}")
        }
    }
}
