//! Command parsing and dispatch onto the engine.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use swiss_tournament::tournament::NewTournament;
use swiss_tournament::{
    Engine, Match, MatchId, Player, PlayerId, Round, RoundId, Tournament, TournamentId,
    TournamentResult,
};
use thiserror::Error;

/// Errors in a command line
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid {arg} '{value}': {reason}")]
    InvalidArg {
        arg: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unterminated quote")]
    UnterminatedQuote,
}

/// One engine operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddPlayer { name: String, email: Option<String> },
    ListPlayers,
    ShowPlayer(PlayerId),
    FindPlayerByName(String),
    FindPlayerByEmail(String),
    EditPlayer { id: PlayerId, name: String, email: Option<String> },
    DeletePlayer(PlayerId),
    RankPlayer { player: PlayerId, tournament: TournamentId, ranking: i32 },

    CreateTournament(NewTournament),
    ListTournaments,
    ShowTournament(TournamentId),
    EditTournament {
        id: TournamentId,
        name: String,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    },
    StartTournament(TournamentId),
    CompleteTournament(TournamentId),
    CancelTournament(TournamentId),
    DeleteTournament(TournamentId),
    Enroll { tournament: TournamentId, player: PlayerId },
    Withdraw { tournament: TournamentId, player: PlayerId },
    Rounds(TournamentId),
    Standings(TournamentId),

    NextRound(TournamentId),
    CompleteRound(RoundId),
    RoundMatches(RoundId),

    StartMatch(MatchId),
    SetResult { id: MatchId, score_player1: i32, score_player2: i32 },
    CancelMatch(MatchId),
    ShowMatch(MatchId),
}

/// Result of a command
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Output {
    Player(Player),
    Players(Vec<Player>),
    MaybePlayer(Option<Player>),
    Tournament(Tournament),
    Tournaments(Vec<Tournament>),
    Round(Round),
    Rounds(Vec<Round>),
    Match(Match),
    Matches(Vec<Match>),
    Deleted { deleted: i64 },
}

/// Split a line into words, honoring double quotes
pub fn split_words(line: &str) -> Result<Vec<String>, CommandError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quoted {
        return Err(CommandError::UnterminatedQuote);
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn id(arg: &'static str, value: &str) -> Result<i64, CommandError> {
    value.parse().map_err(|e: std::num::ParseIntError| CommandError::InvalidArg {
        arg,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn int(arg: &'static str, value: &str) -> Result<i32, CommandError> {
    value.parse().map_err(|e: std::num::ParseIntError| CommandError::InvalidArg {
        arg,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// `-` means no date
fn date(arg: &'static str, value: &str) -> Result<Option<NaiveDate>, CommandError> {
    if value == "-" {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| CommandError::InvalidArg {
            arg,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

impl Command {
    /// Parse a command from its words
    pub fn parse(words: &[String]) -> Result<Self, CommandError> {
        let words: Vec<&str> = words.iter().map(String::as_str).collect();
        let Some((&group, rest)) = words.split_first() else {
            return Err(CommandError::Empty);
        };

        let command = match (group, rest) {
            ("player", ["add", name]) => Command::AddPlayer {
                name: name.to_string(),
                email: None,
            },
            ("player", ["add", name, email]) => Command::AddPlayer {
                name: name.to_string(),
                email: Some(email.to_string()),
            },
            ("player", ["add", ..]) => return Err(CommandError::Usage("player add NAME [EMAIL]")),
            ("player", ["list"]) => Command::ListPlayers,
            ("player", ["show", p]) => Command::ShowPlayer(id("player id", p)?),
            ("player", ["find-name", name]) => Command::FindPlayerByName(name.to_string()),
            ("player", ["find-email", email]) => Command::FindPlayerByEmail(email.to_string()),
            ("player", ["edit", p, name]) => Command::EditPlayer {
                id: id("player id", p)?,
                name: name.to_string(),
                email: None,
            },
            ("player", ["edit", p, name, email]) => Command::EditPlayer {
                id: id("player id", p)?,
                name: name.to_string(),
                email: Some(email.to_string()),
            },
            ("player", ["edit", ..]) => {
                return Err(CommandError::Usage("player edit ID NAME [EMAIL]"));
            }
            ("player", ["delete", p]) => Command::DeletePlayer(id("player id", p)?),
            ("player", ["rank", p, t, r]) => Command::RankPlayer {
                player: id("player id", p)?,
                tournament: id("tournament id", t)?,
                ranking: int("ranking", r)?,
            },
            ("player", ["rank", ..]) => {
                return Err(CommandError::Usage("player rank PLAYER TOURNAMENT RANKING"));
            }

            ("tournament", ["create", name, start, end, players @ ..]) => {
                let player_ids = players
                    .iter()
                    .map(|p| id("player id", p))
                    .collect::<Result<Vec<_>, _>>()?;
                Command::CreateTournament(NewTournament::new(
                    *name,
                    date("start date", start)?,
                    date("end date", end)?,
                    player_ids,
                ))
            }
            ("tournament", ["create", ..]) => {
                return Err(CommandError::Usage(
                    "tournament create NAME START|- END|- [PLAYER...]",
                ));
            }
            ("tournament", ["list"]) => Command::ListTournaments,
            ("tournament", ["show", t]) => Command::ShowTournament(id("tournament id", t)?),
            ("tournament", ["edit", t, name, start, end]) => Command::EditTournament {
                id: id("tournament id", t)?,
                name: name.to_string(),
                start_date: date("start date", start)?,
                end_date: date("end date", end)?,
            },
            ("tournament", ["edit", ..]) => {
                return Err(CommandError::Usage("tournament edit ID NAME START|- END|-"));
            }
            ("tournament", ["start", t]) => Command::StartTournament(id("tournament id", t)?),
            ("tournament", ["complete", t]) => {
                Command::CompleteTournament(id("tournament id", t)?)
            }
            ("tournament", ["cancel", t]) => Command::CancelTournament(id("tournament id", t)?),
            ("tournament", ["delete", t]) => Command::DeleteTournament(id("tournament id", t)?),
            ("tournament", ["enroll", t, p]) => Command::Enroll {
                tournament: id("tournament id", t)?,
                player: id("player id", p)?,
            },
            ("tournament", ["withdraw", t, p]) => Command::Withdraw {
                tournament: id("tournament id", t)?,
                player: id("player id", p)?,
            },
            ("tournament", ["rounds", t]) => Command::Rounds(id("tournament id", t)?),
            ("tournament", ["standings", t]) => Command::Standings(id("tournament id", t)?),

            ("round", ["next", t]) => Command::NextRound(id("tournament id", t)?),
            ("round", ["complete", r]) => Command::CompleteRound(id("round id", r)?),
            ("round", ["matches", r]) => Command::RoundMatches(id("round id", r)?),

            ("match", ["start", m]) => Command::StartMatch(id("match id", m)?),
            ("match", ["result", m, s1, s2]) => Command::SetResult {
                id: id("match id", m)?,
                score_player1: int("score", s1)?,
                score_player2: int("score", s2)?,
            },
            ("match", ["result", ..]) => {
                return Err(CommandError::Usage("match result ID SCORE1 SCORE2"));
            }
            ("match", ["cancel", m]) => Command::CancelMatch(id("match id", m)?),
            ("match", ["show", m]) => Command::ShowMatch(id("match id", m)?),

            _ => return Err(CommandError::Unknown(words.join(" "))),
        };
        Ok(command)
    }

    /// Run the command against the engine
    pub async fn run(self, engine: &Engine) -> TournamentResult<Output> {
        let players = &engine.players;
        let tournaments = &engine.tournaments;
        let matches = &engine.matches;

        let output = match self {
            Command::AddPlayer { name, email } => {
                Output::Player(players.create_player(&name, email).await?)
            }
            Command::ListPlayers => Output::Players(players.list_players().await?),
            Command::ShowPlayer(id) => Output::Player(players.get_player(id).await?),
            Command::FindPlayerByName(name) => {
                Output::MaybePlayer(players.find_player_by_name(&name).await?)
            }
            Command::FindPlayerByEmail(email) => {
                Output::MaybePlayer(players.find_player_by_email(&email).await?)
            }
            Command::EditPlayer { id, name, email } => {
                let mut player = players.get_player(id).await?;
                player.name = name;
                player.email = email;
                Output::Player(players.update_player(player).await?)
            }
            Command::DeletePlayer(id) => {
                players.delete_player(id).await?;
                Output::Deleted { deleted: id }
            }
            Command::RankPlayer {
                player,
                tournament,
                ranking,
            } => Output::Player(
                players
                    .update_player_ranking(player, tournament, ranking)
                    .await?,
            ),

            Command::CreateTournament(new) => {
                Output::Tournament(tournaments.create_tournament(new).await?)
            }
            Command::ListTournaments => Output::Tournaments(tournaments.list_tournaments().await?),
            Command::ShowTournament(id) => Output::Tournament(tournaments.get_tournament(id).await?),
            Command::EditTournament {
                id,
                name,
                start_date,
                end_date,
            } => Output::Tournament(
                tournaments
                    .update_tournament_details(id, &name, start_date, end_date)
                    .await?,
            ),
            Command::StartTournament(id) => {
                Output::Tournament(tournaments.start_tournament(id).await?)
            }
            Command::CompleteTournament(id) => {
                Output::Tournament(tournaments.complete_tournament(id).await?)
            }
            Command::CancelTournament(id) => {
                Output::Tournament(tournaments.cancel_tournament(id).await?)
            }
            Command::DeleteTournament(id) => {
                tournaments.delete_tournament(id).await?;
                Output::Deleted { deleted: id }
            }
            Command::Enroll { tournament, player } => {
                Output::Tournament(tournaments.enroll_player(tournament, player).await?)
            }
            Command::Withdraw { tournament, player } => {
                Output::Tournament(tournaments.withdraw_player(tournament, player).await?)
            }
            Command::Rounds(id) => Output::Rounds(tournaments.tournament_rounds(id).await?),
            Command::Standings(id) => Output::Players(tournaments.standings(id).await?),

            Command::NextRound(id) => Output::Round(tournaments.create_next_round(id).await?),
            Command::CompleteRound(id) => Output::Round(tournaments.complete_round(id).await?),
            Command::RoundMatches(id) => Output::Matches(matches.round_matches(id).await?),

            Command::StartMatch(id) => Output::Match(matches.start_match(id).await?),
            Command::SetResult {
                id,
                score_player1,
                score_player2,
            } => Output::Match(
                matches
                    .set_match_result(id, score_player1, score_player2)
                    .await?,
            ),
            Command::CancelMatch(id) => Output::Match(matches.cancel_match(id).await?),
            Command::ShowMatch(id) => Output::Match(matches.get_match(id).await?),
        };
        Ok(output)
    }
}

struct PlayerLine<'a>(&'a Player);

impl fmt::Display for PlayerLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.0;
        write!(
            f,
            "#{:<4} {:<20} {:>3}W {:>3}L",
            p.id, p.name, p.games_won, p.games_lost
        )?;
        if let Some(email) = &p.email {
            write!(f, "  <{email}>")?;
        }
        Ok(())
    }
}

struct MatchLine<'a>(&'a Match);

impl fmt::Display for MatchLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        match m.player2 {
            None => write!(f, "match #{:<4} player {} has a bye", m.id, m.player1),
            Some(p2) => {
                write!(
                    f,
                    "match #{:<4} {} vs {}  {}-{}  {}",
                    m.id, m.player1, p2, m.score_player1, m.score_player2, m.status
                )?;
                if let Some(winner) = m.winner {
                    write!(f, "  winner {winner}")?;
                }
                Ok(())
            }
        }
    }
}

fn write_round(f: &mut fmt::Formatter<'_>, round: &Round) -> fmt::Result {
    writeln!(
        f,
        "round {} (#{}){}",
        round.round_number,
        round.id,
        if round.completed { " completed" } else { "" }
    )?;
    for m in &round.matches {
        writeln!(f, "  {}", MatchLine(m))?;
    }
    Ok(())
}

fn write_tournament(f: &mut fmt::Formatter<'_>, t: &Tournament) -> fmt::Result {
    write!(f, "tournament #{} '{}' {}", t.id, t.name, t.status)?;
    match (t.start_date, t.end_date) {
        (Some(start), Some(end)) => write!(f, "  {start} to {end}")?,
        (Some(start), None) => write!(f, "  from {start}")?,
        (None, Some(end)) => write!(f, "  until {end}")?,
        (None, None) => {}
    }
    writeln!(f)?;
    let enrolled: Vec<String> = t
        .enrollments
        .iter()
        .map(|e| format!("{}(rank {})", e.player_id, e.ranking))
        .collect();
    writeln!(f, "  players: {}", enrolled.join(", "))?;
    for round in &t.rounds {
        write!(f, "  ")?;
        write_round(f, round)?;
    }
    Ok(())
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Player(p) => writeln!(f, "{}", PlayerLine(p)),
            Output::Players(ps) => ps.iter().try_for_each(|p| writeln!(f, "{}", PlayerLine(p))),
            Output::MaybePlayer(Some(p)) => writeln!(f, "{}", PlayerLine(p)),
            Output::MaybePlayer(None) => writeln!(f, "no such player"),
            Output::Tournament(t) => write_tournament(f, t),
            Output::Tournaments(ts) => ts.iter().try_for_each(|t| write_tournament(f, t)),
            Output::Round(r) => write_round(f, r),
            Output::Rounds(rs) => rs.iter().try_for_each(|r| write_round(f, r)),
            Output::Match(m) => writeln!(f, "{}", MatchLine(m)),
            Output::Matches(ms) => ms.iter().try_for_each(|m| writeln!(f, "{}", MatchLine(m))),
            Output::Deleted { deleted } => writeln!(f, "deleted {deleted}"),
        }
    }
}
