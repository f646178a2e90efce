//! Greedy nearest-differential pairing.

use crate::matches::models::{Match, NewMatch};
use crate::player::models::{Player, PlayerId};
use crate::tournament::models::Round;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Symmetric key for an unordered pair of players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairingKey(PlayerId, PlayerId);

impl PairingKey {
    pub fn new(a: PlayerId, b: PlayerId) -> Self {
        if a < b { Self(a, b) } else { Self(b, a) }
    }

    /// Key of a match with both players present
    pub fn of_match(m: &Match) -> Option<Self> {
        m.player2.map(|p2| Self::new(m.player1, p2))
    }
}

impl fmt::Display for PairingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

/// Output of one pairing pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pairing {
    /// Scheduled pairings in creation order, followed by the bye (if any)
    pub matches: Vec<NewMatch>,
    /// Rematches accepted because no unplayed opponent was left
    pub forced_rematches: Vec<PairingKey>,
}

impl Pairing {
    pub fn bye(&self) -> Option<&NewMatch> {
        self.matches.iter().find(|m| m.is_bye())
    }
}

/// Sort descending by `games_won - games_lost`; ties keep input order
pub fn rank_players(players: &[Player]) -> Vec<&Player> {
    let mut ranked: Vec<&Player> = players.iter().collect();
    ranked.sort_by_key(|p| std::cmp::Reverse(p.score_differential()));
    ranked
}

/// Pairing keys of every two-player match in the given rounds
pub fn played_pairings(rounds: &[Round]) -> HashSet<PairingKey> {
    rounds
        .iter()
        .flat_map(|r| r.matches.iter())
        .filter_map(PairingKey::of_match)
        .collect()
}

/// Pair a ranked list of players
///
/// The first pass never repeats a pairing from `played`. If it leaves more
/// than one player without an opponent, a second pass pairs those leftovers
/// among themselves with the no-repeat rule lifted. Whoever is still unpaired
/// afterwards (at most one player) receives the bye.
pub fn pair_round(ranked: &[&Player], played: &HashSet<PairingKey>) -> Pairing {
    let mut paired = HashSet::with_capacity(ranked.len());
    let mut matches = Vec::with_capacity(ranked.len() / 2 + 1);

    greedy_pass(
        ranked,
        |a, b| !played.contains(&PairingKey::new(a, b)),
        &mut paired,
        &mut matches,
    );

    let mut forced_rematches = Vec::new();
    let leftovers: Vec<&Player> = ranked
        .iter()
        .copied()
        .filter(|p| !paired.contains(&p.id))
        .collect();

    if leftovers.len() > 1 {
        let first_forced = matches.len();
        greedy_pass(&leftovers, |_, _| true, &mut paired, &mut matches);
        forced_rematches = matches[first_forced..]
            .iter()
            .filter_map(|m| m.player2.map(|p2| PairingKey::new(m.player1, p2)))
            .collect();
        warn!(
            "{} players had no unplayed opponent left; forced rematches: {:?}",
            leftovers.len(),
            forced_rematches
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        );
    }

    if let Some(unpaired) = ranked.iter().find(|p| !paired.contains(&p.id)) {
        debug!("Player {} receives a bye", unpaired.id);
        matches.push(NewMatch::bye(unpaired.id));
    }

    Pairing {
        matches,
        forced_rematches,
    }
}

fn greedy_pass(
    ranked: &[&Player],
    allowed: impl Fn(PlayerId, PlayerId) -> bool,
    paired: &mut HashSet<PlayerId>,
    matches: &mut Vec<NewMatch>,
) {
    for (i, player) in ranked.iter().enumerate() {
        if paired.contains(&player.id) {
            continue;
        }

        let mut best: Option<(PlayerId, i32)> = None;
        for candidate in &ranked[i + 1..] {
            if paired.contains(&candidate.id) || !allowed(player.id, candidate.id) {
                continue;
            }
            let diff = (player.score_differential() - candidate.score_differential()).abs();
            // Strict comparison: the first candidate wins ties
            if best.is_none_or(|(_, best_diff)| diff < best_diff) {
                best = Some((candidate.id, diff));
            }
        }

        if let Some((opponent, diff)) = best {
            debug!(
                "Paired {} with {} (differential gap {})",
                player.id, opponent, diff
            );
            paired.insert(player.id);
            paired.insert(opponent);
            matches.push(NewMatch::pairing(player.id, opponent));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matches::models::MatchStatus;
    use std::collections::BTreeMap;

    fn player(id: PlayerId, won: i32, lost: i32) -> Player {
        Player {
            id,
            name: format!("P{id}"),
            email: None,
            games_won: won,
            games_lost: lost,
            rankings: BTreeMap::new(),
        }
    }

    fn played(keys: &[(PlayerId, PlayerId)]) -> HashSet<PairingKey> {
        keys.iter().map(|(a, b)| PairingKey::new(*a, *b)).collect()
    }

    fn pairs(pairing: &Pairing) -> Vec<(PlayerId, Option<PlayerId>)> {
        pairing
            .matches
            .iter()
            .map(|m| (m.player1, m.player2))
            .collect()
    }

    #[test]
    fn test_pairing_key_is_symmetric() {
        assert_eq!(PairingKey::new(7, 3), PairingKey::new(3, 7));
        assert_eq!(PairingKey::new(7, 3).to_string(), "3-7");
    }

    #[test]
    fn test_rank_players_is_stable() {
        let players = vec![player(1, 1, 1), player(2, 3, 0), player(3, 0, 0), player(4, 2, 2)];
        let ranked: Vec<PlayerId> = rank_players(&players).iter().map(|p| p.id).collect();
        // 1, 3 and 4 all sit at 0 and keep their input order
        assert_eq!(ranked, vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_four_players_pair_by_nearest_differential() {
        let players = vec![player(1, 2, 1), player(2, 1, 2), player(3, 3, 0), player(4, 0, 3)];
        let ranked = rank_players(&players);
        let pairing = pair_round(&ranked, &HashSet::new());

        assert_eq!(pairs(&pairing), vec![(3, Some(1)), (2, Some(4))]);
        assert!(pairing.matches.iter().all(|m| m.status == MatchStatus::Scheduled));
        assert!(pairing.bye().is_none());
    }

    #[test]
    fn test_odd_count_gives_last_player_a_bye() {
        let players = vec![player(1, 0, 0), player(2, 0, 0), player(3, 0, 0)];
        let ranked = rank_players(&players);
        let pairing = pair_round(&ranked, &HashSet::new());

        assert_eq!(pairs(&pairing), vec![(1, Some(2)), (3, None)]);
        let bye = pairing.bye().expect("bye");
        assert_eq!(bye.winner, Some(3));
        assert_eq!(bye.status, MatchStatus::Completed);
    }

    #[test]
    fn test_played_pairings_are_avoided() {
        let players = vec![player(1, 1, 0), player(2, 1, 0), player(3, 0, 1), player(4, 0, 1)];
        let ranked = rank_players(&players);
        let pairing = pair_round(&ranked, &played(&[(1, 2), (3, 4)]));

        assert_eq!(pairs(&pairing), vec![(1, Some(3)), (2, Some(4))]);
        assert!(pairing.forced_rematches.is_empty());
    }

    #[test]
    fn test_tie_resolves_to_first_candidate_in_rank_order() {
        // 2 and 3 are both one point behind 1
        let players = vec![player(1, 1, 0), player(2, 0, 0), player(3, 0, 0), player(4, 0, 5)];
        let ranked = rank_players(&players);
        let pairing = pair_round(&ranked, &HashSet::new());
        assert_eq!(pairs(&pairing), vec![(1, Some(2)), (3, Some(4))]);

        // Once 1-2 has been played the tie goes to 3
        let pairing = pair_round(&ranked, &played(&[(1, 2)]));
        assert_eq!(pairs(&pairing), vec![(1, Some(3)), (2, Some(4))]);
    }

    #[test]
    fn test_greedy_does_not_backtrack() {
        // 1 takes 2 (nearest); 3 and 4 already met, so both fall to the fallback pass
        let players = vec![player(1, 2, 0), player(2, 2, 0), player(3, 0, 0), player(4, 0, 0)];
        let ranked = rank_players(&players);
        let pairing = pair_round(&ranked, &played(&[(3, 4)]));

        assert_eq!(pairs(&pairing), vec![(1, Some(2)), (3, Some(4))]);
        assert_eq!(pairing.forced_rematches, vec![PairingKey::new(3, 4)]);
    }

    #[test]
    fn test_fallback_leaves_single_bye() {
        let players = vec![player(1, 0, 0), player(2, 0, 0), player(3, 0, 0)];
        let ranked = rank_players(&players);
        let pairing = pair_round(&ranked, &played(&[(1, 2), (1, 3), (2, 3)]));

        assert_eq!(pairs(&pairing), vec![(1, Some(2)), (3, None)]);
        assert_eq!(pairing.forced_rematches, vec![PairingKey::new(1, 2)]);
    }

    #[test]
    fn test_empty_and_single_player() {
        let pairing = pair_round(&[], &HashSet::new());
        assert!(pairing.matches.is_empty());

        let players = vec![player(9, 0, 0)];
        let ranked = rank_players(&players);
        let pairing = pair_round(&ranked, &HashSet::new());
        assert_eq!(pairs(&pairing), vec![(9, None)]);
    }

    #[test]
    fn test_played_pairings_skip_byes() {
        let round = Round {
            id: 1,
            tournament_id: 1,
            round_number: 1,
            completed: true,
            matches: vec![
                NewMatch::pairing(2, 1).into_match(1, 1),
                NewMatch::bye(3).into_match(2, 1),
            ],
        };
        let keys = played_pairings(&[round]);
        assert_eq!(keys, played(&[(1, 2)]));
    }
}
