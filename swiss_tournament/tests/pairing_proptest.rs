//! Property-based tests for the Swiss pairing pass using proptest
//!
//! These tests check the structural guarantees of a generated round over
//! randomly generated player records and pairing histories.

use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use swiss_tournament::pairing::{PairingKey, pair_round, rank_players};
use swiss_tournament::player::Player;

// Strategy to generate players with ids 1..=n and small win/loss records
fn players_strategy(max: usize) -> impl Strategy<Value = Vec<Player>> {
    prop::collection::vec((0i32..8, 0i32..8), 0..=max).prop_map(|records| {
        records
            .into_iter()
            .enumerate()
            .map(|(i, (won, lost))| Player {
                id: i as i64 + 1,
                name: format!("P{}", i + 1),
                email: None,
                games_won: won,
                games_lost: lost,
                rankings: BTreeMap::new(),
            })
            .collect()
    })
}

// Strategy to generate players plus an arbitrary set of already played pairings
fn history_strategy() -> impl Strategy<Value = (Vec<Player>, HashSet<PairingKey>)> {
    players_strategy(12).prop_flat_map(|players| {
        let n = players.len() as i64;
        let pairs = if n < 2 {
            Just(HashSet::new()).boxed()
        } else {
            prop::collection::vec((1..=n, 1..=n), 0..20)
                .prop_map(|raw| {
                    raw.into_iter()
                        .filter(|(a, b)| a != b)
                        .map(|(a, b)| PairingKey::new(a, b))
                        .collect::<HashSet<PairingKey>>()
                })
                .boxed()
        };
        (Just(players), pairs)
    })
}

proptest! {
    #[test]
    fn test_every_player_appears_exactly_once((players, played) in history_strategy()) {
        let ranked = rank_players(&players);
        let pairing = pair_round(&ranked, &played);

        let mut seen: HashMap<i64, usize> = HashMap::new();
        for m in &pairing.matches {
            *seen.entry(m.player1).or_default() += 1;
            if let Some(p2) = m.player2 {
                prop_assert_ne!(m.player1, p2, "a player cannot face themselves");
                *seen.entry(p2).or_default() += 1;
            }
        }

        prop_assert_eq!(seen.len(), players.len());
        prop_assert!(seen.values().all(|&count| count == 1));
    }

    #[test]
    fn test_at_most_one_bye((players, played) in history_strategy()) {
        let ranked = rank_players(&players);
        let pairing = pair_round(&ranked, &played);

        let byes = pairing.matches.iter().filter(|m| m.is_bye()).count();
        prop_assert_eq!(byes, players.len() % 2);
        if let Some(bye) = pairing.bye() {
            prop_assert_eq!(bye.winner, Some(bye.player1));
        }
    }

    #[test]
    fn test_no_rematch_without_history(players in players_strategy(16)) {
        let ranked = rank_players(&players);
        let pairing = pair_round(&ranked, &HashSet::new());

        prop_assert!(pairing.forced_rematches.is_empty());
        prop_assert_eq!(pairing.matches.len(), players.len().div_ceil(2));
    }

    #[test]
    fn test_rematches_come_only_from_fallback_pass((players, played) in history_strategy()) {
        let ranked = rank_players(&players);
        let pairing = pair_round(&ranked, &played);

        // Greedy pairings come first, then the fallback pairings, then the bye
        let keys: Vec<PairingKey> = pairing.matches.iter().filter_map(|m| {
            m.player2.map(|p2| PairingKey::new(m.player1, p2))
        }).collect();
        let greedy = keys.len() - pairing.forced_rematches.len();

        for key in &keys[..greedy] {
            prop_assert!(!played.contains(key), "greedy pass repeated {}", key);
        }
        prop_assert_eq!(&keys[greedy..], pairing.forced_rematches.as_slice());
        for key in &pairing.forced_rematches {
            prop_assert!(played.contains(key), "{} reported as forced but never played", key);
        }
    }

    #[test]
    fn test_ranking_is_sorted_and_stable(players in players_strategy(16)) {
        let ranked = rank_players(&players);

        for pair in ranked.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            prop_assert!(a.score_differential() >= b.score_differential());
            if a.score_differential() == b.score_differential() {
                prop_assert!(a.id < b.id, "ties keep input order");
            }
        }
    }
}
