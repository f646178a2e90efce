//! Swiss-system pairing.
//!
//! Players are ranked by win/loss differential and paired greedily with the
//! nearest-ranked opponent they have not met yet in the tournament. The pass
//! is a heuristic: it never backtracks, and ties go to the first candidate in
//! rank order so that the output is deterministic.
//!
//! ## Example
//!
//! ```
//! use std::collections::{BTreeMap, HashSet};
//! use swiss_tournament::pairing::{pair_round, rank_players};
//! use swiss_tournament::player::Player;
//!
//! let players: Vec<Player> = [(1, 2, 1), (2, 1, 2), (3, 3, 0), (4, 0, 3)]
//!     .into_iter()
//!     .map(|(id, won, lost)| Player {
//!         id,
//!         name: format!("P{id}"),
//!         email: None,
//!         games_won: won,
//!         games_lost: lost,
//!         rankings: BTreeMap::new(),
//!     })
//!     .collect();
//!
//! let ranked = rank_players(&players);
//! let pairing = pair_round(&ranked, &HashSet::new());
//! assert_eq!(pairing.matches.len(), 2);
//! assert_eq!(pairing.matches[0].player1, 3);
//! assert_eq!(pairing.matches[0].player2, Some(1));
//! ```

pub mod swiss;

pub use swiss::{Pairing, PairingKey, pair_round, played_pairings, rank_players};
