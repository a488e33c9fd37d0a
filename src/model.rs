use std::collections::HashSet;

/// Match-level facts shared by every participant.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchMetadata {
    /// Externally assigned, opaque. Ordering comes from `start_time_ts`, never
    /// from the id.
    pub match_id: String,
    pub mode_name: String,
    pub start_time_ts: i64,
    pub player_count: u32,
    /// Number of placement slots in the lobby.
    pub team_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerMatchStats {
    pub kills: u32,
    pub deaths: u32,
    pub gulag_kills: u32,
    pub gulag_deaths: u32,
    pub damage_done: u32,
    pub time_played_sec: u32,
    /// 1 = winner. `None` when the payload was incomplete.
    pub team_placement: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub gamertag: String,
    pub stats: PlayerMatchStats,
}

/// One fetched match. Built once per fetch and immutable for the rest of the
/// run; only projected rows ever get persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub metadata: MatchMetadata,
    participants: Vec<Participant>,
}

impl Match {
    /// Keeps at most one participant per gamertag (first occurrence wins).
    pub fn new(metadata: MatchMetadata, participants: Vec<Participant>) -> Self {
        let mut seen = HashSet::new();
        let participants = participants
            .into_iter()
            .filter(|p| seen.insert(p.gamertag.clone()))
            .collect();
        Self {
            metadata,
            participants,
        }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, gamertag: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.gamertag == gamertag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> MatchMetadata {
        MatchMetadata {
            match_id: "123".to_string(),
            mode_name: "Battle Royale Quads".to_string(),
            start_time_ts: 1_619_298_000,
            player_count: 2,
            team_count: 1,
        }
    }

    #[test]
    fn duplicate_gamertags_collapse_to_first() {
        let first = Participant {
            gamertag: "Dup".to_string(),
            stats: PlayerMatchStats {
                kills: 7,
                ..Default::default()
            },
        };
        let second = Participant {
            gamertag: "Dup".to_string(),
            stats: PlayerMatchStats::default(),
        };
        let m = Match::new(meta(), vec![first.clone(), second]);
        assert_eq!(m.participants(), &[first]);
    }

    #[test]
    fn participant_lookup_is_exact() {
        let m = Match::new(
            meta(),
            vec![Participant {
                gamertag: "SomeTag".to_string(),
                stats: PlayerMatchStats::default(),
            }],
        );
        assert!(m.participant("SomeTag").is_some());
        assert!(m.participant("sometag").is_none());
    }
}
