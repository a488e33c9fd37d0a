use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Atvi,
    Battlenet,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Atvi => "atvi",
            Platform::Battlenet => "battlenet",
        }
    }
}

/// Identity record for one tracked (or looked-up) player. `name` is the
/// stable join key used for sheet tabs and rosters; the gamertag plus
/// activision id plus platform address the player on the tracker side.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub name: String,
    pub gamertag: String,
    pub activision_id: String,
    pub platform: Platform,
}

impl Player {
    pub fn new(name: &str, gamertag: &str, activision_id: &str) -> Self {
        Self {
            name: name.to_string(),
            gamertag: gamertag.to_string(),
            activision_id: activision_id.to_string(),
            platform: Platform::Atvi,
        }
    }

    /// `Gamertag#1234`, or the bare gamertag for handles without a
    /// discriminator suffix.
    pub fn full_handle(&self) -> String {
        if self.activision_id.is_empty() {
            self.gamertag.clone()
        } else {
            format!("{}#{}", self.gamertag, self.activision_id)
        }
    }
}

struct PlayerInfo {
    name: &'static str,
    gamertag: &'static str,
    activision_id: &'static str,
}

const TRACKED_PLAYERS: &[PlayerInfo] = &[
    PlayerInfo {
        name: "Adam",
        gamertag: "AdotRates",
        activision_id: "7241830",
    },
    PlayerInfo {
        name: "Devin",
        gamertag: "DevTakesPoint",
        activision_id: "1938274",
    },
    PlayerInfo {
        name: "Jorge",
        gamertag: "ElJefeWZ",
        activision_id: "5526917",
    },
    PlayerInfo {
        name: "Marcus",
        gamertag: "mklutch",
        activision_id: "8830142",
    },
    PlayerInfo {
        name: "Pete",
        gamertag: "PistolPetey",
        activision_id: "2207485",
    },
    PlayerInfo {
        name: "Sam",
        gamertag: "SamuraiSlurp",
        activision_id: "9914206",
    },
    PlayerInfo {
        name: "Tyler",
        gamertag: "TyTheLandlord",
        activision_id: "4450369",
    },
];

const NIGHT_OWLS: &[&str] = &["Adam", "Devin", "Marcus", "Pete"];
const SWEATS: &[&str] = &["Jorge", "Sam", "Tyler"];

const DEFAULT_NIGHT_OWLS_SHEET_ID: &str = "1kP3qWvXhYdR8sLmA0cJt5uBzgENfTiQ6o9D2xHrS4aU";
const DEFAULT_SWEATS_SHEET_ID: &str = "1wRf7NgbMskQh9_UI2yyXppsoaSJhEottbK0iV8thIXQ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    NightOwls,
    Sweats,
}

impl Team {
    pub fn label(self) -> &'static str {
        match self {
            Team::NightOwls => "Night Owls",
            Team::Sweats => "The Sweats",
        }
    }

    pub fn roster(self) -> Vec<Player> {
        let names = match self {
            Team::NightOwls => NIGHT_OWLS,
            Team::Sweats => SWEATS,
        };
        names.iter().filter_map(|name| tracked_player(name)).collect()
    }

    /// Spreadsheet id for the team's workbook; the env var wins over the
    /// built-in default.
    pub fn sheet_id(self) -> String {
        let (var, default) = match self {
            Team::NightOwls => ("NIGHT_OWLS_SHEET_ID", DEFAULT_NIGHT_OWLS_SHEET_ID),
            Team::Sweats => ("SWEATS_SHEET_ID", DEFAULT_SWEATS_SHEET_ID),
        };
        env::var(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    }
}

pub fn tracked_player(name: &str) -> Option<Player> {
    TRACKED_PLAYERS
        .iter()
        .find(|info| info.name == name)
        .map(|info| Player::new(info.name, info.gamertag, info.activision_id))
}

/// Maps a gamertag seen in a match payload to the internal name used in
/// sheets. `None` for players outside the tracked pool.
pub fn internal_name_for(gamertag: &str) -> Option<&'static str> {
    TRACKED_PLAYERS
        .iter()
        .find(|info| info.gamertag == gamertag)
        .map(|info| info.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rosters_resolve_every_listed_name() {
        assert_eq!(Team::NightOwls.roster().len(), NIGHT_OWLS.len());
        assert_eq!(Team::Sweats.roster().len(), SWEATS.len());
    }

    #[test]
    fn full_handle_skips_empty_discriminator() {
        let mut player = Player::new("Adam", "AdotRates", "7241830");
        assert_eq!(player.full_handle(), "AdotRates#7241830");
        player.activision_id.clear();
        assert_eq!(player.full_handle(), "AdotRates");
    }

    #[test]
    fn gamertag_lookup_covers_both_teams() {
        assert_eq!(internal_name_for("AdotRates"), Some("Adam"));
        assert_eq!(internal_name_for("TyTheLandlord"), Some("Tyler"));
        assert_eq!(internal_name_for("RandomPubbie"), None);
    }
}
