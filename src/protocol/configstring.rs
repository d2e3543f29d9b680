//! Config-string table and the metadata mined from it.
//!
//! Config-strings are indexed string slots. Two windows matter here:
//!
//! - a small window around `CS_MODELS` holds the world model string
//!   `maps/<name>.bsp`, which gives the map name;
//! - `CS_PLAYERSKINS + client` holds `name\model/skin` for each client,
//!   which gives the player name and, through the skin, the team.
//!
//! # Example
//!
//! ```
//! use mvd2_parser::protocol::ConfigStrings;
//!
//! let mut table = ConfigStrings::new(32..40);
//! table.set(33, "maps/urban.bsp".to_string());
//! table.set(1312 + 4, "Alice\\male/ctf_r".to_string());
//!
//! assert_eq!(table.map_name(), Some("urban"));
//! assert_eq!(table.player_names()[&4], "Alice");
//! assert_eq!(table.player_teams()[&4], 1);
//! ```

use std::collections::BTreeMap;
use std::ops::Range;

use crate::binary::ByteCursor;
use crate::error::{ParserError, Result};
use crate::format::{CS_PLAYERSKINS, MAX_CLIENTS, MAX_CONFIGSTRINGS};

/// Team number for red-skinned players.
pub const TEAM_RED: u8 = 1;

/// Team number for blue-skinned players.
pub const TEAM_BLUE: u8 = 2;

/// Config-string table plus the map and player identity derived from it.
#[derive(Debug, Clone, Default)]
pub struct ConfigStrings {
    strings: BTreeMap<u16, String>,
    world_model_slots: Range<u16>,
    map_name: Option<String>,
    player_names: BTreeMap<u8, String>,
    player_teams: BTreeMap<u8, u8>,
}

impl ConfigStrings {
    /// Creates an empty table that looks for the world model in `world_model_slots`.
    #[must_use]
    pub fn new(world_model_slots: Range<u16>) -> Self {
        Self {
            world_model_slots,
            ..Self::default()
        }
    }

    /// Stores a config-string and updates derived metadata.
    ///
    /// Returns the map name when this string is the world model.
    pub fn set(&mut self, index: u16, value: String) -> Option<&str> {
        let mut found_map = false;

        if let Some(name) = self.world_model_name(index, &value) {
            self.map_name = Some(name.to_string());
            found_map = true;
        } else if let Some(client) = skin_slot(index) {
            self.apply_skin(client, &value);
        }

        self.strings.insert(index, value);
        if found_map {
            self.map_name.as_deref()
        } else {
            None
        }
    }

    /// Reads `index` + string from the stream and stores it.
    ///
    /// # Errors
    ///
    /// - `ParserError::InvalidConfigString` if the index is out of range
    /// - `ParserError::UnexpectedEof` if the stream is truncated
    pub fn read_one(&mut self, cursor: &mut ByteCursor<'_>) -> Result<()> {
        let index = cursor.read_u16()?;
        if index >= MAX_CONFIGSTRINGS {
            return Err(ParserError::InvalidConfigString { index });
        }
        let value = cursor.read_string()?;
        self.set(index, value);
        Ok(())
    }

    /// Reads config-strings until an index at or above the table size.
    ///
    /// Returns the number of strings read.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the list is truncated.
    pub fn read_list(&mut self, cursor: &mut ByteCursor<'_>) -> Result<usize> {
        let mut count = 0;
        loop {
            let index = cursor.read_u16()?;
            if index >= MAX_CONFIGSTRINGS {
                return Ok(count);
            }
            let value = cursor.read_string()?;
            self.set(index, value);
            count += 1;
        }
    }

    /// Returns the string stored at `index`.
    #[must_use]
    pub fn get(&self, index: u16) -> Option<&str> {
        self.strings.get(&index).map(String::as_str)
    }

    /// Returns the map name, if a world model string has been seen.
    #[must_use]
    pub fn map_name(&self) -> Option<&str> {
        self.map_name.as_deref()
    }

    /// Returns the client number → player name table.
    #[must_use]
    pub fn player_names(&self) -> &BTreeMap<u8, String> {
        &self.player_names
    }

    /// Returns the client number → team table.
    #[must_use]
    pub fn player_teams(&self) -> &BTreeMap<u8, u8> {
        &self.player_teams
    }

    fn world_model_name<'v>(&self, index: u16, value: &'v str) -> Option<&'v str> {
        if !self.world_model_slots.contains(&index) {
            return None;
        }
        let file = value.strip_prefix("maps/")?.strip_suffix(".bsp")?;
        Some(file.rsplit('/').next().unwrap_or(file))
    }

    fn apply_skin(&mut self, client: u8, value: &str) {
        if value.is_empty() {
            return;
        }

        let mut parts = value.split('\\');
        let name = parts.next().unwrap_or_default();
        self.player_names.insert(client, name.to_string());

        if let Some(team) = parts.next().and_then(team_from_skin) {
            self.player_teams.insert(client, team);
        }
    }
}

/// Maps a config-string index to a client number if it is a skin slot.
fn skin_slot(index: u16) -> Option<u8> {
    let client = index.checked_sub(CS_PLAYERSKINS)?;
    if client < MAX_CLIENTS {
        u8::try_from(client).ok()
    } else {
        None
    }
}

/// Infers the team from the `model/skin` part of a skin string.
fn team_from_skin(model_skin: &str) -> Option<u8> {
    let skin = model_skin.rsplit('/').next().unwrap_or(model_skin);
    let skin = skin.to_lowercase();

    if skin.contains("ctf_r") || skin.ends_with("_r") {
        Some(TEAM_RED)
    } else if skin.contains("ctf_b") || skin.ends_with("_b") {
        Some(TEAM_BLUE)
    } else {
        None
    }
}
