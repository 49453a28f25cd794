use std::collections::HashMap;

use crate::error::QueryError;
use crate::packet::{PacketType, ResponsePacket};
use crate::parse::PacketReader;

/// Game-info attribute some servers use to name the map's preview image.
const MAP_PREVIEW_KEY: &str = "MapPreview";

/// Server information as obtained by [crate::query::query].
///
/// Filled in one reply at a time. Fields belonging to a reply that has not
/// been processed yet keep their default value, so only a value returned
/// from a successful query is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server ID as reported by the server
    pub id: i32,
    /// IP the server reports for itself, often empty
    pub ip: String,
    /// Host part of the address that was queried
    pub address: String,
    /// Game port
    pub port: i32,
    /// Query port
    pub query_port: i32,
    /// Server name
    pub name: String,
    /// Current map
    pub map: String,
    /// Preview image for the current map, if the server advertises one
    pub map_preview: Option<String>,
    /// Game type, e.g. `xDeathMatch`
    pub game_type: String,
    /// Current players
    pub players: i32,
    /// Max players
    pub max_players: i32,
    /// Ping as reported by the server
    pub ping: i32,
    /// Server flags bitmask
    pub flags: i32,
    /// Skill level
    pub skill_level: i32,
    /// Players in the order the server listed them
    pub player_list: Vec<PlayerInfo>,
    /// Game-mode attributes
    pub game_info: HashMap<String, String>,
}

/// One entry of the player roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    pub id: i32,
    pub name: String,
    pub ping: i32,
    pub score: i32,
    pub stats_id: i32,
}

impl ServerInfo {
    pub(crate) fn new(address: String) -> Self {
        ServerInfo {
            address,
            ..Default::default()
        }
    }

    /// Decode a reply into `self`, according to its type.
    ///
    /// A reply is applied whole or not at all: on a truncated body nothing
    /// is changed and the error is returned.
    pub fn apply(&mut self, packet: &ResponsePacket) -> Result<(), QueryError> {
        let mut reader = PacketReader::new(packet.body());
        match packet.packet_type() {
            PacketType::ServerInfo => self.parse_server_info(&mut reader),
            PacketType::GameInfo => self.parse_game_info(&mut reader),
            PacketType::PlayersInfo => self.parse_players(&mut reader),
        }
    }

    fn parse_server_info(&mut self, reader: &mut PacketReader) -> Result<(), QueryError> {
        // positional, the order here is the wire order
        let id = reader.get_i32()?;
        let ip = reader.get_string()?;
        let port = reader.get_i32()?;
        let query_port = reader.get_i32()?;
        let name = reader.get_string()?;
        let map = reader.get_string()?;
        let game_type = reader.get_string()?;
        let players = reader.get_i32()?;
        let max_players = reader.get_i32()?;
        let ping = reader.get_i32()?;
        let flags = reader.get_i32()?;
        let skill_level = reader.get_i32()?;

        self.id = id;
        self.ip = ip;
        self.port = port;
        self.query_port = query_port;
        self.name = name;
        self.map = map;
        self.game_type = game_type;
        self.players = players;
        self.max_players = max_players;
        self.ping = ping;
        self.flags = flags;
        self.skill_level = skill_level;
        Ok(())
    }

    fn parse_game_info(&mut self, reader: &mut PacketReader) -> Result<(), QueryError> {
        let mut game_info = HashMap::new();
        while reader.has_data() {
            let key = reader.get_string()?;
            let value = reader.get_string()?;
            game_info.insert(key, value);
        }

        self.map_preview = game_info.get(MAP_PREVIEW_KEY).cloned();
        self.game_info = game_info;
        Ok(())
    }

    fn parse_players(&mut self, reader: &mut PacketReader) -> Result<(), QueryError> {
        let mut players = Vec::new();
        while reader.has_data() {
            players.push(PlayerInfo {
                id: reader.get_i32()?,
                name: reader.get_string()?,
                ping: reader.get_i32()?,
                score: reader.get_i32()?,
                stats_id: reader.get_i32()?,
            });
        }

        self.player_list.extend(players);
        Ok(())
    }
}
