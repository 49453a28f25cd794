use crate::parse::find_bytes;

/// Length of every request opcode and reply header marker.
pub const MARKER_LEN: usize = 5;

/// Replies are well under this; a datagram that fills it is cut short.
pub const MAX_PACKET_SIZE: usize = 2048;

/// The three queries a status exchange is made of. Each request is a bare
/// 5-byte opcode, and the server echoes the same bytes in front of its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Server summary: name, map, game type, player counts.
    ServerInfo,
    /// Game-mode attributes as key/value pairs.
    GameInfo,
    /// Player roster.
    PlayersInfo,
}

impl PacketType {
    /// Request order on the wire.
    pub const ALL: [PacketType; 3] = [
        PacketType::ServerInfo,
        PacketType::GameInfo,
        PacketType::PlayersInfo,
    ];

    pub fn marker(&self) -> [u8; MARKER_LEN] {
        let kind: u8 = match self {
            PacketType::ServerInfo => 0,
            PacketType::GameInfo => 1,
            PacketType::PlayersInfo => 2,
        };
        [0x80, 0x00, 0x00, 0x00, kind]
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct RequestPacket {
    packet_type: PacketType,
}

impl RequestPacket {
    pub fn new(packet_type: PacketType) -> Self {
        RequestPacket { packet_type }
    }

    /// Serializes a request packet into an array of bytes.
    pub fn pack(&self) -> Vec<u8> {
        self.packet_type.marker().to_vec()
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ResponsePacket<'a> {
    packet_type: PacketType,
    body: &'a [u8],
}

impl<'a> ResponsePacket<'a> {
    /// Classify an incoming datagram by the header marker it contains.
    ///
    /// The marker does not have to sit at the start. If more than one marker
    /// shows up, the earliest wins, and the body is everything after it.
    /// Returns `None` for datagrams carrying no known marker.
    pub fn unpack(incoming: &'a [u8]) -> Option<Self> {
        PacketType::ALL
            .iter()
            .filter_map(|t| find_bytes(incoming, &t.marker()).map(|at| (at, *t)))
            .min_by_key(|(at, _)| *at)
            .map(|(at, packet_type)| ResponsePacket {
                packet_type,
                body: &incoming[at + MARKER_LEN..],
            })
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn body(&self) -> &'a [u8] {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_are_fixed_opcodes() {
        assert_eq!(
            RequestPacket::new(PacketType::ServerInfo).pack(),
            b"\x80\x00\x00\x00\x00"
        );
        assert_eq!(
            RequestPacket::new(PacketType::GameInfo).pack(),
            b"\x80\x00\x00\x00\x01"
        );
        assert_eq!(
            RequestPacket::new(PacketType::PlayersInfo).pack(),
            b"\x80\x00\x00\x00\x02"
        );
    }

    #[test]
    fn unpack_splits_header_from_body() {
        let data = b"\x80\x00\x00\x00\x01\x02a\x00";
        let packet = ResponsePacket::unpack(data).unwrap();
        assert_eq!(packet.packet_type(), PacketType::GameInfo);
        assert_eq!(packet.body(), b"\x02a\x00");
    }

    #[test]
    fn unpack_finds_marker_after_leading_bytes() {
        let data = b"\xff\xff\x80\x00\x00\x00\x02\x07";
        let packet = ResponsePacket::unpack(data).unwrap();
        assert_eq!(packet.packet_type(), PacketType::PlayersInfo);
        assert_eq!(packet.body(), b"\x07");
    }

    #[test]
    fn earliest_marker_wins() {
        // a player reply whose body happens to contain the server-info marker
        let data = b"\x80\x00\x00\x00\x02\x80\x00\x00\x00\x00";
        let packet = ResponsePacket::unpack(data).unwrap();
        assert_eq!(packet.packet_type(), PacketType::PlayersInfo);
        assert_eq!(packet.body(), b"\x80\x00\x00\x00\x00");
    }

    #[test]
    fn unknown_datagram_is_none() {
        assert_eq!(ResponsePacket::unpack(b"\xff\xff\xff\xffI"), None);
        assert_eq!(ResponsePacket::unpack(b""), None);
    }

    #[test]
    fn header_only_has_empty_body() {
        let packet = ResponsePacket::unpack(b"\x80\x00\x00\x00\x00").unwrap();
        assert!(packet.body().is_empty());
    }
}
