//! Hand-assembled SMF fixtures for unit tests

/// Encode `value` as an SMF variable-length quantity
pub fn encode_vlq(mut value: u32) -> Vec<u8> {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    bytes.reverse();
    bytes
}

/// Builder for the body of one `MTrk` chunk
#[derive(Default)]
pub struct TrackBytes {
    data: Vec<u8>,
}

impl TrackBytes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta time followed by raw event bytes
    pub fn event(mut self, delta: u32, bytes: &[u8]) -> Self {
        self.data.extend(encode_vlq(delta));
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn meta(self, delta: u32, kind: u8, payload: &[u8]) -> Self {
        let mut bytes = vec![0xFF, kind];
        bytes.extend(encode_vlq(payload.len() as u32));
        bytes.extend_from_slice(payload);
        self.event(delta, &bytes)
    }

    pub fn name(self, delta: u32, name: &str) -> Self {
        self.meta(delta, 0x03, name.as_bytes())
    }

    pub fn tempo(self, delta: u32, micros: u32) -> Self {
        let bytes = micros.to_be_bytes();
        self.meta(delta, 0x51, &bytes[1..])
    }

    pub fn note_on(self, delta: u32, channel: u8, pitch: u8, velocity: u8) -> Self {
        self.event(delta, &[0x90 | channel, pitch, velocity])
    }

    pub fn note_off(self, delta: u32, channel: u8, pitch: u8) -> Self {
        self.event(delta, &[0x80 | channel, pitch, 0x40])
    }

    pub fn end(self, delta: u32) -> Self {
        self.meta(delta, 0x2F, &[])
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}

/// Wrap a raw chunk body with its four-byte id and length
pub fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut bytes = id.to_vec();
    bytes.extend((body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(body);
    bytes
}

/// A complete file with a six-byte header and one `MTrk` chunk per track
pub fn smf(format: u16, division: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut header = Vec::new();
    header.extend(format.to_be_bytes());
    header.extend((tracks.len() as u16).to_be_bytes());
    header.extend(division.to_be_bytes());

    let mut bytes = chunk(b"MThd", &header);
    for track in tracks {
        bytes.extend(chunk(b"MTrk", track));
    }
    bytes
}
