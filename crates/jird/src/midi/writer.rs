//! Standard MIDI File chunk and event encoding.
//!
//! Events are recorded against an absolute tick and converted to delta times
//! when the track is encoded, so a chord's note-offs come out with the full
//! duration on the first event and zero on the rest.

/// Largest value a variable-length delta time may hold.
pub const MAX_VARIABLE_LENGTH: u32 = 0x0FFF_FFFF;

const END_OF_TRACK: [u8; 4] = [0x00, 0xFF, 0x2F, 0x00];

/// One track's events, built in time order.
#[derive(Debug, Default)]
pub struct TrackWriter {
    events: Vec<TrackEvent>,
    current_tick: u64,
}

#[derive(Debug)]
struct TrackEvent {
    tick: u64,
    data: Vec<u8>,
}

impl TrackWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, ticks: u32) {
        self.current_tick += u64::from(ticks);
    }

    /// Tempo meta event; `microseconds` must fit in 24 bits.
    pub fn tempo(&mut self, microseconds: u32) {
        let [_, high, middle, low] = microseconds.to_be_bytes();
        self.meta_event(0x51, vec![high, middle, low]);
    }

    /// Program change; `program` is the raw data byte.
    pub fn program_change(&mut self, channel: u8, program: u8) {
        self.channel_event(vec![0xC0 | (channel & 0x0F), program & 0x7F]);
    }

    pub fn pitch_bend(&mut self, channel: u8, bend: u16) {
        let [least, most] = fourteen_bit(bend);
        self.channel_event(vec![0xE0 | (channel & 0x0F), least, most]);
    }

    pub fn note_on(&mut self, channel: u8, pitch: u8, velocity: u8) {
        self.channel_event(vec![0x90 | (channel & 0x0F), pitch, velocity]);
    }

    pub fn note_off(&mut self, channel: u8, pitch: u8) {
        self.channel_event(vec![0x80 | (channel & 0x0F), pitch, 0]);
    }

    fn meta_event(&mut self, event_type: u8, data: Vec<u8>) {
        let mut event_data = vec![0xFF, event_type];
        event_data.extend(encode_variable_length(data.len() as u32));
        event_data.extend(data);
        self.events.push(TrackEvent {
            tick: self.current_tick,
            data: event_data,
        });
    }

    fn channel_event(&mut self, data: Vec<u8>) {
        self.events.push(TrackEvent {
            tick: self.current_tick,
            data,
        });
    }

    /// Track body: delta-timed events followed by end-of-track.
    pub fn encode_track(mut self) -> Vec<u8> {
        // Stable, so events at one tick keep the order they were written in.
        self.events.sort_by_key(|e| e.tick);

        let mut out = Vec::new();
        let mut last_tick = 0u64;
        for event in &self.events {
            let delta = event.tick.saturating_sub(last_tick);
            out.extend(encode_variable_length(delta as u32));
            out.extend(&event.data);
            last_tick = event.tick;
        }
        out.extend(END_OF_TRACK);
        out
    }

    /// The complete `MTrk` chunk.
    pub fn finish(self) -> Vec<u8> {
        chunk(b"MTrk", &self.encode_track())
    }
}

/// A chunk: four-byte id, big-endian body length, body.
pub fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 8);
    out.extend_from_slice(id);
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
    out
}

/// The `MThd` chunk.
pub fn header_chunk(format: u16, tracks: u16, ticks_per_beat: u16) -> Vec<u8> {
    let mut body = Vec::with_capacity(6);
    body.extend_from_slice(&format.to_be_bytes());
    body.extend_from_slice(&tracks.to_be_bytes());
    body.extend_from_slice(&ticks_per_beat.to_be_bytes());
    chunk(b"MThd", &body)
}

/// Encode a value as a MIDI variable-length quantity: seven bits per byte,
/// most significant first, with the top bit set on all but the last byte.
pub fn encode_variable_length(mut value: u32) -> Vec<u8> {
    if value == 0 {
        return vec![0];
    }

    let mut bytes = Vec::new();
    bytes.push((value & 0x7F) as u8);
    value >>= 7;

    while value > 0 {
        bytes.push(((value & 0x7F) | 0x80) as u8);
        value >>= 7;
    }

    bytes.reverse();
    bytes
}

/// Split the low fourteen bits of `n` into (least, most) significant seven.
pub fn fourteen_bit(n: u16) -> [u8; 2] {
    [(n & 0x7F) as u8, ((n >> 7) & 0x7F) as u8]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02X}", b)).collect()
    }

    #[test]
    fn test_variable_length_encoding() {
        let cases: [(u32, &str); 12] = [
            (0x00, "00"),
            (0x40, "40"),
            (0x7F, "7F"),
            (0x80, "8100"),
            (0x2000, "C000"),
            (0x3FFF, "FF7F"),
            (0x4000, "818000"),
            (0x10_0000, "C08000"),
            (0x1F_FFFF, "FFFF7F"),
            (0x20_0000, "81808000"),
            (0x800_0000, "C0808000"),
            (0xFFF_FFFF, "FFFFFF7F"),
        ];
        for (value, expected) in cases {
            assert_eq!(hex(&encode_variable_length(value)), expected, "{:#X}", value);
        }
    }

    fn decode_variable_length(bytes: &[u8]) -> u32 {
        bytes
            .iter()
            .fold(0u32, |acc, byte| (acc << 7) | u32::from(byte & 0x7F))
    }

    #[test]
    fn test_variable_length_decodes_back() {
        let mut value = 1u32;
        while value <= MAX_VARIABLE_LENGTH {
            for n in [value - 1, value, value + 1] {
                let bytes = encode_variable_length(n);
                assert!(bytes.len() <= 4 || n > MAX_VARIABLE_LENGTH);
                assert!(bytes[..bytes.len() - 1].iter().all(|b| b & 0x80 != 0));
                assert_eq!(bytes[bytes.len() - 1] & 0x80, 0);
                assert_eq!(decode_variable_length(&bytes), n);
            }
            value = value * 3 + 1;
        }
    }

    #[test]
    fn test_fourteen_bit() {
        let cases: [(u16, &str); 9] = [
            (0x3000, "0060"),
            (0, "0000"),
            (1, "0100"),
            (2, "0200"),
            (15, "0F00"),
            (16, "1000"),
            (0x7F, "7F00"),
            (0x8F, "0F01"),
            (0x3FFF, "7F7F"),
        ];
        for (value, expected) in cases {
            assert_eq!(hex(&fourteen_bit(value)), expected, "{:#X}", value);
        }
    }

    #[test]
    fn test_track_chunk_header() {
        assert_eq!(hex(&chunk(b"MTrk", &[])), "4D54726B00000000");
        assert_eq!(hex(&chunk(b"MTrk", &[0xFF])), "4D54726B00000001FF");
        assert_eq!(&chunk(b"MTrk", &[0xCD; 0x24])[4..8], &[0, 0, 0, 0x24]);
    }

    #[test]
    fn test_header_chunk() {
        assert_eq!(
            hex(&header_chunk(1, 2, 960)),
            "4D546864000000060001000203C0"
        );
    }

    #[test]
    fn test_tempo_track() {
        let cases: [(u32, &str); 3] = [
            (1, "00FF510300000100FF2F00"),
            (250_000, "00FF510303D09000FF2F00"),
            (500_000, "00FF510307A12000FF2F00"),
        ];
        for (microseconds, expected) in cases {
            let mut track = TrackWriter::new();
            track.tempo(microseconds);
            assert_eq!(hex(&track.encode_track()), expected);
        }
    }

    #[test]
    fn test_simultaneous_release() {
        let mut track = TrackWriter::new();
        track.note_on(0, 60, 64);
        track.note_on(1, 64, 64);
        track.advance(960);
        track.note_off(0, 60);
        track.note_off(1, 64);
        assert_eq!(
            hex(&track.encode_track()),
            "00903C40009140408740803C000081400000FF2F00"
        );
    }
}
