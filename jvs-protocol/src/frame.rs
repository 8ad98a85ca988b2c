//! Frame encoding and decoding for the JVS link layer.
//!
//! Frame format (logical bytes, before escaping):
//! - START (1 byte): 0xE0, always sent raw
//! - ADDRESS (1 byte): node address, 0xFF is broadcast
//! - LENGTH (1 byte): payload length + 1
//! - PAYLOAD (0-254 bytes): command or response data
//! - CHECKSUM (1 byte): (ADDRESS + LENGTH + sum of PAYLOAD) mod 256
//!
//! Every byte after START is escaped (see [`crate::escape`]), and the
//! checksum is computed over the unescaped values.

use heapless::Vec;
use jvs_hal::{Deadline, ReadError, SerialRx};
use thiserror::Error;

use crate::escape::{escape, LogicalByte, Unescaper, STX};

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 254;

/// Maximum complete frame size on the wire
///
/// START plus every other field doubled by worst-case escaping.
pub const MAX_FRAME_SIZE: usize = 1 + 2 * (1 + 1 + MAX_PAYLOAD_SIZE + 1);

/// Why a received frame was rejected as malformed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InvalidFrameKind {
    /// Length byte was zero or a start marker
    #[error("invalid length")]
    BadLength,
    /// A start marker appeared where a data byte was expected
    #[error("unexpected start marker")]
    UnexpectedStart,
}

/// Errors that can occur during frame encoding or decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds [`MAX_PAYLOAD_SIZE`]
    #[error("payload longer than 254 bytes")]
    InvalidLength,
    /// No frame start, or the stream ran dry mid-frame, before the deadline
    #[error("timed out waiting for frame")]
    Timeout,
    /// Malformed frame structure
    #[error("invalid frame: {0}")]
    InvalidFrame(InvalidFrameKind),
    /// Checksum mismatch
    #[error("checksum mismatch: computed {expected:#04x}, received {received:#04x}")]
    Checksum { expected: u8, received: u8 },
    /// Buffer too small for encoding
    #[error("buffer too small for encoded frame")]
    BufferTooSmall,
}

/// Failure to receive a frame from a transport
#[derive(Debug, Error)]
pub enum RecvError<E> {
    /// The bytes did not form a valid frame
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// The transport itself failed
    #[error("transport error: {0}")]
    Transport(E),
}

impl<E> RecvError<E> {
    /// The protocol-level error, if this was one
    pub fn frame_error(&self) -> Option<FrameError> {
        match self {
            RecvError::Frame(e) => Some(*e),
            RecvError::Transport(_) => None,
        }
    }
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Node address
    pub address: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame with the given address and payload
    pub fn new(address: u8, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::InvalidLength);
        }

        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::InvalidLength)?;

        Ok(Self {
            address,
            payload: payload_vec,
        })
    }

    /// Create a frame with no payload
    pub fn empty(address: u8) -> Self {
        Self {
            address,
            payload: Vec::new(),
        }
    }

    /// Value carried in the LENGTH field
    pub fn length_byte(&self) -> u8 {
        // payload is capped at 254, so this never overflows
        self.payload.len() as u8 + 1
    }

    /// Checksum over the logical frame contents
    pub fn checksum(&self) -> u8 {
        checksum(self.address, self.length_byte(), &self.payload)
    }

    /// Number of bytes this frame occupies on the wire
    pub fn encoded_len(&self) -> usize {
        1 + [self.address, self.length_byte(), self.checksum()]
            .iter()
            .chain(self.payload.iter())
            .map(|&b| escape(b).as_bytes().len())
            .sum::<usize>()
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let mut writer = SliceWriter { buffer, pos: 0 };
        let length = self.length_byte();

        writer.put(STX)?;
        writer.put_escaped(self.address)?;
        writer.put_escaped(length)?;

        let mut sum = self.address.wrapping_add(length);
        for &byte in &self.payload {
            sum = sum.wrapping_add(byte);
            writer.put_escaped(byte)?;
        }
        writer.put_escaped(sum)?;

        Ok(writer.pos)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// Checksum over address, length byte and payload
pub fn checksum(address: u8, length_byte: u8, payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(address.wrapping_add(length_byte), |sum, &b| sum.wrapping_add(b))
}

/// Encode an address and payload into wire bytes
pub fn encode(address: u8, payload: &[u8]) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
    Frame::new(address, payload)?.encode_to_vec()
}

/// Receive one frame from `rx`
///
/// Discards bytes until a start marker, then reads the rest of the frame.
/// Every byte read is bounded by `deadline`; a stream that stalls or ends
/// mid-frame yields [`FrameError::Timeout`].
pub fn decode<R: SerialRx>(rx: &mut R, deadline: Deadline) -> Result<Frame, RecvError<R::Error>> {
    let mut parser = FrameParser::new();

    loop {
        let byte = match rx.read_byte(deadline) {
            Ok(byte) => byte,
            Err(ReadError::Timeout) => return Err(FrameError::Timeout.into()),
            Err(ReadError::Io(e)) => return Err(RecvError::Transport(e)),
        };

        if let Some(frame) = parser.feed(byte)? {
            return Ok(frame);
        }

        if parser.is_hunting() && deadline.has_elapsed() {
            return Err(FrameError::Timeout.into());
        }
    }
}

/// Cursor over an output buffer
struct SliceWriter<'a> {
    buffer: &'a mut [u8],
    pos: usize,
}

impl SliceWriter<'_> {
    fn put(&mut self, byte: u8) -> Result<(), FrameError> {
        let slot = self
            .buffer
            .get_mut(self.pos)
            .ok_or(FrameError::BufferTooSmall)?;
        *slot = byte;
        self.pos += 1;
        Ok(())
    }

    fn put_escaped(&mut self, byte: u8) -> Result<(), FrameError> {
        for &raw in escape(byte).as_bytes() {
            self.put(raw)?;
        }
        Ok(())
    }
}

/// State machine for parsing incoming frames
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParseState,
    unescaper: Unescaper,
    buffer: Vec<u8, MAX_PAYLOAD_SIZE>,
    address: u8,
    expected_length: u8,
    sum: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for START byte
    Hunting,
    /// Got START, waiting for ADDRESS
    WaitingForAddress,
    /// Got ADDRESS, waiting for LENGTH
    WaitingForLength,
    /// Reading payload bytes
    ReadingPayload,
    /// Waiting for CHECKSUM
    WaitingForChecksum,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self {
            state: ParseState::Hunting,
            unescaper: Unescaper::new(),
            buffer: Vec::new(),
            address: 0,
            expected_length: 0,
            sum: 0,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::Hunting;
        self.unescaper.reset();
        self.buffer.clear();
        self.address = 0;
        self.expected_length = 0;
        self.sum = 0;
    }

    /// Returns true while no start marker has been seen
    pub fn is_hunting(&self) -> bool {
        self.state == ParseState::Hunting
    }

    /// Feed a single raw byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a complete valid frame is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` on parse error.
    /// After an error the parser goes back to hunting for a start marker.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        if self.state == ParseState::Hunting {
            // Silently ignore non-START bytes while hunting
            if byte == STX {
                self.state = ParseState::WaitingForAddress;
            }
            return Ok(None);
        }

        let value = match self.unescaper.push(byte) {
            None => return Ok(None),
            Some(LogicalByte::Data(value)) => Some(value),
            Some(LogicalByte::FrameStart) => None,
        };

        let result = self.advance(value);
        if result.is_err() {
            self.reset();
        }
        result
    }

    /// Feed multiple raw bytes to the parser
    ///
    /// Returns the first complete frame found, if any.
    /// Remaining bytes after a complete frame are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Frame>, FrameError> {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }

    /// Apply one logical byte; `None` is a start marker seen mid-frame
    fn advance(&mut self, value: Option<u8>) -> Result<Option<Frame>, FrameError> {
        const UNEXPECTED_START: FrameError =
            FrameError::InvalidFrame(InvalidFrameKind::UnexpectedStart);

        match self.state {
            ParseState::Hunting => Ok(None),
            ParseState::WaitingForAddress => {
                self.address = value.ok_or(UNEXPECTED_START)?;
                self.state = ParseState::WaitingForLength;
                Ok(None)
            }
            ParseState::WaitingForLength => {
                let length = match value {
                    Some(length) if length > 0 => length,
                    _ => return Err(FrameError::InvalidFrame(InvalidFrameKind::BadLength)),
                };
                self.expected_length = length - 1;
                self.sum = self.address.wrapping_add(length);
                self.buffer.clear();
                self.state = if self.expected_length == 0 {
                    ParseState::WaitingForChecksum
                } else {
                    ParseState::ReadingPayload
                };
                Ok(None)
            }
            ParseState::ReadingPayload => {
                let byte = value.ok_or(UNEXPECTED_START)?;
                self.sum = self.sum.wrapping_add(byte);
                // Cannot fail: expected_length is at most 254
                let _ = self.buffer.push(byte);
                if self.buffer.len() == self.expected_length as usize {
                    self.state = ParseState::WaitingForChecksum;
                }
                Ok(None)
            }
            ParseState::WaitingForChecksum => {
                let received = value.ok_or(UNEXPECTED_START)?;
                if received != self.sum {
                    return Err(FrameError::Checksum {
                        expected: self.sum,
                        received,
                    });
                }

                let frame = Frame {
                    address: self.address,
                    payload: self.buffer.clone(),
                };

                self.reset();
                Ok(Some(frame))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::ESC;
    use jvs_hal::IoSerial;
    use proptest::prelude::*;
    use std::io::Cursor;
    use std::time::Duration;

    fn decode_bytes(bytes: &[u8]) -> Result<Frame, FrameError> {
        let mut rx = IoSerial::new(Cursor::new(bytes.to_vec()));
        decode(&mut rx, Deadline::after(Duration::from_secs(1)))
            .map_err(|e| e.frame_error().expect("cursor transport never fails"))
    }

    #[test]
    fn test_encode_reset_broadcast() {
        let encoded = encode(0xFF, &[0xF0]).unwrap();
        // length 2, checksum (0xFF + 0x02 + 0xF0) & 0xFF = 0xF1
        assert_eq!(encoded.as_slice(), &[0xE0, 0xFF, 0x02, 0xF0, 0xF1]);
    }

    #[test]
    fn test_encode_empty_payload() {
        let frame = Frame::empty(0x01);
        let mut buffer = [0u8; 8];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(len, 4);
        assert_eq!(&buffer[..len], &[0xE0, 0x01, 0x01, 0x02]);
    }

    #[test]
    fn test_encode_escapes_address_and_payload() {
        let encoded = encode(STX, &[ESC, 0x10]).unwrap();
        // checksum = 0xE0 + 0x03 + 0xD0 + 0x10 = 0x1C3 -> 0xC3
        assert_eq!(
            encoded.as_slice(),
            &[0xE0, 0xD0, 0xDF, 0x03, 0xD0, 0xCF, 0x10, 0xC3]
        );
    }

    #[test]
    fn test_encode_escapes_checksum() {
        // 0x01 + 0x02 + 0xDD = 0xE0
        let encoded = encode(0x01, &[0xDD]).unwrap();
        assert_eq!(encoded.as_slice(), &[0xE0, 0x01, 0x02, 0xDD, 0xD0, 0xDF]);
    }

    #[test]
    fn test_encoded_len_matches_encode() {
        let frame = Frame::new(0xE0, &[0xD0, 0xE0, 0x00]).unwrap();
        assert_eq!(frame.encoded_len(), frame.encode_to_vec().unwrap().len());
    }

    #[test]
    fn test_payload_too_large() {
        let large_payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(
            Frame::new(0x01, &large_payload),
            Err(FrameError::InvalidLength)
        );
        assert_eq!(encode(0x01, &large_payload), Err(FrameError::InvalidLength));
    }

    #[test]
    fn test_max_payload_fits() {
        let payload = [STX; MAX_PAYLOAD_SIZE];
        let encoded = encode(STX, &payload).unwrap();
        assert!(encoded.len() <= MAX_FRAME_SIZE);
        let frame = decode_bytes(&encoded).unwrap();
        assert_eq!(frame.payload.as_slice(), &payload[..]);
    }

    #[test]
    fn test_buffer_too_small() {
        let frame = Frame::new(0x01, &[1, 2, 3]).unwrap();
        let mut buffer = [0u8; 4];
        assert_eq!(frame.encode(&mut buffer), Err(FrameError::BufferTooSmall));
    }

    #[test]
    fn test_decode_response() {
        // status 0x01, report 0x01, data 0x13
        let frame = decode_bytes(&[0xE0, 0x00, 0x04, 0x01, 0x01, 0x13, 0x19]).unwrap();
        assert_eq!(frame.address, 0x00);
        assert_eq!(frame.payload.as_slice(), &[0x01, 0x01, 0x13]);
    }

    #[test]
    fn test_decode_no_start_times_out() {
        assert_eq!(decode_bytes(&[0x00, 0x01, 0xD0]), Err(FrameError::Timeout));
        assert_eq!(decode_bytes(&[]), Err(FrameError::Timeout));
    }

    #[test]
    fn test_decode_zero_length() {
        assert_eq!(
            decode_bytes(&[0xE0, 0x01, 0x00, 0x01]),
            Err(FrameError::InvalidFrame(InvalidFrameKind::BadLength))
        );
    }

    #[test]
    fn test_decode_start_as_length() {
        assert_eq!(
            decode_bytes(&[0xE0, 0x01, 0xE0, 0x01]),
            Err(FrameError::InvalidFrame(InvalidFrameKind::BadLength))
        );
    }

    #[test]
    fn test_decode_start_in_payload() {
        assert_eq!(
            decode_bytes(&[0xE0, 0x01, 0x03, 0x10, 0xE0, 0x01, 0x02, 0x03]),
            Err(FrameError::InvalidFrame(InvalidFrameKind::UnexpectedStart))
        );
    }

    #[test]
    fn test_decode_start_as_address() {
        assert_eq!(
            decode_bytes(&[0xE0, 0xE0, 0x01, 0x02, 0x03]),
            Err(FrameError::InvalidFrame(InvalidFrameKind::UnexpectedStart))
        );
    }

    #[test]
    fn test_decode_start_as_checksum() {
        assert_eq!(
            decode_bytes(&[0xE0, 0x01, 0x02, 0x10, 0xE0]),
            Err(FrameError::InvalidFrame(InvalidFrameKind::UnexpectedStart))
        );
    }

    #[test]
    fn test_decode_start_after_escape_is_data() {
        // D0 E0 carries 0xE1; checksum 0x01 + 0x02 + 0xE1 = 0xE4
        let frame = decode_bytes(&[0xE0, 0x01, 0x02, 0xD0, 0xE0, 0xE4]).unwrap();
        assert_eq!(frame.address, 0x01);
        assert_eq!(frame.payload.as_slice(), &[0xE1]);
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let mut encoded = encode(0x01, &[0x10]).unwrap();
        let last_idx = encoded.len() - 1;
        encoded[last_idx] ^= 0x01;

        assert_eq!(
            decode_bytes(&encoded),
            Err(FrameError::Checksum {
                expected: 0x13,
                received: 0x12
            })
        );
    }

    #[test]
    fn test_decode_truncated_payload_times_out() {
        let encoded = encode(0x01, &[1, 2, 3, 4]).unwrap();
        assert_eq!(decode_bytes(&encoded[..5]), Err(FrameError::Timeout));
    }

    #[test]
    fn test_parser_resync_after_garbage() {
        let encoded = encode(0x01, &[0x01, 0x01]).unwrap();

        let mut data = Vec::<u8, 32>::new();
        data.extend_from_slice(&[0x00, 0xFF, 0xD0, 0x34]).unwrap();
        data.extend_from_slice(&encoded).unwrap();

        let mut parser = FrameParser::new();
        let parsed = parser.feed_bytes(&data).unwrap().unwrap();

        assert_eq!(parsed.address, 0x01);
        assert_eq!(parsed.payload.as_slice(), &[0x01, 0x01]);
    }

    #[test]
    fn test_parser_hunts_again_after_error() {
        let mut parser = FrameParser::new();
        let result = parser.feed_bytes(&[0xE0, 0x01, 0x00]);
        assert_eq!(
            result,
            Err(FrameError::InvalidFrame(InvalidFrameKind::BadLength))
        );
        assert!(parser.is_hunting());

        let encoded = encode(0x02, &[0x05]).unwrap();
        let parsed = parser.feed_bytes(&encoded).unwrap().unwrap();
        assert_eq!(parsed.address, 0x02);
    }

    #[test]
    fn test_parser_incomplete() {
        let encoded = encode(0x01, &[0x10, 0x20]).unwrap();
        let mut parser = FrameParser::new();
        assert_eq!(parser.feed_bytes(&encoded[..3]), Ok(None));
        assert!(!parser.is_hunting());
        assert!(parser.feed_bytes(&encoded[3..]).unwrap().is_some());
    }

    fn payload_strategy() -> impl Strategy<Value = std::vec::Vec<u8>> {
        // Bias towards the reserved markers so escaping is exercised often
        let byte = prop_oneof![
            1 => Just(STX),
            1 => Just(ESC),
            4 => any::<u8>(),
        ];
        prop::collection::vec(byte, 0..=MAX_PAYLOAD_SIZE)
    }

    proptest! {
        #[test]
        fn prop_roundtrip(address in any::<u8>(), payload in payload_strategy()) {
            let encoded = encode(address, &payload).unwrap();
            let frame = decode_bytes(&encoded).unwrap();
            prop_assert_eq!(frame.address, address);
            prop_assert_eq!(frame.payload.as_slice(), payload.as_slice());
        }

        #[test]
        fn prop_start_marker_only_at_head(address in any::<u8>(), payload in payload_strategy()) {
            let encoded = encode(address, &payload).unwrap();
            prop_assert_eq!(encoded[0], STX);
            prop_assert!(!encoded[1..].contains(&STX));

            let mut iter = encoded[1..].iter();
            while let Some(&raw) = iter.next() {
                if raw == ESC {
                    let next = iter.next().copied();
                    prop_assert!(next == Some(STX - 1) || next == Some(ESC - 1));
                }
            }
        }

        #[test]
        fn prop_noise_before_frame_is_ignored(
            noise in prop::collection::vec(any::<u8>().prop_filter("not STX", |b| *b != STX), 0..64),
            address in any::<u8>(),
            payload in payload_strategy(),
        ) {
            let mut stream = noise.clone();
            stream.extend_from_slice(&encode(address, &payload).unwrap());
            let frame = decode_bytes(&stream).unwrap();
            prop_assert_eq!(frame.address, address);
            prop_assert_eq!(frame.payload.as_slice(), payload.as_slice());
        }

        #[test]
        fn prop_truncated_stream_times_out(
            address in any::<u8>(),
            payload in payload_strategy(),
            cut in any::<prop::sample::Index>(),
        ) {
            let encoded = encode(address, &payload).unwrap();
            let len = cut.index(encoded.len());
            prop_assert_eq!(decode_bytes(&encoded[..len]), Err(FrameError::Timeout));
        }

        #[test]
        fn prop_single_bit_flip_fails_checksum(
            address in any::<u8>(),
            payload in prop::collection::vec(any::<u8>(), 1..=MAX_PAYLOAD_SIZE),
            pick in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let encoded = encode(address, &payload).unwrap();

            // Raw positions holding an unescaped payload or checksum byte
            let length = payload.len() as u8 + 1;
            let sum = checksum(address, length, &payload);
            let mut candidates = std::vec::Vec::new();
            let mut pos = 1 + escape(address).as_bytes().len() + escape(length).as_bytes().len();
            for &byte in payload.iter().chain(core::iter::once(&sum)) {
                let width = escape(byte).as_bytes().len();
                if width == 1 {
                    candidates.push(pos);
                }
                pos += width;
            }
            prop_assume!(!candidates.is_empty());

            let target = candidates[pick.index(candidates.len())];
            let flipped = encoded[target] ^ (1 << bit);
            // A flip into a marker changes framing rather than data
            prop_assume!(flipped != STX && flipped != ESC);

            let mut corrupted = encoded.clone();
            corrupted[target] = flipped;
            prop_assert!(
                matches!(decode_bytes(&corrupted), Err(FrameError::Checksum { .. })),
                "bit flip at {} went undetected",
                target
            );
        }
    }
}
