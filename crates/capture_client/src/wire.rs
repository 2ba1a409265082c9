//! RT protocol wire framing
//!
//! Packets are a little-endian `[size u32][type u32]` header followed by the
//! payload; `size` includes the 8-byte header. Command, XML and error
//! payloads are NUL-terminated ASCII, events are a single byte, data frames
//! carry per-component blocks with their own size/type headers.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use contracts::{ContractError, Sample, SampleBatch, SessionEvent};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Wire header length in bytes
pub const HEADER_LEN: usize = 8;

/// Upper bound accepted for one packet; anything larger is a framing desync
pub const MAX_PACKET_LEN: usize = 16 * 1024 * 1024;

/// Analog component id inside a data frame
pub const COMPONENT_ANALOG: u32 = 5;

/// Wire packet types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Error,
    Command,
    Xml,
    Data,
    NoMoreData,
    Event,
}

impl PacketType {
    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Error),
            1 => Some(Self::Command),
            2 => Some(Self::Xml),
            3 => Some(Self::Data),
            4 => Some(Self::NoMoreData),
            6 => Some(Self::Event),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            Self::Error => 0,
            Self::Command => 1,
            Self::Xml => 2,
            Self::Data => 3,
            Self::NoMoreData => 4,
            Self::Event => 6,
        }
    }
}

/// Encode a command or XML packet
pub fn encode_str(kind: PacketType, text: &str) -> Bytes {
    let payload = text.as_bytes();
    let size = HEADER_LEN + payload.len() + 1;
    let mut buf = BytesMut::with_capacity(size);
    buf.put_u32_le(size as u32);
    buf.put_u32_le(kind.as_u32());
    buf.put_slice(payload);
    buf.put_u8(0);
    buf.freeze()
}

/// Decode a NUL-terminated ASCII payload
pub fn decode_str(payload: &[u8]) -> String {
    let end = payload
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(payload.len());
    String::from_utf8_lossy(&payload[..end]).trim().to_string()
}

/// Decode an event packet payload
///
/// Returns `None` for event codes outside this system's vocabulary.
pub fn decode_event(payload: &[u8]) -> Option<SessionEvent> {
    match payload.first()? {
        1 => Some(SessionEvent::Connected),
        2 => Some(SessionEvent::ConnectionClosed),
        3 => Some(SessionEvent::CaptureStarted),
        4 => Some(SessionEvent::CaptureStopped),
        5 => Some(SessionEvent::CalibrationStarted),
        6 => Some(SessionEvent::CalibrationStopped),
        9 => Some(SessionEvent::WaitingForTrigger),
        12 => Some(SessionEvent::CaptureSaved),
        _ => None,
    }
}

/// Read one packet from the wire
///
/// Returns the raw packet type and payload; callers map unknown types.
pub async fn read_packet<R>(reader: &mut R) -> Result<(u32, Bytes), ContractError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;

    let size = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let kind = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    if !(HEADER_LEN..=MAX_PACKET_LEN).contains(&size) {
        return Err(ContractError::stream(format!(
            "implausible packet size {size}"
        )));
    }

    let mut payload = vec![0u8; size - HEADER_LEN];
    reader.read_exact(&mut payload).await?;
    Ok((kind, Bytes::from(payload)))
}

/// Parse the analog component of a data frame
///
/// Returns `Ok(None)` when the frame carries no analog component. Sample
/// data is channel-major on the wire and transposed to sample-major here so
/// downstream consumers see arrival-ordered instants.
pub fn decode_analog_frame(payload: &[u8]) -> Result<Option<SampleBatch>, ContractError> {
    let mut buf = payload;
    if buf.remaining() < 16 {
        return Err(ContractError::stream("data frame shorter than its header"));
    }

    let timestamp_us = buf.get_u64_le();
    let frame_id = buf.get_u32_le();
    let component_count = buf.get_u32_le();

    let mut rows: Option<Vec<Vec<f64>>> = None;
    for _ in 0..component_count {
        if buf.remaining() < 8 {
            return Err(ContractError::stream("truncated component header"));
        }
        let size = buf.get_u32_le() as usize;
        let kind = buf.get_u32_le();
        let body_len = size.checked_sub(8).ok_or_else(|| {
            ContractError::stream(format!("component size {size} below header length"))
        })?;
        if body_len > buf.remaining() {
            return Err(ContractError::stream("truncated component body"));
        }

        if kind == COMPONENT_ANALOG {
            rows = Some(decode_analog_component(&buf.chunk()[..body_len])?);
        }
        buf.advance(body_len);
    }

    Ok(rows.map(|rows| {
        SampleBatch::new(
            timestamp_us as f64 / 1e6,
            Some(frame_id as u64),
            rows.into_iter().map(Sample::new).collect(),
        )
    }))
}

fn decode_analog_component(mut body: &[u8]) -> Result<Vec<Vec<f64>>, ContractError> {
    if body.remaining() < 4 {
        return Err(ContractError::stream("truncated analog component"));
    }
    let device_count = body.get_u32_le();

    // Channels concatenate across devices in declaration order
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for _ in 0..device_count {
        if body.remaining() < 12 {
            return Err(ContractError::stream("truncated analog device header"));
        }
        let _device_id = body.get_u32_le();
        let channel_count = body.get_u32_le() as usize;
        let sample_count = body.get_u32_le() as usize;

        let need = channel_count
            .checked_mul(sample_count)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| ContractError::stream("analog block size overflow"))?;
        if body.remaining() < need {
            return Err(ContractError::stream("truncated analog sample block"));
        }

        let mut block = vec![0f64; channel_count * sample_count];
        for value in block.iter_mut() {
            *value = body.get_f32_le() as f64;
        }

        while rows.len() < sample_count {
            rows.push(Vec::new());
        }
        for c in 0..channel_count {
            for (s, row) in rows.iter_mut().enumerate().take(sample_count) {
                row.push(block[c * sample_count + s]);
            }
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an analog data-frame payload the way the server frames it
    fn frame_payload(timestamp_us: u64, frame_id: u32, channels: &[Vec<f32>]) -> Vec<u8> {
        let sample_count = channels.first().map(|c| c.len()).unwrap_or(0);
        let mut component = BytesMut::new();
        component.put_u32_le(1); // device count
        component.put_u32_le(7); // device id
        component.put_u32_le(channels.len() as u32);
        component.put_u32_le(sample_count as u32);
        for channel in channels {
            for value in channel {
                component.put_f32_le(*value);
            }
        }

        let mut payload = BytesMut::new();
        payload.put_u64_le(timestamp_us);
        payload.put_u32_le(frame_id);
        payload.put_u32_le(1); // component count
        payload.put_u32_le((component.len() + 8) as u32);
        payload.put_u32_le(COMPONENT_ANALOG);
        payload.put_slice(&component);
        payload.to_vec()
    }

    #[test]
    fn test_encode_str_framing() {
        let packet = encode_str(PacketType::Command, "Start");
        assert_eq!(packet.len(), 8 + 5 + 1);
        assert_eq!(&packet[0..4], &14u32.to_le_bytes());
        assert_eq!(&packet[4..8], &1u32.to_le_bytes());
        assert_eq!(packet[13], 0);
        assert_eq!(decode_str(&packet[8..]), "Start");
    }

    #[test]
    fn test_decode_event_codes() {
        assert_eq!(decode_event(&[3]), Some(SessionEvent::CaptureStarted));
        assert_eq!(decode_event(&[4]), Some(SessionEvent::CaptureStopped));
        assert_eq!(decode_event(&[12]), Some(SessionEvent::CaptureSaved));
        assert_eq!(decode_event(&[200]), None);
        assert_eq!(decode_event(&[]), None);
    }

    #[test]
    fn test_decode_analog_frame_transposes() {
        // Two channels, three samples each, channel-major on the wire
        let payload = frame_payload(
            1_500_000,
            42,
            &[vec![1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0]],
        );
        let batch = decode_analog_frame(&payload).unwrap().unwrap();

        assert_eq!(batch.timestamp, 1.5);
        assert_eq!(batch.frame_id, Some(42));
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.samples()[0].channel(0), Some(1.0));
        assert_eq!(batch.samples()[0].channel(1), Some(10.0));
        assert_eq!(batch.samples()[2].channel(1), Some(30.0));
    }

    #[test]
    fn test_decode_frame_without_analog_component() {
        let mut payload = BytesMut::new();
        payload.put_u64_le(0);
        payload.put_u32_le(1);
        payload.put_u32_le(0); // no components
        let result = decode_analog_frame(&payload).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_truncated_frame_is_stream_fault() {
        let err = decode_analog_frame(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, ContractError::Stream { .. }));
    }

    #[tokio::test]
    async fn test_read_packet_round_trip() {
        let packet = encode_str(PacketType::Command, "Version 1.22");
        let mut cursor = std::io::Cursor::new(packet.to_vec());
        let (kind, payload) = read_packet(&mut cursor).await.unwrap();
        assert_eq!(PacketType::from_u32(kind), Some(PacketType::Command));
        assert_eq!(decode_str(&payload), "Version 1.22");
    }

    #[tokio::test]
    async fn test_read_packet_rejects_bad_size() {
        let mut bad = vec![];
        bad.extend_from_slice(&3u32.to_le_bytes()); // below header length
        bad.extend_from_slice(&1u32.to_le_bytes());
        let mut cursor = std::io::Cursor::new(bad);
        assert!(read_packet(&mut cursor).await.is_err());
    }
}
