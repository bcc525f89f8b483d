// SPDX-License-Identifier: Apache-2.0

//! Bit-exact wire protocol for the bootstrap pull/push/frontier-exchange traffic. Block payloads
//! themselves are BCS-encoded and treated as opaque outside hash computation, giving the
//! fixed-size-per-kind network-byte-order framing without a hand-rolled binary layout for every
//! block kind.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use logos_types::{EpochBlock, Hash, MicroBlock, RequestBlock, Tip};

use crate::error::{ConsensusError, ConsensusResult};

pub const MAGIC: [u8; 2] = *b"LG";
pub const HEADER_LEN: usize = 8;

/// Message types used by the core. Selects the payload that follows the header.
pub mod message_type {
    pub const BULK_PULL: u8 = 6;
    pub const BULK_PUSH: u8 = 7;
    pub const FRONTIER_REQ: u8 = 8;
    pub const BULK_PULL_BLOCKS: u8 = 9;
}

/// Type byte prefixing each frame of a bulk-pull response stream. `BATCH_BLOCK` is the wire name
/// for a Request Block — the protocol predates the RB/MB/EB vocabulary and never renamed the
/// tag (the `b_start`/`b_end`/`batch_block_tip` field names in `BulkPull` carry the same fossil).
/// `NOT_A_BLOCK` is pinned to 6; the others are this crate's own numbering, left unspecified
/// beyond the framing shape.
pub mod stream_block_type {
    pub const EPOCH_BLOCK: u8 = 1;
    pub const MICRO_BLOCK: u8 = 2;
    pub const BATCH_BLOCK: u8 = 3;
    pub const NOT_A_BLOCK: u8 = 6;
}

/// Common 8-byte header on every bootstrap message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub version_max: u8,
    pub version_using: u8,
    pub version_min: u8,
    pub message_type: u8,
    pub extensions: u16,
}

pub const CURRENT_VERSION: u8 = 1;

impl Header {
    pub fn new(message_type: u8) -> Self {
        Self {
            version_max: CURRENT_VERSION,
            version_using: CURRENT_VERSION,
            version_min: CURRENT_VERSION,
            message_type,
            extensions: 0,
        }
    }

    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..2].copy_from_slice(&MAGIC);
        out[2] = self.version_max;
        out[3] = self.version_using;
        out[4] = self.version_min;
        out[5] = self.message_type;
        out[6..8].copy_from_slice(&self.extensions.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: [u8; HEADER_LEN]) -> ConsensusResult<Self> {
        if bytes[0..2] != MAGIC {
            return Err(ConsensusError::MalformedFrame("bad magic".into()));
        }
        Ok(Self {
            version_max: bytes[2],
            version_using: bytes[3],
            version_min: bytes[4],
            message_type: bytes[5],
            extensions: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }

    pub async fn write<W: AsyncWrite + Unpin>(self, w: &mut W) -> ConsensusResult<()> {
        w.write_all(&self.to_bytes())
            .await
            .map_err(|_| ConsensusError::ConnectionClosed)
    }

    pub async fn read<R: AsyncRead + Unpin>(r: &mut R) -> ConsensusResult<Self> {
        let mut buf = [0u8; HEADER_LEN];
        r.read_exact(&mut buf)
            .await
            .map_err(|_| ConsensusError::ConnectionClosed)?;
        Self::from_bytes(buf)
    }
}

fn read_hash<R: std::io::Read>(r: &mut R) -> std::io::Result<Hash> {
    let mut buf = [0u8; 32];
    r.read_exact(&mut buf)?;
    Ok(Hash(buf))
}

/// `bulk_pull` payload. `delegate_id` is signed on the wire because the protocol uses -1 to mean
/// "all delegates"; this crate only ever sends a concrete id but keeps the field's wire width so
/// server and client agree on payload size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BulkPullPayload {
    pub start: [u8; 32],
    pub end: Hash,
    pub timestamp_start: u64,
    pub timestamp_end: u64,
    pub delegate_id: i32,
    pub seq_start: u32,
    pub seq_end: u32,
    pub e_start: Hash,
    pub e_end: Hash,
    pub m_start: Hash,
    pub m_end: Hash,
    pub b_start: Hash,
    pub b_end: Hash,
}

pub const BULK_PULL_PAYLOAD_LEN: usize = 32 + 32 + 8 + 8 + 4 + 4 + 4 + 32 * 6;

impl BulkPullPayload {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(BULK_PULL_PAYLOAD_LEN);
        out.extend_from_slice(&self.start);
        out.extend_from_slice(self.end.as_bytes());
        out.extend_from_slice(&self.timestamp_start.to_le_bytes());
        out.extend_from_slice(&self.timestamp_end.to_le_bytes());
        out.extend_from_slice(&self.delegate_id.to_le_bytes());
        out.extend_from_slice(&self.seq_start.to_le_bytes());
        out.extend_from_slice(&self.seq_end.to_le_bytes());
        for h in [
            &self.e_start,
            &self.e_end,
            &self.m_start,
            &self.m_end,
            &self.b_start,
            &self.b_end,
        ] {
            out.extend_from_slice(h.as_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> ConsensusResult<Self> {
        if bytes.len() != BULK_PULL_PAYLOAD_LEN {
            return Err(ConsensusError::MalformedFrame(format!(
                "bulk_pull payload: expected {BULK_PULL_PAYLOAD_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut cur = std::io::Cursor::new(bytes);
        let mut start = [0u8; 32];
        std::io::Read::read_exact(&mut cur, &mut start)
            .map_err(|e| ConsensusError::MalformedFrame(e.to_string()))?;
        let read = |cur: &mut std::io::Cursor<&[u8]>| -> ConsensusResult<Hash> {
            read_hash(cur).map_err(|e| ConsensusError::MalformedFrame(e.to_string()))
        };
        let end = read(&mut cur)?;
        let mut u64buf = [0u8; 8];
        std::io::Read::read_exact(&mut cur, &mut u64buf)
            .map_err(|e| ConsensusError::MalformedFrame(e.to_string()))?;
        let timestamp_start = u64::from_le_bytes(u64buf);
        std::io::Read::read_exact(&mut cur, &mut u64buf)
            .map_err(|e| ConsensusError::MalformedFrame(e.to_string()))?;
        let timestamp_end = u64::from_le_bytes(u64buf);
        let mut i32buf = [0u8; 4];
        std::io::Read::read_exact(&mut cur, &mut i32buf)
            .map_err(|e| ConsensusError::MalformedFrame(e.to_string()))?;
        let delegate_id = i32::from_le_bytes(i32buf);
        let mut u32buf = [0u8; 4];
        std::io::Read::read_exact(&mut cur, &mut u32buf)
            .map_err(|e| ConsensusError::MalformedFrame(e.to_string()))?;
        let seq_start = u32::from_le_bytes(u32buf);
        std::io::Read::read_exact(&mut cur, &mut u32buf)
            .map_err(|e| ConsensusError::MalformedFrame(e.to_string()))?;
        let seq_end = u32::from_le_bytes(u32buf);
        let e_start = read(&mut cur)?;
        let e_end = read(&mut cur)?;
        let m_start = read(&mut cur)?;
        let m_end = read(&mut cur)?;
        let b_start = read(&mut cur)?;
        let b_end = read(&mut cur)?;
        Ok(Self {
            start,
            end,
            timestamp_start,
            timestamp_end,
            delegate_id,
            seq_start,
            seq_end,
            e_start,
            e_end,
            m_start,
            m_end,
            b_start,
            b_end,
        })
    }

    pub async fn write<W: AsyncWrite + Unpin>(&self, w: &mut W) -> ConsensusResult<()> {
        w.write_all(&self.to_bytes())
            .await
            .map_err(|_| ConsensusError::ConnectionClosed)
    }

    pub async fn read<R: AsyncRead + Unpin>(r: &mut R) -> ConsensusResult<Self> {
        let mut buf = vec![0u8; BULK_PULL_PAYLOAD_LEN];
        r.read_exact(&mut buf)
            .await
            .map_err(|_| ConsensusError::ConnectionClosed)?;
        Self::from_bytes(&buf)
    }

    /// The non-zero tip among `e_end`, `m_end`, `b_end`, epoch taking precedence, then micro,
    /// then batch — used by both sides to decide when a stream has legitimately run to
    /// completion.
    pub fn end_transmission(&self) -> Hash {
        if !self.e_end.is_zero() {
            self.e_end
        } else if !self.m_end.is_zero() {
            self.m_end
        } else {
            self.b_end
        }
    }
}

/// `frontier_req` payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrontierReqPayload {
    pub start: [u8; 32],
    pub age: u32,
    pub count: u32,
    pub nr_delegate: u32,
}

pub const FRONTIER_REQ_PAYLOAD_LEN: usize = 32 + 4 + 4 + 4;

impl FrontierReqPayload {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FRONTIER_REQ_PAYLOAD_LEN);
        out.extend_from_slice(&self.start);
        out.extend_from_slice(&self.age.to_le_bytes());
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&self.nr_delegate.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> ConsensusResult<Self> {
        if bytes.len() != FRONTIER_REQ_PAYLOAD_LEN {
            return Err(ConsensusError::MalformedFrame(format!(
                "frontier_req payload: expected {FRONTIER_REQ_PAYLOAD_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut start = [0u8; 32];
        start.copy_from_slice(&bytes[0..32]);
        let age = u32::from_le_bytes(bytes[32..36].try_into().unwrap());
        let count = u32::from_le_bytes(bytes[36..40].try_into().unwrap());
        let nr_delegate = u32::from_le_bytes(bytes[40..44].try_into().unwrap());
        Ok(Self {
            start,
            age,
            count,
            nr_delegate,
        })
    }

    pub async fn write<W: AsyncWrite + Unpin>(&self, w: &mut W) -> ConsensusResult<()> {
        w.write_all(&self.to_bytes())
            .await
            .map_err(|_| ConsensusError::ConnectionClosed)
    }

    pub async fn read<R: AsyncRead + Unpin>(r: &mut R) -> ConsensusResult<Self> {
        let mut buf = vec![0u8; FRONTIER_REQ_PAYLOAD_LEN];
        r.read_exact(&mut buf)
            .await
            .map_err(|_| ConsensusError::ConnectionClosed)?;
        Self::from_bytes(&buf)
    }
}

/// One `frontier_response` frame — the server sends exactly `nr_delegate` of these per
/// `frontier_req`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrontierResponse {
    pub timestamp_start: u64,
    pub timestamp_end: u64,
    pub delegate_id: i32,
    pub epoch_tip: Hash,
    pub micro_tip: Hash,
    pub batch_block_tip: Hash,
    pub epoch_block_seq_number: u32,
    pub micro_block_seq_number: u32,
    pub batch_block_seq_number: u32,
}

pub const FRONTIER_RESPONSE_LEN: usize = 8 + 8 + 4 + 32 + 32 + 32 + 4 + 4 + 4;

impl FrontierResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FRONTIER_RESPONSE_LEN);
        out.extend_from_slice(&self.timestamp_start.to_le_bytes());
        out.extend_from_slice(&self.timestamp_end.to_le_bytes());
        out.extend_from_slice(&self.delegate_id.to_le_bytes());
        out.extend_from_slice(self.epoch_tip.as_bytes());
        out.extend_from_slice(self.micro_tip.as_bytes());
        out.extend_from_slice(self.batch_block_tip.as_bytes());
        out.extend_from_slice(&self.epoch_block_seq_number.to_le_bytes());
        out.extend_from_slice(&self.micro_block_seq_number.to_le_bytes());
        out.extend_from_slice(&self.batch_block_seq_number.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> ConsensusResult<Self> {
        if bytes.len() != FRONTIER_RESPONSE_LEN {
            return Err(ConsensusError::MalformedFrame(format!(
                "frontier_response: expected {FRONTIER_RESPONSE_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let ts_start = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let ts_end = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
        let delegate_id = i32::from_le_bytes(bytes[16..20].try_into().unwrap());
        let mut epoch_tip = [0u8; 32];
        epoch_tip.copy_from_slice(&bytes[20..52]);
        let mut micro_tip = [0u8; 32];
        micro_tip.copy_from_slice(&bytes[52..84]);
        let mut batch_tip = [0u8; 32];
        batch_tip.copy_from_slice(&bytes[84..116]);
        let epoch_seq = u32::from_le_bytes(bytes[116..120].try_into().unwrap());
        let micro_seq = u32::from_le_bytes(bytes[120..124].try_into().unwrap());
        let batch_seq = u32::from_le_bytes(bytes[124..128].try_into().unwrap());
        Ok(Self {
            timestamp_start: ts_start,
            timestamp_end: ts_end,
            delegate_id,
            epoch_tip: Hash(epoch_tip),
            micro_tip: Hash(micro_tip),
            batch_block_tip: Hash(batch_tip),
            epoch_block_seq_number: epoch_seq,
            micro_block_seq_number: micro_seq,
            batch_block_seq_number: batch_seq,
        })
    }

    pub async fn write<W: AsyncWrite + Unpin>(&self, w: &mut W) -> ConsensusResult<()> {
        w.write_all(&self.to_bytes())
            .await
            .map_err(|_| ConsensusError::ConnectionClosed)
    }

    pub async fn read<R: AsyncRead + Unpin>(r: &mut R) -> ConsensusResult<Self> {
        let mut buf = vec![0u8; FRONTIER_RESPONSE_LEN];
        r.read_exact(&mut buf)
            .await
            .map_err(|_| ConsensusError::ConnectionClosed)?;
        Self::from_bytes(&buf)
    }
}

/// One frame of a bulk-pull response stream: `{type_byte, payload}`, the payload BCS-encoded
/// and opaque to everything but hash computation, terminated by a payload-less `NotABlock`.
#[derive(Clone, Debug)]
pub enum PullFrame {
    Epoch(EpochBlock),
    Micro(MicroBlock),
    Batch(RequestBlock),
    NotABlock,
}

impl PullFrame {
    pub async fn write<W: AsyncWrite + Unpin>(&self, w: &mut W) -> ConsensusResult<()> {
        match self {
            PullFrame::Epoch(b) => {
                write_frame(w, stream_block_type::EPOCH_BLOCK, b).await
            }
            PullFrame::Micro(b) => {
                write_frame(w, stream_block_type::MICRO_BLOCK, b).await
            }
            PullFrame::Batch(b) => {
                write_frame(w, stream_block_type::BATCH_BLOCK, b).await
            }
            PullFrame::NotABlock => {
                w.write_u8(stream_block_type::NOT_A_BLOCK)
                    .await
                    .map_err(|_| ConsensusError::ConnectionClosed)
            }
        }
    }

    pub async fn read<R: AsyncRead + Unpin>(r: &mut R) -> ConsensusResult<Self> {
        let type_byte = r
            .read_u8()
            .await
            .map_err(|_| ConsensusError::ConnectionClosed)?;
        match type_byte {
            stream_block_type::EPOCH_BLOCK => Ok(PullFrame::Epoch(read_bcs(r).await?)),
            stream_block_type::MICRO_BLOCK => Ok(PullFrame::Micro(read_bcs(r).await?)),
            stream_block_type::BATCH_BLOCK => Ok(PullFrame::Batch(read_bcs(r).await?)),
            stream_block_type::NOT_A_BLOCK => Ok(PullFrame::NotABlock),
            other => Err(ConsensusError::UnexpectedFrameType(other)),
        }
    }
}

async fn write_frame<W: AsyncWrite + Unpin, T: serde::Serialize>(
    w: &mut W,
    type_byte: u8,
    block: &T,
) -> ConsensusResult<()> {
    let payload = bcs::to_bytes(block)
        .map_err(|e| ConsensusError::MalformedFrame(e.to_string()))?;
    w.write_u8(type_byte)
        .await
        .map_err(|_| ConsensusError::ConnectionClosed)?;
    w.write_u32_le(payload.len() as u32)
        .await
        .map_err(|_| ConsensusError::ConnectionClosed)?;
    w.write_all(&payload)
        .await
        .map_err(|_| ConsensusError::ConnectionClosed)
}

async fn read_bcs<R: AsyncRead + Unpin, T: serde::de::DeserializeOwned>(
    r: &mut R,
) -> ConsensusResult<T> {
    let len = r
        .read_u32_le()
        .await
        .map_err(|_| ConsensusError::ConnectionClosed)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)
        .await
        .map_err(|_| ConsensusError::ConnectionClosed)?;
    bcs::from_bytes(&buf).map_err(|e| ConsensusError::MalformedFrame(e.to_string()))
}

/// Whether the server should serve (epoch, micro, batch) ranges rooted at a zero-or-equal
/// `(start, end)` pair: this is the "walk `previous` back to the chain root" case, signaled by
/// the client sending identical non-zero start/end tips.
pub fn is_whole_chain_request(start: Hash, end: Hash) -> bool {
    start == end && !start.is_zero()
}

/// Derives the `Tip` recorded at a given epoch/sequence for wire messages that only carry a
/// digest — used by the server when it needs to compare against a stored tip record.
pub fn tip_or_none(epoch_number: u32, sequence: u32, digest: Hash) -> Tip {
    if digest.is_zero() {
        Tip::NONE
    } else {
        Tip::new(epoch_number, sequence, digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = Header::new(message_type::FRONTIER_REQ);
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), HEADER_LEN);
        let decoded = Header::from_bytes(bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn header_rejects_bad_magic() {
        let mut bytes = Header::new(message_type::BULK_PULL).to_bytes();
        bytes[0] = b'X';
        assert!(Header::from_bytes(bytes).is_err());
    }

    #[test]
    fn bulk_pull_payload_round_trips() {
        let payload = BulkPullPayload {
            start: [1u8; 32],
            end: Hash([2u8; 32]),
            timestamp_start: 10,
            timestamp_end: 20,
            delegate_id: 5,
            seq_start: 1,
            seq_end: 2,
            e_start: Hash::ZERO,
            e_end: Hash::ZERO,
            m_start: Hash::ZERO,
            m_end: Hash([9u8; 32]),
            b_start: Hash::ZERO,
            b_end: Hash::ZERO,
        };
        let bytes = payload.to_bytes();
        assert_eq!(bytes.len(), BULK_PULL_PAYLOAD_LEN);
        assert_eq!(BulkPullPayload::from_bytes(&bytes).unwrap(), payload);
        assert_eq!(payload.end_transmission(), Hash([9u8; 32]));
    }

    #[test]
    fn end_transmission_precedence_is_epoch_then_micro_then_batch() {
        let mut payload = BulkPullPayload {
            start: [0u8; 32],
            end: Hash::ZERO,
            timestamp_start: 0,
            timestamp_end: 0,
            delegate_id: 0,
            seq_start: 0,
            seq_end: 0,
            e_start: Hash::ZERO,
            e_end: Hash::ZERO,
            m_start: Hash::ZERO,
            m_end: Hash::ZERO,
            b_start: Hash::ZERO,
            b_end: Hash([1u8; 32]),
        };
        assert_eq!(payload.end_transmission(), Hash([1u8; 32]));
        payload.m_end = Hash([2u8; 32]);
        assert_eq!(payload.end_transmission(), Hash([2u8; 32]));
        payload.e_end = Hash([3u8; 32]);
        assert_eq!(payload.end_transmission(), Hash([3u8; 32]));
    }

    #[tokio::test]
    async fn pull_frame_round_trips_over_a_duplex_pipe() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let block = RequestBlock {
            epoch_number: 1,
            primary_delegate: 0,
            sequence: 0,
            previous: Hash::ZERO,
            requests: vec![],
        };
        let expected_hash = block.hash();
        let frame = PullFrame::Batch(block);
        frame.write(&mut server).await.unwrap();
        PullFrame::NotABlock.write(&mut server).await.unwrap();
        drop(server);

        match PullFrame::read(&mut client).await.unwrap() {
            PullFrame::Batch(b) => assert_eq!(b.hash(), expected_hash),
            other => panic!("unexpected frame {other:?}"),
        }
        assert!(matches!(
            PullFrame::read(&mut client).await.unwrap(),
            PullFrame::NotABlock
        ));
    }
}
