use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use txseq_types::NodeId;

use crate::error::{Result, SequenceError};

/// Leading bytes of every encoded snapshot.
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"TXSQ";

/// Snapshot format version written by [`SequenceStatus::store`].
pub const SNAPSHOT_VERSION: u8 = 1;

/// Magic + version + owner length.
const PREFIX_SIZE: usize = 4 + 1 + 2;
/// Slot count field.
const COUNT_SIZE: usize = 4;
/// CRC32 trailer.
const CRC_SIZE: usize = 4;
/// Encoded width of one slot.
const SLOT_SIZE: usize = 8;

/// Immutable snapshot of a sequence space's confirmed state.
///
/// Holds, for every slot of the space owned by `owner`, the highest sequence
/// whose outcome has been recorded. Produced by
/// [`SequenceManager::current_status`](crate::SequenceManager::current_status)
/// and consumed by `check_self_status` / `fill` on another manager, or
/// encoded with [`store`](Self::store) for transport and persistence.
///
/// Encoded format (big-endian):
/// ```text
/// [4 bytes: magic "TXSQ"]
/// [1 byte:  format version]
/// [2 bytes: owner length L (u16)]
/// [L bytes: owner name, UTF-8]
/// [4 bytes: slot count N (u32)]
/// [N * 8 bytes: confirmed sequence per slot (u64), position order]
/// [4 bytes: CRC32 of all preceding bytes]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStatus")]
pub struct SequenceStatus {
    owner: NodeId,
    slots: Vec<u64>,
}

#[derive(Deserialize)]
struct RawStatus {
    owner: NodeId,
    slots: Vec<u64>,
}

impl TryFrom<RawStatus> for SequenceStatus {
    type Error = SequenceError;

    fn try_from(raw: RawStatus) -> Result<Self> {
        Self::new(raw.owner, raw.slots)
    }
}

impl SequenceStatus {
    /// Build a snapshot from per-slot confirmed sequences.
    pub fn new(owner: NodeId, slots: Vec<u64>) -> Result<Self> {
        if slots.is_empty() || slots.len() > u32::MAX as usize {
            return Err(SequenceError::InvalidCapacity(slots.len()));
        }
        Ok(Self { owner, slots })
    }

    /// Build from parts already validated by the caller.
    pub(crate) fn from_parts(owner: NodeId, slots: Vec<u64>) -> Self {
        Self { owner, slots }
    }

    /// An all-zero snapshot: nothing confirmed yet.
    pub fn empty(owner: NodeId, capacity: usize) -> Result<Self> {
        Self::new(owner, vec![0; capacity])
    }

    /// Identity of the sequence space this snapshot describes.
    pub fn owner(&self) -> &NodeId {
        &self.owner
    }

    /// Confirmed sequence per slot, in position order.
    pub fn slots(&self) -> &[u64] {
        &self.slots
    }

    /// Number of slots in the described space.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Confirmed sequence at one slot, or `None` if out of range.
    pub fn confirmed_at(&self, position: u32) -> Option<u64> {
        self.slots.get(position as usize).copied()
    }

    /// Total number of confirmed transactions across all slots.
    pub fn total_confirmed(&self) -> u64 {
        self.slots.iter().fold(0u64, |acc, s| acc.saturating_add(*s))
    }

    /// Encode into the fixed binary layout.
    pub fn store(&self) -> Vec<u8> {
        let owner = self.owner.as_bytes();
        let mut buf = BytesMut::with_capacity(
            PREFIX_SIZE + owner.len() + COUNT_SIZE + self.slots.len() * SLOT_SIZE + CRC_SIZE,
        );
        buf.put_slice(&SNAPSHOT_MAGIC);
        buf.put_u8(SNAPSHOT_VERSION);
        // NodeId caps names at 255 bytes and slot counts are capped at
        // u32::MAX by construction, so both casts are lossless.
        buf.put_u16(owner.len() as u16);
        buf.put_slice(owner);
        buf.put_u32(self.slots.len() as u32);
        for slot in &self.slots {
            buf.put_u64(*slot);
        }
        let crc = crc32fast::hash(&buf);
        buf.put_u32(crc);
        buf.to_vec()
    }

    /// Decode a snapshot produced by [`store`](Self::store).
    ///
    /// The whole buffer is validated (length, checksum, owner) before a
    /// snapshot is returned; nothing partial ever escapes.
    pub fn read(data: &[u8]) -> Result<Self> {
        if data.len() < PREFIX_SIZE {
            return Err(malformed(format!(
                "truncated header: {} bytes, need at least {PREFIX_SIZE}",
                data.len()
            )));
        }

        let mut buf = data;
        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if magic != SNAPSHOT_MAGIC {
            return Err(malformed(format!("bad magic {magic:02x?}")));
        }

        let version = buf.get_u8();
        if version != SNAPSHOT_VERSION {
            return Err(SequenceError::UnsupportedVersion {
                found: version,
                supported: SNAPSHOT_VERSION,
            });
        }

        let owner_len = buf.get_u16() as usize;
        if buf.remaining() < owner_len + COUNT_SIZE {
            return Err(malformed(format!(
                "truncated owner: need {} bytes, have {}",
                owner_len + COUNT_SIZE,
                buf.remaining()
            )));
        }
        let owner_bytes = &buf[..owner_len];
        buf.advance(owner_len);

        let count = buf.get_u32() as u64;
        let expected_total =
            (PREFIX_SIZE + owner_len + COUNT_SIZE + CRC_SIZE) as u64 + count * SLOT_SIZE as u64;
        if data.len() as u64 != expected_total {
            return Err(malformed(format!(
                "length {} does not match {count} slots (expected {expected_total} bytes)",
                data.len()
            )));
        }

        let body_len = data.len() - CRC_SIZE;
        let expected_crc = u32::from_be_bytes([
            data[body_len],
            data[body_len + 1],
            data[body_len + 2],
            data[body_len + 3],
        ]);
        let actual_crc = crc32fast::hash(&data[..body_len]);
        if actual_crc != expected_crc {
            return Err(malformed(format!(
                "checksum mismatch: expected {expected_crc:#010x}, got {actual_crc:#010x}"
            )));
        }

        let owner = std::str::from_utf8(owner_bytes)
            .map_err(|e| malformed(format!("owner is not UTF-8: {e}")))
            .and_then(|name| NodeId::new(name).map_err(|e| malformed(e.to_string())))?;

        let mut slots = Vec::with_capacity(count as usize);
        for _ in 0..count {
            slots.push(buf.get_u64());
        }

        Self::new(owner, slots).map_err(|e| malformed(e.to_string()))
    }
}

fn malformed(reason: String) -> SequenceError {
    SequenceError::MalformedSnapshot(reason)
}
