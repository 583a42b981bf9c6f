/// Size in bytes of the header written in front of every payload.
///
/// ```text
///   ┌──────────────┬──────────────┬──────────────────┬─────┐
///   │ size: u64 LE │ next: u64 LE │ generation: 56 b │ tag │
///   └──────────────┴──────────────┴──────────────────┴─────┘
///    0              8              16                 23    24
/// ```
pub const HEADER_SIZE: usize = 24;

const SIZE_AT: usize = 0;
const NEXT_AT: usize = 8;
const STAMP_AT: usize = 16;

/// Encoded `next` for the last block in the chain.
const NO_NEXT: u64 = u64::MAX;

/// Generations share a word with the tag byte and wrap at this mask.
pub const GENERATION_MASK: u64 = (1 << 56) - 1;

const TAG_FREE: u8 = 0xF4;
const TAG_USED: u8 = 0x5E;

/// A block descriptor, decoded from the header bytes living in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
  pub size: usize,
  pub is_free: bool,
  pub next: Option<usize>,
  pub generation: u64,
}

impl Block {
  pub fn new(
    size: usize,
    is_free: bool,
    next: Option<usize>,
    generation: u64,
  ) -> Self {
    Self {
      size,
      is_free,
      next,
      generation,
    }
  }

  /// Decodes the header starting at `offset`.
  ///
  /// Returns `None` when the bytes there do not carry a header tag, which
  /// happens for scrubbed (merged away) headers and for offsets that point
  /// into the middle of a payload.
  pub fn read(
    arena: &[u8],
    offset: usize,
  ) -> Option<Self> {
    let bytes = arena.get(offset..offset.checked_add(HEADER_SIZE)?)?;

    let stamp = read_u64(bytes, STAMP_AT);
    let is_free = match (stamp >> 56) as u8 {
      TAG_FREE => true,
      TAG_USED => false,
      _ => return None,
    };

    let next = match read_u64(bytes, NEXT_AT) {
      NO_NEXT => None,
      next => Some(usize::try_from(next).ok()?),
    };

    Some(Self {
      size: usize::try_from(read_u64(bytes, SIZE_AT)).ok()?,
      is_free,
      next,
      generation: stamp & GENERATION_MASK,
    })
  }

  /// Encodes this descriptor into the header starting at `offset`.
  pub fn write(
    &self,
    arena: &mut [u8],
    offset: usize,
  ) {
    let bytes = &mut arena[offset..offset + HEADER_SIZE];
    let next = self.next.map_or(NO_NEXT, |next| next as u64);
    let tag = if self.is_free { TAG_FREE } else { TAG_USED };
    let stamp = (self.generation & GENERATION_MASK) | (u64::from(tag) << 56);

    bytes[SIZE_AT..NEXT_AT].copy_from_slice(&(self.size as u64).to_le_bytes());
    bytes[NEXT_AT..STAMP_AT].copy_from_slice(&next.to_le_bytes());
    bytes[STAMP_AT..HEADER_SIZE].copy_from_slice(&stamp.to_le_bytes());
  }

  /// Wipes the header at `offset` so it no longer decodes as a block.
  pub fn scrub(
    arena: &mut [u8],
    offset: usize,
  ) {
    arena[offset..offset + HEADER_SIZE].fill(0);
  }

  /// Offset of the first payload byte for a header at `offset`.
  pub fn payload_offset(offset: usize) -> usize {
    offset + HEADER_SIZE
  }
}

fn read_u64(
  bytes: &[u8],
  at: usize,
) -> u64 {
  let mut buf = [0u8; 8];
  buf.copy_from_slice(&bytes[at..at + 8]);
  u64::from_le_bytes(buf)
}
