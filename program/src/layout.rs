//! # Record Binary Layout
//!
//! The fixed wire encoding of a [`VaultRecord`] and the memcmp filters that
//! query it.
//!
//! Layout, in order: 8-byte record tag; 32-byte owner; 32-byte recipient;
//! length-prefixed `content_ref`; length-prefixed `content_key_ref`;
//! i64 `time_interval`; i64 `last_check_in`; u8 `is_released`;
//! length-prefixed `name`; optional delegate; u64 `bounty_lamports`;
//! u64 `seed`; u8 `bump`; u64 `locked_value`; optional token mint;
//! u64 `locked_tokens`. Integers are little-endian. Strings carry a 4-byte
//! LE length prefix followed by that many UTF-8 bytes. Options are a tag
//! byte (0/1) followed by 32 address bytes when set.
//!
//! The decoder never trusts a length prefix without checking it against
//! the remaining buffer, and it tolerates trailing bytes — accounts may be
//! allocated with slack. What it does not tolerate is silent corruption:
//! every malformed condition has its own [`DecodeError`] variant so
//! scanners can say exactly why a record was skipped.

use crate::state::VaultRecord;
use bytes::{Buf, BufMut};
use thiserror::Error;
use vigil_protocol::address::{Address, ADDRESS_LENGTH};
use vigil_protocol::config::RECORD_TAG;

/// Byte width of a string length prefix.
const LEN_PREFIX_BYTES: usize = 4;

/// Byte offset of the owner address. Fixed: nothing variable-length
/// precedes it, so owner-scoped memcmp queries are possible.
pub const OWNER_OFFSET: usize = RECORD_TAG.len();

/// Byte offset of the recipient address. Also fixed, for the same reason.
pub const RECIPIENT_OFFSET: usize = OWNER_OFFSET + ADDRESS_LENGTH;

/// Smallest possible record: empty strings, no delegate, no mint. Buffers
/// shorter than this are rejected before any field parsing.
pub const RECORD_MIN_LEN: usize = RECIPIENT_OFFSET
    + ADDRESS_LENGTH     // recipient
    + LEN_PREFIX_BYTES   // content_ref (empty)
    + LEN_PREFIX_BYTES   // content_key_ref (empty)
    + 8                  // time_interval
    + 8                  // last_check_in
    + 1                  // is_released
    + LEN_PREFIX_BYTES   // name (empty)
    + 1                  // delegate tag (none)
    + 8                  // bounty_lamports
    + 8                  // seed
    + 1                  // bump
    + 8                  // locked_value
    + 1                  // token_mint tag (none)
    + 8; // locked_tokens

/// Largest record the program will ever write: maximal strings, both
/// options set. Useful for account allocation.
pub const RECORD_MAX_LEN: usize = RECORD_MIN_LEN
    + 2 * vigil_protocol::config::MAX_CONTENT_REF_BYTES
    + vigil_protocol::config::MAX_NAME_BYTES
    + 2 * ADDRESS_LENGTH;

/// Why a buffer failed to decode as a vault record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Shorter than any valid record could be.
    #[error("buffer too short for a vault record: {len} bytes")]
    TooShort { len: usize },

    /// The leading 8 bytes are not the vault record tag.
    #[error("unknown record tag")]
    BadTag,

    /// The buffer ended mid-field.
    #[error("record truncated while reading {field}")]
    Truncated { field: &'static str },

    /// A string length prefix claims more bytes than remain. The classic
    /// way a partially-written record lies to you.
    #[error("{field} length prefix {len} exceeds the {remaining} bytes remaining")]
    OversizedPrefix {
        field: &'static str,
        len: usize,
        remaining: usize,
    },

    /// String bytes that are not UTF-8.
    #[error("{field} is not valid utf-8")]
    InvalidUtf8 { field: &'static str },

    /// An option tag byte other than 0 or 1.
    #[error("invalid option tag {tag} for {field}")]
    BadOptionTag { field: &'static str, tag: u8 },

    /// A boolean byte other than 0 or 1.
    #[error("invalid boolean byte {value} for {field}")]
    BadBoolByte { field: &'static str, value: u8 },
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Exact encoded size of `record`.
pub fn encoded_len(record: &VaultRecord) -> usize {
    RECORD_MIN_LEN
        + record.content_ref.len()
        + record.content_key_ref.len()
        + record.name.len()
        + record.delegate.map_or(0, |_| ADDRESS_LENGTH)
        + record.token_mint.map_or(0, |_| ADDRESS_LENGTH)
}

/// Encode a record into its wire form.
pub fn encode(record: &VaultRecord) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(record));
    buf.put_slice(&RECORD_TAG);
    buf.put_slice(record.owner.as_bytes());
    buf.put_slice(record.recipient.as_bytes());
    put_string(&mut buf, &record.content_ref);
    put_string(&mut buf, &record.content_key_ref);
    buf.put_i64_le(record.time_interval);
    buf.put_i64_le(record.last_check_in);
    buf.put_u8(record.is_released as u8);
    put_string(&mut buf, &record.name);
    put_option_address(&mut buf, record.delegate.as_ref());
    buf.put_u64_le(record.bounty_lamports);
    buf.put_u64_le(record.seed);
    buf.put_u8(record.bump);
    buf.put_u64_le(record.locked_value);
    put_option_address(&mut buf, record.token_mint.as_ref());
    buf.put_u64_le(record.locked_tokens);
    buf
}

fn put_string(buf: &mut Vec<u8>, s: &str) {
    buf.put_u32_le(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

fn put_option_address(buf: &mut Vec<u8>, addr: Option<&Address>) {
    match addr {
        Some(a) => {
            buf.put_u8(1);
            buf.put_slice(a.as_bytes());
        }
        None => buf.put_u8(0),
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a record from its wire form.
///
/// Trailing bytes after the final field are permitted; everything before
/// it is bounds-checked field by field.
pub fn decode(bytes: &[u8]) -> Result<VaultRecord, DecodeError> {
    if bytes.len() < RECORD_MIN_LEN {
        return Err(DecodeError::TooShort { len: bytes.len() });
    }

    let mut buf = bytes;
    let mut tag = [0u8; RECORD_TAG.len()];
    buf.copy_to_slice(&mut tag);
    if tag != RECORD_TAG {
        return Err(DecodeError::BadTag);
    }

    let owner = get_address(&mut buf, "owner")?;
    let recipient = get_address(&mut buf, "recipient")?;
    let content_ref = get_string(&mut buf, "content_ref")?;
    let content_key_ref = get_string(&mut buf, "content_key_ref")?;
    let time_interval = get_i64(&mut buf, "time_interval")?;
    let last_check_in = get_i64(&mut buf, "last_check_in")?;
    let is_released = get_bool(&mut buf, "is_released")?;
    let name = get_string(&mut buf, "name")?;
    let delegate = get_option_address(&mut buf, "delegate")?;
    let bounty_lamports = get_u64(&mut buf, "bounty_lamports")?;
    let seed = get_u64(&mut buf, "seed")?;
    let bump = get_u8(&mut buf, "bump")?;
    let locked_value = get_u64(&mut buf, "locked_value")?;
    let token_mint = get_option_address(&mut buf, "token_mint")?;
    let locked_tokens = get_u64(&mut buf, "locked_tokens")?;

    Ok(VaultRecord {
        owner,
        recipient,
        content_ref,
        content_key_ref,
        time_interval,
        last_check_in,
        is_released,
        name,
        delegate,
        bounty_lamports,
        seed,
        bump,
        locked_value,
        token_mint,
        locked_tokens,
    })
}

fn get_address(buf: &mut &[u8], field: &'static str) -> Result<Address, DecodeError> {
    if buf.remaining() < ADDRESS_LENGTH {
        return Err(DecodeError::Truncated { field });
    }
    let mut bytes = [0u8; ADDRESS_LENGTH];
    buf.copy_to_slice(&mut bytes);
    Ok(Address::new(bytes))
}

fn get_string(buf: &mut &[u8], field: &'static str) -> Result<String, DecodeError> {
    if buf.remaining() < LEN_PREFIX_BYTES {
        return Err(DecodeError::Truncated { field });
    }
    let len = buf.get_u32_le() as usize;
    if len > buf.remaining() {
        return Err(DecodeError::OversizedPrefix {
            field,
            len,
            remaining: buf.remaining(),
        });
    }
    let mut raw = vec![0u8; len];
    buf.copy_to_slice(&mut raw);
    String::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8 { field })
}

fn get_i64(buf: &mut &[u8], field: &'static str) -> Result<i64, DecodeError> {
    if buf.remaining() < 8 {
        return Err(DecodeError::Truncated { field });
    }
    Ok(buf.get_i64_le())
}

fn get_u64(buf: &mut &[u8], field: &'static str) -> Result<u64, DecodeError> {
    if buf.remaining() < 8 {
        return Err(DecodeError::Truncated { field });
    }
    Ok(buf.get_u64_le())
}

fn get_u8(buf: &mut &[u8], field: &'static str) -> Result<u8, DecodeError> {
    if !buf.has_remaining() {
        return Err(DecodeError::Truncated { field });
    }
    Ok(buf.get_u8())
}

fn get_bool(buf: &mut &[u8], field: &'static str) -> Result<bool, DecodeError> {
    match get_u8(buf, field)? {
        0 => Ok(false),
        1 => Ok(true),
        value => Err(DecodeError::BadBoolByte { field, value }),
    }
}

fn get_option_address(buf: &mut &[u8], field: &'static str) -> Result<Option<Address>, DecodeError> {
    match get_u8(buf, field)? {
        0 => Ok(None),
        1 => Ok(Some(get_address(buf, field)?)),
        tag => Err(DecodeError::BadOptionTag { field, tag }),
    }
}

// ---------------------------------------------------------------------------
// Memcmp filters
// ---------------------------------------------------------------------------

/// An exact-match predicate over raw account bytes at a fixed offset, the
/// query primitive scanners use to avoid decoding the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemcmpFilter {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl MemcmpFilter {
    pub fn new(offset: usize, bytes: Vec<u8>) -> Self {
        Self { offset, bytes }
    }

    /// Matches any account carrying the vault record tag.
    pub fn record_tag() -> Self {
        Self::new(0, RECORD_TAG.to_vec())
    }

    /// Matches records owned by `owner`.
    pub fn owner(owner: &Address) -> Self {
        Self::new(OWNER_OFFSET, owner.as_bytes().to_vec())
    }

    /// Matches records whose recipient is `recipient`.
    pub fn recipient(recipient: &Address) -> Self {
        Self::new(RECIPIENT_OFFSET, recipient.as_bytes().to_vec())
    }

    /// Whether `account` carries the expected bytes at the filter offset.
    /// Accounts too short to contain the window simply don't match.
    pub fn matches(&self, account: &[u8]) -> bool {
        account
            .get(self.offset..self.offset + self.bytes.len())
            .is_some_and(|window| window == self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_protocol::Keypair;

    fn sample_record() -> VaultRecord {
        VaultRecord {
            owner: Keypair::generate().address(),
            recipient: Keypair::generate().address(),
            content_ref: "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi".into(),
            content_key_ref: "key/v1/0xdeadbeef".into(),
            time_interval: 30 * 86_400,
            last_check_in: 1_756_000_000,
            is_released: false,
            name: "estate plan".into(),
            delegate: Some(Keypair::generate().address()),
            bounty_lamports: 5_000,
            seed: 7,
            bump: 254,
            locked_value: 1_000_000_000,
            token_mint: Some(Keypair::generate().address()),
            locked_tokens: 250,
        }
    }

    #[test]
    fn roundtrip_full_record() {
        let record = sample_record();
        let wire = encode(&record);
        assert_eq!(wire.len(), encoded_len(&record));
        assert_eq!(decode(&wire), Ok(record));
    }

    #[test]
    fn roundtrip_minimal_record() {
        let mut record = sample_record();
        record.content_ref.clear();
        record.content_key_ref.clear();
        record.name.clear();
        record.delegate = None;
        record.token_mint = None;

        let wire = encode(&record);
        assert_eq!(wire.len(), RECORD_MIN_LEN);
        assert_eq!(decode(&wire), Ok(record));
    }

    #[test]
    fn fixed_fields_sit_at_their_offsets() {
        let record = sample_record();
        let wire = encode(&record);
        assert_eq!(&wire[..OWNER_OFFSET], RECORD_TAG);
        assert_eq!(&wire[OWNER_OFFSET..RECIPIENT_OFFSET], record.owner.as_bytes());
        assert_eq!(
            &wire[RECIPIENT_OFFSET..RECIPIENT_OFFSET + ADDRESS_LENGTH],
            record.recipient.as_bytes()
        );
    }

    #[test]
    fn trailing_slack_is_tolerated() {
        let record = sample_record();
        let mut wire = encode(&record);
        wire.extend_from_slice(&[0u8; 64]);
        assert_eq!(decode(&wire), Ok(record));
    }

    #[test]
    fn short_buffer_rejected_outright() {
        assert_eq!(decode(&[]), Err(DecodeError::TooShort { len: 0 }));
        let wire = encode(&sample_record());
        assert_eq!(
            decode(&wire[..RECORD_MIN_LEN - 1]),
            Err(DecodeError::TooShort {
                len: RECORD_MIN_LEN - 1
            })
        );
    }

    #[test]
    fn foreign_tag_rejected() {
        let mut wire = encode(&sample_record());
        wire[0] ^= 0xFF;
        assert_eq!(decode(&wire), Err(DecodeError::BadTag));
    }

    #[test]
    fn lying_length_prefix_rejected() {
        let mut wire = encode(&sample_record());
        // content_ref length prefix sits right after the two addresses.
        let prefix_at = RECIPIENT_OFFSET + ADDRESS_LENGTH;
        wire[prefix_at..prefix_at + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            decode(&wire),
            Err(DecodeError::OversizedPrefix {
                field: "content_ref",
                ..
            })
        ));
    }

    #[test]
    fn truncated_tail_names_the_field() {
        let record = sample_record();
        let wire = encode(&record);
        // Cut into the final u64 but stay above the minimum length.
        let cut = &wire[..wire.len() - 3];
        assert!(cut.len() >= RECORD_MIN_LEN);
        assert_eq!(
            decode(cut),
            Err(DecodeError::Truncated {
                field: "locked_tokens"
            })
        );
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut record = sample_record();
        record.delegate = None;
        record.token_mint = None;
        let mut wire = encode(&record);
        // First byte of content_ref.
        let at = RECIPIENT_OFFSET + ADDRESS_LENGTH + LEN_PREFIX_BYTES;
        wire[at] = 0xFF;
        assert_eq!(
            decode(&wire),
            Err(DecodeError::InvalidUtf8 {
                field: "content_ref"
            })
        );
    }

    #[test]
    fn bad_option_tag_rejected() {
        let record = sample_record();
        let wire = encode(&record);
        // Delegate tag byte: after the name's bytes.
        let at = RECIPIENT_OFFSET
            + ADDRESS_LENGTH
            + LEN_PREFIX_BYTES
            + record.content_ref.len()
            + LEN_PREFIX_BYTES
            + record.content_key_ref.len()
            + 8
            + 8
            + 1
            + LEN_PREFIX_BYTES
            + record.name.len();
        let mut wire2 = wire;
        wire2[at] = 7;
        assert_eq!(
            decode(&wire2),
            Err(DecodeError::BadOptionTag {
                field: "delegate",
                tag: 7
            })
        );
    }

    #[test]
    fn bad_released_byte_rejected() {
        let record = sample_record();
        let mut wire = encode(&record);
        let at = RECIPIENT_OFFSET
            + ADDRESS_LENGTH
            + LEN_PREFIX_BYTES
            + record.content_ref.len()
            + LEN_PREFIX_BYTES
            + record.content_key_ref.len()
            + 8
            + 8;
        wire[at] = 2;
        assert_eq!(
            decode(&wire),
            Err(DecodeError::BadBoolByte {
                field: "is_released",
                value: 2
            })
        );
    }

    #[test]
    fn max_len_bounds_every_program_record() {
        let mut record = sample_record();
        record.content_ref = "r".repeat(vigil_protocol::config::MAX_CONTENT_REF_BYTES);
        record.content_key_ref = "k".repeat(vigil_protocol::config::MAX_CONTENT_REF_BYTES);
        record.name = "n".repeat(vigil_protocol::config::MAX_NAME_BYTES);
        assert_eq!(encode(&record).len(), RECORD_MAX_LEN);
    }

    #[test]
    fn memcmp_filters_match_their_fields() {
        let record = sample_record();
        let wire = encode(&record);

        assert!(MemcmpFilter::record_tag().matches(&wire));
        assert!(MemcmpFilter::owner(&record.owner).matches(&wire));
        assert!(MemcmpFilter::recipient(&record.recipient).matches(&wire));

        let other = Keypair::generate().address();
        assert!(!MemcmpFilter::owner(&other).matches(&wire));
        assert!(!MemcmpFilter::recipient(&other).matches(&wire));
    }

    #[test]
    fn memcmp_out_of_range_never_matches() {
        let filter = MemcmpFilter::new(1_000, vec![1, 2, 3]);
        assert!(!filter.matches(&[0u8; 16]));
        assert!(!MemcmpFilter::record_tag().matches(&[]));
    }
}
