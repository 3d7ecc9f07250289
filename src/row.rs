//! Row data model and on-disk serialization (spec §3.1, §4.7).

use crate::error::Error;

pub const USERNAME_MAX: usize = 32;
pub const EMAIL_MAX: usize = 255;

const ID_SIZE: usize = 4;
const USERNAME_SIZE: usize = USERNAME_MAX + 1;
const EMAIL_SIZE: usize = EMAIL_MAX + 1;

/// Packed row size: 4 (id) + 33 (username) + 256 (email) = 293 bytes.
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

const ID_OFFSET: usize = 0;
const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

/// A single record: unique `id`, plus fixed-capacity `username`/`email`
/// text fields stored with their trailing NUL terminator (spec §3.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: [u8; USERNAME_SIZE],
    pub email: [u8; EMAIL_SIZE],
}

impl Row {
    /// Builds a row from already-validated byte buffers.
    pub fn new(id: u32, username: [u8; USERNAME_SIZE], email: [u8; EMAIL_SIZE]) -> Self {
        Row {
            id,
            username,
            email,
        }
    }

    /// Returns the `username` field as a lossy, NUL-trimmed string.
    pub fn username_str(&self) -> String {
        trim_nul(&self.username)
    }

    /// Returns the `email` field as a lossy, NUL-trimmed string.
    pub fn email_str(&self) -> String {
        trim_nul(&self.email)
    }

    /// Serializes the row to its packed 293-byte on-disk representation
    /// (spec §3.1, §4.7): little-endian `id`, then `username`, then
    /// `email`, no padding between fields.
    pub fn serialize(&self) -> [u8; ROW_SIZE] {
        let mut buf = [0u8; ROW_SIZE];
        buf[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        buf[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE].copy_from_slice(&self.username);
        buf[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE].copy_from_slice(&self.email);
        buf
    }

    /// Deserializes a row from its packed 293-byte representation.
    pub fn deserialize(buf: &[u8; ROW_SIZE]) -> Self {
        let id = u32::from_le_bytes(
            buf[ID_OFFSET..ID_OFFSET + ID_SIZE]
                .try_into()
                .expect("slice of fixed length"),
        );
        let mut username = [0u8; USERNAME_SIZE];
        username.copy_from_slice(&buf[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]);
        let mut email = [0u8; EMAIL_SIZE];
        email.copy_from_slice(&buf[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]);
        Row {
            id,
            username,
            email,
        }
    }
}

fn trim_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn str_to_fixed<const N: usize>(field: &'static str, s: &str, max: usize) -> Result<[u8; N], Error> {
    let bytes = s.as_bytes();
    if bytes.len() > max {
        return Err(Error::StringTooLong { field, max });
    }
    let mut buf = [0u8; N];
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(buf)
}

/// `prepare_insert` (spec §6.2): validates a candidate row before it ever
/// reaches the tree. Rejects a negative id or an over-capacity string
/// without mutating anything.
pub fn prepare_insert(id: i64, username: &str, email: &str) -> Result<Row, Error> {
    if id < 0 {
        return Err(Error::NegativeId(id));
    }
    let username = str_to_fixed::<USERNAME_SIZE>("username", username, USERNAME_MAX)?;
    let email = str_to_fixed::<EMAIL_SIZE>("email", email, EMAIL_MAX)?;
    Ok(Row::new(id as u32, username, email))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_deserialize_round_trip() {
        let row = prepare_insert(7, "alice", "alice@example.com").unwrap();
        let bytes = row.serialize();
        let back = Row::deserialize(&bytes);
        assert_eq!(row, back);
        assert_eq!(back.username_str(), "alice");
        assert_eq!(back.email_str(), "alice@example.com");
    }

    #[test]
    fn serialized_layout_matches_spec_offsets() {
        let row = prepare_insert(1, "a", "b").unwrap();
        let bytes = row.serialize();
        assert_eq!(bytes.len(), 293);
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(bytes[4], b'a');
        assert_eq!(bytes[37], b'b');
    }

    #[test]
    fn negative_id_rejected() {
        assert!(matches!(
            prepare_insert(-1, "x", "x"),
            Err(Error::NegativeId(-1))
        ));
    }

    #[test]
    fn oversized_username_rejected() {
        let long = "a".repeat(USERNAME_MAX + 1);
        assert!(matches!(
            prepare_insert(1, &long, "x"),
            Err(Error::StringTooLong {
                field: "username",
                ..
            })
        ));
    }

    #[test]
    fn oversized_email_rejected() {
        let long = "a".repeat(EMAIL_MAX + 1);
        assert!(matches!(
            prepare_insert(1, "x", &long),
            Err(Error::StringTooLong { field: "email", .. })
        ));
    }

    #[test]
    fn max_length_strings_accepted() {
        let username = "u".repeat(USERNAME_MAX);
        let email = "e".repeat(EMAIL_MAX);
        let row = prepare_insert(1, &username, &email).unwrap();
        assert_eq!(row.username_str(), username);
        assert_eq!(row.email_str(), email);
    }
}
