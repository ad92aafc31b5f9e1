//! Packet obfuscation with a fixed-key RC4 keystream.
//!
//! The key is the MD5 digest of the shared passphrase. Every call to
//! [PacketCipher::encode] or [PacketCipher::decode] starts a new keystream
//! from offset zero, so each packet is transformed independently of the
//! ones before it. The keystream is reused for every packet: treat it as
//! obfuscation, not confidentiality.

use md5::{Digest, Md5};
use rc4::{consts::U16, KeyInit, Rc4, StreamCipher};
use thiserror::Error;

/// Length of the derived RC4 key in bytes.
pub const KEY_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("cipher key must be {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),
}

/// Symmetric packet cipher built from an immutable key.
#[derive(Clone)]
pub struct PacketCipher {
    key: [u8; KEY_LEN],
}

impl PacketCipher {
    /// Derives the key from a passphrase.
    pub fn from_passphrase(passphrase: &str) -> Result<Self, CipherError> {
        let digest = Md5::digest(passphrase.as_bytes());
        Self::from_key(&digest)
    }

    /// Uses `key` directly. It must be exactly [KEY_LEN] bytes long.
    pub fn from_key(key: &[u8]) -> Result<Self, CipherError> {
        let key: [u8; KEY_LEN] = key
            .try_into()
            .map_err(|_| CipherError::InvalidKeyLength(key.len()))?;
        Ok(Self { key })
    }

    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    /// Encrypts `buffer` in place.
    pub fn encode(&self, buffer: &mut [u8]) {
        self.keystream().apply_keystream(buffer);
    }

    /// Decrypts `buffer` in place.
    pub fn decode(&self, buffer: &mut [u8]) {
        self.keystream().apply_keystream(buffer);
    }

    fn keystream(&self) -> Rc4<U16> {
        Rc4::new(&self.key.into())
    }
}

impl std::fmt::Debug for PacketCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passphrase_digest_is_the_key() {
        let cipher = PacketCipher::from_passphrase("123456").unwrap();
        assert_eq!(
            cipher.key(),
            &[
                0xe1, 0x0a, 0xdc, 0x39, 0x49, 0xba, 0x59, 0xab, 0xbe, 0x56, 0xe0, 0x57, 0xf2, 0x0f,
                0x88, 0x3e
            ]
        );
    }

    #[test]
    fn test_ping_known_answer() {
        let cipher = PacketCipher::from_passphrase("123456").unwrap();
        let mut packet = *b"PING";

        cipher.encode(&mut packet);
        assert_eq!(packet, [0xa7, 0x47, 0xe5, 0xb5]);

        cipher.decode(&mut packet);
        assert_eq!(&packet, b"PING");
    }

    #[test]
    fn test_round_trip() {
        let cipher = PacketCipher::from_passphrase("correct horse battery staple").unwrap();
        let original: Vec<u8> = (0..1600).map(|i| (i % 251) as u8).collect();
        let mut buffer = original.clone();

        cipher.encode(&mut buffer);
        assert_ne!(buffer, original);
        cipher.decode(&mut buffer);
        assert_eq!(buffer, original);
    }

    #[test]
    fn test_encode_restarts_keystream_every_call() {
        let cipher = PacketCipher::from_passphrase("key").unwrap();
        let mut first = *b"same payload";
        let mut second = *b"same payload";

        cipher.encode(&mut first);
        cipher.encode(&mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_buffer() {
        let cipher = PacketCipher::from_passphrase("").unwrap();
        let mut empty: [u8; 0] = [];
        cipher.encode(&mut empty);
        cipher.decode(&mut empty);
    }

    #[test]
    fn test_rejects_malformed_key() {
        assert!(matches!(
            PacketCipher::from_key(&[0u8; 15]),
            Err(CipherError::InvalidKeyLength(15))
        ));
        assert!(PacketCipher::from_key(&[7u8; KEY_LEN]).is_ok());
    }
}
