//! Optional symmetric encryption for Gossip packets (spec.md §4.7).
//!
//! Key = SHA-256(secret). Wire format = 16-byte random IV followed by
//! AES-256-CBC ciphertext with PKCS#7 padding.

use aes::Aes256;
use block_modes::block_padding::Pkcs7;
use block_modes::{BlockMode, Cbc};
use rand::RngCore;
use sha2::{Digest, Sha256};

type Aes256Cbc = Cbc<Aes256, Pkcs7>;

const IV_LEN: usize = 16;

/// Derives the 32-byte AES-256 key from the configured shared secret.
pub fn derive_key(secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    let digest = hasher.finalize();
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest);
    key
}

/// Encrypts `plaintext` under `key` with a fresh random IV, returning
/// `iv || ciphertext`.
pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Vec<u8> {
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    let cipher = Aes256Cbc::new_from_slices(key, &iv).expect("key and iv are fixed-size");
    let ciphertext = cipher.encrypt_vec(plaintext);

    let mut packet = Vec::with_capacity(IV_LEN + ciphertext.len());
    packet.extend_from_slice(&iv);
    packet.extend_from_slice(&ciphertext);
    packet
}

/// Decrypts a `iv || ciphertext` packet under `key`. Returns `None` if the
/// packet is shorter than the IV, or if decryption/unpadding fails —
/// spec.md §4.7 requires both to be dropped silently rather than crash the
/// worker.
pub fn decrypt(key: &[u8; 32], packet: &[u8]) -> Option<Vec<u8>> {
    if packet.len() < IV_LEN {
        return None;
    }
    let (iv, ciphertext) = packet.split_at(IV_LEN);
    let cipher = Aes256Cbc::new_from_slices(key, iv).ok()?;
    cipher.decrypt_vec(ciphertext).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_roundtrips() {
        let key = derive_key("password");
        let packet = encrypt(&key, b"heartbeat::{\"node\":\"a@1.1.1.1\"}");
        let plaintext = decrypt(&key, &packet).unwrap();
        assert_eq!(plaintext, b"heartbeat::{\"node\":\"a@1.1.1.1\"}");
    }

    #[test]
    fn encrypted_packet_shape_matches_spec() {
        // spec.md §8 invariant 6: IV is 16 bytes, ciphertext length is a
        // multiple of the 16-byte AES block size.
        let key = derive_key("password");
        let packet = encrypt(&key, b"heartbeat::{}");
        assert!(packet.len() > IV_LEN);
        assert_eq!((packet.len() - IV_LEN) % 16, 0);
    }

    #[test]
    fn tampered_ciphertext_fails_to_decrypt() {
        let key = derive_key("password");
        let mut packet = encrypt(&key, b"heartbeat::{\"node\":\"a@1.1.1.1\"}");
        let last = packet.len() - 1;
        packet[last] ^= 0xFF;
        assert!(decrypt(&key, &packet).is_none());
    }

    #[test]
    fn short_packet_is_rejected() {
        let key = derive_key("password");
        assert!(decrypt(&key, &[0u8; 4]).is_none());
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let key = derive_key("password");
        let other = derive_key("different");
        let packet = encrypt(&key, b"heartbeat::{\"node\":\"a@1.1.1.1\"}");
        assert!(decrypt(&other, &packet).is_none());
    }
}
