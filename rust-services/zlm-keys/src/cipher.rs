//! Authenticated encryption of keypad codes
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use crate::error::{KeyError, KeyResult};
use crate::key_types::SecretKey;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;
use zeroize::Zeroizing;

const NONCE_LEN: usize = 12;

/// Encrypts and decrypts codes with the process key
///
/// Tokens are `base64(nonce || ciphertext || tag)`, a fresh nonce per call.
#[derive(Clone)]
pub struct CodeCipher {
    cipher: Aes256Gcm,
}

impl CodeCipher {
    pub fn new(key: &SecretKey) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.as_bytes()[..]));
        Self { cipher }
    }

    /// Encrypt a plaintext code into an opaque token
    pub fn encrypt(&self, plaintext: &str) -> KeyResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| KeyError::Encryption(format!("Encryption failed: {}", e)))?;

        // Prepend nonce to ciphertext
        let mut token = nonce.to_vec();
        token.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(token))
    }

    /// Decrypt a token produced by [`CodeCipher::encrypt`]
    ///
    /// Any failure (bad encoding, truncation, tampering, foreign key) is
    /// reported as [`KeyError::InvalidCiphertext`].
    pub fn decrypt(&self, token: &str) -> KeyResult<Zeroizing<String>> {
        let raw = STANDARD
            .decode(token)
            .map_err(|_| KeyError::InvalidCiphertext)?;

        if raw.len() <= NONCE_LEN {
            return Err(KeyError::InvalidCiphertext);
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = Zeroizing::new(
            self.cipher
                .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
                .map_err(|_| KeyError::InvalidCiphertext)?,
        );

        let text = std::str::from_utf8(&plaintext).map_err(|_| KeyError::InvalidCiphertext)?;
        Ok(Zeroizing::new(text.to_string()))
    }
}

impl fmt::Debug for CodeCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CodeCipher(AES-256-GCM)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let cipher = CodeCipher::new(&SecretKey::generate());

        for code in ["0000", "1234", "98765432"] {
            let token = cipher.encrypt(code).unwrap();
            assert_ne!(token, code);
            assert_eq!(cipher.decrypt(&token).unwrap().as_str(), code);
        }
    }

    #[test]
    fn test_same_code_yields_distinct_tokens() {
        let cipher = CodeCipher::new(&SecretKey::generate());
        assert_ne!(cipher.encrypt("1234").unwrap(), cipher.encrypt("1234").unwrap());
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let cipher = CodeCipher::new(&SecretKey::generate());
        let token = cipher.encrypt("1234").unwrap();

        let mut raw = STANDARD.decode(&token).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = STANDARD.encode(raw);

        assert!(matches!(cipher.decrypt(&tampered), Err(KeyError::InvalidCiphertext)));
    }

    #[test]
    fn test_wrong_key_is_invalid() {
        let token = CodeCipher::new(&SecretKey::generate()).encrypt("1234").unwrap();
        let other = CodeCipher::new(&SecretKey::generate());

        assert!(matches!(other.decrypt(&token), Err(KeyError::InvalidCiphertext)));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let cipher = CodeCipher::new(&SecretKey::generate());

        for token in ["", "not base64!", "AAAA", "gAAAAABl-fernet-looking"] {
            assert!(matches!(cipher.decrypt(token), Err(KeyError::InvalidCiphertext)));
        }
    }
}
