//! Mnemonic generation and HD wallet derivation using bip39 and alloy

use crate::types::DerivedWallet;
use alloy::signers::local::{coins_bip39::English, MnemonicBuilder};
use bip39::{Language, Mnemonic};
use rand::RngCore;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// BIP-44 Ethereum path, `{index}` is replaced by the wallet's position
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/60'/0'/0/{index}";

/// 16 bytes of entropy encode as a 12-word phrase
const ENTROPY_BYTES: usize = 16;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Please generate a mnemonic first")]
    MissingMnemonic,

    #[error("Invalid mnemonic phrase: {0}")]
    InvalidMnemonic(String),

    #[error("Derivation path template must contain {{index}}: {0}")]
    InvalidPathTemplate(String),

    #[error("Wallet index space exhausted")]
    IndexOverflow,

    #[error("Key derivation failed: {0}")]
    Derivation(String),
}

/// Mnemonic and derived wallets for one session.
///
/// The wallet list is append-only. Replacing the mnemonic keeps the list and
/// derivation continues at the next index under the new phrase.
pub struct GeneratorSession {
    mnemonic: Option<String>,
    wallets: Vec<DerivedWallet>,
    path_template: String,
}

impl GeneratorSession {
    pub fn new() -> Self {
        Self {
            mnemonic: None,
            wallets: Vec::new(),
            path_template: DEFAULT_DERIVATION_PATH.to_string(),
        }
    }

    /// Session deriving under a custom path template
    pub fn with_path_template(template: &str) -> Result<Self, GeneratorError> {
        validate_path_template(template)?;
        Ok(Self {
            path_template: template.to_string(),
            ..Self::new()
        })
    }

    /// Generate a fresh 12-word mnemonic, replacing any previous one.
    pub fn generate(&mut self) -> Result<&str, GeneratorError> {
        let mut entropy = [0u8; ENTROPY_BYTES];
        rand::thread_rng().fill_bytes(&mut entropy);

        let mnemonic = Mnemonic::from_entropy(&entropy)
            .map_err(|e| GeneratorError::InvalidMnemonic(e.to_string()))?;

        if self.mnemonic.is_some() {
            debug!("[Generator] Replacing existing mnemonic");
        }
        info!("[Generator] Generated new mnemonic");

        Ok(self.mnemonic.insert(mnemonic.to_string()).as_str())
    }

    /// Install an existing phrase as the session mnemonic.
    pub fn import(&mut self, phrase: &str) -> Result<(), GeneratorError> {
        let mnemonic = Mnemonic::parse_in(Language::English, phrase)
            .map_err(|e| GeneratorError::InvalidMnemonic(e.to_string()))?;
        self.mnemonic = Some(mnemonic.to_string());
        info!("[Generator] Imported mnemonic");
        Ok(())
    }

    /// Derive the wallet at the next index and append it.
    pub fn derive_next(&mut self) -> Result<&DerivedWallet, GeneratorError> {
        let phrase = self.mnemonic.as_deref().ok_or(GeneratorError::MissingMnemonic)?;

        let index = u32::try_from(self.wallets.len()).map_err(|_| GeneratorError::IndexOverflow)?;
        let path = self.path_template.replace("{index}", &index.to_string());
        let address = derive_address(phrase, &path)?;

        debug!("[Generator] Derived wallet {} at {}", index, path);

        self.wallets.push(DerivedWallet { index, path, address });
        // Just pushed, so the list is non-empty
        self.wallets.last().ok_or(GeneratorError::IndexOverflow)
    }

    pub fn mnemonic(&self) -> Option<&str> {
        self.mnemonic.as_deref()
    }

    pub fn wallets(&self) -> &[DerivedWallet] {
        &self.wallets
    }

    pub fn path_template(&self) -> &str {
        &self.path_template
    }

    /// Display lines for the whole wallet list
    pub fn render(&self) -> Vec<String> {
        self.wallets
            .iter()
            .map(|w| format!("Wallet {}: {}", w.index + 1, w.address))
            .collect()
    }
}

impl Default for GeneratorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GeneratorSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorSession")
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .field("wallets", &self.wallets)
            .field("path_template", &self.path_template)
            .finish()
    }
}

/// Reject templates that would derive the same path for every index
pub fn validate_path_template(template: &str) -> Result<(), GeneratorError> {
    if !template.starts_with("m/") || !template.contains("{index}") {
        return Err(GeneratorError::InvalidPathTemplate(template.to_string()));
    }
    Ok(())
}

/// Checksummed address of the key at `path` under `phrase`
pub fn derive_address(phrase: &str, path: &str) -> Result<String, GeneratorError> {
    let signer = MnemonicBuilder::<English>::default()
        .phrase(phrase)
        .derivation_path(path)
        .map_err(|e| GeneratorError::Derivation(e.to_string()))?
        .build()
        .map_err(|e| GeneratorError::Derivation(e.to_string()))?;

    Ok(signer.address().to_checksum(None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const TEST_PHRASE: &str = "test test test test test test test test test test test junk";

    #[test]
    fn test_generate_produces_twelve_words() {
        let mut session = GeneratorSession::new();
        let phrase = session.generate().unwrap().to_string();

        assert_eq!(phrase.split_whitespace().count(), 12);
        assert_eq!(session.mnemonic(), Some(phrase.as_str()));
    }

    #[test]
    fn test_derive_before_generate_fails_without_mutation() {
        let mut session = GeneratorSession::new();
        let err = session.derive_next().unwrap_err();

        assert!(matches!(err, GeneratorError::MissingMnemonic));
        assert_eq!(err.to_string(), "Please generate a mnemonic first");
        assert!(session.wallets().is_empty());
    }

    #[test]
    fn test_n_derivations_have_sequential_indices_and_distinct_addresses() {
        let mut session = GeneratorSession::new();
        session.generate().unwrap();

        for _ in 0..5 {
            session.derive_next().unwrap();
        }

        let wallets = session.wallets();
        assert_eq!(wallets.len(), 5);
        for (i, wallet) in wallets.iter().enumerate() {
            assert_eq!(wallet.index, i as u32);
            assert_eq!(wallet.path, format!("m/44'/60'/0'/0/{}", i));
        }
        let distinct: HashSet<_> = wallets.iter().map(|w| w.address.clone()).collect();
        assert_eq!(distinct.len(), 5);
    }

    #[test]
    fn test_known_vector() {
        let mut session = GeneratorSession::new();
        session.import(TEST_PHRASE).unwrap();

        let first = session.derive_next().unwrap().address.clone();
        let second = session.derive_next().unwrap().address.clone();

        assert_eq!(first, "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        assert_eq!(second, "0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
    }

    #[test]
    fn test_regenerate_keeps_list_and_continues_index() {
        let mut session = GeneratorSession::new();
        session.generate().unwrap();
        session.derive_next().unwrap();

        session.generate().unwrap();
        let wallet = session.derive_next().unwrap();

        assert_eq!(wallet.index, 1);
        assert_eq!(session.wallets().len(), 2);
    }

    #[test]
    fn test_import_rejects_bad_phrase() {
        let mut session = GeneratorSession::new();
        let err = session.import("not a real mnemonic").unwrap_err();

        assert!(matches!(err, GeneratorError::InvalidMnemonic(_)));
        assert!(session.mnemonic().is_none());
    }

    #[test]
    fn test_render_lines() {
        let mut session = GeneratorSession::new();
        session.import(TEST_PHRASE).unwrap();
        session.derive_next().unwrap();

        assert_eq!(
            session.render(),
            vec!["Wallet 1: 0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string()]
        );
    }

    #[test]
    fn test_path_template_validation() {
        assert!(GeneratorSession::with_path_template("m/44'/60'/0'/0/{index}").is_ok());
        assert!(matches!(
            GeneratorSession::with_path_template("m/44'/60'/0'/0/0"),
            Err(GeneratorError::InvalidPathTemplate(_))
        ));
    }

    #[test]
    fn test_debug_redacts_mnemonic() {
        let mut session = GeneratorSession::new();
        session.import(TEST_PHRASE).unwrap();

        let debug = format!("{:?}", session);
        assert!(!debug.contains("junk"));
        assert!(debug.contains("<redacted>"));
    }
}
