//! Operator signer wallets.
//!
//! Every transaction queue owns exactly one wallet. Keys are loaded from an
//! environment variable (development) or a file (production, 0600), held in
//! zeroized buffers while parsing and never logged.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::error::{ChainError, ChainResult, KeyError};

// =============================================================================
// KeySource
// =============================================================================

/// Source of a private key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum KeySource {
    /// Load from environment variable (development).
    Env { var_name: String },
    /// Load from file (production, recommend 0600 permissions).
    File { path: PathBuf },
}

/// Parse hex key material, accepting a 0x prefix and surrounding whitespace.
fn parse_hex_key(hex_str: &str) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    let trimmed = hex_str.trim().trim_start_matches("0x");
    Ok(Zeroizing::new(hex::decode(trimmed)?))
}

// =============================================================================
// Wallet
// =============================================================================

/// Well-known local development keys (anvil/hardhat accounts 0-7).
const DEV_KEYS: [&str; 8] = [
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    "7c852118294e51e653712a81e05800f419141751be58f605c371e15141b007a6",
    "47e179ec197488593b187f80a00eb0da91f1b9d0b13f8733639f19c30a34926a",
    "8b3a350cf5c34c9194ca85829a2df0ec3153be0318b5e2d3348e872092edffba",
    "92db14e403b83dfe3df233f83dfa3a0d7096f21ca9b0d6d6b8d88b2b4ec1564e",
    "4bbbf85ce3377467afe5d46f804f221813b2bb87f24d81f60f1fcdbf7cbf4356",
];

/// A signing identity.
#[derive(Clone)]
pub struct Wallet {
    address: Address,
    signer: Arc<PrivateKeySigner>,
}

impl Wallet {
    pub fn from_signer(signer: PrivateKeySigner) -> Self {
        Self {
            address: signer.address(),
            signer: Arc::new(signer),
        }
    }

    /// Load a key and optionally verify the derived address.
    ///
    /// # Errors
    /// Returns `KeyError` if:
    /// - Environment variable not found
    /// - File read fails
    /// - Hex decoding fails
    /// - Private key is invalid
    /// - Address mismatch
    pub fn load(source: &KeySource, expected_address: Option<Address>) -> Result<Self, KeyError> {
        let secret_bytes: Zeroizing<Vec<u8>> = match source {
            KeySource::Env { var_name } => {
                let hex = Zeroizing::new(
                    std::env::var(var_name)
                        .map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?,
                );
                parse_hex_key(&hex)?
            }
            KeySource::File { path } => {
                let content = Zeroizing::new(std::fs::read_to_string(path)?);
                parse_hex_key(&content)?
            }
        };

        Self::from_bytes(&secret_bytes, expected_address)
    }

    /// Build from raw key bytes.
    pub fn from_bytes(
        secret_bytes: &[u8],
        expected_address: Option<Address>,
    ) -> Result<Self, KeyError> {
        let signer = PrivateKeySigner::from_slice(secret_bytes)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;

        if let Some(expected) = expected_address {
            if signer.address() != expected {
                return Err(KeyError::AddressMismatch {
                    expected,
                    actual: signer.address(),
                });
            }
        }

        Ok(Self::from_signer(signer))
    }

    /// Local development wallet `index` (0-7).
    ///
    /// Only meant for the simulated chain and tests.
    pub fn dev(index: usize) -> Result<Self, KeyError> {
        let key = DEV_KEYS
            .get(index)
            .ok_or_else(|| KeyError::InvalidKey(format!("no dev key at index {index}")))?;
        let bytes = parse_hex_key(key)?;
        Self::from_bytes(&bytes, None)
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn signer(&self) -> &Arc<PrivateKeySigner> {
        &self.signer
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Wallet {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Wallet {}

// =============================================================================
// WalletService
// =============================================================================

/// Supplies the signer wallets that size the operator's queue pool.
pub trait WalletService: Send + Sync {
    fn operator_wallets(&self) -> ChainResult<Vec<Wallet>>;
}

/// Arc wrapper for WalletService trait objects.
pub type DynWalletService = Arc<dyn WalletService>;

/// Wallet service over a fixed list loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticWalletService {
    wallets: Vec<Wallet>,
}

impl StaticWalletService {
    pub fn new(wallets: Vec<Wallet>) -> Self {
        Self { wallets }
    }

    /// Load one wallet per key source.
    pub fn load(sources: &[KeySource]) -> Result<Self, KeyError> {
        let wallets = sources
            .iter()
            .map(|source| Wallet::load(source, None))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { wallets })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

impl WalletService for StaticWalletService {
    fn operator_wallets(&self) -> ChainResult<Vec<Wallet>> {
        if self.wallets.is_empty() {
            return Err(ChainError::NoWallets);
        }
        Ok(self.wallets.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_load_from_file_with_prefix_and_newline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{TEST_KEY}").unwrap();

        let source = KeySource::File {
            path: file.path().to_path_buf(),
        };
        let wallet = Wallet::load(&source, None).unwrap();

        assert_eq!(wallet.address(), Wallet::dev(0).unwrap().address());
    }

    #[test]
    fn test_load_from_env() {
        std::env::set_var("DEXOP_TEST_WALLET_KEY", TEST_KEY);
        let source = KeySource::Env {
            var_name: "DEXOP_TEST_WALLET_KEY".to_string(),
        };

        let wallet = Wallet::load(&source, None).unwrap();
        assert_eq!(wallet.address(), wallet.signer().address());
    }

    #[test]
    fn test_missing_env_var() {
        let source = KeySource::Env {
            var_name: "DEXOP_TEST_WALLET_KEY_MISSING".to_string(),
        };
        assert!(matches!(
            Wallet::load(&source, None),
            Err(KeyError::EnvVarNotFound(_))
        ));
    }

    #[test]
    fn test_address_mismatch() {
        let bytes = hex::decode(TEST_KEY.trim_start_matches("0x")).unwrap();
        let result = Wallet::from_bytes(&bytes, Some(Address::repeat_byte(0x42)));
        assert!(matches!(result, Err(KeyError::AddressMismatch { .. })));
    }

    #[test]
    fn test_invalid_hex() {
        let source_file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(source_file.path(), "not-hex").unwrap();
        let source = KeySource::File {
            path: source_file.path().to_path_buf(),
        };
        assert!(matches!(
            Wallet::load(&source, None),
            Err(KeyError::HexDecode(_))
        ));
    }

    #[test]
    fn test_dev_wallets_are_distinct() {
        let a = Wallet::dev(0).unwrap();
        let b = Wallet::dev(1).unwrap();
        assert_ne!(a, b);
        tokio_test::assert_err!(Wallet::dev(8));
    }

    #[test]
    fn test_debug_hides_key() {
        let wallet = Wallet::dev(0).unwrap();
        let debug = format!("{wallet:?}");
        assert!(!debug.contains("ac0974bec39a17e3"));
    }

    #[test]
    fn test_static_service_rejects_empty_pool() {
        let service = StaticWalletService::default();
        assert!(matches!(
            service.operator_wallets(),
            Err(ChainError::NoWallets)
        ));
    }

    #[test]
    fn test_key_source_config_shape() {
        #[derive(Deserialize)]
        struct Holder {
            wallets: Vec<KeySource>,
        }
        let holder: Holder = from_json(
            r#"{"wallets":[{"source":"env","var_name":"K1"},{"source":"file","path":"/run/k2"}]}"#,
        );
        assert_eq!(
            holder.wallets[0],
            KeySource::Env {
                var_name: "K1".to_string()
            }
        );
        assert!(matches!(holder.wallets[1], KeySource::File { .. }));
    }

    fn from_json<T: serde::de::DeserializeOwned>(json: &str) -> T {
        serde_json::from_str(json).unwrap()
    }
}
