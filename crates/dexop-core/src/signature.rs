//! ECDSA signatures over exchange object hashes.
//!
//! Orders, trades and stop orders are signed as Ethereum personal messages:
//! `keccak256("\x19Ethereum Signed Message:\n32" || hash)`. The exchange
//! contract recovers the signer from `{V, R, S}` with `V` in `{27, 28}`.

use alloy::primitives::{keccak256, Address, PrimitiveSignature, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::wire;

const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Hash actually signed for an exchange object hash.
pub fn personal_message_hash(hash: B256) -> B256 {
    let mut data = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + 32);
    data.extend_from_slice(PERSONAL_MESSAGE_PREFIX);
    data.extend_from_slice(hash.as_slice());
    keccak256(&data)
}

/// Recoverable signature in exchange contract layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(rename = "V")]
    pub v: u8,
    #[serde(rename = "R", with = "wire::b256")]
    pub r: B256,
    #[serde(rename = "S", with = "wire::b256")]
    pub s: B256,
}

impl Signature {
    /// Sign `hash` as a personal message.
    pub fn sign(hash: B256, signer: &PrivateKeySigner) -> CoreResult<Self> {
        let signature = signer
            .sign_hash_sync(&personal_message_hash(hash))
            .map_err(|e| CoreError::Signing(e.to_string()))?;

        Ok(Self {
            // alloy reports the raw recovery id as a bool
            v: 27 + u8::from(signature.v()),
            r: B256::from(signature.r().to_be_bytes::<32>()),
            s: B256::from(signature.s().to_be_bytes::<32>()),
        })
    }

    /// Recover the address that signed `hash`.
    pub fn recover(&self, hash: B256) -> CoreResult<Address> {
        let y_parity = match self.v {
            0 | 27 => false,
            1 | 28 => true,
            other => {
                return Err(CoreError::InvalidSignature(format!(
                    "unsupported recovery id {other}"
                )))
            }
        };

        let signature = PrimitiveSignature::new(
            U256::from_be_bytes(self.r.0),
            U256::from_be_bytes(self.s.0),
            y_parity,
        );

        signature
            .recover_address_from_prehash(&personal_message_hash(hash))
            .map_err(|e| CoreError::InvalidSignature(e.to_string()))
    }

    /// Whether this signature over `hash` was produced by `expected`.
    ///
    /// Malformed signatures are reported as not matching.
    #[must_use]
    pub fn is_signed_by(&self, hash: B256, expected: Address) -> bool {
        self.recover(hash).map(|a| a == expected).unwrap_or(false)
    }
}

#[cfg(test)]
pub(crate) mod test_keys {
    use alloy::signers::local::PrivateKeySigner;

    /// Anvil development keys; never funded outside local chains.
    pub const KEYS: [&str; 3] = [
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
        "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    ];

    pub fn signer(index: usize) -> PrivateKeySigner {
        let bytes = hex::decode(KEYS[index]).unwrap();
        PrivateKeySigner::from_slice(&bytes).unwrap()
    }
}
