//! Typed handle on the deployed token contract.
//!
//! Reads go through a [`WalletReader`] and need no account. Writes need a
//! [`WalletSigner`]; a binding without one fails writes with `NotConnected`.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolCall;

use crate::error::{MinterError, MinterResult};
use crate::token::abi::IToken;
use crate::wallet::{Receipt, WalletReader, WalletSigner};

/// A submitted transaction. The hash is known immediately.
#[derive(Clone)]
pub struct TxHandle {
    hash: TxHash,
    reader: WalletReader,
}

impl TxHandle {
    pub fn hash(&self) -> TxHash {
        self.hash
    }

    /// Wait until the transaction is mined.
    ///
    /// A mined-but-reverted transaction is reported as `TxReverted`.
    pub async fn wait(self) -> MinterResult<Receipt> {
        let receipt = self.reader.wait_for_receipt(self.hash).await?;
        if !receipt.success {
            return Err(MinterError::TxReverted(match receipt.block_number {
                Some(block) => format!("{} in block {}", self.hash, block),
                None => self.hash.to_string(),
            }));
        }
        tracing::debug!(tx_hash = %self.hash, block = ?receipt.block_number, "Transaction mined");
        Ok(receipt)
    }
}

impl std::fmt::Debug for TxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxHandle").field("hash", &self.hash).finish()
    }
}

/// Contract binding for one token address.
#[derive(Clone)]
pub struct TokenContract {
    address: Address,
    reader: WalletReader,
    signer: Option<WalletSigner>,
}

impl TokenContract {
    pub fn new(address: Address, reader: WalletReader, signer: Option<WalletSigner>) -> Self {
        Self {
            address,
            reader,
            signer,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Account writes are signed by, if any.
    pub fn account(&self) -> Option<Address> {
        self.signer.as_ref().map(WalletSigner::address)
    }

    /// Execute a view method. Never mutates chain state.
    pub async fn read<C: SolCall>(&self, call: &C) -> MinterResult<C::Return> {
        let data = Bytes::from(call.abi_encode());
        let output = self.reader.call(self.account(), self.address, data).await?;
        C::abi_decode_returns(&output)
            .map_err(|e| MinterError::Decode(format!("{}: {}", C::SIGNATURE, e)))
    }

    /// Submit a state-changing call.
    pub async fn write<C: SolCall>(&self, call: &C) -> MinterResult<TxHandle> {
        let signer = self.signer.as_ref().ok_or(MinterError::NotConnected)?;
        let hash = signer
            .send_transaction(self.address, Bytes::from(call.abi_encode()))
            .await?;
        tracing::info!(
            tx_hash = %hash,
            method = C::SIGNATURE,
            from = %signer.address(),
            "Transaction submitted"
        );
        Ok(TxHandle {
            hash,
            reader: self.reader.clone(),
        })
    }

    pub async fn name(&self) -> MinterResult<String> {
        self.read(&IToken::nameCall {}).await
    }

    pub async fn symbol(&self) -> MinterResult<String> {
        self.read(&IToken::symbolCall {}).await
    }

    pub async fn decimals(&self) -> MinterResult<u8> {
        self.read(&IToken::decimalsCall {}).await
    }

    pub async fn total_supply(&self) -> MinterResult<U256> {
        self.read(&IToken::totalSupplyCall {}).await
    }

    /// Balance of the bound account. Without one the contract sees the zero
    /// address as caller.
    pub async fn user_balance(&self) -> MinterResult<U256> {
        self.read(&IToken::getUserBalanceCall {}).await
    }

    pub async fn mint(&self, amount: U256) -> MinterResult<TxHandle> {
        self.write(&IToken::mintCall { amount }).await
    }

    pub async fn burn_token(&self, amount: U256) -> MinterResult<TxHandle> {
        self.write(&IToken::burnTokenCall { amount }).await
    }

    pub async fn transfer(&self, to: Address, amount: U256) -> MinterResult<TxHandle> {
        self.write(&IToken::transferCall { to, amount }).await
    }
}

impl std::fmt::Debug for TokenContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenContract")
            .field("address", &self.address)
            .field("account", &self.account())
            .finish()
    }
}
