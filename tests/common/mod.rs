//! Shared in-memory wallet for integration tests.
//!
//! `StubWallet` plays both the injected wallet and the token contract: calls
//! are ABI-decoded and answered from an in-memory ledger, transactions are
//! applied when their receipt is awaited. Receipts and balance reads can be
//! held back so tests control completion order.

#![allow(dead_code)]

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use alloy::sol_types::{SolInterface, SolValue};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, Semaphore};

use erc20_minter::token::IToken::ITokenCalls;
use erc20_minter::wallet::{AccountsListener, ListenerId, Receipt, WalletProvider};
use erc20_minter::{Coordinator, MinterError, MinterResult, ProviderAdapter};

pub const TOKEN: Address = Address::repeat_byte(0x70);

pub fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

pub fn bob() -> Address {
    Address::repeat_byte(0xb0)
}

/// `n` whole tokens at 18 decimals.
pub fn tokens(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

enum Effect {
    Mint(Address, U256),
    Burn(Address, U256),
    Transfer(Address, Address, U256),
}

struct Ledger {
    name: String,
    symbol: String,
    decimals: u8,
    total_supply: U256,
    balances: HashMap<Address, U256>,
    pending: HashMap<TxHash, Effect>,
    dropped: HashSet<TxHash>,
    sent: Vec<(Address, TxHash)>,
}

pub struct StubWallet {
    ledger: Mutex<Ledger>,
    accounts: Mutex<Vec<Address>>,
    reject_connect: Mutex<bool>,
    drop_next: Mutex<bool>,
    fail_balance_reads: Mutex<bool>,
    scripted_balances: Mutex<VecDeque<U256>>,
    balance_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    decimals_gate: Mutex<Option<oneshot::Receiver<()>>>,
    receipt_gate: Mutex<Option<Arc<Semaphore>>>,
    listeners: Mutex<HashMap<u64, AccountsListener>>,
    next_listener: AtomicU64,
    next_tx: AtomicU64,
    contract_calls: AtomicUsize,
    balance_reads: AtomicUsize,
    decimals_reads: AtomicUsize,
}

impl StubWallet {
    pub fn new(accounts: Vec<Address>) -> Arc<Self> {
        Arc::new(Self {
            ledger: Mutex::new(Ledger {
                name: "DG Token".to_string(),
                symbol: "DG".to_string(),
                decimals: 18,
                total_supply: U256::ZERO,
                balances: HashMap::new(),
                pending: HashMap::new(),
                dropped: HashSet::new(),
                sent: Vec::new(),
            }),
            accounts: Mutex::new(accounts),
            reject_connect: Mutex::new(false),
            drop_next: Mutex::new(false),
            fail_balance_reads: Mutex::new(false),
            scripted_balances: Mutex::new(VecDeque::new()),
            balance_gates: Mutex::new(VecDeque::new()),
            decimals_gate: Mutex::new(None),
            receipt_gate: Mutex::new(None),
            listeners: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
            next_tx: AtomicU64::new(1),
            contract_calls: AtomicUsize::new(0),
            balance_reads: AtomicUsize::new(0),
            decimals_reads: AtomicUsize::new(0),
        })
    }

    pub fn set_decimals(&self, decimals: u8) {
        self.ledger.lock().unwrap().decimals = decimals;
    }

    pub fn set_balance(&self, account: Address, amount: U256) {
        let mut ledger = self.ledger.lock().unwrap();
        let previous = ledger.balances.insert(account, amount).unwrap_or_default();
        ledger.total_supply = ledger.total_supply - previous + amount;
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.ledger.lock().unwrap().balances.get(&account).copied().unwrap_or_default()
    }

    pub fn total_supply(&self) -> U256 {
        self.ledger.lock().unwrap().total_supply
    }

    /// Transactions sent so far as `(from, hash)`.
    pub fn sent(&self) -> Vec<(Address, TxHash)> {
        self.ledger.lock().unwrap().sent.clone()
    }

    pub fn reject_connect(&self) {
        *self.reject_connect.lock().unwrap() = true;
    }

    /// The next sent transaction never gets mined.
    pub fn drop_next_transaction(&self) {
        *self.drop_next.lock().unwrap() = true;
    }

    pub fn fail_balance_reads(&self, fail: bool) {
        *self.fail_balance_reads.lock().unwrap() = fail;
    }

    /// Answer upcoming `getUserBalance` reads with these values, in issue order.
    pub fn script_balances(&self, values: impl IntoIterator<Item = U256>) {
        self.scripted_balances.lock().unwrap().extend(values);
    }

    /// Hold the next `getUserBalance` read until the returned sender fires.
    pub fn gate_next_balance_read(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.balance_gates.lock().unwrap().push_back(rx);
        tx
    }

    /// Hold all receipts until released.
    pub fn hold_receipts(&self) {
        *self.receipt_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_receipts(&self, n: usize) {
        if let Some(gate) = self.receipt_gate.lock().unwrap().as_ref() {
            gate.add_permits(n);
        }
    }

    /// Calls and transactions that reached the wallet.
    pub fn contract_calls(&self) -> usize {
        self.contract_calls.load(Ordering::SeqCst)
    }

    pub fn balance_reads(&self) -> usize {
        self.balance_reads.load(Ordering::SeqCst)
    }

    /// Hold the next `decimals` read until the returned sender fires.
    pub fn gate_next_decimals_read(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.decimals_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn decimals_reads(&self) -> usize {
        self.decimals_reads.load(Ordering::SeqCst)
    }

    /// Emit `accountsChanged`.
    pub fn emit_accounts(&self, accounts: Vec<Address>) {
        *self.accounts.lock().unwrap() = accounts.clone();
        let listeners: Vec<_> = self.listeners.lock().unwrap().values().cloned().collect();
        for listener in listeners {
            listener(&accounts);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    fn encode_read(&self, from: Option<Address>, call: ITokenCalls) -> MinterResult<Bytes> {
        let ledger = self.ledger.lock().unwrap();
        let out = match call {
            ITokenCalls::name(_) => (ledger.name.clone(),).abi_encode_params(),
            ITokenCalls::symbol(_) => (ledger.symbol.clone(),).abi_encode_params(),
            ITokenCalls::decimals(_) => <(alloy::sol_types::sol_data::Uint<8>,) as alloy::sol_types::SolType>::abi_encode_params(&(ledger.decimals,)),
            ITokenCalls::totalSupply(_) => (ledger.total_supply,).abi_encode_params(),
            ITokenCalls::getUserBalance(_) => {
                let account = from.unwrap_or(Address::ZERO);
                (ledger.balances.get(&account).copied().unwrap_or_default(),).abi_encode_params()
            }
            _ => return Err(MinterError::Rpc("not a view method".to_string())),
        };
        Ok(out.into())
    }

    fn apply(&self, effect: Effect) -> bool {
        let mut ledger = self.ledger.lock().unwrap();
        match effect {
            Effect::Mint(to, amount) => {
                *ledger.balances.entry(to).or_default() += amount;
                ledger.total_supply += amount;
                true
            }
            Effect::Burn(from, amount) => {
                let balance = ledger.balances.get(&from).copied().unwrap_or_default();
                if balance < amount {
                    return false;
                }
                ledger.balances.insert(from, balance - amount);
                ledger.total_supply -= amount;
                true
            }
            Effect::Transfer(from, to, amount) => {
                let balance = ledger.balances.get(&from).copied().unwrap_or_default();
                if balance < amount {
                    return false;
                }
                ledger.balances.insert(from, balance - amount);
                *ledger.balances.entry(to).or_default() += amount;
                true
            }
        }
    }
}

#[async_trait]
impl WalletProvider for StubWallet {
    async fn request_accounts(&self) -> MinterResult<Vec<Address>> {
        if *self.reject_connect.lock().unwrap() {
            return Err(MinterError::UserRejected);
        }
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn accounts(&self) -> MinterResult<Vec<Address>> {
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn chain_id(&self) -> MinterResult<u64> {
        Ok(31337)
    }

    async fn call(&self, from: Option<Address>, to: Address, data: Bytes) -> MinterResult<Bytes> {
        self.contract_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(to, TOKEN);
        let call = ITokenCalls::abi_decode(&data).map_err(|e| MinterError::Rpc(e.to_string()))?;

        if matches!(call, ITokenCalls::decimals(_)) {
            self.decimals_reads.fetch_add(1, Ordering::SeqCst);
            let gate = self.decimals_gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
        }

        if !matches!(call, ITokenCalls::getUserBalance(_)) {
            return self.encode_read(from, call);
        }

        self.balance_reads.fetch_add(1, Ordering::SeqCst);
        let scripted = self.scripted_balances.lock().unwrap().pop_front();
        let gate = self.balance_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if *self.fail_balance_reads.lock().unwrap() {
            return Err(MinterError::Rpc("balance unavailable".to_string()));
        }
        match scripted {
            Some(value) => Ok((value,).abi_encode_params().into()),
            None => self.encode_read(from, call),
        }
    }

    async fn send_transaction(&self, from: Address, to: Address, data: Bytes) -> MinterResult<TxHash> {
        self.contract_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(to, TOKEN);
        if !self.accounts.lock().unwrap().contains(&from) {
            return Err(MinterError::Wallet(format!("{} not authorized", from)));
        }

        let effect = match ITokenCalls::abi_decode(&data).map_err(|e| MinterError::Rpc(e.to_string()))? {
            ITokenCalls::mint(c) => Effect::Mint(from, c.amount),
            ITokenCalls::burnToken(c) => Effect::Burn(from, c.amount),
            ITokenCalls::transfer(c) => Effect::Transfer(from, c.to, c.amount),
            _ => return Err(MinterError::Rpc("not a write method".to_string())),
        };

        let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
        let hash = B256::left_padding_from(&n.to_be_bytes());
        let drop_it = std::mem::take(&mut *self.drop_next.lock().unwrap());

        let mut ledger = self.ledger.lock().unwrap();
        ledger.sent.push((from, hash));
        if drop_it {
            ledger.dropped.insert(hash);
        } else {
            ledger.pending.insert(hash, effect);
        }
        Ok(hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> MinterResult<Receipt> {
        let gate = self.receipt_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|_| MinterError::Rpc("gate closed".to_string()))?
                .forget();
        }

        let effect = {
            let mut ledger = self.ledger.lock().unwrap();
            if ledger.dropped.contains(&tx_hash) {
                return Err(MinterError::TxDropped(tx_hash.to_string()));
            }
            ledger.pending.remove(&tx_hash)
        };
        let effect = effect.ok_or_else(|| MinterError::TxDropped(tx_hash.to_string()))?;
        let success = self.apply(effect);
        let block = self.next_tx.load(Ordering::SeqCst) + 100;

        Ok(Receipt {
            tx_hash,
            block_number: Some(block),
            success,
        })
    }

    fn on_accounts_changed(&self, listener: AccountsListener) -> ListenerId {
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().insert(id, listener);
        ListenerId(id)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.lock().unwrap().remove(&id.0).is_some()
    }
}

/// A coordinator over a fresh stub with `alice` as the wallet's account.
pub fn coordinator_with_stub() -> (Arc<Coordinator>, Arc<StubWallet>) {
    let stub = StubWallet::new(vec![alice()]);
    let provider: Arc<dyn WalletProvider> = stub.clone();
    let adapter = ProviderAdapter::new(Some(provider));
    (Coordinator::create(adapter, TOKEN, 4), stub)
}

/// Same as [`coordinator_with_stub`], already connected.
pub async fn connected_coordinator() -> (Arc<Coordinator>, Arc<StubWallet>) {
    let (coordinator, stub) = coordinator_with_stub();
    coordinator.connect().await.expect("connect");
    (coordinator, stub)
}
