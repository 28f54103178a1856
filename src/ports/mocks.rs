//! Recording mocks for every port, shared by unit and integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_instruction,
    transaction::VersionedTransaction,
};

use super::block_builder::{
    BlockBuilder, BlockBuilderError, BundleEvent, BundleEventHub, BundleSubscription,
};
use super::network::{LatestBlockhash, NetworkClient, NetworkError, SignatureState};
use super::notify::{NotificationSink, NotifyError};
use super::roster::{RosterError, RosterStore};
use super::swap::{MarketInfo, MarketResolver, SwapBuildError, SwapBuilder};
use crate::domain::wallet::{WalletRecord, WalletUpdate};

/// Starting block height reported by `MockNetwork`
pub const MOCK_START_HEIGHT: u64 = 1_000;

/// Blocks a mock reference hash stays valid for
pub const MOCK_BLOCKHASH_VALIDITY: u64 = 150;

/// A signed 1-lamport self transfer with a unique reference hash
pub fn dummy_transaction(payer: &Keypair) -> VersionedTransaction {
    let ix = system_instruction::transfer(&payer.pubkey(), &payer.pubkey(), 1);
    let message = v0::Message::try_compile(&payer.pubkey(), &[ix], &[], Hash::new_unique())
        .expect("compile dummy message");
    VersionedTransaction::try_new(VersionedMessage::V0(message), &[payer])
        .expect("sign dummy transaction")
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct NetworkState {
    balances: HashMap<Pubkey, u64>,
    default_balance: u64,
    balance_failures: HashMap<Pubkey, u32>,
    token_balances: HashMap<(Pubkey, Pubkey), u64>,
    default_token_balance: Option<u64>,
    send_failures: u32,
    status_script: VecDeque<Option<SignatureState>>,
    status_failures: u32,
    statuses: HashMap<Signature, Option<SignatureState>>,
    sent: Vec<VersionedTransaction>,
    block_height: u64,
    height_step: u64,
    blockhash_failures: u32,
    blockhash_calls: u32,
    balance_calls: u32,
}

impl Default for NetworkState {
    fn default() -> Self {
        Self {
            balances: HashMap::new(),
            default_balance: 0,
            balance_failures: HashMap::new(),
            token_balances: HashMap::new(),
            default_token_balance: None,
            send_failures: 0,
            status_script: VecDeque::new(),
            status_failures: 0,
            statuses: HashMap::new(),
            sent: Vec::new(),
            block_height: MOCK_START_HEIGHT,
            height_step: 1,
            blockhash_failures: 0,
            blockhash_calls: 0,
            balance_calls: 0,
        }
    }
}

/// In-memory chain: scripted balances, sends and confirmations
#[derive(Debug, Clone, Default)]
pub struct MockNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(self, address: Pubkey, lamports: u64) -> Self {
        self.set_balance(address, lamports);
        self
    }

    /// Balance reported for addresses without an explicit entry
    pub fn with_default_balance(self, lamports: u64) -> Self {
        self.state.lock().unwrap().default_balance = lamports;
        self
    }

    /// Fail the next `count` balance queries for `address`
    pub fn with_balance_failures(self, address: Pubkey, count: u32) -> Self {
        self.state.lock().unwrap().balance_failures.insert(address, count);
        self
    }

    pub fn with_token_balance(self, owner: Pubkey, mint: Pubkey, amount: u64) -> Self {
        self.state.lock().unwrap().token_balances.insert((owner, mint), amount);
        self
    }

    /// Token balance for owners without an explicit entry
    pub fn with_default_token_balance(self, amount: u64) -> Self {
        self.state.lock().unwrap().default_token_balance = Some(amount);
        self
    }

    /// Fail the next `count` sends
    pub fn with_send_failures(self, count: u32) -> Self {
        self.state.lock().unwrap().send_failures = count;
        self
    }

    /// Status for each successive send; confirmed once the script runs out
    pub fn with_send_statuses(self, statuses: Vec<Option<SignatureState>>) -> Self {
        self.state.lock().unwrap().status_script = statuses.into();
        self
    }

    /// Fail the next `count` signature status queries
    pub fn with_status_failures(self, count: u32) -> Self {
        self.state.lock().unwrap().status_failures = count;
        self
    }

    /// Blocks added per `block_height` call
    pub fn with_height_step(self, step: u64) -> Self {
        self.state.lock().unwrap().height_step = step;
        self
    }

    /// Fail the next `count` reference hash queries
    pub fn with_blockhash_failures(self, count: u32) -> Self {
        self.state.lock().unwrap().blockhash_failures = count;
        self
    }

    pub fn set_balance(&self, address: Pubkey, lamports: u64) {
        self.state.lock().unwrap().balances.insert(address, lamports);
    }

    pub fn sent_transactions(&self) -> Vec<VersionedTransaction> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn balance_calls(&self) -> u32 {
        self.state.lock().unwrap().balance_calls
    }

    pub fn blockhash_calls(&self) -> u32 {
        self.state.lock().unwrap().blockhash_calls
    }
}

#[async_trait]
impl NetworkClient for MockNetwork {
    async fn balance(&self, address: &Pubkey) -> Result<u64, NetworkError> {
        let mut state = self.state.lock().unwrap();
        state.balance_calls += 1;

        if let Some(remaining) = state.balance_failures.get_mut(address) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(NetworkError::Rpc("mock balance failure".into()));
            }
        }

        Ok(state.balances.get(address).copied().unwrap_or(state.default_balance))
    }

    async fn token_balance(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Option<u64>, NetworkError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .token_balances
            .get(&(*owner, *mint))
            .copied()
            .or(state.default_token_balance))
    }

    async fn send_raw_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, NetworkError> {
        let mut state = self.state.lock().unwrap();
        state.sent.push(transaction.clone());

        if state.send_failures > 0 {
            state.send_failures -= 1;
            return Err(NetworkError::Rejected("mock send failure".into()));
        }

        let signature = transaction.signatures.first().copied().unwrap_or_default();
        let status = state
            .status_script
            .pop_front()
            .unwrap_or(Some(SignatureState::Confirmed));
        state.statuses.insert(signature, status);
        Ok(signature)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureState>, NetworkError> {
        let mut state = self.state.lock().unwrap();
        if state.status_failures > 0 {
            state.status_failures -= 1;
            return Err(NetworkError::Rpc("mock status failure".into()));
        }
        Ok(state.statuses.get(signature).cloned().flatten())
    }

    async fn block_height(&self) -> Result<u64, NetworkError> {
        let mut state = self.state.lock().unwrap();
        state.block_height += state.height_step;
        Ok(state.block_height)
    }

    async fn latest_blockhash(&self) -> Result<LatestBlockhash, NetworkError> {
        let mut state = self.state.lock().unwrap();
        state.blockhash_calls += 1;

        if state.blockhash_failures > 0 {
            state.blockhash_failures -= 1;
            return Err(NetworkError::Rpc("mock blockhash failure".into()));
        }

        Ok(LatestBlockhash {
            hash: Hash::new_unique(),
            last_valid_block_height: state.block_height + MOCK_BLOCKHASH_VALIDITY,
        })
    }
}

// ---------------------------------------------------------------------------
// Block builder
// ---------------------------------------------------------------------------

/// What the mock builder does with the next bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleScript {
    /// Publish an accepted event
    Accept,
    /// Publish a rejected event
    Reject(String),
    /// Publish nothing
    Silent,
    /// Fail the submission call
    Fail(String),
}

#[derive(Debug, Default)]
struct BuilderState {
    script: VecDeque<BundleScript>,
    default_script: Option<BundleScript>,
    submitted: Vec<Vec<VersionedTransaction>>,
    tip_failures: u32,
    next_id: u64,
}

/// Block builder that resolves bundles from a script
#[derive(Debug, Clone)]
pub struct MockBlockBuilder {
    hub: BundleEventHub,
    tip_accounts: Vec<Pubkey>,
    state: Arc<Mutex<BuilderState>>,
}

impl MockBlockBuilder {
    pub fn new() -> Self {
        Self {
            hub: BundleEventHub::new(),
            tip_accounts: (0..8).map(|_| Pubkey::new_unique()).collect(),
            state: Arc::new(Mutex::new(BuilderState::default())),
        }
    }

    /// Outcomes for successive submissions
    pub fn with_script(self, script: Vec<BundleScript>) -> Self {
        self.state.lock().unwrap().script = script.into();
        self
    }

    /// Outcome once the script runs out (accept if unset)
    pub fn with_default(self, script: BundleScript) -> Self {
        self.state.lock().unwrap().default_script = Some(script);
        self
    }

    pub fn with_tip_failures(self, count: u32) -> Self {
        self.state.lock().unwrap().tip_failures = count;
        self
    }

    pub fn tip_account_list(&self) -> &[Pubkey] {
        &self.tip_accounts
    }

    /// Publish an arbitrary event to current subscribers
    pub fn publish(&self, event: BundleEvent) -> usize {
        self.hub.publish(event)
    }

    pub fn submissions(&self) -> Vec<Vec<VersionedTransaction>> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn submit_count(&self) -> usize {
        self.state.lock().unwrap().submitted.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }
}

impl Default for MockBlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlockBuilder for MockBlockBuilder {
    async fn tip_accounts(&self) -> Result<Vec<Pubkey>, BlockBuilderError> {
        let mut state = self.state.lock().unwrap();
        if state.tip_failures > 0 {
            state.tip_failures -= 1;
            return Err(BlockBuilderError::TipAccounts("mock tip failure".into()));
        }
        Ok(self.tip_accounts.clone())
    }

    async fn submit_bundle(
        &self,
        transactions: &[VersionedTransaction],
    ) -> Result<String, BlockBuilderError> {
        let mut state = self.state.lock().unwrap();
        state.submitted.push(transactions.to_vec());
        state.next_id += 1;

        let bundle_id = format!("bundle-{}", state.next_id);
        let script = state
            .script
            .pop_front()
            .or_else(|| state.default_script.clone())
            .unwrap_or(BundleScript::Accept);

        match script {
            BundleScript::Fail(reason) => return Err(BlockBuilderError::Submission(reason)),
            BundleScript::Accept => {
                self.hub.publish(BundleEvent::accepted(bundle_id.clone(), Some(state.next_id)));
            }
            BundleScript::Reject(reason) => {
                self.hub.publish(BundleEvent::rejected(bundle_id.clone(), reason));
            }
            BundleScript::Silent => {}
        }

        Ok(bundle_id)
    }

    fn subscribe(&self) -> BundleSubscription {
        self.hub.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Swap builder and market resolver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapSide {
    Buy,
    Sell,
}

/// One recorded builder call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapCall {
    pub side: SwapSide,
    pub wallet: Pubkey,
    pub amount: u64,
    pub market: Option<MarketInfo>,
}

#[derive(Debug, Default)]
struct SwapState {
    buy_script: VecDeque<bool>,
    sell_script: VecDeque<bool>,
    calls: Vec<SwapCall>,
}

/// Swap builder returning dummy transactions, or `None` when scripted to
#[derive(Debug, Clone, Default)]
pub struct ScriptedSwapBuilder {
    state: Arc<Mutex<SwapState>>,
}

impl ScriptedSwapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `false` entries make successive buys return `None`
    pub fn with_buy_script(self, script: Vec<bool>) -> Self {
        self.state.lock().unwrap().buy_script = script.into();
        self
    }

    pub fn with_sell_script(self, script: Vec<bool>) -> Self {
        self.state.lock().unwrap().sell_script = script.into();
        self
    }

    pub fn calls(&self) -> Vec<SwapCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_for(&self, side: SwapSide) -> Vec<SwapCall> {
        self.calls().into_iter().filter(|c| c.side == side).collect()
    }

    fn build(
        &self,
        side: SwapSide,
        wallet: &Keypair,
        amount: u64,
        market: Option<MarketInfo>,
    ) -> Option<VersionedTransaction> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(SwapCall { side, wallet: wallet.pubkey(), amount, market });

        let produce = match side {
            SwapSide::Buy => state.buy_script.pop_front(),
            SwapSide::Sell => state.sell_script.pop_front(),
        }
        .unwrap_or(true);

        produce.then(|| dummy_transaction(wallet))
    }
}

#[async_trait]
impl SwapBuilder for ScriptedSwapBuilder {
    async fn build_buy(
        &self,
        wallet: &Keypair,
        _mint: &Pubkey,
        lamports: u64,
        market: Option<MarketInfo>,
    ) -> Result<Option<VersionedTransaction>, SwapBuildError> {
        Ok(self.build(SwapSide::Buy, wallet, lamports, market))
    }

    async fn build_sell(
        &self,
        wallet: &Keypair,
        _mint: &Pubkey,
        token_amount: u64,
        market: Option<MarketInfo>,
    ) -> Result<Option<VersionedTransaction>, SwapBuildError> {
        Ok(self.build(SwapSide::Sell, wallet, token_amount, market))
    }

    fn route_name(&self) -> &'static str {
        "scripted"
    }
}

/// Resolver returning a fixed answer
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    market: Option<MarketInfo>,
    calls: Arc<Mutex<Vec<Pubkey>>>,
}

impl StaticResolver {
    pub fn found(market: MarketInfo) -> Self {
        Self { market: Some(market), calls: Arc::default() }
    }

    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Pubkey> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketResolver for StaticResolver {
    async fn resolve(&self, mint: &Pubkey) -> Result<Option<MarketInfo>, SwapBuildError> {
        self.calls.lock().unwrap().push(*mint);
        Ok(self.market)
    }
}

// ---------------------------------------------------------------------------
// Roster and notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RosterState {
    records: Vec<WalletRecord>,
    fail_writes: bool,
    writes: u32,
    upserts: Vec<WalletUpdate>,
}

/// Roster kept in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryRoster {
    state: Arc<Mutex<RosterState>>,
}

impl MemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(self, records: Vec<WalletRecord>) -> Self {
        self.state.lock().unwrap().records = records;
        self
    }

    pub fn with_failing_writes(self) -> Self {
        self.state.lock().unwrap().fail_writes = true;
        self
    }

    pub fn records(&self) -> Vec<WalletRecord> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn write_count(&self) -> u32 {
        self.state.lock().unwrap().writes
    }

    pub fn upserts(&self) -> Vec<WalletUpdate> {
        self.state.lock().unwrap().upserts.clone()
    }
}

#[async_trait]
impl RosterStore for MemoryRoster {
    async fn read_all(&self) -> Result<Vec<WalletRecord>, RosterError> {
        Ok(self.records())
    }

    async fn write_all(&self, records: &[WalletRecord]) -> Result<(), RosterError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(RosterError::Write("mock write failure".into()));
        }
        state.writes += 1;
        state.records = records.to_vec();
        Ok(())
    }

    async fn upsert(&self, update: &WalletUpdate) -> Result<(), RosterError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(RosterError::Write("mock write failure".into()));
        }
        state.upserts.push(update.clone());
        let record = state
            .records
            .iter_mut()
            .find(|r| r.public_address == update.public_address)
            .ok_or_else(|| RosterError::UnknownWallet(update.public_address.clone()))?;
        record.apply(update);
        Ok(())
    }
}

/// Sink that keeps every message
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    messages: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record messages but report every delivery as failed
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        self.messages.lock().unwrap().push(message.to_string());
        if self.fail {
            return Err(NotifyError::Delivery("mock delivery failure".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_network_scripted_balance() {
        let who = Pubkey::new_unique();
        let network = MockNetwork::new()
            .with_balance(who, 42)
            .with_balance_failures(who, 1);

        assert!(network.balance(&who).await.is_err());
        assert_eq!(network.balance(&who).await.unwrap(), 42);
        assert_eq!(network.balance(&Pubkey::new_unique()).await.unwrap(), 0);
        assert_eq!(network.balance_calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_network_send_and_status() {
        let payer = Keypair::new();
        let network = MockNetwork::new()
            .with_send_statuses(vec![Some(SignatureState::Failed("custom".into()))]);

        let first = network.send_raw_transaction(&dummy_transaction(&payer)).await.unwrap();
        let second = network.send_raw_transaction(&dummy_transaction(&payer)).await.unwrap();

        assert_eq!(
            network.signature_status(&first).await.unwrap(),
            Some(SignatureState::Failed("custom".into()))
        );
        assert_eq!(
            network.signature_status(&second).await.unwrap(),
            Some(SignatureState::Confirmed)
        );
        assert_eq!(network.sent_transactions().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_builder_publishes_scripted_events() {
        let builder = MockBlockBuilder::new()
            .with_script(vec![BundleScript::Fail("down".into()), BundleScript::Reject("sim".into())]);
        let mut sub = builder.subscribe();
        let payer = Keypair::new();

        assert!(builder.submit_bundle(&[dummy_transaction(&payer)]).await.is_err());
        let id = builder.submit_bundle(&[dummy_transaction(&payer)]).await.unwrap();

        assert_eq!(sub.recv().await, Some(BundleEvent::rejected(id, "sim")));
        assert_eq!(builder.submit_count(), 2);
    }

    #[tokio::test]
    async fn test_memory_roster_upsert_unknown_wallet() {
        let roster = MemoryRoster::new();
        let result = roster.upsert(&WalletUpdate::new("nobody")).await;
        assert!(matches!(result, Err(RosterError::UnknownWallet(_))));
    }

    #[tokio::test]
    async fn test_scripted_swap_builder() {
        let builder = ScriptedSwapBuilder::new().with_buy_script(vec![false]);
        let wallet = Keypair::new();
        let mint = Pubkey::new_unique();

        assert!(builder.build_buy(&wallet, &mint, 10, None).await.unwrap().is_none());
        assert!(builder.build_buy(&wallet, &mint, 10, None).await.unwrap().is_some());
        assert_eq!(builder.calls_for(SwapSide::Buy).len(), 2);
    }
}
