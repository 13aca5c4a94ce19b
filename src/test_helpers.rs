//! In-process doubles for the wallet and the game contract.

use crate::{
    U256,
    account::Account,
    client::AppController,
    contract::{
        ContractConnector,
        GameContract,
        PendingTransaction,
        RawCatalog,
        RawPlayerInfo,
        Receipt,
    },
    error::{
        BindingError,
        CallError,
        ProviderError,
    },
    wallet::{
        WalletConnector,
        WalletProvider,
    },
};
use std::{
    collections::{
        HashMap,
        VecDeque,
    },
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
    },
};
use tokio::sync::oneshot;

#[derive(Debug, Default)]
struct WalletState {
    accounts: Vec<Account>,
    authorized: bool,
    reject_requests: bool,
    failure: Option<ProviderError>,
}

/// Wallet double. Clones share state so a test can flip accounts while a
/// connector holds another copy.
#[derive(Clone, Debug, Default)]
pub struct FakeWallet {
    state: Arc<Mutex<WalletState>>,
}

impl FakeWallet {
    /// Wallet whose accounts are already authorized for this client.
    pub fn authorized<I, A>(accounts: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Account>,
    {
        let wallet = Self::unauthorized(accounts);
        wallet.lock().authorized = true;
        wallet
    }

    /// Wallet that only exposes its accounts after an explicit request.
    pub fn unauthorized<I, A>(accounts: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Account>,
    {
        let state = WalletState {
            accounts: accounts.into_iter().map(Into::into).collect(),
            ..WalletState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn failing(err: ProviderError) -> Self {
        let wallet = Self::default();
        wallet.lock().failure = Some(err);
        wallet
    }

    pub fn rejecting_requests(self) -> Self {
        self.lock().reject_requests = true;
        self
    }

    pub fn switch_account(&self, account: impl Into<Account>) {
        let mut state = self.lock();
        state.accounts = vec![account.into()];
        state.authorized = true;
    }

    pub fn revoke_all(&self) {
        self.lock().authorized = false;
    }

    fn lock(&self) -> MutexGuard<'_, WalletState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WalletProvider for FakeWallet {
    async fn accounts(&self) -> Result<Vec<Account>, ProviderError> {
        let state = self.lock();
        if let Some(err) = &state.failure {
            return Err(err.clone());
        }
        if state.authorized {
            Ok(state.accounts.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn request_accounts(&self) -> Result<Vec<Account>, ProviderError> {
        let mut state = self.lock();
        if let Some(err) = &state.failure {
            return Err(err.clone());
        }
        if state.reject_requests {
            return Err(ProviderError::UserRejected);
        }
        state.authorized = true;
        Ok(state.accounts.clone())
    }
}

#[derive(Clone, Debug)]
enum ChainOp {
    RegisterPlayer {
        player: Account,
        username: String,
    },
    UpdateScore {
        player: Account,
        score: U256,
    },
    CreateAchievement {
        caller: Account,
        name: String,
        image_uri: String,
        required_score: U256,
        max_supply: U256,
    },
}

struct QueuedTx {
    hash: String,
    op: ChainOp,
    revert: bool,
    notify: oneshot::Sender<Result<Receipt, CallError>>,
}

struct ChainState {
    owner: Account,
    players: HashMap<Account, RawPlayerInfo>,
    catalog: RawCatalog,
    catalog_override: Option<RawCatalog>,
    queue: VecDeque<QueuedTx>,
    manual_mining: bool,
    submitted: usize,
    block_number: u64,
    connect_failure: Option<String>,
    read_failure: Option<CallError>,
    reject_next_signature: bool,
    revert_next: bool,
}

impl ChainState {
    fn new(owner: Account) -> Self {
        Self {
            owner,
            players: HashMap::new(),
            catalog: RawCatalog::default(),
            catalog_override: None,
            queue: VecDeque::new(),
            manual_mining: false,
            submitted: 0,
            block_number: 0,
            connect_failure: None,
            read_failure: None,
            reject_next_signature: false,
            revert_next: false,
        }
    }

    fn execute(&mut self, op: ChainOp) -> Result<(), ()> {
        match op {
            ChainOp::RegisterPlayer { player, username } => {
                let entry = self.players.entry(player).or_default();
                if username.is_empty() || !entry.username.is_empty() {
                    return Err(());
                }
                entry.username = username;
            }
            ChainOp::UpdateScore { player, score } => {
                let entry = self.players.get_mut(&player).ok_or(())?;
                if entry.username.is_empty() {
                    return Err(());
                }
                entry.total_games = entry.total_games.checked_add(U256::from(1)).ok_or(())?;
                if score > entry.high_score {
                    entry.high_score = score;
                }
                let catalog = &mut self.catalog;
                for id in 0..catalog.names.len() {
                    let owned = entry.owned_nfts.contains(&U256::from(id as u64));
                    let reached = entry.high_score >= catalog.required_scores[id];
                    let available = catalog.current_supplies[id] < catalog.max_supplies[id];
                    if !owned && reached && available {
                        entry.owned_nfts.push(U256::from(id as u64));
                        catalog.current_supplies[id] = catalog.current_supplies[id]
                            .checked_add(U256::from(1))
                            .ok_or(())?;
                    }
                }
            }
            ChainOp::CreateAchievement {
                caller,
                name,
                image_uri,
                required_score,
                max_supply,
            } => {
                if caller != self.owner {
                    return Err(());
                }
                self.catalog.names.push(name);
                self.catalog.image_uris.push(image_uri);
                self.catalog.required_scores.push(required_score);
                self.catalog.max_supplies.push(max_supply);
                self.catalog.current_supplies.push(U256::ZERO);
            }
        }
        Ok(())
    }
}

/// Contract double with the game's rules and controllable mining.
///
/// By default a transaction is mined as soon as it is awaited. With
/// [`InMemoryChain::with_manual_mining`] it stays pending until
/// [`InMemoryChain::mine_next`] is called.
#[derive(Clone)]
pub struct InMemoryChain {
    state: Arc<Mutex<ChainState>>,
}

impl InMemoryChain {
    pub fn new(owner: impl Into<Account>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState::new(owner.into()))),
        }
    }

    pub fn with_manual_mining(self) -> Self {
        self.lock().manual_mining = true;
        self
    }

    pub fn seed_player(
        &self,
        account: &Account,
        username: &str,
        high_score: u64,
        total_games: u64,
    ) {
        self.seed_raw_player(
            account,
            RawPlayerInfo {
                username: username.to_string(),
                high_score: U256::from(high_score),
                total_games: U256::from(total_games),
                owned_nfts: Vec::new(),
            },
        );
    }

    pub fn seed_raw_player(&self, account: &Account, info: RawPlayerInfo) {
        self.lock().players.insert(account.clone(), info);
    }

    pub fn seed_achievement(&self, name: &str, required_score: u64, max_supply: u64) {
        let mut state = self.lock();
        state.catalog.names.push(name.to_string());
        state
            .catalog
            .image_uris
            .push(format!("ipfs://{}", name.to_lowercase().replace(' ', "-")));
        state.catalog.required_scores.push(U256::from(required_score));
        state.catalog.max_supplies.push(U256::from(max_supply));
        state.catalog.current_supplies.push(U256::ZERO);
    }

    /// Serve `raw` from `getAllAchievements` instead of the real catalog.
    pub fn serve_catalog(&self, raw: RawCatalog) {
        self.lock().catalog_override = Some(raw);
    }

    pub fn fail_connections(&self, reason: &str) {
        self.lock().connect_failure = Some(reason.to_string());
    }

    pub fn fail_reads(&self, err: Option<CallError>) {
        self.lock().read_failure = err;
    }

    pub fn reject_next_signature(&self) {
        self.lock().reject_next_signature = true;
    }

    pub fn revert_next_transaction(&self) {
        self.lock().revert_next = true;
    }

    pub fn submitted_transactions(&self) -> usize {
        self.lock().submitted
    }

    pub fn pending_transactions(&self) -> usize {
        self.lock().queue.len()
    }

    /// Mine the oldest pending transaction. Returns `false` when none is queued.
    pub fn mine_next(&self) -> bool {
        let mut state = self.lock();
        let Some(tx) = state.queue.pop_front() else {
            return false;
        };
        state.block_number += 1;
        let result = if tx.revert || state.execute(tx.op).is_err() {
            Err(CallError::Reverted { hash: tx.hash.clone() })
        } else {
            Ok(Receipt {
                hash: tx.hash,
                block_number: Some(state.block_number),
            })
        };
        let _ = tx.notify.send(result);
        true
    }

    fn mine_all(&self) {
        while self.mine_next() {}
    }

    fn submit(&self, op: ChainOp) -> Result<InMemoryPending, CallError> {
        let mut state = self.lock();
        if std::mem::take(&mut state.reject_next_signature) {
            return Err(CallError::UserRejected);
        }
        state.submitted += 1;
        let hash = format!("0x{:064x}", state.submitted);
        let revert = std::mem::take(&mut state.revert_next);
        let (notify, receiver) = oneshot::channel();
        state.queue.push_back(QueuedTx {
            hash: hash.clone(),
            op,
            revert,
            notify,
        });
        Ok(InMemoryPending {
            chain: self.clone(),
            hash,
            receiver,
        })
    }

    fn read_guard(&self) -> Result<MutexGuard<'_, ChainState>, CallError> {
        let state = self.lock();
        match &state.read_failure {
            Some(err) => Err(err.clone()),
            None => Ok(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ContractConnector for InMemoryChain {
    type Contract = InMemoryContract;

    fn connect(
        &self,
        _address: &Account,
        signer: &Account,
    ) -> Result<Self::Contract, BindingError> {
        if let Some(reason) = &self.lock().connect_failure {
            return Err(BindingError::Transport(reason.clone()));
        }
        Ok(InMemoryContract {
            chain: self.clone(),
            signer: signer.clone(),
        })
    }
}

#[derive(Clone)]
pub struct InMemoryContract {
    chain: InMemoryChain,
    signer: Account,
}

pub struct InMemoryPending {
    chain: InMemoryChain,
    hash: String,
    receiver: oneshot::Receiver<Result<Receipt, CallError>>,
}

impl PendingTransaction for InMemoryPending {
    fn hash(&self) -> &str {
        &self.hash
    }

    async fn wait(self) -> Result<Receipt, CallError> {
        if !self.chain.lock().manual_mining {
            self.chain.mine_all();
        }
        self.receiver
            .await
            .map_err(|_| CallError::Transport("pending transaction dropped".into()))?
    }
}

impl GameContract for InMemoryContract {
    type Pending = InMemoryPending;

    async fn get_owner(&self) -> Result<Account, CallError> {
        Ok(self.chain.read_guard()?.owner.clone())
    }

    async fn get_player_info(&self, player: &Account) -> Result<RawPlayerInfo, CallError> {
        let state = self.chain.read_guard()?;
        Ok(state.players.get(player).cloned().unwrap_or_default())
    }

    async fn get_all_achievements(&self) -> Result<RawCatalog, CallError> {
        let state = self.chain.read_guard()?;
        Ok(state
            .catalog_override
            .clone()
            .unwrap_or_else(|| state.catalog.clone()))
    }

    async fn register_player(&self, username: &str) -> Result<InMemoryPending, CallError> {
        self.chain.submit(ChainOp::RegisterPlayer {
            player: self.signer.clone(),
            username: username.to_string(),
        })
    }

    async fn update_score(&self, score: U256) -> Result<InMemoryPending, CallError> {
        self.chain.submit(ChainOp::UpdateScore {
            player: self.signer.clone(),
            score,
        })
    }

    async fn create_achievement(
        &self,
        name: &str,
        image_uri: &str,
        required_score: U256,
        max_supply: U256,
    ) -> Result<InMemoryPending, CallError> {
        self.chain.submit(ChainOp::CreateAchievement {
            caller: self.signer.clone(),
            name: name.to_string(),
            image_uri: image_uri.to_string(),
            required_score,
            max_supply,
        })
    }
}

/// A chain with an owner and a player account, plus wallets for either.
pub struct TestContext {
    chain: InMemoryChain,
    owner: Account,
    alice: Account,
}

impl TestContext {
    pub fn new() -> Self {
        let owner = Account::new("0x00000000000000000000000000000000000000Aa");
        let alice = Account::new("0x0000000000000000000000000000000000000111");
        Self {
            chain: InMemoryChain::new(owner.clone()),
            owner,
            alice,
        }
    }

    pub fn chain(&self) -> InMemoryChain {
        self.chain.clone()
    }

    pub fn owner(&self) -> Account {
        self.owner.clone()
    }

    pub fn alice(&self) -> Account {
        self.alice.clone()
    }

    pub fn wallet_for(&self, account: &Account) -> FakeWallet {
        FakeWallet::authorized([account.clone()])
    }

    pub fn controller(&self, wallet: FakeWallet) -> AppController<FakeWallet, InMemoryChain> {
        AppController::new(WalletConnector::with_provider(wallet), self.chain())
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
