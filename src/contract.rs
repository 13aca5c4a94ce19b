use crate::{
    GAME_CONTRACT_ADDRESS,
    U256,
    account::Account,
    error::{
        BindingError,
        CallError,
    },
    wallet::Session,
};
use tracing::info;

/// `getPlayerInfo(address)` as it comes off the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawPlayerInfo {
    pub username: String,
    pub high_score: U256,
    pub total_games: U256,
    pub owned_nfts: Vec<U256>,
}

/// `getAllAchievements()` as five parallel arrays.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawCatalog {
    pub names: Vec<String>,
    pub image_uris: Vec<String>,
    pub required_scores: Vec<U256>,
    pub max_supplies: Vec<U256>,
    pub current_supplies: Vec<U256>,
}

/// A transaction that has settled on chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub hash: String,
    pub block_number: Option<u64>,
}

/// Handle for a submitted write. Acceptance into the pending pool is not
/// success; only `wait` resolving to `Ok` is.
pub trait PendingTransaction {
    fn hash(&self) -> &str;

    fn wait(self) -> impl Future<Output = Result<Receipt, CallError>>;
}

/// Fixed ABI of the game contract.
pub trait GameContract {
    type Pending: PendingTransaction;

    fn get_owner(&self) -> impl Future<Output = Result<Account, CallError>>;

    fn get_player_info(
        &self,
        player: &Account,
    ) -> impl Future<Output = Result<RawPlayerInfo, CallError>>;

    fn get_all_achievements(&self) -> impl Future<Output = Result<RawCatalog, CallError>>;

    fn register_player(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Self::Pending, CallError>>;

    fn update_score(
        &self,
        score: U256,
    ) -> impl Future<Output = Result<Self::Pending, CallError>>;

    fn create_achievement(
        &self,
        name: &str,
        image_uri: &str,
        required_score: U256,
        max_supply: U256,
    ) -> impl Future<Output = Result<Self::Pending, CallError>>;
}

/// Builds contract clients signing as a given account.
pub trait ContractConnector {
    type Contract: GameContract;

    fn connect(
        &self,
        address: &Account,
        signer: &Account,
    ) -> Result<Self::Contract, BindingError>;
}

/// Bound read/write reference to the game contract for one session.
#[derive(Clone, Debug)]
pub struct ContractHandle<C> {
    contract: C,
    address: Account,
    signer: Account,
}

impl<C> ContractHandle<C> {
    pub fn contract(&self) -> &C {
        &self.contract
    }

    pub fn address(&self) -> &Account {
        &self.address
    }

    pub fn signer(&self) -> &Account {
        &self.signer
    }
}

/// Bind the fixed game contract for `session`. Player and owner flows share
/// this binding.
pub fn bind<K: ContractConnector>(
    connector: &K,
    session: &Session,
) -> Result<ContractHandle<K::Contract>, BindingError> {
    if !session.connected {
        return Err(BindingError::NotConnected);
    }
    let address = Account::new(GAME_CONTRACT_ADDRESS);
    let contract = connector.connect(&address, &session.account)?;
    info!(contract = %address, signer = %session.account, "contract bound");
    Ok(ContractHandle {
        contract,
        address,
        signer: session.account.clone(),
    })
}
