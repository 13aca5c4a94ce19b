//! EVM transport for the wallet and contract capabilities, built on an alloy
//! HTTP provider and the `sol!` bindings in [`crate::game_types`].
//!
//! The endpoint is expected to hold the signing keys (a local dev node or a
//! wallet bridge), so writes go out as `eth_sendTransaction` from the
//! session's account and the node signs on its behalf.

use crate::{
    Account,
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
    game_types::AchievementGame::{
        self,
        AchievementGameInstance,
    },
    wallet::WalletProvider,
    U256,
};
use alloy::{
    contract::Error as ContractError,
    network::{
        Ethereum,
        ReceiptResponse,
    },
    primitives::Address,
    providers::{
        DynProvider,
        PendingTransactionBuilder,
        PendingTransactionError,
        Provider,
        ProviderBuilder,
    },
    rpc::client::RpcClient,
    transports::TransportError,
};
use std::time::Duration;
use tracing::{
    debug,
    info,
};

pub const DEFAULT_LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";
pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// EIP-1193 code for a request the user refused.
const USER_REJECTED_CODE: i64 = 4001;
const METHOD_NOT_FOUND_CODE: i64 = -32601;

#[derive(Clone)]
pub struct EvmClient {
    provider: DynProvider,
}

impl EvmClient {
    pub fn new(url: &str) -> Result<Self, ProviderError> {
        let url: reqwest::Url = url
            .parse()
            .map_err(|err| ProviderError::Transport(format!("invalid rpc url {url}: {err}")))?;
        let client = RpcClient::new_http(url).with_poll_interval(RECEIPT_POLL_INTERVAL);
        let provider = ProviderBuilder::new().connect_client(client).erased();
        Ok(Self { provider })
    }
}

fn provider_error(err: TransportError) -> ProviderError {
    match err.as_error_resp() {
        Some(payload) if payload.code == USER_REJECTED_CODE => ProviderError::UserRejected,
        Some(payload) => ProviderError::Rpc {
            code: payload.code,
            message: payload.message.to_string(),
        },
        None => ProviderError::Transport(err.to_string()),
    }
}

fn call_error(err: ContractError) -> CallError {
    match err {
        ContractError::TransportError(err) => provider_error(err).into(),
        other => CallError::Malformed(other.to_string()),
    }
}

fn to_accounts(addresses: Vec<Address>) -> Vec<Account> {
    addresses.into_iter().map(Account::from).collect()
}

impl WalletProvider for EvmClient {
    async fn accounts(&self) -> Result<Vec<Account>, ProviderError> {
        let addresses = self.provider.get_accounts().await.map_err(provider_error)?;
        Ok(to_accounts(addresses))
    }

    async fn request_accounts(&self) -> Result<Vec<Account>, ProviderError> {
        let requested = self
            .provider
            .raw_request::<_, Vec<Address>>("eth_requestAccounts".into(), ())
            .await;
        match requested.map_err(provider_error) {
            Ok(addresses) => Ok(to_accounts(addresses)),
            // plain nodes expose their unlocked accounts without a prompt
            Err(ProviderError::Rpc {
                code: METHOD_NOT_FOUND_CODE,
                ..
            }) => {
                debug!("eth_requestAccounts unsupported; falling back to eth_accounts");
                self.accounts().await
            }
            Err(err) => Err(err),
        }
    }
}

impl ContractConnector for EvmClient {
    type Contract = RpcGameContract;

    fn connect(
        &self,
        address: &Account,
        signer: &Account,
    ) -> Result<Self::Contract, BindingError> {
        let contract_address = address
            .to_address()
            .ok_or_else(|| BindingError::InvalidAddress(address.to_string()))?;
        let from = signer
            .to_address()
            .ok_or_else(|| BindingError::InvalidAddress(signer.to_string()))?;
        Ok(RpcGameContract {
            instance: AchievementGame::new(contract_address, self.provider.clone()),
            from,
        })
    }
}

#[derive(Clone)]
pub struct RpcGameContract {
    instance: AchievementGameInstance<DynProvider>,
    from: Address,
}

impl RpcGameContract {
    fn submitted(&self, pending: PendingTransactionBuilder<Ethereum>) -> RpcPending {
        let hash = pending.tx_hash().to_string();
        info!(%hash, from = %self.from, "transaction submitted");
        RpcPending { pending, hash }
    }
}

impl GameContract for RpcGameContract {
    type Pending = RpcPending;

    async fn get_owner(&self) -> Result<Account, CallError> {
        let owner = self
            .instance
            .getOwner()
            .call()
            .await
            .map_err(call_error)?;
        Ok(Account::from(owner))
    }

    async fn get_player_info(&self, player: &Account) -> Result<RawPlayerInfo, CallError> {
        let address = player
            .to_address()
            .ok_or_else(|| CallError::Malformed(format!("{player} is not an address")))?;
        let info = self
            .instance
            .getPlayerInfo(address)
            .call()
            .await
            .map_err(call_error)?;
        Ok(RawPlayerInfo {
            username: info.username,
            high_score: info.highScore,
            total_games: info.totalGames,
            owned_nfts: info.ownedNFTs,
        })
    }

    async fn get_all_achievements(&self) -> Result<RawCatalog, CallError> {
        let catalog = self
            .instance
            .getAllAchievements()
            .call()
            .await
            .map_err(call_error)?;
        Ok(RawCatalog {
            names: catalog.names,
            image_uris: catalog.imageURIs,
            required_scores: catalog.requiredScores,
            max_supplies: catalog.maxSupplies,
            current_supplies: catalog.currentSupplies,
        })
    }

    async fn register_player(&self, username: &str) -> Result<RpcPending, CallError> {
        let pending = self
            .instance
            .registerPlayer(username.to_string())
            .from(self.from)
            .send()
            .await
            .map_err(call_error)?;
        Ok(self.submitted(pending))
    }

    async fn update_score(&self, score: U256) -> Result<RpcPending, CallError> {
        let pending = self
            .instance
            .updateScore(score)
            .from(self.from)
            .send()
            .await
            .map_err(call_error)?;
        Ok(self.submitted(pending))
    }

    async fn create_achievement(
        &self,
        name: &str,
        image_uri: &str,
        required_score: U256,
        max_supply: U256,
    ) -> Result<RpcPending, CallError> {
        let pending = self
            .instance
            .createAchievement(
                name.to_string(),
                image_uri.to_string(),
                required_score,
                max_supply,
            )
            .from(self.from)
            .send()
            .await
            .map_err(call_error)?;
        Ok(self.submitted(pending))
    }
}

/// Submitted transaction, confirmed through the provider's receipt watcher.
pub struct RpcPending {
    pending: PendingTransactionBuilder<Ethereum>,
    hash: String,
}

fn settle(hash: String, succeeded: bool, block_number: Option<u64>) -> Result<Receipt, CallError> {
    if !succeeded {
        return Err(CallError::Reverted { hash });
    }
    Ok(Receipt { hash, block_number })
}

impl PendingTransaction for RpcPending {
    fn hash(&self) -> &str {
        &self.hash
    }

    async fn wait(self) -> Result<Receipt, CallError> {
        let RpcPending { pending, hash } = self;
        let receipt = pending.get_receipt().await.map_err(|err| match err {
            PendingTransactionError::TransportError(err) => provider_error(err).into(),
            other => CallError::Transport(other.to_string()),
        })?;
        settle(hash, receipt.status(), receipt.block_number())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use alloy::{
        primitives::Bytes,
        rpc::json_rpc::ErrorPayload,
        sol_types::SolValue,
        transports::mock::Asserter,
    };

    fn mocked() -> (EvmClient, Asserter) {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new()
            .connect_mocked_client(asserter.clone())
            .erased();
        (EvmClient { provider }, asserter)
    }

    fn rpc_failure(code: i64, message: &'static str) -> ErrorPayload {
        ErrorPayload {
            code,
            message: message.into(),
            data: None,
        }
    }

    fn bound(client: &EvmClient) -> RpcGameContract {
        client
            .connect(
                &Account::new(crate::GAME_CONTRACT_ADDRESS),
                &Account::new("0x0000000000000000000000000000000000000111"),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn accounts__returns_authorized_addresses() {
        // given
        let (client, asserter) = mocked();
        let alice = Address::repeat_byte(0x11);
        asserter.push_success(&vec![alice]);

        // when
        let accounts = client.accounts().await.unwrap();

        // then
        assert_eq!(accounts, vec![Account::from(alice)]);
    }

    #[tokio::test]
    async fn request_accounts__falls_back_when_method_missing() {
        // given
        let (client, asserter) = mocked();
        let alice = Address::repeat_byte(0x11);
        asserter.push_failure(rpc_failure(METHOD_NOT_FOUND_CODE, "method not found"));
        asserter.push_success(&vec![alice]);

        // when
        let accounts = client.request_accounts().await.unwrap();

        // then
        assert_eq!(accounts, vec![Account::from(alice)]);
    }

    #[tokio::test]
    async fn request_accounts__user_rejection_code_is_recognised() {
        let (client, asserter) = mocked();
        asserter.push_failure(rpc_failure(USER_REJECTED_CODE, "User rejected the request."));
        let result = client.request_accounts().await;
        assert_eq!(result, Err(ProviderError::UserRejected));
    }

    #[tokio::test]
    async fn get_owner__decodes_address_from_call_result() {
        // given
        let (client, asserter) = mocked();
        let owner = Address::repeat_byte(0xab);
        asserter.push_success(&Bytes::from(owner.abi_encode()));

        // when
        let result = bound(&client).get_owner().await.unwrap();

        // then
        assert_eq!(result, Account::from(owner));
    }

    #[tokio::test]
    async fn get_player_info__decodes_named_return_tuple() {
        // given
        let (client, asserter) = mocked();
        let encoded = (
            String::from("alice"),
            U256::from(42),
            U256::from(7),
            vec![U256::from(0), U256::from(3)],
        )
            .abi_encode_params();
        asserter.push_success(&Bytes::from(encoded));

        // when
        let info = bound(&client)
            .get_player_info(&Account::new("0x0000000000000000000000000000000000000111"))
            .await
            .unwrap();

        // then
        assert_eq!(info.username, "alice");
        assert_eq!(info.high_score, U256::from(42));
        assert_eq!(info.total_games, U256::from(7));
        assert_eq!(info.owned_nfts, vec![U256::from(0), U256::from(3)]);
    }

    #[tokio::test]
    async fn get_all_achievements__keeps_arrays_unzipped() {
        // given
        let (client, asserter) = mocked();
        let encoded = (
            vec![String::from("Rookie"), String::from("Legend")],
            vec![String::from("ipfs://r")],
            vec![U256::from(10), U256::from(1000)],
            vec![U256::from(50), U256::from(1)],
            vec![U256::from(4), U256::from(0)],
        )
            .abi_encode_params();
        asserter.push_success(&Bytes::from(encoded));

        // when
        let catalog = bound(&client).get_all_achievements().await.unwrap();

        // then
        assert_eq!(catalog.names.len(), 2);
        assert_eq!(catalog.image_uris, vec!["ipfs://r"]);
    }

    #[tokio::test]
    async fn get_owner__execution_revert_maps_to_call_error() {
        let (client, asserter) = mocked();
        asserter.push_failure(rpc_failure(3, "execution reverted"));
        let result = bound(&client).get_owner().await;
        assert_eq!(
            result,
            Err(CallError::ExecutionReverted("execution reverted".into()))
        );
    }

    #[test]
    fn settle__failed_status_is_revert() {
        assert_eq!(
            settle("0xfeed".into(), false, Some(16)),
            Err(CallError::Reverted {
                hash: "0xfeed".into()
            })
        );
    }

    #[test]
    fn settle__success_carries_block_number() {
        let receipt = settle("0xfeed".into(), true, Some(26)).unwrap();
        assert_eq!(receipt.block_number, Some(26));
    }

    #[test]
    fn connect__rejects_non_hex_signer() {
        let (client, _asserter) = mocked();
        let result = client.connect(
            &Account::new(crate::GAME_CONTRACT_ADDRESS),
            &Account::new("alice"),
        );
        assert!(matches!(
            result,
            Err(BindingError::InvalidAddress(ref raw)) if raw == "alice"
        ));
    }
}
