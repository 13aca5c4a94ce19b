use crate::{
    account::Account,
    error::{
        ConnectionError,
        ProviderError,
    },
};
use tracing::{
    debug,
    info,
    warn,
};

/// Capability handed to the connector in place of an ambient, injected wallet
/// object. Both calls suspend until the wallet answers.
pub trait WalletProvider {
    /// Accounts already authorized for this client. Never prompts the user.
    fn accounts(&self) -> impl Future<Output = Result<Vec<Account>, ProviderError>>;

    /// Ask the user to authorize this client and return the chosen accounts.
    fn request_accounts(
        &self,
    ) -> impl Future<Output = Result<Vec<Account>, ProviderError>>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub account: Account,
    pub connected: bool,
}

impl Session {
    pub fn connected(account: Account) -> Self {
        Self {
            account,
            connected: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountChange {
    Unchanged,
    Switched(Session),
    Disconnected,
}

pub struct WalletConnector<P> {
    provider: Option<P>,
}

impl<P> WalletConnector<P> {
    pub fn new(provider: Option<P>) -> Self {
        Self { provider }
    }

    pub fn with_provider(provider: P) -> Self {
        Self::new(Some(provider))
    }

    /// Connector for an environment without any wallet extension.
    pub fn absent() -> Self {
        Self::new(None)
    }
}

impl<P: WalletProvider> WalletConnector<P> {
    /// Silent check for a pre-authorized account. Any failure, including a
    /// missing wallet, is reported as `None`.
    pub async fn probe_existing_connection(&self) -> Option<Session> {
        let Some(provider) = &self.provider else {
            info!("no wallet provider present");
            return None;
        };
        match provider.accounts().await {
            Ok(accounts) => {
                debug!(count = accounts.len(), "wallet reported authorized accounts");
                accounts.into_iter().next().map(Session::connected)
            }
            Err(err) => {
                warn!(?err, "probing wallet for existing accounts failed");
                None
            }
        }
    }

    /// Explicit, user-initiated connection. Multi-account wallets resolve to
    /// their first account.
    pub async fn request_connection(&self) -> Result<Session, ConnectionError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(ConnectionError::WalletUnavailable)?;
        let accounts = provider.request_accounts().await.map_err(|err| match err {
            ProviderError::UserRejected => ConnectionError::Declined,
            other => ConnectionError::Provider(other),
        })?;
        let account = accounts
            .into_iter()
            .next()
            .ok_or(ConnectionError::NoAccounts)?;
        info!(%account, "wallet connected");
        Ok(Session::connected(account))
    }

    /// Compare the wallet's current first account against `current`.
    ///
    /// A failed query is treated as no change so a transport hiccup does not
    /// tear down a live session.
    pub async fn observe_accounts(&self, current: Option<&Session>) -> AccountChange {
        let Some(provider) = &self.provider else {
            return match current {
                Some(_) => AccountChange::Disconnected,
                None => AccountChange::Unchanged,
            };
        };
        let first = match provider.accounts().await {
            Ok(accounts) => accounts.into_iter().next(),
            Err(err) => {
                warn!(?err, "polling wallet accounts failed");
                return AccountChange::Unchanged;
            }
        };
        match (current, first) {
            (Some(session), Some(account)) if session.account == account => {
                AccountChange::Unchanged
            }
            (_, Some(account)) => {
                info!(%account, "wallet account changed");
                AccountChange::Switched(Session::connected(account))
            }
            (Some(_), None) => {
                info!("wallet no longer exposes an authorized account");
                AccountChange::Disconnected
            }
            (None, None) => AccountChange::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::test_helpers::FakeWallet;

    #[tokio::test]
    async fn probe_existing_connection__returns_first_authorized_account() {
        // given
        let wallet = FakeWallet::authorized(["0xAAA", "0xBBB"]);
        let connector = WalletConnector::with_provider(wallet);

        // when
        let session = connector.probe_existing_connection().await;

        // then
        assert_eq!(session, Some(Session::connected(Account::new("0xaaa"))));
    }

    #[tokio::test]
    async fn probe_existing_connection__swallows_transport_errors() {
        // given
        let wallet = FakeWallet::failing(ProviderError::Transport("boom".into()));
        let connector = WalletConnector::with_provider(wallet);

        // when
        let session = connector.probe_existing_connection().await;

        // then
        assert_eq!(session, None);
    }

    #[tokio::test]
    async fn probe_existing_connection__absent_wallet_is_none() {
        let connector = WalletConnector::<FakeWallet>::absent();
        assert_eq!(connector.probe_existing_connection().await, None);
    }

    #[tokio::test]
    async fn request_connection__absent_wallet_is_blocking_notice() {
        let connector = WalletConnector::<FakeWallet>::absent();
        let result = connector.request_connection().await;
        assert_eq!(result, Err(ConnectionError::WalletUnavailable));
    }

    #[tokio::test]
    async fn request_connection__rejection_is_declined_consent() {
        // given
        let wallet = FakeWallet::unauthorized(["0x111"]).rejecting_requests();
        let connector = WalletConnector::with_provider(wallet);

        // when
        let result = connector.request_connection().await;

        // then
        assert_eq!(result, Err(ConnectionError::Declined));
    }

    #[tokio::test]
    async fn request_connection__approval_authorizes_account() {
        // given
        let wallet = FakeWallet::unauthorized(["0x111"]);
        let connector = WalletConnector::with_provider(wallet.clone());
        assert_eq!(connector.probe_existing_connection().await, None);

        // when
        let session = connector.request_connection().await.unwrap();

        // then
        assert_eq!(session.account, Account::new("0x111"));
        assert!(session.connected);
        assert_eq!(
            connector.probe_existing_connection().await,
            Some(Session::connected(Account::new("0x111")))
        );
    }

    #[tokio::test]
    async fn observe_accounts__detects_switch_and_disconnect() {
        // given
        let wallet = FakeWallet::authorized(["0x111"]);
        let connector = WalletConnector::with_provider(wallet.clone());
        let session = connector.probe_existing_connection().await.unwrap();

        // then
        assert_eq!(
            connector.observe_accounts(Some(&session)).await,
            AccountChange::Unchanged
        );

        wallet.switch_account("0x222");
        assert_eq!(
            connector.observe_accounts(Some(&session)).await,
            AccountChange::Switched(Session::connected(Account::new("0x222")))
        );

        wallet.revoke_all();
        assert_eq!(
            connector.observe_accounts(Some(&session)).await,
            AccountChange::Disconnected
        );
    }
}
