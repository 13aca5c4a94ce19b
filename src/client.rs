use crate::{
    account::Account,
    contract::{
        ContractConnector,
        ContractHandle,
        bind,
    },
    error::{
        BindingError,
        FetchError,
        SessionError,
        TransactionError,
    },
    orchestrator::{
        MutationOutcome,
        NewAchievementDraft,
        TransactionOrchestrator,
        TxState,
    },
    sync::{
        self,
        LocalView,
    },
    wallet::{
        AccountChange,
        Session,
        WalletConnector,
        WalletProvider,
    },
};
use tracing::{
    info,
    warn,
};

/// Result of comparing the contract owner with the connected account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OwnerGate {
    #[default]
    Unknown,
    Owner,
    NotOwner {
        owner: Account,
    },
}

/// Session-scoped state wired through the wallet connector, the contract
/// binding, the synchronizer and the orchestrator. Presentation code reads
/// from here and calls the action methods; it holds no chain state itself.
pub struct AppController<P, K: ContractConnector> {
    wallet: WalletConnector<P>,
    connector: K,
    session: Option<Session>,
    handle: Option<ContractHandle<K::Contract>>,
    view: LocalView,
    orchestrator: TransactionOrchestrator,
    owner_gate: OwnerGate,
    draft: NewAchievementDraft,
}

impl<P, K: ContractConnector> AppController<P, K> {
    pub fn new(wallet: WalletConnector<P>, connector: K) -> Self {
        Self {
            wallet,
            connector,
            session: None,
            handle: None,
            view: LocalView::new(),
            orchestrator: TransactionOrchestrator::new(),
            owner_gate: OwnerGate::Unknown,
            draft: NewAchievementDraft::default(),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn handle(&self) -> Option<&ContractHandle<K::Contract>> {
        self.handle.as_ref()
    }

    pub fn view(&self) -> &LocalView {
        &self.view
    }

    pub fn tx_state(&self) -> &TxState {
        self.orchestrator.state()
    }

    pub fn owner_gate(&self) -> &OwnerGate {
        &self.owner_gate
    }

    pub fn draft(&self) -> &NewAchievementDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut NewAchievementDraft {
        &mut self.draft
    }

    fn teardown(&mut self) {
        self.session = None;
        self.handle = None;
        self.view.reset();
        self.owner_gate = OwnerGate::Unknown;
    }
}

impl<P: WalletProvider, K: ContractConnector> AppController<P, K> {
    /// Non-intrusive start-up: reuse a pre-authorized account if the wallet
    /// has one. Returns whether a session was established.
    pub async fn start(&mut self) -> Result<bool, BindingError> {
        match self.wallet.probe_existing_connection().await {
            Some(session) => {
                self.establish(session).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// User-initiated connection.
    pub async fn connect(&mut self) -> Result<&Session, SessionError> {
        let session = self.wallet.request_connection().await?;
        self.establish(session).await?;
        self.session
            .as_ref()
            .ok_or(SessionError::Binding(BindingError::NotConnected))
    }

    /// Re-query the wallet's accounts. A different account rebinds the
    /// contract and resynchronizes everything; no account resets the session.
    pub async fn poll_account_change(&mut self) -> Result<AccountChange, BindingError> {
        let change = self.wallet.observe_accounts(self.session.as_ref()).await;
        match &change {
            AccountChange::Switched(session) => self.establish(session.clone()).await?,
            AccountChange::Disconnected => {
                info!("wallet disconnected; clearing session");
                self.teardown();
            }
            AccountChange::Unchanged => {}
        }
        Ok(change)
    }

    async fn establish(&mut self, session: Session) -> Result<(), BindingError> {
        self.teardown();
        let handle = bind(&self.connector, &session)?;
        self.session = Some(session);
        self.handle = Some(handle);
        self.refresh().await;
        Ok(())
    }
}

impl<P, K: ContractConnector> AppController<P, K> {
    /// Fetch the catalog and the player record concurrently. Failures are
    /// logged and leave the previous snapshots in place.
    pub async fn refresh(&mut self) -> Vec<FetchError> {
        let Some(handle) = &self.handle else {
            return Vec::new();
        };
        let account = handle.signer();
        let (catalog, player) = futures::join!(
            sync::fetch_catalog(handle),
            sync::fetch_player_record(handle, account)
        );
        let mut errors = Vec::new();
        if let Err(err) = self.view.apply_catalog(catalog) {
            errors.push(err);
        }
        if let Err(err) = self.view.apply_player(player) {
            errors.push(err);
        }
        if !errors.is_empty() {
            warn!(failed = errors.len(), "refresh incomplete; showing last known state");
        }
        errors
    }

    pub async fn refresh_owner_gate(&mut self) -> Result<&OwnerGate, FetchError> {
        let (Some(handle), Some(session)) = (&self.handle, &self.session) else {
            self.owner_gate = OwnerGate::Unknown;
            return Ok(&self.owner_gate);
        };
        let owner = sync::fetch_owner(handle).await?;
        self.owner_gate = if sync::is_owner(&owner, &session.account) {
            OwnerGate::Owner
        } else {
            OwnerGate::NotOwner { owner }
        };
        info!(gate = ?self.owner_gate, "owner gate evaluated");
        Ok(&self.owner_gate)
    }

    pub async fn register_player(
        &mut self,
        username: &str,
    ) -> Result<MutationOutcome, TransactionError> {
        let handle = self.handle.as_ref().ok_or(TransactionError::NotBound)?;
        self.orchestrator
            .register_player(handle, &mut self.view, username)
            .await
    }

    pub async fn update_score(
        &mut self,
        raw_score: &str,
    ) -> Result<MutationOutcome, TransactionError> {
        let handle = self.handle.as_ref().ok_or(TransactionError::NotBound)?;
        self.orchestrator
            .update_score(handle, &mut self.view, raw_score)
            .await
    }

    /// Submit the held draft. Only available once the owner gate has been
    /// evaluated as [`OwnerGate::Owner`].
    pub async fn create_achievement(&mut self) -> Result<MutationOutcome, TransactionError> {
        let handle = self.handle.as_ref().ok_or(TransactionError::NotBound)?;
        if self.owner_gate != OwnerGate::Owner {
            return Err(TransactionError::NotOwner("create achievements"));
        }
        self.orchestrator
            .create_achievement(handle, &mut self.view, &mut self.draft)
            .await
    }
}
