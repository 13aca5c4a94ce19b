use crate::{
    U256,
    contract::{
        ContractHandle,
        GameContract,
        PendingTransaction,
        Receipt,
    },
    error::{
        AmountError,
        CallError,
        FetchError,
        TransactionError,
    },
    sync::LocalView,
};
use std::fmt;
use tracing::{
    error,
    info,
    warn,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    RegisterPlayer,
    UpdateScore,
    CreateAchievement,
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mutation::RegisterPlayer => "registerPlayer",
            Mutation::UpdateScore => "updateScore",
            Mutation::CreateAchievement => "createAchievement",
        };
        f.write_str(name)
    }
}

/// Progress of the most recent mutation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TxState {
    #[default]
    Idle,
    /// Handed to the wallet. `hash` is known once the network accepted it.
    Submitted {
        mutation: Mutation,
        hash: Option<String>,
    },
    Confirmed {
        mutation: Mutation,
        receipt: Receipt,
    },
    Rejected {
        mutation: Mutation,
        error: TransactionError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Nothing was sent, e.g. an empty username.
    Skipped,
    /// The transaction settled. `resync` reports whether the follow-up
    /// refresh of local state succeeded.
    Confirmed {
        receipt: Receipt,
        resync: Result<(), FetchError>,
    },
}

impl MutationOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, MutationOutcome::Confirmed { .. })
    }
}

/// Owner-side form state for a new achievement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewAchievementDraft {
    pub name: String,
    pub image_uri: String,
    pub required_score: String,
    pub max_supply: String,
}

struct ValidatedDraft {
    name: String,
    image_uri: String,
    required_score: U256,
    max_supply: U256,
}

impl NewAchievementDraft {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn validate(&self) -> Result<ValidatedDraft, TransactionError> {
        let fields = [
            ("name", &self.name),
            ("image uri", &self.image_uri),
            ("required score", &self.required_score),
            ("max supply", &self.max_supply),
        ];
        if let Some((field, _)) = fields
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
        {
            return Err(TransactionError::IncompleteDraft(field));
        }
        Ok(ValidatedDraft {
            name: self.name.clone(),
            image_uri: self.image_uri.clone(),
            required_score: parse_amount("required score", &self.required_score)?,
            max_supply: parse_amount("max supply", &self.max_supply)?,
        })
    }
}

fn parse_amount(field: &'static str, raw: &str) -> Result<U256, TransactionError> {
    parse_uint(raw).map_err(|source| TransactionError::InvalidInput { field, source })
}

/// Plain decimal only. `U256::from_str` would also take `0x`/`0b` prefixes.
fn parse_uint(raw: &str) -> Result<U256, AmountError> {
    let digits = raw.trim();
    if digits.is_empty() {
        return Err(AmountError::Empty);
    }
    if let Some(bad) = digits.chars().find(|ch| !ch.is_ascii_digit()) {
        return Err(AmountError::InvalidDigit(bad));
    }
    U256::from_str_radix(digits, 10).map_err(|_| AmountError::Overflow)
}

/// Submits mutations and blocks until they settle.
///
/// Every method takes `&mut self`, so one orchestrator never has two
/// mutations in flight. Callers that build several orchestrators over the
/// same handle are responsible for not overlapping them; nothing is queued.
/// A mutation in flight cannot be aborted and no timeout is applied.
#[derive(Debug, Default)]
pub struct TransactionOrchestrator {
    state: TxState,
}

impl TransactionOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TxState {
        &self.state
    }

    /// Register `username` for the handle's signer, then refresh the player
    /// record. An empty username sends nothing.
    pub async fn register_player<C: GameContract>(
        &mut self,
        handle: &ContractHandle<C>,
        view: &mut LocalView,
        username: &str,
    ) -> Result<MutationOutcome, TransactionError> {
        if username.is_empty() {
            return Ok(MutationOutcome::Skipped);
        }
        let receipt = self
            .submit_and_confirm(
                Mutation::RegisterPlayer,
                handle.contract().register_player(username),
            )
            .await?;
        let resync = view.refresh_player(handle, handle.signer()).await;
        Ok(MutationOutcome::Confirmed { receipt, resync })
    }

    /// Submit a new score. `raw_score` must be a non-negative integer; no
    /// ordering against the current high score is enforced here.
    pub async fn update_score<C: GameContract>(
        &mut self,
        handle: &ContractHandle<C>,
        view: &mut LocalView,
        raw_score: &str,
    ) -> Result<MutationOutcome, TransactionError> {
        let score = parse_amount("score", raw_score)?;
        let receipt = self
            .submit_and_confirm(Mutation::UpdateScore, handle.contract().update_score(score))
            .await?;
        let resync = view.refresh_player(handle, handle.signer()).await;
        Ok(MutationOutcome::Confirmed { receipt, resync })
    }

    /// Create a catalog entry from `draft`. The draft is cleared only once the
    /// transaction is confirmed; any failure leaves it as typed.
    pub async fn create_achievement<C: GameContract>(
        &mut self,
        handle: &ContractHandle<C>,
        view: &mut LocalView,
        draft: &mut NewAchievementDraft,
    ) -> Result<MutationOutcome, TransactionError> {
        let validated = draft.validate()?;
        let receipt = self
            .submit_and_confirm(
                Mutation::CreateAchievement,
                handle.contract().create_achievement(
                    &validated.name,
                    &validated.image_uri,
                    validated.required_score,
                    validated.max_supply,
                ),
            )
            .await?;
        draft.clear();
        let resync = view.refresh_catalog(handle).await;
        Ok(MutationOutcome::Confirmed { receipt, resync })
    }

    async fn submit_and_confirm<P: PendingTransaction>(
        &mut self,
        mutation: Mutation,
        submission: impl Future<Output = Result<P, CallError>>,
    ) -> Result<Receipt, TransactionError> {
        self.state = TxState::Submitted {
            mutation,
            hash: None,
        };
        let pending = match submission.await {
            Ok(pending) => pending,
            Err(err) => return Err(self.reject(mutation, TransactionError::Submission(err))),
        };
        let hash = pending.hash().to_string();
        info!(%mutation, %hash, "transaction submitted; awaiting confirmation");
        self.state = TxState::Submitted {
            mutation,
            hash: Some(hash.clone()),
        };

        match pending.wait().await {
            Ok(receipt) => {
                info!(%mutation, %hash, block = ?receipt.block_number, "transaction confirmed");
                self.state = TxState::Confirmed {
                    mutation,
                    receipt: receipt.clone(),
                };
                Ok(receipt)
            }
            Err(source) => Err(self.reject(
                mutation,
                TransactionError::Confirmation { hash, source },
            )),
        }
    }

    fn reject(&mut self, mutation: Mutation, err: TransactionError) -> TransactionError {
        match &err {
            TransactionError::Submission(CallError::UserRejected) => {
                warn!(%mutation, "user declined to sign transaction")
            }
            other => error!(%mutation, error = %other, "transaction failed"),
        }
        self.state = TxState::Rejected {
            mutation,
            error: err.clone(),
        };
        err
    }
}
