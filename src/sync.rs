use crate::{
    U256,
    account::Account,
    contract::{
        ContractHandle,
        GameContract,
        RawCatalog,
        RawPlayerInfo,
    },
    error::FetchError,
};
use tracing::{
    debug,
    warn,
};

/// Local projection of a player's on-chain record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerRecord {
    pub username: String,
    pub high_score: U256,
    pub total_games: U256,
    pub owned_achievement_ids: Vec<U256>,
}

impl PlayerRecord {
    /// An empty username is the contract's "never registered" sentinel.
    pub fn is_registered(&self) -> bool {
        !self.username.is_empty()
    }
}

impl From<RawPlayerInfo> for PlayerRecord {
    fn from(raw: RawPlayerInfo) -> Self {
        Self {
            username: raw.username,
            high_score: raw.high_score,
            total_games: raw.total_games,
            owned_achievement_ids: raw.owned_nfts,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AchievementDefinition {
    /// Position in the catalog.
    pub id: usize,
    pub name: String,
    pub image_uri: String,
    pub required_score: U256,
    pub max_supply: U256,
    pub current_supply: U256,
}

impl AchievementDefinition {
    /// `currentSupply/maxSupply` as shown on the owner dashboard.
    pub fn supply_label(&self) -> String {
        format!("{}/{}", self.current_supply, self.max_supply)
    }

    pub fn progress(&self, high_score: U256) -> AchievementProgress {
        AchievementProgress {
            achievement_id: self.id,
            high_score,
            required_score: self.required_score,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AchievementProgress {
    pub achievement_id: usize,
    pub high_score: U256,
    pub required_score: U256,
}

impl AchievementProgress {
    pub fn unlocked(&self) -> bool {
        self.high_score >= self.required_score
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.high_score, self.required_score)
    }
}

/// Zip the five parallel catalog arrays by index. Any length disagreement
/// fails the whole catalog.
pub fn zip_catalog(raw: RawCatalog) -> Result<Vec<AchievementDefinition>, FetchError> {
    let len = raw.names.len();
    let aligned = [
        raw.image_uris.len(),
        raw.required_scores.len(),
        raw.max_supplies.len(),
        raw.current_supplies.len(),
    ]
    .iter()
    .all(|other| *other == len);
    if !aligned {
        return Err(FetchError::CatalogLengthMismatch {
            names: raw.names.len(),
            image_uris: raw.image_uris.len(),
            required_scores: raw.required_scores.len(),
            max_supplies: raw.max_supplies.len(),
            current_supplies: raw.current_supplies.len(),
        });
    }

    let catalog = raw
        .names
        .into_iter()
        .zip(raw.image_uris)
        .zip(raw.required_scores)
        .zip(raw.max_supplies)
        .zip(raw.current_supplies)
        .enumerate()
        .map(
            |(id, ((((name, image_uri), required_score), max_supply), current_supply))| {
                AchievementDefinition {
                    id,
                    name,
                    image_uri,
                    required_score,
                    max_supply,
                    current_supply,
                }
            },
        )
        .collect();
    Ok(catalog)
}

pub async fn fetch_catalog<C: GameContract>(
    handle: &ContractHandle<C>,
) -> Result<Vec<AchievementDefinition>, FetchError> {
    let raw = handle
        .contract()
        .get_all_achievements()
        .await
        .inspect_err(|err| warn!(?err, "fetching achievement catalog failed"))?;
    let catalog = zip_catalog(raw)
        .inspect_err(|err| warn!(%err, "achievement catalog rejected"))?;
    debug!(entries = catalog.len(), "achievement catalog fetched");
    Ok(catalog)
}

pub async fn fetch_player_record<C: GameContract>(
    handle: &ContractHandle<C>,
    account: &Account,
) -> Result<PlayerRecord, FetchError> {
    let raw = handle
        .contract()
        .get_player_info(account)
        .await
        .inspect_err(|err| warn!(?err, %account, "fetching player record failed"))?;
    let record = PlayerRecord::from(raw);
    debug!(
        %account,
        registered = record.is_registered(),
        "player record fetched"
    );
    Ok(record)
}

pub async fn fetch_owner<C: GameContract>(
    handle: &ContractHandle<C>,
) -> Result<Account, FetchError> {
    let owner = handle
        .contract()
        .get_owner()
        .await
        .inspect_err(|err| warn!(?err, "fetching contract owner failed"))?;
    Ok(owner)
}

/// Case-insensitive owner check for the connected account.
pub fn is_owner(owner: &Account, account: &Account) -> bool {
    owner == account
}

/// Last-known snapshots for one session. Each successful refresh replaces the
/// prior snapshot wholesale; a failed refresh keeps it and records the error.
#[derive(Clone, Debug, Default)]
pub struct LocalView {
    player: Option<PlayerRecord>,
    catalog: Vec<AchievementDefinition>,
    last_error: Option<FetchError>,
}

impl LocalView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player(&self) -> Option<&PlayerRecord> {
        self.player.as_ref()
    }

    pub fn catalog(&self) -> &[AchievementDefinition] {
        &self.catalog
    }

    pub fn is_registered(&self) -> bool {
        self.player.as_ref().is_some_and(PlayerRecord::is_registered)
    }

    /// Error from the most recent failed refresh, cleared by the next success.
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn progress(&self) -> Vec<AchievementProgress> {
        let high_score = self
            .player
            .as_ref()
            .map(|player| player.high_score)
            .unwrap_or_default();
        self.catalog
            .iter()
            .map(|achievement| achievement.progress(high_score))
            .collect()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub async fn refresh_player<C: GameContract>(
        &mut self,
        handle: &ContractHandle<C>,
        account: &Account,
    ) -> Result<(), FetchError> {
        let outcome = fetch_player_record(handle, account).await;
        self.apply_player(outcome)
    }

    pub async fn refresh_catalog<C: GameContract>(
        &mut self,
        handle: &ContractHandle<C>,
    ) -> Result<(), FetchError> {
        let outcome = fetch_catalog(handle).await;
        self.apply_catalog(outcome)
    }

    pub fn apply_player(
        &mut self,
        outcome: Result<PlayerRecord, FetchError>,
    ) -> Result<(), FetchError> {
        let record = self.note(outcome)?;
        self.player = Some(record);
        Ok(())
    }

    pub fn apply_catalog(
        &mut self,
        outcome: Result<Vec<AchievementDefinition>, FetchError>,
    ) -> Result<(), FetchError> {
        let catalog = self.note(outcome)?;
        self.catalog = catalog;
        Ok(())
    }

    fn note<T>(&mut self, outcome: Result<T, FetchError>) -> Result<T, FetchError> {
        match &outcome {
            Ok(_) => self.last_error = None,
            Err(err) => self.last_error = Some(err.clone()),
        }
        outcome
    }
}
