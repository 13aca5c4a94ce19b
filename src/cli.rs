use achievement_client::{
    client::{
        AppController,
        OwnerGate,
    },
    contract::ContractConnector,
    orchestrator::{
        MutationOutcome,
        NewAchievementDraft,
    },
    rpc::DEFAULT_LOCAL_RPC_URL,
    wallet::WalletProvider,
};
use clap::{
    ArgGroup,
    Parser,
    Subcommand,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = None,
    group(
        ArgGroup::new("network")
            .args(["local", "rpc_url"])
            .required(true)
    )
)]
pub struct Args {
    /// Connect to a local dev node at the default RPC url
    #[arg(long)]
    local: bool,

    /// JSON-RPC endpoint of the node or wallet bridge
    #[arg(long)]
    rpc_url: Option<String>,

    /// Write logs to a daily rolling file in this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the connected player and achievement progress
    Status,
    /// Ask the wallet to authorize an account
    Connect,
    /// Register the connected account under a username
    Register {
        username: String,
    },
    /// Submit a game score; the contract keeps the highest one
    UpdateScore {
        /// Non-negative decimal integer
        score: String,
    },
    /// List the achievement catalog
    Achievements,
    /// Owner dashboard: ownership check and supply per achievement
    Owner,
    /// Add an achievement to the catalog (contract owner only)
    CreateAchievement {
        #[arg(long)]
        name: String,
        /// Metadata or image URI shown for the NFT
        #[arg(long)]
        image_uri: String,
        /// Score a player needs to earn the achievement
        #[arg(long)]
        required_score: String,
        /// How many NFTs may ever be minted
        #[arg(long)]
        max_supply: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkTarget {
    Local { url: String },
    Remote { url: String },
}

impl NetworkTarget {
    pub fn url(&self) -> &str {
        match self {
            NetworkTarget::Local { url } | NetworkTarget::Remote { url } => url,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: NetworkTarget,
    pub log_dir: Option<PathBuf>,
    pub command: Command,
}

impl TryFrom<Args> for AppConfig {
    type Error = color_eyre::eyre::Report;

    fn try_from(args: Args) -> Result<Self> {
        let network = match (args.local, args.rpc_url) {
            (true, None) => NetworkTarget::Local {
                url: DEFAULT_LOCAL_RPC_URL.to_string(),
            },
            (false, Some(url)) => NetworkTarget::Remote { url },
            _ => return Err(eyre!("choose exactly one of --local or --rpc-url")),
        };
        Ok(Self {
            network,
            log_dir: args.log_dir,
            command: args.command.unwrap_or(Command::Status),
        })
    }
}

pub async fn run<P, K>(controller: &mut AppController<P, K>, command: Command) -> Result<()>
where
    P: WalletProvider,
    K: ContractConnector,
{
    let connected = controller
        .start()
        .await
        .wrap_err("failed to bind the game contract")?;
    let needs_session = command != Command::Status;
    if !connected && needs_session {
        controller
            .connect()
            .await
            .wrap_err("wallet connection failed")?;
    }

    match command {
        Command::Status | Command::Connect => print_status(controller),
        Command::Achievements => print_catalog(controller),
        Command::Register { username } => {
            let outcome = controller.register_player(&username).await?;
            report(&outcome);
            print_status(controller);
        }
        Command::UpdateScore { score } => {
            let outcome = controller.update_score(&score).await?;
            report(&outcome);
            print_status(controller);
        }
        Command::Owner => {
            let gate = controller.refresh_owner_gate().await?;
            print_gate(gate);
            if *gate == OwnerGate::Owner {
                print_supply(controller);
            }
        }
        Command::CreateAchievement {
            name,
            image_uri,
            required_score,
            max_supply,
        } => {
            controller.refresh_owner_gate().await?;
            *controller.draft_mut() = NewAchievementDraft {
                name,
                image_uri,
                required_score,
                max_supply,
            };
            let outcome = controller.create_achievement().await?;
            report(&outcome);
            print_supply(controller);
        }
    }
    Ok(())
}

fn report(outcome: &MutationOutcome) {
    match outcome {
        MutationOutcome::Skipped => println!("nothing to submit"),
        MutationOutcome::Confirmed { receipt, resync } => {
            println!("confirmed {}", receipt.hash);
            if let Err(err) = resync {
                println!("refresh failed, showing last known state: {err}");
            }
        }
    }
}

fn print_status<P, K: ContractConnector>(controller: &AppController<P, K>) {
    let Some(session) = controller.session() else {
        println!("not connected");
        return;
    };
    println!("account: {}", session.account);
    match controller.view().player() {
        Some(player) if player.is_registered() => {
            println!("username: {}", player.username);
            println!("high score: {}", player.high_score);
            println!("games played: {}", player.total_games);
            if player.owned_achievement_ids.is_empty() {
                println!("owned: none");
            } else {
                let owned: Vec<String> = player
                    .owned_achievement_ids
                    .iter()
                    .map(|id| format!("NFT #{id}"))
                    .collect();
                println!("owned: {}", owned.join(", "));
            }
            let catalog = controller.view().catalog();
            for progress in controller.view().progress() {
                let name = catalog
                    .get(progress.achievement_id)
                    .map(|def| def.name.as_str())
                    .unwrap_or("?");
                let marker = if progress.unlocked() { "x" } else { " " };
                println!("  [{marker}] {name} {}", progress.label());
            }
        }
        Some(_) => println!("not registered"),
        None => println!("player record unavailable"),
    }
    if let Some(err) = controller.view().last_error() {
        println!("last refresh error: {err}");
    }
}

fn print_catalog<P, K: ContractConnector>(controller: &AppController<P, K>) {
    let catalog = controller.view().catalog();
    if catalog.is_empty() {
        println!("no achievements");
    }
    for def in catalog {
        println!(
            "#{} {} (score {}) {}",
            def.id, def.name, def.required_score, def.image_uri
        );
    }
}

fn print_gate(gate: &OwnerGate) {
    match gate {
        OwnerGate::Owner => println!("connected account owns the contract"),
        OwnerGate::NotOwner { owner } => println!("not the owner (owner is {owner})"),
        OwnerGate::Unknown => println!("ownership unknown"),
    }
}

fn print_supply<P, K: ContractConnector>(controller: &AppController<P, K>) {
    for def in controller.view().catalog() {
        println!("#{} {} supply {}", def.id, def.name, def.supply_label());
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command__every_subcommand_has_help() {
        let command = Args::command();
        let missing: Vec<&str> = command
            .get_subcommands()
            .filter(|sub| sub.get_about().is_none())
            .map(|sub| sub.get_name())
            .collect();
        assert!(missing.is_empty(), "subcommands without help: {missing:?}");
    }

    #[test]
    fn try_from__local_uses_default_url() {
        let args = Args::parse_from(["achievement-client", "--local"]);
        let config = AppConfig::try_from(args).unwrap();
        assert_eq!(config.network.url(), DEFAULT_LOCAL_RPC_URL);
        assert_eq!(config.command, Command::Status);
    }

    #[test]
    fn parse__network_flag_is_required() {
        assert!(Args::try_parse_from(["achievement-client", "status"]).is_err());
        assert!(
            Args::try_parse_from([
                "achievement-client",
                "--local",
                "--rpc-url",
                "http://node:8545"
            ])
            .is_err()
        );
    }

    #[test]
    fn parse__create_achievement_keeps_raw_numeric_text() {
        let args = Args::parse_from([
            "achievement-client",
            "--rpc-url",
            "http://node:8545",
            "create-achievement",
            "--name",
            "Legend",
            "--image-uri",
            "ipfs://legend",
            "--required-score",
            "9007199254740993",
            "--max-supply",
            "1",
        ]);
        let config = AppConfig::try_from(args).unwrap();
        assert!(matches!(config.network, NetworkTarget::Remote { .. }));
        assert!(matches!(
            config.command,
            Command::CreateAchievement { ref required_score, .. } if required_score == "9007199254740993"
        ));
    }
}
