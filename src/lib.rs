pub mod account;

pub mod client;

pub mod contract;

pub mod error;

pub mod orchestrator;

pub mod rpc;

pub mod sync;

pub mod test_helpers;

pub mod wallet;

pub use account::Account;
pub use alloy::primitives::U256;

pub mod game_types {
    alloy::sol! {
        #[sol(rpc)]
        interface AchievementGame {
            function getOwner() external view returns (address owner);

            function getPlayerInfo(address player)
                external
                view
                returns (
                    string memory username,
                    uint256 highScore,
                    uint256 totalGames,
                    uint256[] memory ownedNFTs
                );

            function getAllAchievements()
                external
                view
                returns (
                    string[] memory names,
                    string[] memory imageURIs,
                    uint256[] memory requiredScores,
                    uint256[] memory maxSupplies,
                    uint256[] memory currentSupplies
                );

            function registerPlayer(string memory username) external;

            function updateScore(uint256 score) external;

            function createAchievement(
                string memory name,
                string memory imageURI,
                uint256 requiredScore,
                uint256 maxSupply
            ) external;
        }
    }
}

/// Deployment of the achievement contract every session binds to.
pub const GAME_CONTRACT_ADDRESS: &str = "0x7a2088a1bFc9d81c55368AE168C2C02570cB814F";
