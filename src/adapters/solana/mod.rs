pub mod rpc;
pub mod wallet;

pub use rpc::SolanaClient;
pub use wallet::{sign_base64_transaction, KeyLoadError, WalletManager};
