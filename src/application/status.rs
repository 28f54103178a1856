//! Roster status with live balances

use std::sync::Arc;

use crate::domain::wallet::{lamports_to_sol, WalletRecord};
use crate::ports::network::NetworkClient;
use crate::ports::roster::{RosterError, RosterStore};

#[derive(Debug, Clone, PartialEq)]
pub struct WalletStatus {
    pub record: WalletRecord,
    /// `None` when the network could not be queried
    pub live_balance_sol: Option<f64>,
}

pub async fn collect_status(
    roster: &Arc<dyn RosterStore>,
    network: &Arc<dyn NetworkClient>,
) -> Result<Vec<WalletStatus>, RosterError> {
    let records = roster.read_all().await?;
    let mut statuses = Vec::with_capacity(records.len());

    for record in records {
        let live_balance_sol = match record.pubkey() {
            Some(address) => match network.balance(&address).await {
                Ok(lamports) => Some(lamports_to_sol(lamports)),
                Err(e) => {
                    tracing::warn!("Balance query for {} failed: {}", record.public_address, e);
                    None
                }
            },
            None => None,
        };
        statuses.push(WalletStatus {
            record,
            live_balance_sol,
        });
    }

    Ok(statuses)
}
