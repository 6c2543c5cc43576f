//! Ledger service - read-only views of the server's records

use std::sync::Arc;

use crate::domain::result::Result;
use crate::domain::{LedgerBlock, ServerTransaction};
use crate::ports::TransactionApi;

pub struct LedgerService {
    api: Arc<dyn TransactionApi>,
}

impl LedgerService {
    pub fn new(api: Arc<dyn TransactionApi>) -> Self {
        Self { api }
    }

    /// Transactions recorded by the server
    pub async fn transactions(&self) -> Result<Vec<ServerTransaction>> {
        self.api.list_transactions().await
    }

    /// Blocks of the server's ledger, as stored
    pub async fn blockchain(&self) -> Result<Vec<LedgerBlock>> {
        self.api.list_blockchain().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cybervault_api::CyberVaultClient;
    use crate::adapters::mock_api::{MockConfig, MockCyberVaultServer};
    use crate::domain::CsrfToken;
    use std::time::Duration;

    #[tokio::test]
    async fn test_views_through_http_client() {
        let server = MockCyberVaultServer::start(MockConfig::default()).unwrap();
        let client = CyberVaultClient::new(
            &server.base_url(),
            CsrfToken::generate(),
            Duration::from_secs(5),
        )
        .unwrap();
        let ledger = LedgerService::new(Arc::new(client));

        let transactions = ledger.transactions().await.unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions.iter().filter(|tx| tx.fraud_flag).count(), 1);

        let blocks = ledger.blockchain().await.unwrap();
        assert_eq!(blocks[0].block_hash, "00ab");
    }
}
