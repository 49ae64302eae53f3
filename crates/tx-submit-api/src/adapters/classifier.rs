//! Era classification backed by `ledger-era`.

use ledger_era::{ClassifiedTx, EraError};

use crate::ports::EraClassifier;

/// Structural era detection over the submitted bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerEraClassifier;

impl EraClassifier for LedgerEraClassifier {
    fn classify(&self, tx: &[u8]) -> Result<ClassifiedTx, EraError> {
        ledger_era::classify(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_era::fixtures::transaction;
    use ledger_era::{Era, TxId};

    #[test]
    fn test_classifies_babbage_fixture() {
        let fixture = transaction(Era::Babbage);
        let classified = LedgerEraClassifier.classify(&fixture.bytes).unwrap();
        assert_eq!(classified.era, Era::Babbage);
        assert_eq!(classified.tx_id, TxId::from_body(&fixture.body));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(LedgerEraClassifier.classify(&[0xff, 0x00]).is_err());
    }
}
