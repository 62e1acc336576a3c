pub mod model;
pub mod pool;
pub mod process;
pub mod utxo;

pub use model::{Transaction, TxInput, TxOutput};
pub use pool::TransactionPool;
pub use process::{LedgerError, process_transactions};
pub use utxo::{OutPoint, UtxoSet};

/// Block subsidy minted by a coinbase transaction.
pub const COINBASE_AMOUNT: u64 = 50;
