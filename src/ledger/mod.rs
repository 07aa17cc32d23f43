/// Fjall-based persistence for orchestrator state
///
/// Archive contents and upload markers live on the filesystem. The ledger
/// keeps the small pieces of loop state that would otherwise be lost on a
/// restart:
///
/// - the command cursor, so processed chat commands are not executed again
/// - the date of the last retention sweep
/// - the date of the last daily report per channel, so a restart inside the
///   report hour does not send it twice
///
/// ## Usage
///
/// ```rust,ignore
/// use lapsebox::ledger::StateLedger;
///
/// let ledger = StateLedger::open("data/state")?;
/// let cursor = ledger.command_cursor()?;
/// ```
pub mod error;
pub mod partitions;
pub mod store;

pub use error::{LedgerError, Result};
pub use store::StateLedger;
