pub mod ledger;
pub mod show;
pub mod win;

pub use ledger::{
    AppendOutcome, AppendWinEvent, DeleteLedger, FindWinEvent, LedgerError, LedgerProcessor,
    ListWinEvents, LoadLedger, PersistLedger, ResetLedger, SearchWinEvents, SessionLedger,
};
pub use show::{ShowId, ShowRecord, ShowRegistry, ShowStatus};
pub use win::{EventStatus, InvalidCandidate, WinCandidate, WinEvent, WinIdentity, parse_amount};
