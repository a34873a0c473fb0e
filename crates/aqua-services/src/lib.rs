//! Aqua Services Layer
//!
//! Remote stages that follow the upload: the image transform (enhancement)
//! call and the best-effort ledger. The coordinator in `aqua-processing`
//! depends on the traits and the recorder exported here.

pub mod enhance;
pub mod ledger;

pub use enhance::{EnhancementInvoker, HttpEnhancementInvoker};
pub use ledger::{
    create_ledger_recorder, HttpLedgerSink, LedgerRecorder, LedgerSink, NotionLedgerSink,
};
