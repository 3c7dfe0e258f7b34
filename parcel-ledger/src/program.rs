//! Programs hosted by the ledger

use crate::{context::InvokeContext, types::Address, Result};

/// On-ledger program
///
/// The ledger routes every transaction addressed to [`Program::program_id`]
/// into [`Program::process`] with the raw instruction bytes. Returning an
/// error discards every staged write in the context.
pub trait Program: Send + Sync + 'static {
    /// Address that owns this program's records
    fn program_id(&self) -> Address;

    /// Execute one instruction
    fn process(&self, ctx: &mut InvokeContext<'_>, data: &[u8]) -> Result<()>;
}
