//! Injected function calls.
//!
//! Running code inside the debuggee resumes it and waits for it to stop
//! again. While that happens, state-change notifications are suppressed so
//! the session does not mistake the nested resume for a real one. If the call
//! crashes, the debuggee is resumed once more with "exception not handled"
//! semantics to leave the faulting call, and the call is reported as failed.

use tracing::{debug, warn};

use super::{CallError, DebugTarget};
use crate::error::{Result, SymbolGroupError};
use crate::events::EventQueue;

/// Run `expression` in the debuggee with notifications suppressed.
///
/// ## Errors
///
/// [`SymbolGroupError::InjectedCall`] if the call failed or crashed.
pub fn call_function(target: &mut dyn DebugTarget, events: &EventQueue, expression: &str) -> Result<u64>
{
    let _guard = events.suppress();
    debug!("Injecting call: {expression}");
    match target.call_function(expression) {
        Ok(value) => Ok(value),
        Err(CallError::Crashed(reason)) => {
            warn!("Injected call '{expression}' crashed: {reason}");
            if let Err(e) = target.resume_unhandled() {
                warn!("Failed to recover from crashed call: {e}");
            }
            Err(SymbolGroupError::InjectedCall(format!("{expression}: {reason}")))
        }
        Err(CallError::Failed(reason)) => Err(SymbolGroupError::InjectedCall(format!("{expression}: {reason}"))),
    }
}
