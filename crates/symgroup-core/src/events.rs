//! Engine state-change events and notification suppression.
//!
//! The engine publishes [`DebuggerEvent`]s whenever the debuggee's state
//! changes underneath us (it resumed, stopped, loaded a module or the session
//! ended). The [`Session`](crate::session::Session) drains them before every
//! command and throws away trees and caches that became stale.
//!
//! Injected function calls resume and stop the debuggee as a side effect.
//! Those nested transitions must not reach the session, so the caller holds a
//! [`NotificationGuard`] for the duration of the call: while it is alive the
//! queue is disabled, and when it drops every event that arrived in the
//! meantime is discarded and the previous state is restored.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::mpsc;

use tracing::trace;

use crate::types::ThreadId;

/// Event emitted by a debugger engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerEvent
{
    /// Target stopped (breakpoint, exception, end of an injected call)
    TargetStopped
    {
        /// Thread responsible for the stop, if known
        thread: Option<ThreadId>,
        /// True if the stop was caused by an unhandled exception
        exception: bool,
    },
    /// Target resumed execution
    TargetResumed,
    /// A module was mapped into the debuggee
    ModuleLoaded
    {
        name: String
    },
    /// The debug session is over
    SessionEnded,
}

impl DebuggerEvent
{
    /// Human-readable description of the event.
    #[must_use]
    pub fn describe(&self) -> String
    {
        match self {
            Self::TargetStopped { thread, exception } => {
                let mut description = if *exception {
                    "Target stopped on exception".to_string()
                } else {
                    "Target stopped".to_string()
                };
                if let Some(thread) = thread {
                    description.push_str(&format!(" (thread {})", thread.raw()));
                }
                description
            }
            Self::TargetResumed => "Target resumed execution".to_string(),
            Self::ModuleLoaded { name } => format!("Module loaded: {name}"),
            Self::SessionEnded => "Debug session ended".to_string(),
        }
    }
}

/// Sender side of the event channel.
pub type DebuggerEventSender = mpsc::Sender<DebuggerEvent>;
/// Receiver side of the event channel.
pub type DebuggerEventReceiver = mpsc::Receiver<DebuggerEvent>;

/// Create a new event channel.
#[must_use]
pub fn event_channel() -> (DebuggerEventSender, DebuggerEventReceiver)
{
    mpsc::channel()
}

/// Receiving end of the engine's events with a "notifications enabled" switch.
#[derive(Debug)]
pub struct EventQueue
{
    receiver: DebuggerEventReceiver,
    enabled: Cell<bool>,
    // Events that were already queued when suppression started
    pending: RefCell<VecDeque<DebuggerEvent>>,
}

impl EventQueue
{
    #[must_use]
    pub fn new(receiver: DebuggerEventReceiver) -> Self
    {
        Self {
            receiver,
            enabled: Cell::new(true),
            pending: RefCell::new(VecDeque::new()),
        }
    }

    /// A queue whose sender side is already gone. Used for engines that do
    /// not publish events.
    #[must_use]
    pub fn detached() -> Self
    {
        let (_, receiver) = event_channel();
        Self::new(receiver)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool
    {
        self.enabled.get()
    }

    /// Disable notifications until the returned guard is dropped.
    ///
    /// Events already queued are kept and delivered by the next
    /// [`drain`](Self::drain) after the guard is gone.
    #[must_use = "notifications are re-enabled as soon as the guard is dropped"]
    pub fn suppress(&self) -> NotificationGuard<'_>
    {
        self.pending.borrow_mut().extend(self.receiver.try_iter());
        let previous = self.enabled.replace(false);
        NotificationGuard { queue: self, previous }
    }

    /// Take all deliverable events. Returns nothing while suppressed.
    #[must_use]
    pub fn drain(&self) -> Vec<DebuggerEvent>
    {
        if !self.enabled.get() {
            return Vec::new();
        }
        let mut events: Vec<DebuggerEvent> = self.pending.borrow_mut().drain(..).collect();
        events.extend(self.receiver.try_iter());
        events
    }
}

/// RAII guard returned by [`EventQueue::suppress`].
#[derive(Debug)]
pub struct NotificationGuard<'a>
{
    queue: &'a EventQueue,
    previous: bool,
}

impl Drop for NotificationGuard<'_>
{
    fn drop(&mut self)
    {
        for event in self.queue.receiver.try_iter() {
            trace!("Discarding suppressed event: {}", event.describe());
        }
        self.queue.enabled.set(self.previous);
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_events_delivered_when_enabled()
    {
        let (sender, receiver) = event_channel();
        let queue = EventQueue::new(receiver);
        sender.send(DebuggerEvent::TargetResumed).unwrap();
        assert_eq!(queue.drain(), vec![DebuggerEvent::TargetResumed]);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_suppressed_events_are_discarded()
    {
        let (sender, receiver) = event_channel();
        let queue = EventQueue::new(receiver);
        sender.send(DebuggerEvent::ModuleLoaded { name: "Qt5Cored".into() }).unwrap();
        {
            let _guard = queue.suppress();
            assert!(!queue.is_enabled());
            sender.send(DebuggerEvent::TargetResumed).unwrap();
            sender
                .send(DebuggerEvent::TargetStopped { thread: None, exception: false })
                .unwrap();
            assert!(queue.drain().is_empty());
        }
        assert!(queue.is_enabled());
        // The event queued before suppression survives
        assert_eq!(queue.drain(), vec![DebuggerEvent::ModuleLoaded { name: "Qt5Cored".into() }]);
    }

    #[test]
    fn test_nested_suppression_restores_previous_state()
    {
        let queue = EventQueue::detached();
        let outer = queue.suppress();
        {
            let _inner = queue.suppress();
        }
        assert!(!queue.is_enabled());
        drop(outer);
        assert!(queue.is_enabled());
    }

    #[test]
    fn test_describe()
    {
        let event = DebuggerEvent::TargetStopped {
            thread: Some(ThreadId(7)),
            exception: true,
        };
        assert_eq!(event.describe(), "Target stopped on exception (thread 7)");
    }
}
