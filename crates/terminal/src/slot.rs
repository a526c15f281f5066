//! The run terminal: at most one live session, replaced on every run

use parking_lot::Mutex;

use crate::{TerminalError, TerminalFactory, TerminalId, TerminalOptions, TerminalSession};

/// Single shared slot for the terminal used by run commands
#[derive(Default)]
pub struct RunTerminal {
    current: Mutex<Option<Box<dyn TerminalSession>>>,
}

impl RunTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispose the previous session, then create and store a new one.
    ///
    /// The old session is disposed before the factory is called, so two
    /// sessions never exist at the same time.
    pub fn replace(
        &self,
        factory: &dyn TerminalFactory,
        options: TerminalOptions,
    ) -> Result<TerminalId, TerminalError> {
        let mut slot = self.current.lock();
        if let Some(mut previous) = slot.take() {
            tracing::debug!("Replacing run terminal {:?}", previous.id());
            previous.dispose();
        }

        let session = factory.create(options)?;
        let id = session.id();
        *slot = Some(session);
        Ok(id)
    }

    /// Run `f` against the current session
    pub fn with_current<T>(&self, f: impl FnOnce(&mut dyn TerminalSession) -> T) -> Option<T> {
        let mut slot = self.current.lock();
        slot.as_mut().map(|session| f(session.as_mut()))
    }

    /// Remove the current session from the slot without disposing it
    pub fn take(&self) -> Option<Box<dyn TerminalSession>> {
        self.current.lock().take()
    }

    pub fn current_id(&self) -> Option<TerminalId> {
        self.current.lock().as_ref().map(|s| s.id())
    }
}
