//! Request scope: the connections opened for one request

use std::sync::Arc;

use futures::future::join_all;

use crate::logging::Logger;
use super::error::ConnectionError;
use super::handle::{close_session, ConnectionHandle, ConnectionState};
use super::manager::OpenOutcome;

/// Owns the ready connections of a single request
///
/// Handles are released by [`close_all`](Self::close_all). A scope dropped
/// with sessions still open (aborted task, panic) hands them to the current
/// tokio runtime to be closed, so each session is closed exactly once on
/// every exit path.
pub struct RequestScope {
    handles: Vec<ConnectionHandle>,
    logger: Arc<dyn Logger>,
}

impl RequestScope {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            handles: Vec::new(),
            logger,
        }
    }

    /// Keep ready handles (in input order) and return the failures
    pub fn from_outcomes(outcomes: Vec<OpenOutcome>, logger: Arc<dyn Logger>) -> (Self, Vec<ConnectionError>) {
        let mut scope = Self::new(logger);
        let mut errors = Vec::new();
        for (_, result) in outcomes {
            match result {
                Ok(handle) => scope.handles.push(handle),
                Err(e) => errors.push(e),
            }
        }
        (scope, errors)
    }

    /// Add an already opened handle
    pub fn push(&mut self, handle: ConnectionHandle) {
        self.handles.push(handle);
    }

    /// Ready handles, in registry order
    pub fn handles(&self) -> &[ConnectionHandle] {
        &self.handles
    }

    /// Handle for a server id
    pub fn handle(&self, server_id: &str) -> Option<&ConnectionHandle> {
        self.handles.iter().find(|h| h.server_id() == server_id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Number of handles still holding a live session
    pub fn open_count(&self) -> usize {
        self.handles
            .iter()
            .filter(|h| h.state() == ConnectionState::Ready)
            .count()
    }

    /// Close every handle concurrently; already closed handles are skipped
    pub async fn close_all(&mut self) {
        let open = self.open_count();
        if open == 0 {
            return;
        }
        self.logger.debug(&format!("[RequestScope] closing {} connections", open));
        join_all(self.handles.iter_mut().map(|h| h.close())).await;
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        let leftover: Vec<_> = self
            .handles
            .iter_mut()
            .filter_map(|h| {
                let timeout = h.tool_timeout();
                let logger = h.logger();
                let id = h.server_id().to_string();
                h.take_session().map(|s| (id, s, timeout, logger))
            })
            .collect();

        if leftover.is_empty() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                self.logger.warn(&format!(
                    "[RequestScope] dropped with {} open connections; closing in background",
                    leftover.len()
                ));
                for (id, session, timeout, logger) in leftover {
                    runtime.spawn(async move {
                        close_session(&id, session, timeout, logger.as_ref()).await;
                    });
                }
            }
            Err(_) => {
                self.logger.error(&format!(
                    "[RequestScope] dropped outside a runtime; {} connections released without close",
                    leftover.len()
                ));
            }
        }
    }
}

impl std::fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScope")
            .field("handles", &self.handles)
            .finish()
    }
}
