//! Server lifecycle: the state machine that gates which methods are legal
//! at any given moment —
//! `Uninitialized -> Initializing -> Ready -> ShuttingDown -> Exited` —
//! plus the capability negotiation that happens on the
//! `Uninitialized -> Initializing` edge.

use dls_lsp::lifecycle::{ClientCapabilities, ServerCapabilities};
use dls_rpc::{error_code, ResponseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Ready,
    ShuttingDown,
    Exited,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("{method} is not valid while the server is {state:?}")]
    IllegalTransition { method: String, state: LifecycleState },
}

impl From<LifecycleError> for ResponseError {
    fn from(err: LifecycleError) -> Self {
        match &err {
            LifecycleError::IllegalTransition { state, .. } if *state == LifecycleState::Uninitialized => {
                ResponseError::new(error_code::SERVER_NOT_INITIALIZED, err.to_string())
            }
            _ => ResponseError::new(error_code::INVALID_REQUEST, err.to_string()),
        }
    }
}

/// Drives the lifecycle state machine. Holds the negotiated
/// [`ServerCapabilities`] once `initialize` has run, so later stages can
/// consult what was advertised.
pub struct Lifecycle {
    state: LifecycleState,
    capabilities: Option<ServerCapabilities>,
    shutdown_received: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            capabilities: None,
            shutdown_received: false,
        }
    }
}

impl Lifecycle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    #[must_use]
    pub fn capabilities(&self) -> Option<&ServerCapabilities> {
        self.capabilities.as_ref()
    }

    /// `initialize`: legal only from `Uninitialized`. `negotiate` computes
    /// the capabilities to advertise from the client's declared ones; the
    /// framework does not hardcode them so a binary embedding this crate
    /// can decide what it actually supports.
    pub fn initialize(
        &mut self,
        _client_capabilities: &ClientCapabilities,
        capabilities: ServerCapabilities,
    ) -> Result<(), LifecycleError> {
        if self.state != LifecycleState::Uninitialized {
            return Err(LifecycleError::IllegalTransition {
                method: "initialize".to_string(),
                state: self.state,
            });
        }
        self.state = LifecycleState::Initializing;
        self.capabilities = Some(capabilities);
        Ok(())
    }

    /// `initialized` notification: completes the handshake, legal only
    /// from `Initializing`.
    pub fn initialized(&mut self) -> Result<(), LifecycleError> {
        if self.state != LifecycleState::Initializing {
            return Err(LifecycleError::IllegalTransition {
                method: "initialized".to_string(),
                state: self.state,
            });
        }
        self.state = LifecycleState::Ready;
        Ok(())
    }

    /// Any request other than `initialize` requires the server be past
    /// the handshake; no request is served before initialize completes.
    pub fn require_ready(&self, method: impl Into<String>) -> Result<(), LifecycleError> {
        match self.state {
            LifecycleState::Ready => Ok(()),
            state => Err(LifecycleError::IllegalTransition { method: method.into(), state }),
        }
    }

    /// `shutdown`: legal from `Ready`, moves to `ShuttingDown`. The Router
    /// is expected to reject all further requests except `exit` once this
    /// returns.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        if self.state != LifecycleState::Ready {
            return Err(LifecycleError::IllegalTransition {
                method: "shutdown".to_string(),
                state: self.state,
            });
        }
        self.state = LifecycleState::ShuttingDown;
        self.shutdown_received = true;
        Ok(())
    }

    /// `exit` notification: terminal in every state it's reachable from.
    pub fn exit(&mut self) {
        self.state = LifecycleState::Exited;
    }

    /// The process exit code `exit` should use: 0 if shutdown happened
    /// first, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.shutdown_received {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_is_rejected_a_second_time() {
        let mut lc = Lifecycle::new();
        lc.initialize(&ClientCapabilities::default(), ServerCapabilities::default())
            .unwrap();
        assert!(lc
            .initialize(&ClientCapabilities::default(), ServerCapabilities::default())
            .is_err());
    }

    #[test]
    fn requests_before_initialize_are_server_not_initialized() {
        let lc = Lifecycle::new();
        let err = lc.require_ready("textDocument/hover").unwrap_err();
        let response: ResponseError = err.into();
        assert_eq!(response.code, error_code::SERVER_NOT_INITIALIZED);
    }

    #[test]
    fn full_handshake_then_shutdown_then_exit() {
        let mut lc = Lifecycle::new();
        lc.initialize(&ClientCapabilities::default(), ServerCapabilities::default())
            .unwrap();
        lc.initialized().unwrap();
        assert_eq!(lc.state(), LifecycleState::Ready);
        lc.require_ready("textDocument/hover").unwrap();
        lc.shutdown().unwrap();
        lc.exit();
        assert_eq!(lc.state(), LifecycleState::Exited);
        assert_eq!(lc.exit_code(), 0);
    }

    #[test]
    fn exit_without_shutdown_is_an_ungraceful_exit_code() {
        let mut lc = Lifecycle::new();
        assert_eq!(lc.exit_code(), 1);
        lc.exit();
        assert_eq!(lc.exit_code(), 1);
    }
}
