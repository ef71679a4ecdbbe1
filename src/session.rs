//! Context and session lifecycle against the trusted command service.
//!
//! Both handles release themselves on drop, so every exit path after a
//! successful open (including failed invocations and file errors) closes the
//! session and finalizes the context.

use crate::error::Error;
use crate::teec::{LoginMethod, Operation, TeecError, TeecUuid};
use clap::ValueEnum;
use tracing::{debug, info};

pub type SessionId = u32;

/// A transport to a TEE: the native client library or an emulation of it.
pub trait TeeClient {
    fn open_session(&mut self, uuid: &TeecUuid, login: LoginMethod)
        -> Result<SessionId, TeecError>;

    fn invoke_command(
        &mut self,
        session: SessionId,
        command: u32,
        op: &mut Operation,
    ) -> Result<(), TeecError>;

    fn close_session(&mut self, session: SessionId);

    /// Release the context. Called once, after every session is closed.
    fn finalize(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// In-process trusted application, no secure hardware needed.
    Emulated,
    /// OP-TEE through libteec (requires the `optee` feature).
    Optee,
}

impl Default for BackendKind {
    fn default() -> Self {
        if cfg!(feature = "optee") {
            BackendKind::Optee
        } else {
            BackendKind::Emulated
        }
    }
}

pub struct Context {
    client: Box<dyn TeeClient>,
}

impl Context {
    pub fn initialize(backend: BackendKind) -> Result<Self, Error> {
        debug!(?backend, "initializing TEE context");
        let client: Box<dyn TeeClient> = match backend {
            BackendKind::Emulated => Box::new(crate::emulated::EmulatedTee::new()),
            #[cfg(feature = "optee")]
            BackendKind::Optee => Box::new(
                crate::optee::OpteeClient::initialize()
                    .map_err(|e| Error::connection("TEEC_InitializeContext", e))?,
            ),
            #[cfg(not(feature = "optee"))]
            BackendKind::Optee => {
                return Err(Error::Unsupported(
                    "built without the `optee` feature; use --backend emulated",
                ))
            }
        };
        Ok(Self { client })
    }

    pub fn with_client(client: Box<dyn TeeClient>) -> Self {
        Self { client }
    }

    /// Open a session on `uuid` with public (credential-less) login.
    pub fn open_session(&mut self, uuid: &TeecUuid) -> Result<Session<'_>, Error> {
        let id = self
            .client
            .open_session(uuid, LoginMethod::Public)
            .map_err(|e| Error::connection("TEEC_OpenSession", e))?;
        info!(%uuid, session = id, "session opened");
        Ok(Session { ctx: self, id })
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.client.finalize();
        debug!("TEE context finalized");
    }
}

pub struct Session<'ctx> {
    ctx: &'ctx mut Context,
    id: SessionId,
}

impl Session<'_> {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Invoke `command` synchronously; blocks until the service returns.
    pub fn invoke(&mut self, command: u32, op: &mut Operation) -> Result<(), Error> {
        debug!(session = self.id, command, param_types = op.param_types(), "invoking command");
        self.ctx
            .client
            .invoke_command(self.id, command, op)
            .map_err(|e| Error::invocation(command, e))
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.ctx.client.close_session(self.id);
        debug!(session = self.id, "session closed");
    }
}
