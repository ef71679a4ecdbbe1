//! OP-TEE back end over libteec (`optee_client`).
//!
//! `TEEC_Context` and `TEEC_Session` are owned as heap storage that never
//! moves, since libteec keeps pointers into them between calls.

use crate::session::{SessionId, TeeClient};
use crate::teec::{
    LoginMethod, Operation, Param, TeecError, TeecUuid, TEEC_ERROR_BAD_STATE, TEEC_ORIGIN_API,
    TEEC_SUCCESS,
};
use libc::{c_char, c_void, size_t};
use std::collections::HashMap;
use tracing::warn;

#[repr(C)]
struct RawUuid {
    time_low: u32,
    time_mid: u16,
    time_hi_and_version: u16,
    clock_seq_and_node: [u8; 8],
}

// Layout differs between optee_client releases; callers only need storage
// that is large and aligned enough.
#[repr(C, align(8))]
struct RawContext([u8; 64]);

#[repr(C, align(8))]
struct RawSession([u8; 64]);

#[repr(C)]
#[derive(Clone, Copy)]
struct RawTempMemRef {
    buffer: *mut c_void,
    size: size_t,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawRegisteredMemRef {
    parent: *mut c_void,
    size: size_t,
    offset: size_t,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawValue {
    a: u32,
    b: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
union RawParameter {
    tmpref: RawTempMemRef,
    memref: RawRegisteredMemRef,
    value: RawValue,
}

#[repr(C)]
struct RawOperation {
    started: u32,
    param_types: u32,
    params: [RawParameter; 4],
    session: *mut RawSession,
}

#[link(name = "teec")]
extern "C" {
    fn TEEC_InitializeContext(name: *const c_char, context: *mut RawContext) -> u32;
    fn TEEC_FinalizeContext(context: *mut RawContext);
    fn TEEC_OpenSession(
        context: *mut RawContext,
        session: *mut RawSession,
        destination: *const RawUuid,
        connection_method: u32,
        connection_data: *const c_void,
        operation: *mut RawOperation,
        return_origin: *mut u32,
    ) -> u32;
    fn TEEC_CloseSession(session: *mut RawSession);
    fn TEEC_InvokeCommand(
        session: *mut RawSession,
        command_id: u32,
        operation: *mut RawOperation,
        return_origin: *mut u32,
    ) -> u32;
}

pub struct OpteeClient {
    context: Box<RawContext>,
    sessions: HashMap<SessionId, Box<RawSession>>,
    next_session: SessionId,
    finalized: bool,
}

impl OpteeClient {
    /// `TEEC_InitializeContext` on the default TEE.
    pub fn initialize() -> Result<Self, TeecError> {
        let mut context = Box::new(RawContext([0; 64]));
        let rc = unsafe { TEEC_InitializeContext(std::ptr::null(), &mut *context) };
        if rc != TEEC_SUCCESS {
            return Err(TeecError::new(rc, TEEC_ORIGIN_API));
        }
        Ok(Self {
            context,
            sessions: HashMap::new(),
            next_session: 1,
            finalized: false,
        })
    }
}

fn marshal(op: &mut Operation) -> RawOperation {
    let zero = RawParameter {
        value: RawValue { a: 0, b: 0 },
    };
    let mut raw = RawOperation {
        started: 0,
        param_types: op.param_types(),
        params: [zero; 4],
        session: std::ptr::null_mut(),
    };
    for (slot, p) in raw.params.iter_mut().zip(op.params.iter_mut()) {
        match p {
            Param::None => {}
            Param::Value { a, b, .. } => *slot = RawParameter { value: RawValue { a: *a, b: *b } },
            Param::TempMemRef { buffer, size, .. } => {
                *slot = RawParameter {
                    tmpref: RawTempMemRef {
                        buffer: buffer.as_mut_ptr().cast(),
                        size: (*size).min(buffer.len()),
                    },
                }
            }
        }
    }
    raw
}

fn unmarshal(raw: &RawOperation, op: &mut Operation) {
    for (slot, p) in raw.params.iter().zip(op.params.iter_mut()) {
        match p {
            Param::None => {}
            // Union reads match the variant written by `marshal` for this slot.
            Param::Value { a, b, .. } => unsafe {
                *a = slot.value.a;
                *b = slot.value.b;
            },
            Param::TempMemRef { size, .. } => unsafe {
                *size = slot.tmpref.size;
            },
        }
    }
}

impl TeeClient for OpteeClient {
    fn open_session(
        &mut self,
        uuid: &TeecUuid,
        login: LoginMethod,
    ) -> Result<SessionId, TeecError> {
        let destination = RawUuid {
            time_low: uuid.time_low,
            time_mid: uuid.time_mid,
            time_hi_and_version: uuid.time_hi_and_version,
            clock_seq_and_node: uuid.clock_seq_and_node,
        };
        let mut session = Box::new(RawSession([0; 64]));
        let mut origin = 0u32;
        let rc = unsafe {
            TEEC_OpenSession(
                &mut *self.context,
                &mut *session,
                &destination,
                login.raw(),
                std::ptr::null(),
                std::ptr::null_mut(),
                &mut origin,
            )
        };
        if rc != TEEC_SUCCESS {
            return Err(TeecError::new(rc, origin));
        }
        let id = self.next_session;
        self.next_session += 1;
        self.sessions.insert(id, session);
        Ok(id)
    }

    fn invoke_command(
        &mut self,
        session: SessionId,
        command: u32,
        op: &mut Operation,
    ) -> Result<(), TeecError> {
        let raw_session = self
            .sessions
            .get_mut(&session)
            .ok_or(TeecError::new(TEEC_ERROR_BAD_STATE, TEEC_ORIGIN_API))?;
        let mut raw = marshal(op);
        let mut origin = 0u32;
        let rc = unsafe { TEEC_InvokeCommand(&mut **raw_session, command, &mut raw, &mut origin) };
        unmarshal(&raw, op);
        if rc != TEEC_SUCCESS {
            return Err(TeecError::new(rc, origin));
        }
        Ok(())
    }

    fn close_session(&mut self, session: SessionId) {
        match self.sessions.remove(&session) {
            Some(mut raw) => unsafe { TEEC_CloseSession(&mut *raw) },
            None => warn!(session, "close of unknown session ignored"),
        }
    }

    fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        for (_, mut raw) in self.sessions.drain() {
            unsafe { TEEC_CloseSession(&mut *raw) };
        }
        unsafe { TEEC_FinalizeContext(&mut *self.context) };
        self.finalized = true;
    }
}

impl Drop for OpteeClient {
    fn drop(&mut self) {
        self.finalize();
    }
}
