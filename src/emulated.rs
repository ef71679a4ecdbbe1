//! In-process stand-in for the TEEencrypt trusted application.
//!
//! Speaks the same command protocol as the real TA: a shift cipher over ASCII
//! letters with a random per-run key, handed back to the host sealed under a
//! root key that never leaves the "secure side".

use crate::session::{SessionId, TeeClient};
use crate::teec::{
    param_types, LoginMethod, Operation, Param, ParamType, TeecError, TeecUuid, CMD_DEC_VALUE,
    CMD_ENC_VALUE, TEEC_ERROR_BAD_PARAMETERS, TEEC_ERROR_BAD_STATE, TEEC_ERROR_ITEM_NOT_FOUND,
    TEEC_ERROR_NOT_SUPPORTED, TEEC_ORIGIN_API, TEEC_ORIGIN_TEE, TEEC_ORIGIN_TRUSTED_APP,
};
use rand_core::{OsRng, RngCore};
use std::collections::HashSet;
use tracing::trace;

const ALPHABET_LEN: u32 = 26;
const ROOT_KEY: u32 = 17;

const EXPECTED_PARAM_TYPES: u32 = param_types(
    ParamType::MemrefTempOutput,
    ParamType::ValueInout,
    ParamType::None,
    ParamType::None,
);

pub struct EmulatedTee {
    uuid: TeecUuid,
    sessions: HashSet<SessionId>,
    next_session: SessionId,
}

impl EmulatedTee {
    pub fn new() -> Self {
        Self::serving(TeecUuid::DEFAULT_TA)
    }

    /// An emulation answering to `uuid` instead of the built-in identifier.
    pub fn serving(uuid: TeecUuid) -> Self {
        Self {
            uuid,
            sessions: HashSet::new(),
            next_session: 1,
        }
    }
}

impl Default for EmulatedTee {
    fn default() -> Self {
        Self::new()
    }
}

impl TeeClient for EmulatedTee {
    fn open_session(
        &mut self,
        uuid: &TeecUuid,
        _login: LoginMethod,
    ) -> Result<SessionId, TeecError> {
        if *uuid != self.uuid {
            return Err(TeecError::new(TEEC_ERROR_ITEM_NOT_FOUND, TEEC_ORIGIN_TEE));
        }
        let id = self.next_session;
        self.next_session += 1;
        self.sessions.insert(id);
        Ok(id)
    }

    fn invoke_command(
        &mut self,
        session: SessionId,
        command: u32,
        op: &mut Operation,
    ) -> Result<(), TeecError> {
        if !self.sessions.contains(&session) {
            return Err(TeecError::new(TEEC_ERROR_BAD_STATE, TEEC_ORIGIN_API));
        }
        match command {
            CMD_ENC_VALUE => encrypt(op),
            CMD_DEC_VALUE => decrypt(op),
            _ => Err(TeecError::new(TEEC_ERROR_NOT_SUPPORTED, TEEC_ORIGIN_TRUSTED_APP)),
        }
    }

    fn close_session(&mut self, session: SessionId) {
        self.sessions.remove(&session);
    }

    fn finalize(&mut self) {
        self.sessions.clear();
    }
}

fn bad_parameters() -> TeecError {
    TeecError::new(TEEC_ERROR_BAD_PARAMETERS, TEEC_ORIGIN_TRUSTED_APP)
}

/// Split the operation into its text buffer and key value, checking the layout.
fn text_and_key(op: &mut Operation) -> Result<(&mut [u8], &mut u32), TeecError> {
    if op.param_types() != EXPECTED_PARAM_TYPES {
        return Err(bad_parameters());
    }
    let (head, tail) = op.params.split_at_mut(1);
    match (&mut head[0], &mut tail[0]) {
        (Param::TempMemRef { buffer, size, .. }, Param::Value { a, .. }) => {
            let len = (*size).min(buffer.len());
            Ok((&mut buffer[..len], a))
        }
        _ => Err(bad_parameters()),
    }
}

fn encrypt(op: &mut Operation) -> Result<(), TeecError> {
    let (text, key_slot) = text_and_key(op)?;
    // A non-zero hint selects the key; zero lets the TA choose.
    let key = match *key_slot % ALPHABET_LEN {
        0 => random_key(),
        hint => hint,
    };
    shift(text, key);
    *key_slot = (key + ROOT_KEY) % ALPHABET_LEN;
    trace!(len = text.len(), "emulated TA encrypted buffer");
    Ok(())
}

fn decrypt(op: &mut Operation) -> Result<(), TeecError> {
    let (text, key_slot) = text_and_key(op)?;
    if *key_slot >= ALPHABET_LEN {
        return Err(bad_parameters());
    }
    let key = (*key_slot + ALPHABET_LEN - ROOT_KEY) % ALPHABET_LEN;
    shift(text, ALPHABET_LEN - key);
    trace!(len = text.len(), "emulated TA decrypted buffer");
    Ok(())
}

fn random_key() -> u32 {
    1 + OsRng.next_u32() % (ALPHABET_LEN - 1)
}

fn shift(text: &mut [u8], by: u32) {
    let by = (by % ALPHABET_LEN) as u8;
    for b in text.iter_mut() {
        let base = match *b {
            b'a'..=b'z' => b'a',
            b'A'..=b'Z' => b'A',
            _ => continue,
        };
        *b = base + (*b - base + by) % ALPHABET_LEN as u8;
    }
}
