use crate::error::Error;
use crate::session::Session;
use crate::teec::{Direction, Operation, Param, CMD_DEC_VALUE, CMD_ENC_VALUE};
use tracing::debug;

/// Key hint asking the service to pick the key itself.
pub const KEY_HINT_SERVICE_CHOOSES: u32 = 0;

/// The two commands the trusted service exposes.
pub trait CommandService {
    /// Returns the ciphertext and the key the service used.
    fn encrypt(&mut self, plaintext: &[u8]) -> Result<(Vec<u8>, u32), Error>;

    fn decrypt(&mut self, ciphertext: &[u8], key: u32) -> Result<Vec<u8>, Error>;
}

/// Slot 0: output buffer pre-filled with `text`. Slot 1: in/out key value.
pub fn text_operation(text: &[u8], key: u32) -> Operation {
    Operation::new([
        Param::temp_memref(Direction::Output, text),
        Param::value(Direction::Inout, key),
        Param::None,
        Param::None,
    ])
}

/// Bytes the service produced in slot 0, exactly as many as it reported.
///
/// NUL bytes are content and are kept.
fn returned_text(op: &mut Operation, command: u32) -> Result<Vec<u8>, Error> {
    op.take_buffer(0)
        .map_err(|e| Error::invocation(command, e))
}

impl CommandService for Session<'_> {
    fn encrypt(&mut self, plaintext: &[u8]) -> Result<(Vec<u8>, u32), Error> {
        let mut op = text_operation(plaintext, KEY_HINT_SERVICE_CHOOSES);
        self.invoke(CMD_ENC_VALUE, &mut op)?;

        let key = op
            .value_a(1)
            .map_err(|e| Error::invocation(CMD_ENC_VALUE, e))?;
        let ciphertext = returned_text(&mut op, CMD_ENC_VALUE)?;
        debug!(len = ciphertext.len(), "ciphertext received");
        Ok((ciphertext, key))
    }

    fn decrypt(&mut self, ciphertext: &[u8], key: u32) -> Result<Vec<u8>, Error> {
        let mut op = text_operation(ciphertext, key);
        self.invoke(CMD_DEC_VALUE, &mut op)?;

        let plaintext = returned_text(&mut op, CMD_DEC_VALUE)?;
        debug!(len = plaintext.len(), "plaintext received");
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulated::EmulatedTee;
    use crate::session::{Context, SessionId, TeeClient};
    use crate::teec::{LoginMethod, TeecError, TeecUuid, TEEC_ERROR_SHORT_BUFFER};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Service that reports back a fixed size and writes a fixed pattern.
    struct Scripted {
        reply: Vec<u8>,
        reported_size: usize,
        key_out: u32,
        seen_key: Rc<Cell<Option<u32>>>,
    }

    impl TeeClient for Scripted {
        fn open_session(&mut self, _: &TeecUuid, _: LoginMethod) -> Result<SessionId, TeecError> {
            Ok(1)
        }

        fn invoke_command(
            &mut self,
            _: SessionId,
            _: u32,
            op: &mut Operation,
        ) -> Result<(), TeecError> {
            assert_eq!(op.param_types(), 0x36);
            if let Param::Value { a, .. } = &mut op.params[1] {
                self.seen_key.set(Some(*a));
                *a = self.key_out;
            }
            if let Param::TempMemRef { buffer, size, .. } = &mut op.params[0] {
                let n = self.reply.len().min(buffer.len());
                buffer[..n].copy_from_slice(&self.reply[..n]);
                *size = self.reported_size;
            }
            Ok(())
        }

        fn close_session(&mut self, _: SessionId) {}
    }

    fn scripted(reply: &[u8], reported_size: usize, key_out: u32) -> Context {
        scripted_watching(reply, reported_size, key_out, Rc::default())
    }

    fn scripted_watching(
        reply: &[u8],
        reported_size: usize,
        key_out: u32,
        seen_key: Rc<Cell<Option<u32>>>,
    ) -> Context {
        Context::with_client(Box::new(Scripted {
            reply: reply.to_vec(),
            reported_size,
            key_out,
            seen_key,
        }))
    }

    #[test]
    fn round_trip_through_emulated_service() {
        let mut ctx = Context::with_client(Box::new(EmulatedTee::new()));
        let mut session = ctx.open_session(&TeecUuid::DEFAULT_TA).unwrap();

        let (ciphertext, key) = session.encrypt(b"HELLO").unwrap();
        assert_eq!(ciphertext.len(), 5);
        assert_ne!(ciphertext, b"HELLO");

        let plaintext = session.decrypt(&ciphertext, key).unwrap();
        assert_eq!(plaintext, b"HELLO");
    }

    #[test]
    fn nul_bytes_survive_the_round_trip() {
        let mut ctx = Context::with_client(Box::new(EmulatedTee::new()));
        let mut session = ctx.open_session(&TeecUuid::DEFAULT_TA).unwrap();

        let (ciphertext, key) = session.encrypt(b"HELLO\0WORLD").unwrap();
        assert_eq!(ciphertext.len(), 11);
        assert_eq!(ciphertext[5], 0);

        let plaintext = session.decrypt(&ciphertext, key).unwrap();
        assert_eq!(plaintext, b"HELLO\0WORLD");
    }

    #[test]
    fn output_is_the_reported_size_nul_included() {
        let mut ctx = scripted(b"ab\0cdef", 7, 42);
        let mut session = ctx.open_session(&TeecUuid::DEFAULT_TA).unwrap();
        let (ct, key) = session.encrypt(b"1234567").unwrap();
        assert_eq!(ct, b"ab\0cdef");
        assert_eq!(key, 42);

        let mut ctx = scripted(b"xyzw", 3, 0);
        let mut session = ctx.open_session(&TeecUuid::DEFAULT_TA).unwrap();
        assert_eq!(session.decrypt(b"1234", 9).unwrap(), b"xyz");
    }

    #[test]
    fn oversized_reply_is_a_short_buffer_failure() {
        let mut ctx = scripted(b"abc", 64, 1);
        let mut session = ctx.open_session(&TeecUuid::DEFAULT_TA).unwrap();
        match session.encrypt(b"abc") {
            Err(Error::Invocation { command, code, .. }) => {
                assert_eq!(command, CMD_ENC_VALUE);
                assert_eq!(code, TEEC_ERROR_SHORT_BUFFER);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn encrypt_sends_zero_hint_and_decrypt_sends_key() {
        let seen = Rc::new(Cell::new(None));

        let mut ctx = scripted_watching(b"", 0, 5, seen.clone());
        let mut session = ctx.open_session(&TeecUuid::DEFAULT_TA).unwrap();
        let (_, key) = session.encrypt(b"abc").unwrap();
        assert_eq!(seen.get(), Some(KEY_HINT_SERVICE_CHOOSES));
        assert_eq!(key, 5);

        session.decrypt(b"abc", 12345).unwrap();
        assert_eq!(seen.get(), Some(12345));
    }
}
