use crate::cli::{Cli, Mode};
use crate::dispatch::CommandService;
use crate::error::Error;
use crate::fileio;
use crate::naming::{derive_name, Suffix};
use crate::session::Context;
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use zeroize::Zeroizing;

pub fn run(cli: Cli) -> Result<(), Error> {
    let mode = cli.mode()?;

    let mut ctx = Context::initialize(cli.backend)?;
    let mut session = ctx.open_session(&cli.ta_uuid)?;

    match mode {
        Mode::Encrypt { input } => encrypt(&mut session, &input),
        Mode::Decrypt { input, keyfile } => decrypt(&mut session, &input, &keyfile),
    }
}

pub fn encrypt(service: &mut impl CommandService, input: &Path) -> Result<(), Error> {
    println!("========================Encryption========================");
    let enc_path = derive_name(input, Suffix::Ciphertext)?;
    let key_path = derive_name(input, Suffix::Key)?;

    let plaintext = Zeroizing::new(fileio::read_text(input)?);
    let (ciphertext, key) = service.encrypt(&plaintext)?;

    fileio::write_text(&enc_path, &ciphertext)?;
    if let Err(err) = fileio::write_key(&key_path, key) {
        // No ciphertext without its key.
        if let Err(rm) = fs::remove_file(&enc_path) {
            warn!(ciphertext = %enc_path.display(), error = %rm, "could not remove ciphertext");
        }
        return Err(err);
    }
    info!(
        ciphertext = %enc_path.display(),
        key = %key_path.display(),
        "encryption written"
    );
    println!("Ciphertext file & Key file creation Success!");
    Ok(())
}

pub fn decrypt(service: &mut impl CommandService, input: &Path, keyfile: &Path) -> Result<(), Error> {
    println!("========================Decryption========================");
    let dec_path = derive_name(input, Suffix::Plaintext)?;

    let ciphertext = fileio::read_text(input)?;
    let key = fileio::read_key(keyfile)?;
    if key == 0 {
        warn!(keyfile = %keyfile.display(), "key file holds 0; passing it to the service as is");
    }

    let plaintext = Zeroizing::new(service.decrypt(&ciphertext, key)?);
    fileio::write_text(&dec_path, &plaintext)?;
    info!(plaintext = %dec_path.display(), "decryption written");
    println!("Plaintext file creation Success!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::KEY_HINT_SERVICE_CHOOSES;
    use tempfile::tempdir;

    const MIRROR_KEY: u32 = 0xDEAD_BEEF;

    /// Reverses bytes and hands out a fixed key; records what it was given.
    #[derive(Default)]
    struct Mirror {
        calls: Vec<(&'static str, Vec<u8>, u32)>,
    }

    impl CommandService for Mirror {
        fn encrypt(&mut self, plaintext: &[u8]) -> Result<(Vec<u8>, u32), Error> {
            self.calls.push(("enc", plaintext.to_vec(), KEY_HINT_SERVICE_CHOOSES));
            Ok((plaintext.iter().rev().copied().collect(), MIRROR_KEY))
        }

        fn decrypt(&mut self, ciphertext: &[u8], key: u32) -> Result<Vec<u8>, Error> {
            self.calls.push(("dec", ciphertext.to_vec(), key));
            Ok(ciphertext.iter().rev().copied().collect())
        }
    }

    #[test]
    fn encrypt_writes_ciphertext_and_key_files() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sample.txt");
        fs::write(&input, "HELLO").unwrap();

        let mut svc = Mirror::default();
        encrypt(&mut svc, &input).unwrap();

        assert_eq!(fs::read(dir.path().join("sample_enc.txt")).unwrap(), b"OLLEH");
        assert_eq!(
            fs::read_to_string(dir.path().join("sample_key.txt")).unwrap(),
            "3735928559\n"
        );
    }

    #[test]
    fn key_written_by_encrypt_is_the_key_decrypt_sends() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sample.txt");
        fs::write(&input, "HELLO").unwrap();

        let mut svc = Mirror::default();
        encrypt(&mut svc, &input).unwrap();
        decrypt(
            &mut svc,
            &dir.path().join("sample_enc.txt"),
            &dir.path().join("sample_key.txt"),
        )
        .unwrap();

        assert_eq!(svc.calls[1], ("dec", b"OLLEH".to_vec(), MIRROR_KEY));
        assert_eq!(
            fs::read(dir.path().join("sample_enc_dec.txt")).unwrap(),
            b"HELLO"
        );
    }

    #[test]
    fn failed_key_write_leaves_no_ciphertext() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sample.txt");
        fs::write(&input, "HELLO").unwrap();
        fs::create_dir(dir.path().join("sample_key.txt")).unwrap();

        let mut svc = Mirror::default();
        let err = encrypt(&mut svc, &input).unwrap_err();

        assert!(matches!(err, Error::FileWrite { .. }));
        assert!(!dir.path().join("sample_enc.txt").exists());
    }

    #[test]
    fn decrypt_forwards_a_zero_key() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sample_enc.txt");
        let keyfile = dir.path().join("sample_key.txt");
        fs::write(&input, "OLLEH").unwrap();
        fs::write(&keyfile, "0\n").unwrap();

        let mut svc = Mirror::default();
        decrypt(&mut svc, &input, &keyfile).unwrap();

        assert_eq!(svc.calls, [("dec", b"OLLEH".to_vec(), 0)]);
        assert_eq!(
            fs::read(dir.path().join("sample_enc_dec.txt")).unwrap(),
            b"HELLO"
        );
    }

    #[test]
    fn unreadable_inputs_never_reach_the_service() {
        let dir = tempdir().unwrap();
        let mut svc = Mirror::default();

        let err = encrypt(&mut svc, &dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, Error::FileAccess { .. }));

        let input = dir.path().join("c.txt");
        fs::write(&input, "x").unwrap();
        let err = decrypt(&mut svc, &input, &dir.path().join("nokey.txt")).unwrap_err();
        assert!(matches!(err, Error::FileAccess { .. }));

        assert!(svc.calls.is_empty());
        assert!(!dir.path().join("c_dec.txt").exists());
    }

    #[test]
    fn short_name_fails_before_reading() {
        let mut svc = Mirror::default();
        let err = encrypt(&mut svc, Path::new("a")).unwrap_err();
        assert!(matches!(err, Error::InvalidName(_)));
        assert!(svc.calls.is_empty());
    }
}
