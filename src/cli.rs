use crate::error::Error;
use crate::session::BackendKind;
use crate::teec::{TeecUuid, DEFAULT_TA_UUID};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "teeencrypt", version)]
#[command(about = "Encrypt/decrypt a text file inside a trusted application.")]
#[command(group(ArgGroup::new("mode").required(true).args(["encrypt", "decrypt"])))]
pub struct Cli {
    /// Encrypt PLAINTEXT into <base>_enc.txt and <base>_key.txt.
    #[arg(short = 'e', value_name = "PLAINTEXT")]
    pub encrypt: Option<PathBuf>,

    /// Decrypt CIPHERTEXT with the key in KEYFILE into <base>_dec.txt.
    #[arg(short = 'd', num_args = 2, value_names = ["CIPHERTEXT", "KEYFILE"])]
    pub decrypt: Option<Vec<PathBuf>>,

    /// Where the trusted application runs.
    #[arg(long, env = "TEEENCRYPT_BACKEND", value_enum, default_value_t = BackendKind::default())]
    pub backend: BackendKind,

    /// Trusted application to open a session with.
    #[arg(long, env = "TEEENCRYPT_TA_UUID", default_value = DEFAULT_TA_UUID)]
    pub ta_uuid: TeecUuid,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Encrypt { input: PathBuf },
    Decrypt { input: PathBuf, keyfile: PathBuf },
}

impl Cli {
    pub fn mode(&self) -> Result<Mode, Error> {
        match (&self.encrypt, &self.decrypt) {
            (Some(input), None) => Ok(Mode::Encrypt {
                input: input.clone(),
            }),
            (None, Some(paths)) => match paths.as_slice() {
                [input, keyfile] => Ok(Mode::Decrypt {
                    input: input.clone(),
                    keyfile: keyfile.clone(),
                }),
                _ => Err(Error::Usage("-d takes a ciphertext file and a key file")),
            },
            (Some(_), Some(_)) => Err(Error::Usage("-e and -d are mutually exclusive")),
            (None, None) => Err(Error::Usage("one of -e or -d is required")),
        }
    }
}
