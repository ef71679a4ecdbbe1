use crate::error::Error;
use std::path::{Path, PathBuf};

/// Number of trailing characters replaced by the suffix (`.txt`).
pub const STRIPPED_CHARS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Suffix {
    Ciphertext,
    Key,
    Plaintext,
}

impl Suffix {
    pub fn as_str(self) -> &'static str {
        match self {
            Suffix::Ciphertext => "_enc.txt",
            Suffix::Key => "_key.txt",
            Suffix::Plaintext => "_dec.txt",
        }
    }
}

/// Output path for `input`: its last four characters replaced by `suffix`.
///
/// The stripped characters are not checked to be an extension, so
/// `sample_enc.txt` becomes `sample_enc_dec.txt`.
pub fn derive_name(input: &Path, suffix: Suffix) -> Result<PathBuf, Error> {
    let name = input
        .to_str()
        .ok_or_else(|| Error::InvalidName(input.to_path_buf()))?;
    let cut = name
        .char_indices()
        .rev()
        .nth(STRIPPED_CHARS - 1)
        .map(|(i, _)| i)
        .ok_or_else(|| Error::InvalidName(input.to_path_buf()))?;
    Ok(PathBuf::from(format!("{}{}", &name[..cut], suffix.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_extension_for_every_suffix() {
        let input = Path::new("dir/sample.txt");
        assert_eq!(
            derive_name(input, Suffix::Ciphertext).unwrap(),
            Path::new("dir/sample_enc.txt")
        );
        assert_eq!(
            derive_name(input, Suffix::Key).unwrap(),
            Path::new("dir/sample_key.txt")
        );
        assert_eq!(
            derive_name(input, Suffix::Plaintext).unwrap(),
            Path::new("dir/sample_dec.txt")
        );
    }

    #[test]
    fn strips_blindly() {
        assert_eq!(
            derive_name(Path::new("sample_enc.txt"), Suffix::Plaintext).unwrap(),
            Path::new("sample_enc_dec.txt")
        );
        assert_eq!(
            derive_name(Path::new("notes.md"), Suffix::Key).unwrap(),
            Path::new("not_key.txt")
        );
        assert_eq!(
            derive_name(Path::new(".txt"), Suffix::Ciphertext).unwrap(),
            Path::new("_enc.txt")
        );
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(
            derive_name(Path::new("ñandú.ü€ab"), Suffix::Ciphertext).unwrap(),
            Path::new("ñandú._enc.txt")
        );
    }

    #[test]
    fn short_names_are_rejected() {
        for name in ["", "a", "abc", "é€x"] {
            assert!(
                matches!(
                    derive_name(Path::new(name), Suffix::Ciphertext),
                    Err(Error::InvalidName(_))
                ),
                "{name:?} accepted"
            );
        }
    }
}
