use crate::error::Error;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Read a whole file as raw bytes.
pub fn read_text(path: &Path) -> Result<Vec<u8>, Error> {
    fs::read(path).map_err(|source| Error::FileAccess {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the decimal key at the start of `path`.
///
/// Unreadable files and files without a number are distinct errors, and a
/// stored `0` is returned as a key like any other. Negative values written
/// as a signed 32-bit number are reinterpreted bit for bit.
pub fn read_key(path: &Path) -> Result<u32, Error> {
    let bytes = fs::read(path).map_err(|source| Error::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    leading_integer(&bytes).ok_or_else(|| Error::KeyFormat(path.to_path_buf()))
}

/// `scanf("%d")` rules: skip whitespace, take an optional sign and the digits
/// that follow, ignore the rest. Values outside both `u32` and `i32` fail.
fn leading_integer(bytes: &[u8]) -> Option<u32> {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace())?;
    let rest = &bytes[start..];
    let sign = usize::from(matches!(rest.first(), Some(b'+' | b'-')));
    let digits = rest[sign..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let token = std::str::from_utf8(&rest[..sign + digits]).ok()?;
    token
        .parse::<u32>()
        .ok()
        .or_else(|| token.parse::<i32>().ok().map(|k| k as u32))
}

fn create(path: &Path) -> Result<File, Error> {
    File::create(path).map_err(|source| Error::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_text(path: &Path, content: &[u8]) -> Result<(), Error> {
    let mut f = create(path)?;
    f.write_all(content).map_err(|source| Error::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `key` as decimal text followed by a newline.
pub fn write_key(path: &Path, key: u32) -> Result<(), Error> {
    let mut f = create(path)?;
    writeln!(f, "{key}").map_err(|source| Error::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}
