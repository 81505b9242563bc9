use std::io::Read;
use std::path::Path;

use crate::error::KokoroError;

/// Resolve the text to synthesize from the CLI's positional argument.
///
/// An argument naming an existing file is read as a file; any other
/// argument is the text itself; no argument means read `stdin` to EOF.
/// Whitespace-only input is rejected.
pub fn read_input_text(arg: Option<&str>, stdin: &mut impl Read) -> Result<String, KokoroError> {
    let text = match arg {
        Some(value) if Path::new(value).is_file() => {
            std::fs::read_to_string(value).map_err(|source| KokoroError::Filesystem {
                path: value.into(),
                source,
            })?
        }
        Some(value) => value.to_string(),
        None => {
            let mut buf = String::new();
            stdin.read_to_string(&mut buf)?;
            buf
        }
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(KokoroError::EmptyInput);
    }
    Ok(text)
}
