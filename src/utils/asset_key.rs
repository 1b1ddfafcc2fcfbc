use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use mime::Mime;
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;

/// Bytes of OS randomness behind every asset name.
const TOKEN_BYTES: usize = 32;

/// Storage destination for an uploaded asset: an optional directory prefix
/// plus `{random token}.{extension}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetKey {
    prefix: Option<String>,
    file_name: String,
}

impl AssetKey {
    /// Fresh key with the extension taken verbatim from the declared subtype
    /// (`image/jpeg` -> `jpeg`, `video/mp4` -> `mp4`).
    pub fn generate(prefix: Option<&str>, content_type: &Mime) -> Self {
        let file_name = format!("{}.{}", random_token(), content_type.subtype().as_str());
        Self {
            prefix: prefix.map(str::to_string),
            file_name,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}/{}", prefix, self.file_name),
            None => f.write_str(&self.file_name),
        }
    }
}

fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
