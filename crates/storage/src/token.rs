use crate::error::{Error, ErrorKind};
use std::fmt::{self, Display};
use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity of one extracted artifact, and the name of its directory.
///
/// Always 40 lowercase hexadecimal characters. Despite being stored under the
/// name "hash", a token is **not** a content digest: it is derived from the
/// source path, the current time and 16 random bytes, so uploading the same
/// bytes twice yields two different tokens (and two artifact directories).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(String);

impl Token {
    /// Number of hexadecimal characters in a token.
    pub const LEN: usize = 40;

    /// Generate a fresh, unpredictable token.
    pub fn generate(seed: impl AsRef<Path>) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let mut hasher = blake3::Hasher::new();
        hasher.update(seed.as_ref().as_os_str().as_encoded_bytes());
        hasher.update(&nanos.to_le_bytes());
        hasher.update(&rand::random::<[u8; 16]>());
        let hex = hasher.finalize().to_hex();
        Self(hex.as_str()[..Self::LEN].to_owned())
    }

    /// Whether `candidate` has the shape of a token (40 hexadecimal
    /// characters, either case). Performs no filesystem access.
    pub fn is_well_formed(candidate: &str) -> bool {
        candidate.len() == Self::LEN && candidate.bytes().all(|b| b.is_ascii_hexdigit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Token {
    type Err = Error;
    /// Accepts either case; the token is normalized to lowercase, matching the
    /// directory names produced by [`generate()`](Token::generate).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_well_formed(s) {
            exn::bail!(ErrorKind::InvalidToken(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<Path> for Token {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_generate_shape() {
        let token = Token::generate("/files/original/course.elpx");
        assert_eq!(token.as_str().len(), Token::LEN);
        assert!(token.as_str().bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
    }

    #[test]
    fn test_generate_is_not_a_digest() {
        let first = Token::generate("/files/original/course.elpx");
        let second = Token::generate("/files/original/course.elpx");
        assert_ne!(first, second);
    }

    #[rstest]
    #[case("0123456789abcdef0123456789abcdef01234567", true)]
    #[case("0123456789ABCDEF0123456789ABCDEF01234567", true)]
    #[case("0123456789abcdef0123456789abcdef0123456", false)]
    #[case("0123456789abcdef0123456789abcdef012345678", false)]
    #[case("zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz", false)]
    #[case("../../../../../../../../../../etc/passwd", false)]
    #[case("", false)]
    fn test_well_formed(#[case] candidate: &str, #[case] expected: bool) {
        assert_eq!(Token::is_well_formed(candidate), expected);
        assert_eq!(candidate.parse::<Token>().is_ok(), expected);
    }

    #[test]
    fn test_parse_normalizes_case() {
        let token: Token = "0123456789ABCDEF0123456789ABCDEF01234567".parse().unwrap();
        assert_eq!(token.as_str(), "0123456789abcdef0123456789abcdef01234567");
    }

    #[test]
    fn test_parse_error_kind() {
        let err = "not-a-token".parse::<Token>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidToken(s) if s == "not-a-token"));
    }
}
