//! The media record handed over by the host, and the typed views over its
//! loosely-typed metadata map.

use crate::token::Token;
use std::collections::BTreeMap;
use std::path::Path;

/// String-keyed metadata persisted by the host alongside each media record.
pub type MediaData = BTreeMap<String, String>;

/// Metadata key holding the artifact token.
pub const HASH_KEY: &str = "extracted_hash";
/// Metadata key holding whether the artifact has an `index.html`.
pub const PREVIEW_KEY: &str = "has_preview";
/// Metadata key holding whether the teacher-mode toggler is shown.
pub const TEACHER_MODE_KEY: &str = "teacher_mode_visible";

/// File extensions (lowercase) recognised as course packages.
pub const COURSE_EXTENSIONS: [&str; 2] = ["elpx", "zip"];

/// One uploaded file as known to the host.
///
/// The host owns its lifecycle and persistence; the storage layer only reads
/// the filename and merges a couple of keys into [`data`](Self::data).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaRecord {
    pub id: u64,
    /// Name of the raw file inside `<files>/original/`.
    pub filename: String,
    /// Name the file was uploaded under (used as its display title).
    pub source: String,
    pub data: MediaData,
}

impl MediaRecord {
    pub fn new(id: u64, filename: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id,
            filename: filename.into(),
            source: source.into(),
            data: MediaData::new(),
        }
    }

    /// Lowercased extension of the stored filename.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }

    /// Whether lifecycle hooks should treat this record as a course package.
    pub fn is_course_package(&self) -> bool {
        self.extension().is_some_and(|ext| COURSE_EXTENSIONS.contains(&ext.as_str()))
    }

    pub fn artifact(&self) -> ArtifactMeta {
        ArtifactMeta::read(&self.data)
    }

    pub fn viewer(&self) -> ViewerOptions {
        ViewerOptions::read(&self.data)
    }
}

/// Typed view of the artifact keys inside [`MediaData`].
///
/// Reading never fails: an absent or garbled token reads as "no artifact",
/// anything other than an explicit true flag reads as "no preview".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArtifactMeta {
    pub extracted_hash: Option<Token>,
    pub has_preview: bool,
}

impl ArtifactMeta {
    pub fn read(data: &MediaData) -> Self {
        Self {
            extracted_hash: data.get(HASH_KEY).and_then(|value| value.parse().ok()),
            has_preview: data.get(PREVIEW_KEY).is_some_and(|value| matches!(value.trim(), "1" | "true")),
        }
    }

    /// Merge into `data`, leaving every other key untouched.
    pub fn write_into(&self, data: &mut MediaData) {
        match &self.extracted_hash {
            Some(token) => data.insert(HASH_KEY.to_string(), token.to_string()),
            None => data.remove(HASH_KEY),
        };
        data.insert(PREVIEW_KEY.to_string(), flag(self.has_preview));
    }

    /// Token of a previewable artifact, if there is one.
    pub fn preview(&self) -> Option<&Token> {
        self.extracted_hash.as_ref().filter(|_| self.has_preview)
    }
}

/// Per-media viewer settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewerOptions {
    pub teacher_mode_visible: bool,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self { teacher_mode_visible: true }
    }
}

impl ViewerOptions {
    pub fn read(data: &MediaData) -> Self {
        let teacher_mode_visible = data
            .get(TEACHER_MODE_KEY)
            .is_none_or(|value| !matches!(value.as_str(), "0" | "false" | "no"));
        Self { teacher_mode_visible }
    }

    /// Interpret a submitted form value. Empty and the usual negatives hide
    /// the toggler, anything else shows it.
    pub fn from_form_value(raw: &str) -> Self {
        let teacher_mode_visible = !matches!(raw, "0" | "false" | "no" | "off" | "");
        Self { teacher_mode_visible }
    }

    pub fn write_into(&self, data: &mut MediaData) {
        data.insert(TEACHER_MODE_KEY.to_string(), flag(self.teacher_mode_visible));
    }
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const TOKEN: &str = "0123456789abcdef0123456789abcdef01234567";

    fn data(pairs: &[(&str, &str)]) -> MediaData {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[rstest]
    #[case("course.elpx", true)]
    #[case("COURSE.ELPX", true)]
    #[case("bundle.zip", true)]
    #[case("course.elp", false)]
    #[case("photo.png", false)]
    #[case("noextension", false)]
    fn test_is_course_package(#[case] filename: &str, #[case] expected: bool) {
        assert_eq!(MediaRecord::new(1, filename, filename).is_course_package(), expected);
    }

    #[test]
    fn test_artifact_read() {
        let meta = ArtifactMeta::read(&data(&[(HASH_KEY, TOKEN), (PREVIEW_KEY, "1")]));
        assert_eq!(meta.extracted_hash.as_ref().map(Token::as_str), Some(TOKEN));
        assert!(meta.has_preview);
        assert_eq!(meta.preview().map(Token::as_str), Some(TOKEN));
    }

    #[rstest]
    #[case(&[])]
    #[case(&[(HASH_KEY, "garbage"), (PREVIEW_KEY, "yes please")])]
    #[case(&[(HASH_KEY, ""), (PREVIEW_KEY, "0")])]
    #[case(&[(PREVIEW_KEY, "1")])]
    fn test_artifact_read_tolerates_garbage(#[case] pairs: &[(&str, &str)]) {
        let meta = ArtifactMeta::read(&data(pairs));
        assert!(meta.extracted_hash.is_none());
        assert!(meta.preview().is_none());
    }

    #[test]
    fn test_artifact_write_merges() {
        let mut map = data(&[("unrelated", "kept"), (PREVIEW_KEY, "1")]);
        let meta = ArtifactMeta {
            extracted_hash: Some(TOKEN.parse().unwrap()),
            has_preview: false,
        };
        meta.write_into(&mut map);
        assert_eq!(map.get("unrelated").unwrap(), "kept");
        assert_eq!(map.get(HASH_KEY).unwrap(), TOKEN);
        assert_eq!(map.get(PREVIEW_KEY).unwrap(), "0");
        assert_eq!(ArtifactMeta::read(&map), meta);
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some("1"), true)]
    #[case(Some("anything"), true)]
    #[case(Some("0"), false)]
    #[case(Some("false"), false)]
    #[case(Some("no"), false)]
    fn test_viewer_read(#[case] stored: Option<&str>, #[case] expected: bool) {
        let map = stored.map(|v| data(&[(TEACHER_MODE_KEY, v)])).unwrap_or_default();
        assert_eq!(ViewerOptions::read(&map).teacher_mode_visible, expected);
    }

    #[rstest]
    #[case("1", true)]
    #[case("on", true)]
    #[case("0", false)]
    #[case("off", false)]
    #[case("", false)]
    fn test_viewer_form_value(#[case] raw: &str, #[case] expected: bool) {
        let options = ViewerOptions::from_form_value(raw);
        assert_eq!(options.teacher_mode_visible, expected);
        let mut map = MediaData::new();
        options.write_into(&mut map);
        assert_eq!(ViewerOptions::read(&map), options);
    }
}
