use elpx_storage::{MediaRecord, Token};

/// Builds the public URLs of media and their artifacts.
#[derive(Clone, Debug, Default)]
pub struct Routes {
    prefix: String,
}

impl Routes {
    /// `prefix` is prepended verbatim to every path (`""` for root-relative
    /// URLs, or e.g. `https://example.org/courses`). A trailing slash is ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        while prefix.ends_with('/') {
            prefix.pop();
        }
        Self { prefix }
    }

    pub fn content(&self, token: &Token, path: &str) -> String {
        format!("{}/content/{}/{}", self.prefix, token, path.trim_start_matches('/'))
    }

    /// Entry point of the record's artifact, if it has a previewable one.
    pub fn preview(&self, record: &MediaRecord) -> Option<String> {
        let artifact = record.artifact();
        let token = artifact.preview()?;
        let mut url = self.content(token, "index.html");
        if !record.viewer().teacher_mode_visible {
            url.push_str("?teacher_mode_visible=0");
        }
        Some(url)
    }

    /// Download URL of the record's raw file.
    pub fn file(&self, id: u64) -> String {
        format!("{}/api/file/{id}", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elpx_storage::{ArtifactMeta, ViewerOptions};
    use rstest::rstest;

    const TOKEN: &str = "0123456789abcdef0123456789abcdef01234567";

    fn record(has_preview: bool, visible: bool) -> MediaRecord {
        let mut record = MediaRecord::new(9, "a.elpx", "a.elpx");
        ArtifactMeta {
            extracted_hash: Some(TOKEN.parse().unwrap()),
            has_preview,
        }
        .write_into(&mut record.data);
        ViewerOptions { teacher_mode_visible: visible }.write_into(&mut record.data);
        record
    }

    #[rstest]
    #[case("", "/content/0123456789abcdef0123456789abcdef01234567/index.html")]
    #[case("/", "/content/0123456789abcdef0123456789abcdef01234567/index.html")]
    #[case(
        "https://example.org/courses/",
        "https://example.org/courses/content/0123456789abcdef0123456789abcdef01234567/index.html"
    )]
    fn test_preview(#[case] prefix: &str, #[case] expected: &str) {
        assert_eq!(Routes::new(prefix).preview(&record(true, true)).as_deref(), Some(expected));
    }

    #[test]
    fn test_preview_hidden_teacher_mode() {
        let url = Routes::default().preview(&record(true, false)).unwrap();
        assert!(url.ends_with("/index.html?teacher_mode_visible=0"));
    }

    #[test]
    fn test_no_preview() {
        assert_eq!(Routes::default().preview(&record(false, true)), None);
        assert_eq!(Routes::default().preview(&MediaRecord::new(1, "a.elpx", "a.elpx")), None);
    }

    #[test]
    fn test_file_url() {
        assert_eq!(Routes::new("/site").file(4), "/site/api/file/4");
        assert_eq!(Routes::new("/site/").file(4), "/site/api/file/4");
    }
}
