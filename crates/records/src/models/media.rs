use crate::error::{Error, ErrorKind};
use elpx_storage::{MediaData, MediaRecord};
use exn::ResultExt;

#[derive(sqlx::FromRow)]
pub(crate) struct MediaRow {
    pub(crate) id: i64,
    pub(crate) filename: String,
    pub(crate) source: String,
    pub(crate) data: String,
}

impl TryFrom<MediaRow> for MediaRecord {
    type Error = Error;
    fn try_from(row: MediaRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: u64::try_from(row.id).or_raise(|| ErrorKind::InvalidData("media id"))?,
            filename: row.filename,
            source: row.source,
            data: decode_data(&row.data)?,
        })
    }
}

/// Encode the metadata map for the `data` column.
pub(crate) fn encode_data(data: &MediaData) -> Result<String, Error> {
    serde_json::to_string(data).or_raise(|| ErrorKind::InvalidData("media data"))
}

fn decode_data(raw: &str) -> Result<MediaData, Error> {
    // Older rows and manual edits may leave the column blank.
    if raw.trim().is_empty() {
        return Ok(MediaData::new());
    }
    serde_json::from_str(raw).or_raise(|| ErrorKind::InvalidData("media data"))
}
