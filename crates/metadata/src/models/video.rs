use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// `upload_date` is stored as `YYYY-MM-DD HH:MM:SS` text, in UTC.
pub(crate) const UPLOAD_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// A stored video, as recorded in the metadata store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    /// Assigned by the store on insert, never reused.
    pub id: i64,
    /// Unique; the key of the file inside the storage directory.
    pub filename: String,
    /// Name the video was uploaded under.
    pub original_name: String,
    /// Wall-clock time of the insert, truncated to whole seconds.
    pub upload_date: OffsetDateTime,
    /// Size in bytes of the file as written to storage.
    pub file_size: u64,
    /// Lowercase hex MD5 of the stored bytes.
    pub hash_value: String,
}
impl VideoRecord {
    /// `upload_date` rendered the way it is stored.
    pub fn upload_date_string(&self) -> String {
        format_upload_date(self.upload_date).unwrap_or_default()
    }
}

/// Everything needed to record a new video; the id is assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVideo {
    pub filename: String,
    pub original_name: String,
    pub upload_date: OffsetDateTime,
    pub file_size: u64,
    pub hash_value: String,
}
impl NewVideo {
    /// A new video uploaded under `filename`, stamped with the current time.
    pub fn now(filename: impl Into<String>, file_size: u64, hash_value: impl Into<String>) -> Self {
        let filename = filename.into();
        Self {
            original_name: filename.clone(),
            filename,
            upload_date: OffsetDateTime::now_utc(),
            file_size,
            hash_value: hash_value.into(),
        }
    }

    pub(crate) fn into_record(self, id: i64) -> VideoRecord {
        VideoRecord {
            id,
            filename: self.filename,
            original_name: self.original_name,
            upload_date: self.upload_date.replace_nanosecond(0).unwrap_or(self.upload_date),
            file_size: self.file_size,
            hash_value: self.hash_value,
        }
    }
}

pub(crate) fn format_upload_date(date: OffsetDateTime) -> Result<String, Error> {
    date.to_offset(time::UtcOffset::UTC)
        .format(UPLOAD_DATE_FORMAT)
        .or_raise(|| ErrorKind::InvalidData("upload date"))
}

#[derive(sqlx::FromRow)]
pub(crate) struct VideoRow {
    id: i64,
    filename: String,
    original_name: String,
    upload_date: String,
    file_size: i64,
    hash_value: String,
}
impl TryFrom<VideoRow> for VideoRecord {
    type Error = Error;
    fn try_from(row: VideoRow) -> Result<Self, Self::Error> {
        let upload_date = PrimitiveDateTime::parse(&row.upload_date, UPLOAD_DATE_FORMAT)
            .or_raise(|| ErrorKind::InvalidData("upload date"))?
            .assume_utc();
        Ok(Self {
            id: row.id,
            filename: row.filename,
            original_name: row.original_name,
            upload_date,
            file_size: u64::try_from(row.file_size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            hash_value: row.hash_value,
        })
    }
}

/// Bindable form of a [`NewVideo`].
pub(crate) struct InsertRow {
    pub filename: String,
    pub original_name: String,
    pub upload_date: String,
    pub file_size: i64,
    pub hash_value: String,
}
impl TryFrom<&NewVideo> for InsertRow {
    type Error = Error;
    fn try_from(video: &NewVideo) -> Result<Self, Self::Error> {
        Ok(Self {
            filename: video.filename.clone(),
            original_name: video.original_name.clone(),
            upload_date: format_upload_date(video.upload_date)?,
            file_size: i64::try_from(video.file_size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            hash_value: video.hash_value.clone(),
        })
    }
}
