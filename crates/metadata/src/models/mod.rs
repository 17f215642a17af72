mod video;

pub(crate) use self::video::{InsertRow, VideoRow};
pub use self::video::{NewVideo, VideoRecord};
