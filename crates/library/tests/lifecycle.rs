use gudang_library::error::ErrorKind;
use gudang_library::{Library, Removal, Upload};
use gudang_metadata::{Database, Repository};
use gudang_storage::BackendHandle;
use gudang_storage::backend::LocalBackend;
use gudang_storage::hash::hash_bytes;
use std::path::Path;
use std::sync::Arc;

struct Fixture {
    // Held so the directory outlives the test.
    dir: tempfile::TempDir,
    db: Database,
    library: Library,
}
impl Fixture {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let backend: BackendHandle = Arc::new(LocalBackend::new("videos", dir.path().join("videos")).unwrap());
        let db = Database::connect(dir.path().join("videos.db")).await.unwrap();
        let library = Library::new(backend, Repository::from(&db));
        Self { dir, db, library }
    }

    fn video_path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join("videos").join(name)
    }

    async fn upload(&self, name: &str, mut data: &[u8]) -> gudang_library::error::Result<gudang_library::Ingested> {
        let size = data.len() as u64;
        self.library.store(Upload::new(name, &mut data).with_declared_size(size)).await
    }
}

#[tokio::test]
async fn test_upload_list_delete() {
    let fx = Fixture::new().await;

    let ingested = fx.upload("clip.mp4", b"0123456789").await.unwrap();
    let videos = fx.library.list().await.unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0], ingested.record);
    assert_eq!(videos[0].filename, "clip.mp4");
    assert_eq!(videos[0].file_size, 10);
    assert_eq!(videos[0].hash_value, "781e5e245d69b566979b86e28d23f2c7");
    assert_eq!(std::fs::read(fx.video_path("clip.mp4")).unwrap(), b"0123456789");

    let removal = fx.library.remove("clip.mp4").await.unwrap();
    assert_eq!(removal, Removal { record_deleted: true, file_deleted: true });
    assert!(fx.library.list().await.unwrap().is_empty());
    assert!(!fx.video_path("clip.mp4").exists());
    fx.db.close().await;
}

#[tokio::test]
async fn test_distinct_uploads_each_get_one_record() {
    let fx = Fixture::new().await;
    let uploads: [(&str, Vec<u8>); 3] = [
        ("a.mp4", b"first video".to_vec()),
        ("b.avi", Vec::new()),
        ("c.mkv", (0..=255u8).cycle().take(50_000).collect()),
    ];
    for (name, data) in &uploads {
        fx.upload(name, data).await.unwrap();
    }
    let videos = fx.library.list().await.unwrap();
    assert_eq!(videos.len(), uploads.len());
    for (name, data) in &uploads {
        let record = videos.iter().find(|v| v.filename == *name).unwrap();
        assert_eq!(record.file_size, data.len() as u64);
        assert_eq!(record.hash_value, hash_bytes(data));
        assert_eq!(std::fs::metadata(fx.video_path(name)).unwrap().len(), data.len() as u64);
    }
    fx.db.close().await;
}

#[tokio::test]
async fn test_duplicate_upload_keeps_first_bytes() {
    let fx = Fixture::new().await;
    let first = fx.upload("clip.mp4", b"first upload").await.unwrap();

    let err = fx.upload("clip.mp4", b"second upload").await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::Duplicate(_)));

    let videos = fx.library.list().await.unwrap();
    assert_eq!(videos, vec![first.record]);
    assert_eq!(videos[0].hash_value, "6521b0de57371b7e481f71d918f9e2b8");
    assert_eq!(std::fs::read(fx.video_path("clip.mp4")).unwrap(), b"first upload");
    assert!(fx.library.reconcile().await.unwrap().is_clean());
    fx.db.close().await;
}

#[tokio::test]
async fn test_remove_unknown_is_noop() {
    let fx = Fixture::new().await;
    fx.upload("keep.mp4", b"0123456789").await.unwrap();
    let removal = fx.library.remove("clip.mp4").await.unwrap();
    assert!(removal.is_noop());
    assert_eq!(fx.library.list().await.unwrap().len(), 1);
    assert!(fx.video_path("keep.mp4").exists());
    fx.db.close().await;
}

#[tokio::test]
async fn test_reconcile_after_crash_between_steps() {
    let fx = Fixture::new().await;
    fx.upload("clip.mp4", b"0123456789").await.unwrap();
    // A removal that died after deleting the row.
    fx.library.repository().delete_by_filename("clip.mp4").await.unwrap();
    assert!(fx.library.list().await.unwrap().is_empty());

    let report = fx.library.reconcile().await.unwrap();
    assert_eq!(report.orphaned.len(), 1);
    assert_eq!(report.orphaned[0].path, Path::new("clip.mp4"));
    fx.library.prune(&report).await.unwrap();
    assert!(!fx.video_path("clip.mp4").exists());
    fx.db.close().await;
}

#[tokio::test]
async fn test_upload_with_longest_file_name() {
    let fx = Fixture::new().await;
    let name = format!("{}.mp4", "a".repeat(246));
    assert_eq!(name.len(), 250);

    let ingested = fx.upload(&name, b"0123456789").await.unwrap();
    assert_eq!(ingested.record.filename, name);
    assert_eq!(std::fs::read(fx.video_path(&name)).unwrap(), b"0123456789");
    assert!(fx.library.reconcile().await.unwrap().is_clean());
    fx.db.close().await;
}
