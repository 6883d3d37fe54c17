use pmostore::{JukeboxStore, SqliteStore, StoreError};
use tempfile::TempDir;

/// Crée une base temporaire pour les tests
fn create_test_store() -> (TempDir, SqliteStore) {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(temp_dir.path().join("jukebox.db")).unwrap();
    (temp_dir, store)
}

#[test]
fn test_open_creates_parent_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("nested").join("dir").join("jukebox.db");

    let store = SqliteStore::open(&db_path);
    assert!(store.is_ok());
    assert!(db_path.exists());
}

#[tokio::test]
async fn test_add_and_get_user() {
    let (_temp_dir, store) = create_test_store();

    let created = store.add_user(10, "alice").await.unwrap();
    assert_eq!(created.username, "alice");

    let user = store.user_by_id(10).await.unwrap().unwrap();
    assert_eq!(user, created);
    assert!(store.user_by_id(11).await.unwrap().is_none());
}

#[tokio::test]
async fn test_add_user_twice_fails() {
    let (_temp_dir, store) = create_test_store();
    store.add_user(10, "alice").await.unwrap();

    let err = store.add_user(10, "other").await.unwrap_err();
    assert!(matches!(err, StoreError::UserExists(10)));
}

#[tokio::test]
async fn test_rename_unknown_user_fails() {
    let (_temp_dir, store) = create_test_store();
    let err = store.update_username(5, "nobody").await.unwrap_err();
    assert!(matches!(err, StoreError::UserNotFound(5)));
}

#[tokio::test]
async fn test_data_survives_reopen() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let db_path = temp_dir.path().join("jukebox.db");

    let song_id = {
        let store = SqliteStore::open(&db_path)?;
        store.add_user(10, "alice").await?;
        store.add_song("Intro", "youtube", "dQw4w9WgXcQ", 10).await?
    };

    let store = SqliteStore::open(&db_path)?;
    let song = store.song_by_id(song_id).await?.expect("song persisted");
    assert_eq!(song.title, "Intro");
    assert_eq!(song.username, "alice");
    assert_eq!(song.user_id, 10);

    // Les identifiants continuent après réouverture
    let next = store.add_song("Outro", "youtube", "abc", 10).await?;
    assert!(next > song_id);
    Ok(())
}

#[tokio::test]
async fn test_unknown_song() {
    let (_temp_dir, store) = create_test_store();
    assert!(store.song_by_id(1).await.unwrap().is_none());
}
