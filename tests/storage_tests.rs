//! Storage backend tests shared by the memory and file system backends

use domain_schema_docs::{
    FileSystemStorageBackend, MemoryStorageBackend, StorageBackend, StorageError,
};

async fn exercise(backend: &impl StorageBackend) {
    backend.write_file("docs/m/A.yaml.md", b"# A").await.unwrap();
    backend.write_file("docs/m/B.yaml.md", b"# B").await.unwrap();
    backend.write_file("docs/README.md", b"# Shop").await.unwrap();

    assert_eq!(backend.read_to_string("docs/m/A.yaml.md").await.unwrap(), "# A");
    assert_eq!(
        backend.list_files("docs/m").await.unwrap(),
        vec!["A.yaml.md", "B.yaml.md"]
    );
    assert_eq!(backend.list_files("docs").await.unwrap(), vec!["README.md"]);
    assert_eq!(backend.list_dirs("docs").await.unwrap(), vec!["m"]);
    assert!(backend.file_exists("docs/README.md").await.unwrap());
    assert!(!backend.file_exists("docs/m").await.unwrap());
    assert!(backend.dir_exists("docs/m").await.unwrap());

    backend.delete_file("docs/m/B.yaml.md").await.unwrap();
    assert!(matches!(
        backend.read_file("docs/m/B.yaml.md").await,
        Err(StorageError::FileNotFound(_))
    ));
    assert!(matches!(
        backend.list_files("missing").await,
        Err(StorageError::DirectoryNotFound(_))
    ));

    backend.delete_dir("docs/m").await.unwrap();
    assert!(!backend.dir_exists("docs/m").await.unwrap());
    assert!(backend.file_exists("docs/README.md").await.unwrap());
    // deleting a missing directory is not an error
    backend.delete_dir("docs/m").await.unwrap();
}

mod memory_tests {
    use super::*;

    #[tokio::test]
    async fn test_backend_contract() {
        exercise(&MemoryStorageBackend::new()).await;
    }

    #[tokio::test]
    async fn test_with_files() {
        let backend = MemoryStorageBackend::with_files([("in/index.yaml", "title: Shop\n")]);
        assert_eq!(backend.list_dirs("").await.unwrap(), vec!["in"]);
        assert_eq!(backend.get("in/index.yaml").as_deref(), Some("title: Shop\n"));
    }
}

mod filesystem_tests {
    use super::*;

    #[tokio::test]
    async fn test_backend_contract() {
        let temp = tempfile::tempdir().unwrap();
        exercise(&FileSystemStorageBackend::new(temp.path())).await;
    }

    #[tokio::test]
    async fn test_paths_stay_below_base() {
        let temp = tempfile::tempdir().unwrap();
        let backend = FileSystemStorageBackend::new(temp.path().join("out"));
        assert!(matches!(
            backend.write_file("../escape.md", b"x").await,
            Err(StorageError::PermissionDenied(_))
        ));
        backend.write_file("/m/A.yaml.md", b"x").await.unwrap();
        assert!(temp.path().join("out/m/A.yaml.md").exists());
    }
}
