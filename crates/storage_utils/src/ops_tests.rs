/* 📖 # Storage operations test suite

These tests exercise the `PathOperations` contract against both backends: the local
filesystem (inside a TempDir) and an object store (MemoryStore behind Storage). The
shared contract checks run the same assertions through `&dyn PathOperations` to keep
both backends consistent.

Key test categories:
- Shared contract (exists, listdir, remove, rmtree, getsize)
- Object store listing, walkfiles and glob
- Sentinels and directory existence
- Upload, download and cross-backend copies
- Streams returned by open
*/

#[cfg(test)]
mod contract_tests {
    use std::fs;

    use tempfile::TempDir;

    use crate::ops::{FileSystemOperations, MemoryStore, PathOperations, Storage, StoreHandle};
    use crate::{Path, Scheme};

    fn sorted(mut paths: Vec<Path>) -> Vec<String> {
        paths.sort();
        paths.into_iter().map(|p| p.as_str().to_string()).collect()
    }

    /// Runs the backend-independent checks below `root`, an existing empty directory.
    fn check_contract(ops: &dyn PathOperations, root: &Path, make_dir: impl Fn(&Path)) {
        let file1 = root / "file1.txt";
        let file2 = root / "file2.txt";
        let nested = root / "nested_dir";
        make_dir(&nested);
        ops.write_bytes(&file1, b"one").unwrap();
        ops.write_bytes(&file2, b"second").unwrap();
        ops.write_bytes(&(&nested / "inner.txt"), b"inner").unwrap();

        assert!(ops.exists(&file1).unwrap());
        assert!(ops.isfile(&file1).unwrap());
        assert!(!ops.isdir(&file1).unwrap());
        assert!(ops.isdir(&nested).unwrap());
        assert!(!ops.isfile(&nested).unwrap());
        assert!(!ops.exists(&(root / "missing")).unwrap());
        assert!(ops.isabs(root).unwrap());
        assert!(!ops.islink(&file1).unwrap());

        let listing: Vec<String> = sorted(ops.listdir(root).unwrap())
            .into_iter()
            .map(|p| p.trim_end_matches('/').rsplit('/').next().unwrap_or("").to_string())
            .collect();
        assert_eq!(listing, ["file1.txt", "file2.txt", "nested_dir"]);

        assert_eq!(ops.getsize(&file2).unwrap(), 6);
        assert_eq!(ops.stat(&file2).unwrap().size(), 6);
        assert_eq!(ops.read_to_string(&file1).unwrap(), "one");
        assert_eq!(ops.walkfiles(root, Some("*.txt")).unwrap().len(), 3);

        ops.remove(&file1).unwrap();
        assert!(!ops.exists(&file1).unwrap());
        assert!(ops.remove(&file1).unwrap_err().is_not_found());
        assert!(ops.getsize(&file1).unwrap_err().is_not_found());

        ops.rmtree(&nested).unwrap();
        assert!(!ops.exists(&nested).unwrap());
        ops.rmtree(&nested).unwrap();
        ops.rmtree(&(root / "never_existed")).unwrap();
    }

    #[test]
    fn test_contract_local() {
        let temp = TempDir::new().unwrap();
        let root = Path::new(temp.path().to_string_lossy()).unwrap();
        check_contract(&FileSystemOperations, &root, |dir| {
            fs::create_dir_all(dir).unwrap();
        });
    }

    #[test]
    fn test_contract_object_store() {
        let store = MemoryStore::new();
        store.create_bucket("bucket");
        let ops = crate::ops::ObjectStoreOperations::new(StoreHandle::new(store));
        check_contract(&ops, &Path::object_store("s3://bucket/root"), |_dir| {});
    }

    #[test]
    fn test_contract_through_storage_dispatcher() {
        let store = MemoryStore::new();
        store.create_bucket("AUTH_test/cont");
        let storage = Storage::new().with_client(Scheme::Swift, StoreHandle::new(store));
        check_contract(
            &storage,
            &Path::new("swift://AUTH_test/cont/root").unwrap(),
            |_dir| {},
        );

        let temp = TempDir::new().unwrap();
        let root = Path::new(temp.path().to_string_lossy()).unwrap();
        check_contract(&storage, &root, |dir| {
            fs::create_dir_all(dir).unwrap();
        });
    }
}

#[cfg(test)]
mod object_store_tests {
    use std::fs;
    use std::io::{Read, Write};

    use expect_test::expect;
    use tempfile::TempDir;

    use crate::ops::{
        ListEntry, ListOptions, ListRequest, MemoryStore, ObjectMetadata, ObjectStoreClient,
        OpenOptions, PathOperations, Storage, StoreHandle, UploadOptions,
    };
    use crate::{Path, Scheme, StorageResult};

    struct Fixture {
        store: MemoryStore,
        storage: Storage,
        bucket: Path,
        test_dir: Path,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        store.create_bucket("test-bucket");
        let storage = Storage::new().with_client(Scheme::S3, StoreHandle::new(store.clone()));
        let bucket = Path::new("s3://test-bucket").unwrap();
        let test_dir = &bucket / "test";
        Fixture {
            store,
            storage,
            bucket,
            test_dir,
        }
    }

    fn local_root(temp: &TempDir) -> Path {
        Path::new(temp.path().to_string_lossy()).unwrap()
    }

    fn touch(temp: &TempDir, relative: &str) {
        let file = temp.path().join(relative);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(file, relative.as_bytes()).unwrap();
    }

    fn sorted(mut paths: Vec<Path>) -> Vec<Path> {
        paths.sort();
        paths
    }

    fn upload_dataset(fx: &Fixture, files: &[&str], dirs: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for dir in dirs {
            fs::create_dir_all(temp.path().join(dir)).unwrap();
        }
        for file in files {
            touch(&temp, file);
        }
        fx.storage
            .upload(&fx.test_dir, &[local_root(&temp)], &UploadOptions::default())
            .unwrap();
        temp
    }

    #[test]
    fn test_list_methods() {
        let fx = fixture();
        let fake_bucket = Path::new("s3://test-bucket2").unwrap();
        let error = fx.storage.list(&fake_bucket, &ListOptions::default()).unwrap_err();
        assert!(error.is_not_found());
        let fake_folder = &fx.bucket / "not_a_dir";
        assert!(fx.storage.list(&fake_folder, &ListOptions::default()).unwrap().is_empty());

        upload_dataset(
            &fx,
            &["file1.txt", "file2.txt", "nested_dir/dir/file3.txt"],
            &[],
        );

        let file_list = sorted(fx.storage.list(&fx.test_dir, &ListOptions::default()).unwrap());
        let starts_with = ListOptions {
            starts_with: Some("test".to_string()),
            limit: None,
        };
        let starts_with_list = sorted(fx.storage.list(&fx.bucket, &starts_with).unwrap());
        assert_eq!(file_list, starts_with_list);
        assert_eq!(
            file_list,
            [
                &fx.test_dir / "file1.txt",
                &fx.test_dir / "file2.txt",
                &fx.test_dir / "nested_dir/dir/file3.txt",
            ]
        );

        let dir_list = sorted(fx.storage.listdir(&fx.test_dir).unwrap());
        assert_eq!(
            dir_list,
            [
                &fx.test_dir / "file1.txt",
                &fx.test_dir / "file2.txt",
                &fx.test_dir / "nested_dir/",
            ]
        );
        assert_eq!(
            dir_list,
            sorted(fx.storage.listdir(&(&fx.test_dir + "/")).unwrap())
        );

        let limited = ListOptions {
            starts_with: None,
            limit: Some(2),
        };
        assert_eq!(fx.storage.list(&fx.test_dir, &limited).unwrap().len(), 2);
    }

    #[test]
    fn test_listdir_missing_bucket_is_not_found() {
        let fx = fixture();
        let error = fx
            .storage
            .listdir(&Path::new("s3://test-bucket2/dir").unwrap())
            .unwrap_err();
        assert!(error.is_not_found());
        expect![[r#"
            listing s3://test-bucket2/dir: Not found: test-bucket2
        "#]]
        .assert_eq(&format!("{}\n", error));
    }

    #[test]
    fn test_walkfiles() {
        let fx = fixture();
        upload_dataset(
            &fx,
            &["aabc.sh", "aabc", "b/c.sh", "b/d", "b/abbbc"],
            &["empty"],
        );
        let walk = |pattern: Option<&str>| -> Vec<String> {
            let mut names: Vec<String> = fx
                .storage
                .walkfiles(&fx.test_dir, pattern)
                .unwrap()
                .iter()
                .map(|p| p.as_str().trim_start_matches("s3://test-bucket/test/").to_string())
                .collect();
            names.sort();
            names
        };
        assert_eq!(walk(None), ["aabc", "aabc.sh", "b/abbbc", "b/c.sh", "b/d"]);
        assert_eq!(walk(Some("*.sh")), ["aabc.sh", "b/c.sh"]);
        assert_eq!(walk(Some("a*b*c")), ["aabc", "b/abbbc"]);
        assert_eq!(walk(Some("a*")), ["aabc", "aabc.sh", "b/abbbc"]);
        assert_eq!(walk(Some("*ab*")), ["aabc", "aabc.sh", "b/abbbc"]);
    }

    #[test]
    fn test_is_methods() {
        let fx = fixture();
        assert!(fx.storage.exists(&fx.bucket).unwrap());
        assert!(fx.storage.isdir(&fx.bucket).unwrap());
        assert!(!fx.storage.isfile(&fx.bucket).unwrap());
        assert_eq!(fx.storage.getsize(&fx.bucket).unwrap(), 0);

        upload_dataset(&fx, &["0"], &[]);
        assert!(fx.storage.exists(&fx.test_dir).unwrap());
        assert!(fx.storage.isdir(&fx.test_dir).unwrap());
        assert!(!fx.storage.isfile(&fx.test_dir).unwrap());
        assert_eq!(fx.storage.getsize(&fx.test_dir).unwrap(), 0);

        let test_file = &fx.test_dir / "0";
        assert!(fx.storage.exists(&test_file).unwrap());
        assert!(!fx.storage.isdir(&test_file).unwrap());
        assert!(fx.storage.isfile(&test_file).unwrap());
        assert_eq!(fx.storage.getsize(&test_file).unwrap(), 1);

        fx.storage.remove(&test_file).unwrap();
        assert!(!fx.storage.exists(&test_file).unwrap());
        assert!(fx.storage.getsize(&test_file).unwrap_err().is_not_found());

        let fake_bucket = &fx.bucket + "2";
        assert!(!fx.storage.exists(&fake_bucket).unwrap());
        assert!(!fx.storage.isdir(&fake_bucket).unwrap());
        assert!(!fx.storage.isfile(&fake_bucket).unwrap());
        assert!(fx.storage.getsize(&fake_bucket).unwrap_err().is_not_found());

        assert!(fx.storage.ismount(&test_file).unwrap());
        assert!(!fx.storage.islink(&test_file).unwrap());
    }

    #[test]
    fn test_sentinel_makes_directory_exist() {
        let fx = fixture();
        fx.store.add_object("test-bucket", "test/empty/", Vec::new());
        let empty = &fx.test_dir / "empty";
        assert!(fx.storage.isdir(&empty).unwrap());
        assert!(fx.storage.exists(&empty).unwrap());
        assert!(!fx.storage.isfile(&(&empty + "/")).unwrap());
        assert!(fx.storage.listdir(&empty).unwrap().is_empty());
        assert!(fx.storage.list(&empty, &ListOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_upload_creates_sentinels_for_empty_directories() {
        let fx = fixture();
        upload_dataset(&fx, &["a/file.txt"], &["empty", "a/also_empty"]);
        expect![[r#"
            [
                "test/a/also_empty/",
                "test/a/file.txt",
                "test/empty/",
            ]
        "#]]
        .assert_debug_eq(&fx.store.keys("test-bucket"));
    }

    #[test]
    fn test_upload_single_file_lands_below_destination() {
        let fx = fixture();
        let temp = TempDir::new().unwrap();
        touch(&temp, "report.csv");
        let uploaded = fx
            .storage
            .upload(
                &fx.test_dir,
                &[&local_root(&temp) / "report.csv"],
                &UploadOptions::default(),
            )
            .unwrap();
        assert_eq!(uploaded, [&fx.test_dir / "report.csv"]);
    }

    #[test]
    fn test_upload_download_round_trip() {
        let fx = fixture();
        let files = ["0", "1", "dir/2", "dir/sub/3"];
        upload_dataset(&fx, &files, &["empty"]);

        let target = TempDir::new().unwrap();
        let written = fx.storage.download(&fx.test_dir, &local_root(&target)).unwrap();
        assert_eq!(written.len(), files.len());
        for file in files {
            let contents = fs::read_to_string(target.path().join(file)).unwrap();
            assert_eq!(contents, file);
        }
        assert!(target.path().join("empty").is_dir());

        for file in files {
            let object = &fx.test_dir / file;
            fx.storage.remove(&object).unwrap();
            assert!(!fx.storage.exists(&object).unwrap());
        }
    }

    #[test]
    fn test_download_conflicts_are_file_errors() {
        let fx = fixture();
        upload_dataset(&fx, &["dir/a/a.txt"], &[]);

        let target = TempDir::new().unwrap();
        touch(&target, "dir");
        touch(&target, "a");
        let root = local_root(&target);
        let error = fx.storage.download(&fx.test_dir, &root).unwrap_err();
        assert!(!error.is_not_found());
        let error = fx.storage.download(&(&fx.test_dir / "dir"), &root).unwrap_err();
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_download_refuses_keys_leaving_destination() {
        let fx = fixture();
        fx.store.add_object("test-bucket", "test/dir/ok.txt", b"ok".to_vec());
        fx.store.add_object("test-bucket", "test/dir/../escaped.txt", b"x".to_vec());

        let outer = TempDir::new().unwrap();
        let dest = local_root(&outer) / "a" / "out";
        let error = fx.storage.download(&(&fx.test_dir / "dir"), &dest).unwrap_err();
        assert!(error.is_invalid_path());
        assert!(!outer.path().join("a/escaped.txt").exists());
        assert!(!outer.path().join("a/out/ok.txt").exists());

        for key in ["test/dir/./x", "test/dir//abs", "test/dir/sub/../../y"] {
            let store = MemoryStore::new();
            store.add_object("test-bucket", key, b"x".to_vec());
            let storage = Storage::new().with_client(Scheme::S3, StoreHandle::new(store));
            let error = storage.download(&(&fx.test_dir / "dir"), &dest).unwrap_err();
            assert!(error.is_invalid_path(), "{key}");
        }
        assert!(!outer.path().join("a").exists());
    }

    /// Ignores the requested prefix and lists the whole bucket.
    #[derive(Debug)]
    struct WholeBucketListing(MemoryStore);

    impl ObjectStoreClient for WholeBucketListing {
        fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
            self.0.bucket_exists(bucket)
        }

        fn list_objects(&self, bucket: &str, _request: &ListRequest) -> StorageResult<Vec<ListEntry>> {
            self.0.list_objects(bucket, &ListRequest::recursive(""))
        }

        fn head_object(&self, bucket: &str, key: &str) -> StorageResult<Option<ObjectMetadata>> {
            self.0.head_object(bucket, key)
        }

        fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
            self.0.get_object(bucket, key)
        }

        fn put_object(
            &self,
            bucket: &str,
            key: &str,
            data: Vec<u8>,
            options: &UploadOptions,
        ) -> StorageResult<()> {
            self.0.put_object(bucket, key, data, options)
        }

        fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
            self.0.delete_object(bucket, key)
        }
    }

    #[test]
    fn test_download_skips_keys_outside_prefix() {
        let store = MemoryStore::new();
        store.add_object("test-bucket", "t", b"short".to_vec());
        store.add_object("test-bucket", "other/x.txt", b"other".to_vec());
        store.add_object("test-bucket", "test/dir/a.txt", b"a".to_vec());
        let storage = Storage::new()
            .with_client(Scheme::S3, StoreHandle::new(WholeBucketListing(store)));

        let target = TempDir::new().unwrap();
        let root = local_root(&target);
        let source = Path::new("s3://test-bucket/test/dir").unwrap();
        let written = storage.download(&source, &root).unwrap();
        assert_eq!(written, [&root / "a.txt"]);
        assert!(!target.path().join("t").exists());
        assert!(!target.path().join("other").exists());
    }

    #[test]
    fn test_glob_supports_single_trailing_wildcard() {
        let fx = fixture();
        upload_dataset(&fx, &["data_1.csv", "data_2.csv", "other.csv", "data_dir/x"], &[]);
        let matches = sorted(fx.storage.glob(&fx.test_dir, "data_*").unwrap());
        assert_eq!(
            matches,
            [
                &fx.test_dir / "data_1.csv",
                &fx.test_dir / "data_2.csv",
                &fx.test_dir / "data_dir/x",
            ]
        );
        for pattern in ["*.csv", "data_*.csv", "d?ta*"] {
            let error = fx.storage.glob(&fx.test_dir, pattern).unwrap_err();
            assert!(error.is_not_implemented(), "pattern {}", pattern);
        }
    }

    #[test]
    fn test_rmtree() {
        let fx = fixture();
        upload_dataset(&fx, &["a", "b/c"], &["empty"]);
        fx.store.add_object("test-bucket", "test", b"same name as dir".to_vec());
        fx.store.add_object("test-bucket", "tested", b"sibling".to_vec());
        fx.storage.rmtree(&fx.test_dir).unwrap();
        assert_eq!(fx.store.keys("test-bucket"), ["tested"]);

        fx.storage.rmtree(&fx.test_dir).unwrap();
        fx.storage
            .rmtree(&Path::new("s3://test-bucket2/anything").unwrap())
            .unwrap();
    }

    #[test]
    fn test_open_streams() {
        let fx = fixture();
        let object = &fx.test_dir / "stream.txt";
        {
            let mut writer = fx.storage.open(&object, &OpenOptions::write()).unwrap();
            writer.write_all(b"written ").unwrap();
            writer.write_all(b"on drop").unwrap();
            let mut buf = [0u8; 4];
            assert!(writer.read(&mut buf).is_err());
        }
        assert_eq!(fx.storage.read_to_string(&object).unwrap(), "written on drop");

        let options = OpenOptions::write().with_upload_options(UploadOptions {
            content_type: Some("application/json".to_string()),
            ..UploadOptions::default()
        });
        let json = &fx.test_dir / "data.json";
        let mut writer = fx.storage.open(&json, &options).unwrap();
        writer.write_all(b"{}").unwrap();
        writer.flush().unwrap();
        match fx.storage.stat(&json).unwrap() {
            crate::ops::PathStat::Object(metadata) => {
                assert_eq!(metadata.content_type.as_deref(), Some("application/json"));
                assert_eq!(metadata.size, 2);
            }
            other => panic!("unexpected stat {:?}", other),
        }
        drop(writer);

        let error = fx.storage.open(&object, &OpenOptions::append()).err().unwrap();
        assert!(error.is_not_implemented());
        let error = fx
            .storage
            .open(&(&fx.test_dir / "missing"), &OpenOptions::read())
            .err()
            .unwrap();
        assert!(error.is_not_found());
    }

    #[test]
    fn test_paths_without_bucket() {
        let store = MemoryStore::new();
        let storage = Storage::new().with_client(Scheme::Swift, StoreHandle::new(store));
        let tenant = Path::new("swift://AUTH_x").unwrap();
        assert!(storage.isabs(&tenant).unwrap());
        assert!(storage.ismount(&tenant).unwrap());
        assert!(!storage.islink(&tenant).unwrap());
        assert!(storage.listdir(&tenant).unwrap_err().is_not_implemented());
        assert!(storage.exists(&tenant).unwrap_err().is_not_implemented());
        assert!(storage.rmtree(&tenant).unwrap_err().is_not_implemented());
    }

    #[test]
    fn test_copy_across_backends() {
        let fx = fixture();
        let source_dir = TempDir::new().unwrap();
        touch(&source_dir, "tree/a.txt");
        touch(&source_dir, "tree/sub/b.txt");
        let local = local_root(&source_dir);

        fx.storage
            .copy(&(&local / "tree/a.txt"), &(&fx.test_dir / "copied.txt"))
            .unwrap();
        assert_eq!(
            fx.storage.read_to_string(&(&fx.test_dir / "copied.txt")).unwrap(),
            "tree/a.txt"
        );

        fx.storage.copy(&(&fx.test_dir / "copied.txt"), &local).unwrap();
        assert_eq!(
            fs::read_to_string(source_dir.path().join("copied.txt")).unwrap(),
            "tree/a.txt"
        );

        fx.storage
            .copytree(&(&local / "tree"), &(&fx.test_dir / "tree"))
            .unwrap();
        assert!(fx.storage.isfile(&(&fx.test_dir / "tree/sub/b.txt")).unwrap());

        fx.storage
            .copytree(&(&fx.test_dir / "tree"), &(&local / "restored"))
            .unwrap();
        assert_eq!(
            fs::read_to_string(source_dir.path().join("restored/sub/b.txt")).unwrap(),
            "tree/sub/b.txt"
        );

        fx.storage
            .copytree(&(&local / "tree"), &(&local / "local_copy"))
            .unwrap();
        assert!(source_dir.path().join("local_copy/sub/b.txt").is_file());
    }
}
