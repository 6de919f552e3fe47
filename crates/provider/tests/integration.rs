//! Integration tests for provider crate

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;
    use strand_errors::ProviderError;
    use strand_provider::*;
    use strand_testkit::{address_book, chain, signature_file, TempBucket};
    use strand_types::{FileKind, PathType, StreamFilename};

    fn legacy_resolver() -> Arc<PathResolver> {
        Arc::new(PathResolver::new(PathType::Legacy, Duration::from_secs(60)))
    }

    fn storage(bucket: &TempBucket, resolver: Arc<PathResolver>) -> StorageStreamFileProvider {
        let store = Arc::new(LocalStore::new("local", bucket.root()));
        StorageStreamFileProvider::new(store, StorageLayout::default(), resolver)
    }

    #[tokio::test]
    async fn test_list_returns_signatures_after_pointer() {
        let bucket = TempBucket::new();
        let layout = StorageLayout::default();
        let node = &address_book(&[1])[0];
        let files = chain(6, 4);
        for file in &files {
            bucket.put(&layout.key(node, PathType::Legacy, &file.filename), &file.bytes);
            bucket.put(
                &layout.key(node, PathType::Legacy, &file.signature_filename()),
                signature_file(6, 0, file),
            );
        }

        let provider = storage(&bucket, legacy_resolver());
        let after = files[1].signature_filename();
        let listed = provider.list(node, &after, 10).await.unwrap();
        assert_eq!(
            listed,
            vec![files[2].signature_filename(), files[3].signature_filename()]
        );

        let limited = provider
            .list(node, &StreamFilename::epoch(FileKind::Signature), 1)
            .await
            .unwrap();
        assert_eq!(limited, vec![files[0].signature_filename()]);
    }

    #[tokio::test]
    async fn test_get_reads_data_and_reports_not_found() {
        let bucket = TempBucket::new();
        let layout = StorageLayout::default();
        let node = &address_book(&[1])[0];
        let file = &chain(6, 1)[0];
        bucket.put(&layout.key(node, PathType::Legacy, &file.filename), &file.bytes);

        let provider = storage(&bucket, legacy_resolver());
        let data = provider.get(node, &file.filename).await.unwrap();
        assert_eq!(data.bytes, file.bytes);
        assert_eq!(data.node, node.node_id);
        assert_eq!(data.source, "local");

        let err = provider
            .get(node, &file.signature_filename())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_layout_follows_migrated_node() {
        let bucket = TempBucket::new();
        let layout = StorageLayout::default();
        let node = &address_book(&[1])[0];
        let files = chain(6, 2);
        bucket.put(
            &layout.key(node, PathType::Legacy, &files[0].signature_filename()),
            b"legacy",
        );
        bucket.put(
            &layout.key(node, PathType::Current, &files[1].signature_filename()),
            b"current",
        );

        let resolver = Arc::new(PathResolver::new(PathType::Auto, Duration::from_secs(60)));
        let provider = storage(&bucket, resolver.clone());
        let epoch = StreamFilename::epoch(FileKind::Signature);

        let listed = provider.list(node, &epoch, 10).await.unwrap();
        assert_eq!(listed, vec![files[0].signature_filename()]);

        tokio::time::advance(Duration::from_secs(61)).await;
        let listed = provider.list(node, &epoch, 10).await.unwrap();
        assert_eq!(listed, vec![files[1].signature_filename()]);
        assert_eq!(
            resolver.observation(node.node_id).unwrap().path_type,
            PathType::Current
        );
    }

    #[tokio::test]
    async fn test_http_store_get_and_list() {
        let server = MockServer::start_async().await;
        let node = &address_book(&[1])[0];
        let layout = StorageLayout::default();
        let files = chain(6, 2);
        let prefix = layout.node_folder(node, PathType::Legacy);

        let listing = format!(
            "<ListBucketResult><Contents><Key>{prefix}{}</Key></Contents>\
             <Contents><Key>{prefix}{}</Key></Contents>\
             <Contents><Key>{prefix}{}</Key></Contents></ListBucketResult>",
            files[0].filename,
            files[0].signature_filename(),
            files[1].signature_filename(),
        );
        let list_mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/bucket/")
                    .query_param("list-type", "2")
                    .query_param("prefix", prefix.as_str())
                    .header("authorization", "Bearer secret");
                then.status(200).body(listing.as_str());
            })
            .await;
        let data_key = layout.key(node, PathType::Legacy, &files[0].filename);
        let get_mock = server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/bucket/{data_key}"));
                then.status(200).body(files[0].bytes.to_vec());
            })
            .await;

        let config = HttpStoreConfig {
            bearer_token: Some("secret".into()),
            ..HttpStoreConfig::default()
        };
        let store = HttpObjectStore::new("gcs", &server.url("/bucket"), config).unwrap();
        let provider = StorageStreamFileProvider::new(
            Arc::new(store),
            layout.clone(),
            legacy_resolver(),
        );

        let listed = provider
            .list(node, &StreamFilename::epoch(FileKind::Signature), 10)
            .await
            .unwrap();
        list_mock.assert_async().await;
        assert_eq!(
            listed,
            vec![files[0].signature_filename(), files[1].signature_filename()]
        );

        let data = provider.get(node, &files[0].filename).await.unwrap();
        get_mock.assert_async().await;
        assert_eq!(data.bytes, files[0].bytes);
    }

    #[tokio::test]
    async fn test_http_listing_unescapes_keys() {
        let server = MockServer::start_async().await;
        let listing = "<ListBucketResult>\
             <Contents><Key>dir/a&amp;b.txt</Key></Contents>\
             <Contents><Key>dir/plain.txt</Key></Contents>\
             <Contents><Key>dir/nested/c.txt</Key></Contents></ListBucketResult>";
        server
            .mock_async(|when, then| {
                when.method(GET).path("/bucket/").query_param("prefix", "dir/");
                then.status(200).body(listing);
            })
            .await;

        let store =
            HttpObjectStore::new("gcs", &server.url("/bucket"), HttpStoreConfig::default())
                .unwrap();
        let keys = store.list_objects("dir/", None, 10).await.unwrap();
        assert_eq!(keys, vec!["dir/a&b.txt".to_string(), "dir/plain.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_http_status_classification() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/b/missing");
                then.status(404);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/b/denied");
                then.status(403);
            })
            .await;
        let flaky = server
            .mock_async(|when, then| {
                when.method(GET).path("/b/flaky");
                then.status(503);
            })
            .await;

        let config = HttpStoreConfig {
            retry: RetryConfig {
                initial_delay: Duration::from_millis(1),
                ..RetryConfig::default().with_max_retries(2)
            },
            ..HttpStoreConfig::default()
        };
        let store = HttpObjectStore::new("s3", &server.url("/b/"), config).unwrap();

        assert!(matches!(
            store.get_object("missing").await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.get_object("denied").await,
            Err(StoreError::Permanent { .. })
        ));
        assert!(matches!(
            store.get_object("flaky").await,
            Err(StoreError::Transient { .. })
        ));
        flaky.assert_hits_async(3).await;
    }

    #[tokio::test]
    async fn test_composite_falls_back_to_second_source() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(500);
            })
            .await;

        let bucket = TempBucket::new();
        let layout = StorageLayout::default();
        let node = &address_book(&[1])[0];
        let file = &chain(6, 1)[0];
        bucket.put(&layout.key(node, PathType::Legacy, &file.filename), &file.bytes);

        let config = HttpStoreConfig {
            retry: RetryConfig::default().with_max_retries(0),
            ..HttpStoreConfig::default()
        };
        let remote = HttpObjectStore::new("remote", &server.url("/"), config).unwrap();
        let remote =
            StorageStreamFileProvider::new(Arc::new(remote), layout.clone(), legacy_resolver());
        let local = storage(&bucket, legacy_resolver());

        let (tx, mut rx) = strand_events::channel();
        let composite = CompositeStreamFileProvider::new(vec![
            (Arc::new(remote) as Arc<dyn StreamFileProvider>, Duration::from_secs(30)),
            (Arc::new(local) as Arc<dyn StreamFileProvider>, Duration::from_secs(30)),
        ])
        .unwrap()
        .with_events(Some(tx));

        let data = composite.get(node, &file.filename).await.unwrap();
        assert_eq!(data.source, "local");
        assert!(composite.is_backing_off(0));

        let mut failed_over = false;
        while let Ok(event) = rx.try_recv() {
            if let strand_events::AppEvent::Acquisition(
                strand_events::AcquisitionEvent::SourceFailedOver { source_name, .. },
            ) = event
            {
                failed_over = source_name == "remote";
            }
        }
        assert!(failed_over);
    }

    #[tokio::test]
    async fn test_single_failing_source_propagates_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(502);
            })
            .await;
        let node = &address_book(&[1])[0];
        let config = HttpStoreConfig {
            retry: RetryConfig::default().with_max_retries(0),
            ..HttpStoreConfig::default()
        };
        let remote = HttpObjectStore::new("remote", &server.url("/"), config).unwrap();
        let remote =
            StorageStreamFileProvider::new(Arc::new(remote), StorageLayout::default(), legacy_resolver());
        let composite = CompositeStreamFileProvider::new(vec![(
            Arc::new(remote) as Arc<dyn StreamFileProvider>,
            Duration::from_secs(30),
        )])
        .unwrap();

        let err = composite
            .list(node, &StreamFilename::epoch(FileKind::Signature), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Transient { ref source_name, .. } if source_name == "remote"));
    }
}
