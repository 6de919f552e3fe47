//! Integration tests for error types

#[cfg(test)]
mod tests {
    use strand_errors::*;

    #[test]
    fn test_error_conversion() {
        let err: Error = ProviderError::not_found("0.0.3", "2022-01-01T00_00_00Z.rcd").into();
        assert!(matches!(err, Error::Provider(ProviderError::NotFound { .. })));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_display_carries_context() {
        let err = ProviderError::transient("0.0.4", "a.rcd_sig", "s3-primary", "timeout");
        let text = err.to_string();
        assert!(text.contains("0.0.4"));
        assert!(text.contains("a.rcd_sig"));
        assert!(text.contains("s3-primary"));
    }

    #[test]
    fn test_kind_taxonomy() {
        let cases: Vec<(Error, ErrorKind)> = vec![
            (ProviderError::not_found("n", "f").into(), ErrorKind::NotFound),
            (
                ProviderError::transient("n", "f", "s", "m").into(),
                ErrorKind::Transient,
            ),
            (
                ProviderError::permanent("n", "f", "s", "m").into(),
                ErrorKind::Permanent,
            ),
            (ParseError::malformed("f", "bad").into(), ErrorKind::Parse),
            (
                ConsensusError::NoSignatures {
                    filename: "f".into(),
                }
                .into(),
                ErrorKind::Consensus,
            ),
            (
                ChainError::Broken {
                    filename: "f".into(),
                    last_filename: "e".into(),
                    expected: "aa".into(),
                    actual: "bb".into(),
                }
                .into(),
                ErrorKind::ChainBreak,
            ),
            (Error::Cancelled, ErrorKind::Cancelled),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "{err}");
        }
    }

    #[test]
    fn test_retryable_classification() {
        let consensus: Error = ConsensusError::NoSignatures {
            filename: "f".into(),
        }
        .into();
        assert!(consensus.is_retryable());

        let chain: Error = ChainError::OutOfOrder {
            filename: "b".into(),
            last_filename: "c".into(),
        }
        .into();
        assert!(!chain.is_retryable());
        assert_eq!(chain.user_code(), Some("chain.out_of_order"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: Error = io_err.into();
        assert!(matches!(
            err,
            Error::Io {
                kind: std::io::ErrorKind::PermissionDenied,
                ..
            }
        ));
    }

    #[test]
    fn test_io_error_names_the_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = Error::io_with_path(&io_err, "/var/lib/strand/record.json");
        assert_eq!(
            err.user_message(),
            "/var/lib/strand/record.json: no such file"
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_provider_error_names_requested_file() {
        let missing = ProviderError::not_found("0.0.3", "2022-06-21T09_15_38.325469003Z.rcd.gz");
        assert_eq!(
            missing.filename(),
            Some("2022-06-21T09_15_38.325469003Z.rcd.gz")
        );
        let throttled = ProviderError::RateLimited {
            source_name: "gcs".into(),
            seconds: 5,
        };
        assert_eq!(throttled.filename(), None);
    }
}
