//! Integration tests for events

#[cfg(test)]
mod tests {
    use strand_errors::{ChainError, ProviderError};
    use strand_events::*;
    use strand_types::PathType;
    use tracing::Level;

    #[tokio::test]
    async fn test_emit_helpers() {
        let (tx, mut rx) = channel();

        tx.emit_warning("slow listing");
        tx.emit_file_warning("2022-06-21T09_15_38.325469003Z.rcd.gz", "not yet available");

        let event1 = rx.recv().await.unwrap();
        assert!(matches!(
            event1,
            AppEvent::General(GeneralEvent::Warning { filename: None, .. })
        ));

        match rx.recv().await.unwrap() {
            AppEvent::General(GeneralEvent::Warning { filename, message }) => {
                assert_eq!(filename.as_deref(), Some("2022-06-21T09_15_38.325469003Z.rcd.gz"));
                assert_eq!(message, "not yet available");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_warning("ignored");
    }

    #[test]
    fn test_absent_sender_is_noop() {
        let sender: Option<EventSender> = None;
        sender.emit_stream(StreamEvent::CycleStarted {
            stream: "record".into(),
            after: None,
        });
    }

    #[tokio::test]
    async fn test_operation_failed_carries_failure_context() {
        let (tx, mut rx) = channel();
        let err = ProviderError::transient(
            "0.0.3",
            "2022-06-21T09_15_38.325469003Z.rcd.gz",
            "gcs",
            "connection reset",
        );
        tx.emit_operation_failed("fetch", &err);

        match rx.recv().await.unwrap() {
            AppEvent::General(GeneralEvent::OperationFailed { operation, failure }) => {
                assert_eq!(operation, "fetch");
                assert!(failure.retryable);
                assert!(failure.code.is_some());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_log_levels() {
        let broken = ChainError::OutOfOrder {
            filename: "b".into(),
            last_filename: "c".into(),
        };
        let event = AppEvent::Stream(StreamEvent::ChainBroken {
            stream: "record".into(),
            filename: "b".into(),
            failure: FailureContext::from_error(&broken),
        });
        assert_eq!(event.log_level(), Level::ERROR);
        assert_eq!(event.log_target(), "strand::events::stream");
        assert_eq!(event.domain(), EventDomain::Stream);

        let event = AppEvent::Verification(VerificationEvent::NodeFlagged {
            filename: "a".into(),
            node: "0.0.3".into(),
            reason: "hash mismatch".into(),
        });
        assert_eq!(event.log_level(), Level::WARN);

        let event = AppEvent::Acquisition(AcquisitionEvent::Listed {
            node: "0.0.3".into(),
            after: String::new(),
            count: 4,
        });
        assert_eq!(event.log_level(), Level::DEBUG);

        let event = AppEvent::Acquisition(AcquisitionEvent::PathSwitched {
            node: "0.0.3".into(),
            from: PathType::Legacy,
            to: PathType::Current,
        });
        assert_eq!(event.log_level(), Level::INFO);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = AppEvent::Stream(StreamEvent::FileCommitted {
            stream: "record".into(),
            filename: "2022-06-21T09_15_38.325469003Z.rcd.gz".into(),
            index: Some(7),
            hash: "ab".into(),
            items: 3,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "stream");
        assert_eq!(json["event"]["type"], "FileCommitted");
        assert_eq!(json["event"]["index"], 7);
    }

    #[test]
    fn test_meta_from_event() {
        let event = AppEvent::General(GeneralEvent::warning("slow node"));
        let meta = EventMeta::new(event.log_level(), event.domain())
            .for_stream("record")
            .in_cycle(4);
        assert_eq!(meta.severity, Severity::Warn);
        assert_eq!(meta.level(), Level::WARN);
        assert_eq!(meta.domain.as_str(), "general");

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["severity"], "warn");
        assert_eq!(json["domain"], "general");
        assert_eq!(json["stream"], "record");
        assert_eq!(json["cycle"], 4);
    }
}
