//! End-to-end tests for the log entry pipeline.

#[cfg(test)]
mod tests {
    use crate::config::ScopelogConfig;
    use crate::context::{self, filtered_context, LoggingMatrix};
    use crate::level::LogLevel;
    use crate::logging::{init, LogCall, LogPipeline, Logger, Transport};
    use crate::testing::{
        assert_field, assert_no_field, FailingTransport, MemoryTransport, SlowFlushTransport,
    };
    use pretty_assertions::assert_eq;
    use serde_json::{json, Map};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn matrix() -> LoggingMatrix {
        serde_json::from_value(json!({"default": ["correlationId"], "error": ["*"]})).unwrap()
    }

    #[tokio::test]
    async fn test_matrix_filters_context_per_level() {
        let matrix = matrix();

        let (info, error) = context::run(async {
            context::set_correlation_id("corr-d");
            context::set("userId", "u-9");
            (
                filtered_context(LogLevel::Info, Some(&matrix)),
                filtered_context(LogLevel::Error, Some(&matrix)),
            )
        })
        .await;

        let mut expected_info = Map::new();
        expected_info.insert("correlationId".into(), json!("corr-d"));
        assert_eq!(info, expected_info);

        let mut expected_error = expected_info.clone();
        expected_error.insert("userId".into(), json!("u-9"));
        assert_eq!(error, expected_error);
    }

    #[tokio::test]
    async fn test_matrix_applies_to_logged_records() {
        let transport = Arc::new(MemoryTransport::new());
        let pipeline = LogPipeline::new()
            .with_matrix(matrix())
            .with_transport(transport.clone());
        let logger = Logger::new("api", LogLevel::Trace, Arc::new(pipeline));

        context::run(async {
            context::set_correlation_id("corr-e");
            context::set("userId", "u-1");
            logger.info("served").await;
            logger.error("failed").await;
        })
        .await;

        let records = transport.records();
        assert_field(&records[0], "correlationId", &json!("corr-e"));
        assert_no_field(&records[0], "userId");
        assert_field(&records[1], "userId", &json!("u-1"));
    }

    #[tokio::test]
    async fn test_failing_transport_does_not_block_others() {
        let failing = Arc::new(FailingTransport::new("broken", "disk full"));
        let memory = Arc::new(MemoryTransport::new());
        let pipeline = LogPipeline::new()
            .with_transport(failing.clone())
            .with_transport(memory.clone());
        let logger = Logger::new("api", LogLevel::Info, Arc::new(pipeline));

        let record = logger.warn("low disk").await;

        assert!(record.is_some());
        assert_eq!(failing.attempts(), 1);
        assert_eq!(memory.messages(), vec!["low disk".to_string()]);
    }

    #[tokio::test]
    async fn test_flush_reports_failures() {
        let memory = Arc::new(MemoryTransport::new());
        let pipeline = LogPipeline::new()
            .with_transport(Arc::new(FailingTransport::new("broken", "closed")))
            .with_transport(memory.clone());

        let failures = pipeline.flush().await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].transport, "broken");
        assert_eq!(failures[0].operation, "flush");
        assert_eq!(memory.flush_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_gives_up_after_timeout() {
        let pipeline = LogPipeline::new()
            .with_transport(Arc::new(SlowFlushTransport::new(Duration::from_secs(5))))
            .with_shutdown_timeout(Duration::from_millis(50));

        let started = Instant::now();
        assert!(!pipeline.shutdown().await);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_shutdown_drains_transports() {
        let memory = Arc::new(MemoryTransport::new());
        let pipeline = LogPipeline::new().with_transport(memory.clone());

        assert!(pipeline.shutdown().await);
        assert_eq!(memory.flush_count(), 1);
    }

    #[tokio::test]
    async fn test_configured_pipeline_masks_context_and_fields() {
        let memory = Arc::new(MemoryTransport::new());
        let transports = vec![memory.clone() as Arc<dyn Transport>];
        let pipeline = LogPipeline::from_config(&ScopelogConfig::new(), transports).unwrap();
        let logger = Logger::new("auth", LogLevel::Info, Arc::new(pipeline));

        context::run(async {
            context::set("apiKey", "abcdefghijkl");
            logger
                .info(
                    LogCall::new("login for %s")
                        .arg(json!("al"))
                        .with_field("password", "hunter2"),
                )
                .await;
        })
        .await;

        let record = &memory.records()[0];
        assert_eq!(record.message, "login for al");
        assert_field(record, "password", &json!("********"));
        assert_field(record, "apiKey", &json!("ab********kl"));
        assert_field(record, "level", &json!("info"));
        assert_field(record, "name", &json!("auth"));
    }

    #[tokio::test]
    async fn test_reserved_keys_win_over_metadata() {
        let memory = Arc::new(MemoryTransport::new());
        let pipeline = LogPipeline::new().with_transport(memory.clone());
        let logger = Logger::new("svc", LogLevel::Info, Arc::new(pipeline));

        logger
            .info(
                LogCall::new("real")
                    .with_field("level", "spoofed")
                    .with_field("msg", "spoofed"),
            )
            .await;

        let record = &memory.records()[0];
        assert_field(record, "level", &json!("info"));
        assert_field(record, "msg", &json!("real"));
    }

    #[tokio::test]
    async fn test_init_builds_pool_from_config() {
        let memory = Arc::new(MemoryTransport::new());
        let config = ScopelogConfig::new()
            .with_level(LogLevel::Info)
            .with_service_name("orders");

        let pool = init(&config, vec![memory.clone() as Arc<dyn Transport>]).unwrap();
        let logger = pool.default_logger();
        logger.debug("dropped").await;
        logger.info("kept").await;
        pool.get("db").info("query").await;

        assert_eq!(memory.messages(), vec!["kept".to_string(), "query".to_string()]);
        assert!(Arc::ptr_eq(&logger, &pool.get("orders")));

        let records = memory.records();
        assert_field(&records[0], "name", &json!("orders"));
        assert_field(&records[0], "service", &json!("orders"));
        assert_field(&records[1], "name", &json!("db"));
        assert_field(&records[1], "service", &json!("orders"));
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let config = ScopelogConfig::new().with_service_name("  ");

        let err = init(&config, Vec::new()).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("service_name"));
    }
}
