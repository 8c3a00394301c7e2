use std::sync::Arc;

use fedgate_cache::FragmentCache;
use fedgate_clap_blocks::fragment_cache::FragmentCacheConfig;
use fedgate_connector::{AccessorFactory, ConnectorRegistry, FragmenterFactory};
use fedgate_retry::FaultTolerantExecutor;
use fedgate_time::TimeProvider;
use fedgate_types::RequestDescriptor;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{FragmentResource, ReadBridge, Result, ServiceSettings, WriteBridge};

/// Process-wide state shared by all requests: the connector registry, the fragment cache and
/// the runtime settings.
///
/// Cheap to clone.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    registry: Arc<ConnectorRegistry>,
    cache: Arc<FragmentCache>,
    executor: FaultTolerantExecutor,
    settings: Arc<ServiceSettings>,
}

impl ServiceContext {
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        cache: Arc<FragmentCache>,
        settings: Arc<ServiceSettings>,
    ) -> Self {
        Self {
            registry,
            cache,
            executor: FaultTolerantExecutor::new(),
            settings,
        }
    }

    /// Build the context from CLI config, starting background eviction for the fragment cache.
    ///
    /// Eviction stops when `shutdown` is cancelled.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_config(
        registry: Arc<ConnectorRegistry>,
        config: &FragmentCacheConfig,
        time_provider: Arc<dyn TimeProvider>,
        shutdown: CancellationToken,
    ) -> Self {
        info!(
            enabled = config.enabled,
            idle_expiry = ?config.idle_expiry,
            eviction_interval = ?config.eviction_interval,
            "starting fragment cache",
        );

        let cache = FragmentCache::new_with_background_eviction(
            time_provider,
            config.idle_expiry,
            config.eviction_interval,
            shutdown,
        );
        Self::new(registry, cache, Arc::new(ServiceSettings::from(config)))
    }

    /// Replace the executor, e.g. to recognize additional transient failures.
    pub fn with_executor(mut self, executor: FaultTolerantExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn settings(&self) -> &Arc<ServiceSettings> {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<FragmentCache> {
        &self.cache
    }

    pub fn fragment_resource(&self) -> FragmentResource {
        FragmentResource::new(
            Arc::clone(&self.registry) as Arc<dyn FragmenterFactory>,
            Arc::clone(&self.cache),
            self.executor.clone(),
            Arc::clone(&self.settings),
        )
    }

    /// A bridge reading through the accessor and resolver named in `descriptor`.
    pub fn read_bridge(&self, descriptor: Arc<RequestDescriptor>) -> Result<ReadBridge> {
        ReadBridge::new(
            descriptor,
            Arc::clone(&self.registry) as Arc<dyn AccessorFactory>,
            self.registry.as_ref(),
            self.executor.clone(),
        )
    }

    /// A bridge writing through the accessor and resolver named in `descriptor`.
    pub fn write_bridge(&self, descriptor: Arc<RequestDescriptor>) -> Result<WriteBridge> {
        WriteBridge::new(
            descriptor,
            Arc::clone(&self.registry) as Arc<dyn AccessorFactory>,
            self.registry.as_ref(),
            self.executor.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;
    use fedgate_connector::{
        FactoryError,
        testing::{CallLog, TestAccessor, TestFragmenter, TestResolver},
    };
    use fedgate_time::{MockProvider, Time};
    use fedgate_types::{Fragment, OneRow};

    use crate::{Bridge, Error};

    use super::*;

    fn registry(log: &CallLog) -> Arc<ConnectorRegistry> {
        let accessor_log = log.clone();
        let resolver_log = log.clone();
        let fragmenter_log = log.clone();
        Arc::new(
            ConnectorRegistry::new()
                .with_accessor("text", move || {
                    TestAccessor::new("accessor", accessor_log.clone())
                        .with_rows([OneRow::new(vec!["a".to_owned()])])
                })
                .with_resolver("text", move || {
                    TestResolver::new("resolver", resolver_log.clone())
                })
                .with_fragmenter("text", move || {
                    TestFragmenter::returning(
                        "fragmenter",
                        fragmenter_log.clone(),
                        vec![Fragment::new("f", vec!["sdw1".to_owned()])],
                    )
                }),
        )
    }

    fn descriptor(segment_id: u32, connector: &str) -> Arc<RequestDescriptor> {
        Arc::new(
            RequestDescriptor::builder("XID-XYZ-123456")
                .segment_id(segment_id)
                .data_source("/tmp/data")
                .accessor(connector)
                .resolver(connector)
                .fragmenter(connector)
                .build(),
        )
    }

    fn context(log: &CallLog) -> (ServiceContext, Arc<MockProvider>) {
        let time_provider = Arc::new(MockProvider::new(Time::ZERO));
        let cache = Arc::new(FragmentCache::new(
            Arc::clone(&time_provider) as _,
            Duration::from_secs(10),
        ));
        let context = ServiceContext::new(registry(log), cache, Default::default());
        (context, time_provider)
    }

    #[test]
    fn fragment_resources_share_the_cache() {
        let log = CallLog::default();
        let (context, _time_provider) = context(&log);

        context
            .fragment_resource()
            .get_fragments(&descriptor(0, "text"))
            .unwrap();
        let response = context
            .fragment_resource()
            .get_fragments(&descriptor(1, "text"))
            .unwrap();

        assert_eq!(response.fragments().len(), 1);
        assert_eq!(log.count("fragmenter.get_fragments"), 1);
        assert_eq!(context.cache().len(), 1);
    }

    #[test]
    fn settings_apply_to_existing_resources() {
        let log = CallLog::default();
        let (context, _time_provider) = context(&log);
        let resource = context.fragment_resource();

        context.settings().set_fragment_cache_enabled(false);
        resource.get_fragments(&descriptor(0, "text")).unwrap();
        resource.get_fragments(&descriptor(1, "text")).unwrap();

        assert_eq!(log.count("fragmenter.get_fragments"), 2);
        assert!(context.cache().is_empty());
    }

    #[test]
    fn bridges_use_registered_connectors() {
        let log = CallLog::default();
        let (context, _time_provider) = context(&log);

        let mut bridge = context.read_bridge(descriptor(0, "text")).unwrap();
        assert!(bridge.begin_iteration().unwrap());
        assert_eq!(bridge.get_next().unwrap().map(|f| f.len()), Some(1));
        bridge.end_iteration().unwrap();

        let mut bridge = context.write_bridge(descriptor(0, "text")).unwrap();
        assert!(bridge.begin_iteration().unwrap());
        bridge.end_iteration().unwrap();

        assert_eq!(log.count("accessor.initialize"), 2);
        assert_eq!(log.count("resolver.initialize"), 2);
    }

    #[test]
    fn unknown_connector() {
        let (context, _time_provider) = context(&CallLog::default());

        let err = context.read_bridge(descriptor(0, "parquet")).unwrap_err();
        assert!(matches!(
            err,
            Error::Factory(FactoryError::UnknownConnector { .. })
        ));
    }

    #[tokio::test]
    async fn from_config() {
        let config = FragmentCacheConfig::try_parse_from([
            "server",
            "--fragment-cache-enabled",
            "false",
            "--fragment-cache-idle-expiry",
            "30s",
        ])
        .unwrap();
        let shutdown = CancellationToken::new();

        let context = ServiceContext::from_config(
            registry(&CallLog::default()),
            &config,
            Arc::new(MockProvider::new(Time::ZERO)),
            shutdown.clone(),
        );

        assert!(!context.settings().snapshot().fragment_cache_enabled);
        assert_eq!(context.cache().idle_expiry(), Duration::from_secs(30));
        shutdown.cancel();
    }
}
