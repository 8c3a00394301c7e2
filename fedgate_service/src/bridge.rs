//! Row transfer between connectors and the query engine.
use std::sync::Arc;

use fedgate_connector::{Accessor, AccessorFactory, Resolver, ResolverFactory};
use fedgate_retry::FaultTolerantExecutor;
use fedgate_types::{DynError, OneField, RequestDescriptor};
use tracing::debug;

use crate::Result;

/// A row pipeline bound to one request.
pub trait Bridge: std::fmt::Debug + Send {
    /// Open the connector. Returns `false` if there is nothing to transfer.
    fn begin_iteration(&mut self) -> Result<bool>;

    /// Close the connector.
    fn end_iteration(&mut self) -> Result<()>;
}

/// Connector pair shared by both bridges.
#[derive(Debug)]
struct BridgeConnectors {
    descriptor: Arc<RequestDescriptor>,
    accessor_factory: Arc<dyn AccessorFactory>,
    accessor: Box<dyn Accessor>,
    resolver: Box<dyn Resolver>,
    executor: FaultTolerantExecutor,
}

impl BridgeConnectors {
    fn new(
        descriptor: Arc<RequestDescriptor>,
        accessor_factory: Arc<dyn AccessorFactory>,
        resolver_factory: &dyn ResolverFactory,
        executor: FaultTolerantExecutor,
    ) -> Result<Self> {
        let accessor = accessor_factory.accessor(&descriptor)?;
        let resolver = resolver_factory.resolver(&descriptor)?;

        Ok(Self {
            descriptor,
            accessor_factory,
            accessor,
            resolver,
            executor,
        })
    }

    /// Run `open` on the accessor, replacing the accessor with a new one before every retry.
    ///
    /// An accessor whose open failed is in an unknown state and is never opened again.
    fn open<F>(&mut self, label: &str, mut open: F) -> Result<bool>
    where
        F: FnMut(&mut dyn Accessor) -> Result<bool, DynError>,
    {
        let config = self.accessor.configuration().clone();
        let accessor_factory = &self.accessor_factory;
        let descriptor = &self.descriptor;

        let opened = self.executor.execute_stateful(
            &config,
            label,
            &mut self.accessor,
            |accessor: &mut Box<dyn Accessor>| -> Result<bool> { Ok(open(accessor.as_mut())?) },
            |accessor| {
                debug!(
                    transaction_id = descriptor.transaction_id(),
                    segment_id = descriptor.segment_id(),
                    "replacing accessor before retry",
                );
                *accessor = accessor_factory.accessor(descriptor)?;
                Ok(())
            },
        )?;

        debug!(
            transaction_id = self.descriptor.transaction_id(),
            segment_id = self.descriptor.segment_id(),
            data_source = self.descriptor.data_source(),
            label,
            opened,
            "accessor opened",
        );
        Ok(opened)
    }
}

/// Reads rows from an accessor and resolves them into fields.
#[derive(Debug)]
pub struct ReadBridge {
    connectors: BridgeConnectors,
}

impl ReadBridge {
    /// Create the accessor and resolver for `descriptor`.
    pub fn new(
        descriptor: Arc<RequestDescriptor>,
        accessor_factory: Arc<dyn AccessorFactory>,
        resolver_factory: &dyn ResolverFactory,
        executor: FaultTolerantExecutor,
    ) -> Result<Self> {
        Ok(Self {
            connectors: BridgeConnectors::new(
                descriptor,
                accessor_factory,
                resolver_factory,
                executor,
            )?,
        })
    }

    /// Fields of the next row, or `None` at end of data.
    ///
    /// Not retried: only opening the accessor is.
    pub fn get_next(&mut self) -> Result<Option<Vec<OneField>>> {
        let Some(row) = self.connectors.accessor.read_next()? else {
            return Ok(None);
        };
        Ok(Some(self.connectors.resolver.get_fields(&row)?))
    }
}

impl Bridge for ReadBridge {
    fn begin_iteration(&mut self) -> Result<bool> {
        self.connectors
            .open("open for read", |accessor| accessor.open_for_read())
    }

    fn end_iteration(&mut self) -> Result<()> {
        Ok(self.connectors.accessor.close_for_read()?)
    }
}

/// Turns fields into rows with a resolver and writes them with an accessor.
#[derive(Debug)]
pub struct WriteBridge {
    connectors: BridgeConnectors,
}

impl WriteBridge {
    /// Create the accessor and resolver for `descriptor`.
    pub fn new(
        descriptor: Arc<RequestDescriptor>,
        accessor_factory: Arc<dyn AccessorFactory>,
        resolver_factory: &dyn ResolverFactory,
        executor: FaultTolerantExecutor,
    ) -> Result<Self> {
        Ok(Self {
            connectors: BridgeConnectors::new(
                descriptor,
                accessor_factory,
                resolver_factory,
                executor,
            )?,
        })
    }

    /// Write one row. Returns `false` if the accessor rejected it.
    pub fn set_next(&mut self, fields: &[OneField]) -> Result<bool> {
        let row = self.connectors.resolver.set_fields(fields)?;
        Ok(self.connectors.accessor.write_next(row)?)
    }
}

impl Bridge for WriteBridge {
    fn begin_iteration(&mut self) -> Result<bool> {
        self.connectors
            .open("open for write", |accessor| accessor.open_for_write())
    }

    fn end_iteration(&mut self) -> Result<()> {
        Ok(self.connectors.accessor.close_for_write()?)
    }
}

#[cfg(test)]
mod tests {
    use fedgate_connector::{
        UnsupportedOperation,
        testing::{CallLog, ScriptedFactory, TestAccessor, TestResolver},
    };
    use fedgate_retry::{AUTHENTICATION_KEY, MAX_RETRIES_KEY};
    use fedgate_types::{Configuration, DataType, ErrorChainExt, FieldValue, OneRow};

    use super::*;

    struct TestSetup {
        log: CallLog,
        accessors: Arc<ScriptedFactory<dyn Accessor>>,
        resolvers: ScriptedFactory<dyn Resolver>,
        descriptor: Arc<RequestDescriptor>,
    }

    impl TestSetup {
        fn new() -> Self {
            let log = CallLog::default();
            let resolvers: ScriptedFactory<dyn Resolver> =
                ScriptedFactory::new("resolvers", log.clone());
            resolvers.push(Box::new(TestResolver::new("resolver", log.clone())));

            Self {
                accessors: Arc::new(ScriptedFactory::new("accessors", log.clone())),
                resolvers,
                log,
                descriptor: Arc::new(
                    RequestDescriptor::builder("XID-XYZ-123456")
                        .data_source("foo.bar")
                        .accessor("test")
                        .resolver("test")
                        .build(),
                ),
            }
        }

        fn accessor(&self, name: &str) -> TestAccessor {
            TestAccessor::new(name, self.log.clone())
        }

        fn push(&self, accessor: TestAccessor) {
            self.accessors.push(Box::new(accessor));
        }

        fn read_bridge(&self) -> ReadBridge {
            ReadBridge::new(
                Arc::clone(&self.descriptor),
                Arc::clone(&self.accessors) as Arc<dyn AccessorFactory>,
                &self.resolvers,
                FaultTolerantExecutor::new(),
            )
            .unwrap()
        }

        fn write_bridge(&self) -> WriteBridge {
            WriteBridge::new(
                Arc::clone(&self.descriptor),
                Arc::clone(&self.accessors) as Arc<dyn AccessorFactory>,
                &self.resolvers,
                FaultTolerantExecutor::new(),
            )
            .unwrap()
        }

        fn opens(&self) -> Vec<String> {
            self.log
                .events()
                .into_iter()
                .filter(|e| e.contains(".open_for_"))
                .collect()
        }
    }

    fn secure() -> Configuration {
        Configuration::new().with(AUTHENTICATION_KEY, "kerberos")
    }

    fn text_row(values: &[&str]) -> OneRow {
        OneRow::new(values.iter().map(|v| v.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn reads_and_resolves_rows() {
        let setup = TestSetup::new();
        setup.push(
            setup
                .accessor("a1")
                .with_rows([text_row(&["1", "one"]), text_row(&["2", "two"])]),
        );

        let mut bridge = setup.read_bridge();
        assert!(bridge.begin_iteration().unwrap());

        let fields = bridge.get_next().unwrap().unwrap();
        assert_eq!(
            fields,
            [
                OneField::new(DataType::Text, FieldValue::Text("1".to_owned())),
                OneField::new(DataType::Text, FieldValue::Text("one".to_owned())),
            ]
        );
        assert!(bridge.get_next().unwrap().is_some());
        assert!(bridge.get_next().unwrap().is_none());
        bridge.end_iteration().unwrap();

        assert_eq!(setup.log.count("a1.close_for_read"), 1);
        assert_eq!(setup.log.count("resolver.get_fields"), 2);
    }

    #[test]
    fn non_transient_open_failure_is_not_retried() {
        let setup = TestSetup::new();
        setup.push(
            setup
                .accessor("a1")
                .with_config(secure())
                .failing_open("Something Else"),
        );

        let mut bridge = setup.read_bridge();
        let err = bridge.begin_iteration().unwrap_err();

        assert_eq!(err.to_string(), "Something Else");
        assert!(
            err.error_chain()
                .any(|e| e.downcast_ref::<std::io::Error>().is_some())
        );
        assert_eq!(setup.accessors.calls(), 1);
        assert_eq!(setup.opens(), ["a1.open_for_read"]);
    }

    #[test_log::test]
    fn transient_open_failure_retried_once() {
        let setup = TestSetup::new();
        setup.push(
            setup
                .accessor("a1")
                .with_config(secure())
                .failing_open("GSS initiate failed"),
        );
        setup.push(setup.accessor("a2"));

        let mut bridge = setup.read_bridge();
        assert!(bridge.begin_iteration().unwrap());

        assert_eq!(setup.accessors.calls(), 2);
        assert_eq!(setup.opens(), ["a1.open_for_read", "a2.open_for_read"]);
    }

    #[test_log::test]
    fn transient_open_failure_retried_twice() {
        let setup = TestSetup::new();
        setup.push(
            setup
                .accessor("a1")
                .with_config(secure())
                .failing_open("GSS initiate failed"),
        );
        setup.push(setup.accessor("a2").failing_open("GSS initiate failed"));
        setup.push(setup.accessor("a3"));

        let mut bridge = setup.read_bridge();
        assert!(bridge.begin_iteration().unwrap());

        assert_eq!(setup.accessors.calls(), 3);
        assert_eq!(
            setup.opens(),
            ["a1.open_for_read", "a2.open_for_read", "a3.open_for_read"]
        );

        // rows come from the accessor that opened
        bridge.get_next().unwrap();
        assert_eq!(setup.log.count("a3.read_next"), 1);
    }

    #[test_log::test]
    fn retries_exhausted() {
        let setup = TestSetup::new();
        setup.push(
            setup
                .accessor("a1")
                .with_config(secure().with(MAX_RETRIES_KEY, "1"))
                .failing_open("GSS initiate failed"),
        );
        setup.push(setup.accessor("a2").failing_open("GSS initiate failed"));

        let err = setup.read_bridge().begin_iteration().unwrap_err();

        assert_eq!(err.to_string(), "GSS initiate failed");
        assert_eq!(setup.opens(), ["a1.open_for_read", "a2.open_for_read"]);
    }

    #[test]
    fn not_retried_without_kerberos() {
        let setup = TestSetup::new();
        setup.push(setup.accessor("a1").failing_open("GSS initiate failed"));

        setup.read_bridge().begin_iteration().unwrap_err();

        assert_eq!(setup.accessors.calls(), 1);
    }

    #[test]
    fn writes_rows() {
        let setup = TestSetup::new();
        let accessor = setup.accessor("a1");
        let written = accessor.written();
        setup.push(accessor);

        let mut bridge = setup.write_bridge();
        assert!(bridge.begin_iteration().unwrap());
        assert!(
            bridge
                .set_next(&[
                    OneField::new(DataType::Int8, FieldValue::Int(7)),
                    OneField::null(DataType::Text),
                ])
                .unwrap()
        );
        bridge.end_iteration().unwrap();

        let written = written.lock();
        assert_eq!(written.len(), 1);
        assert_eq!(
            written[0].data::<Vec<FieldValue>>().unwrap(),
            &[FieldValue::Int(7), FieldValue::Null]
        );
        assert_eq!(setup.log.count("a1.close_for_write"), 1);
    }

    #[test]
    fn write_open_is_retried() {
        let setup = TestSetup::new();
        setup.push(
            setup
                .accessor("a1")
                .with_config(secure())
                .failing_open("GSS initiate failed"),
        );
        setup.push(setup.accessor("a2"));

        let mut bridge = setup.write_bridge();
        assert!(bridge.begin_iteration().unwrap());

        assert_eq!(setup.opens(), ["a1.open_for_write", "a2.open_for_write"]);
    }

    #[derive(Debug)]
    struct ReadOnlyAccessor {
        config: Configuration,
    }

    impl fedgate_connector::Plugin for ReadOnlyAccessor {
        fn initialize(&mut self, _descriptor: Arc<RequestDescriptor>) -> Result<(), DynError> {
            Ok(())
        }

        fn configuration(&self) -> &Configuration {
            &self.config
        }
    }

    impl Accessor for ReadOnlyAccessor {
        fn open_for_read(&mut self) -> Result<bool, DynError> {
            Ok(true)
        }

        fn read_next(&mut self) -> Result<Option<OneRow>, DynError> {
            Ok(None)
        }

        fn close_for_read(&mut self) -> Result<(), DynError> {
            Ok(())
        }
    }

    #[test]
    fn write_unsupported_by_connector() {
        let setup = TestSetup::new();
        setup.accessors.push(Box::new(ReadOnlyAccessor {
            config: secure(),
        }));

        let err = setup.write_bridge().begin_iteration().unwrap_err();

        assert!(
            err.error_chain()
                .any(|e| e.downcast_ref::<UnsupportedOperation>().is_some())
        );
        assert_eq!(setup.accessors.calls(), 1);
    }

    #[test]
    fn bridges_are_object_safe() {
        let setup = TestSetup::new();
        setup.push(setup.accessor("a1"));

        let mut bridge: Box<dyn Bridge> = Box::new(setup.read_bridge());
        assert!(bridge.begin_iteration().unwrap());
        bridge.end_iteration().unwrap();
    }
}
