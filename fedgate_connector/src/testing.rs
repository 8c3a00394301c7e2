//! Scripted connectors and factories for tests.
//!
//! Every fake records what happens to it in a shared [`CallLog`], so tests can assert both how
//! often and in which order instances were created and used.
use std::{
    collections::VecDeque,
    io,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use fedgate_types::{
    Configuration, DataType, DynError, FieldValue, Fragment, OneField, OneRow, RequestDescriptor,
};
use parking_lot::Mutex;

use crate::{
    Accessor, AccessorFactory, ConnectorKind, FactoryError, Fragmenter, FragmenterFactory, Plugin,
    Resolver, ResolverFactory,
};

/// Ordered record of connector and factory calls, shared between fakes.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Number of recorded events equal to `event`.
    pub fn count(&self, event: &str) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }
}

/// A connector failure as an I/O error with the given message, the way storage clients
/// usually report renegotiation problems.
pub fn io_failure(message: &str) -> DynError {
    DynError::from(io::Error::other(message.to_owned()))
}

/// Accessor whose open outcome is fixed at construction.
#[derive(Debug)]
pub struct TestAccessor {
    name: String,
    log: CallLog,
    config: Configuration,
    open_failure: Option<String>,
    rows: VecDeque<OneRow>,
    written: Arc<Mutex<Vec<OneRow>>>,
}

impl TestAccessor {
    pub fn new(name: impl Into<String>, log: CallLog) -> Self {
        Self {
            name: name.into(),
            log,
            config: Configuration::default(),
            open_failure: None,
            rows: VecDeque::new(),
            written: Default::default(),
        }
    }

    pub fn with_config(mut self, config: Configuration) -> Self {
        self.config = config;
        self
    }

    /// Every open (read or write) fails with an I/O error carrying `message`.
    pub fn failing_open(mut self, message: impl Into<String>) -> Self {
        self.open_failure = Some(message.into());
        self
    }

    pub fn with_rows(mut self, rows: impl IntoIterator<Item = OneRow>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Handle to the rows written to this accessor.
    pub fn written(&self) -> Arc<Mutex<Vec<OneRow>>> {
        Arc::clone(&self.written)
    }

    fn open(&self, op: &str) -> Result<bool, DynError> {
        self.log.record(format!("{}.{op}", self.name));
        match &self.open_failure {
            Some(message) => Err(io_failure(message)),
            None => Ok(true),
        }
    }
}

impl Plugin for TestAccessor {
    fn initialize(&mut self, _descriptor: Arc<RequestDescriptor>) -> Result<(), DynError> {
        self.log.record(format!("{}.initialize", self.name));
        Ok(())
    }

    fn configuration(&self) -> &Configuration {
        &self.config
    }
}

impl Accessor for TestAccessor {
    fn open_for_read(&mut self) -> Result<bool, DynError> {
        self.open("open_for_read")
    }

    fn read_next(&mut self) -> Result<Option<OneRow>, DynError> {
        self.log.record(format!("{}.read_next", self.name));
        Ok(self.rows.pop_front())
    }

    fn close_for_read(&mut self) -> Result<(), DynError> {
        self.log.record(format!("{}.close_for_read", self.name));
        Ok(())
    }

    fn open_for_write(&mut self) -> Result<bool, DynError> {
        self.open("open_for_write")
    }

    fn write_next(&mut self, row: OneRow) -> Result<bool, DynError> {
        self.log.record(format!("{}.write_next", self.name));
        self.written.lock().push(row);
        Ok(true)
    }

    fn close_for_write(&mut self) -> Result<(), DynError> {
        self.log.record(format!("{}.close_for_write", self.name));
        Ok(())
    }
}

/// Resolver for rows whose payload is a `Vec<String>`; every value becomes a text field.
///
/// [`set_fields`](Resolver::set_fields) does the reverse and produces a `Vec<FieldValue>` row.
#[derive(Debug)]
pub struct TestResolver {
    name: String,
    log: CallLog,
    config: Configuration,
}

impl TestResolver {
    pub fn new(name: impl Into<String>, log: CallLog) -> Self {
        Self {
            name: name.into(),
            log,
            config: Configuration::default(),
        }
    }
}

impl Plugin for TestResolver {
    fn initialize(&mut self, _descriptor: Arc<RequestDescriptor>) -> Result<(), DynError> {
        self.log.record(format!("{}.initialize", self.name));
        Ok(())
    }

    fn configuration(&self) -> &Configuration {
        &self.config
    }
}

impl Resolver for TestResolver {
    fn get_fields(&mut self, row: &OneRow) -> Result<Vec<OneField>, DynError> {
        self.log.record(format!("{}.get_fields", self.name));
        let values = row
            .data::<Vec<String>>()
            .ok_or_else(|| DynError::from("row payload is not a list of strings"))?;
        Ok(values
            .iter()
            .map(|v| OneField::new(DataType::Text, FieldValue::Text(v.clone())))
            .collect())
    }

    fn set_fields(&mut self, fields: &[OneField]) -> Result<OneRow, DynError> {
        self.log.record(format!("{}.set_fields", self.name));
        Ok(OneRow::new(
            fields.iter().map(|f| f.value.clone()).collect::<Vec<_>>(),
        ))
    }
}

/// Fragmenter that either always returns the same fragments or always fails.
#[derive(Debug)]
pub struct TestFragmenter {
    name: String,
    log: CallLog,
    config: Configuration,
    outcome: Result<Vec<Fragment>, String>,
    initialize_failure: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl TestFragmenter {
    pub fn returning(name: impl Into<String>, log: CallLog, fragments: Vec<Fragment>) -> Self {
        Self::with_outcome(name, log, Ok(fragments))
    }

    /// Every listing fails with an I/O error carrying `message`.
    pub fn failing(name: impl Into<String>, log: CallLog, message: impl Into<String>) -> Self {
        Self::with_outcome(name, log, Err(message.into()))
    }

    fn with_outcome(
        name: impl Into<String>,
        log: CallLog,
        outcome: Result<Vec<Fragment>, String>,
    ) -> Self {
        Self {
            name: name.into(),
            log,
            config: Configuration::default(),
            outcome,
            initialize_failure: None,
            calls: Default::default(),
        }
    }

    pub fn with_config(mut self, config: Configuration) -> Self {
        self.config = config;
        self
    }

    pub fn failing_initialize(mut self, message: impl Into<String>) -> Self {
        self.initialize_failure = Some(message.into());
        self
    }

    /// Share the listing counter with other instances (or the test).
    pub fn with_call_counter(mut self, calls: Arc<AtomicUsize>) -> Self {
        self.calls = calls;
        self
    }
}

impl Plugin for TestFragmenter {
    fn initialize(&mut self, _descriptor: Arc<RequestDescriptor>) -> Result<(), DynError> {
        self.log.record(format!("{}.initialize", self.name));
        match &self.initialize_failure {
            Some(message) => Err(io_failure(message)),
            None => Ok(()),
        }
    }

    fn configuration(&self) -> &Configuration {
        &self.config
    }
}

impl Fragmenter for TestFragmenter {
    fn get_fragments(&mut self) -> Result<Vec<Fragment>, DynError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.record(format!("{}.get_fragments", self.name));
        match &self.outcome {
            Ok(fragments) => Ok(fragments.clone()),
            Err(message) => Err(io_failure(message)),
        }
    }
}

/// Factory that hands out pre-built instances in order, like a mock stubbed with a chain of
/// return values.
///
/// Instances are initialized on hand-out. Running out of instances is a test bug and panics;
/// instances left over when the factory is dropped fail the test as well.
#[derive(Debug)]
pub struct ScriptedFactory<T: ?Sized> {
    name: &'static str,
    log: CallLog,
    script: Mutex<VecDeque<Result<Box<T>, FactoryError>>>,
    calls: AtomicUsize,
}

impl<T: ?Sized> ScriptedFactory<T> {
    pub fn new(name: &'static str, log: CallLog) -> Self {
        Self {
            name,
            log,
            script: Default::default(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, instance: Box<T>) {
        self.script.lock().push_back(Ok(instance));
    }

    pub fn push_error(&self, error: FactoryError) {
        self.script.lock().push_back(Err(error));
    }

    pub fn with(self, instance: Box<T>) -> Self {
        self.push(instance);
        self
    }

    /// Number of instances requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(
        &self,
        kind: ConnectorKind,
        descriptor: &Arc<RequestDescriptor>,
    ) -> Result<Box<T>, FactoryError>
    where
        T: Plugin,
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.record(format!("{}.create", self.name));
        let mut instance = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| panic!("{}: no scripted instance left", self.name))?;
        instance
            .initialize(Arc::clone(descriptor))
            .map_err(|source| FactoryError::Initialize {
                kind,
                name: self.name.to_owned(),
                source,
            })?;
        Ok(instance)
    }
}

impl<T: ?Sized> Drop for ScriptedFactory<T> {
    fn drop(&mut self) {
        // prevent double-panic (i.e. aborts)
        if !std::thread::panicking() {
            assert!(
                self.script.lock().is_empty(),
                "{}: scripted instances left",
                self.name
            );
        }
    }
}

impl AccessorFactory for ScriptedFactory<dyn Accessor> {
    fn accessor(
        &self,
        descriptor: &Arc<RequestDescriptor>,
    ) -> Result<Box<dyn Accessor>, FactoryError> {
        self.next(ConnectorKind::Accessor, descriptor)
    }
}

impl ResolverFactory for ScriptedFactory<dyn Resolver> {
    fn resolver(
        &self,
        descriptor: &Arc<RequestDescriptor>,
    ) -> Result<Box<dyn Resolver>, FactoryError> {
        self.next(ConnectorKind::Resolver, descriptor)
    }
}

impl FragmenterFactory for ScriptedFactory<dyn Fragmenter> {
    fn fragmenter(
        &self,
        descriptor: &Arc<RequestDescriptor>,
    ) -> Result<Box<dyn Fragmenter>, FactoryError> {
        self.next(ConnectorKind::Fragmenter, descriptor)
    }
}
