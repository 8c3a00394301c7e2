use std::{collections::HashMap, sync::Arc};

use fedgate_types::RequestDescriptor;
use tracing::debug;

use crate::{
    Accessor, AccessorFactory, ConnectorKind, FactoryError, Fragmenter, FragmenterFactory, Plugin,
    Resolver, ResolverFactory,
};

type Constructor<T> = Arc<dyn Fn() -> Box<T> + Send + Sync>;

/// Maps connector names to constructors.
///
/// Populated once at startup and then shared read-only; it implements all three factory traits
/// by constructing a fresh instance and [initializing](Plugin::initialize) it for the request.
#[derive(Default, Clone)]
pub struct ConnectorRegistry {
    accessors: HashMap<String, Constructor<dyn Accessor>>,
    resolvers: HashMap<String, Constructor<dyn Resolver>>,
    fragmenters: HashMap<String, Constructor<dyn Fragmenter>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an accessor constructor, replacing any previous one with the same name.
    pub fn register_accessor<F, A>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: Accessor + 'static,
    {
        self.accessors.insert(
            name.into(),
            Arc::new(move || Box::new(constructor()) as Box<dyn Accessor>),
        );
    }

    pub fn register_resolver<F, R>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: Resolver + 'static,
    {
        self.resolvers.insert(
            name.into(),
            Arc::new(move || Box::new(constructor()) as Box<dyn Resolver>),
        );
    }

    pub fn register_fragmenter<F, G>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> G + Send + Sync + 'static,
        G: Fragmenter + 'static,
    {
        self.fragmenters.insert(
            name.into(),
            Arc::new(move || Box::new(constructor()) as Box<dyn Fragmenter>),
        );
    }

    pub fn with_accessor<F, A>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: Accessor + 'static,
    {
        self.register_accessor(name, constructor);
        self
    }

    pub fn with_resolver<F, R>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: Resolver + 'static,
    {
        self.register_resolver(name, constructor);
        self
    }

    pub fn with_fragmenter<F, G>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> G + Send + Sync + 'static,
        G: Fragmenter + 'static,
    {
        self.register_fragmenter(name, constructor);
        self
    }
}

fn instantiate<T>(
    constructors: &HashMap<String, Constructor<T>>,
    kind: ConnectorKind,
    name: &str,
    descriptor: &Arc<RequestDescriptor>,
) -> Result<Box<T>, FactoryError>
where
    T: Plugin + ?Sized,
{
    let constructor = constructors
        .get(name)
        .ok_or_else(|| FactoryError::UnknownConnector {
            kind,
            name: name.to_owned(),
        })?;

    let mut plugin = constructor();
    plugin
        .initialize(Arc::clone(descriptor))
        .map_err(|source| FactoryError::Initialize {
            kind,
            name: name.to_owned(),
            source,
        })?;

    debug!(
        %kind,
        name,
        transaction_id = descriptor.transaction_id(),
        segment_id = descriptor.segment_id(),
        "created connector instance"
    );
    Ok(plugin)
}

impl AccessorFactory for ConnectorRegistry {
    fn accessor(
        &self,
        descriptor: &Arc<RequestDescriptor>,
    ) -> Result<Box<dyn Accessor>, FactoryError> {
        instantiate(
            &self.accessors,
            ConnectorKind::Accessor,
            descriptor.accessor(),
            descriptor,
        )
    }
}

impl ResolverFactory for ConnectorRegistry {
    fn resolver(
        &self,
        descriptor: &Arc<RequestDescriptor>,
    ) -> Result<Box<dyn Resolver>, FactoryError> {
        instantiate(
            &self.resolvers,
            ConnectorKind::Resolver,
            descriptor.resolver(),
            descriptor,
        )
    }
}

impl FragmenterFactory for ConnectorRegistry {
    fn fragmenter(
        &self,
        descriptor: &Arc<RequestDescriptor>,
    ) -> Result<Box<dyn Fragmenter>, FactoryError> {
        instantiate(
            &self.fragmenters,
            ConnectorKind::Fragmenter,
            descriptor.fragmenter(),
            descriptor,
        )
    }
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut accessors: Vec<_> = self.accessors.keys().collect();
        let mut resolvers: Vec<_> = self.resolvers.keys().collect();
        let mut fragmenters: Vec<_> = self.fragmenters.keys().collect();
        accessors.sort();
        resolvers.sort();
        fragmenters.sort();

        f.debug_struct("ConnectorRegistry")
            .field("accessors", &accessors)
            .field("resolvers", &resolvers)
            .field("fragmenters", &fragmenters)
            .finish()
    }
}
