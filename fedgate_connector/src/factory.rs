use std::sync::Arc;

use fedgate_types::{DynError, RequestDescriptor};

use crate::{Accessor, Fragmenter, Resolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorKind {
    Accessor,
    Resolver,
    Fragmenter,
}

impl std::fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accessor => write!(f, "accessor"),
            Self::Resolver => write!(f, "resolver"),
            Self::Fragmenter => write!(f, "fragmenter"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("no {kind} connector registered under name '{name}'")]
    UnknownConnector { kind: ConnectorKind, name: String },
    #[error("failed to initialize {kind} connector '{name}'")]
    Initialize {
        kind: ConnectorKind,
        name: String,
        #[source]
        source: DynError,
    },
}

/// Produces [`Accessor`]s bound to a request.
///
/// Every call returns a brand-new, initialized instance; callers rely on that to discard an
/// instance whose state is unknown after a failure.
pub trait AccessorFactory: std::fmt::Debug + Send + Sync {
    fn accessor(
        &self,
        descriptor: &Arc<RequestDescriptor>,
    ) -> Result<Box<dyn Accessor>, FactoryError>;
}

/// Produces [`Resolver`]s bound to a request.
pub trait ResolverFactory: std::fmt::Debug + Send + Sync {
    fn resolver(
        &self,
        descriptor: &Arc<RequestDescriptor>,
    ) -> Result<Box<dyn Resolver>, FactoryError>;
}

/// Produces [`Fragmenter`]s bound to a request. Same freshness guarantee as [`AccessorFactory`].
pub trait FragmenterFactory: std::fmt::Debug + Send + Sync {
    fn fragmenter(
        &self,
        descriptor: &Arc<RequestDescriptor>,
    ) -> Result<Box<dyn Fragmenter>, FactoryError>;
}
