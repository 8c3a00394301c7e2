use std::sync::Arc;

use fedgate_cache::{CacheKey, FragmentCache};
use fedgate_connector::{Fragmenter, FragmenterFactory};
use fedgate_retry::FaultTolerantExecutor;
use fedgate_types::{Fragment, FragmentList, FragmentsResponse, RequestDescriptor};
use tracing::{Level, debug};

use crate::{FragmentIndexer, Result, ServiceSettings};

/// Lists the fragments of a data source for one segment of a query.
///
/// With the fragment cache enabled, all segments of a query asking for the same data source
/// and filter share one listing: the first caller runs it, everybody else (including callers
/// arriving while it runs) gets the same list.
#[derive(Debug)]
pub struct FragmentResource {
    fragmenter_factory: Arc<dyn FragmenterFactory>,
    cache: Arc<FragmentCache>,
    executor: FaultTolerantExecutor,
    settings: Arc<ServiceSettings>,
}

impl FragmentResource {
    pub fn new(
        fragmenter_factory: Arc<dyn FragmenterFactory>,
        cache: Arc<FragmentCache>,
        executor: FaultTolerantExecutor,
        settings: Arc<ServiceSettings>,
    ) -> Self {
        Self {
            fragmenter_factory,
            cache,
            executor,
            settings,
        }
    }

    pub fn get_fragments(&self, descriptor: &Arc<RequestDescriptor>) -> Result<FragmentsResponse> {
        let settings = self.settings.snapshot();

        let fragments = if settings.fragment_cache_enabled {
            let key = CacheKey::from(descriptor.as_ref());
            self.cache
                .get_or_try_insert_with(key, || self.list_fragments(descriptor))?
        } else {
            self.list_fragments(descriptor)?
        };

        Ok(FragmentsResponse::new(fragments))
    }

    /// Run the fragmenter and normalize its result.
    fn list_fragments(&self, descriptor: &Arc<RequestDescriptor>) -> Result<FragmentList> {
        debug!(
            transaction_id = descriptor.transaction_id(),
            segment_id = descriptor.segment_id(),
            data_source = descriptor.data_source(),
            "listing fragments",
        );

        let mut fragmenter = self.fragmenter_factory.fragmenter(descriptor)?;
        let config = fragmenter.configuration().clone();

        let mut fragments = self.executor.execute_stateful(
            &config,
            "get fragments",
            &mut fragmenter,
            |fragmenter: &mut Box<dyn Fragmenter>| -> Result<_> {
                Ok(fragmenter.get_fragments()?)
            },
            |fragmenter| {
                *fragmenter = self.fragmenter_factory.fragmenter(descriptor)?;
                Ok(())
            },
        )?;

        log_fragment_list("fragments before normalization", &fragments, descriptor);
        FragmentIndexer::normalize(&mut fragments);
        log_fragment_list("fragments after normalization", &fragments, descriptor);

        Ok(Arc::new(fragments))
    }
}

fn log_fragment_list(stage: &str, fragments: &[Fragment], descriptor: &RequestDescriptor) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }

    debug!(
        data_source = descriptor.data_source(),
        "{stage}: list of {} fragments",
        fragments.len()
    );
    for (n, fragment) in fragments.iter().enumerate() {
        let mut line = format!(
            "Fragment #{}: [Source: {}, Index: {}, Replicas: {}",
            n + 1,
            fragment.source_name(),
            fragment.index(),
            fragment.replicas().join(" "),
        );
        if let Some(metadata) = fragment.metadata() {
            line.push_str(&format!(", Metadata: {}", String::from_utf8_lossy(metadata)));
        }
        if let Some(user_data) = fragment.user_data() {
            line.push_str(&format!(", User Data: {}", String::from_utf8_lossy(user_data)));
        }
        line.push(']');
        debug!("{line}");
    }
}
