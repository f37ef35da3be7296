use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::Deserialize;
use tokio::runtime::Handle;
use tracing::debug;
use visual_suite_retriever::{DynRetriever, RetrieveContext};
use visual_suite_types::{RetrievalError, SuiteImage};

type SharedRetrieval = Shared<BoxFuture<'static, Result<SuiteImage, RetrievalError>>>;

/// Identifier of one sample image, as written in the suite document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SampleDescriptor {
    source: String,
}

impl SampleDescriptor {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Last path or URL segment of the source.
    pub fn file_name(&self) -> &str {
        let trimmed = self.source.trim_end_matches(['/', '\\']);
        trimmed
            .rsplit(['/', '\\'])
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or(trimmed)
    }

    /// File name with its extension removed.
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        Path::new(name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(name)
    }
}

/// Retrieval of one sample image that runs at most once.
///
/// The retrieval is wrapped in a shared future: `start` spawns it onto the
/// runtime, and every `result` call awaits the same outcome. A failure is
/// final; building a new task is the only way to retry.
///
/// The runtime current at construction is remembered, so `start` may be
/// called from threads outside it. Without any runtime the task stays lazy
/// and the first `result` call performs the retrieval.
pub struct SampleTask {
    descriptor: SampleDescriptor,
    started: AtomicBool,
    runtime: Option<Handle>,
    retrieval: SharedRetrieval,
}

impl SampleTask {
    pub fn new(
        descriptor: SampleDescriptor,
        retriever: DynRetriever,
        context: RetrieveContext,
    ) -> Self {
        let source = descriptor.source().to_string();
        let runtime = Handle::try_current().ok();
        let fallback = runtime.clone();
        let retrieval = async move {
            let Some(handle) = Handle::try_current().ok().or(fallback) else {
                return retriever.retrieve(&source, &context);
            };
            let source_id = source.clone();
            match handle
                .spawn_blocking(move || retriever.retrieve(&source, &context))
                .await
            {
                Ok(outcome) => outcome,
                Err(err) => Err(RetrievalError::interrupted(source_id, err.to_string())),
            }
        }
        .boxed()
        .shared();

        Self {
            descriptor,
            started: AtomicBool::new(false),
            runtime,
            retrieval,
        }
    }

    pub fn descriptor(&self) -> &SampleDescriptor {
        &self.descriptor
    }

    /// Spawns the retrieval on the current runtime, or on the one the task
    /// was built in. Calls after the first return `false` and do nothing.
    pub fn start(&self) -> bool {
        if self.started.swap(true, Ordering::AcqRel) {
            return false;
        }
        let Some(handle) = Handle::try_current().ok().or_else(|| self.runtime.clone()) else {
            debug!(
                sample = self.descriptor.source(),
                "no runtime available; retrieval deferred to first result"
            );
            return true;
        };
        debug!(sample = self.descriptor.source(), "starting sample retrieval");
        let retrieval = self.retrieval.clone();
        handle.spawn(async move {
            let _ = retrieval.await;
        });
        true
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.retrieval.peek().is_some()
    }

    /// Waits for the retrieval and returns its outcome. Waiting on a task that
    /// was never started drives the retrieval from the caller.
    pub async fn result(&self) -> Result<SuiteImage, RetrievalError> {
        self.retrieval.clone().await
    }
}
