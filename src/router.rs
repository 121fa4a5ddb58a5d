//! Specialist dispatch: maps an [`Intent`] to specialist calls and returns
//! their results in the fixed documentation, framework, code order.

use std::future::Future;

use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::intent::Intent;
use crate::specialists::{
    CodeGenerator, DocumentationSpecialist, FrameworkSpecialist, SpecialistId, SpecialistResult,
    SpecialistRun,
};

/// Absolute end of a query's time budget
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    pub at: Instant,
    pub budget_ms: u64,
}

impl Deadline {
    pub fn after_ms(budget_ms: u64) -> Self {
        Self {
            at: Instant::now() + Duration::from_millis(budget_ms),
            budget_ms,
        }
    }
}

pub struct Dispatcher {
    docs: DocumentationSpecialist,
    frameworks: FrameworkSpecialist,
    code: CodeGenerator,
    parallel: bool,
}

impl Dispatcher {
    pub fn new(
        docs: DocumentationSpecialist,
        frameworks: FrameworkSpecialist,
        code: CodeGenerator,
    ) -> Self {
        Self {
            docs,
            frameworks,
            code,
            parallel: true,
        }
    }

    /// Run documentation and framework lookups concurrently (default) or one
    /// after the other
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Invoke every specialist the intent asks for. One specialist failing or
    /// timing out never stops the others. Results are always ordered
    /// documentation, framework, code regardless of completion order.
    pub async fn dispatch(
        &self,
        query: &str,
        intent: &Intent,
        deadline: Option<Deadline>,
    ) -> Vec<SpecialistResult> {
        if intent.is_empty() {
            debug!("No specialist flag set; asking for clarification");
            return vec![SpecialistResult::clarification()];
        }

        let framework = intent.framework();
        let docs = async {
            if intent.needs_documentation {
                Some(bounded(deadline, SpecialistId::Documentation, self.docs.query(query)).await)
            } else {
                None
            }
        };
        let web = async {
            if intent.needs_framework {
                Some(
                    bounded(
                        deadline,
                        SpecialistId::Framework(framework),
                        self.frameworks.query(framework, query),
                    )
                    .await,
                )
            } else {
                None
            }
        };

        let (docs_run, framework_run) = if self.parallel {
            tokio::join!(docs, web)
        } else {
            let d = docs.await;
            (d, web.await)
        };

        let code_result = if intent.needs_code {
            let doc_context = docs_run.as_ref().and_then(|r| r.context.as_deref());
            let framework_context = framework_run.as_ref().and_then(|r| r.context.as_deref());
            let run = bounded(deadline, SpecialistId::CodeGenerator, async {
                SpecialistRun::without_context(
                    self.code
                        .generate(query, doc_context, framework_context)
                        .await,
                )
            })
            .await;
            Some(run.result)
        } else {
            None
        };

        [docs_run.map(|r| r.result), framework_run.map(|r| r.result), code_result]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Await `fut` unless the deadline passes first, in which case the specialist
/// is reported as timed out
async fn bounded<F>(deadline: Option<Deadline>, id: SpecialistId, fut: F) -> SpecialistRun
where
    F: Future<Output = SpecialistRun>,
{
    let Some(deadline) = deadline else {
        return fut.await;
    };
    match tokio::time::timeout_at(deadline.at, fut).await {
        Ok(run) => run,
        Err(_) => {
            warn!(
                "{} did not finish within {} ms",
                id.agent_name(),
                deadline.budget_ms
            );
            SpecialistRun::without_context(SpecialistResult::timed_out(id, deadline.budget_ms))
        }
    }
}
