//! On-demand status reads, independent of the streaming observer.

use std::sync::{Arc, Mutex};

use helm_api::{ApiError, RunStatusReport, RunsClient, TokenProvider};

#[derive(Debug, Default)]
struct QueryState {
    data: Option<RunStatusReport>,
    is_loading: bool,
    error: Option<String>,
}

/// Caches the latest status report for one run and refetches on demand.
pub struct RunStatusQuery {
    runs: RunsClient,
    tokens: Arc<dyn TokenProvider>,
    run_id: String,
    state: Mutex<QueryState>,
}

impl RunStatusQuery {
    pub fn new(runs: RunsClient, tokens: Arc<dyn TokenProvider>, run_id: impl Into<String>) -> Self {
        Self {
            runs,
            tokens,
            run_id: run_id.into(),
            state: Mutex::new(QueryState::default()),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Latest cached report, if any fetch has succeeded.
    pub fn data(&self) -> Option<RunStatusReport> {
        self.state
            .lock()
            .expect("status query lock poisoned")
            .data
            .clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state
            .lock()
            .expect("status query lock poisoned")
            .is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.state
            .lock()
            .expect("status query lock poisoned")
            .error
            .clone()
    }

    pub async fn refetch(&self) -> Result<RunStatusReport, ApiError> {
        {
            let mut state = self.state.lock().expect("status query lock poisoned");
            state.is_loading = true;
        }

        let result = async {
            let token = self.tokens.bearer_token().await?;
            self.runs.fetch_status(&self.run_id, &token).await
        }
        .await;

        let mut state = self.state.lock().expect("status query lock poisoned");
        state.is_loading = false;
        match &result {
            Ok(report) => {
                state.data = Some(report.clone());
                state.error = None;
            }
            Err(error) => {
                state.error = Some(error.to_string());
            }
        }
        result
    }
}
