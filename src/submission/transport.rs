use std::time::Duration;

use tracing::debug;

use crate::errors::SubmissionError;

/// Delivers one serialized payload and reports the HTTP status.
pub trait SubmissionTransport: Send + Sync {
    fn post(&self, body: &str) -> Result<u16, SubmissionError>;
}

/// JSON `POST` to a fixed endpoint.
#[derive(Debug)]
pub struct HttpTransport {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .build();
        Self {
            endpoint: endpoint.into(),
            agent,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SubmissionTransport for HttpTransport {
    fn post(&self, body: &str) -> Result<u16, SubmissionError> {
        debug!(endpoint = %self.endpoint, bytes = body.len(), "posting submission");
        match self
            .agent
            .post(&self.endpoint)
            .set("content-type", "application/json")
            .send_string(body)
        {
            Ok(response) if (200..=299).contains(&response.status()) => Ok(response.status()),
            Ok(response) => Err(SubmissionError::Http(response.status())),
            Err(ureq::Error::Status(code, _)) => Err(SubmissionError::Http(code)),
            Err(ureq::Error::Transport(transport)) => Err(classify_transport(&transport)),
        }
    }
}

fn classify_transport(transport: &ureq::Transport) -> SubmissionError {
    let detail = transport.to_string();
    let lower = format!("{:?} {}", transport.kind(), detail).to_ascii_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        SubmissionError::Timeout
    } else {
        SubmissionError::Transport(detail)
    }
}
