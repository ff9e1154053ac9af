//! Protein annotation service clients.

use crate::error::{OrthoError, Result};
use std::thread;
use std::time::{Duration, Instant};

/// EBI InterProScan 5 REST endpoint.
pub const INTERPRO_URL: &str = "https://www.ebi.ac.uk/Tools/services/rest/iprscan5";

/// Raw outcome of annotating one sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Job identifier assigned by the service, if any.
    pub job_id: Option<String>,
    /// Raw result document.
    pub content: String,
}

/// A blocking request/response protein annotation service.
pub trait AnnotationService {
    /// Annotate one protein sequence and return the raw result document.
    fn annotate(&self, sequence_id: &str, sequence: &str) -> Result<Submission>;

    /// Short name for log messages.
    fn name(&self) -> &str;
}

/// InterProScan job state as reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Finished,
    Failed,
    NotFound,
}

impl JobStatus {
    /// Parse the plain-text status body.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "QUEUED" | "PENDING" => Some(Self::Queued),
            "RUNNING" => Some(Self::Running),
            "FINISHED" => Some(Self::Finished),
            "ERROR" | "FAILURE" => Some(Self::Failed),
            "NOT_FOUND" => Some(Self::NotFound),
            _ => None,
        }
    }
}

/// Client for the InterProScan 5 REST service.
///
/// Each sequence is submitted as its own job, polled until it finishes, and
/// its JSON result fetched.
pub struct InterProClient {
    agent: ureq::Agent,
    base_url: String,
    email: String,
    poll_interval: Duration,
    max_wait: Duration,
}

impl InterProClient {
    /// Create a client; the service requires a contact email address.
    pub fn new(email: &str) -> Result<Self> {
        if !email.contains('@') {
            return Err(OrthoError::InvalidArgument(format!(
                "a contact email is required by the annotation service, got '{}'",
                email
            )));
        }
        Ok(Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(120))
                .build(),
            base_url: INTERPRO_URL.to_string(),
            email: email.to_string(),
            poll_interval: Duration::from_secs(15),
            max_wait: Duration::from_secs(3600),
        })
    }

    /// Use a different service endpoint.
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Set the status polling interval and the maximum wait per job.
    pub fn with_polling(mut self, interval: Duration, max_wait: Duration) -> Self {
        self.poll_interval = interval;
        self.max_wait = max_wait;
        self
    }

    fn run(&self, sequence_id: &str, sequence: &str) -> Result<String> {
        let url = format!("{}/run", self.base_url);
        let response = self
            .agent
            .post(&url)
            .set("Accept", "text/plain")
            .send_form(&[
                ("email", self.email.as_str()),
                ("title", sequence_id),
                ("sequence", sequence),
                ("goterms", "true"),
                ("pathways", "false"),
                ("stype", "p"),
            ])
            .map_err(Box::new)?;
        let job_id = response.into_string()?.trim().to_string();
        if job_id.is_empty() {
            return Err(OrthoError::Service(format!(
                "no job identifier returned for {}",
                sequence_id
            )));
        }
        Ok(job_id)
    }

    fn status(&self, job_id: &str) -> Result<JobStatus> {
        let url = format!("{}/status/{}", self.base_url, job_id);
        let body = self
            .agent
            .get(&url)
            .set("Accept", "text/plain")
            .call()
            .map_err(Box::new)?
            .into_string()?;
        JobStatus::parse(&body)
            .ok_or_else(|| OrthoError::Service(format!("unexpected job status '{}'", body.trim())))
    }

    fn result(&self, job_id: &str) -> Result<String> {
        let url = format!("{}/result/{}/json", self.base_url, job_id);
        Ok(self.agent.get(&url).call().map_err(Box::new)?.into_string()?)
    }
}

impl AnnotationService for InterProClient {
    fn annotate(&self, sequence_id: &str, sequence: &str) -> Result<Submission> {
        let job_id = self.run(sequence_id, sequence)?;
        log::debug!("{} submitted as job {}", sequence_id, job_id);

        let start = Instant::now();
        loop {
            match self.status(&job_id)? {
                JobStatus::Finished => break,
                JobStatus::Queued | JobStatus::Running => {
                    if start.elapsed() > self.max_wait {
                        return Err(OrthoError::Service(format!(
                            "job {} for {} still running after {:?}",
                            job_id,
                            sequence_id,
                            self.max_wait
                        )));
                    }
                    thread::sleep(self.poll_interval);
                }
                JobStatus::Failed | JobStatus::NotFound => {
                    return Err(OrthoError::Service(format!(
                        "job {} for {} did not finish",
                        job_id, sequence_id
                    )))
                }
            }
        }

        let content = self.result(&job_id)?;
        Ok(Submission {
            job_id: Some(job_id),
            content,
        })
    }

    fn name(&self) -> &str {
        "InterProScan"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_parse() {
        assert_eq!(JobStatus::parse("FINISHED\n"), Some(JobStatus::Finished));
        assert_eq!(JobStatus::parse("RUNNING"), Some(JobStatus::Running));
        assert_eq!(JobStatus::parse("FAILURE"), Some(JobStatus::Failed));
        assert_eq!(JobStatus::parse("bogus"), None);
    }

    #[test]
    fn test_client_requires_email() {
        assert!(InterProClient::new("nobody").is_err());
        let client = InterProClient::new("me@example.org")
            .unwrap()
            .with_base_url("http://localhost:9/iprscan5/");
        assert_eq!(client.base_url, "http://localhost:9/iprscan5");
        assert_eq!(client.name(), "InterProScan");
    }
}
