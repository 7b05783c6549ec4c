//! REST backend for a remote LMS API.
//!
//! Every endpoint answers with a JSON envelope `{ success, data, error }`.
//! Transport failures map to [`StorageError::Connection`], non-success
//! statuses to `NotFound`, `Conflict` or `Rejected`.

use async_trait::async_trait;
use lms_core::completion::ProgressPatch;
use lms_core::model::{
    Course, CourseId, Enrollment, EnrollmentId, FinalTest, FinalTestQuery, Program, QuizAttempt,
    UserId,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::repository::{
    CourseRepository, EnrollmentRepository, FinalTestRepository, ProgramRepository,
    QuizAttemptRepository, Storage, StorageError,
};

// ─── ENVELOPE ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, StorageError> {
        if !self.success {
            return Err(StorageError::Rejected(
                self.error.unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| StorageError::Serialization("response envelope has no data".into()))
    }

    fn into_unit(self) -> Result<(), StorageError> {
        if self.success {
            Ok(())
        } else {
            Err(StorageError::Rejected(
                self.error.unwrap_or_else(|| "request failed".to_string()),
            ))
        }
    }
}

// ─── CLIENT ─────────────────────────────────────────────────────────────────

/// Repository that talks to the LMS HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRepository {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpRepository {
    /// Build a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the URL is invalid or the client
    /// cannot be built.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, StorageError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| StorageError::Connection(format!("invalid API URL {base_url}: {e}")))?;
        let client = Client::builder()
            .user_agent(concat!("lms/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn url(&self, path: &str) -> Result<Url, StorageError> {
        self.base_url
            .join(path)
            .map_err(|e| StorageError::Connection(format!("bad API path {path}: {e}")))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, StorageError> {
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Self::check_status(resp).await
    }

    async fn check_status(resp: Response) -> Result<Response, StorageError> {
        match resp.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound),
            StatusCode::CONFLICT => Err(StorageError::Conflict),
            s if s.is_client_error() || s.is_server_error() => {
                let body = resp.text().await.unwrap_or_default();
                let message = rejection_message(&body);
                tracing::debug!(status = s.as_u16(), %message, "API request rejected");
                Err(StorageError::Rejected(format!("HTTP {}: {message}", s.as_u16())))
            }
            _ => Ok(resp),
        }
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<Envelope<T>, StorageError> {
        let body = resp
            .text()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, StorageError> {
        let req = self.client.get(self.url(path)?);
        Self::decode(self.send(req).await?).await?.into_data()
    }

    async fn write<B, T>(&self, method: reqwest::Method, path: &str, body: &B) -> Result<T, StorageError>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let req = self.client.request(method, self.url(path)?).json(body);
        Self::decode(self.send(req).await?).await?.into_data()
    }

    async fn write_unit<B>(&self, method: reqwest::Method, path: &str, body: &B) -> Result<(), StorageError>
    where
        B: serde::Serialize + ?Sized + Sync,
    {
        let req = self.client.request(method, self.url(path)?).json(body);
        Self::decode::<serde_json::Value>(self.send(req).await?)
            .await?
            .into_unit()
    }
}

/// Prefer the envelope's `error` field over the raw body.
fn rejection_message(body: &str) -> String {
    serde_json::from_str::<Envelope<serde_json::Value>>(body)
        .ok()
        .and_then(|env| env.error)
        .unwrap_or_else(|| body.trim().to_string())
}

// ─── REPOSITORIES ───────────────────────────────────────────────────────────

#[async_trait]
impl CourseRepository for HttpRepository {
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        match self.get(&format!("courses/{id}")).await {
            Ok(course) => Ok(Some(course)),
            Err(StorageError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        self.get("courses").await
    }

    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        self.write_unit(reqwest::Method::PUT, &format!("courses/{}", course.id), course)
            .await
    }
}

#[async_trait]
impl EnrollmentRepository for HttpRepository {
    async fn my_enrollments(&self, user_id: UserId) -> Result<Vec<Enrollment>, StorageError> {
        let all: Vec<Enrollment> = self.get("enrollments/my").await?;
        Ok(all.into_iter().filter(|e| e.user_id == user_id).collect())
    }

    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        self.write_unit(reqwest::Method::POST, "enrollments", enrollment)
            .await
    }

    async fn update_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
        patch: &ProgressPatch,
    ) -> Result<Enrollment, StorageError> {
        let updated: Enrollment = self
            .write(
                reqwest::Method::PUT,
                &format!("enrollments/{course_id}/progress"),
                patch,
            )
            .await?;
        if updated.user_id != user_id {
            return Err(StorageError::Rejected(format!(
                "progress update returned enrollment of user {}",
                updated.user_id
            )));
        }
        Ok(updated)
    }

    async fn migrate_progress(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Enrollment, StorageError> {
        self.write(
            reqwest::Method::POST,
            &format!("enrollments/{enrollment_id}/migrate-progress"),
            &serde_json::json!({}),
        )
        .await
    }
}

#[async_trait]
impl ProgramRepository for HttpRepository {
    async fn list_programs(&self) -> Result<Vec<Program>, StorageError> {
        self.get("programs").await
    }

    async fn upsert_program(&self, program: &Program) -> Result<(), StorageError> {
        self.write_unit(reqwest::Method::PUT, &format!("programs/{}", program.id), program)
            .await
    }
}

#[async_trait]
impl FinalTestRepository for HttpRepository {
    async fn list_final_tests(
        &self,
        query: &FinalTestQuery,
    ) -> Result<Vec<FinalTest>, StorageError> {
        let mut url = self.url("final-tests")?;
        url.query_pairs_mut()
            .append_pair("program_id", &query.program_id.to_string())
            .append_pair("published_only", if query.published_only { "true" } else { "false" });
        let req = self.client.get(url);
        Self::decode(self.send(req).await?).await?.into_data()
    }

    async fn upsert_final_test(&self, test: &FinalTest) -> Result<(), StorageError> {
        self.write_unit(reqwest::Method::POST, "final-tests", test)
            .await
    }
}

#[async_trait]
impl QuizAttemptRepository for HttpRepository {
    async fn attempts_for_user(&self, user_id: UserId) -> Result<Vec<QuizAttempt>, StorageError> {
        self.get(&format!("quiz-attempts/user/{user_id}")).await
    }

    async fn record_attempt(&self, attempt: &QuizAttempt) -> Result<(), StorageError> {
        self.write_unit(reqwest::Method::POST, "quiz-attempts", attempt)
            .await
    }
}

impl Storage {
    /// Storage backed by the remote LMS API.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the base URL is invalid.
    pub fn http(base_url: &str, token: Option<String>) -> Result<Self, StorageError> {
        tracing::debug!(%base_url, "using HTTP storage backend");
        Ok(Self::from_repository(HttpRepository::new(base_url, token)?))
    }
}
