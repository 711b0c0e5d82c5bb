use async_trait::async_trait;
use course_core::decode_course;
use course_core::model::{Course, CourseId, LearnerId};
use reqwest::Client;
use url::Url;

use crate::course_source::CourseSource;
use crate::error::FetchError;

#[derive(Clone, Debug)]
pub struct HttpSourceConfig {
    base_url: Url,
    api_token: Option<String>,
}

impl HttpSourceConfig {
    /// # Errors
    ///
    /// Returns `url::ParseError` if `base_url` is not an absolute URL.
    pub fn new(base_url: &str, api_token: Option<String>) -> Result<Self, url::ParseError> {
        let mut base_url = Url::parse(base_url.trim())?;
        // `Url::join` replaces the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let api_token = api_token.filter(|token| !token.trim().is_empty());
        Ok(Self {
            base_url,
            api_token,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/courses/{id}?learner_id={learner}`
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if the joined URL is invalid.
    pub fn course_url(
        &self,
        course_id: CourseId,
        learner_id: LearnerId,
    ) -> Result<Url, url::ParseError> {
        let mut url = self.base_url.join(&format!("courses/{course_id}"))?;
        url.query_pairs_mut()
            .append_pair("learner_id", &learner_id.to_string());
        Ok(url)
    }
}

/// Fetches course payloads from the remote course API.
#[derive(Clone)]
pub struct HttpCourseSource {
    client: Client,
    config: HttpSourceConfig,
}

impl HttpCourseSource {
    #[must_use]
    pub fn new(config: HttpSourceConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Use a preconfigured client (timeouts, proxies, TLS roots).
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &HttpSourceConfig {
        &self.config
    }
}

#[async_trait]
impl CourseSource for HttpCourseSource {
    async fn fetch_course(
        &self,
        course_id: CourseId,
        learner_id: LearnerId,
    ) -> Result<Course, FetchError> {
        let url = self.config.course_url(course_id, learner_id)?;
        tracing::debug!(%url, "requesting course payload");

        let mut request = self.client.get(url);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        match response.status() {
            status if status == reqwest::StatusCode::NOT_FOUND => {
                return Err(FetchError::NotFound(course_id));
            }
            status if !status.is_success() => return Err(FetchError::HttpStatus(status)),
            _ => {}
        }

        let body = response.bytes().await?;
        let course = decode_course(&body)?;
        if course.id != course_id {
            return Err(FetchError::CourseMismatch {
                requested: course_id,
                received: course.id,
            });
        }
        Ok(course)
    }
}
