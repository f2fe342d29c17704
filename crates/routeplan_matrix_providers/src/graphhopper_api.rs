use std::{fmt::Display, time::Duration};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::travel_matrices::TravelMatrices;

pub type GHPoint = [f64; 2];

pub const GRAPHHOPPER_API_KEY_ENV_VAR: &str = "GRAPHHOPPER_API_KEY";

#[derive(Deserialize, Serialize, JsonSchema, Copy, Clone, Debug, Hash, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GraphHopperProfile {
    Car,
    SmallTruck,
    Truck,
}

impl Display for GraphHopperProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                GraphHopperProfile::Car => "car",
                GraphHopperProfile::SmallTruck => "small_truck",
                GraphHopperProfile::Truck => "truck",
            }
        )
    }
}

#[derive(Debug, Error)]
pub enum GraphHopperError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Job failed with status: {0}")]
    JobFailed(String),

    #[error("Polling timeout after {0} attempts")]
    Timeout(u32),

    #[error("Matrix has {actual} entries, expected {expected}")]
    MalformedMatrix { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Serialize)]
struct MatrixRequestBody {
    /// Points for symmetric matrix (all-to-all), `[lon, lat]`
    points: Vec<GHPoint>,

    /// Which arrays to return: "times", "distances"
    out_arrays: Vec<&'static str>,

    profile: String,

    /// Unreachable pairs come back as `null` instead of failing the whole request
    fail_fast: bool,
}

#[derive(Deserialize)]
struct MatrixSolution {
    /// Travel times in seconds
    times: Vec<Vec<Option<f64>>>,

    /// Distances in meters
    distances: Vec<Vec<Option<f64>>>,
}

#[derive(Deserialize)]
struct AsyncMatrixJobResponse {
    job_id: String,
}

#[derive(Deserialize)]
struct AsyncMatrixResponse {
    status: String,
    solution: Option<MatrixSolution>,
}

pub struct GraphhopperMatrixClientParams {
    pub api_key: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl GraphhopperMatrixClientParams {
    pub fn new(api_key: String) -> Self {
        GraphhopperMatrixClientParams {
            api_key,
            max_poll_attempts: 40, // max 20s
            poll_interval: Duration::from_millis(500),
        }
    }
}

pub const GRAPHOPPER_MATRIX_SYNC_API_URL: &str = "https://graphhopper.com/api/1/matrix";
pub const GRAPHOPPER_MATRIX_ASYNC_POST_API_URL: &str =
    "https://graphhopper.com/api/1/matrix/calculate";
pub const GRAPHOPPER_MATRIX_ASYNC_POLL_API_URL: &str =
    "https://graphhopper.com/api/1/matrix/solution";

/// The sync endpoint rejects larger requests
const SYNC_MAX_POINTS: usize = 25;

pub struct GraphHopperMatrixClient {
    params: GraphhopperMatrixClientParams,
    client: reqwest::Client,
}

impl GraphHopperMatrixClient {
    pub fn new(params: GraphhopperMatrixClientParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
        }
    }

    pub async fn fetch_matrix(
        &self,
        points: &[geo_types::Point],
        profile: GraphHopperProfile,
    ) -> Result<TravelMatrices, GraphHopperError> {
        let body = MatrixRequestBody {
            points: points.iter().map(|point| [point.x(), point.y()]).collect(),
            out_arrays: vec!["times", "distances"],
            profile: profile.to_string(),
            fail_fast: false,
        };

        let solution = if points.len() < SYNC_MAX_POINTS {
            self.sync_matrix_request(&body).await?
        } else {
            self.async_matrix_request(&body).await?
        };

        let expected = points.len() * points.len();
        let times = solution.times.into_iter().flatten().collect::<Vec<_>>();
        let distances = solution.distances.into_iter().flatten().collect::<Vec<_>>();

        for actual in [times.len(), distances.len()] {
            if actual != expected {
                return Err(GraphHopperError::MalformedMatrix { expected, actual });
            }
        }

        let (matrices, unreachable) = TravelMatrices::fill_unreachable(&distances, &times);
        if unreachable > 0 {
            warn!(
                "GraphHopperApi: {} unreachable pairs replaced by sentinel cost",
                unreachable
            );
        }

        Ok(matrices)
    }

    async fn sync_matrix_request(
        &self,
        body: &MatrixRequestBody,
    ) -> Result<MatrixSolution, GraphHopperError> {
        let response = self
            .client
            .post(GRAPHOPPER_MATRIX_SYNC_API_URL)
            .query(&[("key", &self.params.api_key)])
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn async_matrix_request(
        &self,
        body: &MatrixRequestBody,
    ) -> Result<MatrixSolution, GraphHopperError> {
        let post_response = self
            .client
            .post(GRAPHOPPER_MATRIX_ASYNC_POST_API_URL)
            .query(&[("key", &self.params.api_key)])
            .json(body)
            .send()
            .await?;

        if !post_response.status().is_success() {
            let status = post_response.status().as_u16();
            let message = post_response.text().await.unwrap_or_default();
            return Err(GraphHopperError::Api { status, message });
        }

        debug!("GraphHopperApi: Posted matrix request");

        let job_response: AsyncMatrixJobResponse = post_response.json().await?;

        self.poll_until_completed(&job_response.job_id).await
    }

    async fn get_solution(&self, job_id: &str) -> Result<Option<MatrixSolution>, GraphHopperError> {
        let url = format!("{}/{}", GRAPHOPPER_MATRIX_ASYNC_POLL_API_URL, job_id);
        let poll_response = self
            .client
            .get(url)
            .query(&[("key", &self.params.api_key)])
            .send()
            .await?;

        if !poll_response.status().is_success() {
            let status = poll_response.status().as_u16();
            let message = poll_response.text().await.unwrap_or_default();
            return Err(GraphHopperError::Api { status, message });
        }

        let async_response: AsyncMatrixResponse = poll_response.json().await?;

        match async_response.status.as_str() {
            "finished" => Ok(async_response.solution),
            "waiting" | "processing" => Ok(None),
            other => Err(GraphHopperError::JobFailed(other.to_string())),
        }
    }

    async fn poll_until_completed(&self, job_id: &str) -> Result<MatrixSolution, GraphHopperError> {
        for attempt in 1..=self.params.max_poll_attempts {
            debug!(
                "GraphHopperApi: Polling for job completion {}/{}",
                attempt, self.params.max_poll_attempts
            );
            if let Some(solution) = self.get_solution(job_id).await? {
                return Ok(solution);
            }

            tokio::time::sleep(self.params.poll_interval).await;
        }

        Err(GraphHopperError::Timeout(self.params.max_poll_attempts))
    }

    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<MatrixSolution, GraphHopperError> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(GraphHopperError::Api { status, message })
        }
    }
}
