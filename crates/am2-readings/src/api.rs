//! ---
//! am2_section: "08-instrument-simulation"
//! am2_subsection: "module"
//! am2_type: "source"
//! am2_scope: "code"
//! am2_description: "Optional HTTP surface for the reading engine."
//! am2_version: "v0.0.0-prealpha"
//! am2_owner: "tbd"
//! ---
use crate::model::{CircuitSpecification, TestRequest};

#[cfg(feature = "rest-api")]
pub use rest::router;

#[cfg(feature = "rest-api")]
mod rest {
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use std::sync::Arc;

    use crate::{errors::ReadingError, reading::TestReading, ReadingEngine};

    use super::{ReadingRequest, ScheduleRequest};

    pub fn router(engine: ReadingEngine) -> Router {
        Router::new()
            .route("/api/readings", post(reading))
            .route("/api/readings/schedule", post(schedule))
            .with_state(Arc::new(engine))
    }

    async fn reading(
        State(engine): State<Arc<ReadingEngine>>,
        Json(payload): Json<ReadingRequest>,
    ) -> Result<Json<TestReading>, StatusCode> {
        let mut source = payload.noise();
        engine
            .take_reading(&payload.circuit, &payload.request, &mut source)
            .map(Json)
            .map_err(map_err)
    }

    async fn schedule(
        State(engine): State<Arc<ReadingEngine>>,
        Json(payload): Json<ScheduleRequest>,
    ) -> Result<Json<Vec<TestReading>>, StatusCode> {
        let mut source = crate::variation::BoxMuller::from_seed_or_entropy(payload.seed);
        engine
            .take_schedule(&payload.circuit, &payload.test_point_id, &mut source)
            .map(Json)
            .map_err(map_err)
    }

    fn map_err(err: ReadingError) -> StatusCode {
        if err.is_request() {
            StatusCode::BAD_REQUEST
        } else if err.is_configuration() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReadingRequest {
    pub circuit: CircuitSpecification,
    pub request: TestRequest,
    /// Fixed seed for reproducible answers; entropy otherwise.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ReadingRequest {
    pub fn noise(&self) -> crate::variation::BoxMuller<rand::rngs::StdRng> {
        crate::variation::BoxMuller::from_seed_or_entropy(self.seed)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScheduleRequest {
    pub circuit: CircuitSpecification,
    pub test_point_id: String,
    #[serde(default)]
    pub seed: Option<u64>,
}
