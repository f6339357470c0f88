use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use actix_web::error::InternalError;
use actix_web::{HttpResponse, web};
use log::{debug, error, info, warn};
use serde::Serialize;
use shared::{HealthResponse, PredictRequest, PredictResponse, SetupRequest, SetupResponse};

use crate::backends::MlBackend;

const MAX_PAYLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Labeling configs received on `/setup`, keyed by project.
#[derive(Debug, Default)]
pub struct ProjectSchemas {
    schemas: RwLock<HashMap<String, String>>,
}

impl ProjectSchemas {
    pub fn insert(&self, project: String, schema: String) {
        self.schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(project, schema);
    }

    pub fn get(&self, project: &str) -> Option<String> {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(project)
            .cloned()
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, schemas: web::Data<ProjectSchemas>) {
    cfg.app_data(json_config())
        .app_data(schemas)
        .service(web::resource("/").route(web::get().to(health)))
        .service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/setup").route(web::post().to(setup)))
        .service(web::resource("/predict").route(web::post().to(predict)));
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_PAYLOAD_BYTES)
        .error_handler(|err, _req| {
            warn!("Rejected request body: {}", err);
            let response = HttpResponse::BadRequest().json(ErrorResponse {
                error: err.to_string(),
            });
            InternalError::from_response(err, response).into()
        })
}

async fn health(backend: web::Data<dyn MlBackend>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "UP".to_string(),
        model_class: backend.model_class().to_string(),
    })
}

/// Label Studio calls this when a project connects or its labeling config changes.
async fn setup(
    backend: web::Data<dyn MlBackend>,
    schemas: web::Data<ProjectSchemas>,
    request: web::Json<SetupRequest>,
) -> HttpResponse {
    let request = request.into_inner();
    match (request.project_key(), request.schema) {
        (Some(project), Some(schema)) => {
            info!("Stored labeling config for project {}", project);
            schemas.insert(project, schema);
        }
        _ => debug!("Setup without project or schema"),
    }
    HttpResponse::Ok().json(SetupResponse {
        model_version: backend.model_version().to_string(),
    })
}

/// The request's own labeling config wins over the one stored at setup.
fn resolve_label_config(request: &PredictRequest, schemas: &ProjectSchemas) -> Option<String> {
    request
        .label_config
        .clone()
        .or_else(|| schemas.get(&request.project_key()?))
}

async fn predict(
    backend: web::Data<dyn MlBackend>,
    schemas: web::Data<ProjectSchemas>,
    request: web::Json<PredictRequest>,
) -> HttpResponse {
    info!(
        "Predict request for {} task(s) on {}",
        request.tasks.len(),
        backend.model_class()
    );

    let label_config = resolve_label_config(&request, &schemas);
    match backend
        .predict(&request.tasks, request.context(), label_config.as_deref())
        .await
    {
        Ok(results) => HttpResponse::Ok().json(PredictResponse { results }),
        Err(e) if e.is_client_error() => {
            warn!("Bad predict request: {}", e);
            HttpResponse::BadRequest().json(ErrorResponse {
                error: e.to_string(),
            })
        }
        Err(e) => {
            error!("Prediction failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            })
        }
    }
}
