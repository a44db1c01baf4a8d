//! Loads the trained model and its feature schema once per process.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::aligner::{Attribute, FeatureAligner};
use crate::config::ArtifactsConfig;
use crate::error::ApiError;
use crate::regressor::{ForestRegressor, ModelFormat, OnnxRegressor, Regressor};
use crate::schema::FeatureSchema;

/// Where artifacts come from. The server reads files; tests swap in
/// in-memory sources.
pub trait ArtifactSource: Send + Sync {
    fn read_schema(&self) -> Result<FeatureSchema, ApiError>;

    /// Reads the model, which must accept rows of `width` columns.
    fn read_model(&self, width: usize) -> Result<Box<dyn Regressor>, ApiError>;

    fn describe(&self) -> String;
}

pub struct FsArtifactSource {
    model_path: PathBuf,
    schema_path: PathBuf,
    format: Option<ModelFormat>,
}

impl FsArtifactSource {
    pub fn new(
        model_path: impl Into<PathBuf>,
        schema_path: impl Into<PathBuf>,
        format: Option<ModelFormat>,
    ) -> Self {
        Self {
            model_path: model_path.into(),
            schema_path: schema_path.into(),
            format,
        }
    }

    pub fn from_config(config: &ArtifactsConfig) -> Self {
        Self::new(&config.model_path, &config.schema_path, config.model_format)
    }

    fn format(&self) -> Result<ModelFormat, ApiError> {
        self.format
            .or_else(|| ModelFormat::from_path(&self.model_path))
            .ok_or_else(|| {
                ApiError::artifact(
                    display(&self.model_path),
                    "unknown model format, expected .onnx or .json",
                )
            })
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

impl ArtifactSource for FsArtifactSource {
    fn read_schema(&self) -> Result<FeatureSchema, ApiError> {
        let path = display(&self.schema_path);
        let bytes = std::fs::read(&self.schema_path).map_err(|e| ApiError::artifact(&path, e))?;
        FeatureSchema::from_json(&bytes).map_err(|e| ApiError::artifact(&path, e))
    }

    fn read_model(&self, width: usize) -> Result<Box<dyn Regressor>, ApiError> {
        if !self.model_path.is_file() {
            return Err(ApiError::artifact(display(&self.model_path), "file not found"));
        }
        Ok(match self.format()? {
            ModelFormat::Onnx => Box::new(OnnxRegressor::load(&self.model_path, width)?),
            ModelFormat::Forest => Box::new(ForestRegressor::load(&self.model_path)?),
        })
    }

    fn describe(&self) -> String {
        format!(
            "model={} schema={}",
            self.model_path.display(),
            self.schema_path.display()
        )
    }
}

/// Model and schema as loaded, plus the aligner prepared for that schema.
pub struct Artifacts {
    model: Box<dyn Regressor>,
    aligner: FeatureAligner,
}

impl Artifacts {
    pub fn model(&self) -> &dyn Regressor {
        self.model.as_ref()
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.aligner.schema()
    }

    pub fn aligner(&self) -> &FeatureAligner {
        &self.aligner
    }
}

/// Owns the artifacts for the lifetime of the server.
///
/// `load` is idempotent and safe to race: concurrent first callers block
/// until a single read finishes and then share its result. A failed load
/// leaves the store empty so the next call retries.
pub struct ArtifactStore {
    source: Box<dyn ArtifactSource>,
    cell: OnceCell<Artifacts>,
}

impl ArtifactStore {
    pub fn new(source: impl ArtifactSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cell: OnceCell::new(),
        }
    }

    pub fn from_config(config: &ArtifactsConfig) -> Self {
        Self::new(FsArtifactSource::from_config(config))
    }

    pub fn load(&self) -> Result<&Artifacts, ApiError> {
        self.cell.get_or_try_init(|| {
            info!(source = %self.source.describe(), "loading artifacts");

            let schema = self.source.read_schema()?;
            let aligner = FeatureAligner::new(&schema)?;
            let model = self.source.read_model(schema.len())?;
            if model.n_features() != schema.len() {
                return Err(ApiError::artifact(
                    self.source.describe(),
                    format!(
                        "model expects {} features but the schema lists {}",
                        model.n_features(),
                        schema.len()
                    ),
                ));
            }

            info!(
                kind = model.kind(),
                width = schema.len(),
                car_names = schema.categories(Attribute::CarName.column()).len(),
                "artifacts loaded"
            );
            for attribute in Attribute::ALL.into_iter().filter(|a| a.is_categorical()) {
                debug!(
                    field = attribute.column(),
                    known = ?schema.categories(attribute.column()),
                    "categories with indicator columns"
                );
            }
            Ok(Artifacts { model, aligner })
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn artifacts(&self) -> Result<&Artifacts, ApiError> {
        self.cell.get().ok_or(ApiError::NotLoaded)
    }

    pub fn model(&self) -> Result<&dyn Regressor, ApiError> {
        self.artifacts().map(Artifacts::model)
    }

    pub fn schema(&self) -> Result<&FeatureSchema, ApiError> {
        self.artifacts().map(Artifacts::schema)
    }
}
