pub mod aligner;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod handlers;
pub mod inference;
pub mod models;
pub mod regressor;
pub mod schema;
pub mod telemetry;

pub use aligner::{align, EncodedRow, FeatureAligner};
pub use artifacts::{ArtifactSource, ArtifactStore, FsArtifactSource};
pub use error::ApiError;
pub use models::CarRecord;
pub use schema::FeatureSchema;
