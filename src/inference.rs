use tracing::debug;

use crate::aligner::EncodedRow;
use crate::artifacts::ArtifactStore;
use crate::error::ApiError;
use crate::models::CarRecord;
use crate::regressor::Regressor;

/// Runs the model on one aligned row.
///
/// A width mismatch means the aligner and the model disagree about the
/// schema, which is a deployment bug rather than bad input.
pub fn predict(row: &EncodedRow, model: &dyn Regressor) -> Result<f64, ApiError> {
    if row.width() != model.n_features() {
        return Err(ApiError::Inference(format!(
            "row has {} columns, model expects {}",
            row.width(),
            model.n_features()
        )));
    }
    let price = f64::from(model.predict(row)?);
    if !price.is_finite() {
        return Err(ApiError::Inference(format!(
            "{} model returned {price}",
            model.kind()
        )));
    }
    Ok(price)
}

/// Record in, price out: loads artifacts on first use, aligns, predicts.
pub fn predict_price(store: &ArtifactStore, record: &CarRecord) -> Result<f64, ApiError> {
    let artifacts = store.load()?;
    let row = artifacts.aligner().align(record);
    let price = predict(&row, artifacts.model())?;
    debug!(width = row.width(), price, "prediction complete");
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::testing::CountingSource;
    use crate::models::{FuelType, SellerType, Transmission};
    use crate::regressor::{ForestRegressor, Tree};
    use crate::schema::FeatureSchema;

    fn constant(width: usize, value: f64) -> ForestRegressor {
        let tree = Tree {
            children_left: vec![-1],
            children_right: vec![-1],
            feature: vec![-2],
            threshold: vec![-2.0],
            value: vec![value],
        };
        ForestRegressor::new(width, vec![tree]).unwrap()
    }

    fn row(width: usize) -> EncodedRow {
        let schema =
            FeatureSchema::new((0..width).map(|i| format!("f{i}")).collect()).unwrap();
        EncodedRow::from_values(schema, vec![0.0; width])
    }

    fn record() -> CarRecord {
        CarRecord {
            car_name: "swift".into(),
            year: 2016,
            present_price: 6.87,
            kms_driven: 42450,
            fuel_type: FuelType::Diesel,
            seller_type: SellerType::Dealer,
            transmission: Transmission::Manual,
            owner: 0,
        }
    }

    #[test]
    fn returns_model_output() {
        let price = predict(&row(3), &constant(3, 4.25)).unwrap();
        assert_eq!(price, 4.25);
    }

    #[test]
    fn width_mismatch_is_an_inference_error() {
        let err = predict(&row(2), &constant(3, 4.25)).unwrap_err();
        assert!(matches!(err, ApiError::Inference(_)));
    }

    #[test]
    fn predict_price_loads_on_demand() {
        let store = ArtifactStore::new(CountingSource::new(&[
            "Year",
            "Present_Price",
            "Kms_Driven",
            "Fuel_Type_Diesel",
        ]));
        assert!(!store.is_loaded());
        assert_eq!(predict_price(&store, &record()).unwrap(), 3.5);
        assert!(store.is_loaded());
    }
}
