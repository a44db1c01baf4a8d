use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::aligner::Attribute;
use crate::error::ApiError;

pub const MAX_OWNER: i64 = 3;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum FuelType {
    Petrol,
    Diesel,
    #[serde(rename = "CNG")]
    Cng,
}

impl FuelType {
    pub fn as_str(self) -> &'static str {
        match self {
            FuelType::Petrol => "Petrol",
            FuelType::Diesel => "Diesel",
            FuelType::Cng => "CNG",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SellerType {
    Dealer,
    Individual,
}

impl SellerType {
    pub fn as_str(self) -> &'static str {
        match self {
            SellerType::Dealer => "Dealer",
            SellerType::Individual => "Individual",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Transmission {
    Manual,
    Automatic,
}

impl Transmission {
    pub fn as_str(self) -> &'static str {
        match self {
            Transmission::Manual => "Manual",
            Transmission::Automatic => "Automatic",
        }
    }
}

/// A single car as submitted to `POST /predict`. Field names on the wire
/// are the ones the form and API clients send.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CarRecord {
    #[serde(rename = "Car_Name")]
    pub car_name: String,
    pub year: i32,
    #[serde(rename = "Present_price")]
    pub present_price: f64,
    #[serde(rename = "Kms_Driven")]
    pub kms_driven: i64,
    #[serde(rename = "Fuel_Type")]
    pub fuel_type: FuelType,
    #[serde(rename = "Seller_Type")]
    pub seller_type: SellerType,
    #[serde(rename = "Transmission")]
    pub transmission: Transmission,
    pub owner: u8,
}

impl CarRecord {
    /// Validates a JSON body field by field so that every rejection names
    /// the offending field.
    pub fn from_json(body: &Value) -> Result<Self, ApiError> {
        let obj = body
            .as_object()
            .ok_or_else(|| ApiError::validation("body", "expected a JSON object"))?;

        let owner: i64 = field(obj, Attribute::Owner.request_name())?;
        if !(0..=MAX_OWNER).contains(&owner) {
            return Err(ApiError::validation(
                Attribute::Owner.request_name(),
                format!("must be between 0 and {MAX_OWNER}, got {owner}"),
            ));
        }

        Ok(CarRecord {
            car_name: field(obj, Attribute::CarName.request_name())?,
            year: field(obj, Attribute::Year.request_name())?,
            present_price: field(obj, Attribute::PresentPrice.request_name())?,
            kms_driven: field(obj, Attribute::KmsDriven.request_name())?,
            fuel_type: field(obj, Attribute::FuelType.request_name())?,
            seller_type: field(obj, Attribute::SellerType.request_name())?,
            transmission: field(obj, Attribute::Transmission.request_name())?,
            owner: owner as u8,
        })
    }
}

fn field<T: DeserializeOwned>(obj: &Map<String, Value>, name: &str) -> Result<T, ApiError> {
    let raw = obj
        .get(name)
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::validation(name, "field required"))?;
    serde_json::from_value(raw.clone()).map_err(|e| ApiError::validation(name, e.to_string()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction_price: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(rename = "Success")]
    pub success: bool,
    pub message: String,
}
