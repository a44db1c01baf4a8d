//! Maps a [`CarRecord`] onto the exact column layout the model was trained on.
//!
//! The training pipeline renamed a few request fields, one-hot encoded the
//! categorical ones with the first category dropped, and then fixed the
//! resulting column list. Alignment replays that for a single record:
//! continuous attributes keep their value, a categorical attribute lights
//! up the `<Field>_<value>` column if the schema has one, and every other
//! schema column is zero.

use std::borrow::Cow;

use ndarray::Array1;

use crate::error::ApiError;
use crate::models::CarRecord;
use crate::schema::FeatureSchema;

/// Request attributes and the column names they had at training time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    CarName,
    Year,
    PresentPrice,
    KmsDriven,
    FuelType,
    SellerType,
    Transmission,
    Owner,
}

impl Attribute {
    pub const ALL: [Attribute; 8] = [
        Attribute::CarName,
        Attribute::Year,
        Attribute::PresentPrice,
        Attribute::KmsDriven,
        Attribute::FuelType,
        Attribute::SellerType,
        Attribute::Transmission,
        Attribute::Owner,
    ];

    /// Rename table: (request field, training column).
    pub fn names(self) -> (&'static str, &'static str) {
        match self {
            Attribute::CarName => ("Car_Name", "Car_Name"),
            Attribute::Year => ("year", "Year"),
            Attribute::PresentPrice => ("Present_price", "Present_Price"),
            Attribute::KmsDriven => ("Kms_Driven", "Kms_Driven"),
            Attribute::FuelType => ("Fuel_Type", "Fuel_Type"),
            Attribute::SellerType => ("Seller_Type", "Seller_Type"),
            Attribute::Transmission => ("Transmission", "Transmission"),
            Attribute::Owner => ("owner", "Owner"),
        }
    }

    pub fn request_name(self) -> &'static str {
        self.names().0
    }

    pub fn column(self) -> &'static str {
        self.names().1
    }

    pub fn is_categorical(self) -> bool {
        !matches!(
            self,
            Attribute::Year | Attribute::PresentPrice | Attribute::KmsDriven
        )
    }
}

enum AttributeValue<'a> {
    Number(f32),
    Category(Cow<'a, str>),
}

fn value_of(record: &CarRecord, attribute: Attribute) -> AttributeValue<'_> {
    match attribute {
        Attribute::CarName => AttributeValue::Category(Cow::Borrowed(record.car_name.as_str())),
        Attribute::Year => AttributeValue::Number(record.year as f32),
        Attribute::PresentPrice => AttributeValue::Number(record.present_price as f32),
        Attribute::KmsDriven => AttributeValue::Number(record.kms_driven as f32),
        Attribute::FuelType => AttributeValue::Category(Cow::Borrowed(record.fuel_type.as_str())),
        Attribute::SellerType => {
            AttributeValue::Category(Cow::Borrowed(record.seller_type.as_str()))
        }
        Attribute::Transmission => {
            AttributeValue::Category(Cow::Borrowed(record.transmission.as_str()))
        }
        Attribute::Owner => AttributeValue::Category(Cow::Owned(record.owner.to_string())),
    }
}

/// Name of the one-hot column for `value` of a categorical attribute.
pub fn indicator_column(attribute: Attribute, value: &str) -> String {
    format!("{}_{}", attribute.column(), value)
}

/// One numeric row in schema order.
#[derive(Debug, Clone)]
pub struct EncodedRow {
    schema: FeatureSchema,
    values: Array1<f32>,
}

impl EncodedRow {
    pub fn width(&self) -> usize {
        self.values.len()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.values.to_vec()
    }

    /// Value of a named column, `None` when the schema has no such column.
    pub fn get(&self, column: &str) -> Option<f32> {
        self.schema.position(column).map(|i| self.values[i])
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    #[cfg(test)]
    pub(crate) fn from_values(schema: FeatureSchema, values: Vec<f32>) -> Self {
        Self {
            schema,
            values: Array1::from(values),
        }
    }
}

/// Aligner bound to one schema. Construction checks that the schema can
/// carry a car record at all; alignment itself cannot fail.
#[derive(Debug, Clone)]
pub struct FeatureAligner {
    schema: FeatureSchema,
    continuous: Vec<(Attribute, usize)>,
}

impl FeatureAligner {
    pub fn new(schema: &FeatureSchema) -> Result<Self, ApiError> {
        if schema.is_empty() {
            return Err(ApiError::SchemaMismatch("feature schema is empty".into()));
        }

        let mut continuous = Vec::new();
        for attribute in Attribute::ALL.into_iter().filter(|a| !a.is_categorical()) {
            let position = schema.position(attribute.column()).ok_or_else(|| {
                ApiError::SchemaMismatch(format!(
                    "continuous column `{}` is not in the schema",
                    attribute.column()
                ))
            })?;
            continuous.push((attribute, position));
        }

        Ok(Self {
            schema: schema.clone(),
            continuous,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn align(&self, record: &CarRecord) -> EncodedRow {
        let mut values = Array1::<f32>::zeros(self.schema.len());

        for &(attribute, position) in &self.continuous {
            if let AttributeValue::Number(v) = value_of(record, attribute) {
                values[position] = v;
            }
        }

        for attribute in Attribute::ALL.into_iter().filter(|a| a.is_categorical()) {
            let AttributeValue::Category(value) = value_of(record, attribute) else {
                continue;
            };
            let column = indicator_column(attribute, &value);
            match self.schema.position(&column) {
                Some(position) => values[position] = 1.0,
                // Either the reference category or a value never seen in training.
                None => tracing::debug!(
                    field = attribute.column(),
                    value = %value,
                    "no indicator column, encoding as reference category"
                ),
            }
        }

        EncodedRow {
            schema: self.schema.clone(),
            values,
        }
    }
}

/// One-shot alignment against `schema`.
pub fn align(record: &CarRecord, schema: &FeatureSchema) -> Result<EncodedRow, ApiError> {
    Ok(FeatureAligner::new(schema)?.align(record))
}
