use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::form::Field;

/// Eleven daily covariates plus the observation date, as sent to `/predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    /// Serialized as `YYYY-MM-DD`.
    pub fecha_observacion: NaiveDate,

    pub hum_maximo: f64,
    pub hum_media: f64,
    pub hum_minimo: f64,

    pub rad_maximo: f64,
    pub rad_total: f64,

    pub rain_total: f64,

    pub temp_media: f64,
    pub temp_minimo: f64,

    pub wsp_maximo: f64,
    pub wsp_media: f64,
    pub wsp_minimo: f64,
}

impl PredictionInput {
    pub fn numeric_values(&self) -> [(Field, f64); 11] {
        [
            (Field::HumMaximo, self.hum_maximo),
            (Field::HumMedia, self.hum_media),
            (Field::HumMinimo, self.hum_minimo),
            (Field::RadMaximo, self.rad_maximo),
            (Field::RadTotal, self.rad_total),
            (Field::RainTotal, self.rain_total),
            (Field::TempMedia, self.temp_media),
            (Field::TempMinimo, self.temp_minimo),
            (Field::WspMaximo, self.wsp_maximo),
            (Field::WspMedia, self.wsp_media),
            (Field::WspMinimo, self.wsp_minimo),
        ]
    }

    /// Numeric fields holding NaN or an infinity.
    pub fn non_finite_fields(&self) -> Vec<Field> {
        self.numeric_values()
            .into_iter()
            .filter(|(_, v)| !v.is_finite())
            .map(|(field, _)| field)
            .collect()
    }
}

/// Successful `/predict` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted maximum temperature in °C.
    pub temp_maximo_pred: f64,
    pub model_uri: String,
}

/// `/health` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_uri: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PredictionInput {
        PredictionInput {
            fecha_observacion: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            hum_maximo: 85.0,
            hum_media: 70.0,
            hum_minimo: 55.0,
            rad_maximo: 800.0,
            rad_total: 20.0,
            rain_total: 0.0,
            temp_media: 20.0,
            temp_minimo: 15.0,
            wsp_maximo: 10.0,
            wsp_media: 5.0,
            wsp_minimo: 0.0,
        }
    }

    #[test]
    fn serializes_as_flat_object_with_iso_date() {
        let json = serde_json::to_value(sample()).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj.len(), 12);
        assert_eq!(obj["fecha_observacion"], "2024-06-01");
        assert_eq!(obj["hum_maximo"], 85.0);
        assert_eq!(obj["wsp_minimo"], 0.0);
    }

    #[test]
    fn deserialization_ignores_key_order() {
        let body = r#"{
            "wsp_minimo": 0.25, "wsp_media": 5.5, "wsp_maximo": 10.125,
            "temp_minimo": 15.3, "temp_media": 20.7, "rain_total": 1.1,
            "rad_total": 20.2, "rad_maximo": 812.4,
            "hum_minimo": 55.5, "hum_media": 70.1, "hum_maximo": 85.9,
            "fecha_observacion": "2024-06-01"
        }"#;

        let input: PredictionInput = serde_json::from_str(body).unwrap();
        assert_eq!(input.temp_media, 20.7);
        assert_eq!(input.wsp_maximo, 10.125);
        assert_eq!(input.fecha_observacion, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[test]
    fn non_finite_fields_are_listed() {
        let mut input = sample();
        assert!(input.non_finite_fields().is_empty());

        input.rain_total = f64::NAN;
        input.wsp_media = f64::INFINITY;
        assert_eq!(input.non_finite_fields(), vec![Field::RainTotal, Field::WspMedia]);
    }

    #[test]
    fn health_error_is_optional() {
        let h: HealthStatus =
            serde_json::from_str(r#"{"status":"ok","model_uri":"models:/m/1"}"#).unwrap();
        assert!(h.is_ok());
        assert_eq!(h.error, None);
    }
}
