//! Solubility of CO2 in seawater
//!
//! Solubility (K0) is returned in mol L⁻¹ atm⁻¹.

use crate::errors::SeaFluxResult;
use crate::field::{map_fields, Field, FloatValue};
use crate::vapour_pressure;
use serde::{Deserialize, Serialize};

/// Coefficients of the Weiss (1974) solubility fit
///
/// Values are those tabulated in Wanninkhof (2014).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weiss1974Coefficients {
    /// default: -58.0931
    pub a1: FloatValue,
    /// default: 90.5069
    pub a2: FloatValue,
    /// default: 22.2940
    pub a3: FloatValue,
    /// default: 0.027766
    pub b1: FloatValue,
    /// default: -0.025888
    pub b2: FloatValue,
    /// default: 0.0050578
    pub b3: FloatValue,
}

impl Default for Weiss1974Coefficients {
    fn default() -> Self {
        Self {
            a1: -58.0931,
            a2: 90.5069,
            a3: 22.2940,
            b1: 0.027766,
            b2: -0.025888,
            b3: 0.0050578,
        }
    }
}

impl Weiss1974Coefficients {
    /// Solubility at 1 atm total pressure, before the water vapour correction
    ///
    /// $$ \ln K_0 = a_1 + a_2 \frac{100}{T} + a_3 \ln \frac{T}{100} + S \left(b_1 + b_2 \frac{T}{100} + b_3 \left(\frac{T}{100}\right)^2\right) $$
    pub fn uncorrected(&self, salinity: FloatValue, temperature_k: FloatValue) -> FloatValue {
        let t100 = temperature_k / 100.0;
        (self.a1
            + self.a2 / t100
            + self.a3 * t100.ln()
            + salinity * (self.b1 + self.b2 * t100 + self.b3 * t100 * t100))
            .exp()
    }

    /// Solubility corrected for the water vapour pressure at the given total pressure
    pub fn solubility(
        &self,
        salinity: FloatValue,
        temperature_k: FloatValue,
        pressure_atm: FloatValue,
    ) -> FloatValue {
        let ph2o = vapour_pressure::weiss1980(salinity, temperature_k);
        self.uncorrected(salinity, temperature_k) / (pressure_atm - ph2o)
    }
}

/// CO2 solubility following Weiss (1974)
///
/// The moist-air correction divides by $(P - p_{H_2O})$ with the water vapour
/// pressure of Weiss & Price (1980).
pub fn weiss1974(salinity: FloatValue, temperature_k: FloatValue, pressure_atm: FloatValue) -> FloatValue {
    Weiss1974Coefficients::default().solubility(salinity, temperature_k, pressure_atm)
}

/// Solubility with the skin temperature correction of Woolf et al. (2016)
///
/// `delta_t` is the foundation minus skin temperature difference (K).
pub fn woolf2016(
    salinity: FloatValue,
    temperature_k: FloatValue,
    delta_t: FloatValue,
    pressure_atm: FloatValue,
) -> FloatValue {
    weiss1974(salinity, temperature_k, pressure_atm) * (1.0 - 0.015 * delta_t)
}

pub fn weiss1974_field(salinity: &Field, temperature_k: &Field, pressure_atm: &Field) -> SeaFluxResult<Field> {
    map_fields([salinity, temperature_k, pressure_atm], |[s, t, p]| {
        weiss1974(s, t, p)
    })
}

pub fn woolf2016_field(
    salinity: &Field,
    temperature_k: &Field,
    delta_t: &Field,
    pressure_atm: &Field,
) -> SeaFluxResult<Field> {
    map_fields(
        [salinity, temperature_k, delta_t, pressure_atm],
        |[s, t, dt, p]| woolf2016(s, t, dt, p),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::scalar;
    use ndarray::Array1;

    #[test]
    fn weiss1974_reference() {
        let k0 = weiss1974(35.0, 299.15, 1.0);
        assert!(
            (k0 - 0.029285284543519093).abs() < 1e-15,
            "Expected 0.0292853, got {}",
            k0
        );
    }

    #[test]
    fn positive_over_ocean_range() {
        for s in [0.0, 10.0, 20.0, 30.0, 35.0, 40.0] {
            for t in [-2.0, 0.0, 10.0, 20.0, 30.0, 40.0] {
                let k0 = weiss1974(s, t + 273.15, 1.0);
                assert!(k0 > 0.0, "K0 not positive at S={} T={}: {}", s, t, k0);
            }
        }
    }

    #[test]
    fn colder_water_holds_more_co2() {
        assert!(weiss1974(35.0, 275.15, 1.0) > weiss1974(35.0, 300.15, 1.0));
    }

    #[test]
    fn woolf_without_temperature_difference_is_weiss() {
        assert_eq!(woolf2016(35.0, 290.0, 0.0, 1.0), weiss1974(35.0, 290.0, 1.0));
        let k_skin = woolf2016(35.0, 290.0, 0.14, 1.0);
        assert!((k_skin / weiss1974(35.0, 290.0, 1.0) - (1.0 - 0.015 * 0.14)).abs() < 1e-12);
    }

    #[test]
    fn field_broadcasts_scalar_pressure() {
        let temp = Array1::linspace(275.0, 300.0, 6).into_dyn();
        let salt = scalar(35.0);
        let pres = scalar(1.0);

        let k0 = weiss1974_field(&salt, &temp, &pres).unwrap();
        assert_eq!(k0.shape(), &[6]);
        assert_eq!(k0[5], weiss1974(35.0, 300.0, 1.0));
    }

    #[test]
    fn coefficients_deserialise_with_defaults() {
        let coeffs: Weiss1974Coefficients = serde_json::from_str(r#"{"a1": -60.0}"#).unwrap();
        assert_eq!(coeffs.a1, -60.0);
        assert_eq!(coeffs.b3, 0.0050578);
    }
}
