//! Water vapour pressure over seawater
//!
//! Two formulations are provided. [`weiss1980`] is the empirical fit used in the
//! solubility correction of Weiss & Price (1980). [`dickson2007`] combines the
//! Wagner & Pruss (2002) pure-water saturation pressure with the Millero (1974)
//! osmotic coefficient of seawater, as recommended in the Dickson et al. (2007)
//! best practices guide.
//!
//! All functions take salinity in PSU and temperature in Kelvin and return atm.

use crate::errors::SeaFluxResult;
use crate::field::{map_fields, Field, FloatValue};
use serde::{Deserialize, Serialize};

/// Method used to estimate the water vapour pressure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VapourPressure {
    /// Weiss & Price (1980)
    Weiss1980,
    /// Dickson et al. (2007)
    #[default]
    Dickson2007,
}

impl VapourPressure {
    pub fn calculate(&self, salinity: FloatValue, temperature_k: FloatValue) -> FloatValue {
        match self {
            VapourPressure::Weiss1980 => weiss1980(salinity, temperature_k),
            VapourPressure::Dickson2007 => dickson2007(salinity, temperature_k),
        }
    }

    pub fn calculate_field(&self, salinity: &Field, temperature_k: &Field) -> SeaFluxResult<Field> {
        map_fields([salinity, temperature_k], |[s, t]| self.calculate(s, t))
    }
}

/// Water vapour pressure of seawater following Weiss & Price (1980)
///
/// $$ \ln p_{H_2O} = 24.4543 - 67.4509 \frac{100}{T} - 4.8489 \ln \frac{T}{100} - 0.000544 S $$
pub fn weiss1980(salinity: FloatValue, temperature_k: FloatValue) -> FloatValue {
    let t100 = temperature_k / 100.0;
    (24.4543 - 67.4509 / t100 - 4.8489 * t100.ln() - 0.000544 * salinity).exp()
}

const WAGNER_PRUSS: [(FloatValue, FloatValue); 6] = [
    (-7.85951783, 1.0),
    (1.84408259, 1.5),
    (-11.7866497, 3.0),
    (22.6807411, 3.5),
    (-15.9618719, 4.0),
    (1.80122502, 7.5),
];

const CRITICAL_TEMPERATURE_K: FloatValue = 647.096;
/// 22.064 MPa in atm
const CRITICAL_PRESSURE_ATM: FloatValue = 22.064 / 101325e-6;

const OSMOTIC_COEFFICIENTS: [FloatValue; 5] = [0.90799, -0.08992, 0.18458, -0.07395, -0.00221];

/// Saturation vapour pressure of pure water (Wagner & Pruss 2002) in atm
pub fn pure_water(temperature_k: FloatValue) -> FloatValue {
    let z = 1.0 - temperature_k / CRITICAL_TEMPERATURE_K;
    let series: FloatValue = WAGNER_PRUSS.iter().map(|(a, n)| a * z.powf(*n)).sum();
    CRITICAL_PRESSURE_ATM * (CRITICAL_TEMPERATURE_K / temperature_k * series).exp()
}

/// Water vapour pressure of seawater following Dickson et al. (2007)
///
/// The pure-water pressure is reduced using the osmotic coefficient
///
/// $$ p_{H_2O} = p^*_{H_2O} \exp(-0.018 \phi m) $$
///
/// where $m = 31.998 S / (10^3 - 1.005 S)$ is the total molality of seawater
/// and $\phi$ is a polynomial in $m/2$.
pub fn dickson2007(salinity: FloatValue, temperature_k: FloatValue) -> FloatValue {
    let molality = 31.998 * salinity / (1e3 - 1.005 * salinity);
    let b1 = molality * 0.5;

    let osmotic = OSMOTIC_COEFFICIENTS
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * b1 + c);

    pure_water(temperature_k) * (-0.018 * osmotic * molality).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    #[test]
    fn weiss1980_reference() {
        let p = weiss1980(35.0, 298.15);
        assert!(
            is_close!(p, 0.03065529996317971),
            "weiss1980 {}",
            p
        );
    }

    #[test]
    fn dickson2007_reference() {
        let p = dickson2007(35.0, 298.15);
        assert!(
            is_close!(p, 0.030698866245809465),
            "dickson2007 {}",
            p
        );
    }

    #[test]
    fn methods_agree_within_a_percent() {
        for t in [273.15, 283.15, 293.15, 303.15] {
            let w = weiss1980(35.0, t);
            let d = dickson2007(35.0, t);
            assert!((w - d).abs() / d < 0.01, "T={} weiss={} dickson={}", t, w, d);
        }
    }

    #[test]
    fn salt_lowers_vapour_pressure() {
        assert!(dickson2007(35.0, 293.15) < dickson2007(0.0, 293.15));
        assert!(weiss1980(35.0, 293.15) < weiss1980(0.0, 293.15));
    }

    #[test]
    fn fresh_water_matches_pure_water() {
        assert_eq!(dickson2007(0.0, 293.15), pure_water(293.15));
    }

    #[test]
    fn enum_dispatch() {
        assert_eq!(
            VapourPressure::Weiss1980.calculate(35.0, 298.15),
            weiss1980(35.0, 298.15)
        );
        assert_eq!(VapourPressure::default(), VapourPressure::Dickson2007);
    }
}
