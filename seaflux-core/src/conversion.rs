//! Conversions between partial pressure and fugacity of CO2
//!
//! CO2 is not an ideal gas, so the fugacity (fCO2) measured by equilibrator
//! systems differs slightly from the partial pressure (pCO2). The two are related
//! through the virial expansion of Weiss (1974):
//!
//! $$ fCO_2 = pCO_2 \times \exp\left(\frac{P (B + 2 x_2 \delta)}{R T}\right) $$
//!
//! The mole fraction of CO2 in the equilibrator is only approximated from the
//! value being converted, so a round trip drifts by up to ~1e-5 µatm.

use crate::constants::{GAS_CONSTANT_VIRIAL, STANDARD_PRESSURE_HPA, ZERO_CELSIUS_K};
use crate::errors::SeaFluxResult;
use crate::field::{map_fields, Field, FloatValue};

/// Virial expansion factor for converting pCO2 to fCO2
///
/// Multiply pCO2 by this factor to get fCO2, divide fCO2 by it to get pCO2.
/// When `xco2` is `None` the $(1 - x_{CO_2})^2$ term is taken as 1.
pub fn virial_coeff(temperature_k: FloatValue, pressure_atm: FloatValue, xco2: Option<FloatValue>) -> FloatValue {
    let t = temperature_k;
    // virial coefficient of pure CO2
    let b = -1636.75 + 12.0408 * t - 0.0327957 * t.powi(2) + 3.16528e-5 * t.powi(3);
    // cross virial coefficient of CO2 in air
    let delta = 57.7 - 0.118 * t;

    let x2 = xco2.map_or(1.0, |x| (1.0 - x).powi(2));

    (pressure_atm * (b + 2.0 * x2 * delta) / (GAS_CONSTANT_VIRIAL * t)).exp()
}

/// Correction factor for pCO2 measured at `temp_in` and reported at `temp_out`
///
/// Empirical relationship of Takahashi et al. (1993). Works with either Celsius
/// or Kelvin as long as both temperatures use the same scale.
pub fn temperature_correction(temp_in: FloatValue, temp_out: FloatValue) -> FloatValue {
    (0.0433 * (temp_out - temp_in) - 4.35e-5 * (temp_out.powi(2) - temp_in.powi(2))).exp()
}

/// Convert seawater pCO2 (µatm) to fCO2 (µatm)
///
/// * `temp_sw_c` - seawater temperature (°C)
/// * `pres_hpa` - equilibrator pressure, defaults to 1013.25 hPa
/// * `temp_eq_c` - equilibrator temperature, defaults to `temp_sw_c`
pub fn pco2_to_fco2(
    pco2_uatm: FloatValue,
    temp_sw_c: FloatValue,
    pres_hpa: Option<FloatValue>,
    temp_eq_c: Option<FloatValue>,
) -> FloatValue {
    let pco2 = pco2_uatm * 1e-6;
    let t_sw = temp_sw_c + ZERO_CELSIUS_K;
    let t_eq = temp_eq_c.unwrap_or(temp_sw_c) + ZERO_CELSIUS_K;
    let p_eq = pres_hpa.unwrap_or(STANDARD_PRESSURE_HPA) / STANDARD_PRESSURE_HPA;

    let dt = temperature_correction(t_sw, t_eq);
    let xco2_eq = pco2 * dt / p_eq;

    pco2 * virial_coeff(t_sw, p_eq, Some(xco2_eq)) * 1e6
}

/// Convert seawater fCO2 (µatm) to pCO2 (µatm)
///
/// Arguments as for [`pco2_to_fco2`]. Without an equilibrator temperature no
/// temperature correction is applied to the xCO2 estimate.
pub fn fco2_to_pco2(
    fco2_uatm: FloatValue,
    temp_sw_c: FloatValue,
    pres_hpa: Option<FloatValue>,
    temp_eq_c: Option<FloatValue>,
) -> FloatValue {
    let fco2 = fco2_uatm * 1e-6;
    let t_sw = temp_sw_c + ZERO_CELSIUS_K;
    let p_eq = pres_hpa.unwrap_or(STANDARD_PRESSURE_HPA) / STANDARD_PRESSURE_HPA;

    let dt = match temp_eq_c {
        Some(t_eq) => temperature_correction(t_sw, t_eq + ZERO_CELSIUS_K),
        None => 1.0,
    };
    let xco2_eq = fco2 * dt / p_eq;

    fco2 / virial_coeff(t_sw, p_eq, Some(xco2_eq)) * 1e6
}

/// Sea level pressure from a pressure measured at `sensor_height` metres
///
/// Assumes the air between the sensor and the surface has the density of dry air
/// at the given temperature. A negative height converts from sea level to
/// sensor height.
pub fn pressure_height_correction(pres_hpa: FloatValue, temp_c: FloatValue, sensor_height: FloatValue) -> FloatValue {
    const GAS_CONSTANT: FloatValue = 8.314; // J/mol/K
    const AIR_MOLAR_MASS: FloatValue = 0.02897; // kg/mol
    const GRAVITY: FloatValue = 9.8;

    let t = temp_c + ZERO_CELSIUS_K;
    let p = pres_hpa * 100.0;
    let density = p / (GAS_CONSTANT / AIR_MOLAR_MASS * t);
    let h = -sensor_height;

    (p - density * GRAVITY * h) / 100.0
}

/// Field version of [`pco2_to_fco2`]
pub fn pco2_to_fco2_field(
    pco2_uatm: &Field,
    temp_sw_c: &Field,
    pres_hpa: &Field,
    temp_eq_c: Option<&Field>,
) -> SeaFluxResult<Field> {
    match temp_eq_c {
        Some(teq) => map_fields([pco2_uatm, temp_sw_c, pres_hpa, teq], |[c, t, p, te]| {
            pco2_to_fco2(c, t, Some(p), Some(te))
        }),
        None => map_fields([pco2_uatm, temp_sw_c, pres_hpa], |[c, t, p]| {
            pco2_to_fco2(c, t, Some(p), None)
        }),
    }
}

/// Field version of [`fco2_to_pco2`]
pub fn fco2_to_pco2_field(
    fco2_uatm: &Field,
    temp_sw_c: &Field,
    pres_hpa: &Field,
    temp_eq_c: Option<&Field>,
) -> SeaFluxResult<Field> {
    match temp_eq_c {
        Some(teq) => map_fields([fco2_uatm, temp_sw_c, pres_hpa, teq], |[c, t, p, te]| {
            fco2_to_pco2(c, t, Some(p), Some(te))
        }),
        None => map_fields([fco2_uatm, temp_sw_c, pres_hpa], |[c, t, p]| {
            fco2_to_pco2(c, t, Some(p), None)
        }),
    }
}
