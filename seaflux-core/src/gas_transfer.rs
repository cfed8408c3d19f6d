//! Gas transfer velocity of CO2
//!
//! The gas transfer velocity (kw) sets how quickly the air-sea concentration
//! difference is removed. All parameterizations here are empirical functions of
//! wind speed, normalised to the Schmidt number of CO2 in seawater, and return
//! kw in cm/hr.
//!
//! Parameterizations are trait objects so that the one in use can be selected
//! from configuration:
//!
//! ```toml
//! [gas_transfer]
//! type = "Wanninkhof2014"
//! coefficient = 0.251
//! schmidt_reference = 660.0
//! ```
//!
//! Quadratic parameterizations are defined on the second moment of the wind,
//! $\langle U^2 \rangle = \bar{U}^2 + \sigma_U^2$, which retains the variability lost
//! when winds are averaged to a coarser grid.

use crate::errors::{SeaFluxError, SeaFluxResult};
use crate::field::{map_fields, scalar, weighted_nan_mean, Field, FloatValue};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Which moment of the wind speed a parameterization expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindMoment {
    /// Wind speed (m/s)
    Speed,
    /// Second moment of the wind speed (m²/s²)
    SecondMoment,
}

/// Schmidt number of CO2 in seawater
///
/// Polynomial of Jähne et al. (1987) as listed in Wanninkhof (2014), with the
/// temperature in °C.
pub fn schmidt_number(temp_c: FloatValue) -> FloatValue {
    let t = temp_c;
    2116.8 - 136.25 * t + 4.7353 * t.powi(2) - 0.092307 * t.powi(3) + 0.0007555 * t.powi(4)
}

/// Second moment of the wind from the mean and standard deviation
pub fn wind_second_moment(mean: FloatValue, stdev: FloatValue) -> FloatValue {
    mean.powi(2) + stdev.powi(2)
}

fn schmidt_scaling(schmidt: FloatValue, reference: FloatValue) -> FloatValue {
    (reference / schmidt).sqrt()
}

/// A wind speed based parameterization of the gas transfer velocity
#[typetag::serde(tag = "type")]
pub trait GasTransferVelocity: Debug + Send + Sync {
    /// Short identifier, e.g. `Wa92`
    fn name(&self) -> &'static str;

    /// The wind moment passed to [`GasTransferVelocity::transfer_velocity`]
    fn wind_moment(&self) -> WindMoment;

    /// Gas transfer velocity (cm/hr)
    ///
    /// `wind` is either the speed or its second moment, depending on
    /// [`GasTransferVelocity::wind_moment`].
    fn transfer_velocity(&self, wind: FloatValue, schmidt: FloatValue) -> FloatValue;
}

/// Liss & Merlivat (1986)
///
/// Three linear regimes (smooth surface, rough surface and breaking waves).
/// The relationship is discontinuous at the regime boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LissMerlivat1986 {
    /// default: 3.6
    pub smooth_limit: FloatValue,
    /// default: 13.0
    pub breaking_limit: FloatValue,
    /// default: 0.17
    pub smooth_slope: FloatValue,
    /// default: 2.8
    pub rough_slope: FloatValue,
    /// default: 3.4
    pub rough_offset: FloatValue,
    /// default: 5.9
    pub breaking_slope: FloatValue,
    /// default: 8.4
    pub breaking_offset: FloatValue,
    /// default: 600
    pub schmidt_reference: FloatValue,
}

impl Default for LissMerlivat1986 {
    fn default() -> Self {
        Self {
            smooth_limit: 3.6,
            breaking_limit: 13.0,
            smooth_slope: 0.17,
            rough_slope: 2.8,
            rough_offset: 3.4,
            breaking_slope: 5.9,
            breaking_offset: 8.4,
            schmidt_reference: 600.0,
        }
    }
}

#[typetag::serde]
impl GasTransferVelocity for LissMerlivat1986 {
    fn name(&self) -> &'static str {
        "Li86"
    }

    fn wind_moment(&self) -> WindMoment {
        WindMoment::Speed
    }

    fn transfer_velocity(&self, wind: FloatValue, schmidt: FloatValue) -> FloatValue {
        let sc = schmidt_scaling(schmidt, self.schmidt_reference);
        if wind <= self.smooth_limit {
            // Schmidt number exponent of -2/3 for a smooth surface
            self.smooth_slope * wind * (schmidt / self.schmidt_reference).powf(-2.0 / 3.0)
        } else if wind < self.breaking_limit {
            (wind - self.rough_offset) * self.rough_slope * sc
        } else {
            (wind - self.breaking_offset) * self.breaking_slope * sc
        }
    }
}

macro_rules! quadratic_parameterization {
    ($(#[$meta:meta])* $name:ident, $code:literal, $coefficient:literal, $reference:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $name {
            /// Quadratic coefficient (cm/hr per m²/s²)
            #[doc = concat!("default: ", stringify!($coefficient))]
            pub coefficient: FloatValue,
            /// Schmidt number the coefficient is normalised to
            #[doc = concat!("default: ", stringify!($reference))]
            pub schmidt_reference: FloatValue,
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    coefficient: $coefficient,
                    schmidt_reference: $reference,
                }
            }
        }

        impl $name {
            pub fn from_parameters(coefficient: FloatValue, schmidt_reference: FloatValue) -> Self {
                Self {
                    coefficient,
                    schmidt_reference,
                }
            }
        }

        #[typetag::serde]
        impl GasTransferVelocity for $name {
            fn name(&self) -> &'static str {
                $code
            }

            fn wind_moment(&self) -> WindMoment {
                WindMoment::SecondMoment
            }

            fn transfer_velocity(&self, wind: FloatValue, schmidt: FloatValue) -> FloatValue {
                self.coefficient * wind * schmidt_scaling(schmidt, self.schmidt_reference)
            }
        }
    };
}

quadratic_parameterization!(
    /// Wanninkhof (1992), using the coefficient for climatological winds
    ///
    /// $$ k_{660} = 0.31 \langle U^2 \rangle $$
    Wanninkhof1992,
    "Wa92",
    0.31,
    660.0
);

quadratic_parameterization!(
    /// Ho et al. (2006), derived for QuikSCAT winds
    ///
    /// $$ k_{600} = 0.266 \langle U^2 \rangle $$
    Ho2006,
    "Ho06",
    0.266,
    600.0
);

quadratic_parameterization!(
    /// Wanninkhof (1992) rescaled by Sweeney et al. (2007) for NCEP/NCAR reanalysis winds
    ///
    /// $$ k_{660} = 0.27 \langle U^2 \rangle $$
    Sweeney2007,
    "Sw07",
    0.27,
    660.0
);

quadratic_parameterization!(
    /// Wanninkhof (2014), derived for CCMP winds
    ///
    /// $$ k_{660} = 0.251 \langle U^2 \rangle $$
    Wanninkhof2014,
    "Wa14",
    0.251,
    660.0
);

/// Wanninkhof & McGillis (1999), for short term in situ winds
///
/// $$ k_{600} = 0.0283 U^3 $$
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WanninkhofMcGillis1999 {
    /// default: 0.0283
    pub cubic: FloatValue,
    /// default: 600
    pub schmidt_reference: FloatValue,
}

impl Default for WanninkhofMcGillis1999 {
    fn default() -> Self {
        Self {
            cubic: 0.0283,
            schmidt_reference: 600.0,
        }
    }
}

#[typetag::serde]
impl GasTransferVelocity for WanninkhofMcGillis1999 {
    fn name(&self) -> &'static str {
        "Wa99"
    }

    fn wind_moment(&self) -> WindMoment {
        WindMoment::Speed
    }

    fn transfer_velocity(&self, wind: FloatValue, schmidt: FloatValue) -> FloatValue {
        self.cubic * wind.powi(3) * schmidt_scaling(schmidt, self.schmidt_reference)
    }
}

/// Nightingale et al. (2000), from dual tracer experiments
///
/// $$ k_{600} = 0.333 U + 0.222 U^2 $$
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Nightingale2000 {
    /// default: 0.333
    pub linear: FloatValue,
    /// default: 0.222
    pub quadratic: FloatValue,
    /// default: 600
    pub schmidt_reference: FloatValue,
}

impl Default for Nightingale2000 {
    fn default() -> Self {
        Self {
            linear: 0.333,
            quadratic: 0.222,
            schmidt_reference: 600.0,
        }
    }
}

#[typetag::serde]
impl GasTransferVelocity for Nightingale2000 {
    fn name(&self) -> &'static str {
        "Ni00"
    }

    fn wind_moment(&self) -> WindMoment {
        WindMoment::Speed
    }

    fn transfer_velocity(&self, wind: FloatValue, schmidt: FloatValue) -> FloatValue {
        (self.linear * wind + self.quadratic * wind.powi(2))
            * schmidt_scaling(schmidt, self.schmidt_reference)
    }
}

/// McGillis et al. (2001), from the GasEx-98 cruise
///
/// $$ k_{660} = 3.3 + 0.026 U^3 $$
///
/// The offset is not normalised by the Schmidt number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McGillis2001 {
    /// default: 3.3
    pub offset: FloatValue,
    /// default: 0.026
    pub cubic: FloatValue,
    /// default: 660
    pub schmidt_reference: FloatValue,
}

impl Default for McGillis2001 {
    fn default() -> Self {
        Self {
            offset: 3.3,
            cubic: 0.026,
            schmidt_reference: 660.0,
        }
    }
}

#[typetag::serde]
impl GasTransferVelocity for McGillis2001 {
    fn name(&self) -> &'static str {
        "Mc01"
    }

    fn wind_moment(&self) -> WindMoment {
        WindMoment::Speed
    }

    fn transfer_velocity(&self, wind: FloatValue, schmidt: FloatValue) -> FloatValue {
        self.offset + self.cubic * wind.powi(3) * schmidt_scaling(schmidt, self.schmidt_reference)
    }
}

/// Wanninkhof et al. (2009), a hybrid with a non-zero intercept
///
/// $$ k_{660} = 3.0 + 0.1 U + 0.064 U^2 + 0.011 U^3 $$
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Wanninkhof2009 {
    /// default: 3.0
    pub offset: FloatValue,
    /// default: 0.1
    pub linear: FloatValue,
    /// default: 0.064
    pub quadratic: FloatValue,
    /// default: 0.011
    pub cubic: FloatValue,
    /// default: 660
    pub schmidt_reference: FloatValue,
}

impl Default for Wanninkhof2009 {
    fn default() -> Self {
        Self {
            offset: 3.0,
            linear: 0.1,
            quadratic: 0.064,
            cubic: 0.011,
            schmidt_reference: 660.0,
        }
    }
}

#[typetag::serde]
impl GasTransferVelocity for Wanninkhof2009 {
    fn name(&self) -> &'static str {
        "Wa09"
    }

    fn wind_moment(&self) -> WindMoment {
        WindMoment::Speed
    }

    fn transfer_velocity(&self, wind: FloatValue, schmidt: FloatValue) -> FloatValue {
        let polynomial =
            self.offset + self.linear * wind + self.quadratic * wind.powi(2) + self.cubic * wind.powi(3);
        polynomial * schmidt_scaling(schmidt, self.schmidt_reference)
    }
}

/// Look up a parameterization with default coefficients by its short name
pub fn from_name(name: &str) -> SeaFluxResult<Box<dyn GasTransferVelocity>> {
    let param: Box<dyn GasTransferVelocity> = match name {
        "Li86" => Box::new(LissMerlivat1986::default()),
        "Wa92" => Box::new(Wanninkhof1992::default()),
        "Wa99" => Box::new(WanninkhofMcGillis1999::default()),
        "Ni00" => Box::new(Nightingale2000::default()),
        "Mc01" => Box::new(McGillis2001::default()),
        "Ho06" => Box::new(Ho2006::default()),
        "Sw07" => Box::new(Sweeney2007::default()),
        "Wa09" => Box::new(Wanninkhof2009::default()),
        "Wa14" => Box::new(Wanninkhof2014::default()),
        _ => {
            return Err(SeaFluxError::InvalidParameter {
                name: "gas_transfer".to_string(),
                reason: format!("unknown parameterization {:?}", name),
            })
        }
    };
    Ok(param)
}

/// Gas transfer velocity over a field
///
/// The wind standard deviation only contributes to parameterizations defined on
/// the second moment, where it defaults to zero.
pub fn transfer_velocity(
    param: &dyn GasTransferVelocity,
    wind_mean: &Field,
    wind_stdev: Option<&Field>,
    temp_c: &Field,
) -> SeaFluxResult<Field> {
    let zero = scalar(0.0);
    let stdev = wind_stdev.unwrap_or(&zero);

    map_fields([wind_mean, stdev, temp_c], |[u, s, t]| {
        let wind = match param.wind_moment() {
            WindMoment::Speed => u,
            WindMoment::SecondMoment => wind_second_moment(u, s),
        };
        param.transfer_velocity(wind, schmidt_number(t))
    })
}

/// A transfer velocity scaled to a global target, with the scaling factor used
#[derive(Debug, Clone)]
pub struct ScaledTransferVelocity {
    /// cm/hr
    pub kw: Field,
    pub alpha: FloatValue,
}

fn round_to(value: FloatValue, decimals: i32) -> FloatValue {
    let factor = (10.0 as FloatValue).powi(decimals);
    (value * factor).round() / factor
}

/// Quadratic gas transfer velocity scaled to the bomb-14C inventory
///
/// The coefficient $\alpha$ of
///
/// $$ k_w = \alpha \langle U^2 \rangle \left(\frac{Sc}{660}\right)^{-0.5} $$
///
/// is chosen so that the ice-free weighted mean of kw equals `target` (cm/hr;
/// 16 in Wanninkhof 2014, 14.6 in Sweeney et al. 2007). The weights are
/// `1 - ice`, with missing ice treated as open water and cells with missing wind
/// or temperature given zero weight. Because of the weighting, the plain mean of
/// the returned kw will not equal the target. $\alpha$ is rounded to four decimals.
///
/// The returned kw uses the same second moment $\alpha$ was fitted on, so the
/// wind variability from `wind_stdev` also enters kw.
pub fn scaled_quadratic(
    wind_mean: &Field,
    wind_stdev: Option<&Field>,
    temp_c: &Field,
    ice: Option<&Field>,
    target: FloatValue,
) -> SeaFluxResult<ScaledTransferVelocity> {
    let zero = scalar(0.0);
    let stdev = wind_stdev.unwrap_or(&zero);
    let ice = ice.unwrap_or(&zero);

    let unscaled = map_fields([wind_mean, stdev, temp_c], |[u, s, t]| {
        wind_second_moment(u, s) * schmidt_scaling(schmidt_number(t), 660.0)
    })?;
    let weights = map_fields([&unscaled, ice], |[k, i]| {
        if k.is_nan() {
            0.0
        } else if i.is_nan() {
            1.0
        } else {
            1.0 - i
        }
    })?;

    let mean = weighted_nan_mean(unscaled.iter(), weights.iter());
    if !mean.is_finite() || mean == 0.0 {
        return Err(SeaFluxError::Error(
            "No ice-free cells with valid wind and temperature to scale the transfer velocity".to_string(),
        ));
    }

    let alpha = round_to(target / mean, 4);
    Ok(ScaledTransferVelocity {
        kw: unscaled.mapv(|k| alpha * k),
        alpha,
    })
}

/// Scale any transfer velocity field so that its weighted mean equals `target`
///
/// Returns the rescaled field and the factor applied. Without weights all valid
/// cells count equally.
pub fn rescale_to_mean(kw: &Field, target: FloatValue, weights: Option<&Field>) -> SeaFluxResult<(Field, FloatValue)> {
    let one = scalar(1.0);
    let weights = weights.unwrap_or(&one);
    let weights = weights
        .broadcast(kw.shape())
        .ok_or_else(|| SeaFluxError::ShapeMismatch {
            left: kw.shape().to_vec(),
            right: weights.shape().to_vec(),
        })?;

    let mean = weighted_nan_mean(kw.iter(), weights.iter());
    if !mean.is_finite() || mean == 0.0 {
        return Err(SeaFluxError::Error(
            "Cannot rescale a transfer velocity without valid values".to_string(),
        ));
    }

    let factor = target / mean;
    Ok((kw.mapv(|k| k * factor), factor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    fn all_parameterizations() -> Vec<Box<dyn GasTransferVelocity>> {
        ["Li86", "Wa92", "Wa99", "Ni00", "Mc01", "Ho06", "Sw07", "Wa09", "Wa14"]
            .iter()
            .map(|name| from_name(name).unwrap())
            .collect()
    }

    #[test]
    fn schmidt_number_reference() {
        let sc = schmidt_number(20.0);
        assert!((sc - 668.344).abs() < 1e-9, "Expected 668.344, got {}", sc);
    }

    #[test]
    fn names_round_trip() {
        for param in all_parameterizations() {
            assert_eq!(from_name(param.name()).unwrap().name(), param.name());
        }
        assert!(from_name("Xx00").is_err());
    }

    #[test]
    fn wanninkhof1992_at_reference_schmidt() {
        let kw = Wanninkhof1992::default().transfer_velocity(100.0, 660.0);
        assert!((kw - 31.0).abs() < 1e-12);
    }

    #[test]
    fn monotonic_with_wind_speed() {
        let sc = schmidt_number(15.0);
        for param in all_parameterizations() {
            // Liss & Merlivat drops at its regime boundaries
            if param.name() == "Li86" {
                continue;
            }
            let mut previous = FloatValue::NEG_INFINITY;
            for i in 1..=40 {
                let u = i as FloatValue * 0.5;
                let wind = match param.wind_moment() {
                    WindMoment::Speed => u,
                    WindMoment::SecondMoment => u * u,
                };
                let kw = param.transfer_velocity(wind, sc);
                assert!(kw > previous, "{} not increasing at {} m/s", param.name(), u);
                previous = kw;
            }
        }
    }

    #[test]
    fn liss_merlivat_regimes() {
        let param = LissMerlivat1986::default();
        let sc = 600.0;
        assert!((param.transfer_velocity(2.0, sc) - 0.34).abs() < 1e-12);
        assert!((param.transfer_velocity(5.0, sc) - 1.6 * 2.8).abs() < 1e-12);
        assert!((param.transfer_velocity(15.0, sc) - 6.6 * 5.9).abs() < 1e-12);
    }

    #[test]
    fn warmer_water_exchanges_faster() {
        for param in all_parameterizations() {
            let cold = param.transfer_velocity(49.0, schmidt_number(2.0));
            let warm = param.transfer_velocity(49.0, schmidt_number(25.0));
            assert!(warm > cold, "{}: {} <= {}", param.name(), warm, cold);
        }
    }

    #[test]
    fn field_uses_second_moment() {
        let wind = array![5.0, 10.0].into_dyn();
        let stdev = array![1.0, 2.0].into_dyn();
        let temp = scalar(20.0);
        let param = Wanninkhof2014::default();

        let kw = transfer_velocity(&param, &wind, Some(&stdev), &temp).unwrap();
        let expected = param.transfer_velocity(26.0, 668.344);
        assert!((kw[0] - expected).abs() < 1e-9);

        let kw_no_stdev = transfer_velocity(&param, &wind, None, &temp).unwrap();
        assert!(kw_no_stdev[1] < kw[1]);

        // wind speed parameterizations ignore the standard deviation
        let cubic = WanninkhofMcGillis1999::default();
        let a = transfer_velocity(&cubic, &wind, Some(&stdev), &temp).unwrap();
        let b = transfer_velocity(&cubic, &wind, None, &temp).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn scaled_quadratic_hits_target() {
        let wind = Array1::linspace(2.0, 14.0, 25).into_dyn();
        let temp = Array1::linspace(-1.0, 29.0, 25).into_dyn();

        let scaled = scaled_quadratic(&wind, None, &temp, None, 16.0).unwrap();
        let mean = crate::field::nan_mean(scaled.kw.iter());
        // alpha is rounded to four decimals
        assert!((mean - 16.0).abs() < 0.01, "mean kw {}", mean);
        assert!(scaled.alpha > 0.1 && scaled.alpha < 0.5, "alpha {}", scaled.alpha);
    }

    #[test]
    fn scaled_quadratic_uses_second_moment() {
        let wind = Array1::linspace(2.0, 14.0, 25).into_dyn();
        let temp = Array1::from_elem(25, 20.0).into_dyn();
        let stdev = Array1::from_elem(25, 2.0).into_dyn();

        let scaled = scaled_quadratic(&wind, Some(&stdev), &temp, None, 16.0).unwrap();
        let mean = crate::field::nan_mean(scaled.kw.iter());
        assert!((mean - 16.0).abs() < 0.01, "mean kw {}", mean);

        let sc = schmidt_scaling(schmidt_number(20.0), 660.0);
        let expected = scaled.alpha * (2.0 * 2.0 + 2.0 * 2.0) * sc;
        assert!((scaled.kw[0] - expected).abs() < 1e-12, "{} {}", scaled.kw[0], expected);
    }

    #[test]
    fn scaled_quadratic_ignores_ice_covered_cells() {
        let wind = array![5.0, 10.0, 30.0].into_dyn();
        let temp = array![10.0, 10.0, 10.0].into_dyn();
        let ice = array![0.0, 0.0, 1.0].into_dyn();

        let with_ice = scaled_quadratic(&wind, None, &temp, Some(&ice), 16.0).unwrap();
        let open = scaled_quadratic(
            &array![5.0, 10.0].into_dyn(),
            None,
            &array![10.0, 10.0].into_dyn(),
            None,
            16.0,
        )
        .unwrap();
        assert_eq!(with_ice.alpha, open.alpha);
    }

    #[test]
    fn scaled_quadratic_without_valid_cells_errors() {
        let wind = array![f64::NAN, f64::NAN].into_dyn();
        let temp = array![10.0, 10.0].into_dyn();
        assert!(scaled_quadratic(&wind, None, &temp, None, 16.0).is_err());
    }

    #[test]
    fn rescale_matches_target_mean() {
        let kw = array![10.0, 20.0, f64::NAN, 30.0].into_dyn();
        let (scaled, factor) = rescale_to_mean(&kw, 16.0, None).unwrap();
        assert!((factor - 0.8).abs() < 1e-12);
        assert!((scaled[1] - 16.0).abs() < 1e-12);
        assert!(scaled[2].is_nan());

        let weights = array![1.0, 0.0, 1.0, 0.0].into_dyn();
        let (_, factor) = rescale_to_mean(&kw, 16.0, Some(&weights)).unwrap();
        assert!((factor - 1.6).abs() < 1e-12);
    }

    #[test]
    fn serialise_trait_object() {
        let param: Box<dyn GasTransferVelocity> = Box::new(Nightingale2000::default());
        let json = serde_json::to_string(&param).unwrap();
        assert_eq!(
            json,
            r#"{"type":"Nightingale2000","linear":0.333,"quadratic":0.222,"schmidt_reference":600.0}"#
        );

        let restored: Box<dyn GasTransferVelocity> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.name(), "Ni00");
    }
}
