//! End-to-end runs of a TOML-configured pipeline.

use approx::assert_relative_eq;
use ndarray::Array3;
use seaflux_core::area::LatLonGrid;
use seaflux_core::atmospheric::{MblRecord, MBL_NODES};
use seaflux_core::config::{FluxConfig, FluxMethod};
use seaflux_core::errors::SeaFluxError;
use seaflux_core::field::{nan_mean, scalar, FloatValue};
use seaflux_core::filling::{fill_missing, scaled_climatology};
use seaflux_core::pipeline::{AtmosphericCo2, BulkFluxPipeline, FluxInputs};
use std::fmt::Write;

const CONFIG: &str = r#"
bomb_scaling = 16.0
lat_interpolation = "linear"

[gas_transfer]
type = "Wanninkhof2014"
coefficient = 0.251
schmidt_reference = 660.0

[checks]
action = "raise"
"#;

/// Synthetic MBL file rising by 2 ppm/yr from 400 ppm with a small north-south gradient
fn mbl_text(times: &[FloatValue]) -> String {
    let mut text = String::new();
    writeln!(text, "# MBL reference CO2 SURFACE data").unwrap();
    for t in times {
        write!(text, "{:.6}", t).unwrap();
        for node in 0..MBL_NODES {
            write!(text, " {:.4} 0.1000", 400.0 + (t - 2020.0) * 2.0 + node as f64 * 0.1).unwrap();
        }
        writeln!(text).unwrap();
    }
    text
}

fn inputs(grid: &LatLonGrid, atmosphere: AtmosphericCo2, pco2_sea: FloatValue) -> FluxInputs {
    let (n_lat, n_lon) = grid.shape();
    let shape = (2, n_lat, n_lon);
    FluxInputs {
        temp_c: Array3::from_shape_fn(shape, |(_, i, _)| 27.0 - grid.lat[i].abs() / 3.0).into_dyn(),
        salinity: scalar(34.5),
        pco2_sea: scalar(pco2_sea),
        atmosphere,
        pres_hpa: scalar(1013.25),
        wind_ms: Array3::from_shape_fn(shape, |(t, i, _)| 4.0 + t as f64 + grid.lat[i].abs() / 10.0).into_dyn(),
        wind_stdev: Some(scalar(1.5)),
        ice: None,
    }
}

#[test]
fn test_mbl_driven_run() {
    let grid = LatLonGrid::regular(15.0).unwrap();
    let record = MblRecord::parse(&mbl_text(&[2019.5, 2020.0, 2020.5, 2021.0]))
        .unwrap()
        .reindex_nearest(&[2020.0, 2020.5])
        .unwrap();
    let pipeline = BulkFluxPipeline::from_toml_str(CONFIG).unwrap();
    let output = pipeline
        .run(&inputs(&grid, AtmosphericCo2::Mbl(record), 360.0), &grid)
        .unwrap();

    assert_eq!(output.fgco2.shape(), &[2, 12, 24]);
    // water vapour lowers pCO2 below the dry mole fraction
    assert!(output.pco2_air.iter().all(|p| *p > 380.0 && *p < 405.0));
    // later step has higher atmospheric CO2
    assert!(output.pco2_air[[1, 6, 0]] > output.pco2_air[[0, 6, 0]]);

    assert_relative_eq!(nan_mean(output.kw.iter()), 16.0, epsilon = 0.05);
    assert!(output.kw_scaling.is_some());

    assert!(output.fgco2.iter().all(|f| *f < 0.0));
    let pg = output.integral.petagrams_per_year();
    assert_eq!(pg.len(), 2);
    assert!(pg.iter().all(|p| *p < 0.0));
}

#[test]
fn test_gap_filled_run_in_extended_year() {
    let grid = LatLonGrid::regular(15.0).unwrap();
    let (n_lat, n_lon) = grid.shape();
    let months: Vec<FloatValue> = (2019..2021)
        .flat_map(|y| (0..12).map(move |m| y as FloatValue + (m as FloatValue + 0.5) / 12.0))
        .collect();
    let record = MblRecord::parse(&mbl_text(&months))
        .unwrap()
        .extend_year(12)
        .unwrap();
    assert_eq!(record.times.len(), 36);
    let record = record.reindex_nearest(&record.times[24..26]).unwrap();

    // the product misses the polar bands, the climatology is 10 µatm lower everywhere
    let reference = Array3::from_shape_fn((2, n_lat, n_lon), |(_, i, _)| {
        if grid.lat[i].abs() > 60.0 {
            FloatValue::NAN
        } else {
            360.0
        }
    })
    .into_dyn();
    let climatology = Array3::from_elem((2, n_lat, n_lon), 350.0).into_dyn();
    let scaled = scaled_climatology(&reference, &climatology, &grid.area().unwrap()).unwrap();
    assert_relative_eq!(scaled.scaling_factor[0], 360.0 / 350.0, epsilon = 1e-12);
    let filled = fill_missing(&reference, &scaled.filler).unwrap();

    let pipeline = BulkFluxPipeline::from_toml_str(CONFIG).unwrap();
    let mut gappy = inputs(&grid, AtmosphericCo2::Mbl(record.clone()), 360.0);
    gappy.pco2_sea = reference;
    let mut complete = inputs(&grid, AtmosphericCo2::Mbl(record), 360.0);
    complete.pco2_sea = filled;

    let gappy = pipeline.run(&gappy, &grid).unwrap();
    let complete = pipeline.run(&complete, &grid).unwrap();

    assert!(gappy.fgco2.iter().any(|f| f.is_nan()));
    assert!(complete.fgco2.iter().all(|f| f.is_finite() && *f < 0.0));
    for (full, partial) in complete
        .integral
        .petagrams_per_year()
        .iter()
        .zip(gappy.integral.petagrams_per_year())
    {
        assert!(*full < partial, "{} {}", full, partial);
    }
}

#[test]
fn test_woolf_method_from_config() {
    let config = FluxConfig::from_toml_str(
        r#"
method = "woolf2016"

[gas_transfer]
type = "Wanninkhof2014"
"#,
    )
    .unwrap();
    assert_eq!(config.method, FluxMethod::Woolf2016);

    let grid = LatLonGrid::regular(30.0).unwrap();
    let bulk = BulkFluxPipeline::default()
        .run(&inputs(&grid, AtmosphericCo2::Pco2(scalar(400.0)), 400.0), &grid)
        .unwrap();
    let woolf = BulkFluxPipeline::new(config)
        .run(&inputs(&grid, AtmosphericCo2::Pco2(scalar(400.0)), 400.0), &grid)
        .unwrap();

    // no gradient: bulk flux is zero but the cool skin still takes up CO2
    assert!(bulk.fgco2.iter().all(|f| *f == 0.0));
    assert!(woolf.fgco2.iter().all(|f| *f < 0.0));
}

#[test]
fn test_config_file() {
    let path = std::env::temp_dir().join(format!("seaflux-config-{}.toml", std::process::id()));
    std::fs::write(&path, CONFIG).unwrap();
    let config = FluxConfig::from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.gas_transfer.name(), "Wa14");
    let text = config.to_toml_string().unwrap();
    let restored = FluxConfig::from_toml_str(&text).unwrap();
    assert_eq!(restored.gas_transfer.name(), "Wa14");
    assert_eq!(restored.bomb_scaling, Some(16.0));
}

#[test]
fn test_raise_on_pressure_in_pascal() {
    let grid = LatLonGrid::regular(30.0).unwrap();
    let mut inputs = inputs(&grid, AtmosphericCo2::Xco2(scalar(410.0)), 360.0);
    inputs.pres_hpa = Array3::from_elem((2, 6, 12), 101325.0).into_dyn();

    let result = BulkFluxPipeline::from_toml_str(CONFIG).unwrap().run(&inputs, &grid);
    assert!(matches!(result, Err(SeaFluxError::OutOfRange { .. })));
}
