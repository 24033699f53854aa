use anyhow::{Context, Result};
use log::{info, warn};
use std::fs::File;
use std::time::Instant;

mod config;
mod event;
mod geometry;
mod histogram;
mod loader;
mod smearing;
mod stats;
mod vecmath;

use config::AnalysisConfig;
use geometry::DetectorGeometry;
use loader::EventLoader;
use smearing::EnergySmearing;
use stats::{
    efficiency_curve, one_minus_efficiency_curve, purity_left_curve, purity_right_curve,
    EnergyMode, PointEstimate, ThresholdStatistics,
};

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    info!("Starting gamma annihilation analysis...");

    // --- Load Configuration ---
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = AnalysisConfig::load(&config_path)?;
    info!(
        "Detector: R = {} mm, L = {} mm; histograms: {} bins over [0, {}] MeV",
        config.detector.radius_mm,
        config.detector.half_length_mm,
        config.histogram.n_bins,
        config.histogram.e_max_mev
    );

    // --- Load Events ---
    let start_time = Instant::now();
    let mut loader = EventLoader::new();
    let mut events = loader.load(&config.input.events_file, config.input.on_malformed)?;
    info!("Loaded {} events from '{}'.", events.len(), config.input.events_file);

    // --- Geometry Pass ---
    let detector = DetectorGeometry::new(config.detector.radius_mm, config.detector.half_length_mm);
    let mut smearing =
        EnergySmearing::new(config.smearing.resolution_coeff, config.smearing.seed);
    for event in events.iter_mut() {
        detector.process_event(event, &mut smearing);
    }
    let n_passing = events.iter().filter(|e| e.pass_flag()).count();
    info!(
        "Geometry pass complete: {}/{} events reconstructible.",
        n_passing,
        events.len()
    );

    // --- Accumulate Histograms ---
    // Raw and smeared deposits get independent histogram trios, as the
    // original analysis keeps separate smeared plots. Only reconstructible
    // events are counted.
    let mut stats_raw = ThresholdStatistics::new(config.histogram.n_bins, config.histogram.e_max_mev);
    let mut stats_smear =
        ThresholdStatistics::new(config.histogram.n_bins, config.histogram.e_max_mev);
    for event in events.iter().filter(|e| e.pass_flag()) {
        stats_raw.accumulate(event, EnergyMode::Raw);
        stats_smear.accumulate(event, EnergyMode::Smeared);
    }
    let ref_total = stats_raw.h_reference().total();
    if ref_total > 0.0 {
        info!(
            "Ratio 2*(Prompt)/(511keV) = {:.3}",
            2.0 * stats_raw.h_prompt().total() / ref_total
        );
    } else {
        warn!("No reference 511 keV deposits accumulated.");
    }

    // --- Point Estimates ---
    let threshold = config.threshold.energy_mev;
    let pe_raw = stats_raw.point_estimate(threshold);
    let pe_smear = stats_smear.point_estimate(threshold);
    report_point_estimate("NO SMEARING", &pe_raw);
    report_point_estimate("WITH SMEARING", &pe_smear);

    // --- Save Outputs ---
    if config.output.save_histograms {
        write_histograms(&config.output.base_filename, "edep", &stats_raw)?;
        write_histograms(&config.output.base_filename, "edep_smear", &stats_smear)?;
        write_cut_multiplicity(&config.output.base_filename, &stats_raw)?;
    } else {
        info!("Skipping histogram output as per config.");
    }
    if config.output.save_curves {
        write_curves(&config.output.base_filename, "curves", &stats_raw)?;
        write_curves(&config.output.base_filename, "curves_smear", &stats_smear)?;
    } else {
        info!("Skipping curve output as per config.");
    }
    if config.output.save_summary {
        write_summary(&config.output.base_filename, &pe_raw, &pe_smear)?;
    }

    info!(
        "Analysis complete in {:.3} seconds.",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

fn report_point_estimate(label: &str, pe: &PointEstimate) {
    info!("{} (threshold {:.3} MeV):", label, pe.threshold_mev);
    info!("  511keV eff    = {:.2} %", pe.efficiency * 100.0);
    info!("  511keV purity = {:.2} %", pe.purity_reference * 100.0);
    info!("  Prompt purity = {:.2} %", pe.purity_prompt * 100.0);
    if pe.degenerate {
        warn!("  Zero-count denominator encountered; ratios use the defined value 1.");
    }
}

// One CSV per histogram trio: bin edges plus the three category counts.
fn write_histograms(base: &str, tag: &str, stats: &ThresholdStatistics) -> Result<()> {
    let filename = format!("{base}_{tag}.csv");
    let mut writer = csv::Writer::from_path(&filename)
        .with_context(|| format!("Failed to create '{filename}'"))?;
    writer.write_record(["low_edge_mev", "high_edge_mev", "all", "reference_511", "prompt"])?;
    let all = stats.h_all();
    for (i, bin) in all.export().iter().enumerate() {
        writer.write_record(&[
            format!("{:.6}", bin.low_edge),
            format!("{:.6}", bin.high_edge),
            format!("{}", bin.count),
            format!("{}", stats.h_reference().counts()[i]),
            format!("{}", stats.h_prompt().counts()[i]),
        ])?;
    }
    writer.flush()?;
    info!("Histograms saved to {filename}");
    Ok(())
}

fn write_curves(base: &str, tag: &str, stats: &ThresholdStatistics) -> Result<()> {
    let eff = efficiency_curve(stats.h_reference());
    let one_minus_eff = one_minus_efficiency_curve(stats.h_prompt());
    let pur_left = purity_left_curve(stats.h_all(), stats.h_reference())?;
    let pur_right = purity_right_curve(stats.h_all(), stats.h_prompt())?;

    let filename = format!("{base}_{tag}.csv");
    let mut writer = csv::Writer::from_path(&filename)
        .with_context(|| format!("Failed to create '{filename}'"))?;
    writer.write_record([
        "threshold_mev",
        "efficiency_511",
        "one_minus_efficiency_prompt",
        "purity_left_511",
        "purity_right_prompt",
    ])?;
    let h = stats.h_all();
    for i in 0..h.n_bins() {
        writer.write_record(&[
            format!("{:.6}", h.bin_high_edge(i)),
            format!("{}", eff[i]),
            format!("{}", one_minus_eff[i]),
            format!("{}", pur_left[i]),
            format!("{}", pur_right[i]),
        ])?;
    }
    writer.flush()?;
    info!("Threshold curves saved to {filename}");
    Ok(())
}

fn write_cut_multiplicity(base: &str, stats: &ThresholdStatistics) -> Result<()> {
    let filename = format!("{base}_cut_multiplicity.csv");
    let mut writer = csv::Writer::from_path(&filename)
        .with_context(|| format!("Failed to create '{filename}'"))?;
    writer.write_record(["photons_passing", "weighted_events"])?;
    for (n, count) in stats.cut_multiplicity().iter().enumerate() {
        writer.write_record(&[format!("{n}"), format!("{count}")])?;
    }
    writer.flush()?;
    info!("Cut-passing multiplicities saved to {filename}");
    Ok(())
}

fn write_summary(base: &str, pe_raw: &PointEstimate, pe_smear: &PointEstimate) -> Result<()> {
    let filename = format!("{base}_summary.json");
    let file = File::create(&filename)
        .with_context(|| format!("Failed to create '{filename}'"))?;
    serde_json::to_writer_pretty(
        file,
        &serde_json::json!({
            "raw": pe_raw,
            "smeared": pe_smear,
        }),
    )?;
    info!("Point-estimate summary saved to {filename}");
    Ok(())
}
