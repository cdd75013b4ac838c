use crate::evaluator::EvaluationResult;
use crate::optimizer::{OptimizationTrial, SampledRatios};
use anyhow::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct CsvWriter {
    w: BufWriter<File>,
}

fn ratios(r: Option<SampledRatios>) -> String {
    match r {
        Some(r) => format!("{:.6},{:.6}", r.depth_ratio, r.wavelength_ratio),
        None => ",".to_string(),
    }
}

fn opt(v: Option<f64>) -> String {
    v.map(|v| format!("{:.4}", v)).unwrap_or_default()
}

/// RFC 4180 quoting for free-text fields.
fn field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// JSON bundle path next to a CSV output. Never equal to `out_path`.
pub fn json_path(out_path: &str) -> PathBuf {
    let path = Path::new(out_path);
    match path.extension() {
        Some(ext) if ext == "json" => path.with_extension("bundle.json"),
        _ => path.with_extension("json"),
    }
}

impl CsvWriter {
    pub fn create(path: &str) -> Result<Self> {
        let f = File::create(path)?;
        Ok(Self { w: BufWriter::new(f) })
    }

    pub fn write_header(&mut self) -> Result<()> {
        writeln!(
            self.w,
            "design,blade_count,features,total_spl_db,broadband_db,tonal_db,vortex_db,bio_reduction_db,thrust_n,power_w,efficiency,ntr,acoustic_efficiency,reduction_pct,meets_target"
        )?;
        Ok(())
    }

    pub fn write_row(&mut self, design: &str, eval: &EvaluationResult) -> Result<()> {
        let features: Vec<&str> = eval.features.iter().map(|k| k.name()).collect();
        let meets = match eval.metrics.meets_target {
            Some(true) => "true",
            Some(false) => "false",
            None => "",
        };
        writeln!(
            self.w,
            "{},{},{},{:.4},{:.4},{:.4},{:.4},{},{:.6},{:.4},{:.6},{:.6},{:.6},{},{}",
            field(design),
            eval.geometry.blade_count,
            features.join(";"),
            eval.noise.total_spl_db,
            eval.noise.broadband_spl_db,
            eval.noise.tonal_spl_db,
            eval.noise.vortex_spl_db,
            opt(eval.noise.bio_reduction_db),
            eval.thrust.thrust_n,
            eval.thrust.power_w,
            eval.thrust.efficiency,
            eval.metrics.ntr,
            eval.metrics.acoustic_efficiency,
            opt(eval.metrics.reduction_pct),
            meets
        )?;
        Ok(())
    }

    pub fn write_trial_header(&mut self) -> Result<()> {
        writeln!(
            self.w,
            "iteration,score,ntr,serration_depth,serration_wavelength,tubercle_amplitude,tubercle_wavelength,corrugation_depth,corrugation_wavelength"
        )?;
        Ok(())
    }

    pub fn write_trial(&mut self, trial: &OptimizationTrial) -> Result<()> {
        writeln!(
            self.w,
            "{},{:.6},{:.6},{},{},{}",
            trial.iteration,
            trial.score,
            trial.ntr,
            ratios(trial.params.serration),
            ratios(trial.params.tubercle),
            ratios(trial.params.corrugation)
        )?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.w.flush()?;
        Ok(())
    }
}
