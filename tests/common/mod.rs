#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use ploidy::common::config::AppCfg;
use ploidy::data::{Cell, Column, Table};
use ploidy::inference::{Pipeline, Pool};
use ploidy::model::{FsModelRepo, ModelStore};

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Defaults with a small explanation budget so tests stay fast.
pub fn test_cfg() -> AppCfg {
    let mut cfg = AppCfg::default();
    cfg.scaler_path = fixture("scaler.json");
    cfg.classifier_path = fixture("classifier.json");
    cfg.worker_threads = 2;
    cfg.explain.num_samples = 300;
    cfg
}

pub fn load_store(cfg: &AppCfg) -> Arc<ModelStore> {
    let repo = FsModelRepo::new(cfg);
    Arc::new(ModelStore::load(&repo).expect("fixture artefacts load"))
}

pub fn pipeline_with(cfg: &AppCfg) -> Pipeline {
    let pool = Arc::new(Pool::new(cfg.worker_threads).expect("pool"));
    Pipeline::new(load_store(cfg), cfg, pool)
}

pub fn pipeline() -> Pipeline {
    pipeline_with(&test_cfg())
}

pub fn text(values: &[&str]) -> Vec<Cell> {
    values.iter().map(|v| Cell::from_text(v)).collect()
}

pub fn numbers(values: &[f64]) -> Vec<Cell> {
    values.iter().map(|&v| Cell::Number(v)).collect()
}

/// Three complete rows covering every trained feature.
pub fn complete_upload() -> Table {
    Table::new(vec![
        Column::new("Embryo ID", text(&["E1", "E2", "E3"])),
        Column::new("Estagio", text(&["3D", "5D", "d6"])),
        Column::new("Morfo", text(&["3AA", "4BB", "2CC"])),
        Column::new("t2", numbers(&[24.1, 27.9, 31.0])),
        Column::new("t5", numbers(&[48.0, 52.5, 58.0])),
        Column::new("tSB", numbers(&[98.0, 104.0, 110.0])),
    ])
}

pub const CSV_UPLOAD: &str = "\
Embryo ID;Estágio;Morfo;t2;t5;tSB;Ploidia
E1;3D;3AA;24,1;48,0;98,0;Euplóide
E2;5D;4BB;27,9;52,5;104,0;Aneuplóide
E3;6D;2CC;31,0;58,0;110,0;euploide
";
