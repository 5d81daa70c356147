#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use histkit::data::{write_json, write_parquet, BinAxis, StoredHistogram};
use histkit::source::{BinnedHistogram, DataFile, FileOpener};
use histkit::{HistFileOpener, Result};

/// Open/close bookkeeping shared between a [`CountingOpener`] and its files.
#[derive(Debug, Default)]
pub struct Ledger {
    pub opened: Vec<PathBuf>,
    pub closed: Vec<PathBuf>,
}

/// Wraps the real opener and records every open and close.
#[derive(Default, Clone)]
pub struct CountingOpener {
    pub ledger: Rc<RefCell<Ledger>>,
}

impl CountingOpener {
    pub fn opened(&self) -> usize {
        self.ledger.borrow().opened.len()
    }

    pub fn closed(&self) -> usize {
        self.ledger.borrow().closed.len()
    }

    /// Every opened file was closed exactly once.
    pub fn balanced(&self) -> bool {
        let ledger = self.ledger.borrow();
        let mut opened = ledger.opened.clone();
        let mut closed = ledger.closed.clone();
        opened.sort();
        closed.sort();
        opened == closed
    }
}

struct CountedFile {
    inner: Box<dyn DataFile>,
    ledger: Rc<RefCell<Ledger>>,
}

impl DataFile for CountedFile {
    fn path(&self) -> &Path {
        self.inner.path()
    }

    fn is_valid(&self) -> bool {
        self.inner.is_valid()
    }

    fn get(&self, name: &str) -> Option<&dyn BinnedHistogram> {
        self.inner.get(name)
    }

    fn keys(&self) -> Vec<&str> {
        self.inner.keys()
    }

    fn close(&mut self) {
        self.inner.close();
        self.ledger.borrow_mut().closed.push(self.inner.path().to_path_buf());
    }
}

impl FileOpener for CountingOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn DataFile>> {
        let inner = HistFileOpener.open(path)?;
        self.ledger.borrow_mut().opened.push(path.to_path_buf());
        Ok(Box::new(CountedFile {
            inner,
            ledger: Rc::clone(&self.ledger),
        }))
    }
}

pub fn energy_hist(scale: f64) -> StoredHistogram {
    let axis = BinAxis::uniform(5, 0.0, 5.0).unwrap();
    let values: Vec<f64> = (1..=5).map(|i| scale * i as f64).collect();
    StoredHistogram::from_bins("ENeutron", vec![axis], &values, None).unwrap()
}

pub fn hit_map() -> StoredHistogram {
    let x = BinAxis::uniform(3, -1.5, 1.5).unwrap();
    let y = BinAxis::uniform(2, 0.0, 2.0).unwrap();
    StoredHistogram::from_bins("HitMap", vec![x, y], &[1.0, 0.0, 2.0, 3.0, 0.0, 4.0], None).unwrap()
}

pub fn cube() -> StoredHistogram {
    let axis = BinAxis::uniform(2, 0.0, 1.0).unwrap();
    StoredHistogram::from_bins("ENeutron", vec![axis.clone(), axis.clone(), axis], &[1.0; 8], None)
        .unwrap()
}

pub fn json_file(dir: &Path, name: &str, histograms: &[StoredHistogram]) -> PathBuf {
    let path = dir.join(name);
    write_json(&path, histograms).unwrap();
    path
}

pub fn parquet_file(dir: &Path, name: &str, histograms: &[StoredHistogram]) -> PathBuf {
    let path = dir.join(name);
    write_parquet(&path, histograms).unwrap();
    path
}
