//! Reference data for fitting and comparison.
//!
//! Study data lives in per-study CSV files (`<study>_<fig>.csv`) with one row
//! per observation. Rows carry a `label` column identifying the measured
//! series (e.g. `dulaglutide_DUL15`); loading splits the file into one
//! [`DataSet`] per label. Numeric columns are parsed to `f64` (unparsable
//! cells become NaN), constant string columns such as `unit` are kept as
//! attributes.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::DulasimError;

/// Companion columns sharing the unit of a measurement column; converting the
/// measurement converts these as well.
const SPREAD_COLUMNS: [&str; 5] = ["sd", "se", "min", "max", "median"];

#[derive(Debug, Clone)]
pub struct DataSet {
    pub label: String,
    columns: BTreeMap<String, Vec<f64>>,
    attrs: BTreeMap<String, String>,
}

impl DataSet {
    pub fn len(&self) -> usize {
        self.columns.values().next().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column(&self, name: &str) -> Result<&[f64], DulasimError> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| DulasimError::MissingColumn {
                column: name.to_string(),
                dataset: self.label.clone(),
            })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Attribute value (constant string column), e.g. `unit` or `time_unit`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Multiply a measurement column by a conversion factor.
    ///
    /// Spread columns (sd, se, min, max, median) share the unit of the
    /// measurement and are scaled with it.
    pub fn unit_conversion(&mut self, column: &str, factor: f64) -> Result<(), DulasimError> {
        if !self.columns.contains_key(column) {
            return Err(DulasimError::MissingColumn {
                column: column.to_string(),
                dataset: self.label.clone(),
            });
        }
        let mut targets: Vec<&str> = vec![column];
        targets.extend(SPREAD_COLUMNS.iter().filter(|c| self.columns.contains_key(**c)));
        for name in targets {
            if let Some(values) = self.columns.get_mut(name) {
                for v in values.iter_mut() {
                    *v *= factor;
                }
            }
        }
        Ok(())
    }
}

/// Load a study data file and split it into datasets by `label`.
///
/// A missing file is a configuration error, not an IO error; the study id and
/// search path are reported.
pub fn load_datasets(
    id: &str,
    data_path: &Path,
) -> Result<BTreeMap<String, DataSet>, DulasimError> {
    let path = data_path.join(format!("{id}.csv"));
    if !path.is_file() {
        return Err(DulasimError::MissingDataset {
            id: id.to_string(),
            path: data_path.display().to_string(),
        });
    }
    let mut reader = csv::Reader::from_path(&path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let label_idx = headers.iter().position(|h| h == "label").ok_or_else(|| {
        DulasimError::MissingColumn {
            column: "label".to_string(),
            dataset: id.to_string(),
        }
    })?;

    // rows by label, in file order
    let mut grouped: BTreeMap<String, Vec<Vec<String>>> = BTreeMap::new();
    for record in reader.records() {
        let record = record?;
        let fields: Vec<String> = record.iter().map(str::to_string).collect();
        let label = fields
            .get(label_idx)
            .cloned()
            .unwrap_or_default();
        grouped.entry(label).or_default().push(fields);
    }

    let mut dsets = BTreeMap::new();
    for (label, rows) in grouped {
        let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut attrs: BTreeMap<String, String> = BTreeMap::new();
        for (idx, header) in headers.iter().enumerate() {
            if idx == label_idx {
                continue;
            }
            let cells: Vec<&str> = rows
                .iter()
                .map(|r| r.get(idx).map_or("", String::as_str))
                .collect();
            let parsed: Vec<f64> = cells
                .iter()
                .map(|c| c.trim().parse::<f64>().unwrap_or(f64::NAN))
                .collect();
            if parsed.iter().any(|v| !v.is_nan()) || cells.iter().all(|c| c.trim().is_empty()) {
                columns.insert(header.clone(), parsed);
            } else {
                // constant string column kept as attribute
                attrs.insert(header.clone(), cells[0].trim().to_string());
            }
        }
        dsets.insert(
            label.clone(),
            DataSet {
                label,
                columns,
                attrs,
            },
        );
    }
    Ok(dsets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, id: &str, content: &str) {
        let mut f = std::fs::File::create(dir.join(format!("{id}.csv"))).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_grouped_by_label() {
        let dir = std::env::temp_dir().join("dulasim_data_test_load");
        std::fs::create_dir_all(&dir).unwrap();
        write_csv(
            &dir,
            "Study2020_Fig1",
            "label,time,mean,sd,unit\n\
             dulaglutide_DUL15,0,0.0,0.0,ng/ml\n\
             dulaglutide_DUL15,24,35.2,4.1,ng/ml\n\
             bodyweight_DUL15,0,93.8,1.2,kg\n",
        );
        let dsets = load_datasets("Study2020_Fig1", &dir).unwrap();
        assert_eq!(dsets.len(), 2);
        let dul = &dsets["dulaglutide_DUL15"];
        assert_eq!(dul.len(), 2);
        assert_eq!(dul.column("time").unwrap(), &[0.0, 24.0]);
        assert_eq!(dul.attr("unit"), Some("ng/ml"));
    }

    #[test]
    fn test_unit_conversion_scales_spread() {
        let dir = std::env::temp_dir().join("dulasim_data_test_conv");
        std::fs::create_dir_all(&dir).unwrap();
        write_csv(
            &dir,
            "Study2020_Fig2",
            "label,time,mean,sd\nd,0,10.0,2.0\nd,10,20.0,4.0\n",
        );
        let mut dsets = load_datasets("Study2020_Fig2", &dir).unwrap();
        let dset = dsets.get_mut("d").unwrap();
        dset.unit_conversion("mean", 0.5).unwrap();
        assert_eq!(dset.column("mean").unwrap(), &[5.0, 10.0]);
        assert_eq!(dset.column("sd").unwrap(), &[1.0, 2.0]);
        assert_eq!(dset.column("time").unwrap(), &[0.0, 10.0]);
    }

    #[test]
    fn test_missing_dataset() {
        let dir = std::env::temp_dir().join("dulasim_data_test_missing");
        std::fs::create_dir_all(&dir).unwrap();
        let err = load_datasets("NoSuchStudy", &dir).unwrap_err();
        assert!(matches!(err, DulasimError::MissingDataset { .. }));
    }
}
