//! Trace-file I/O
//!
//! Trace frames travel between processes as NetCDF-4 (HDF5) container
//! files holding three variables, `values` (time by locus measurements),
//! `time` (UTC nanosecond timestamps) and `locus` (sensor positions),
//! with free-form metadata stored as global attributes.

use crate::errors::{DasError, Result};
use crate::frame::TraceFrame;
use log::warn;
use ndarray::{Array1, Array2};
use netcdf::AttributeValue;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A single metadata attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Str(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Str(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

/// Free-form metadata stored alongside a trace frame
pub type Metadata = HashMap<String, MetaValue>;

/// Writes a trace frame and its metadata to a trace file.
///
/// Parent directories are created as needed and an existing file at the
/// path is replaced.
pub fn write_trace(path: &Path, frame: &TraceFrame, metadata: &Metadata) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    if path.exists() {
        fs::remove_file(path)?;
    }

    let mut file = netcdf::create(path)?;

    file.add_dimension("time", frame.nrows())?;
    file.add_dimension("locus", frame.ncols())?;

    let mut time_var = file.add_variable::<i64>("time", &["time"])?;
    time_var.put_attribute("units", "nanoseconds since 1970-01-01 00:00:00 UTC")?;
    let index = Array1::from(frame.index().to_vec());
    time_var.put(index.view(), ..)?;

    let mut locus_var = file.add_variable::<i64>("locus", &["locus"])?;
    let loci = Array1::from(frame.loci().to_vec());
    locus_var.put(loci.view(), ..)?;

    let mut values_var = file.add_variable::<f64>("values", &["time", "locus"])?;
    values_var.put(frame.values().view(), ..)?;

    for (name, value) in metadata {
        match value {
            MetaValue::Str(v) => file.add_attribute(name, v.as_str())?,
            MetaValue::Int(v) => file.add_attribute(name, *v)?,
            MetaValue::Float(v) => file.add_attribute(name, *v)?,
        };
    }

    Ok(())
}

/// Reads a trace frame and its metadata from a trace file.
pub fn read_trace(path: &Path) -> Result<(TraceFrame, Metadata)> {
    let file = netcdf::open(path)?;

    let index: Vec<i64> = required_variable(&file, "time")?.get_values::<i64, _>(..)?;
    let loci: Vec<i64> = required_variable(&file, "locus")?.get_values::<i64, _>(..)?;

    let values_var = required_variable(&file, "values")?;
    let flat: Vec<f64> = values_var.get_values::<f64, _>(..)?;
    let values = Array2::from_shape_vec((index.len(), loci.len()), flat)?;

    let frame = TraceFrame::new(index, loci, values)?;
    Ok((frame, read_attributes(&file)?))
}

/// Reads only the metadata from a trace file.
pub fn read_trace_metadata(path: &Path) -> Result<Metadata> {
    let file = netcdf::open(path)?;
    read_attributes(&file)
}

fn required_variable<'f>(file: &'f netcdf::File, name: &str) -> Result<netcdf::Variable<'f>> {
    file.variable(name).ok_or_else(|| DasError::VariableNotFound {
        var: name.to_string(),
    })
}

fn read_attributes(file: &netcdf::File) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for attr in file.attributes() {
        let value = match attr.value()? {
            AttributeValue::Str(v) => MetaValue::Str(v),
            AttributeValue::Uchar(v) => MetaValue::Int(v as i64),
            AttributeValue::Schar(v) => MetaValue::Int(v as i64),
            AttributeValue::Ushort(v) => MetaValue::Int(v as i64),
            AttributeValue::Short(v) => MetaValue::Int(v as i64),
            AttributeValue::Uint(v) => MetaValue::Int(v as i64),
            AttributeValue::Int(v) => MetaValue::Int(v as i64),
            AttributeValue::Longlong(v) => MetaValue::Int(v),
            AttributeValue::Float(v) => MetaValue::Float(v as f64),
            AttributeValue::Double(v) => MetaValue::Float(v),
            other => {
                warn!(
                    "Skipped attribute '{}' with unsupported type {:?}",
                    attr.name(),
                    other
                );
                continue;
            }
        };
        metadata.insert(attr.name().to_string(), value);
    }
    Ok(metadata)
}

/// Retrieves all file paths in the given folder and its subfolders.
///
/// Directories are walked depth-first in name order; only files appear in
/// the result.
pub fn list_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    visit(folder, &mut files)?;
    Ok(files)
}

fn visit(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            visit(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}
