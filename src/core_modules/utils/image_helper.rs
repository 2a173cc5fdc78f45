// THEORY:
// `image_helper` is the file-system edge of the engine: it turns image files into
// `OwnedRaster`s and `MetricsRecord`s into JSON files. The metric core never touches
// the disk; only the batch driver calls into this module.
//
// Decoding normalizes every input to what the core accepts. Grayscale files become a
// single 8-bit channel, everything else becomes 8-bit RGB. Alpha is dropped and deeper
// sample formats are reduced to 8 bits.

use crate::core_modules::raster::{GRAYSCALE_CHANNELS, OwnedRaster, RGB_CHANNELS};
use crate::error::{Error, Result};
use crate::pipeline::MetricsRecord;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const RECORD_SUFFIX: &str = "_metrics.json";
const RECORD_INDENT: &[u8] = b"    ";

/// Decodes an image file into an 8-bit grayscale or RGB raster.
pub fn load_raster(path: &Path) -> Result<OwnedRaster> {
    let image = image::open(path).map_err(|source| Error::DecodeUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    if image.color().has_color() {
        let rgb = image.to_rgb8();
        Ok(OwnedRaster {
            width: rgb.width(),
            height: rgb.height(),
            channels: RGB_CHANNELS,
            samples: rgb.into_raw(),
        })
    } else {
        let luma = image.to_luma8();
        Ok(OwnedRaster {
            width: luma.width(),
            height: luma.height(),
            channels: GRAYSCALE_CHANNELS,
            samples: luma.into_raw(),
        })
    }
}

/// Label carried into the record: the file name without its directory.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// `<output_dir>/<image stem>_metrics.json`
pub fn record_path(output_dir: &Path, image_path: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| display_name(image_path));
    output_dir.join(format!("{stem}{RECORD_SUFFIX}"))
}

/// `<output_dir>/<image file name>_metrics.json`, for images whose stems collide.
pub fn qualified_record_path(output_dir: &Path, image_path: &Path) -> PathBuf {
    output_dir.join(format!("{}{RECORD_SUFFIX}", display_name(image_path)))
}

/// Writes one record as an indented JSON document, replacing any previous file.
pub fn save_record(record: &MetricsRecord, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| Error::RecordWrite {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }

    let output = File::create(path).map_err(|source| Error::RecordWrite {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(output);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(RECORD_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    record.serialize(&mut serializer)?;
    writer.flush().map_err(|source| Error::RecordWrite {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Reads a record previously written by `save_record`.
pub fn load_record(path: &Path) -> Result<MetricsRecord> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
