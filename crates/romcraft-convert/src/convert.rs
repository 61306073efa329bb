//! Reading and writing tool definitions, dispatched by file extension.

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use romcraft::ndi::ToolDefinition;

use crate::{atracsys, saw};

/// Marker geometry shared by every supported format.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkerTool {
    pub id: Option<i64>,
    pub markers: Vec<[f64; 3]>,
    pub pivot: Option<[f64; 3]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// NDI tool definition ROM.
    Rom,
    /// SAW JSON.
    Saw,
    /// Atracsys INI.
    Atracsys,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("rom") => Ok(Format::Rom),
            Some("json") => Ok(Format::Saw),
            Some("ini") => Ok(Format::Atracsys),
            _ => bail!(
                "{}: only NDI .rom, Atracsys .ini, and SAW .json formats are supported",
                path.display()
            ),
        }
    }
}

/// Stamp written into the header of new `.rom` files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomStamp {
    pub date: NaiveDate,
    pub sequence_number: u16,
}

impl Default for RomStamp {
    fn default() -> Self {
        RomStamp {
            date: Local::now().date_naive(),
            sequence_number: 0,
        }
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

pub fn read_rom(path: &Path) -> Result<ToolDefinition> {
    let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let tool = ToolDefinition::decode(&data)
        .with_context(|| format!("{} is not a valid NDI tool definition", path.display()))?;

    if !ToolDefinition::verify_checksum(&data)? {
        tracing::warn!(path = %path.display(), "stored checksum does not match contents");
    }

    Ok(tool)
}

pub fn read(path: &Path) -> Result<MarkerTool> {
    let format = Format::from_path(path)?;
    tracing::debug!(path = %path.display(), ?format, "reading tool");

    match format {
        Format::Rom => {
            let tool = read_rom(path)?;
            Ok(MarkerTool {
                id: None,
                markers: tool.geometry.markers,
                pivot: None,
            })
        }
        Format::Saw => saw::parse(&read_text(path)?)
            .with_context(|| format!("failed to parse {}", path.display())),
        Format::Atracsys => atracsys::parse(&read_text(path)?)
            .with_context(|| format!("failed to parse {}", path.display())),
    }
}

/// Builds the ROM for `tool`. ROMs have no pivot, so markers are re-centred on it.
pub fn to_rom(tool: &MarkerTool, stamp: RomStamp) -> ToolDefinition {
    let mut rom = ToolDefinition::default();
    rom.header.date = stamp.date;
    rom.header.sequence_number = stamp.sequence_number;
    rom.geometry.markers = tool.markers.clone();

    if let Some([px, py, pz]) = tool.pivot {
        tracing::info!(
            "NDI .rom format doesn't support pivot, centering coordinate system on pivot instead"
        );
        for [x, y, z] in &mut rom.geometry.markers {
            *x -= px;
            *y -= py;
            *z -= pz;
        }
    }

    rom
}

pub fn write(tool: &MarkerTool, path: &Path, stamp: RomStamp) -> Result<()> {
    let format = Format::from_path(path)?;
    tracing::debug!(path = %path.display(), ?format, markers = tool.markers.len(), "writing tool");

    match format {
        Format::Rom => {
            let data = to_rom(tool, stamp)
                .encode()
                .context("failed to encode NDI tool definition")?;
            write_file(path, data)
        }
        Format::Saw => write_file(path, saw::render(tool)?),
        Format::Atracsys => write_file(path, atracsys::render(tool)),
    }
}

/// The complete decoded `.rom` as pretty JSON.
pub fn dump(path: &Path) -> Result<String> {
    if Format::from_path(path)? != Format::Rom {
        bail!("--dump needs an NDI .rom input, got {}", path.display());
    }

    let tool = read_rom(path)?;
    Ok(serde_json::to_string_pretty(&tool)?)
}
