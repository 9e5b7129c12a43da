//! Zip packaging of a staged tree.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::types::{BuildError, PackageContext, PackageOutput, Packager};

/// Packages a staged tree as `<staged>/../<benchmark>.zip`.
///
/// Entries are written in path order with a fixed timestamp, so the same tree
/// always produces the same archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipPackager;

impl Packager for ZipPackager {
  fn package(&self, ctx: &PackageContext<'_>) -> Result<PackageOutput, BuildError> {
    let parent = ctx.staged.parent().unwrap_or(ctx.staged);
    let archive = parent.join(format!("{}.zip", ctx.benchmark));
    let size = write_zip(ctx.staged, &archive)?;

    info!(archive = %archive.display(), size, "code package created");
    Ok(PackageOutput {
      location: archive,
      size,
      image: None,
    })
  }
}

/// Zip every file below `src` into `dest`. Returns the archive size.
pub fn write_zip(src: &Path, dest: &Path) -> Result<u64, BuildError> {
  let package_err = |message: String| BuildError::Package {
    path: dest.to_path_buf(),
    message,
  };
  let io_err = |source: io::Error| package_err(source.to_string());
  let zip_err = |e: zip::result::ZipError| package_err(e.to_string());

  let file = File::create(dest).map_err(io_err)?;
  let mut zip = ZipWriter::new(file);
  let options = SimpleFileOptions::default()
    .compression_method(CompressionMethod::Deflated)
    .last_modified_time(DateTime::default());

  for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
    let entry = entry.map_err(|e| package_err(e.to_string()))?;
    let name = entry_name(src, entry.path());

    if entry.file_type().is_dir() {
      zip.add_directory(name, options).map_err(zip_err)?;
    } else {
      zip.start_file(name, options.unix_permissions(file_mode(entry.path()))).map_err(zip_err)?;
      let mut input = File::open(entry.path()).map_err(io_err)?;
      io::copy(&mut input, &mut zip).map_err(io_err)?;
    }
  }

  zip.finish().map_err(zip_err)?;
  let size = fs::metadata(dest).map_err(io_err)?.len();
  Ok(size)
}

fn entry_name(root: &Path, path: &Path) -> String {
  let rel: PathBuf = path.strip_prefix(root).unwrap_or(path).to_path_buf();
  rel
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}

/// Keep the executable bit of installed scripts and binaries.
#[cfg(unix)]
fn file_mode(path: &Path) -> u32 {
  use std::os::unix::fs::PermissionsExt;
  fs::metadata(path).map(|m| m.permissions().mode() & 0o777).unwrap_or(0o644)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> u32 {
  0o644
}
