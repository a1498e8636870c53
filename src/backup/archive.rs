// ABOUTME: Gzip tar archives for application data directories.
// ABOUTME: Entries are stored under the directory's project-relative name.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io;
use std::path::Path;

/// Archive `source` into `dest`, with entries prefixed by `name`.
pub fn pack(source: &Path, name: &Path, dest: &Path) -> io::Result<()> {
    let file = File::create(dest)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    builder.append_dir_all(name, source)?;
    builder.into_inner()?.finish()?;
    Ok(())
}

/// Extract `archive` into `dest`, overwriting existing files.
pub fn unpack(archive: &Path, dest: &Path) -> io::Result<()> {
    let file = File::open(archive)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive.set_overwrite(true);
    archive.set_preserve_permissions(true);
    archive.unpack(dest)
}
