//! Index inspection, validation and generation commands.

use anyhow::{Context, bail};
use std::collections::HashMap;
use std::path::Path;

use mir_datasets::index::{build_index, load_index};
use mir_datasets::validation::{ChecksumAlgorithm, compute_checksum, validate};

/// Roles used by `make-index` when none are given.
const DEFAULT_ROLES: [(&str, &str); 2] = [("wav", "audio"), ("lab", "annotation")];

/// Validate a local copy against an index and print the report
pub fn cmd_validate(index_path: &Path, data_home: &Path, quiet: bool) -> anyhow::Result<()> {
    let index = load_index(index_path)?;
    let report = validate(&index, data_home, quiet);

    println!("Index:     {}", index_path.display());
    println!("Data home: {}", data_home.display());
    println!("Tracks:    {}", index.len());
    println!();

    if report.is_valid() {
        println!("All indexed files are present and valid.");
        return Ok(());
    }

    if !report.missing_files.is_empty() {
        println!("Missing files ({}):", report.missing_files.len());
        for path in &report.missing_files {
            println!("  {}", path);
        }
    }
    if !report.invalid_checksums.is_empty() {
        println!("Invalid checksums ({}):", report.invalid_checksums.len());
        for path in &report.invalid_checksums {
            println!("  {}", path);
        }
    }
    Ok(())
}

/// Print the track ids of an index, one per line
pub fn cmd_tracks(index_path: &Path) -> anyhow::Result<()> {
    let index = load_index(index_path)?;
    for track_id in index.track_ids() {
        println!("{}", track_id);
    }
    Ok(())
}

/// Walk a data_home and write a JSON index
pub fn cmd_make_index(
    data_home: &Path,
    out: &Path,
    roles: &[String],
    algorithm: ChecksumAlgorithm,
) -> anyhow::Result<()> {
    if !data_home.is_dir() {
        bail!("{} is not a directory", data_home.display());
    }
    let roles = parse_roles(roles)?;
    let index = build_index(data_home, algorithm, |relative| classify_by_extension(&roles, relative))
        .with_context(|| format!("indexing {}", data_home.display()))?;
    index.write(out)?;

    println!("Wrote {} tracks to {}", index.len(), out.display());
    Ok(())
}

/// Print a file checksum in `sha256sum` layout
pub fn cmd_checksum(file: &Path, algorithm: ChecksumAlgorithm) -> anyhow::Result<()> {
    let digest = compute_checksum(file, algorithm)
        .with_context(|| format!("hashing {}", file.display()))?;
    println!("{}  {}", digest, file.display());
    Ok(())
}

/// Parse `ext=role` pairs, falling back to [`DEFAULT_ROLES`].
fn parse_roles(specs: &[String]) -> anyhow::Result<HashMap<String, String>> {
    if specs.is_empty() {
        return Ok(DEFAULT_ROLES
            .iter()
            .map(|(ext, role)| (ext.to_string(), role.to_string()))
            .collect());
    }
    specs
        .iter()
        .map(|spec| {
            let (ext, role) = spec
                .split_once('=')
                .filter(|(ext, role)| !ext.is_empty() && !role.is_empty())
                .with_context(|| format!("invalid role mapping '{}', expected EXT=ROLE", spec))?;
            Ok((ext.trim_start_matches('.').to_ascii_lowercase(), role.to_string()))
        })
        .collect()
}

/// Track id is the file name up to its first dot; role comes from the
/// extension.
fn classify_by_extension(roles: &HashMap<String, String>, relative: &str) -> Option<(String, String)> {
    let file_name = relative.rsplit('/').next()?;
    let (track_id, _) = file_name.split_once('.')?;
    let (_, extension) = file_name.rsplit_once('.')?;
    let role = roles.get(&extension.to_ascii_lowercase())?;
    if track_id.is_empty() {
        return None;
    }
    Some((track_id.to_string(), role.clone()))
}
