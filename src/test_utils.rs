//! Test utilities and fixtures for mir-datasets tests.
//!
//! This module provides index builders and writers for the small on-disk
//! fixtures (WAV files, archives) that tests need, so no binary assets are
//! checked in.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{index_of, md5_hex, write_wav};
//!
//! let index = index_of(&[("t1", &[("audio", FileEntry::new("t1.wav", md5_hex(b"")))])]);
//! write_wav(&dir.path().join("t1.wav"), 8000, 1, &[0, 1, 2]);
//! ```

use indexmap::IndexMap;
use md5::{Digest, Md5};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;

use crate::index::{FileEntry, Index, TrackEntry};

/// Build an index from `(track_id, [(role, entry)])` pairs.
pub fn index_of(tracks: &[(&str, &[(&str, FileEntry)])]) -> Index {
    let tracks = tracks
        .iter()
        .map(|(track_id, roles)| {
            let entry: TrackEntry = roles
                .iter()
                .map(|(role, file)| (role.to_string(), file.clone()))
                .collect();
            (track_id.to_string(), entry)
        })
        .collect::<IndexMap<_, _>>();
    Index::from_tracks(tracks)
}

/// Lowercase hex MD5 of `bytes`.
pub fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

/// Write a 16-bit PCM WAV file. `samples` are interleaved across channels.
pub fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
    let data_len = (samples.len() * 2) as u32;
    let block_align = channels * 2;
    let byte_rate = sample_rate * block_align as u32;

    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }

    std::fs::write(path, bytes).expect("Failed to write WAV fixture");
}

/// Write a zip archive holding `(name, contents)` entries.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).expect("Failed to create zip fixture");
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, contents) in entries {
        zip.start_file(*name, options).expect("Failed to start zip entry");
        zip.write_all(contents).expect("Failed to write zip entry");
    }
    zip.finish().expect("Failed to finish zip fixture");
}

/// Write a gzip-compressed tarball holding `(name, contents)` entries.
pub fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).expect("Failed to create tar.gz fixture");
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, *contents)
            .expect("Failed to append tar entry");
    }
    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .expect("Failed to finish tar.gz fixture");
}

/// Serve one canned HTTP response per incoming connection, in order, from a
/// local port. Once every response is sent the listener closes, so later
/// requests are refused.
///
/// Returns the base URL, e.g. `http://127.0.0.1:41234`.
pub fn serve_http(responses: Vec<Vec<u8>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to read test server address");
    std::thread::spawn(move || {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = stream.write_all(&response);
            let _ = stream.flush();
        }
    });
    format!("http://{}", addr)
}

/// `200 OK` response carrying `body`.
pub fn http_ok(body: &[u8]) -> Vec<u8> {
    http_with_length(body, body.len())
}

/// `200 OK` response announcing `content_length` bytes but sending `body`.
pub fn http_with_length(body: &[u8], content_length: usize) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        content_length
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

/// Bytes of a zip archive holding `(name, contents)` entries.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("fixture.zip");
    write_zip(&path, entries);
    std::fs::read(&path).expect("Failed to read zip fixture")
}
