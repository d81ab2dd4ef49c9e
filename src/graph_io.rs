use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};

use camino::Utf8Path;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::error::KgError;
use crate::graph::{GraphEdge, GraphNode};

pub fn read_nodes(path: &Utf8Path) -> Result<Vec<GraphNode>, KgError> {
    read_jsonl(path)
}

pub fn read_edges(path: &Utf8Path) -> Result<Vec<GraphEdge>, KgError> {
    read_jsonl(path)
}

/// Read one JSON record per line; `.gz` files are decompressed.
pub fn read_jsonl<T: DeserializeOwned>(path: &Utf8Path) -> Result<Vec<T>, KgError> {
    let file = File::open(path).map_err(|err| KgError::GraphRead(format!("open {path}: {err}")))?;
    let reader: Box<dyn Read> = if is_gzip(path) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut records = Vec::new();
    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.map_err(|err| KgError::GraphRead(format!("read {path}: {err}")))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|err| KgError::GraphParse {
            line: index + 1,
            message: err.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Write one JSON record per line through a temp file renamed into place.
pub fn write_jsonl<T: Serialize>(path: &Utf8Path, records: &[T]) -> Result<(), KgError> {
    atomic_write(path, |writer| {
        for record in records {
            serde_json::to_writer(&mut *writer, record)
                .map_err(|err| KgError::Filesystem(err.to_string()))?;
            writer
                .write_all(b"\n")
                .map_err(|err| KgError::Filesystem(err.to_string()))?;
        }
        Ok(())
    })
}

pub fn write_json<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), KgError> {
    atomic_write(path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, value)
            .map_err(|err| KgError::Filesystem(err.to_string()))?;
        writer
            .write_all(b"\n")
            .map_err(|err| KgError::Filesystem(err.to_string()))
    })
}

fn atomic_write<F>(path: &Utf8Path, write: F) -> Result<(), KgError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), KgError>,
{
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(parent).map_err(|err| KgError::Filesystem(err.to_string()))?;
    let temp = NamedTempFile::new_in(parent).map_err(|err| KgError::Filesystem(err.to_string()))?;

    {
        let mut buffered = BufWriter::new(temp.as_file());
        if is_gzip(path) {
            let mut encoder = GzEncoder::new(&mut buffered, Compression::default());
            write(&mut encoder)?;
            encoder
                .finish()
                .map_err(|err| KgError::Filesystem(err.to_string()))?;
        } else {
            write(&mut buffered)?;
        }
        buffered
            .flush()
            .map_err(|err| KgError::Filesystem(err.to_string()))?;
    }

    temp.persist(path)
        .map_err(|err| KgError::Filesystem(format!("persist {path}: {}", err.error)))?;
    Ok(())
}

fn is_gzip(path: &Utf8Path) -> bool {
    path.extension() == Some("gz")
}
