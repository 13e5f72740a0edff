// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Binary export and import of a registry's connections
//!
//! Stream layout, all integers 32-bit little-endian:
//! version, record count, then per record the name, description, class
//! name and configuration as length-prefixed UTF-8 strings (length -1 for
//! an absent string) followed by the connection limit.

use crate::error::RegistryError;
use crate::record::{ConfigParams, ConnectionRecord};
use crate::registry::ConnectionRegistry;
use std::io::{Read, Write};

/// Format version written by [`ConnectionRegistry::export_configuration`]
pub const EXPORT_VERSION: i32 = 1;

impl ConnectionRegistry {
    /// Write every connection of this kind to `out`
    pub fn export_configuration(&self, out: &mut dyn Write) -> Result<usize, RegistryError> {
        let records = self.get_all_connections()?;
        write_i32(out, EXPORT_VERSION)?;
        write_i32(out, count_field(records.len())?)?;
        for record in &records {
            write_string(out, Some(&record.name))?;
            write_string(out, record.description.as_deref())?;
            write_string(out, Some(&record.class_name))?;
            write_string(out, Some(&record.config.to_blob()))?;
            write_i32(out, record.max_connections)?;
        }
        tracing::info!(kind = %self.kind(), count = records.len(), "connections exported");
        Ok(records.len())
    }

    /// Read connections from `input` and save each as a new record
    ///
    /// Records are saved one by one; a name that already exists stops the
    /// import with `AlreadyExists`, keeping the records saved before it.
    pub fn import_configuration(&self, input: &mut dyn Read) -> Result<usize, RegistryError> {
        let version = read_i32(input)?;
        if version != EXPORT_VERSION {
            return Err(RegistryError::UnsupportedVersion {
                kind: self.kind(),
                version,
            });
        }
        let count = read_i32(input)?;
        if count < 0 {
            return Err(RegistryError::Malformed(format!("negative record count {count}")));
        }

        for _ in 0..count {
            let name = read_required(input, "name")?;
            let description = read_string(input)?;
            let class_name = read_required(input, "class name")?;
            let blob = read_string(input)?.unwrap_or_default();
            let max_connections = read_i32(input)?;
            let config = ConfigParams::from_blob(&blob).map_err(|source| {
                RegistryError::CorruptConfig {
                    name: name.clone(),
                    source,
                }
            })?;

            let mut record = self.create();
            record.name = name;
            record.description = description;
            record.class_name = class_name;
            record.config = config;
            record.max_connections = max_connections;
            self.save(&record)?;
        }
        tracing::info!(kind = %self.kind(), count, "connections imported");
        Ok(count as usize)
    }
}

fn count_field(len: usize) -> Result<i32, RegistryError> {
    i32::try_from(len).map_err(|_| RegistryError::Malformed(format!("{len} records do not fit")))
}

fn write_i32(out: &mut dyn Write, value: i32) -> Result<(), RegistryError> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_string(out: &mut dyn Write, value: Option<&str>) -> Result<(), RegistryError> {
    match value {
        None => write_i32(out, -1),
        Some(s) => {
            write_i32(out, count_field(s.len())?)?;
            out.write_all(s.as_bytes())?;
            Ok(())
        }
    }
}

fn read_i32(input: &mut dyn Read) -> Result<i32, RegistryError> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_string(input: &mut dyn Read) -> Result<Option<String>, RegistryError> {
    let len = read_i32(input)?;
    if len == -1 {
        return Ok(None);
    }
    let len = usize::try_from(len)
        .map_err(|_| RegistryError::Malformed(format!("string length {len}")))?;
    // Grow with the bytes actually present, not the length the stream claims
    let mut buf = Vec::new();
    let read = Read::take(&mut *input, len as u64).read_to_end(&mut buf)?;
    if read < len {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("string of {len} bytes cut short after {read}"),
        )
        .into());
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|e| RegistryError::Malformed(e.to_string()))
}

fn read_required(input: &mut dyn Read, field: &str) -> Result<String, RegistryError> {
    read_string(input)?.ok_or_else(|| RegistryError::Malformed(format!("missing {field}")))
}

#[cfg(test)]
#[path = "export_tests.rs"]
mod tests;
