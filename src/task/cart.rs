//! CaRT (Compressed and RC4 Transport) containers.
//!
//! Layout: a 38-byte header (`CART`, version, reserved, RC4 key, optional
//! header length), the RC4-encrypted JSON optional header, the RC4-encrypted
//! zlib stream, the RC4-encrypted JSON optional footer and a 28-byte footer
//! (`TRAC`, reserved, optional footer position and length). Integers are
//! little-endian and every encrypted part starts a fresh cipher.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::{json, Map, Value};
use std::io::{Read, Write};
use std::path::Path;
use crate::errors::ServiceKitError;
use crate::utils::digest::sha256_hex;
use crate::utils::formatting::format_size;
use super::descriptor::FileInfo;
use super::loader::LoadedTask;
use tracing::{info, warn};

pub const CART_MAGIC: &[u8; 4] = b"CART";
pub const CART_FILE_TYPE: &str = "archive/cart";
pub const DEFAULT_ARC4_KEY: [u8; 16] = [3, 1, 4, 1, 5, 9, 2, 6, 3, 1, 4, 1, 5, 9, 2, 6];

const TRAC_MAGIC: &[u8; 4] = b"TRAC";
const CART_VERSION: i16 = 1;
const HEADER_LEN: usize = 38;
const FOOTER_LEN: usize = 28;

/// Decoded content of a CaRT file and its merged header/footer metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CartFile {
    pub metadata: Map<String, Value>,
    pub content: Vec<u8>,
}

impl CartFile {
    /// Name the file had before it was wrapped, without any directory part.
    pub fn original_name(&self) -> Option<String> {
        let name = self.metadata.get("name")?.as_str()?;
        Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
    }
}

pub fn is_cart(data: &[u8]) -> bool {
    data.len() >= HEADER_LEN && data.starts_with(CART_MAGIC)
}

pub fn unpack(data: &[u8]) -> Result<CartFile, ServiceKitError> {
    if !is_cart(data) {
        return Err(invalid("missing CART header"));
    }
    if data.len() < HEADER_LEN + FOOTER_LEN {
        return Err(invalid("file is truncated"));
    }

    let version = i16::from_le_bytes([data[4], data[5]]);
    if version != CART_VERSION {
        return Err(invalid(&format!("unsupported version {}", version)));
    }

    let mut key = [0u8; 16];
    key.copy_from_slice(&data[14..30]);
    if key == [0u8; 16] {
        return Err(ServiceKitError::Input(
            "CaRT file is encrypted with a private key, cannot unpack it".into(),
        ));
    }

    let footer = &data[data.len() - FOOTER_LEN..];
    if !footer.starts_with(TRAC_MAGIC) {
        return Err(invalid("missing TRAC footer"));
    }

    let header_len = read_len(&data[30..38])?;
    let footer_len = read_len(&footer[20..28])?;
    let body_start = HEADER_LEN
        .checked_add(header_len)
        .ok_or_else(|| invalid("optional header length out of range"))?;
    let body_end = (data.len() - FOOTER_LEN)
        .checked_sub(footer_len)
        .ok_or_else(|| invalid("optional footer length out of range"))?;
    if body_start > body_end {
        return Err(invalid("optional header overlaps the data"));
    }

    let mut metadata = Map::new();
    if header_len > 0 {
        merge_json(&mut metadata, &key, &data[HEADER_LEN..body_start], "header")?;
    }

    let compressed = crypt(&key, &data[body_start..body_end]);
    let mut content = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut content)
        .map_err(|e| invalid(&format!("corrupt data stream: {}", e)))?;

    if footer_len > 0 {
        merge_json(&mut metadata, &key, &data[body_end..data.len() - FOOTER_LEN], "footer")?;
    }

    Ok(CartFile { metadata, content })
}

/// Wrap `content` with the default key. The footer records the content's
/// sha256 and length.
pub fn pack(content: &[u8], metadata: &Map<String, Value>) -> Result<Vec<u8>, ServiceKitError> {
    let key = DEFAULT_ARC4_KEY;
    let header = if metadata.is_empty() {
        Vec::new()
    } else {
        crypt(&key, &serde_json::to_vec(metadata)?)
    };

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content)?;
    let compressed = encoder.finish()?;

    let mut out = Vec::with_capacity(HEADER_LEN + header.len() + compressed.len() + FOOTER_LEN + 128);
    out.extend_from_slice(CART_MAGIC);
    out.extend_from_slice(&CART_VERSION.to_le_bytes());
    out.extend_from_slice(&0u64.to_le_bytes());
    out.extend_from_slice(&key);
    out.extend_from_slice(&(header.len() as u64).to_le_bytes());
    out.extend_from_slice(&header);
    out.extend_from_slice(&crypt(&key, &compressed));

    let footer_pos = out.len() as u64;
    let footer = crypt(
        &key,
        &serde_json::to_vec(&json!({"sha256": sha256_hex(content), "length": content.len()}))?,
    );
    out.extend_from_slice(&footer);

    out.extend_from_slice(TRAC_MAGIC);
    out.extend_from_slice(&0u64.to_le_bytes());
    out.extend_from_slice(&footer_pos.to_le_bytes());
    out.extend_from_slice(&(footer.len() as u64).to_le_bytes());
    Ok(out)
}

/// Swap a CaRT-wrapped target for its decoded content, written under `into`
/// and named by its sha256. Other targets are returned untouched.
pub async fn unpack_task(task: LoadedTask, into: &Path) -> Result<LoadedTask, ServiceKitError> {
    let declared = task.file_info.file_type == CART_FILE_TYPE;
    let data = tokio::fs::read(&task.file_path).await?;
    if !is_cart(&data) {
        if declared {
            warn!(file = %task.file_path.display(), "File is typed {} but has no CaRT header", CART_FILE_TYPE);
        }
        return Ok(task);
    }

    let cart = unpack(&data)?;
    let sha256 = sha256_hex(&cart.content);
    let file_path = into.join(&sha256);
    tokio::fs::write(&file_path, &cart.content).await?;
    info!(
        path = %file_path.display(),
        size = %format_size(cart.content.len() as u64),
        "File was a CaRT archive, un-CaRTed it for processing"
    );

    let LoadedTask { mut descriptor, file_info, .. } = task;
    if let Some(name) = cart.original_name() {
        descriptor.filename = name;
    }
    let file_type = if declared { "unknown".to_string() } else { file_info.file_type };
    descriptor.file_type = file_type.clone();

    Ok(LoadedTask {
        descriptor,
        file_path,
        file_info: FileInfo {
            sha256,
            size: cart.content.len() as u64,
            file_type,
        },
    })
}

fn invalid(reason: &str) -> ServiceKitError {
    ServiceKitError::Input(format!("Invalid CaRT file: {}", reason))
}

fn read_len(bytes: &[u8]) -> Result<usize, ServiceKitError> {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    usize::try_from(u64::from_le_bytes(raw)).map_err(|_| invalid("length out of range"))
}

fn merge_json(
    metadata: &mut Map<String, Value>,
    key: &[u8; 16],
    encrypted: &[u8],
    part: &str,
) -> Result<(), ServiceKitError> {
    let plain = crypt(key, encrypted);
    match serde_json::from_slice::<Value>(&plain) {
        Ok(Value::Object(map)) => {
            metadata.extend(map);
            Ok(())
        }
        _ => Err(invalid(&format!("optional {} is not a JSON object", part))),
    }
}

fn crypt(key: &[u8; 16], data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    Arc4::new(key).apply(&mut out);
    out
}

/// RC4 keystream.
struct Arc4 {
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl Arc4 {
    fn new(key: &[u8]) -> Self {
        let mut state = [0u8; 256];
        for (i, slot) in state.iter_mut().enumerate() {
            *slot = i as u8;
        }
        let mut j = 0u8;
        for i in 0..256 {
            j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
            state.swap(i, j as usize);
        }
        Self { state, i: 0, j: 0 }
    }

    fn apply(&mut self, data: &mut [u8]) {
        for byte in data {
            self.i = self.i.wrapping_add(1);
            self.j = self.j.wrapping_add(self.state[self.i as usize]);
            self.state.swap(self.i as usize, self.j as usize);
            let k = self.state[self.state[self.i as usize].wrapping_add(self.state[self.j as usize]) as usize];
            *byte ^= k;
        }
    }
}
