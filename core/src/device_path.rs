//! Owned UEFI device paths.
//!
//! The RAM disk service hands back a device path describing the new disk.
//! We copy it into an owned buffer so the locator outlives any firmware
//! bookkeeping and can be passed back to `Unregister`.

use alloc::vec::Vec;
use core::fmt;

use uguid::Guid;

use crate::registrar::{VIRTUAL_CD_GUID, VIRTUAL_DISK_GUID};

pub const MEDIA_DEVICE_PATH: u8 = 0x04;
pub const MEDIA_RAM_DISK_DP: u8 = 0x09;
pub const END_DEVICE_PATH_TYPE: u8 = 0x7f;
pub const END_ENTIRE_DEVICE_PATH_SUBTYPE: u8 = 0xff;

const NODE_HEADER_LEN: usize = 4;
const RAM_DISK_NODE_LEN: usize = 38;

/// Refuse to walk firmware paths longer than this.
const MAX_PATH_LEN: usize = 4096;

/// One node of a device path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node<'a> {
    pub node_type: u8,
    pub sub_type: u8,
    pub data: &'a [u8],
}

/// Decoded RAM disk media node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamDiskNode {
    pub start: u64,
    pub end: u64,
    pub disk_type: Guid,
    pub instance: u16,
}

/// An owned, end-terminated device path.
#[derive(Clone, PartialEq, Eq)]
pub struct DevicePath {
    bytes: Vec<u8>,
}

impl DevicePath {
    /// Build `RamDisk(start, end, type, instance)/End`.
    pub fn ram_disk(start: u64, end: u64, disk_type: &Guid, instance: u16) -> Self {
        let mut bytes = Vec::with_capacity(RAM_DISK_NODE_LEN + NODE_HEADER_LEN);
        bytes.push(MEDIA_DEVICE_PATH);
        bytes.push(MEDIA_RAM_DISK_DP);
        bytes.extend_from_slice(&(RAM_DISK_NODE_LEN as u16).to_le_bytes());
        bytes.extend_from_slice(&start.to_le_bytes());
        bytes.extend_from_slice(&end.to_le_bytes());
        bytes.extend_from_slice(&disk_type.to_bytes());
        bytes.extend_from_slice(&instance.to_le_bytes());
        push_end_node(&mut bytes);
        Self { bytes }
    }

    /// Copy a firmware-owned device path.
    ///
    /// Returns `None` for a malformed path (node shorter than its header or a
    /// path without an end node within `MAX_PATH_LEN` bytes).
    ///
    /// # Safety
    /// `ptr` must point to a readable device path.
    pub unsafe fn from_raw(ptr: *const u8) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }

        let mut offset = 0usize;
        loop {
            let header = core::slice::from_raw_parts(ptr.add(offset), NODE_HEADER_LEN);
            let len = u16::from_le_bytes([header[2], header[3]]) as usize;
            if len < NODE_HEADER_LEN || offset + len > MAX_PATH_LEN {
                return None;
            }
            offset += len;
            if header[0] == END_DEVICE_PATH_TYPE && header[1] == END_ENTIRE_DEVICE_PATH_SUBTYPE {
                break;
            }
        }

        let bytes = core::slice::from_raw_parts(ptr, offset).to_vec();
        Some(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    /// Total size including the end node.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when the path is only an end node.
    pub fn is_empty(&self) -> bool {
        self.nodes().next().is_none()
    }

    /// Iterate over the nodes before the end node.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes {
            rest: &self.bytes,
        }
    }

    /// The first RAM disk media node, if any.
    pub fn ram_disk_node(&self) -> Option<RamDiskNode> {
        self.nodes()
            .find(|n| n.node_type == MEDIA_DEVICE_PATH && n.sub_type == MEDIA_RAM_DISK_DP)
            .and_then(|n| parse_ram_disk(n.data))
    }
}

fn push_end_node(bytes: &mut Vec<u8>) {
    bytes.push(END_DEVICE_PATH_TYPE);
    bytes.push(END_ENTIRE_DEVICE_PATH_SUBTYPE);
    bytes.extend_from_slice(&(NODE_HEADER_LEN as u16).to_le_bytes());
}

fn parse_ram_disk(data: &[u8]) -> Option<RamDiskNode> {
    if data.len() < RAM_DISK_NODE_LEN - NODE_HEADER_LEN {
        return None;
    }
    let mut guid = [0u8; 16];
    guid.copy_from_slice(&data[16..32]);
    Some(RamDiskNode {
        start: u64::from_le_bytes(data[0..8].try_into().ok()?),
        end: u64::from_le_bytes(data[8..16].try_into().ok()?),
        disk_type: Guid::from_bytes(guid),
        instance: u16::from_le_bytes([data[32], data[33]]),
    })
}

/// Iterator over device path nodes.
pub struct Nodes<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Nodes<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Node<'a>> {
        if self.rest.len() < NODE_HEADER_LEN {
            return None;
        }
        let node_type = self.rest[0];
        let sub_type = self.rest[1];
        let len = u16::from_le_bytes([self.rest[2], self.rest[3]]) as usize;
        if node_type == END_DEVICE_PATH_TYPE || len < NODE_HEADER_LEN || len > self.rest.len() {
            return None;
        }
        let data = &self.rest[NODE_HEADER_LEN..len];
        self.rest = &self.rest[len..];
        Some(Node {
            node_type,
            sub_type,
            data,
        })
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for node in self.nodes() {
            if !first {
                f.write_str("/")?;
            }
            first = false;

            let ram_disk = (node.node_type == MEDIA_DEVICE_PATH && node.sub_type == MEDIA_RAM_DISK_DP)
                .then(|| parse_ram_disk(node.data))
                .flatten();
            match ram_disk {
                Some(rd) if rd.disk_type == VIRTUAL_CD_GUID => {
                    write!(f, "VirtualCD({:#x},{:#x},{})", rd.start, rd.end, rd.instance)?
                }
                Some(rd) if rd.disk_type == VIRTUAL_DISK_GUID => {
                    write!(f, "VirtualDisk({:#x},{:#x},{})", rd.start, rd.end, rd.instance)?
                }
                Some(rd) => write!(
                    f,
                    "RamDisk({:#x},{:#x},{},{})",
                    rd.start, rd.end, rd.instance, rd.disk_type
                )?,
                None => write!(f, "Path({},{})", node.node_type, node.sub_type)?,
            }
        }
        if first {
            f.write_str("End")?;
        }
        Ok(())
    }
}

impl fmt::Debug for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DevicePath({})", self)
    }
}
