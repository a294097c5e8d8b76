//! In-memory stand-in for the game process.
//!
//! Used by tests and by dry runs, where a plan is applied without a live
//! game attached.

use std::collections::BTreeMap;

use super::{MemoryError, ProcessMemory};

/// Sparse address space made of explicitly mapped regions.
#[derive(Debug, Default, Clone)]
pub struct MockMemory {
    regions: BTreeMap<u32, Vec<u8>>,
    writes: usize,
    bytes_written: usize,
}

impl MockMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `len` zeroed bytes at `address`. Overlapping an existing region
    /// replaces it.
    pub fn map(&mut self, address: u32, len: usize) {
        let end = address as u64 + len as u64;
        self.regions
            .retain(|&base, data| base as u64 + data.len() as u64 <= address as u64 || base as u64 >= end);
        self.regions.insert(address, vec![0; len]);
    }

    /// Map a region and fill it with `data`.
    pub fn map_with(&mut self, address: u32, data: &[u8]) {
        self.map(address, data.len());
        if let Some(region) = self.regions.get_mut(&address) {
            region.copy_from_slice(data);
        }
    }

    /// Number of successful write calls.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    fn locate(&self, address: u32, size: usize) -> Option<(u32, usize)> {
        let (&base, data) = self.regions.range(..=address).next_back()?;
        let offset = (address - base) as usize;
        (offset + size <= data.len()).then_some((base, offset))
    }
}

impl ProcessMemory for MockMemory {
    fn read_bytes(&self, address: u32, buf: &mut [u8]) -> Result<(), MemoryError> {
        let (base, offset) = self.locate(address, buf.len()).ok_or_else(|| MemoryError::Read {
            address,
            size: buf.len(),
            reason: "address not mapped".to_string(),
        })?;
        buf.copy_from_slice(&self.regions[&base][offset..offset + buf.len()]);
        Ok(())
    }

    fn write_bytes(&mut self, address: u32, data: &[u8]) -> Result<(), MemoryError> {
        let (base, offset) = self.locate(address, data.len()).ok_or_else(|| MemoryError::Write {
            address,
            size: data.len(),
            reason: "address not mapped".to_string(),
        })?;
        if let Some(region) = self.regions.get_mut(&base) {
            region[offset..offset + data.len()].copy_from_slice(data);
        }
        self.writes += 1;
        self.bytes_written += data.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ScalarType, Value};

    #[test]
    fn unmapped_reads_fail() {
        let mem = MockMemory::new();
        let mut buf = [0u8; 4];
        assert!(matches!(
            mem.read_bytes(0x1000, &mut buf),
            Err(MemoryError::Read { address: 0x1000, size: 4, .. })
        ));
    }

    #[test]
    fn reads_may_not_straddle_region_end() {
        let mut mem = MockMemory::new();
        mem.map(0x1000, 4);
        let mut buf = [0u8; 4];
        assert!(mem.read_bytes(0x1002, &mut buf).is_err());
        assert!(mem.read_bytes(0x1000, &mut buf).is_ok());
    }

    #[test]
    fn follows_pointer_chains() {
        let mut mem = MockMemory::new();
        mem.map_with(0x6A9EC0, &0x0200_0000u32.to_le_bytes());
        mem.map(0x0200_0000, 0x1000);

        mem.write(7i32, &[0x6A9EC0, 0x7FC]).unwrap();
        assert_eq!(mem.resolve(&[0x6A9EC0, 0x7FC]).unwrap(), 0x0200_07FC);
        assert_eq!(mem.read::<i32>(&[0x6A9EC0, 0x7FC]).unwrap(), 7);
        assert_eq!(mem.read::<u32>(&[0x0200_07FC]).unwrap(), 7);
    }

    #[test]
    fn typed_access_packs_arrays() {
        let mut mem = MockMemory::new();
        mem.map(0x4000, 16);
        let values = [Value::U16(1), Value::U16(0xBEEF), Value::U16(3)];
        mem.write_typed(&values, &[0x4000]).unwrap();

        let back = mem.read_typed(ScalarType::U16, 3, &[0x4000]).unwrap();
        assert_eq!(back, values);
        assert_eq!(mem.read_array::<u16>(3, &[0x4000]).unwrap(), vec![1, 0xBEEF, 3]);
        assert_eq!(mem.write_count(), 1);
        assert_eq!(mem.bytes_written(), 6);
    }

    #[test]
    fn oversized_counts_fail_instead_of_overflowing() {
        let mut mem = MockMemory::new();
        mem.map(0x1000, 16);
        assert!(matches!(
            mem.read_typed(ScalarType::U32, usize::MAX / 2, &[0x1000]),
            Err(MemoryError::Read { address: 0x1000, .. })
        ));
        assert!(matches!(
            mem.read_array::<u64>(usize::MAX / 4, &[0x1000]),
            Err(MemoryError::Read { address: 0x1000, .. })
        ));
        assert_eq!(mem.read_typed(ScalarType::U32, 4, &[0x1000]).unwrap().len(), 4);
    }

    #[test]
    fn empty_chain_is_rejected() {
        let mem = MockMemory::new();
        assert!(matches!(mem.resolve(&[]), Err(MemoryError::EmptyChain)));
    }
}
