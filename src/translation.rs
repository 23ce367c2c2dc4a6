use log::trace;

use crate::address::VirtualAddress;
use crate::config::VmConfig;
use crate::constants::ROOT_FRAME;
use crate::error::{ConfigError, VmError};
use crate::memory::{PhysicalMemory, SwapStore, Word};
use crate::reclaim;

/// The emulated memory-management unit: the frame array, the backing store
/// and the page-table tree rooted at frame 0.
pub struct Mmu {
    config: VmConfig,
    memory: PhysicalMemory,
    swap: SwapStore,
}

impl Mmu {
    /// Build an MMU over a validated configuration. Configuration problems
    /// are construction-time failures; translation assumes a sound geometry.
    pub fn new(config: VmConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Mmu {
            memory: PhysicalMemory::new(&config),
            swap: SwapStore::new(&config),
            config,
        })
    }

    /// Zero-fill the root table, leaving the empty tree as the only
    /// reachable structure.
    pub fn initialize(&mut self) {
        self.memory.clear_frame(ROOT_FRAME);
    }

    #[inline]
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Resolve a virtual address to the physical address of its word,
    /// creating missing tables and restoring the data page on demand.
    pub fn translate(&mut self, address: u64) -> Result<usize, VmError> {
        if address >= self.config.virtual_memory_size {
            return Err(VmError::AddressOutOfRange {
                address,
                limit: self.config.virtual_memory_size,
            });
        }
        let va = VirtualAddress::decompose(address, &self.config);
        Ok(self.walk(&va))
    }

    /// Read the word at a virtual address.
    pub fn read(&mut self, address: u64) -> Result<Word, VmError> {
        let pa = self.translate(address)?;
        Ok(self.memory.read(pa))
    }

    /// Write a word to a virtual address.
    pub fn write(&mut self, address: u64, value: Word) -> Result<(), VmError> {
        let pa = self.translate(address)?;
        self.memory.write(pa, value);
        Ok(())
    }

    /// Walk the table tree level by level from the root. An entry value of 0
    /// means unmapped; the missing child is created on the spot, as a
    /// zero-filled table on internal levels or by swapping the target page
    /// in at the leaf level.
    fn walk(&mut self, va: &VirtualAddress) -> usize {
        let mut current = ROOT_FRAME;
        let depth = self.config.tables_depth;

        for (level, index) in va.table_indices(&self.config).into_iter().enumerate() {
            let entry_addr = self.memory.frame_base(current) + index;
            let entry = self.memory.read(entry_addr);
            current = if entry != 0 {
                entry as usize
            } else {
                let frame =
                    reclaim::acquire_frame(&mut self.memory, &mut self.swap, &self.config, current);
                if level + 1 == depth {
                    trace!("restoring page {} into frame {frame}", va.page);
                    self.swap.restore(&mut self.memory, frame, va.page);
                } else {
                    trace!("new table in frame {frame} at level {level}");
                    self.memory.clear_frame(frame);
                }
                self.memory.write(entry_addr, frame as Word);
                frame
            };
        }

        self.memory.frame_base(current) + va.offset as usize
    }
}
