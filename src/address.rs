use crate::config::VmConfig;

/// The decomposed components of a virtual address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    pub raw: u64,
    /// Virtual page number: everything above the in-page offset.
    pub page: u64,
    /// Word offset within the page.
    pub offset: u64,
}

impl VirtualAddress {
    /// Split a raw address into page number and in-page offset.
    pub fn decompose(raw: u64, config: &VmConfig) -> Self {
        VirtualAddress {
            raw,
            page: raw >> config.offset_width,
            offset: raw & config.offset_mask(),
        }
    }

    /// Inverse of `decompose`: pack page number and offset back into a raw
    /// address.
    #[inline]
    pub fn recompose(&self, config: &VmConfig) -> u64 {
        (self.page << config.offset_width) | self.offset
    }

    /// Table index for each level, most significant level first. The indices
    /// are exactly the digits of the page number in base `page_size()`.
    pub fn table_indices(&self, config: &VmConfig) -> Vec<usize> {
        let mut indices = vec![0usize; config.tables_depth];
        let mut page = self.page;
        for slot in indices.iter_mut().rev() {
            *slot = (page & config.offset_mask()) as usize;
            page >>= config.offset_width;
        }
        indices
    }
}

impl std::fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "VA({}) = (page={}, offset={})",
            self.raw, self.page, self.offset
        )
    }
}
