use crate::config::VmConfig;

/// Storage word. Table entries store child frame indices in the same word
/// type as page data; entry value 0 means "unmapped".
pub type Word = i64;

/// The physical frame array: `num_frames * page_size` words, all zero at
/// construction.
pub struct PhysicalMemory {
    data: Box<[Word]>,
    words_per_frame: usize,
}

impl PhysicalMemory {
    pub fn new(config: &VmConfig) -> Self {
        PhysicalMemory {
            data: vec![0; config.pm_size()].into_boxed_slice(),
            words_per_frame: config.page_size(),
        }
    }

    /// Read a word from physical memory.
    #[inline]
    pub fn read(&self, address: usize) -> Word {
        self.data[address]
    }

    /// Write a word to physical memory.
    #[inline]
    pub fn write(&mut self, address: usize, value: Word) {
        self.data[address] = value;
    }

    /// Starting word address of a frame.
    #[inline]
    pub fn frame_base(&self, frame: usize) -> usize {
        frame * self.words_per_frame
    }

    /// Zero-fill a frame, turning it into an empty page table.
    pub fn clear_frame(&mut self, frame: usize) {
        let base = self.frame_base(frame);
        self.data[base..base + self.words_per_frame].fill(0);
    }

    /// Words in one frame's window.
    #[inline]
    pub fn frame(&self, frame: usize) -> &[Word] {
        let base = self.frame_base(frame);
        &self.data[base..base + self.words_per_frame]
    }
}

/// Backing store for evicted pages, one slot per virtual page number.
///
/// Slots are keyed directly by page number, which is the identity an evicted
/// page keeps while it is out of memory.
pub struct SwapStore {
    slots: Vec<Option<Box<[Word]>>>,
    words_per_page: usize,
}

impl SwapStore {
    pub fn new(config: &VmConfig) -> Self {
        SwapStore {
            slots: vec![None; config.num_pages()],
            words_per_page: config.page_size(),
        }
    }

    /// Persist a frame's current contents under `page`.
    pub fn evict(&mut self, pm: &PhysicalMemory, frame: usize, page: u64) {
        self.slots[page as usize] = Some(pm.frame(frame).into());
    }

    /// Load the previously evicted contents of `page` into `frame`. A page
    /// that was never evicted is clean: the frame is zero-filled.
    pub fn restore(&self, pm: &mut PhysicalMemory, frame: usize, page: u64) {
        let base = pm.frame_base(frame);
        match &self.slots[page as usize] {
            Some(words) => {
                for (i, &word) in words.iter().enumerate() {
                    pm.write(base + i, word);
                }
            }
            None => pm.clear_frame(frame),
        }
    }

    /// Whether `page` currently has an evicted copy in the store.
    #[inline]
    pub fn contains(&self, page: u64) -> bool {
        self.slots[page as usize].is_some()
    }
}
