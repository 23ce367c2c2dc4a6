use log::debug;

use crate::config::VmConfig;
use crate::constants::ROOT_FRAME;
use crate::memory::{PhysicalMemory, SwapStore};

/// An all-zero page table found during the traversal, with the entry that
/// points at it.
struct EmptyTable {
    frame: usize,
    parent_entry: usize,
}

/// A resident data page ranked for eviction.
struct Victim {
    frame: usize,
    page: u64,
    parent_entry: usize,
    weight: u64,
}

/// One depth-first pass over the table tree, gathering everything the
/// selection policy needs: the first empty table in traversal order, the
/// high-water frame index, and the maximal-weight eviction candidate.
struct Survey<'a> {
    pm: &'a PhysicalMemory,
    config: &'a VmConfig,
    /// The table the caller is currently wiring a child into. It is empty at
    /// this moment and must not be offered for reuse.
    protected: usize,
    empty_table: Option<EmptyTable>,
    highest_frame: usize,
    victim: Option<Victim>,
}

impl<'a> Survey<'a> {
    fn run(pm: &'a PhysicalMemory, config: &'a VmConfig, protected: usize) -> Self {
        let mut survey = Survey {
            pm,
            config,
            protected,
            empty_table: None,
            highest_frame: ROOT_FRAME,
            victim: None,
        };
        let root_weight = config.parity_weight(ROOT_FRAME as u64);
        survey.visit_table(ROOT_FRAME, 0, 0, 0, root_weight);
        survey
    }

    /// Walk one table frame. `page_prefix` carries the table indices taken so
    /// far, `weight` the parity weights of the frames on the path including
    /// this one. Recursion depth is bounded by `tables_depth`.
    fn visit_table(
        &mut self,
        frame: usize,
        parent_entry: usize,
        depth: usize,
        page_prefix: u64,
        weight: u64,
    ) {
        let base = self.pm.frame_base(frame);
        let mut occupied = false;

        for index in 0..self.config.page_size() {
            let entry = self.pm.read(base + index);
            if entry == 0 {
                continue;
            }
            occupied = true;

            let child = entry as usize;
            self.highest_frame = self.highest_frame.max(child);
            let child_page = (page_prefix << self.config.offset_width) | index as u64;
            let child_weight = weight + self.config.parity_weight(child as u64);

            if depth + 1 == self.config.tables_depth {
                // The child is a resident data page; its full path weight
                // also counts the page number's own parity. Strict comparison
                // keeps the earliest-visited leaf on ties, and leaves are
                // visited in ascending page-number order, so ties go to the
                // lowest page.
                let total = child_weight + self.config.parity_weight(child_page);
                if self.victim.as_ref().is_none_or(|v| total > v.weight) {
                    self.victim = Some(Victim {
                        frame: child,
                        page: child_page,
                        parent_entry: base + index,
                        weight: total,
                    });
                }
            } else {
                self.visit_table(child, base + index, depth + 1, child_page, child_weight);
            }
        }

        // The root has no parent to detach from, and the table currently
        // being populated only looks empty because its first child is not
        // wired yet.
        if !occupied && depth > 0 && frame != self.protected && self.empty_table.is_none() {
            self.empty_table = Some(EmptyTable { frame, parent_entry });
        }
    }
}

/// Produce a frame that no live table path references, ready for the caller
/// to overwrite. `protected` is the table the caller is in the middle of
/// populating.
///
/// Selection order: detach an empty table, else extend into a never-used
/// frame, else evict the maximal-weight resident page. Exactly one of those
/// side-effect shapes happens per call, and the returned frame is never the
/// root.
pub fn acquire_frame(
    pm: &mut PhysicalMemory,
    swap: &mut SwapStore,
    config: &VmConfig,
    protected: usize,
) -> usize {
    // Move the findings out so the survey's borrow of `pm` ends here.
    let Survey {
        empty_table,
        highest_frame,
        victim,
        ..
    } = Survey::run(pm, config, protected);

    if let Some(table) = empty_table {
        pm.write(table.parent_entry, 0);
        debug!("detached empty table, reusing frame {}", table.frame);
        return table.frame;
    }

    let next = highest_frame + 1;
    if next < config.num_frames {
        debug!("extending into fresh frame {next}");
        return next;
    }

    match victim {
        Some(victim) => {
            pm.write(victim.parent_entry, 0);
            swap.evict(pm, victim.frame, victim.page);
            debug!(
                "evicted page {} (weight {}) from frame {}",
                victim.page, victim.weight, victim.frame
            );
            victim.frame
        }
        // A full frame array with no empty table always has a resident page.
        None => unreachable!("frame array exhausted with no eviction candidate"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Word;

    fn tiny(num_frames: usize) -> VmConfig {
        VmConfig {
            num_frames,
            offset_width: 1,
            tables_depth: 2,
            virtual_memory_size: 8,
            weight_even: 4,
            weight_odd: 2,
        }
    }

    fn machine(config: &VmConfig) -> (PhysicalMemory, SwapStore) {
        (PhysicalMemory::new(config), SwapStore::new(config))
    }

    fn link(pm: &mut PhysicalMemory, frame: usize, index: usize, child: usize) {
        let base = pm.frame_base(frame);
        pm.write(base + index, child as Word);
    }

    #[test]
    fn bare_tree_extends_into_frame_one() {
        let config = tiny(4);
        let (mut pm, mut swap) = machine(&config);
        assert_eq!(acquire_frame(&mut pm, &mut swap, &config, ROOT_FRAME), 1);
    }

    #[test]
    fn empty_table_is_detached_first() {
        let config = tiny(4);
        let (mut pm, mut swap) = machine(&config);
        link(&mut pm, ROOT_FRAME, 0, 1);

        assert_eq!(acquire_frame(&mut pm, &mut swap, &config, ROOT_FRAME), 1);
        // The parent entry no longer points at the reclaimed frame.
        assert_eq!(pm.read(0), 0);
    }

    #[test]
    fn protected_frame_is_not_reclaimed() {
        let config = tiny(4);
        let (mut pm, mut swap) = machine(&config);
        link(&mut pm, ROOT_FRAME, 0, 1);

        // Frame 1 is the empty table being populated; the reclaimer must
        // leave it linked and extend instead.
        assert_eq!(acquire_frame(&mut pm, &mut swap, &config, 1), 2);
        assert_eq!(pm.read(0), 1);
    }

    #[test]
    fn fresh_frame_follows_the_high_water_mark() {
        let config = tiny(5);
        let (mut pm, mut swap) = machine(&config);
        link(&mut pm, ROOT_FRAME, 0, 1);
        link(&mut pm, 1, 0, 2); // page 0 resident in frame 2

        assert_eq!(acquire_frame(&mut pm, &mut swap, &config, ROOT_FRAME), 3);
        // No structural cleanup on the fresh path.
        assert_eq!(pm.read(0), 1);
        assert_eq!(pm.read(pm.frame_base(1)), 2);
    }

    #[test]
    fn first_empty_table_in_traversal_order_wins() {
        let config = VmConfig {
            num_frames: 6,
            offset_width: 1,
            tables_depth: 3,
            virtual_memory_size: 16,
            ..VmConfig::default()
        };
        let (mut pm, mut swap) = machine(&config);
        // Entry 0 leads to an occupied chain, entry 1 to an empty table two
        // levels down.
        link(&mut pm, ROOT_FRAME, 0, 3);
        link(&mut pm, 3, 0, 4);
        link(&mut pm, 4, 1, 5); // resident leaf, page 1
        link(&mut pm, ROOT_FRAME, 1, 1);
        link(&mut pm, 1, 0, 2); // frame 2: empty table at depth 2

        assert_eq!(acquire_frame(&mut pm, &mut swap, &config, ROOT_FRAME), 2);
        assert_eq!(pm.read(pm.frame_base(1)), 0);
        // The occupied chain is untouched.
        assert_eq!(pm.read(pm.frame_base(4) + 1), 5);
    }

    #[test]
    fn zeroed_leaf_is_not_an_empty_table() {
        let config = tiny(3);
        let (mut pm, mut swap) = machine(&config);
        link(&mut pm, ROOT_FRAME, 0, 1);
        link(&mut pm, 1, 0, 2); // frame 2 is a data page full of zeros

        // All-zero data must be evicted like any other page, not silently
        // detached as a table.
        assert_eq!(acquire_frame(&mut pm, &mut swap, &config, ROOT_FRAME), 2);
        assert!(swap.contains(0));
        assert_eq!(pm.read(pm.frame_base(1)), 0);
    }

    #[test]
    fn eviction_picks_the_heaviest_page() {
        let config = tiny(4);
        let (mut pm, mut swap) = machine(&config);
        link(&mut pm, ROOT_FRAME, 0, 1);
        link(&mut pm, 1, 0, 2); // page 0 in frame 2
        link(&mut pm, 1, 1, 3); // page 1 in frame 3
        let base2 = pm.frame_base(2);
        pm.write(base2, 42);
        pm.write(base2 + 1, 43);

        // Path weights: page 0 = 4+2+4 + 4 = 14, page 1 = 4+2+2 + 2 = 10.
        let victim = acquire_frame(&mut pm, &mut swap, &config, ROOT_FRAME);
        assert_eq!(victim, 2);
        assert_eq!(pm.read(pm.frame_base(1)), 0);
        assert_eq!(pm.read(pm.frame_base(1) + 1), 3);

        // The data went out to the store before the frame was handed back.
        assert!(swap.contains(0));
        let mut spare = PhysicalMemory::new(&config);
        swap.restore(&mut spare, 1, 0);
        assert_eq!(spare.read(spare.frame_base(1)), 42);
        assert_eq!(spare.read(spare.frame_base(1) + 1), 43);
    }

    #[test]
    fn equal_weights_evict_lowest_page() {
        let mut config = tiny(4);
        config.weight_even = 3;
        config.weight_odd = 3;

        for _ in 0..2 {
            let (mut pm, mut swap) = machine(&config);
            link(&mut pm, ROOT_FRAME, 0, 1);
            link(&mut pm, 1, 0, 2);
            link(&mut pm, 1, 1, 3);

            // Every path scores 12; the tie goes to page 0.
            assert_eq!(acquire_frame(&mut pm, &mut swap, &config, ROOT_FRAME), 2);
            assert!(swap.contains(0));
            assert!(!swap.contains(1));
        }
    }

    #[test]
    fn root_frame_is_never_returned() {
        // Exercise all three selection paths.
        let config = tiny(4);
        let (mut pm, mut swap) = machine(&config);
        assert_ne!(acquire_frame(&mut pm, &mut swap, &config, ROOT_FRAME), 0);

        link(&mut pm, ROOT_FRAME, 0, 1);
        assert_ne!(acquire_frame(&mut pm, &mut swap, &config, ROOT_FRAME), 0);

        link(&mut pm, ROOT_FRAME, 0, 1);
        link(&mut pm, 1, 0, 2);
        link(&mut pm, 1, 1, 3);
        assert_ne!(acquire_frame(&mut pm, &mut swap, &config, ROOT_FRAME), 0);
    }
}
