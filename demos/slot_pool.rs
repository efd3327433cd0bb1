use free_index::{AllocError, FreeIndex, byte_count_for};
use simple_logger::SimpleLogger;

/// A tiny pool handing out slot numbers, growing its index on demand.
struct SlotPool {
    index: FreeIndex,
    cursor: usize,
}

impl SlotPool {
    fn with_slots(slots: usize) -> Result<Self, AllocError> {
        Ok(Self {
            index: FreeIndex::try_new(byte_count_for(slots))?,
            cursor: 0,
        })
    }

    fn acquire(&mut self) -> Result<usize, AllocError> {
        let scan = self.index.next_free(self.cursor);
        let slot = match scan.get().or_else(|| self.index.next_free(0).get()) {
            Some(slot) => slot,
            None => {
                let first_new = self.index.bit_count();
                self.index.resize_smart(self.index.byte_count() + 1)?;
                first_new
            }
        };
        self.index.set_used(slot);
        self.cursor = slot + 1;
        Ok(slot)
    }

    fn release(&mut self, slot: usize) {
        self.index.set_free(slot);
    }

    /// Highest free slot above `slot`, e.g. to hand out from the top.
    fn last_free_above(&self, slot: usize) -> Option<usize> {
        self.index.prev_free(slot).get()
    }
}

fn main() -> Result<(), AllocError> {
    SimpleLogger::new().init().unwrap();

    let mut pool = SlotPool::with_slots(8)?;
    let slots: Vec<usize> = (0..20).map(|_| pool.acquire()).collect::<Result<_, _>>()?;
    println!("acquired {slots:?}");
    println!("{:?}", pool.index);

    pool.release(3);
    pool.release(11);
    println!("after release: {:?}", pool.index);
    println!("reacquired {}", pool.acquire()?);
    println!("last free above 0: {:?}", pool.last_free_above(0));
    println!(
        "{} used / {} free in {} bytes",
        pool.index.used_count(),
        pool.index.free_count(),
        pool.index.byte_count()
    );
    Ok(())
}
