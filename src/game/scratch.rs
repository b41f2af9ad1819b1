//! Scratch Cache
//!
//! Reusable temporaries for per-move computations. A bracket hands out
//! slots from the start of the sequence; values are overwritten with
//! `clone_from`, so steady-state frames do not allocate.

/// Handle to a slot acquired inside a bracket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScratchHandle(usize);

/// Reusable sequence of temporaries.
#[derive(Debug, Default)]
pub struct ScratchCache<T> {
    items: Vec<T>,
    next: usize,
    open: bool,
}

impl<T: Clone> ScratchCache<T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next: 0,
            open: false,
        }
    }

    /// Open a bracket. Closes when the guard drops.
    ///
    /// # Panics
    ///
    /// Panics if a bracket is already open.
    pub fn bracket(&mut self) -> Bracket<'_, T> {
        assert!(!self.open, "scratch bracket opened while another is open");
        self.open = true;
        self.next = 0;
        Bracket { cache: self }
    }

    /// Slots allocated so far.
    pub fn capacity(&self) -> usize {
        self.items.len()
    }
}

/// Open scope over a [`ScratchCache`].
pub struct Bracket<'a, T: Clone> {
    cache: &'a mut ScratchCache<T>,
}

impl<T: Clone> Bracket<'_, T> {
    /// Next slot, initialised as a copy of `source`.
    pub fn acquire(&mut self, source: &T) -> ScratchHandle {
        let index = self.cache.next;
        self.cache.next += 1;

        match self.cache.items.get_mut(index) {
            Some(slot) => slot.clone_from(source),
            None => self.cache.items.push(source.clone()),
        }
        ScratchHandle(index)
    }

    /// Borrow a slot.
    pub fn get(&self, handle: ScratchHandle) -> &T {
        &self.cache.items[handle.0]
    }

    /// Mutably borrow a slot.
    pub fn get_mut(&mut self, handle: ScratchHandle) -> &mut T {
        &mut self.cache.items[handle.0]
    }

    /// Number of slots acquired in this bracket.
    pub fn acquired(&self) -> usize {
        self.cache.next
    }
}

impl<T: Clone> Drop for Bracket<'_, T> {
    fn drop(&mut self) {
        self.cache.open = false;
    }
}
