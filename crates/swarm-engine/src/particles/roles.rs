/// One of the two particle state buffers.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// Which buffer is read this tick. The other one is written.
///
/// Read and write are derived from a single tag, so they can never name the
/// same buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum BufferRoles {
    #[default]
    AReads,
    BReads,
}

impl BufferRoles {
    pub fn read(self) -> Slot {
        match self {
            Self::AReads => Slot::A,
            Self::BReads => Slot::B,
        }
    }

    pub fn write(self) -> Slot {
        self.read().other()
    }

    pub fn swapped(self) -> Self {
        match self {
            Self::AReads => Self::BReads,
            Self::BReads => Self::AReads,
        }
    }

    pub fn swap(&mut self) {
        *self = self.swapped();
    }
}

/// A value held once per buffer slot.
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    a: T,
    b: T,
}

impl<T> PingPong<T> {
    pub fn new(a: T, b: T) -> Self {
        Self { a, b }
    }

    /// Builds both halves from the same constructor.
    pub fn try_from_fn<E>(mut f: impl FnMut(Slot) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self {
            a: f(Slot::A)?,
            b: f(Slot::B)?,
        })
    }

    pub fn get(&self, slot: Slot) -> &T {
        match slot {
            Slot::A => &self.a,
            Slot::B => &self.b,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Slot, &T) -> U) -> PingPong<U> {
        PingPong {
            a: f(Slot::A, &self.a),
            b: f(Slot::B, &self.b),
        }
    }
}
